//! Modifier-tag extraction
//!
//! "Biblical" and "Modern" are descriptive modifiers, not origins. When one
//! is comma-, semicolon-, or space-joined with a real origin it is removed
//! from the origin text and recorded in `tags` instead. A modifier that is
//! the *only* content stays as the origin, unmodified.
//!
//! Both extractions are independently idempotent: running them twice yields
//! the same `(origin, tags)` pair as running them once, and tags are never
//! duplicated.

use crate::models::{NameRecord, OriginValue};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Trailing token: "Hebrew, Biblical" / "Spanish; Biblical" / "Hebrew Biblical"
    static ref TRAILING_BIBLICAL: Regex = Regex::new(r"(?i)[\s,;]+biblical\s*$").unwrap();
    // Leading token: "Biblical, Hebrew" / "Biblical Hebrew"
    static ref LEADING_BIBLICAL: Regex = Regex::new(r"(?i)^\s*biblical[\s,;]+").unwrap();
    static ref TRAILING_MODERN: Regex = Regex::new(r"(?i)[\s,;]+modern\s*$").unwrap();
    static ref LEADING_MODERN: Regex = Regex::new(r"(?i)^\s*modern[\s,;]+").unwrap();
}

/// Split a modifier token out of an origin string.
///
/// Returns the cleaned origin when the token was removed and real content
/// remains; `None` when nothing changes (token absent, or token is the only
/// content).
fn split_token(origin: &str, token: &str, leading: &Regex, trailing: &Regex) -> Option<String> {
    if !origin.to_lowercase().contains(token) {
        return None;
    }

    let mut cleaned = trailing.replace(origin, "").to_string();
    cleaned = leading.replace(&cleaned, "").to_string();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case(token) {
        // The modifier is the only content: it stays as the origin
        return None;
    }
    if cleaned == origin.trim() {
        // Token present but not in a splittable position (mid-compound)
        return None;
    }
    Some(cleaned.to_string())
}

fn split_from_record(
    record: &mut NameRecord,
    token: &str,
    tag: &str,
    leading: &Regex,
    trailing: &Regex,
) -> bool {
    let mut changed = false;

    match record.origin.take() {
        Some(OriginValue::One(text)) => {
            if let Some(cleaned) = split_token(&text, token, leading, trailing) {
                record.origin = Some(OriginValue::One(cleaned));
                record.add_tag(tag);
                changed = true;
            } else {
                record.origin = Some(OriginValue::One(text));
            }
        }
        Some(OriginValue::Many(items)) => {
            let has_token = items.iter().any(|o| o.eq_ignore_ascii_case(token));
            let remainder: Vec<String> = items
                .iter()
                .filter(|o| !o.eq_ignore_ascii_case(token))
                .cloned()
                .collect();
            if has_token && !remainder.is_empty() {
                record.origin = Some(OriginValue::Many(remainder));
                record.add_tag(tag);
                changed = true;
            } else {
                // Token absent, or it is the only content: leave unmodified
                record.origin = Some(OriginValue::Many(items));
            }
        }
        None => {}
    }

    // The legacy `origins` array gets the same treatment
    let has_token = record.origins.iter().any(|o| o.eq_ignore_ascii_case(token));
    if has_token && record.origins.len() > 1 {
        record.origins.retain(|o| !o.eq_ignore_ascii_case(token));
        record.add_tag(tag);
        changed = true;
    }

    changed
}

/// Run both modifier extractions over a record until neither makes progress.
///
/// The loop handles orderings like "Spanish, Biblical, Modern", where one
/// extraction only becomes applicable after the other has stripped its
/// token. Returns true if anything changed.
pub fn apply_tag_splits(record: &mut NameRecord) -> bool {
    let mut changed_any = false;
    loop {
        let biblical = split_from_record(
            record,
            "biblical",
            "Biblical",
            &LEADING_BIBLICAL,
            &TRAILING_BIBLICAL,
        );
        let modern = split_from_record(
            record,
            "modern",
            "Modern",
            &LEADING_MODERN,
            &TRAILING_MODERN,
        );
        if biblical || modern {
            changed_any = true;
        } else {
            break;
        }
    }
    changed_any
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_origin(origin: OriginValue) -> NameRecord {
        let mut r = NameRecord::new("Test");
        r.origin = Some(origin);
        r
    }

    #[test]
    fn trailing_biblical_splits() {
        let mut r = record_with_origin("Hebrew, Biblical".into());
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::One("Hebrew".into())));
        assert_eq!(r.tags, vec!["Biblical"]);
    }

    #[test]
    fn leading_biblical_splits() {
        let mut r = record_with_origin("Biblical Hebrew".into());
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::One("Hebrew".into())));
        assert_eq!(r.tags, vec!["Biblical"]);
    }

    #[test]
    fn standalone_biblical_stays_as_origin() {
        let mut r = record_with_origin("Biblical".into());
        assert!(!apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::One("Biblical".into())));
        assert!(r.tags.is_empty());
    }

    #[test]
    fn modern_invented_becomes_invented() {
        let mut r = record_with_origin("Modern Invented".into());
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::One("Invented".into())));
        assert_eq!(r.tags, vec!["Modern"]);
    }

    #[test]
    fn trailing_modern_splits() {
        let mut r = record_with_origin("Spanish,Modern".into());
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::One("Spanish".into())));
        assert_eq!(r.tags, vec!["Modern"]);
    }

    #[test]
    fn array_origin_filters_token() {
        let mut r = record_with_origin(OriginValue::Many(vec![
            "Hebrew".into(),
            "Biblical".into(),
        ]));
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::Many(vec!["Hebrew".into()])));
        assert_eq!(r.tags, vec!["Biblical"]);
    }

    #[test]
    fn array_of_only_modifier_left_alone() {
        let mut r = record_with_origin(OriginValue::Many(vec!["Biblical".into()]));
        assert!(!apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::Many(vec!["Biblical".into()])));
        assert!(r.tags.is_empty());
    }

    #[test]
    fn splitting_is_idempotent() {
        let mut r = record_with_origin("Hebrew, Biblical".into());
        apply_tag_splits(&mut r);
        let origin_after_one = r.origin.clone();
        let tags_after_one = r.tags.clone();

        assert!(!apply_tag_splits(&mut r));
        assert_eq!(r.origin, origin_after_one);
        assert_eq!(r.tags, tags_after_one);
    }

    #[test]
    fn both_modifiers_extract_from_one_compound() {
        let mut r = record_with_origin("Spanish, Biblical, Modern".into());
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origin, Some(OriginValue::One("Spanish".into())));
        assert!(r.tags.iter().any(|t| t == "Biblical"));
        assert!(r.tags.iter().any(|t| t == "Modern"));

        // and the combined pass converged: nothing further to do
        assert!(!apply_tag_splits(&mut r));
    }

    #[test]
    fn no_duplicate_tags_when_already_tagged() {
        let mut r = record_with_origin("Hebrew, Biblical".into());
        r.tags.push("Biblical".into());
        apply_tag_splits(&mut r);
        assert_eq!(r.tags, vec!["Biblical"]);
    }

    #[test]
    fn origins_array_field_also_split() {
        let mut r = NameRecord::new("Test");
        r.origins = vec!["Hebrew".into(), "Biblical".into()];
        assert!(apply_tag_splits(&mut r));
        assert_eq!(r.origins, vec!["Hebrew"]);
        assert_eq!(r.tags, vec!["Biblical"]);
    }
}
