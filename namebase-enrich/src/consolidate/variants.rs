//! Variant origin resolution
//!
//! A record whose origin text reads "variant of Amy" (or a related phrase)
//! inherits Amy's origin — the value is copied, not referenced. When the
//! base name is unknown to the store, or has no real origin of its own, the
//! record is left untouched rather than guessed at.

use crate::models::{NameRecord, OriginValue};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    /// "variant of X", "derived from X", "diminutive of X", "short form of
    /// X", "feminine/masculine form of X", "form of X"
    static ref VARIANT_PHRASE: Regex = Regex::new(
        r"(?i)\b(?:variant\s+of|derived\s+from|diminutive\s+of|short\s+form\s+of|feminine\s+form\s+of|masculine\s+form\s+of|form\s+of)\s+([A-Za-z][A-Za-z'\-]+)"
    )
    .unwrap();
}

/// Lowercased name → that record's origin, for every record with a real
/// origin claim.
pub type NameIndex = HashMap<String, OriginValue>;

/// Build the lookup index over the full record set.
pub fn build_name_index<'a>(records: impl Iterator<Item = &'a NameRecord>) -> NameIndex {
    let mut index = NameIndex::new();
    for record in records {
        if let Some(origin) = &record.origin {
            if !origin.is_placeholder() {
                // first occurrence wins, matching merge precedence
                index.entry(record.key()).or_insert_with(|| origin.clone());
            }
        }
    }
    index
}

/// Extract the referenced base name from an origin text, if any.
pub fn referenced_name(text: &str) -> Option<&str> {
    VARIANT_PHRASE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Replace a variant record's origin with its base name's origin.
/// Returns true when the origin was inherited.
pub fn resolve_variant(record: &mut NameRecord, index: &NameIndex) -> bool {
    let text = record.origin_text();
    let Some(base) = referenced_name(&text) else {
        return false;
    };

    let Some(base_origin) = index.get(&base.to_lowercase()) else {
        tracing::debug!(name = %record.name, base = base, "Variant base name not in store");
        return false;
    };

    if record.origin.as_ref() == Some(base_origin) {
        return false;
    }

    tracing::debug!(
        name = %record.name,
        base = base,
        inherited = %base_origin.as_text(),
        "Inherited origin from base name"
    );
    record.origin = Some(base_origin.clone());
    true
}
