//! Origin inference for "Unknown" records
//!
//! Tries, in priority order, stopping at the first hit:
//! 1. Explicit "from X" / "X origin" / "possibly X" phrases in the
//!    etymology text
//! 2. The record's primary country, via a fixed country→origin table
//! 3. Suffix/prefix heuristics on the name itself, the weaker ones gated
//!    by a corroborating signal (declared gender, usage country)
//!
//! No match is the intended terminal state: the record stays "Unknown".
//! Short all-caps tokens and error placeholders are protected up front and
//! never reclassified by heuristics.

use crate::models::NameRecord;

/// Origins recognizable from etymology phrases ("from latin", "latin origin")
const ETYMOLOGY_ORIGINS: &[(&str, &str)] = &[
    ("latin", "Latin"),
    ("greek", "Greek"),
    ("hebrew", "Hebrew"),
    ("arabic", "Arabic"),
    ("sanskrit", "Sanskrit,Indian"),
    ("spanish", "Spanish"),
    ("french", "French"),
    ("germanic", "Germanic"),
    ("italian", "Italian"),
    ("chinese", "Chinese"),
    ("japanese", "Japanese"),
    ("irish", "Irish"),
    ("slavic", "Slavic"),
    ("persian", "Persian"),
    ("african", "African"),
];

/// Weaker "possibly X" hints accepted from etymology text
const POSSIBLY_ORIGINS: &[(&str, &str)] = &[
    ("spanish", "Spanish"),
    ("slavic", "Slavic"),
    ("arabic", "Arabic"),
    ("french", "French"),
    ("italian", "Italian"),
];

/// Fixed country→origin mapping for primary usage countries
fn country_origin(code: &str) -> Option<&'static str> {
    let origin = match code {
        // Spanish-speaking countries (Portuguese-speaking grouped in)
        "ES" | "MX" | "AR" | "CL" | "PE" | "CO" | "UY" | "VE" | "EC" | "GT" | "CU" | "BO"
        | "DO" | "HN" | "PY" | "SV" | "NI" | "CR" | "PA" | "PR" | "BR" | "PT" => "Spanish",
        // African countries
        "NG" | "GH" | "ZA" | "BW" | "ET" | "KE" | "TZ" | "UG" | "ZW" | "MW" => "African",
        "IN" => "Sanskrit,Indian",
        // Arabic-speaking countries
        "SA" | "AE" | "EG" | "IQ" | "SY" | "JO" | "LB" | "KW" | "OM" | "QA" | "BH" | "YE"
        | "DZ" | "MA" | "TN" => "Arabic",
        "FR" => "French",
        "DE" | "AT" | "CH" => "Germanic",
        "CN" | "TW" => "Chinese",
        "JP" => "Japanese",
        "TH" | "VN" | "ID" | "MY" | "PH" => "Southeast Asian",
        "IT" => "Italian",
        "GR" => "Greek",
        "IE" => "Irish",
        "PL" | "CZ" | "SK" | "RU" | "UA" => "Slavic",
        "SE" | "NO" | "DK" | "FI" | "IS" => "Nordic",
        "IL" => "Hebrew",
        "TR" => "Turkish",
        "IR" => "Persian",
        _ => return None,
    };
    Some(origin)
}

/// True for 2–3 letter all-uppercase tokens — likely abbreviations or codes,
/// never to be reclassified by name-shape heuristics.
fn is_abbreviation(name: &str) -> bool {
    let len = name.chars().count();
    (2..=3).contains(&len) && name.chars().all(|c| c.is_ascii_uppercase())
}

/// Error markers that must stay "Unknown" no matter what a heuristic says
fn is_error_marker(origin_text: &str) -> bool {
    let t = origin_text.trim();
    t.eq_ignore_ascii_case("error") || t.eq_ignore_ascii_case("not a recognized name")
}

fn etymology_origin(etymology: &str) -> Option<&'static str> {
    let etym = etymology.to_lowercase();

    for (token, origin) in ETYMOLOGY_ORIGINS {
        if etym.contains(&format!("from {}", token)) || etym.contains(&format!("{} origin", token))
        {
            return Some(origin);
        }
    }
    for (token, origin) in POSSIBLY_ORIGINS {
        if etym.contains(&format!("possibly {}", token)) {
            return Some(origin);
        }
    }
    None
}

fn has_usage_country(record: &NameRecord, codes: &[&str]) -> bool {
    record
        .countries
        .as_ref()
        .map(|c| codes.iter().any(|code| c.contains_key(*code)))
        .unwrap_or(false)
}

fn name_pattern_origin(record: &NameRecord) -> Option<&'static str> {
    let lower = record.name.trim().to_lowercase();

    let ends_any = |suffixes: &[&str]| suffixes.iter().any(|s| lower.ends_with(s));
    let starts_any = |prefixes: &[&str]| prefixes.iter().any(|p| lower.starts_with(p));

    if ends_any(&["ez", "es", "az", "ito", "ita"]) {
        return Some("Spanish");
    }
    if ends_any(&["ski", "sky", "ov", "ova", "enko", "uk"]) {
        return Some("Slavic");
    }
    if ends_any(&["berg", "stein", "man", "mann", "feld", "schmidt"]) {
        return Some("Germanic");
    }
    if starts_any(&["al-", "abd", "muhammad", "ahmed"]) || ends_any(&["een", "uddin", "allah"]) {
        return Some("Arabic");
    }

    // The remaining endings are too common to trust alone; each needs a
    // corroborating signal.
    if lower.ends_with('o')
        && record.primary_country.as_deref() == Some("IT")
        && record.gender.map(|g| g.male > 0.7).unwrap_or(false)
    {
        return Some("Italian");
    }
    if ends_any(&["shi", "ko", "mi", "ro", "ta"]) && has_usage_country(record, &["JP", "SG", "HK"])
    {
        return Some("Japanese");
    }
    if ends_any(&["a", "an", "ash", "esh", "ish"]) && has_usage_country(record, &["IN"]) {
        return Some("Sanskrit,Indian");
    }

    None
}

/// Attempt origin inference for a record currently classified "Unknown".
///
/// Returns the inferred raw origin string, or `None` when the record should
/// stay "Unknown".
pub fn infer_origin(record: &NameRecord) -> Option<String> {
    if is_error_marker(&record.origin_text()) {
        return None;
    }

    // Priority 1: etymology text
    if let Some(etym) = record
        .meaning_etymology
        .as_deref()
        .or(record.meaning_full.as_deref())
    {
        if let Some(origin) = etymology_origin(etym) {
            return Some(origin.to_string());
        }
    }

    // Priority 2: primary country mapping
    if let Some(code) = record.primary_country.as_deref() {
        if let Some(origin) = country_origin(code) {
            return Some(origin.to_string());
        }
    }

    // Priority 3: name shape heuristics. Abbreviation-like tokens are
    // protected here: a name ending alone is never enough evidence for them.
    if is_abbreviation(record.name.trim()) {
        return None;
    }
    name_pattern_origin(record).map(|o| o.to_string())
}
