//! Origin group classification rules
//!
//! An explicit ordered table of `(matcher, group)` rules evaluated top-down;
//! the first matching rule wins. The order is load-bearing: downstream UI
//! filter counts depend on this exact bucketing, so rules must not be
//! reordered or "improved". Examples of order dependence: "old english" is
//! claimed by "Greek & Mythological" and "modern english" by "Contemporary"
//! before the general "English" rule can see them.
//!
//! A non-empty origin matching no rule is not an error: it passes through
//! verbatim as its own (open) group for later review. Empty and placeholder
//! origins classify as "Unknown".

use crate::models::{self, NameRecord, OriginValue};

/// Group assigned to empty/placeholder origins
pub const UNKNOWN_GROUP: &str = "Unknown";

/// One classification rule: exact whole-string tokens and substring
/// patterns, all matched against the lowercased origin text.
pub struct OriginRule {
    pub group: &'static str,
    pub exact: &'static [&'static str],
    pub substrings: &'static [&'static str],
}

impl OriginRule {
    fn matches(&self, lower: &str) -> bool {
        self.exact.iter().any(|t| *t == lower)
            || self.substrings.iter().any(|t| lower.contains(t))
    }
}

/// The classification table. Order is part of the contract.
pub const ORIGIN_RULES: &[OriginRule] = &[
    // Shared Gaelic heritage
    OriginRule {
        group: "Scottish & Irish",
        exact: &["scottish", "irish", "scots", "gaelic", "celtic"],
        substrings: &["scottish", "irish", "scots", "gaelic", "celtic"],
    },
    OriginRule {
        group: "Slavic",
        exact: &[
            "slavic",
            "polish",
            "russian",
            "bulgarian",
            "czech",
            "ukrainian",
            "croatian",
            "serbian",
            "slovak",
            "belarusian",
        ],
        substrings: &["slavic", "polish", "russian"],
    },
    OriginRule {
        group: "Germanic & Nordic",
        exact: &[
            "germanic",
            "german",
            "swiss",
            "norse",
            "old norse",
            "scandinavian",
            "nordic",
            "swedish",
            "danish",
            "norwegian",
            "finnish",
            "icelandic",
        ],
        substrings: &[
            "germanic",
            "german",
            "norse",
            "scandinavian",
            "nordic",
            "swedish",
            "danish",
            "norwegian",
            "finnish",
        ],
    },
    OriginRule {
        group: "Hebrew & Biblical",
        exact: &["hebrew", "biblical"],
        substrings: &["hebrew", "biblical"],
    },
    OriginRule {
        group: "Greek & Mythological",
        exact: &["greek", "mythological", "egyptian", "old english"],
        substrings: &["greek", "mythological", "egyptian"],
    },
    OriginRule {
        group: "Contemporary",
        exact: &[
            "contemporary",
            "latin american",
            "invented",
            "american",
            "literary",
            "modern",
            "modern english",
            "fantasy",
            "fictional",
        ],
        substrings: &["contemporary", "invented", "literary", "fantasy"],
    },
    OriginRule {
        group: "Middle Eastern",
        exact: &["middle eastern", "caucasian", "aramaic", "turkic"],
        substrings: &["middle eastern", "caucasian", "aramaic"],
    },
    OriginRule {
        group: "African",
        exact: &[],
        substrings: &["african", "swahili", "yoruba", "igbo", "akan", "hausa"],
    },
    // South Asian languages; see classify() for the "indian" special case
    OriginRule {
        group: "South Asian",
        exact: &[
            "sanskrit",
            "hindi",
            "bengali",
            "punjabi",
            "tamil",
            "urdu",
            "telugu",
            "kannada",
            "gujarati",
            "marathi",
            "malayalam",
            "nepali",
            "pali",
            "sikh",
            "hindu",
            "south asian",
        ],
        substrings: &[
            "sanskrit",
            "hindi",
            "bengali",
            "punjabi",
            "tamil",
            "urdu",
            "telugu",
            "kannada",
            "gujarati",
            "marathi",
            "malayalam",
            "nepali",
            "sikh",
            "hindu",
        ],
    },
    OriginRule {
        group: "Southeast Asian",
        exact: &[],
        substrings: &[
            "vietnamese",
            "thai",
            "indonesian",
            "malay",
            "filipino",
            "burmese",
            "tagalog",
        ],
    },
    OriginRule {
        group: "Central/West Asian",
        exact: &[],
        substrings: &[
            "persian",
            "armenian",
            "georgian",
            "kazakh",
            "uzbek",
            "azerbaijani",
        ],
    },
    OriginRule {
        group: "European (Other)",
        exact: &[],
        substrings: &[
            "albanian",
            "basque",
            "estonian",
            "latvian",
            "lithuanian",
            "maltese",
        ],
    },
    OriginRule {
        group: "Indigenous & Oceanic",
        exact: &[],
        substrings: &[
            "maori",
            "aboriginal",
            "polynesian",
            "hawaiian",
            "native",
            "indigenous",
            "cherokee",
            "navajo",
        ],
    },
    // Trailing normalization rules: collapse leftover compounds onto the
    // big single-language groups the table above does not claim.
    OriginRule {
        group: "English",
        exact: &[],
        substrings: &["english"],
    },
    OriginRule {
        group: "Arabic",
        exact: &[],
        substrings: &["arabic"],
    },
    OriginRule {
        group: "Spanish",
        exact: &[],
        substrings: &["spanish"],
    },
    OriginRule {
        group: "French",
        exact: &[],
        substrings: &["french"],
    },
];

/// Classify one origin string against the table. Returns the first matching
/// group, or `None` when no rule fires (pass-through case).
pub fn classify(origin_text: &str) -> Option<&'static str> {
    let lower = origin_text.trim().to_lowercase();
    for rule in ORIGIN_RULES {
        if rule.matches(&lower) {
            // South Asian language plus an explicit "indian" mention is
            // bucketed as Indian; observed legacy precedence, keep as is.
            if rule.group == "South Asian" && lower.contains("indian") {
                return Some("Indian");
            }
            return Some(rule.group);
        }
    }
    None
}

/// Classify a record's origin into exactly one group string.
///
/// Arrays are classified over their joined text, so a single record always
/// collapses to one bucket. No match passes the original text through
/// verbatim; empty or placeholder origins classify as "Unknown".
pub fn classify_record(record: &NameRecord) -> String {
    let origin = match &record.origin {
        Some(o) => o,
        None if !record.origins.is_empty() => {
            return classify_text(&record.origins.join(", "));
        }
        None => return UNKNOWN_GROUP.to_string(),
    };

    if origin.is_placeholder() {
        return UNKNOWN_GROUP.to_string();
    }

    classify_text(&origin.as_text())
}

fn classify_text(text: &str) -> String {
    let trimmed = text.trim();
    if models::is_placeholder(trimmed) {
        return UNKNOWN_GROUP.to_string();
    }
    match classify(trimmed) {
        Some(group) => group.to_string(),
        None => trimmed.to_string(),
    }
}
