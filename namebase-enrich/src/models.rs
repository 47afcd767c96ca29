//! Record model for the sharded name store
//!
//! One `NameRecord` per distinct name. The on-disk JSON uses camelCase field
//! names and has accumulated fields from several generations of scripts, so
//! every optional field is skipped when absent and unrecognized fields are
//! captured in a flattened map — a record must survive a load/save cycle
//! byte-compatible in content even when this code doesn't know all its fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel values that must never overwrite real data during merge
const PLACEHOLDERS: &[&str] = &["unknown", "error", "not a recognized name", "n/a"];

/// Raw origin claim: free text, either a single (possibly compound) string
/// or an array of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OriginValue {
    One(String),
    Many(Vec<String>),
}

impl OriginValue {
    /// All origin components, in order
    pub fn components(&self) -> Vec<&str> {
        match self {
            OriginValue::One(s) => vec![s.as_str()],
            OriginValue::Many(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }

    /// Single display string; arrays joined with ", "
    pub fn as_text(&self) -> String {
        match self {
            OriginValue::One(s) => s.clone(),
            OriginValue::Many(v) => v.join(", "),
        }
    }

    /// True when every component is empty or a placeholder sentinel
    pub fn is_placeholder(&self) -> bool {
        self.components().iter().all(|c| is_placeholder(c))
    }
}

impl From<String> for OriginValue {
    fn from(s: String) -> Self {
        OriginValue::One(s)
    }
}

impl From<&str> for OriginValue {
    fn from(s: &str) -> Self {
        OriginValue::One(s.to_string())
    }
}

/// Gender probability weights; both keys are always written
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenderWeights {
    #[serde(rename = "Male", default)]
    pub male: f64,
    #[serde(rename = "Female", default)]
    pub female: f64,
}

/// One record of the name store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameRecord {
    /// Display name; unique key (case-insensitive) in the merged store
    pub name: String,

    /// Name before any casing normalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    /// Raw origin claim(s); free text, possibly compound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<OriginValue>,

    /// Alternate origins array kept by some sources
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub origins: Vec<String>,

    /// Canonical UI filter bucket, derived by consolidation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_group: Option<String>,

    /// Descriptive modifiers split out of the origin ("Biblical", "Modern");
    /// set semantics, no duplicates
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<GenderWeights>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_short: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_full: Option<String>,

    /// Distinct meanings; `meanings[0]` mirrors `meaning_full` when both exist
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub meanings: Vec<String>,

    /// Etymology/description free text, mined by origin inference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_etymology: Option<String>,

    /// Dominant usage country, ISO 3166-1 alpha-2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_country: Option<String>,

    /// Per-country usage weights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countries: Option<Map<String, Value>>,

    /// An enrichment pass has supplied meaning data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_processed: Option<bool>,

    /// An enrichment pass has supplied origin data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_processed: Option<bool>,

    // Provenance metadata; informational only, never drives merge decisions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched_with: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_enriched: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_source: Option<String>,

    /// Blog cross-reference payload; scalar object or array of them.
    /// Merge appends, never overwrites.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blog_enrichment: Option<Value>,

    /// Everything else, passed through untouched for round-tripping
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NameRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Case-insensitive dedup/merge key
    pub fn key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Origin as display text, or empty string when absent
    pub fn origin_text(&self) -> String {
        self.origin.as_ref().map(|o| o.as_text()).unwrap_or_default()
    }

    /// True when the record still needs an enrichment pass
    pub fn needs_enrichment(&self) -> bool {
        !self.meaning_processed.unwrap_or(false) || !self.origin_processed.unwrap_or(false)
    }

    /// Add a tag unless already present (set semantics)
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }
}

/// True for empty strings and the placeholder sentinels
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str())
}

/// True when the optional string holds real (non-placeholder) content
pub fn has_real_value(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !is_placeholder(v)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("  "));
        assert!(is_placeholder("Unknown"));
        assert!(is_placeholder("unknown"));
        assert!(is_placeholder("Error"));
        assert!(is_placeholder("Not a recognized name"));
        assert!(!is_placeholder("Latin"));
        assert!(!is_placeholder("moon"));
    }

    #[test]
    fn origin_value_accepts_string_and_array() {
        let one: OriginValue = serde_json::from_str(r#""Spanish, Biblical""#).unwrap();
        assert_eq!(one.as_text(), "Spanish, Biblical");

        let many: OriginValue = serde_json::from_str(r#"["Hebrew", "Biblical"]"#).unwrap();
        assert_eq!(many.components(), vec!["Hebrew", "Biblical"]);
        assert_eq!(many.as_text(), "Hebrew, Biblical");
    }

    #[test]
    fn unknown_fields_round_trip() {
        let raw = r#"{
            "name": "Luna",
            "origin": "Latin",
            "popularityRank": 12,
            "syllables": {"count": 2}
        }"#;
        let record: NameRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.name, "Luna");
        assert_eq!(record.extra.get("popularityRank"), Some(&Value::from(12)));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["popularityRank"], Value::from(12));
        assert_eq!(back["syllables"]["count"], Value::from(2));
        // absent optionals stay absent
        assert!(back.get("meaningFull").is_none());
        assert!(back.get("tags").is_none());
    }

    #[test]
    fn gender_keys_serialize_with_canonical_names() {
        let record = NameRecord {
            name: "Rowan".into(),
            gender: Some(GenderWeights {
                male: 0.55,
                female: 0.45,
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["gender"]["Male"], Value::from(0.55));
        assert_eq!(value["gender"]["Female"], Value::from(0.45));
    }

    #[test]
    fn needs_enrichment_until_both_flags_set() {
        let mut record = NameRecord::new("Aria");
        assert!(record.needs_enrichment());
        record.meaning_processed = Some(true);
        assert!(record.needs_enrichment());
        record.origin_processed = Some(true);
        assert!(!record.needs_enrichment());
    }
}
