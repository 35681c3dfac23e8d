use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const LISTING_BULLET_COUNT: usize = 5;

/// Backend search terms guidance. Reported to the user, never enforced.
pub const SEARCH_TERMS_MAX_BYTES: usize = 250;

/// Structured marketing copy produced by one successful generation.
///
/// Field names on the wire follow the response schema (`searchTerms` is camelCase).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedListing {
    pub title: String,
    pub bullets: Vec<String>,
    pub description: String,
    pub search_terms: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ListingParseError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("response is not a JSON object")]
    NotAnObject,
    #[error("response is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error("expected exactly {expected} bullets, got {actual}")]
    BulletCount { expected: usize, actual: usize },
}

impl GeneratedListing {
    pub fn from_json_text(text: &str) -> Result<Self, ListingParseError> {
        let value: Value = serde_json::from_str(text.trim())?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ListingParseError> {
        let object = value.as_object().ok_or(ListingParseError::NotAnObject)?;
        let title = required_string(object, "title")?;
        let bullets = required_string_list(object, "bullets")?;
        if bullets.len() != LISTING_BULLET_COUNT {
            return Err(ListingParseError::BulletCount {
                expected: LISTING_BULLET_COUNT,
                actual: bullets.len(),
            });
        }
        let description = required_string(object, "description")?;
        let search_terms = required_string(object, "searchTerms")?;
        Ok(Self {
            title,
            bullets,
            description,
            search_terms,
        })
    }

    /// Text placed on the clipboard for one section; bullets are newline-joined.
    pub fn section_text(&self, section: ListingSection) -> String {
        match section {
            ListingSection::Title => self.title.clone(),
            ListingSection::Bullets => self.bullets.join("\n"),
            ListingSection::Description => self.description.clone(),
            ListingSection::SearchTerms => self.search_terms.clone(),
        }
    }

    pub fn search_terms_bytes(&self) -> usize {
        self.search_terms.len()
    }

    pub fn search_terms_within_budget(&self) -> bool {
        self.search_terms_bytes() <= SEARCH_TERMS_MAX_BYTES
    }
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, ListingParseError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ListingParseError::MissingField(field)),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(ListingParseError::InvalidField {
            field,
            expected: "a string",
        }),
    }
}

fn required_string_list(
    object: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, ListingParseError> {
    let rows = match object.get(field) {
        None | Some(Value::Null) => return Err(ListingParseError::MissingField(field)),
        Some(Value::Array(rows)) => rows,
        Some(_) => {
            return Err(ListingParseError::InvalidField {
                field,
                expected: "an array of strings",
            })
        }
    };
    rows.iter()
        .map(|row| {
            row.as_str()
                .map(str::to_string)
                .ok_or(ListingParseError::InvalidField {
                    field,
                    expected: "an array of strings",
                })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingSection {
    Title,
    Bullets,
    Description,
    SearchTerms,
}

impl ListingSection {
    pub const ALL: [ListingSection; 4] = [
        ListingSection::Title,
        ListingSection::Bullets,
        ListingSection::Description,
        ListingSection::SearchTerms,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            ListingSection::Title => "Product Title",
            ListingSection::Bullets => "5 Key Feature Bullets",
            ListingSection::Description => "Product Description",
            ListingSection::SearchTerms => "Backend Search Terms",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            ListingSection::Title => "title",
            ListingSection::Bullets => "bullets",
            ListingSection::Description => "description",
            ListingSection::SearchTerms => "search_terms",
        }
    }
}

impl fmt::Display for ListingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ListingSection {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "title" => Ok(ListingSection::Title),
            "bullets" | "bullet" | "features" => Ok(ListingSection::Bullets),
            "description" | "desc" => Ok(ListingSection::Description),
            "search_terms" | "searchterms" | "search" | "keywords" => {
                Ok(ListingSection::SearchTerms)
            }
            _ => Err(format!(
                "Unknown listing section '{}'. Expected one of: title, bullets, description, search_terms.",
                raw.trim()
            )),
        }
    }
}

/// Output schema declared on every generation request (Gemini `responseSchema` dialect).
pub fn listing_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "Optimized Amazon product title.",
            },
            "bullets": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "Exactly 5 feature bullet points.",
            },
            "description": {
                "type": "STRING",
                "description": "Detailed product description.",
            },
            "searchTerms": {
                "type": "STRING",
                "description": "Backend SEO keywords.",
            },
        },
        "required": ["title", "bullets", "description", "searchTerms"],
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{
        listing_response_schema, GeneratedListing, ListingParseError, ListingSection,
        LISTING_BULLET_COUNT,
    };

    const SAMPLE: &str = r#"{"title":"T","bullets":["a","b","c","d","e"],"description":"D","searchTerms":"S"}"#;

    #[test]
    fn parses_schema_conforming_payload() -> anyhow::Result<()> {
        let listing = GeneratedListing::from_json_text(SAMPLE)?;
        assert_eq!(listing.title, "T");
        assert_eq!(listing.bullets, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(listing.description, "D");
        assert_eq!(listing.search_terms, "S");
        Ok(())
    }

    #[test]
    fn serializes_with_wire_field_names() -> anyhow::Result<()> {
        let listing = GeneratedListing::from_json_text(SAMPLE)?;
        let value = serde_json::to_value(&listing)?;
        assert_eq!(value["searchTerms"], json!("S"));
        assert!(value.get("search_terms").is_none());
        Ok(())
    }

    #[test]
    fn rejects_non_json_text() {
        let err = GeneratedListing::from_json_text("Sure! Here is your listing.").unwrap_err();
        assert!(matches!(err, ListingParseError::InvalidJson(_)));

        let empty = GeneratedListing::from_json_text("").unwrap_err();
        assert!(matches!(empty, ListingParseError::InvalidJson(_)));
    }

    #[test]
    fn rejects_wrong_bullet_count() {
        let err = GeneratedListing::from_json_text(
            r#"{"title":"T","bullets":["a","b"],"description":"D","searchTerms":"S"}"#,
        )
        .unwrap_err();
        match err {
            ListingParseError::BulletCount { expected, actual } => {
                assert_eq!(expected, LISTING_BULLET_COUNT);
                assert_eq!(actual, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_missing_and_mistyped_fields() {
        let missing = GeneratedListing::from_json_text(
            r#"{"title":"T","bullets":["a","b","c","d","e"],"description":"D"}"#,
        )
        .unwrap_err();
        assert!(matches!(missing, ListingParseError::MissingField("searchTerms")));

        let mistyped = GeneratedListing::from_json_text(
            r#"{"title":7,"bullets":["a","b","c","d","e"],"description":"D","searchTerms":"S"}"#,
        )
        .unwrap_err();
        assert!(matches!(
            mistyped,
            ListingParseError::InvalidField { field: "title", .. }
        ));

        let not_object = GeneratedListing::from_json_text("[1,2,3]").unwrap_err();
        assert!(matches!(not_object, ListingParseError::NotAnObject));
    }

    #[test]
    fn section_text_joins_bullets_with_newlines() -> anyhow::Result<()> {
        let listing = GeneratedListing::from_json_text(SAMPLE)?;
        assert_eq!(listing.section_text(ListingSection::Bullets), "a\nb\nc\nd\ne");
        assert_eq!(listing.section_text(ListingSection::SearchTerms), "S");
        Ok(())
    }

    #[test]
    fn search_terms_budget_is_measured_in_bytes() -> anyhow::Result<()> {
        let mut listing = GeneratedListing::from_json_text(SAMPLE)?;
        assert!(listing.search_terms_within_budget());
        listing.search_terms = "é".repeat(126);
        assert_eq!(listing.search_terms_bytes(), 252);
        assert!(!listing.search_terms_within_budget());
        Ok(())
    }

    #[test]
    fn section_names_parse_loosely() {
        assert_eq!("Title".parse::<ListingSection>(), Ok(ListingSection::Title));
        assert_eq!(
            "search-terms".parse::<ListingSection>(),
            Ok(ListingSection::SearchTerms)
        );
        assert!("price".parse::<ListingSection>().is_err());
    }

    #[test]
    fn schema_requires_all_four_fields() {
        let schema = listing_response_schema();
        assert_eq!(
            schema["required"],
            json!(["title", "bullets", "description", "searchTerms"])
        );
        assert_eq!(schema["properties"]["bullets"]["type"], json!("ARRAY"));
        assert_eq!(
            schema["properties"]["bullets"]["items"]["type"],
            Value::String("STRING".to_string())
        );
    }
}
