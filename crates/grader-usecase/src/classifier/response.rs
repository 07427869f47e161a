//! Classification service reply schema
//!
//! Accepted shapes:
//! - `{"matches": [...]}` or `{"matchedSolutions": [...]}`
//! - a bare array of matches
//! - `{"none": true, "reasons": {...}}`
//! - the bare word `none`
//!
//! Anything else is a typed error.

use serde::Deserialize;

use crate::error::ClassifierError;

/// One match as the service writes it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    pub action_id: String,
    pub category: String,
    #[serde(default)]
    pub affected_agents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierResponse {
    Matches(Vec<RawMatch>),
    /// Explicit "nothing applies"; reasons are for diagnostics only
    NoMatch { reasons: serde_json::Value },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Body {
    List(Vec<RawMatch>),
    Wrapped {
        #[serde(alias = "matchedSolutions")]
        matches: Vec<RawMatch>,
    },
    None {
        none: bool,
        #[serde(default)]
        reasons: serde_json::Value,
    },
}

/// Remove a surrounding ```json fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    text.trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

pub fn parse_response(text: &str) -> Result<ClassifierResponse, ClassifierError> {
    let body = strip_code_fence(text);
    if body.eq_ignore_ascii_case("none") {
        return Ok(ClassifierResponse::NoMatch {
            reasons: serde_json::Value::Null,
        });
    }

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ClassifierError::Parse(e.to_string()))?;
    let parsed: Body =
        serde_json::from_value(value).map_err(|e| ClassifierError::Schema(e.to_string()))?;

    match parsed {
        Body::List(matches) | Body::Wrapped { matches } => Ok(ClassifierResponse::Matches(matches)),
        Body::None { none: true, reasons } => Ok(ClassifierResponse::NoMatch { reasons }),
        Body::None { none: false, .. } => Err(ClassifierError::Schema(
            "\"none\" is false but no matches were given".to_string(),
        )),
    }
}
