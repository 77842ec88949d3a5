use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a study item.
///
/// Identifiers are opaque strings; freshly minted ones are UUID v4 text.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct StudyItemId(String);

impl StudyItemId {
    /// Mints a new random `StudyItemId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a study session.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct StudySessionId(String);

impl StudySessionId {
    /// Mints a new random `StudySessionId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StudyItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudyItemId({})", self.0)
    }
}

impl fmt::Debug for StudySessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StudySessionId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for StudyItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for StudySessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

fn parse_opaque(s: &str, kind: &'static str) -> Result<String, ParseIdError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(ParseIdError { kind });
    }
    Ok(trimmed.to_owned())
}

impl FromStr for StudyItemId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_opaque(s, "StudyItemId").map(Self)
    }
}

impl FromStr for StudySessionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_opaque(s, "StudySessionId").map(Self)
    }
}

impl TryFrom<String> for StudyItemId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for StudySessionId {
    type Error = ParseIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_item_ids_are_unique() {
        let a = StudyItemId::generate();
        let b = StudyItemId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn item_id_from_str_trims() {
        let id: StudyItemId = "  abc  ".parse().unwrap();
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.to_string(), "abc");
    }

    #[test]
    fn item_id_from_str_rejects_blank() {
        assert!("   ".parse::<StudyItemId>().is_err());
    }

    #[test]
    fn session_id_from_str_rejects_empty() {
        let err = "".parse::<StudySessionId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse StudySessionId from string");
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id: StudySessionId = "s-1".parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"s-1\"");
        let back: StudySessionId = serde_json::from_str("\"s-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn blank_ids_are_rejected_when_deserializing() {
        assert!(serde_json::from_str::<StudyItemId>("\"\"").is_err());
        assert!(serde_json::from_str::<StudySessionId>("\"  \"").is_err());
    }
}
