use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of leave a request is charged against.
///
/// Known types get their own variant; anything else is carried verbatim
/// (lower-cased) and receives the allocation configured for unknown types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, strum_macros::EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(from = "String", into = "String")]
pub enum LeaveType {
    Sick,
    Casual,
    Vacation,
    #[strum(default)]
    Other(String),
}

impl LeaveType {
    /// Types reported by the balance endpoint even when nothing has been booked yet.
    pub const KNOWN: [LeaveType; 3] = [LeaveType::Sick, LeaveType::Casual, LeaveType::Vacation];

    pub fn as_str(&self) -> &str {
        match self {
            LeaveType::Sick => "sick",
            LeaveType::Casual => "casual",
            LeaveType::Vacation => "vacation",
            LeaveType::Other(name) => name,
        }
    }

    /// Normalizes free text coming from clients or the database.
    pub fn normalize(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        LeaveType::from_str(&lowered).unwrap_or(LeaveType::Other(lowered))
    }
}

impl fmt::Display for LeaveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for LeaveType {
    fn from(value: String) -> Self {
        LeaveType::normalize(&value)
    }
}

impl From<LeaveType> for String {
    fn from(value: LeaveType) -> Self {
        value.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_ignore_case_and_whitespace() {
        assert_eq!(LeaveType::normalize("Sick"), LeaveType::Sick);
        assert_eq!(LeaveType::normalize(" CASUAL "), LeaveType::Casual);
        assert_eq!(LeaveType::normalize("vacation"), LeaveType::Vacation);
    }

    #[test]
    fn unknown_types_are_kept_lowercased() {
        assert_eq!(
            LeaveType::normalize("Sabbatical"),
            LeaveType::Other("sabbatical".to_string())
        );
        assert_eq!(LeaveType::normalize("Sabbatical").to_string(), "sabbatical");
    }

    #[test]
    fn str_conversion_is_derived_from_parsing() {
        assert_eq!(LeaveType::try_from("vacation").unwrap(), LeaveType::Vacation);
        assert_eq!(
            LeaveType::try_from("sabbatical").unwrap(),
            LeaveType::Other("sabbatical".to_string())
        );
        assert_eq!(LeaveType::from("Sick".to_string()), LeaveType::Sick);
    }

    #[test]
    fn serde_uses_plain_strings() {
        let parsed: LeaveType = serde_json::from_str("\"Casual\"").unwrap();
        assert_eq!(parsed, LeaveType::Casual);
        assert_eq!(serde_json::to_string(&LeaveType::Sick).unwrap(), "\"sick\"");
    }
}
