// ABOUTME: Timestamp release identifiers (14 digits, UTC, second precision).
// ABOUTME: Fixed width keeps lexicographic order equal to chronological order.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of digits in a release id (`YYYYMMDDHHMMSS`).
pub const RELEASE_ID_LEN: usize = 14;

const RELEASE_ID_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReleaseIdError {
    #[error("release id must be {RELEASE_ID_LEN} characters, got {0}")]
    WrongLength(usize),

    #[error("release id must be all digits: '{0}'")]
    NotNumeric(String),
}

/// Identifier of one release directory under `releases/`.
///
/// Ordering is plain string ordering, which matches chronological order
/// because every id has the same width.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReleaseId(String);

impl ReleaseId {
    pub fn parse(value: &str) -> Result<Self, ReleaseIdError> {
        if value.len() != RELEASE_ID_LEN {
            return Err(ReleaseIdError::WrongLength(value.len()));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ReleaseIdError::NotNumeric(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    /// Release id for the given instant.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(format_timestamp(at))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Format an instant the way release ids and revision log lines do.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(RELEASE_ID_FORMAT).to_string()
}

impl FromStr for ReleaseId {
    type Err = ReleaseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ReleaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_utc_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(ReleaseId::from_timestamp(at).as_str(), "20240309070501");
    }

    #[test]
    fn rejects_short_ids() {
        assert_eq!(
            ReleaseId::parse("2024030907050"),
            Err(ReleaseIdError::WrongLength(13))
        );
    }

    #[test]
    fn rejects_non_digits() {
        assert!(matches!(
            ReleaseId::parse("2024030907050x"),
            Err(ReleaseIdError::NotNumeric(_))
        ));
    }

    #[test]
    fn rejects_marker_names() {
        assert!(ReleaseId::parse("20240309070501.partial").is_err());
    }
}
