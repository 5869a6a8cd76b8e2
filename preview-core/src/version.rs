//! Symbolic version tokens.
//!
//! A version path segment is either a literal version id or one of the
//! aliases `current`, `previous` and `latest`, which are looked up on the
//! owning application record.

use std::fmt;

use crate::entities::Application;

/// Parsed form of a requested version segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionToken {
    Current,
    Previous,
    Latest,
    Literal(String),
}

impl VersionToken {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "current" => Self::Current,
            "previous" => Self::Previous,
            "latest" => Self::Latest,
            other => Self::Literal(other.to_string()),
        }
    }

    /// The version id this token points at on `app`, before any existence
    /// check. Unset or empty aliases yield `None`; there is no fallback to
    /// another alias.
    pub fn candidate<'a>(&'a self, app: &'a Application) -> Option<&'a str> {
        let id = match self {
            Self::Current => app.current.as_deref(),
            Self::Previous => app.previous.as_deref(),
            Self::Latest => app.latest.as_deref(),
            Self::Literal(id) => Some(id.as_str()),
        }?;
        (!id.is_empty()).then_some(id)
    }
}

impl From<&str> for VersionToken {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Previous => f.write_str("previous"),
            Self::Latest => f.write_str("latest"),
            Self::Literal(id) => f.write_str(id),
        }
    }
}
