//! Catalog entities.
//!
//! Field names follow the catalog's column names so rows and API payloads
//! share one JSON shape.

use serde::{Deserialize, Serialize};

/// Application identifier (a branch name or pull request id).
pub type AppId = String;

/// Version identifier (usually a revision hash).
pub type VersionId = String;

/// User identifier, matching the identity-provider login.
pub type UserId = String;

// ============================================================================
// APPLICATION
// ============================================================================

/// A tracked deployable unit with zero or more versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: AppId,
    pub owner: UserId,
    /// Version served for the `current` alias.
    pub current: Option<VersionId>,
    /// Version that was `current` before the last promotion.
    pub previous: Option<VersionId>,
    /// Most recently created version.
    pub latest: Option<VersionId>,
    /// When set, creating a version promotes it to `current`.
    #[serde(default)]
    pub autoupdate: bool,
}

impl Application {
    /// A freshly registered application without any versions.
    pub fn new(id: impl Into<AppId>, owner: impl Into<UserId>, autoupdate: bool) -> Self {
        Self {
            id: id.into(),
            owner: owner.into(),
            current: None,
            previous: None,
            latest: None,
            autoupdate,
        }
    }

    /// The record as it looks after `version` was promoted to current.
    pub fn promoted(&self, version: impl Into<VersionId>) -> Self {
        Self {
            previous: self.current.clone(),
            current: Some(version.into()),
            ..self.clone()
        }
    }

    /// Whether `version` is the one currently served.
    pub fn is_current(&self, version: &str) -> bool {
        self.current.as_deref() == Some(version)
    }
}

// ============================================================================
// VERSION
// ============================================================================

/// One deployed build of an application.
///
/// `seq` is assigned by the store on insert and orders versions newest
/// first; it is never chosen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub app: AppId,
    pub owner: UserId,
    #[serde(default)]
    pub seq: i64,
}

impl Version {
    pub fn new(
        app: impl Into<AppId>,
        id: impl Into<VersionId>,
        owner: impl Into<UserId>,
        seq: i64,
    ) -> Self {
        Self {
            id: id.into(),
            app: app.into(),
            owner: owner.into(),
            seq,
        }
    }
}

// ============================================================================
// USER
// ============================================================================

/// An authenticated identity-provider user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub avatar: Option<String>,
    /// Profile page URL.
    pub home: Option<String>,
}

impl User {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            avatar: None,
            home: None,
        }
    }
}

// ============================================================================
// THIRD PARTY TOKEN
// ============================================================================

/// An OAuth grant from a chat workspace installation, keyed by team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThirdPartyToken {
    pub team_id: String,
    pub access_token: String,
    #[serde(default)]
    pub scope: String,
    pub bot_user_id: Option<String>,
    pub bot_access_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promoted_shifts_current_into_previous() {
        let mut app = Application::new("pr-42", "octocat", false);
        app.current = Some("c1".to_string());

        let promoted = app.promoted("v2");

        assert_eq!(promoted.current.as_deref(), Some("v2"));
        assert_eq!(promoted.previous.as_deref(), Some("c1"));
        assert_eq!(promoted.id, "pr-42");
        assert!(promoted.is_current("v2"));
        assert!(!promoted.is_current("c1"));
    }

    #[test]
    fn test_promoted_from_empty_leaves_previous_unset() {
        let app = Application::new("main", "octocat", true);
        let promoted = app.promoted("abc123");
        assert_eq!(promoted.previous, None);
        assert_eq!(promoted.current.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_application_json_uses_column_names() -> Result<(), serde_json::Error> {
        let app = Application::new("feature-x", "octocat", false);
        let json = serde_json::to_value(&app)?;
        assert_eq!(json["id"], "feature-x");
        assert_eq!(json["owner"], "octocat");
        assert!(json["current"].is_null());
        assert_eq!(json["autoupdate"], false);
        Ok(())
    }

    #[test]
    fn test_autoupdate_defaults_to_false() -> Result<(), serde_json::Error> {
        let app: Application = serde_json::from_str(
            r#"{"id":"a","owner":"o","current":null,"previous":null,"latest":null}"#,
        )?;
        assert!(!app.autoupdate);
        Ok(())
    }
}
