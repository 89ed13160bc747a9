//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

/// Kind of change recorded in a playlist's activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "playlist_activity_action", rename_all = "snake_case")]
pub enum ActivityAction {
    Add,
    Delete,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityAction::Add => "add",
            ActivityAction::Delete => "delete",
        }
    }
}

impl TryFrom<&str> for ActivityAction {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "add" => Ok(ActivityAction::Add),
            "delete" => Ok(ActivityAction::Delete),
            _ => Err(()),
        }
    }
}

/// Result of toggling a like: the row was inserted or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeOutcome {
    Liked,
    Unliked,
}
