//! Code-review change entity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Review state of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    New,
    Merged,
    Abandoned,
}

impl ChangeStatus {
    pub const ALL: [ChangeStatus; 3] = [ChangeStatus::New, ChangeStatus::Merged, ChangeStatus::Abandoned];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::New => "new",
            ChangeStatus::Merged => "merged",
            ChangeStatus::Abandoned => "abandoned",
        }
    }

    pub fn parse(s: &str) -> Option<ChangeStatus> {
        Self::ALL.into_iter().find(|st| st.as_str().eq_ignore_ascii_case(s))
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ChangeStatus::New)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change under review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Numeric change number
    pub id: u32,
    /// `I`-prefixed change key
    pub key: String,
    pub project: String,
    /// Short branch name, without `refs/heads/`
    pub branch: String,
    pub status: ChangeStatus,
    pub owner: String,
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub insertions: u32,
    #[serde(default)]
    pub deletions: u32,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl Entity for Change {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}
