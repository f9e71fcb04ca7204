// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three log sections of an upload, before a key is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sections {
    pub main: String,
    pub dmesg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<String>,
}

/// A stored upload, as returned by a fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBundle {
    pub key: String,
    pub main: String,
    pub dmesg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<String>,
    pub created_at: DateTime<Utc>, // stored with second precision
}

impl LogBundle {
    pub fn sections(&self) -> Sections {
        Sections {
            main: self.main.clone(),
            dmesg: self.dmesg.clone(),
            apps: self.apps.clone(),
        }
    }
}

/// What a client hands in on submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A raw log dump that still needs splitting.
    Raw(String),
    /// Anything that arrived as JSON.
    Structured(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub key: String,
}
