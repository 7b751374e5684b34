use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::ids::{ProjectNumber, VersionNumber};
use crate::keys;

/// One appended version. Created once, never modified or deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionRecord {
    pub project: ProjectNumber,
    pub version: VersionNumber,
    pub content: Bytes,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    /// Fast-store key holding this version's content.
    pub fn content_key(&self) -> String {
        keys::content(self.project, self.version)
    }
}
