//! Document and scene serialization.
//!
//! JSON is the interchange shape shared with the document store and the
//! renderer bridge. MessagePack snapshots are the compact form handed to
//! undo history and workers; they are encoded with field names so the
//! tagged node-props enum round-trips.

use crate::error::SnapshotResult;
use crate::model::Document;
use crate::scene::ExpandedScene;

impl Document {
    pub fn from_json(text: &str) -> SnapshotResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty-printed JSON with every table sorted by ID.
    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_snapshot(&self) -> SnapshotResult<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_snapshot(bytes: &[u8]) -> SnapshotResult<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl ExpandedScene {
    pub fn to_json(&self) -> SnapshotResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
