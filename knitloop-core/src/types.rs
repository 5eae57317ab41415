//! Domain types shared by the loop runner and the spool.
//!
//! Work items are serialized as JSON (serde_json); configuration types live in
//! [`crate::config`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParseLoopTypeError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a work item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItemId(pub String);

impl WorkItemId {
    /// Id derived from a timestamp, e.g. `20261018T093015123456Z`.
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(at.format("%Y%m%dT%H%M%S%6fZ").to_string())
    }

    /// Non-empty and made only of `[A-Za-z0-9._-]`, so it is safe as a file name.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The category of pipeline state a loop reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopType {
    Projection,
    Initialize,
    RunManagement,
    Finishing,
    GarbageCollection,
    Housekeeping,
}

impl LoopType {
    pub const ALL: [LoopType; 6] = [
        LoopType::Projection,
        LoopType::Initialize,
        LoopType::RunManagement,
        LoopType::Finishing,
        LoopType::GarbageCollection,
        LoopType::Housekeeping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoopType::Projection => "projection",
            LoopType::Initialize => "initialize",
            LoopType::RunManagement => "run_management",
            LoopType::Finishing => "finishing",
            LoopType::GarbageCollection => "garbage_collection",
            LoopType::Housekeeping => "housekeeping",
        }
    }
}

impl fmt::Display for LoopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopType {
    type Err = ParseLoopTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoopType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseLoopTypeError(s.to_owned()))
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One unit of work for a loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemId,
    pub loop_type: LoopType,
    #[serde(default = "empty_object")]
    pub payload: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl WorkItem {
    /// A fresh, not yet reconciled item enqueued now.
    pub fn new(id: WorkItemId, loop_type: LoopType, payload: serde_json::Value) -> Self {
        Self {
            id,
            loop_type,
            payload,
            enqueued_at: Utc::now(),
            reconciled_at: None,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciled_at.is_some()
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
