/*
[INPUT]:  Backend API schema definitions and serde requirements
[OUTPUT]: Typed Rust response structs with serialization support
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When API schema changes or new types added
*/

use serde::{Deserialize, Serialize};

/// Answer of the enqueue endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    /// Opaque token naming the progress record of the new job.
    #[serde(alias = "prg_file")]
    pub job_token: String,
}

/// Answer of the cancel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CancelResponse {
    /// The backend confirmed the job is (being) cancelled.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self.status.as_str(), "cancel" | "cancelled")
    }
}
