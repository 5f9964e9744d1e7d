//! Request-tracker types for asynchronous platform operations
//!
//! Every mutating call against the IaaS API answers with a tracker record.
//! The record stays `IN_PROGRESS` until the platform finishes the work, then
//! transitions exactly once to `FINISHED` or `FAILED` and never changes
//! again. Resource links appear only on `FINISHED`.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;

/// Status values a tracked request may report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    InProgress,
    Finished,
    Failed,
}

/// The platform reported a status string outside the documented set
#[derive(Error, Debug)]
#[error("unknown request status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(RequestStatus::InProgress),
            "FINISHED" => Ok(RequestStatus::Finished),
            "FAILED" => Ok(RequestStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Finished => "FINISHED",
            RequestStatus::Failed => "FAILED",
        })
    }
}

impl RequestStatus {
    /// True for `FINISHED` and `FAILED`; the record no longer changes.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::InProgress)
    }
}

/// One observation of an in-flight platform request.
///
/// `status` keeps the raw wire string; callers parse it through
/// [`RequestStatus`] so an unexpected value can be reported verbatim instead
/// of being lost in deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTracker {
    #[serde(default)]
    pub id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Source of request-tracker observations.
///
/// Implemented by [`ApiClient`](crate::client::ApiClient) against the real
/// platform and by scripted fakes in tests; polling loops are written
/// against this seam so they never care which one they are driving.
#[async_trait]
pub trait TrackRequests: Send + Sync {
    /// Fetch the current record for a tracked request. Read-only: fetching
    /// the same terminal record twice yields the same answer.
    async fn track(&self, request_id: &str) -> Result<RequestTracker>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_documented_status_strings() {
        assert_eq!(
            "IN_PROGRESS".parse::<RequestStatus>().unwrap(),
            RequestStatus::InProgress
        );
        assert_eq!(
            "FINISHED".parse::<RequestStatus>().unwrap(),
            RequestStatus::Finished
        );
        assert_eq!(
            "FAILED".parse::<RequestStatus>().unwrap(),
            RequestStatus::Failed
        );
    }

    #[test]
    fn unknown_status_keeps_the_wire_value() {
        let err = "CANCELLED".parse::<RequestStatus>().unwrap_err();
        assert_eq!(err.0, "CANCELLED");
        assert!(err.to_string().contains("CANCELLED"));
    }

    #[test]
    fn status_display_matches_wire_spelling() {
        for status in [
            RequestStatus::InProgress,
            RequestStatus::Finished,
            RequestStatus::Failed,
        ] {
            let round = status.to_string().parse::<RequestStatus>().unwrap();
            assert_eq!(round, status);
        }
    }

    #[test]
    fn terminal_states() {
        assert!(!RequestStatus::InProgress.is_terminal());
        assert!(RequestStatus::Finished.is_terminal());
        assert!(RequestStatus::Failed.is_terminal());
    }

    #[test]
    fn tracker_decodes_finished_record() {
        let tracker: RequestTracker = serde_json::from_value(serde_json::json!({
            "id": "req-7",
            "status": "FINISHED",
            "progress": 100,
            "resources": ["/iaas/api/block-devices/bd-42"]
        }))
        .unwrap();

        assert_eq!(tracker.id, "req-7");
        assert_eq!(tracker.status, "FINISHED");
        assert_eq!(tracker.resources, vec!["/iaas/api/block-devices/bd-42"]);
        assert!(tracker.message.is_none());
    }

    #[test]
    fn tracker_tolerates_minimal_record() {
        let tracker: RequestTracker =
            serde_json::from_value(serde_json::json!({ "status": "IN_PROGRESS" })).unwrap();
        assert!(tracker.resources.is_empty());
        assert!(tracker.progress.is_none());
    }
}
