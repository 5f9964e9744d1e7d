//! Waiting on asynchronous platform requests
//!
//! Every mutating call against the platform answers with a request tracker.
//! [`poll_request`] reads that tracker once and classifies the record;
//! [`wait_for_request`] drives the poller on a fixed interval until the
//! request is terminal or the caller's deadline passes. Resource links on a
//! finished request are reduced to bare ids with [`resource_id_from_link`].

use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use altus_sdk::{RequestStatus, TrackRequests};

/// Interval between tracker polls unless a harness overrides it.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Deadline applied when a resource carries no `timeouts` configuration.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Load-balancer operations always use this fixed deadline.
pub const LOAD_BALANCER_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors from polling a tracked request to completion
#[derive(Error, Debug)]
pub enum WaitError {
    /// Transport or lookup failure while reading the tracker. Fatal: the
    /// wait loop does not retry transient errors.
    #[error(transparent)]
    Sdk(#[from] altus_sdk::Error),

    /// The platform reported the request `FAILED`; `message` is its text,
    /// verbatim and possibly empty.
    #[error("request failed: {message}")]
    RequestFailed { message: String },

    /// The platform reported a status outside the documented set.
    #[error("request returned unrecognized status {value:?}")]
    UnrecognizedStatus { value: String },

    /// The request was still in progress when the deadline passed.
    #[error("timed out after {waited:?} waiting for request {request_id}")]
    TimedOut { request_id: String, waited: Duration },

    /// A resource link on a finished request had no trailing identifier.
    #[error("malformed resource link {link:?}")]
    MalformedLink { link: String },
}

/// Classification of a single tracker read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still `IN_PROGRESS`; poll again after the interval.
    Pending,
    /// `FINISHED`; resource ids extracted from the record's links, in order.
    Finished(Vec<String>),
}

/// Polling policy for one tracked request
#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl WaitOptions {
    /// Default 5s interval with the given deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout,
        }
    }
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self::with_timeout(DEFAULT_OPERATION_TIMEOUT)
    }
}

/// Extract the trailing identifier from a resource link.
///
/// Links look like `/iaas/api/block-devices/<id>`; only the substring after
/// the last separator is the id. A link without a separator or with an
/// empty trailing segment is rejected rather than returned whole.
pub fn resource_id_from_link(link: &str) -> Result<&str, WaitError> {
    match link.rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => Ok(id),
        _ => Err(WaitError::MalformedLink {
            link: link.to_string(),
        }),
    }
}

/// Read a tracked request once and classify the record.
///
/// Read-only: polling an unchanged record twice yields the same outcome.
/// Everything except `IN_PROGRESS` and `FINISHED` is fatal here; retry
/// decisions belong to [`wait_for_request`].
pub async fn poll_request<T: TrackRequests + ?Sized>(
    tracker: &T,
    request_id: &str,
) -> Result<PollOutcome, WaitError> {
    let record = tracker.track(request_id).await?;

    match record.status.parse::<RequestStatus>() {
        Ok(RequestStatus::InProgress) => Ok(PollOutcome::Pending),
        Ok(RequestStatus::Failed) => Err(WaitError::RequestFailed {
            message: record.message.unwrap_or_default(),
        }),
        Ok(RequestStatus::Finished) => {
            let mut ids = Vec::with_capacity(record.resources.len());
            for link in &record.resources {
                ids.push(resource_id_from_link(link)?.to_string());
            }
            Ok(PollOutcome::Finished(ids))
        }
        Err(unknown) => Err(WaitError::UnrecognizedStatus { value: unknown.0 }),
    }
}

/// Poll a tracked request until it finishes, fails, or times out.
///
/// Polls immediately, then sleeps `poll_interval` between reads. Returns
/// the ordered resource ids on `FINISHED`; any fatal classification from
/// [`poll_request`] propagates unchanged. Once the deadline has passed no
/// further poll is issued.
pub async fn wait_for_request<T: TrackRequests + ?Sized>(
    tracker: &T,
    request_id: &str,
    opts: &WaitOptions,
) -> Result<Vec<String>, WaitError> {
    let started = Instant::now();
    loop {
        match poll_request(tracker, request_id).await? {
            PollOutcome::Finished(ids) => {
                info!(
                    "request {} finished with {} resource link(s)",
                    request_id,
                    ids.len()
                );
                return Ok(ids);
            }
            PollOutcome::Pending => {
                debug!("request {} still in progress", request_id);
                sleep(opts.poll_interval).await;
                if started.elapsed() >= opts.timeout {
                    return Err(WaitError::TimedOut {
                        request_id: request_id.to_string(),
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use test_case::test_case;

    use altus_sdk::{Error as SdkError, RequestTracker};

    use super::*;

    /// Fake tracker that replays a fixed script of poll responses and
    /// panics if polled after the script runs out.
    struct ScriptedTracker {
        script: Mutex<VecDeque<altus_sdk::Result<RequestTracker>>>,
        polls: AtomicUsize,
    }

    impl ScriptedTracker {
        fn new(script: Vec<altus_sdk::Result<RequestTracker>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                polls: AtomicUsize::new(0),
            }
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TrackRequests for ScriptedTracker {
        async fn track(&self, request_id: &str) -> altus_sdk::Result<RequestTracker> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| panic!("request {request_id} polled after script ended"))
        }
    }

    fn in_progress() -> altus_sdk::Result<RequestTracker> {
        Ok(RequestTracker {
            status: "IN_PROGRESS".to_string(),
            ..Default::default()
        })
    }

    fn finished(resources: &[&str]) -> altus_sdk::Result<RequestTracker> {
        Ok(RequestTracker {
            status: "FINISHED".to_string(),
            resources: resources.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    fn failed(message: Option<&str>) -> altus_sdk::Result<RequestTracker> {
        Ok(RequestTracker {
            status: "FAILED".to_string(),
            message: message.map(|s| s.to_string()),
            ..Default::default()
        })
    }

    fn opts(interval_secs: u64, timeout_secs: u64) -> WaitOptions {
        WaitOptions {
            poll_interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[test_case("/iaas/api/block-devices/bd-7", "bd-7")]
    #[test_case("/iaas/api/network/net-1", "net-1")]
    #[test_case("a/b/c/id-9", "id-9")]
    #[test_case("/id-alone", "id-alone")]
    fn link_yields_trailing_segment(link: &str, expected: &str) {
        assert_eq!(resource_id_from_link(link).unwrap(), expected);
    }

    #[test_case("no-separator")]
    #[test_case("/iaas/api/block-devices/")]
    #[test_case("")]
    fn malformed_link_is_rejected(link: &str) {
        let err = resource_id_from_link(link).unwrap_err();
        assert!(matches!(err, WaitError::MalformedLink { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn finishes_after_pending_polls() {
        let tracker = ScriptedTracker::new(vec![
            in_progress(),
            in_progress(),
            finished(&["/x/y/r1"]),
        ]);
        let started = Instant::now();

        let ids = wait_for_request(&tracker, "req-1", &opts(5, 60))
            .await
            .unwrap();

        assert_eq!(ids, vec!["r1"]);
        assert_eq!(tracker.polls(), 3);
        // two sleeps of the configured interval between the three polls
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_message_is_surfaced_verbatim() {
        let tracker =
            ScriptedTracker::new(vec![in_progress(), failed(Some("disk quota exceeded"))]);

        let err = wait_for_request(&tracker, "req-1", &opts(5, 60))
            .await
            .unwrap_err();

        match err {
            WaitError::RequestFailed { message } => assert_eq!(message, "disk quota exceeded"),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
        assert_eq!(tracker.polls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_with_no_message_is_still_fatal() {
        let tracker = ScriptedTracker::new(vec![failed(None)]);

        let err = wait_for_request(&tracker, "req-1", &opts(5, 60))
            .await
            .unwrap_err();

        match err {
            WaitError::RequestFailed { message } => assert_eq!(message, ""),
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_polling_once_the_deadline_passes() {
        // 12s deadline with a 5s interval: polls at 0s, 5s and 10s, then the
        // sleep carries the clock past the deadline. A fourth poll would
        // panic the scripted tracker.
        let tracker = ScriptedTracker::new(vec![in_progress(), in_progress(), in_progress()]);
        let started = Instant::now();

        let err = wait_for_request(&tracker, "req-slow", &opts(5, 12))
            .await
            .unwrap_err();

        match err {
            WaitError::TimedOut { request_id, waited } => {
                assert_eq!(request_id, "req-slow");
                assert!(waited >= Duration::from_secs(12));
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(tracker.polls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn unrecognized_status_is_fatal() {
        let tracker = ScriptedTracker::new(vec![Ok(RequestTracker {
            status: "UNKNOWN".to_string(),
            ..Default::default()
        })]);

        let err = wait_for_request(&tracker, "req-1", &opts(5, 60))
            .await
            .unwrap_err();

        match err {
            WaitError::UnrecognizedStatus { value } => assert_eq!(value, "UNKNOWN"),
            other => panic!("expected UnrecognizedStatus, got {other:?}"),
        }
        assert_eq!(tracker.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_errors_are_not_retried() {
        let tracker = ScriptedTracker::new(vec![Err(SdkError::Api {
            status: 502,
            message: "bad gateway".to_string(),
        })]);

        let err = wait_for_request(&tracker, "req-1", &opts(5, 60))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Sdk(SdkError::Api { status: 502, .. })));
        assert_eq!(tracker.polls(), 1);
    }

    #[tokio::test]
    async fn polling_a_finished_record_is_idempotent() {
        let tracker = ScriptedTracker::new(vec![
            finished(&["/iaas/api/networks/net-4"]),
            finished(&["/iaas/api/networks/net-4"]),
        ]);

        let first = poll_request(&tracker, "req-1").await.unwrap();
        let second = poll_request(&tracker, "req-1").await.unwrap();

        assert_eq!(first, PollOutcome::Finished(vec!["net-4".to_string()]));
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn resource_ids_keep_link_order() {
        let tracker = ScriptedTracker::new(vec![finished(&["/a/r1", "/b/r2", "/c/r3"])]);

        let outcome = poll_request(&tracker, "req-1").await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Finished(vec!["r1".to_string(), "r2".to_string(), "r3".to_string()])
        );
    }

    #[tokio::test]
    async fn malformed_link_on_finished_record_is_an_error() {
        let tracker = ScriptedTracker::new(vec![finished(&["/iaas/api/block-devices/"])]);

        let err = poll_request(&tracker, "req-1").await.unwrap_err();

        assert!(matches!(err, WaitError::MalformedLink { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn block_device_request_end_to_end() {
        let tracker = ScriptedTracker::new(vec![
            in_progress(),
            in_progress(),
            finished(&["/iaas/api/block-device/bd-1"]),
        ]);

        let ids = wait_for_request(&tracker, "op-123", &WaitOptions::default())
            .await
            .unwrap();

        assert_eq!(ids, vec!["bd-1"]);
        assert_eq!(tracker.polls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_deadline_still_polls_once() {
        let tracker = ScriptedTracker::new(vec![in_progress()]);

        let err = wait_for_request(&tracker, "req-1", &opts(5, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::TimedOut { .. }));
        assert_eq!(tracker.polls(), 1);
    }

    #[test]
    fn default_options_use_the_fixed_interval() {
        let defaults = WaitOptions::default();
        assert_eq!(defaults.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(defaults.timeout, DEFAULT_OPERATION_TIMEOUT);
    }
}
