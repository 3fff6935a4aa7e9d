use crate::core::error::CheckInFlowError;
use crate::models::session::SessionWindow;
use crate::stores::queries::QueryClient;
use crate::utils::time::current_timestamp_nanos;
use crate::validation::payload::parse_session_payload;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MSG_INVALID_CODE: &str = "This QR code is not valid for attendance check-in";
pub const MSG_SESSION_NOT_FOUND: &str = "Session not found. The QR code may be expired or invalid.";
pub const MSG_NOT_STARTED: &str = "This session has not started yet";
pub const MSG_ENDED: &str = "This session has ended";
pub const MSG_CHECKED_IN: &str = "You have been successfully checked in";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckInStatus {
    Success,
    /// Business-rule or gateway failure
    Error,
    /// Not an attendance code, or no such session
    Invalid,
}

/// Terminal result of one check-in attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckInOutcome {
    pub status: CheckInStatus,
    pub message: String,
    pub session_name: Option<String>,
}

impl CheckInOutcome {
    fn success(session_name: &str) -> Self {
        Self {
            status: CheckInStatus::Success,
            message: MSG_CHECKED_IN.to_string(),
            session_name: Some(session_name.to_string()),
        }
    }

    fn error(message: impl Into<String>, session_name: Option<&str>) -> Self {
        Self {
            status: CheckInStatus::Error,
            message: message.into(),
            session_name: session_name.map(str::to_string),
        }
    }

    fn invalid(message: &str) -> Self {
        Self {
            status: CheckInStatus::Invalid,
            message: message.to_string(),
            session_name: None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.status {
            CheckInStatus::Success => "Check-in Successful",
            CheckInStatus::Error => "Check-in Failed",
            CheckInStatus::Invalid => "Invalid QR Code",
        }
    }
}

/// Run the check-in rules for one scanned or typed string.
///
/// First match wins: prefix and id format, session lookup in the cached
/// list, time window against `now` (ns), then the remote check-in.
pub async fn evaluate(queries: &QueryClient, scanned: &str, now: i64) -> CheckInOutcome {
    let session_id = match parse_session_payload(scanned) {
        Ok(id) => id,
        Err(e) => {
            info!(reason = ?e, "Rejected non-attendance code");
            return CheckInOutcome::invalid(MSG_INVALID_CODE);
        }
    };

    let mut sessions = match queries.all_sessions().await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!(session_id, error = %e, "Failed to load sessions for check-in");
            return CheckInOutcome::error(e.user_message(), None);
        }
    };

    // The cached list may predate sessions created elsewhere
    if !sessions.iter().any(|s| s.id == session_id) {
        debug!(session_id, "Session not in cached list, refreshing");
        match queries.refresh_sessions().await {
            Ok(fresh) => sessions = fresh,
            Err(e) => {
                warn!(session_id, error = %e, "Failed to refresh sessions for check-in");
                return CheckInOutcome::error(e.user_message(), None);
            }
        }
    }

    let Some(session) = sessions.into_iter().find(|s| s.id == session_id) else {
        info!(session_id, "Check-in for unknown session");
        return CheckInOutcome::invalid(MSG_SESSION_NOT_FOUND);
    };

    match session.window_at(now) {
        SessionWindow::NotStarted => {
            return CheckInOutcome::error(MSG_NOT_STARTED, Some(&session.name));
        }
        SessionWindow::Ended => {
            return CheckInOutcome::error(MSG_ENDED, Some(&session.name));
        }
        SessionWindow::Open => {}
    }

    match queries.check_in(session_id, scanned.to_string()).await {
        Ok(()) => {
            info!(session_id, session = %session.name, "Check-in successful");
            CheckInOutcome::success(&session.name)
        }
        Err(e) => {
            warn!(session_id, error = %e, "Check-in failed");
            CheckInOutcome::error(e.user_message(), Some(&session.name))
        }
    }
}

/// The scan page: at most one outcome is shown, and it stays until `retry`.
pub struct CheckInFlow {
    queries: Arc<QueryClient>,
    outcome: Option<CheckInOutcome>,
}

impl CheckInFlow {
    pub fn new(queries: Arc<QueryClient>) -> Self {
        Self {
            queries,
            outcome: None,
        }
    }

    pub fn outcome(&self) -> Option<&CheckInOutcome> {
        self.outcome.as_ref()
    }

    pub async fn submit(
        &mut self,
        scanned: &str,
        now: i64,
    ) -> Result<&CheckInOutcome, CheckInFlowError> {
        if self.outcome.is_some() {
            return Err(CheckInFlowError::AwaitingRetry);
        }

        let outcome = evaluate(&self.queries, scanned, now).await;
        Ok(self.outcome.insert(outcome))
    }

    /// Submit using the current wall-clock time
    pub async fn submit_now(&mut self, scanned: &str) -> Result<&CheckInOutcome, CheckInFlowError> {
        self.submit(scanned, current_timestamp_nanos()).await
    }

    /// Manual entry trims the code; blank input is ignored
    pub async fn submit_manual(
        &mut self,
        code: &str,
        now: i64,
    ) -> Result<Option<&CheckInOutcome>, CheckInFlowError> {
        let code = code.trim();
        if code.is_empty() {
            return Ok(None);
        }
        self.submit(code, now).await.map(Some)
    }

    /// Back to the initial state, ready for another scan
    pub fn retry(&mut self) {
        self.outcome = None;
    }
}
