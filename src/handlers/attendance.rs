use crate::core::error::GatewayError;
use crate::models::attendance::AttendanceRecord;
use crate::models::session::{Session, SessionId};
use crate::models::user::{Principal, UserProfile};
use crate::stores::queries::QueryClient;

pub const UNKNOWN_SESSION: &str = "Unknown Session";

/// One line of the caller's history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub session_id: SessionId,
    pub session_name: String,
    pub check_in_time: i64,
}

/// Attendance of a single session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOverview {
    pub session: Option<Session>,
    /// Oldest check-in first
    pub records: Vec<AttendanceRecord>,
}

impl SessionOverview {
    pub fn attendee_count(&self) -> usize {
        self.records.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInspection {
    pub user: Principal,
    pub profile: Option<UserProfile>,
    pub records: Vec<AttendanceRecord>,
}

fn session_name(sessions: &[Session], session_id: SessionId) -> String {
    sessions
        .iter()
        .find(|s| s.id == session_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| UNKNOWN_SESSION.to_string())
}

/// Caller's check-ins, newest first.
///
/// Records are still listed when the session list cannot be loaded; they
/// just carry the unknown-session label.
pub async fn history(queries: &QueryClient) -> Result<Vec<HistoryEntry>, GatewayError> {
    let mut records = queries.caller_attendance().await?;
    let sessions = queries.all_sessions().await.unwrap_or_default();

    records.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));
    Ok(records
        .into_iter()
        .map(|record| HistoryEntry {
            session_name: session_name(&sessions, record.session_id),
            session_id: record.session_id,
            check_in_time: record.check_in_time,
        })
        .collect())
}

pub async fn session_overview(
    queries: &QueryClient,
    session_id: SessionId,
) -> Result<SessionOverview, GatewayError> {
    let sessions = queries.all_sessions().await?;
    let mut records = queries.session_attendance(session_id).await?;
    records.sort_by_key(|r| r.check_in_time);

    Ok(SessionOverview {
        session: sessions.into_iter().find(|s| s.id == session_id),
        records,
    })
}

pub async fn inspect_user(
    queries: &QueryClient,
    user: Principal,
) -> Result<UserInspection, GatewayError> {
    let profile = queries.user_profile(user.clone()).await?;
    let mut records = queries.user_attendance(user.clone()).await?;
    records.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));

    Ok(UserInspection { user, profile, records })
}
