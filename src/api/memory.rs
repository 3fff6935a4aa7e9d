use crate::api::gateway::Gateway;
use crate::core::error::GatewayError;
use crate::models::attendance::AttendanceRecord;
use crate::models::session::{Session, SessionId};
use crate::models::user::{Principal, UserProfile, UserRole};
use crate::utils::time::current_timestamp_nanos;
use crate::validation::payload::session_payload;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory gateway acting for a single caller.
///
/// Mirrors the server rules the client relies on (payload binding, one
/// record per user and session) and counts calls per operation.
pub struct MemoryGateway {
    caller: Principal,
    sessions: DashMap<SessionId, Session>,
    attendance: Mutex<Vec<AttendanceRecord>>,
    profiles: DashMap<Principal, UserProfile>,
    roles: DashMap<Principal, UserRole>,
    next_session_id: AtomicU64,
    calls: DashMap<&'static str, u64>,
    failures: DashMap<&'static str, String>,
}

impl MemoryGateway {
    pub fn new(caller: Principal) -> Self {
        Self {
            caller,
            sessions: DashMap::new(),
            attendance: Mutex::new(Vec::new()),
            profiles: DashMap::new(),
            roles: DashMap::new(),
            next_session_id: AtomicU64::new(1),
            calls: DashMap::new(),
            failures: DashMap::new(),
        }
    }

    pub fn shared(caller: Principal) -> Arc<Self> {
        Arc::new(Self::new(caller))
    }

    pub fn caller(&self) -> &Principal {
        &self.caller
    }

    /// Insert a session as if another client had created it
    pub fn insert_session(&self, session: Session) {
        self.next_session_id
            .fetch_max(session.id.saturating_add(1), Ordering::SeqCst);
        self.sessions.insert(session.id, session);
    }

    pub fn set_profile(&self, user: Principal, profile: UserProfile) {
        self.profiles.insert(user, profile);
    }

    pub fn set_role(&self, user: Principal, role: UserRole) {
        self.roles.insert(user, role);
    }

    pub fn record_attendance(&self, record: AttendanceRecord) {
        if let Ok(mut records) = self.attendance.lock() {
            records.push(record);
        }
    }

    /// Make every later call to `method` fail with `message`
    pub fn fail(&self, method: &'static str, message: &str) {
        self.failures.insert(method, message.to_string());
    }

    pub fn clear_failure(&self, method: &'static str) {
        self.failures.remove(method);
    }

    /// Number of calls made to `method` so far
    pub fn calls(&self, method: &str) -> u64 {
        self.calls.get(method).map(|entry| *entry.value()).unwrap_or(0)
    }

    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    fn enter(&self, method: &'static str) -> Result<(), GatewayError> {
        *self.calls.entry(method).or_insert(0) += 1;

        match self.failures.get(method) {
            Some(message) => Err(GatewayError::Rejected(message.value().clone())),
            None => Ok(()),
        }
    }

    fn role_of(&self, user: &Principal) -> UserRole {
        self.roles
            .get(user)
            .map(|entry| *entry.value())
            .unwrap_or(UserRole::Guest)
    }

    fn records_where<F>(&self, predicate: F) -> Vec<AttendanceRecord>
    where
        F: Fn(&AttendanceRecord) -> bool,
    {
        self.attendance
            .lock()
            .map(|records| records.iter().filter(|r| predicate(r)).cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, GatewayError> {
        self.enter("getCallerUserProfile")?;
        Ok(self.profiles.get(&self.caller).map(|entry| entry.value().clone()))
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), GatewayError> {
        self.enter("saveCallerUserProfile")?;
        self.profiles.insert(self.caller.clone(), profile);
        Ok(())
    }

    async fn get_caller_user_role(&self) -> Result<UserRole, GatewayError> {
        self.enter("getCallerUserRole")?;
        Ok(self.role_of(&self.caller))
    }

    async fn is_caller_admin(&self) -> Result<bool, GatewayError> {
        self.enter("isCallerAdmin")?;
        Ok(self.role_of(&self.caller).is_admin())
    }

    async fn assign_caller_user_role(
        &self,
        user: Principal,
        role: UserRole,
    ) -> Result<(), GatewayError> {
        self.enter("assignCallerUserRole")?;
        self.roles.insert(user, role);
        Ok(())
    }

    async fn create_session(
        &self,
        name: String,
        start_time: i64,
        end_time: i64,
    ) -> Result<Session, GatewayError> {
        self.enter("createSession")?;
        if end_time <= start_time {
            return Err(GatewayError::Rejected("Invalid session window".to_string()));
        }

        let id = self.next_session_id.fetch_add(1, Ordering::SeqCst);
        let session = Session::new(id, name, start_time, end_time, session_payload(id));
        self.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get_all_sessions(&self) -> Result<Vec<Session>, GatewayError> {
        self.enter("getAllSessions")?;
        let mut sessions: Vec<Session> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        sessions.sort_by_key(|s| s.id);
        Ok(sessions)
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, GatewayError> {
        self.enter("getSession")?;
        Ok(self.sessions.get(&session_id).map(|entry| entry.value().clone()))
    }

    async fn check_in(
        &self,
        session_id: SessionId,
        scanned_data: String,
    ) -> Result<(), GatewayError> {
        self.enter("checkIn")?;

        let session = self
            .sessions
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| GatewayError::Rejected("Session not found".to_string()))?;

        if session.qr_payload != scanned_data {
            return Err(GatewayError::Rejected("Invalid QR code for this session".to_string()));
        }

        let mut records = self
            .attendance
            .lock()
            .map_err(|_| GatewayError::Unavailable)?;

        if records
            .iter()
            .any(|r| r.user == self.caller && r.session_id == session_id)
        {
            return Err(GatewayError::Rejected("Already checked in to this session".to_string()));
        }

        records.push(AttendanceRecord::new(
            self.caller.clone(),
            session_id,
            current_timestamp_nanos(),
        ));
        Ok(())
    }

    async fn get_caller_attendance(&self) -> Result<Vec<AttendanceRecord>, GatewayError> {
        self.enter("getCallerAttendance")?;
        Ok(self.records_where(|r| r.user == self.caller))
    }

    async fn get_attendance_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        self.enter("getAttendanceForSession")?;
        Ok(self.records_where(|r| r.session_id == session_id))
    }

    async fn get_user_attendance(
        &self,
        user: Principal,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        self.enter("getUserAttendance")?;
        Ok(self.records_where(|r| r.user == user))
    }

    async fn get_user_profile(&self, user: Principal) -> Result<Option<UserProfile>, GatewayError> {
        self.enter("getUserProfile")?;
        Ok(self.profiles.get(&user).map(|entry| entry.value().clone()))
    }
}
