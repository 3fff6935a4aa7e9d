use crate::core::error::GatewayError;
use crate::models::attendance::AttendanceRecord;
use crate::models::session::{Session, SessionId};
use crate::models::user::{Principal, UserProfile, UserRole};
use async_trait::async_trait;

/// The remote data service. Every call is made on behalf of the
/// authenticated caller; the client never implements server rules.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, GatewayError>;

    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), GatewayError>;

    async fn get_caller_user_role(&self) -> Result<UserRole, GatewayError>;

    async fn is_caller_admin(&self) -> Result<bool, GatewayError>;

    async fn assign_caller_user_role(
        &self,
        user: Principal,
        role: UserRole,
    ) -> Result<(), GatewayError>;

    async fn create_session(
        &self,
        name: String,
        start_time: i64,
        end_time: i64,
    ) -> Result<Session, GatewayError>;

    async fn get_all_sessions(&self) -> Result<Vec<Session>, GatewayError>;

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, GatewayError>;

    async fn check_in(
        &self,
        session_id: SessionId,
        scanned_data: String,
    ) -> Result<(), GatewayError>;

    async fn get_caller_attendance(&self) -> Result<Vec<AttendanceRecord>, GatewayError>;

    async fn get_attendance_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, GatewayError>;

    async fn get_user_attendance(
        &self,
        user: Principal,
    ) -> Result<Vec<AttendanceRecord>, GatewayError>;

    async fn get_user_profile(&self, user: Principal) -> Result<Option<UserProfile>, GatewayError>;
}
