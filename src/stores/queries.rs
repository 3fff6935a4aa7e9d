use crate::api::gateway::Gateway;
use crate::core::error::GatewayError;
use crate::models::attendance::AttendanceRecord;
use crate::models::session::{Session, SessionId};
use crate::models::user::{Principal, UserProfile, UserRole};
use crate::stores::invalidation::Mutation;
use crate::stores::query_cache::{QueryCache, QueryData, QueryKey};
use crate::validation::session_form::ValidatedSession;
use std::sync::Arc;
use tracing::info;

/// Cached reads and invalidating writes over a [`Gateway`]
pub struct QueryClient {
    gateway: Arc<dyn Gateway>,
    cache: QueryCache,
}

fn mismatch(key: &QueryKey, data: QueryData) -> GatewayError {
    GatewayError::Decode(format!("cached value for {:?} has unexpected shape: {:?}", key, data))
}

impl QueryClient {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            cache: QueryCache::new(),
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    // Reads

    pub async fn all_sessions(&self) -> Result<Vec<Session>, GatewayError> {
        let key = QueryKey::AllSessions;
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.get_all_sessions().await.map(QueryData::Sessions)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Sessions(sessions) => Ok(sessions),
            other => Err(mismatch(&key, other)),
        }
    }

    /// Drop the cached session list and read it again from the gateway
    pub async fn refresh_sessions(&self) -> Result<Vec<Session>, GatewayError> {
        self.cache.invalidate_key(&QueryKey::AllSessions);
        self.all_sessions().await
    }

    pub async fn caller_attendance(&self) -> Result<Vec<AttendanceRecord>, GatewayError> {
        let key = QueryKey::CallerAttendance;
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.get_caller_attendance().await.map(QueryData::Attendance)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Attendance(records) => Ok(records),
            other => Err(mismatch(&key, other)),
        }
    }

    pub async fn session_attendance(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        let key = QueryKey::SessionAttendance(session_id);
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway
                .get_attendance_for_session(session_id)
                .await
                .map(QueryData::Attendance)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Attendance(records) => Ok(records),
            other => Err(mismatch(&key, other)),
        }
    }

    pub async fn caller_profile(&self) -> Result<Option<UserProfile>, GatewayError> {
        let key = QueryKey::CallerProfile;
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.get_caller_user_profile().await.map(QueryData::Profile)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Profile(profile) => Ok(profile),
            other => Err(mismatch(&key, other)),
        }
    }

    pub async fn caller_role(&self) -> Result<UserRole, GatewayError> {
        let key = QueryKey::CallerRole;
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.get_caller_user_role().await.map(QueryData::Role)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Role(role) => Ok(role),
            other => Err(mismatch(&key, other)),
        }
    }

    pub async fn is_caller_admin(&self) -> Result<bool, GatewayError> {
        let key = QueryKey::IsCallerAdmin;
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.is_caller_admin().await.map(QueryData::Flag)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Flag(is_admin) => Ok(is_admin),
            other => Err(mismatch(&key, other)),
        }
    }

    pub async fn user_attendance(
        &self,
        user: Principal,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        let key = QueryKey::UserAttendance(user.clone());
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.get_user_attendance(user).await.map(QueryData::Attendance)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Attendance(records) => Ok(records),
            other => Err(mismatch(&key, other)),
        }
    }

    pub async fn user_profile(&self, user: Principal) -> Result<Option<UserProfile>, GatewayError> {
        let key = QueryKey::UserProfile(user.clone());
        let gateway = Arc::clone(&self.gateway);
        let fetch = || async move {
            gateway.get_user_profile(user).await.map(QueryData::Profile)
        };
        match self.cache.fetch(key.clone(), fetch).await? {
            QueryData::Profile(profile) => Ok(profile),
            other => Err(mismatch(&key, other)),
        }
    }

    // Mutations

    pub async fn create_session(&self, request: ValidatedSession) -> Result<Session, GatewayError> {
        let session = self
            .gateway
            .create_session(request.name, request.start_time, request.end_time)
            .await?;

        self.cache.apply(Mutation::CreateSession);
        info!(session_id = session.id, name = %session.name, "Session created");
        Ok(session)
    }

    pub async fn check_in(
        &self,
        session_id: SessionId,
        scanned_data: String,
    ) -> Result<(), GatewayError> {
        self.gateway.check_in(session_id, scanned_data).await?;
        self.cache.apply(Mutation::CheckIn);
        Ok(())
    }

    pub async fn save_profile(&self, profile: UserProfile) -> Result<(), GatewayError> {
        self.gateway.save_caller_user_profile(profile).await?;
        self.cache.apply(Mutation::SaveProfile);
        Ok(())
    }

    pub async fn assign_role(&self, user: Principal, role: UserRole) -> Result<(), GatewayError> {
        self.gateway.assign_caller_user_role(user, role).await?;
        self.cache.apply(Mutation::AssignRole);
        Ok(())
    }

    /// Forget everything, e.g. on logout
    pub fn clear(&self) {
        self.cache.clear();
    }
}
