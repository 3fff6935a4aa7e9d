use crate::models::session::SessionId;
use crate::models::user::Principal;
use serde::{Deserialize, Serialize};

/// A single check-in, owned by the gateway
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub user: Principal,
    pub session_id: SessionId,
    /// Nanoseconds since the Unix epoch
    pub check_in_time: i64,
}

impl AttendanceRecord {
    pub fn new(user: Principal, session_id: SessionId, check_in_time: i64) -> Self {
        Self {
            user,
            session_id,
            check_in_time,
        }
    }
}
