use crate::api::gateway::Gateway;
use crate::core::error::GatewayError;
use crate::models::attendance::AttendanceRecord;
use crate::models::session::{Session, SessionId};
use crate::models::user::{Principal, UserProfile, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// JSON-RPC style client for the remote attendance gateway.
///
/// Each operation is a `POST {endpoint}/{method}` carrying a JSON object of
/// arguments. The gateway answers `{"ok": <value>}` or `{"err": "<message>"}`.
pub struct HttpGateway {
    client: reqwest::Client,
    endpoint: String,
    identity_token: Option<String>,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Reply<T> {
    Ok(T),
    Err(String),
}

impl HttpGateway {
    pub fn new(endpoint: String, identity_token: Option<String>, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            identity_token,
            timeout_ms,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        args: Value,
    ) -> Result<T, GatewayError> {
        debug!(method, "Gateway call");

        let mut request = self.client.post(self.method_url(method)).json(&args);
        if let Some(token) = &self.identity_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(method, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(method, status = status.as_u16(), "Gateway returned error status");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let reply = response
            .json::<Reply<T>>()
            .await
            .map_err(|e| self.transport_error(method, e))?;

        match reply {
            Reply::Ok(value) => Ok(value),
            Reply::Err(message) => {
                debug!(method, error = %message, "Gateway rejected call");
                Err(GatewayError::Rejected(message))
            }
        }
    }

    fn transport_error(&self, method: &str, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            warn!(method, timeout_ms = self.timeout_ms, "Gateway call timed out");
            GatewayError::Timeout(self.timeout_ms)
        } else if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            warn!(method, error = %e, "Gateway call failed");
            GatewayError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, GatewayError> {
        self.call("getCallerUserProfile", json!({})).await
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), GatewayError> {
        self.call("saveCallerUserProfile", json!({ "profile": profile })).await
    }

    async fn get_caller_user_role(&self) -> Result<UserRole, GatewayError> {
        self.call("getCallerUserRole", json!({})).await
    }

    async fn is_caller_admin(&self) -> Result<bool, GatewayError> {
        self.call("isCallerAdmin", json!({})).await
    }

    async fn assign_caller_user_role(
        &self,
        user: Principal,
        role: UserRole,
    ) -> Result<(), GatewayError> {
        self.call("assignCallerUserRole", json!({ "user": user, "role": role })).await
    }

    async fn create_session(
        &self,
        name: String,
        start_time: i64,
        end_time: i64,
    ) -> Result<Session, GatewayError> {
        self.call(
            "createSession",
            json!({ "name": name, "startTime": start_time, "endTime": end_time }),
        )
        .await
    }

    async fn get_all_sessions(&self) -> Result<Vec<Session>, GatewayError> {
        self.call("getAllSessions", json!({})).await
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Option<Session>, GatewayError> {
        self.call("getSession", json!({ "sessionId": session_id })).await
    }

    async fn check_in(
        &self,
        session_id: SessionId,
        scanned_data: String,
    ) -> Result<(), GatewayError> {
        self.call(
            "checkIn",
            json!({ "sessionId": session_id, "scannedData": scanned_data }),
        )
        .await
    }

    async fn get_caller_attendance(&self) -> Result<Vec<AttendanceRecord>, GatewayError> {
        self.call("getCallerAttendance", json!({})).await
    }

    async fn get_attendance_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        self.call("getAttendanceForSession", json!({ "sessionId": session_id })).await
    }

    async fn get_user_attendance(
        &self,
        user: Principal,
    ) -> Result<Vec<AttendanceRecord>, GatewayError> {
        self.call("getUserAttendance", json!({ "user": user })).await
    }

    async fn get_user_profile(&self, user: Principal) -> Result<Option<UserProfile>, GatewayError> {
        self.call("getUserProfile", json!({ "user": user })).await
    }
}
