use crate::core::config::QrDisplayConfig;
use crate::core::error::{GatewayError, SessionFormError};
use crate::models::session::Session;
use crate::stores::queries::QueryClient;
use crate::utils::time::format_window;
use crate::validation::session_form::{validate_session, SessionForm, ValidatedSession};
use std::sync::Arc;
use tracing::{info, warn};

/// What a teacher sees for one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCard {
    pub id: u64,
    pub name: String,
    pub window: String,
    /// Copyable check-in code
    pub payload: String,
    /// Scannable image rendered by the external image service
    pub image_url: Option<String>,
}

/// Build the image-service URL for a payload
pub fn qr_image_url(
    service: &str,
    size: u32,
    payload: &str,
) -> Result<String, serde_urlencoded::ser::Error> {
    let query = serde_urlencoded::to_string([
        ("size", format!("{0}x{0}", size)),
        ("data", payload.to_string()),
    ])?;
    Ok(format!("{}?{}", service, query))
}

/// Teacher-side session creation and listing
pub struct SessionManager {
    queries: Arc<QueryClient>,
    qr_display: QrDisplayConfig,
}

impl SessionManager {
    pub fn new(queries: Arc<QueryClient>, qr_display: QrDisplayConfig) -> Self {
        Self { queries, qr_display }
    }

    /// Validate the form locally, then create. Invalid forms never reach the gateway.
    pub async fn create_from_form(&self, form: &SessionForm) -> Result<Session, SessionFormError> {
        let request = form.validate().inspect_err(|e| {
            warn!(error = %e, "Session form rejected");
        })?;
        self.submit(request).await
    }

    pub async fn create(
        &self,
        name: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<Session, SessionFormError> {
        let request = validate_session(name, start_time, end_time).inspect_err(|e| {
            warn!(error = %e, "Session request rejected");
        })?;
        self.submit(request).await
    }

    async fn submit(&self, request: ValidatedSession) -> Result<Session, SessionFormError> {
        let session = self.queries.create_session(request).await?;
        info!(session_id = session.id, payload = %session.qr_payload, "Session ready for check-in");
        Ok(session)
    }

    /// All sessions, latest start first
    pub async fn list(&self) -> Result<Vec<Session>, GatewayError> {
        let mut sessions = self.queries.all_sessions().await?;
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    pub fn card(&self, session: &Session) -> SessionCard {
        let image_url = qr_image_url(
            &self.qr_display.image_service,
            self.qr_display.image_size,
            &session.qr_payload,
        )
        .ok();

        SessionCard {
            id: session.id,
            name: session.name.clone(),
            window: format_window(session.start_time, session.end_time),
            payload: session.qr_payload.clone(),
            image_url,
        }
    }
}
