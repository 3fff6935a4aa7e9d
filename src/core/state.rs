// Application state (AppState)

use crate::api::gateway::Gateway;
use crate::core::config::Config;
use crate::handlers::check_in::CheckInFlow;
use crate::handlers::sessions::SessionManager;
use crate::models::user::Principal;
use crate::stores::{queries::QueryClient, session_storage::SessionStorage};
use std::sync::Arc;

/// Shared client state
///
/// Everything the console front end and its handlers need. Cloning is cheap,
/// all heavy members sit behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Cached queries and invalidating mutations over the gateway
    pub queries: Arc<QueryClient>,

    /// Per-run key/value flags (splash shown, ...)
    pub session_storage: Arc<SessionStorage>,

    /// Caller identity; `None` while signed out
    pub identity: Option<Principal>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, gateway: Arc<dyn Gateway>) -> Self {
        let identity = config.gateway.principal.clone().map(Principal::new);

        Self {
            queries: Arc::new(QueryClient::new(gateway)),
            session_storage: Arc::new(SessionStorage::new()),
            identity,
            config: Arc::new(config),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn check_in_flow(&self) -> CheckInFlow {
        CheckInFlow::new(Arc::clone(&self.queries))
    }

    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(Arc::clone(&self.queries), self.config.qr_display.clone())
    }

    /// Forget the caller and everything cached on their behalf
    pub fn sign_out(&mut self) {
        self.identity = None;
        crate::handlers::account::logout(&self.queries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryGateway;

    fn config(principal: Option<&str>) -> Config {
        let mut toml = String::from("[gateway]\nendpoint = \"http://127.0.0.1:4943/api\"\n");
        if let Some(principal) = principal {
            toml.push_str(&format!("identity_token = \"tok\"\nprincipal = \"{}\"\n", principal));
        }
        Config::from_toml(&toml).unwrap()
    }

    #[tokio::test]
    async fn test_identity_from_config() {
        let gateway = MemoryGateway::shared(Principal::new("me"));
        let state = AppState::new(config(Some("me")), gateway);
        assert!(state.is_authenticated());
        assert_eq!(state.identity, Some(Principal::new("me")));

        let anon = AppState::new(config(None), MemoryGateway::shared(Principal::new("x")));
        assert!(!anon.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_out_clears_identity_and_cache() {
        let gateway = MemoryGateway::shared(Principal::new("me"));
        let mut state = AppState::new(config(Some("me")), gateway);
        state.queries.all_sessions().await.unwrap();

        state.sign_out();

        assert!(!state.is_authenticated());
        assert!(state.queries.cache().is_empty());
    }
}
