use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::core::state::AppState;
use crate::models::user::UserRole;
use crate::navigation::gate::{AuthState, GateInputs, ProfileState};
use crate::navigation::routes::Resolution;

/// Gate inputs plus a message for the user when a lookup failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCaller {
    pub inputs: GateInputs,
    pub notice: Option<String>,
}

/// Resolve what the gate needs to know about the caller.
///
/// A failed profile lookup leaves the profile pending so the gate holds
/// its route until a later attempt succeeds. A failed role lookup resolves
/// to a non-admin role.
pub async fn resolve_gate_inputs(state: &AppState) -> ResolvedCaller {
    if !state.is_authenticated() {
        return ResolvedCaller {
            inputs: GateInputs {
                auth: AuthState::Anonymous,
                profile: ProfileState::Absent,
                role: Resolution::Pending,
            },
            notice: None,
        };
    }

    let mut notice = None;

    let profile = match state.queries.caller_profile().await {
        Ok(Some(_)) => ProfileState::Present,
        Ok(None) => ProfileState::Absent,
        Err(e) => {
            warn!(error = %e, "Failed to load caller profile, will retry");
            notice = Some(e.user_message());
            ProfileState::Pending
        }
    };

    let role = match state.queries.caller_role().await {
        Ok(role) => role,
        Err(e) => {
            warn!(error = %e, "Failed to load caller role, treating caller as non-admin");
            UserRole::Guest
        }
    };

    ResolvedCaller {
        inputs: GateInputs {
            auth: AuthState::Authenticated,
            profile,
            role: Resolution::Ready(role),
        },
        notice,
    }
}

/// Prime the session list and the caller's attendance; runs at boot
pub async fn warm_caches(state: &AppState) -> Result<()> {
    let sessions = state
        .queries
        .all_sessions()
        .await
        .context("Failed to fetch sessions from gateway")?;

    let attendance = state
        .queries
        .caller_attendance()
        .await
        .context("Failed to fetch caller attendance from gateway")?;

    info!(
        sessions = sessions.len(),
        check_ins = attendance.len(),
        cached_queries = state.queries.cache().len(),
        "Caches warmed from gateway"
    );

    Ok(())
}
