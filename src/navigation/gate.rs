use crate::models::user::UserRole;
use crate::navigation::routes::{Capabilities, Resolution, Route};
use crate::stores::session_storage::SessionStorage;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Session storage key marking that the splash was already shown
pub const SPLASH_SHOWN_KEY: &str = "splashShown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Anonymous,
    Authenticated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileState {
    Pending,
    Absent,
    Present,
}

/// Externally supplied facts the sequencer reacts to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateInputs {
    pub auth: AuthState,
    pub profile: ProfileState,
    pub role: Resolution<UserRole>,
}

impl GateInputs {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            authenticated: self.auth == AuthState::Authenticated,
            has_profile: match self.profile {
                ProfileState::Pending => Resolution::Pending,
                ProfileState::Absent => Resolution::Ready(false),
                ProfileState::Present => Resolution::Ready(true),
            },
            role: self.role,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Splash,
    /// Render the current page, no navigation
    Stay,
    Redirect(Route),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SplashPhase {
    WaitingForAuth,
    Showing { since_ms: i64 },
    Done,
}

/// Root-level sequencing of splash, login, registration and landing.
///
/// Time is passed in by the caller (milliseconds, any monotonic origin).
/// Redirects are one-shot: after the first one the sequencer only stays.
pub struct GateSequencer {
    storage: Arc<SessionStorage>,
    splash_duration_ms: i64,
    splash: SplashPhase,
    navigated: bool,
}

impl GateSequencer {
    pub fn new(storage: Arc<SessionStorage>, splash_duration: Duration) -> Self {
        let splash = if storage.flag(SPLASH_SHOWN_KEY) {
            SplashPhase::Done
        } else {
            SplashPhase::WaitingForAuth
        };

        Self {
            storage,
            splash_duration_ms: splash_duration.as_millis() as i64,
            splash,
            navigated: false,
        }
    }

    pub fn showing_splash(&self) -> bool {
        self.splash != SplashPhase::Done
    }

    pub fn has_navigated(&self) -> bool {
        self.navigated
    }

    /// Time left before the splash may clear, if it is on its timer
    pub fn splash_remaining(&self, now_ms: i64) -> Option<Duration> {
        match self.splash {
            SplashPhase::Showing { since_ms } => {
                let left = (since_ms + self.splash_duration_ms - now_ms).max(0);
                Some(Duration::from_millis(left as u64))
            }
            _ => None,
        }
    }

    fn advance_splash(&mut self, auth: AuthState, now_ms: i64) {
        match self.splash {
            SplashPhase::WaitingForAuth if auth != AuthState::Initializing => {
                self.splash = SplashPhase::Showing { since_ms: now_ms };
                self.advance_splash(auth, now_ms);
            }
            SplashPhase::Showing { since_ms } if now_ms - since_ms >= self.splash_duration_ms => {
                self.storage.set_flag(SPLASH_SHOWN_KEY);
                self.splash = SplashPhase::Done;
                debug!("Splash cleared");
            }
            _ => {}
        }
    }

    pub fn evaluate(
        &mut self,
        inputs: &GateInputs,
        current: Option<Route>,
        now_ms: i64,
    ) -> GateDecision {
        self.advance_splash(inputs.auth, now_ms);
        if self.showing_splash() {
            return GateDecision::Splash;
        }

        if self.navigated || inputs.auth == AuthState::Initializing {
            return GateDecision::Stay;
        }

        let target = match (inputs.auth, inputs.profile) {
            (AuthState::Anonymous, _) => Some(Route::Login),
            (_, ProfileState::Pending) => None,
            (_, ProfileState::Absent) => Some(Route::Register),
            (_, ProfileState::Present) => match current {
                Some(Route::Login) | Some(Route::Register) => Some(Route::Dashboard),
                _ => None,
            },
        };

        match target {
            Some(route) => {
                self.navigated = true;
                info!(from = ?current, to = route.path(), "Gate redirect");
                GateDecision::Redirect(route)
            }
            None => GateDecision::Stay,
        }
    }
}
