use crate::console::commands::{Command, HELP};
use crate::core::error::{CheckInFlowError, GatewayError};
use crate::core::startup::resolve_gate_inputs;
use crate::core::state::AppState;
use crate::handlers::account::{dashboard_menu, register};
use crate::handlers::attendance::{history, inspect_user, session_overview};
use crate::handlers::check_in::{CheckInFlow, CheckInOutcome};
use crate::models::user::{Principal, RoleChoice};
use crate::navigation::gate::{AuthState, GateDecision, GateInputs, GateSequencer, ProfileState};
use crate::navigation::routes::{Access, Resolution, Route, RouteMount};
use crate::scanner::{ImageFileCamera, QrDecoder, QrScanner};
use crate::utils::time::{current_timestamp_nanos, format_date, format_time, format_window};
use crate::validation::session_form::SessionForm;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

const SPLASH_POLL: Duration = Duration::from_millis(50);

const LOGIN_PROMPT: &str =
    "Sign in with your identity provider, then restart with gateway.identity_token set";
const REGISTER_PROMPT: &str = "Welcome! Complete your profile: register <student|teacher> <name>";
const ACCESS_DENIED: &str = "Access denied: this page is for teachers only";

const DELIVERY_NOTES: &str = "\
Delivery Notes
  QR Attend ships as a console client and as an installable web app.
  Android: open the web app in Chrome, choose \"Add to Home screen\" or \"Install app\".
  A standalone APK can be produced by wrapping the web app in a Trusted Web Activity.";

/// Whether the read loop should keep going
#[derive(Debug, PartialEq, Eq)]
pub enum Step {
    Continue(Vec<String>),
    Quit,
}

/// Line-oriented front end over [`AppState`]
pub struct Console {
    state: AppState,
    gate: GateSequencer,
    inputs: GateInputs,
    route: Route,
    mount: RouteMount,
    check_in: CheckInFlow,
    started: Instant,
}

fn gateway_error(context: &str, e: &GatewayError) -> Vec<String> {
    vec![format!("{}: {}", context, e.user_message())]
}

fn outcome_lines(outcome: &CheckInOutcome) -> Vec<String> {
    let mut out = vec![outcome.title().to_string()];
    if let Some(name) = &outcome.session_name {
        out.push(name.clone());
    }
    out.push(outcome.message.clone());
    out
}

impl Console {
    pub fn new(state: AppState) -> Self {
        let gate = GateSequencer::new(
            state.session_storage.clone(),
            Duration::from_millis(state.config.navigation.splash_duration_ms),
        );
        let check_in = state.check_in_flow();

        Self {
            state,
            gate,
            inputs: GateInputs {
                auth: AuthState::Initializing,
                profile: ProfileState::Pending,
                role: Resolution::Pending,
            },
            route: Route::Dashboard,
            mount: RouteMount::new(Route::Dashboard),
            check_in,
            started: Instant::now(),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    fn now_ms(&self) -> i64 {
        self.started.elapsed().as_millis() as i64
    }

    /// Splash, identity resolution and the initial redirect
    pub async fn boot(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        let now = self.now_ms();
        if self.gate.evaluate(&self.inputs, None, now) == GateDecision::Splash {
            out.push("QR Attend".to_string());
        }

        out.extend(self.refresh_caller().await);

        loop {
            let (now, current) = (self.now_ms(), self.route);
            match self.gate.evaluate(&self.inputs, Some(current), now) {
                GateDecision::Splash => {
                    let wait = self.gate.splash_remaining(self.now_ms()).unwrap_or(SPLASH_POLL);
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
                GateDecision::Redirect(route) => {
                    out.extend(self.open(route).await);
                    break;
                }
                GateDecision::Stay => {
                    out.extend(self.open(current).await);
                    break;
                }
            }
        }

        out
    }

    /// Resolve the caller again; returns a notice when the profile lookup failed
    async fn refresh_caller(&mut self) -> Vec<String> {
        let resolved = resolve_gate_inputs(&self.state).await;
        self.inputs = resolved.inputs;
        resolved
            .notice
            .map(|message| vec![format!("Could not load your profile: {}", message)])
            .unwrap_or_default()
    }

    fn profile_unresolved(&self) -> bool {
        self.inputs.auth == AuthState::Authenticated && self.inputs.profile == ProfileState::Pending
    }

    /// Retry a profile lookup that failed earlier. Returns the output of a
    /// gate redirect when the retry settles where the caller belongs.
    async fn settle_caller(&mut self) -> Option<Vec<String>> {
        let mut out = self.refresh_caller().await;
        if self.profile_unresolved() {
            return (!out.is_empty()).then_some(out);
        }

        let (now, current) = (self.now_ms(), self.route);
        match self.gate.evaluate(&self.inputs, Some(current), now) {
            GateDecision::Redirect(route) => {
                out.extend(self.open(route).await);
                Some(out)
            }
            _ => None,
        }
    }

    pub async fn execute(&mut self, command: Command) -> Step {
        if matches!(command, Command::Quit) {
            return Step::Quit;
        }

        let mut lines = Vec::new();
        if self.profile_unresolved() {
            match self.settle_caller().await {
                Some(out) if !self.profile_unresolved() => return Step::Continue(out),
                Some(out) => lines = out,
                None => {}
            }
        }

        lines.extend(self.dispatch(command).await);
        Step::Continue(lines)
    }

    async fn dispatch(&mut self, command: Command) -> Vec<String> {
        match command {
            // Stops the loop in `execute`
            Command::Quit => Vec::new(),
            Command::Help => vec![HELP.to_string()],
            Command::Goto(path) => match Route::from_path(&path) {
                Some(route) => self.open(route).await,
                None => vec![format!("Page not found: {}", path)],
            },
            Command::Menu => self.open(Route::Dashboard).await,
            Command::History => self.open(Route::History).await,
            Command::Sessions => self.open(Route::AdminSessions).await,
            Command::CheckIn(code) => self.submit_code(&code).await,
            Command::ScanImage(path) => self.scan_image(&path).await,
            Command::Retry => {
                self.check_in.retry();
                vec!["Ready to scan".to_string()]
            }
            Command::Register { choice, name } => self.register_caller(choice, &name).await,
            Command::Create(form) => self.create_session(&form).await,
            Command::Overview(session_id) => match self.enter(Route::AdminOverview) {
                Some(lines) => lines,
                None => self.overview(session_id).await,
            },
            Command::Inspect(user) => match self.enter(Route::AdminOverview) {
                Some(lines) => lines,
                None => self.inspect(user).await,
            },
            Command::Logout => {
                self.state.sign_out();
                self.check_in.retry();
                self.inputs = GateInputs {
                    auth: AuthState::Anonymous,
                    profile: ProfileState::Absent,
                    role: Resolution::Pending,
                };
                self.open(Route::Login).await
            }
        }
    }

    /// Mount `route` if it is not already mounted and run its guard.
    /// `None` means the page may render.
    fn enter(&mut self, route: Route) -> Option<Vec<String>> {
        if self.route != route {
            self.route = route;
            self.mount = RouteMount::new(route);
        }

        match self.mount.check(&self.inputs.capabilities()) {
            Access::Allow => None,
            Access::Loading => Some(vec!["Loading...".to_string()]),
            Access::Blocked => Some(Vec::new()),
            Access::Redirect(target) => {
                debug!(from = route.path(), to = target.path(), "Route guard redirect");
                self.route = target;
                self.mount = RouteMount::new(target);
                Some(vec![format!("-> {}", target.path())])
            }
        }
    }

    async fn open(&mut self, route: Route) -> Vec<String> {
        let mut out = match self.enter(route) {
            None => Vec::new(),
            Some(lines) if self.route == route => return lines,
            Some(lines) => lines,
        };
        out.extend(self.render().await);
        out
    }

    async fn render(&self) -> Vec<String> {
        match self.route {
            Route::Login => vec![LOGIN_PROMPT.to_string()],
            Route::Register => vec![REGISTER_PROMPT.to_string()],
            Route::AccessDenied => vec![ACCESS_DENIED.to_string()],
            Route::Delivery => vec![DELIVERY_NOTES.to_string()],
            Route::Dashboard => self.dashboard().await,
            Route::Scan => self.scan_page(),
            Route::History => self.history_page().await,
            Route::AdminSessions => self.sessions().await,
            Route::AdminOverview => self.overview_all().await,
        }
    }

    async fn dashboard(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Ok(Some(profile)) = self.state.queries.caller_profile().await {
            out.push(format!("Welcome, {}", profile.name));
        }
        let is_admin = self.state.queries.is_caller_admin().await.unwrap_or(false);
        out.extend(dashboard_menu(is_admin).into_iter().map(|route| format!("  {}", route.path())));
        out
    }

    fn scan_page(&self) -> Vec<String> {
        match self.check_in.outcome() {
            Some(outcome) => vec![
                outcome.title().to_string(),
                outcome.message.clone(),
                "Type 'retry' to scan again".to_string(),
            ],
            None => vec!["Scan a session code: scan <image-path> or checkin <code>".to_string()],
        }
    }

    async fn submit_code(&mut self, code: &str) -> Vec<String> {
        if let Some(lines) = self.enter(Route::Scan) {
            return lines;
        }

        match self.check_in.submit_manual(code, current_timestamp_nanos()).await {
            Ok(None) => Vec::new(),
            Ok(Some(outcome)) => outcome_lines(outcome),
            Err(e) => vec![e.to_string()],
        }
    }

    /// Run the scanner over a still image and submit the first code it reads
    async fn scan_image(&mut self, path: &Path) -> Vec<String> {
        if let Some(lines) = self.enter(Route::Scan) {
            return lines;
        }
        if self.check_in.outcome().is_some() {
            return vec![CheckInFlowError::AwaitingRetry.to_string()];
        }

        let scanner_config = &self.state.config.scanner;
        let scanner = QrScanner::new(
            Arc::new(ImageFileCamera::new(path)),
            Arc::new(QrDecoder),
            scanner_config.options(),
        );

        let timeout = scanner_config.scan_timeout();
        let scanned = tokio::time::timeout(timeout, scanner.scan_once()).await;
        let data = match scanned {
            Ok(Ok(data)) => data,
            Ok(Err(e)) => return vec![e.to_string()],
            Err(_) => {
                scanner.stop().await;
                debug!(path = %path.display(), "No code found before scan timeout");
                return vec![format!("No QR code found in {}", path.display())];
            }
        };

        match self.check_in.submit_now(&data).await {
            Ok(outcome) => outcome_lines(outcome),
            Err(e) => vec![e.to_string()],
        }
    }

    async fn history_page(&self) -> Vec<String> {
        match history(&self.state.queries).await {
            Ok(entries) if entries.is_empty() => vec!["No check-ins yet".to_string()],
            Ok(entries) => entries
                .into_iter()
                .map(|e| {
                    format!(
                        "{}  {} {}",
                        e.session_name,
                        format_date(e.check_in_time),
                        format_time(e.check_in_time)
                    )
                })
                .collect(),
            Err(e) => gateway_error("Failed to load history", &e),
        }
    }

    async fn register_caller(&mut self, choice: RoleChoice, name: &str) -> Vec<String> {
        if let Some(lines) = self.enter(Route::Register) {
            return lines;
        }

        let identity = self.state.identity.clone();
        if let Err(e) = register(&self.state.queries, identity.as_ref(), name, choice).await {
            return vec![e.to_string()];
        }

        let mut out = self.refresh_caller().await;
        if !out.is_empty() {
            warn!("Profile lookup failed right after registration");
        }
        out.extend(self.open(Route::Dashboard).await);
        out
    }

    async fn sessions(&self) -> Vec<String> {
        let manager = self.state.session_manager();
        match manager.list().await {
            Ok(sessions) if sessions.is_empty() => vec!["No sessions yet".to_string()],
            Ok(sessions) => sessions
                .iter()
                .map(|session| {
                    let card = manager.card(session);
                    let mut line = format!(
                        "#{} {}  {}  code: {}",
                        card.id, card.name, card.window, card.payload
                    );
                    if let Some(url) = card.image_url {
                        line.push_str(&format!("\n    {}", url));
                    }
                    line
                })
                .collect(),
            Err(e) => gateway_error("Failed to load sessions", &e),
        }
    }

    async fn create_session(&mut self, form: &SessionForm) -> Vec<String> {
        if let Some(lines) = self.enter(Route::AdminSessions) {
            return lines;
        }

        let manager = self.state.session_manager();
        match manager.create_from_form(form).await {
            Ok(session) => {
                let card = manager.card(&session);
                vec![format!(
                    "Created #{} {}  {}  code: {}",
                    card.id, card.name, card.window, card.payload
                )]
            }
            Err(e) => vec![e.to_string()],
        }
    }

    async fn overview_all(&self) -> Vec<String> {
        let sessions = match self.state.queries.all_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => return gateway_error("Failed to load sessions", &e),
        };

        let mut out = Vec::with_capacity(sessions.len());
        for session in sessions {
            let count = match self.state.queries.session_attendance(session.id).await {
                Ok(records) => records.len().to_string(),
                Err(_) => "?".to_string(),
            };
            out.push(format!(
                "#{} {}  {}  attendees: {}",
                session.id,
                session.name,
                format_window(session.start_time, session.end_time),
                count
            ));
        }
        if out.is_empty() {
            out.push("No sessions yet".to_string());
        }
        out
    }

    async fn overview(&self, session_id: u64) -> Vec<String> {
        match session_overview(&self.state.queries, session_id).await {
            Ok(overview) => {
                let title = overview
                    .session
                    .as_ref()
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| format!("Session #{}", session_id));
                let mut out = vec![format!("{}  attendees: {}", title, overview.attendee_count())];
                out.extend(
                    overview
                        .records
                        .iter()
                        .map(|r| format!("  {}  {}", r.user, format_time(r.check_in_time))),
                );
                out
            }
            Err(e) => gateway_error("Failed to load attendance", &e),
        }
    }

    async fn inspect(&self, user: Principal) -> Vec<String> {
        match inspect_user(&self.state.queries, user).await {
            Ok(inspection) => {
                let name = inspection
                    .profile
                    .map(|p| p.name)
                    .unwrap_or_else(|| "(no profile)".to_string());
                let mut out = vec![format!(
                    "{}  {}  check-ins: {}",
                    inspection.user,
                    name,
                    inspection.records.len()
                )];
                out.extend(inspection.records.iter().map(|r| {
                    format!(
                        "  session #{}  {} {}",
                        r.session_id,
                        format_date(r.check_in_time),
                        format_time(r.check_in_time)
                    )
                }));
                out
            }
            Err(e) => gateway_error("Failed to load user", &e),
        }
    }
}
