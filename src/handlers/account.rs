use crate::core::error::RegistrationError;
use crate::models::user::{Principal, RoleChoice, UserProfile};
use crate::navigation::routes::Route;
use crate::stores::queries::QueryClient;
use tracing::info;

/// Complete first-login registration for the caller.
///
/// The profile is saved before the role is assigned; if the role call fails
/// the profile stays and registration can be retried.
pub async fn register(
    queries: &QueryClient,
    caller: Option<&Principal>,
    name: &str,
    choice: RoleChoice,
) -> Result<UserProfile, RegistrationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RegistrationError::EmptyName);
    }
    let caller = caller.ok_or(RegistrationError::MissingIdentity)?;

    let profile = UserProfile { name: name.to_string() };
    queries.save_profile(profile.clone()).await?;
    queries.assign_role(caller.clone(), choice.backend_role()).await?;

    info!(principal = %caller, role = ?choice, "Registration complete");
    Ok(profile)
}

/// Drop every cached query so the next identity starts cold
pub fn logout(queries: &QueryClient) {
    queries.clear();
    info!("Logged out, query cache cleared");
}

pub fn dashboard_menu(is_admin: bool) -> Vec<Route> {
    let mut menu = vec![Route::Scan, Route::History, Route::Delivery];
    if is_admin {
        menu.extend([Route::AdminSessions, Route::AdminOverview]);
    }
    menu
}
