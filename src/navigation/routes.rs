use crate::models::user::UserRole;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Scan,
    History,
    Delivery,
    AdminSessions,
    AdminOverview,
    AccessDenied,
}

/// Capability a route demands from the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    /// Authenticated with a saved profile
    Registered,
    Admin,
}

/// Route table: path and required capability, resolved once per navigation
pub const ROUTES: &[(Route, &str, Requirement)] = &[
    (Route::Login, "/login", Requirement::Public),
    (Route::Register, "/register", Requirement::Authenticated),
    (Route::Dashboard, "/", Requirement::Registered),
    (Route::Scan, "/scan", Requirement::Registered),
    (Route::History, "/history", Requirement::Registered),
    (Route::Delivery, "/delivery", Requirement::Authenticated),
    (Route::AdminSessions, "/admin/sessions", Requirement::Admin),
    (Route::AdminOverview, "/admin/overview", Requirement::Admin),
    (Route::AccessDenied, "/access-denied", Requirement::Public),
];

impl Route {
    pub fn path(self) -> &'static str {
        ROUTES
            .iter()
            .find(|(route, _, _)| *route == self)
            .map(|(_, path, _)| *path)
            .unwrap_or("/")
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        ROUTES
            .iter()
            .find(|(_, candidate, _)| *candidate == path)
            .map(|(route, _, _)| *route)
    }

    pub fn requirement(self) -> Requirement {
        ROUTES
            .iter()
            .find(|(route, _, _)| *route == self)
            .map(|(_, _, requirement)| *requirement)
            .unwrap_or(Requirement::Authenticated)
    }
}

/// A value that is either still loading or known
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution<T> {
    Pending,
    Ready(T),
}

/// What the caller is allowed to do, derived from auth, profile and role
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub authenticated: bool,
    pub has_profile: Resolution<bool>,
    pub role: Resolution<UserRole>,
}

impl Capabilities {
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            has_profile: Resolution::Ready(false),
            role: Resolution::Ready(UserRole::Guest),
        }
    }

    /// Only a resolved admin role counts
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Resolution::Ready(role) if role.is_admin())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// Role still resolving
    Loading,
    Redirect(Route),
    /// Redirect already issued for this mount, render nothing
    Blocked,
}

pub fn resolve(route: Route, caps: &Capabilities) -> Access {
    match route.requirement() {
        Requirement::Public => Access::Allow,
        Requirement::Authenticated if caps.authenticated => Access::Allow,
        Requirement::Authenticated => Access::Redirect(Route::Login),
        Requirement::Registered if !caps.authenticated => Access::Redirect(Route::Login),
        // A profile still loading does not block; the gate settles it
        Requirement::Registered => match caps.has_profile {
            Resolution::Ready(false) => Access::Redirect(Route::Register),
            _ => Access::Allow,
        },
        Requirement::Admin if !caps.authenticated => Access::Redirect(Route::Login),
        Requirement::Admin => match caps.role {
            Resolution::Pending => Access::Loading,
            Resolution::Ready(role) if role.is_admin() => Access::Allow,
            Resolution::Ready(_) => Access::Redirect(Route::AccessDenied),
        },
    }
}

/// Guard for one mounted route; redirects at most once
pub struct RouteMount {
    route: Route,
    redirected: bool,
}

impl RouteMount {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            redirected: false,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn check(&mut self, caps: &Capabilities) -> Access {
        if self.redirected {
            return Access::Blocked;
        }
        let access = resolve(self.route, caps);
        if let Access::Redirect(_) = access {
            self.redirected = true;
        }
        access
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(authenticated: bool, role: Resolution<UserRole>) -> Capabilities {
        Capabilities {
            authenticated,
            has_profile: Resolution::Ready(true),
            role,
        }
    }

    #[test]
    fn test_paths_round_trip() {
        for (route, path, _) in ROUTES {
            assert_eq!(route.path(), *path);
            assert_eq!(Route::from_path(path), Some(*route));
        }
        assert_eq!(Route::from_path("/admin/sessions/"), Some(Route::AdminSessions));
        assert_eq!(Route::from_path(""), Some(Route::Dashboard));
        assert_eq!(Route::from_path("/nope"), None);
    }

    #[test]
    fn test_public_routes_always_allowed() {
        let anon = Capabilities::anonymous();
        assert_eq!(resolve(Route::Login, &anon), Access::Allow);
        assert_eq!(resolve(Route::AccessDenied, &anon), Access::Allow);
    }

    #[test]
    fn test_protected_routes_require_login() {
        let anon = Capabilities::anonymous();
        let protected = [
            Route::Dashboard,
            Route::Scan,
            Route::History,
            Route::Register,
            Route::AdminSessions,
        ];
        for route in protected {
            assert_eq!(resolve(route, &anon), Access::Redirect(Route::Login));
        }
    }

    #[test]
    fn test_registered_routes_need_a_profile() {
        let mut unregistered = caps(true, Resolution::Ready(UserRole::Guest));
        unregistered.has_profile = Resolution::Ready(false);
        for route in [Route::Dashboard, Route::Scan, Route::History] {
            assert_eq!(resolve(route, &unregistered), Access::Redirect(Route::Register));
        }
        assert_eq!(resolve(Route::Register, &unregistered), Access::Allow);
        assert_eq!(resolve(Route::Delivery, &unregistered), Access::Allow);

        let mut loading = unregistered;
        loading.has_profile = Resolution::Pending;
        assert_eq!(resolve(Route::Scan, &loading), Access::Allow);

        let registered = caps(true, Resolution::Ready(UserRole::User));
        assert_eq!(resolve(Route::History, &registered), Access::Allow);
    }

    #[test]
    fn test_admin_routes() {
        let pending = caps(true, Resolution::Pending);
        let student = caps(true, Resolution::Ready(UserRole::User));
        let teacher = caps(true, Resolution::Ready(UserRole::Admin));

        assert_eq!(resolve(Route::AdminOverview, &pending), Access::Loading);
        assert_eq!(resolve(Route::AdminOverview, &student), Access::Redirect(Route::AccessDenied));
        assert_eq!(resolve(Route::AdminOverview, &teacher), Access::Allow);
        assert_eq!(resolve(Route::Scan, &pending), Access::Allow);
        assert!(teacher.is_admin());
        assert!(!pending.is_admin());
        assert!(!student.is_admin());
    }

    #[test]
    fn test_mount_redirects_once() {
        let mut mount = RouteMount::new(Route::AdminSessions);
        let pending = caps(true, Resolution::Pending);
        let student = caps(true, Resolution::Ready(UserRole::User));

        assert_eq!(mount.check(&pending), Access::Loading);
        assert_eq!(mount.check(&student), Access::Redirect(Route::AccessDenied));
        assert_eq!(mount.check(&student), Access::Blocked);
        assert_eq!(mount.check(&student), Access::Blocked);
    }
}
