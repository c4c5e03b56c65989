//! Navigation gate in front of the upload workflow.
//!
//! Every decision is a lookup in [`TRANSITIONS`]; there is no other place
//! that decides whether a path is admitted.

pub const LOGIN_PATH: &str = "/login";
pub const DEFAULT_PATH: &str = "/";

const MAX_REDIRECT_HOPS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

impl AuthState {
    pub fn from_flag(authenticated: bool) -> Self {
        if authenticated {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }
}

/// Which kind of location a requested path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTarget {
    OnLogin,
    OnProtected,
    OnOther,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Workflow,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => LOGIN_PATH,
            Route::Workflow => DEFAULT_PATH,
        }
    }

    fn target(self) -> RouteTarget {
        match self {
            Route::Login => RouteTarget::OnLogin,
            Route::Workflow => RouteTarget::OnProtected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Admit(Route),
    Redirect(Route),
}

pub const TRANSITIONS: [(AuthState, RouteTarget, Navigation); 6] = [
    (
        AuthState::Unauthenticated,
        RouteTarget::OnLogin,
        Navigation::Admit(Route::Login),
    ),
    (
        AuthState::Unauthenticated,
        RouteTarget::OnProtected,
        Navigation::Redirect(Route::Login),
    ),
    (
        AuthState::Unauthenticated,
        RouteTarget::OnOther,
        Navigation::Redirect(Route::Workflow),
    ),
    (
        AuthState::Authenticated,
        RouteTarget::OnLogin,
        Navigation::Redirect(Route::Workflow),
    ),
    (
        AuthState::Authenticated,
        RouteTarget::OnProtected,
        Navigation::Admit(Route::Workflow),
    ),
    (
        AuthState::Authenticated,
        RouteTarget::OnOther,
        Navigation::Redirect(Route::Workflow),
    ),
];

pub fn classify(path: &str) -> RouteTarget {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim();
    let trimmed = path.trim_end_matches('/');

    if trimmed.is_empty() {
        RouteTarget::OnProtected
    } else if trimmed == LOGIN_PATH {
        RouteTarget::OnLogin
    } else {
        RouteTarget::OnOther
    }
}

pub fn navigate(auth: AuthState, target: RouteTarget) -> Navigation {
    TRANSITIONS
        .iter()
        .find(|(state, on, _)| *state == auth && *on == target)
        .map(|(_, _, navigation)| *navigation)
        .unwrap_or(Navigation::Redirect(Route::Login))
}

/// Follows redirects for `path` until a route is admitted.
pub fn resolve(auth: AuthState, path: &str) -> Route {
    let mut target = classify(path);
    for _ in 0..MAX_REDIRECT_HOPS {
        match navigate(auth, target) {
            Navigation::Admit(route) => return route,
            Navigation::Redirect(route) => target = route.target(),
        }
    }
    Route::Login
}

#[cfg(test)]
#[path = "tests/routing_tests.rs"]
mod tests;
