//! Navigation guard.
//!
//! Protected routes are reachable only with a non-empty session token;
//! everything else resolves to the login screen.

use std::fmt;

/// A navigable screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Index; redirects to the dashboard.
    Root,
    /// Sign-in screen, always reachable.
    Login,
    /// Task counts overview.
    Dashboard,
    /// Task list and editor.
    Tasks,
}

impl Route {
    /// Whether the route requires an authenticated session.
    #[must_use]
    pub const fn requires_auth(self) -> bool {
        matches!(self, Self::Root | Self::Dashboard | Self::Tasks)
    }

    /// URL-style path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
            Self::Tasks => "/tasks",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A token authenticates iff it is present and non-empty.
#[must_use]
pub fn is_authenticated(token: Option<&str>) -> bool {
    token.is_some_and(|t| !t.is_empty())
}

/// Resolves where a navigation to `route` actually lands.
#[must_use]
pub fn resolve(route: Route, token: Option<&str>) -> Route {
    if route.requires_auth() && !is_authenticated(token) {
        return Route::Login;
    }
    match route {
        Route::Root => Route::Dashboard,
        other => other,
    }
}
