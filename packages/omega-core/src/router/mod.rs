//! # Router Module
//!
//! Static route table plus navigation state.
//!
//! | Path        | Name       | View      | Lazy | Guard |
//! |-------------|------------|-----------|------|-------|
//! | `/`         | `home`     | Dashboard | no   | -     |
//! | `/groups`   | `groups`   | Dashboard | no   | -     |
//! | `/login`    | `login`    | Login     | no   | -     |
//! | `/register` | `register` | Register  | yes  | -     |
//! | `/friends`  | `friends`  | Friends   | yes  | -     |
//! | `/terminal` | `terminal` | Terminal  | yes  | admin |
//!
//! Navigation publishes the landed route on a `watch` channel so whatever owns
//! the UI tree can follow it.

mod guard;

pub use guard::{admin_guard, GuardDecision};

use std::sync::Arc;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::storage::SessionStorage;

/// Routable locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`
    Home,
    /// `/groups`
    Groups,
    /// `/login`
    Login,
    /// `/register`
    Register,
    /// `/friends`
    Friends,
    /// `/terminal`
    Terminal,
}

/// The view a route renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Home/groups dashboard
    Dashboard,
    /// Sign-in form
    Login,
    /// Account creation form
    Register,
    /// Friend search and list
    Friends,
    /// Admin terminal
    Terminal,
}

/// Guard attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Only allow-listed admins may enter.
    Admin,
}

/// One row of the route table.
#[derive(Debug)]
pub struct RouteDef {
    /// Route identity
    pub route: Route,
    /// URL path
    pub path: &'static str,
    /// Route name
    pub name: &'static str,
    /// Rendered view
    pub view: View,
    /// Whether the view is loaded on first visit rather than up front
    pub lazy: bool,
    /// Guard run before entering
    pub guard: Option<Guard>,
}

/// The route table.
pub static ROUTES: [RouteDef; 6] = [
    RouteDef {
        route: Route::Home,
        path: "/",
        name: "home",
        view: View::Dashboard,
        lazy: false,
        guard: None,
    },
    RouteDef {
        route: Route::Groups,
        path: "/groups",
        name: "groups",
        view: View::Dashboard,
        lazy: false,
        guard: None,
    },
    RouteDef {
        route: Route::Login,
        path: "/login",
        name: "login",
        view: View::Login,
        lazy: false,
        guard: None,
    },
    RouteDef {
        route: Route::Register,
        path: "/register",
        name: "register",
        view: View::Register,
        lazy: true,
        guard: None,
    },
    RouteDef {
        route: Route::Friends,
        path: "/friends",
        name: "friends",
        view: View::Friends,
        lazy: true,
        guard: None,
    },
    RouteDef {
        route: Route::Terminal,
        path: "/terminal",
        name: "terminal",
        view: View::Terminal,
        lazy: true,
        guard: Some(Guard::Admin),
    },
];

impl Route {
    /// Table row for this route.
    pub fn def(self) -> &'static RouteDef {
        ROUTES
            .iter()
            .find(|def| def.route == self)
            .unwrap_or(&ROUTES[0])
    }

    /// URL path.
    pub fn path(self) -> &'static str {
        self.def().path
    }

    /// Route name.
    pub fn name(self) -> &'static str {
        self.def().name
    }

    /// Resolve a URL path. Query strings, fragments and a trailing slash are
    /// ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        ROUTES
            .iter()
            .find(|def| def.path == path)
            .map(|def| def.route)
    }

    /// Resolve a route name.
    pub fn from_name(name: &str) -> Option<Route> {
        ROUTES
            .iter()
            .find(|def| def.name == name)
            .map(|def| def.route)
    }
}

/// Navigation state. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Router {
    config: Arc<ClientConfig>,
    storage: Arc<dyn SessionStorage>,
    current: Arc<watch::Sender<Route>>,
}

impl Router {
    /// Create a router positioned at `/`.
    pub fn new(config: Arc<ClientConfig>, storage: Arc<dyn SessionStorage>) -> Self {
        let (current, _) = watch::channel(Route::Home);
        Self {
            config,
            storage,
            current: Arc::new(current),
        }
    }

    /// Navigate to `path`, running the route's guard. Returns the route
    /// actually entered, which differs from the target on a guard redirect.
    pub fn navigate(&self, path: &str) -> Result<Route> {
        let target = Route::from_path(path).ok_or_else(|| Error::RouteNotFound(path.to_string()))?;

        let landed = match self.check(target) {
            GuardDecision::Allow => target,
            GuardDecision::Redirect(to) => {
                tracing::info!(from = target.path(), to = to.path(), "Navigation redirected by guard");
                to
            }
        };

        self.current.send_replace(landed);
        Ok(landed)
    }

    /// Move to `route` without running guards.
    pub fn redirect(&self, route: Route) {
        tracing::debug!(to = route.path(), "Redirect");
        self.current.send_replace(route);
    }

    /// Run the guard for `route` without navigating.
    pub fn check(&self, route: Route) -> GuardDecision {
        match route.def().guard {
            None => GuardDecision::Allow,
            Some(Guard::Admin) => admin_guard(self.storage.as_ref(), &self.config),
        }
    }

    /// Route currently shown.
    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    /// Observe navigation.
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }
}

// ============================================================================
// TESTS
// ============================================================================
