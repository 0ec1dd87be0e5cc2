//! Path table and navigation guard.
//!
//! DESIGN
//! ======
//! A path is parsed into a [`Route`] first and checked second, so the same
//! table serves both link building ([`Route::path`]) and access control
//! ([`guard`]). Guard outcomes are plain values; the caller performs the
//! actual navigation.

#[cfg(test)]
#[path = "router_test.rs"]
mod router_test;

use std::fmt;

use tracing::debug;

use crate::state::auth::AuthState;

pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Record segment of a detail route. `new` opens the create form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Detail {
    New,
    Id(String),
}

impl Detail {
    fn parse(segment: &str) -> Self {
        if segment == "new" { Self::New } else { Self::Id(segment.to_owned()) }
    }

    fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Id(id) => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/`, always forwarded to the dashboard.
    Home,
    Login,
    PasswordReset,
    Dashboard,
    Tickets { kind: String },
    Ticket { kind: String, detail: Detail },
    Tasks,
    Reactions(Option<Detail>),
    Users(Option<Detail>),
    Groups(Option<Detail>),
    Types(Option<Detail>),
    Settings,
    NotFound(String),
}

impl Route {
    /// Resolve a path. Query strings, fragments and repeated slashes are
    /// ignored; anything unrecognised is `NotFound`.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let bare = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = bare.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Self::Home,
            ["login"] => Self::Login,
            ["password-reset"] => Self::PasswordReset,
            ["dashboard"] => Self::Dashboard,
            ["tickets", kind] => Self::Tickets {
                kind: (*kind).to_owned(),
            },
            ["tickets", kind, id] => Self::Ticket {
                kind: (*kind).to_owned(),
                detail: Detail::parse(id),
            },
            ["tasks"] => Self::Tasks,
            ["reactions"] => Self::Reactions(None),
            ["reactions", id] => Self::Reactions(Some(Detail::parse(id))),
            ["users"] => Self::Users(None),
            ["users", id] => Self::Users(Some(Detail::parse(id))),
            ["groups"] => Self::Groups(None),
            ["groups", id] => Self::Groups(Some(Detail::parse(id))),
            ["types"] => Self::Types(None),
            ["types", id] => Self::Types(Some(Detail::parse(id))),
            ["settings"] => Self::Settings,
            _ => Self::NotFound(path.to_owned()),
        }
    }

    #[must_use]
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Self::Login | Self::PasswordReset | Self::NotFound(_))
    }

    /// Permission the session must hold to open this route.
    #[must_use]
    pub fn required_permission(&self) -> Option<&'static str> {
        match self {
            Self::Settings => Some("settings:write"),
            Self::Users(_) => Some("user:read"),
            Self::Groups(_) => Some("group:read"),
            Self::Reactions(_) => Some("reaction:read"),
            Self::Types(_) => Some("type:read"),
            _ => None,
        }
    }

    /// Canonical path for this route.
    #[must_use]
    pub fn path(&self) -> String {
        let with_detail = |base: &str, detail: &Option<Detail>| match detail {
            Some(d) => format!("{base}/{}", d.as_str()),
            None => base.to_owned(),
        };
        match self {
            Self::Home => "/".to_owned(),
            Self::Login => LOGIN_PATH.to_owned(),
            Self::PasswordReset => "/password-reset".to_owned(),
            Self::Dashboard => DASHBOARD_PATH.to_owned(),
            Self::Tickets { kind } => format!("/tickets/{kind}"),
            Self::Ticket { kind, detail } => format!("/tickets/{kind}/{}", detail.as_str()),
            Self::Tasks => "/tasks".to_owned(),
            Self::Reactions(d) => with_detail("/reactions", d),
            Self::Users(d) => with_detail("/users", d),
            Self::Groups(d) => with_detail("/groups", d),
            Self::Types(d) => with_detail("/types", d),
            Self::Settings => "/settings".to_owned(),
            Self::NotFound(path) => path.clone(),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Guard decision for one navigation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(String),
}

/// Decide whether `route` may render for `auth`.
#[must_use]
pub fn guard(route: Route, auth: &AuthState) -> Navigation {
    let authenticated = auth.is_authenticated();
    let outcome = match &route {
        Route::Home => Navigation::Redirect(DASHBOARD_PATH.to_owned()),
        Route::Login if authenticated => Navigation::Redirect(DASHBOARD_PATH.to_owned()),
        r if r.requires_auth() && !authenticated => Navigation::Redirect(LOGIN_PATH.to_owned()),
        r if r.required_permission().is_some_and(|p| !auth.has_permission(p)) => {
            Navigation::Redirect(DASHBOARD_PATH.to_owned())
        }
        _ => Navigation::Render(route.clone()),
    };
    if let Navigation::Redirect(to) = &outcome {
        debug!(from = %route, %to, "navigation redirected");
    }
    outcome
}

/// Parse and guard in one step.
#[must_use]
pub fn navigate(path: &str, auth: &AuthState) -> Navigation {
    guard(Route::parse(path), auth)
}
