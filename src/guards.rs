//! Role-based routing decisions derived from auth state.

use std::time::Duration;

use crate::models::Role;

pub const ADMIN_HOME: &str = "/admin";
pub const LOGIN_PATH: &str = "/login";
pub const ROOT_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(&'static str),
}

/// Pages of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Events,
    EventDetail,
    Dashboard,
    Checkout,
    Profile,
    Tickets,
    Admin,
    Login,
}

impl Page {
    /// Page-level access rule. Anonymous users go to login, users lacking
    /// the role go home.
    pub fn authorize(self, role: Option<Role>) -> GuardDecision {
        let allowed: &[Role] = match self {
            Page::Home | Page::Events | Page::EventDetail | Page::Login => return GuardDecision::Render,
            Page::Dashboard => &[Role::Organizer, Role::Admin],
            Page::Admin => &[Role::Admin],
            Page::Checkout | Page::Profile | Page::Tickets => {
                &[Role::Attendee, Role::Organizer, Role::Admin]
            }
        };
        match role {
            None => GuardDecision::Redirect(LOGIN_PATH),
            Some(role) if allowed.contains(&role) => GuardDecision::Render,
            Some(_) => GuardDecision::Redirect(ROOT_PATH),
        }
    }
}

/// Sends admins straight to the admin area; everyone else sees the page.
pub struct AdminRedirect;

impl AdminRedirect {
    pub fn decide(role: Option<Role>) -> GuardDecision {
        match role {
            Some(Role::Admin) => GuardDecision::Redirect(ADMIN_HOME),
            _ => GuardDecision::Render,
        }
    }
}

/// Delayed admin redirect on the landing page, skipped for navigation the
/// user started explicitly. The page sends the delay to the client in a
/// `Refresh` header, so leaving the page first cancels it.
#[derive(Debug, Clone, Copy)]
pub struct AdminRouteGuard {
    delay: Duration,
}

impl AdminRouteGuard {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Returns the delay after which an admin on `path` is redirected.
    pub fn pending_redirect(&self, path: &str, user_initiated: bool, role: Option<Role>) -> Option<Duration> {
        let applies = path == ROOT_PATH && !user_initiated && role == Some(Role::Admin);
        applies.then_some(self.delay)
    }
}
