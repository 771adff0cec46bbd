//! Startup routing and the screen guard, decided from auth state alone.

use crate::store::{AuthState, AuthStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRoute {
    Home,
    Login,
}

/// Where to send the user at launch. `None` until persisted state has been
/// restored. A persisted login is revalidated against the server first.
pub async fn start_route(auth: &AuthStore) -> Option<StartRoute> {
    if !auth.has_hydrated() {
        return None;
    }

    if auth.is_logged_in() {
        auth.check_auth_state(false).await;
    }

    if auth.is_logged_in() {
        Some(StartRoute::Home)
    } else {
        Some(StartRoute::Login)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    RedirectToLogin,
    Render,
}

/// Decision for a screen that requires a signed-in user.
pub fn guard(state: &AuthState) -> GuardDecision {
    if state.is_loading {
        GuardDecision::Loading
    } else if !state.is_logged_in {
        GuardDecision::RedirectToLogin
    } else {
        GuardDecision::Render
    }
}
