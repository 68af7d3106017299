// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route access control for the dashboards.
//!
//! Every decision is a pure function of the session and the route's
//! allow-list. Capabilities are derived from the role on each check and
//! never cached.
//!
//! | Path       | Allowed roles      |
//! |------------|--------------------|
//! | `/login`   | public             |
//! | `/student` | student            |
//! | `/teacher` | teacher, admin     |
//! | `/admin`   | admin              |

use crate::auth::Role;

use super::session::SessionStore;

/// Dashboard routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Student,
    Teacher,
    Admin,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Student => "/student",
            Route::Teacher => "/teacher",
            Route::Admin => "/admin",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        match path.trim_end_matches('/') {
            "/login" => Some(Route::Login),
            "/student" => Some(Route::Student),
            "/teacher" => Some(Route::Teacher),
            "/admin" => Some(Route::Admin),
            _ => None,
        }
    }

    /// Roles allowed to enter. `None` means public.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Login => None,
            Route::Student => Some(&[Role::Student]),
            Route::Teacher => Some(&[Role::Teacher, Role::Admin]),
            Route::Admin => Some(&[Role::Admin]),
        }
    }
}

/// Role flags evaluated for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub is_student: bool,
    pub is_teacher_capable: bool,
    pub is_admin: bool,
}

pub fn capabilities(role: Role) -> Capabilities {
    Capabilities {
        is_student: role.is_student(),
        is_teacher_capable: role.is_teacher_capable(),
        is_admin: role.is_admin(),
    }
}

/// Landing page for a role: student, then admin, then teacher.
pub fn home_for(role: Role) -> Route {
    let caps = capabilities(role);
    if caps.is_student {
        Route::Student
    } else if caps.is_admin {
        Route::Admin
    } else {
        Route::Teacher
    }
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

/// Coarse client state; changes only on login and logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Unauthenticated,
    Student,
    Teacher,
    Admin,
}

pub fn view_state(session: &SessionStore) -> ViewState {
    match session.role() {
        None => ViewState::Unauthenticated,
        Some(Role::Student) => ViewState::Student,
        Some(Role::Teacher) => ViewState::Teacher,
        Some(Role::Admin) => ViewState::Admin,
    }
}

/// Check an authenticated-only view against its allow-list.
pub fn check(session: &SessionStore, required: &[Role]) -> GuardDecision {
    let Some(role) = session.role() else {
        return GuardDecision::Redirect(Route::Login);
    };
    let caps = capabilities(role);

    let holds = required.iter().any(|r| match r {
        Role::Student => caps.is_student,
        Role::Teacher => caps.is_teacher_capable && !caps.is_admin,
        Role::Admin => caps.is_admin,
    });
    let admin_as_teacher = caps.is_admin && required.contains(&Role::Teacher);

    if holds || admin_as_teacher {
        GuardDecision::Allow
    } else {
        GuardDecision::Redirect(home_for(role))
    }
}

/// Resolve navigation to an arbitrary path, including unmatched ones.
pub fn resolve(session: &SessionStore, path: &str) -> GuardDecision {
    match Route::from_path(path) {
        Some(route) => match route.allowed_roles() {
            None => GuardDecision::Allow,
            Some(required) => check(session, required),
        },
        None => match session.role() {
            None => GuardDecision::Redirect(Route::Login),
            Some(role) => GuardDecision::Redirect(home_for(role)),
        },
    }
}
