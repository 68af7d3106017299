// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Student roster management (teacher or admin).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    auth::{hash_pin, Role, TeacherOnly},
    error::{ApiError, ApiJson},
    models::{
        ClassListResponse, CreateStudentRequest, StudentListResponse, StudentResponse,
        UpdateStudentRequest, UserProfile,
    },
    state::AppState,
    storage::{NewUser, StoredUser, TransactionRepository, UserRepository},
};

/// Query parameters for the roster.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StudentQuery {
    /// Only students in this class.
    pub class_name: Option<String>,
    /// Include each student's balance ("true" to enable).
    pub include_balance: Option<String>,
}

/// Active student by id, or 404 "Student not found".
pub(crate) fn active_student(state: &AppState, student_id: u64) -> Result<StoredUser, ApiError> {
    UserRepository::new(&state.ledger)
        .get(student_id)?
        .filter(|u| u.role == Role::Student && u.is_active)
        .ok_or_else(|| ApiError::not_found("Student not found"))
}

fn with_balance(state: &AppState, student: &StoredUser) -> Result<UserProfile, ApiError> {
    let balance = TransactionRepository::new(&state.ledger).balance(student.id)?;
    Ok(student.to_profile(Some(balance)))
}

fn hash(pin: &str) -> Result<String, ApiError> {
    hash_pin(pin).map_err(|e| ApiError::internal(e.to_string()))
}

/// List active students ordered by last name, then first name.
#[utoipa::path(
    get,
    path = "/api/students",
    tag = "Students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Roster", body = StudentListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Teacher access required")
    )
)]
pub async fn list_students(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> Result<Json<StudentListResponse>, ApiError> {
    let class_name = query.class_name.as_deref().filter(|c| !c.is_empty());
    let include_balance = query
        .include_balance
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let students = UserRepository::new(&state.ledger).active_students(class_name)?;
    let balances = if include_balance {
        Some(TransactionRepository::new(&state.ledger).balances()?)
    } else {
        None
    };

    let students: Vec<UserProfile> = students
        .iter()
        .map(|s| {
            let balance = balances
                .as_ref()
                .map(|b| b.get(&s.id).copied().unwrap_or(0));
            s.to_profile(balance)
        })
        .collect();

    Ok(Json(StudentListResponse {
        success: true,
        count: students.len(),
        students,
    }))
}

/// Get one active student with balance.
#[utoipa::path(
    get,
    path = "/api/students/{student_id}",
    tag = "Students",
    params(("student_id" = u64, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student", body = StudentResponse),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
) -> Result<Json<StudentResponse>, ApiError> {
    let student = active_student(&state, student_id)?;
    Ok(Json(StudentResponse {
        success: true,
        student: with_balance(&state, &student)?,
    }))
}

/// Create a student. The username is derived as `first.last`, with a
/// numeric suffix when taken.
#[utoipa::path(
    post,
    path = "/api/students",
    tag = "Students",
    request_body = CreateStudentRequest,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 400, description = "Missing field")
    )
)]
pub async fn create_student(
    TeacherOnly(user): TeacherOnly,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateStudentRequest>,
) -> Result<(StatusCode, Json<StudentResponse>), ApiError> {
    let first_name = request.first_name.trim();
    let last_name = request.last_name.trim();
    for (field, value) in [
        ("firstName", first_name),
        ("lastName", last_name),
        ("pin", request.pin.as_str()),
    ] {
        if value.is_empty() {
            return Err(ApiError::bad_request(format!("{field} is required")));
        }
    }

    let student = UserRepository::new(&state.ledger).create_with_unique_username(NewUser {
        username: format!("{}.{}", first_name.to_lowercase(), last_name.to_lowercase()),
        pin_hash: hash(&request.pin)?,
        role: Role::Student,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        class_name: request
            .class_name
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    })?;

    tracing::info!(student_id = student.id, created_by = user.user_id, "Student created");
    Ok((
        StatusCode::CREATED,
        Json(StudentResponse {
            success: true,
            student: with_balance(&state, &student)?,
        }),
    ))
}

/// Partially update a student. Inactive students can be updated, which is
/// how they are reactivated.
#[utoipa::path(
    put,
    path = "/api/students/{student_id}",
    tag = "Students",
    params(("student_id" = u64, Path, description = "Student id")),
    request_body = UpdateStudentRequest,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 404, description = "Student not found")
    )
)]
pub async fn update_student(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
    Path(student_id): Path<u64>,
    ApiJson(request): ApiJson<UpdateStudentRequest>,
) -> Result<Json<StudentResponse>, ApiError> {
    let users = UserRepository::new(&state.ledger);
    let mut student = users
        .get(student_id)?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| ApiError::not_found("Student not found"))?;

    if let Some(first) = request.first_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        student.first_name = first.to_string();
    }
    if let Some(last) = request.last_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        student.last_name = last.to_string();
    }
    if let Some(class_name) = request.class_name.as_deref() {
        let class_name = class_name.trim();
        student.class_name = (!class_name.is_empty()).then(|| class_name.to_string());
    }
    if let Some(pin) = request.pin.as_deref().filter(|p| !p.is_empty()) {
        student.pin_hash = hash(pin)?;
    }
    if let Some(active) = request.is_active {
        student.is_active = active;
    }

    users.update(&student)?;
    Ok(Json(StudentResponse {
        success: true,
        student: with_balance(&state, &student)?,
    }))
}

/// Distinct class names of active students, sorted.
#[utoipa::path(
    get,
    path = "/api/students/classes",
    tag = "Students",
    responses(
        (status = 200, description = "Class names", body = ClassListResponse)
    )
)]
pub async fn list_classes(
    TeacherOnly(_user): TeacherOnly,
    State(state): State<AppState>,
) -> Result<Json<ClassListResponse>, ApiError> {
    Ok(Json(ClassListResponse {
        success: true,
        classes: UserRepository::new(&state.ledger).class_names()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn roster_requires_teacher() {
        let app = TestApp::new();
        let (status, _) = app.call(Method::GET, "/api/students", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let student = app.student("Alice", "Johnson", "5A");
        let token = app.token_for(&student);
        let (status, body) = app.call(Method::GET, "/api/students", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Teacher access required");
    }

    #[tokio::test]
    async fn roster_is_sorted_and_filterable() {
        let app = TestApp::new();
        let teacher = app.teacher();
        app.student("Charlie", "Brown", "5B");
        app.student("Bob", "Smith", "5A");
        app.student("Alice", "Johnson", "5A");
        let token = app.token_for(&teacher);

        let (status, body) = app
            .call(Method::GET, "/api/students?include_balance=true", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        let names: Vec<&str> = body["students"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["lastName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Brown", "Johnson", "Smith"]);
        assert_eq!(body["students"][0]["balance"], 0);

        let (_, body) = app
            .call(Method::GET, "/api/students?class_name=5A", Some(&token), None)
            .await;
        assert_eq!(body["count"], 2);
        assert!(body["students"][0].get("balance").is_none());

        let (_, body) = app
            .call(Method::GET, "/api/students/classes", Some(&token), None)
            .await;
        assert_eq!(body["classes"], json!(["5A", "5B"]));
    }

    #[tokio::test]
    async fn create_derives_unique_username() {
        let app = TestApp::new();
        let token = app.token_for(&app.teacher());
        app.student("Alice", "Johnson", "5A");

        let (status, body) = app
            .call(
                Method::POST,
                "/api/students",
                Some(&token),
                Some(json!({"firstName": " Alice ", "lastName": "Johnson", "className": "", "pin": "9876"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["student"]["username"], "alice.johnson1");
        assert_eq!(body["student"]["firstName"], "Alice");
        assert_eq!(body["student"]["className"], serde_json::Value::Null);
        assert_eq!(body["student"]["balance"], 0);
    }

    #[tokio::test]
    async fn create_requires_fields() {
        let app = TestApp::new();
        let token = app.token_for(&app.teacher());
        let (status, body) = app
            .call(
                Method::POST,
                "/api/students",
                Some(&token),
                Some(json!({"firstName": "Alice", "lastName": "Johnson"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "pin is required");
    }

    #[tokio::test]
    async fn update_and_deactivate() {
        let app = TestApp::new();
        let token = app.token_for(&app.teacher());
        let alice = app.student("Alice", "Johnson", "5A");

        let (status, body) = app
            .call(
                Method::PUT,
                &format!("/api/students/{}", alice.id),
                Some(&token),
                Some(json!({"className": "6A", "lastName": "Jones"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["student"]["className"], "6A");
        assert_eq!(body["student"]["fullName"], "Alice Jones");

        app.call(
            Method::PUT,
            &format!("/api/students/{}", alice.id),
            Some(&token),
            Some(json!({"isActive": false})),
        )
        .await;
        let (status, body) = app
            .call(Method::GET, &format!("/api/students/{}", alice.id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Student not found");
    }
}
