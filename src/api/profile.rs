// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile endpoints. The record key is always the verified caller.

use axum::{
    extract::{FromRequest, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::Authenticated,
    error::ApiError,
    models::{ProfileFields, ProfileRecord},
    state::AppState,
};

/// JSON profile body; parse failures become `400 {"error": "<reason>"}`.
#[derive(FromRequest)]
#[from_request(rejection(ApiError))]
pub struct ProfileBody(#[from_request(via(Json))] pub ProfileFields);

/// Get the caller's profile.
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "Profile",
    responses(
        (status = 200, description = "Caller's profile", body = ProfileRecord),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No profile for this identity")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_profile(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let profile = state.profiles.get(&identity).await?;
    Ok(Json(profile))
}

/// Create the caller's profile.
///
/// Any `id` / `_id` in the body is ignored; the record is keyed by the token subject.
#[utoipa::path(
    post,
    path = "/api/profile",
    tag = "Profile",
    request_body = ProfileFields,
    responses(
        (status = 201, description = "Profile created", body = ProfileRecord),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 409, description = "Profile already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_profile(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ProfileBody(fields): ProfileBody,
) -> Result<(StatusCode, Json<ProfileRecord>), ApiError> {
    let profile = state.profiles.create(&identity, fields).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Update the caller's existing profile.
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "Profile",
    request_body = ProfileFields,
    responses(
        (status = 200, description = "Profile updated", body = ProfileRecord),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "No profile for this identity")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    Authenticated(identity): Authenticated,
    State(state): State<AppState>,
    ProfileBody(fields): ProfileBody,
) -> Result<Json<ProfileRecord>, ApiError> {
    let profile = state.profiles.update(&identity, fields).await?;
    Ok(Json(profile))
}
