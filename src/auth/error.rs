// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! Every verification failure collapses into a single [`AuthError`]. The
//! [`AuthFailure`] it carries is for logs only; the client always sees the
//! same `401 Unauthorized` body so that an expired token cannot be told apart
//! from a forged one.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Internal reason a request failed authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    /// No authorization header present
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token is not a well-formed JWT
    MalformedToken,
    /// Header carries no `kid`
    MissingKeyId,
    /// Key endpoint unreachable or returned garbage
    KeyFetchFailed(String),
    /// `kid` absent from the key set, even after refresh
    KeyNotFound(String),
    /// Symmetric, `none`, or otherwise disallowed algorithm
    DisallowedAlgorithm(String),
    /// Signature does not verify against the resolved key
    InvalidSignature,
    /// `iss` differs from the configured issuer
    InvalidIssuer,
    /// `aud` does not contain the configured audience
    InvalidAudience,
    /// `exp` is in the past (or absent)
    TokenExpired,
    /// `nbf` is in the future
    TokenNotYetValid,
    /// `sub` is absent or empty
    MissingSubject,
    /// Handler ran without an identity attached to the request
    MissingIdentity,
}

impl AuthFailure {
    /// Stable reason code for structured logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthFailure::MissingAuthHeader => "missing_auth_header",
            AuthFailure::InvalidAuthHeader => "invalid_auth_header",
            AuthFailure::MalformedToken => "malformed_token",
            AuthFailure::MissingKeyId => "missing_key_id",
            AuthFailure::KeyFetchFailed(_) => "key_fetch_failed",
            AuthFailure::KeyNotFound(_) => "key_not_found",
            AuthFailure::DisallowedAlgorithm(_) => "disallowed_algorithm",
            AuthFailure::InvalidSignature => "invalid_signature",
            AuthFailure::InvalidIssuer => "invalid_issuer",
            AuthFailure::InvalidAudience => "invalid_audience",
            AuthFailure::TokenExpired => "token_expired",
            AuthFailure::TokenNotYetValid => "token_not_yet_valid",
            AuthFailure::MissingSubject => "missing_subject",
            AuthFailure::MissingIdentity => "missing_identity",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::KeyFetchFailed(detail) => write!(f, "{}: {detail}", self.code()),
            AuthFailure::KeyNotFound(kid) => write!(f, "{}: kid={kid}", self.code()),
            AuthFailure::DisallowedAlgorithm(alg) => write!(f, "{}: alg={alg}", self.code()),
            _ => f.write_str(self.code()),
        }
    }
}

/// Authentication error returned to clients as `401 Unauthorized`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    reason: AuthFailure,
}

impl AuthError {
    pub fn new(reason: AuthFailure) -> Self {
        Self { reason }
    }

    /// The internal reason. Never put this in a response.
    pub fn reason(&self) -> &AuthFailure {
        &self.reason
    }
}

impl From<AuthFailure> for AuthError {
    fn from(reason: AuthFailure) -> Self {
        Self::new(reason)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "authentication failed ({})", self.reason)
    }
}

impl std::error::Error for AuthError {}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::UNAUTHORIZED,
            Json(AuthErrorBody {
                error: "Unauthorized",
            }),
        )
            .into_response();
        response
            .headers_mut()
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}
