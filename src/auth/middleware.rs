// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication middleware for Axum.
//!
//! Layered onto the protected router with
//! `axum::middleware::from_fn_with_state(state, require_identity)`. A request
//! that reaches a handler behind it always carries a [`VerifiedIdentity`] in
//! its extensions; anything else is answered with `401` here.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthFailure, VerifiedIdentity};
use crate::state::AppState;

/// Authentication middleware function.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let verified = match bearer_token(request.headers()) {
        Ok(token) => {
            let token = token.to_owned();
            state.verifier.verify(&token).await
        }
        Err(e) => Err(e),
    };

    match verified {
        Ok(identity) => {
            tracing::debug!(subject = identity.subject(), "Request authenticated");
            request.extensions_mut().insert::<VerifiedIdentity>(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                reason = %e.reason(),
                method = %request.method(),
                path = request.uri().path(),
                "Rejected unauthenticated request"
            );
            e.into_response()
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthFailure::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthFailure::InvalidAuthHeader)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthFailure::InvalidAuthHeader)?;
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(AuthFailure::InvalidAuthHeader.into());
    }

    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthFailure::InvalidAuthHeader.into());
    }
    Ok(token)
}
