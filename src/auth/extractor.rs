// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the verified caller.
//!
//! Use the `Authenticated` extractor in handlers mounted behind
//! [`require_identity`](super::middleware::require_identity):
//!
//! ```rust,ignore
//! async fn my_handler(Authenticated(identity): Authenticated) -> impl IntoResponse {
//!     // identity is VerifiedIdentity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthFailure, VerifiedIdentity};

/// The identity the middleware attached to this request.
///
/// Extraction never verifies anything itself. If the middleware did not run
/// (a routing mistake), the request is rejected with `401` rather than
/// reaching the handler without an identity.
#[derive(Debug, Clone)]
pub struct Authenticated(pub VerifiedIdentity);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<VerifiedIdentity>() {
            Some(identity) => Ok(Authenticated(identity.clone())),
            None => {
                tracing::error!(
                    path = parts.uri.path(),
                    "Handler reached without a verified identity"
                );
                Err(AuthFailure::MissingIdentity.into())
            }
        }
    }
}
