// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Verifies issuer-signed bearer tokens for the profile API.
//!
//! ## Auth Flow
//!
//! 1. Client authenticates with the issuer (e.g. Auth0) and obtains an RS256 JWT
//! 2. Client sends `Authorization: Bearer <JWT>`
//! 3. Server:
//!    - Resolves the token's `kid` against the issuer JWKS (cached)
//!    - Verifies signature, issuer, audience, expiry
//!    - Extracts `sub` → [`VerifiedIdentity`], the profile primary key
//!
//! ## Security
//!
//! - Only asymmetric algorithms are accepted; `HS*` and `none` never verify
//! - Every failure is the same `401` to the client
//! - No clock skew tolerance unless configured
//! - Raw tokens are never logged

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::VerifiedIdentity;
pub use error::{AuthError, AuthFailure};
pub use extractor::Authenticated;
pub use jwks::{HttpJwksSource, JwksSource, KeyError, KeyResolver};
pub use middleware::require_identity;
pub use verifier::{TokenVerifier, VerifierConfig};
