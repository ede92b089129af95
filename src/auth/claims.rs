// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the verified identity derived from them.

use serde::Deserialize;

/// Registered claims read from an issuer token.
///
/// Every field is optional at the serde layer so that a missing claim is
/// reported by the verifier as the specific check it fails, not as a
/// malformed token.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject (stable user identifier, e.g. `auth0|abc123`)
    #[serde(default)]
    pub sub: Option<String>,

    /// Issuer
    #[serde(default)]
    pub iss: Option<String>,

    /// Audience (single string or array)
    #[serde(default)]
    pub aud: Option<Audience>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: Option<i64>,

    /// Not before timestamp
    #[serde(default)]
    pub nbf: Option<i64>,
}

/// The `aud` claim. RFC 7519 allows either form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Identity of the caller, produced only by a successful token verification.
///
/// There is no public constructor: holding one of these means the token
/// behind it passed every check. It lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    subject: String,
    issuer: String,
    audience: String,
    expires_at: i64,
}

impl VerifiedIdentity {
    pub(crate) fn new(
        subject: String,
        issuer: String,
        audience: String,
        expires_at: i64,
    ) -> Self {
        Self {
            subject,
            issuer,
            audience,
            expires_at,
        }
    }

    /// The `sub` claim; primary key of the caller's profile.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The audience this identity was validated against.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Token expiration (Unix timestamp)
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    #[cfg(test)]
    pub(crate) fn for_subject(subject: &str) -> Self {
        Self::new(
            subject.to_string(),
            "https://issuer.test/".to_string(),
            "https://api.test".to_string(),
            i64::MAX,
        )
    }
}
