// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. compact JWT structure and header
//! 2. `kid` → key from the [`KeyResolver`]
//! 3. asymmetric algorithm, matching the key, and the signature
//! 4. `iss` equals the expected issuer exactly
//! 5. `aud` contains the expected audience
//! 6. `exp` / `nbf` window (leeway from config, zero by default)
//! 7. non-empty `sub`

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::claims::{TokenClaims, VerifiedIdentity};
use super::error::{AuthError, AuthFailure};
use super::jwks::{KeyError, KeyFamily, KeyResolver};

/// Deployment-specific expectations for incoming tokens.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Expected `iss`, compared byte-for-byte
    pub issuer: String,
    /// Audience that must appear in `aud`
    pub audience: String,
    /// Accepted signing algorithms; symmetric ones are ignored
    pub allowed_algorithms: Vec<Algorithm>,
    /// Clock tolerance in seconds for `exp` and `nbf`
    pub leeway: u64,
}

impl VerifierConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            allowed_algorithms: vec![Algorithm::RS256],
            leeway: 0,
        }
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.allowed_algorithms = algorithms;
        self
    }

    pub fn with_leeway(mut self, leeway: u64) -> Self {
        self.leeway = leeway;
        self
    }
}

/// Validates bearer tokens against the issuer's published keys.
pub struct TokenVerifier {
    resolver: Arc<KeyResolver>,
    config: VerifierConfig,
}

impl TokenVerifier {
    pub fn new(resolver: Arc<KeyResolver>, config: VerifierConfig) -> Self {
        Self { resolver, config }
    }

    pub fn resolver(&self) -> &Arc<KeyResolver> {
        &self.resolver
    }

    /// Verify against this deployment's configured issuer and audience.
    pub async fn verify(&self, raw_token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.verify_for(raw_token, &self.config.issuer, &self.config.audience)
            .await
    }

    /// Verify against an explicit issuer and audience.
    pub async fn verify_for(
        &self,
        raw_token: &str,
        expected_issuer: &str,
        expected_audience: &str,
    ) -> Result<VerifiedIdentity, AuthError> {
        let now = Utc::now().timestamp();
        self.verify_at(raw_token, expected_issuer, expected_audience, now)
            .await
    }

    async fn verify_at(
        &self,
        raw_token: &str,
        expected_issuer: &str,
        expected_audience: &str,
        now: i64,
    ) -> Result<VerifiedIdentity, AuthError> {
        if raw_token.split('.').count() != 3 || raw_token.split('.').any(str::is_empty) {
            return Err(AuthFailure::MalformedToken.into());
        }
        let header = decode_header(raw_token).map_err(|_| AuthFailure::MalformedToken)?;

        let kid = header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthFailure::MissingKeyId)?;
        let key = self.resolver.resolve(kid).await.map_err(|e| match e {
            KeyError::Fetch(detail) => AuthFailure::KeyFetchFailed(detail),
            KeyError::NotFound(kid) => AuthFailure::KeyNotFound(kid),
        })?;

        let alg = header.alg;
        let disallowed = || AuthFailure::DisallowedAlgorithm(format!("{alg:?}"));
        let family = KeyFamily::for_algorithm(alg)
            .filter(|_| self.config.allowed_algorithms.contains(&alg))
            .ok_or_else(disallowed)?;
        if family != key.family() || key.algorithm().is_some_and(|pinned| pinned != alg) {
            return Err(disallowed().into());
        }

        // Registered claims are checked below, in order, against our own clock.
        let mut validation = Validation::new(alg);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let claims = decode::<TokenClaims>(raw_token, key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthFailure::InvalidSignature,
                ErrorKind::InvalidAlgorithm => disallowed(),
                _ => AuthFailure::MalformedToken,
            })?
            .claims;

        let issuer = claims
            .iss
            .filter(|iss| iss == expected_issuer)
            .ok_or(AuthFailure::InvalidIssuer)?;

        if !claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(expected_audience))
        {
            return Err(AuthFailure::InvalidAudience.into());
        }

        let leeway = i64::try_from(self.config.leeway).unwrap_or(i64::MAX);
        let expires_at = claims.exp.ok_or(AuthFailure::TokenExpired)?;
        if now >= expires_at.saturating_add(leeway) {
            return Err(AuthFailure::TokenExpired.into());
        }
        if let Some(nbf) = claims.nbf {
            if now.saturating_add(leeway) < nbf {
                return Err(AuthFailure::TokenNotYetValid.into());
            }
        }

        let subject = claims
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(AuthFailure::MissingSubject)?;

        Ok(VerifiedIdentity::new(
            subject,
            issuer,
            expected_audience.to_string(),
            expires_at,
        ))
    }
}
