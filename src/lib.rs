// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile Service - authenticated per-user profile API
//!
//! Verifies issuer-signed (Auth0) bearer tokens against the issuer's JWKS and
//! stores one profile record per verified identity.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWKS key resolution, JWT verification, request authentication
//! - `config` - Environment configuration
//! - `storage` - Identity-keyed profile store (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
