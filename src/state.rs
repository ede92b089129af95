// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::{auth::TokenVerifier, storage::ProfileStore};

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub profiles: ProfileStore,
}

impl AppState {
    pub fn new(verifier: Arc<TokenVerifier>, profiles: ProfileStore) -> Self {
        Self { verifier, profiles }
    }
}
