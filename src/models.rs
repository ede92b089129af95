// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the profile API. All types derive
//! `ToSchema` for OpenAPI documentation.
//!
//! ## Identity Binding
//!
//! A profile's `id` is always the verified token subject. Request bodies
//! cannot address or rename a record: `id` and `_id` sent by a client are
//! dropped before anything reaches the store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::auth::VerifiedIdentity;

/// Body keys that would otherwise address a record; never accepted from a client.
const RESERVED_KEYS: [&str; 2] = ["id", "_id"];

/// A stored user profile.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProfileRecord {
    /// Owning identity (token `sub`). Immutable after creation.
    #[schema(example = "auth0|abc123")]
    pub id: String,
    pub email: String,
    /// Display name.
    pub name: String,
    /// Additional profile fields, stored as given.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Profile fields accepted on create and update.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, PartialEq)]
pub struct ProfileFields {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Any other top-level keys. A `null` value removes the field on update.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ProfileFields {
    /// Drop keys a client must not control.
    fn sanitized(mut self) -> Self {
        for key in RESERVED_KEYS {
            if self.extra.remove(key).is_some() {
                tracing::debug!(key, "Discarded client-supplied profile key");
            }
        }
        self
    }
}

impl ProfileRecord {
    /// Build a new record owned by `identity`.
    pub fn new(identity: &VerifiedIdentity, fields: ProfileFields) -> Self {
        let fields = fields.sanitized();
        Self {
            id: identity.subject().to_string(),
            email: fields.email.unwrap_or_default(),
            name: fields.name.unwrap_or_default(),
            extra: fields
                .extra
                .into_iter()
                .filter(|(_, value)| !value.is_null())
                .collect(),
        }
    }

    /// Apply an update in place.
    ///
    /// Provided `email`/`name` replace the stored values; extension fields
    /// merge key-wise and `null` removes a key. `id` never changes.
    pub fn apply(&mut self, fields: ProfileFields) {
        let fields = fields.sanitized();
        if let Some(email) = fields.email {
            self.email = email;
        }
        if let Some(name) = fields.name {
            self.name = name;
        }
        for (key, value) in fields.extra {
            if value.is_null() {
                self.extra.remove(&key);
            } else {
                self.extra.insert(key, value);
            }
        }
    }
}
