//! Endpoint-scoped argument policy: key aliases and user-scope injection.
//!
//! A `Policy` is plain data, built once (built-in table, optionally merged
//! with user configuration) and handed to the dispatcher.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::args::RawArguments;

const BUILTIN_POLICY: &str = include_str!("policy.yaml");

/// Named key injected for per-user scoping.
pub const USER_SCOPE_KEY: &str = "user_id";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// endpoint -> alias -> canonical
    pub aliases: BTreeMap<String, BTreeMap<String, String>>,
    /// Endpoints whose results span all tenants.
    pub global_endpoints: BTreeSet<String>,
}

impl Policy {
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_POLICY).context("built-in policy is invalid")
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).context("failed to parse policy YAML")
    }

    /// Layer `other` on top of `self`; entries in `other` win on conflict.
    pub fn merged(mut self, other: Policy) -> Self {
        for (endpoint, table) in other.aliases {
            self.aliases.entry(endpoint).or_default().extend(table);
        }
        self.global_endpoints.extend(other.global_endpoints);
        self
    }

    pub fn is_global(&self, endpoint: &str) -> bool {
        self.global_endpoints.contains(endpoint)
    }

    pub fn aliases_for(&self, endpoint: &str) -> Option<&BTreeMap<String, String>> {
        self.aliases.get(endpoint)
    }

    /// Move aliased keys to their canonical name. A canonical key that is
    /// already present is left alone and the alias stays where it is.
    pub fn apply_aliases(&self, endpoint: &str, args: &mut RawArguments) -> Vec<(String, String)> {
        let mut moved = Vec::new();
        let Some(table) = self.aliases.get(endpoint) else {
            return moved;
        };
        for (alias, canonical) in table {
            if args.named.contains_key(canonical) {
                continue;
            }
            if let Some(value) = args.named.remove(alias) {
                args.named.insert(canonical.clone(), value);
                moved.push((alias.clone(), canonical.clone()));
            }
        }
        moved
    }

    /// Add `user_id` for the current user unless it was given explicitly,
    /// the user is unknown, or the endpoint is global. Returns whether the
    /// key was added.
    pub fn inject_user_scope(
        &self,
        endpoint: &str,
        args: &mut RawArguments,
        current_user_id: Option<i64>,
    ) -> bool {
        if args.named.contains_key(USER_SCOPE_KEY) || self.is_global(endpoint) {
            return false;
        }
        let Some(user_id) = current_user_id else {
            return false;
        };
        args.named
            .insert(USER_SCOPE_KEY.to_string(), Value::Number(user_id.into()));
        true
    }
}
