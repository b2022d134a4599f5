// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent roles as data.
//!
//! A role is a name plus capability flags consumed by uniform code paths.
//! New roles are added by inserting a row (built-in table or `roles.json`
//! in the state dir), not by extending a type hierarchy.

use serde::{Deserialize, Serialize};

/// One agent role with its capability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    /// Hub of the hub-and-spoke topology; targeted by the
    /// anti-self-scheduling guard.
    #[serde(default)]
    pub orchestrates: bool,
    /// Receives periodic check-in messages.
    #[serde(default)]
    pub schedules_checkins: bool,
    /// Cross-agent traffic is routed through this role.
    #[serde(default)]
    pub mediates_messages: bool,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            orchestrates: false,
            schedules_checkins: false,
            mediates_messages: false,
        }
    }

    /// The built-in role set. Extend via `roles.json`, not code.
    pub fn builtin() -> Vec<Role> {
        vec![
            Role {
                name: "orchestrator".to_string(),
                orchestrates: true,
                schedules_checkins: true,
                mediates_messages: true,
            },
            Role {
                name: "lead".to_string(),
                orchestrates: false,
                schedules_checkins: true,
                mediates_messages: false,
            },
            Role::new("developer"),
            Role::new("tester"),
        ]
    }

    /// Look up a role by name within a role table.
    pub fn find<'a>(roles: &'a [Role], name: &str) -> Option<&'a Role> {
        roles.iter().find(|r| r.name == name)
    }

    /// Merge extra roles over the builtins; extras win on name collision.
    pub fn with_extras(extras: Vec<Role>) -> Vec<Role> {
        let mut roles = Self::builtin();
        for extra in extras {
            if let Some(existing) = roles.iter_mut().find(|r| r.name == extra.name) {
                *existing = extra;
            } else {
                roles.push(extra);
            }
        }
        roles
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
