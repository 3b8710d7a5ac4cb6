//! Audience resolution.
//!
//! Merges template defaults, caller input and payload overrides into three
//! duplicate-free target sets: roles, tags and user IDs. The sets are
//! independent OR-targets; a recipient matched by several of them may be
//! notified more than once.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Recipient role known to the delivery channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Agent,
    Admin,
    BusinessAdmin,
    /// Everyone. Handled by the broadcast step, never sent to the role channel.
    All,
}

impl Role {
    /// Every concrete role, i.e. what `All` expands to inside a tenant
    pub const FIXED: [Role; 4] = [Role::Customer, Role::Agent, Role::Admin, Role::BusinessAdmin];

    /// Parse a role name, ignoring surrounding whitespace and case
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "customer" => Some(Role::Customer),
            "agent" => Some(Role::Agent),
            "admin" => Some(Role::Admin),
            "business_admin" => Some(Role::BusinessAdmin),
            "all" => Some(Role::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Agent => "agent",
            Role::Admin => "admin",
            Role::BusinessAdmin => "business_admin",
            Role::All => "all",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved audience for one dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudienceSpec {
    pub roles: Vec<Role>,
    pub tags: Vec<String>,
    pub user_ids: Vec<String>,
}

impl AudienceSpec {
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.tags.is_empty() && self.user_ids.is_empty()
    }

    /// Whether the audience targets everyone
    pub fn has_broadcast(&self) -> bool {
        self.roles.contains(&Role::All)
    }

    /// Role names in order, for reports and logs
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.as_str().to_string()).collect()
    }
}

/// Raw audience inputs, in precedence order within each set
#[derive(Debug, Clone, Copy, Default)]
pub struct AudienceSources<'a> {
    pub template_audience: &'a [String],
    pub override_audience: &'a [String],
    pub caller_roles: &'a [String],
    pub override_tags: &'a [String],
    pub caller_tags: &'a [String],
    pub override_user_ids: &'a [String],
    pub caller_user_ids: &'a [String],
}

/// Union, clean and deduplicate all audience inputs.
///
/// Roles are trimmed and lower-cased; unknown role names are dropped. Tags and
/// user IDs are trimmed and empty entries dropped. First occurrence wins.
pub fn normalize_audience(sources: &AudienceSources<'_>) -> AudienceSpec {
    let mut roles = Vec::new();
    let raw_roles = sources
        .template_audience
        .iter()
        .chain(sources.override_audience)
        .chain(sources.caller_roles);

    for raw in raw_roles {
        match Role::parse(raw) {
            Some(role) if !roles.contains(&role) => roles.push(role),
            Some(_) => {}
            None => tracing::debug!(role = %raw, "Dropping unknown audience role"),
        }
    }

    AudienceSpec {
        roles,
        tags: dedup_trimmed([sources.override_tags, sources.caller_tags]),
        user_ids: dedup_trimmed([sources.override_user_ids, sources.caller_user_ids]),
    }
}

fn dedup_trimmed<const N: usize>(lists: [&[String]; N]) -> Vec<String> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .filter(|value| seen.insert(value.to_string()))
        .map(str::to_string)
        .collect()
}
