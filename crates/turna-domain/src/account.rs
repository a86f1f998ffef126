use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use turna_common::AccountId;

/// Legacy convenience role on the Account itself. The authoritative role
/// for any given tenant lives on that tenant's [`crate::member::Member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccountRole {
    Admin,
    Account,
}

/// A human principal, globally unique by lowercased email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    pub name: String,
    pub auth_provider: String,
    pub role: AccountRole,
}

impl Account {
    /// Emails are compared case-insensitively everywhere; this is the one
    /// place that normalizes, so callers never re-derive the rule.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}
