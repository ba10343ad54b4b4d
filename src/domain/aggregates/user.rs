//! User Aggregate
//!
//! Administrative capability is an explicit [`Role`] on the user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::ShippingAddress;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub provider: AuthProvider,
    pub role: Role,
    pub status: AccountStatus,
    /// End of a temporary block. `None` on a blocked user means permanent.
    pub blocked_until: Option<DateTime<Utc>>,
    pub blocked_reason: Option<String>,
    pub blocked_by: Option<Uuid>,
    pub phone_number: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider { Google, Kakao, #[default] Email }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] Customer, Admin }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus { #[default] Active, Blocked }

macro_rules! string_enum {
    ($ty:ty { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str { match self { $(Self::$variant => $s),+ } }
            pub fn parse(s: &str) -> Option<Self> { match s { $($s => Some(Self::$variant),)+ _ => None } }
        }
    };
}

string_enum!(AuthProvider { Google => "google", Kakao => "kakao", Email => "email" });
string_enum!(Role { Customer => "customer", Admin => "admin" });
string_enum!(AccountStatus { Active => "active", Blocked => "blocked" });

impl User {
    pub fn register(email: impl Into<String>, display_name: impl Into<String>, provider: AuthProvider) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), email: email.into().trim().to_lowercase(), display_name: display_name.into(),
            provider, role: Role::Customer, status: AccountStatus::Active,
            blocked_until: None, blocked_reason: None, blocked_by: None,
            phone_number: None, shipping_address: None, created_at: now, updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }

    /// Blocked, and either permanently or with `blocked_until` not yet passed.
    pub fn is_blocked(&self, now: DateTime<Utc>) -> bool {
        match (self.status, self.blocked_until) {
            (AccountStatus::Active, _) => false,
            (AccountStatus::Blocked, Some(until)) => now <= until,
            (AccountStatus::Blocked, None) => true,
        }
    }

    pub fn block(&mut self, by: Uuid, until: Option<DateTime<Utc>>, reason: Option<String>, now: DateTime<Utc>) -> Result<(), UserError> {
        if by == self.id { return Err(UserError::SelfBlock); }
        if until.is_some_and(|u| u <= now) { return Err(UserError::BlockEndInPast); }
        self.status = AccountStatus::Blocked;
        self.blocked_until = until;
        self.blocked_reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        self.blocked_by = Some(by);
        self.touch();
        Ok(())
    }

    pub fn unblock(&mut self) {
        self.status = AccountStatus::Active;
        self.blocked_until = None;
        self.blocked_reason = None;
        self.blocked_by = None;
        self.touch();
    }

    pub fn set_role(&mut self, role: Role) { self.role = role; self.touch(); }

    pub fn set_shipping_address(&mut self, address: ShippingAddress) { self.shipping_address = Some(address); self.touch(); }

    /// Human-readable block state for admin listings.
    pub fn block_status(&self, now: DateTime<Utc>) -> String {
        match self.blocked_until {
            _ if !self.is_blocked(now) => "active".to_string(),
            Some(until) => format!("blocked until {}", until.format("%Y-%m-%d %H:%M UTC")),
            None => "blocked permanently".to_string(),
        }
    }

    pub(crate) fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum UserError { SelfBlock, BlockEndInPast }
impl std::error::Error for UserError {}
impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelfBlock => write!(f, "Administrators cannot block themselves"),
            Self::BlockEndInPast => write!(f, "Temporary block must end in the future"),
        }
    }
}
