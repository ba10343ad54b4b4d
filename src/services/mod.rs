//! Application services over the store
pub mod accounts;
pub mod group_buy;
pub mod recalculator;
pub mod site;

pub use accounts::{AccountService, UserChanges};
pub use group_buy::{GroupBuyService, Quote};
pub use recalculator::{OrderRecalculator, Repricing};
pub use site::SiteService;

use crate::domain::aggregates::User;
use crate::{GroupBuyError, Result};

/// Administrative operations check the caller's role, nothing else.
pub(crate) fn require_admin(actor: &User) -> Result<()> {
    if actor.is_admin() { Ok(()) } else { Err(GroupBuyError::Forbidden) }
}
