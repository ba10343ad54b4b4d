//! User records: self-service profile and administrator management.
//!
//! Authentication itself happens upstream; this service only keeps the
//! user records and the role and block state the rest of the app consults.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use crate::domain::aggregates::{AuthProvider, Role, User};
use crate::domain::value_objects::ShippingAddress;
use crate::services::require_admin;
use crate::store::{OrderFilter, Store};
use crate::{GroupBuyError, Result};

/// Administrator edits to a user record. `None` leaves a field alone.
#[derive(Clone, Debug, Default)]
pub struct UserChanges {
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct AccountService { store: Arc<dyn Store> }

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    async fn load(&self, id: Uuid) -> Result<User> {
        self.store.user(id).await?.ok_or(GroupBuyError::UserNotFound)
    }

    async fn save(&self, user: &User) -> Result<()> {
        if !self.store.update_user(user).await? { return Err(GroupBuyError::UserNotFound); }
        Ok(())
    }

    /// Resolves the identity forwarded by the authenticating gateway.
    pub async fn authenticate(&self, id: Uuid) -> Result<User> {
        self.store.user(id).await?.ok_or(GroupBuyError::Unauthenticated)
    }

    /// Creates the record for a freshly signed-up identity.
    pub async fn register(&self, email: &str, display_name: &str, provider: AuthProvider) -> Result<User> {
        let user = User::register(email, display_name.trim(), provider);
        self.store.insert_user(&user).await?;
        info!(user_id = %user.id, provider = provider.as_str(), "user registered");
        Ok(user)
    }

    /// Grants the admin role to `email`, creating the record if needed.
    pub async fn bootstrap_admin(&self, email: &str) -> Result<User> {
        let mut user = match self.store.user_by_email(email).await? {
            Some(user) => user,
            None => {
                let user = User::register(email, email, AuthProvider::Email);
                self.store.insert_user(&user).await?;
                user
            }
        };
        if !user.is_admin() {
            user.set_role(Role::Admin);
            self.save(&user).await?;
            info!(user_id = %user.id, email = %user.email, "bootstrap administrator granted");
        }
        Ok(user)
    }

    pub async fn update_shipping_address(&self, actor: &User, address: ShippingAddress) -> Result<User> {
        let mut user = self.load(actor.id).await?;
        user.set_shipping_address(address);
        self.save(&user).await?;
        Ok(user)
    }

    pub async fn users(&self, actor: &User) -> Result<Vec<User>> {
        require_admin(actor)?;
        Ok(self.store.users().await?)
    }

    pub async fn user(&self, actor: &User, id: Uuid) -> Result<User> {
        require_admin(actor)?;
        self.load(id).await
    }

    pub async fn create_user(&self, actor: &User, email: &str, display_name: &str, role: Role) -> Result<User> {
        require_admin(actor)?;
        let mut user = User::register(email, display_name.trim(), AuthProvider::Email);
        user.role = role;
        self.store.insert_user(&user).await?;
        info!(user_id = %user.id, by = %actor.id, role = role.as_str(), "user created by administrator");
        Ok(user)
    }

    pub async fn update_user(&self, actor: &User, id: Uuid, changes: UserChanges) -> Result<User> {
        require_admin(actor)?;
        if id == actor.id && changes.role.is_some_and(|r| r != Role::Admin) {
            return Err(GroupBuyError::Validation("administrators cannot revoke their own role".into()));
        }
        let mut user = self.load(id).await?;
        if let Some(name) = changes.display_name { user.display_name = name.trim().to_string(); }
        if let Some(phone) = changes.phone_number { user.phone_number = Some(phone).filter(|p| !p.trim().is_empty()); }
        if let Some(role) = changes.role { user.role = role; }
        user.touch();
        self.save(&user).await?;
        Ok(user)
    }

    pub async fn block(&self, actor: &User, id: Uuid, until: Option<DateTime<Utc>>, reason: Option<String>) -> Result<User> {
        require_admin(actor)?;
        let mut user = self.load(id).await?;
        user.block(actor.id, until, reason, Utc::now())?;
        self.save(&user).await?;
        info!(user_id = %id, by = %actor.id, until = ?until, "user blocked");
        Ok(user)
    }

    pub async fn unblock(&self, actor: &User, id: Uuid) -> Result<User> {
        require_admin(actor)?;
        let mut user = self.load(id).await?;
        user.unblock();
        self.save(&user).await?;
        info!(user_id = %id, by = %actor.id, "user unblocked");
        Ok(user)
    }

    /// Removes the user record. Credentials live with the identity provider.
    ///
    /// Refused while the user holds pending orders, since those still count
    /// toward their products' aggregates.
    pub async fn delete_user(&self, actor: &User, id: Uuid) -> Result<()> {
        require_admin(actor)?;
        if id == actor.id { return Err(GroupBuyError::Validation("administrators cannot delete themselves".into())); }
        if !self.store.orders(&OrderFilter::pending_for_user(id)).await?.is_empty() {
            return Err(GroupBuyError::HasPendingOrders);
        }
        if !self.store.delete_user(id).await? { return Err(GroupBuyError::UserNotFound); }
        info!(user_id = %id, by = %actor.id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::store::memory::MemoryStore;

    async fn setup() -> (AccountService, User) {
        let svc = AccountService::new(Arc::new(MemoryStore::new()));
        let admin = svc.bootstrap_admin("Owner@Example.com").await.unwrap();
        (svc, admin)
    }

    #[tokio::test]
    async fn test_bootstrap_admin_is_idempotent() {
        let (svc, admin) = setup().await;
        assert!(admin.is_admin());
        assert_eq!(admin.email, "owner@example.com");
        let again = svc.bootstrap_admin("owner@example.com").await.unwrap();
        assert_eq!(again.id, admin.id);
    }

    #[tokio::test]
    async fn test_bootstrap_promotes_existing_user() {
        let (svc, _) = setup().await;
        let user = svc.register("buyer@example.com", "Buyer", AuthProvider::Kakao).await.unwrap();
        let promoted = svc.bootstrap_admin("buyer@example.com").await.unwrap();
        assert_eq!(promoted.id, user.id);
        assert!(svc.authenticate(user.id).await.unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let (svc, _) = setup().await;
        svc.register("buyer@example.com", "Buyer", AuthProvider::Email).await.unwrap();
        assert!(matches!(svc.register("BUYER@example.com", "Again", AuthProvider::Google).await, Err(GroupBuyError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_unknown_identity_is_unauthenticated() {
        let (svc, _) = setup().await;
        assert!(matches!(svc.authenticate(Uuid::now_v7()).await, Err(GroupBuyError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_block_and_unblock() {
        let (svc, admin) = setup().await;
        let user = svc.register("buyer@example.com", "Buyer", AuthProvider::Email).await.unwrap();
        let until = Utc::now() + Duration::days(7);
        let blocked = svc.block(&admin, user.id, Some(until), Some("abuse".into())).await.unwrap();
        assert!(blocked.is_blocked(Utc::now()));
        assert_eq!(blocked.blocked_by, Some(admin.id));

        assert!(matches!(svc.block(&user, admin.id, None, None).await, Err(GroupBuyError::Forbidden)));
        assert!(matches!(svc.block(&admin, admin.id, None, None).await, Err(GroupBuyError::Validation(_))));

        let restored = svc.unblock(&admin, user.id).await.unwrap();
        assert!(!restored.is_blocked(Utc::now()));
    }

    #[tokio::test]
    async fn test_admin_management() {
        let (svc, admin) = setup().await;
        let staff = svc.create_user(&admin, "staff@example.com", " Staff ", Role::Customer).await.unwrap();
        assert_eq!(staff.display_name, "Staff");

        let changes = UserChanges { role: Some(Role::Admin), phone_number: Some("010-1234-5678".into()), ..Default::default() };
        let staff = svc.update_user(&admin, staff.id, changes).await.unwrap();
        assert!(staff.is_admin());
        assert_eq!(svc.users(&staff).await.unwrap().len(), 2);

        let demote_self = UserChanges { role: Some(Role::Customer), ..Default::default() };
        assert!(matches!(svc.update_user(&admin, admin.id, demote_self).await, Err(GroupBuyError::Validation(_))));
        assert!(matches!(svc.delete_user(&admin, admin.id).await, Err(GroupBuyError::Validation(_))));

        svc.delete_user(&admin, staff.id).await.unwrap();
        assert!(matches!(svc.user(&admin, staff.id).await, Err(GroupBuyError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_delete_refused_while_orders_pending() {
        use crate::domain::aggregates::{Order, OrderStatus};
        use crate::store::OrderStore;

        let store = Arc::new(MemoryStore::new());
        let svc = AccountService::new(store.clone());
        let admin = svc.bootstrap_admin("owner@example.com").await.unwrap();
        let buyer = svc.register("buyer@example.com", "Buyer", AuthProvider::Email).await.unwrap();
        let order = Order::place(Uuid::now_v7(), buyer.id, 2, 1, 9500).unwrap();
        store.insert_order(&order).await.unwrap();

        assert!(matches!(svc.delete_user(&admin, buyer.id).await, Err(GroupBuyError::HasPendingOrders)));
        assert!(svc.user(&admin, buyer.id).await.is_ok());

        store.transition_order(order.id, OrderStatus::Pending, OrderStatus::Cancelled).await.unwrap();
        svc.delete_user(&admin, buyer.id).await.unwrap();
        assert!(matches!(svc.user(&admin, buyer.id).await, Err(GroupBuyError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_shipping_address() {
        let (svc, _) = setup().await;
        let user = svc.register("buyer@example.com", "Buyer", AuthProvider::Email).await.unwrap();
        let address = ShippingAddress {
            recipient_name: "Kim".into(), phone_number: "010-0000-0000".into(), postal_code: "06236".into(),
            address: "123 Teheran-ro".into(), detail_address: "4F".into(), delivery_memo: None,
        };
        let updated = svc.update_shipping_address(&user, address.clone()).await.unwrap();
        assert_eq!(updated.shipping_address, Some(address));
    }
}
