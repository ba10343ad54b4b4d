//! Product-info templates and site settings

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use crate::domain::aggregates::{ProductInfoField, ProductInfoTemplate, SiteSettings, User};
use crate::services::require_admin;
use crate::store::Store;
use crate::{GroupBuyError, Result};

#[derive(Clone)]
pub struct SiteService { store: Arc<dyn Store> }

impl SiteService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    pub async fn templates(&self) -> Result<Vec<ProductInfoTemplate>> { Ok(self.store.templates().await?) }

    pub async fn template(&self, id: Uuid) -> Result<ProductInfoTemplate> {
        self.store.template(id).await?.ok_or(GroupBuyError::TemplateNotFound)
    }

    pub async fn create_template(&self, actor: &User, name: &str, fields: Vec<ProductInfoField>) -> Result<ProductInfoTemplate> {
        require_admin(actor)?;
        let template = ProductInfoTemplate::create(name, fields, actor.id)?;
        self.store.insert_template(&template).await?;
        info!(template_id = %template.id, fields = template.fields.len(), "template created");
        Ok(template)
    }

    pub async fn update_template(&self, actor: &User, id: Uuid, name: &str, fields: Vec<ProductInfoField>) -> Result<ProductInfoTemplate> {
        require_admin(actor)?;
        let mut template = self.template(id).await?;
        template.revise(name, fields)?;
        if !self.store.update_template(&template).await? { return Err(GroupBuyError::TemplateNotFound); }
        Ok(template)
    }

    /// Products already filled from the template keep their data.
    pub async fn delete_template(&self, actor: &User, id: Uuid) -> Result<()> {
        require_admin(actor)?;
        if !self.store.delete_template(id).await? { return Err(GroupBuyError::TemplateNotFound); }
        info!(template_id = %id, "template deleted");
        Ok(())
    }

    /// Defaults when nothing has been saved yet.
    pub async fn settings(&self) -> Result<SiteSettings> {
        Ok(self.store.site_settings().await?.unwrap_or_default())
    }

    pub async fn update_settings(&self, actor: &User, site_name: &str, logo_url: Option<String>) -> Result<SiteSettings> {
        require_admin(actor)?;
        let mut settings = self.settings().await?;
        settings.update(site_name, logo_url, actor.id);
        self.store.save_site_settings(&settings).await?;
        info!(site_name = %settings.site_name, "site settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{catalog::DEFAULT_SITE_NAME, AuthProvider, FieldKind, Role};
    use crate::store::memory::MemoryStore;

    fn admin() -> User {
        let mut u = User::register("admin@example.com", "Admin", AuthProvider::Email);
        u.set_role(Role::Admin);
        u
    }

    fn fields() -> Vec<ProductInfoField> {
        vec![
            ProductInfoField { label: "Product name".into(), kind: FieldKind::Text, order: 1 },
            ProductInfoField { label: "Best before".into(), kind: FieldKind::Date, order: 2 },
        ]
    }

    #[tokio::test]
    async fn test_template_lifecycle() {
        let svc = SiteService::new(Arc::new(MemoryStore::new()));
        let admin = admin();
        let t = svc.create_template(&admin, "Food", fields()).await.unwrap();
        let t = svc.update_template(&admin, t.id, "Seafood", fields()).await.unwrap();
        assert_eq!(svc.template(t.id).await.unwrap().name, "Seafood");
        assert_eq!(svc.templates().await.unwrap().len(), 1);
        svc.delete_template(&admin, t.id).await.unwrap();
        assert!(matches!(svc.template(t.id).await, Err(GroupBuyError::TemplateNotFound)));
    }

    #[tokio::test]
    async fn test_customers_cannot_edit_templates() {
        let svc = SiteService::new(Arc::new(MemoryStore::new()));
        let customer = User::register("c@example.com", "C", AuthProvider::Email);
        assert!(matches!(svc.create_template(&customer, "Food", fields()).await, Err(GroupBuyError::Forbidden)));
    }

    #[tokio::test]
    async fn test_settings_default_then_update() {
        let svc = SiteService::new(Arc::new(MemoryStore::new()));
        assert_eq!(svc.settings().await.unwrap().site_name, DEFAULT_SITE_NAME);
        let admin = admin();
        svc.update_settings(&admin, "Fish Hub", Some("https://cdn.example/logo.png".into())).await.unwrap();
        let s = svc.settings().await.unwrap();
        assert_eq!(s.site_name, "Fish Hub");
        assert_eq!(s.updated_by, Some(admin.id));
    }
}
