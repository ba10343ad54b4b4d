//! Product information templates and site settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_SITE_NAME: &str = "Group Buying";

/// A reusable list of disclosure fields an administrator fills in per product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductInfoTemplate {
    pub id: Uuid,
    pub name: String,
    pub fields: Vec<ProductInfoField>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfoField {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub order: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind { #[default] Text, Textarea, Number, Date }

impl ProductInfoTemplate {
    pub fn create(name: impl Into<String>, fields: Vec<ProductInfoField>, created_by: Uuid) -> Result<Self, TemplateError> {
        let mut template = Self { id: Uuid::now_v7(), name: String::new(), fields: vec![], created_by, created_at: Utc::now() };
        template.revise(name, fields)?;
        Ok(template)
    }

    /// Fields are kept sorted by `order`; labels must be unique.
    pub fn revise(&mut self, name: impl Into<String>, mut fields: Vec<ProductInfoField>) -> Result<(), TemplateError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(TemplateError::MissingName); }
        for field in &mut fields { field.label = field.label.trim().to_string(); }
        if fields.iter().any(|f| f.label.is_empty()) { return Err(TemplateError::EmptyLabel); }
        fields.sort_by_key(|f| f.order);
        if let Some(dup) = fields.iter().enumerate().find_map(|(i, f)| fields[..i].iter().any(|g| g.label == f.label).then(|| f.label.clone())) {
            return Err(TemplateError::DuplicateLabel(dup));
        }
        self.name = name;
        self.fields = fields;
        Ok(())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> { self.fields.iter().map(|f| f.label.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum TemplateError { MissingName, EmptyLabel, DuplicateLabel(String) }
impl std::error::Error for TemplateError {}
impl std::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "Template name is required"),
            Self::EmptyLabel => write!(f, "Field labels cannot be empty"),
            Self::DuplicateLabel(l) => write!(f, "Duplicate field label: {l}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub logo_url: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self { site_name: DEFAULT_SITE_NAME.to_string(), logo_url: None, updated_at: Utc::now(), updated_by: None }
    }
}

impl SiteSettings {
    /// Blank inputs fall back to the default name and no logo.
    pub fn update(&mut self, site_name: &str, logo_url: Option<String>, by: Uuid) {
        let name = site_name.trim();
        self.site_name = if name.is_empty() { DEFAULT_SITE_NAME.to_string() } else { name.to_string() };
        self.logo_url = logo_url.filter(|u| !u.trim().is_empty());
        self.updated_by = Some(by);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(label: &str, order: u32) -> ProductInfoField { ProductInfoField { label: label.into(), kind: FieldKind::Text, order } }

    #[test]
    fn test_template_sorts_fields() {
        let t = ProductInfoTemplate::create("Food", vec![field("Origin", 2), field("Product name", 1)], Uuid::nil()).unwrap();
        assert_eq!(t.labels().collect::<Vec<_>>(), vec!["Product name", "Origin"]);
    }

    #[test]
    fn test_template_validation() {
        assert_eq!(ProductInfoTemplate::create(" ", vec![], Uuid::nil()).unwrap_err(), TemplateError::MissingName);
        assert_eq!(ProductInfoTemplate::create("Food", vec![field(" ", 1)], Uuid::nil()).unwrap_err(), TemplateError::EmptyLabel);
        assert_eq!(
            ProductInfoTemplate::create("Food", vec![field("Weight", 1), field("Weight ", 2)], Uuid::nil()).unwrap_err(),
            TemplateError::DuplicateLabel("Weight".into())
        );
    }

    #[test]
    fn test_field_kind_wire_name() {
        let json = serde_json::to_value(ProductInfoField { label: "Made on".into(), kind: FieldKind::Date, order: 3 }).unwrap();
        assert_eq!(json["type"], "date");
    }

    #[test]
    fn test_settings_fallbacks() {
        let mut s = SiteSettings::default();
        s.update("  ", Some(" ".into()), Uuid::nil());
        assert_eq!(s.site_name, DEFAULT_SITE_NAME);
        assert_eq!(s.logo_url, None);
        s.update("Fish Hub", Some("https://cdn.example/logo.png".into()), Uuid::nil());
        assert_eq!(s.site_name, "Fish Hub");
    }
}
