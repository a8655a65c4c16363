use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validate::{require_max_len, require_non_empty, FieldErrors, Validate};

/// An organization boundary. Tenants are the one table with no tenant
/// reference of their own, and they are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenant {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for CreateTenant {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        require_non_empty(&mut errors, "name", &self.name);
        require_max_len(&mut errors, "name", &self.name, 200);
        if !self.name.trim().is_empty() && derive_slug(&self.name).is_empty() {
            errors.add("name", "must contain at least one letter or digit");
        }
        if let Some(description) = &self.description {
            require_max_len(&mut errors, "description", description, 2000);
        }
        errors.finish()
    }
}

impl Validate for UpdateTenant {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            require_non_empty(&mut errors, "name", name);
            require_max_len(&mut errors, "name", name, 200);
        }
        if let Some(description) = &self.description {
            require_max_len(&mut errors, "description", description, 2000);
        }
        errors.finish()
    }
}

/// URL slug from a display name: lowercase, runs of anything
/// non-alphanumeric collapsed to single hyphens. The slug is assigned at
/// creation and never changes afterwards.
pub fn derive_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_was_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
