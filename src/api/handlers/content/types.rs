use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use crate::api::handlers::{normalize_optional, normalize_required, ServiceError};
use crate::content::{ContentMap, Language};

pub const DEFAULT_CONTENT_TYPE: &str = "text";

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ContentInput {
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub key: String,
    pub content_type: Option<String>,
    pub value_en: Option<String>,
    pub value_ar: Option<String>,
    pub value_ku: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ContentFields {
    pub section: String,
    pub key: String,
    pub content_type: String,
    pub value_en: Option<String>,
    pub value_ar: Option<String>,
    pub value_ku: Option<String>,
    pub is_active: bool,
}

impl ContentInput {
    /// # Errors
    /// Returns `400` when the section or key is blank.
    pub fn validate(self) -> Result<ContentFields, ServiceError> {
        let section = normalize_required(&self.section)
            .ok_or_else(|| ServiceError::bad_request("Section is required"))?;
        let key = normalize_required(&self.key)
            .ok_or_else(|| ServiceError::bad_request("Content key is required"))?;
        Ok(ContentFields {
            section,
            key,
            content_type: normalize_optional(self.content_type)
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            value_en: normalize_optional(self.value_en),
            value_ar: normalize_optional(self.value_ar),
            value_ku: normalize_optional(self.value_ku),
            is_active: self.is_active.unwrap_or(true),
        })
    }
}

/// Resolved copy for every section in one language.
#[derive(Debug, Serialize, ToSchema)]
pub struct ContentResponse {
    pub language: Language,
    #[schema(value_type = Object)]
    pub content: ContentMap,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionResponse {
    pub language: Language,
    pub section: String,
    pub content: BTreeMap<String, String>,
}
