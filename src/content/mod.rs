//! Localized website copy.
//!
//! Content entries are addressed by `(section, key)` and carry one value per
//! supported language. Resolution walks an explicit candidate list
//! (requested language, then English) and takes the first non-empty value;
//! when nothing resolves the entry is left out of the map so callers get their
//! own fallback literal.

mod resolver;

pub use resolver::{ContentCatalog, ContentResolver, ContentSource};

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
    Ku,
}

impl Language {
    pub const ALL: [Self; 3] = [Self::En, Self::Ar, Self::Ku];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ar => "ar",
            Self::Ku => "ku",
        }
    }

    /// Ordered resolution candidates, most preferred first.
    #[must_use]
    pub const fn candidates(self) -> &'static [Self] {
        match self {
            Self::En => &[Self::En],
            Self::Ar => &[Self::Ar, Self::En],
            Self::Ku => &[Self::Ku, Self::En],
        }
    }

    /// Arabic and Kurdish (Sorani) are written right to left.
    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar | Self::Ku)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedLanguage(pub String);

impl fmt::Display for UnsupportedLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported language: {}", self.0)
    }
}

impl std::error::Error for UnsupportedLanguage {}

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ar" => Ok(Self::Ar),
            "ku" => Ok(Self::Ku),
            _ => Err(UnsupportedLanguage(value.to_string())),
        }
    }
}

/// Borrowed per-language values of one localized field.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalizedValues<'a> {
    pub en: Option<&'a str>,
    pub ar: Option<&'a str>,
    pub ku: Option<&'a str>,
}

impl<'a> LocalizedValues<'a> {
    #[must_use]
    pub fn new(en: Option<&'a str>, ar: Option<&'a str>, ku: Option<&'a str>) -> Self {
        Self { en, ar, ku }
    }

    const fn value(&self, language: Language) -> Option<&'a str> {
        match language {
            Language::En => self.en,
            Language::Ar => self.ar,
            Language::Ku => self.ku,
        }
    }
}

/// First non-empty value along the language's candidate list.
#[must_use]
pub fn resolve_localized<'a>(language: Language, values: LocalizedValues<'a>) -> Option<&'a str> {
    language
        .candidates()
        .iter()
        .find_map(|candidate| values.value(*candidate).filter(|value| !value.is_empty()))
}

/// A `website_content` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentItem {
    pub id: Uuid,
    pub section: String,
    pub key: String,
    pub content_type: String,
    pub value_en: Option<String>,
    pub value_ar: Option<String>,
    pub value_ku: Option<String>,
    pub is_active: bool,
    pub updated_at: String,
}

impl ContentItem {
    #[must_use]
    pub fn localized(&self) -> LocalizedValues<'_> {
        LocalizedValues::new(
            self.value_en.as_deref(),
            self.value_ar.as_deref(),
            self.value_ku.as_deref(),
        )
    }

    #[must_use]
    pub fn resolve(&self, language: Language) -> Option<&str> {
        resolve_localized(language, self.localized())
    }
}

/// Resolved copy for one language: section, then key, then string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ContentMap {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl ContentMap {
    /// Inactive items are skipped; items that do not resolve are absent.
    /// Duplicate `(section, key)` pairs keep the last one in input order.
    #[must_use]
    pub fn build(items: &[ContentItem], language: Language) -> Self {
        let mut sections: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        for item in items.iter().filter(|item| item.is_active) {
            if let Some(value) = item.resolve(language) {
                sections
                    .entry(item.section.clone())
                    .or_default()
                    .insert(item.key.clone(), value.to_string());
            }
        }
        Self { sections }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// Never fails: missing section or key yields `fallback`.
    #[must_use]
    pub fn get_content(&self, section: &str, key: &str, fallback: &str) -> String {
        self.get(section, key).unwrap_or(fallback).to_string()
    }

    /// All keys of a section, empty when the section is absent.
    #[must_use]
    pub fn get_section(&self, section: &str) -> BTreeMap<String, String> {
        self.sections.get(section).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }
}
