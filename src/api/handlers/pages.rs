//! Public page payloads and the product catalog.
//!
//! A page payload bundles the resolved copy of the sections that page renders
//! (plus the shared layout sections) so the frontend needs one request per
//! page. The catalog localizes product and brand text with the same fallback
//! chain as the website copy.

use anyhow::Context;
use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::{collections::BTreeMap, sync::Arc};
use tracing::Instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{db_span, LanguageQuery, ServiceError};
use crate::content::{resolve_localized, ContentCatalog, ContentMap, Language, LocalizedValues};

/// Sections rendered by the header and footer of every page.
const LAYOUT_SECTIONS: &[&str] = &["header", "footer", "social_media", "contact"];

/// Matches every value in the `category` and `brand` filters.
const ALL: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Home,
    About,
    Brands,
    Contact,
}

impl Page {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "home" | "index" => Some(Self::Home),
            "about" => Some(Self::About),
            "brands" => Some(Self::Brands),
            "contact" => Some(Self::Contact),
            _ => None,
        }
    }

    /// Content sections owned by the page body.
    #[must_use]
    pub const fn sections(self) -> &'static [&'static str] {
        match self {
            Self::Home => &[
                "hero",
                "business",
                "about",
                "cta",
                "service_1",
                "service_2",
                "service_3",
                "service_4",
            ],
            Self::About => &["about", "business"],
            Self::Brands => &["brands"],
            Self::Contact => &["contact"],
        }
    }

    const fn with_catalog(self) -> bool {
        matches!(self, Self::Brands)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl From<Language> for Direction {
    fn from(language: Language) -> Self {
        if language.is_rtl() {
            Self::Rtl
        } else {
            Self::Ltr
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PagePayload {
    pub page: Page,
    pub language: Language,
    pub direction: Direction,
    /// Section, then key, then resolved value. Absent keys were not resolvable.
    pub content: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<CatalogProduct>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brands: Option<Vec<CatalogBrand>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogBrand {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogResponse {
    pub language: Language,
    /// Distinct product categories, in first-seen order.
    pub categories: Vec<String>,
    pub products: Vec<CatalogProduct>,
    pub brands: Vec<CatalogBrand>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    /// `en`, `ar` or `ku`. Defaults to `en`.
    pub lang: Option<String>,
    /// Exact category; `all` or empty disables the filter.
    pub category: Option<String>,
    /// Brand name; `all` or empty disables the filter.
    pub brand: Option<String>,
    /// Case-insensitive search over the localized name and description.
    pub q: Option<String>,
}

impl CatalogQuery {
    fn language(&self) -> Result<Language, ServiceError> {
        LanguageQuery {
            lang: self.lang.clone(),
        }
        .language()
    }
}

fn active_filter(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case(ALL))
}

/// Apply the catalog filters to already localized products.
///
/// Products carry no brand reference, so a brand filter only checks that the
/// brand is listed: a known name keeps every product, an unknown one keeps
/// none.
#[must_use]
pub fn filter_catalog(
    products: Vec<CatalogProduct>,
    brands: &[CatalogBrand],
    query: &CatalogQuery,
) -> Vec<CatalogProduct> {
    if let Some(brand) = active_filter(query.brand.as_deref()) {
        if !brands.iter().any(|candidate| candidate.name == brand) {
            return Vec::new();
        }
    }
    let category = active_filter(query.category.as_deref());
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    products
        .into_iter()
        .filter(|product| category.map_or(true, |c| product.category.as_deref() == Some(c)))
        .filter(|product| {
            needle.as_deref().map_or(true, |needle| {
                product.name.to_lowercase().contains(needle)
                    || product
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(needle))
            })
        })
        .collect()
}

fn categories(products: &[CatalogProduct]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for category in products.iter().filter_map(|p| p.category.as_deref()) {
        if !seen.iter().any(|known| known == category) {
            seen.push(category.to_string());
        }
    }
    seen
}

fn page_content(map: &ContentMap, page: Page) -> BTreeMap<String, BTreeMap<String, String>> {
    LAYOUT_SECTIONS
        .iter()
        .chain(page.sections())
        .map(|section| ((*section).to_string(), map.get_section(section)))
        .collect()
}

fn localized(row: &PgRow, language: Language, column: &str) -> Option<String> {
    let en: Option<String> = row.get(format!("{column}_en").as_str());
    let ar: Option<String> = row.get(format!("{column}_ar").as_str());
    let ku: Option<String> = row.get(format!("{column}_ku").as_str());
    resolve_localized(
        language,
        LocalizedValues::new(en.as_deref(), ar.as_deref(), ku.as_deref()),
    )
    .map(str::to_string)
}

async fn catalog_products(
    pool: &PgPool,
    language: Language,
) -> anyhow::Result<Vec<CatalogProduct>> {
    let query = r"
        SELECT id, name_en, name_ar, name_ku, description_en, description_ar, description_ku,
               category, price, image_url
        FROM products
        WHERE is_active
        ORDER BY created_at DESC
    ";
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to load catalog products")?;
    Ok(rows
        .iter()
        .map(|row| CatalogProduct {
            id: row.get("id"),
            name: localized(row, language, "name").unwrap_or_else(|| row.get("name_en")),
            description: localized(row, language, "description"),
            category: row.get("category"),
            price: row.get("price"),
            image_url: row.get("image_url"),
        })
        .collect())
}

async fn catalog_brands(pool: &PgPool, language: Language) -> anyhow::Result<Vec<CatalogBrand>> {
    let query = r"
        SELECT id, name, description_en, description_ar, description_ku, logo_url, website_url
        FROM brands
        WHERE is_active
        ORDER BY name
    ";
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(db_span("SELECT", query))
        .await
        .context("failed to load catalog brands")?;
    Ok(rows
        .iter()
        .map(|row| CatalogBrand {
            id: row.get("id"),
            name: row.get("name"),
            description: localized(row, language, "description"),
            logo_url: row.get("logo_url"),
            website_url: row.get("website_url"),
        })
        .collect())
}

#[utoipa::path(
    get,
    path = "/v1/pages/{page}",
    params(
        ("page" = String, Path, description = "home, about, brands or contact"),
        LanguageQuery
    ),
    responses(
        (status = 200, description = "Resolved page payload", body = PagePayload),
        (status = 400, description = "Unsupported language"),
        (status = 404, description = "Unknown page"),
    ),
    tag = "pages"
)]
pub async fn page(
    Path(page): Path<String>,
    Query(query): Query<LanguageQuery>,
    pool: Extension<PgPool>,
    catalog: Extension<Arc<ContentCatalog>>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = Page::parse(&page).ok_or(ServiceError::NotFound)?;
    let language = query.language()?;
    let map = catalog.map(language).await;

    let (products, brands) = if page.with_catalog() {
        (
            Some(catalog_products(&pool, language).await?),
            Some(catalog_brands(&pool, language).await?),
        )
    } else {
        (None, None)
    };

    Ok(Json(PagePayload {
        page,
        language,
        direction: language.into(),
        content: page_content(&map, page),
        products,
        brands,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Active products and brands", body = CatalogResponse),
        (status = 400, description = "Unsupported language"),
    ),
    tag = "pages"
)]
pub async fn catalog(
    Query(query): Query<CatalogQuery>,
    pool: Extension<PgPool>,
) -> Result<impl IntoResponse, ServiceError> {
    let language = query.language()?;
    let products = catalog_products(&pool, language).await?;
    let brands = catalog_brands(&pool, language).await?;
    let categories = categories(&products);
    let products = filter_catalog(products, &brands, &query);
    Ok(Json(CatalogResponse {
        language,
        categories,
        products,
        brands,
    }))
}
