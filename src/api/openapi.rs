use super::handlers::{
    auth, brands, content, dashboard, health, pages, partners, products, settings, uploads, users,
};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document. Handlers sharing a path are
/// registered in one `routes!` call.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(pages::page))
        .routes(routes!(pages::catalog))
        .routes(routes!(content::public_content))
        .routes(routes!(content::public_section))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::access::access))
        .routes(routes!(auth::access::navigation))
        .routes(routes!(dashboard::stats))
        .routes(routes!(products::list_products, products::create_product))
        .routes(routes!(products::update_product, products::delete_product))
        .routes(routes!(brands::list_brands, brands::create_brand))
        .routes(routes!(brands::update_brand, brands::delete_brand))
        .routes(routes!(partners::list_partners, partners::create_partner))
        .routes(routes!(partners::update_partner, partners::delete_partner))
        .routes(routes!(content::list_content, content::create_content))
        .routes(routes!(content::update_content, content::delete_content))
        .routes(routes!(content::refresh_content))
        .routes(routes!(users::list_users, users::create_user))
        .routes(routes!(users::update_user, users::delete_user))
        .routes(routes!(settings::get_settings, settings::update_settings))
        .routes(routes!(uploads::upload))
}

fn tags() -> Vec<Tag> {
    [
        ("health", "Service and database health"),
        ("pages", "Public page payloads and the product catalog"),
        ("content", "Localized website copy"),
        ("auth", "Sign-in, sessions and route access checks"),
        ("admin", "Dashboard navigation, stats and site settings"),
        ("products", "Product management"),
        ("brands", "Brand management"),
        ("partners", "Partner management"),
        ("users", "Staff profile management"),
        ("uploads", "Image uploads"),
    ]
    .into_iter()
    .map(|(name, description)| {
        let mut tag = Tag::new(name);
        tag.description = Some(description.to_string());
        tag
    })
    .collect()
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    let mut doc = OpenApiBuilder::new().info(info).build();
    doc.tags = Some(tags());
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }

    match author.split_once('<') {
        Some((name, email)) => (non_empty(name), non_empty(email.trim_end_matches('>'))),
        None => (non_empty(author), None),
    }
}
