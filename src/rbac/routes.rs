//! Routing surface and per-route role declarations.

use serde::Serialize;
use utoipa::ToSchema;

use super::{authorize, AccessDecision, Profile, Role, SessionState};

const STAFF: &[Role] = &[Role::Admin, Role::Owner, Role::User];
const MANAGERS: &[Role] = &[Role::Admin, Role::Owner];
const ADMINS: &[Role] = &[Role::Admin];

pub const LOGIN_PATH: &str = "/admin/login";
pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    About,
    Brands,
    Contact,
    /// `/admin`, which only redirects to the dashboard.
    AdminRoot,
    AdminLogin,
    AdminDashboard,
    AdminProducts,
    AdminBrands,
    AdminPartners,
    AdminContent,
    AdminUsers,
    AdminSettings,
    NotFound,
}

impl Route {
    /// Protected routes in sidebar order.
    pub const PROTECTED: [Self; 7] = [
        Self::AdminDashboard,
        Self::AdminProducts,
        Self::AdminBrands,
        Self::AdminPartners,
        Self::AdminContent,
        Self::AdminUsers,
        Self::AdminSettings,
    ];

    /// Map a request path onto a route. Query strings, fragments and trailing
    /// slashes are ignored; anything unknown is `NotFound`.
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Self::Home,
            "/about" => Self::About,
            "/brands" => Self::Brands,
            "/contact" => Self::Contact,
            "/admin" => Self::AdminRoot,
            "/admin/login" => Self::AdminLogin,
            "/admin/dashboard" => Self::AdminDashboard,
            "/admin/products" => Self::AdminProducts,
            "/admin/brands" => Self::AdminBrands,
            "/admin/partners" => Self::AdminPartners,
            "/admin/content" => Self::AdminContent,
            "/admin/users" => Self::AdminUsers,
            "/admin/settings" => Self::AdminSettings,
            _ => Self::NotFound,
        }
    }

    /// Canonical path, `None` for `NotFound`.
    #[must_use]
    pub const fn path(self) -> Option<&'static str> {
        match self {
            Self::Home => Some("/"),
            Self::About => Some("/about"),
            Self::Brands => Some("/brands"),
            Self::Contact => Some("/contact"),
            Self::AdminRoot => Some("/admin"),
            Self::AdminLogin => Some(LOGIN_PATH),
            Self::AdminDashboard => Some(DASHBOARD_PATH),
            Self::AdminProducts => Some("/admin/products"),
            Self::AdminBrands => Some("/admin/brands"),
            Self::AdminPartners => Some("/admin/partners"),
            Self::AdminContent => Some("/admin/content"),
            Self::AdminUsers => Some("/admin/users"),
            Self::AdminSettings => Some("/admin/settings"),
            Self::NotFound => None,
        }
    }

    /// Roles permitted on a protected route; `None` means the route is public.
    #[must_use]
    pub const fn required_roles(self) -> Option<&'static [Role]> {
        match self {
            Self::AdminDashboard | Self::AdminProducts | Self::AdminBrands => Some(STAFF),
            Self::AdminPartners | Self::AdminContent => Some(MANAGERS),
            Self::AdminUsers | Self::AdminSettings => Some(ADMINS),
            Self::Home
            | Self::About
            | Self::Brands
            | Self::Contact
            | Self::AdminRoot
            | Self::AdminLogin
            | Self::NotFound => None,
        }
    }

    /// Sidebar label for protected routes.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::About => "About",
            Self::Brands | Self::AdminBrands => "Brands",
            Self::Contact => "Contact",
            Self::AdminRoot | Self::AdminDashboard => "Dashboard",
            Self::AdminLogin => "Login",
            Self::AdminProducts => "Products",
            Self::AdminPartners => "Partners",
            Self::AdminContent => "Content",
            Self::AdminUsers => "Users",
            Self::AdminSettings => "Settings",
            Self::NotFound => "Not Found",
        }
    }

    /// Evaluate the shared guard for this route. Public routes always allow.
    #[must_use]
    pub fn access(self, state: &SessionState) -> AccessDecision {
        self.required_roles()
            .map_or(AccessDecision::Allow, |roles| authorize(state, roles))
    }

    /// Where the caller should be sent instead of rendering the route, if anywhere.
    #[must_use]
    pub fn redirect(self, decision: AccessDecision) -> Option<&'static str> {
        match (self, decision) {
            (Self::AdminRoot, _) => Some(DASHBOARD_PATH),
            (_, AccessDecision::RedirectToLogin) => Some(LOGIN_PATH),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NavItem {
    pub route: Route,
    pub label: String,
    pub href: String,
}

/// Admin sidebar entries the profile may open, in fixed order.
#[must_use]
pub fn navigation(profile: &Profile) -> Vec<NavItem> {
    let state = SessionState::signed_in(profile.clone());
    Route::PROTECTED
        .iter()
        .filter(|route| route.access(&state).is_allowed())
        .filter_map(|route| {
            route.path().map(|href| NavItem {
                route: *route,
                label: route.label().to_string(),
                href: href.to_string(),
            })
        })
        .collect()
}
