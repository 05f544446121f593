//! Route access resolution.
//!
//! Pure functions over a [`Viewer`] snapshot, so the page shell can gate
//! navigation without reaching into the store.

/// Navigable pages of the application shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Page {
    Login,
    Register,
    /// Financial-profile setup.
    AddPix,
    Settings,
    History,
    Admin,
    Home,
}

impl Page {
    /// Pages reachable without a session, even under maintenance.
    pub fn is_auth_page(self) -> bool {
        matches!(self, Page::Login | Page::Register)
    }

    pub fn is_admin_page(self) -> bool {
        matches!(self, Page::Admin)
    }
}

/// Session-derived facts the guard needs, see
/// [`crate::store::Store::viewer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Viewer {
    pub authenticated: bool,
    pub admin: bool,
    /// Financial-profile step done (pix key recorded).
    pub pix_complete: bool,
    pub maintenance: bool,
}

/// Guard decision for one navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Allow,
    /// Render the static maintenance view instead of the route.
    Maintenance,
    /// Send to login, remembering where the viewer meant to go. Restoration
    /// after login is best-effort.
    ToLogin { next: Page },
    /// Force the financial-profile setup before anything else.
    ToAddPix,
    ToHome,
}

/// Resolve whether `viewer` may render `page`.
pub fn resolve(viewer: &Viewer, page: Page) -> Access {
    // Admin retains full access regardless of maintenance state.
    if viewer.maintenance && !viewer.admin && !page.is_auth_page() {
        return Access::Maintenance;
    }
    if page.is_auth_page() {
        return Access::Allow;
    }
    // Admin pages bounce everyone else home, authenticated or not.
    if page.is_admin_page() && !viewer.admin {
        return Access::ToHome;
    }
    if !viewer.authenticated {
        return Access::ToLogin { next: page };
    }
    if !viewer.pix_complete && page != Page::AddPix {
        return Access::ToAddPix;
    }
    if viewer.pix_complete && page == Page::AddPix {
        return Access::ToHome;
    }

    Access::Allow
}
