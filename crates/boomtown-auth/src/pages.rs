//! Page-access resolution and custom-role rules.
//!
//! Resolution order:
//!
//! 1. Start from an empty accessible-page set.
//! 2. Union the built-in pages for the user's role (master admin and
//!    admin have broad built-ins; others a base set).
//! 3. Union pages that are both enabled for the tenant and assigned to
//!    the user's role.
//! 4. Subtract master-admin-only pages for everyone else.
//!
//! Built-in roles cannot be deleted or renamed; custom role names are
//! normalized and must not collide with built-ins.

use std::collections::BTreeSet;

use boomtown_types::{BuiltinRole, GameError, Page, RoleName};

/// Every page, for the unrestricted roles.
const ALL_PAGES: [Page; 12] = [
    Page::Dashboard,
    Page::GameBoard,
    Page::Rankings,
    Page::Market,
    Page::Chat,
    Page::Reports,
    Page::Settings,
    Page::AdminUsers,
    Page::AdminModeration,
    Page::AdminAudit,
    Page::AdminTenants,
    Page::AdminMaps,
];

/// The base set every authenticated user gets regardless of grants.
const BASE_PAGES: [Page; 2] = [Page::Dashboard, Page::Settings];

/// The built-in pages for a role (resolution step 2).
fn builtin_pages(role: Option<BuiltinRole>) -> BTreeSet<Page> {
    match role {
        Some(BuiltinRole::MasterAdmin | BuiltinRole::Admin) => ALL_PAGES.iter().copied().collect(),
        Some(BuiltinRole::User) => {
            let mut pages: BTreeSet<Page> = BASE_PAGES.iter().copied().collect();
            pages.insert(Page::GameBoard);
            pages.insert(Page::Rankings);
            pages.insert(Page::Market);
            pages.insert(Page::Chat);
            pages
        }
        Some(BuiltinRole::Analyst) => {
            let mut pages: BTreeSet<Page> = BASE_PAGES.iter().copied().collect();
            pages.insert(Page::Reports);
            pages.insert(Page::Rankings);
            pages
        }
        // Viewers and custom roles start from the bare base set.
        Some(BuiltinRole::Viewer) | None => BASE_PAGES.iter().copied().collect(),
    }
}

/// Resolve the accessible-page set for one user.
///
/// `tenant_enabled` is what the master admin has switched on for the
/// tenant; `role_assigned` is what the tenant admin has granted the
/// user's role (built-in restrictive or custom).
pub fn resolve_pages(
    role: &RoleName,
    tenant_enabled: &[Page],
    role_assigned: &[Page],
) -> BTreeSet<Page> {
    let builtin = role.builtin();
    let mut pages = builtin_pages(builtin);

    // Step 3: tenant-enabled AND role-assigned.
    let enabled: BTreeSet<Page> = tenant_enabled.iter().copied().collect();
    for page in role_assigned {
        if enabled.contains(page) {
            pages.insert(*page);
        }
    }

    // Step 4: master-only pages for master admins alone.
    if builtin != Some(BuiltinRole::MasterAdmin) {
        pages.retain(|p| !p.master_only());
    }

    pages
}

/// Whether a user with this role may open `page`.
pub fn may_access(
    role: &RoleName,
    tenant_enabled: &[Page],
    role_assigned: &[Page],
    page: Page,
) -> bool {
    resolve_pages(role, tenant_enabled, role_assigned).contains(&page)
}

/// Validate a new custom role name: normalize it and reject collisions
/// with built-in names and empty results.
///
/// # Errors
///
/// Returns `invalid_request` for an unusable name and `conflict` for a
/// built-in collision.
pub fn validate_custom_role_name(raw: &str) -> Result<RoleName, GameError> {
    let normalized = RoleName::normalize(raw);
    if normalized.as_str().is_empty() {
        return Err(GameError::invalid("role name has no usable characters"));
    }
    if normalized.builtin().is_some() {
        return Err(GameError::conflict("role name collides with a built-in role"));
    }
    Ok(normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn master_admin_sees_everything() {
        let pages = resolve_pages(&RoleName::normalize("master_admin"), &[], &[]);
        assert_eq!(pages.len(), ALL_PAGES.len());
        assert!(pages.contains(&Page::AdminTenants));
    }

    #[test]
    fn tenant_admin_loses_master_only_pages() {
        let pages = resolve_pages(&RoleName::normalize("admin"), &[], &[]);
        assert!(pages.contains(&Page::AdminUsers));
        assert!(pages.contains(&Page::AdminAudit));
        assert!(!pages.contains(&Page::AdminTenants));
        assert!(!pages.contains(&Page::AdminMaps));
    }

    #[test]
    fn restrictive_roles_need_both_grants() {
        let role = RoleName::normalize("viewer");
        // Assigned but not tenant-enabled: no access.
        let assigned_only = resolve_pages(&role, &[], &[Page::Reports]);
        assert!(!assigned_only.contains(&Page::Reports));
        // Enabled but not assigned: no access.
        let enabled_only = resolve_pages(&role, &[Page::Reports], &[]);
        assert!(!enabled_only.contains(&Page::Reports));
        // Both: access.
        let both = resolve_pages(&role, &[Page::Reports], &[Page::Reports]);
        assert!(both.contains(&Page::Reports));
    }

    #[test]
    fn base_pages_always_present() {
        for name in ["viewer", "analyst", "user", "night_auditor"] {
            let pages = resolve_pages(&RoleName::normalize(name), &[], &[]);
            assert!(pages.contains(&Page::Dashboard), "{name} lost the dashboard");
            assert!(pages.contains(&Page::Settings));
        }
    }

    #[test]
    fn player_role_gets_the_game_surface() {
        let pages = resolve_pages(&RoleName::normalize("user"), &[], &[]);
        assert!(pages.contains(&Page::GameBoard));
        assert!(pages.contains(&Page::Market));
        assert!(pages.contains(&Page::Chat));
        assert!(!pages.contains(&Page::AdminUsers));
    }

    #[test]
    fn master_only_pages_never_leak_through_grants() {
        let role = RoleName::normalize("custom_ops");
        let pages = resolve_pages(&role, &[Page::AdminTenants], &[Page::AdminTenants]);
        assert!(!pages.contains(&Page::AdminTenants));
    }

    #[test]
    fn custom_role_names_normalize_and_collide() {
        let ok = validate_custom_role_name("Night Auditor!").unwrap();
        assert_eq!(ok.as_str(), "nightauditor");

        assert!(validate_custom_role_name("ADMIN").is_err());
        assert!(validate_custom_role_name("Master_Admin").is_err());
        assert!(validate_custom_role_name("!!!").is_err());
    }

    #[test]
    fn may_access_matches_resolution() {
        let role = RoleName::normalize("analyst");
        assert!(may_access(&role, &[], &[], Page::Reports));
        assert!(!may_access(&role, &[], &[], Page::GameBoard));
        assert!(may_access(&role, &[Page::GameBoard], &[Page::GameBoard], Page::GameBoard));
    }
}
