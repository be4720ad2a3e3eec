//! Screen-to-permission translator.
//!
//! Product-level UI screens, grouped by mode, each backed by exactly one
//! permission key. Used only while authoring custom roles; the evaluator never
//! looks at screens.

use std::collections::BTreeSet;

use serde::Serialize;

use tenantgate_core::PermissionId;

use crate::permissions::PermissionKey;

/// Bumped whenever a screen is added, removed or remapped.
pub const SCREEN_CATALOG_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenMode {
    /// Core workspace screens.
    Workspace,
    /// Secondary studio mode (content, finance, reporting).
    Studio,
}

impl ScreenMode {
    pub const ALL: [ScreenMode; 2] = [ScreenMode::Workspace, ScreenMode::Studio];

    pub fn label(self) -> &'static str {
        match self {
            ScreenMode::Workspace => "Workspace",
            ScreenMode::Studio => "Studio",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screen {
    pub id: &'static str,
    pub label: &'static str,
    pub mode: ScreenMode,
    pub permission: PermissionKey,
}

const fn screen(
    id: &'static str,
    label: &'static str,
    mode: ScreenMode,
    module: &'static str,
    action: &'static str,
) -> Screen {
    Screen {
        id,
        label,
        mode,
        permission: PermissionKey::from_static(module, action),
    }
}

pub const SCREENS: &[Screen] = &[
    screen("dashboard", "Dashboard", ScreenMode::Workspace, "dashboard", "view"),
    screen("projects", "Projects", ScreenMode::Workspace, "projects", "view_all"),
    screen("projects-manage", "Project management", ScreenMode::Workspace, "projects", "edit"),
    screen("tasks", "Tasks", ScreenMode::Workspace, "tasks", "view"),
    screen("tasks-board", "Task board", ScreenMode::Workspace, "tasks", "view"),
    screen("calendar-view", "Calendar", ScreenMode::Workspace, "calendar", "view"),
    screen("calendar-manage", "Calendar editing", ScreenMode::Workspace, "calendar", "manage"),
    screen("clients", "Clients", ScreenMode::Workspace, "clients", "view"),
    screen("documents", "Documents", ScreenMode::Workspace, "documents", "view"),
    screen("chat", "Chat", ScreenMode::Workspace, "chat", "access"),
    screen("team", "Team", ScreenMode::Workspace, "team", "view"),
    screen("content-library", "Content library", ScreenMode::Studio, "content", "view"),
    screen("content-publish", "Publishing", ScreenMode::Studio, "content", "publish"),
    screen("finance-overview", "Finance overview", ScreenMode::Studio, "finance", "view"),
    screen("finance-edit", "Finance entries", ScreenMode::Studio, "finance", "edit"),
    screen("invoices", "Invoices", ScreenMode::Studio, "invoices", "view"),
    screen("reports", "Reports", ScreenMode::Studio, "reports", "view"),
    screen("agents", "Agents", ScreenMode::Studio, "agents", "manage"),
];

pub fn find_screen(id: &str) -> Option<&'static Screen> {
    SCREENS.iter().find(|s| s.id == id)
}

/// Every screen id, in catalogue order (the "select all" shortcut).
pub fn all_screen_ids() -> Vec<&'static str> {
    SCREENS.iter().map(|s| s.id).collect()
}

pub fn screens_in(mode: ScreenMode) -> impl Iterator<Item = &'static Screen> {
    SCREENS.iter().filter(move |s| s.mode == mode)
}

/// Distinct permission keys behind the given screens. Unknown ids grant nothing.
pub fn permission_keys<'a, I>(screen_ids: I) -> BTreeSet<PermissionKey>
where
    I: IntoIterator<Item = &'a str>,
{
    screen_ids
        .into_iter()
        .filter_map(find_screen)
        .map(|s| s.permission.clone())
        .collect()
}

/// Resolves screens to catalog permission ids.
///
/// `lookup` maps a key to its catalog row; keys with no row are dropped
/// silently, as are unknown screen ids.
pub fn resolve<'a, I, F>(screen_ids: I, mut lookup: F) -> BTreeSet<PermissionId>
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&PermissionKey) -> Option<PermissionId>,
{
    permission_keys(screen_ids)
        .iter()
        .filter_map(|key| lookup(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use proptest::prelude::*;

    use super::*;
    use crate::permissions::catalog_entry;

    fn catalog_ids() -> BTreeMap<PermissionKey, PermissionId> {
        crate::permissions::CATALOG
            .iter()
            .map(|e| (e.key(), PermissionId::new()))
            .collect()
    }

    #[test]
    fn screen_ids_are_unique() {
        let ids: HashSet<_> = SCREENS.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), SCREENS.len());
    }

    #[test]
    fn every_screen_is_backed_by_the_catalog() {
        for s in SCREENS {
            assert!(
                catalog_entry(s.permission.module(), s.permission.action()).is_some(),
                "screen {} points at unknown permission {}",
                s.id,
                s.permission
            );
        }
    }

    #[test]
    fn full_selection_resolves_every_distinct_key_once() {
        let ids = catalog_ids();
        let resolved = resolve(all_screen_ids(), |k| ids.get(k).copied());
        let distinct: HashSet<_> = SCREENS.iter().map(|s| &s.permission).collect();
        assert_eq!(resolved.len(), distinct.len());
        // tasks + tasks-board share one key
        assert!(resolved.len() < SCREENS.len());
    }

    #[test]
    fn unknown_screens_are_dropped() {
        let ids = catalog_ids();
        let resolved = resolve(["calendar-view", "teleport"], |k| ids.get(k).copied());
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn keys_without_catalog_rows_are_dropped() {
        let resolved = resolve(["calendar-view"], |_| None);
        assert!(resolved.is_empty());
    }

    #[test]
    fn modes_partition_the_catalogue() {
        let total: usize = ScreenMode::ALL.iter().map(|m| screens_in(*m).count()).sum();
        assert_eq!(total, SCREENS.len());
    }

    proptest! {
        #[test]
        fn resolution_never_exceeds_selection(picks in proptest::collection::vec(0usize..SCREENS.len(), 1..10)) {
            let ids = catalog_ids();
            let selected: Vec<&str> = picks.iter().map(|i| SCREENS[*i].id).collect();
            let resolved = resolve(selected.iter().copied(), |k| ids.get(k).copied());
            let distinct: HashSet<&str> = selected.iter().copied().collect();
            prop_assert!(!resolved.is_empty());
            prop_assert!(resolved.len() <= distinct.len());
        }
    }
}
