use serde::{Deserialize, Serialize};

use super::profile::Role;

/// Navigable areas of the admin dashboard, in sidebar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Section {
    Dashboard,
    UserManagement,
    Analytics,
    ActivityLogs,
    Settings,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Dashboard,
        Section::UserManagement,
        Section::Analytics,
        Section::ActivityLogs,
        Section::Settings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Section::Dashboard => "Dashboard",
            Section::UserManagement => "User Management",
            Section::Analytics => "Analytics",
            Section::ActivityLogs => "Activity Logs",
            Section::Settings => "Settings",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Section::Dashboard => "/admin",
            Section::UserManagement => "/admin/users",
            Section::Analytics => "/admin/analytics",
            Section::ActivityLogs => "/admin/activity",
            Section::Settings => "/admin/settings",
        }
    }

    /// Resolve a route path; a single trailing slash is tolerated
    pub fn from_path(path: &str) -> Option<Section> {
        let trimmed = match path.strip_suffix('/') {
            Some(rest) if !rest.is_empty() => rest,
            _ => path,
        };
        Section::ALL.into_iter().find(|s| s.path() == trimmed)
    }

    /// Roles allowed to open this section
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Section::Dashboard => &[Role::Administrator, Role::Editor, Role::Viewer],
            Section::UserManagement => &[Role::Administrator],
            Section::Analytics => &[Role::Administrator, Role::Editor],
            Section::ActivityLogs => &[Role::Administrator, Role::Editor],
            Section::Settings => &[Role::Administrator],
        }
    }
}

impl Role {
    pub fn can_access(self, section: Section) -> bool {
        section.allowed_roles().contains(&self)
    }
}

/// Sections a role may see, in navigation order
pub fn visible_sections(role: Role) -> Vec<Section> {
    Section::ALL
        .into_iter()
        .filter(|s| role.can_access(*s))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_administrator_sees_everything() {
        assert_eq!(visible_sections(Role::Administrator), Section::ALL.to_vec());
    }

    #[test]
    fn test_editor_sections() {
        assert_eq!(
            visible_sections(Role::Editor),
            vec![Section::Dashboard, Section::Analytics, Section::ActivityLogs]
        );
    }

    #[test]
    fn test_viewer_sections() {
        assert_eq!(visible_sections(Role::Viewer), vec![Section::Dashboard]);
    }

    #[test]
    fn test_admin_only_sections() {
        for section in [Section::UserManagement, Section::Settings] {
            assert!(Role::Administrator.can_access(section));
            assert!(!Role::Editor.can_access(section));
            assert!(!Role::Viewer.can_access(section));
        }
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Section::from_path("/admin"), Some(Section::Dashboard));
        assert_eq!(Section::from_path("/admin/users"), Some(Section::UserManagement));
        assert_eq!(Section::from_path("/admin/activity/"), Some(Section::ActivityLogs));
        assert_eq!(Section::from_path("/"), None);
        assert_eq!(Section::from_path("/admin/billing"), None);
    }

    #[test]
    fn test_path_round_trips_for_every_section() {
        for section in Section::ALL {
            assert_eq!(Section::from_path(section.path()), Some(section));
        }
    }
}
