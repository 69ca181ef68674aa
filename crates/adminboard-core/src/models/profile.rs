use std::fmt;

use serde::{Deserialize, Serialize};

/// Access level attached to every profile.
///
/// Serialized with the short names the dashboard front end has always
/// written to storage (`"Admin"`, `"Editor"`, `"Viewer"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum Role {
    #[serde(rename = "Admin")]
    Administrator,
    Editor,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Administrator, Role::Editor, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Admin",
            Role::Editor => "Editor",
            Role::Viewer => "Viewer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated user's identity.
///
/// Profiles are handed out by value; nothing holding one can reach back
/// into the credential store that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Profile {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    /// Login identifier (an email address in the demo data)
    #[serde(rename = "email")]
    pub identifier: String,
    pub role: Role,
}

impl Profile {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        identifier: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            identifier: identifier.into(),
            role,
        }
    }

    /// First letters of the display name, as shown in the header avatar
    pub fn initials(&self) -> String {
        self.display_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_serializes_front_end_field_names() {
        let profile = Profile::new("1", "John Admin", "admin@admin.com", Role::Administrator);
        let json = serde_json::to_value(&profile).expect("profile serializes");

        assert_eq!(json["id"], "1");
        assert_eq!(json["name"], "John Admin");
        assert_eq!(json["email"], "admin@admin.com");
        assert_eq!(json["role"], "Admin");
    }

    #[test]
    fn test_profile_parses_stored_json() {
        let json = r#"{"id":"2","name":"Jane Editor","email":"editor@demo.com","role":"Editor"}"#;
        let profile: Profile = serde_json::from_str(json).expect("stored profile parses");

        assert_eq!(profile.display_name, "Jane Editor");
        assert_eq!(profile.identifier, "editor@demo.com");
        assert_eq!(profile.role, Role::Editor);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let json = r#"{"id":"9","name":"Root","email":"root@demo.com","role":"Superuser"}"#;
        assert!(serde_json::from_str::<Profile>(json).is_err());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Administrator.to_string(), "Admin");
        assert_eq!(Role::Editor.to_string(), "Editor");
        assert_eq!(Role::Viewer.to_string(), "Viewer");
    }

    #[test]
    fn test_initials() {
        let profile = Profile::new("3", "Bob Viewer", "viewer@demo.com", Role::Viewer);
        assert_eq!(profile.initials(), "BV");

        let single = Profile::new("4", "cher", "cher@demo.com", Role::Viewer);
        assert_eq!(single.initials(), "C");

        let empty = Profile::new("5", "", "x@demo.com", Role::Viewer);
        assert_eq!(empty.initials(), "");
    }
}
