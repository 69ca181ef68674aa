//! Console commands and the text they produce.

use adminboard_core::utils::{format_remaining, format_timestamp, truncate_string};
use adminboard_core::{visible_sections, Profile, Role, Section};
use chrono::{DateTime, Duration, Utc};

/// Longest display name shown before truncating
const MAX_NAME_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    WhoAmI,
    Sections,
    Open(String),
    Logout,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let mut parts = input.split_whitespace();
        let Some(head) = parts.next() else {
            return Command::Empty;
        };

        match head.to_ascii_lowercase().as_str() {
            "whoami" | "me" => Command::WhoAmI,
            "sections" | "nav" => Command::Sections,
            "open" | "go" => match parts.next() {
                Some(path) => Command::Open(path.to_string()),
                None => Command::Unknown(input.trim().to_string()),
            },
            "logout" => Command::Logout,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => Command::Unknown(input.trim().to_string()),
        }
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  whoami          show the signed-in user and idle time left
  sections        list the sections your role can open
  open <path>     open a section, e.g. open /admin/users
  logout          sign out and clear the saved session
  quit            exit, keeping the session for next time";

pub fn describe_profile(
    profile: &Profile,
    last_activity: Option<DateTime<Utc>>,
    remaining: Option<Duration>,
) -> String {
    let mut out = format!(
        "{} [{}] <{}> - {}",
        truncate_string(&profile.display_name, MAX_NAME_WIDTH),
        profile.initials(),
        profile.identifier,
        profile.role
    );
    if let Some(at) = last_activity {
        out.push_str(&format!("\nLast activity: {}", format_timestamp(at)));
    }
    if let Some(left) = remaining {
        out.push_str(&format!("\nIdle logout in: {}", format_remaining(left)));
    }
    out
}

pub fn section_listing(role: Role) -> String {
    visible_sections(role)
        .into_iter()
        .map(|s| format!("  {:<16} {}", s.title(), s.path()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of trying to open a route as the given role
pub fn open_message(role: Option<Role>, path: &str) -> String {
    match (Section::from_path(path), role) {
        (None, _) => format!("No section at {}", path),
        (Some(_), None) => "Not signed in".to_string(),
        (Some(section), Some(role)) if role.can_access(section) => {
            format!("Opened {}", section.title())
        }
        (Some(section), Some(role)) => {
            format!("Access denied: {} requires {}", section.title(), required_roles(section, role))
        }
    }
}

fn required_roles(section: Section, current: Role) -> String {
    let names: Vec<&str> = section
        .allowed_roles()
        .iter()
        .map(Role::as_str)
        .collect();
    format!("{} (you are {})", names.join(" or "), current)
}

// ============================================================================
// Tests
// ============================================================================
