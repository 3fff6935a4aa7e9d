use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque caller identity issued by the identity provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
}

/// Gateway role. Teachers are stored as `Admin`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Role as presented during registration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleChoice {
    Student,
    Teacher,
}

impl RoleChoice {
    pub fn backend_role(self) -> UserRole {
        match self {
            RoleChoice::Student => UserRole::User,
            RoleChoice::Teacher => UserRole::Admin,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Some(RoleChoice::Student),
            "teacher" => Some(RoleChoice::Teacher),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_maps_to_admin() {
        assert_eq!(RoleChoice::Teacher.backend_role(), UserRole::Admin);
        assert_eq!(RoleChoice::Student.backend_role(), UserRole::User);
    }

    #[test]
    fn test_role_choice_parse_is_case_insensitive() {
        assert_eq!(RoleChoice::parse(" Teacher"), Some(RoleChoice::Teacher));
        assert_eq!(RoleChoice::parse("STUDENT"), Some(RoleChoice::Student));
        assert_eq!(RoleChoice::parse("janitor"), None);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"admin\"");
        let role: UserRole = serde_json::from_str("\"guest\"").unwrap();
        assert_eq!(role, UserRole::Guest);
    }
}
