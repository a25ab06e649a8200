//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Points needed to advance one level.
pub const POINTS_PER_LEVEL: u32 = 100;

/// Maximum length of a display name.
pub const NAME_MAX_LEN: usize = 60;
/// Minimum password length accepted at registration.
pub const PASSWORD_MIN_LEN: usize = 6;

/// Level derived from lifetime points. Level 1 starts at zero points
/// and every hundred lifetime points adds one level.
pub fn level_for(total_points_earned: u32) -> u32 {
    total_points_earned / POINTS_PER_LEVEL + 1
}

/// Account role. Admins verify activity submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// User profile stored in Firestore.
///
/// `level` is always `level_for(total_points_earned)`; the verification
/// workflow recomputes it whenever points are awarded, nothing else
/// writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    pub name: String,
    /// Lowercased; unique across the users collection
    pub email: String,
    /// bcrypt hash. Lives only on this storage struct; response types
    /// never carry it.
    pub password_hash: String,
    pub role: Role,
    /// Spendable balance
    pub points: u32,
    /// Lifetime points, never reduced by redemptions
    pub total_points_earned: u32,
    pub level: u32,
    /// Count of approved activities
    pub activities_completed: u32,
    /// When the account was created (ISO 8601)
    pub created_at: String,
}

impl User {
    /// Fresh account with zeroed counters.
    pub fn new_registered(
        id: String,
        name: String,
        email: String,
        password_hash: String,
        now: String,
    ) -> Self {
        Self {
            id,
            name,
            email,
            password_hash,
            role: Role::User,
            points: 0,
            total_points_earned: 0,
            level: 1,
            activities_completed: 0,
            created_at: now,
        }
    }
}

/// Ownership claim on an email address, stored under the address
/// itself.
///
/// Firestore has no unique indexes, so the address is made single-owner
/// by keying this document by the lowercased email and creating it in
/// the same transaction as the profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClaim {
    /// Document ID of the owning [`User`]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for(0), 1);
        assert_eq!(level_for(99), 1);
        assert_eq!(level_for(100), 2);
        assert_eq!(level_for(101), 2);
        assert_eq!(level_for(250), 3);
        assert_eq!(level_for(999), 10);
        assert_eq!(level_for(1000), 11);
    }

    #[test]
    fn test_new_registered_defaults() {
        let user = User::new_registered(
            "u1".to_string(),
            "Asha".to_string(),
            "asha@example.com".to_string(),
            "$2b$12$hash".to_string(),
            "2024-01-15T12:00:00Z".to_string(),
        );
        assert_eq!(user.role, Role::User);
        assert_eq!(user.points, 0);
        assert_eq!(user.total_points_earned, 0);
        assert_eq!(user.level, 1);
        assert_eq!(user.activities_completed, 0);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("superuser"), None);
    }
}
