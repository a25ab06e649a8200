//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email ownership claims (keyed by lowercased email)
    pub const USER_EMAILS: &str = "user_emails";
    pub const ACTIVITIES: &str = "activities";
    pub const REWARDS: &str = "rewards";
    /// Redeemed vouchers (keyed by voucher code)
    pub const USER_REWARDS: &str = "user_rewards";
}
