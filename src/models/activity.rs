// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Eco-activity model: categories, scoring table, verification state machine.

use serde::{Deserialize, Serialize};

/// Maximum length of an activity title.
pub const TITLE_MAX_LEN: usize = 100;
/// Maximum length of an activity description.
pub const DESCRIPTION_MAX_LEN: usize = 500;
/// Maximum length of the free-form unit label.
pub const UNIT_MAX_LEN: usize = 20;
/// Maximum number of proof files per submission.
pub const MAX_VERIFICATION_FILES: usize = 3;
/// Maximum length of a rejection reason.
pub const REJECTION_REASON_MAX_LEN: usize = 500;

/// Quantity units beyond this count stop earning extra points.
/// Carbon savings are not capped; only the point award is.
pub const MAX_SCORED_QUANTITY: u32 = 5;

/// The six supported eco-activity categories.
///
/// Base points and carbon factors live here so that the submission
/// estimate and the approval award can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Recycling,
    WaterSaving,
    EnergySaving,
    Transportation,
    TreePlanting,
    WasteReduction,
}

impl ActivityType {
    pub const ALL: [ActivityType; 6] = [
        ActivityType::Recycling,
        ActivityType::WaterSaving,
        ActivityType::EnergySaving,
        ActivityType::Transportation,
        ActivityType::TreePlanting,
        ActivityType::WasteReduction,
    ];

    /// Parse the wire-format category name ("water_saving" etc.).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "recycling" => Some(ActivityType::Recycling),
            "water_saving" => Some(ActivityType::WaterSaving),
            "energy_saving" => Some(ActivityType::EnergySaving),
            "transportation" => Some(ActivityType::Transportation),
            "tree_planting" => Some(ActivityType::TreePlanting),
            "waste_reduction" => Some(ActivityType::WasteReduction),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Recycling => "recycling",
            ActivityType::WaterSaving => "water_saving",
            ActivityType::EnergySaving => "energy_saving",
            ActivityType::Transportation => "transportation",
            ActivityType::TreePlanting => "tree_planting",
            ActivityType::WasteReduction => "waste_reduction",
        }
    }

    /// Points awarded per quantity unit.
    pub fn base_points(&self) -> u32 {
        match self {
            ActivityType::Recycling => 10,
            ActivityType::WaterSaving => 15,
            ActivityType::EnergySaving => 20,
            ActivityType::Transportation => 25,
            ActivityType::TreePlanting => 50,
            ActivityType::WasteReduction => 12,
        }
    }

    /// Estimated CO2 saved per quantity unit, in kilograms.
    pub fn carbon_factor_kg(&self) -> f64 {
        match self {
            ActivityType::Recycling => 2.5,
            ActivityType::WaterSaving => 1.8,
            ActivityType::EnergySaving => 3.2,
            ActivityType::Transportation => 4.5,
            ActivityType::TreePlanting => 22.0,
            ActivityType::WasteReduction => 1.5,
        }
    }

    /// Point award for a quantity, capped at [`MAX_SCORED_QUANTITY`] units.
    pub fn points_for(&self, quantity: u32) -> u32 {
        self.base_points() * quantity.min(MAX_SCORED_QUANTITY)
    }

    /// Carbon savings for a quantity (uncapped).
    pub fn carbon_for(&self, quantity: u32) -> f64 {
        self.carbon_factor_kg() * f64::from(quantity)
    }
}

/// Verification status of a submitted activity.
///
/// `transition` is the only place a status change is legal; every
/// workflow that moves an activity goes through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Approved,
    Rejected,
}

impl ActivityStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ActivityStatus::Pending),
            "approved" => Some(ActivityStatus::Approved),
            "rejected" => Some(ActivityStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Approved => "approved",
            ActivityStatus::Rejected => "rejected",
        }
    }

    /// Whether this status can never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivityStatus::Approved | ActivityStatus::Rejected)
    }

    /// Attempt a status change. The only legal moves are
    /// pending -> approved and pending -> rejected.
    pub fn transition(self, next: ActivityStatus) -> Option<ActivityStatus> {
        match (self, next) {
            (ActivityStatus::Pending, ActivityStatus::Approved)
            | (ActivityStatus::Pending, ActivityStatus::Rejected) => Some(next),
            _ => None,
        }
    }
}

/// Kind of uploaded proof file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// One proof file attached to a submission.
///
/// The file itself lives in object storage; we only keep the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMedia {
    pub media_type: MediaKind,
    pub url: String,
    pub filename: String,
}

/// GPS capture recorded alongside the proof files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported GPS accuracy in meters, when the device provides one.
    pub accuracy: Option<f64>,
    /// Reverse-geocoded address at capture time.
    pub address: String,
    /// When the location was captured (ISO 8601).
    pub captured_at: String,
}

/// Stored activity record in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// UUID (also used as document ID)
    pub id: String,
    /// Submitting user's ID
    pub user_id: String,
    pub activity_type: ActivityType,
    pub title: String,
    pub description: String,
    /// Number of units claimed (trees planted, bags recycled, ...)
    pub quantity: u32,
    /// Free-form unit label ("bags", "trees", ...)
    pub unit: Option<String>,
    /// Proof files (1 to 3 entries)
    pub verification_media: Vec<VerificationMedia>,
    pub location: ActivityLocation,
    pub status: ActivityStatus,
    /// While pending this is the advisory estimate; at approval it is
    /// recomputed from the stored type and quantity and frozen.
    pub points_earned: u32,
    /// Estimated CO2 savings in kilograms
    pub carbon_saved: f64,
    /// Set on rejection
    pub rejection_reason: Option<String>,
    /// Admin user ID that verified this activity
    pub verified_by: Option<String>,
    /// When the activity was verified (ISO 8601)
    pub verified_at: Option<String>,
    /// When the activity was submitted (ISO 8601)
    pub submitted_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_points_table() {
        assert_eq!(ActivityType::Recycling.base_points(), 10);
        assert_eq!(ActivityType::WaterSaving.base_points(), 15);
        assert_eq!(ActivityType::EnergySaving.base_points(), 20);
        assert_eq!(ActivityType::Transportation.base_points(), 25);
        assert_eq!(ActivityType::TreePlanting.base_points(), 50);
        assert_eq!(ActivityType::WasteReduction.base_points(), 12);
    }

    #[test]
    fn test_carbon_factor_table() {
        assert_eq!(ActivityType::Recycling.carbon_factor_kg(), 2.5);
        assert_eq!(ActivityType::WaterSaving.carbon_factor_kg(), 1.8);
        assert_eq!(ActivityType::EnergySaving.carbon_factor_kg(), 3.2);
        assert_eq!(ActivityType::Transportation.carbon_factor_kg(), 4.5);
        assert_eq!(ActivityType::TreePlanting.carbon_factor_kg(), 22.0);
        assert_eq!(ActivityType::WasteReduction.carbon_factor_kg(), 1.5);
    }

    #[test]
    fn test_points_capped_at_five_units() {
        // Two trees: full credit
        assert_eq!(ActivityType::TreePlanting.points_for(2), 100);
        // Ten bags recycled: capped at five units of credit
        assert_eq!(ActivityType::Recycling.points_for(10), 50);
        assert_eq!(ActivityType::Transportation.points_for(5), 125);
        assert_eq!(ActivityType::Transportation.points_for(6), 125);
    }

    #[test]
    fn test_carbon_not_capped() {
        assert_eq!(ActivityType::TreePlanting.carbon_for(2), 44.0);
        assert_eq!(ActivityType::Recycling.carbon_for(10), 25.0);
    }

    #[test]
    fn test_type_parse_round_trip() {
        for ty in ActivityType::ALL {
            assert_eq!(ActivityType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(ActivityType::parse("jogging"), None);
        assert_eq!(ActivityType::parse(""), None);
        // Wire names are snake_case, not display case
        assert_eq!(ActivityType::parse("Tree_Planting"), None);
    }

    #[test]
    fn test_type_serde_uses_snake_case() {
        let json = serde_json::to_string(&ActivityType::WaterSaving).unwrap();
        assert_eq!(json, "\"water_saving\"");
        let back: ActivityType = serde_json::from_str("\"tree_planting\"").unwrap();
        assert_eq!(back, ActivityType::TreePlanting);
    }

    #[test]
    fn test_status_transitions() {
        use ActivityStatus::*;

        assert_eq!(Pending.transition(Approved), Some(Approved));
        assert_eq!(Pending.transition(Rejected), Some(Rejected));

        // Terminal states never move
        assert_eq!(Approved.transition(Rejected), None);
        assert_eq!(Approved.transition(Approved), None);
        assert_eq!(Rejected.transition(Approved), None);
        assert_eq!(Rejected.transition(Rejected), None);

        // No self-loop on pending either
        assert_eq!(Pending.transition(Pending), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!ActivityStatus::Pending.is_terminal());
        assert!(ActivityStatus::Approved.is_terminal());
        assert!(ActivityStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_media_kind_parse() {
        assert_eq!(MediaKind::parse("image"), Some(MediaKind::Image));
        assert_eq!(MediaKind::parse("video"), Some(MediaKind::Video));
        assert_eq!(MediaKind::parse("audio"), None);
    }
}
