//! Aggregation folds for user, leaderboard, and platform statistics.
//!
//! All aggregates are computed in memory over activities fetched from
//! Firestore. Collections stay small per user, and the platform stats
//! endpoint folds once per request rather than maintaining counters
//! that every write path would have to keep consistent.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{Months, NaiveDate};

use crate::models::activity::{Activity, ActivityStatus};
use crate::models::user::User;
use crate::time_utils::parse_utc_day;

/// Window for the platform "active users" count, in days.
pub const ACTIVE_USER_WINDOW_DAYS: i64 = 30;
/// Months of history in the user progress series.
pub const PROGRESS_MONTHS: usize = 6;
/// Months of history in the platform growth series.
pub const GROWTH_MONTHS: usize = 12;

/// Per-category slice of approved activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeBreakdown {
    pub count: u32,
    pub points: u32,
    pub carbon: f64,
}

/// One month of a user's approved activity.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyProgress {
    /// "YYYY-MM"
    pub month: String,
    pub activities: u32,
    pub points: u32,
    pub carbon: f64,
}

/// Fold of a single user's activity history.
#[derive(Debug, Clone, PartialEq)]
pub struct UserActivityStats {
    pub total_activities: u32,
    pub pending_activities: u32,
    pub approved_activities: u32,
    pub rejected_activities: u32,
    /// Kilograms of CO2 across approved activities
    pub carbon_saved: f64,
    /// Percent of submissions approved, rounded
    pub completion_rate: u32,
    /// Consecutive days ending today with at least one submission
    pub current_streak: u32,
    /// Approved activity per category, keyed by wire name
    pub breakdown: HashMap<String, TypeBreakdown>,
    /// Oldest to newest, [`PROGRESS_MONTHS`] entries
    pub monthly_progress: Vec<MonthlyProgress>,
}

/// Fold a user's activities into dashboard statistics.
///
/// `today` anchors the streak walk and the progress series so tests
/// can pin the clock.
pub fn compute_user_stats(activities: &[Activity], today: NaiveDate) -> UserActivityStats {
    let mut stats = UserActivityStats {
        total_activities: 0,
        pending_activities: 0,
        approved_activities: 0,
        rejected_activities: 0,
        carbon_saved: 0.0,
        completion_rate: 0,
        current_streak: 0,
        breakdown: HashMap::new(),
        monthly_progress: Vec::new(),
    };

    let mut submission_days: HashSet<NaiveDate> = HashSet::new();
    let mut monthly: HashMap<String, (u32, u32, f64)> = HashMap::new();

    for activity in activities {
        stats.total_activities += 1;
        match activity.status {
            ActivityStatus::Pending => stats.pending_activities += 1,
            ActivityStatus::Approved => stats.approved_activities += 1,
            ActivityStatus::Rejected => stats.rejected_activities += 1,
        }

        if let Some(day) = parse_utc_day(&activity.submitted_at) {
            submission_days.insert(day);
        }

        if activity.status == ActivityStatus::Approved {
            stats.carbon_saved += activity.carbon_saved;

            let entry = stats
                .breakdown
                .entry(activity.activity_type.as_str().to_string())
                .or_default();
            entry.count += 1;
            entry.points += activity.points_earned;
            entry.carbon += activity.carbon_saved;

            if let Some(month_key) = extract_month_key(&activity.submitted_at) {
                let bucket = monthly.entry(month_key).or_insert((0, 0, 0.0));
                bucket.0 += 1;
                bucket.1 += activity.points_earned;
                bucket.2 += activity.carbon_saved;
            }
        }
    }

    stats.completion_rate = percentage(stats.approved_activities, stats.total_activities);
    stats.current_streak = current_streak_days(&submission_days, today);
    stats.monthly_progress = trailing_months(today, PROGRESS_MONTHS)
        .into_iter()
        .map(|month| {
            let (activities, points, carbon) = monthly.get(&month).copied().unwrap_or((0, 0, 0.0));
            MonthlyProgress {
                month,
                activities,
                points,
                carbon,
            }
        })
        .collect();

    stats
}

/// Consecutive days with at least one submission, walking back from
/// `today`. The streak requires a submission today; a run that ended
/// yesterday has already broken and counts as zero.
pub fn current_streak_days(submission_days: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    if !submission_days.contains(&today) {
        return 0;
    }

    let mut streak = 1;
    let mut day = today;
    while let Some(prev) = day.pred_opt() {
        if !submission_days.contains(&prev) {
            break;
        }
        streak += 1;
        day = prev;
    }
    streak
}

/// Leaderboard order: lifetime points descending, ties broken by
/// account age so earlier members rank ahead on equal totals.
pub fn compare_leaderboard(a: &User, b: &User) -> Ordering {
    b.total_points_earned
        .cmp(&a.total_points_earned)
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// One month of platform growth.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyGrowth {
    /// "YYYY-MM"
    pub month: String,
    pub new_users: u32,
    pub approved_activities: u32,
}

/// Platform-wide fold across all users and activities.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformStats {
    pub total_users: u32,
    pub total_activities: u32,
    pub pending_activities: u32,
    pub approved_activities: u32,
    pub rejected_activities: u32,
    /// Sum of frozen point awards across approved activities
    pub total_points_awarded: u32,
    /// Kilograms of CO2 across approved activities
    pub total_carbon_saved: f64,
    /// Percent of submissions approved, rounded
    pub approval_rate: u32,
    /// Distinct users with a submission in the trailing
    /// [`ACTIVE_USER_WINDOW_DAYS`] days
    pub active_users: u32,
    /// Approved activity per category, keyed by wire name
    pub breakdown: HashMap<String, TypeBreakdown>,
    /// Oldest to newest, [`GROWTH_MONTHS`] entries
    pub monthly_growth: Vec<MonthlyGrowth>,
}

/// Fold the whole store into platform statistics.
pub fn compute_platform_stats(
    users: &[User],
    activities: &[Activity],
    today: NaiveDate,
) -> PlatformStats {
    let mut stats = PlatformStats {
        total_users: users.len() as u32,
        total_activities: 0,
        pending_activities: 0,
        approved_activities: 0,
        rejected_activities: 0,
        total_points_awarded: 0,
        total_carbon_saved: 0.0,
        approval_rate: 0,
        active_users: 0,
        breakdown: HashMap::new(),
        monthly_growth: Vec::new(),
    };

    let mut active: HashSet<&str> = HashSet::new();
    let mut monthly_approved: HashMap<String, u32> = HashMap::new();

    for activity in activities {
        stats.total_activities += 1;
        match activity.status {
            ActivityStatus::Pending => stats.pending_activities += 1,
            ActivityStatus::Approved => stats.approved_activities += 1,
            ActivityStatus::Rejected => stats.rejected_activities += 1,
        }

        if let Some(day) = parse_utc_day(&activity.submitted_at) {
            if today.signed_duration_since(day).num_days() < ACTIVE_USER_WINDOW_DAYS {
                active.insert(activity.user_id.as_str());
            }
        }

        if activity.status == ActivityStatus::Approved {
            stats.total_points_awarded += activity.points_earned;
            stats.total_carbon_saved += activity.carbon_saved;

            let entry = stats
                .breakdown
                .entry(activity.activity_type.as_str().to_string())
                .or_default();
            entry.count += 1;
            entry.points += activity.points_earned;
            entry.carbon += activity.carbon_saved;

            if let Some(month_key) = extract_month_key(&activity.submitted_at) {
                *monthly_approved.entry(month_key).or_insert(0) += 1;
            }
        }
    }

    let mut monthly_users: HashMap<String, u32> = HashMap::new();
    for user in users {
        if let Some(month_key) = extract_month_key(&user.created_at) {
            *monthly_users.entry(month_key).or_insert(0) += 1;
        }
    }

    stats.approval_rate = percentage(stats.approved_activities, stats.total_activities);
    stats.active_users = active.len() as u32;
    stats.monthly_growth = trailing_months(today, GROWTH_MONTHS)
        .into_iter()
        .map(|month| MonthlyGrowth {
            new_users: monthly_users.get(&month).copied().unwrap_or(0),
            approved_activities: monthly_approved.get(&month).copied().unwrap_or(0),
            month,
        })
        .collect();

    stats
}

/// Rounded percentage, zero when the denominator is zero.
fn percentage(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((f64::from(part) / f64::from(total)) * 100.0).round() as u32
}

/// Extract "YYYY-MM" from an ISO 8601 date string.
fn extract_month_key(date: &str) -> Option<String> {
    // ISO 8601: "2024-01-15T10:30:00Z" -> "2024-01"
    if date.len() >= 7 {
        Some(date[..7].to_string())
    } else {
        None
    }
}

/// The `count` month keys ending at `today`'s month, oldest first.
fn trailing_months(today: NaiveDate, count: usize) -> Vec<String> {
    (0..count)
        .rev()
        .filter_map(|i| today.checked_sub_months(Months::new(i as u32)))
        .map(|date| date.format("%Y-%m").to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::activity::{ActivityLocation, ActivityType, MediaKind, VerificationMedia};
    use crate::models::user::Role;

    fn make_activity(
        id: &str,
        user_id: &str,
        ty: ActivityType,
        status: ActivityStatus,
        submitted_at: &str,
        points: u32,
        carbon: f64,
    ) -> Activity {
        Activity {
            id: id.to_string(),
            user_id: user_id.to_string(),
            activity_type: ty,
            title: format!("Test {}", id),
            description: "Test activity".to_string(),
            quantity: 1,
            unit: None,
            verification_media: vec![VerificationMedia {
                media_type: MediaKind::Image,
                url: "https://cdn.example.com/p.jpg".to_string(),
                filename: "p.jpg".to_string(),
            }],
            location: ActivityLocation {
                latitude: 12.97,
                longitude: 77.59,
                accuracy: Some(10.0),
                address: "Bengaluru".to_string(),
                captured_at: submitted_at.to_string(),
            },
            status,
            points_earned: points,
            carbon_saved: carbon,
            rejection_reason: None,
            verified_by: None,
            verified_at: None,
            submitted_at: submitted_at.to_string(),
        }
    }

    fn make_user(id: &str, total_points: u32, created_at: &str) -> User {
        User {
            id: id.to_string(),
            name: format!("User {}", id),
            email: format!("{}@example.com", id),
            password_hash: "$2b$12$hash".to_string(),
            role: Role::User,
            points: total_points,
            total_points_earned: total_points,
            level: crate::models::user::level_for(total_points),
            activities_completed: 0,
            created_at: created_at.to_string(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_user_stats_status_counts() {
        let activities = vec![
            make_activity(
                "a1",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Approved,
                "2024-03-10T10:00:00Z",
                50,
                12.5,
            ),
            make_activity(
                "a2",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Pending,
                "2024-03-11T10:00:00Z",
                10,
                2.5,
            ),
            make_activity(
                "a3",
                "u1",
                ActivityType::TreePlanting,
                ActivityStatus::Rejected,
                "2024-03-12T10:00:00Z",
                50,
                22.0,
            ),
        ];

        let stats = compute_user_stats(&activities, day(2024, 3, 15));

        assert_eq!(stats.total_activities, 3);
        assert_eq!(stats.approved_activities, 1);
        assert_eq!(stats.pending_activities, 1);
        assert_eq!(stats.rejected_activities, 1);
        // Only approved activity counts toward carbon
        assert_eq!(stats.carbon_saved, 12.5);
        assert_eq!(stats.completion_rate, 33);
    }

    #[test]
    fn test_breakdown_only_counts_approved() {
        let activities = vec![
            make_activity(
                "a1",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Approved,
                "2024-03-10T10:00:00Z",
                50,
                12.5,
            ),
            make_activity(
                "a2",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Approved,
                "2024-03-11T10:00:00Z",
                10,
                2.5,
            ),
            make_activity(
                "a3",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Rejected,
                "2024-03-12T10:00:00Z",
                10,
                2.5,
            ),
        ];

        let stats = compute_user_stats(&activities, day(2024, 3, 15));
        let recycling = stats.breakdown.get("recycling").unwrap();

        assert_eq!(recycling.count, 2);
        assert_eq!(recycling.points, 60);
        assert_eq!(recycling.carbon, 15.0);
        assert!(stats.breakdown.get("tree_planting").is_none());
    }

    #[test]
    fn test_streak_counts_consecutive_days() {
        let mut days = HashSet::new();
        days.insert(day(2024, 3, 15));
        days.insert(day(2024, 3, 14));
        days.insert(day(2024, 3, 13));
        // Gap on the 12th
        days.insert(day(2024, 3, 11));

        assert_eq!(current_streak_days(&days, day(2024, 3, 15)), 3);
    }

    #[test]
    fn test_streak_requires_submission_today() {
        let mut days = HashSet::new();
        days.insert(day(2024, 6, 8));
        days.insert(day(2024, 6, 9));

        // Run ended yesterday; with nothing submitted today the streak
        // is already broken, not carried over
        assert_eq!(current_streak_days(&days, day(2024, 6, 10)), 0);
    }

    #[test]
    fn test_streak_single_day() {
        let mut days = HashSet::new();
        days.insert(day(2024, 3, 15));

        assert_eq!(current_streak_days(&days, day(2024, 3, 15)), 1);
    }

    #[test]
    fn test_streak_zero_after_full_day_gap() {
        let mut days = HashSet::new();
        days.insert(day(2024, 3, 12));

        assert_eq!(current_streak_days(&days, day(2024, 3, 15)), 0);
        assert_eq!(current_streak_days(&HashSet::new(), day(2024, 3, 15)), 0);
    }

    #[test]
    fn test_monthly_progress_buckets() {
        let activities = vec![
            make_activity(
                "a1",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Approved,
                "2024-02-10T10:00:00Z",
                30,
                7.5,
            ),
            make_activity(
                "a2",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Approved,
                "2024-03-01T10:00:00Z",
                10,
                2.5,
            ),
            // Pending submissions do not show up in progress
            make_activity(
                "a3",
                "u1",
                ActivityType::Recycling,
                ActivityStatus::Pending,
                "2024-03-02T10:00:00Z",
                10,
                2.5,
            ),
        ];

        let stats = compute_user_stats(&activities, day(2024, 3, 15));

        assert_eq!(stats.monthly_progress.len(), PROGRESS_MONTHS);
        // Series spans the year boundary: Oct 2023 .. Mar 2024
        assert_eq!(stats.monthly_progress[0].month, "2023-10");
        assert_eq!(stats.monthly_progress[4].month, "2024-02");
        assert_eq!(stats.monthly_progress[4].activities, 1);
        assert_eq!(stats.monthly_progress[4].points, 30);
        assert_eq!(stats.monthly_progress[5].month, "2024-03");
        assert_eq!(stats.monthly_progress[5].activities, 1);
        assert_eq!(stats.monthly_progress[5].points, 10);
    }

    #[test]
    fn test_leaderboard_ordering() {
        let a = make_user("u1", 300, "2024-01-05T00:00:00Z");
        let b = make_user("u2", 500, "2024-02-01T00:00:00Z");
        let c = make_user("u3", 300, "2024-01-01T00:00:00Z");

        let mut users = vec![a, b, c];
        users.sort_by(compare_leaderboard);

        let order: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
        // Highest points first; equal points ranked by earlier signup
        assert_eq!(order, vec!["u2", "u3", "u1"]);
    }

    #[test]
    fn test_platform_stats_rates_and_totals() {
        let users = vec![
            make_user("u1", 100, "2024-01-05T00:00:00Z"),
            make_user("u2", 0, "2024-03-01T00:00:00Z"),
        ];
        let activities = vec![
            make_activity(
                "a1",
                "u1",
                ActivityType::EnergySaving,
                ActivityStatus::Approved,
                "2024-03-10T10:00:00Z",
                100,
                16.0,
            ),
            make_activity(
                "a2",
                "u2",
                ActivityType::Recycling,
                ActivityStatus::Rejected,
                "2024-03-11T10:00:00Z",
                10,
                2.5,
            ),
            make_activity(
                "a3",
                "u2",
                ActivityType::Recycling,
                ActivityStatus::Pending,
                "2024-03-12T10:00:00Z",
                10,
                2.5,
            ),
        ];

        let stats = compute_platform_stats(&users, &activities, day(2024, 3, 15));

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_activities, 3);
        assert_eq!(stats.approved_activities, 1);
        assert_eq!(stats.approval_rate, 33);
        assert_eq!(stats.total_points_awarded, 100);
        assert_eq!(stats.total_carbon_saved, 16.0);
        assert_eq!(stats.active_users, 2);
    }

    #[test]
    fn test_active_user_window() {
        let users = vec![make_user("u1", 0, "2024-01-05T00:00:00Z")];
        let today = day(2024, 3, 30);

        // 29 days old: inside the window
        let recent = vec![make_activity(
            "a1",
            "u1",
            ActivityType::Recycling,
            ActivityStatus::Pending,
            "2024-03-01T10:00:00Z",
            10,
            2.5,
        )];
        assert_eq!(compute_platform_stats(&users, &recent, today).active_users, 1);

        // 30 days old: outside
        let stale = vec![make_activity(
            "a1",
            "u1",
            ActivityType::Recycling,
            ActivityStatus::Pending,
            "2024-02-29T10:00:00Z",
            10,
            2.5,
        )];
        assert_eq!(compute_platform_stats(&users, &stale, today).active_users, 0);
    }

    #[test]
    fn test_monthly_growth_buckets() {
        let users = vec![
            make_user("u1", 0, "2023-06-05T00:00:00Z"),
            make_user("u2", 0, "2024-03-01T00:00:00Z"),
            // Before the 12-month window; counted in totals, not growth
            make_user("u3", 0, "2022-01-01T00:00:00Z"),
        ];
        let activities = vec![make_activity(
            "a1",
            "u2",
            ActivityType::Recycling,
            ActivityStatus::Approved,
            "2024-03-10T10:00:00Z",
            10,
            2.5,
        )];

        let stats = compute_platform_stats(&users, &activities, day(2024, 3, 15));

        assert_eq!(stats.monthly_growth.len(), GROWTH_MONTHS);
        assert_eq!(stats.monthly_growth[0].month, "2023-04");
        assert_eq!(stats.monthly_growth[11].month, "2024-03");
        assert_eq!(stats.monthly_growth[2].month, "2023-06");
        assert_eq!(stats.monthly_growth[2].new_users, 1);
        assert_eq!(stats.monthly_growth[11].new_users, 1);
        assert_eq!(stats.monthly_growth[11].approved_activities, 1);
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(3, 3), 100);
    }
}
