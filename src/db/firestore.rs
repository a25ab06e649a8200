// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profiles, point balances)
//! - Activities (eco-activity submissions and verification)
//! - Rewards (partner catalog)
//! - User rewards (issued vouchers, keyed by voucher code)
//!
//! The registration, verification, and redemption workflows run inside
//! Firestore transactions: reads go through the transaction, so a
//! concurrent commit invalidates the read set and the work is retried
//! against fresh state. Business-rule failures come back as outcome
//! variants, not errors; only genuine write conflicts retry.

use crate::db::collections;
use crate::error::AppError;
use crate::models::activity::{Activity, ActivityStatus, ActivityType};
use crate::models::reward::{Availability, Reward, RewardCategory};
use crate::models::user::{level_for, EmailClaim, User};
use crate::models::voucher::{UserReward, VoucherDraft, VoucherStatus};
use futures_util::{stream, FutureExt, StreamExt};
use std::collections::HashMap;

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Result of a registration attempt.
#[derive(Debug)]
pub enum RegisterOutcome {
    Registered,
    /// Another account already claimed the address.
    EmailTaken,
}

/// Result of an approval attempt.
#[derive(Debug)]
pub enum ApproveOutcome {
    /// Points awarded; carries the committed records.
    Approved { activity: Activity, user: User },
    ActivityNotFound,
    /// The submitting account no longer exists.
    UserNotFound,
    /// The activity was already in a terminal state.
    AlreadyProcessed,
}

/// Result of a rejection attempt.
#[derive(Debug)]
pub enum RejectOutcome {
    Rejected { activity: Activity },
    ActivityNotFound,
    AlreadyProcessed,
}

/// Result of a redemption attempt.
#[derive(Debug)]
pub enum RedeemOutcome {
    Redeemed {
        voucher: UserReward,
        reward: Reward,
        user: User,
    },
    UserNotFound,
    RewardNotFound,
    /// Reward deactivated or past its validity window.
    Unavailable,
    /// Redemption limit reached.
    SoldOut,
    InsufficientPoints {
        required: u32,
        available: u32,
    },
    /// The drafted voucher code already exists; retry with a new code.
    CodeCollision,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing async-trait
        // or a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up a user by (lowercased) email address.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let matches: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Fetch every user (leaderboard and platform statistics).
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch a batch of users by ID with bounded concurrency.
    ///
    /// Used to embed submitter details in the admin review queue.
    /// Missing users are skipped; a deleted account next to a surviving
    /// activity should not break the whole listing.
    pub async fn get_users_by_ids(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, User>, AppError> {
        let found = stream::iter(user_ids.to_vec())
            .map(|user_id| async move { self.get_user(&user_id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<User>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<User>>, AppError>>()?;

        Ok(found
            .into_iter()
            .flatten()
            .map(|user| (user.id.clone(), user))
            .collect())
    }

    // ─── Activity Operations ─────────────────────────────────────

    /// Get an activity by ID.
    pub async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ACTIVITIES)
            .obj()
            .one(activity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store an activity.
    pub async fn upsert_activity(&self, activity: &Activity) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&activity.id)
            .object(activity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get one user's activities, optionally narrowed by status and category.
    ///
    /// Equality filters only, so Firestore needs no composite index;
    /// callers sort the result (per-user lists stay small).
    pub async fn list_activities_for_user(
        &self,
        user_id: &str,
        status: Option<ActivityStatus>,
        activity_type: Option<ActivityType>,
    ) -> Result<Vec<Activity>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    status.and_then(|s| q.field("status").eq(s.as_str())),
                    activity_type.and_then(|t| q.field("activity_type").eq(t.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all activities, optionally narrowed by status (admin review
    /// queue and platform statistics).
    pub async fn list_activities(
        &self,
        status: Option<ActivityStatus>,
    ) -> Result<Vec<Activity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .filter(move |q| q.for_all([status.and_then(|s| q.field("status").eq(s.as_str()))]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Reward Operations ───────────────────────────────────────

    /// Get a reward by ID.
    pub async fn get_reward(&self, reward_id: &str) -> Result<Option<Reward>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REWARDS)
            .obj()
            .one(reward_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a catalog reward.
    pub async fn upsert_reward(&self, reward: &Reward) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REWARDS)
            .document_id(&reward.id)
            .object(reward)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// List active catalog rewards, optionally narrowed by category.
    pub async fn list_active_rewards(
        &self,
        category: Option<RewardCategory>,
    ) -> Result<Vec<Reward>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::REWARDS)
            .filter(move |q| {
                q.for_all([
                    q.field("is_active").eq(true),
                    category.and_then(|c| q.field("category").eq(c.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch a batch of rewards by ID with bounded concurrency.
    ///
    /// Used to embed reward summaries in voucher listings. Missing
    /// rewards are skipped rather than treated as errors; a voucher
    /// outliving its catalog entry is a display concern, not a failure.
    pub async fn get_rewards_by_ids(
        &self,
        reward_ids: &[String],
    ) -> Result<HashMap<String, Reward>, AppError> {
        let found = stream::iter(reward_ids.to_vec())
            .map(|reward_id| async move { self.get_reward(&reward_id).await })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<Reward>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Reward>>, AppError>>()?;

        Ok(found
            .into_iter()
            .flatten()
            .map(|reward| (reward.id.clone(), reward))
            .collect())
    }

    // ─── Voucher Operations ──────────────────────────────────────

    /// Get an issued voucher by its code (the document ID).
    pub async fn get_voucher_by_code(&self, code: &str) -> Result<Option<UserReward>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_REWARDS)
            .obj()
            .one(code)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a user's vouchers, optionally narrowed by status.
    pub async fn list_vouchers_for_user(
        &self,
        user_id: &str,
        status: Option<VoucherStatus>,
    ) -> Result<Vec<UserReward>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_REWARDS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    status.and_then(|s| q.field("status").eq(s.as_str())),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Registration ─────────────────────────────────────

    /// Atomically create a user and claim their email address.
    ///
    /// The claim document is keyed by the lowercased email and written
    /// in the same transaction as the profile, so two registrations
    /// racing on one address cannot both land. The losing commit
    /// replays against the winner's claim and reports `EmailTaken`
    /// without writing anything.
    pub async fn create_user_atomic(&self, user: &User) -> Result<RegisterOutcome, AppError> {
        let client = self.get_client()?;
        let user = user.clone();
        let user_id = user.id.clone();

        let outcome = client
            .run_transaction(move |db, tx| {
                let user = user.clone();
                async move {
                    let claim: Option<EmailClaim> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_EMAILS)
                        .obj()
                        .one(&user.email)
                        .await?;
                    if claim.is_some() {
                        return Ok(RegisterOutcome::EmailTaken);
                    }

                    let claim = EmailClaim {
                        user_id: user.id.clone(),
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::USER_EMAILS)
                        .document_id(&user.email)
                        .object(&claim)
                        .add_to_transaction(tx)?;
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(&user)
                        .add_to_transaction(tx)?;

                    Ok(RegisterOutcome::Registered)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Register transaction failed: {}", e)))?;

        if let RegisterOutcome::Registered = &outcome {
            tracing::info!(user_id = %user_id, "User account created");
        }

        Ok(outcome)
    }

    // ─── Atomic Verification Workflow ────────────────────────────

    /// Atomically approve a pending activity and award its points.
    ///
    /// Reads the activity and its owner inside the transaction, applies
    /// the status transition, recomputes the point award from the stored
    /// type and quantity, and commits both documents together. A
    /// concurrent verification of the same activity aborts one commit;
    /// the retried closure then observes the terminal status and reports
    /// `AlreadyProcessed`.
    pub async fn approve_activity_atomic(
        &self,
        activity_id: &str,
        admin_id: &str,
    ) -> Result<ApproveOutcome, AppError> {
        let client = self.get_client()?;
        let activity_id = activity_id.to_string();
        let admin_id = admin_id.to_string();
        let now = crate::time_utils::format_utc_rfc3339(chrono::Utc::now());

        let outcome = client
            .run_transaction(move |db, tx| {
                let activity_id = activity_id.clone();
                let admin_id = admin_id.clone();
                let now = now.clone();
                async move {
                    let activity: Option<Activity> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ACTIVITIES)
                        .obj()
                        .one(&activity_id)
                        .await?;
                    let Some(mut activity) = activity else {
                        return Ok(ApproveOutcome::ActivityNotFound);
                    };

                    let Some(next) = activity.status.transition(ActivityStatus::Approved) else {
                        return Ok(ApproveOutcome::AlreadyProcessed);
                    };

                    let user: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&activity.user_id)
                        .await?;
                    let Some(mut user) = user else {
                        return Ok(ApproveOutcome::UserNotFound);
                    };

                    // The award is recomputed from stored fields; the
                    // estimate shown at submission carries no authority.
                    let award = activity.activity_type.points_for(activity.quantity);

                    activity.status = next;
                    activity.points_earned = award;
                    activity.verified_by = Some(admin_id);
                    activity.verified_at = Some(now);

                    user.points += award;
                    user.total_points_earned += award;
                    user.activities_completed += 1;
                    user.level = level_for(user.total_points_earned);

                    db.fluent()
                        .update()
                        .in_col(collections::ACTIVITIES)
                        .document_id(&activity.id)
                        .object(&activity)
                        .add_to_transaction(tx)?;
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(&user)
                        .add_to_transaction(tx)?;

                    Ok(ApproveOutcome::Approved { activity, user })
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Approve transaction failed: {}", e)))?;

        if let ApproveOutcome::Approved { activity, user } = &outcome {
            tracing::info!(
                activity_id = %activity.id,
                user_id = %user.id,
                points = activity.points_earned,
                "Activity approved"
            );
        }

        Ok(outcome)
    }

    /// Atomically reject a pending activity.
    ///
    /// The reason must be validated by the caller before this runs; the
    /// transaction only enforces existence and the status transition.
    pub async fn reject_activity_atomic(
        &self,
        activity_id: &str,
        admin_id: &str,
        reason: &str,
    ) -> Result<RejectOutcome, AppError> {
        let client = self.get_client()?;
        let activity_id = activity_id.to_string();
        let admin_id = admin_id.to_string();
        let reason = reason.to_string();
        let now = crate::time_utils::format_utc_rfc3339(chrono::Utc::now());

        let outcome = client
            .run_transaction(move |db, tx| {
                let activity_id = activity_id.clone();
                let admin_id = admin_id.clone();
                let reason = reason.clone();
                let now = now.clone();
                async move {
                    let activity: Option<Activity> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::ACTIVITIES)
                        .obj()
                        .one(&activity_id)
                        .await?;
                    let Some(mut activity) = activity else {
                        return Ok(RejectOutcome::ActivityNotFound);
                    };

                    let Some(next) = activity.status.transition(ActivityStatus::Rejected) else {
                        return Ok(RejectOutcome::AlreadyProcessed);
                    };

                    activity.status = next;
                    activity.rejection_reason = Some(reason);
                    activity.verified_by = Some(admin_id);
                    activity.verified_at = Some(now);

                    db.fluent()
                        .update()
                        .in_col(collections::ACTIVITIES)
                        .document_id(&activity.id)
                        .object(&activity)
                        .add_to_transaction(tx)?;

                    Ok(RejectOutcome::Rejected { activity })
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Reject transaction failed: {}", e)))?;

        if let RejectOutcome::Rejected { activity } = &outcome {
            tracing::info!(activity_id = %activity.id, "Activity rejected");
        }

        Ok(outcome)
    }

    // ─── Atomic Redemption Workflow ──────────────────────────────

    /// Atomically redeem a reward: deduct points, bump the redemption
    /// counter, and issue the voucher, or report why not.
    ///
    /// Preconditions are checked in order inside the transaction so each
    /// failure maps to a distinct outcome. The voucher document is keyed
    /// by its code; reading that key first makes the store reject a
    /// duplicate code as a `CodeCollision` instead of silently
    /// overwriting another user's voucher.
    pub async fn redeem_reward_atomic(
        &self,
        user_id: &str,
        reward_id: &str,
        draft: &VoucherDraft,
    ) -> Result<RedeemOutcome, AppError> {
        let client = self.get_client()?;
        let user_id = user_id.to_string();
        let reward_id = reward_id.to_string();
        let draft = draft.clone();

        let outcome = client
            .run_transaction(move |db, tx| {
                let user_id = user_id.clone();
                let reward_id = reward_id.clone();
                let draft = draft.clone();
                async move {
                    let user: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&user_id)
                        .await?;
                    let Some(mut user) = user else {
                        return Ok(RedeemOutcome::UserNotFound);
                    };

                    let reward: Option<Reward> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::REWARDS)
                        .obj()
                        .one(&reward_id)
                        .await?;
                    let Some(mut reward) = reward else {
                        return Ok(RedeemOutcome::RewardNotFound);
                    };

                    match reward.availability(&draft.redeemed_at) {
                        Availability::Unavailable => return Ok(RedeemOutcome::Unavailable),
                        Availability::SoldOut => return Ok(RedeemOutcome::SoldOut),
                        Availability::Redeemable => {}
                    }

                    if user.points < reward.points_cost {
                        return Ok(RedeemOutcome::InsufficientPoints {
                            required: reward.points_cost,
                            available: user.points,
                        });
                    }

                    let existing: Option<UserReward> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_REWARDS)
                        .obj()
                        .one(&draft.code)
                        .await?;
                    if existing.is_some() {
                        return Ok(RedeemOutcome::CodeCollision);
                    }

                    let voucher = UserReward {
                        id: draft.id.clone(),
                        user_id: user.id.clone(),
                        reward_id: reward.id.clone(),
                        points_spent: reward.points_cost,
                        voucher_code: draft.code.clone(),
                        status: VoucherStatus::Active,
                        redeemed_at: draft.redeemed_at.clone(),
                        used_at: None,
                        expires_at: draft.expires_at.clone(),
                    };

                    user.points -= reward.points_cost;
                    reward.current_redemptions += 1;

                    db.fluent()
                        .update()
                        .in_col(collections::USER_REWARDS)
                        .document_id(&voucher.voucher_code)
                        .object(&voucher)
                        .add_to_transaction(tx)?;
                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(&user)
                        .add_to_transaction(tx)?;
                    db.fluent()
                        .update()
                        .in_col(collections::REWARDS)
                        .document_id(&reward.id)
                        .object(&reward)
                        .add_to_transaction(tx)?;

                    Ok(RedeemOutcome::Redeemed {
                        voucher,
                        reward,
                        user,
                    })
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Redeem transaction failed: {}", e)))?;

        if let RedeemOutcome::Redeemed { voucher, user, .. } = &outcome {
            tracing::info!(
                user_id = %user.id,
                voucher_code = %voucher.voucher_code,
                points_spent = voucher.points_spent,
                "Reward redeemed"
            );
        }

        Ok(outcome)
    }
}
