// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Voucher issuance: code generation and the redemption retry loop.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::db::firestore::{FirestoreDb, RedeemOutcome};
use crate::error::{AppError, Result};
use crate::models::voucher::{VoucherDraft, VOUCHER_VALID_DAYS};
use crate::time_utils::format_utc_rfc3339;

/// Random suffix length on generated voucher codes.
const CODE_SUFFIX_LEN: usize = 4;

/// How many fresh codes to try before giving up on a redemption.
const MAX_CODE_ATTEMPTS: usize = 3;

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a voucher code: "GREEN", the issue time in base-36
/// milliseconds, and a short random suffix.
///
/// The timestamp makes codes naturally unique across instants; the
/// suffix separates redemptions that land in the same millisecond.
/// Store-level uniqueness is still enforced by the transaction, this
/// just makes collisions rare.
pub fn generate_voucher_code(now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().max(0) as u64;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
        .collect();
    format!("GREEN{}{}", to_base36(millis), suffix)
}

fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(CODE_ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Draft the identity for a voucher about to be issued: record ID,
/// candidate code, and the validity window.
pub fn draft_voucher(now: DateTime<Utc>) -> VoucherDraft {
    VoucherDraft {
        id: uuid::Uuid::new_v4().to_string(),
        code: generate_voucher_code(now),
        redeemed_at: format_utc_rfc3339(now),
        expires_at: format_utc_rfc3339(now + Duration::days(VOUCHER_VALID_DAYS)),
    }
}

/// Redeem a reward for a user.
///
/// A code collision gets a fresh draft and another attempt; every
/// other outcome is returned to the caller as-is.
pub async fn redeem(db: &FirestoreDb, user_id: &str, reward_id: &str) -> Result<RedeemOutcome> {
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let draft = draft_voucher(chrono::Utc::now());
        match db.redeem_reward_atomic(user_id, reward_id, &draft).await? {
            RedeemOutcome::CodeCollision => {
                tracing::warn!(
                    user_id = %user_id,
                    reward_id = %reward_id,
                    attempt,
                    "Voucher code collision, retrying with a fresh code"
                );
            }
            outcome => return Ok(outcome),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "Could not generate a unique voucher code after {} attempts",
        MAX_CODE_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_prefix_and_charset() {
        let code = generate_voucher_code(chrono::Utc::now());
        assert!(code.starts_with("GREEN"));
        assert!(code.len() > "GREEN".len() + CODE_SUFFIX_LEN);
        assert!(code["GREEN".len()..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_codes_differ_within_one_millisecond() {
        let now = chrono::Utc::now();
        let codes: std::collections::HashSet<String> =
            (0..32).map(|_| generate_voucher_code(now)).collect();
        // Random suffixes separate same-instant codes; tolerate one
        // birthday collision out of 36^4 so this never flakes.
        assert!(codes.len() >= 31);
    }

    #[test]
    fn test_base36_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "Z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(46655), "ZZZ");
    }

    #[test]
    fn test_draft_validity_window() {
        let now = chrono::DateTime::parse_from_rfc3339("2024-06-01T10:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let draft = draft_voucher(now);
        assert_eq!(draft.redeemed_at, "2024-06-01T10:00:00Z");
        assert_eq!(draft.expires_at, "2024-07-01T10:00:00Z");
        assert!(!draft.id.is_empty());
        assert!(draft.code.starts_with("GREEN"));
    }
}
