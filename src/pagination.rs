// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared 1-based pagination for list endpoints.

use crate::error::AppError;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Upper bound on page size; larger requests are clamped, not rejected.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Serde default for the `page` query parameter.
pub fn default_page() -> u32 {
    1
}

/// Validated pagination parameters.
#[derive(Debug, Clone, Copy)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
}

impl PageParams {
    /// Validate a raw page/limit pair. Page numbers are 1-based; zero is
    /// rejected. Limits are clamped into `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: u32, limit: u32) -> Result<Self, AppError> {
        if page < 1 {
            return Err(AppError::BadRequest(
                "Page must be greater than 0".to_string(),
            ));
        }
        Ok(Self {
            page,
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        })
    }

    /// Slice one page out of an already-sorted list.
    ///
    /// Uses checked multiplication so absurd page numbers fail cleanly
    /// instead of wrapping.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> Result<&'a [T], AppError> {
        let start = (self.page as usize - 1)
            .checked_mul(self.limit as usize)
            .ok_or_else(|| AppError::BadRequest("Page number causes overflow".to_string()))?;

        if start >= items.len() {
            return Ok(&[]);
        }
        let end = start.saturating_add(self.limit as usize).min(items.len());
        Ok(&items[start..end])
    }

    /// Pagination metadata for a response envelope.
    pub fn meta(&self, total: usize) -> PageMeta {
        let total = total as u32;
        let pages = total.div_ceil(self.limit);
        PageMeta {
            page: self.page,
            limit: self.limit,
            total,
            pages,
            has_next: self.page < pages,
            has_prev: self.page > 1,
        }
    }
}

/// Pagination metadata included in every list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}
