//! Upstream quota tracking and request pacing.
//!
//! The order-management API reports its quota through response headers:
//!
//! ```text
//! X-RateLimit-Limit: 300,3000,12000
//! X-RateLimit-Remaining: 299,2950,11800
//! ```
//!
//! Each comma-separated position is one rate-limit window. The tightest
//! window (lowest remaining share) is the one that matters for pacing.

use std::time::Duration;

use reqwest::header::HeaderMap;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Last observed quota for one upstream. `None` fields mean the upstream
/// has not reported them (yet).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaState {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
}

impl QuotaState {
    /// Parses quota headers. Returns `None` when neither header is present
    /// or neither parses, so callers keep their previous observation.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limits = header_values(headers, LIMIT_HEADER);
        let remaining = header_values(headers, REMAINING_HEADER);

        match (limits.is_empty(), remaining.is_empty()) {
            (true, true) => None,
            (true, false) => Some(Self {
                limit: None,
                remaining: remaining.iter().copied().min(),
            }),
            (false, true) => Some(Self {
                limit: limits.iter().copied().min(),
                remaining: None,
            }),
            (false, false) => {
                let tightest = limits
                    .iter()
                    .zip(remaining.iter())
                    .filter(|(limit, _)| **limit > 0)
                    .min_by_key(|(limit, left)| u64::from(**left) * 10_000 / u64::from(**limit));
                Some(match tightest {
                    Some((limit, left)) => Self {
                        limit: Some(*limit),
                        remaining: Some(*left),
                    },
                    None => Self {
                        limit: None,
                        remaining: remaining.iter().copied().min(),
                    },
                })
            }
        }
    }

    /// Remaining share of the quota in whole percent, when both numbers are
    /// known and the limit is non-zero.
    #[must_use]
    pub fn remaining_percent(&self) -> Option<u64> {
        match (self.limit, self.remaining) {
            (Some(limit), Some(remaining)) if limit > 0 => {
                Some(u64::from(remaining.min(limit)) * 100 / u64::from(limit))
            }
            _ => None,
        }
    }
}

fn header_values(headers: &HeaderMap, name: &str) -> Vec<u32> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .filter_map(|part| part.trim().parse::<u32>().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Pre-request delay tiers keyed on the remaining quota share. The less
/// quota is left, the longer the client waits before its next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub relaxed: Duration,
    pub cautious: Duration,
    pub strained: Duration,
    /// Above this remaining percentage the `relaxed` delay applies.
    pub cautious_below_percent: u64,
    /// At or below this remaining percentage the `strained` delay applies.
    pub strained_below_percent: u64,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            relaxed: Duration::from_millis(120),
            cautious: Duration::from_millis(300),
            strained: Duration::from_millis(1000),
            cautious_below_percent: 50,
            strained_below_percent: 20,
        }
    }
}

impl Pacing {
    /// No pre-request delay at all. Used by tests against local mock servers.
    #[must_use]
    pub fn none() -> Self {
        Self {
            relaxed: Duration::ZERO,
            cautious: Duration::ZERO,
            strained: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn delay_for(&self, quota: &QuotaState) -> Duration {
        match quota.remaining_percent() {
            Some(pct) if pct > self.cautious_below_percent => self.relaxed,
            Some(pct) if pct > self.strained_below_percent => self.cautious,
            Some(_) => self.strained,
            None if quota.remaining == Some(0) => self.strained,
            None => self.relaxed,
        }
    }
}
