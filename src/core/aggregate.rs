//! Donation progress aggregation.
//!
//! Pure computation over already-fetched requests and donations: per-request totals,
//! funded percentage, remaining amount, and the status buckets the dashboards show.
//! Nothing in here fails. Malformed amounts count as 0 and degenerate requested
//! amounts produce neutral summaries.

use crate::entities::{VerificationStatus, donation, donation_request};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::trace;

// Optional sign, digits with an optional fraction (or a bare fraction), optional exponent
static LEADING_NUMBER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").ok());

/// Anything that carries a donated amount.
///
/// Implementations read the amount fail-soft: missing, non-numeric, non-finite or
/// negative values are reported as 0.
pub trait DonatedAmount {
    /// The usable amount, never negative.
    fn donated_amount(&self) -> f64;
}

/// Clamps a raw number into a usable amount.
#[must_use]
pub fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Parses the number a textual amount starts with, returning 0 if there is none.
///
/// Leading whitespace is skipped and anything after the number is ignored, so
/// `"50abc"` is 50 and `"1,000"` is 1.
#[must_use]
pub fn parse_amount(raw: &str) -> f64 {
    LEADING_NUMBER
        .as_ref()
        .and_then(|pattern| pattern.find(raw.trim_start()))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map_or(0.0, sanitize_amount)
}

impl DonatedAmount for f64 {
    fn donated_amount(&self) -> f64 {
        sanitize_amount(*self)
    }
}

impl DonatedAmount for str {
    fn donated_amount(&self) -> f64 {
        parse_amount(self)
    }
}

impl DonatedAmount for &str {
    fn donated_amount(&self) -> f64 {
        parse_amount(self)
    }
}

impl DonatedAmount for String {
    fn donated_amount(&self) -> f64 {
        parse_amount(self)
    }
}

impl<T: DonatedAmount> DonatedAmount for Option<T> {
    fn donated_amount(&self) -> f64 {
        self.as_ref().map_or(0.0, DonatedAmount::donated_amount)
    }
}

impl DonatedAmount for donation::Model {
    fn donated_amount(&self) -> f64 {
        sanitize_amount(self.amount)
    }
}

/// Derived funding progress of one request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DonationSummary {
    /// Request the figures belong to
    pub request_id: i64,
    /// Sum of all usable donated amounts
    pub total: f64,
    /// Amount the request asked for, as stored
    pub requested: f64,
    /// `round(total / requested * 100)` clamped to 0..=100, 0 when nothing was requested
    pub percent_funded: u8,
    /// `max(0, requested - total)`
    pub remaining: f64,
}

impl DonationSummary {
    /// Summary of a request that has received nothing yet.
    #[must_use]
    pub fn empty(request_id: i64, requested: f64) -> Self {
        Self::from_total(request_id, requested, 0.0)
    }

    fn from_total(request_id: i64, requested: f64, total: f64) -> Self {
        // NaN or negative requests still yield a 0 percent and 0 remaining
        let usable = sanitize_amount(requested);
        Self {
            request_id,
            total,
            requested,
            percent_funded: percent_funded(total, usable),
            remaining: (usable - total).max(0.0),
        }
    }

    /// Whether donations have reached the requested amount.
    #[must_use]
    pub fn is_fully_funded(&self) -> bool {
        self.total >= self.requested
    }
}

/// Funded percentage, rounded to the nearest whole number and clamped to 0..=100.
#[must_use]
pub fn percent_funded(total: f64, requested: f64) -> u8 {
    if requested.is_nan() || requested <= 0.0 {
        return 0;
    }

    let percent = (total / requested * 100.0).round();
    if percent.is_nan() {
        return 0;
    }

    // Cast safety: the value is clamped to [0, 100] first.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = percent.clamp(0.0, 100.0) as u8;
    percent
}

/// Summarizes one request from the donations made to it.
#[must_use]
pub fn summarize<D: DonatedAmount>(
    request: &donation_request::Model,
    donations: &[D],
) -> DonationSummary {
    let total = donations.iter().map(DonatedAmount::donated_amount).sum();
    DonationSummary::from_total(request.id, request.requested_amount, total)
}

/// Summarizes every request from one batch of donations.
///
/// Donations are grouped by `request_id` in memory. Donations pointing at a
/// request outside `requests` are ignored, and requests without donations get an
/// empty summary.
#[must_use]
pub fn summarize_all(
    requests: &[donation_request::Model],
    donations: &[donation::Model],
) -> HashMap<i64, DonationSummary> {
    let mut totals: HashMap<i64, f64> = requests.iter().map(|r| (r.id, 0.0)).collect();
    let mut orphaned = 0usize;

    for donation in donations {
        match totals.get_mut(&donation.request_id) {
            Some(total) => *total += donation.donated_amount(),
            None => orphaned += 1,
        }
    }

    if orphaned > 0 {
        trace!("Ignored {orphaned} donations without a matching request");
    }

    requests
        .iter()
        .map(|request| {
            let total = totals.get(&request.id).copied().unwrap_or(0.0);
            (
                request.id,
                DonationSummary::from_total(request.id, request.requested_amount, total),
            )
        })
        .collect()
}

/// Requests partitioned by review status and funding progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification<'a> {
    /// Waiting for admin review
    pub pending: Vec<&'a donation_request::Model>,
    /// Verified and still short of the requested amount
    pub open_verified: Vec<&'a donation_request::Model>,
    /// Verified and fully funded
    pub fully_funded: Vec<&'a donation_request::Model>,
    /// Refused by an admin
    pub rejected: Vec<&'a donation_request::Model>,
}

impl Classification<'_> {
    /// Number of requests across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len() + self.open_verified.len() + self.fully_funded.len() + self.rejected.len()
    }

    /// Whether every bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn summary_for(
    request: &donation_request::Model,
    summaries: &HashMap<i64, DonationSummary>,
) -> DonationSummary {
    summaries
        .get(&request.id)
        .copied()
        .unwrap_or_else(|| DonationSummary::empty(request.id, request.requested_amount))
}

fn is_fully_funded(
    request: &donation_request::Model,
    summaries: &HashMap<i64, DonationSummary>,
) -> bool {
    summary_for(request, summaries).is_fully_funded()
}

/// Puts every request into exactly one bucket.
///
/// Status decides first; verified requests are then split on whether their total
/// has reached the requested amount. A request without a summary counts as
/// having received nothing.
#[must_use]
pub fn classify<'a>(
    requests: &'a [donation_request::Model],
    summaries: &HashMap<i64, DonationSummary>,
) -> Classification<'a> {
    let mut buckets = Classification::default();

    for request in requests {
        match request.status {
            VerificationStatus::Pending => buckets.pending.push(request),
            VerificationStatus::Rejected => buckets.rejected.push(request),
            VerificationStatus::Verified if is_fully_funded(request, summaries) => {
                buckets.fully_funded.push(request);
            }
            VerificationStatus::Verified => buckets.open_verified.push(request),
        }
    }

    buckets
}

/// Requests a donor can still give to: verified and not fully funded, in input order.
#[must_use]
pub fn filter_fundable<'a>(
    requests: &'a [donation_request::Model],
    summaries: &HashMap<i64, DonationSummary>,
) -> Vec<&'a donation_request::Model> {
    requests
        .iter()
        .filter(|r| r.status == VerificationStatus::Verified && !is_fully_funded(r, summaries))
        .collect()
}
