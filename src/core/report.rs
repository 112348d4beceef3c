//! Report generation business logic.
//!
//! This module turns summaries into text: progress bars, amounts, one-line card
//! summaries, and a detailed report for a single request. All functions are
//! framework-agnostic and return plain strings or structured data.

use crate::{
    core::{
        aggregate::{self, DonationSummary},
        board::FundraiserCard,
    },
    entities::{donation, donation_request},
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;

/// A detailed view of one request and its most recent donations.
#[derive(Debug, Clone)]
pub struct RequestReport {
    /// The request being reported on
    pub request: donation_request::Model,
    /// Its funding progress
    pub summary: DonationSummary,
    /// Most recent donations, newest first
    pub recent_donations: Vec<donation::Model>,
    /// Number of donations received in total
    pub donation_count: usize,
}

/// Generates a report for one request.
///
/// The summary is computed over every donation; only the newest
/// `donation_limit` (default 10) are kept in `recent_donations`.
pub async fn generate_request_report(
    db: &DatabaseConnection,
    request_id: i64,
    donation_limit: Option<usize>,
) -> Result<RequestReport> {
    let request = crate::core::request::get_request_by_id(db, request_id)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    let all_donations = crate::core::donation::get_donations_for_request(db, request_id).await?;
    let summary = aggregate::summarize(&request, &all_donations);
    let donation_count = all_donations.len();

    let limit = donation_limit.unwrap_or(10);
    let recent_donations = all_donations.into_iter().take(limit).collect();

    Ok(RequestReport {
        request,
        summary,
        recent_donations,
        donation_count,
    })
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80%`
#[must_use]
pub fn format_progress_bar(percent_funded: u8, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped = usize::from(percent_funded.min(100));

    // Rounded to the nearest cell
    let filled = (clamped * length + 50) / 100;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {percent_funded}%")
}

/// Formats an amount with currency sign and two decimals, e.g. `$1234.50`.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    format!("${amount:.2}")
}

/// One-line summary of a card, as shown in the fundraiser carousel.
///
/// Example: `Books | $75.00 of $100.00 | [████████░░] 75% | $25.00 to go`
#[must_use]
pub fn format_card_summary(card: &FundraiserCard) -> String {
    let summary = &card.summary;
    let progress = format_progress_bar(summary.percent_funded, Some(10));
    let status = if summary.is_fully_funded() {
        "fully funded".to_string()
    } else {
        format!("{} to go", format_amount(summary.remaining))
    };

    format!(
        "{} | {} of {} | {progress} | {status}",
        card.request.title,
        format_amount(summary.total),
        format_amount(summary.requested),
    )
}

/// Summary line for one donation.
#[must_use]
pub fn format_donation_summary(donation: &donation::Model) -> String {
    format!(
        "{} | {}",
        format_amount(donation.amount),
        donation.created_at.format("%Y-%m-%d %H:%M")
    )
}
