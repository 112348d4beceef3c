//! Donation business logic - Recording donations and reading them back.
//!
//! Reads come in three shapes: one request's donations, the donations of a whole set
//! of requests in a single query (so dashboards never issue one query per request),
//! and one donor's history.

use crate::{
    core::user::Session,
    entities::{DonationRequest, VerificationStatus, donation},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

/// Records a donation from the session user to a verified request.
///
/// A request that is already fully funded still accepts the donation here; hiding
/// such requests is left to the donor feed.
///
/// # Errors
/// * `InvalidAmount` if `amount` is not a finite number above zero
/// * `RequestNotFound` if the request does not exist
/// * `RequestNotOpen` if the request is pending or rejected
#[instrument(skip(db), fields(donor_id = session.user_id))]
pub async fn create_donation(
    db: &DatabaseConnection,
    session: &Session,
    request_id: i64,
    amount: f64,
) -> Result<donation::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let request = DonationRequest::find_by_id(request_id)
        .one(db)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    if request.status != VerificationStatus::Verified {
        return Err(Error::RequestNotOpen {
            id: request_id,
            status: request.status.to_string(),
        });
    }

    let donation = donation::ActiveModel {
        request_id: Set(request_id),
        donor_id: Set(session.user_id),
        amount: Set(amount),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = donation.insert(db).await?;
    info!(donation_id = created.id, request_id, amount, "Recorded donation");
    Ok(created)
}

/// Retrieves all donations for one request, newest first.
pub async fn get_donations_for_request(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<Vec<donation::Model>> {
    crate::entities::Donation::find()
        .filter(donation::Column::RequestId.eq(request_id))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the donations of every request in `request_ids` with a single query.
pub async fn get_donations_for_requests(
    db: &DatabaseConnection,
    request_ids: &[i64],
) -> Result<Vec<donation::Model>> {
    if request_ids.is_empty() {
        return Ok(Vec::new());
    }

    let donations = crate::entities::Donation::find()
        .filter(donation::Column::RequestId.is_in(request_ids.iter().copied()))
        .order_by_asc(donation::Column::Id)
        .all(db)
        .await?;

    debug!(
        requests = request_ids.len(),
        donations = donations.len(),
        "Fetched donations for request batch"
    );
    Ok(donations)
}

/// Retrieves everything one donor has given, newest first.
pub async fn get_donations_by_donor(
    db: &DatabaseConnection,
    donor_id: i64,
) -> Result<Vec<donation::Model>> {
    crate::entities::Donation::find()
        .filter(donation::Column::DonorId.eq(donor_id))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
