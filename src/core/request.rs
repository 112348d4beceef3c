//! Donation request business logic - Creation, lookup, review and deletion.
//!
//! Requests are created `pending` by receivers. Admins move them to `verified` or
//! `rejected`; both are final. Every other status change is refused.

use crate::{
    core::user::Session,
    entities::{Donation, DonationRequest, Role, VerificationStatus, donation, donation_request},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Input collected by the request wizard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewDonationRequest {
    /// Short campaign title
    pub title: String,
    /// What the money is for
    pub description: String,
    /// Selected categories
    pub categories: Vec<String>,
    /// Amount asked for
    pub requested_amount: f64,
    /// Uploaded cover image or video URLs
    pub cover_media: Vec<String>,
    /// Free-text location
    pub location: String,
    /// Postal code
    pub postal_code: String,
}

/// Whether the verification state machine allows moving from `from` to `to`.
#[must_use]
pub const fn is_valid_transition(from: VerificationStatus, to: VerificationStatus) -> bool {
    matches!(
        (from, to),
        (
            VerificationStatus::Pending,
            VerificationStatus::Verified | VerificationStatus::Rejected
        )
    )
}

/// Creates a new `pending` donation request owned by the session user.
///
/// Only receivers and admins may create requests. The title must not be blank and
/// the requested amount must be a finite number that is not negative.
#[instrument(skip(db, new_request), fields(user_id = session.user_id))]
pub async fn create_request(
    db: &DatabaseConnection,
    session: &Session,
    new_request: NewDonationRequest,
) -> Result<donation_request::Model> {
    session.require_role(&[Role::Receiver, Role::Admin])?;

    let title = new_request.title.trim();
    if title.is_empty() {
        return Err(Error::Validation {
            message: "Request title cannot be empty".to_string(),
        });
    }

    let amount = new_request.requested_amount;
    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let categories: Vec<&str> = new_request
        .categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    let cover_media: Vec<&str> = new_request
        .cover_media
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .collect();

    let request = donation_request::ActiveModel {
        user_id: Set(session.user_id),
        title: Set(title.to_string()),
        description: Set(new_request.description.trim().to_string()),
        category: Set(categories.join(", ")),
        requested_amount: Set(amount),
        cover_media: Set(cover_media.join("\n")),
        location: Set(new_request.location.trim().to_string()),
        postal_code: Set(new_request.postal_code.trim().to_string()),
        status: Set(VerificationStatus::Pending),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let created = request.insert(db).await?;
    info!(request_id = created.id, "Created donation request");
    Ok(created)
}

/// Finds a donation request by id.
pub async fn get_request_by_id(
    db: &DatabaseConnection,
    request_id: i64,
) -> Result<Option<donation_request::Model>> {
    DonationRequest::find_by_id(request_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all requests with the given status, oldest first.
pub async fn list_requests_by_status(
    db: &DatabaseConnection,
    status: VerificationStatus,
) -> Result<Vec<donation_request::Model>> {
    DonationRequest::find()
        .filter(donation_request::Column::Status.eq(status))
        .order_by_asc(donation_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every request created by one user, oldest first.
pub async fn list_requests_by_owner(
    db: &DatabaseConnection,
    owner_id: i64,
) -> Result<Vec<donation_request::Model>> {
    DonationRequest::find()
        .filter(donation_request::Column::UserId.eq(owner_id))
        .order_by_asc(donation_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies an admin decision to a pending request.
///
/// # Errors
/// * `PermissionDenied` unless the session is an admin
/// * `RequestNotFound` if the request does not exist
/// * `InvalidTransition` unless the request is pending and the decision is
///   `verified` or `rejected`
#[instrument(skip(db), fields(admin_id = session.user_id))]
pub async fn review_request(
    db: &DatabaseConnection,
    session: &Session,
    request_id: i64,
    decision: VerificationStatus,
) -> Result<donation_request::Model> {
    session.require_admin()?;

    let request = get_request_by_id(db, request_id)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    if !is_valid_transition(request.status, decision) {
        return Err(Error::InvalidTransition {
            id: request_id,
            from: request.status.to_string(),
            to: decision.to_string(),
        });
    }

    let mut active_model: donation_request::ActiveModel = request.into();
    active_model.status = Set(decision);
    let updated = active_model.update(db).await?;

    info!(request_id, status = %decision, "Reviewed donation request");
    Ok(updated)
}

/// Deletes a request together with its donations.
///
/// Only the request's owner or an admin may delete it.
#[instrument(skip(db), fields(user_id = session.user_id))]
pub async fn delete_request(db: &DatabaseConnection, session: &Session, request_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let request = DonationRequest::find_by_id(request_id)
        .one(&txn)
        .await?
        .ok_or(Error::RequestNotFound { id: request_id })?;

    if !session.can_manage(&request) {
        return Err(Error::PermissionDenied {
            reason: format!("user {} does not own request {request_id}", session.user_id),
        });
    }

    let removed = Donation::delete_many()
        .filter(donation::Column::RequestId.eq(request_id))
        .exec(&txn)
        .await?;
    request.delete(&txn).await?;

    txn.commit().await?;
    info!(
        request_id,
        donations_removed = removed.rows_affected,
        "Deleted donation request"
    );
    Ok(())
}
