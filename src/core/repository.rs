//! Typed repository interfaces.
//!
//! The read models in [`crate::core::board`] only talk to storage through these
//! traits, so any backend (the `SeaORM` store below, or a test double) can sit
//! behind them.

use crate::{
    core::{donation, request, request::NewDonationRequest, user::Session},
    entities::{VerificationStatus, donation as donation_entity, donation_request},
    errors::Result,
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;

/// Storage operations for donation requests.
#[async_trait]
pub trait DonationRequestRepository: Send + Sync {
    /// Requests with the given verification status, oldest first.
    async fn requests_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<donation_request::Model>>;

    /// Requests created by one user, oldest first.
    async fn requests_by_owner(&self, owner_id: i64) -> Result<Vec<donation_request::Model>>;

    /// One request by id.
    async fn request_by_id(&self, request_id: i64) -> Result<Option<donation_request::Model>>;

    /// Stores a new pending request owned by the session user.
    async fn insert_request(
        &self,
        session: &Session,
        new_request: NewDonationRequest,
    ) -> Result<donation_request::Model>;

    /// Applies an admin verification decision.
    async fn update_status(
        &self,
        session: &Session,
        request_id: i64,
        status: VerificationStatus,
    ) -> Result<donation_request::Model>;
}

/// Storage operations for donations.
#[async_trait]
pub trait DonationRepository: Send + Sync {
    /// Donations made to one request.
    async fn donations_for_request(&self, request_id: i64) -> Result<Vec<donation_entity::Model>>;

    /// Donations made to any request in the set, fetched in one round trip.
    async fn donations_for_requests(
        &self,
        request_ids: &[i64],
    ) -> Result<Vec<donation_entity::Model>>;

    /// Donations made by one donor.
    async fn donations_by_donor(&self, donor_id: i64) -> Result<Vec<donation_entity::Model>>;

    /// Records a donation from the session user.
    async fn insert_donation(
        &self,
        session: &Session,
        request_id: i64,
        amount: f64,
    ) -> Result<donation_entity::Model>;
}

/// Both repositories backed by one `SeaORM` connection.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Wraps an open database connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl DonationRequestRepository for SeaOrmStore {
    async fn requests_by_status(
        &self,
        status: VerificationStatus,
    ) -> Result<Vec<donation_request::Model>> {
        request::list_requests_by_status(&self.db, status).await
    }

    async fn requests_by_owner(&self, owner_id: i64) -> Result<Vec<donation_request::Model>> {
        request::list_requests_by_owner(&self.db, owner_id).await
    }

    async fn request_by_id(&self, request_id: i64) -> Result<Option<donation_request::Model>> {
        request::get_request_by_id(&self.db, request_id).await
    }

    async fn insert_request(
        &self,
        session: &Session,
        new_request: NewDonationRequest,
    ) -> Result<donation_request::Model> {
        request::create_request(&self.db, session, new_request).await
    }

    async fn update_status(
        &self,
        session: &Session,
        request_id: i64,
        status: VerificationStatus,
    ) -> Result<donation_request::Model> {
        request::review_request(&self.db, session, request_id, status).await
    }
}

#[async_trait]
impl DonationRepository for SeaOrmStore {
    async fn donations_for_request(&self, request_id: i64) -> Result<Vec<donation_entity::Model>> {
        donation::get_donations_for_request(&self.db, request_id).await
    }

    async fn donations_for_requests(
        &self,
        request_ids: &[i64],
    ) -> Result<Vec<donation_entity::Model>> {
        donation::get_donations_for_requests(&self.db, request_ids).await
    }

    async fn donations_by_donor(&self, donor_id: i64) -> Result<Vec<donation_entity::Model>> {
        donation::get_donations_by_donor(&self.db, donor_id).await
    }

    async fn insert_donation(
        &self,
        session: &Session,
        request_id: i64,
        amount: f64,
    ) -> Result<donation_entity::Model> {
        donation::create_donation(&self.db, session, request_id, amount).await
    }
}
