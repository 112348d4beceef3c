//! Shared test utilities for fundraiser.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test users, requests and donations with sensible defaults.

use crate::{
    core::{
        donation,
        request::{self, NewDonationRequest},
        user::{self, Session},
    },
    entities::{self, Role, VerificationStatus},
    errors::Result,
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::atomic::{AtomicU64, Ordering};

static EMAIL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a user with a unique generated email.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    role: Role,
) -> Result<entities::user::Model> {
    let n = EMAIL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let email = format!("{}.{n}@example.org", name.to_lowercase());
    user::create_user(db, name, &email, role).await
}

/// Creates a user and returns the session for it.
pub async fn create_test_session(db: &DatabaseConnection, name: &str, role: Role) -> Result<Session> {
    let user = create_test_user(db, name, role).await?;
    Ok(Session::from_user(&user))
}

/// Wizard input with only a title and amount filled in.
///
/// # Defaults
/// * `description`: "Test request"
/// * `categories`: `["general"]`
/// * `location` / `postal_code`: "Springfield" / "00000"
pub fn new_request(title: &str, requested_amount: f64) -> NewDonationRequest {
    NewDonationRequest {
        title: title.to_string(),
        description: "Test request".to_string(),
        categories: vec!["general".to_string()],
        requested_amount,
        cover_media: Vec::new(),
        location: "Springfield".to_string(),
        postal_code: "00000".to_string(),
    }
}

/// Creates a pending request owned by `owner`.
pub async fn create_test_request(
    db: &DatabaseConnection,
    owner: &Session,
    title: &str,
    requested_amount: f64,
) -> Result<entities::donation_request::Model> {
    request::create_request(db, owner, new_request(title, requested_amount)).await
}

/// Creates a request owned by `owner` and marks it verified directly,
/// skipping the admin review step.
pub async fn create_verified_request(
    db: &DatabaseConnection,
    owner: &Session,
    title: &str,
    requested_amount: f64,
) -> Result<entities::donation_request::Model> {
    let created = create_test_request(db, owner, title, requested_amount).await?;
    let mut active_model: entities::donation_request::ActiveModel = created.into();
    active_model.status = Set(VerificationStatus::Verified);
    Ok(active_model.update(db).await?)
}

/// Records a donation from `donor` to a verified request.
pub async fn create_test_donation(
    db: &DatabaseConnection,
    donor: &Session,
    request_id: i64,
    amount: f64,
) -> Result<entities::donation::Model> {
    donation::create_donation(db, donor, request_id, amount).await
}

/// Sets up a complete test environment with a receiver.
/// Returns (db, receiver session) for common test scenarios.
pub async fn setup_with_receiver() -> Result<(DatabaseConnection, Session)> {
    let db = setup_test_db().await?;
    let receiver = create_test_session(&db, "Riley", Role::Receiver).await?;
    Ok((db, receiver))
}
