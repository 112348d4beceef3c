//! Core business logic - framework-agnostic aggregation, persistence and read models.

/// Donation progress aggregation (pure)
pub mod aggregate;
/// Fundraiser read models and the fetch boundary
pub mod board;
/// Donation persistence
pub mod donation;
/// Typed repository traits and the `SeaORM` store
pub mod repository;
/// Text reports
pub mod report;
/// Donation request persistence and review
pub mod request;
/// Retry policy for boundary fetches
pub mod retry;
/// Users and sessions
pub mod user;
