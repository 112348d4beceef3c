//! Donation entity - A single contribution from a donor to a donation request.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Donation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    /// Unique identifier for the donation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Request this donation funds
    pub request_id: i64,
    /// User who gave the money
    pub donor_id: i64,
    /// Donated amount, positive when written by this crate
    pub amount: f64,
    /// When the donation was made
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Donation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each donation belongs to one request
    #[sea_orm(
        belongs_to = "super::donation_request::Entity",
        from = "Column::RequestId",
        to = "super::donation_request::Column::Id"
    )]
    DonationRequest,
}

impl Related<super::donation_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DonationRequest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
