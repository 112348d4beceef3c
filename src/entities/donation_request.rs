//! Donation request entity - A funding campaign created by a receiver.
//!
//! Requests start `pending`, are verified or rejected by an admin, and only verified
//! requests are shown to donors. "Fully funded" is derived from donations and is
//! never stored here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Review state of a donation request
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum VerificationStatus {
    /// Waiting for admin review
    #[sea_orm(string_value = "pending")]
    #[default]
    Pending,
    /// Approved and open to donors
    #[sea_orm(string_value = "verified")]
    Verified,
    /// Refused by an admin
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

/// Donation request database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "donation_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Receiver who created the request
    pub user_id: i64,
    /// Short campaign title
    pub title: String,
    /// Free-form description of the need
    pub description: String,
    /// Comma-joined categories (e.g. `"medical, education"`)
    pub category: String,
    /// Amount the receiver asks for
    pub requested_amount: f64,
    /// Newline-separated cover image or video URLs
    pub cover_media: String,
    /// Free-text location
    pub location: String,
    /// Postal code of the location
    pub postal_code: String,
    /// Current review state
    pub status: VerificationStatus,
    /// When the request was submitted
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Individual categories, trimmed, with empty entries dropped.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.category
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Cover media URLs in upload order.
    #[must_use]
    pub fn cover_media_urls(&self) -> Vec<&str> {
        self.cover_media
            .lines()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .collect()
    }
}

/// Defines relationships between DonationRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one receiver
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    Owner,
    /// One request has many donations
    #[sea_orm(has_many = "super::donation::Entity")]
    Donations,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::donation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
