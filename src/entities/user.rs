//! User entity - Donors, receivers and administrators.
//!
//! A user's role decides what the session built from it may do: receivers create
//! donation requests, donors give to them, admins verify or reject them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a user is allowed to do in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    /// Gives money to verified requests
    #[sea_orm(string_value = "donor")]
    Donor,
    /// Creates donation requests
    #[sea_orm(string_value = "receiver")]
    Receiver,
    /// Reviews pending requests
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Donor => "donor",
            Self::Receiver => "receiver",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name shown on requests and donations
    pub display_name: String,
    /// Login email, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// Donor, receiver or admin
    pub role: Role,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A receiver owns many donation requests
    #[sea_orm(has_many = "super::donation_request::Entity")]
    DonationRequests,
}

impl Related<super::donation_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DonationRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
