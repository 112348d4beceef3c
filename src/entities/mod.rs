//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod donation;
pub mod donation_request;
pub mod user;

// Re-export specific types to avoid conflicts
pub use donation::{Column as DonationColumn, Entity as Donation, Model as DonationModel};
pub use donation_request::{
    Column as DonationRequestColumn, Entity as DonationRequest, Model as DonationRequestModel,
    VerificationStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel, Role};
