pub mod auth;
pub mod delivery;
pub mod expenses;
pub mod receipts;
pub mod reviews;
