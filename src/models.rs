pub mod audit;
pub mod auth;
pub mod campus;
pub mod invoice;
pub mod profile;
