pub mod auth;
pub mod error;
pub mod lookup;
pub mod profile;
pub mod streaming;
