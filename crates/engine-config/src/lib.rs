pub mod error;
pub mod profile;
pub mod properties;
pub mod settings;
