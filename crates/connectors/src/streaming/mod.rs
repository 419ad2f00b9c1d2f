pub mod channel;
pub mod error;
pub mod memory;
pub mod rest;
pub mod state;
