//! Core business logic for talentvote.

pub mod services;

pub use services::*;
