//! Utility functions
//!
//! - [`email`]: Email address validation

pub mod email;

pub use email::validate_email;
