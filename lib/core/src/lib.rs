//! Core types and utilities shared by the clinic portal crates.
//!
//! This crate provides the error-handling foundation and the identifier
//! types that the backend hands out for staff accounts and clinics.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ClinicId, UserId};
