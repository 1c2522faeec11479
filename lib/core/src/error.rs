//! Error handling foundation for the clinic portal.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own domain-specific error types and converts them
//! into a `Report` where setup or I/O paths can fail.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_works() {
        let ok: Result<&str> = Ok("patients");
        assert_eq!(ok.expect("should be ok"), "patients");
    }
}
