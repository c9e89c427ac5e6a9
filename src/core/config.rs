//! Configuration utilities for the extraction pipeline.
//!
//! This module provides the error type and validation trait shared by the
//! configurable components of the pipeline. Concrete configuration structs
//! live next to the components they configure and implement
//! [`ConfigValidator`].

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a ratio parameter is outside its valid range.
    #[error("ratio '{name}' must be within (0, 1], got {value}")]
    InvalidRatio {
        /// Name of the offending field.
        name: &'static str,
        /// The rejected value.
        value: f32,
    },

    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing the configuration error.
        message: String,
    },
}

/// A trait for validating configuration parameters.
pub trait ConfigValidator {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// A Result indicating success or a ConfigError if validation fails.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates that a ratio lies within (0, 1].
    ///
    /// # Arguments
    ///
    /// * `name` - Field name used in the error message.
    /// * `value` - The ratio to validate.
    ///
    /// # Returns
    ///
    /// A Result indicating success or a ConfigError if validation fails.
    fn validate_ratio(&self, name: &'static str, value: f32) -> Result<(), ConfigError> {
        if value > 0.0 && value <= 1.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidRatio { name, value })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl ConfigValidator for Dummy {
        fn validate(&self) -> Result<(), ConfigError> {
            Ok(())
        }

        fn get_defaults() -> Self {
            Dummy
        }
    }

    #[test]
    fn test_validate_ratio_bounds() {
        let dummy = Dummy;
        assert!(dummy.validate_ratio("r", 0.2).is_ok());
        assert!(dummy.validate_ratio("r", 1.0).is_ok());
        assert!(dummy.validate_ratio("r", 0.0).is_err());
        assert!(dummy.validate_ratio("r", 1.5).is_err());
    }
}
