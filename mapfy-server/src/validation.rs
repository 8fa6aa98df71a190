//! Input validation for untrusted request data.
//!
//! All user-supplied input MUST be validated before it reaches the store.

use thiserror::Error;

/// Maximum length for map names.
pub const MAX_NAME_LEN: usize = 120;
/// Maximum length for map descriptions.
pub const MAX_DESCRIPTION_LEN: usize = 2_000;
/// Maximum features in one persisted map.
pub const MAX_FEATURES_PER_MAP: usize = 10_000;

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Map name missing or blank.
    #[error("Map name is required")]
    NameMissing,
    /// Map name exceeds the maximum length.
    #[error("Map name too long (max {MAX_NAME_LEN} chars)")]
    NameTooLong,
    /// Description exceeds the maximum length.
    #[error("Description too long (max {MAX_DESCRIPTION_LEN} chars)")]
    DescriptionTooLong,
    /// Too many features for one map.
    #[error("Too many features (max {MAX_FEATURES_PER_MAP})")]
    TooManyFeatures,
}

impl From<ValidationError> for crate::error::ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Validate a map name: non-blank, bounded length.
///
/// # Errors
///
/// Returns [`ValidationError::NameMissing`] for blank names and
/// [`ValidationError::NameTooLong`] past [`MAX_NAME_LEN`].
pub fn validate_map_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::NameMissing);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

/// Validate a map description's length.
///
/// # Errors
///
/// Returns [`ValidationError::DescriptionTooLong`] past
/// [`MAX_DESCRIPTION_LEN`].
pub fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong);
    }
    Ok(())
}

/// Validate the feature count of a submitted collection.
///
/// # Errors
///
/// Returns [`ValidationError::TooManyFeatures`] past
/// [`MAX_FEATURES_PER_MAP`].
pub fn validate_feature_count(count: usize) -> Result<(), ValidationError> {
    if count > MAX_FEATURES_PER_MAP {
        return Err(ValidationError::TooManyFeatures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_map_name("Harbor").is_ok());
        assert!(validate_map_name("  Harbor survey 2026  ").is_ok());
        assert!(validate_map_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            validate_map_name(""),
            Err(ValidationError::NameMissing)
        ));
        assert!(matches!(
            validate_map_name("   "),
            Err(ValidationError::NameMissing)
        ));
        assert!(matches!(
            validate_map_name(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(ValidationError::NameTooLong)
        ));
    }

    #[test]
    fn test_description_bounds() {
        assert!(validate_description("").is_ok());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN)).is_ok());
        assert!(validate_description(&"x".repeat(MAX_DESCRIPTION_LEN + 1)).is_err());
    }

    #[test]
    fn test_feature_count_bounds() {
        assert!(validate_feature_count(0).is_ok());
        assert!(validate_feature_count(MAX_FEATURES_PER_MAP).is_ok());
        assert!(validate_feature_count(MAX_FEATURES_PER_MAP + 1).is_err());
    }
}
