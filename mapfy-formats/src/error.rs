//! Error types for format conversion.

use thiserror::Error;

/// Result type for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur while importing or exporting feature data.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The file extension is not one of kml, gpx, json, geojson.
    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    /// The file content could not be parsed. No partial feature insertion
    /// happens on this path.
    #[error("Error parsing file: {0}")]
    Parse(String),

    /// Parsed fine, but the content is not a usable feature document
    /// (for example GeoJSON whose top level is a bare geometry).
    #[error("Invalid {format} content: {message}")]
    Invalid {
        /// The format being parsed.
        format: &'static str,
        /// What was wrong.
        message: String,
    },

    /// There is nothing to export.
    #[error("No features to export")]
    Empty,

    /// The snapshot could not be rendered or encoded.
    #[error("Export failed: {0}")]
    Render(String),
}

impl From<FormatError> for mapfy_core::MapError {
    fn from(err: FormatError) -> Self {
        Self::Format(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_converts_to_core_taxonomy() {
        let err = FormatError::Unsupported("tiff".into());
        let core: mapfy_core::MapError = err.into();
        assert!(matches!(core, mapfy_core::MapError::Format(_)));
        assert!(core.to_string().contains("tiff"));
    }
}
