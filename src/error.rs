use thiserror::Error;

/// Error types for BBL decoding
#[derive(Debug, Error)]
pub enum BBLError {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed metadata or field-definition line
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// Attribute lines of one frame type disagree on the number of fields
    #[error(
        "Invalid header: frame type '{frame_type}' has {expected} field names but {found} {attribute} entries"
    )]
    FieldCountMismatch {
        frame_type: char,
        attribute: &'static str,
        expected: usize,
        found: usize,
    },
    /// A frame type was referenced but one of its attribute lines never appeared
    #[error("Invalid header: frame type '{frame_type}' is missing its '{missing}' definition")]
    IncompleteFieldDefinition {
        frame_type: char,
        missing: &'static str,
    },
    /// Buffer exhausted while decoding a field
    #[error("Unexpected end of data")]
    UnexpectedEof,
    /// Encoding id without a decode routine
    #[error("Invalid encoding type: {0}")]
    InvalidEncoding(u8),
    /// Predictor id without a prediction rule
    #[error("Invalid predictor type: {0}")]
    InvalidPredictor(u8),
    /// Frame bytes that cannot be interpreted
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    /// Resynchronization ran out of attempts
    #[error("Unresolvable corruption: no frame marker within {attempts} bytes of offset {offset}")]
    UnresolvableCorruption { offset: usize, attempts: usize },
    /// Export format error
    #[error("Export error: {0}")]
    Export(String),
}

impl BBLError {
    /// True for errors raised while reading the text header.
    pub fn is_header_error(&self) -> bool {
        matches!(
            self,
            BBLError::InvalidHeader(_)
                | BBLError::FieldCountMismatch { .. }
                | BBLError::IncompleteFieldDefinition { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BBLError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_frame_type_and_counts() {
        let err = BBLError::FieldCountMismatch {
            frame_type: 'I',
            attribute: "predictor",
            expected: 3,
            found: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("'I'"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
        assert!(err.is_header_error());
    }

    #[test]
    fn test_stream_errors_are_not_header_errors() {
        assert!(!BBLError::UnexpectedEof.is_header_error());
        assert!(!BBLError::InvalidEncoding(42).is_header_error());
        assert_eq!(
            BBLError::InvalidEncoding(42).to_string(),
            "Invalid encoding type: 42"
        );
    }
}
