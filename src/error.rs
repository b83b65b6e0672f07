use wasm_bindgen::JsValue;

/// Failures of a single GPX parse call.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Document has no <gpx> root element")]
    MissingRoot,

    #[error("Document has no <trk> element")]
    MissingTrack,

    #[error("Document ended inside <{element}>")]
    UnexpectedEof { element: &'static str },

    #[error("Invalid track point #{index}: {reason}")]
    InvalidPoint { index: usize, reason: PointDefect },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// True for every variant that means the input is not a usable GPX track document.
    pub fn is_malformed_document(&self) -> bool {
        matches!(
            self,
            Self::Xml(_) | Self::MissingRoot | Self::MissingTrack | Self::UnexpectedEof { .. }
        )
    }
}

/// Why a `<trkpt>` was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PointDefect {
    #[error("missing attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("invalid value '{value}' for attribute '{attribute}'")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },

    #[error("{attribute} {value} out of range")]
    OutOfRange { attribute: &'static str, value: f64 },
}

impl From<ParseError> for JsValue {
    fn from(e: ParseError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_grouping() {
        assert!(ParseError::MissingRoot.is_malformed_document());
        assert!(ParseError::MissingTrack.is_malformed_document());
        assert!(ParseError::UnexpectedEof { element: "trk" }.is_malformed_document());

        let invalid = ParseError::InvalidPoint {
            index: 3,
            reason: PointDefect::MissingAttribute("lat"),
        };
        assert!(!invalid.is_malformed_document());
        assert_eq!(
            invalid.to_string(),
            "Invalid track point #3: missing attribute 'lat'"
        );
    }
}
