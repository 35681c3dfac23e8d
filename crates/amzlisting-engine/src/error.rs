use std::path::PathBuf;

use amzlisting_contracts::listing::ListingParseError;

pub const INVALID_FORMAT_MESSAGE: &str =
    "The AI returned an invalid response format. Please try again.";

/// Failure of one generation attempt. None of these are fatal to the session.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("No API key available. Connect an API key to generate listings.")]
    MissingCredential,
    #[error("{message}")]
    Transport { message: String, status: Option<u16> },
    /// The user-facing text is fixed; `detail` keeps the parse failure for logs.
    #[error("The AI returned an invalid response format. Please try again.")]
    Format { detail: String },
}

impl GenerationError {
    pub fn transport(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Transport {
            message: message.into(),
            status,
        }
    }

    pub fn format(detail: impl Into<String>) -> Self {
        Self::Format {
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Transport { .. } => "transport",
            Self::Format { .. } => "format",
        }
    }
}

impl From<ListingParseError> for GenerationError {
    fn from(err: ListingParseError) -> Self {
        Self::format(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Please upload a valid image file.")]
    NotAnImage { mime_type: String },
    #[error("failed reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why `generate` refused to start; the UI disables the action in these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GenerateRejected {
    #[error("Upload a product mockup before generating.")]
    NoImage,
    #[error("A listing is already being generated.")]
    AlreadyLoading,
    #[error("Connect API Key to Generate")]
    CredentialAbsent,
}

#[cfg(test)]
mod tests {
    use amzlisting_contracts::listing::GeneratedListing;

    use super::{GenerationError, INVALID_FORMAT_MESSAGE};

    #[test]
    fn format_errors_share_one_user_message() {
        let parse_err = GeneratedListing::from_json_text("not json").unwrap_err();
        let err = GenerationError::from(parse_err);
        assert_eq!(err.to_string(), INVALID_FORMAT_MESSAGE);
        assert_eq!(err.kind(), "format");
        match err {
            GenerationError::Format { detail } => assert!(detail.contains("not valid JSON")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn transport_errors_surface_upstream_text() {
        let err = GenerationError::transport("Gemini request failed (500): boom", Some(500));
        assert_eq!(err.to_string(), "Gemini request failed (500): boom");
        assert_eq!(err.kind(), "transport");
    }
}
