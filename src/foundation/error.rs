/// Result alias used throughout the crate.
pub type BrandframeResult<T> = Result<T, BrandframeError>;

/// Error taxonomy shared by the compositor, the export pipelines and the settings service.
///
/// Decode and load errors are recovered where they occur; authorization and export setup errors
/// are meant to be surfaced to the user verbatim.
#[derive(thiserror::Error, Debug)]
pub enum BrandframeError {
    /// Uploaded media could not be decoded.
    #[error("input decode error: {0}")]
    InputDecode(String),

    /// Template image or font failed to load.
    #[error("resource load error: {0}")]
    ResourceLoad(String),

    /// Settings write rejected because the shared credential did not match.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Export could not be started (encoder, decoder or template unavailable).
    #[error("export setup error: {0}")]
    ExportSetup(String),

    /// Share target unavailable or rejected the artifact.
    #[error("delivery error: {0}")]
    Delivery(String),

    /// Export aborted through its cancel token.
    #[error("export cancelled")]
    Cancelled,

    /// Caller supplied an out-of-contract value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal evaluation failure (rendering, encoding, process IO).
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BrandframeError {
    pub fn input_decode(msg: impl Into<String>) -> Self {
        Self::InputDecode(msg.into())
    }

    pub fn resource_load(msg: impl Into<String>) -> Self {
        Self::ResourceLoad(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn export_setup(msg: impl Into<String>) -> Self {
        Self::ExportSetup(msg.into())
    }

    pub fn delivery(msg: impl Into<String>) -> Self {
        Self::Delivery(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error should be shown to the user as-is.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InputDecode(_)
                | Self::Authorization(_)
                | Self::ExportSetup(_)
                | Self::Cancelled
        )
    }
}

impl From<serde_json::Error> for BrandframeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}
