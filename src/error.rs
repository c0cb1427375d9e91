use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Errors surfaced by the extraction and gap-fill pipeline. Recoverable
/// conditions (an absent statistics block) are logged and absorbed at the
/// extraction site instead of appearing here.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Page retrieval failed (network error or non-2xx status). Fatal for
    /// the record.
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A mandatory field could not be located; the page is not of the
    /// expected shape.
    #[error("required field {0} not found on page")]
    RequiredFieldMissing(&'static str),

    /// A value matched a known shape but could not be converted. Signals a
    /// contract violation upstream, not bad input data.
    #[error("value {raw:?} for {field} matched a known shape but failed to convert")]
    Normalization { field: &'static str, raw: String },

    /// The JSON repair loop could not locate an error offset or a matching
    /// quote and refuses to corrupt the text further.
    #[error("unrecoverable JSON format: {0}")]
    UnrecoverableFormat(&'static str),

    /// Every completion attempt produced unparseable output.
    #[error("gap fill produced no parseable response in {attempts} attempts")]
    GapFillExhausted { attempts: u32 },

    /// The completion service rejected the configured access key.
    #[error("completion service rejected credentials: {0}")]
    Credential(String),

    /// Any other completion-service failure (transport, non-2xx, bad body).
    #[error("completion service error: {0}")]
    Api(String),
}
