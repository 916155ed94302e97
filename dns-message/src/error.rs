use std::fmt::Display;

/// Raised when a byte buffer cannot be interpreted as a [`crate::Message`].
#[derive(Debug, PartialEq, Eq)]
pub enum FormatError {
    /// The buffer was not valid UTF-8/JSON at all.
    Malformed(String),
    /// The buffer parsed as JSON but carried a field this wire format
    /// doesn't recognize.
    UnknownField(String),
    /// A recognized field held a value outside its closed set (e.g. an
    /// out-of-range `dns.qry.type` or `dns.flags.rcode`).
    InvalidValue { field: &'static str, value: i64 },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "malformed message: {reason}"),
            Self::UnknownField(name) => write!(f, "unknown field {name:?}"),
            Self::InvalidValue { field, value } => {
                write!(f, "invalid value {value} for field {field:?}")
            }
        }
    }
}

impl std::error::Error for FormatError {}
