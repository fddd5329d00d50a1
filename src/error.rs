//! Application error types.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Application error carrying a classification, a short message for callers
/// and a detail payload that is logged but never serialized.
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    payload: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed name, user, port, base DN, host, password or filter
    InvalidInput,
    /// The requesting user does not own the instance
    Forbidden,
    /// No instance with that name
    NotFound,
    /// An instance with that name already exists
    AlreadyExists,
    /// No free port left in the configured range
    ResourceExhausted,
    /// An external command failed or exited with an unexpected code
    ExternalToolFailure,
    /// Reading or writing the instance root failed
    StorageFailure,
    /// A stored record could not be parsed
    Corrupt,
    /// Startup configuration error
    Config,
    /// Anything else
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::ResourceExhausted => 503,
            Self::ExternalToolFailure => 502,
            Self::StorageFailure => 500,
            Self::Corrupt => 500,
            Self::Config => 500,
            Self::Internal => 500,
        }
    }
}

/// Clamp a status code into the 400..=599 error range, defaulting to 500.
pub fn normalize_status(code: u16) -> u16 {
    if (400..=599).contains(&code) {
        code
    } else {
        500
    }
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            payload: BTreeMap::new(),
        }
    }

    /// Attach a detail entry, skipping empty values.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.payload.insert(key.to_string(), value);
        }
        self
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn forbidden() -> Self {
        Self::new(ErrorKind::Forbidden, "Access to this instance is forbidden")
    }

    pub fn invalid_user() -> Self {
        Self::new(ErrorKind::Forbidden, "Invalid user")
    }

    pub fn not_found(name: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("'{name}' not found")).with("name", name)
    }

    pub fn already_exists(name: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            format!("Folder for '{name}' already exists"),
        )
        .with("name", name)
    }

    pub fn ports_exhausted(start: u16, end: u32) -> Self {
        Self::new(
            ErrorKind::ResourceExhausted,
            "Could not find an available port",
        )
        .with("detail", format!("All ports in use between {start} and {end}"))
    }

    pub fn external_tool(message: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExternalToolFailure, message).with("output", output)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageFailure, message)
    }

    pub fn corrupt(name: &str, detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Corrupt, format!("Could not read '{name}'"))
            .with("name", name)
            .with("detail", detail)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }

    /// Status code to report to callers, always within 400..=599.
    pub fn status_code(&self) -> u16 {
        normalize_status(self.kind.status_code())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)?;
        if !self.payload.is_empty() {
            let pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " ({})", pairs.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct as _;
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("code", &self.status_code())?;
        s.serialize_field("error", &self.message)?;
        s.end()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<walkdir::Error> for AppError {
    fn from(err: walkdir::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_kind() {
        assert_eq!(AppError::invalid_input("x").status_code(), 400);
        assert_eq!(AppError::forbidden().status_code(), 403);
        assert_eq!(AppError::not_found("a").status_code(), 404);
        assert_eq!(AppError::already_exists("a").status_code(), 409);
        assert_eq!(AppError::ports_exhausted(1, 2).status_code(), 503);
        assert_eq!(AppError::external_tool("x", "").status_code(), 502);
        assert_eq!(AppError::corrupt("a", "bad").status_code(), 500);
    }

    #[test]
    fn out_of_range_codes_become_500() {
        assert_eq!(normalize_status(0), 500);
        assert_eq!(normalize_status(200), 500);
        assert_eq!(normalize_status(399), 500);
        assert_eq!(normalize_status(400), 400);
        assert_eq!(normalize_status(599), 599);
        assert_eq!(normalize_status(600), 500);
    }

    #[test]
    fn serialized_error_hides_payload() {
        let err = AppError::external_tool("Could not create instance", "secret tool output");
        let body = serde_json::to_value(&err).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"code": 502, "error": "Could not create instance"})
        );
        assert_eq!(err.detail("output"), Some("secret tool output"));
    }

    #[test]
    fn empty_payload_values_are_dropped() {
        let err = AppError::external_tool("failed", "");
        assert_eq!(err.detail("output"), None);
        assert_eq!(err.to_string(), "ExternalToolFailure: failed");
    }
}
