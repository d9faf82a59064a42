//! Values for the `Content-Type` request header.

use std::fmt;

pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const FORM_DATA: &str = "multipart/form-data";
pub const JSON: &str = "application/json";

/// Request content type. Unrecognized values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    #[default]
    FormUrlencoded,
    FormData,
    Json,
    Custom(String),
}

impl ContentType {
    /// `multipart/form-data` with an explicit boundary parameter.
    pub fn multipart(boundary: &str) -> Self {
        ContentType::Custom(format!("{FORM_DATA}; boundary={boundary}"))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContentType::FormUrlencoded => FORM_URLENCODED,
            ContentType::FormData => FORM_DATA,
            ContentType::Json => JSON,
            ContentType::Custom(value) => value,
        }
    }
}

impl From<&str> for ContentType {
    fn from(value: &str) -> Self {
        match value {
            FORM_URLENCODED => ContentType::FormUrlencoded,
            FORM_DATA => ContentType::FormData,
            JSON => ContentType::Json,
            other => ContentType::Custom(other.to_string()),
        }
    }
}

impl From<String> for ContentType {
    fn from(value: String) -> Self {
        ContentType::from(value.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
