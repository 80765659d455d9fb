//! Request Value Types
//!
//! Small parsed values with no schema dependencies: the response format and
//! the asynchronous-response threshold.

use serde::{Deserialize, Serialize};

use crate::error::{RequestError, RequestResult};

/// How the response payload should be rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Plain JSON rows (the default)
    #[default]
    Json,
    /// Comma-separated values
    Csv,
    /// JSON-API envelope with sideloaded dimension rows
    JsonApi,
}

impl ResponseFormat {
    /// Parse the format parameter; absent means JSON
    pub fn parse(value: Option<&str>) -> RequestResult<Self> {
        let text = match value {
            Some(text) => text,
            None => return Ok(Self::Json),
        };
        match text.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "jsonapi" => Ok(Self::JsonApi),
            _ => {
                tracing::debug!("Unrecognized response format '{}'", text);
                Err(RequestError::AcceptFormatInvalid {
                    format: text.to_string(),
                })
            }
        }
    }

    /// Format name as it appears in requests
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::JsonApi => "jsonapi",
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Milliseconds to wait for results before switching to an async response
///
/// Two sentinels bound the range: [`AsyncAfter::NEVER`] waits forever (the
/// request is fully synchronous) and [`AsyncAfter::ALWAYS`] answers
/// asynchronously without waiting. The compiler only produces this value;
/// acting on it belongs to the response path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncAfter(i64);

impl AsyncAfter {
    /// Wait forever; never switch to an asynchronous response
    pub const NEVER: Self = Self(i64::MAX);
    /// Do not wait; always respond asynchronously
    pub const ALWAYS: Self = Self(-1);

    /// Parse the asyncAfter parameter
    ///
    /// The reserved words are matched case-sensitively; anything else must
    /// be a non-negative number of milliseconds.
    pub fn parse(value: &str) -> RequestResult<Self> {
        match value {
            "never" => Ok(Self::NEVER),
            "always" => Ok(Self::ALWAYS),
            _ => value
                .parse::<i64>()
                .ok()
                .filter(|millis| *millis >= 0)
                .map(Self)
                .ok_or_else(|| {
                    tracing::debug!("Unrecognized asyncAfter value '{}'", value);
                    RequestError::InvalidAsyncAfter {
                        value: value.to_string(),
                    }
                }),
        }
    }

    /// The raw millisecond threshold
    pub fn millis(&self) -> i64 {
        self.0
    }

    /// True for the fully synchronous sentinel
    pub fn is_never(&self) -> bool {
        *self == Self::NEVER
    }

    /// True for the always-asynchronous sentinel
    pub fn is_always(&self) -> bool {
        *self == Self::ALWAYS
    }
}

impl std::fmt::Display for AsyncAfter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_never() {
            write!(f, "never")
        } else if self.is_always() {
            write!(f, "always")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
