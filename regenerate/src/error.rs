use thiserror::Error;

use crate::{manifest::Str, resource::ResId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of the secret rewrite. Each variant names the resource that caused it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required field is missing or has the wrong shape.
    #[error("malformed resource `{id}`: {reason}")]
    MalformedResource { id: ResId, reason: String },

    /// A `data` value could not be decoded.
    #[error("failed to decode key `{key}` of resource `{id}`")]
    Encoding {
        id: ResId,
        key: Str,
        #[source]
        source: DecodeError,
    },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    pub fn malformed(id: &ResId, reason: impl Into<String>) -> Self {
        Self::MalformedResource {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    pub fn encoding(id: &ResId, key: impl Into<Str>, source: impl Into<DecodeError>) -> Self {
        Self::Encoding {
            id: id.clone(),
            key: key.into(),
            source: source.into(),
        }
    }

    /// The resource the error originated from.
    pub fn resource(&self) -> &ResId {
        match self {
            Self::MalformedResource { id, .. } | Self::Encoding { id, .. } => id,
        }
    }
}
