//! Value serialization formats.
//!
//! Backends store bytes; [`ValueFormat`] decides how typed values become
//! those bytes and back.
//!
//! | Format | Size | Use Case |
//! |--------|------|----------|
//! | [`Json`](ValueFormat::Json) | Larger | Default, human-readable entries |
//! | [`Bincode`](ValueFormat::Bincode) | Compact | Large bodies, hot caches |

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use stash_core::Raw;

/// Error raised while turning a value into bytes or back.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The value could not be serialized.
    #[error("serialize: {0}")]
    Serialize(Box<dyn std::error::Error + Send + Sync>),

    /// The stored bytes could not be decoded into the requested type.
    #[error("deserialize: {0}")]
    Deserialize(Box<dyn std::error::Error + Send + Sync>),
}

/// Serialization format for stored values.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueFormat {
    /// JSON via `serde_json`.
    #[default]
    Json,
    /// Bincode (standard configuration) via its serde bridge.
    Bincode,
}

impl ValueFormat {
    /// Serialize a value to bytes.
    pub fn serialize<T>(&self, value: &T) -> Result<Raw, FormatError>
    where
        T: Serialize + ?Sized,
    {
        let bytes = match self {
            ValueFormat::Json => {
                serde_json::to_vec(value).map_err(|err| FormatError::Serialize(Box::new(err)))?
            }
            ValueFormat::Bincode => {
                bincode::serde::encode_to_vec(value, bincode::config::standard())
                    .map_err(|err| FormatError::Serialize(Box::new(err)))?
            }
        };
        Ok(Bytes::from(bytes))
    }

    /// Deserialize bytes back to a value.
    pub fn deserialize<T>(&self, data: &[u8]) -> Result<T, FormatError>
    where
        T: DeserializeOwned,
    {
        match self {
            ValueFormat::Json => {
                serde_json::from_slice(data).map_err(|err| FormatError::Deserialize(Box::new(err)))
            }
            ValueFormat::Bincode => {
                bincode::serde::decode_from_slice(data, bincode::config::standard())
                    .map(|(value, _)| value)
                    .map_err(|err| FormatError::Deserialize(Box::new(err)))
            }
        }
    }
}
