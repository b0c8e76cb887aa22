use thiserror::Error;

use xylo_access::{AccessError, ConfigError};

// -----------------------------------------------------------------------------
// EmitError

/// Fatal failures of one serialization call.
///
/// Every variant carries the tag being written when the failure occurred.
/// The call's output must be treated as invalid; nothing is retried and no
/// recovery of partial output is attempted.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Building the accessor registry for a node's type failed.
    #[error("failed to build accessor registry while writing tag `{tag}`")]
    Registry {
        tag: String,
        #[source]
        source: ConfigError,
    },

    /// An accessor or leaf renderer failed on a node of `type_name`.
    #[error("accessor failure while writing tag `{tag}` of `{type_name}`")]
    Access {
        tag: String,
        type_name: &'static str,
        #[source]
        source: AccessError,
    },

    /// The output sink failed.
    #[error("sink failure while writing tag `{tag}`")]
    Io {
        tag: String,
        #[source]
        source: std::io::Error,
    },
}
