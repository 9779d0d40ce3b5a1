//! Unified error type.

use crate::method::Method;

/// The error type returned by the portal's lifecycle and registration APIs.
///
/// Request-level outcomes (404, 405, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type covers the
/// embedding application's calls: registering handlers, starting and
/// stopping the portal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required argument was empty or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A handler for this exact (path, method) pair is already registered.
    /// The registry is left unchanged.
    #[error("handler already registered for {method} {path}")]
    AlreadyExists { method: Method, path: String },

    #[error("portal is already running")]
    AlreadyRunning,

    #[error("portal is not running")]
    NotRunning,

    /// The access-point network interface could not be brought up.
    #[error("network interface: {0}")]
    Interface(#[source] std::io::Error),

    /// Every attempt to bind the HTTP listener failed.
    #[error("failed to bind HTTP listener after {attempts} attempts")]
    BindExhausted {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
