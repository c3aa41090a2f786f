//! Error types for migw.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Most failures inside the gateway run
//! loop are logged and swallowed; these variants surface only at the API
//! edge (building, starting, submitting) and from transports.

/// The error type for all migw operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (socket bind, send, or receive failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a datagram from the peer.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid parameter was passed to a builder or controller.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No transport is available (closed, or the worker already took it).
    #[error("not connected")]
    NotConnected,

    /// The gateway worker has already been started.
    #[error("gateway worker already running")]
    AlreadyRunning,

    /// The command queue is closed because the worker has exited.
    #[error("command queue closed")]
    QueueClosed,

    /// The command queue is full and the caller asked not to wait.
    #[error("command queue full")]
    QueueFull,

    /// An encoded frame does not fit in a single datagram.
    #[error("frame of {len} bytes exceeds maximum datagram size of {max} bytes")]
    FrameTooLarge {
        /// Encoded frame length in bytes.
        len: usize,
        /// Maximum datagram payload accepted by the peer.
        max: usize,
    },

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("bind failed".into());
        assert_eq!(e.to_string(), "transport error: bind failed");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("push must be on or off".into());
        assert_eq!(e.to_string(), "invalid parameter: push must be on or off");
    }

    #[test]
    fn error_display_already_running() {
        assert_eq!(
            Error::AlreadyRunning.to_string(),
            "gateway worker already running"
        );
    }

    #[test]
    fn error_display_queue_closed() {
        assert_eq!(Error::QueueClosed.to_string(), "command queue closed");
    }

    #[test]
    fn error_display_queue_full() {
        assert_eq!(Error::QueueFull.to_string(), "command queue full");
    }

    #[test]
    fn error_display_frame_too_large() {
        let e = Error::FrameTooLarge { len: 2000, max: 1480 };
        assert_eq!(
            e.to_string(),
            "frame of 2000 bytes exceeds maximum datagram size of 1480 bytes"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("address in use"));
    }

    #[test]
    fn error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Json(_)));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
