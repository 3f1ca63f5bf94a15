//! Error handling for rs-hackrf
//!
//! Native status codes returned by libhackrf (or by any other
//! [`Transport`](crate::transport::Transport)) are translated into
//! [`ErrorKind`]. Usage errors, such as starting a stream twice or touching a
//! closed device, are reported separately as [`Usage`].

use thiserror::Error;

use crate::Direction;

/// A specialized Result type for rs-hackrf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Native success status (`HACKRF_SUCCESS`).
pub const HACKRF_SUCCESS: i32 = 0;

/// Kinds of failure reported by the native driver.
///
/// Values mirror the libhackrf `hackrf_error` enum. Codes the driver may add
/// later are kept verbatim in [`ErrorKind::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Parameter invalid.
    InvalidParam,
    /// No HackRF device found.
    NotFound,
    /// Device is busy.
    Busy,
    /// Out of memory.
    NoMem,
    /// USB transport (libusb) error.
    Libusb,
    /// Thread creation error.
    Thread,
    /// Streaming thread error.
    StreamingThreadErr,
    /// Streaming stopped.
    StreamingStopped,
    /// Streaming thread exit was requested.
    StreamingExitCalled,
    /// Other error.
    Other,
    /// Code not known to this crate.
    Unknown(i32),
}

impl ErrorKind {
    /// Raw native status code for this kind.
    pub fn code(self) -> i32 {
        match self {
            ErrorKind::InvalidParam => -2,
            ErrorKind::NotFound => -5,
            ErrorKind::Busy => -6,
            ErrorKind::NoMem => -11,
            ErrorKind::Libusb => -1000,
            ErrorKind::Thread => -1001,
            ErrorKind::StreamingThreadErr => -1002,
            ErrorKind::StreamingStopped => -1003,
            ErrorKind::StreamingExitCalled => -1004,
            ErrorKind::Other => -9999,
            ErrorKind::Unknown(code) => code,
        }
    }

    /// Get the libhackrf constant name for the error kind.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::InvalidParam => "HACKRF_ERROR_INVALID_PARAM",
            ErrorKind::NotFound => "HACKRF_ERROR_NOT_FOUND",
            ErrorKind::Busy => "HACKRF_ERROR_BUSY",
            ErrorKind::NoMem => "HACKRF_ERROR_NO_MEM",
            ErrorKind::Libusb => "HACKRF_ERROR_LIBUSB",
            ErrorKind::Thread => "HACKRF_ERROR_THREAD",
            ErrorKind::StreamingThreadErr => "HACKRF_ERROR_STREAMING_THREAD_ERR",
            ErrorKind::StreamingStopped => "HACKRF_ERROR_STREAMING_STOPPED",
            ErrorKind::StreamingExitCalled => "HACKRF_ERROR_STREAMING_EXIT_CALLED",
            ErrorKind::Other => "HACKRF_ERROR_OTHER",
            ErrorKind::Unknown(_) => "HACKRF_ERROR_UNKNOWN",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidParam => write!(f, "invalid param"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Busy => write!(f, "busy"),
            ErrorKind::NoMem => write!(f, "no mem"),
            ErrorKind::Libusb => write!(f, "libusb error"),
            ErrorKind::Thread => write!(f, "thread error"),
            ErrorKind::StreamingThreadErr => write!(f, "streaming thread error"),
            ErrorKind::StreamingStopped => write!(f, "streaming stopped"),
            ErrorKind::StreamingExitCalled => write!(f, "streaming exit called"),
            ErrorKind::Other => write!(f, "other error"),
            ErrorKind::Unknown(code) => write!(f, "unknown error {}", code),
        }
    }
}

/// Translate a native status code into an [`ErrorKind`].
///
/// Meant for failure codes; use [`check`] when the code may be a success.
pub fn translate(code: i32) -> ErrorKind {
    match code {
        -2 => ErrorKind::InvalidParam,
        -5 => ErrorKind::NotFound,
        -6 => ErrorKind::Busy,
        -11 => ErrorKind::NoMem,
        -1000 => ErrorKind::Libusb,
        -1001 => ErrorKind::Thread,
        -1002 => ErrorKind::StreamingThreadErr,
        -1003 => ErrorKind::StreamingStopped,
        -1004 => ErrorKind::StreamingExitCalled,
        -9999 => ErrorKind::Other,
        other => ErrorKind::Unknown(other),
    }
}

/// Turn a native status code into a `Result`.
pub fn check(code: i32) -> Result<()> {
    if code == HACKRF_SUCCESS {
        Ok(())
    } else {
        Err(Error::Native(translate(code)))
    }
}

/// API misuse detected before reaching the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Usage {
    /// The direction is already streaming.
    #[error("{0} stream already started")]
    AlreadyStreaming(Direction),

    /// The direction is not streaming.
    #[error("{0} stream not started")]
    NotStreaming(Direction),

    /// The device has been closed.
    #[error("device is closed")]
    DeviceClosed,
}

/// Errors that can occur during HackRF operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The native driver reported a failure.
    #[error("hackrf: {0}")]
    Native(ErrorKind),

    /// An operation was attempted in the wrong state.
    #[error("precondition violated: {0}")]
    Precondition(#[from] Usage),

    /// Device configuration rejected before being applied.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// The native error kind, if this error came from the driver.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Native(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::Native(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINED: [(i32, ErrorKind); 10] = [
        (-2, ErrorKind::InvalidParam),
        (-5, ErrorKind::NotFound),
        (-6, ErrorKind::Busy),
        (-11, ErrorKind::NoMem),
        (-1000, ErrorKind::Libusb),
        (-1001, ErrorKind::Thread),
        (-1002, ErrorKind::StreamingThreadErr),
        (-1003, ErrorKind::StreamingStopped),
        (-1004, ErrorKind::StreamingExitCalled),
        (-9999, ErrorKind::Other),
    ];

    #[test]
    fn test_translate_defined_codes() {
        for (code, kind) in DEFINED {
            assert_eq!(translate(code), kind);
            assert_eq!(kind.code(), code);
        }
    }

    #[test]
    fn test_translate_unknown_keeps_code() {
        // HACKRF_ERROR_USB_API_VERSION is not part of the mapped set
        assert_eq!(translate(-1005), ErrorKind::Unknown(-1005));
        assert_eq!(translate(42).code(), 42);
        assert_eq!(translate(1), ErrorKind::Unknown(1));
    }

    #[test]
    fn test_check() {
        assert!(check(HACKRF_SUCCESS).is_ok());
        let err = check(-6).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Busy));
        assert_eq!(err.to_string(), "hackrf: busy");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::Native(ErrorKind::Unknown(-77)).to_string(),
            "hackrf: unknown error -77"
        );
        let err: Error = Usage::AlreadyStreaming(Direction::Rx).into();
        assert_eq!(err.to_string(), "precondition violated: RX stream already started");
        assert!(err.kind().is_none());
    }

    #[test]
    fn test_error_names() {
        assert_eq!(ErrorKind::Libusb.name(), "HACKRF_ERROR_LIBUSB");
        assert_eq!(ErrorKind::Unknown(-3).name(), "HACKRF_ERROR_UNKNOWN");
    }

    #[test]
    fn test_config_error_constructor() {
        let err = Error::config("LNA gain out of range");
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("invalid configuration"));
    }
}
