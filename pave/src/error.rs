/*!
    Error taxonomy for the PaVE decoding pipeline.
*/

use thiserror::Error;

use crate::pipeline::Stage;

/**
    Errors from interpreting a buffer as a PaVE frame.

    These are caller-input errors: deterministic for the same bytes and
    never retried.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("buffer is {len} bytes, shorter than the {expected}-byte PaVE header")]
    Truncated { len: usize, expected: usize },

    #[error("packet did not have correct signature (got {0:02x?})")]
    BadSignature([u8; 4]),

    #[error(
        "packet size did not match header: {header_size} + {payload_size} != {buffer_len}"
    )]
    SizeMismatch {
        header_size: u16,
        payload_size: u32,
        buffer_len: usize,
    },
}

/**
    Errors from feeding a payload to the H.264 decoder.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The decoder accepted the input but has no full picture yet.
    #[error("decoder needs more input before it can emit a picture")]
    NoPictureYet,

    #[error("could not decode frame: {0}")]
    Corrupt(String),
}

/**
    Errors from converting a decoded picture to a packed raster.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("could not allocate {bytes} bytes for the output image")]
    OutOfMemory { bytes: usize },

    #[error("color conversion failed: {0}")]
    Failed(String),
}

/**
    One-time initialization failures.

    Cloneable so a failed setup can be reported by every later call.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("could not initialize ffmpeg: {0}")]
    Init(String),

    #[error("could not find h.264 decoder")]
    CodecNotFound,

    #[error("could not allocate decoder context: {0}")]
    ContextAllocation(String),

    #[error("could not open h.264 codec: {0}")]
    CodecOpen(String),
}

/**
    Errors from splitting a byte stream into frames.
*/
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/**
    Caller-visible failure of a pipeline call.

    Carries the error of the first component that failed.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Convert(#[from] ConvertError),
}

impl Error {
    /**
        The pipeline stage that failed, or `None` for setup failures.
    */
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Setup(_) => None,
            Self::Parse(_) => Some(Stage::Parsing),
            Self::Decode(_) => Some(Stage::Decoding),
            Self::Convert(_) => Some(Stage::Converting),
        }
    }

    /**
        True when the caller should simply supply the next frame.
    */
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(DecodeError::NoPictureYet))
    }
}

/// Type alias for results that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
