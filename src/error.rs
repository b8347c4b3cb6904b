//! Unified error types for the navigation link.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the server's logging and counters uniform.  All variants are `Copy`
//! so they can be passed from the event-dispatch context without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level link error
// ---------------------------------------------------------------------------

/// Every fallible operation in the link funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// AP or listening socket could not be brought up, or a send failed.
    Transport(TransportError),
    /// The peer violated the fragment/size contract.
    Protocol(ProtocolError),
    /// A working buffer could not be allocated.
    Alloc(AllocError),
    /// A complete message could not be decoded.
    Decode(DecodeError),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
            Self::Alloc(e) => write!(f, "alloc: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// SoftAP bring-up failed.
    ApStartFailed,
    /// HTTP/WebSocket listener could not be bound.
    BindFailed,
    /// Operation requires a running server.
    NotRunning,
    /// No peer is connected to receive outbound traffic.
    NoPeer,
    /// The underlying socket rejected the write.
    SendFailed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApStartFailed => write!(f, "access point start failed"),
            Self::BindFailed => write!(f, "socket bind failed"),
            Self::NotRunning => write!(f, "server not running"),
            Self::NoPeer => write!(f, "no connected peer"),
            Self::SendFailed => write!(f, "send failed"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Fragment-sequence violations.  Each one discards the in-flight message
/// for that channel; the connection stays open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Declared total or `offset + len` exceeds the channel capacity.
    Oversized { declared: usize, capacity: usize },
    /// `offset + len` runs past the declared total.
    ExceedsDeclared,
    /// Offset does not continue where the previous fragment ended.
    NonSequential { expected: usize, got: usize },
    /// Continuation fragment with no message in progress.
    NotAssembling,
    /// Completed text message is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversized { declared, capacity } => {
                write!(f, "message of {declared} bytes exceeds capacity {capacity}")
            }
            Self::ExceedsDeclared => write!(f, "fragment runs past declared length"),
            Self::NonSequential { expected, got } => {
                write!(f, "fragment offset {got}, expected {expected}")
            }
            Self::NotAssembling => write!(f, "continuation without message start"),
            Self::InvalidUtf8 => write!(f, "text message is not UTF-8"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Allocation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// Reassembly working buffer.
    WorkingBuffer { bytes: usize },
    /// Tile pixel canvas.
    Canvas { bytes: usize },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkingBuffer { bytes } => write!(f, "working buffer ({bytes} bytes)"),
            Self::Canvas { bytes } => write!(f, "tile canvas ({bytes} bytes)"),
        }
    }
}

impl From<AllocError> for Error {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Text payload is not parseable JSON.
    MalformedJson,
    /// JSON root is not an object.
    NotAnObject,
    /// JSON nests deeper than the decoders accept.
    TooDeep,
    /// JPEG codec rejected the data.
    Jpeg,
    /// JPEG declares dimensions above the decode ceiling.
    ImageTooLarge { width: u32, height: u32 },
    /// JPEG colour layout the canvas cannot take.
    UnsupportedColor,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedJson => write!(f, "malformed JSON"),
            Self::NotAnObject => write!(f, "JSON root is not an object"),
            Self::TooDeep => write!(f, "JSON nested too deeply"),
            Self::Jpeg => write!(f, "JPEG decode failed"),
            Self::ImageTooLarge { width, height } => {
                write!(f, "image {width}x{height} above decode ceiling")
            }
            Self::UnsupportedColor => write!(f, "unsupported JPEG colour type"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl core::error::Error for Error {}
impl core::error::Error for TransportError {}
impl core::error::Error for ProtocolError {}
impl core::error::Error for AllocError {}
impl core::error::Error for DecodeError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Link-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
