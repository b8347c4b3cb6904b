//! Fragment reassembly for WebSocket messages.
//!
//! The transport delivers each logical message as one or more fragments,
//! each tagged with its byte offset inside the message, the message's
//! declared total length and a final-fragment flag:
//!
//! ```text
//! Fragment 1: offset=0     len=4096  total=9000  final=false
//! Fragment 2: offset=4096  len=4096  total=9000  final=false
//! Fragment 3: offset=8192  len=808   total=9000  final=true   → complete
//! ```
//!
//! One [`Reassembler`] exists per channel (binary, text).  Each owns a
//! [`BoundedBuf`] that is allocated on first use, reused across
//! messages and only released by [`Reassembler::release`].

extern crate alloc;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::error::{AllocError, Error, ProtocolError};

/// Which reassembly channel a fragment belongs to, from the WebSocket
/// message opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Binary,
    Text,
}

impl Channel {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Text => "text",
        }
    }
}

/// One transport-level piece of a logical message.
#[derive(Debug, Clone, Copy)]
pub struct Fragment<'a> {
    pub channel: Channel,
    /// Byte offset of `data` within the logical message.
    pub offset: usize,
    /// Declared total length of the logical message.
    pub total: usize,
    /// Last WebSocket frame of the message.
    pub is_final: bool,
    pub data: &'a [u8],
}

impl<'a> Fragment<'a> {
    /// A message delivered in a single frame.
    pub fn whole(channel: Channel, data: &'a [u8]) -> Self {
        Self {
            channel,
            offset: 0,
            total: data.len(),
            is_final: true,
            data,
        }
    }
}

// ── Bounded byte container ────────────────────────────────────

/// Growable byte buffer with a hard capacity.  Writes past the
/// capacity are refused, never truncated.
#[derive(Debug)]
pub struct BoundedBuf {
    data: Vec<u8>,
    capacity: usize,
}

impl BoundedBuf {
    /// Reserve the full capacity up front so later writes never
    /// reallocate.  Fails instead of aborting on memory exhaustion.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, AllocError> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| AllocError::WorkingBuffer { bytes: capacity })?;
        Ok(Self { data, capacity })
    }

    /// Copy `bytes` at `offset`.  `offset` must not leave a gap after
    /// the current length.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), ProtocolError> {
        let end = offset
            .checked_add(bytes.len())
            .ok_or(ProtocolError::Oversized {
                declared: usize::MAX,
                capacity: self.capacity,
            })?;
        if end > self.capacity {
            return Err(ProtocolError::Oversized {
                declared: end,
                capacity: self.capacity,
            });
        }
        if offset > self.data.len() {
            return Err(ProtocolError::NonSequential {
                expected: self.data.len(),
                got: offset,
            });
        }
        self.data.truncate(offset);
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ── Reassembler ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a fragment at offset 0.
    Idle,
    /// Collecting; `received` bytes are in the buffer.
    Assembling { received: usize },
    /// Message rejected; drop until the next offset-0 fragment.
    Discarding,
}

/// Result of feeding one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More fragments expected.
    Partial,
    /// Message complete; its bytes are in [`Reassembler::message`].
    Complete(usize),
}

/// Per-channel reassembly state machine.
pub struct Reassembler {
    channel: Channel,
    capacity: usize,
    buf: Option<BoundedBuf>,
    state: State,
    /// Length of the last completed message still held in `buf`.
    completed: Option<usize>,
}

impl Reassembler {
    pub fn new(channel: Channel, capacity: usize) -> Self {
        Self {
            channel,
            capacity,
            buf: None,
            state: State::Idle,
            completed: None,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a message is partially collected.
    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Assembling { .. })
    }

    /// Whether the working buffer is currently allocated.
    pub fn is_allocated(&self) -> bool {
        self.buf.is_some()
    }

    /// Feed one fragment.
    ///
    /// Returns [`Progress::Complete`] exactly once per message, when the
    /// fragment ends at the declared total and carries the final flag.
    /// Any error discards the in-flight message.
    pub fn feed(&mut self, frag: &Fragment<'_>) -> Result<Progress, Error> {
        self.completed = None;

        if frag.offset == 0 {
            if self.is_active() {
                debug!(
                    "Reasm[{}]: new message abandons partial one",
                    self.channel.tag()
                );
            }
            self.state = State::Idle;
            if let Some(buf) = self.buf.as_mut() {
                buf.clear();
            }
        }

        let result = self.accept(frag);
        match result {
            Ok(Progress::Complete(_)) => self.state = State::Idle,
            Ok(Progress::Partial) => {}
            Err(Error::Protocol(ProtocolError::NotAssembling)) => {
                // Tail of a message that was already rejected or never
                // started; stay in whatever state we were in.
            }
            Err(e) => {
                warn!("Reasm[{}]: dropping message: {}", self.channel.tag(), e);
                self.state = State::Discarding;
                if let Some(buf) = self.buf.as_mut() {
                    buf.clear();
                }
            }
        }
        result
    }

    fn accept(&mut self, frag: &Fragment<'_>) -> Result<Progress, Error> {
        let received = match self.state {
            State::Assembling { received } => received,
            State::Idle if frag.offset == 0 => 0,
            State::Idle | State::Discarding => return Err(ProtocolError::NotAssembling.into()),
        };

        let end = frag.offset.saturating_add(frag.data.len());
        if frag.total > self.capacity || end > self.capacity {
            return Err(ProtocolError::Oversized {
                declared: frag.total.max(end),
                capacity: self.capacity,
            }
            .into());
        }
        if frag.offset != received {
            return Err(ProtocolError::NonSequential {
                expected: received,
                got: frag.offset,
            }
            .into());
        }
        if end > frag.total {
            return Err(ProtocolError::ExceedsDeclared.into());
        }

        if self.buf.is_none() {
            self.buf = Some(BoundedBuf::try_with_capacity(self.capacity)?);
        }
        let Some(buf) = self.buf.as_mut() else {
            return Err(AllocError::WorkingBuffer {
                bytes: self.capacity,
            }
            .into());
        };
        buf.write_at(frag.offset, frag.data)?;

        if end == frag.total && frag.is_final {
            self.completed = Some(end);
            Ok(Progress::Complete(end))
        } else {
            self.state = State::Assembling { received: end };
            Ok(Progress::Partial)
        }
    }

    /// Bytes of the message completed by the last `feed` call.
    pub fn message(&self) -> Option<&[u8]> {
        let len = self.completed?;
        self.buf.as_ref().map(|b| &b.as_slice()[..len])
    }

    /// The completed message as text.  Length-delimited; no terminator.
    pub fn text(&self) -> Result<Option<&str>, ProtocolError> {
        match self.message() {
            None => Ok(None),
            Some(bytes) => core::str::from_utf8(bytes)
                .map(Some)
                .map_err(|_| ProtocolError::InvalidUtf8),
        }
    }

    /// Discard any partial message, keeping the allocation.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.completed = None;
        if let Some(buf) = self.buf.as_mut() {
            buf.clear();
        }
    }

    /// Discard state and free the working buffer.
    pub fn release(&mut self) {
        self.reset();
        self.buf = None;
    }
}

// ── Tests ────────────────────────────────────────────────────
