//! WebSocket message protocol: fragment reassembly, text-message
//! discrimination and outbound commands.
//!
//! ```text
//!  fragments ──▶ Reassembler ──▶ complete message ──▶ classify ──▶ decoder
//!                 (bin / text)                         (text only)
//! ```

pub mod classify;
pub mod command;
pub mod reassembly;

pub use classify::{MessageKind, classify};
pub use command::MediaCommand;
pub use reassembly::{BoundedBuf, Channel, Fragment, Progress, Reassembler};
