//! Application core: link lifecycle and the inbound data path.
//!
//! Everything that touches the radio or sockets goes through the **port
//! traits** in [`ports`], so the whole server runs on the host against
//! simulation adapters.

pub mod events;
pub mod link;
pub mod ports;
pub mod service;
