//! Table-driven remote procedure calls over a byte stream.
//!
//! A remote peer sends one command id byte followed by a fixed-width
//! block of raw argument bytes. The [`Dispatcher`] looks the id up in a
//! fixed-capacity table, collects the declared argument block (bounded
//! by a wall-clock timeout), decodes it into typed values, invokes the
//! registered callback, and writes any return value straight back onto
//! the stream: no length prefixes, no delimiters, no acknowledgements.
//!
//! No allocation anywhere: the table and all buffers are fixed-size.

#![no_std]

pub mod builtins;
pub mod crc8;
pub mod dispatcher;
pub mod frame;
pub mod table;
pub mod trampoline;

pub use builtins::{Hal, NullHal};
pub use crc8::crc8;
pub use dispatcher::{Config, Dispatcher};
pub use frame::Frame;
pub use table::{error::RegisterError, AUTO_ID};
pub use trampoline::{Callable, RawHandler};

/// Default command table capacity. Larger tables eat more RAM.
pub const MAX_COMMANDS: usize = 30;

/// Default argument buffer capacity in bytes.
pub const MAX_ARGS: usize = 17;

/// Width of the return-capture slot. Callbacks whose return type is
/// wider than this are rejected at registration.
pub const RET_CAP: usize = 8;
