//! The dispatch engine: argument reader, dispatch loop, registration
//! facade.

use embassy_time::{Duration, Instant};
use embedded_io::{Read, ReadReady, Write};
use heapless::Vec;

use crate::builtins::{handlers, Hal};
use crate::frame::Frame;
use crate::table::{error::RegisterError, CommandTable, Entry, AUTO_ID};
use crate::trampoline::{raw_trampoline, Callable, Erased, RawHandler};
use crate::{MAX_ARGS, MAX_COMMANDS, RET_CAP};

/// Construction-time configuration.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Identity byte reported by the device-id command.
    pub device_id: u8,
    /// Wall-clock bound on collecting one command's argument block.
    pub timeout: Duration,
    /// Register the built-in command set during construction.
    pub load_default_set: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: 0,
            timeout: Duration::from_millis(200),
            load_default_set: true,
        }
    }
}

/// A table-driven RPC dispatcher bound to a byte-stream port.
///
/// `Port` is any blocking [`embedded_io`] byte stream that can also
/// report "bytes available" ([`ReadReady`]). The port and HAL are
/// borrowed for the dispatcher's lifetime; callbacks are referenced,
/// never owned.
///
/// Dispatch is single-threaded, cooperative, and non-reentrant: drive
/// [`poll`](Self::poll) from a main loop, a timer, or a data-ready
/// interrupt. Each call performs at most one full command cycle.
pub struct Dispatcher<'a, Port, const CMDS: usize = MAX_COMMANDS, const ARGS: usize = MAX_ARGS>
where
    Port: Read + ReadReady + Write,
{
    port: &'a mut Port,
    hal: &'a mut dyn Hal,
    table: CommandTable<CMDS>,
    args: Vec<u8, ARGS>,
    device_id: u8,
    timeout: Duration,
}

impl<'a, Port, const CMDS: usize, const ARGS: usize> Dispatcher<'a, Port, CMDS, ARGS>
where
    Port: Read + ReadReady + Write,
{
    pub fn new(
        port: &'a mut Port,
        hal: &'a mut dyn Hal,
        config: Config,
    ) -> Result<Self, RegisterError> {
        let mut dispatcher = Self {
            port,
            hal,
            table: CommandTable::new(),
            args: Vec::new(),
            device_id: config.device_id,
            timeout: config.timeout,
        };

        if config.load_default_set {
            dispatcher.load_default_set()?;
        }

        Ok(dispatcher)
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Change the argument-collection timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Whether a handler is registered at `id`.
    pub fn registered(&self, id: u8) -> bool {
        self.table.get(id).is_some()
    }

    /// Register a raw frame handler with an explicitly declared
    /// argument byte count.
    ///
    /// Pass [`AUTO_ID`] to have the next free id assigned. Returns the
    /// id actually used.
    pub fn register(
        &mut self,
        handler: RawHandler,
        args_size: u8,
        id: u8,
    ) -> Result<u8, RegisterError> {
        if args_size as usize > ARGS {
            return Err(RegisterError::OversizeArgs);
        }

        self.table.insert(
            Entry {
                handler: raw_trampoline,
                args_size,
                callback: handler as Erased,
            },
            id,
        )
    }

    /// Register a native function through the typed facade.
    ///
    /// The declared argument size is computed from the signature at
    /// compile time and a trampoline specialized to that signature is
    /// stored alongside the erased callback. Signatures whose argument
    /// block would overflow the argument buffer, or whose return type
    /// would overflow the return-capture slot, are rejected here, not
    /// at call time.
    ///
    /// `callback` must coerce to a `fn` pointer of arity 0–4, e.g.
    /// `register_fn(set_gain as fn(u16, u8) -> u8, AUTO_ID)`.
    pub fn register_fn<C: Callable>(&mut self, callback: C, id: u8) -> Result<u8, RegisterError> {
        if C::ARGS_SIZE > ARGS || C::ARGS_SIZE > u8::MAX as usize {
            return Err(RegisterError::OversizeArgs);
        }
        if C::RET_SIZE > RET_CAP {
            return Err(RegisterError::OversizeReturn);
        }

        self.table.insert(
            Entry {
                handler: C::trampoline(),
                args_size: C::ARGS_SIZE as u8,
                callback: callback.erase(),
            },
            id,
        )
    }

    /// Register the built-in command set.
    ///
    /// Ids are part of the remote contract and must stay stable, so the
    /// registration order below is fixed:
    ///
    /// | id | command | arg bytes |
    /// |----|---------|-----------|
    /// | 0  | pin mode set | 2 |
    /// | 1  | digital write | 3 |
    /// | 2  | analog write | 4 |
    /// | 3  | digital read | 5 |
    /// | 4  | analog read | 6 |
    /// | 5  | analog reference | 7 |
    /// | 6  | raw byte get | 0 |
    /// | 7  | raw byte set | 1 |
    /// | 8  | raw 2-byte get | 8 |
    /// | 9  | raw 4-byte get | 9 |
    /// | 10 | raw 2-byte set | 10 |
    /// | 11 | raw 4-byte set | 11 |
    /// | 12 | device-type string address get | 12 |
    /// | 13 | device id get | 0 |
    /// | 14 | tone | 14 |
    /// | 15 | no-tone | 15 |
    /// | 16 | shift-out | 16 |
    /// | 17 | shift-in | 17 |
    ///
    /// Ids 6–12 and 14–17 are auto-assigned and land where the table
    /// shows because of this exact ordering.
    pub fn load_default_set(&mut self) -> Result<(), RegisterError> {
        self.register(handlers::pin_mode, 2, 0)?;
        self.register(handlers::digital_write, 3, 1)?;
        self.register(handlers::analog_write, 4, 2)?;
        self.register(handlers::digital_read, 5, 3)?;
        self.register(handlers::analog_read, 6, 4)?;
        self.register(handlers::analog_reference, 7, 5)?;

        self.register(handlers::peek_byte, 0, AUTO_ID)?;
        self.register(handlers::poke_byte, 1, AUTO_ID)?;
        self.register(handlers::peek_word, 8, AUTO_ID)?;
        self.register(handlers::peek_dword, 9, AUTO_ID)?;
        self.register(handlers::poke_word, 10, AUTO_ID)?;
        self.register(handlers::poke_dword, 11, AUTO_ID)?;
        self.register(handlers::device_type_addr, 12, AUTO_ID)?;

        self.register(handlers::device_id, 0, 13)?;

        self.register(handlers::tone, 14, AUTO_ID)?;
        self.register(handlers::no_tone, 15, AUTO_ID)?;
        self.register(handlers::shift_out, 16, AUTO_ID)?;
        self.register(handlers::shift_in, 17, AUTO_ID)?;

        Ok(())
    }

    /// Run at most one full command cycle.
    ///
    /// Reads one id byte if available; an unknown id is consumed and
    /// ignored. For a registered id, pulls exactly the declared number
    /// of argument bytes (bounded by one wall-clock timeout across the
    /// whole collection), then invokes the handler exactly once and
    /// flushes any staged return bytes. A timeout abandons the call
    /// silently: partial argument bytes are discarded, nothing is
    /// written back, and the next call starts clean.
    ///
    /// Only port-level I/O errors surface; protocol-level conditions
    /// are deliberately silent.
    pub fn poll(&mut self) -> Result<(), Port::Error> {
        let start = Instant::now();

        let Some(id) = self.try_read_byte()? else {
            return Ok(());
        };

        let Some(entry) = self.table.get(id).copied() else {
            return Ok(());
        };

        self.args.clear();
        while self.args.len() < entry.args_size as usize {
            match self.try_read_byte()? {
                Some(byte) => {
                    // capacity >= args_size, checked at registration
                    let _ = self.args.push(byte);
                }
                None => {
                    if start.elapsed() >= self.timeout {
                        self.args.clear();
                        return Ok(());
                    }
                }
            }
        }

        let mut frame = Frame::new(id, &self.args, self.device_id, &mut *self.hal);
        (entry.handler)(&mut frame, entry.callback);

        let reply = frame.finish();
        if !reply.is_empty() {
            self.port.write_all(&reply)?;
            self.port.flush()?;
        }

        Ok(())
    }

    fn try_read_byte(&mut self) -> Result<Option<u8>, Port::Error> {
        if !self.port.read_ready()? {
            return Ok(None);
        }

        let mut byte = [0u8; 1];
        let n = self.port.read(&mut byte)?;

        Ok((n == 1).then(|| byte[0]))
    }
}
