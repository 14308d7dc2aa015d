//! Fixed-capacity command table.
//!
//! Maps a one-byte command id to its handler entry. The invariant is
//! that an occupied slot's index equals its command id, so lookup is a
//! plain bounds-checked index.

use crate::trampoline::{Erased, Handler};

/// Sentinel id requesting automatic assignment; never stored as an
/// active id and never dispatched.
pub const AUTO_ID: u8 = 255;

pub mod error {
    /// Setup-time registration failures. These indicate a programming
    /// mistake in the integration and are surfaced synchronously to the
    /// registering code.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub enum RegisterError {
        /// Auto-id assignment found no free slot.
        TableFull,
        /// Explicit id beyond the table capacity.
        IdOutOfRange,
        /// Declared argument block exceeds the argument buffer.
        OversizeArgs,
        /// Return type exceeds the return-capture slot.
        OversizeReturn,
    }
}

/// One registered command: the uniform trampoline entry point, the
/// declared argument byte count, and the erased original callback that
/// only the matching trampoline knows how to restore.
#[derive(Clone, Copy)]
pub(crate) struct Entry {
    pub handler: Handler,
    pub args_size: u8,
    pub callback: Erased,
}

pub(crate) struct CommandTable<const N: usize> {
    slots: [Option<Entry>; N],
    // next candidate slot for auto-id assignment
    cursor: usize,
}

impl<const N: usize> CommandTable<N> {
    pub const fn new() -> Self {
        // ids are one byte; a larger table could never be addressed
        assert!(N <= AUTO_ID as usize);

        Self {
            slots: [None; N],
            cursor: 0,
        }
    }

    /// Store an entry at `id`, or at the next free slot when `id` is
    /// [`AUTO_ID`].
    ///
    /// Auto assignment scans forward, skipping slots already claimed by
    /// explicit registrations. An explicit id overwrites whatever the
    /// slot held (last write wins). Returns the id actually used.
    pub fn insert(&mut self, entry: Entry, id: u8) -> Result<u8, error::RegisterError> {
        if id == AUTO_ID {
            while self.cursor < N && self.slots[self.cursor].is_some() {
                self.cursor += 1;
            }

            if self.cursor >= N {
                return Err(error::RegisterError::TableFull);
            }

            let id = self.cursor as u8;
            self.slots[self.cursor] = Some(entry);

            Ok(id)
        } else {
            let slot = self
                .slots
                .get_mut(id as usize)
                .ok_or(error::RegisterError::IdOutOfRange)?;
            *slot = Some(entry);

            Ok(id)
        }
    }

    pub fn get(&self, id: u8) -> Option<&Entry> {
        self.slots.get(id as usize)?.as_ref()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn nop(_: &mut Frame<'_>, _: Erased) {}

    fn entry(args_size: u8) -> Entry {
        Entry {
            handler: nop,
            args_size,
            callback: core::ptr::null(),
        }
    }

    mod auto_id {
        use super::*;

        #[test]
        fn monotonic() {
            let mut table = CommandTable::<10>::new();

            for expected in 0..10u8 {
                assert_eq!(Ok(expected), table.insert(entry(0), AUTO_ID));
            }
        }

        #[test]
        fn skips_explicit() {
            let mut table = CommandTable::<10>::new();

            table.insert(entry(0), 0).unwrap();
            table.insert(entry(0), 2).unwrap();

            assert_eq!(Ok(1), table.insert(entry(0), AUTO_ID));
            assert_eq!(Ok(3), table.insert(entry(0), AUTO_ID));
            assert_eq!(Ok(4), table.insert(entry(0), AUTO_ID));
        }

        #[test]
        fn full() {
            let mut table = CommandTable::<2>::new();

            table.insert(entry(0), AUTO_ID).unwrap();
            table.insert(entry(0), AUTO_ID).unwrap();

            assert_eq!(
                Err(error::RegisterError::TableFull),
                table.insert(entry(0), AUTO_ID)
            );

            // explicit overwrite still works on a full table
            assert_eq!(Ok(1), table.insert(entry(0), 1));
        }
    }

    mod explicit_id {
        use super::*;

        #[test]
        fn last_write_wins() {
            let mut table = CommandTable::<10>::new();

            table.insert(entry(3), 5).unwrap();
            table.insert(entry(7), 5).unwrap();

            assert_eq!(7, table.get(5).unwrap().args_size);
            assert_eq!(1, table.occupied());
        }

        #[test]
        fn out_of_range() {
            let mut table = CommandTable::<10>::new();

            assert_eq!(
                Err(error::RegisterError::IdOutOfRange),
                table.insert(entry(0), 10)
            );
            assert_eq!(
                Err(error::RegisterError::IdOutOfRange),
                table.insert(entry(0), 254)
            );
        }
    }

    #[test]
    fn lookup() {
        let mut table = CommandTable::<10>::new();

        assert!(table.get(4).is_none());
        // out-of-range ids are simply absent
        assert!(table.get(200).is_none());

        table.insert(entry(2), 4).unwrap();

        assert_eq!(2, table.get(4).unwrap().args_size);
    }
}
