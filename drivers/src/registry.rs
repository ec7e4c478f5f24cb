//! Fixed-size instance tables.
//!
//! Each physical unit is backed by at most one record, created the first
//! time it is referenced and never destroyed. Lookups hand out shared
//! references into the table; nobody owns an instance but the table.

use spin::Once;

use crate::error::{Error, Result};

/// How a caller names a unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Id<'a> {
    /// 0-based unit number.
    Unit(usize),
    /// Board alias, e.g. `"X"`.
    Alias(&'a str),
}

impl From<usize> for Id<'_> {
    fn from(unit: usize) -> Self {
        Id::Unit(unit)
    }
}

impl<'a> From<&'a str> for Id<'a> {
    fn from(alias: &'a str) -> Self {
        Id::Alias(alias)
    }
}

impl Id<'_> {
    /// Map to a unit number, looking aliases up with `alias`.
    pub fn unit(self, alias: impl FnOnce(&str) -> Option<usize>) -> Result<usize> {
        match self {
            Id::Unit(unit) => Ok(unit),
            Id::Alias(name) => alias(name).ok_or(Error::NotFound),
        }
    }
}

/// Arena of lazily created records indexed by unit number.
pub struct Registry<T, const N: usize> {
    slots: [Once<T>; N],
}

impl<T, const N: usize> Registry<T, N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { Once::new() }; N],
        }
    }

    /// Return the record for `unit`, creating it on first use.
    ///
    /// `create` returns `None` when the board has no such unit; the slot
    /// stays empty and the call fails with [`Error::NotFound`].
    pub fn resolve(&self, unit: usize, create: impl FnOnce() -> Option<T>) -> Result<&T> {
        let slot = self.slots.get(unit).ok_or(Error::NotFound)?;
        slot.try_call_once(|| create().ok_or(Error::NotFound))
    }

    /// Already created record, without creating it. Usable from interrupts.
    pub fn get(&self, unit: usize) -> Option<&T> {
        self.slots.get(unit)?.get()
    }

    /// Records created so far.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Once::get)
    }
}

impl<T, const N: usize> Default for Registry<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
