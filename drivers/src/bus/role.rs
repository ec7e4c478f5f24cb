//! Master and slave behaviour.

use crate::hal::ssi::BusRole;

/// Role-specific rules of a bus.
pub trait Role: Sync {
    fn kind(&self) -> BusRole;

    /// Lowest rejected baud rate.
    fn baud_ceiling(&self) -> u32;

    /// Clock prescaler and serial clock rate for `baudrate`, or `None` if
    /// the rate cannot be produced from `sysclk`.
    fn clock_divider(&self, sysclk: u32, baudrate: u32) -> Option<(u8, u8)>;

    /// Whether receiving requires this side to transmit to generate clocks.
    fn clocks_receive(&self) -> bool;
}

pub struct Master;

pub struct Slave;

/// Largest even prescaler value.
const MAX_PRESCALER: u32 = 254;

/// Largest serial clock rate divider.
const MAX_SCR: u64 = 255;

/// The unit samples a slave-mode clock with at least this many system clocks
/// per bit.
const SLAVE_OVERSAMPLING: u64 = 12;

impl Role for Master {
    fn kind(&self) -> BusRole {
        BusRole::Master
    }

    fn baud_ceiling(&self) -> u32 {
        25_000_000
    }

    // bit rate = sysclk / (prescaler * (1 + scr)); never above the request
    fn clock_divider(&self, sysclk: u32, baudrate: u32) -> Option<(u8, u8)> {
        if baudrate == 0 {
            return None;
        }
        (2..=MAX_PRESCALER).step_by(2).find_map(|prescaler| {
            let step = prescaler as u64 * baudrate as u64;
            let divider = (sysclk as u64).div_ceil(step).max(1);
            let scr = divider - 1;
            (scr <= MAX_SCR).then_some((prescaler as u8, scr as u8))
        })
    }

    fn clocks_receive(&self) -> bool {
        true
    }
}

impl Role for Slave {
    fn kind(&self) -> BusRole {
        BusRole::Slave
    }

    fn baud_ceiling(&self) -> u32 {
        6_666_666
    }

    fn clock_divider(&self, sysclk: u32, baudrate: u32) -> Option<(u8, u8)> {
        if baudrate == 0 || (sysclk as u64) < SLAVE_OVERSAMPLING * baudrate as u64 {
            return None;
        }
        Some((2, 0))
    }

    fn clocks_receive(&self) -> bool {
        false
    }
}

static MASTER: Master = Master;
static SLAVE: Slave = Slave;

impl BusRole {
    /// Behaviour for this role.
    pub fn role(self) -> &'static dyn Role {
        match self {
            BusRole::Master => &MASTER,
            BusRole::Slave => &SLAVE,
        }
    }
}
