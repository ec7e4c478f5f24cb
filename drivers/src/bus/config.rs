//! Bus parameter validation.
//!
//! [`validate`] runs before any register is touched, so a rejected
//! configuration leaves the unit exactly as it was.

use log::debug;

use crate::error::{Error, Field, Result};
use crate::hal::ssi::{BusConfig, ChipSelect, FrameFormat, FrameSetup, PinSetup};

pub const MIN_WORD_WIDTH: u8 = 4;
pub const MAX_WORD_WIDTH: u8 = 15;

/// A configuration that passed validation, with its register values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Validated {
    /// The configuration as it will be applied.
    pub config: BusConfig,
    pub frame: FrameSetup,
    pub pins: PinSetup,
}

/// Partial reconfiguration of a running bus. `None` keeps the current value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct BusUpdate {
    pub baudrate: Option<u32>,
    pub word_width: Option<u8>,
    pub frame_format: Option<FrameFormat>,
}

impl BusUpdate {
    pub fn merge(&self, current: &BusConfig) -> BusConfig {
        BusConfig {
            baudrate: self.baudrate.unwrap_or(current.baudrate),
            word_width: self.word_width.unwrap_or(current.word_width),
            frame_format: self.frame_format.unwrap_or(current.frame_format),
            ..*current
        }
    }
}

/// Check `config` against the unit's limits and compute register values.
pub fn validate(config: &BusConfig, sysclk: u32) -> Result<Validated> {
    if !(MIN_WORD_WIDTH..=MAX_WORD_WIDTH).contains(&config.word_width) {
        return Err(Error::InvalidParameter(Field::WordWidth));
    }

    let role = config.role.role();
    if config.baudrate == 0 || config.baudrate >= role.baud_ceiling() {
        return Err(Error::InvalidParameter(Field::Baudrate));
    }
    let (prescaler, scr) = role
        .clock_divider(sysclk, config.baudrate)
        .ok_or(Error::InvalidParameter(Field::Baudrate))?;

    let mut config = *config;
    if !config.frame_format.is_spi() && config.chip_select == ChipSelect::Software {
        debug!(
            "{:?} frames need hardware chip select, overriding",
            config.frame_format
        );
        config.chip_select = ChipSelect::Hardware;
    }

    Ok(Validated {
        config,
        frame: FrameSetup {
            role: config.role,
            word_width: config.word_width,
            format: config.frame_format,
            prescaler,
            scr,
        },
        pins: PinSetup {
            clock_pull_up: config.frame_format.clock_idles_high(),
            hardware_fss: config.chip_select == ChipSelect::Hardware,
        },
    })
}
