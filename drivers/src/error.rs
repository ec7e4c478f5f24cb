use core::fmt;

/// Configuration or request field rejected with [`Error::InvalidParameter`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    Role,
    Baudrate,
    WordWidth,
    FrameFormat,
    ChipSelect,
    Dma,
    Length,
    Mode,
    Width,
    Period,
    Prescaler,
    Frequency,
    Priority,
    Channel,
}

impl Field {
    pub const fn name(self) -> &'static str {
        match self {
            Field::Role => "role",
            Field::Baudrate => "baudrate",
            Field::WordWidth => "word_width",
            Field::FrameFormat => "frame_format",
            Field::ChipSelect => "chip_select",
            Field::Dma => "dma",
            Field::Length => "length",
            Field::Mode => "mode",
            Field::Width => "width",
            Field::Period => "period",
            Field::Prescaler => "prescaler",
            Field::Frequency => "freq",
            Field::Priority => "priority",
            Field::Channel => "channel",
        }
    }
}

/// Driver errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// No compiled-in unit matches the identifier.
    NotFound,
    /// A parameter is outside its allowed domain.
    InvalidParameter(Field),
    /// The hardware did not finish within the allowed time.
    Timeout,
    /// The peripheral or DMA controller reported a non-OK status.
    HardwareFault(u32),
    /// An interrupt-context callback failed. Reported to the foreground
    /// after the fact; the interrupt itself completed normally.
    ContainedFault {
        /// Faults recorded since the last drain.
        count: u32,
        /// Code of the most recent fault.
        code: u32,
    },
    /// Another operation owns the peripheral or DMA channel.
    Busy,
    /// The bus has not been configured, or was deinitialized.
    Disabled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => f.write_str("peripheral doesn't exist"),
            Error::InvalidParameter(field) => write!(f, "invalid {}", field.name()),
            Error::Timeout => f.write_str("timed out"),
            Error::HardwareFault(status) => write!(f, "hardware fault (status {status:#x})"),
            Error::ContainedFault { count, code } => {
                write!(f, "{count} callback fault(s), last code {code:#x}")
            }
            Error::Busy => f.write_str("peripheral busy"),
            Error::Disabled => f.write_str("peripheral not enabled"),
        }
    }
}

impl core::error::Error for Error {}

/// A driver result
pub type Result<T> = core::result::Result<T, Error>;
