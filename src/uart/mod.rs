// Licensed under the Apache-2.0 license

//! Interrupt-driven, buffered UART.
//!
//! Thread code queues bytes; the data-register-empty interrupt moves them to
//! the USART one at a time. Received bytes are drained by the receive
//! interrupt into a hook or a small queue.

pub mod buffered;
pub mod logger;
pub mod shared;

#[cfg(feature = "hardware-atmega328p")]
pub mod hardware_atmega328p;

use embedded_io::ErrorKind;
use fugit::HertzU32;

pub use buffered::{BufferedUart, NoPin, ReceiveHook};
pub use logger::UartLogger;
pub use shared::SharedUart;

/// Largest value the 12-bit baud rate register holds.
pub const MAX_DIVISOR: u32 = 0x0FFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The baud rate cannot be reached from the peripheral clock.
    InvalidBaudRate,
    /// The transmit queue had no room for the data.
    TransmitBufferFull,
    /// Nothing has been received.
    ReceiveBufferEmpty,
    /// The RS-485 driver-enable pin could not be driven.
    Pin,
}

impl embedded_io::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidBaudRate => ErrorKind::InvalidInput,
            Error::TransmitBufferFull => ErrorKind::OutOfMemory,
            Error::ReceiveBufferEmpty | Error::Pin => ErrorKind::Other,
        }
    }
}

/// Clock and line rate, 8N1 framing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UartConfig {
    pub clock: HertzU32,
    pub baud: HertzU32,
}

impl UartConfig {
    #[must_use]
    pub fn new(clock: HertzU32) -> Self {
        Self {
            clock,
            baud: HertzU32::Hz(9_600),
        }
    }

    #[must_use]
    pub fn baud(mut self, baud: HertzU32) -> Self {
        self.baud = baud;
        self
    }

    /// Baud rate register value for normal-speed mode, `clock / (16 * baud) - 1`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBaudRate`] when the baud rate is zero, faster than
    /// `clock / 16`, or too slow for the 12-bit register.
    pub fn divisor(&self) -> Result<u16, Error> {
        let baud = self.baud.to_Hz();
        let divisor = self
            .clock
            .to_Hz()
            .checked_div(baud.checked_mul(16).ok_or(Error::InvalidBaudRate)?)
            .and_then(|ratio| ratio.checked_sub(1))
            .ok_or(Error::InvalidBaudRate)?;
        if divisor > MAX_DIVISOR {
            return Err(Error::InvalidBaudRate);
        }
        u16::try_from(divisor).map_err(|_| Error::InvalidBaudRate)
    }
}

/// The USART as seen by [`BufferedUart`].
pub trait UartHardware {
    /// Program the divisor, 8N1 framing, enable the receiver, the transmitter
    /// and the receive interrupt. `transmit_complete_interrupt` also enables
    /// the transmit-complete interrupt.
    fn enable(&mut self, divisor: u16, transmit_complete_interrupt: bool);

    /// Turn the USART and all its interrupts off.
    fn disable(&mut self);

    fn set_data_register_empty_interrupt(&mut self, enabled: bool);

    /// Load the transmit data register.
    fn write_data(&mut self, byte: u8);

    /// Next received byte, or `None` once the receive-complete flag is clear.
    fn read_data(&mut self) -> Option<u8>;
}
