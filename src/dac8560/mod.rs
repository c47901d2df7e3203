// Licensed under the Apache-2.0 license

//! DAC8560 16-bit voltage output DAC on SPI.
//!
//! One update is a 24-bit frame, MSB first: a control byte carrying the
//! power-down mode in bits 1:0, then the 16-bit code big-endian. Two drivers
//! are provided. [`Dac8560`] sends the frame synchronously through an
//! `embedded-hal` [`SpiDevice`]. [`InterruptDac8560`] starts the frame and
//! feeds the remaining bytes from the SPI transfer-complete interrupt.

#[cfg(feature = "hardware-atmega328p")]
pub mod hardware_atmega328p;

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{Immutable, IntoBytes};

/// Output state selected by the PD1:PD0 control bits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PowerMode {
    #[default]
    Normal,
    /// Output pulled to ground through 1 kOhm.
    PowerDown1k,
    /// Output pulled to ground through 100 kOhm.
    PowerDown100k,
    /// Output floating.
    HighImpedance,
}

impl PowerMode {
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            PowerMode::Normal => 0b00,
            PowerMode::PowerDown1k => 0b01,
            PowerMode::PowerDown100k => 0b10,
            PowerMode::HighImpedance => 0b11,
        }
    }
}

/// One DAC update as it appears on the wire.
#[derive(IntoBytes, Immutable, Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
pub struct Frame {
    pub control: u8,
    pub code: U16,
}

impl Frame {
    #[must_use]
    pub fn new(mode: PowerMode, code: u16) -> Self {
        Self {
            control: mode.bits(),
            code: U16::new(code),
        }
    }
}

/// Blocking driver. The whole frame goes out inside one chip-select window.
pub struct Dac8560<SPI> {
    spi: SPI,
    mode: PowerMode,
    code: u16,
}

impl<SPI: SpiDevice> Dac8560<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            mode: PowerMode::Normal,
            code: 0,
        }
    }

    /// Load `code` into the DAC register.
    ///
    /// # Errors
    ///
    /// Propagates the SPI device error.
    pub fn write(&mut self, code: u16) -> Result<(), SPI::Error> {
        self.spi.write(Frame::new(self.mode, code).as_bytes())?;
        self.code = code;
        Ok(())
    }

    /// Switch the output stage, keeping the last code.
    ///
    /// # Errors
    ///
    /// Propagates the SPI device error.
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), SPI::Error> {
        self.spi.write(Frame::new(mode, self.code).as_bytes())?;
        self.mode = mode;
        Ok(())
    }

    /// A blocking write has always finished by the time it returns.
    #[must_use]
    pub fn busy(&self) -> bool {
        false
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

/// Byte-at-a-time SPI master whose completion raises an interrupt.
pub trait SpiTransferHardware {
    /// Configure master mode 1, MSB first, with the transfer-complete
    /// interrupt enabled.
    fn enable(&mut self);

    fn disable(&mut self);

    /// Shift one byte out. Completion is signalled by the interrupt.
    fn start_transfer(&mut self, byte: u8);
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ChipSelectPolarity {
    #[default]
    ActiveLow,
    /// Boards that drive SYNC through an inverter.
    ActiveHigh,
}

/// Chip-select line driven with a fixed polarity.
pub struct ChipSelect<CS> {
    pin: CS,
    polarity: ChipSelectPolarity,
}

impl<CS: OutputPin> ChipSelect<CS> {
    /// Take the pin and leave the device deselected.
    ///
    /// # Errors
    ///
    /// Returns the pin error if the line cannot be driven.
    pub fn new(pin: CS, polarity: ChipSelectPolarity) -> Result<Self, CS::Error> {
        let mut cs = Self { pin, polarity };
        cs.deselect()?;
        Ok(cs)
    }

    /// # Errors
    ///
    /// Returns the pin error if the line cannot be driven.
    pub fn select(&mut self) -> Result<(), CS::Error> {
        match self.polarity {
            ChipSelectPolarity::ActiveLow => self.pin.set_low(),
            ChipSelectPolarity::ActiveHigh => self.pin.set_high(),
        }
    }

    /// # Errors
    ///
    /// Returns the pin error if the line cannot be driven.
    pub fn deselect(&mut self) -> Result<(), CS::Error> {
        match self.polarity {
            ChipSelectPolarity::ActiveLow => self.pin.set_high(),
            ChipSelectPolarity::ActiveHigh => self.pin.set_low(),
        }
    }

    #[must_use]
    pub fn polarity(&self) -> ChipSelectPolarity {
        self.polarity
    }

    pub fn release(self) -> CS {
        self.pin
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    Idle,
    Control,
    Msb,
    Lsb,
}

/// Interrupt-driven driver. Call [`InterruptDac8560::on_transfer_complete`]
/// from the SPI transfer-complete vector.
pub struct InterruptDac8560<H, CS> {
    spi: H,
    cs: ChipSelect<CS>,
    mode: PowerMode,
    frame: Frame,
    step: Step,
}

impl<H: SpiTransferHardware, CS: OutputPin> InterruptDac8560<H, CS> {
    /// # Errors
    ///
    /// Returns the pin error if chip select cannot be deasserted.
    pub fn new(spi: H, cs: CS, polarity: ChipSelectPolarity) -> Result<Self, CS::Error> {
        let mut dac = Self {
            spi,
            cs: ChipSelect::new(cs, polarity)?,
            mode: PowerMode::Normal,
            frame: Frame::new(PowerMode::Normal, 0),
            step: Step::Idle,
        };
        dac.spi.enable();
        Ok(dac)
    }

    fn start(&mut self, frame: Frame) -> Result<bool, CS::Error> {
        if self.busy() {
            return Ok(false);
        }
        self.cs.select()?;
        self.frame = frame;
        self.step = Step::Control;
        self.spi.start_transfer(frame.control);
        Ok(true)
    }

    /// Begin sending `code`. Returns `false` and drops the value when a frame
    /// is still in flight.
    ///
    /// # Errors
    ///
    /// Returns the pin error if chip select cannot be asserted.
    pub fn write(&mut self, code: u16) -> Result<bool, CS::Error> {
        self.start(Frame::new(self.mode, code))
    }

    /// Begin a frame switching the output stage, keeping the last code.
    /// Returns `false` when a frame is still in flight.
    ///
    /// # Errors
    ///
    /// Returns the pin error if chip select cannot be asserted.
    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<bool, CS::Error> {
        let started = self.start(Frame::new(mode, self.frame.code.get()))?;
        if started {
            self.mode = mode;
        }
        Ok(started)
    }

    /// Advance the frame by one byte. Ignored when idle.
    ///
    /// # Errors
    ///
    /// Returns the pin error if chip select cannot be released.
    pub fn on_transfer_complete(&mut self) -> Result<(), CS::Error> {
        let [msb, lsb] = self.frame.code.get().to_be_bytes();
        match self.step {
            Step::Idle => {}
            Step::Control => {
                self.step = Step::Msb;
                self.spi.start_transfer(msb);
            }
            Step::Msb => {
                self.step = Step::Lsb;
                self.spi.start_transfer(lsb);
            }
            Step::Lsb => {
                // No further interrupt follows, so the frame ends here even
                // if the line cannot be released.
                self.step = Step::Idle;
                self.cs.deselect()?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn busy(&self) -> bool {
        self.step != Step::Idle
    }

    /// Stop the SPI engine and hand back the peripherals.
    pub fn release(mut self) -> (H, CS) {
        self.spi.disable();
        (self.spi, self.cs.release())
    }
}
