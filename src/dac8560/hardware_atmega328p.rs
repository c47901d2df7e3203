// Licensed under the Apache-2.0 license

//! SPI master and port B chip select on the ATmega328P.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{ErrorType, Operation, SpiBus, SpiDevice};

use crate::dac8560::{ChipSelect, ChipSelectPolarity, SpiTransferHardware};

/// SPI control register
pub const SPCR: *mut u8 = 0x004C as *mut u8;
/// SPI status register
pub const SPSR: *mut u8 = 0x004D as *mut u8;
/// SPI data register
pub const SPDR: *mut u8 = 0x004E as *mut u8;
/// Port B data direction register
pub const DDRB: *mut u8 = 0x0024 as *mut u8;
/// Port B data register
pub const PORTB: *mut u8 = 0x0025 as *mut u8;

pub const SPIE: u8 = 1 << 7;
pub const SPE: u8 = 1 << 6;
pub const MSTR: u8 = 1 << 4;
pub const CPHA: u8 = 1 << 2;
pub const SPIF: u8 = 1 << 7;
pub const SPI2X: u8 = 1 << 0;

/// SS, MOSI and SCK.
const SPI_PINS: u8 = (1 << 2) | (1 << 3) | (1 << 5);

/// Rough spin iterations per microsecond at 16 MHz.
const SPINS_PER_US: u32 = 4;

/// The hardware SPI in master mode 1 at f_cpu / 2.
pub struct Atmega328pSpi {
    _private: (),
}

impl Atmega328pSpi {
    /// # Safety
    ///
    /// Only one handle may exist, and nothing else may drive the SPI
    /// registers or PB2/PB3/PB5 while it does.
    #[must_use]
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }

    fn configure(&mut self, interrupt: bool) {
        unsafe {
            DDRB.write_volatile(DDRB.read_volatile() | SPI_PINS);
            SPSR.write_volatile(SPI2X);
            let interrupt = if interrupt { SPIE } else { 0 };
            SPCR.write_volatile(interrupt | SPE | MSTR | CPHA);
        }
    }

    /// Configure for polled transfers.
    pub fn enable_blocking(&mut self) {
        self.configure(false);
    }

    fn exchange(&mut self, byte: u8) -> u8 {
        unsafe {
            SPDR.write_volatile(byte);
            while SPSR.read_volatile() & SPIF == 0 {}
            SPDR.read_volatile()
        }
    }
}

impl SpiTransferHardware for Atmega328pSpi {
    fn enable(&mut self) {
        self.configure(true);
    }

    fn disable(&mut self) {
        unsafe {
            SPCR.write_volatile(0x00);
        }
    }

    fn start_transfer(&mut self, byte: u8) {
        unsafe {
            SPDR.write_volatile(byte);
        }
    }
}

impl ErrorType for Atmega328pSpi {
    type Error = Infallible;
}

impl SpiBus<u8> for Atmega328pSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        for word in words.iter_mut() {
            *word = self.exchange(0x00);
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Infallible> {
        for &word in words {
            self.exchange(word);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Infallible> {
        let len = read.len().max(write.len());
        let mut read = read.iter_mut();
        let mut write = write.iter();
        for _ in 0..len {
            let received = self.exchange(write.next().copied().unwrap_or(0x00));
            if let Some(slot) = read.next() {
                *slot = received;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Infallible> {
        for word in words.iter_mut() {
            *word = self.exchange(*word);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

/// A port B output pin.
pub struct PortBPin<const BIT: u8> {
    _private: (),
}

impl<const BIT: u8> PortBPin<BIT> {
    /// Configure the pin as an output, initially high.
    ///
    /// # Safety
    ///
    /// Nothing else may drive this pin.
    #[must_use]
    pub unsafe fn steal() -> Self {
        PORTB.write_volatile(PORTB.read_volatile() | (1 << BIT));
        DDRB.write_volatile(DDRB.read_volatile() | (1 << BIT));
        Self { _private: () }
    }
}

impl<const BIT: u8> PinErrorType for PortBPin<BIT> {
    type Error = Infallible;
}

impl<const BIT: u8> OutputPin for PortBPin<BIT> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        critical_section::with(|_| unsafe {
            PORTB.write_volatile(PORTB.read_volatile() & !(1 << BIT));
        });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        critical_section::with(|_| unsafe {
            PORTB.write_volatile(PORTB.read_volatile() | (1 << BIT));
        });
        Ok(())
    }
}

/// Polled SPI bus plus a chip select of either polarity.
pub struct Atmega328pSpiDevice<CS> {
    bus: Atmega328pSpi,
    cs: ChipSelect<CS>,
}

impl<CS: OutputPin<Error = Infallible>> Atmega328pSpiDevice<CS> {
    /// # Errors
    ///
    /// Returns the pin error if chip select cannot be deasserted.
    pub fn new(
        mut bus: Atmega328pSpi,
        cs: CS,
        polarity: ChipSelectPolarity,
    ) -> Result<Self, Infallible> {
        let cs = ChipSelect::new(cs, polarity)?;
        bus.enable_blocking();
        Ok(Self { bus, cs })
    }

    pub fn release(self) -> (Atmega328pSpi, CS) {
        (self.bus, self.cs.release())
    }
}

impl<CS> ErrorType for Atmega328pSpiDevice<CS> {
    type Error = Infallible;
}

impl<CS: OutputPin<Error = Infallible>> SpiDevice for Atmega328pSpiDevice<CS> {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
        self.cs.select()?;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Read(words) => self.bus.read(words)?,
                Operation::Write(words) => self.bus.write(words)?,
                Operation::Transfer(read, write) => self.bus.transfer(read, write)?,
                Operation::TransferInPlace(words) => self.bus.transfer_in_place(words)?,
                Operation::DelayNs(ns) => {
                    for _ in 0..(*ns / 1_000 + 1) * SPINS_PER_US {
                        core::hint::spin_loop();
                    }
                }
            }
        }
        self.cs.deselect()
    }
}
