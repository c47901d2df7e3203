// Licensed under the Apache-2.0 license

//! Bit-banged I2C master over two open-drain GPIO lines.
//!
//! Driving a line high releases it; the pull-up does the rest. SDA is sampled
//! through the same pin, so it must be both an [`OutputPin`] and an
//! [`InputPin`]. Timing comes from a [`DelayNs`] and the configured bus
//! frequency.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::{NoAcknowledgeSource, Operation, SevenBitAddress};
use fugit::HertzU32;

use crate::i2c::common::Error;

/// Bus timing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BitBangConfig {
    pub frequency: HertzU32,
}

impl Default for BitBangConfig {
    fn default() -> Self {
        Self {
            frequency: HertzU32::kHz(100),
        }
    }
}

impl BitBangConfig {
    /// Half an SCL period in nanoseconds.
    #[must_use]
    pub fn half_period_ns(&self) -> u32 {
        match self.frequency.to_Hz() {
            0 => 0,
            hz => 500_000_000 / hz,
        }
    }
}

pub struct BitBangI2c<SCL, SDA, D> {
    scl: SCL,
    sda: SDA,
    delay: D,
    half_period_ns: u32,
}

impl<SCL, SDA, D> BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
{
    /// Take the lines and release both so the bus idles high.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pin`] when a line cannot be driven.
    pub fn new(scl: SCL, sda: SDA, delay: D, config: BitBangConfig) -> Result<Self, Error> {
        let mut bus = Self {
            scl,
            sda,
            delay,
            half_period_ns: config.half_period_ns(),
        };
        bus.init()?;
        Ok(bus)
    }

    /// Release both lines. Also usable to idle the bus after a fault.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Pin`] when a line cannot be driven.
    pub fn init(&mut self) -> Result<(), Error> {
        self.set_sda(true)?;
        self.set_scl(true)
    }

    /// Give the pins and delay back.
    pub fn free(self) -> (SCL, SDA, D) {
        (self.scl, self.sda, self.delay)
    }

    fn wait(&mut self) {
        if self.half_period_ns > 0 {
            self.delay.delay_ns(self.half_period_ns);
        }
    }

    fn set_scl(&mut self, high: bool) -> Result<(), Error> {
        if high {
            self.scl.set_high().map_err(|_| Error::Pin)
        } else {
            self.scl.set_low().map_err(|_| Error::Pin)
        }
    }

    fn set_sda(&mut self, high: bool) -> Result<(), Error> {
        if high {
            self.sda.set_high().map_err(|_| Error::Pin)
        } else {
            self.sda.set_low().map_err(|_| Error::Pin)
        }
    }

    fn sda_is_high(&mut self) -> Result<bool, Error> {
        self.sda.is_high().map_err(|_| Error::Pin)
    }

    /// START, or repeated START when the bus is already ours.
    fn start(&mut self) -> Result<(), Error> {
        self.set_sda(true)?;
        self.set_scl(true)?;
        self.wait();
        self.set_sda(false)?;
        self.wait();
        self.set_scl(false)?;
        self.wait();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Error> {
        self.set_sda(false)?;
        self.wait();
        self.set_scl(true)?;
        self.wait();
        self.set_sda(true)?;
        self.wait();
        Ok(())
    }

    /// Clock out one byte MSB first. Returns whether the target acknowledged.
    fn write_byte(&mut self, byte: u8) -> Result<bool, Error> {
        for bit in (0..8).rev() {
            self.set_sda(byte & (1 << bit) != 0)?;
            self.wait();
            self.set_scl(true)?;
            self.wait();
            self.set_scl(false)?;
        }
        self.set_sda(true)?;
        self.wait();
        self.set_scl(true)?;
        self.wait();
        let acked = !self.sda_is_high()?;
        self.set_scl(false)?;
        self.wait();
        Ok(acked)
    }

    /// Clock in one byte, then ACK (`ack == true`) or NACK it.
    fn read_byte(&mut self, ack: bool) -> Result<u8, Error> {
        let mut byte = 0u8;
        self.set_sda(true)?;
        for _ in 0..8 {
            self.wait();
            self.set_scl(true)?;
            self.wait();
            byte = (byte << 1) | u8::from(self.sda_is_high()?);
            self.set_scl(false)?;
        }
        self.set_sda(!ack)?;
        self.wait();
        self.set_scl(true)?;
        self.wait();
        self.set_scl(false)?;
        self.set_sda(true)?;
        self.wait();
        Ok(byte)
    }

    fn address(&mut self, address: SevenBitAddress, read: bool) -> Result<(), Error> {
        let header = (address << 1) | u8::from(read);
        if self.write_byte(header)? {
            Ok(())
        } else {
            Err(Error::NoAcknowledge(NoAcknowledgeSource::Address))
        }
    }

    fn run(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error> {
        // Direction of the previous operation; `None` before the first START.
        let mut previous_read: Option<bool> = None;
        let mut operations = operations.iter_mut().peekable();

        while let Some(operation) = operations.next() {
            let next_is_read = matches!(operations.peek(), Some(Operation::Read(_)));
            match operation {
                Operation::Write(bytes) => {
                    if previous_read != Some(false) {
                        self.start()?;
                        self.address(address, false)?;
                    }
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte)? {
                            return Err(Error::NoAcknowledge(NoAcknowledgeSource::Data));
                        }
                    }
                    previous_read = Some(false);
                }
                Operation::Read(buffer) => {
                    if previous_read != Some(true) {
                        self.start()?;
                        self.address(address, true)?;
                    }
                    let len = buffer.len();
                    for (i, slot) in buffer.iter_mut().enumerate() {
                        // NACK only the byte that precedes a STOP or repeated START.
                        *slot = self.read_byte(i + 1 < len || next_is_read)?;
                    }
                    previous_read = Some(true);
                }
            }
        }
        Ok(())
    }
}

impl<SCL, SDA, D> embedded_hal::i2c::ErrorType for BitBangI2c<SCL, SDA, D> {
    type Error = Error;
}

impl<SCL, SDA, D> embedded_hal::i2c::I2c for BitBangI2c<SCL, SDA, D>
where
    SCL: OutputPin,
    SDA: OutputPin + InputPin,
    D: DelayNs,
{
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let result = self.run(address, operations);
        let stopped = self.stop();
        result.and(stopped)
    }
}
