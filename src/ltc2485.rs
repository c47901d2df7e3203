// Licensed under the Apache-2.0 license

//! LTC2485 24-bit delta-sigma ADC on an I2C bus.
//!
//! Every read returns the previous conversion and starts the next one, so the
//! driver performs a throwaway read when it is created. A conversion takes
//! roughly half a millisecond at the slow rate.

use embedded_hal::i2c::{I2c, SevenBitAddress};
use zerocopy::byteorder::big_endian::U32;

/// Bus address with CA0/CA1/CA2 strapped for this board.
pub const LTC2485_ADDRESS: SevenBitAddress = 0x24;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Input {
    /// Differential input pins.
    #[default]
    Differential,
    /// Internal PTAT temperature sensor.
    Ptat,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Rejection {
    Hz50,
    /// Simultaneous 50/60 Hz.
    #[default]
    Hz55,
    Hz60,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Speed {
    /// 1x output rate, autozero on.
    #[default]
    Slow,
    /// 2x output rate, autozero off.
    Fast,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ltc2485Config {
    pub input: Input,
    pub rejection: Rejection,
    pub speed: Speed,
}

impl Ltc2485Config {
    #[must_use]
    pub fn input(mut self, input: Input) -> Self {
        self.input = input;
        self
    }

    #[must_use]
    pub fn rejection(mut self, rejection: Rejection) -> Self {
        self.rejection = rejection;
        self
    }

    #[must_use]
    pub fn speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }

    /// Configuration register value.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        let input = match self.input {
            Input::Differential => 0x00,
            Input::Ptat => 0x08,
        };
        let rejection = match self.rejection {
            Rejection::Hz50 => 0x02,
            Rejection::Hz55 => 0x00,
            Rejection::Hz60 => 0x04,
        };
        let speed = match self.speed {
            Speed::Slow => 0x00,
            Speed::Fast => 0x01,
        };
        input | rejection | speed
    }
}

pub struct Ltc2485<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Ltc2485<I2C> {
    /// Take the bus and start the first conversion.
    ///
    /// A missing converter does not fail construction; the first read result
    /// is discarded either way.
    pub fn new(i2c: I2C) -> Self {
        let mut adc = Self { i2c };
        let _ = adc.read();
        adc
    }

    /// Write the configuration register. Applies from the next conversion.
    ///
    /// # Errors
    ///
    /// Propagates the bus error, e.g. no acknowledge when the part is absent.
    pub fn set_config(&mut self, config: Ltc2485Config) -> Result<(), I2C::Error> {
        self.i2c.write(LTC2485_ADDRESS, &[config.to_byte()])
    }

    /// Read the last conversion word and start a new conversion.
    ///
    /// # Errors
    ///
    /// Propagates the bus error.
    pub fn read(&mut self) -> Result<u32, I2C::Error> {
        let mut word = [0u8; 4];
        self.i2c.read(LTC2485_ADDRESS, &mut word)?;
        Ok(U32::from_bytes(word).get())
    }

    /// [`Ltc2485::read`], with any bus error reported as a zero reading.
    pub fn read_or_zero(&mut self) -> u32 {
        self.read().unwrap_or(0)
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}
