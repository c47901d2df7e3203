// Licensed under the Apache-2.0 license

//! Common types for the I2C (TWI) drivers.
//!
//! Configuration, error types and the protocol constants shared by the
//! interrupt-driven slave engine and the bit-banged master.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, SevenBitAddress};

/// Address reserved for general-call writes.
pub const GENERAL_CALL_ADDRESS: SevenBitAddress = 0x00;

/// Lowest assignable 7-bit slave address.
pub const MIN_SLAVE_ADDRESS: SevenBitAddress = 1;

/// Highest assignable 7-bit slave address.
pub const MAX_SLAVE_ADDRESS: SevenBitAddress = 127;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Slave address outside `1..=127`.
    InvalidAddress(u8),
}

/// Bus errors reported by the I2C master.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The target did not acknowledge its address or a data byte.
    NoAcknowledge(NoAcknowledgeSource),
    /// A GPIO line could not be driven or sampled.
    Pin,
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match *self {
            Error::NoAcknowledge(source) => ErrorKind::NoAcknowledge(source),
            Error::Pin => ErrorKind::Other,
        }
    }
}

/// Slave configuration produced by [`SlaveConfigBuilder`].
///
/// Only [`SlaveConfigBuilder::build`] creates one, so the address is always
/// in `1..=127`:
///
/// ```compile_fail
/// use micro_ddk::i2c::SlaveConfig;
/// let config = SlaveConfig { address: 0x90, general_call: true };
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlaveConfig {
    address: SevenBitAddress,
    general_call: bool,
}

impl SlaveConfig {
    #[must_use]
    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    #[must_use]
    pub fn general_call(&self) -> bool {
        self.general_call
    }

    /// Value for the TWI address register: address in bits 7:1, general-call
    /// recognition in bit 0.
    #[must_use]
    pub fn address_register(&self) -> u8 {
        (self.address << 1) | u8::from(self.general_call)
    }
}

pub struct SlaveConfigBuilder {
    address: SevenBitAddress,
    general_call: bool,
}

impl Default for SlaveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlaveConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            address: MIN_SLAVE_ADDRESS,
            general_call: true,
        }
    }
    #[must_use]
    pub fn address(mut self, address: SevenBitAddress) -> Self {
        self.address = address;
        self
    }
    #[must_use]
    pub fn general_call(mut self, enabled: bool) -> Self {
        self.general_call = enabled;
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidAddress`] when the address is the
    /// general-call address or does not fit in seven bits.
    pub fn build(self) -> Result<SlaveConfig, ConfigurationError> {
        if !(MIN_SLAVE_ADDRESS..=MAX_SLAVE_ADDRESS).contains(&self.address) {
            return Err(ConfigurationError::InvalidAddress(self.address));
        }
        Ok(SlaveConfig {
            address: self.address,
            general_call: self.general_call,
        })
    }
}
