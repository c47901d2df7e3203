// Licensed under the Apache-2.0 license

//! TWI slave backend for the ATmega328P two-wire interface.

use crate::i2c::common::SlaveConfig;
use crate::i2c::traits::{Response, TwiSlaveHardware};

/// The address of the 2-wire bit rate register
pub const TWBR: *mut u8 = 0x00B8 as *mut u8;

/// The address of the 2-wire status register
pub const TWSR: *mut u8 = 0x00B9 as *mut u8;

/// The address of the 2-wire (slave) address register
pub const TWAR: *mut u8 = 0x00BA as *mut u8;

/// The address of the 2-wire data register
pub const TWDR: *mut u8 = 0x00BB as *mut u8;

/// The address of the 2-wire control register
pub const TWCR: *mut u8 = 0x00BC as *mut u8;

/// The address of the 2-wire slave address mask register
pub const TWAMR: *mut u8 = 0x00BD as *mut u8;

/// The mask for setting the TWCR interrupt bit
pub const TWINT: u8 = 0x80;

/// The mask for setting the TWCR enable acknowledge bit
pub const TWEA: u8 = 0x40;

/// The mask for setting the TWCR stop condition bit
pub const TWSTO: u8 = 0x10;

/// The mask for setting the TWCR enable bit
pub const TWEN: u8 = 0x04;

/// The mask for setting the TWCR interrupt enable bit
pub const TWIE: u8 = 0x01;

/// Control value that acknowledges and re-arms the slave.
pub const TWCR_ACK: u8 = TWEA | TWEN | TWIE | TWINT;

/// Represents the hardware 2-wire interface in slave mode
pub struct Atmega328pTwi {
    _private: (),
}

impl Atmega328pTwi {
    /// Creates a handle to the TWI registers.
    ///
    /// # Safety
    ///
    /// Only one handle may exist, and nothing else may drive the TWI
    /// registers while it does.
    #[must_use]
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

impl TwiSlaveHardware for Atmega328pTwi {
    fn enable(&mut self, config: &SlaveConfig) {
        unsafe {
            TWBR.write_volatile(0x00);
            TWAR.write_volatile(config.address_register());
            TWAMR.write_volatile(0x00);
            TWCR.write_volatile(TWEA | TWEN | TWIE);
        }
    }

    fn disable(&mut self) {
        unsafe {
            TWCR.write_volatile(0x00);
        }
    }

    fn status(&self) -> u8 {
        unsafe { TWSR.read_volatile() }
    }

    fn read_data(&self) -> u8 {
        unsafe { TWDR.read_volatile() }
    }

    fn respond(&mut self, response: Response) {
        unsafe {
            match response {
                Response::Ack => TWCR.write_volatile(TWCR_ACK),
                Response::Transmit(byte) => {
                    TWDR.write_volatile(byte);
                    TWCR.write_volatile(TWCR_ACK);
                }
                Response::AckAndRecover => TWCR.write_volatile(TWCR_ACK | TWSTO),
            }
        }
    }
}
