// Licensed under the Apache-2.0 license

//! I2C (TWI) drivers.
//!
//! The interrupt-driven slave register interface, its building blocks, and a
//! bit-banged master used to talk to peripherals on plain GPIO lines.

pub mod bitbang;
pub mod buffer;
pub mod common;
pub mod event;
pub mod registers;
pub mod shared;
pub mod slave;
pub mod traits;

#[cfg(feature = "hardware-atmega328p")]
pub mod hardware_atmega328p;

pub use bitbang::{BitBangConfig, BitBangI2c};
pub use common::{ConfigurationError, Error, SlaveConfig, SlaveConfigBuilder};
pub use event::{Addressing, BusEvent};
pub use registers::{ReadRegister, RegisterHooks, WriteRegister};
pub use shared::SharedTwiSlave;
pub use slave::{DispatchState, TwiSlave};
pub use traits::{Response, TwiSlaveHardware};
