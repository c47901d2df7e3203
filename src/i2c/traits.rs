// Licensed under the Apache-2.0 license

//! # TWI slave hardware abstraction
//!
//! The slave engine never touches registers directly. It reads the controller
//! status, reads or loads the data register, and hands back a [`Response`]
//! telling the controller how to continue. Everything register-specific sits
//! behind [`TwiSlaveHardware`], so the protocol logic runs unchanged against
//! the ATmega backend or a test double.

use crate::i2c::common::SlaveConfig;

/// How the controller is re-armed after an event.
///
/// Every event ends in exactly one response: the controller holds SCL low
/// until it is re-armed, so leaving an event unanswered hangs the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Clear the interrupt flag and keep acknowledging.
    Ack,
    /// Load `byte` into the data register, then acknowledge.
    Transmit(u8),
    /// Acknowledge and issue STOP, dropping the controller back to the
    /// not-addressed slave state.
    AckAndRecover,
}

/// Register-level access to a TWI controller operating as a slave.
pub trait TwiSlaveHardware {
    /// Program the own address, general-call recognition and enable the
    /// controller with its interrupt. Does not touch pull-ups.
    fn enable(&mut self, config: &SlaveConfig);

    /// Disable the controller and its interrupt.
    fn disable(&mut self);

    /// Raw status register, prescaler bits included.
    fn status(&self) -> u8;

    /// Last byte shifted in from the bus.
    fn read_data(&self) -> u8;

    /// Apply `response`, which also releases the clock line.
    fn respond(&mut self, response: Response);
}
