// Licensed under the Apache-2.0 license

//! Static home for the slave engine.
//!
//! The engine is owned by the TWI interrupt. Thread-mode code reaches it only
//! through [`SharedTwiSlave::with`], which runs inside a critical section so
//! the interrupt cannot observe a half-updated engine.
//!
//! ```rust,ignore
//! static TWI_SLAVE: SharedTwiSlave<Atmega328pTwi> = SharedTwiSlave::new();
//!
//! fn main() -> ! {
//!     let config = SlaveConfigBuilder::new().address(0x20).build()?;
//!     let hooks = RegisterHooks::new().with_read(read_reg).with_write(write_reg);
//!     TWI_SLAVE.install(TwiSlave::new(unsafe { Atmega328pTwi::steal() }, &config, hooks));
//!     // enable interrupts ...
//! }
//!
//! // TWI vector
//! fn twi() {
//!     TWI_SLAVE.service();
//! }
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::common::{Logger, NoOpLogger};
use crate::i2c::event::BusEvent;
use crate::i2c::slave::TwiSlave;
use crate::i2c::traits::TwiSlaveHardware;

pub struct SharedTwiSlave<H: TwiSlaveHardware, L: Logger = NoOpLogger> {
    inner: Mutex<RefCell<Option<TwiSlave<H, L>>>>,
}

impl<H: TwiSlaveHardware, L: Logger> Default for SharedTwiSlave<H, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: TwiSlaveHardware, L: Logger> SharedTwiSlave<H, L> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Hand an initialized engine to the interrupt. Returns the engine it
    /// replaces, if any.
    pub fn install(&self, slave: TwiSlave<H, L>) -> Option<TwiSlave<H, L>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(slave))
    }

    /// Interrupt entry point. Returns `None` when no engine is installed.
    pub fn service(&self) -> Option<BusEvent> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .as_mut()
                .map(TwiSlave::service)
        })
    }

    /// Run `f` against the engine with the interrupt held off.
    pub fn with<R>(&self, f: impl FnOnce(&mut TwiSlave<H, L>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Remove the engine without touching the hardware.
    pub fn take(&self) -> Option<TwiSlave<H, L>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Shut the slave down and return its hardware. The controller is
    /// disabled before the interrupt can run again.
    pub fn close(&self) -> Option<H> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take().map(TwiSlave::close))
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        critical_section::with(|cs| self.inner.borrow_ref(cs).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i2c::common::SlaveConfigBuilder;
    use crate::i2c::event::{STATUS_SRX_ADR_ACK, STATUS_SRX_ADR_DATA_ACK, STATUS_SRX_STOP_RESTART};
    use crate::i2c::registers::RegisterHooks;
    use crate::i2c::slave::tests::{write_hook, writes, MockTwi};
    use crate::i2c::slave::DispatchState;

    fn feed(shared: &SharedTwiSlave<MockTwi>, status: u8, data: u8) -> Option<BusEvent> {
        shared.with(|slave| {
            let hardware = slave.hardware_mut();
            hardware.status = status;
            hardware.data = data;
        });
        shared.service()
    }

    #[test]
    fn test_service_without_engine() {
        let shared: SharedTwiSlave<MockTwi> = SharedTwiSlave::new();
        assert!(!shared.is_installed());
        assert_eq!(shared.service(), None);
        assert!(shared.close().is_none());
    }

    #[test]
    fn test_install_service_close() {
        let shared: SharedTwiSlave<MockTwi> = SharedTwiSlave::new();
        let config = SlaveConfigBuilder::new().address(0x20).build().unwrap();
        let hooks = RegisterHooks::new().with_write(write_hook);
        assert!(shared
            .install(TwiSlave::new(MockTwi::default(), &config, hooks))
            .is_none());

        feed(&shared, STATUS_SRX_ADR_ACK, 0);
        feed(&shared, STATUS_SRX_ADR_DATA_ACK, 0x05);
        feed(&shared, STATUS_SRX_ADR_DATA_ACK, 0xAA);
        assert_eq!(
            feed(&shared, STATUS_SRX_STOP_RESTART, 0),
            Some(BusEvent::StopOrRestart)
        );
        assert_eq!(writes(), vec![(0x05, 0xAA)]);
        assert_eq!(shared.with(|slave| slave.state()), Some(DispatchState::Idle));

        let hardware = shared.close().unwrap();
        assert!(hardware.disabled);
        assert_eq!(hardware.responses.len(), 4);
        assert!(!shared.is_installed());
    }
}
