// Licensed under the Apache-2.0 license

//! Static home for a [`BufferedUart`] shared between thread code and the
//! USART interrupt vectors.

use core::cell::RefCell;

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

use crate::uart::buffered::{BufferedUart, NoPin};
use crate::uart::{Error, UartHardware};

pub struct SharedUart<H, DE = NoPin, const TX: usize = 128, const RX: usize = 16> {
    inner: Mutex<RefCell<Option<BufferedUart<H, DE, TX, RX>>>>,
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> Default
    for SharedUart<H, DE, TX, RX>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> SharedUart<H, DE, TX, RX> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn install(&self, uart: BufferedUart<H, DE, TX, RX>) -> Option<BufferedUart<H, DE, TX, RX>> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).replace(uart))
    }

    /// Run `f` against the UART with its interrupts held off. `None` when
    /// nothing is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut BufferedUart<H, DE, TX, RX>) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }

    /// Data-register-empty vector.
    ///
    /// # Errors
    ///
    /// Propagates [`BufferedUart::on_data_register_empty`].
    pub fn on_data_register_empty(&self) -> Result<(), Error> {
        self.with(BufferedUart::on_data_register_empty)
            .unwrap_or(Ok(()))
    }

    /// Transmit-complete vector.
    ///
    /// # Errors
    ///
    /// Propagates [`BufferedUart::on_transmit_complete`].
    pub fn on_transmit_complete(&self) -> Result<(), Error> {
        self.with(BufferedUart::on_transmit_complete)
            .unwrap_or(Ok(()))
    }

    /// Receive-complete vector.
    pub fn on_receive(&self) {
        self.with(BufferedUart::on_receive);
    }

    /// Disable the USART and hand back its parts.
    pub fn close(&self) -> Option<(H, Option<DE>)> {
        critical_section::with(|cs| {
            self.inner
                .borrow_ref_mut(cs)
                .take()
                .map(BufferedUart::close)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uart::buffered::tests::{config, MockUsart};

    #[test]
    fn test_vectors_without_uart() {
        let shared: SharedUart<MockUsart> = SharedUart::new();
        assert_eq!(shared.on_data_register_empty(), Ok(()));
        assert_eq!(shared.on_transmit_complete(), Ok(()));
        shared.on_receive();
        assert!(shared.close().is_none());
    }

    #[test]
    fn test_thread_and_interrupt_paths() {
        let shared: SharedUart<MockUsart> = SharedUart::new();
        shared.install(BufferedUart::new(MockUsart::default(), &config()).unwrap());

        shared.with(|uart| uart.println("hi")).unwrap().unwrap();
        while shared.with(|uart| uart.hardware().udre_irq) == Some(true) {
            shared.on_data_register_empty().unwrap();
        }

        shared.with(|uart| uart.hardware_mut().incoming.push_back(b'x'));
        shared.on_receive();
        assert_eq!(shared.with(|uart| uart.read_byte()), Some(Ok(b'x')));

        let (hardware, _) = shared.close().unwrap();
        assert_eq!(hardware.line, b"hi\r\n");
        assert!(!hardware.enabled);
    }
}
