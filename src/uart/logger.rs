// Licensed under the Apache-2.0 license

use embedded_hal::digital::OutputPin;

use crate::common::Logger;
use crate::uart::buffered::NoPin;
use crate::uart::shared::SharedUart;
use crate::uart::UartHardware;

/// [`Logger`] that queues `D: msg` / `E: msg` lines on a shared UART.
///
/// Lines that do not fit in the transmit queue are truncated.
pub struct UartLogger<'a, H, DE = NoPin, const TX: usize = 128, const RX: usize = 16> {
    uart: &'a SharedUart<H, DE, TX, RX>,
}

impl<'a, H, DE, const TX: usize, const RX: usize> UartLogger<'a, H, DE, TX, RX> {
    #[must_use]
    pub const fn new(uart: &'a SharedUart<H, DE, TX, RX>) -> Self {
        Self { uart }
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> UartLogger<'_, H, DE, TX, RX> {
    fn line(&self, level: &str, msg: &str) {
        self.uart.with(|uart| {
            uart.enqueue(level.as_bytes());
            let _ = uart.println(msg);
        });
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> Logger
    for UartLogger<'_, H, DE, TX, RX>
{
    fn debug(&mut self, msg: &str) {
        self.line("D: ", msg);
    }

    fn error(&mut self, msg: &str) {
        self.line("E: ", msg);
    }
}
