// Licensed under the Apache-2.0 license

use core::convert::Infallible;
use core::fmt;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use heapless::Deque;

use crate::uart::{Error, UartConfig, UartHardware};

/// Called from the receive interrupt for every received byte.
pub type ReceiveHook = fn(u8);

/// Placeholder driver-enable pin for point-to-point links.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoPin;

impl PinErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

pub struct BufferedUart<H, DE = NoPin, const TX: usize = 128, const RX: usize = 16> {
    hardware: H,
    driver_enable: Option<DE>,
    tx: Deque<u8, TX>,
    rx: Deque<u8, RX>,
    receive_hook: Option<ReceiveHook>,
    overruns: usize,
}

impl<H: UartHardware, const TX: usize, const RX: usize> BufferedUart<H, NoPin, TX, RX> {
    /// Program and enable the USART.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBaudRate`] if the configuration has no valid divisor.
    pub fn new(hardware: H, config: &UartConfig) -> Result<Self, Error> {
        Self::setup(hardware, config, None)
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> BufferedUart<H, DE, TX, RX> {
    /// Like [`BufferedUart::new`], with an RS-485 transceiver whose driver is
    /// enabled while bytes are on the line.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBaudRate`] if the configuration has no valid divisor,
    /// [`Error::Pin`] if the driver cannot be disabled.
    pub fn with_rs485(hardware: H, config: &UartConfig, mut driver_enable: DE) -> Result<Self, Error> {
        driver_enable.set_low().map_err(|_| Error::Pin)?;
        Self::setup(hardware, config, Some(driver_enable))
    }

    fn setup(mut hardware: H, config: &UartConfig, driver_enable: Option<DE>) -> Result<Self, Error> {
        let divisor = config.divisor()?;
        hardware.enable(divisor, driver_enable.is_some());
        Ok(Self {
            hardware,
            driver_enable,
            tx: Deque::new(),
            rx: Deque::new(),
            receive_hook: None,
            overruns: 0,
        })
    }

    /// Route received bytes to `hook` instead of the receive queue.
    pub fn set_receive_hook(&mut self, hook: Option<ReceiveHook>) {
        self.receive_hook = hook;
    }

    /// Disable the USART and its interrupts. Queued bytes are discarded.
    pub fn close(mut self) -> (H, Option<DE>) {
        self.hardware.disable();
        (self.hardware, self.driver_enable)
    }

    /// Queue one byte.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while the transmit queue is full.
    pub fn write_byte(&mut self, byte: u8) -> nb::Result<(), Error> {
        self.tx.push_back(byte).map_err(|_| nb::Error::WouldBlock)?;
        self.hardware.set_data_register_empty_interrupt(true);
        Ok(())
    }

    /// Queue as much of `bytes` as fits. Returns the number queued.
    pub fn enqueue(&mut self, bytes: &[u8]) -> usize {
        let mut queued = 0;
        for &byte in bytes {
            if self.tx.push_back(byte).is_err() {
                break;
            }
            queued += 1;
        }
        if queued > 0 {
            self.hardware.set_data_register_empty_interrupt(true);
        }
        queued
    }

    /// The low `digits` nibbles of `x`, most significant first.
    fn send_hex(&mut self, x: u32, digits: u32) -> Result<(), Error> {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let mut text: heapless::Vec<u8, 8> = heapless::Vec::new();
        for shift in (0..digits.min(8)).rev().map(|digit| 4 * digit) {
            let nibble = (x >> shift) & 0x0F;
            let _ = text.push(HEX.get(nibble as usize).copied().unwrap_or(b'0'));
        }
        self.send_all(&text)
    }

    fn send_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if self.enqueue(bytes) == bytes.len() {
            Ok(())
        } else {
            Err(Error::TransmitBufferFull)
        }
    }

    /// Take one received byte.
    ///
    /// # Errors
    ///
    /// `WouldBlock` while the receive queue is empty.
    pub fn read_byte(&mut self) -> nb::Result<u8, Error> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }

    /// Data-register-empty interrupt: load the next byte, or stop the
    /// interrupt once the queue has drained.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if the RS-485 driver cannot be enabled.
    pub fn on_data_register_empty(&mut self) -> Result<(), Error> {
        if self.tx.is_empty() {
            self.hardware.set_data_register_empty_interrupt(false);
            return Ok(());
        }
        // The byte stays queued until the driver is on.
        if let Some(pin) = self.driver_enable.as_mut() {
            pin.set_high().map_err(|_| Error::Pin)?;
        }
        if let Some(byte) = self.tx.pop_front() {
            self.hardware.write_data(byte);
        }
        Ok(())
    }

    /// Transmit-complete interrupt: release the RS-485 driver when nothing
    /// else is queued.
    ///
    /// # Errors
    ///
    /// [`Error::Pin`] if the driver cannot be released.
    pub fn on_transmit_complete(&mut self) -> Result<(), Error> {
        if self.tx.is_empty() {
            if let Some(pin) = self.driver_enable.as_mut() {
                pin.set_low().map_err(|_| Error::Pin)?;
            }
        }
        Ok(())
    }

    /// Receive interrupt: drain every byte the USART holds.
    pub fn on_receive(&mut self) {
        while let Some(byte) = self.hardware.read_data() {
            match self.receive_hook {
                Some(hook) => hook(byte),
                None => {
                    if self.rx.push_back(byte).is_err() {
                        self.overruns = self.overruns.wrapping_add(1);
                    }
                }
            }
        }
    }

    /// Bytes dropped because the receive queue was full.
    #[must_use]
    pub fn overruns(&self) -> usize {
        self.overruns
    }

    /// Nothing left in the transmit queue. The last byte may still be
    /// shifting out.
    #[must_use]
    pub fn is_transmit_idle(&self) -> bool {
        self.tx.is_empty()
    }

    #[must_use]
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Send `\r\n`.
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn send_crlf(&mut self) -> Result<(), Error> {
        self.send_all(b"\r\n")
    }

    /// Two uppercase hex digits.
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the digits did not fit.
    pub fn send_hex08(&mut self, x: u8) -> Result<(), Error> {
        self.send_hex(u32::from(x), 2)
    }

    /// Four uppercase hex digits.
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the digits did not fit.
    pub fn send_hex16(&mut self, x: u16) -> Result<(), Error> {
        self.send_hex(u32::from(x), 4)
    }

    fn send_prefix(&mut self, prefix: &str) -> Result<(), Error> {
        self.send_all(prefix.as_bytes())?;
        self.send_all(b":")
    }

    /// `prefix:XX\r\n`
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn println_hex08(&mut self, prefix: &str, x: u8) -> Result<(), Error> {
        self.send_prefix(prefix)?;
        self.send_hex08(x)?;
        self.send_crlf()
    }

    /// `prefix:XXXX\r\n`
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn println_hex16(&mut self, prefix: &str, x: u16) -> Result<(), Error> {
        self.send_prefix(prefix)?;
        self.send_hex16(x)?;
        self.send_crlf()
    }

    /// `prefix:XXXXXXXX\r\n`
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn println_hex32(&mut self, prefix: &str, x: u32) -> Result<(), Error> {
        self.send_prefix(prefix)?;
        self.send_hex(x, 8)?;
        self.send_crlf()
    }

    /// `prefix:` and `x` in decimal, then `\r\n`.
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn println_u16(&mut self, prefix: &str, x: u16) -> Result<(), Error> {
        self.println_u32(prefix, u32::from(x))
    }

    /// `prefix:` and `x` in decimal, then `\r\n`.
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn println_u32(&mut self, prefix: &str, x: u32) -> Result<(), Error> {
        self.send_prefix(prefix)?;
        fmt::Write::write_fmt(self, format_args!("{x}")).map_err(|_| Error::TransmitBufferFull)?;
        self.send_crlf()
    }

    /// `s\r\n`
    ///
    /// # Errors
    ///
    /// [`Error::TransmitBufferFull`] if the line did not fit.
    pub fn println(&mut self, s: &str) -> Result<(), Error> {
        self.send_all(s.as_bytes())?;
        self.send_crlf()
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> fmt::Write
    for BufferedUart<H, DE, TX, RX>
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.send_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<H, DE, const TX: usize, const RX: usize> embedded_io::ErrorType for BufferedUart<H, DE, TX, RX> {
    type Error = Error;
}

/// Never waits: the queue lives behind the interrupt, so a full queue is
/// reported instead of spun on. Check [`embedded_io::WriteReady`] first.
impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> embedded_io::Write
    for BufferedUart<H, DE, TX, RX>
{
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self.enqueue(buf) {
            0 if !buf.is_empty() => Err(Error::TransmitBufferFull),
            queued => Ok(queued),
        }
    }

    /// Queued bytes belong to the interrupt once written.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> embedded_io::WriteReady
    for BufferedUart<H, DE, TX, RX>
{
    fn write_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.tx.is_full())
    }
}

/// Never waits; an empty queue is [`Error::ReceiveBufferEmpty`]. Check
/// [`embedded_io::ReadReady`] first.
impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> embedded_io::Read
    for BufferedUart<H, DE, TX, RX>
{
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_front() {
                Some(byte) => {
                    *slot = byte;
                    count += 1;
                }
                None => break,
            }
        }
        if count == 0 {
            Err(Error::ReceiveBufferEmpty)
        } else {
            Ok(count)
        }
    }
}

impl<H: UartHardware, DE: OutputPin, const TX: usize, const RX: usize> embedded_io::ReadReady
    for BufferedUart<H, DE, TX, RX>
{
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}
