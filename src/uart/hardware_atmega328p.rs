// Licensed under the Apache-2.0 license

//! USART0 backend for the ATmega328P.

use crate::uart::UartHardware;

/// USART0 control and status register A
pub const UCSR0A: *mut u8 = 0x00C0 as *mut u8;
/// USART0 control and status register B
pub const UCSR0B: *mut u8 = 0x00C1 as *mut u8;
/// USART0 control and status register C
pub const UCSR0C: *mut u8 = 0x00C2 as *mut u8;
/// USART0 baud rate register, low byte
pub const UBRR0L: *mut u8 = 0x00C4 as *mut u8;
/// USART0 baud rate register, high byte
pub const UBRR0H: *mut u8 = 0x00C5 as *mut u8;
/// USART0 data register
pub const UDR0: *mut u8 = 0x00C6 as *mut u8;

pub const RXC0: u8 = 1 << 7;

pub const RXCIE0: u8 = 1 << 7;
pub const TXCIE0: u8 = 1 << 6;
pub const UDRIE0: u8 = 1 << 5;
pub const RXEN0: u8 = 1 << 4;
pub const TXEN0: u8 = 1 << 3;

pub const UCSZ01: u8 = 1 << 2;
pub const UCSZ00: u8 = 1 << 1;

pub struct Atmega328pUsart {
    _private: (),
}

impl Atmega328pUsart {
    /// # Safety
    ///
    /// Only one handle may exist, and nothing else may drive USART0 while
    /// it does.
    #[must_use]
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }
}

impl UartHardware for Atmega328pUsart {
    fn enable(&mut self, divisor: u16, transmit_complete_interrupt: bool) {
        let [high, low] = divisor.to_be_bytes();
        let mut control = RXEN0 | RXCIE0 | TXEN0;
        if transmit_complete_interrupt {
            control |= TXCIE0;
        }
        unsafe {
            UBRR0H.write_volatile(high);
            UBRR0L.write_volatile(low);
            UCSR0A.write_volatile(0x00);
            UCSR0B.write_volatile(control);
            UCSR0C.write_volatile(UCSZ01 | UCSZ00);
        }
    }

    fn disable(&mut self) {
        unsafe {
            UCSR0B.write_volatile(0x00);
        }
    }

    fn set_data_register_empty_interrupt(&mut self, enabled: bool) {
        unsafe {
            let control = UCSR0B.read_volatile();
            if enabled {
                UCSR0B.write_volatile(control | UDRIE0);
            } else {
                UCSR0B.write_volatile(control & !UDRIE0);
            }
        }
    }

    fn write_data(&mut self, byte: u8) {
        unsafe {
            UDR0.write_volatile(byte);
        }
    }

    fn read_data(&mut self) -> Option<u8> {
        unsafe {
            if UCSR0A.read_volatile() & RXC0 != 0 {
                Some(UDR0.read_volatile())
            } else {
                None
            }
        }
    }
}
