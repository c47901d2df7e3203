// Licensed under the Apache-2.0 license

//! TWI status decoding.
//!
//! The controller reports every bus transition as a status code in the upper
//! five bits of TWSR. [`BusEvent::classify`] turns any status byte into exactly
//! one event from a closed set; codes the slave never expects (master-mode
//! codes, "no state", reserved values) collapse into [`BusEvent::Unhandled`].

/// Mask for the status bits of TWSR. The low two bits hold the prescaler.
pub const TWSR_STATUS_MASK: u8 = 0xF8;

// Slave transmitter
pub const STATUS_STX_ADR_ACK: u8 = 0xA8;
pub const STATUS_STX_ADR_ACK_M_ARB_LOST: u8 = 0xB0;
pub const STATUS_STX_DATA_ACK: u8 = 0xB8;
pub const STATUS_STX_DATA_NACK: u8 = 0xC0;
pub const STATUS_STX_DATA_ACK_LAST_BYTE: u8 = 0xC8;

// Slave receiver
pub const STATUS_SRX_ADR_ACK: u8 = 0x60;
pub const STATUS_SRX_ADR_ACK_M_ARB_LOST: u8 = 0x68;
pub const STATUS_SRX_GEN_ACK: u8 = 0x70;
pub const STATUS_SRX_GEN_ACK_M_ARB_LOST: u8 = 0x78;
pub const STATUS_SRX_ADR_DATA_ACK: u8 = 0x80;
pub const STATUS_SRX_ADR_DATA_NACK: u8 = 0x88;
pub const STATUS_SRX_GEN_DATA_ACK: u8 = 0x90;
pub const STATUS_SRX_GEN_DATA_NACK: u8 = 0x98;
pub const STATUS_SRX_STOP_RESTART: u8 = 0xA0;

// Miscellaneous
pub const STATUS_NO_STATE: u8 = 0xF8;
pub const STATUS_BUS_ERROR: u8 = 0x00;

/// How the current write transaction was addressed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Addressing {
    /// Own SLA+W.
    Own,
    /// General-call address.
    GeneralCall,
}

/// Slave-side bus events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// Own SLA+R received, ACK returned.
    AddrMatchRead,
    /// Own SLA+R received after losing arbitration as master.
    AddrMatchReadArbLost,
    /// Data byte transmitted, master ACKed.
    DataSentAck,
    /// Data byte transmitted, master NACKed.
    DataSentNack,
    /// Last data byte transmitted with TWEA cleared, master ACKed anyway.
    DataSentAckLastByte,
    /// Own SLA+W received, ACK returned.
    AddrMatchWrite,
    /// Own SLA+W received after losing arbitration as master.
    AddrMatchWriteArbLost,
    /// General-call address received, ACK returned.
    GenCallMatch,
    /// General-call address received after losing arbitration as master.
    GenCallMatchArbLost,
    /// Data byte received, ACK returned.
    DataRecvAck(Addressing),
    /// Data byte received, NACK returned.
    DataRecvNack(Addressing),
    /// STOP or repeated START while still addressed.
    StopOrRestart,
    /// Illegal START or STOP on the bus.
    BusError,
    /// Any status outside the slave subset. Carries the masked status.
    Unhandled(u8),
}

impl BusEvent {
    /// Classify a raw TWSR value. Prescaler bits are ignored.
    #[must_use]
    pub fn classify(twsr: u8) -> Self {
        match twsr & TWSR_STATUS_MASK {
            STATUS_STX_ADR_ACK => Self::AddrMatchRead,
            STATUS_STX_ADR_ACK_M_ARB_LOST => Self::AddrMatchReadArbLost,
            STATUS_STX_DATA_ACK => Self::DataSentAck,
            STATUS_STX_DATA_NACK => Self::DataSentNack,
            STATUS_STX_DATA_ACK_LAST_BYTE => Self::DataSentAckLastByte,
            STATUS_SRX_ADR_ACK => Self::AddrMatchWrite,
            STATUS_SRX_ADR_ACK_M_ARB_LOST => Self::AddrMatchWriteArbLost,
            STATUS_SRX_GEN_ACK => Self::GenCallMatch,
            STATUS_SRX_GEN_ACK_M_ARB_LOST => Self::GenCallMatchArbLost,
            STATUS_SRX_ADR_DATA_ACK => Self::DataRecvAck(Addressing::Own),
            STATUS_SRX_GEN_DATA_ACK => Self::DataRecvAck(Addressing::GeneralCall),
            STATUS_SRX_ADR_DATA_NACK => Self::DataRecvNack(Addressing::Own),
            STATUS_SRX_GEN_DATA_NACK => Self::DataRecvNack(Addressing::GeneralCall),
            STATUS_SRX_STOP_RESTART => Self::StopOrRestart,
            STATUS_BUS_ERROR => Self::BusError,
            other => Self::Unhandled(other),
        }
    }

    /// True for the events that start a transaction addressed to us.
    #[must_use]
    pub fn is_address_match(&self) -> bool {
        matches!(
            self,
            Self::AddrMatchRead
                | Self::AddrMatchReadArbLost
                | Self::AddrMatchWrite
                | Self::AddrMatchWriteArbLost
                | Self::GenCallMatch
                | Self::GenCallMatchArbLost
        )
    }
}

impl From<u8> for BusEvent {
    fn from(twsr: u8) -> Self {
        Self::classify(twsr)
    }
}
