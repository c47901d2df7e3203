// Licensed under the Apache-2.0 license

//! Interrupt-driven TWI slave register interface.
//!
//! For a bus master the device looks like 256 byte-wide registers:
//!
//! * register write: `S, ADDR+W, INDEX, VALUE, P`
//! * register read: `S, ADDR+W, INDEX, P` (or `Sr`), then `S, ADDR+R, <value>, NACK, P`
//!
//! General-call writes are accepted like addressed writes. Register contents
//! come from the [`RegisterHooks`] bound at initialization.
//!
//! [`TwiSlave::service`] is the whole interrupt handler: classify the status,
//! run the dispatcher, re-arm the controller. It never blocks and every path
//! ends in exactly one [`Response`].

use crate::common::{Logger, NoOpLogger};
use crate::i2c::buffer::ReceptionBuffer;
use crate::i2c::common::SlaveConfig;
use crate::i2c::event::{Addressing, BusEvent};
use crate::i2c::registers::RegisterHooks;
use crate::i2c::traits::{Response, TwiSlaveHardware};

/// Dispatcher state between two bus events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Receiving(Addressing),
    TransmittingFirstByte,
    TransmittingSubsequentBytes,
}

pub struct TwiSlave<H: TwiSlaveHardware, L: Logger = NoOpLogger> {
    hardware: H,
    hooks: RegisterHooks,
    rx: ReceptionBuffer,
    /// Value returned to the master on the next read, staged by the read hook.
    tx: u8,
    state: DispatchState,
    logger: L,
}

impl<H: TwiSlaveHardware> TwiSlave<H, NoOpLogger> {
    /// Bring up the controller as a slave without logging.
    pub fn new(hardware: H, config: &SlaveConfig, hooks: RegisterHooks) -> Self {
        Self::with_logger(hardware, config, hooks, NoOpLogger)
    }
}

impl<H: TwiSlaveHardware, L: Logger> TwiSlave<H, L> {
    /// Bring up the controller: own address and general call acknowledged,
    /// event interrupt enabled. Pull-ups are left to the caller.
    pub fn with_logger(
        mut hardware: H,
        config: &SlaveConfig,
        hooks: RegisterHooks,
        mut logger: L,
    ) -> Self {
        hardware.enable(config);
        logger.debug("twi: slave enabled");
        Self {
            hardware,
            hooks,
            rx: ReceptionBuffer::new(),
            tx: 0,
            state: DispatchState::Idle,
            logger,
        }
    }

    /// Disable the controller and its interrupt and hand the hardware back.
    /// The engine has to be initialized again to resume.
    pub fn close(mut self) -> H {
        self.hardware.disable();
        self.logger.debug("twi: slave disabled");
        self.hardware
    }

    /// Handle one controller interrupt.
    ///
    /// Call this from the TWI vector. Returns the event that was handled.
    pub fn service(&mut self) -> BusEvent {
        let event = BusEvent::classify(self.hardware.status());
        let response = self.dispatch(event);
        self.hardware.respond(response);
        event
    }

    /// Advance the dispatcher by one event and pick the controller response.
    pub fn dispatch(&mut self, event: BusEvent) -> Response {
        match event {
            BusEvent::AddrMatchWrite | BusEvent::AddrMatchWriteArbLost => {
                self.begin_reception(Addressing::Own);
                Response::Ack
            }
            BusEvent::GenCallMatch | BusEvent::GenCallMatchArbLost => {
                self.begin_reception(Addressing::GeneralCall);
                Response::Ack
            }
            BusEvent::DataRecvAck(addressing) => {
                self.receive(addressing);
                Response::Ack
            }
            BusEvent::DataRecvNack(addressing) => {
                // A master may NACK the last byte of a write; treat it as the
                // end of the reception, then reset the controller.
                self.receive(addressing);
                self.complete();
                self.state = DispatchState::Idle;
                Response::AckAndRecover
            }
            BusEvent::StopOrRestart => {
                self.complete();
                self.state = DispatchState::Idle;
                Response::Ack
            }
            BusEvent::AddrMatchRead | BusEvent::AddrMatchReadArbLost => {
                self.rx.clear();
                self.state = DispatchState::TransmittingFirstByte;
                Response::Transmit(self.tx)
            }
            BusEvent::DataSentAck => {
                self.state = DispatchState::TransmittingSubsequentBytes;
                Response::Transmit(self.tx)
            }
            BusEvent::DataSentNack => {
                self.state = DispatchState::Idle;
                Response::Ack
            }
            BusEvent::DataSentAckLastByte => {
                self.state = DispatchState::Idle;
                Response::AckAndRecover
            }
            BusEvent::BusError => {
                self.logger.error("twi: bus error, resetting controller");
                self.state = DispatchState::Idle;
                Response::AckAndRecover
            }
            BusEvent::Unhandled(_) => {
                self.logger.error("twi: unexpected status, resetting controller");
                self.state = DispatchState::Idle;
                Response::AckAndRecover
            }
        }
    }

    fn begin_reception(&mut self, addressing: Addressing) {
        self.rx.clear();
        self.state = DispatchState::Receiving(addressing);
    }

    fn receive(&mut self, addressing: Addressing) {
        let byte = self.hardware.read_data();
        self.rx.push(byte);
        self.state = DispatchState::Receiving(addressing);
    }

    /// Interpret the bytes of a finished write phase. Only a reception that
    /// is still open counts, so one request never fires its hook twice.
    fn complete(&mut self) {
        if !matches!(self.state, DispatchState::Receiving(_)) {
            return;
        }
        match *self.rx.as_slice() {
            [index] => {
                self.tx = self.hooks.read(index);
                self.logger.debug("twi: register read staged");
            }
            [index, value] => {
                self.hooks.write(index, value);
                self.logger.debug("twi: register write");
            }
            _ => self.logger.debug("twi: malformed request ignored"),
        }
    }

    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Byte that the next master read will return.
    #[must_use]
    pub fn pending_byte(&self) -> u8 {
        self.tx
    }

    /// Bytes received since the last address match.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        self.rx.as_slice()
    }

    #[must_use]
    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    #[must_use]
    pub fn logger(&self) -> &L {
        &self.logger
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::test_support::RecordingLogger;
    use crate::i2c::common::{ConfigurationError, SlaveConfigBuilder};
    use crate::i2c::event::*;
    use std::cell::RefCell;

    /// Controller double: the test sets status and data, the engine answers.
    #[derive(Default)]
    pub(crate) struct MockTwi {
        pub status: u8,
        pub data: u8,
        pub enabled: Option<SlaveConfig>,
        pub disabled: bool,
        pub responses: Vec<Response>,
    }

    impl TwiSlaveHardware for MockTwi {
        fn enable(&mut self, config: &SlaveConfig) {
            self.enabled = Some(*config);
        }

        fn disable(&mut self) {
            self.disabled = true;
        }

        fn status(&self) -> u8 {
            self.status
        }

        fn read_data(&self) -> u8 {
            self.data
        }

        fn respond(&mut self, response: Response) {
            self.responses.push(response);
        }
    }

    thread_local! {
        static READS: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
        static WRITES: RefCell<Vec<(u8, u8)>> = const { RefCell::new(Vec::new()) };
    }

    pub(crate) fn read_hook(index: u8) -> u8 {
        READS.with(|reads| reads.borrow_mut().push(index));
        index ^ 0x5A
    }

    pub(crate) fn write_hook(index: u8, value: u8) {
        WRITES.with(|writes| writes.borrow_mut().push((index, value)));
    }

    pub(crate) fn reads() -> Vec<u8> {
        READS.with(|reads| reads.borrow().clone())
    }

    pub(crate) fn writes() -> Vec<(u8, u8)> {
        WRITES.with(|writes| writes.borrow().clone())
    }

    fn config() -> SlaveConfig {
        SlaveConfigBuilder::new().address(0x20).build().unwrap()
    }

    fn bound_hooks() -> RegisterHooks {
        RegisterHooks::new()
            .with_read(read_hook)
            .with_write(write_hook)
    }

    fn slave(hooks: RegisterHooks) -> TwiSlave<MockTwi, RecordingLogger> {
        TwiSlave::with_logger(MockTwi::default(), &config(), hooks, RecordingLogger::default())
    }

    /// Feed `(status, data)` pairs through the interrupt handler.
    fn drive<L: Logger>(slave: &mut TwiSlave<MockTwi, L>, events: &[(u8, u8)]) {
        for &(status, data) in events {
            slave.hardware.status = status;
            slave.hardware.data = data;
            slave.service();
        }
    }

    fn write_request(bytes: &[u8]) -> Vec<(u8, u8)> {
        let mut events = vec![(STATUS_SRX_ADR_ACK, 0)];
        events.extend(bytes.iter().map(|&b| (STATUS_SRX_ADR_DATA_ACK, b)));
        events.push((STATUS_SRX_STOP_RESTART, 0));
        events
    }

    #[test]
    fn test_init_arms_controller() {
        let slave = slave(RegisterHooks::new());
        assert_eq!(slave.hardware().enabled, Some(config()));
        assert_eq!(slave.state(), DispatchState::Idle);
    }

    #[test]
    fn test_close_disables_controller() {
        let hardware = slave(RegisterHooks::new()).close();
        assert!(hardware.disabled);
    }

    #[test]
    fn test_register_write() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[0x05, 0xAA]));

        assert_eq!(writes(), vec![(0x05, 0xAA)]);
        assert!(reads().is_empty());
        assert_eq!(slave.state(), DispatchState::Idle);
        assert!(slave.hardware().responses.iter().all(|r| *r == Response::Ack));
    }

    #[test]
    fn test_register_read_with_restart() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[0x05]));
        assert_eq!(reads(), vec![0x05]);
        assert_eq!(slave.pending_byte(), 0x05 ^ 0x5A);

        drive(
            &mut slave,
            &[(STATUS_STX_ADR_ACK, 0), (STATUS_STX_DATA_NACK, 0)],
        );
        let responses = &slave.hardware().responses;
        assert_eq!(responses[responses.len() - 2], Response::Transmit(0x05 ^ 0x5A));
        assert_eq!(responses[responses.len() - 1], Response::Ack);
        assert_eq!(reads().len(), 1);
        assert!(writes().is_empty());
    }

    #[test]
    fn test_retransmission_restages_same_byte() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[0x10]));
        drive(
            &mut slave,
            &[
                (STATUS_STX_ADR_ACK, 0),
                (STATUS_STX_DATA_ACK, 0),
                (STATUS_STX_DATA_ACK, 0),
            ],
        );
        assert_eq!(slave.state(), DispatchState::TransmittingSubsequentBytes);
        let staged = 0x10 ^ 0x5A;
        assert_eq!(
            slave.hardware().responses[slave.hardware().responses.len() - 3..],
            [
                Response::Transmit(staged),
                Response::Transmit(staged),
                Response::Transmit(staged)
            ]
        );
        assert_eq!(reads(), vec![0x10]);
    }

    #[test]
    fn test_unbound_read_hook_stages_zero() {
        let mut slave = slave(RegisterHooks::new().with_write(write_hook));
        drive(&mut slave, &write_request(&[0x33]));
        assert_eq!(slave.pending_byte(), 0);
        drive(&mut slave, &[(STATUS_STX_ADR_ACK, 0)]);
        assert_eq!(slave.hardware().responses.last(), Some(&Response::Transmit(0)));
    }

    #[test]
    fn test_unbound_write_hook_is_noop() {
        let mut slave = slave(RegisterHooks::new().with_read(read_hook));
        drive(&mut slave, &write_request(&[0x05, 0xAA]));
        assert!(reads().is_empty());
        assert_eq!(slave.state(), DispatchState::Idle);
    }

    #[test]
    fn test_three_byte_write_is_ignored() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[0x05, 0xAA, 0xFF]));
        assert!(writes().is_empty());
        assert!(reads().is_empty());
        assert_eq!(slave.received(), &[0x05, 0xAA, 0xFF]);
    }

    #[test]
    fn test_empty_write_is_ignored() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[]));
        assert!(writes().is_empty());
        assert!(reads().is_empty());
    }

    #[test]
    fn test_overlong_write_drops_extra_bytes() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(slave.received(), &[1, 2, 3, 4]);
        assert!(writes().is_empty());
    }

    #[test]
    fn test_general_call_write() {
        let mut slave = slave(bound_hooks());
        drive(
            &mut slave,
            &[
                (STATUS_SRX_GEN_ACK, 0),
                (STATUS_SRX_GEN_DATA_ACK, 0x00),
                (STATUS_SRX_GEN_DATA_ACK, 0x10),
                (STATUS_SRX_STOP_RESTART, 0),
            ],
        );
        assert_eq!(writes(), vec![(0x00, 0x10)]);
    }

    #[test]
    fn test_address_match_resets_reception() {
        let mut slave = slave(bound_hooks());
        drive(
            &mut slave,
            &[
                (STATUS_SRX_ADR_ACK, 0),
                (STATUS_SRX_ADR_DATA_ACK, 0x01),
                (STATUS_SRX_ADR_DATA_ACK, 0x02),
                (STATUS_SRX_ADR_DATA_ACK, 0x03),
            ],
        );
        assert_eq!(slave.received().len(), 3);

        for status in [
            STATUS_SRX_ADR_ACK,
            STATUS_SRX_GEN_ACK,
            STATUS_STX_ADR_ACK,
            STATUS_SRX_ADR_ACK_M_ARB_LOST,
            STATUS_STX_ADR_ACK_M_ARB_LOST,
        ] {
            drive(&mut slave, &[(STATUS_SRX_ADR_DATA_ACK, 0x09), (status, 0)]);
            assert!(slave.received().is_empty(), "status {status:#04x}");
        }
    }

    #[test]
    fn test_stop_fires_once_per_request() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[0x01, 0x02]));
        drive(&mut slave, &[(STATUS_SRX_STOP_RESTART, 0)]);
        assert_eq!(writes(), vec![(0x01, 0x02)]);
    }

    #[test]
    fn test_nack_on_last_byte_completes_write() {
        let mut slave = slave(bound_hooks());
        drive(
            &mut slave,
            &[
                (STATUS_SRX_ADR_ACK, 0),
                (STATUS_SRX_ADR_DATA_ACK, 0x07),
                (STATUS_SRX_ADR_DATA_NACK, 0x70),
                (STATUS_SRX_STOP_RESTART, 0),
            ],
        );
        assert_eq!(writes(), vec![(0x07, 0x70)]);
        let responses = &slave.hardware().responses;
        assert_eq!(responses[2], Response::AckAndRecover);
        assert_eq!(responses[3], Response::Ack);
        assert_eq!(slave.state(), DispatchState::Idle);
    }

    #[test]
    fn test_general_call_nack_on_last_byte_completes_write() {
        let mut slave = slave(bound_hooks());
        let events = [
            (STATUS_SRX_GEN_ACK, 0),
            (STATUS_SRX_GEN_DATA_ACK, 0x11),
            (STATUS_SRX_GEN_DATA_NACK, 0x22),
        ];
        for &(status, data) in &events[..2] {
            drive(&mut slave, &[(status, data)]);
            assert_eq!(slave.state(), DispatchState::Receiving(Addressing::GeneralCall));
        }
        slave.hardware.status = events[2].0;
        slave.hardware.data = events[2].1;
        assert_eq!(
            slave.service(),
            BusEvent::DataRecvNack(Addressing::GeneralCall)
        );

        assert_eq!(writes(), vec![(0x11, 0x22)]);
        assert_eq!(slave.hardware().responses.last(), Some(&Response::AckAndRecover));
        assert_eq!(slave.state(), DispatchState::Idle);

        // The STOP that follows must not fire the hook again.
        drive(&mut slave, &[(STATUS_SRX_STOP_RESTART, 0)]);
        assert_eq!(writes().len(), 1);
    }

    #[test]
    fn test_out_of_range_address_never_enables_controller() {
        for address in [0x00, 0x80, 0x90, 0xFF] {
            let mut hardware = Some(MockTwi::default());
            let result = SlaveConfigBuilder::new()
                .address(address)
                .build()
                .map(|config| TwiSlave::new(hardware.take().unwrap(), &config, bound_hooks()));
            assert_eq!(result.err(), Some(ConfigurationError::InvalidAddress(address)));
            let untouched = hardware.unwrap();
            assert!(untouched.enabled.is_none());
            assert!(untouched.responses.is_empty());
        }

        let slave = TwiSlave::new(MockTwi::default(), &config(), bound_hooks());
        let enabled = slave.hardware().enabled.unwrap();
        assert_eq!(enabled.address(), 0x20);
        assert_eq!(enabled.address_register() >> 1, 0x20);
    }

    #[test]
    fn test_bus_error_recovers_from_every_state() {
        let prefixes: [&[(u8, u8)]; 4] = [
            &[],
            &[(STATUS_SRX_ADR_ACK, 0), (STATUS_SRX_ADR_DATA_ACK, 0x05)],
            &[(STATUS_STX_ADR_ACK, 0)],
            &[(STATUS_STX_ADR_ACK, 0), (STATUS_STX_DATA_ACK, 0)],
        ];
        for prefix in prefixes {
            let mut slave = slave(bound_hooks());
            drive(&mut slave, prefix);
            drive(&mut slave, &[(STATUS_BUS_ERROR, 0)]);
            assert_eq!(slave.state(), DispatchState::Idle);
            assert_eq!(
                slave.hardware().responses.last(),
                Some(&Response::AckAndRecover)
            );
            assert_eq!(slave.logger().error.len(), 1);
        }
        assert!(writes().is_empty());
    }

    #[test]
    fn test_bus_error_abandons_open_request() {
        let mut slave = slave(bound_hooks());
        drive(
            &mut slave,
            &[
                (STATUS_SRX_ADR_ACK, 0),
                (STATUS_SRX_ADR_DATA_ACK, 0x05),
                (STATUS_SRX_ADR_DATA_ACK, 0xAA),
                (STATUS_BUS_ERROR, 0),
                (STATUS_SRX_STOP_RESTART, 0),
            ],
        );
        assert!(writes().is_empty());
    }

    #[test]
    fn test_unhandled_status_recovers() {
        let mut slave = slave(bound_hooks());
        for status in [0x08, 0x38, STATUS_NO_STATE, STATUS_STX_DATA_ACK_LAST_BYTE] {
            drive(&mut slave, &[(status, 0)]);
            assert_eq!(slave.state(), DispatchState::Idle);
            assert_eq!(
                slave.hardware().responses.last(),
                Some(&Response::AckAndRecover)
            );
        }
    }

    #[test]
    fn test_every_status_gets_a_response() {
        let mut slave = slave(bound_hooks());
        for status in 0..=u8::MAX {
            drive(&mut slave, &[(status, status)]);
        }
        assert_eq!(slave.hardware().responses.len(), 256);
    }

    #[test]
    fn test_dispatch_logs_transactions() {
        let mut slave = slave(bound_hooks());
        drive(&mut slave, &write_request(&[0x05, 0xAA]));
        assert!(slave
            .logger()
            .debug
            .iter()
            .any(|line| line == "twi: register write"));
        assert!(slave.logger().error.is_empty());
    }
}
