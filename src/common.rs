// Licensed under the Apache-2.0 license

//! Items shared by every driver in the crate.

/// Minimal logging sink threaded through the drivers as a type parameter.
///
/// Implementations run in interrupt context when a driver logs from an ISR,
/// so they must not block.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Logger that discards everything. Compiles away entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}
