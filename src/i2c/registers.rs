// Licensed under the Apache-2.0 license

//! Register file presented to the bus master.
//!
//! The slave exposes 256 virtual byte registers. Their contents live entirely
//! in user code, reached through two optional hooks bound at initialization.
//! Both hooks run inside the TWI interrupt with every other interrupt masked:
//! keep them short, never block, never start bus traffic from them.
//!
//! A master that retries a read re-invokes the read hook for the same index,
//! so the read hook must not consume or advance state.

/// Read hook: returns the value of register `index`.
pub type ReadRegister = fn(index: u8) -> u8;

/// Write hook: stores `value` into register `index`.
pub type WriteRegister = fn(index: u8, value: u8);

/// The two optional capability slots backing the register file.
#[derive(Copy, Clone, Debug, Default)]
pub struct RegisterHooks {
    read: Option<ReadRegister>,
    write: Option<WriteRegister>,
}

impl RegisterHooks {
    /// No hooks bound: reads return 0 and writes are ignored.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            read: None,
            write: None,
        }
    }
    #[must_use]
    pub const fn with_read(mut self, hook: ReadRegister) -> Self {
        self.read = Some(hook);
        self
    }
    #[must_use]
    pub const fn with_write(mut self, hook: WriteRegister) -> Self {
        self.write = Some(hook);
        self
    }

    #[must_use]
    pub fn read(&self, index: u8) -> u8 {
        self.read.map_or(0, |hook| hook(index))
    }

    pub fn write(&self, index: u8, value: u8) {
        if let Some(hook) = self.write {
            hook(index, value);
        }
    }

    #[must_use]
    pub fn has_read(&self) -> bool {
        self.read.is_some()
    }

    #[must_use]
    pub fn has_write(&self) -> bool {
        self.write.is_some()
    }
}
