//! CHIP-8 virtual machine core.
//!
//! 4K of memory with the hex font at 0x000 and programs at 0x200, sixteen
//! 8-bit registers V0..VF, a 16-bit I, a 16 entry call stack, delay and
//! sound timers, a 64x32 monochrome frame buffer and a 16-key keypad.
//!
//! Opcodes are 2 bytes, big-endian:
//!      NNN: address
//!      KK: 8-bit constant
//!      N: 4-bit constant
//!      X and Y: 4-bit register identifier
//!
//! The core performs no I/O. Windowing, audio, pacing and host key mapping
//! belong to the driver (see the `gui` feature binary).

pub mod config;
pub mod decode;
pub mod display;
pub mod emulator;
pub mod error;
pub mod keyboard;
pub mod memory;
pub mod registers;
pub mod timer;

pub use config::{ConfigError, Settings};
pub use decode::OpCodes;
pub use display::{FrameBuffer, HEIGHT, PIXEL_COUNT, WIDTH};
pub use emulator::{Machine, RandomSource, StepOutcome, TraceEvent};
pub use error::{Fault, LoadError};
pub use memory::{read_rom_file, MAX_ROM_SIZE};

/// Builds a machine with `rom` loaded at 0x200.
pub fn init(rom: &[u8]) -> Result<Machine, LoadError> {
    Machine::new(rom)
}
