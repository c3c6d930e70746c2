use std::{fs, io, path::Path};

use log::debug;

use crate::error::{Fault, LoadError};

pub type TypeAddr = u16; // in reality u12
type FontBytes = [u8; 5 * 16];

pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START: TypeAddr = 0x200;
pub const FONT_START: TypeAddr = 0x000;
pub const FONT_GLYPH_LEN: TypeAddr = 5;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

pub const DEFAULT_FONT: FontBytes = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat 4K address space.
///
/// 000 -> 04F holds the hex font, 200 -> FFF the program. Every accessor
/// checks its whole range before touching a byte, so a failed access never
/// leaves a partial write behind.
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self {
            bytes: [0; MEMORY_SIZE],
        }
    }

    /// Wipes memory, installs the font and copies `rom` to 0x200.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(LoadError::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }

        self.bytes = [0; MEMORY_SIZE];

        let font_start = FONT_START as usize;
        self.bytes[font_start..font_start + DEFAULT_FONT.len()].copy_from_slice(&DEFAULT_FONT);

        let start_index = PROGRAM_START as usize;
        self.bytes[start_index..start_index + rom.len()].copy_from_slice(rom);

        debug!("loaded {} byte ROM at {:#05x}", rom.len(), PROGRAM_START);
        Ok(())
    }

    pub fn read_u8(&self, addr: TypeAddr) -> Result<u8, Fault> {
        self.bytes
            .get(addr as usize)
            .copied()
            .ok_or(Fault::out_of_bounds(addr))
    }

    pub fn write_u8(&mut self, addr: TypeAddr, val: u8) -> Result<(), Fault> {
        let slot = self
            .bytes
            .get_mut(addr as usize)
            .ok_or(Fault::out_of_bounds(addr))?;
        *slot = val;
        Ok(())
    }

    /// Big-endian word at `addr`, `addr + 1`.
    pub fn read_u16(&self, addr: TypeAddr) -> Result<u16, Fault> {
        let bytes = self.slice(addr, 2)?;
        Ok(((bytes[0] as u16) << 8) | bytes[1] as u16)
    }

    /// `len` bytes starting at `addr`.
    pub fn slice(&self, addr: TypeAddr, len: usize) -> Result<&[u8], Fault> {
        let range = Self::range(addr, len)?;
        Ok(&self.bytes[range])
    }

    /// Copies `data` to `addr..addr + data.len()`, or nothing at all.
    pub fn write_slice(&mut self, addr: TypeAddr, data: &[u8]) -> Result<(), Fault> {
        let range = Self::range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn range(addr: TypeAddr, len: usize) -> Result<std::ops::Range<usize>, Fault> {
        let start = addr as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            // report the first address that falls outside
            let first_bad = start.max(MEMORY_SIZE);
            return Err(Fault::OutOfBounds { addr: first_bad });
        }
        Ok(start..end)
    }
}

/// Reads a ROM image from disk, mapping io failures onto `LoadError`.
pub fn read_rom_file(path: impl AsRef<Path>) -> Result<Vec<u8>, LoadError> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::RomNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::RomUnreadable {
            path: path.to_path_buf(),
            source,
        },
    })
}
