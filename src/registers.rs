use log::debug;

use crate::error::Fault;
use crate::memory::{TypeAddr, PROGRAM_START};

pub const STACK_DEPTH: usize = 16;
pub const FLAG_REGISTER: u8 = 0xF;

/// V0..VF, I, PC and the call stack.
///
/// VF doubles as the flag output of the ALU, shift and draw instructions.
pub struct Registers {
    registers: [u8; 16],
    pub pc: ProgramCounter,
    pub index: IndexRegister,
    pub stack: Stack,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub fn new() -> Self {
        Self {
            registers: [0; 16],
            pc: ProgramCounter(PROGRAM_START),
            index: IndexRegister(0x0),
            stack: Stack::new(),
        }
    }

    // register numbers come from a nibble, so only the low 4 bits matter
    pub fn set_register(&mut self, reg_num: u8, value: u8) {
        self.registers[(reg_num & 0xF) as usize] = value;
    }

    pub fn get(&self, reg_num: u8) -> u8 {
        self.registers[(reg_num & 0xF) as usize]
    }

    /// Wrapping add, VF untouched.
    pub fn add_to_register(&mut self, reg_num: u8, value: u8) {
        let total = self.get(reg_num).wrapping_add(value);
        self.set_register(reg_num, total);
    }

    pub fn set_flag(&mut self, flag: bool) {
        self.set_register(FLAG_REGISTER, flag as u8);
    }

    /// V0..=Vx
    pub fn range(&self, last: u8) -> &[u8] {
        &self.registers[..=(last & 0xF) as usize]
    }

    pub fn load_range(&mut self, values: &[u8]) {
        self.registers[..values.len()].copy_from_slice(values);
    }
}

// Special registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramCounter(pub TypeAddr);

impl ProgramCounter {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(2);
    }

    pub fn decrement(&mut self) {
        self.0 = self.0.wrapping_sub(2);
    }

    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRegister(pub TypeAddr);

impl IndexRegister {
    pub fn set_addr(&mut self, addr: TypeAddr) {
        self.0 = addr;
    }
}

/// Return addresses, kept apart from addressable memory.
pub struct Stack {
    addresses: [TypeAddr; STACK_DEPTH],
    sp: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    pub fn new() -> Self {
        Self {
            addresses: [0; STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn push_return(&mut self, addr: TypeAddr) -> Result<(), Fault> {
        if self.sp == STACK_DEPTH {
            return Err(Fault::StackOverflow);
        }
        self.addresses[self.sp] = addr;
        self.sp += 1;
        debug!("push return {addr:#05x}, depth {}", self.sp);
        Ok(())
    }

    pub fn pop_return(&mut self) -> Result<TypeAddr, Fault> {
        if self.sp == 0 {
            return Err(Fault::StackUnderflow);
        }
        self.sp -= 1;
        let addr = self.addresses[self.sp];
        debug!("pop return {addr:#05x}, depth {}", self.sp);
        Ok(addr)
    }

    pub fn depth(&self) -> usize {
        self.sp
    }
}

#[test]
fn test_stack_bounds() {
    let mut stack = Stack::new();
    assert_eq!(stack.pop_return(), Err(Fault::StackUnderflow));

    for i in 0..STACK_DEPTH as u16 {
        stack.push_return(0x200 + i * 2).unwrap();
    }
    assert_eq!(stack.push_return(0x300), Err(Fault::StackOverflow));
    assert_eq!(stack.depth(), STACK_DEPTH);

    assert_eq!(stack.pop_return(), Ok(0x21E));
    assert_eq!(stack.depth(), STACK_DEPTH - 1);
}

#[test]
fn test_register_helpers() {
    let mut regs = Registers::new();
    assert_eq!(regs.pc.0, 0x200);

    regs.set_register(3, 0xFE);
    regs.add_to_register(3, 0x05);
    assert_eq!(regs.get(3), 0x03);
    assert_eq!(regs.get(FLAG_REGISTER), 0);

    regs.load_range(&[1, 2, 3]);
    assert_eq!(regs.range(2), &[1, 2, 3]);
}
