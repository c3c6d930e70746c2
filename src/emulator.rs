use log::{debug, trace};
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::{
    decode::OpCodes,
    display::{FrameBuffer, PIXEL_COUNT},
    error::{Fault, LoadError},
    keyboard::Keyboard,
    memory::{Memory, TypeAddr, FONT_GLYPH_LEN, FONT_START, MEMORY_SIZE},
    registers::Registers,
    timer::Timers,
};

/// Source of bytes for `CXKK`.
pub trait RandomSource {
    fn next_byte(&mut self) -> u8;
}

impl<R: RngCore> RandomSource for R {
    fn next_byte(&mut self) -> u8 {
        (self.next_u32() & 0xFF) as u8
    }
}

/// Handed to the trace hook after an instruction decodes, before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEvent {
    pub pc: TypeAddr,
    pub opcode: u16,
    pub instruction: OpCodes,
}

pub type TraceHook = Box<dyn FnMut(&TraceEvent)>;

/// What a successful `step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub opcode: u16,
    /// The frame buffer changed during this step.
    pub display_changed: bool,
    /// `FX0A` found no key held and rewound PC onto itself.
    pub waiting_for_key: bool,
}

/// One complete CHIP-8 machine: memory, registers, frame buffer, keypad and
/// timers, all owned here and living as long as the machine does.
///
/// The machine does no I/O of its own. A host calls [`Machine::step`] at its
/// chosen instruction rate, [`Machine::tick_timers`] at 60 Hz, feeds keys
/// through [`Machine::set_key`] and presents [`Machine::display_pixels`] when
/// the frame is dirty.
pub struct Machine {
    mem: Memory,
    regs: Registers,
    fb: FrameBuffer,
    keys: Keyboard,
    timers: Timers,
    rng: Box<dyn RandomSource>,
    trace_hook: Option<TraceHook>,
    waiting_for_key: bool,
}

impl Machine {
    /// Loads `rom` at 0x200 with an entropy-seeded random source.
    pub fn new(rom: &[u8]) -> Result<Self, LoadError> {
        Self::with_rng(rom, StdRng::from_entropy())
    }

    pub fn with_rng(rom: &[u8], rng: impl RandomSource + 'static) -> Result<Self, LoadError> {
        let mut mem = Memory::new();
        mem.load(rom)?;

        Ok(Self {
            mem,
            regs: Registers::new(),
            fb: FrameBuffer::new(),
            keys: Keyboard::new(),
            timers: Timers::new(),
            rng: Box::new(rng),
            trace_hook: None,
            waiting_for_key: false,
        })
    }

    pub fn set_trace_hook(&mut self, hook: impl FnMut(&TraceEvent) + 'static) {
        self.trace_hook = Some(Box::new(hook));
    }

    pub fn clear_trace_hook(&mut self) {
        self.trace_hook = None;
    }

    /// Runs one instruction.
    ///
    /// On a fault PC is left pointing at the offending instruction and
    /// memory is untouched by it.
    pub fn step(&mut self) -> Result<StepOutcome, Fault> {
        let pc = self.regs.pc.0;
        let generation = self.fb.generation();
        self.waiting_for_key = false;

        match self.fetch_decode_execute(pc) {
            Ok(opcode) => Ok(StepOutcome {
                opcode,
                display_changed: self.fb.generation() != generation,
                waiting_for_key: self.waiting_for_key,
            }),
            Err(fault) => {
                self.regs.pc.set_addr(pc);
                self.waiting_for_key = false;
                Err(fault)
            }
        }
    }

    fn fetch_decode_execute(&mut self, pc: TypeAddr) -> Result<u16, Fault> {
        let opcode = self.mem.read_u16(pc)?;
        self.regs.pc.increment();

        let ins = OpCodes::decode_raw(opcode)?;
        trace!("{pc:#05x}: {opcode:04X}  {ins}");
        if let Some(hook) = self.trace_hook.as_mut() {
            hook(&TraceEvent {
                pc,
                opcode,
                instruction: ins,
            });
        }

        self.execute_ins(ins)?;
        Ok(opcode)
    }

    fn execute_ins(&mut self, ins: OpCodes) -> Result<(), Fault> {
        match ins {
            OpCodes::ClearScreen => self.fb.clear(),
            OpCodes::PopSubroutine => {
                let addr = self.regs.stack.pop_return()?;
                self.regs.pc.set_addr(addr);
            }
            OpCodes::Jump(addr) => self.regs.pc.set_addr(addr),
            OpCodes::PushSubroutine(addr) => {
                // PC already points past the CALL
                self.regs.stack.push_return(self.regs.pc.0)?;
                self.regs.pc.set_addr(addr);
            }
            OpCodes::SkipEqualConstant(vx, kk) => self.skip_if(self.regs.get(vx) == kk),
            OpCodes::SkipNotEqualConstant(vx, kk) => self.skip_if(self.regs.get(vx) != kk),
            OpCodes::SkipEqualRegister(vx, vy) => {
                self.skip_if(self.regs.get(vx) == self.regs.get(vy))
            }
            OpCodes::SkipNotEqualRegister(vx, vy) => {
                self.skip_if(self.regs.get(vx) != self.regs.get(vy))
            }
            OpCodes::SetRegister(vx, kk) => self.regs.set_register(vx, kk),
            OpCodes::AddToRegister(vx, kk) => self.regs.add_to_register(vx, kk),
            OpCodes::CopyRegister(vx, vy) => self.regs.set_register(vx, self.regs.get(vy)),
            OpCodes::Or(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) | self.regs.get(vy));
            }
            OpCodes::And(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) & self.regs.get(vy));
            }
            OpCodes::XOr(vx, vy) => {
                self.regs
                    .set_register(vx, self.regs.get(vx) ^ self.regs.get(vy));
            }
            // the flag is written last so it wins when x is F
            OpCodes::Add(vx, vy) => {
                let (sum, carry) = self.regs.get(vx).overflowing_add(self.regs.get(vy));
                self.regs.set_register(vx, sum);
                self.regs.set_flag(carry);
            }
            OpCodes::SubtractForward(vx, vy) => {
                let (x, y) = (self.regs.get(vx), self.regs.get(vy));
                self.regs.set_register(vx, x.wrapping_sub(y));
                self.regs.set_flag(x >= y);
            }
            OpCodes::RightShift(vx, _) => {
                let x = self.regs.get(vx);
                self.regs.set_register(vx, x >> 1);
                self.regs.set_flag(x & 1 == 1);
            }
            OpCodes::SubtractBackward(vx, vy) => {
                let (x, y) = (self.regs.get(vx), self.regs.get(vy));
                self.regs.set_register(vx, y.wrapping_sub(x));
                self.regs.set_flag(y >= x);
            }
            OpCodes::LeftShift(vx, _) => {
                let x = self.regs.get(vx);
                self.regs.set_register(vx, x << 1);
                self.regs.set_flag(x >> 7 == 1);
            }
            OpCodes::SetIndexRegister(addr) => self.regs.index.set_addr(addr),
            OpCodes::JumpWithOffset(addr) => {
                // may land past 0xFFF; the next fetch reports it
                self.regs.pc.set_addr(addr + self.regs.get(0) as u16);
            }
            OpCodes::Random(vx, kk) => {
                let byte = self.rng.next_byte();
                self.regs.set_register(vx, byte & kk);
            }
            OpCodes::Display(reg_x, reg_y, height) => {
                let (x, y) = (self.regs.get(reg_x), self.regs.get(reg_y));
                let sprite = self.mem.slice(self.regs.index.0, height as usize)?;
                let collision = self.fb.draw(x, y, sprite);
                self.regs.set_flag(collision);
            }
            OpCodes::SkipIfPressed(vx) => self.skip_if(self.keys.is_pressed(self.regs.get(vx))),
            OpCodes::SkipIfNotPressed(vx) => {
                self.skip_if(!self.keys.is_pressed(self.regs.get(vx)))
            }
            OpCodes::CopyDelayToRegister(vx) => self.regs.set_register(vx, self.timers.delay.count),
            OpCodes::GetKey(vx) => match self.keys.any_pressed() {
                Some(key) => {
                    debug!("FX0A got key {key:#x}");
                    self.regs.set_register(vx, key);
                }
                None => {
                    // re-run this same instruction on the next step
                    self.regs.pc.decrement();
                    self.waiting_for_key = true;
                }
            },
            OpCodes::CopyRegisterToDelay(vx) => self.timers.delay.set(self.regs.get(vx)),
            OpCodes::CopyRegisterToSound(vx) => self.timers.sound.set(self.regs.get(vx)),
            OpCodes::AddToIndex(vx) => {
                let index = (self.regs.index.0 + self.regs.get(vx) as u16) % MEMORY_SIZE as u16;
                self.regs.index.set_addr(index);
            }
            OpCodes::PointChar(vx) => {
                let addr = FONT_START + self.regs.get(vx) as u16 * FONT_GLYPH_LEN;
                self.regs.index.set_addr(addr);
            }
            OpCodes::ToDecimal(vx) => {
                let value = self.regs.get(vx);
                let digits = [value / 100, (value / 10) % 10, value % 10];
                self.mem.write_slice(self.regs.index.0, &digits)?;
            }
            OpCodes::StoreRegisterToMemory(vx) => {
                self.mem
                    .write_slice(self.regs.index.0, self.regs.range(vx))?;
            }
            OpCodes::LoadRegisterFromMemory(vx) => {
                let values = self.mem.slice(self.regs.index.0, vx as usize + 1)?;
                self.regs.load_range(values);
            }
        }
        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.regs.pc.increment();
        }
    }

    pub fn tick_timers(&mut self) {
        self.timers.tick();
    }

    pub fn set_key(&mut self, key: u8, pressed: bool) {
        self.keys.set(key, pressed);
    }

    pub fn display_pixels(&self) -> &[bool; PIXEL_COUNT] {
        self.fb.pixels()
    }

    pub fn display(&self) -> &FrameBuffer {
        &self.fb
    }

    /// Returns whether the frame changed since the last call, and resets it.
    pub fn take_display_dirty(&mut self) -> bool {
        self.fb.take_dirty()
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay.count
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound.count
    }

    pub fn pc(&self) -> TypeAddr {
        self.regs.pc.0
    }

    pub fn index(&self) -> TypeAddr {
        self.regs.index.0
    }

    pub fn register(&self, reg_num: u8) -> u8 {
        self.regs.get(reg_num)
    }

    pub fn stack_depth(&self) -> usize {
        self.regs.stack.depth()
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn keypad(&self) -> &Keyboard {
        &self.keys
    }

    pub fn is_waiting_for_key(&self) -> bool {
        self.waiting_for_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn machine(rom: &[u8]) -> Machine {
        Machine::with_rng(rom, StepRng::new(0xA5, 0)).unwrap()
    }

    fn run(m: &mut Machine, steps: usize) {
        for _ in 0..steps {
            m.step().unwrap();
        }
    }

    #[test]
    fn add_with_carry() {
        let mut m = machine(&[0x60, 0xFF, 0x61, 0x01, 0x80, 0x14]);
        run(&mut m, 3);
        assert_eq!(m.register(0), 0x00);
        assert_eq!(m.register(0xF), 1);

        let mut m = machine(&[0x60, 0x01, 0x61, 0x01, 0x80, 0x14]);
        run(&mut m, 3);
        assert_eq!(m.register(0), 0x02);
        assert_eq!(m.register(0xF), 0);
    }

    #[test]
    fn subtract_sets_not_borrow() {
        // V0 = 5, V1 = 5: SUB gives 0 with VF = 1 (equal counts as no borrow)
        let mut m = machine(&[0x60, 0x05, 0x61, 0x05, 0x80, 0x15]);
        run(&mut m, 3);
        assert_eq!(m.register(0), 0);
        assert_eq!(m.register(0xF), 1);

        // V0 = 1, V1 = 2: borrow
        let mut m = machine(&[0x60, 0x01, 0x61, 0x02, 0x80, 0x15]);
        run(&mut m, 3);
        assert_eq!(m.register(0), 0xFF);
        assert_eq!(m.register(0xF), 0);

        // SUBN: V0 = V1 - V0 = 2 - 1
        let mut m = machine(&[0x60, 0x01, 0x61, 0x02, 0x80, 0x17]);
        run(&mut m, 3);
        assert_eq!(m.register(0), 1);
        assert_eq!(m.register(0xF), 1);
    }

    #[test]
    fn shifts_report_lost_bit() {
        let mut m = machine(&[0x60, 0x03, 0x80, 0x06]);
        run(&mut m, 2);
        assert_eq!(m.register(0), 0x01);
        assert_eq!(m.register(0xF), 1);

        let mut m = machine(&[0x60, 0x81, 0x80, 0x0E]);
        run(&mut m, 2);
        assert_eq!(m.register(0), 0x02);
        assert_eq!(m.register(0xF), 1);

        let mut m = machine(&[0x60, 0x40, 0x80, 0x0E]);
        run(&mut m, 2);
        assert_eq!(m.register(0), 0x80);
        assert_eq!(m.register(0xF), 0);
    }

    #[test]
    fn logic_ops() {
        let mut m = machine(&[
            0x60, 0b1100, 0x61, 0b1010, // V0, V1
            0x82, 0x00, 0x82, 0x11, // V2 = V0 | V1
            0x83, 0x00, 0x83, 0x12, // V3 = V0 & V1
            0x84, 0x00, 0x84, 0x13, // V4 = V0 ^ V1
        ]);
        run(&mut m, 8);
        assert_eq!(m.register(2), 0b1110);
        assert_eq!(m.register(3), 0b1000);
        assert_eq!(m.register(4), 0b0110);
    }

    #[test]
    fn add_immediate_wraps_without_flag() {
        let mut m = machine(&[0x6F, 0x00, 0x60, 0xFF, 0x70, 0x02]);
        run(&mut m, 3);
        assert_eq!(m.register(0), 0x01);
        assert_eq!(m.register(0xF), 0);
    }

    #[test]
    fn skips() {
        // V0 = 7; SE V0,7 skips; SNE V0,7 does not
        let mut m = machine(&[0x60, 0x07, 0x30, 0x07, 0x00, 0x00, 0x40, 0x07]);
        run(&mut m, 2);
        assert_eq!(m.pc(), 0x206);
        run(&mut m, 1);
        assert_eq!(m.pc(), 0x208);

        // 5XY0 and 9XY0
        let mut m = machine(&[0x50, 0x10, 0x00, 0x00, 0x90, 0x10]);
        run(&mut m, 1);
        assert_eq!(m.pc(), 0x204);
        run(&mut m, 1);
        assert_eq!(m.pc(), 0x206);
    }

    #[test]
    fn call_and_return() {
        let mut m = machine(&[
            0x22, 0x06, // CALL 0x206
            0x60, 0x2A, // V0 = 0x2A
            0x00, 0x00, //
            0x61, 0x01, // V1 = 1
            0x00, 0xEE, // RET
        ]);
        run(&mut m, 1);
        assert_eq!(m.pc(), 0x206);
        assert_eq!(m.stack_depth(), 1);
        run(&mut m, 2);
        assert_eq!(m.pc(), 0x202);
        assert_eq!(m.stack_depth(), 0);
        run(&mut m, 1);
        assert_eq!((m.register(0), m.register(1)), (0x2A, 1));
    }

    #[test]
    fn return_on_empty_stack_faults_in_place() {
        let mut m = machine(&[0x00, 0xEE]);
        assert_eq!(m.step(), Err(Fault::StackUnderflow));
        assert_eq!(m.pc(), 0x200);
    }

    #[test]
    fn seventeenth_call_overflows() {
        // CALL 0x200 forever
        let mut m = machine(&[0x22, 0x00]);
        run(&mut m, 16);
        assert_eq!(m.step(), Err(Fault::StackOverflow));
        assert_eq!(m.stack_depth(), 16);
        assert_eq!(m.pc(), 0x200);
    }

    #[test]
    fn jumps() {
        let mut m = machine(&[0x13, 0x00]);
        run(&mut m, 1);
        assert_eq!(m.pc(), 0x300);

        let mut m = machine(&[0x60, 0x10, 0xB3, 0x00]);
        run(&mut m, 2);
        assert_eq!(m.pc(), 0x310);
    }

    #[test]
    fn jump_past_memory_faults_on_fetch() {
        let mut m = machine(&[0x60, 0xFF, 0xBF, 0xFF]);
        run(&mut m, 2);
        assert_eq!(m.pc(), 0x10FE);
        assert_eq!(m.step(), Err(Fault::OutOfBounds { addr: 0x10FE }));
    }

    #[test]
    fn random_masks_injected_byte() {
        let mut m = machine(&[0xC0, 0x0F, 0xC1, 0xFF]);
        run(&mut m, 2);
        assert_eq!(m.register(0), 0xA5 & 0x0F);
        assert_eq!(m.register(1), 0xA5);
    }

    #[test]
    fn draw_sets_collision_flag() {
        // I = font '0', draw it twice at (0, 0)
        let mut m = machine(&[0xA0, 0x00, 0xD0, 0x05, 0xD0, 0x05]);
        run(&mut m, 1);
        let first = m.step().unwrap();
        assert!(first.display_changed);
        assert_eq!(m.register(0xF), 0);
        assert!(m.display().pixel(0, 0));

        m.step().unwrap();
        assert_eq!(m.register(0xF), 1);
        assert!(m.display_pixels().iter().all(|p| !p));
    }

    #[test]
    fn draw_reading_past_memory_faults() {
        let mut m = machine(&[0xAF, 0xFE, 0xD0, 0x03]);
        run(&mut m, 1);
        assert_eq!(m.step(), Err(Fault::OutOfBounds { addr: 0x1000 }));
        assert!(!m.display().is_dirty());
    }

    #[test]
    fn clear_screen_marks_dirty() {
        let mut m = machine(&[0x00, 0xE0]);
        let outcome = m.step().unwrap();
        assert!(outcome.display_changed);
        assert!(m.take_display_dirty());
        assert!(!m.take_display_dirty());
    }

    #[test]
    fn key_skips() {
        let mut m = machine(&[0x60, 0x0A, 0xE0, 0x9E, 0x00, 0x00, 0xE0, 0xA1]);
        m.set_key(0xA, true);
        run(&mut m, 2);
        assert_eq!(m.pc(), 0x206);
        run(&mut m, 1);
        assert_eq!(m.pc(), 0x208);
    }

    #[test]
    fn timers_are_unscaled() {
        let mut m = machine(&[0x60, 0x09, 0xF0, 0x15, 0xF0, 0x18, 0xF1, 0x07]);
        run(&mut m, 3);
        assert_eq!(m.delay_timer(), 9);
        assert_eq!(m.sound_timer(), 9);
        m.tick_timers();
        run(&mut m, 1);
        assert_eq!(m.register(1), 8);
        assert_eq!(m.sound_timer(), 8);
    }

    #[test]
    fn index_arithmetic() {
        // I = 0xFFF, V0 = 2, I += V0 wraps to 1
        let mut m = machine(&[0xAF, 0xFF, 0x60, 0x02, 0xF0, 0x1E]);
        run(&mut m, 3);
        assert_eq!(m.index(), 0x001);
        assert_eq!(m.register(0xF), 0);

        // font address of 'B'
        let mut m = machine(&[0x60, 0x0B, 0xF0, 0x29]);
        run(&mut m, 2);
        assert_eq!(m.index(), 0x0B * 5);
    }

    #[test]
    fn bcd() {
        let mut m = machine(&[0x60, 0xFE, 0xA3, 0x00, 0xF0, 0x33]);
        run(&mut m, 3);
        assert_eq!(m.memory().slice(0x300, 3).unwrap(), &[2, 5, 4]);

        let mut m = machine(&[0x60, 0x07, 0xA3, 0x00, 0xF0, 0x33]);
        run(&mut m, 3);
        assert_eq!(m.memory().slice(0x300, 3).unwrap(), &[0, 0, 7]);
    }

    #[test]
    fn bcd_at_end_of_memory_writes_nothing() {
        let mut m = machine(&[0x60, 0xFE, 0xAF, 0xFE, 0xF0, 0x33]);
        run(&mut m, 2);
        assert_eq!(m.step(), Err(Fault::OutOfBounds { addr: 0x1000 }));
        assert_eq!(m.memory().slice(0xFFE, 2).unwrap(), &[0, 0]);
        assert_eq!(m.pc(), 0x204);
    }

    #[test]
    fn trace_hook_sees_decoded_instructions() {
        use std::{cell::RefCell, rc::Rc};

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut m = machine(&[0x60, 0x01, 0xA2, 0x2A]);
        m.set_trace_hook(move |event| sink.borrow_mut().push(*event));
        run(&mut m, 2);
        m.clear_trace_hook();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].pc, 0x200);
        assert_eq!(seen[0].instruction, OpCodes::SetRegister(0, 1));
        assert_eq!(seen[1].opcode, 0xA22A);
    }

    #[test]
    fn illegal_instruction_reports_opcode() {
        let mut m = machine(&[0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(m.step(), Err(Fault::IllegalInstruction(0x0000)));
        assert_eq!(m.pc(), 0x200);
    }
}
