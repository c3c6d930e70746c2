use log::warn;

pub const KEY_COUNT: usize = 16;

/// The 16-key hex keypad, 0x0..=0xF.
///
/// Keys are latched by whoever reads the host input; the machine only
/// samples them.
#[derive(Debug, Default)]
pub struct Keyboard {
    keys: [bool; KEY_COUNT],
}

impl Keyboard {
    pub fn new() -> Self {
        Self {
            keys: [false; KEY_COUNT],
        }
    }

    pub fn reset(&mut self) {
        self.keys = [false; KEY_COUNT];
    }

    /// Out-of-range keys are dropped.
    pub fn set(&mut self, key: u8, pressed: bool) {
        match self.keys.get_mut(key as usize) {
            Some(state) => *state = pressed,
            None => warn!("ignoring key {key:#x}, keypad only has 0x0..=0xF"),
        }
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    /// Lowest-numbered key currently held.
    pub fn any_pressed(&self) -> Option<u8> {
        self.keys.iter().position(|&k| k).map(|k| k as u8)
    }
}

#[test]
fn test_key_latch() {
    let mut kb = Keyboard::new();
    assert_eq!(kb.any_pressed(), None);

    kb.set(0xB, true);
    kb.set(0x4, true);
    assert!(kb.is_pressed(0xB));
    assert_eq!(kb.any_pressed(), Some(0x4));

    kb.set(0x4, false);
    assert_eq!(kb.any_pressed(), Some(0xB));

    kb.set(0x10, true);
    assert!(!kb.is_pressed(0x10));

    kb.reset();
    assert_eq!(kb.any_pressed(), None);
}
