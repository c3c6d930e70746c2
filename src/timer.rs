pub const TIMER_DEC_PER_SECOND: u32 = 60;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub count: u8,
}

impl Timer {
    pub fn set(&mut self, value: u8) {
        self.count = value;
    }

    /// Counts down by one, stopping at zero. Returns whether it moved.
    pub fn tick(&mut self) -> bool {
        if self.count == 0 {
            return false;
        }
        self.count -= 1;
        true
    }

    pub fn is_active(&self) -> bool {
        self.count > 0
    }
}

/// Delay and sound timers. Driven by the host at `TIMER_DEC_PER_SECOND`,
/// independent of how fast instructions run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: Timer,
    pub sound: Timer,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.delay.tick();
        self.sound.tick();
    }
}

#[test]
fn test_timers_floor_at_zero() {
    let mut timers = Timers::new();
    timers.delay.set(2);
    timers.sound.set(1);

    timers.tick();
    assert_eq!(timers.delay.count, 1);
    assert_eq!(timers.sound.count, 0);
    assert!(!timers.sound.is_active());

    timers.tick();
    timers.tick();
    assert_eq!(timers.delay.count, 0);
    assert_eq!(timers.sound.count, 0);
}
