use std::path::PathBuf;

use thiserror::Error;

use crate::timer::TIMER_DEC_PER_SECOND;

// CPU: 700 times per second
// Display: 60 times per second
// Timer: 60 times per second
pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 700;
pub const DEFAULT_TIMER_HZ: u32 = TIMER_DEC_PER_SECOND;
pub const DEFAULT_SCALE: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("instruction rate {ips} is below the timer rate {timer_hz}")]
    SlowerThanTimers { ips: u32, timer_hz: u32 },
}

/// Host-side pacing and presentation knobs. None of these change what an
/// instruction does, only how often the host calls into the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rom_path: PathBuf,
    pub instructions_per_second: u32,
    pub timer_hz: u32,
    pub scale: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rom_path: PathBuf::new(),
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            timer_hz: DEFAULT_TIMER_HZ,
            scale: DEFAULT_SCALE,
        }
    }
}

impl Settings {
    pub fn new(rom_path: impl Into<PathBuf>) -> Self {
        Self {
            rom_path: rom_path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instructions_per_second == 0 {
            return Err(ConfigError::Zero("instructions per second"));
        }
        if self.timer_hz == 0 {
            return Err(ConfigError::Zero("timer rate"));
        }
        if self.scale == 0 {
            return Err(ConfigError::Zero("scale"));
        }
        if self.instructions_per_second < self.timer_hz {
            return Err(ConfigError::SlowerThanTimers {
                ips: self.instructions_per_second,
                timer_hz: self.timer_hz,
            });
        }
        Ok(())
    }

    /// Instructions to run between two timer ticks.
    pub fn steps_per_tick(&self) -> u32 {
        (self.instructions_per_second / self.timer_hz.max(1)).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::new("roms/ibm.ch8");
        assert_eq!(settings.validate(), Ok(()));
        assert_eq!(settings.timer_hz, 60);
        assert_eq!(settings.steps_per_tick(), 11);
    }

    #[test]
    fn rejects_zero_rates() {
        let settings = Settings {
            timer_hz: 0,
            ..Settings::default()
        };
        assert_eq!(settings.validate(), Err(ConfigError::Zero("timer rate")));

        let settings = Settings {
            instructions_per_second: 30,
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(ConfigError::SlowerThanTimers {
                ips: 30,
                timer_hz: 60
            })
        );
    }
}
