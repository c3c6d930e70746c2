// Reference host for the chipvm core.
//
// Separately:
// CPU: `--ips` times per second
// Display: 60 times per second
// Timer: 60 times per second
//
// Keypad on QWERTY:
//   1 2 3 C      1 2 3 4
//   4 5 6 D      Q W E R
//   7 8 9 E      A S D F
//   A 0 B F      Z X C V

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chipvm::{read_rom_file, Machine, Settings, HEIGHT, PIXEL_COUNT, WIDTH};
use clap::Parser;
use log::{debug, error, info};
use minifb::{Key, Scale, Window, WindowOptions};

const PIXEL_ON: u32 = from_rgb(0, 127, 255);
const PIXEL_OFF: u32 = from_rgb(0, 0, 0);

const KEYMAP: [(Key, u8); 16] = [
    (Key::Key1, 0x1),
    (Key::Key2, 0x2),
    (Key::Key3, 0x3),
    (Key::Key4, 0xC),
    (Key::Q, 0x4),
    (Key::W, 0x5),
    (Key::E, 0x6),
    (Key::R, 0xD),
    (Key::A, 0x7),
    (Key::S, 0x8),
    (Key::D, 0x9),
    (Key::F, 0xE),
    (Key::Z, 0xA),
    (Key::X, 0x0),
    (Key::C, 0xB),
    (Key::V, 0xF),
];

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 virtual machine", long_about = None)]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Instructions per second
    #[arg(short, long, default_value_t = chipvm::config::DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u32,

    /// Timer decrements per second
    #[arg(short, long, default_value_t = chipvm::config::DEFAULT_TIMER_HZ)]
    timer_hz: u32,

    /// Window scale factor (1, 2, 4, 8, 16 or 32)
    #[arg(short, long, default_value_t = chipvm::config::DEFAULT_SCALE)]
    scale: usize,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Settings {
            rom_path: args.rom,
            instructions_per_second: args.ips,
            timer_hz: args.timer_hz,
            scale: args.scale,
        }
    }
}

const fn from_rgb(r: u32, g: u32, b: u32) -> u32 {
    (r << 16) | (g << 8) | b
}

fn window_scale(scale: usize) -> Result<Scale> {
    Ok(match scale {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        16 => Scale::X16,
        32 => Scale::X32,
        other => bail!("unsupported window scale {other}"),
    })
}

fn poll_keys(window: &Window, machine: &mut Machine, held: &mut [bool; 16]) {
    for (key, chip_key) in KEYMAP {
        let down = window.is_key_down(key);
        let slot = &mut held[chip_key as usize];
        if *slot != down {
            debug!("key {chip_key:X} {}", if down { "down" } else { "up" });
            *slot = down;
            machine.set_key(chip_key, down);
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let settings = Settings::from(Args::parse());
    settings.validate()?;

    let rom = read_rom_file(&settings.rom_path)?;
    let mut machine = Machine::new(&rom)
        .with_context(|| format!("loading {}", settings.rom_path.display()))?;
    info!(
        "loaded {} ({} bytes), {} ips",
        settings.rom_path.display(),
        rom.len(),
        settings.instructions_per_second
    );

    let mut window = Window::new(
        "chipvm - ESC to exit",
        WIDTH,
        HEIGHT,
        WindowOptions {
            scale: window_scale(settings.scale)?,
            ..WindowOptions::default()
        },
    )?;
    window.limit_update_rate(Some(Duration::from_secs(1) / settings.timer_hz));

    let mut pixel_buffer = vec![PIXEL_OFF; PIXEL_COUNT];
    let mut held = [false; 16];
    let steps_per_frame = settings.steps_per_tick();

    while window.is_open() && !window.is_key_down(Key::Escape) {
        poll_keys(&window, &mut machine, &mut held);

        for _ in 0..steps_per_frame {
            if let Err(fault) = machine.step() {
                let pc = machine.pc();
                let opcode = machine.memory().read_u16(pc).ok();
                match opcode {
                    Some(op) => error!("{fault} at {pc:#05x} (opcode {op:04X})"),
                    None => error!("{fault} at {pc:#05x}"),
                }
                bail!("machine halted: {fault}");
            }
        }
        machine.tick_timers();

        if machine.take_display_dirty() {
            for (out, &lit) in pixel_buffer.iter_mut().zip(machine.display_pixels()) {
                *out = if lit { PIXEL_ON } else { PIXEL_OFF };
            }
            window.update_with_buffer(&pixel_buffer, WIDTH, HEIGHT)?;
        } else {
            window.update();
        }
    }

    Ok(())
}
