use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tristar_core::core::machine::Machine;
use tristar_core::device::TvSystem;
use tristar_machines::{ColecoVisionSystem, Sg1000System, SmsSystem};

mod emulator;
mod rom_path;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum System {
    Sg1000,
    Sms,
    Colecovision,
}

/// Headless multi-system emulation core driver: loads a BIOS/ROM pair,
/// runs a bounded number of frames, and saves cartridge SRAM if modified.
#[derive(Parser, Debug)]
#[command(name = "tristar")]
struct Args {
    /// Console to emulate.
    #[arg(long, value_enum)]
    system: System,

    /// BIOS image path. Required for SMS and ColecoVision; optional for
    /// SG-1000, which has none.
    #[arg(short = 'b', long)]
    bios: Option<PathBuf>,

    /// Cartridge ROM image path.
    #[arg(short = 'r', long)]
    rom: PathBuf,

    /// Number of frames to run before exiting.
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Directory to load/save cartridge SRAM. Defaults to the ROM's
    /// parent directory.
    #[arg(long)]
    sram_dir: Option<PathBuf>,
}

/// Owns whichever concrete console was selected, so SRAM persistence can
/// reach `SmsSystem::sram_if_modified` after the run loop without a
/// downcast from `dyn Machine`.
enum AnyMachine {
    Sg1000(Sg1000System),
    Sms(SmsSystem),
    Colecovision(ColecoVisionSystem),
}

impl AnyMachine {
    fn as_machine_mut(&mut self) -> &mut dyn Machine {
        match self {
            Self::Sg1000(m) => m,
            Self::Sms(m) => m,
            Self::Colecovision(m) => m,
        }
    }
}

fn main() {
    let args = Args::parse();

    let rom = match rom_path::load_rom(&args.rom) {
        Ok(rom) => rom,
        Err(e) => {
            eprintln!("Error: failed to load ROM {}: {e}", args.rom.display());
            std::process::exit(1);
        }
    };

    let sram_dir = args
        .sram_dir
        .clone()
        .or_else(|| args.rom.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let rom_hash = rom.hash;

    let mut machine = match args.system {
        System::Sg1000 => {
            let mut sys = Sg1000System::new(TvSystem::Ntsc);
            sys.load_rom(rom);
            AnyMachine::Sg1000(sys)
        }
        System::Sms => {
            let mut sys = SmsSystem::new(TvSystem::Ntsc);
            if let Some(bios_path) = &args.bios {
                match rom_path::load_bios(bios_path) {
                    Ok(bios) => sys.load_bios(bios),
                    Err(e) => {
                        eprintln!("Warning: failed to load BIOS {}: {e}", bios_path.display());
                    }
                }
            }
            if let Some(data) = rom_path::load_sram(&sram_dir, &rom_hash) {
                sys.load_sram(&data);
            }
            sys.load_rom(rom);
            AnyMachine::Sms(sys)
        }
        System::Colecovision => {
            let mut sys = ColecoVisionSystem::new(TvSystem::Ntsc);
            match &args.bios {
                Some(bios_path) => match rom_path::load_bios(bios_path) {
                    Ok(bios) => sys.load_bios(bios),
                    Err(e) => {
                        eprintln!("Error: failed to load BIOS {}: {e}", bios_path.display());
                        std::process::exit(1);
                    }
                },
                None => {
                    eprintln!("Error: ColecoVision requires a BIOS image (-b)");
                    std::process::exit(1);
                }
            }
            sys.load_rom(rom);
            AnyMachine::Colecovision(sys)
        }
    };

    machine.as_machine_mut().reset();
    if !machine.as_machine_mut().is_ready() {
        eprintln!("Error: machine failed to initialize, not entering run loop");
        std::process::exit(1);
    }

    emulator::run(machine.as_machine_mut(), args.frames);

    if let AnyMachine::Sms(sys) = &mut machine {
        if let Some(data) = sys.sram_if_modified() {
            if let Err(e) = rom_path::save_sram(&sram_dir, &rom_hash, data) {
                eprintln!("Warning: failed to save SRAM: {e}");
            }
        }
    }
}
