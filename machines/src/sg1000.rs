//! Sega SG-1000 machine wiring: Z80 + TMS9918A VDP + SN76489 PSG behind a
//! 3-slot 16 KiB Sega-style cartridge mapper and 1 KiB mirrored work RAM.
//!
//! Grounded on `examples/original_source/Source/sg-1000.c`'s memory/IO
//! decode and 228-cycles-per-scanline run loop.

use tristar_core::core::bus::InterruptState;
use tristar_core::core::machine::{InputButton, Machine};
use tristar_core::core::{Bus, BusMaster, BusMasterComponent};
use tristar_core::cpu::z80::Z80;
use tristar_core::cpu::Cpu;
use tristar_core::device::{Psg, TvSystem, Vdp};

use crate::gamepad::GamepadState;
use crate::mapper::BankMapper;
use crate::rom_loader::LoadedRom;

const CYCLES_PER_SCANLINE: u64 = 228;
const RAM_SIZE: usize = 0x400;

pub const INPUT_P1_UP: u8 = 0;
pub const INPUT_P1_DOWN: u8 = 1;
pub const INPUT_P1_LEFT: u8 = 2;
pub const INPUT_P1_RIGHT: u8 = 3;
pub const INPUT_P1_B1: u8 = 4;
pub const INPUT_P1_B2: u8 = 5;
pub const INPUT_P1_START: u8 = 6;
pub const INPUT_P2_UP: u8 = 7;
pub const INPUT_P2_DOWN: u8 = 8;
pub const INPUT_P2_LEFT: u8 = 9;
pub const INPUT_P2_RIGHT: u8 = 10;
pub const INPUT_P2_B1: u8 = 11;
pub const INPUT_P2_B2: u8 = 12;

const INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_P1_UP, name: "P1 Up" },
    InputButton { id: INPUT_P1_DOWN, name: "P1 Down" },
    InputButton { id: INPUT_P1_LEFT, name: "P1 Left" },
    InputButton { id: INPUT_P1_RIGHT, name: "P1 Right" },
    InputButton { id: INPUT_P1_B1, name: "P1 Button 1" },
    InputButton { id: INPUT_P1_B2, name: "P1 Button 2" },
    InputButton { id: INPUT_P1_START, name: "P1 Start/Pause" },
    InputButton { id: INPUT_P2_UP, name: "P2 Up" },
    InputButton { id: INPUT_P2_DOWN, name: "P2 Down" },
    InputButton { id: INPUT_P2_LEFT, name: "P2 Left" },
    InputButton { id: INPUT_P2_RIGHT, name: "P2 Right" },
    InputButton { id: INPUT_P2_B1, name: "P2 Button 1" },
    InputButton { id: INPUT_P2_B2, name: "P2 Button 2" },
];

/// Sega SG-1000 (1983): Z80 @ 3.58/3.55 MHz, TMS9918A VDP, SN76489 PSG.
pub struct Sg1000System {
    cpu: Z80,
    vdp: Vdp,
    psg: Psg,
    gamepad: GamepadState,

    rom: Vec<u8>,
    rom_mask: usize,
    mapper: BankMapper,
    ram: [u8; RAM_SIZE],

    tv_system: TvSystem,
    clock_rate: u32,
    millicycles: u64,
    ready: bool,

    framebuffer: Vec<u8>,
    frame_width: usize,
    frame_height: usize,
}

impl Sg1000System {
    pub fn new(tv_system: TvSystem) -> Self {
        let clock_rate = match tv_system {
            TvSystem::Ntsc => 3_579_545,
            TvSystem::Pal => 3_546_893,
        };
        Self {
            cpu: Z80::new(),
            vdp: Vdp::new(tv_system),
            psg: Psg::new(),
            gamepad: GamepadState::new(),
            rom: Vec::new(),
            rom_mask: 0,
            mapper: BankMapper::new([0, 1, 2], true),
            ram: [0; RAM_SIZE],
            tv_system,
            clock_rate,
            millicycles: 0,
            ready: false,

            framebuffer: vec![0; 256 * 192 * 3],
            frame_width: 256,
            frame_height: 192,
        }
    }

    pub fn load_rom(&mut self, rom: LoadedRom) {
        self.rom = rom.data;
        self.rom_mask = rom.mask;
        self.ready = true;
    }

    pub fn gamepad_mut(&mut self) -> &mut GamepadState {
        &mut self.gamepad
    }

    fn run_scanline(&mut self) {
        let bus_ptr: *mut Self = self;
        for _ in 0..CYCLES_PER_SCANLINE {
            // SAFETY: `cpu` is disjoint from the rest of `self`'s fields the
            // Bus impl touches; this mirrors the donor's own aliasing
            // pattern for a struct that is both CPU owner and Bus.
            unsafe {
                let bus = &mut *bus_ptr as &mut dyn Bus<Address = u16, Data = u8>;
                self.cpu.tick_with_bus(bus, BusMaster::Cpu(0));
            }
        }
        self.psg.run_cycles(CYCLES_PER_SCANLINE);
        if self.vdp.run_line() {
            if let Some((width, height, pixels)) = self.vdp.take_frame() {
                self.frame_width = width;
                self.frame_height = height;
                self.framebuffer.resize(width * height * 3, 0);
                for (i, &rgb) in pixels.iter().enumerate() {
                    let off = i * 3;
                    self.framebuffer[off] = (rgb >> 16) as u8;
                    self.framebuffer[off + 1] = (rgb >> 8) as u8;
                    self.framebuffer[off + 2] = rgb as u8;
                }
            }
        }
    }

    fn joypad_port_a(&self) -> u8 {
        let p1 = &self.gamepad.port_1.joystick;
        let p2 = &self.gamepad.port_2.joystick;
        let mut v = 0xFFu8;
        if p1.up { v &= !0x01; }
        if p1.down { v &= !0x02; }
        if p1.left { v &= !0x04; }
        if p1.right { v &= !0x08; }
        if p1.button_1 { v &= !0x10; }
        if p1.button_2 { v &= !0x20; }
        if p2.up { v &= !0x40; }
        if p2.down { v &= !0x80; }
        v
    }

    fn joypad_port_b(&self) -> u8 {
        let p2 = &self.gamepad.port_2.joystick;
        let mut v = 0xFFu8;
        if p2.left { v &= !0x01; }
        if p2.right { v &= !0x02; }
        if p2.button_1 { v &= !0x04; }
        if p2.button_2 { v &= !0x08; }
        v
    }
}

impl Default for Sg1000System {
    fn default() -> Self {
        Self::new(TvSystem::Ntsc)
    }
}

impl Bus for Sg1000System {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        match addr {
            0x0000..=0xBFFF => {
                if self.rom.is_empty() {
                    0xFF
                } else {
                    self.mapper.read(&self.rom, self.rom_mask, addr)
                }
            }
            0xC000..=0xFFFF => self.ram[(addr & 0x3FF) as usize],
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        match addr {
            0x0000..=0xBFFF => { /* ROM: read-only */ }
            0xC000..=0xFFFF => {
                match addr {
                    0xFFFD => self.mapper.set_bank(0, data),
                    0xFFFE => self.mapper.set_bank(1, data),
                    0xFFFF => self.mapper.set_bank(2, data),
                    _ => {}
                }
                // Mapper registers are aliased onto RAM: the write also lands here.
                self.ram[(addr & 0x3FF) as usize] = data;
            }
        }
    }

    fn io_read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let port = (addr & 0xFF) as u8;
        match port {
            0x80..=0xBF => {
                if port % 2 == 0 {
                    self.vdp.read_data()
                } else {
                    self.vdp.read_status()
                }
            }
            0xC0..=0xFF => {
                if port % 2 == 0 {
                    self.joypad_port_a()
                } else {
                    self.joypad_port_b()
                }
            }
            _ => 0xFF,
        }
    }

    fn io_write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let port = (addr & 0xFF) as u8;
        match port {
            0x40..=0x7F => self.psg.write(data),
            0x80..=0xBF => {
                if port % 2 == 0 {
                    self.vdp.write_data(data);
                } else {
                    self.vdp.write_control(data);
                }
            }
            _ => {}
        }
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: self.gamepad.port_1.joystick.start,
            irq: self.vdp.interrupt_pending(),
            irq_vector: 0xFF, // IM 1 on SG-1000: RST 38h, vector unused
        }
    }
}

impl Machine for Sg1000System {
    fn display_size(&self) -> (u32, u32) {
        (self.frame_width as u32, self.frame_height as u32)
    }

    fn run(&mut self, ms: f64) {
        self.millicycles += (ms * self.clock_rate as f64) as u64;
        let lines = self.millicycles / 228_000;
        self.millicycles -= lines * 228_000;
        for _ in 0..lines {
            self.run_scanline();
        }
    }

    fn frame_rate_hz(&self) -> f64 {
        let lines_total = match self.tv_system {
            TvSystem::Ntsc => 262.0,
            TvSystem::Pal => 313.0,
        };
        self.clock_rate as f64 / (CYCLES_PER_SCANLINE as f64 * lines_total)
    }

    fn get_clock_rate(&self) -> u32 {
        self.clock_rate
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        let n = self.framebuffer.len().min(buffer.len());
        buffer[..n].copy_from_slice(&self.framebuffer[..n]);
    }

    fn audio_callback(&mut self, out: &mut [i16]) {
        self.psg.get_samples(out, self.clock_rate, 48_000);
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        let p1 = &mut self.gamepad.port_1.joystick;
        let p2 = &mut self.gamepad.port_2.joystick;
        match button {
            INPUT_P1_UP => p1.up = pressed,
            INPUT_P1_DOWN => p1.down = pressed,
            INPUT_P1_LEFT => p1.left = pressed,
            INPUT_P1_RIGHT => p1.right = pressed,
            INPUT_P1_B1 => p1.button_1 = pressed,
            INPUT_P1_B2 => p1.button_2 = pressed,
            INPUT_P1_START => p1.start = pressed,
            INPUT_P2_UP => p2.up = pressed,
            INPUT_P2_DOWN => p2.down = pressed,
            INPUT_P2_LEFT => p2.left = pressed,
            INPUT_P2_RIGHT => p2.right = pressed,
            INPUT_P2_B1 => p2.button_1 = pressed,
            INPUT_P2_B2 => p2.button_2 = pressed,
            _ => {}
        }
    }

    fn input_map(&self) -> &[InputButton] {
        INPUT_MAP
    }

    fn reset(&mut self) {
        self.cpu.reset();
        self.vdp.reset();
        self.psg.reset();
        self.millicycles = 0;
    }

    fn is_ready(&self) -> bool {
        self.ready && !self.cpu.is_faulted()
    }
}
