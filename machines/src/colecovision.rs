//! ColecoVision: Z80 + VDP + PSG, with a small fixed memory map (no
//! cartridge banking — the format only ever shipped up to 32 KiB carts)
//! and a controller port that multiplexes between joystick and keypad
//! readings depending on which I/O-mode range was last written.
//!
//! No emulator source for this console was available as direct grounding
//! (unlike SG-1000/SMS, whose behavior follows `sg-1000.c`/`sms.c`
//! closely); the memory map and controller protocol here follow the
//! console's well-documented public hardware reference instead, built
//! in the same Bus/Machine shape as the other two machines.

use tristar_core::core::bus::InterruptState;
use tristar_core::core::machine::{InputButton, Machine};
use tristar_core::core::{Bus, BusMaster, BusMasterComponent};
use tristar_core::cpu::z80::Z80;
use tristar_core::cpu::Cpu;
use tristar_core::device::{Psg, TvSystem, Vdp};

use crate::gamepad::GamepadState;
use crate::rom_loader::LoadedRom;

const CYCLES_PER_SCANLINE: u64 = 228;
const RAM_SIZE: usize = 0x400;
const BIOS_SIZE: usize = 0x2000;

const INPUT_P1_UP: u8 = 0;
const INPUT_P1_DOWN: u8 = 1;
const INPUT_P1_LEFT: u8 = 2;
const INPUT_P1_RIGHT: u8 = 3;
const INPUT_P1_B1: u8 = 4;
const INPUT_P1_B2: u8 = 5;
const INPUT_P2_UP: u8 = 6;
const INPUT_P2_DOWN: u8 = 7;
const INPUT_P2_LEFT: u8 = 8;
const INPUT_P2_RIGHT: u8 = 9;
const INPUT_P2_B1: u8 = 10;
const INPUT_P2_B2: u8 = 11;

static INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_P1_UP, name: "P1 Up" },
    InputButton { id: INPUT_P1_DOWN, name: "P1 Down" },
    InputButton { id: INPUT_P1_LEFT, name: "P1 Left" },
    InputButton { id: INPUT_P1_RIGHT, name: "P1 Right" },
    InputButton { id: INPUT_P1_B1, name: "P1 Button 1" },
    InputButton { id: INPUT_P1_B2, name: "P1 Button 2" },
    InputButton { id: INPUT_P2_UP, name: "P2 Up" },
    InputButton { id: INPUT_P2_DOWN, name: "P2 Down" },
    InputButton { id: INPUT_P2_LEFT, name: "P2 Left" },
    InputButton { id: INPUT_P2_RIGHT, name: "P2 Right" },
    InputButton { id: INPUT_P2_B1, name: "P2 Button 1" },
    InputButton { id: INPUT_P2_B2, name: "P2 Button 2" },
];

/// Which reading the 0xFC/0xFE controller ports currently return, set by
/// writes to the 0x80-0x9F (keypad) / 0xC0-0xDF (joystick) ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IoMode {
    Keypad,
    Joystick,
}

pub struct ColecoVisionSystem {
    cpu: Z80,
    vdp: Vdp,
    psg: Psg,
    gamepad: GamepadState,

    bios: Vec<u8>,
    rom: Vec<u8>,
    ram: [u8; RAM_SIZE],

    io_mode: IoMode,

    tv_system: TvSystem,
    clock_rate: u32,
    millicycles: u64,
    ready: bool,

    framebuffer: Vec<u8>,
    frame_width: usize,
    frame_height: usize,
}

impl ColecoVisionSystem {
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
            bios: Vec::new(),
            rom: Vec::new(),
            ram: [0; RAM_SIZE],
            io_mode: IoMode::Joystick,
            tv_system,
            clock_rate,
            millicycles: 0,
            ready: false,
            framebuffer: vec![0; 256 * 192 * 3],
            frame_width: 256,
            frame_height: 192,
        }
    }

    pub fn load_bios(&mut self, bios: Vec<u8>) {
        self.bios = bios;
    }

    /// Cartridges are direct-mapped with no banking, so only `data` is
    /// needed; the mask/hash `LoadedRom` carries for SG-1000/SMS-style
    /// bank arithmetic go unused here.
    pub fn load_rom(&mut self, rom: LoadedRom) {
        self.rom = rom.data;
    }

    pub fn gamepad_mut(&mut self) -> &mut GamepadState {
        &mut self.gamepad
    }

    fn lines_per_frame(&self) -> u32 {
        match self.tv_system {
            TvSystem::Ntsc => 262,
            TvSystem::Pal => 313,
        }
    }

    fn run_scanline(&mut self) {
        let bus_ptr: *mut Self = self;
        for _ in 0..CYCLES_PER_SCANLINE {
            unsafe {
                let bus = &mut *bus_ptr as &mut dyn Bus<Address = u16, Data = u8>;
                self.cpu.tick_with_bus(bus, BusMaster::Cpu(0));
            }
        }
        self.psg.run_cycles(CYCLES_PER_SCANLINE);

        if self.vdp.run_line() {
            self.ready = true;
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

    /// Port 0xFC: P1 joystick directions/buttons in joystick mode, P1
    /// keypad nibble plus button 1 in keypad mode.
    fn controller_port_1(&self) -> u8 {
        match self.io_mode {
            IoMode::Joystick => {
                let j = &self.gamepad.port_1.joystick;
                let mut v = 0xFFu8;
                if j.up { v &= !0x01; }
                if j.right { v &= !0x02; }
                if j.down { v &= !0x04; }
                if j.left { v &= !0x08; }
                if j.button_1 { v &= !0x40; }
                v
            }
            IoMode::Keypad => {
                let nibble = GamepadState::colecovision_keypad_nibble(self.gamepad.port_1.keypad);
                let button_bit = if self.gamepad.port_1.joystick.button_2 { 0 } else { 0x40 };
                nibble | 0xB0 | button_bit
            }
        }
    }

    /// Port 0xFE: same encoding, for P2.
    fn controller_port_2(&self) -> u8 {
        match self.io_mode {
            IoMode::Joystick => {
                let j = &self.gamepad.port_2.joystick;
                let mut v = 0xFFu8;
                if j.up { v &= !0x01; }
                if j.right { v &= !0x02; }
                if j.down { v &= !0x04; }
                if j.left { v &= !0x08; }
                if j.button_1 { v &= !0x40; }
                v
            }
            IoMode::Keypad => {
                let nibble = GamepadState::colecovision_keypad_nibble(self.gamepad.port_2.keypad);
                let button_bit = if self.gamepad.port_2.joystick.button_2 { 0 } else { 0x40 };
                nibble | 0xB0 | button_bit
            }
        }
    }
}

impl Bus for ColecoVisionSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => {
                if self.bios.is_empty() {
                    0xFF
                } else {
                    let mask = self.bios.len().min(BIOS_SIZE) - 1;
                    self.bios[addr as usize & mask]
                }
            }
            0x2000..=0x5FFF => 0xFF,
            0x6000..=0x7FFF => self.ram[addr as usize & (RAM_SIZE - 1)],
            0x8000..=0xFFFF => {
                if self.rom.is_empty() {
                    0xFF
                } else {
                    let offset = (addr - 0x8000) as usize;
                    if offset < self.rom.len() {
                        self.rom[offset]
                    } else {
                        0xFF
                    }
                }
            }
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.ram[addr as usize & (RAM_SIZE - 1)] = data;
        }
        // BIOS, cartridge ROM, and the unmapped gap are not writable.
    }

    fn io_read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let port = (addr & 0xFF) as u8;
        match port {
            0xA0..=0xBF => {
                if port & 0x01 == 0 {
                    self.vdp.read_data()
                } else {
                    self.vdp.read_status()
                }
            }
            0xE0..=0xFF => {
                if port & 0x02 == 0 {
                    self.controller_port_1()
                } else {
                    self.controller_port_2()
                }
            }
            _ => 0xFF,
        }
    }

    fn io_write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let port = (addr & 0xFF) as u8;
        match port {
            0x80..=0x9F => self.io_mode = IoMode::Keypad,
            0xC0..=0xDF => self.io_mode = IoMode::Joystick,
            0xA0..=0xBF => {
                if port & 0x01 == 0 {
                    self.vdp.write_data(data);
                } else {
                    self.vdp.write_control(data);
                }
            }
            0xE0..=0xFF => self.psg.write(data),
            _ => {}
        }
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState { nmi: self.vdp.interrupt_pending(), irq: false, irq_vector: 0xFF }
    }
}

impl Machine for ColecoVisionSystem {
    fn display_size(&self) -> (u32, u32) {
        (self.frame_width as u32, self.frame_height as u32)
    }

    fn run(&mut self, ms: f64) {
        self.millicycles += (ms * self.clock_rate as f64) as u64;
        while self.millicycles >= CYCLES_PER_SCANLINE * 1000 {
            self.millicycles -= CYCLES_PER_SCANLINE * 1000;
            self.run_scanline();
        }
    }

    fn frame_rate_hz(&self) -> f64 {
        self.clock_rate as f64 / (CYCLES_PER_SCANLINE as f64 * self.lines_per_frame() as f64)
    }

    fn get_clock_rate(&self) -> u32 {
        self.clock_rate
    }

    fn render_frame(&self, buffer: &mut [u8]) {
        let len = buffer.len().min(self.framebuffer.len());
        buffer[..len].copy_from_slice(&self.framebuffer[..len]);
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
        self.io_mode = IoMode::Joystick;
        self.millicycles = 0;
        self.ready = false;
    }

    fn is_ready(&self) -> bool {
        self.ready && !self.cpu.is_faulted()
    }
}
