//! Sega Master System: Z80 + VDP (Mode 4) + PSG, a memory-control register
//! that banks the BIOS/cartridge/RAM in and out, three auto-detected
//! cartridge mapper layouts, on-cartridge SRAM, and the SDSC debug console.
//!
//! Grounded on `sms.c`'s `sms_memory_read`/`sms_memory_write`, its
//! minimal-BIOS boot path for carts run without a BIOS image, and its
//! (also unimplemented) V/H-counter read stubs.

use tristar_core::core::bus::InterruptState;
use tristar_core::core::machine::{InputButton, Machine};
use tristar_core::core::{Bus, BusMaster, BusMasterComponent};
use tristar_core::cpu::z80::Z80;
use tristar_core::cpu::Cpu;
use tristar_core::device::{Psg, TvSystem, Vdp};

use crate::gamepad::GamepadState;
use crate::mapper::SmsMapper;
use crate::rom_loader::LoadedRom;

const CYCLES_PER_SCANLINE: u64 = 228;
const RAM_SIZE: usize = 0x2000;
const SRAM_SIZE: usize = 0x2000;

/// Memory-control register bits (port 0x3E).
const MEMCTL_BIOS_DISABLE: u8 = 0x08;
const MEMCTL_RAM_DISABLE: u8 = 0x10;
const MEMCTL_CART_DISABLE: u8 = 0x40;

/// I/O-control register bits (port 0x3F): TH/TR direction and level for
/// each controller port's extra pins.
const IOCTL_TH_A_DIRECTION: u8 = 0x02;
const IOCTL_TH_B_DIRECTION: u8 = 0x08;
const IOCTL_TH_A_LEVEL: u8 = 0x20;
const IOCTL_TH_B_LEVEL: u8 = 0x80;

/// Export (non-Japan) consoles wire the TH pins back to the CPU through
/// port 0xDD; Japan-region consoles leave them floating and the paddle
/// free-runs its own clock instead. This crate always emulates export
/// wiring (see DESIGN.md).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Region {
    World,
}

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
const INPUT_START: u8 = 12;

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
    InputButton { id: INPUT_START, name: "Start / Pause" },
];

pub struct SmsSystem {
    cpu: Z80,
    vdp: Vdp,
    psg: Psg,
    gamepad: GamepadState,

    bios: Option<Vec<u8>>,
    rom: Vec<u8>,
    rom_mask: usize,
    mapper: SmsMapper,
    ram: [u8; RAM_SIZE],
    sram: [u8; SRAM_SIZE],
    sram_modified: bool,
    rom_hash: [u8; 12],

    memory_control: u8,
    io_control: u8,
    region: Region,
    /// Latches once a TH handshake has been observed on port A, matching
    /// the real paddle's behaviour of staying in export mode once clocked.
    export_paddle: bool,

    tv_system: TvSystem,
    clock_rate: u32,
    millicycles: u64,
    ready: bool,

    framebuffer: Vec<u8>,
    frame_width: usize,
    frame_height: usize,
}

impl SmsSystem {
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
            bios: None,
            rom: Vec::new(),
            rom_mask: 0,
            mapper: SmsMapper::new(),
            ram: [0; RAM_SIZE],
            sram: [0; SRAM_SIZE],
            sram_modified: false,
            rom_hash: [0; 12],
            // No BIOS disables BIOS/IO, no RAM/cart disabled, matching a
            // cold-boot register image when `boot_without_bios` runs.
            memory_control: 0,
            io_control: 0,
            region: Region::World,
            export_paddle: false,
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
        self.bios = Some(bios);
    }

    pub fn load_rom(&mut self, rom: LoadedRom) {
        self.rom = rom.data;
        self.rom_mask = rom.mask;
        self.rom_hash = rom.hash;
    }

    pub fn load_sram(&mut self, data: &[u8]) {
        let len = data.len().min(SRAM_SIZE);
        self.sram[..len].copy_from_slice(&data[..len]);
    }

    pub fn rom_hash(&self) -> [u8; 12] {
        self.rom_hash
    }

    /// SRAM contents if they've been written since load, for the host to
    /// persist; mirrors `Machine::sync`'s contract at the system level.
    pub fn sram_if_modified(&mut self) -> Option<&[u8]> {
        if self.sram_modified {
            self.sram_modified = false;
            Some(&self.sram)
        } else {
            None
        }
    }

    pub fn gamepad_mut(&mut self) -> &mut GamepadState {
        &mut self.gamepad
    }

    /// When no BIOS is supplied, the cartridge must be entered directly.
    /// The real BIOS's boot code sets IM 1, a top-of-RAM stack, and
    /// configures the VDP into Mode 4 before jumping to the cartridge;
    /// without a BIOS to run that sequence, it's replicated here.
    fn boot_without_bios(&mut self) {
        self.cpu.reset();
        self.memory_control = MEMCTL_BIOS_DISABLE;
        self.vdp.write_control(0x04);
        self.vdp.write_control(0x80 | 0x01);
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
        self.gamepad.port_1.paddle.tick_clock();
        self.gamepad.port_2.paddle.tick_clock();

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

    fn bios_enabled(&self) -> bool {
        self.bios.is_some() && self.memory_control & MEMCTL_BIOS_DISABLE == 0
    }

    fn cart_enabled(&self) -> bool {
        self.memory_control & MEMCTL_CART_DISABLE == 0
    }

    fn ram_enabled(&self) -> bool {
        self.memory_control & MEMCTL_RAM_DISABLE == 0
    }

    /// True once port A's TH pin has been driven high under CPU control,
    /// which switches a paddle from free-running its own clock to being
    /// sampled by the TH handshake instead.
    fn th_a_driven_high(&self) -> bool {
        self.io_control & IOCTL_TH_A_DIRECTION == 0 && self.io_control & IOCTL_TH_A_LEVEL != 0
    }

    fn joystick_port_a(&mut self) -> u8 {
        let p2 = self.gamepad.port_2.joystick;
        let mut v;

        if self.gamepad.port_1.paddle_mode {
            if self.region == Region::World && self.th_a_driven_high() {
                self.export_paddle = true;
            }
            let phase = if self.export_paddle {
                self.th_a_driven_high()
            } else {
                self.gamepad.port_1.paddle.flip_clock()
            };
            let button_released = !(self.gamepad.port_1.joystick.button_1
                || self.gamepad.port_1.joystick.button_2);
            let position = self.gamepad.port_1.paddle.position;
            v = if !phase {
                (position & 0x0F) | if button_released { 0x10 } else { 0 }
            } else {
                (position >> 4) | if button_released { 0x10 } else { 0 } | 0x20
            };
        } else {
            let p1 = self.gamepad.port_1.joystick;
            v = 0xFFu8;
            if p1.up { v &= !0x01; }
            if p1.down { v &= !0x02; }
            if p1.left { v &= !0x04; }
            if p1.right { v &= !0x08; }
            if p1.button_1 { v &= !0x10; }
            if p1.button_2 { v &= !0x20; }
        }

        if p2.up { v &= !0x40; }
        if p2.down { v &= !0x80; }
        v
    }

    /// Port B carries player 2's left/right/buttons, the (unimplemented)
    /// reset button, and the TH-pin loopback for both controller ports.
    fn joystick_port_b(&mut self) -> u8 {
        let p2 = self.gamepad.port_2.joystick;
        let mut v = 0u8;
        if !p2.left { v |= 0x01; }
        if !p2.right { v |= 0x02; }
        if !p2.button_1 { v |= 0x04; }
        if !p2.button_2 { v |= 0x08; }
        v |= 0x10; // reset button unimplemented, always released

        let mut port_1_th = false;
        let mut port_2_th = false;
        if self.region == Region::World {
            if self.io_control & IOCTL_TH_A_DIRECTION == 0 {
                port_1_th = self.io_control & IOCTL_TH_A_LEVEL != 0;
                if self.gamepad.port_1.paddle_mode {
                    self.export_paddle = true;
                }
            }
            if self.io_control & IOCTL_TH_B_DIRECTION == 0 {
                port_2_th = self.io_control & IOCTL_TH_B_LEVEL != 0;
            }
        }
        if port_1_th { v |= 0x40; }
        if port_2_th { v |= 0x80; }
        v
    }
}

impl Bus for SmsSystem {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        match addr {
            0x0000..=0xBFFF => {
                if addr < 0x0400 && self.bios_enabled() {
                    // The first KiB is never banked on either BIOS or cart,
                    // matching the slot-0-first-1-KiB protection below it.
                    return self.bios.as_ref().unwrap()[addr as usize];
                }
                if self.bios_enabled() {
                    let bios = self.bios.as_ref().unwrap();
                    let mask = bios.len().saturating_sub(1);
                    return bios[addr as usize & mask];
                }
                if self.cart_enabled() && !self.rom.is_empty() {
                    if self.mapper.sram_enable() && (0x8000..0xC000).contains(&addr) {
                        return self.sram[(addr - 0x8000) as usize & (SRAM_SIZE - 1)];
                    }
                    return self.mapper.read(&self.rom, self.rom_mask, addr);
                }
                0xFF
            }
            0xC000..=0xFFFF => {
                if self.ram_enabled() {
                    self.ram[addr as usize & (RAM_SIZE - 1)]
                } else {
                    0xFF
                }
            }
        }
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        match addr {
            0x0000..=0xBFFF => {
                if self.mapper.sram_enable() && (0x8000..0xC000).contains(&addr) {
                    self.sram[(addr - 0x8000) as usize & (SRAM_SIZE - 1)] = data;
                    self.sram_modified = true;
                } else {
                    self.mapper.write(addr, data);
                }
            }
            0xC000..=0xFFFF => {
                if self.ram_enabled() {
                    self.ram[addr as usize & (RAM_SIZE - 1)] = data;
                }
                // Mapper registers live at the top of this range and are
                // wired up regardless of the RAM-disable bit.
                self.mapper.write(addr, data);
            }
        }
    }

    fn io_read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        let port = (addr & 0xFF) as u8;
        match port {
            0x00..=0x3F => 0xFF,
            0x40..=0x7F => {
                if port & 0x01 == 0 {
                    self.vdp.v_counter()
                } else {
                    eprintln!("Warning: H-counter read (port 0x7F/odd) is unimplemented");
                    0xFF
                }
            }
            0x80..=0xBF => {
                if port & 0x01 == 0 {
                    self.vdp.read_data()
                } else {
                    self.vdp.read_status()
                }
            }
            0xC0..=0xFF => {
                if port & 0x01 == 0 {
                    self.joystick_port_a()
                } else {
                    self.joystick_port_b()
                }
            }
        }
    }

    fn io_write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        let port = (addr & 0xFF) as u8;
        match port {
            0x3E => self.memory_control = data,
            0x3F => self.io_control = data,
            0x40..=0x7F => self.psg.write(data),
            0x80..=0xBF => {
                if port & 0x01 == 0 {
                    self.vdp.write_data(data);
                } else {
                    self.vdp.write_control(data);
                }
            }
            0xFD if self.memory_control & 0x04 != 0 => {
                print!("{}", data as char);
            }
            _ => {}
        }
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState {
            nmi: self.gamepad.port_1.joystick.start,
            irq: self.vdp.interrupt_pending(),
            irq_vector: 0xFF,
        }
    }
}

impl Machine for SmsSystem {
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
            INPUT_START => self.gamepad.port_1.joystick.start = pressed,
            _ => {}
        }
    }

    fn input_map(&self) -> &[InputButton] {
        INPUT_MAP
    }

    fn reset(&mut self) {
        self.vdp.reset();
        self.psg.reset();
        self.mapper.reset();
        self.memory_control = 0;
        self.io_control = 0;
        self.export_paddle = false;
        self.millicycles = 0;
        self.ready = false;
        if self.bios.is_none() {
            self.boot_without_bios();
        } else {
            self.cpu.reset();
        }
    }

    fn is_ready(&self) -> bool {
        self.ready && !self.cpu.is_faulted()
    }
}
