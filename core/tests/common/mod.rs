use tristar_core::core::{bus::InterruptState, Bus, BusMaster};

/// Minimal bus for testing: flat 64KB memory for both data and I/O ports,
/// no peripherals.
pub struct TestBus {
    pub memory: [u8; 0x10000],
    pub io: [u8; 0x100],
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            memory: [0; 0x10000],
            io: [0; 0x100],
        }
    }

    pub fn load(&mut self, addr: u16, data: &[u8]) {
        let start = addr as usize;
        self.memory[start..start + data.len()].copy_from_slice(data);
    }
}

impl Bus for TestBus {
    type Address = u16;
    type Data = u8;

    fn read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        self.memory[addr as usize]
    }

    fn write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        self.memory[addr as usize] = data;
    }

    fn io_read(&mut self, _master: BusMaster, addr: u16) -> u8 {
        self.io[(addr & 0xFF) as usize]
    }

    fn io_write(&mut self, _master: BusMaster, addr: u16, data: u8) {
        self.io[(addr & 0xFF) as usize] = data;
    }

    fn check_interrupts(&self, _target: BusMaster) -> InterruptState {
        InterruptState::default()
    }
}
