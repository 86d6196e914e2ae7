//! Thin re-export layer over `tristar_machines::rom_loader`: this
//! format is always a single raw binary file, so there's no MAME-style
//! rompath/ZIP resolution left to do here — just a stable set of names
//! for `main.rs` to call.

use std::path::Path;

use tristar_machines::rom_loader::{self, LoadedRom, RomLoadError};

pub fn load_rom(path: &Path) -> Result<LoadedRom, RomLoadError> {
    rom_loader::load_rom(path)
}

pub fn load_bios(path: &Path) -> Result<Vec<u8>, RomLoadError> {
    rom_loader::load_bios(path)
}

pub fn load_sram(dir: &Path, hash: &[u8; 12]) -> Option<Vec<u8>> {
    rom_loader::load_sram(dir, hash)
}

pub fn save_sram(dir: &Path, hash: &[u8; 12], data: &[u8]) -> Result<(), RomLoadError> {
    rom_loader::save_sram(dir, hash, data)
}
