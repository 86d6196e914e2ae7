//! ROM, BIOS, and SRAM file loading for the single-raw-binary-file
//! cartridge format this core uses (no MAME-set/ZIP handling, no CRC32
//! checksum verification — this format carries none).

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading a ROM, BIOS, or SRAM file.
#[derive(Debug)]
pub enum RomLoadError {
    /// Underlying I/O error (permission denied, disk full, etc.)
    Io(std::io::Error),

    /// The requested file does not exist.
    MissingFile(String),

    /// The file's size cannot be a valid cartridge/BIOS image (e.g. empty
    /// after header removal).
    SizeMismatch { file: String, expected: usize, actual: usize },
}

impl fmt::Display for RomLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MissingFile(name) => write!(f, "missing file: {name}"),
            Self::SizeMismatch { file, expected, actual } => {
                write!(f, "{file}: expected at least {expected} bytes, got {actual}")
            }
        }
    }
}

impl std::error::Error for RomLoadError {}

impl From<std::io::Error> for RomLoadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A loaded cartridge ROM image: header-stripped bytes, a power-of-two
/// masking value for bank arithmetic, and a content hash for SRAM naming.
pub struct LoadedRom {
    pub data: Vec<u8>,
    pub mask: usize,
    pub hash: [u8; 12],
}

/// Load a cartridge ROM file. If the file size modulo 1024 is non-zero,
/// the leading `size % 1024` bytes are a header and are skipped; the
/// remainder's length is rounded up to a power of two for the mask.
pub fn load_rom(path: &Path) -> Result<LoadedRom, RomLoadError> {
    let raw = read_file(path)?;
    let header_len = raw.len() % 1024;
    let data = raw[header_len..].to_vec();
    if data.is_empty() {
        return Err(RomLoadError::SizeMismatch {
            file: path.display().to_string(),
            expected: 1,
            actual: 0,
        });
    }
    let mask = data.len().next_power_of_two() - 1;
    let hash = content_hash(&data);
    Ok(LoadedRom { data, mask, hash })
}

/// Load a BIOS image. Raw binary, power-of-two size assumed; no header
/// stripping.
pub fn load_bios(path: &Path) -> Result<Vec<u8>, RomLoadError> {
    let data = read_file(path)?;
    if data.is_empty() {
        return Err(RomLoadError::SizeMismatch {
            file: path.display().to_string(),
            expected: 1,
            actual: 0,
        });
    }
    Ok(data)
}

fn read_file(path: &Path) -> Result<Vec<u8>, RomLoadError> {
    fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RomLoadError::MissingFile(path.display().to_string())
        } else {
            RomLoadError::Io(e)
        }
    })
}

/// Load an existing SRAM file for `hash`, if one is present in `dir`.
/// Returns `None` (not an error) when no SRAM file exists yet.
pub fn load_sram(dir: &Path, hash: &[u8; 12]) -> Option<Vec<u8>> {
    fs::read(sram_path(dir, hash)).ok()
}

/// Persist `data` as the SRAM file for `hash` under `dir`.
pub fn save_sram(dir: &Path, hash: &[u8; 12], data: &[u8]) -> Result<(), RomLoadError> {
    fs::write(sram_path(dir, hash), data)?;
    Ok(())
}

/// Path of the SRAM file for a given ROM content hash.
pub fn sram_path(dir: &Path, hash: &[u8; 12]) -> PathBuf {
    dir.join(format!("{}.sram", hash_to_hex(hash)))
}

fn hash_to_hex(hash: &[u8; 12]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// 64-bit FNV-1a over `data`, starting from `seed` instead of the
/// standard offset basis so a second lane run with a different seed is
/// independent of the first.
fn fnv1a_64(data: &[u8], seed: u64) -> u64 {
    const PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = seed;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// 12-byte content hash: one full 64-bit FNV-1a lane (8 bytes) plus a
/// second lane with a different seed, truncated to its low 32 bits
/// (4 bytes) — 96 bits total, used as an SRAM filename, not as a
/// cryptographic digest.
pub fn content_hash(data: &[u8]) -> [u8; 12] {
    const OFFSET_BASIS: u64 = 0xCBF2_9CE4_8422_2325;
    const SECOND_SEED: u64 = 0x8422_2325_CBF2_9CE4;

    let lane_a = fnv1a_64(data, OFFSET_BASIS);
    let lane_b = fnv1a_64(data, SECOND_SEED);

    let mut out = [0u8; 12];
    out[0..8].copy_from_slice(&lane_a.to_be_bytes());
    out[8..12].copy_from_slice(&lane_b.to_be_bytes()[4..8]);
    out
}
