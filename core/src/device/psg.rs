//! SN76489 — 4-channel programmable sound generator.
//!
//! Used as the sole sound chip in the SG-1000 and ColecoVision, and as the
//! PSG half of the Sega Master System's audio (alongside the optional FM
//! unit, which is out of scope here). Three square-wave tone channels and
//! one noise channel, each with an independent 4-bit attenuator. The noise
//! channel reuses channel 2's tone period when its control bits select
//! "synced" mode.
//!
//! References:
//!  - SN76489 data write / tick behaviour, as implemented by the Sega
//!    console emulation this crate is modeled on (tone/noise counters,
//!    LFSR taps, ring-buffered sample generation at the PSG's own clock).
//!
//! The PSG runs at master_clock / 16. Rather than generate a sample per
//! PSG tick and resample down to the host rate on every write, samples are
//! pushed into a ring buffer at the PSG's native rate and drained by the
//! audio callback at whatever cadence the host requests — the two run on
//! independent schedules (the emulation loop advances the PSG in bulk once
//! per scanline; the host sound card pulls fixed-size blocks), so the ring
//! is the seam between them and is guarded by a mutex rather than assumed
//! to be touched from one thread only.

use std::sync::Mutex;

/// Size of the internal sample ring, in PSG-rate samples. At ~223.7 kHz
/// (3.58 MHz / 16) this holds a little over 73 ms of audio.
const RING_SIZE: usize = 16384;

/// The four channels' attenuators reset to maximum (silent) on power-on.
const INITIAL_VOLUME: u8 = 0x0f;

/// Latched register "address" written by the low byte of a LATCH/DATA byte.
/// Matches the chip's 3-bit channel/kind select left-shifted into the top
/// nibble of the latch byte (0x00, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Tone0,
    Vol0,
    Tone1,
    Vol1,
    Tone2,
    Vol2,
    Noise,
    Vol3,
}

impl Latch {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x70 {
            0x00 => Latch::Tone0,
            0x10 => Latch::Vol0,
            0x20 => Latch::Tone1,
            0x30 => Latch::Vol1,
            0x40 => Latch::Tone2,
            0x50 => Latch::Vol2,
            0x60 => Latch::Noise,
            _ => Latch::Vol3,
        }
    }
}

/// Shared ring of samples generated at the PSG's native clock rate.
/// `read_index`/`write_index` are monotonic counts of samples produced and
/// consumed; both are wide enough that wraparound never happens in
/// practice, and the physical slot is `index % RING_SIZE`.
struct SampleRing {
    buffer: Box<[i16; RING_SIZE]>,
    read_index: u64,
    write_index: u64,
}

impl SampleRing {
    fn new() -> Self {
        Self {
            buffer: Box::new([0; RING_SIZE]),
            read_index: 0,
            write_index: 0,
        }
    }

    fn push(&mut self, sample: i16) {
        let slot = (self.write_index % RING_SIZE as u64) as usize;
        self.buffer[slot] = sample;
        self.write_index += 1;
    }

    fn len(&self) -> u64 {
        self.write_index - self.read_index
    }
}

/// SN76489 programmable sound generator.
pub struct Psg {
    // Tone channel periods (10-bit) and noise control (3-bit, bit 2 selects
    // white vs periodic noise).
    tone: [u16; 3],
    noise: u8,

    // Per-channel attenuation, 0 = loudest, 0x0f = silent.
    vol: [u8; 4],

    // Frequency divider counters, one per channel (channel 3 = noise).
    counter: [u16; 4],

    // Current square-wave polarity per channel, +1 or -1.
    output: [i8; 4],

    // 16-bit linear feedback shift register driving the noise channel.
    lfsr: u16,
    output_lfsr: i8,

    // Register address selected by the most recent LATCH byte.
    latch: Latch,

    // Cycles carried over from the last run_cycles() call (system clock is
    // divided by 16 to get the PSG's own tick rate).
    excess_cycles: u32,

    sample_ring: Mutex<SampleRing>,

    // State for get_samples()'s read-index resampling; reset whenever the
    // host clock rate changes so stale indices don't carry over.
    host_sample_count: u64,
    last_clock_rate: u32,
}

impl Psg {
    pub fn new() -> Self {
        Self {
            tone: [0; 3],
            noise: 0,
            vol: [INITIAL_VOLUME; 4],
            counter: [0; 4],
            output: [1, -1, 1, -1],
            lfsr: 0x0001,
            output_lfsr: 0,
            latch: Latch::Tone0,
            excess_cycles: 0,
            sample_ring: Mutex::new(SampleRing::new()),
            host_sample_count: 0,
            last_clock_rate: 0,
        }
    }

    /// Reset to power-on state. Volumes start silent; the LFSR and tone
    /// channels start at their zero periods, which plays as a steady tone
    /// until the game writes real values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Handle one byte written to the PSG's data port.
    ///
    /// | Bit 7 | Meaning                                            |
    /// |-------|----------------------------------------------------|
    /// | 1     | LATCH + low 4 data bits select a channel register   |
    /// | 0     | high 6 data bits continue the previously latched   |
    /// |       | tone register (volume registers ignore the high    |
    /// |       | byte and just re-read the low 4 bits)               |
    pub fn write(&mut self, data: u8) {
        if data & 0x80 != 0 {
            self.latch = Latch::from_bits(data);
        }
        self.apply(data & 0x0f, data);
    }

    /// Apply a data nibble to whichever register is currently latched.
    /// `data` is only used for the high-byte tone continuation; volume and
    /// noise writes always take the low 4 bits regardless of which byte of
    /// the pair this is.
    fn apply(&mut self, data_low: u8, data: u8) {
        let is_first_byte = data & 0x80 != 0;
        match self.latch {
            Latch::Tone0 => {
                self.tone[0] = if is_first_byte {
                    (self.tone[0] & 0x03f0) | data_low as u16
                } else {
                    (self.tone[0] & 0x000f) | ((data as u16) << 4)
                };
            }
            Latch::Tone1 => {
                self.tone[1] = if is_first_byte {
                    (self.tone[1] & 0x03f0) | data_low as u16
                } else {
                    (self.tone[1] & 0x000f) | ((data as u16) << 4)
                };
            }
            Latch::Tone2 => {
                self.tone[2] = if is_first_byte {
                    (self.tone[2] & 0x03f0) | data_low as u16
                } else {
                    (self.tone[2] & 0x000f) | ((data as u16) << 4)
                };
            }
            Latch::Vol0 => self.vol[0] = data_low,
            Latch::Vol1 => self.vol[1] = data_low,
            Latch::Vol2 => self.vol[2] = data_low,
            Latch::Vol3 => self.vol[3] = data_low,
            Latch::Noise => {
                self.noise = data_low;
                self.lfsr = 0x0001;
            }
        }
    }

    /// Advance the PSG by `cycles` system-clock cycles (system clock, not
    /// PSG clock — divided by 16 internally, same as real hardware).
    ///
    /// 1. Fold in cycles carried over from the previous call.
    /// 2. Divide by 16 to get the number of PSG ticks to run; keep the
    ///    remainder for next time.
    /// 3. Throttle how many ticks we generate so the ring doesn't grow
    ///    unbounded when nothing is draining it, and never overrun it.
    /// 4. Per tick: decrement each channel's counter; on underflow, reload
    ///    from the tone period and flip polarity (a zero tone period holds
    ///    the output at +1 instead of toggling). The noise channel reloads
    ///    from a fixed divider (0x10/0x20/0x40) or channel 2's period, and
    ///    shifts the LFSR on the -1→+1 transition.
    /// 5. Mix the four channels' attenuated outputs into one sample and
    ///    push it to the ring.
    pub fn run_cycles(&mut self, cycles: u64) {
        let cycles = cycles + self.excess_cycles as u64;
        let mut psg_cycles = cycles >> 4;
        self.excess_cycles = (cycles - (psg_cycles << 4)) as u32;

        let mut ring = self.sample_ring.lock().unwrap();

        // Lazy top-up: if what we're about to generate still wouldn't reach
        // the consumer's read position, force enough cycles to get one
        // sample ahead of it instead of leaving the caller starved.
        if ring.write_index + psg_cycles <= ring.read_index {
            psg_cycles = ring.read_index - ring.write_index + 1;
        }

        // Keep at most ~60% of the ring full when nothing is draining it.
        let threshold = (RING_SIZE as f64 * 0.6) as u64;
        if psg_cycles + ring.len() > threshold && psg_cycles > 1 {
            psg_cycles -= 1;
        }
        if psg_cycles + ring.len() > RING_SIZE as u64 {
            psg_cycles = RING_SIZE as u64 - ring.len();
        }

        for _ in 0..psg_cycles {
            for ch in 0..3 {
                if self.counter[ch] != 0 {
                    self.counter[ch] -= 1;
                }
                if self.counter[ch] == 0 {
                    self.counter[ch] = self.tone[ch];
                    self.output[ch] = -self.output[ch];
                }
                if self.tone[ch] == 0 {
                    self.output[ch] = 1;
                }
            }

            if self.counter[3] != 0 {
                self.counter[3] -= 1;
            }
            if self.counter[3] == 0 {
                self.counter[3] = match self.noise & 0x03 {
                    0x00 => 0x10,
                    0x01 => 0x20,
                    0x02 => 0x40,
                    _ => self.tone[2],
                };
                self.output[3] = -self.output[3];

                if self.output[3] == 1 {
                    self.output_lfsr = (self.lfsr & 1) as i8;

                    let bit0 = self.lfsr & 1;
                    let bit3 = (self.lfsr >> 3) & 1;
                    let feedback = if self.noise & 0x04 != 0 {
                        // White noise: tap bits 0 and 3.
                        bit0 ^ bit3
                    } else {
                        // Periodic noise: tap bit 0 only.
                        bit0
                    };
                    self.lfsr = (self.lfsr >> 1) | (feedback << 15);
                }
            }

            let sample = self.mix();
            ring.push(sample);
        }
    }

    fn mix(&self) -> i16 {
        const BASE_VOLUME: i32 = 60;
        let tone_sum: i32 = (0..3)
            .map(|ch| self.output[ch] as i32 * (0x0f - self.vol[ch] as i32) * BASE_VOLUME)
            .sum();
        let noise_sum = self.output_lfsr as i32 * (0x0f - self.vol[3] as i32) * BASE_VOLUME;
        (tone_sum + noise_sum).clamp(i16::MIN as i32, i16::MAX as i32) as i16
    }

    /// Fill `stream` with samples resampled from the PSG's native rate to
    /// `clock_rate / 16` ticks mapped onto the host's sample rate. If the
    /// ring hasn't produced enough samples yet, generate on demand so the
    /// caller never blocks or underruns.
    pub fn get_samples(&mut self, stream: &mut [i16], clock_rate: u32, host_sample_rate: u32) {
        if clock_rate != self.last_clock_rate {
            self.last_clock_rate = clock_rate;
            self.host_sample_count = 0;
            let mut ring = self.sample_ring.lock().unwrap();
            ring.read_index = 0;
            ring.write_index = 0;
        }

        let psg_rate = (clock_rate >> 4).max(1) as u64;

        for slot in stream.iter_mut() {
            let target_index =
                (self.host_sample_count * psg_rate) / host_sample_rate.max(1) as u64;

            // Publish the consumer's position before asking run_cycles to
            // top up, so its starvation check compares against where we're
            // actually about to read from, not a stale position from the
            // previous slot.
            {
                let mut ring = self.sample_ring.lock().unwrap();
                ring.read_index = target_index;
                let needs_fill = target_index >= ring.write_index;
                drop(ring);
                if needs_fill {
                    self.run_cycles(0);
                }
            }

            let ring = self.sample_ring.lock().unwrap();
            *slot = ring.buffer[(target_index % RING_SIZE as u64) as usize];
            drop(ring);

            self.host_sample_count += 1;
        }
    }
}

impl Default for Psg {
    fn default() -> Self {
        Self::new()
    }
}
