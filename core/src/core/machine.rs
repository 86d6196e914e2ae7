/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "P1 Left", "Coin").
    pub name: &'static str,
}

/// Machine-agnostic interface for emulated systems.
///
/// Each console (SG-1000, SMS, ColecoVision) implements this trait to
/// provide a uniform interface to a host. The host is a pure rendering
/// and input-routing shell that does not know about specific hardware
/// (VDP register layout, mapper variant, PSG internals).
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Advance emulated time by `ms` milliseconds of wall clock at the
    /// machine's nominal clock rate. Internally discretised into whole
    /// VDP scanlines (228 CPU cycles each); fractional scanlines carry
    /// over to the next call.
    fn run(&mut self, ms: f64);

    /// Run exactly one video frame (NTSC ~16.683 ms, PAL 20 ms).
    fn run_frame(&mut self) {
        let frame_ms = 1000.0 / self.frame_rate_hz();
        self.run(frame_ms);
    }

    /// Nominal frame rate in Hz for this machine's video standard.
    fn frame_rate_hz(&self) -> f64;

    /// Nominal CPU clock rate in Hz.
    fn get_clock_rate(&self) -> u32;

    /// Render the current video state into an RGB24 pixel buffer.
    ///
    /// The buffer must be at least `width * height * 3` bytes (from `display_size()`).
    /// Pixels are stored left-to-right, top-to-bottom, 3 bytes per pixel (R, G, B).
    fn render_frame(&self, buffer: &mut [u8]);

    /// Fill `out` with signed-16 PCM samples at a fixed output rate
    /// (48 000 Hz assumed), pulling from the PSG sample ring and
    /// generating more samples on demand if the consumer is starving.
    fn audio_callback(&mut self, out: &mut [i16]);

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    /// `pressed` is true for key-down, false for key-up.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Flush cartridge SRAM to durable storage, if present and modified.
    /// Out-of-scope persistence mechanics (file paths, cadence) are the
    /// host's responsibility; this returns the bytes to persist.
    fn sync(&mut self) -> Option<&[u8]> {
        None
    }

    /// False once an unrecoverable internal error (e.g. an unknown Z80
    /// opcode) has halted emulation; the host should stop calling `run`.
    fn is_ready(&self) -> bool {
        true
    }
}
