//! Passive gamepad snapshot read by each console's Bus during I/O reads.
//!
//! Input collection itself is the host's job (out of scope here); this is
//! just the register image the host writes into and the Bus reads from,
//! plus the SMS paddle's internally-clocked position sampling.

/// Digital buttons common to SG-1000, SMS, and ColecoVision joystick mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoystickState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub button_1: bool,
    pub button_2: bool,
    pub start: bool,
}

/// A single ColecoVision keypad key. Only one key is considered held at
/// a time, matching the keypad's physical layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeypadKey {
    Digit(u8),
    Star,
    Pound,
}

/// SMS paddle controller state. The real paddle's clock output toggles
/// at ~8 kHz; each bus read samples whichever nibble the current clock
/// phase exposes. `tick_clock` should be called at that rate from the
/// machine's run loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaddleState {
    pub position: u8,
    pub velocity: f32,
    clock_phase: bool,
}

impl PaddleState {
    /// Advance the paddle's simulated rotation by one velocity step. Called
    /// at the machine's scanline rate as a stand-in for the real paddle's
    /// free-running position sampling.
    pub fn tick_clock(&mut self) {
        self.position = (self.position as i16 + self.velocity as i16).clamp(0, 0xFF) as u8;
    }

    pub fn clock_phase(&self) -> bool {
        self.clock_phase
    }

    /// Flip the clock phase and return the new value. Used when the bus
    /// itself is the clock source (no TH-pin handshake driving it).
    pub fn flip_clock(&mut self) -> bool {
        self.clock_phase = !self.clock_phase;
        self.clock_phase
    }

    /// Force the clock phase to the level an external TH-pin handshake
    /// reports, instead of free-running it.
    pub fn set_clock_phase(&mut self, phase: bool) {
        self.clock_phase = phase;
    }
}

/// One gamepad port: digital joystick, optional paddle, optional keypad.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gamepad {
    pub joystick: JoystickState,
    pub paddle: PaddleState,
    /// Set by the host when this port holds an SMS paddle rather than a
    /// standard joystick; switches the port-A read from digital directions
    /// to the paddle's nibble-by-clock-phase encoding.
    pub paddle_mode: bool,
    pub keypad: Option<KeypadKey>,
}

/// The full two-port snapshot a Bus reads from.
#[derive(Clone, Copy, Debug, Default)]
pub struct GamepadState {
    pub port_1: Gamepad,
    pub port_2: Gamepad,
}

impl GamepadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a ColecoVision keypad nibble per the standard keypad
    /// matrix: digits 0-9 produce their own value ('0' maps to 0x0A per
    /// the matrix's non-linear digit ordering), '*' is 0x09, '#' is
    /// 0x06; no key held returns 0x0F (all lines high).
    pub fn colecovision_keypad_nibble(key: Option<KeypadKey>) -> u8 {
        match key {
            None => 0x0F,
            Some(KeypadKey::Digit(0)) => 0x0A,
            Some(KeypadKey::Digit(1)) => 0x0D,
            Some(KeypadKey::Digit(2)) => 0x07,
            Some(KeypadKey::Digit(3)) => 0x0C,
            Some(KeypadKey::Digit(4)) => 0x02,
            Some(KeypadKey::Digit(5)) => 0x03,
            Some(KeypadKey::Digit(6)) => 0x0E,
            Some(KeypadKey::Digit(7)) => 0x05,
            Some(KeypadKey::Digit(8)) => 0x01,
            Some(KeypadKey::Digit(9)) => 0x0B,
            Some(KeypadKey::Star) => 0x09,
            Some(KeypadKey::Pound) => 0x06,
            Some(KeypadKey::Digit(_)) => 0x0F,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_all_released() {
        let state = GamepadState::new();
        assert_eq!(state.port_1.joystick, JoystickState::default());
        assert!(state.port_1.keypad.is_none());
    }

    #[test]
    fn paddle_clock_advances_position() {
        let mut paddle = PaddleState { position: 10, velocity: 2.0, ..Default::default() };
        paddle.tick_clock();
        assert_eq!(paddle.position, 12);
    }

    #[test]
    fn paddle_flip_clock_toggles_phase() {
        let mut paddle = PaddleState::default();
        let phase_before = paddle.clock_phase();
        let phase_after = paddle.flip_clock();
        assert_ne!(phase_after, phase_before);
        assert_eq!(paddle.clock_phase(), phase_after);
    }

    #[test]
    fn paddle_set_clock_phase_forces_value() {
        let mut paddle = PaddleState::default();
        paddle.set_clock_phase(true);
        assert!(paddle.clock_phase());
        paddle.set_clock_phase(false);
        assert!(!paddle.clock_phase());
    }

    #[test]
    fn paddle_position_clamps_at_bounds() {
        let mut paddle = PaddleState { position: 254, velocity: 10.0, ..Default::default() };
        paddle.tick_clock();
        assert_eq!(paddle.position, 0xFF);
    }

    #[test]
    fn keypad_nibble_no_key_is_all_ones() {
        assert_eq!(GamepadState::colecovision_keypad_nibble(None), 0x0F);
    }

    #[test]
    fn keypad_nibble_digit_one() {
        assert_eq!(
            GamepadState::colecovision_keypad_nibble(Some(KeypadKey::Digit(1))),
            0x0D
        );
    }

    #[test]
    fn keypad_nibble_star_and_pound() {
        assert_eq!(GamepadState::colecovision_keypad_nibble(Some(KeypadKey::Star)), 0x09);
        assert_eq!(GamepadState::colecovision_keypad_nibble(Some(KeypadKey::Pound)), 0x06);
    }
}
