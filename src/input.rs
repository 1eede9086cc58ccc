// Input module - button mask and edge detection
//
// The console has eight buttons sampled once per frame into a single byte.
// Edge detection (just pressed / just released) compares the current sample
// against the previous frame's.

/// Button bits of the input mask.
pub mod buttons {
    pub const UP: u8 = 0b0000_0001;
    pub const DOWN: u8 = 0b0000_0010;
    pub const LEFT: u8 = 0b0000_0100;
    pub const RIGHT: u8 = 0b0000_1000;
    pub const A: u8 = 0b0001_0000;
    pub const B: u8 = 0b0010_0000;
    pub const X: u8 = 0b0100_0000;
    pub const Y: u8 = 0b1000_0000;
}

/// Current and previous frame's button samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    previous: u8,
    current: u8,
}

impl InputState {
    pub fn new() -> Self {
        InputState::default()
    }

    /// Push a fresh sample; the old current sample becomes the previous one.
    pub fn shift(&mut self, new_state: u8) {
        self.previous = self.current;
        self.current = new_state;
    }

    /// The raw button mask.
    pub fn state(&self) -> u8 {
        self.current
    }

    /// Collapse a button pair into an axis value of -1, 0, or 1.
    pub fn axis(&self, negative_button: u8, positive_button: u8) -> i32 {
        (self.current & positive_button != 0) as i32 - (self.current & negative_button != 0) as i32
    }

    pub fn is_pressed(&self, button: u8) -> bool {
        self.current & button != 0
    }

    /// Pressed this frame but not the last.
    pub fn just_pressed(&self, button: u8) -> bool {
        (self.current & button != 0) && (self.previous & button == 0)
    }

    /// Released this frame after being held.
    pub fn just_released(&self, button: u8) -> bool {
        (self.current & button == 0) && (self.previous & button != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_values() {
        let mut input = InputState::new();

        input.shift(buttons::RIGHT);
        assert_eq!(input.axis(buttons::LEFT, buttons::RIGHT), 1);

        input.shift(buttons::LEFT);
        assert_eq!(input.axis(buttons::LEFT, buttons::RIGHT), -1);

        input.shift(buttons::LEFT | buttons::RIGHT);
        assert_eq!(input.axis(buttons::LEFT, buttons::RIGHT), 0);

        input.shift(0);
        assert_eq!(input.axis(buttons::LEFT, buttons::RIGHT), 0);
    }

    #[test]
    fn test_just_pressed_fires_once() {
        let mut input = InputState::new();

        input.shift(buttons::A);
        assert!(input.just_pressed(buttons::A));
        assert!(input.is_pressed(buttons::A));

        input.shift(buttons::A);
        assert!(!input.just_pressed(buttons::A), "held buttons are not edges");
        assert!(input.is_pressed(buttons::A));
    }

    #[test]
    fn test_just_released_fires_once() {
        let mut input = InputState::new();

        input.shift(buttons::B);
        input.shift(0);
        assert!(input.just_released(buttons::B));

        input.shift(0);
        assert!(!input.just_released(buttons::B));
    }
}
