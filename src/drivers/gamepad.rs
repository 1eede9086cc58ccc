// Gamepad front-end - controller input through gilrs
//
// Maps a standard gamepad layout onto the console's eight buttons. Events
// are pumped once per frame from the kernel's input sample.

use gilrs::{Button as GilrsButton, Event, EventType, Gilrs};

use crate::drivers::InputDriver;
use crate::input::buttons;

fn button_mask(button: GilrsButton) -> Option<u8> {
    match button {
        GilrsButton::DPadUp => Some(buttons::UP),
        GilrsButton::DPadDown => Some(buttons::DOWN),
        GilrsButton::DPadLeft => Some(buttons::LEFT),
        GilrsButton::DPadRight => Some(buttons::RIGHT),
        GilrsButton::South => Some(buttons::A),
        GilrsButton::East => Some(buttons::B),
        GilrsButton::West => Some(buttons::X),
        GilrsButton::North => Some(buttons::Y),
        _ => None,
    }
}

/// Input driver over every connected gamepad.
pub struct GamepadInput {
    gilrs: Gilrs,
    mask: u8,
}

impl GamepadInput {
    pub fn new() -> Result<Self, String> {
        let gilrs = Gilrs::new().map_err(|error| format!("gamepad init failed: {}", error))?;
        Ok(GamepadInput { gilrs, mask: 0 })
    }
}

impl InputDriver for GamepadInput {
    fn sync(&mut self) -> u8 {
        while let Some(Event { event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::ButtonPressed(button, _) => {
                    if let Some(bit) = button_mask(button) {
                        self.mask |= bit;
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(bit) = button_mask(button) {
                        self.mask &= !bit;
                    }
                }
                _ => {}
            }
        }

        self.mask
    }
}
