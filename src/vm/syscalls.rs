// Syscall table - the guest's capability surface
//
// ECALL selects a handler by the number in a7; arguments travel in a0..a6
// and the result comes back in a0. Unpopulated numbers trap. Argument
// errors (bad channel, dead sprite handle, missing font) never trap; the
// call becomes a no-op and a0 carries -1, 0, or the relevant sentinel.
// Pointer arguments go through the same translation rule as memory
// operands and are re-validated against guest memory on use.

use crate::engine::SpriteImage;
use crate::fixed::Fixed;
use crate::gpu::{Image, Point, Rect};
use crate::graphics::BitmapFont;
use crate::kernel::TARGET_FPS;

use super::{reg, Flow, Host, Trap, Vm};

/// Longest guest string DrawText will accept, in bytes.
const MAX_TEXT_LENGTH: usize = 128;

/// A guest-installed bitmap font. The pixel data stays in guest memory and
/// is re-sliced on every draw.
#[derive(Debug, Clone, Copy)]
struct CustomFont {
    width: u16,
    height: u16,
    data_address: u32,
    char_width: u8,
    char_height: u8,
}

/// Per-program scratch registers the graphics and engine syscalls share.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SyscallScratch {
    target_position: Point,
    source_rect: Rect,
    target_rect: Rect,
    active_layer: usize,
    custom_font: Option<CustomFont>,
}

impl SyscallScratch {
    pub(crate) fn new() -> Self {
        SyscallScratch {
            target_position: Point::default(),
            source_rect: Rect::default(),
            target_rect: Rect::default(),
            active_layer: 0,
            custom_font: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = SyscallScratch::new();
    }
}

impl Vm {
    /// Translate a guest pointer argument (unsigned, byte-granular).
    fn pointer(&self, value: i32) -> Option<u32> {
        self.memory.translate(value as u32 as i64, 1)
    }

    /// The font DrawText/DrawNumber use: the guest's installed font when
    /// present, the built-in one otherwise.
    fn current_font(&self) -> BitmapFont<'_> {
        match self.scratch.custom_font {
            Some(font) => BitmapFont {
                image: Image {
                    width: font.width,
                    height: font.height,
                    data: &self.memory.bytes()[font.data_address as usize..],
                },
                char_width: font.char_width,
                char_height: font.char_height,
            },
            None => BitmapFont::default_font(),
        }
    }

    pub(super) fn dispatch_syscall(&mut self, host: &mut Host<'_>) -> Result<Flow, Trap> {
        let number = self.x(reg::A7) as u32;
        let a0 = self.x(reg::A0);
        let a1 = self.x(reg::A1);
        let a2 = self.x(reg::A2);
        let a3 = self.x(reg::A3);

        match number {
            // -- Runtime ------------------------------------------------
            1 => return Ok(Flow::Exit),

            2 => {
                // Yield the frame; a0 tells the guest how much faster or
                // slower than nominal the last frame ran.
                let speed = self.speed_multiplier;
                self.set_x(reg::A0, speed.to_bits());
                return Ok(Flow::Yield);
            }

            3 => {
                let (min_value, max_value) = (a0, a1);
                let result = if max_value as i64 - min_value as i64 > 0 {
                    let span = max_value as i64 + 1 - min_value as i64;
                    let random = (self.next_random() & 0x7FFF_FFFF) as i64;
                    (min_value as i64 + random % span) as i32
                } else {
                    min_value
                };
                self.set_x(reg::A0, result);
            }

            4 => self.set_x(reg::A0, host.frame_time as i32),

            5 => self.set_x(reg::A0, (host.clock.tick() / 1_000_000) as i32),

            10 => self.set_x(reg::A0, host.battery_percent as i32),

            // -- Input --------------------------------------------------
            20 => self.set_x(reg::A0, host.input.state() as i32),

            21 => self.set_x(reg::A0, host.input.axis(a0 as u8, a1 as u8)),

            22 => self.set_x(reg::A0, host.input.is_pressed(a0 as u8) as i32),

            23 => self.set_x(reg::A0, host.input.just_pressed(a0 as u8) as i32),

            24 => self.set_x(reg::A0, host.input.just_released(a0 as u8) as i32),

            // -- Graphics -----------------------------------------------
            30 => host.graphics.clear_screen(a0 as u8),

            31 => {
                let index = host.graphics.nearest_color_index(a0 as u8, a1 as u8, a2 as u8);
                self.set_x(reg::A0, index as i32);
            }

            32 => host.graphics.set_transparent_color(a0 as u16),

            33 => host.graphics.set_background_color(a0 as u16),

            34 => host.graphics.set_foreground_color(a0 as u16),

            35 => host.graphics.set_draw_anchor(a0 as u8),

            36 => host
                .graphics
                .set_draw_scale(Fixed::from_bits(a0), Fixed::from_bits(a1)),

            37 => self.scratch.target_position = Point { x: a0, y: a1 },

            38 => self.scratch.source_rect = Rect::new(a0, a1, a2, a3),

            39 => self.scratch.target_rect = Rect::new(a0, a1, a2, a3),

            40 => {
                // Install (or clear) the guest font. The atlas must be at
                // least 16x16 so the 16x8 glyph grid has whole cells.
                let width = a0 as u16;
                let height = a1 as u16;

                let char_width = (width / 16) as u8;
                let char_height = (height / 8) as u8;

                if a2 == 0 || width < 16 || height < 16 || char_width == 0 || char_height == 0 {
                    self.scratch.custom_font = None;
                } else {
                    let Some(data_address) = self.pointer(a2) else {
                        return Err(Trap::InvalidSyscall(number));
                    };

                    self.scratch.custom_font = Some(CustomFont {
                        width,
                        height,
                        data_address,
                        char_width,
                        char_height,
                    });
                }
            }

            41 => {
                let rect = self.scratch.target_rect;
                host.graphics.draw_rectangle(&rect, a0 as u8);
            }

            42 => {
                let Some(data_address) = self.pointer(a2) else {
                    return Err(Trap::InvalidSyscall(number));
                };

                let image = Image {
                    width: a0 as u16,
                    height: a1 as u16,
                    data: &self.memory.bytes()[data_address as usize..],
                };
                let position = self.scratch.target_position;
                let clip = self.scratch.source_rect;

                host.graphics.draw_image(&image, position.x, position.y, &clip);
            }

            43 => {
                let Some(text_address) = self.pointer(a0) else {
                    return Err(Trap::InvalidSyscall(number));
                };

                // Unterminated or over-long text draws nothing.
                if let Some(length) = self.memory.string_length(text_address, MAX_TEXT_LENGTH) {
                    let start = text_address as usize;
                    let text = &self.memory.bytes()[start..start + length];
                    let font = self.current_font();
                    let position = self.scratch.target_position;

                    host.graphics.draw_text(&font, position.x, position.y, text);
                }
            }

            44 => {
                let font = self.current_font();
                let position = self.scratch.target_position;
                host.graphics.draw_number(&font, position.x, position.y, a0);
            }

            // -- Audio --------------------------------------------------
            50 => host.spu.set_channel_volume(a0, a1 as u8),

            51 => host
                .spu
                .play_tone(a0, a1, a2 as u16, a3 as u32, host.clock.tick()),

            52 => host.spu.stop_channel(a0),

            53 => host.spu.stop_all(),

            // -- Engine -------------------------------------------------
            60 => {
                let started = host.clock.tick();
                let speed = self.speed_multiplier;
                host.engine.sync(speed, self.memory.bytes(), host.graphics);
                let elapsed = host.clock.tick().saturating_sub(started);
                host.engine.record_sync_time(elapsed);
            }

            61 => {
                let Some(data_address) = self.pointer(a2) else {
                    return Err(Trap::InvalidSyscall(number));
                };

                let sprite = host.engine.get_sprite(SpriteImage {
                    width: a0 as u16,
                    height: a1 as u16,
                    data_address,
                });
                self.set_x(reg::A0, sprite.map_or(-1, |index| index as i32));
            }

            62 => host.engine.release_sprite(a0),

            63 => {
                if let Some(sprite) = host.engine.sprite_mut(a0) {
                    sprite.transparent_color = a1 as u16;
                    sprite.frame_width = a2 as u16;
                    sprite.frame_height = a3 as u16;
                }
            }

            64 => {
                if let Some(sprite) = host.engine.sprite_mut(a0) {
                    sprite.num_frames = a1 as u8;
                    sprite.frame_speed =
                        Fixed::from_int(a2).div(Fixed::from_int(TARGET_FPS));
                }
            }

            65 => {
                if let Ok(layer) = usize::try_from(a0) {
                    if layer < crate::engine::MAX_LAYERS {
                        self.scratch.active_layer = layer;
                    }
                }
            }

            66 => {
                let count = host.engine.number_of_entities(self.scratch.active_layer);
                self.set_x(reg::A0, count as i32);
            }

            67 => {
                let Some(sprite) = host.engine.sprite(a1) else {
                    self.set_x(reg::A0, 0);
                    return Ok(Flow::Continue);
                };
                let sprite_index = sprite.index;

                let entity = host.engine.create_entity(
                    self.scratch.active_layer,
                    a0 as u32,
                    sprite_index,
                    Fixed::from_bits(a2),
                    Fixed::from_bits(a3),
                );
                self.set_x(reg::A0, entity.map_or(-1, |index| index as i32));
            }

            68 => host.engine.release_entity(self.scratch.active_layer, a0),

            69 => {
                if let Some(entity) = host.engine.entity_mut(self.scratch.active_layer, a0) {
                    entity.position.x = Fixed::from_bits(a1);
                    entity.position.y = Fixed::from_bits(a2);
                }
            }

            70 => {
                if let Some(entity) = host.engine.entity_mut(self.scratch.active_layer, a0) {
                    entity.direction.x = a1;
                    entity.direction.y = a2;
                }
            }

            71 => {
                if let Some(entity) = host.engine.entity_mut(self.scratch.active_layer, a0) {
                    entity.speed.x = Fixed::from_bits(a1);
                    entity.speed.y = Fixed::from_bits(a2);
                }
            }

            72 => {
                if let Some(entity) = host.engine.entity_mut(self.scratch.active_layer, a0) {
                    entity.frame_index = Fixed::from_bits(a1);
                }
            }

            73 => {
                if let Some(entity) = host.engine.entity_mut(self.scratch.active_layer, a0) {
                    entity.data_address = a1 as u32;
                }
            }

            74 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(-1, |entity| entity.type_id as i32);
                self.set_x(reg::A0, value);
            }

            75 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.position.x.to_bits());
                self.set_x(reg::A0, value);
            }

            76 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.position.y.to_bits());
                self.set_x(reg::A0, value);
            }

            77 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.direction.x);
                self.set_x(reg::A0, value);
            }

            78 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.direction.y);
                self.set_x(reg::A0, value);
            }

            79 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.speed.x.to_bits());
                self.set_x(reg::A0, value);
            }

            80 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.speed.y.to_bits());
                self.set_x(reg::A0, value);
            }

            81 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(Fixed::from_int(-1).to_bits(), |entity| {
                        entity.frame_index.to_bits()
                    });
                self.set_x(reg::A0, value);
            }

            82 => {
                let value = host
                    .engine
                    .entity(self.scratch.active_layer, a0)
                    .map_or(0, |entity| entity.data_address as i32);
                self.set_x(reg::A0, value);
            }

            83 => {
                let other = host
                    .engine
                    .colliding_entity(self.scratch.active_layer, a0, a1 as u32);
                self.set_x(reg::A0, other.map_or(-1, |index| index as i32));
            }

            84 => {
                let index = host
                    .engine
                    .find_entity_index(self.scratch.active_layer, a0 as u32, a1 as u32);
                self.set_x(reg::A0, index);
            }

            85 => {
                let on_screen = host.engine.is_entity_on_screen(self.scratch.active_layer, a0);
                self.set_x(reg::A0, on_screen as i32);
            }

            _ => return Err(Trap::InvalidSyscall(number)),
        }

        Ok(Flow::Continue)
    }
}
