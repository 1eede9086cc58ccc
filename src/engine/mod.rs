// Engine module - sprites, entities, and the per-frame world step
//
// The engine owns a pool of 256 sprites (an image plus animation metadata)
// and four layers of up to 128 entities each. Entities are positioned
// sprite instances with fixed-point kinematics and an animation cursor.
// Once per frame the guest asks for a sync: every live entity advances its
// animation, moves, and is composed into the framebuffer layer by layer,
// back to front; entities flagged for release are then swap-removed so the
// live range stays contiguous.

use crate::fixed::Fixed;
use crate::gpu::{Image, Rect, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::graphics::Graphics;

/// Size of the sprite pool.
pub const MAX_SPRITES: usize = 256;

/// Number of composition layers.
pub const MAX_LAYERS: usize = 4;

/// Maximum live entities per layer.
pub const MAX_LAYER_ENTITIES: usize = 128;

/// A fixed-point 2D vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedPoint {
    pub x: Fixed,
    pub y: Fixed,
}

/// An integer 2D vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

/// Location and size of a sprite's pixel data in guest memory. The address
/// is stored post-translation and re-validated against the memory slice on
/// every draw.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpriteImage {
    pub width: u16,
    pub height: u16,
    pub data_address: u32,
}

/// A sprite: an image plus per-frame cell dimensions and animation speed.
#[derive(Debug, Clone, Copy)]
pub struct Sprite {
    pub index: u32,
    pub is_free: bool,
    pub image: SpriteImage,
    pub transparent_color: u16,
    pub frame_width: u16,
    pub frame_height: u16,
    pub frame_speed: Fixed,
    pub num_frames: u8,
}

impl Sprite {
    fn empty(index: u32) -> Sprite {
        Sprite {
            index,
            is_free: true,
            image: SpriteImage::default(),
            transparent_color: 0,
            frame_width: 0,
            frame_height: 0,
            frame_speed: Fixed::ZERO,
            num_frames: 0,
        }
    }
}

/// A positioned sprite instance.
#[derive(Debug, Clone, Copy)]
pub struct Entity {
    pub layer_index: u8,
    pub index: u32,
    pub type_id: u32,
    pub sprite_index: u32,
    pub position: FixedPoint,
    pub direction: IntPoint,
    pub speed: FixedPoint,
    pub frame_index: Fixed,
    pub data_address: u32,
    pub release_after_sync: bool,
}

impl Entity {
    fn empty(layer_index: u8, index: u32) -> Entity {
        Entity {
            layer_index,
            index,
            type_id: 0,
            sprite_index: 0,
            position: FixedPoint::default(),
            direction: IntPoint::default(),
            speed: FixedPoint::default(),
            frame_index: Fixed::ZERO,
            data_address: 0,
            release_after_sync: false,
        }
    }
}

/// The sprite pool and entity layers.
pub struct Engine {
    sprites: [Sprite; MAX_SPRITES],
    next_free_sprite: usize,
    entities: [[Entity; MAX_LAYER_ENTITIES]; MAX_LAYERS],
    entity_counts: [usize; MAX_LAYERS],
    last_sync_time: u64,
}

impl Engine {
    pub fn new() -> Self {
        let mut engine = Engine {
            sprites: std::array::from_fn(|index| Sprite::empty(index as u32)),
            next_free_sprite: 0,
            entities: std::array::from_fn(|layer| {
                std::array::from_fn(|index| Entity::empty(layer as u8, index as u32))
            }),
            entity_counts: [0; MAX_LAYERS],
            last_sync_time: 0,
        };
        engine.reset();
        engine
    }

    /// Free every sprite and empty every layer. Runs when a new program is
    /// loaded.
    pub fn reset(&mut self) {
        for (index, sprite) in self.sprites.iter_mut().enumerate() {
            *sprite = Sprite::empty(index as u32);
        }
        self.next_free_sprite = 0;

        for (layer, entities) in self.entities.iter_mut().enumerate() {
            for (index, entity) in entities.iter_mut().enumerate() {
                *entity = Entity::empty(layer as u8, index as u32);
            }
        }
        self.entity_counts = [0; MAX_LAYERS];
    }

    // Sprites ----------------------------------------------------------

    /// Allocate a sprite for an image. Returns the sprite handle, or `None`
    /// when the pool is exhausted.
    ///
    /// The free hint always points at the first free slot at or after the
    /// last allocation; after allocating it scans forward, and parks past
    /// the end of the pool when nothing is left.
    pub fn get_sprite(&mut self, image: SpriteImage) -> Option<u32> {
        if self.next_free_sprite >= MAX_SPRITES {
            return None;
        }

        let index = self.next_free_sprite;
        self.sprites[index] = Sprite {
            index: index as u32,
            is_free: false,
            image,
            transparent_color: 0,
            frame_width: 0,
            frame_height: 0,
            frame_speed: Fixed::ZERO,
            num_frames: 0,
        };

        self.next_free_sprite = (index + 1..MAX_SPRITES)
            .find(|&candidate| self.sprites[candidate].is_free)
            .unwrap_or(MAX_SPRITES);

        Some(index as u32)
    }

    /// Look up a live sprite by handle.
    pub fn sprite(&self, sprite_index: i32) -> Option<&Sprite> {
        usize::try_from(sprite_index)
            .ok()
            .and_then(|index| self.sprites.get(index))
            .filter(|sprite| !sprite.is_free)
    }

    pub fn sprite_mut(&mut self, sprite_index: i32) -> Option<&mut Sprite> {
        usize::try_from(sprite_index)
            .ok()
            .and_then(|index| self.sprites.get_mut(index))
            .filter(|sprite| !sprite.is_free)
    }

    /// Return a sprite to the pool. The free hint rewinds when the released
    /// slot is earlier.
    pub fn release_sprite(&mut self, sprite_index: i32) {
        let Ok(index) = usize::try_from(sprite_index) else {
            return;
        };
        if index >= MAX_SPRITES {
            return;
        }

        self.sprites[index].is_free = true;

        if index < self.next_free_sprite {
            self.next_free_sprite = index;
        }
    }

    // Entities ---------------------------------------------------------

    /// Live entity count of a layer.
    pub fn number_of_entities(&self, layer_index: usize) -> usize {
        if layer_index < MAX_LAYERS {
            self.entity_counts[layer_index]
        } else {
            0
        }
    }

    /// Append an entity to a layer. Returns its index, or `None` when the
    /// layer is full.
    pub fn create_entity(
        &mut self,
        layer_index: usize,
        type_id: u32,
        sprite_index: u32,
        x: Fixed,
        y: Fixed,
    ) -> Option<u32> {
        if layer_index >= MAX_LAYERS || self.entity_counts[layer_index] >= MAX_LAYER_ENTITIES {
            return None;
        }

        let slot = self.entity_counts[layer_index];
        self.entity_counts[layer_index] += 1;

        self.entities[layer_index][slot] = Entity {
            layer_index: layer_index as u8,
            index: slot as u32,
            type_id,
            sprite_index,
            position: FixedPoint { x, y },
            direction: IntPoint::default(),
            speed: FixedPoint::default(),
            frame_index: Fixed::ZERO,
            data_address: 0,
            release_after_sync: false,
        };

        Some(slot as u32)
    }

    /// Look up a live entity.
    pub fn entity(&self, layer_index: usize, entity_index: i32) -> Option<&Entity> {
        let index = usize::try_from(entity_index).ok()?;
        if layer_index >= MAX_LAYERS || index >= self.entity_counts[layer_index] {
            return None;
        }
        Some(&self.entities[layer_index][index])
    }

    pub fn entity_mut(&mut self, layer_index: usize, entity_index: i32) -> Option<&mut Entity> {
        let index = usize::try_from(entity_index).ok()?;
        if layer_index >= MAX_LAYERS || index >= self.entity_counts[layer_index] {
            return None;
        }
        Some(&mut self.entities[layer_index][index])
    }

    /// Flag an entity for removal at the end of the current sync.
    pub fn release_entity(&mut self, layer_index: usize, entity_index: i32) {
        if let Some(entity) = self.entity_mut(layer_index, entity_index) {
            entity.release_after_sync = true;
        }
    }

    /// Find another entity of `other_type_id` on the same layer whose frame
    /// box overlaps this one. Returns the other entity's index.
    pub fn colliding_entity(
        &self,
        layer_index: usize,
        entity_index: i32,
        other_type_id: u32,
    ) -> Option<u32> {
        let entity = self.entity(layer_index, entity_index)?;
        let sprite = self.sprite(entity.sprite_index as i32)?;

        let own = Rect::new(
            entity.position.x.to_int(),
            entity.position.y.to_int(),
            sprite.frame_width as i32,
            sprite.frame_height as i32,
        );

        for other_index in 0..self.entity_counts[layer_index] {
            let other = &self.entities[layer_index][other_index];
            if other_index as u32 == entity.index || other.type_id != other_type_id {
                continue;
            }

            let Some(other_sprite) = self.sprite(other.sprite_index as i32) else {
                continue;
            };

            let other_rect = Rect::new(
                other.position.x.to_int(),
                other.position.y.to_int(),
                other_sprite.frame_width as i32,
                other_sprite.frame_height as i32,
            );

            if other_rect.x < own.x + own.width
                && other_rect.x + other_rect.width > own.x
                && other_rect.y < own.y + own.height
                && other_rect.y + other_rect.height > own.y
            {
                return Some(other.index);
            }
        }

        None
    }

    /// Whether an entity's top-left corner is within one frame of the
    /// visible screen.
    pub fn is_entity_on_screen(&self, layer_index: usize, entity_index: i32) -> bool {
        let Some(entity) = self.entity(layer_index, entity_index) else {
            return false;
        };
        let Some(sprite) = self.sprite(entity.sprite_index as i32) else {
            return false;
        };

        entity.position.x >= -Fixed::from_int(sprite.frame_width as i32)
            && entity.position.y >= -Fixed::from_int(sprite.frame_height as i32)
            && entity.position.x < Fixed::from_int(SCREEN_WIDTH)
            && entity.position.y < Fixed::from_int(SCREEN_HEIGHT)
    }

    /// Find the nth live entity (1-indexed occurrence) of a type. Returns
    /// -1 when there is no such entity.
    pub fn find_entity_index(
        &self,
        layer_index: usize,
        type_id: u32,
        occurrence_number: u32,
    ) -> i32 {
        if layer_index >= MAX_LAYERS || occurrence_number == 0 {
            return -1;
        }

        let mut occurrences_found = 0;

        for entity_index in 0..self.entity_counts[layer_index] {
            if self.entities[layer_index][entity_index].type_id == type_id {
                occurrences_found += 1;

                if occurrences_found == occurrence_number {
                    return entity_index as i32;
                }
            }
        }

        -1
    }

    // Sync -------------------------------------------------------------

    /// Advance and compose the world by one step.
    ///
    /// Pass one walks every layer back to front: animation cursors advance
    /// by `frame_speed * speed_multiplier` (wrapping to zero past the last
    /// frame), positions integrate velocity along each active direction
    /// axis, and the current animation cell is drawn. Pass two swap-removes
    /// every entity flagged for release, keeping each moved entity's
    /// `index` field consistent with its new slot.
    ///
    /// `guest_memory` backs the sprite pixel data; sprites whose data no
    /// longer fits in it are skipped.
    pub fn sync(&mut self, speed_multiplier: Fixed, guest_memory: &[u8], graphics: &mut Graphics) {
        for layer_index in 0..MAX_LAYERS {
            for entity_index in 0..self.entity_counts[layer_index] {
                let sprite = {
                    let entity = &self.entities[layer_index][entity_index];
                    self.sprites[entity.sprite_index as usize % MAX_SPRITES]
                };
                let entity = &mut self.entities[layer_index][entity_index];

                if sprite.frame_speed != Fixed::ZERO {
                    entity.frame_index += sprite.frame_speed.mul(speed_multiplier);

                    if entity.frame_index.to_int() >= sprite.num_frames as i32 {
                        entity.frame_index = Fixed::ZERO;
                    }
                }

                if entity.direction.x != 0 {
                    let step = entity.speed.x.mul(speed_multiplier);
                    entity.position.x = Fixed::from_bits(
                        entity
                            .position
                            .x
                            .to_bits()
                            .wrapping_add(step.to_bits().wrapping_mul(entity.direction.x)),
                    );
                }

                if entity.direction.y != 0 {
                    let step = entity.speed.y.mul(speed_multiplier);
                    entity.position.y = Fixed::from_bits(
                        entity
                            .position
                            .y
                            .to_bits()
                            .wrapping_add(step.to_bits().wrapping_mul(entity.direction.y)),
                    );
                }

                let entity = self.entities[layer_index][entity_index];
                Self::draw_entity(&entity, &sprite, guest_memory, graphics);
            }
        }

        for layer_index in 0..MAX_LAYERS {
            let mut entity_index = 0;

            while entity_index < self.entity_counts[layer_index] {
                if self.entities[layer_index][entity_index].release_after_sync {
                    self.entity_counts[layer_index] -= 1;
                    let last = self.entity_counts[layer_index];

                    if entity_index < last {
                        let index_backup = self.entities[layer_index][entity_index].index;
                        self.entities[layer_index][entity_index] =
                            self.entities[layer_index][last];
                        self.entities[layer_index][entity_index].index = index_backup;
                    }

                    continue;
                }

                entity_index += 1;
            }
        }
    }

    fn draw_entity(
        entity: &Entity,
        sprite: &Sprite,
        guest_memory: &[u8],
        graphics: &mut Graphics,
    ) {
        if sprite.is_free || sprite.frame_width == 0 || sprite.frame_height == 0 {
            return;
        }

        let frames_per_row = sprite.image.width / sprite.frame_width;
        if frames_per_row == 0 {
            return;
        }

        let frame = entity.frame_index.to_int();
        let frame_row = frame / frames_per_row as i32;
        let frame_column = frame % frames_per_row as i32;

        let frame_rect = Rect::new(
            frame_column.wrapping_mul(sprite.frame_width as i32),
            frame_row.wrapping_mul(sprite.frame_height as i32),
            sprite.frame_width as i32,
            sprite.frame_height as i32,
        );

        let data_length = sprite.image.width as usize * sprite.image.height as usize;
        let start = sprite.image.data_address as usize;
        let Some(data) = guest_memory.get(start..start + data_length) else {
            return;
        };

        let image = Image {
            width: sprite.image.width,
            height: sprite.image.height,
            data,
        };

        graphics.set_transparent_color(sprite.transparent_color);
        graphics.draw_image(
            &image,
            entity.position.x.to_int(),
            entity.position.y.to_int(),
            &frame_rect,
        );
    }

    /// Record how long the last sync took, for the stats overlay.
    pub fn record_sync_time(&mut self, elapsed: u64) {
        self.last_sync_time = elapsed;
    }

    /// Duration of the last sync in microseconds.
    pub fn last_sync_time(&self) -> u64 {
        self.last_sync_time
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_sprite(engine: &mut Engine, frame_size: u16) -> u32 {
        let index = engine
            .get_sprite(SpriteImage {
                width: frame_size,
                height: frame_size,
                data_address: 0,
            })
            .expect("sprite pool should not be empty");
        let sprite = engine.sprite_mut(index as i32).unwrap();
        sprite.frame_width = frame_size;
        sprite.frame_height = frame_size;
        sprite.num_frames = 1;
        index
    }

    #[test]
    fn test_sprite_allocation_advances_hint() {
        let mut engine = Engine::new();
        let first = engine.get_sprite(SpriteImage::default()).unwrap();
        let second = engine.get_sprite(SpriteImage::default()).unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 1);
    }

    #[test]
    fn test_sprite_release_rewinds_hint() {
        let mut engine = Engine::new();
        let first = engine.get_sprite(SpriteImage::default()).unwrap();
        let _second = engine.get_sprite(SpriteImage::default()).unwrap();

        engine.release_sprite(first as i32);
        let reused = engine.get_sprite(SpriteImage::default()).unwrap();
        assert_eq!(reused, first, "released slot should be reused first");
    }

    #[test]
    fn test_sprite_pool_exhaustion() {
        let mut engine = Engine::new();
        for _ in 0..MAX_SPRITES {
            assert!(engine.get_sprite(SpriteImage::default()).is_some());
        }
        assert!(engine.get_sprite(SpriteImage::default()).is_none());
    }

    #[test]
    fn test_freed_sprite_is_not_addressable() {
        let mut engine = Engine::new();
        let index = engine.get_sprite(SpriteImage::default()).unwrap();
        engine.release_sprite(index as i32);
        assert!(engine.sprite(index as i32).is_none());
    }

    #[test]
    fn test_create_entity_fills_layer() {
        let mut engine = Engine::new();
        let sprite = test_sprite(&mut engine, 16);

        for expected in 0..MAX_LAYER_ENTITIES {
            let index = engine.create_entity(1, 7, sprite, Fixed::ZERO, Fixed::ZERO);
            assert_eq!(index, Some(expected as u32));
        }

        assert!(engine.create_entity(1, 7, sprite, Fixed::ZERO, Fixed::ZERO).is_none());
        assert_eq!(engine.number_of_entities(1), MAX_LAYER_ENTITIES);
    }

    #[test]
    fn test_collision_detects_overlap() {
        let mut engine = Engine::new();
        let sprite = test_sprite(&mut engine, 16);

        let a = engine
            .create_entity(1, 1, sprite, Fixed::from_int(10), Fixed::from_int(10))
            .unwrap();
        let b = engine
            .create_entity(1, 2, sprite, Fixed::from_int(20), Fixed::from_int(20))
            .unwrap();

        assert_eq!(engine.colliding_entity(1, a as i32, 2), Some(b));

        // Move A away; the boxes no longer overlap.
        engine.entity_mut(1, a as i32).unwrap().position = FixedPoint {
            x: Fixed::from_int(40),
            y: Fixed::from_int(40),
        };
        assert_eq!(engine.colliding_entity(1, a as i32, 2), None);
    }

    #[test]
    fn test_collision_edges_do_not_touch() {
        let mut engine = Engine::new();
        let sprite = test_sprite(&mut engine, 16);

        let a = engine
            .create_entity(0, 1, sprite, Fixed::from_int(0), Fixed::from_int(0))
            .unwrap();
        let _b = engine
            .create_entity(0, 2, sprite, Fixed::from_int(16), Fixed::from_int(0))
            .unwrap();

        assert_eq!(
            engine.colliding_entity(0, a as i32, 2),
            None,
            "boxes that only share an edge do not overlap"
        );
    }

    #[test]
    fn test_deferred_release_swaps_last_entity_in() {
        let mut engine = Engine::new();
        let mut graphics = Graphics::new();
        let sprite = test_sprite(&mut engine, 8);
        let memory = [0u8; 256];

        let _a = engine.create_entity(0, 100, sprite, Fixed::ZERO, Fixed::ZERO).unwrap();
        let b = engine.create_entity(0, 200, sprite, Fixed::ZERO, Fixed::ZERO).unwrap();
        let _c = engine.create_entity(0, 300, sprite, Fixed::ZERO, Fixed::ZERO).unwrap();

        engine.release_entity(0, b as i32);
        engine.sync(Fixed::ONE, &memory, &mut graphics);

        assert_eq!(engine.number_of_entities(0), 2);
        let swapped = engine.entity(0, b as i32).unwrap();
        assert_eq!(swapped.type_id, 300, "the last entity should move into the slot");
        assert_eq!(swapped.index, b, "the moved entity keeps the slot's index");
    }

    #[test]
    fn test_sync_moves_entities_along_direction() {
        let mut engine = Engine::new();
        let mut graphics = Graphics::new();
        let sprite = test_sprite(&mut engine, 8);
        let memory = [0u8; 256];

        let index = engine
            .create_entity(0, 1, sprite, Fixed::from_int(10), Fixed::from_int(10))
            .unwrap();
        {
            let entity = engine.entity_mut(0, index as i32).unwrap();
            entity.direction = IntPoint { x: 1, y: -1 };
            entity.speed = FixedPoint {
                x: Fixed::from_int(3),
                y: Fixed::from_int(2),
            };
        }

        engine.sync(Fixed::ONE, &memory, &mut graphics);

        let entity = engine.entity(0, index as i32).unwrap();
        assert_eq!(entity.position.x, Fixed::from_int(13));
        assert_eq!(entity.position.y, Fixed::from_int(8));
    }

    #[test]
    fn test_animation_wraps_to_first_frame() {
        let mut engine = Engine::new();
        let mut graphics = Graphics::new();
        let memory = [0u8; 1024];

        let sprite_index = engine
            .get_sprite(SpriteImage {
                width: 32,
                height: 8,
                data_address: 0,
            })
            .unwrap();
        {
            let sprite = engine.sprite_mut(sprite_index as i32).unwrap();
            sprite.frame_width = 8;
            sprite.frame_height = 8;
            sprite.num_frames = 4;
            sprite.frame_speed = Fixed::from_int(1);
        }

        let index = engine
            .create_entity(0, 1, sprite_index, Fixed::ZERO, Fixed::ZERO)
            .unwrap();

        for _ in 0..3 {
            engine.sync(Fixed::ONE, &memory, &mut graphics);
        }
        assert_eq!(engine.entity(0, index as i32).unwrap().frame_index.to_int(), 3);

        engine.sync(Fixed::ONE, &memory, &mut graphics);
        assert_eq!(
            engine.entity(0, index as i32).unwrap().frame_index,
            Fixed::ZERO,
            "the cursor should wrap after the last frame"
        );
    }

    #[test]
    fn test_find_entity_index_by_occurrence() {
        let mut engine = Engine::new();
        let sprite = test_sprite(&mut engine, 8);

        engine.create_entity(2, 5, sprite, Fixed::ZERO, Fixed::ZERO);
        engine.create_entity(2, 9, sprite, Fixed::ZERO, Fixed::ZERO);
        engine.create_entity(2, 5, sprite, Fixed::ZERO, Fixed::ZERO);

        assert_eq!(engine.find_entity_index(2, 5, 1), 0);
        assert_eq!(engine.find_entity_index(2, 5, 2), 2);
        assert_eq!(engine.find_entity_index(2, 5, 3), -1);
        assert_eq!(engine.find_entity_index(2, 5, 0), -1);
    }

    #[test]
    fn test_entity_on_screen_boundaries() {
        let mut engine = Engine::new();
        let sprite = test_sprite(&mut engine, 16);

        let index = engine
            .create_entity(0, 1, sprite, Fixed::from_int(-16), Fixed::from_int(0))
            .unwrap() as i32;
        assert!(engine.is_entity_on_screen(0, index));

        engine.entity_mut(0, index).unwrap().position.x = Fixed::from_int(-17);
        assert!(!engine.is_entity_on_screen(0, index));

        engine.entity_mut(0, index).unwrap().position.x = Fixed::from_int(159);
        assert!(engine.is_entity_on_screen(0, index));

        engine.entity_mut(0, index).unwrap().position.x = Fixed::from_int(160);
        assert!(!engine.is_entity_on_screen(0, index));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut engine = Engine::new();
        let sprite = test_sprite(&mut engine, 8);
        engine.create_entity(0, 1, sprite, Fixed::ZERO, Fixed::ZERO);

        engine.reset();

        assert_eq!(engine.number_of_entities(0), 0);
        assert!(engine.sprite(sprite as i32).is_none());
        assert_eq!(engine.get_sprite(SpriteImage::default()), Some(0));
    }
}
