use crate::core::geo::{Size, TileCoord};
use crate::data::adapter::{FrameSpec, MapDataAdapter, TileAnimation, TileImage};
use crate::Result;
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use std::time::Duration;

const TILE_SIZE: Size = Size::new(32, 32);
const MAP_SIZE: Size = Size::new(40, 30);
const LAYER_COUNT: usize = 3;

pub const GID_GRASS: u32 = 1;
pub const GID_WATER: u32 = 2;
pub const GID_ROCK: u32 = 3;
pub const GID_ALT_WATER: u32 = 999;

const GRASS: [u8; 4] = [0x79, 0x9a, 0x46, 0xff];
const WATER: [u8; 4] = [0x4a, 0x82, 0xa6, 0xff];
const ROCK: [u8; 4] = [0x55, 0x55, 0x55, 0xff];
const ALT_WATER: [u8; 4] = [0x62, 0xa2, 0xcc, 0xff];

const WATER_FRAME: Duration = Duration::from_millis(500);

/// A generated map for demos and tests.
///
/// Three layers: a grass/water checkerboard on the ground, a rock on every
/// fifth row and column, and an empty overlay. Water tiles animate between
/// two shades of blue.
#[derive(Debug, Clone)]
pub struct ProceduralMapData {
    map_size: Size,
    grass: TileImage,
    water: TileImage,
    rock: TileImage,
    alt_water: TileImage,
}

impl ProceduralMapData {
    pub fn new() -> Self {
        Self::with_size(MAP_SIZE)
    }

    /// Same layout, different map size in tiles
    pub fn with_size(map_size: Size) -> Self {
        let solid =
            |color| Arc::new(RgbaImage::from_pixel(TILE_SIZE.width, TILE_SIZE.height, Rgba(color)));
        Self {
            map_size,
            grass: solid(GRASS),
            water: solid(WATER),
            rock: solid(ROCK),
            alt_water: solid(ALT_WATER),
        }
    }

    pub fn gid_at(&self, coord: TileCoord) -> Option<u32> {
        if !self.is_on_map(coord.column, coord.row) {
            return None;
        }
        match coord.layer {
            0 if (coord.column + coord.row) % 2 == 0 => Some(GID_GRASS),
            0 => Some(GID_WATER),
            1 if coord.column % 5 == 0 && coord.row % 5 == 0 => Some(GID_ROCK),
            _ => None,
        }
    }

    pub fn image_by_gid(&self, gid: u32) -> Option<TileImage> {
        match gid {
            GID_GRASS => Some(self.grass.clone()),
            GID_WATER => Some(self.water.clone()),
            GID_ROCK => Some(self.rock.clone()),
            GID_ALT_WATER => Some(self.alt_water.clone()),
            _ => None,
        }
    }
}

impl Default for ProceduralMapData {
    fn default() -> Self {
        Self::new()
    }
}

impl MapDataAdapter for ProceduralMapData {
    fn tile_size(&self) -> Size {
        TILE_SIZE
    }

    fn map_size(&self) -> Size {
        self.map_size
    }

    fn layer_count(&self) -> usize {
        LAYER_COUNT
    }

    fn visible_tile_layers(&self) -> Vec<usize> {
        (0..LAYER_COUNT).collect()
    }

    fn tile_image(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        Ok(self.gid_at(coord).and_then(|gid| self.image_by_gid(gid)))
    }

    fn animations(&self) -> Vec<TileAnimation> {
        let positions = (0..self.map_size.height as i32)
            .flat_map(|row| {
                (0..self.map_size.width as i32).map(move |column| TileCoord::new(column, row, 0))
            })
            .filter(|coord| self.gid_at(*coord) == Some(GID_WATER))
            .collect();
        let frames = vec![
            FrameSpec::new(GID_WATER, self.water.clone(), WATER_FRAME),
            FrameSpec::new(GID_ALT_WATER, self.alt_water.clone(), WATER_FRAME),
        ];
        vec![TileAnimation::new(positions, frames)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let data = ProceduralMapData::new();
        assert_eq!(data.map_size(), Size::new(40, 30));
        assert_eq!(data.gid_at(TileCoord::new(0, 0, 0)), Some(GID_GRASS));
        assert_eq!(data.gid_at(TileCoord::new(1, 0, 0)), Some(GID_WATER));
        assert_eq!(data.gid_at(TileCoord::new(5, 10, 1)), Some(GID_ROCK));
        assert_eq!(data.gid_at(TileCoord::new(4, 10, 1)), None);
        assert_eq!(data.gid_at(TileCoord::new(0, 0, 2)), None);
        assert_eq!(data.gid_at(TileCoord::new(40, 0, 0)), None);
    }

    #[test]
    fn test_water_animation_covers_every_water_cell() {
        let data = ProceduralMapData::with_size(Size::new(4, 4));
        let animations = data.animations();
        assert_eq!(animations.len(), 1);
        assert_eq!(animations[0].positions.len(), 8);
        assert_eq!(animations[0].frames[1].gid, GID_ALT_WATER);
        assert_eq!(animations[0].frames[0].duration, Duration::from_millis(500));
    }
}
