use crate::core::geo::{Size, TileCoord};
use crate::data::adapter::{FrameSpec, MapDataAdapter, TileAnimation, TileImage};
use crate::prelude::HashMap;
use crate::{MapError, Result};
use std::time::Duration;

/// A single layer of gids, stored row-major
#[derive(Debug, Clone)]
pub struct GridLayer {
    pub name: String,
    pub visible: bool,
    cells: Vec<Option<u32>>,
}

#[derive(Debug, Clone)]
struct GridAnimation {
    frames: Vec<(u32, Duration)>,
    looping: bool,
}

/// In-memory layered tile map.
///
/// Cells hold tile ids (gids) that are resolved through an image table, the
/// same indirection Tiled maps use. Any mutation bumps the revision so a
/// renderer drawing this map picks the change up on its next frame.
#[derive(Debug, Clone)]
pub struct GridMapData {
    tile_size: Size,
    map_size: Size,
    layers: Vec<GridLayer>,
    images: HashMap<u32, TileImage>,
    animations: HashMap<u32, GridAnimation>,
    revision: u64,
}

impl GridMapData {
    pub fn new(tile_size: Size, map_size: Size) -> Self {
        Self {
            tile_size,
            map_size,
            layers: Vec::new(),
            images: HashMap::default(),
            animations: HashMap::default(),
            revision: 0,
        }
    }

    /// Appends an empty, visible layer on top and returns its ordinal
    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        let cells = vec![None; self.map_size.area() as usize];
        self.layers.push(GridLayer {
            name: name.into(),
            visible: true,
            cells,
        });
        self.touch();
        self.layers.len() - 1
    }

    pub fn layer(&self, layer: usize) -> Option<&GridLayer> {
        self.layers.get(layer)
    }

    pub fn set_layer_visible(&mut self, layer: usize, visible: bool) -> Result<()> {
        let entry = self.layers.get_mut(layer).ok_or_else(|| {
            MapError::InvalidConfiguration(format!("no layer with ordinal {layer}"))
        })?;
        entry.visible = visible;
        self.touch();
        Ok(())
    }

    /// Registers the artwork for a gid
    pub fn insert_image(&mut self, gid: u32, image: TileImage) {
        self.images.insert(gid, image);
        self.touch();
    }

    pub fn set_tile(&mut self, coord: TileCoord, gid: Option<u32>) -> Result<()> {
        let index = self.cell_index(coord.column, coord.row).ok_or_else(|| {
            MapError::InvalidConfiguration(format!("cell {coord} is outside the map"))
        })?;
        let layer = self.layers.get_mut(coord.layer).ok_or_else(|| {
            MapError::InvalidConfiguration(format!("no layer with ordinal {}", coord.layer))
        })?;
        layer.cells[index] = gid;
        self.touch();
        Ok(())
    }

    /// Sets every cell of a layer to the same gid
    pub fn fill_layer(&mut self, layer: usize, gid: Option<u32>) -> Result<()> {
        let entry = self.layers.get_mut(layer).ok_or_else(|| {
            MapError::InvalidConfiguration(format!("no layer with ordinal {layer}"))
        })?;
        entry.cells.iter_mut().for_each(|cell| *cell = gid);
        self.touch();
        Ok(())
    }

    pub fn gid_at(&self, coord: TileCoord) -> Option<u32> {
        let index = self.cell_index(coord.column, coord.row)?;
        self.layers.get(coord.layer)?.cells[index]
    }

    /// Animates every cell showing `gid` through the given frames.
    ///
    /// Each frame is a gid and how long it stays on screen. Frame gids must
    /// already have images.
    pub fn set_animation(
        &mut self,
        gid: u32,
        frames: Vec<(u32, Duration)>,
        looping: bool,
    ) -> Result<()> {
        if let Some((missing, _)) = frames
            .iter()
            .find(|(frame_gid, _)| !self.images.contains_key(frame_gid))
        {
            return Err(MapError::InvalidConfiguration(format!(
                "animation frame gid {missing} has no image"
            )));
        }
        self.animations.insert(gid, GridAnimation { frames, looping });
        self.touch();
        Ok(())
    }

    fn cell_index(&self, column: i32, row: i32) -> Option<usize> {
        if !self.is_on_map(column, row) {
            return None;
        }
        Some(row as usize * self.map_size.width as usize + column as usize)
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl MapDataAdapter for GridMapData {
    fn tile_size(&self) -> Size {
        self.tile_size
    }

    fn map_size(&self) -> Size {
        self.map_size
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn visible_tile_layers(&self) -> Vec<usize> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| layer.visible)
            .map(|(ordinal, _)| ordinal)
            .collect()
    }

    fn tile_image(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        let Some(gid) = self.gid_at(coord) else {
            return Ok(None);
        };
        match self.images.get(&gid) {
            Some(image) => Ok(Some(image.clone())),
            None => Err(MapError::TileRead {
                coord,
                reason: format!("no image registered for gid {gid}"),
            }),
        }
    }

    fn animations(&self) -> Vec<TileAnimation> {
        let mut gids: Vec<u32> = self.animations.keys().copied().collect();
        gids.sort_unstable();

        let mut result = Vec::with_capacity(gids.len());
        for gid in gids {
            let Some(animation) = self.animations.get(&gid) else {
                continue;
            };
            let frames = animation
                .frames
                .iter()
                .filter_map(|(frame_gid, duration)| {
                    self.images
                        .get(frame_gid)
                        .map(|image| FrameSpec::new(*frame_gid, image.clone(), *duration))
                })
                .collect();

            let width = self.map_size.width as usize;
            let positions = self
                .layers
                .iter()
                .enumerate()
                .flat_map(|(ordinal, layer)| {
                    layer
                        .cells
                        .iter()
                        .enumerate()
                        .filter(move |(_, cell)| **cell == Some(gid))
                        .map(move |(index, _)| {
                            TileCoord::new((index % width) as i32, (index / width) as i32, ordinal)
                        })
                })
                .collect();

            result.push(TileAnimation {
                positions,
                frames,
                looping: animation.looping,
            });
        }
        result
    }

    fn revision(&self) -> u64 {
        self.revision
    }

    fn reload(&mut self) -> Result<()> {
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    fn solid(color: [u8; 4]) -> TileImage {
        Arc::new(RgbaImage::from_pixel(8, 8, Rgba(color)))
    }

    fn small_map() -> GridMapData {
        let mut data = GridMapData::new(Size::new(8, 8), Size::new(4, 3));
        data.add_layer("ground");
        data.add_layer("detail");
        data.insert_image(1, solid([10, 20, 30, 255]));
        data.fill_layer(0, Some(1)).unwrap();
        data
    }

    #[test]
    fn test_tile_lookup() {
        let data = small_map();
        let image = data.tile_image(TileCoord::new(2, 1, 0)).unwrap().unwrap();
        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert!(data.tile_image(TileCoord::new(2, 1, 1)).unwrap().is_none());
        assert!(data.tile_image(TileCoord::new(9, 1, 0)).unwrap().is_none());
        assert!(data.tile_image(TileCoord::new(0, 0, 7)).unwrap().is_none());
    }

    #[test]
    fn test_missing_image_is_read_failure() {
        let mut data = small_map();
        data.set_tile(TileCoord::new(1, 1, 1), Some(42)).unwrap();
        let err = data.tile_image(TileCoord::new(1, 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            MapError::TileRead { coord, .. } if coord == TileCoord::new(1, 1, 1)
        ));
    }

    #[test]
    fn test_visibility_and_revision() {
        let mut data = small_map();
        let before = data.revision();
        data.set_layer_visible(1, false).unwrap();
        assert_eq!(data.visible_tile_layers(), vec![0]);
        assert!(data.revision() > before);
        assert!(data.set_layer_visible(5, false).is_err());
        assert!(data.set_tile(TileCoord::new(4, 0, 0), Some(1)).is_err());
    }

    #[test]
    fn test_animation_positions() {
        let mut data = small_map();
        data.insert_image(2, solid([0, 0, 255, 255]));
        data.set_tile(TileCoord::new(3, 2, 1), Some(1)).unwrap();
        let frames = vec![(1, Duration::from_millis(100)), (2, Duration::from_millis(100))];
        data.set_animation(1, frames, true).unwrap();

        let animations = data.animations();
        assert_eq!(animations.len(), 1);
        assert_eq!(animations[0].frames.len(), 2);
        // 12 ground cells plus one detail cell
        assert_eq!(animations[0].positions.len(), 13);
        assert!(animations[0].positions.contains(&TileCoord::new(3, 2, 1)));

        assert!(data
            .set_animation(1, vec![(77, Duration::from_millis(100))], true)
            .is_err());
    }
}
