use crate::core::geo::{Rect, Size, TileCoord};
use crate::data::adapter::{MapDataAdapter, TileAnimation, TileImage};
use crate::{MapError, Result};
use std::collections::BTreeSet;

struct ChildMap {
    data: Box<dyn MapDataAdapter>,
    /// Placement in tile units
    rect: Rect,
    layer_offset: usize,
}

/// Presents several maps as one.
///
/// Each child sits at a tile offset and a layer offset inside the combined
/// map. All children must share the same tile size. With normalization on,
/// children placed at negative offsets shift everything so that the combined
/// map still starts at (0, 0).
pub struct MapAggregator {
    tile_size: Size,
    normalize: bool,
    maps: Vec<ChildMap>,
    map_size: Size,
    revision: u64,
}

impl MapAggregator {
    pub fn new(tile_size: Size, normalize: bool) -> Self {
        Self {
            tile_size,
            normalize,
            maps: Vec::new(),
            map_size: Size::default(),
            revision: 0,
        }
    }

    /// Adds a map whose top-left tile lands at `offset`, its layers starting at `layer`.
    pub fn add_map(
        &mut self,
        data: Box<dyn MapDataAdapter>,
        offset: (i32, i32),
        layer: usize,
    ) -> Result<()> {
        if data.tile_size() != self.tile_size {
            return Err(MapError::InvalidConfiguration(format!(
                "tile size {} does not match the aggregator's {}",
                data.tile_size(),
                self.tile_size
            )));
        }
        let size = data.map_size();
        self.maps.push(ChildMap {
            data,
            rect: Rect::new(offset.0, offset.1, size.width, size.height),
            layer_offset: layer,
        });
        self.update_layout();
        Ok(())
    }

    /// Removes the map at `index` (in insertion order) and hands it back.
    pub fn remove_map(&mut self, index: usize) -> Result<Box<dyn MapDataAdapter>> {
        if index >= self.maps.len() {
            return Err(MapError::InvalidConfiguration(format!(
                "no map at index {index} in the aggregator"
            )));
        }
        let child = self.maps.remove(index);
        self.update_layout();
        Ok(child.data)
    }

    /// Placement of a child map in tile units
    pub fn placement(&self, index: usize) -> Option<(Rect, usize)> {
        self.maps.get(index).map(|child| (child.rect, child.layer_offset))
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Finds the child owning a combined-map cell and the cell in its local coordinates.
    ///
    /// Children are searched in insertion order; the first one that has a
    /// visible layer at the requested ordinal wins.
    pub fn world_to_local(&self, coord: TileCoord) -> Option<(&dyn MapDataAdapter, TileCoord)> {
        self.maps.iter().find_map(|child| {
            if !child.rect.contains_point(coord.column, coord.row) {
                return None;
            }
            let layer = coord.layer.checked_sub(child.layer_offset)?;
            if !child.data.visible_tile_layers().contains(&layer) {
                return None;
            }
            let local =
                TileCoord::new(coord.column - child.rect.x, coord.row - child.rect.y, layer);
            Some((child.data.as_ref(), local))
        })
    }

    fn update_layout(&mut self) {
        if self.normalize {
            let min_x = self.maps.iter().map(|c| c.rect.x).min().unwrap_or(0);
            let min_y = self.maps.iter().map(|c| c.rect.y).min().unwrap_or(0);
            let shift_x = (-min_x).max(0);
            let shift_y = (-min_y).max(0);
            if shift_x != 0 || shift_y != 0 {
                log::debug!("normalizing aggregated maps by ({shift_x}, {shift_y}) tiles");
                for child in &mut self.maps {
                    child.rect = child.rect.translate(shift_x, shift_y);
                }
            }
        }

        let width = self.maps.iter().map(|c| c.rect.right()).max().unwrap_or(0).max(0);
        let height = self.maps.iter().map(|c| c.rect.bottom()).max().unwrap_or(0).max(0);
        self.map_size = Size::new(width as u32, height as u32);
        self.revision = self.revision.wrapping_add(1);
    }
}

impl MapDataAdapter for MapAggregator {
    fn tile_size(&self) -> Size {
        self.tile_size
    }

    fn map_size(&self) -> Size {
        self.map_size
    }

    fn layer_count(&self) -> usize {
        self.maps
            .iter()
            .map(|child| child.layer_offset + child.data.layer_count())
            .max()
            .unwrap_or(0)
    }

    fn visible_tile_layers(&self) -> Vec<usize> {
        let layers: BTreeSet<usize> = self
            .maps
            .iter()
            .flat_map(|child| {
                child
                    .data
                    .visible_tile_layers()
                    .into_iter()
                    .map(move |layer| layer + child.layer_offset)
            })
            .collect();
        layers.into_iter().collect()
    }

    fn tile_image(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        match self.world_to_local(coord) {
            Some((data, local)) => data.tile_image(local),
            None => Ok(None),
        }
    }

    fn animations(&self) -> Vec<TileAnimation> {
        self.maps
            .iter()
            .flat_map(|child| {
                child.data.animations().into_iter().map(move |mut animation| {
                    for position in &mut animation.positions {
                        position.column += child.rect.x;
                        position.row += child.rect.y;
                        position.layer += child.layer_offset;
                    }
                    animation
                })
            })
            .collect()
    }

    fn revision(&self) -> u64 {
        self.maps
            .iter()
            .fold(self.revision, |acc, child| acc.wrapping_add(child.data.revision()))
    }

    fn reload(&mut self) -> Result<()> {
        for child in &mut self.maps {
            child.data.reload()?;
        }
        // children may have changed size
        for child in &mut self.maps {
            let size = child.data.map_size();
            child.rect.width = size.width;
            child.rect.height = size.height;
        }
        self.update_layout();
        Ok(())
    }

    fn prepare_tiles(&self, view: Rect) {
        for child in &self.maps {
            if let Some(clipped) = child.rect.intersection(&view) {
                child.data.prepare_tiles(clipped.translate(-child.rect.x, -child.rect.y));
            }
        }
    }
}
