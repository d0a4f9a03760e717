use crate::animation::tracker::AnimationTracker;
use crate::core::geo::{floor_div, Rect, Size, TileCoord, TileRect};
use crate::Result;
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;

/// Shared, immutable tile artwork.
///
/// Images are handed out by reference count so that the same artwork can sit
/// in an adapter, an animation token and a redraw pass at once.
pub type TileImage = Arc<RgbaImage>;

/// One frame of a tile animation as described by a map source
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub gid: u32,
    pub image: TileImage,
    pub duration: Duration,
}

impl FrameSpec {
    pub fn new(gid: u32, image: TileImage, duration: Duration) -> Self {
        Self {
            gid,
            image,
            duration,
        }
    }
}

/// An animated tile and every position on the map that shows it
#[derive(Debug, Clone)]
pub struct TileAnimation {
    pub positions: Vec<TileCoord>,
    pub frames: Vec<FrameSpec>,
    pub looping: bool,
}

impl TileAnimation {
    pub fn new(positions: Vec<TileCoord>, frames: Vec<FrameSpec>) -> Self {
        Self {
            positions,
            frames,
            looping: true,
        }
    }

    pub fn once(mut self) -> Self {
        self.looping = false;
        self
    }
}

/// Query interface between the renderer and whatever holds the map.
///
/// The renderer never parses map files itself; it only asks an adapter for
/// tile dimensions, layer information and per-cell images.
pub trait MapDataAdapter: Send + Sync {
    /// Pixel size of one tile. Need not be square.
    fn tile_size(&self) -> Size;

    /// Map size in tiles
    fn map_size(&self) -> Size;

    /// Number of tile layers, visible or not
    fn layer_count(&self) -> usize;

    /// Ordinals of the visible tile layers, ascending (back to front)
    fn visible_tile_layers(&self) -> Vec<usize>;

    /// Image for one cell, or `None` when the cell is empty.
    ///
    /// An error means the cell should have an image but it could not be read;
    /// the renderer leaves such cells blank.
    fn tile_image(&self, coord: TileCoord) -> Result<Option<TileImage>>;

    /// Every animated tile the map contains
    fn animations(&self) -> Vec<TileAnimation> {
        Vec::new()
    }

    /// Counter that changes whenever the map content changes
    fn revision(&self) -> u64 {
        0
    }

    /// Re-read the underlying data
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    /// Advisory hook called with the tile rect about to be drawn
    fn prepare_tiles(&self, _view: TileRect) {}

    /// Map extent in world pixels
    fn map_rect(&self) -> Rect {
        let tile = self.tile_size();
        let map = self.map_size();
        Rect::new(0, 0, map.width * tile.width, map.height * tile.height)
    }

    /// Tile column and row under a world pixel
    fn pixel_to_tile(&self, x: f64, y: f64) -> (i32, i32) {
        let tile = self.tile_size();
        let (column, _) = floor_div(x.floor() as i32, tile.width);
        let (row, _) = floor_div(y.floor() as i32, tile.height);
        (column, row)
    }

    fn is_on_map(&self, column: i32, row: i32) -> bool {
        let map = self.map_size();
        column >= 0 && row >= 0 && (column as u32) < map.width && (row as u32) < map.height
    }
}

/// Tile source used during redraws.
///
/// Cells that are currently animating answer with their current frame, so a
/// full redraw never snaps an animation back to its first frame.
#[derive(Clone, Copy)]
pub struct TileLookup<'a> {
    data: &'a dyn MapDataAdapter,
    animations: Option<&'a AnimationTracker>,
}

impl<'a> TileLookup<'a> {
    pub fn new(data: &'a dyn MapDataAdapter) -> Self {
        Self {
            data,
            animations: None,
        }
    }

    pub fn with_animations(mut self, animations: &'a AnimationTracker) -> Self {
        self.animations = Some(animations);
        self
    }

    pub fn data(&self) -> &'a dyn MapDataAdapter {
        self.data
    }

    pub fn tile_size(&self) -> Size {
        self.data.tile_size()
    }

    pub fn visible_tile_layers(&self) -> Vec<usize> {
        self.data.visible_tile_layers()
    }

    pub fn tile_image(&self, coord: TileCoord) -> Result<Option<TileImage>> {
        if let Some(image) = self.animations.and_then(|a| a.current_image(coord)) {
            return Ok(Some(image));
        }
        self.data.tile_image(coord)
    }
}
