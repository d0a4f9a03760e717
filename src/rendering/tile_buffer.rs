//! The off-screen tile buffer
//!
//! The buffer covers a tile-aligned world area a little larger than the
//! viewport, with one RGBA surface per visible map layer. Moving the camera by
//! a few tiles shifts the pixels already drawn and only redraws the strips of
//! cells that became exposed on the leading edges. Larger moves, resizes and
//! layer changes rebuild everything.

use crate::animation::tracker::AnimationSwap;
use crate::core::geo::{ceil_div, floor_div, Rect, Size, TileCoord, TileRect};
use crate::data::adapter::TileLookup;
use crate::rendering::surface::{blend_pixel, BlendMode, Surface};
use crate::{MapError, Result};
use image::{GenericImage, GenericImageView, Rgba, RgbaImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Counters describing the most recent redraw pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedrawStats {
    /// Cells redrawn, counted once per (column, row)
    pub cells: usize,
    /// Cells redrawn times buffered layers
    pub tiles_visited: usize,
    /// Cells that received an image
    pub tiles_drawn: usize,
    /// Cells left blank because the image could not be read
    pub tiles_failed: usize,
    pub full_rebuild: bool,
}

/// Cells exposed by an incremental scroll.
///
/// At most one strip of columns and one strip of rows, in buffer tile
/// coordinates. The row strip leaves out the columns already covered by the
/// column strip, so a diagonal move counts the shared corner once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyRegion {
    pub columns: Option<TileRect>,
    pub rows: Option<TileRect>,
}

impl DirtyRegion {
    /// Leading edges exposed when the buffer extent `view` moved by (`dx`, `dy`) tiles
    pub fn leading_edges(view: TileRect, dx: i32, dy: i32) -> Self {
        let width = dx.unsigned_abs().min(view.width);
        let height = dy.unsigned_abs().min(view.height);

        let columns = match dx {
            0 => None,
            d if d > 0 => Some(Rect::new(view.right() - width as i32, view.y, width, view.height)),
            _ => Some(Rect::new(view.x, view.y, width, view.height)),
        };

        // columns not already in the column strip
        let (row_x, row_width) = match dx {
            d if d > 0 => (view.x, view.width - width),
            d if d < 0 => (view.x + width as i32, view.width - width),
            _ => (view.x, view.width),
        };
        let rows = match dy {
            0 => None,
            d if d > 0 => Some(Rect::new(row_x, view.bottom() - height as i32, row_width, height)),
            _ => Some(Rect::new(row_x, view.y, row_width, height)),
        }
        .filter(|rect| !rect.is_empty());

        Self { columns, rows }
    }

    pub fn rects(&self) -> impl Iterator<Item = TileRect> + '_ {
        self.columns.iter().chain(self.rows.iter()).copied()
    }

    /// Number of dirty cells
    pub fn len(&self) -> usize {
        self.rects().map(|rect| rect.cell_count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, column: i32, row: i32) -> bool {
        self.rects().any(|rect| rect.contains_point(column, row))
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.columns
            .iter()
            .chain(self.rows.iter())
            .flat_map(|rect| rect.cells())
    }
}

/// What `scroll_to` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollOutcome {
    /// The view still maps to the same buffer extent
    Unchanged,
    /// Pixels were shifted and the exposed cells redrawn
    Shifted(DirtyRegion),
    /// The whole buffer was redrawn
    Rebuilt,
}

/// Read-only window into one buffered layer
#[derive(Debug, Clone, Copy)]
pub struct LayerView<'a> {
    image: &'a RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl<'a> LayerView<'a> {
    /// Window of `image` starting at (`x`, `y`), clipped to the image
    pub fn new(image: &'a RgbaImage, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(image.width());
        let y = y.min(image.height());
        Self {
            image,
            x,
            y,
            width: width.min(image.width() - x),
            height: height.min(image.height() - y),
        }
    }

    /// Offset of the window inside the layer surface
    pub fn offset(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            *self.image.get_pixel(self.x + x, self.y + y)
        })
    }
}

impl GenericImageView for LayerView<'_> {
    type Pixel = Rgba<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn bounds(&self) -> (u32, u32, u32, u32) {
        (0, 0, self.width, self.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(self.x + x, self.y + y)
    }
}

/// Read-only view of part of the buffer, one window per layer.
///
/// Valid until the next mutation of the buffer.
pub struct BufferRegion<'a> {
    rect: Rect,
    layers: Vec<(usize, LayerView<'a>)>,
}

impl<'a> BufferRegion<'a> {
    /// World rectangle covered by the region
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn size(&self) -> Size {
        self.rect.size()
    }

    /// Layer ordinals and pixels, back to front
    pub fn layers(&self) -> impl Iterator<Item = (usize, &LayerView<'a>)> {
        self.layers.iter().map(|(ordinal, view)| (*ordinal, view))
    }

    pub fn layer(&self, ordinal: usize) -> Option<&LayerView<'a>> {
        self.layers
            .iter()
            .find(|(candidate, _)| *candidate == ordinal)
            .map(|(_, view)| view)
    }

    /// All layers blended into one image, with nothing but the map in it
    pub fn flatten(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.rect.width, self.rect.height);
        for (_, view) in &self.layers {
            for (x, y, pixel) in view.pixels() {
                let under = *image.get_pixel(x, y);
                image.put_pixel(x, y, blend_pixel(pixel, under, BlendMode::Normal));
            }
        }
        image
    }
}

#[derive(Debug, Clone)]
pub struct TileBuffer {
    tile_size: Size,
    padding: u32,
    /// Buffered layer ordinals, ascending
    layers: Vec<usize>,
    surfaces: Vec<RgbaImage>,
    /// Buffer extent in tiles
    tile_view: TileRect,
    stats: RedrawStats,
}

impl TileBuffer {
    /// Creates an empty buffer; nothing is allocated until the first `resize`.
    pub fn new(tile_size: Size, padding: u32) -> Self {
        Self {
            tile_size,
            padding: padding.max(1),
            layers: Vec::new(),
            surfaces: Vec::new(),
            tile_view: TileRect::default(),
            stats: RedrawStats::default(),
        }
    }

    pub fn tile_size(&self) -> Size {
        self.tile_size
    }

    pub fn padding(&self) -> u32 {
        self.padding
    }

    pub fn tile_view(&self) -> TileRect {
        self.tile_view
    }

    pub fn layers(&self) -> &[usize] {
        &self.layers
    }

    pub fn stats(&self) -> RedrawStats {
        self.stats
    }

    /// True once `resize` has given the buffer an extent.
    ///
    /// A map with every layer hidden still has an allocated buffer; it just
    /// holds no surfaces.
    pub fn is_allocated(&self) -> bool {
        !self.tile_view.is_empty()
    }

    /// Buffer extent in world pixels
    pub fn buffer_rect(&self) -> Rect {
        Rect::new(
            self.tile_view.x * self.tile_size.width as i32,
            self.tile_view.y * self.tile_size.height as i32,
            self.tile_view.width * self.tile_size.width,
            self.tile_view.height * self.tile_size.height,
        )
    }

    /// Pixels of one buffered layer
    pub fn layer_surface(&self, ordinal: usize) -> Option<&RgbaImage> {
        let index = self.layers.iter().position(|l| *l == ordinal)?;
        self.surfaces.get(index)
    }

    /// Tile extent the buffer must cover to contain `view`.
    ///
    /// The viewport width in tiles, rounded up, plus the padding; the origin
    /// starts half the padding before the tile under the view's left edge.
    pub fn required_tile_view(&self, view: Rect) -> TileRect {
        let Size { width: tw, height: th } = self.tile_size;
        let (column, _) = floor_div(view.x, tw);
        let (row, _) = floor_div(view.y, th);
        let lead = (self.padding / 2) as i32;
        Rect::new(
            column - lead,
            row - lead,
            ceil_div(view.width, tw) + self.padding,
            ceil_div(view.height, th) + self.padding,
        )
    }

    /// Reallocates the buffer around `view` and redraws every cell of every layer.
    pub fn resize(&mut self, view: Rect, lookup: &TileLookup<'_>) -> RedrawStats {
        self.tile_size = lookup.tile_size();
        self.layers = lookup.visible_tile_layers();
        self.tile_view = self.required_tile_view(view);

        let pixels = self.buffer_rect().size();
        self.surfaces = self
            .layers
            .iter()
            .map(|_| RgbaImage::new(pixels.width, pixels.height))
            .collect();

        log::debug!(
            "rebuilding tile buffer: {} tiles x {} layers ({} px)",
            self.tile_view.cell_count(),
            self.layers.len(),
            pixels
        );

        lookup.data().prepare_tiles(self.tile_view);
        let mut stats = RedrawStats {
            full_rebuild: true,
            ..RedrawStats::default()
        };
        let extent = self.tile_view;
        for (column, row) in extent.cells() {
            self.redraw_cell(column, row, lookup, &mut stats);
        }
        self.stats = stats;
        stats
    }

    /// Brings the buffer to the extent needed for `view`.
    ///
    /// Small moves shift the existing pixels and redraw the exposed cells;
    /// moves larger than the padding, a new view size, a new tile size or a
    /// changed set of visible layers rebuild the buffer.
    pub fn scroll_to(&mut self, view: Rect, lookup: &TileLookup<'_>) -> ScrollOutcome {
        let required = self.required_tile_view(view);
        if !self.is_allocated()
            || lookup.tile_size() != self.tile_size
            || required.size() != self.tile_view.size()
            || lookup.visible_tile_layers() != self.layers
        {
            self.resize(view, lookup);
            return ScrollOutcome::Rebuilt;
        }

        let dx = required.x - self.tile_view.x;
        let dy = required.y - self.tile_view.y;
        if dx == 0 && dy == 0 {
            self.stats = RedrawStats::default();
            return ScrollOutcome::Unchanged;
        }
        if dx.unsigned_abs().max(dy.unsigned_abs()) > self.padding {
            self.resize(view, lookup);
            return ScrollOutcome::Rebuilt;
        }

        self.shift_pixels(dx, dy);
        self.tile_view = required;
        let dirty = DirtyRegion::leading_edges(required, dx, dy);
        log::debug!("scrolled tile buffer by ({dx}, {dy}) tiles, {} dirty cells", dirty.len());

        lookup.data().prepare_tiles(self.tile_view);
        let mut stats = RedrawStats::default();
        for (column, row) in dirty.cells() {
            self.redraw_cell(column, row, lookup, &mut stats);
        }
        self.stats = stats;
        ScrollOutcome::Shifted(dirty)
    }

    /// Redraws every cell in place without reallocating
    pub fn redraw(&mut self, lookup: &TileLookup<'_>) -> RedrawStats {
        if lookup.visible_tile_layers() != self.layers || lookup.tile_size() != self.tile_size {
            let view = self.buffer_rect();
            return self.resize(view, lookup);
        }
        let mut stats = RedrawStats {
            full_rebuild: true,
            ..RedrawStats::default()
        };
        let extent = self.tile_view;
        for (column, row) in extent.cells() {
            self.redraw_cell(column, row, lookup, &mut stats);
        }
        self.stats = stats;
        stats
    }

    /// Replaces the pixels of one cell on one layer.
    ///
    /// Returns false when the cell is not in the buffer or its layer is not buffered.
    pub fn apply_animation_frame(&mut self, coord: TileCoord, image: &RgbaImage) -> bool {
        let Some(index) = self.layers.iter().position(|l| *l == coord.layer) else {
            return false;
        };
        if !self.tile_view.contains_point(coord.column, coord.row) {
            return false;
        }
        let cell = self.cell_rect(coord.column, coord.row);
        let tile_size = self.tile_size;
        if let Some(surface) = self.surfaces.get_mut(index) {
            surface.fill(cell, TRANSPARENT);
            paste_clipped(surface, image, cell, tile_size);
            return true;
        }
        false
    }

    /// Applies a frame change to every buffered position it names.
    ///
    /// Returns how many cells were updated.
    pub fn apply_swap(&mut self, swap: &AnimationSwap) -> usize {
        swap.positions
            .iter()
            .filter(|coord| self.apply_animation_frame(**coord, &swap.image))
            .count()
    }

    /// Read-only view of the buffer over a world rectangle.
    ///
    /// Fails when any part of `world_rect` lies outside the buffer.
    pub fn read_region(&self, world_rect: Rect) -> Result<BufferRegion<'_>> {
        let buffer = self.buffer_rect();
        if !self.is_allocated() || world_rect.is_empty() || !buffer.contains_rect(&world_rect) {
            log::error!("requested region {world_rect} is outside the tile buffer {buffer}");
            return Err(MapError::RegionOutOfBounds {
                requested: world_rect,
                buffer,
            });
        }
        let x = (world_rect.x - buffer.x) as u32;
        let y = (world_rect.y - buffer.y) as u32;
        let layers = self
            .layers
            .iter()
            .zip(&self.surfaces)
            .map(|(ordinal, surface)| {
                let view = LayerView::new(surface, x, y, world_rect.width, world_rect.height);
                (*ordinal, view)
            })
            .collect();
        Ok(BufferRegion {
            rect: world_rect,
            layers,
        })
    }

    /// Buffer pixel rectangle of a cell
    fn cell_rect(&self, column: i32, row: i32) -> Rect {
        let Size { width: tw, height: th } = self.tile_size;
        Rect::new(
            (column - self.tile_view.x) * tw as i32,
            (row - self.tile_view.y) * th as i32,
            tw,
            th,
        )
    }

    fn redraw_cell(
        &mut self,
        column: i32,
        row: i32,
        lookup: &TileLookup<'_>,
        stats: &mut RedrawStats,
    ) {
        stats.cells += 1;
        let cell = self.cell_rect(column, row);
        let tile_size = self.tile_size;
        for (ordinal, surface) in self.layers.iter().zip(self.surfaces.iter_mut()) {
            stats.tiles_visited += 1;
            surface.fill(cell, TRANSPARENT);
            let coord = TileCoord::new(column, row, *ordinal);
            match lookup.tile_image(coord) {
                Ok(Some(image)) => {
                    paste_clipped(surface, &image, cell, tile_size);
                    stats.tiles_drawn += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    log::warn!("leaving tile {coord} blank: {err}");
                    stats.tiles_failed += 1;
                }
            }
        }
    }

    /// Moves every layer's pixels by (-dx, -dy) tiles
    fn shift_pixels(&mut self, dx: i32, dy: i32) {
        let Size { width: tw, height: th } = self.tile_size;
        let shift_x = dx.unsigned_abs() * tw;
        let shift_y = dy.unsigned_abs() * th;
        for surface in &mut self.surfaces {
            let (width, height) = surface.dimensions();
            let (src_x, dst_x) = if dx >= 0 { (shift_x, 0) } else { (0, shift_x) };
            let (src_y, dst_y) = if dy >= 0 { (shift_y, 0) } else { (0, shift_y) };
            let source = image::math::Rect {
                x: src_x,
                y: src_y,
                width: width.saturating_sub(shift_x),
                height: height.saturating_sub(shift_y),
            };
            if !surface.copy_within(source, dst_x, dst_y) {
                log::warn!("tile buffer shift by ({dx}, {dy}) tiles fell outside the surface");
            }
        }
    }
}

/// Draws `image` at the cell's top-left, cropped to the cell
fn paste_clipped(surface: &mut RgbaImage, image: &RgbaImage, cell: Rect, tile_size: Size) {
    let tile = LayerView::new(image, 0, 0, tile_size.width, tile_size.height);
    if let Err(err) = surface.copy_from(&tile, cell.x as u32, cell.y as u32) {
        log::warn!("could not paste tile at {cell}: {err}");
    }
}
