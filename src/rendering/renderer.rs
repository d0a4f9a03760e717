use crate::animation::tracker::AnimationTracker;
use crate::core::camera::FollowCamera;
use crate::core::config::{BufferFormat, RendererConfig, ScaleFilter};
use crate::core::geo::{Point, Rect, Size};
use crate::core::viewport::Viewport;
use crate::data::adapter::{MapDataAdapter, TileLookup};
use crate::rendering::compositor::{CompositorDiagnostic, DrawOp, LayerCompositor, Renderable};
use crate::rendering::surface::{BlendMode, BlitMode, Surface};
use crate::rendering::tile_buffer::{LayerView, RedrawStats, ScrollOutcome, TileBuffer};
use crate::{MapError, Result};
use image::{imageops, RgbaImage};
use instant::Instant;

/// Draws a scrolling, layered tile map onto a host surface.
///
/// The renderer owns the map adapter, the camera, the tile buffer and the
/// animation schedule. A typical frame is one `center` call to move the
/// camera followed by one `draw` call with that frame's sprites.
pub struct BufferedRenderer {
    data: Box<dyn MapDataAdapter>,
    config: RendererConfig,
    format: BufferFormat,
    viewport: Viewport,
    buffer: TileBuffer,
    animations: AnimationTracker,
    compositor: LayerCompositor,
    /// Composited frame at the logical view size
    frame: RgbaImage,
    diagnostics: Vec<CompositorDiagnostic>,
    revision: u64,
}

impl BufferedRenderer {
    /// Validates `config` and draws the initial buffer centered on the map.
    pub fn new(data: Box<dyn MapDataAdapter>, config: RendererConfig) -> Result<Self> {
        config.validate()?;
        if data.tile_size().is_empty() {
            return Err(MapError::InvalidConfiguration(format!(
                "tile size must be positive, got {}",
                data.tile_size()
            )));
        }

        let viewport =
            Viewport::new(config.target_size, config.zoom, data.map_rect(), config.clamp_camera)?;
        let format = config.buffer_format();
        let logical = viewport.logical_size();
        let mut renderer = Self {
            animations: AnimationTracker::build(data.as_ref(), Instant::now()),
            buffer: TileBuffer::new(data.tile_size(), config.tile_padding),
            compositor: LayerCompositor::new(config.layer_overflow),
            frame: RgbaImage::from_pixel(logical.width, logical.height, format.clear_color()),
            diagnostics: Vec::new(),
            revision: data.revision(),
            data,
            config,
            format,
            viewport,
        };
        renderer.rebuild();
        log::info!(
            "renderer ready: {} map of {} tiles, {} view at zoom {}",
            renderer.data.map_size(),
            renderer.data.tile_size(),
            renderer.viewport.size(),
            renderer.viewport.zoom()
        );
        Ok(renderer)
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn buffer_format(&self) -> BufferFormat {
        self.format
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Visible map area in world pixels
    pub fn view_rect(&self) -> Rect {
        self.viewport.view_rect()
    }

    pub fn zoom(&self) -> f64 {
        self.viewport.zoom()
    }

    pub fn size(&self) -> Size {
        self.viewport.size()
    }

    pub fn tile_buffer(&self) -> &TileBuffer {
        &self.buffer
    }

    pub fn animations(&self) -> &AnimationTracker {
        &self.animations
    }

    /// Pause, resume or speed up tile animations
    pub fn animations_mut(&mut self) -> &mut AnimationTracker {
        &mut self.animations
    }

    /// Renderables that could not be placed during the last draw
    pub fn diagnostics(&self) -> &[CompositorDiagnostic] {
        &self.diagnostics
    }

    /// The last composited frame, at the logical view size
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn data(&self) -> &dyn MapDataAdapter {
        self.data.as_ref()
    }

    /// Mutable access to the map. Changes that bump the adapter's revision
    /// are picked up by the next `draw`.
    pub fn data_mut(&mut self) -> &mut dyn MapDataAdapter {
        self.data.as_mut()
    }

    /// Sets the on-screen size; a change rebuilds the buffer.
    pub fn set_size(&mut self, size: Size) -> Result<()> {
        if self.viewport.set_size(size)? {
            self.config.target_size = size;
            self.resize_frame();
            self.rebuild();
        }
        Ok(())
    }

    /// Sets the zoom level; a change rebuilds the buffer.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<()> {
        if self.viewport.set_zoom(zoom)? {
            self.config.zoom = zoom;
            self.resize_frame();
            self.rebuild();
        }
        Ok(())
    }

    /// Moves the camera so that `point` (world pixels) is at the center of the view.
    pub fn center(&mut self, point: impl Into<Point>) -> ScrollOutcome {
        let view = self.viewport.center_on(point.into());
        let lookup = TileLookup::new(self.data.as_ref()).with_animations(&self.animations);
        self.buffer.scroll_to(view, &lookup)
    }

    /// Eases the camera towards `target` over `dt` seconds.
    pub fn follow(
        &mut self,
        camera: &FollowCamera,
        target: impl Into<Point>,
        dt: f64,
    ) -> ScrollOutcome {
        let (cx, cy) = self.viewport.center();
        let next = camera.update(Point::from((cx, cy)), target.into(), dt);
        self.center(next)
    }

    /// Moves the camera by a vector in world pixels
    pub fn scroll(&mut self, dx: f64, dy: f64) -> ScrollOutcome {
        let (cx, cy) = self.viewport.center();
        self.center(Point::new(cx as f64 + dx, cy as f64 + dy))
    }

    /// Redraws every buffered tile in place
    pub fn redraw_tiles(&mut self) -> RedrawStats {
        let lookup = TileLookup::new(self.data.as_ref()).with_animations(&self.animations);
        self.buffer.redraw(&lookup)
    }

    /// Reloads the map data, then rebuilds the animations and the buffer.
    pub fn reload(&mut self) -> Result<()> {
        self.data.reload()?;
        self.reset_from_data(Instant::now());
        Ok(())
    }

    /// Draws the current view into `dest_rect` on `dest`.
    pub fn draw<S: Surface>(
        &mut self,
        dest: &mut S,
        dest_rect: Rect,
        renderables: &[Renderable<'_>],
    ) -> Result<()> {
        self.draw_at(Instant::now(), dest, dest_rect, renderables)
    }

    /// Like `draw`, with an explicit timestamp for the animation schedule.
    ///
    /// The frame is scaled when `dest_rect` differs from the logical view
    /// size. Nothing is written to `dest` if the call fails.
    pub fn draw_at<S: Surface>(
        &mut self,
        now: Instant,
        dest: &mut S,
        dest_rect: Rect,
        renderables: &[Renderable<'_>],
    ) -> Result<()> {
        if dest_rect.is_empty() {
            return Err(MapError::InvalidConfiguration(format!(
                "destination rect {dest_rect} has no area"
            )));
        }

        if self.data.revision() != self.revision {
            log::debug!("map data changed, rebuilding");
            self.reset_from_data(now);
        }

        for swap in self.animations.advance(now) {
            self.buffer.apply_swap(&swap);
        }

        let region = self.buffer.read_region(self.viewport.view_rect())?;
        let layers: Vec<usize> = region.layers().map(|(ordinal, _)| ordinal).collect();
        let composition = self
            .compositor
            .compose(&layers, self.data.layer_count(), renderables);

        self.frame.clear(self.format.clear_color());
        for op in &composition.ops {
            match *op {
                DrawOp::MapLayer(ordinal) => {
                    if let Some(view) = region.layer(ordinal) {
                        self.frame.blit(view, 0, 0, BlitMode::new(BlendMode::Normal));
                    }
                }
                DrawOp::Renderable(index) => {
                    let Some(renderable) = renderables.get(index) else {
                        continue;
                    };
                    let (width, height) = (renderable.rect.width, renderable.rect.height);
                    let image = LayerView::new(renderable.image, 0, 0, width, height);
                    let mode = BlitMode::new(renderable.blend.unwrap_or_default());
                    self.frame.blit(&image, renderable.rect.x, renderable.rect.y, mode);
                }
            }
        }
        self.diagnostics = composition.diagnostics;

        let mode = match self.format {
            BufferFormat::Alpha => BlitMode::new(BlendMode::Normal),
            BufferFormat::ColorKey(key) => BlitMode::keyed(key),
            BufferFormat::Opaque => BlitMode::new(BlendMode::Replace),
        };
        if dest_rect.size() == self.viewport.logical_size() {
            dest.blit(&self.frame, dest_rect.x, dest_rect.y, mode);
        } else {
            // interpolating would blend the key colour into its neighbours
            let filter = match self.format {
                BufferFormat::ColorKey(_) => ScaleFilter::Nearest,
                _ => self.config.scale_filter,
            };
            let scaled = imageops::resize(
                &self.frame,
                dest_rect.width,
                dest_rect.height,
                filter.to_filter_type(),
            );
            dest.blit(&scaled, dest_rect.x, dest_rect.y, mode);
        }
        Ok(())
    }

    /// Offset that turns world coordinates into view coordinates for renderables
    pub fn center_offset(&self) -> (i32, i32) {
        self.viewport.center_offset()
    }

    /// World point to screen pixels, zoom included
    pub fn translate_point(&self, point: impl Into<Point>) -> (i32, i32) {
        self.viewport.translate_point(point.into())
    }

    pub fn translate_rect(&self, rect: Rect) -> Rect {
        self.viewport.translate_rect(rect)
    }

    pub fn translate_points(&self, points: &[Point]) -> Vec<(i32, i32)> {
        self.viewport.translate_points(points)
    }

    pub fn translate_rects(&self, rects: &[Rect]) -> Vec<Rect> {
        self.viewport.translate_rects(rects)
    }

    fn rebuild(&mut self) -> RedrawStats {
        let lookup = TileLookup::new(self.data.as_ref()).with_animations(&self.animations);
        self.buffer.resize(self.viewport.view_rect(), &lookup)
    }

    fn resize_frame(&mut self) {
        let logical = self.viewport.logical_size();
        self.frame =
            RgbaImage::from_pixel(logical.width, logical.height, self.format.clear_color());
    }

    /// Picks up new map content: extent, animations and every buffered tile
    fn reset_from_data(&mut self, now: Instant) {
        let speed = self.animations.speed_multiplier();
        let paused = self.animations.is_paused();
        self.animations = AnimationTracker::build_with_speed(self.data.as_ref(), now, speed)
            .unwrap_or_else(|err| {
                log::warn!("could not restore animation speed: {err}");
                AnimationTracker::build(self.data.as_ref(), now)
            });
        if paused {
            self.animations.pause(now);
        }

        self.viewport.set_map_rect(self.data.map_rect());
        self.revision = self.data.revision();
        self.rebuild();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::procedural::ProceduralMapData;
    use image::Rgba;

    fn renderer(size: Size) -> BufferedRenderer {
        BufferedRenderer::new(Box::new(ProceduralMapData::new()), RendererConfig::new(size))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let data = Box::new(ProceduralMapData::new());
        let config = RendererConfig::new(Size::new(64, 64)).with_zoom(0.0);
        assert!(BufferedRenderer::new(data, config).is_err());
    }

    #[test]
    fn test_set_zoom_is_atomic() {
        let mut renderer = renderer(Size::new(160, 160));
        let before = renderer.view_rect();
        assert!(renderer.set_zoom(-1.0).is_err());
        assert_eq!(renderer.zoom(), 1.0);
        assert_eq!(renderer.view_rect(), before);

        renderer.set_zoom(2.0).unwrap();
        assert_eq!(renderer.view_rect().size(), Size::new(80, 80));
        assert_eq!(renderer.frame().dimensions(), (80, 80));
    }

    #[test]
    fn test_scroll_moves_center() {
        let mut renderer = renderer(Size::new(160, 160));
        renderer.center((320, 320));
        renderer.scroll(32.0, -32.0);
        assert_eq!(renderer.viewport().center(), (352, 288));
    }

    #[test]
    fn test_draw_rejects_empty_rect() {
        let mut renderer = renderer(Size::new(64, 64));
        let mut dest = RgbaImage::from_pixel(64, 64, Rgba([7, 7, 7, 255]));
        assert!(renderer.draw(&mut dest, Rect::new(0, 0, 0, 64), &[]).is_err());
        assert_eq!(dest.get_pixel(0, 0), &Rgba([7, 7, 7, 255]));
    }

    #[test]
    fn test_draw_scales_into_smaller_rect() {
        let mut renderer = renderer(Size::new(64, 64));
        renderer.center((32, 32));
        let mut dest = RgbaImage::new(100, 100);
        renderer.draw(&mut dest, Rect::new(10, 10, 32, 32), &[]).unwrap();

        // nearest scaling of the top-left grass tile
        assert_eq!(dest.get_pixel(10, 10), &Rgba([0x79, 0x9a, 0x46, 0xff]));
        assert_eq!(dest.get_pixel(9, 9), &Rgba([0, 0, 0, 0]));
        assert_eq!(dest.get_pixel(42, 42), &Rgba([0, 0, 0, 0]));
    }
}
