use crate::core::config::{validate_size, validate_zoom};
use crate::core::geo::{Point, Rect, Size};
use crate::Result;
use serde::{Deserialize, Serialize};

/// The camera: which part of the map is visible and how it maps to the screen.
///
/// `size` is the destination size in screen pixels. The map area actually
/// shown, `view_rect`, is that size divided by the zoom level, so zooming in
/// shows fewer world pixels which are then scaled up on blit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// The size of the viewport in screen pixels
    size: Size,
    /// The current zoom level
    zoom: f64,
    /// Visible map area in world pixels
    view_rect: Rect,
    /// Map extent in world pixels, used for clamping
    map_rect: Rect,
    /// Keep the view inside `map_rect`
    clamp: bool,
}

impl Viewport {
    /// Creates a new viewport centered on the middle of the map
    pub fn new(size: Size, zoom: f64, map_rect: Rect, clamp: bool) -> Result<Self> {
        validate_size(size)?;
        validate_zoom(zoom)?;
        let mut viewport = Self {
            size,
            zoom,
            view_rect: Rect::from_size(logical_size(size, zoom)),
            map_rect,
            clamp,
        };
        let (cx, cy) = map_rect.center();
        viewport.center_on(Point::from((cx, cy)));
        Ok(viewport)
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn view_rect(&self) -> Rect {
        self.view_rect
    }

    pub fn map_rect(&self) -> Rect {
        self.map_rect
    }

    pub fn clamps_camera(&self) -> bool {
        self.clamp
    }

    /// Size of the visible map area in world pixels
    pub fn logical_size(&self) -> Size {
        self.view_rect.size()
    }

    /// Sets the viewport size, keeping the current center.
    ///
    /// Returns whether anything changed. An invalid size leaves the viewport untouched.
    pub fn set_size(&mut self, size: Size) -> Result<bool> {
        validate_size(size)?;
        if size == self.size {
            return Ok(false);
        }
        self.size = size;
        self.refit();
        Ok(true)
    }

    /// Sets the zoom level, keeping the current center.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<bool> {
        validate_zoom(zoom)?;
        if zoom == self.zoom {
            return Ok(false);
        }
        self.zoom = zoom;
        self.refit();
        Ok(true)
    }

    /// Replaces the map extent, e.g. after the data source reloaded
    pub fn set_map_rect(&mut self, map_rect: Rect) {
        self.map_rect = map_rect;
        let (cx, cy) = self.view_rect.center();
        self.center_on(Point::from((cx, cy)));
    }

    /// Centers the view on a world point, clamped to the map when enabled.
    ///
    /// Returns the resulting view rectangle.
    pub fn center_on(&mut self, point: Point) -> Rect {
        let (cx, cy) = point.round();
        self.view_rect.set_center(cx, cy);
        if self.clamp {
            self.view_rect = self.view_rect.clamp_within(&self.map_rect);
        }
        self.view_rect
    }

    /// Center of the view in world pixels
    pub fn center(&self) -> (i32, i32) {
        self.view_rect.center()
    }

    /// Screen pixels per logical pixel on each axis.
    ///
    /// The logical size is truncated to whole pixels, so this is close to the
    /// zoom level but not always equal to it.
    pub fn real_ratio(&self) -> (f64, f64) {
        let logical = self.logical_size();
        (
            self.size.width as f64 / logical.width as f64,
            self.size.height as f64 / logical.height as f64,
        )
    }

    /// Offset that turns world coordinates into logical view coordinates
    pub fn center_offset(&self) -> (i32, i32) {
        (-self.view_rect.x, -self.view_rect.y)
    }

    /// Converts a world point to screen pixel coordinates
    pub fn translate_point(&self, point: Point) -> (i32, i32) {
        let (mx, my) = self.center_offset();
        let (rx, ry) = self.real_ratio();
        (
            ((point.x + mx as f64) * rx).round() as i32,
            ((point.y + my as f64) * ry).round() as i32,
        )
    }

    /// Converts a world rectangle (position and size) to screen pixels
    pub fn translate_rect(&self, rect: Rect) -> Rect {
        let (mx, my) = self.center_offset();
        if self.zoom == 1.0 {
            return rect.translate(mx, my);
        }
        let (rx, ry) = self.real_ratio();
        Rect::new(
            ((rect.x + mx) as f64 * rx).round() as i32,
            ((rect.y + my) as f64 * ry).round() as i32,
            (rect.width as f64 * rx).round() as u32,
            (rect.height as f64 * ry).round() as u32,
        )
    }

    pub fn translate_points(&self, points: &[Point]) -> Vec<(i32, i32)> {
        points.iter().map(|p| self.translate_point(*p)).collect()
    }

    pub fn translate_rects(&self, rects: &[Rect]) -> Vec<Rect> {
        rects.iter().map(|r| self.translate_rect(*r)).collect()
    }

    fn refit(&mut self) {
        let (cx, cy) = self.view_rect.center();
        self.view_rect = Rect::from_size(logical_size(self.size, self.zoom));
        self.center_on(Point::from((cx, cy)));
    }
}

/// Screen size divided by zoom, truncated, never smaller than one pixel
fn logical_size(size: Size, zoom: f64) -> Size {
    Size::new(
        ((size.width as f64 / zoom) as u32).max(1),
        ((size.height as f64 / zoom) as u32).max(1),
    )
}
