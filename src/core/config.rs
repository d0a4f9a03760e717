//! Construction-time configuration for the buffered renderer
//!
//! Every option has a documented default, and the whole struct can be
//! loaded from (or written to) JSON so hosts can keep renderer settings next
//! to the rest of their game configuration.

use crate::core::constants::{
    DEFAULT_TARGET_SIZE, DEFAULT_TILE_PADDING, DEFAULT_ZOOM, RGBA_CLEAR_COLOR, RGB_CLEAR_COLOR,
};
use crate::core::geo::Size;
use crate::{MapError, Result};
use image::Rgba;
use serde::{Deserialize, Serialize};

/// What happens to a renderable whose layer ordinal is outside the map's layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerOverflow {
    /// Drop the renderable for this frame.
    #[default]
    Skip,
    /// Draw it at the nearest valid ordinal.
    Clamp,
}

/// Filter used when the frame has to be scaled into the destination rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleFilter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
}

impl ScaleFilter {
    pub fn to_filter_type(self) -> image::imageops::FilterType {
        match self {
            ScaleFilter::Nearest => image::imageops::FilterType::Nearest,
            ScaleFilter::Triangle => image::imageops::FilterType::Triangle,
            ScaleFilter::CatmullRom => image::imageops::FilterType::CatmullRom,
        }
    }
}

/// Pixel format of the composited frame.
///
/// Chosen once at construction, since it decides how the frame is cleared
/// and how it is blitted onto the destination. Layer buffers are RGBA
/// whatever the format; it only affects the frame clear and the final blit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFormat {
    /// Opaque pixels, cleared to black and copied verbatim.
    Opaque,
    /// Opaque pixels; the key colour marks pixels that are not copied.
    ColorKey([u8; 3]),
    /// Per-pixel alpha, cleared to transparent and alpha blended.
    Alpha,
}

impl BufferFormat {
    pub fn clear_color(&self) -> Rgba<u8> {
        match self {
            BufferFormat::Opaque => {
                let [r, g, b] = RGB_CLEAR_COLOR;
                Rgba([r, g, b, 255])
            }
            BufferFormat::ColorKey([r, g, b]) => Rgba([*r, *g, *b, 255]),
            BufferFormat::Alpha => Rgba(RGBA_CLEAR_COLOR),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, BufferFormat::Alpha)
    }

    pub fn colorkey(&self) -> Option<[u8; 3]> {
        match self {
            BufferFormat::ColorKey(key) => Some(*key),
            _ => None,
        }
    }
}

/// Options recognised by [`BufferedRenderer::new`](crate::BufferedRenderer::new).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Initial viewport size in screen pixels.
    pub target_size: Size,
    /// Initial zoom; values above 1.0 magnify the map.
    pub zoom: f64,
    /// Allocate a per-pixel-alpha frame. Slower to blit, but blends correctly
    /// over whatever the destination already holds.
    pub alpha: bool,
    /// Colour treated as transparent when `alpha` is false.
    pub colorkey: Option<[u8; 3]>,
    /// Tiles of margin added to the buffer beyond the viewport. At least 1.
    pub tile_padding: u32,
    /// Keep the camera from showing anything outside the map.
    pub clamp_camera: bool,
    /// Policy for renderables on unknown layers.
    pub layer_overflow: LayerOverflow,
    /// Filter used to scale the frame into a differently sized destination.
    /// Colorkey frames are always scaled with `Nearest`.
    pub scale_filter: ScaleFilter,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            target_size: Size::new(DEFAULT_TARGET_SIZE.0, DEFAULT_TARGET_SIZE.1),
            zoom: DEFAULT_ZOOM,
            alpha: false,
            colorkey: None,
            tile_padding: DEFAULT_TILE_PADDING,
            clamp_camera: true,
            layer_overflow: LayerOverflow::Skip,
            scale_filter: ScaleFilter::Nearest,
        }
    }
}

impl RendererConfig {
    pub fn new(target_size: Size) -> Self {
        Self {
            target_size,
            ..Self::default()
        }
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_alpha(mut self, alpha: bool) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_colorkey(mut self, colorkey: [u8; 3]) -> Self {
        self.colorkey = Some(colorkey);
        self
    }

    pub fn with_tile_padding(mut self, tile_padding: u32) -> Self {
        self.tile_padding = tile_padding;
        self
    }

    pub fn with_clamp_camera(mut self, clamp_camera: bool) -> Self {
        self.clamp_camera = clamp_camera;
        self
    }

    pub fn with_layer_overflow(mut self, layer_overflow: LayerOverflow) -> Self {
        self.layer_overflow = layer_overflow;
        self
    }

    pub fn with_scale_filter(mut self, scale_filter: ScaleFilter) -> Self {
        self.scale_filter = scale_filter;
        self
    }

    /// Checks every option, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        validate_size(self.target_size)?;
        validate_zoom(self.zoom)?;
        if self.tile_padding == 0 {
            return Err(MapError::InvalidConfiguration(
                "tile_padding must be at least 1".to_string(),
            ));
        }
        if self.alpha && self.colorkey.is_some() {
            return Err(MapError::InvalidConfiguration(
                "cannot select both colorkey and alpha".to_string(),
            ));
        }
        Ok(())
    }

    pub fn buffer_format(&self) -> BufferFormat {
        match (self.alpha, self.colorkey) {
            (true, _) => BufferFormat::Alpha,
            (false, Some(key)) => BufferFormat::ColorKey(key),
            (false, None) => BufferFormat::Opaque,
        }
    }

    /// Parses and validates a JSON configuration. Missing fields use their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RendererConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub(crate) fn validate_zoom(zoom: f64) -> Result<()> {
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(MapError::InvalidConfiguration(format!(
            "zoom level must be a positive number, got {zoom}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_size(size: Size) -> Result<()> {
    if size.is_empty() {
        return Err(MapError::InvalidConfiguration(format!(
            "viewport size must be positive, got {size}"
        )));
    }
    Ok(())
}
