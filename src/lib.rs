//! # tilescroll
//!
//! A buffered, scrolling renderer for large tiled 2D worlds.
//!
//! Instead of redrawing every tile every frame, the renderer keeps an
//! off-screen buffer a little larger than the visible viewport. When the
//! camera moves, the buffer is shifted and only the newly exposed rows and
//! columns of tiles are drawn, so the cost of a frame depends on how far the
//! camera moved rather than on the size of the map.
//!
//! The main pieces are:
//!
//! - [`data`]: the [`MapDataAdapter`] query interface plus a few in-memory
//!   map sources.
//! - [`animation`]: scheduling of animated tile frames.
//! - [`rendering`]: the [`TileBuffer`], the [`LayerCompositor`] and the
//!   [`BufferedRenderer`] that ties them together.

pub mod animation;
pub mod core;
pub mod data;
pub mod prelude;
pub mod rendering;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    camera::FollowCamera,
    config::{BufferFormat, LayerOverflow, RendererConfig, ScaleFilter},
    geo::{Point, Rect, Size, TileCoord, TileRect},
    viewport::Viewport,
};

pub use crate::data::{
    adapter::{FrameSpec, MapDataAdapter, TileAnimation, TileImage, TileLookup},
    aggregator::MapAggregator,
    grid::GridMapData,
    procedural::ProceduralMapData,
};

pub use crate::animation::{
    token::{AnimationFrame, AnimationToken},
    tracker::{AnimationSwap, AnimationTracker},
};

pub use crate::rendering::{
    compositor::{Composition, CompositorDiagnostic, DrawOp, LayerCompositor, Renderable},
    renderer::BufferedRenderer,
    surface::{BlendMode, BlitMode, Surface},
    tile_buffer::{BufferRegion, DirtyRegion, LayerView, RedrawStats, ScrollOutcome, TileBuffer},
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Tile read failure at {coord}: {reason}")]
    TileRead { coord: TileCoord, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Region {requested} lies outside the buffer {buffer}")]
    RegionOutOfBounds { requested: Rect, buffer: Rect },

    #[error("Layer ordinal {ordinal} outside the map layer range 0..={max}")]
    LayerOrdinalOutOfRange { ordinal: i32, max: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Error type alias for convenience
pub type Error = MapError;

/// Install `env_logger` as the `log` backend.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::builder().format_timestamp_millis().try_init();
}
