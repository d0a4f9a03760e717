//! Prelude module for common tilescroll types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use tilescroll::prelude::*;`

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

pub use crate::{Error as MapError, Result};

pub use image::{Rgb, RgbImage, Rgba, RgbaImage};

pub use instant::Instant;

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet, FxHasher};
