pub mod adapter;
pub mod aggregator;
pub mod grid;
pub mod procedural;

// Re-exports for convenience
pub use adapter::{FrameSpec, MapDataAdapter, TileAnimation, TileImage, TileLookup};
pub use aggregator::MapAggregator;
pub use grid::GridMapData;
pub use procedural::ProceduralMapData;
