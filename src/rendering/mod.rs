pub mod compositor;
pub mod renderer;
pub mod surface;
pub mod tile_buffer;

// Re-export main types
pub use compositor::{Composition, CompositorDiagnostic, DrawOp, LayerCompositor, Renderable};
pub use renderer::BufferedRenderer;
pub use surface::{BlendMode, BlitMode, Surface};
pub use tile_buffer::{BufferRegion, DirtyRegion, LayerView, RedrawStats, ScrollOutcome, TileBuffer};
