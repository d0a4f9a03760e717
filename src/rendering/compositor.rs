use crate::core::config::LayerOverflow;
use crate::core::geo::Rect;
use crate::rendering::surface::BlendMode;
use crate::MapError;
use image::RgbaImage;

/// A dynamic drawable supplied by the host for one frame, e.g. a sprite.
///
/// `rect` is in view coordinates: world pixels minus the camera offset
/// returned by `BufferedRenderer::center_offset`, before zoom scaling. The
/// image is drawn at the rect's top-left and clipped to its size.
#[derive(Debug, Clone, Copy)]
pub struct Renderable<'a> {
    pub image: &'a RgbaImage,
    pub rect: Rect,
    /// Drawn above map layer `layer - 1` and below map layer `layer`
    pub layer: i32,
    pub blend: Option<BlendMode>,
}

impl<'a> Renderable<'a> {
    pub fn new(image: &'a RgbaImage, position: (i32, i32), layer: i32) -> Self {
        Self {
            image,
            rect: Rect::new(position.0, position.1, image.width(), image.height()),
            layer,
            blend: None,
        }
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = Some(blend);
        self
    }
}

/// One step of a composited frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOp {
    /// Draw the buffered map layer with this ordinal
    MapLayer(usize),
    /// Draw the renderable at this index of the caller's slice
    Renderable(usize),
}

/// A renderable that could not be placed as requested
#[derive(Debug)]
pub struct CompositorDiagnostic {
    /// Index into the caller's renderables
    pub renderable: usize,
    pub error: MapError,
}

#[derive(Debug, Default)]
pub struct Composition {
    pub ops: Vec<DrawOp>,
    pub diagnostics: Vec<CompositorDiagnostic>,
}

/// Interleaves map layers with layer-tagged renderables
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerCompositor {
    overflow: LayerOverflow,
}

impl LayerCompositor {
    pub fn new(overflow: LayerOverflow) -> Self {
        Self { overflow }
    }

    pub fn overflow(&self) -> LayerOverflow {
        self.overflow
    }

    /// Orders one frame's draw operations.
    ///
    /// `map_layers` are the buffered layer ordinals, ascending. Valid renderable
    /// ordinals are `0..=layer_count`; `layer_count` draws above every map
    /// layer. Renderables sharing an ordinal keep the caller's order.
    pub fn compose(
        &self,
        map_layers: &[usize],
        layer_count: usize,
        renderables: &[Renderable<'_>],
    ) -> Composition {
        let mut diagnostics = Vec::new();
        let mut placed: Vec<(usize, usize)> = Vec::with_capacity(renderables.len());

        for (index, renderable) in renderables.iter().enumerate() {
            match resolve_ordinal(renderable.layer, layer_count) {
                Some(ordinal) => placed.push((ordinal, index)),
                None => {
                    log::warn!(
                        "renderable {index} declares layer {} outside 0..={layer_count}",
                        renderable.layer
                    );
                    diagnostics.push(CompositorDiagnostic {
                        renderable: index,
                        error: MapError::LayerOrdinalOutOfRange {
                            ordinal: renderable.layer,
                            max: layer_count,
                        },
                    });
                    if self.overflow == LayerOverflow::Clamp {
                        let ordinal = renderable.layer.clamp(0, layer_count as i32) as usize;
                        placed.push((ordinal, index));
                    }
                }
            }
        }
        // stable, so equal ordinals keep caller order
        placed.sort_by_key(|(ordinal, _)| *ordinal);

        let mut ops = Vec::with_capacity(map_layers.len() + placed.len());
        let mut pending = placed.into_iter().peekable();
        for &layer in map_layers {
            while let Some((_, index)) = pending.next_if(|(ordinal, _)| *ordinal <= layer) {
                ops.push(DrawOp::Renderable(index));
            }
            ops.push(DrawOp::MapLayer(layer));
        }
        ops.extend(pending.map(|(_, index)| DrawOp::Renderable(index)));

        Composition { ops, diagnostics }
    }
}

fn resolve_ordinal(layer: i32, layer_count: usize) -> Option<usize> {
    usize::try_from(layer).ok().filter(|ordinal| *ordinal <= layer_count)
}
