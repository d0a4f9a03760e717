//! Pixel surfaces the renderer can draw onto
//!
//! The host hands the renderer any [`Surface`]; the crate implements it for
//! `image`'s RGBA and RGB buffers. Source pixels are always RGBA.

use crate::core::geo::{Rect, Size};
use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

/// How source pixels combine with the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over alpha blending
    #[default]
    Normal,
    /// Copy source pixels, alpha included
    Replace,
    /// dst += src * src_alpha, saturating
    Add,
    /// dst = lerp(dst, dst * src, src_alpha)
    Multiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlitMode {
    pub blend: BlendMode,
    /// Source pixels of exactly this colour are skipped
    pub colorkey: Option<[u8; 3]>,
}

impl BlitMode {
    pub fn new(blend: BlendMode) -> Self {
        Self {
            blend,
            colorkey: None,
        }
    }

    pub fn keyed(colorkey: [u8; 3]) -> Self {
        Self {
            blend: BlendMode::Replace,
            colorkey: Some(colorkey),
        }
    }
}

impl From<BlendMode> for BlitMode {
    fn from(blend: BlendMode) -> Self {
        Self::new(blend)
    }
}

pub trait Surface {
    fn size(&self) -> Size;

    /// Whether the surface keeps per-pixel alpha
    fn has_alpha(&self) -> bool;

    /// Sets every pixel of `area` (clipped to the surface) to `color`
    fn fill(&mut self, area: Rect, color: Rgba<u8>);

    /// Draws `src` with its top-left corner at (`x`, `y`), clipped to the surface
    fn blit<I>(&mut self, src: &I, x: i32, y: i32, mode: BlitMode)
    where
        I: GenericImageView<Pixel = Rgba<u8>>;

    fn clear(&mut self, color: Rgba<u8>) {
        let area = Rect::from_size(self.size());
        self.fill(area, color);
    }
}

impl Surface for RgbaImage {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    fn has_alpha(&self) -> bool {
        true
    }

    fn fill(&mut self, area: Rect, color: Rgba<u8>) {
        let Some(area) = area.intersection(&Rect::from_size(Surface::size(self))) else {
            return;
        };
        for (x, y) in area.cells() {
            self.put_pixel(x as u32, y as u32, color);
        }
    }

    fn blit<I>(&mut self, src: &I, x: i32, y: i32, mode: BlitMode)
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let bounds = Rect::from_size(Surface::size(self));
        for_each_visible(src, x, y, bounds, mode, |dx, dy, pixel| {
            let blended = blend_pixel(pixel, *self.get_pixel(dx, dy), mode.blend);
            self.put_pixel(dx, dy, blended);
        });
    }
}

impl Surface for RgbImage {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    fn has_alpha(&self) -> bool {
        false
    }

    fn fill(&mut self, area: Rect, color: Rgba<u8>) {
        let Some(area) = area.intersection(&Rect::from_size(Surface::size(self))) else {
            return;
        };
        let [r, g, b, _] = color.0;
        for (x, y) in area.cells() {
            self.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
        }
    }

    fn blit<I>(&mut self, src: &I, x: i32, y: i32, mode: BlitMode)
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        let bounds = Rect::from_size(Surface::size(self));
        for_each_visible(src, x, y, bounds, mode, |dx, dy, pixel| {
            let [r, g, b] = self.get_pixel(dx, dy).0;
            let blended = blend_pixel(pixel, Rgba([r, g, b, 255]), mode.blend);
            let [r, g, b, _] = blended.0;
            self.put_pixel(dx, dy, Rgb([r, g, b]));
        });
    }
}

/// Walks the source pixels that land inside `bounds`, skipping keyed ones.
fn for_each_visible<I, F>(src: &I, x: i32, y: i32, bounds: Rect, mode: BlitMode, mut apply: F)
where
    I: GenericImageView<Pixel = Rgba<u8>>,
    F: FnMut(u32, u32, Rgba<u8>),
{
    let (width, height) = src.dimensions();
    let target = Rect::new(x, y, width, height);
    let Some(visible) = target.intersection(&bounds) else {
        return;
    };
    for (dx, dy) in visible.cells() {
        let pixel = src.get_pixel((dx - x) as u32, (dy - y) as u32);
        if let Some(key) = mode.colorkey {
            let [r, g, b, _] = pixel.0;
            if [r, g, b] == key {
                continue;
            }
        }
        apply(dx as u32, dy as u32, pixel);
    }
}

/// Combines one source pixel with one destination pixel
pub fn blend_pixel(src: Rgba<u8>, dst: Rgba<u8>, blend: BlendMode) -> Rgba<u8> {
    let [sr, sg, sb, sa] = src.0.map(u32::from);
    let [dr, dg, db, da] = dst.0.map(u32::from);
    match blend {
        BlendMode::Replace => src,
        BlendMode::Normal => {
            if sa == 255 {
                return src;
            }
            if sa == 0 {
                return dst;
            }
            // destination weight after the source covers it
            let dw = da * (255 - sa) / 255;
            let out_a = sa + dw;
            if out_a == 0 {
                return Rgba([0, 0, 0, 0]);
            }
            let mix = |s: u32, d: u32| ((s * sa + d * dw + out_a / 2) / out_a) as u8;
            Rgba([mix(sr, dr), mix(sg, dg), mix(sb, db), out_a as u8])
        }
        BlendMode::Add => {
            let add = |s: u32, d: u32| (d + s * sa / 255).min(255) as u8;
            Rgba([add(sr, dr), add(sg, dg), add(sb, db), da.max(sa) as u8])
        }
        BlendMode::Multiply => {
            let mul = |s: u32, d: u32| {
                let product = d * s / 255;
                ((product * sa + d * (255 - sa)) / 255) as u8
            };
            Rgba([mul(sr, dr), mul(sg, dg), mul(sb, db), da as u8])
        }
    }
}
