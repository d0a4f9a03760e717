use std::path::PathBuf;
use std::time::Duration;
use tilescroll::data::procedural::ProceduralMapData;
use tilescroll::prelude::*;

const SCREEN: Size = Size::new(320, 240);
const FRAMES: u32 = 90;
const FRAME_TIME: Duration = Duration::from_millis(33);

/// Walks a sprite across the generated map with the camera trailing it and
/// writes every frame as `frame_0000.png` into the output directory.
fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let output = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("frames"));
    std::fs::create_dir_all(&output)?;

    let config = RendererConfig::new(SCREEN).with_tile_padding(2);
    let mut renderer = BufferedRenderer::new(Box::new(ProceduralMapData::new()), config)?;
    let map = renderer.data().map_rect();
    let camera = FollowCamera::new(0.95)?.with_deadzone(Size::new(32, 32));

    let hero = RgbaImage::from_pixel(16, 24, Rgba([220, 40, 40, 255]));
    let mut screen = RgbImage::new(SCREEN.width, SCREEN.height);
    let start = Instant::now();

    let from = Point::new(160.0, 120.0);
    let to = Point::new(map.width as f64 - 160.0, map.height as f64 - 120.0);
    let mut rebuilds = 0;
    renderer.center(from);

    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            renderer.set_zoom(2.0)?;
            log::info!("zoomed in at frame {frame}");
        }

        let t = frame as f64 / (FRAMES - 1) as f64;
        let position = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
        if renderer.follow(&camera, position, FRAME_TIME.as_secs_f64()) == ScrollOutcome::Rebuilt {
            rebuilds += 1;
        }

        // hero walks between the ground and the rocks
        let (ox, oy) = renderer.center_offset();
        let (hx, hy) = position.round();
        let sprite = Renderable::new(&hero, (hx + ox - 8, hy + oy - 12), 1);

        let now = start + FRAME_TIME * frame;
        renderer.draw_at(now, &mut screen, Rect::from_size(SCREEN), &[sprite])?;

        let stats = renderer.tile_buffer().stats();
        log::debug!(
            "frame {frame}: view {}, {} cells redrawn, {} tiles failed",
            renderer.view_rect(),
            stats.cells,
            stats.tiles_failed
        );

        screen.save(output.join(format!("frame_{frame:04}.png")))?;
    }

    log::info!("wrote {FRAMES} frames to {} ({rebuilds} full rebuilds)", output.display());
    Ok(())
}
