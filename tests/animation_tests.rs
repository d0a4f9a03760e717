#[cfg(test)]
mod animation_tests {
    use tilescroll::data::procedural::{ProceduralMapData, GID_ALT_WATER, GID_WATER};
    use tilescroll::prelude::*;

    const WATER: Rgba<u8> = Rgba([0x4a, 0x82, 0xa6, 0xff]);
    const ALT_WATER: Rgba<u8> = Rgba([0x62, 0xa2, 0xcc, 0xff]);

    fn frame(gid: u32, ms: u64) -> AnimationFrame {
        let image = Arc::new(RgbaImage::from_pixel(2, 2, Rgba([gid as u8, 0, 0, 255])));
        AnimationFrame::new(gid, image, Duration::from_millis(ms))
    }

    /// Renderer showing the top-left 4x4 tiles of the procedural map
    fn corner_renderer() -> BufferedRenderer {
        let config = RendererConfig::new(Size::new(128, 128));
        let mut renderer =
            BufferedRenderer::new(Box::new(ProceduralMapData::new()), config).unwrap();
        renderer.center((64, 64));
        renderer
    }

    /// Pixel inside cell (1, 0), which holds water
    fn water_pixel(renderer: &mut BufferedRenderer, now: Instant) -> Rgba<u8> {
        let mut dest = RgbaImage::new(128, 128);
        renderer.draw_at(now, &mut dest, Rect::new(0, 0, 128, 128), &[]).unwrap();
        *dest.get_pixel(40, 5)
    }

    #[test]
    fn test_token_cycle_period() {
        // After N advances a looping token shows its first frame again
        let start = Instant::now();
        let frames = vec![frame(1, 100), frame(2, 50), frame(3, 200)];
        let mut token =
            AnimationToken::new(vec![TileCoord::new(0, 0, 0)], frames, start, true).unwrap();

        let mut shown = Vec::new();
        for _ in 0..6 {
            let due = token.next();
            shown.push(token.advance(due).map(|f| f.gid).unwrap());
        }
        assert_eq!(shown, vec![2, 3, 1, 2, 3, 1]);
        assert_eq!(token.index(), 0);
        // two full cycles of 350 ms, plus the first frame again
        assert_eq!(token.next(), start + Duration::from_millis(800));
    }

    #[test]
    fn test_finished_token_holds_last_frame() {
        let start = Instant::now();
        let frames = vec![frame(1, 10), frame(2, 10)];
        let mut token =
            AnimationToken::new(vec![TileCoord::new(0, 0, 0)], frames, start, false).unwrap();

        assert_eq!(token.advance(start + Duration::from_millis(10)).map(|f| f.gid), Some(2));
        assert!(token.advance(start + Duration::from_millis(20)).is_none());
        assert!(token.is_done());
        assert_eq!(token.current().gid, 2);
    }

    #[test]
    fn test_tracker_swaps_every_water_tile() {
        let data = ProceduralMapData::with_size(Size::new(4, 4));
        let start = Instant::now();
        let mut tracker = AnimationTracker::build(&data, start);
        assert_eq!(tracker.len(), 1);

        assert_eq!(tracker.advance(start + Duration::from_millis(100)).count(), 0);

        let swaps: Vec<AnimationSwap> =
            tracker.advance(start + Duration::from_millis(500)).collect();
        assert_eq!(swaps.len(), 1);
        // checkerboard: half of the ground cells are water
        assert_eq!(swaps[0].positions.len(), 8);
        assert!(swaps[0].positions.iter().all(|coord| data.gid_at(*coord) == Some(GID_WATER)));
        assert_eq!(swaps[0].frame_index, 1);
        assert_eq!(
            tracker.current_image(TileCoord::new(1, 0, 0)),
            data.image_by_gid(GID_ALT_WATER)
        );
        assert_eq!(
            tracker.next_deadline(),
            Some(start + Duration::from_millis(1000))
        );
    }

    #[test]
    fn test_renderer_shows_animation_frames() {
        let start = Instant::now();
        let mut renderer = corner_renderer();
        assert_eq!(water_pixel(&mut renderer, start), WATER);

        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(1)), ALT_WATER);
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(3)), WATER);
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(5)), ALT_WATER);
        // grass does not animate
        let mut dest = RgbaImage::new(128, 128);
        renderer
            .draw_at(start + Duration::from_secs(7), &mut dest, Rect::new(0, 0, 128, 128), &[])
            .unwrap();
        assert_eq!(dest.get_pixel(72, 5), &Rgba([0x79, 0x9a, 0x46, 0xff]));
    }

    #[test]
    fn test_scrolled_in_tiles_show_current_frame() {
        // Tiles drawn while scrolling use the frame the animation is on
        let start = Instant::now();
        let mut renderer = corner_renderer();
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(1)), ALT_WATER);

        // cell (9, 0) enters the buffer only after this move
        renderer.center((64 + 6 * 32, 64));
        let mut dest = RgbaImage::new(128, 128);
        renderer
            .draw_at(start + Duration::from_millis(1100), &mut dest, Rect::new(0, 0, 128, 128), &[])
            .unwrap();
        let (ox, _) = renderer.center_offset();
        let x = (9 * 32 + 8 + ox) as u32;
        assert_eq!(dest.get_pixel(x, 5), &ALT_WATER);
    }

    #[test]
    fn test_pause_freezes_frames() {
        let start = Instant::now();
        let mut renderer = corner_renderer();
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(1)), ALT_WATER);

        renderer.animations_mut().pause(start + Duration::from_millis(1100));
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(3)), ALT_WATER);

        // the remaining 400 ms of the frame play out after resuming
        renderer.animations_mut().resume(start + Duration::from_secs(3));
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_millis(3200)), ALT_WATER);
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(4)), WATER);
    }

    #[test]
    fn test_speed_multiplier() {
        let start = Instant::now();
        let mut renderer = corner_renderer();
        assert!(renderer.animations_mut().set_speed_multiplier(0.0).is_err());
        renderer.animations_mut().set_speed_multiplier(2.0).unwrap();

        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(1)), ALT_WATER);
        // next frame is due 250 ms later instead of 500 ms
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_millis(1300)), WATER);
    }

    #[test]
    fn test_speed_survives_map_reload() {
        let mut data = GridMapData::new(Size::new(8, 8), Size::new(2, 2));
        data.add_layer("ground");
        for gid in 1..=2 {
            let image = RgbaImage::from_pixel(8, 8, Rgba([gid as u8, 0, 0, 255]));
            data.insert_image(gid, Arc::new(image));
        }
        data.fill_layer(0, Some(1)).unwrap();
        data.set_animation(
            1,
            vec![(1, Duration::from_millis(500)), (2, Duration::from_millis(500))],
            true,
        )
        .unwrap();

        let config = RendererConfig::new(Size::new(16, 16));
        let mut renderer = BufferedRenderer::new(Box::new(data), config).unwrap();
        renderer.animations_mut().set_speed_multiplier(2.0).unwrap();

        // a new revision rebuilds the schedule on the next draw
        renderer.data_mut().reload().unwrap();
        let now = Instant::now() + Duration::from_secs(10);
        let mut dest = RgbaImage::new(16, 16);
        renderer.draw_at(now, &mut dest, Rect::new(0, 0, 16, 16), &[]).unwrap();

        assert_eq!(renderer.animations().speed_multiplier(), 2.0);
        assert_eq!(renderer.animations().next_deadline(), Some(now + Duration::from_millis(250)));
        assert_eq!(dest.get_pixel(0, 0), &Rgba([1, 0, 0, 255]));

        let mut dest = RgbaImage::new(16, 16);
        renderer
            .draw_at(now + Duration::from_millis(250), &mut dest, Rect::new(0, 0, 16, 16), &[])
            .unwrap();
        assert_eq!(dest.get_pixel(0, 0), &Rgba([2, 0, 0, 255]));
    }

    #[test]
    fn test_tiny_speed_multiplier_does_not_stall_drawing() {
        let start = Instant::now();
        let mut renderer = corner_renderer();
        renderer.animations_mut().set_speed_multiplier(1e-30).unwrap();

        // the frame due at +500 ms changes, the next one is capped far in the future
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(1)), ALT_WATER);
        assert_eq!(water_pixel(&mut renderer, start + Duration::from_secs(3600)), ALT_WATER);
    }
}
