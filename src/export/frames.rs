//! Frame-sequence export.
//!
//! Export renders the full timeline as raster frames at a fixed frame rate
//! and hands each frame to a sink (or writes a numbered PNG sequence).
//! Muxing the frames into a playable video container is an external step and
//! is intentionally not performed here.

use std::path::Path;

use anyhow::Context;

use crate::{
    assets::store::AssetStore,
    composition::model::Template,
    foundation::core::Resolution,
    foundation::error::{SlidereelError, SlidereelResult},
    render::compositor::{Compositor, FrameRgba},
};

pub const EXPORT_FPS: u32 = 30;

#[derive(Clone, Copy, Debug)]
pub struct ExportOptions {
    pub resolution: Resolution,
    pub fps: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::FullHd1080,
            fps: EXPORT_FPS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub frames: u64,
    pub width: u32,
    pub height: u32,
}

/// Number of frames covering `total_ms` at `fps` (ceiling division, so the
/// tail of the last slide is not cut short).
pub fn frame_count(total_ms: u64, fps: u32) -> u64 {
    (total_ms * u64::from(fps)).div_ceil(1000)
}

/// Render every export frame in timeline order, feeding each to `sink`.
#[tracing::instrument(skip(template, assets, compositor, sink))]
pub fn export_frames(
    template: &Template,
    assets: &AssetStore,
    compositor: &mut Compositor,
    opts: ExportOptions,
    mut sink: impl FnMut(u64, FrameRgba) -> SlidereelResult<()>,
) -> SlidereelResult<ExportStats> {
    template.validate()?;
    if opts.fps == 0 {
        return Err(SlidereelError::validation("export fps must be > 0"));
    }

    let surface = opts.resolution.canvas();
    let total_ms = template.total_duration_ms();
    let frames = frame_count(total_ms, opts.fps);
    if frames == 0 {
        return Err(SlidereelError::validation(
            "template timeline has zero duration",
        ));
    }

    let step_ms = 1000.0 / f64::from(opts.fps);
    for i in 0..frames {
        let elapsed_ms = i as f64 * step_ms;
        let frame = compositor.render_at(template, elapsed_ms, surface, assets)?;
        sink(i, frame)?;
    }

    Ok(ExportStats {
        frames,
        width: surface.width,
        height: surface.height,
    })
}

/// Render the timeline as `frame_00000.png`, `frame_00001.png`, ... in
/// `out_dir` (created if missing).
pub fn write_png_sequence(
    template: &Template,
    assets: &AssetStore,
    compositor: &mut Compositor,
    opts: ExportOptions,
    out_dir: &Path,
) -> SlidereelResult<ExportStats> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create export dir '{}'", out_dir.display()))?;

    export_frames(template, assets, compositor, opts, |index, frame| {
        let path = out_dir.join(format!("frame_{index:05}.png"));
        image::save_buffer_with_format(
            &path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", path.display()))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_is_ceiling() {
        assert_eq!(frame_count(1000, 30), 30);
        assert_eq!(frame_count(5000, 30), 150);
        assert_eq!(frame_count(3500, 30), 105);
        assert_eq!(frame_count(100, 30), 3); // 3 frames cover 100ms
        assert_eq!(frame_count(0, 30), 0);
    }

    #[test]
    fn export_covers_whole_timeline_once() {
        let mut template = Template::new();
        template.slides[0].duration_ms = 200;
        let surface = crate::foundation::core::CanvasSize {
            width: 8,
            height: 8,
        };
        template.canvas = surface;

        let mut compositor = Compositor::new();
        let assets = AssetStore::new();
        let opts = ExportOptions {
            resolution: Resolution::Hd720,
            fps: 30,
        };

        let mut seen = Vec::new();
        let stats = export_frames(
            &template,
            &assets,
            &mut compositor,
            opts,
            |index, frame| {
                seen.push(index);
                assert_eq!(frame.width, 720);
                assert_eq!(frame.height, 1280);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(stats.frames, frame_count(200, 30));
        assert_eq!(seen.len() as u64, stats.frames);
        assert_eq!(seen[0], 0);
    }

    #[test]
    fn export_rejects_zero_fps() {
        let template = Template::new();
        let mut compositor = Compositor::new();
        let err = export_frames(
            &template,
            &AssetStore::new(),
            &mut compositor,
            ExportOptions {
                resolution: Resolution::Hd720,
                fps: 0,
            },
            |_, _| Ok(()),
        );
        assert!(err.is_err());
    }
}
