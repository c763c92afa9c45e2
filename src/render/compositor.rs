//! The compositor turns an evaluated slide into pixels.
//!
//! Paint order per frame: flat background color, then gradient pixels, then
//! the background image/video poster with cover cropping, then shapes in
//! z order, then text fields in z order. The compositor holds only caches
//! (decoded image paints, font data, shaped layouts) so rendering the same
//! instant twice yields identical pixels; scrubbing and seeking re-render
//! freely without accumulating state.

use std::collections::HashMap;
use std::sync::Arc;

use kurbo::Shape as _;

use crate::{
    assets::store::{AssetStore, PreparedImage, TextBrushRgba8, TextLayoutEngine, TextLayoutParams},
    composition::model::{TextAlign, Template},
    eval::evaluator::{BackgroundLayer, ElementNode, EvaluatedSlide, Evaluator, NodePaint, TextPaint},
    foundation::core::{Affine, CanvasSize, Color, Rect},
    foundation::error::{SlidereelError, SlidereelResult},
    render::gradient::{fill_linear_gradient, parse_linear_gradient},
};

/// One rendered frame: premultiplied RGBA8, row-major, tightly packed.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

/// Center-crop scaling that fills `dst` while preserving `src` aspect ratio.
pub fn cover_affine(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> Affine {
    let scale = (dst_w / src_w).max(dst_h / src_h);
    let tx = (dst_w - src_w * scale) / 2.0;
    let ty = (dst_h - src_h * scale) / 2.0;
    Affine::translate((tx, ty)) * Affine::scale(scale)
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct LayoutKey {
    text: String,
    family: String,
    size_bits: u32,
    weight: u16,
    italic: bool,
    align: TextAlign,
    color: [u8; 4],
}

pub struct Compositor {
    image_paints: HashMap<String, vello_cpu::Image>,
    font_data: HashMap<String, vello_cpu::peniko::FontData>,
    layouts: HashMap<LayoutKey, Arc<parley::Layout<TextBrushRgba8>>>,
    text_engine: TextLayoutEngine,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            image_paints: HashMap::new(),
            font_data: HashMap::new(),
            layouts: HashMap::new(),
            text_engine: TextLayoutEngine::new(),
        }
    }

    /// Render the slide at `slide_index` at `local_progress` of its duration.
    #[tracing::instrument(skip(self, template, assets))]
    pub fn render_frame(
        &mut self,
        template: &Template,
        slide_index: usize,
        local_progress: f64,
        surface: CanvasSize,
        assets: &AssetStore,
    ) -> SlidereelResult<FrameRgba> {
        let eval = Evaluator::eval_slide(template, slide_index, local_progress, surface)?;
        self.render_evaluated(&eval, surface, assets)
    }

    /// Render the frame at a global timeline offset (wraps modulo the total
    /// duration, like playback).
    pub fn render_at(
        &mut self,
        template: &Template,
        elapsed_ms: f64,
        surface: CanvasSize,
        assets: &AssetStore,
    ) -> SlidereelResult<FrameRgba> {
        let eval = Evaluator::eval_at(template, elapsed_ms, surface)?;
        self.render_evaluated(&eval, surface, assets)
    }

    pub fn render_evaluated(
        &mut self,
        eval: &EvaluatedSlide,
        surface: CanvasSize,
        assets: &AssetStore,
    ) -> SlidereelResult<FrameRgba> {
        let width: u16 = surface
            .width
            .try_into()
            .map_err(|_| SlidereelError::evaluation("surface width exceeds u16"))?;
        let height: u16 = surface
            .height
            .try_into()
            .map_err(|_| SlidereelError::evaluation("surface height exceeds u16"))?;

        let mut pixmap = vello_cpu::Pixmap::new(width, height);

        match &eval.background {
            BackgroundLayer::Color(color) => {
                clear_pixmap(&mut pixmap, color.to_premul_rgba8());
            }
            BackgroundLayer::Gradient { spec, fallback } => {
                clear_pixmap(&mut pixmap, fallback.to_premul_rgba8());
                match parse_linear_gradient(spec) {
                    Ok(gradient) => fill_linear_gradient(
                        pixmap.data_as_u8_slice_mut(),
                        surface.width,
                        surface.height,
                        &gradient,
                    ),
                    Err(err) => {
                        tracing::warn!(%err, "malformed slide gradient; using flat color");
                    }
                }
            }
            BackgroundLayer::Image { fallback, .. } => {
                clear_pixmap(&mut pixmap, fallback.to_premul_rgba8());
            }
        }

        let mut ctx = vello_cpu::RenderContext::new(width, height);

        if let BackgroundLayer::Image { url, .. } = &eval.background {
            match assets.image(url) {
                Some(img) => {
                    let cover = cover_affine(
                        f64::from(img.width),
                        f64::from(img.height),
                        f64::from(surface.width),
                        f64::from(surface.height),
                    );
                    let paint = self.image_paint(url, img)?;
                    ctx.set_transform(affine_to_cpu(cover));
                    ctx.set_paint(paint);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                        0.0,
                        0.0,
                        f64::from(img.width),
                        f64::from(img.height),
                    ));
                }
                None => {
                    // Not loaded yet (or failed); the frame renders without
                    // it and a later load event triggers a re-render.
                    tracing::debug!(url = %url, "background image not ready, skipped for this frame");
                }
            }
        }

        for node in &eval.shapes {
            self.draw_shape(&mut ctx, node, assets)?;
        }
        for node in &eval.texts {
            self.draw_text(&mut ctx, node, assets)?;
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut pixmap);

        Ok(FrameRgba {
            width: surface.width,
            height: surface.height,
            data: pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn draw_shape(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        node: &ElementNode,
        assets: &AssetStore,
    ) -> SlidereelResult<()> {
        if node.opacity <= 0.0 {
            return Ok(());
        }

        match &node.paint {
            NodePaint::Rect {
                width_px,
                height_px,
                corner_radius_px,
                fill,
                stroke,
            } => {
                ctx.set_transform(affine_to_cpu(node.transform));
                with_opacity(ctx, node.opacity, |ctx| {
                    let outer = centered_rect(*width_px, *height_px);
                    if let Some((stroke_color, stroke_width)) = stroke {
                        set_color(ctx, *stroke_color);
                        fill_rounded(ctx, outer, *corner_radius_px);
                        let inner = centered_rect(
                            (width_px - 2.0 * stroke_width).max(0.0),
                            (height_px - 2.0 * stroke_width).max(0.0),
                        );
                        set_color(ctx, *fill);
                        fill_rounded(ctx, inner, (corner_radius_px - stroke_width).max(0.0));
                    } else {
                        set_color(ctx, *fill);
                        fill_rounded(ctx, outer, *corner_radius_px);
                    }
                });
            }
            NodePaint::Ellipse {
                width_px,
                height_px,
                fill,
                stroke,
            } => {
                ctx.set_transform(affine_to_cpu(node.transform));
                with_opacity(ctx, node.opacity, |ctx| {
                    if let Some((stroke_color, stroke_width)) = stroke {
                        set_color(ctx, *stroke_color);
                        fill_ellipse(ctx, *width_px, *height_px);
                        set_color(ctx, *fill);
                        fill_ellipse(
                            ctx,
                            (width_px - 2.0 * stroke_width).max(0.0),
                            (height_px - 2.0 * stroke_width).max(0.0),
                        );
                    } else {
                        set_color(ctx, *fill);
                        fill_ellipse(ctx, *width_px, *height_px);
                    }
                });
            }
            NodePaint::Line {
                length_px,
                thickness_px,
                color,
            } => {
                ctx.set_transform(affine_to_cpu(node.transform));
                with_opacity(ctx, node.opacity, |ctx| {
                    set_color(ctx, *color);
                    ctx.fill_rect(&rect_to_cpu(centered_rect(*length_px, *thickness_px)));
                });
            }
            NodePaint::Image {
                url,
                width_px,
                height_px,
            } => {
                let Some(img) = assets.image(url) else {
                    tracing::debug!(url = %url, "image element not ready, skipped for this frame");
                    return Ok(());
                };
                let paint = self.image_paint(url, img)?;
                // Stretch the bitmap into the element box, box centered on
                // the local origin.
                let fit = node.transform
                    * Affine::translate((-width_px / 2.0, -height_px / 2.0))
                    * Affine::scale_non_uniform(
                        width_px / f64::from(img.width),
                        height_px / f64::from(img.height),
                    );
                ctx.set_transform(affine_to_cpu(fit));
                with_opacity(ctx, node.opacity, |ctx| {
                    ctx.set_paint(paint);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                        0.0,
                        0.0,
                        f64::from(img.width),
                        f64::from(img.height),
                    ));
                });
            }
            NodePaint::Text(_) => {
                return Err(SlidereelError::evaluation(
                    "text node routed to the shape layer",
                ));
            }
        }
        Ok(())
    }

    fn draw_text(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        node: &ElementNode,
        assets: &AssetStore,
    ) -> SlidereelResult<()> {
        if node.opacity <= 0.0 {
            return Ok(());
        }
        let NodePaint::Text(paint) = &node.paint else {
            return Err(SlidereelError::evaluation(
                "shape node routed to the text layer",
            ));
        };
        if paint.text.is_empty() {
            return Ok(());
        }

        let Some((family_key, font_bytes)) = assets.font_bytes(&paint.font_family) else {
            tracing::warn!(
                family = %paint.font_family,
                "no fonts registered, text field skipped"
            );
            return Ok(());
        };
        let family_key = family_key.to_string();
        let font_bytes = Arc::clone(font_bytes);

        let layout = self.layout_for(paint, &family_key, &font_bytes)?;
        let font = self.font_for(&family_key, &font_bytes);

        // Center the laid-out block on the element's anchor point.
        let text_transform = node.transform
            * Affine::translate((
                -f64::from(layout.width()) / 2.0,
                -f64::from(layout.height()) / 2.0,
            ));
        ctx.set_transform(affine_to_cpu(text_transform));

        if node.opacity < 1.0 {
            ctx.push_opacity_layer(node.opacity);
        }

        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };

                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));

                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);

                if paint.underline {
                    let metrics = run.run().metrics();
                    let x0 = f64::from(run.offset());
                    let x1 = x0 + f64::from(run.advance());
                    let y0 = f64::from(run.baseline() - metrics.underline_offset);
                    let y1 = y0 + f64::from(metrics.underline_size).max(1.0);
                    ctx.fill_rect(&vello_cpu::kurbo::Rect::new(x0, y0, x1, y1));
                }
            }
        }

        if node.opacity < 1.0 {
            ctx.pop_layer();
        }
        Ok(())
    }

    fn image_paint(
        &mut self,
        url: &str,
        img: &PreparedImage,
    ) -> SlidereelResult<vello_cpu::Image> {
        if let Some(paint) = self.image_paints.get(url) {
            return Ok(paint.clone());
        }

        let pixmap = premul_bytes_to_pixmap(img.rgba8_premul.as_slice(), img.width, img.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.image_paints.insert(url.to_string(), paint.clone());
        Ok(paint)
    }

    fn font_for(&mut self, family_key: &str, bytes: &Arc<Vec<u8>>) -> vello_cpu::peniko::FontData {
        if let Some(font) = self.font_data.get(family_key) {
            return font.clone();
        }
        let font = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(bytes.as_ref().clone()),
            0,
        );
        self.font_data.insert(family_key.to_string(), font.clone());
        font
    }

    fn layout_for(
        &mut self,
        paint: &TextPaint,
        family_key: &str,
        font_bytes: &Arc<Vec<u8>>,
    ) -> SlidereelResult<Arc<parley::Layout<TextBrushRgba8>>> {
        let key = LayoutKey {
            text: paint.text.clone(),
            family: family_key.to_string(),
            size_bits: paint.font_size_px.to_bits(),
            weight: paint.font_weight,
            italic: paint.italic,
            align: paint.align,
            color: [paint.color.r, paint.color.g, paint.color.b, paint.color.a],
        };
        if let Some(layout) = self.layouts.get(&key) {
            return Ok(Arc::clone(layout));
        }

        let layout = self.text_engine.layout(TextLayoutParams {
            text: &paint.text,
            font_bytes: font_bytes.as_slice(),
            size_px: paint.font_size_px,
            weight: paint.font_weight,
            italic: paint.italic,
            brush: TextBrushRgba8 {
                r: paint.color.r,
                g: paint.color.g,
                b: paint.color.b,
                a: paint.color.a,
            },
            align: match paint.align {
                TextAlign::Left => parley::Alignment::Start,
                TextAlign::Center => parley::Alignment::Center,
                TextAlign::Right => parley::Alignment::End,
            },
            max_width_px: None,
        })?;

        let layout = Arc::new(layout);
        self.layouts.insert(key, Arc::clone(&layout));
        Ok(layout)
    }
}

fn centered_rect(width: f64, height: f64) -> Rect {
    Rect::new(-width / 2.0, -height / 2.0, width / 2.0, height / 2.0)
}

fn with_opacity(
    ctx: &mut vello_cpu::RenderContext,
    opacity: f32,
    draw: impl FnOnce(&mut vello_cpu::RenderContext),
) {
    if opacity < 1.0 {
        ctx.push_opacity_layer(opacity);
        draw(ctx);
        ctx.pop_layer();
    } else {
        draw(ctx);
    }
}

fn set_color(ctx: &mut vello_cpu::RenderContext, color: Color) {
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        color.r, color.g, color.b, color.a,
    ));
}

fn fill_rounded(ctx: &mut vello_cpu::RenderContext, rect: Rect, radius: f64) {
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return;
    }
    if radius > 0.0 {
        let path = kurbo::RoundedRect::from_rect(rect, radius).to_path(0.1);
        ctx.fill_path(&bezpath_to_cpu(&path));
    } else {
        ctx.fill_rect(&rect_to_cpu(rect));
    }
}

fn fill_ellipse(ctx: &mut vello_cpu::RenderContext, width: f64, height: f64) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let ellipse = kurbo::Ellipse::new((0.0, 0.0), (width / 2.0, height / 2.0), 0.0);
    ctx.fill_path(&bezpath_to_cpu(&ellipse.to_path(0.1)));
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn point_to_cpu(p: kurbo::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> SlidereelResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SlidereelError::evaluation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SlidereelError::evaluation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(SlidereelError::evaluation(
            "prepared image byte length mismatch",
        ));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::model::{ElementKind, ShapeStyle};

    #[test]
    fn cover_landscape_on_portrait_crops_sides() {
        let a = cover_affine(1920.0, 1080.0, 1080.0, 1920.0);
        let c = a.as_coeffs();
        let scale = c[0];
        assert!((scale - 1920.0 / 1080.0).abs() < 1e-9);
        // Horizontal overflow is centered: negative x offset, zero y offset.
        assert!(c[4] < 0.0);
        assert!(c[5].abs() < 1e-9);
    }

    #[test]
    fn cover_matching_aspect_is_plain_scale() {
        let a = cover_affine(540.0, 960.0, 1080.0, 1920.0);
        let c = a.as_coeffs();
        assert!((c[0] - 2.0).abs() < 1e-9);
        assert!(c[4].abs() < 1e-9 && c[5].abs() < 1e-9);
    }

    #[test]
    fn cover_portrait_on_portrait_taller_crops_top_bottom() {
        let a = cover_affine(1080.0, 2400.0, 1080.0, 1920.0);
        let c = a.as_coeffs();
        assert!((c[0] - 1.0).abs() < 1e-9);
        assert!(c[5] < 0.0);
        assert!(c[4].abs() < 1e-9);
    }

    #[test]
    fn flat_background_fills_every_pixel() {
        let mut t = Template::new();
        t.slides[0].background_color = Color::opaque(10, 20, 30);
        let surface = CanvasSize {
            width: 8,
            height: 8,
        };
        t.canvas = surface;

        let mut compositor = Compositor::new();
        let frame = compositor
            .render_frame(&t, 0, 0.0, surface, &AssetStore::new())
            .unwrap();
        assert_eq!(frame.data.len(), 8 * 8 * 4);
        assert!(frame.premultiplied);
        for px in frame.data.chunks_exact(4) {
            assert_eq!(px, &[10, 20, 30, 255]);
        }
    }

    #[test]
    fn rect_element_paints_over_background() {
        let mut t = Template::new();
        t.slides[0].background_color = Color::WHITE;
        let surface = CanvasSize {
            width: 16,
            height: 16,
        };
        t.canvas = surface;

        let slide_id = t.slides[0].id;
        let id = t.add_element(ElementKind::Rectangle {
            shape: ShapeStyle {
                width_pct: 100.0,
                height_pct: 100.0,
                fill: Color::opaque(255, 0, 0),
                stroke: None,
                stroke_width_px: 0.0,
            },
            corner_radius_px: 0.0,
        });
        t.attach_element(id, slide_id, 50.0, 50.0).unwrap();
        t.element_mut(id).unwrap().animation.animation_type =
            crate::animation::preset::AnimationType::None;

        let mut compositor = Compositor::new();
        let frame = compositor
            .render_frame(&t, 0, 0.5, surface, &AssetStore::new())
            .unwrap();

        // Center pixel is the rect fill, not the white background.
        let center = ((8 * 16 + 8) * 4) as usize;
        let px = &frame.data[center..center + 4];
        assert!(px[0] > 200, "center should be red: {px:?}");
        assert!(px[1] < 60 && px[2] < 60, "center should be red: {px:?}");
    }

    #[test]
    fn missing_background_image_renders_fallback() {
        let mut t = Template::new();
        t.slides[0].background_color = Color::opaque(0, 0, 255);
        t.slides[0].background_image = Some("not-loaded.png".to_string());
        let surface = CanvasSize {
            width: 4,
            height: 4,
        };
        t.canvas = surface;

        let mut compositor = Compositor::new();
        let frame = compositor
            .render_frame(&t, 0, 0.0, surface, &AssetStore::new())
            .unwrap();
        assert_eq!(&frame.data[0..4], &[0, 0, 255, 255]);
    }

    #[test]
    fn repeated_renders_are_identical() {
        let mut t = Template::new();
        t.slides[0].background_gradient =
            Some("linear-gradient(135deg, #ff0088, #0088ff)".to_string());
        let surface = CanvasSize {
            width: 12,
            height: 12,
        };
        t.canvas = surface;

        let mut compositor = Compositor::new();
        let assets = AssetStore::new();
        let a = compositor.render_frame(&t, 0, 0.25, surface, &assets).unwrap();
        let b = compositor.render_frame(&t, 0, 0.25, surface, &assets).unwrap();
        assert_eq!(a.data, b.data);
    }
}
