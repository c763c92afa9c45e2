//! Pure evaluation: global timeline time to a paint-ready scene graph.
//!
//! Evaluation never touches IO or the clock. Given a template and an elapsed
//! time it produces an [`EvaluatedSlide`]: the resolved background plus two
//! z-sorted node layers (shapes below, text above) with every element's
//! animation already sampled and its transform resolved to surface pixels.

use crate::{
    composition::model::{
        Element, ElementKind, ObjectId, Slide, SlideBackground, Template, TextAlign,
        TextDecoration, TextStyle,
    },
    foundation::core::{Affine, CanvasSize, Color, Transform2D, Vec2},
    foundation::error::{SlidereelError, SlidereelResult},
};

/// Where an elapsed timestamp lands in the slide sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineCursor {
    pub slide_index: usize,
    /// Fraction of the active slide's duration, always in [0, 1).
    pub local_progress: f64,
    /// Timeline offset of the active slide's start.
    pub slide_start_ms: u64,
}

/// Map a global elapsed time onto the slide sequence.
///
/// Elapsed time wraps modulo the total duration, so playback loops. The
/// mapping is a partition: every instant belongs to exactly one slide.
pub fn locate(slides: &[Slide], elapsed_ms: f64) -> SlidereelResult<TimelineCursor> {
    if slides.is_empty() {
        return Err(SlidereelError::evaluation("no slides to locate in"));
    }
    let total: u64 = slides.iter().map(|s| s.duration_ms).sum();
    if total == 0 {
        return Err(SlidereelError::evaluation("total slide duration is zero"));
    }

    let wrapped = elapsed_ms.rem_euclid(total as f64);
    let mut cumulative = 0u64;
    for (index, slide) in slides.iter().enumerate() {
        let end = cumulative + slide.duration_ms;
        if wrapped < end as f64 {
            return Ok(TimelineCursor {
                slide_index: index,
                local_progress: (wrapped - cumulative as f64) / slide.duration_ms as f64,
                slide_start_ms: cumulative,
            });
        }
        cumulative = end;
    }

    // rem_euclid keeps `wrapped` strictly below `total`, so the loop always
    // returns; this is the float edge where wrapped == total.
    Ok(TimelineCursor {
        slide_index: slides.len() - 1,
        local_progress: 0.0,
        slide_start_ms: total - slides[slides.len() - 1].duration_ms,
    })
}

/// Background layer resolved for painting. Gradient and image layers carry
/// the flat color as the fallback painted beneath (or instead of) them.
#[derive(Clone, Debug, PartialEq)]
pub enum BackgroundLayer {
    Color(Color),
    Gradient { spec: String, fallback: Color },
    Image { url: String, fallback: Color },
}

/// One element ready to paint: animation sampled, transform resolved.
#[derive(Clone, Debug)]
pub struct ElementNode {
    pub id: ObjectId,
    pub z_index: i32,
    pub opacity: f32,
    pub transform: Affine,
    pub paint: NodePaint,
}

/// Paint data per element kind, in surface pixels, geometry centered on the
/// local origin (the transform places and rotates it).
#[derive(Clone, Debug)]
pub enum NodePaint {
    Rect {
        width_px: f64,
        height_px: f64,
        corner_radius_px: f64,
        fill: Color,
        stroke: Option<(Color, f64)>,
    },
    Ellipse {
        width_px: f64,
        height_px: f64,
        fill: Color,
        stroke: Option<(Color, f64)>,
    },
    Line {
        length_px: f64,
        thickness_px: f64,
        color: Color,
    },
    Image {
        url: String,
        width_px: f64,
        height_px: f64,
    },
    Text(TextPaint),
}

/// Everything the text rasterizer needs to shape and fill one field.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPaint {
    pub text: String,
    pub font_family: String,
    pub font_size_px: f32,
    pub font_weight: u16,
    pub italic: bool,
    pub underline: bool,
    pub align: TextAlign,
    pub color: Color,
}

/// A fully evaluated frame of one slide.
#[derive(Clone, Debug)]
pub struct EvaluatedSlide {
    pub slide_index: usize,
    pub background: BackgroundLayer,
    pub shapes: Vec<ElementNode>,
    pub texts: Vec<ElementNode>,
}

pub struct Evaluator;

impl Evaluator {
    /// Evaluate the slide at `slide_index` at `local_progress` of its
    /// duration, producing paint-ready nodes for `surface`.
    pub fn eval_slide(
        template: &Template,
        slide_index: usize,
        local_progress: f64,
        surface: CanvasSize,
    ) -> SlidereelResult<EvaluatedSlide> {
        let slide = template.slides.get(slide_index).ok_or_else(|| {
            SlidereelError::evaluation(format!("slide index {slide_index} out of bounds"))
        })?;

        let background = match slide.effective_background() {
            SlideBackground::Gradient(spec) => BackgroundLayer::Gradient {
                spec: spec.to_string(),
                fallback: slide.background_color,
            },
            // Video backgrounds render their poster frame through the same
            // image path.
            SlideBackground::Image(url) | SlideBackground::Video(url) => BackgroundLayer::Image {
                url: url.to_string(),
                fallback: slide.background_color,
            },
            SlideBackground::Color(color) => BackgroundLayer::Color(color),
        };

        let slide_elapsed_ms = local_progress.clamp(0.0, 1.0) * slide.duration_ms as f64;
        // Animation pixel offsets are authored in template-canvas space;
        // scale them with the surface so every export resolution matches.
        let px_scale = f64::from(surface.width) / f64::from(template.canvas.width);

        let mut shapes = Vec::new();
        let mut texts = Vec::new();
        for element in template.elements_for_slide(slide.id) {
            let node = eval_element(element, slide_elapsed_ms, surface, px_scale);
            if element.kind.is_text() {
                texts.push(node);
            } else {
                shapes.push(node);
            }
        }

        Ok(EvaluatedSlide {
            slide_index,
            background,
            shapes,
            texts,
        })
    }

    /// Convenience: locate `elapsed_ms` on the timeline and evaluate the
    /// active slide.
    pub fn eval_at(
        template: &Template,
        elapsed_ms: f64,
        surface: CanvasSize,
    ) -> SlidereelResult<EvaluatedSlide> {
        let cursor = locate(&template.slides, elapsed_ms)?;
        Self::eval_slide(template, cursor.slide_index, cursor.local_progress, surface)
    }
}

fn eval_element(
    element: &Element,
    slide_elapsed_ms: f64,
    surface: CanvasSize,
    px_scale: f64,
) -> ElementNode {
    let sample = element.animation.sample_at(slide_elapsed_ms);

    let center = Vec2::new(
        element.x_pct / 100.0 * f64::from(surface.width) + sample.offset_x * px_scale,
        element.y_pct / 100.0 * f64::from(surface.height) + sample.offset_y * px_scale,
    );
    let transform = Transform2D {
        translate: center,
        rotation_rad: (element.rotation_deg + sample.rotation_deg).to_radians(),
        scale: Vec2::new(sample.scale, sample.scale),
        anchor: Vec2::ZERO,
    }
    .to_affine();

    let opacity = (element.opacity * sample.opacity).clamp(0.0, 1.0) as f32;

    let px_w = |pct: f64| pct / 100.0 * f64::from(surface.width);
    let px_h = |pct: f64| pct / 100.0 * f64::from(surface.height);

    let paint = match &element.kind {
        ElementKind::Rectangle {
            shape,
            corner_radius_px,
        } => NodePaint::Rect {
            width_px: px_w(shape.width_pct),
            height_px: px_h(shape.height_pct),
            corner_radius_px: corner_radius_px * px_scale,
            fill: shape.fill,
            stroke: stroke_of(shape.stroke, shape.stroke_width_px, px_scale),
        },
        ElementKind::Ellipse { shape } => NodePaint::Ellipse {
            width_px: px_w(shape.width_pct),
            height_px: px_h(shape.height_pct),
            fill: shape.fill,
            stroke: stroke_of(shape.stroke, shape.stroke_width_px, px_scale),
        },
        ElementKind::Line { shape } => NodePaint::Line {
            length_px: px_w(shape.width_pct),
            thickness_px: px_h(shape.height_pct),
            color: shape.fill,
        },
        ElementKind::Image { shape, src } => NodePaint::Image {
            url: src.clone(),
            width_px: px_w(shape.width_pct),
            height_px: px_h(shape.height_pct),
        },
        ElementKind::Text { style } => NodePaint::Text(text_paint(style, px_scale)),
    };

    ElementNode {
        id: element.id,
        z_index: element.z_index,
        opacity,
        transform,
        paint,
    }
}

fn stroke_of(stroke: Option<Color>, width_px: f64, px_scale: f64) -> Option<(Color, f64)> {
    match stroke {
        Some(color) if width_px > 0.0 => Some((color, width_px * px_scale)),
        _ => None,
    }
}

fn text_paint(style: &TextStyle, px_scale: f64) -> TextPaint {
    // CSS points to pixels at 96dpi, then into surface space.
    let font_size_px = (style.font_size_pt * 4.0 / 3.0 * px_scale) as f32;
    TextPaint {
        text: style.text.clone(),
        font_family: style.font_family.clone(),
        font_size_px,
        font_weight: style.font_weight,
        italic: matches!(style.font_style, crate::composition::model::FontStyle::Italic),
        underline: matches!(style.text_decoration, TextDecoration::Underline),
        align: style.text_align,
        color: style.font_color,
    }
}
