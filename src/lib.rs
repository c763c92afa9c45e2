//! Slidereel is the slide/timeline compositing engine behind the
//! video-invitation template builder.
//!
//! A [`Template`] holds an ordered slide sequence plus the positioned,
//! animatable elements attached to those slides. Rendering any instant of
//! the timeline is a pure pipeline:
//!
//! 1. **Locate**: elapsed time -> (active slide, local progress), wrapping
//!    modulo the total duration ([`locate`])
//! 2. **Evaluate**: sample every element's animation and resolve transforms
//!    to surface pixels ([`Evaluator`])
//! 3. **Composite**: paint background, shapes, then text into premultiplied
//!    RGBA8 ([`Compositor`])
//!
//! Around that core: [`PlaybackController`] owns play/pause/seek time,
//! [`InteractionController`] turns pointer gestures into model mutations,
//! [`AssetStore`] handles fire-and-forget image loading and fonts, and
//! `export` renders the timeline as a 30fps PNG frame sequence (muxing to a
//! video container is an external step).
//!
//! Evaluation and compositing are deterministic: no IO, no clock access, the
//! same model and instant always produce the same pixels.
#![forbid(unsafe_code)]

mod animation;
mod assets;
mod composition;
mod eval;
mod export;
mod foundation;
mod interact;
mod persist;
mod playback;
mod render;

pub use animation::preset::{
    AnimationSample, AnimationType, ease_out_cubic, element_progress,
};
pub use assets::store::{
    AssetStore, PreparedImage, TextBrushRgba8, TextLayoutEngine, TextLayoutParams, decode_image,
};
pub use composition::model::{
    AnimationSpec, DEFAULT_SLIDE_DURATION_MS, DETACHED_POSITION_PCT, Element, ElementKind,
    FontStyle, ObjectId, ShapeStyle, Slide, SlideBackground, Template, TextAlign, TextDecoration,
    TextStyle, TransitionType,
};
pub use eval::evaluator::{
    BackgroundLayer, ElementNode, EvaluatedSlide, Evaluator, NodePaint, TextPaint, TimelineCursor,
    locate,
};
pub use export::frames::{
    EXPORT_FPS, ExportOptions, ExportStats, export_frames, frame_count, write_png_sequence,
};
pub use foundation::core::{
    Affine, BezPath, CanvasSize, Color, Point, Rect, Resolution, Transform2D, Vec2,
};
pub use foundation::error::{SlidereelError, SlidereelResult};
pub use interact::controller::{
    Corner, DRAG_MARGIN_PCT, InteractionController, MIN_SHAPE_SIZE_PCT, Viewport,
};
pub use persist::protocol::{
    AssetUpload, PersistGateway, PresetFieldResponse, SaveRequest, SaveResponse, UploadContext,
    UploadKind, UploadResponse, apply_save_response, build_save_request,
};
pub use playback::controller::{
    Clock, FrameTick, MonotonicClock, PlaybackController, PlaybackState, SeekOutcome,
};
pub use render::compositor::{Compositor, FrameRgba, cover_affine};
pub use render::gradient::{
    GradientStop, LinearGradient, fill_linear_gradient, parse_linear_gradient,
};
