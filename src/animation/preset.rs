//! Entrance-animation presets for slide elements.
//!
//! Every preset maps a local progress `t` to the visual properties of an
//! element. The shaping function is a cubic ease-out except for the cyclic
//! presets (pulse, shake, bounce), which run on raw `t` so their oscillation
//! frequency is stable. Progress outside [0,1] clamps: negative `t` means the
//! element's delay has not elapsed yet and it is hidden; `t >= 1` holds the
//! settled state.

use std::f64::consts::PI;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnimationType {
    None,
    #[default]
    FadeIn,
    FadeOut,
    SlideUp,
    SlideDown,
    SlideLeft,
    SlideRight,
    ZoomIn,
    ZoomOut,
    Pulse,
    Shake,
    Bounce,
    Rotate,
}

impl AnimationType {
    pub const ALL: [Self; 13] = [
        Self::None,
        Self::FadeIn,
        Self::FadeOut,
        Self::SlideUp,
        Self::SlideDown,
        Self::SlideLeft,
        Self::SlideRight,
        Self::ZoomIn,
        Self::ZoomOut,
        Self::Pulse,
        Self::Shake,
        Self::Bounce,
        Self::Rotate,
    ];

    /// Sample the preset at local progress `t`.
    pub fn evaluate(self, t: f64) -> AnimationSample {
        if t < 0.0 {
            return AnimationSample::HIDDEN;
        }
        let t = t.clamp(0.0, 1.0);
        let e = ease_out_cubic(t);

        match self {
            Self::None => AnimationSample::REST,
            Self::FadeIn => AnimationSample {
                opacity: e,
                ..AnimationSample::REST
            },
            Self::FadeOut => AnimationSample {
                opacity: 1.0 - e,
                ..AnimationSample::REST
            },
            Self::SlideUp => AnimationSample {
                opacity: e,
                offset_y: (1.0 - e) * 50.0,
                ..AnimationSample::REST
            },
            Self::SlideDown => AnimationSample {
                opacity: e,
                offset_y: (e - 1.0) * 50.0,
                ..AnimationSample::REST
            },
            Self::SlideLeft => AnimationSample {
                opacity: e,
                offset_x: (1.0 - e) * 50.0,
                ..AnimationSample::REST
            },
            Self::SlideRight => AnimationSample {
                opacity: e,
                offset_x: (e - 1.0) * 50.0,
                ..AnimationSample::REST
            },
            Self::ZoomIn => AnimationSample {
                opacity: e,
                scale: 0.5 + e * 0.5,
                ..AnimationSample::REST
            },
            Self::ZoomOut => AnimationSample {
                opacity: 1.0 - e,
                scale: 1.0 - e * 0.5,
                ..AnimationSample::REST
            },
            Self::Pulse => AnimationSample {
                scale: 1.0 + 0.05 * (t * 2.0 * PI).sin(),
                ..AnimationSample::REST
            },
            Self::Shake => AnimationSample {
                offset_x: 5.0 * (t * 10.0 * PI).sin() * (1.0 - t),
                ..AnimationSample::REST
            },
            Self::Bounce => AnimationSample {
                offset_y: -20.0 * (t * 5.0 * PI).sin().abs() * (1.0 - t),
                ..AnimationSample::REST
            },
            Self::Rotate => AnimationSample {
                opacity: e,
                rotation_deg: -180.0 * (1.0 - e),
                ..AnimationSample::REST
            },
        }
    }
}

/// Visual properties an animation preset contributes to one element at one
/// instant. Offsets are in design-space pixels (1080-wide canvas) and are
/// scaled with the surface at render time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationSample {
    pub opacity: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    pub rotation_deg: f64,
}

impl AnimationSample {
    /// Settled state: fully visible, no displacement.
    pub const REST: Self = Self {
        opacity: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
        scale: 1.0,
        rotation_deg: 0.0,
    };

    /// Pre-delay state: not yet visible, transforms at rest.
    pub const HIDDEN: Self = Self {
        opacity: 0.0,
        offset_x: 0.0,
        offset_y: 0.0,
        scale: 1.0,
        rotation_deg: 0.0,
    };
}

pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

/// Map elapsed time within a slide to an element's local animation progress.
///
/// Negative return values mean the delay has not elapsed (hidden state);
/// values past the animation window clamp to 1.
pub fn element_progress(slide_elapsed_ms: f64, delay_ms: u64, duration_ms: u64) -> f64 {
    let duration = (duration_ms.max(1)) as f64;
    let raw = (slide_elapsed_ms - delay_ms as f64) / duration;
    if raw < 0.0 { raw } else { raw.min(1.0) }
}
