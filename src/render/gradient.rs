//! CSS-style linear gradient backgrounds.
//!
//! The builder stores slide gradients as the CSS subset
//! `linear-gradient(<angle>deg, <color> [<stop>%], ...)`. Parsing happens at
//! render time; the fill writes premultiplied RGBA8 directly into the frame
//! buffer before any elements are drawn.

use crate::foundation::core::Color;
use crate::foundation::error::{SlidereelError, SlidereelResult};

#[derive(Clone, Debug, PartialEq)]
pub struct LinearGradient {
    /// CSS angle: 0deg points up, 90deg points right, 180deg down.
    pub angle_deg: f64,
    /// Sorted stops with offsets in [0, 1]; always at least two.
    pub stops: Vec<GradientStop>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Color,
}

pub fn parse_linear_gradient(s: &str) -> SlidereelResult<LinearGradient> {
    let s = s.trim();
    let inner = s
        .strip_prefix("linear-gradient(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| {
            SlidereelError::validation(format!("'{s}' is not a linear-gradient(...) value"))
        })?;

    let mut parts = inner.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.is_empty() {
        return Err(SlidereelError::validation("gradient has no arguments"));
    }

    let angle_deg = if let Some(deg) = parts[0].strip_suffix("deg") {
        let angle = deg.trim().parse::<f64>().map_err(|_| {
            SlidereelError::validation(format!("invalid gradient angle '{}'", parts[0]))
        })?;
        parts.remove(0);
        angle
    } else {
        // CSS default: to bottom.
        180.0
    };

    if parts.len() < 2 {
        return Err(SlidereelError::validation(
            "gradient needs at least two color stops",
        ));
    }

    let mut stops = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let mut tokens = part.split_whitespace();
        let color_tok = tokens
            .next()
            .ok_or_else(|| SlidereelError::validation("empty gradient stop"))?;
        let color = Color::parse_hex(color_tok)?;

        let offset = match tokens.next() {
            Some(pct) => {
                let pct = pct.strip_suffix('%').ok_or_else(|| {
                    SlidereelError::validation(format!("gradient stop '{part}' must end in %"))
                })?;
                let v = pct.parse::<f64>().map_err(|_| {
                    SlidereelError::validation(format!("invalid gradient stop '{part}'"))
                })?;
                v / 100.0
            }
            // Unpositioned stops distribute evenly across the line.
            None => i as f64 / (parts.len() - 1) as f64,
        };
        stops.push(GradientStop {
            offset: offset.clamp(0.0, 1.0),
            color,
        });
    }

    stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    Ok(LinearGradient { angle_deg, stops })
}

impl LinearGradient {
    /// Sample the gradient at position `t` along its line.
    pub fn sample(&self, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let first = self.stops[0];
        let last = self.stops[self.stops.len() - 1];
        if t <= first.offset {
            return first.color;
        }
        if t >= last.offset {
            return last.color;
        }
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.offset {
                let span = b.offset - a.offset;
                if span <= f64::EPSILON {
                    return b.color;
                }
                return Color::lerp(a.color, b.color, (t - a.offset) / span);
            }
        }
        last.color
    }
}

/// Fill `data` (premultiplied RGBA8, row-major `width` x `height`) with the
/// gradient, using CSS gradient-line geometry: the line passes through the
/// center and its length covers the whole box at the given angle.
pub fn fill_linear_gradient(data: &mut [u8], width: u32, height: u32, gradient: &LinearGradient) {
    let (w, h) = (width as f64, height as f64);
    let rad = gradient.angle_deg.to_radians();
    // CSS: 0deg points up; direction of increasing stop position.
    let (dx, dy) = (rad.sin(), -rad.cos());
    let line_len = (w * dx.abs()) + (h * dy.abs());
    if line_len <= f64::EPSILON {
        return;
    }

    let (cx, cy) = (w / 2.0, h / 2.0);
    for y in 0..height {
        for x in 0..width {
            let proj = ((x as f64 + 0.5) - cx) * dx + ((y as f64 + 0.5) - cy) * dy;
            let t = proj / line_len + 0.5;
            let px = gradient.sample(t).to_premul_rgba8();
            let idx = ((y as usize) * (width as usize) + (x as usize)) * 4;
            data[idx..idx + 4].copy_from_slice(&px);
        }
    }
}
