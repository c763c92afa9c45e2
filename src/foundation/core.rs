use crate::foundation::error::{SlidereelError, SlidereelResult};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Pixel dimensions of a render surface.
///
/// Templates are authored on a portrait 1080x1920 canvas; export surfaces may
/// substitute one of the fixed [`Resolution`] sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
        }
    }
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> SlidereelResult<Self> {
        if width == 0 || height == 0 {
            return Err(SlidereelError::validation(
                "canvas width/height must be > 0",
            ));
        }
        Ok(Self { width, height })
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Fixed export resolutions (portrait 9:16).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Hd720,
    FullHd1080,
    Uhd4k,
}

impl Resolution {
    pub fn canvas(self) -> CanvasSize {
        match self {
            Self::Hd720 => CanvasSize {
                width: 720,
                height: 1280,
            },
            Self::FullHd1080 => CanvasSize {
                width: 1080,
                height: 1920,
            },
            Self::Uhd4k => CanvasSize {
                width: 2160,
                height: 3840,
            },
        }
    }
}

/// Straight-alpha RGBA8 color.
///
/// Serialized as a CSS hex string (`"#rrggbb"` or `"#rrggbbaa"`), which is the
/// form the builder UI and the persistence endpoint exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::opaque(255, 255, 255);
    pub const BLACK: Self = Self::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn parse_hex(s: &str) -> SlidereelResult<Self> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| SlidereelError::validation(format!("color '{s}' must start with '#'")))?;
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(SlidereelError::validation(format!(
                "invalid hex color '{s}'"
            )));
        }

        let digit = |i: usize| -> SlidereelResult<u8> {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| SlidereelError::validation(format!("invalid hex color '{s}'")))
        };

        match hex.len() {
            6 => Ok(Self {
                r: digit(0)?,
                g: digit(2)?,
                b: digit(4)?,
                a: 255,
            }),
            8 => Ok(Self {
                r: digit(0)?,
                g: digit(2)?,
                b: digit(4)?,
                a: digit(6)?,
            }),
            _ => Err(SlidereelError::validation(format!(
                "color '{s}' must be #rrggbb or #rrggbbaa"
            ))),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }

    /// Premultiplied RGBA8 bytes for surface clears and pixel fills.
    pub fn to_premul_rgba8(self) -> [u8; 4] {
        fn premul(c: u8, a: u8) -> u8 {
            (((u16::from(c) * u16::from(a)) + 127) / 255) as u8
        }
        [
            premul(self.r, self.a),
            premul(self.g, self.a),
            premul(self.b, self.a),
            self.a,
        ]
    }

    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }
        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Decomposed 2D transform applied to an element at render time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    pub translate: Vec2,
    pub rotation_rad: f64,
    pub scale: Vec2,  // default (1,1)
    pub anchor: Vec2, // pivot in local space
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            translate: Vec2::ZERO,
            rotation_rad: 0.0,
            scale: Vec2::new(1.0, 1.0),
            anchor: Vec2::ZERO,
        }
    }
}

impl Transform2D {
    pub fn to_affine(self) -> kurbo::Affine {
        let t_translate = kurbo::Affine::translate(self.translate);
        let t_anchor = kurbo::Affine::translate(self.anchor);
        let t_unanchor = kurbo::Affine::translate(-self.anchor);
        let t_rotate = kurbo::Affine::rotate(self.rotation_rad);
        let t_scale = kurbo::Affine::scale_non_uniform(self.scale.x, self.scale.y);

        // Canonical order:
        // T(translate) * T(anchor) * R(rot) * S(scale) * T(-anchor)
        t_translate * t_anchor * t_rotate * t_scale * t_unanchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_default_is_portrait_1080() {
        let c = CanvasSize::default();
        assert_eq!((c.width, c.height), (1080, 1920));
        assert!(c.aspect() < 1.0);
    }

    #[test]
    fn canvas_new_rejects_zero_dimensions() {
        assert!(CanvasSize::new(0, 1920).is_err());
        assert!(CanvasSize::new(1080, 0).is_err());
        assert_eq!(CanvasSize::new(1080, 1920).unwrap(), CanvasSize::default());
    }

    #[test]
    fn resolution_presets_are_fixed() {
        assert_eq!(Resolution::Hd720.canvas().width, 720);
        assert_eq!(Resolution::FullHd1080.canvas().height, 1920);
        assert_eq!(Resolution::Uhd4k.canvas().width, 2160);
    }

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::parse_hex("#1a2B3c").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x1a, 0x2b, 0x3c, 255));
        assert_eq!(c.to_hex(), "#1a2b3c");

        let c = Color::parse_hex("#ff000080").unwrap();
        assert_eq!(c.a, 0x80);
        assert_eq!(c.to_hex(), "#ff000080");
    }

    #[test]
    fn color_rejects_malformed() {
        assert!(Color::parse_hex("ff0000").is_err());
        assert!(Color::parse_hex("#ff00").is_err());
        assert!(Color::parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn color_serde_uses_hex_strings() {
        let json = serde_json::to_string(&Color::opaque(255, 0, 0)).unwrap();
        assert_eq!(json, "\"#ff0000\"");
        let back: Color = serde_json::from_str("\"#00ff00\"").unwrap();
        assert_eq!(back, Color::opaque(0, 255, 0));
    }

    #[test]
    fn premul_scales_channels() {
        let c = Color {
            r: 200,
            g: 100,
            b: 0,
            a: 128,
        };
        let p = c.to_premul_rgba8();
        assert_eq!(p[3], 128);
        assert_eq!(p[0], ((200u16 * 128 + 127) / 255) as u8);
    }

    #[test]
    fn transform_to_affine_identity_and_translation() {
        let t = Transform2D::default();
        assert_eq!(t.to_affine(), kurbo::Affine::IDENTITY);

        let t = Transform2D {
            translate: Vec2::new(10.0, -2.5),
            ..Transform2D::default()
        };
        assert_eq!(
            t.to_affine(),
            kurbo::Affine::translate(Vec2::new(10.0, -2.5))
        );
    }
}
