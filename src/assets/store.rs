//! Asset loading and text shaping.
//!
//! Fetching bytes is the host's job (HTTP in the builder, the filesystem in
//! the CLI) and is the only asynchronous operation in the engine: the host
//! calls [`AssetStore::begin_load`], fires its fetch, and hands the bytes to
//! [`AssetStore::complete_load`], whose `true` return means "re-render the
//! current frame". A frame rendered while an image is still loading simply
//! omits that visual.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{SlidereelError, SlidereelResult};

/// Decoded raster image in premultiplied RGBA8 form.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

pub fn decode_image(bytes: &[u8]) -> SlidereelResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[derive(Clone, Debug)]
enum ImageState {
    Loading,
    Ready(PreparedImage),
    Failed(String),
}

/// Images keyed by their URL plus a font registry keyed by family name.
#[derive(Clone, Debug, Default)]
pub struct AssetStore {
    images: HashMap<String, ImageState>,
    // BTreeMap so the fallback family is deterministic.
    fonts: BTreeMap<String, Arc<Vec<u8>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `url` as loading. Returns `true` when the host should start a
    /// fetch (not already loading or ready); a previously failed load is
    /// retried.
    pub fn begin_load(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        match self.images.get(&url) {
            Some(ImageState::Loading) | Some(ImageState::Ready(_)) => false,
            Some(ImageState::Failed(_)) | None => {
                self.images.insert(url, ImageState::Loading);
                true
            }
        }
    }

    /// Decode fetched bytes for `url`. Returns `true` when the image became
    /// ready and the current frame should be re-rendered. A decode failure
    /// is recorded (non-fatal for rendering) and surfaced to the caller.
    pub fn complete_load(&mut self, url: &str, bytes: &[u8]) -> SlidereelResult<bool> {
        match decode_image(bytes) {
            Ok(prepared) => {
                self.images.insert(url.to_string(), ImageState::Ready(prepared));
                Ok(true)
            }
            Err(err) => {
                self.images
                    .insert(url.to_string(), ImageState::Failed(err.to_string()));
                Err(SlidereelError::asset(format!(
                    "failed to decode '{url}': {err}"
                )))
            }
        }
    }

    /// Record a failed fetch; rendering continues without the visual.
    pub fn fail_load(&mut self, url: &str, reason: impl Into<String>) {
        self.images
            .insert(url.to_string(), ImageState::Failed(reason.into()));
    }

    /// The decoded image, only once ready.
    pub fn image(&self, url: &str) -> Option<&PreparedImage> {
        match self.images.get(url) {
            Some(ImageState::Ready(img)) => Some(img),
            _ => None,
        }
    }

    pub fn load_error(&self, url: &str) -> Option<&str> {
        match self.images.get(url) {
            Some(ImageState::Failed(reason)) => Some(reason),
            _ => None,
        }
    }

    /// Register font bytes under a family name (case-insensitive lookup).
    pub fn register_font(&mut self, family: impl Into<String>, bytes: Vec<u8>) {
        self.fonts
            .insert(family.into().to_lowercase(), Arc::new(bytes));
    }

    /// Load every `ttf`/`otf`/`ttc` file in `dir`, registering each under
    /// its file stem. Unreadable files are skipped.
    pub fn load_fonts_dir(&mut self, dir: &Path) -> SlidereelResult<usize> {
        let rd = std::fs::read_dir(dir)
            .with_context(|| format!("read fonts dir '{}'", dir.display()))?;

        let mut count = 0usize;
        for entry in rd.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            if !matches!(ext.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(bytes) = std::fs::read(&path) {
                self.register_font(stem, bytes);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Font bytes for `family`, falling back to the first registered family
    /// when the requested one is unknown. `None` only when no fonts are
    /// registered at all.
    pub fn font_bytes(&self, family: &str) -> Option<(&str, &Arc<Vec<u8>>)> {
        let key = family.to_lowercase();
        if let Some((name, bytes)) = self.fonts.get_key_value(&key) {
            return Some((name.as_str(), bytes));
        }
        self.fonts
            .iter()
            .next()
            .map(|(name, bytes)| (name.as_str(), bytes))
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }
}

/// RGBA8 brush color used by Parley text layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextBrushRgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Stateful helper for building Parley text layouts from raw font bytes.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Styling inputs for one shaped layout.
#[derive(Clone, Copy, Debug)]
pub struct TextLayoutParams<'a> {
    pub text: &'a str,
    pub font_bytes: &'a [u8],
    pub size_px: f32,
    pub weight: u16,
    pub italic: bool,
    pub brush: TextBrushRgba8,
    pub align: parley::Alignment,
    pub max_width_px: Option<f32>,
}

impl TextLayoutEngine {
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out plain text with the provided font bytes and styling.
    pub fn layout(
        &mut self,
        params: TextLayoutParams<'_>,
    ) -> SlidereelResult<parley::Layout<TextBrushRgba8>> {
        if !params.size_px.is_finite() || params.size_px <= 0.0 {
            return Err(SlidereelError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let families = self.font_ctx.collection.register_fonts(
            parley::fontique::Blob::from(params.font_bytes.to_vec()),
            None,
        );
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            SlidereelError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| SlidereelError::validation("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, params.text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(params.size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(f32::from(params.weight)),
        ));
        if params.italic {
            builder.push_default(parley::style::StyleProperty::FontStyle(
                parley::style::FontStyle::Italic,
            ));
        }
        builder.push_default(parley::style::StyleProperty::Brush(params.brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(params.text);
        layout.break_all_lines(params.max_width_px);
        layout.align(
            params.max_width_px,
            params.align,
            parley::AlignmentOptions::default(),
        );

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn decode_image_png_dimensions_and_premul() {
        let prepared = decode_image(&png_bytes([100, 50, 200, 128])).unwrap();
        assert_eq!(prepared.width, 1);
        assert_eq!(prepared.height, 1);
        assert_eq!(
            prepared.rgba8_premul.as_slice(),
            &[
                ((100u16 * 128 + 127) / 255) as u8,
                ((50u16 * 128 + 127) / 255) as u8,
                ((200u16 * 128 + 127) / 255) as u8,
                128u8
            ]
        );
    }

    #[test]
    fn load_lifecycle_loading_then_ready() {
        let mut store = AssetStore::new();
        assert!(store.begin_load("bg.png"));
        // Already loading: no second fetch.
        assert!(!store.begin_load("bg.png"));
        assert!(store.image("bg.png").is_none());

        let redraw = store.complete_load("bg.png", &png_bytes([1, 2, 3, 255])).unwrap();
        assert!(redraw);
        assert!(store.image("bg.png").is_some());
        assert!(!store.begin_load("bg.png"));
    }

    #[test]
    fn failed_decode_is_recorded_and_retriable() {
        let mut store = AssetStore::new();
        store.begin_load("broken.png");
        assert!(store.complete_load("broken.png", b"not an image").is_err());
        assert!(store.image("broken.png").is_none());
        assert!(store.load_error("broken.png").is_some());
        // A retry starts a fresh fetch.
        assert!(store.begin_load("broken.png"));
    }

    #[test]
    fn fail_load_keeps_rendering_possible() {
        let mut store = AssetStore::new();
        store.begin_load("gone.jpg");
        store.fail_load("gone.jpg", "404");
        assert!(store.image("gone.jpg").is_none());
        assert_eq!(store.load_error("gone.jpg"), Some("404"));
    }

    #[test]
    fn font_lookup_is_case_insensitive_with_fallback() {
        let mut store = AssetStore::new();
        assert!(store.font_bytes("Georgia").is_none());

        store.register_font("Georgia", vec![1, 2, 3]);
        store.register_font("Playfair Display", vec![4, 5]);

        let (name, bytes) = store.font_bytes("georgia").unwrap();
        assert_eq!(name, "georgia");
        assert_eq!(bytes.as_slice(), &[1, 2, 3]);

        // Unknown family falls back to the first registered (BTreeMap order).
        let (fallback, _) = store.font_bytes("Unknown Sans").unwrap();
        assert_eq!(fallback, "georgia");
    }
}
