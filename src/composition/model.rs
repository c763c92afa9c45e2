use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    animation::preset::{AnimationSample, AnimationType, element_progress},
    foundation::core::{CanvasSize, Color},
    foundation::error::{SlidereelError, SlidereelResult},
};

/// Identifier for slides and elements.
///
/// Objects created in the builder carry a client-generated `Pending` token
/// until the first save, when the persistence endpoint assigns a durable
/// `Persisted` id. On the wire a pending id is the string `"new_<token>"`
/// and a persisted id is a plain integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    Pending(u64),
    Persisted(i64),
}

impl ObjectId {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(token) => write!(f, "new_{token}"),
            Self::Persisted(id) => write!(f, "{id}"),
        }
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Pending(token) => serializer.serialize_str(&format!("new_{token}")),
            Self::Persisted(id) => serializer.serialize_i64(*id),
        }
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(i64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(id) => Ok(Self::Persisted(id)),
            Repr::Str(s) => {
                if let Some(token) = s.strip_prefix("new_") {
                    token
                        .parse::<u64>()
                        .map(Self::Pending)
                        .map_err(|_| serde::de::Error::custom(format!("invalid pending id '{s}'")))
                } else {
                    s.parse::<i64>()
                        .map(Self::Persisted)
                        .map_err(|_| serde::de::Error::custom(format!("invalid object id '{s}'")))
                }
            }
        }
    }
}

/// Declarative slide-to-slide transition choice. Stored with the slide; the
/// compositor does not yet blend across slide boundaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    #[default]
    None,
    Fade,
    Slide,
    Zoom,
}

pub const DEFAULT_SLIDE_DURATION_MS: u64 = 3000;

/// One timed scene in the template sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub id: ObjectId,
    pub slide_order: u32,
    #[serde(default = "default_slide_duration")]
    pub duration_ms: u64,
    #[serde(default = "default_background_color")]
    pub background_color: Color,
    #[serde(default)]
    pub background_gradient: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub background_video: Option<String>,
    #[serde(default)]
    pub transition: TransitionType,
}

fn default_slide_duration() -> u64 {
    DEFAULT_SLIDE_DURATION_MS
}

fn default_background_color() -> Color {
    Color::WHITE
}

/// The single effective background source of a slide.
///
/// Priority: gradient over image/video over flat color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SlideBackground<'a> {
    Gradient(&'a str),
    Video(&'a str),
    Image(&'a str),
    Color(Color),
}

impl Slide {
    pub fn effective_background(&self) -> SlideBackground<'_> {
        if let Some(g) = self.background_gradient.as_deref() {
            return SlideBackground::Gradient(g);
        }
        if let Some(v) = self.background_video.as_deref() {
            return SlideBackground::Video(v);
        }
        if let Some(i) = self.background_image.as_deref() {
            return SlideBackground::Image(i);
        }
        SlideBackground::Color(self.background_color)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Styling for a text field bound to invitation data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Placeholder/sample content shown in the builder (e.g. the couple's
    /// names); substituted with order data when the final video is produced.
    pub text: String,
    pub font_family: String,
    pub font_size_pt: f64,
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub text_decoration: TextDecoration,
    pub text_align: TextAlign,
    pub font_color: Color,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Georgia".to_string(),
            font_size_pt: 24.0,
            font_weight: 400,
            font_style: FontStyle::Normal,
            text_decoration: TextDecoration::None,
            text_align: TextAlign::Center,
            font_color: Color::BLACK,
        }
    }
}

/// Size and paint shared by the decorative shape kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    /// Width as a percentage of the canvas width.
    pub width_pct: f64,
    /// Height as a percentage of the canvas height.
    pub height_pct: f64,
    pub fill: Color,
    #[serde(default)]
    pub stroke: Option<Color>,
    #[serde(default)]
    pub stroke_width_px: f64,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            width_pct: 20.0,
            height_pct: 10.0,
            fill: Color::opaque(0x4a, 0x90, 0xd9),
            stroke: None,
            stroke_width_px: 0.0,
        }
    }
}

/// Element variants. Shapes always paint below text fields regardless of
/// z-index interleaving between the two kinds; z-index orders elements
/// within each layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    Text {
        #[serde(flatten)]
        style: TextStyle,
    },
    Rectangle {
        #[serde(flatten)]
        shape: ShapeStyle,
        #[serde(default)]
        corner_radius_px: f64,
    },
    Ellipse {
        #[serde(flatten)]
        shape: ShapeStyle,
    },
    Line {
        #[serde(flatten)]
        shape: ShapeStyle,
    },
    Image {
        #[serde(flatten)]
        shape: ShapeStyle,
        src: String,
    },
}

impl ElementKind {
    pub fn shape(&self) -> Option<&ShapeStyle> {
        match self {
            Self::Text { .. } => None,
            Self::Rectangle { shape, .. }
            | Self::Ellipse { shape }
            | Self::Line { shape }
            | Self::Image { shape, .. } => Some(shape),
        }
    }

    pub fn shape_mut(&mut self) -> Option<&mut ShapeStyle> {
        match self {
            Self::Text { .. } => None,
            Self::Rectangle { shape, .. }
            | Self::Ellipse { shape }
            | Self::Line { shape }
            | Self::Image { shape, .. } => Some(shape),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }
}

/// Timing and curve selection for an element's entrance animation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationSpec {
    #[serde(default)]
    pub animation_type: AnimationType,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default = "default_animation_duration")]
    pub duration_ms: u64,
}

fn default_animation_duration() -> u64 {
    1000
}

impl Default for AnimationSpec {
    fn default() -> Self {
        Self {
            animation_type: AnimationType::default(),
            delay_ms: 0,
            duration_ms: default_animation_duration(),
        }
    }
}

impl AnimationSpec {
    /// Sample this animation at `slide_elapsed_ms` into the owning slide.
    pub fn sample_at(&self, slide_elapsed_ms: f64) -> AnimationSample {
        let t = element_progress(slide_elapsed_ms, self.delay_ms, self.duration_ms);
        self.animation_type.evaluate(t)
    }
}

pub const DETACHED_POSITION_PCT: f64 = 50.0;

/// A positioned, animatable object. `slide_id = None` means unplaced: the
/// element exists in the template's field palette but renders nowhere.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ObjectId,
    #[serde(default)]
    pub slide_id: Option<ObjectId>,
    /// Center X as a percentage of canvas width.
    pub x_pct: f64,
    /// Center Y as a percentage of canvas height.
    pub y_pct: f64,
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default)]
    pub rotation_deg: f64,
    #[serde(default)]
    pub animation: AnimationSpec,
    #[serde(default)]
    pub z_index: i32,
}

fn default_opacity() -> f64 {
    1.0
}

/// The timeline model for one video-invitation template: an ordered slide
/// sequence plus the elements attached to (or detached from) those slides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub canvas: CanvasSize,
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Template {
    /// A fresh template always starts with one default slide; the slide count
    /// never drops below one afterwards.
    pub fn new() -> Self {
        let mut t = Self {
            id: None,
            canvas: CanvasSize::default(),
            slides: Vec::new(),
            elements: Vec::new(),
        };
        t.add_slide();
        t
    }

    fn fresh_token(&self) -> u64 {
        let slide_max = self.slides.iter().filter_map(|s| match s.id {
            ObjectId::Pending(t) => Some(t),
            ObjectId::Persisted(_) => None,
        });
        let element_max = self.elements.iter().filter_map(|e| match e.id {
            ObjectId::Pending(t) => Some(t),
            ObjectId::Persisted(_) => None,
        });
        slide_max.chain(element_max).max().map_or(1, |t| t + 1)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.slides.iter().map(|s| s.duration_ms).sum()
    }

    pub fn slide(&self, id: ObjectId) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }

    pub fn element(&self, id: ObjectId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn element_mut(&mut self, id: ObjectId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Append a new slide with the default duration and a white background.
    pub fn add_slide(&mut self) -> &Slide {
        let slide = Slide {
            id: ObjectId::Pending(self.fresh_token()),
            slide_order: self.slides.len() as u32,
            duration_ms: DEFAULT_SLIDE_DURATION_MS,
            background_color: Color::WHITE,
            background_gradient: None,
            background_image: None,
            background_video: None,
            transition: TransitionType::None,
        };
        let idx = self.slides.len();
        self.slides.push(slide);
        &self.slides[idx]
    }

    /// Remove the slide at `index`. A template must always keep at least one
    /// slide, so removing the last remaining slide is rejected and nothing
    /// changes. Elements bound to the removed slide become unplaced.
    pub fn remove_slide(&mut self, index: usize) -> SlidereelResult<Slide> {
        if self.slides.len() <= 1 {
            return Err(SlidereelError::validation(
                "a template must keep at least one slide",
            ));
        }
        if index >= self.slides.len() {
            return Err(SlidereelError::validation(format!(
                "slide index {index} out of bounds"
            )));
        }

        let removed = self.slides.remove(index);
        for element in &mut self.elements {
            if element.slide_id == Some(removed.id) {
                element.slide_id = None;
                element.x_pct = DETACHED_POSITION_PCT;
                element.y_pct = DETACHED_POSITION_PCT;
            }
        }
        self.resequence_slides();
        Ok(removed)
    }

    /// Deep-copy the slide at `index` (its fields, not its bound elements)
    /// and append the copy at the end of the sequence under a new id.
    pub fn duplicate_slide(&mut self, index: usize) -> SlidereelResult<&Slide> {
        let source = self
            .slides
            .get(index)
            .ok_or_else(|| SlidereelError::validation(format!("slide index {index} out of bounds")))?;

        let mut copy = source.clone();
        copy.id = ObjectId::Pending(self.fresh_token());
        copy.slide_order = self.slides.len() as u32;
        let idx = self.slides.len();
        self.slides.push(copy);
        Ok(&self.slides[idx])
    }

    /// Reorder a slide from `from` to `to`, re-sequencing orders.
    pub fn move_slide(&mut self, from: usize, to: usize) -> SlidereelResult<()> {
        if from >= self.slides.len() || to >= self.slides.len() {
            return Err(SlidereelError::validation("slide index out of bounds"));
        }
        let slide = self.slides.remove(from);
        self.slides.insert(to, slide);
        self.resequence_slides();
        Ok(())
    }

    fn resequence_slides(&mut self) {
        for (i, slide) in self.slides.iter_mut().enumerate() {
            slide.slide_order = i as u32;
        }
    }

    /// Create a new unplaced element with defaults and return its id.
    pub fn add_element(&mut self, kind: ElementKind) -> ObjectId {
        let id = ObjectId::Pending(self.fresh_token());
        self.elements.push(Element {
            id,
            slide_id: None,
            x_pct: DETACHED_POSITION_PCT,
            y_pct: DETACHED_POSITION_PCT,
            kind,
            opacity: 1.0,
            rotation_deg: 0.0,
            animation: AnimationSpec::default(),
            z_index: 0,
        });
        id
    }

    pub fn remove_element(&mut self, id: ObjectId) -> SlidereelResult<Element> {
        let pos = self
            .elements
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| SlidereelError::validation(format!("unknown element {id}")))?;
        Ok(self.elements.remove(pos))
    }

    /// Place an element on a slide at the given percent position (used when
    /// a palette field is dropped onto the canvas).
    pub fn attach_element(
        &mut self,
        id: ObjectId,
        slide_id: ObjectId,
        x_pct: f64,
        y_pct: f64,
    ) -> SlidereelResult<()> {
        if self.slide(slide_id).is_none() {
            return Err(SlidereelError::validation(format!(
                "unknown slide {slide_id}"
            )));
        }
        let element = self
            .element_mut(id)
            .ok_or_else(|| SlidereelError::validation(format!("unknown element {id}")))?;
        element.slide_id = Some(slide_id);
        element.x_pct = x_pct;
        element.y_pct = y_pct;
        Ok(())
    }

    /// Unplace an element and reset its position to the canvas center.
    pub fn detach_element(&mut self, id: ObjectId) -> SlidereelResult<()> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| SlidereelError::validation(format!("unknown element {id}")))?;
        element.slide_id = None;
        element.x_pct = DETACHED_POSITION_PCT;
        element.y_pct = DETACHED_POSITION_PCT;
        Ok(())
    }

    /// Elements bound to `slide_id`, z-index ascending (paint order).
    pub fn elements_for_slide(&self, slide_id: ObjectId) -> Vec<&Element> {
        let mut out: Vec<&Element> = self
            .elements
            .iter()
            .filter(|e| e.slide_id == Some(slide_id))
            .collect();
        out.sort_by_key(|e| e.z_index);
        out
    }

    pub fn validate(&self) -> SlidereelResult<()> {
        if self.slides.is_empty() {
            return Err(SlidereelError::validation(
                "template must have at least one slide",
            ));
        }
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SlidereelError::validation(
                "canvas width/height must be > 0",
            ));
        }

        for (i, slide) in self.slides.iter().enumerate() {
            if slide.slide_order as usize != i {
                return Err(SlidereelError::validation(format!(
                    "slide {} has order {} at position {i}",
                    slide.id, slide.slide_order
                )));
            }
            if slide.duration_ms == 0 {
                return Err(SlidereelError::validation(format!(
                    "slide {} duration must be > 0",
                    slide.id
                )));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for slide in &self.slides {
            if !seen.insert(slide.id) {
                return Err(SlidereelError::validation(format!(
                    "duplicate slide id {}",
                    slide.id
                )));
            }
        }

        for element in &self.elements {
            if !seen.insert(element.id) {
                return Err(SlidereelError::validation(format!(
                    "duplicate element id {}",
                    element.id
                )));
            }
            if let Some(slide_id) = element.slide_id
                && self.slide(slide_id).is_none()
            {
                return Err(SlidereelError::validation(format!(
                    "element {} references missing slide {slide_id}",
                    element.id
                )));
            }
            if !element.x_pct.is_finite() || !element.y_pct.is_finite() {
                return Err(SlidereelError::validation(format!(
                    "element {} position must be finite",
                    element.id
                )));
            }
            if element.animation.duration_ms == 0 {
                return Err(SlidereelError::validation(format!(
                    "element {} animation duration must be > 0",
                    element.id
                )));
            }
            if let Some(shape) = element.kind.shape()
                && (shape.width_pct <= 0.0 || shape.height_pct <= 0.0)
            {
                return Err(SlidereelError::validation(format!(
                    "element {} size must be > 0",
                    element.id
                )));
            }
        }

        Ok(())
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}
