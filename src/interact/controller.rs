//! Pointer-driven editing of the template.
//!
//! All positions and sizes are stored as percentages of the canvas, so the
//! on-screen zoom/pan of the editor viewport never leaks into the model:
//! pixel deltas are divided by the zoomed container dimension before they
//! touch an element. The host (which owns the DOM/event layer) reports which
//! element or resize handle a pointer-down landed on; this controller owns
//! selection, drag state, and the resulting model mutations.

use crate::{
    composition::model::{ObjectId, Template},
    foundation::error::{SlidereelError, SlidereelResult},
};

/// Safety margin: an element's center cannot be dragged closer than this to
/// the canvas edge, so it can always be grabbed again.
pub const DRAG_MARGIN_PCT: f64 = 2.5;

/// Minimum shape size; prevents resizing into a degenerate zero-size shape.
pub const MIN_SHAPE_SIZE_PCT: f64 = 5.0;

/// The on-screen canvas viewport: rendered size in CSS pixels plus the
/// current zoom factor of the editor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width_px: f64,
    pub height_px: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(width_px: f64, height_px: f64, zoom: f64) -> Self {
        Self {
            width_px,
            height_px,
            zoom,
        }
    }

    /// Horizontal pixel delta to percent-of-canvas, zoom compensated.
    pub fn dx_to_pct(&self, dx_px: f64) -> f64 {
        dx_px / (self.width_px * self.zoom) * 100.0
    }

    /// Vertical pixel delta to percent-of-canvas, zoom compensated.
    pub fn dy_to_pct(&self, dy_px: f64) -> f64 {
        dy_px / (self.height_px * self.zoom) * 100.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Sign of the width/height change for a positive pointer delta.
    fn signs(self) -> (f64, f64) {
        match self {
            Self::TopLeft => (-1.0, -1.0),
            Self::TopRight => (1.0, -1.0),
            Self::BottomLeft => (-1.0, 1.0),
            Self::BottomRight => (1.0, 1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum DragState {
    Idle,
    Move {
        id: ObjectId,
        last_px: (f64, f64),
        moved: bool,
    },
    Resize {
        id: ObjectId,
        corner: Corner,
        last_px: (f64, f64),
        moved: bool,
    },
}

/// Selection and drag/resize state for the canvas editor.
#[derive(Clone, Debug)]
pub struct InteractionController {
    selection: Option<ObjectId>,
    drag: DragState,
    dirty: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self {
            selection: None,
            drag: DragState::Idle,
            dirty: false,
        }
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn is_dragging(&self) -> bool {
        !matches!(self.drag, DragState::Idle)
    }

    /// Pointer-down on an element body: select it (sole selection) and arm a
    /// drag-move.
    pub fn press_element(
        &mut self,
        template: &Template,
        id: ObjectId,
        pos_px: (f64, f64),
    ) -> SlidereelResult<()> {
        if template.element(id).is_none() {
            return Err(SlidereelError::validation(format!("unknown element {id}")));
        }
        self.selection = Some(id);
        self.drag = DragState::Move {
            id,
            last_px: pos_px,
            moved: false,
        };
        Ok(())
    }

    /// Pointer-down on a corner resize handle. Only shapes have handles.
    pub fn press_handle(
        &mut self,
        template: &Template,
        id: ObjectId,
        corner: Corner,
        pos_px: (f64, f64),
    ) -> SlidereelResult<()> {
        let element = template
            .element(id)
            .ok_or_else(|| SlidereelError::validation(format!("unknown element {id}")))?;
        if element.kind.shape().is_none() {
            return Err(SlidereelError::validation(
                "only shapes have resize handles",
            ));
        }
        self.selection = Some(id);
        self.drag = DragState::Resize {
            id,
            corner,
            last_px: pos_px,
            moved: false,
        };
        Ok(())
    }

    /// Pointer-down on empty canvas clears the selection.
    pub fn press_canvas(&mut self) {
        self.selection = None;
        self.drag = DragState::Idle;
    }

    /// Pointer-move while dragging: mutate the model live so the canvas
    /// tracks the pointer. No-op when nothing is armed.
    pub fn drag_to(
        &mut self,
        template: &mut Template,
        viewport: Viewport,
        pos_px: (f64, f64),
    ) -> SlidereelResult<()> {
        match &mut self.drag {
            DragState::Idle => Ok(()),
            DragState::Move {
                id,
                last_px,
                moved,
            } => {
                let dx = viewport.dx_to_pct(pos_px.0 - last_px.0);
                let dy = viewport.dy_to_pct(pos_px.1 - last_px.1);
                *last_px = pos_px;

                let element = template
                    .element_mut(*id)
                    .ok_or_else(|| SlidereelError::validation(format!("unknown element {id}")))?;
                element.x_pct =
                    (element.x_pct + dx).clamp(DRAG_MARGIN_PCT, 100.0 - DRAG_MARGIN_PCT);
                element.y_pct =
                    (element.y_pct + dy).clamp(DRAG_MARGIN_PCT, 100.0 - DRAG_MARGIN_PCT);
                *moved = true;
                Ok(())
            }
            DragState::Resize {
                id,
                corner,
                last_px,
                moved,
            } => {
                let dx = viewport.dx_to_pct(pos_px.0 - last_px.0);
                let dy = viewport.dy_to_pct(pos_px.1 - last_px.1);
                *last_px = pos_px;
                let (sx, sy) = corner.signs();

                let element = template
                    .element_mut(*id)
                    .ok_or_else(|| SlidereelError::validation(format!("unknown element {id}")))?;
                let shape = element.kind.shape_mut().ok_or_else(|| {
                    SlidereelError::validation("resize target is not a shape")
                })?;
                shape.width_pct = (shape.width_pct + dx * sx).max(MIN_SHAPE_SIZE_PCT);
                shape.height_pct = (shape.height_pct + dy * sy).max(MIN_SHAPE_SIZE_PCT);
                *moved = true;
                Ok(())
            }
        }
    }

    /// Pointer-up: the live mutation becomes durable. Returns whether a
    /// mutation happened during this drag (the project is now dirty).
    pub fn release(&mut self) -> bool {
        let mutated = match self.drag {
            DragState::Idle => false,
            DragState::Move { moved, .. } | DragState::Resize { moved, .. } => moved,
        };
        self.drag = DragState::Idle;
        if mutated {
            self.dirty = true;
        }
        mutated
    }

    /// Consume the dirty flag (the host marks the project unsaved).
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
