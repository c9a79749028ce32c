//! Annotation canvas for a single page.
//!
//! Holds the committed line segments, the pending first endpoint of a
//! segment being drawn, the derived line groups and free-text boxes.
//! Segment coordinates are stored in model space; clicks and previews arrive
//! in display space at the current page scale.

use crate::geometry::{Segment, descale_point, is_finite_point, scale_rect, scale_segments};
use crate::grouping::{GroupId, Grouping, LineGroup};
use crate::snap::{Magnet, SnapResult};
use crate::tools::{EditorState, ToolMode};
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Padding drawn around a group's bounding box when outlining it.
pub const GROUP_OUTLINE_PADDING: f64 = 8.0;

/// Annotation errors.
#[derive(Debug, Error, PartialEq)]
pub enum AnnotationError {
    #[error("Non-finite coordinate: ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },
    #[error("Invalid scale: {0}")]
    InvalidScale(f64),
    #[error("Text box not found: {0}")]
    TextBoxNotFound(Uuid),
}

/// Result type for annotation operations.
pub type AnnotationResult<T> = Result<T, AnnotationError>;

/// A free-text annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBox {
    pub id: Uuid,
    /// Top-left corner in model space.
    pub position: Point,
    pub content: String,
    /// Still accepting input.
    pub editing: bool,
}

/// What a click on the canvas did.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// No tool was active.
    Ignored,
    /// The first endpoint of a new segment was placed (display space).
    FirstPoint(Point),
    /// A segment was committed.
    Committed { index: usize, segment: Segment },
    /// A text box was created and the tool was released.
    TextBoxSpawned(Uuid),
}

/// Rubber-band preview from the pending endpoint to the pointer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLine {
    /// Pending first endpoint (display space).
    pub start: Point,
    /// Pointer position after snapping (display space).
    pub end: Point,
    /// Whether `end` attached to an existing endpoint.
    pub snapped: bool,
}

/// Display box for one line group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupBox {
    pub id: GroupId,
    /// Bounding box in display space.
    pub rect: Rect,
    /// Contains the most recently committed segment.
    pub is_newest: bool,
}

impl GroupBox {
    /// The bounding box grown by `padding` on every side.
    pub fn outline(&self, padding: f64) -> Rect {
        self.rect.inflate(padding, padding)
    }
}

/// Annotation state for one page.
#[derive(Debug, Clone, Default)]
pub struct AnnotationCanvas {
    lines: Vec<Segment>,
    /// First endpoint of the segment being drawn (display space).
    pending: Option<Point>,
    last_added: Option<usize>,
    grouping: Grouping,
    text_boxes: Vec<TextBox>,
    magnet: Magnet,
}

impl AnnotationCanvas {
    /// Create an empty canvas with the default magnet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty canvas with a custom magnet.
    pub fn with_magnet(magnet: Magnet) -> Self {
        Self {
            magnet,
            ..Self::default()
        }
    }

    /// Committed segments in model space, in commit order.
    pub fn lines(&self) -> &[Segment] {
        &self.lines
    }

    /// Pending first endpoint, if a segment is being drawn.
    pub fn pending(&self) -> Option<Point> {
        self.pending
    }

    /// Index of the most recently committed segment.
    pub fn last_added(&self) -> Option<usize> {
        self.last_added
    }

    /// Current line groups.
    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    /// Current line groups as a slice.
    pub fn groups(&self) -> &[LineGroup] {
        self.grouping.groups()
    }

    /// The group holding the most recently committed segment.
    pub fn newest_group(&self) -> Option<GroupId> {
        self.grouping.newest()
    }

    /// Snap settings.
    pub fn magnet(&self) -> Magnet {
        self.magnet
    }

    /// Change the snap settings.
    pub fn set_magnet(&mut self, magnet: Magnet) {
        self.magnet = magnet;
    }

    /// Handle a click at `point` (display space) with the active tool.
    pub fn click(
        &mut self,
        point: Point,
        editor: &mut EditorState,
        scale: f64,
    ) -> AnnotationResult<ClickOutcome> {
        check_scale(scale)?;
        check_point(point)?;

        match editor.tool {
            None => Ok(ClickOutcome::Ignored),
            Some(ToolMode::Text) => {
                let id = self.spawn_text_box(descale_point(point, scale))?;
                editor.clear_tool();
                Ok(ClickOutcome::TextBoxSpawned(id))
            }
            Some(ToolMode::Line) => {
                let snapped = self.snap_display(point, scale).point;
                match self.pending {
                    None => {
                        self.pending = Some(snapped);
                        Ok(ClickOutcome::FirstPoint(snapped))
                    }
                    Some(start) => {
                        let a = descale_point(start, scale);
                        let b = descale_point(snapped, scale);
                        // A rejected segment keeps the first endpoint pending.
                        let index = self.commit_segment(a, b)?;
                        self.pending = None;
                        Ok(ClickOutcome::Committed {
                            index,
                            segment: Segment::new(a, b),
                        })
                    }
                }
            }
        }
    }

    /// Preview the segment that a click at `pointer` would commit.
    ///
    /// Does not change any state.
    pub fn preview(&self, pointer: Point, scale: f64) -> Option<PreviewLine> {
        let start = self.pending?;
        if check_scale(scale).is_err() || !is_finite_point(pointer) {
            return None;
        }
        let result = self.snap_display(pointer, scale);
        Some(PreviewLine {
            start,
            end: result.point,
            snapped: result.snapped,
        })
    }

    /// Drop the pending first endpoint.
    pub fn cancel_pending(&mut self) -> Option<Point> {
        self.pending.take()
    }

    /// Append a segment (model space) and regroup.
    ///
    /// Non-finite coordinates are rejected before anything changes.
    pub fn commit_segment(&mut self, a: Point, b: Point) -> AnnotationResult<usize> {
        check_point(a)?;
        check_point(b)?;

        let index = self.lines.len();
        self.lines.push(Segment::new(a, b));
        self.last_added = Some(index);
        self.regroup();
        Ok(index)
    }

    /// Group boxes in display space for outlining.
    pub fn group_boxes(&self, scale: f64) -> Vec<GroupBox> {
        let newest = self.grouping.newest();
        self.grouping
            .groups()
            .iter()
            .map(|group| GroupBox {
                id: group.id,
                rect: scale_rect(group.bounds, scale),
                is_newest: Some(group.id) == newest,
            })
            .collect()
    }

    /// Create an empty text box at `position` (model space) in editing mode.
    pub fn spawn_text_box(&mut self, position: Point) -> AnnotationResult<Uuid> {
        check_point(position)?;
        let id = Uuid::new_v4();
        self.text_boxes.push(TextBox {
            id,
            position,
            content: String::new(),
            editing: true,
        });
        Ok(id)
    }

    /// All text boxes in creation order.
    pub fn text_boxes(&self) -> &[TextBox] {
        &self.text_boxes
    }

    /// Replace the content of a text box.
    pub fn set_text(&mut self, id: Uuid, content: impl Into<String>) -> AnnotationResult<()> {
        self.text_box_mut(id)?.content = content.into();
        Ok(())
    }

    /// Leave editing mode for a text box.
    pub fn finish_editing(&mut self, id: Uuid) -> AnnotationResult<()> {
        self.text_box_mut(id)?.editing = false;
        Ok(())
    }

    /// Drag a text box by `delta` (model space).
    pub fn move_text_box(&mut self, id: Uuid, delta: Vec2) -> AnnotationResult<Point> {
        let text_box = self.text_box_mut(id)?;
        let moved = text_box.position + delta;
        check_point(moved)?;
        text_box.position = moved;
        Ok(moved)
    }

    /// Remove a text box.
    pub fn remove_text_box(&mut self, id: Uuid) -> AnnotationResult<TextBox> {
        let position = self
            .text_boxes
            .iter()
            .position(|text_box| text_box.id == id)
            .ok_or(AnnotationError::TextBoxNotFound(id))?;
        Ok(self.text_boxes.remove(position))
    }

    /// Clear everything (used when the displayed page changes).
    pub fn reset(&mut self) {
        self.lines.clear();
        self.pending = None;
        self.last_added = None;
        self.grouping = Grouping::default();
        self.text_boxes.clear();
    }

    fn snap_display(&self, point: Point, scale: f64) -> SnapResult {
        let scaled = scale_segments(&self.lines, scale);
        self.magnet.snap(&scaled, point)
    }

    fn regroup(&mut self) {
        self.grouping = Grouping::compute(&self.lines, self.last_added);
    }

    fn text_box_mut(&mut self, id: Uuid) -> AnnotationResult<&mut TextBox> {
        self.text_boxes
            .iter_mut()
            .find(|text_box| text_box.id == id)
            .ok_or(AnnotationError::TextBoxNotFound(id))
    }
}

fn check_point(point: Point) -> AnnotationResult<()> {
    if is_finite_point(point) {
        Ok(())
    } else {
        Err(AnnotationError::NonFiniteCoordinate {
            x: point.x,
            y: point.y,
        })
    }
}

fn check_scale(scale: f64) -> AnnotationResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(AnnotationError::InvalidScale(scale))
    }
}
