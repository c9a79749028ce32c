//! Tool selection and editor-wide state.

use serde::{Deserialize, Serialize};

/// Available annotation tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolMode {
    /// Place a free-text box.
    Text,
    /// Draw connected line segments.
    Line,
}

impl ToolMode {
    /// Get display name for UI.
    pub fn display_name(self) -> &'static str {
        match self {
            ToolMode::Text => "Text",
            ToolMode::Line => "Line",
        }
    }

    /// Get all tools.
    pub fn all() -> &'static [ToolMode] {
        &[ToolMode::Text, ToolMode::Line]
    }
}

/// Editor state shared by the annotation and viewing call sites.
///
/// Passed explicitly to the operations that read or change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorState {
    /// Currently selected tool, if any.
    pub tool: Option<ToolMode>,
    /// Whether a document is being loaded.
    pub loading: bool,
}

impl EditorState {
    /// Create a new editor state with no tool selected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a tool, or deselect it if it is already active.
    pub fn toggle_tool(&mut self, tool: ToolMode) {
        self.tool = if self.tool == Some(tool) { None } else { Some(tool) };
    }

    /// Select a tool.
    pub fn select_tool(&mut self, tool: ToolMode) {
        self.tool = Some(tool);
    }

    /// Deselect the current tool.
    pub fn clear_tool(&mut self) {
        self.tool = None;
    }

    /// Check whether `tool` is the active tool.
    pub fn is_active(&self, tool: ToolMode) -> bool {
        self.tool == Some(tool)
    }

    /// Existing annotations can be picked up and moved only while no tool
    /// is active.
    pub fn annotations_interactive(&self) -> bool {
        self.tool.is_none()
    }

    /// Mark a document load as started.
    pub fn begin_loading(&mut self) {
        self.loading = true;
    }

    /// Mark a document load as finished (successfully or not).
    pub fn finish_loading(&mut self) {
        self.loading = false;
    }
}
