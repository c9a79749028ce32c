//! inkpage Core Library
//!
//! Platform-agnostic annotation logic: segment geometry, connectivity
//! grouping, endpoint snapping, tool state and the debounced view state that
//! drives tiled page rendering.

pub mod canvas;
pub mod config;
pub mod geometry;
pub mod grouping;
pub mod snap;
pub mod tools;
pub mod view;

pub use canvas::{
    AnnotationCanvas, AnnotationError, AnnotationResult, ClickOutcome, GroupBox, PreviewLine,
    TextBox,
};
pub use config::{ConfigError, ViewerConfig};
pub use geometry::{Segment, bounds_of, descale_point, scale_point, scale_segments};
pub use grouping::{GroupId, Grouping, LineGroup, connected_components};
pub use snap::{DEFAULT_MAGNET_RADIUS, Magnet, SnapResult, SnapStrategy};
pub use tools::{EditorState, ToolMode};
pub use view::{Debouncer, ViewDebouncer, ViewState};
