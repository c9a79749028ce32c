//! inkpage Application
//!
//! Headless driver wiring the annotation canvas and the tiled page viewer
//! together: loads configuration, replays a scripted session and exports the
//! composited page.

mod app;
pub mod overlay;

pub use app::{App, AppConfig, AppError, AppResult, RunSummary, ScriptAction, encode_png};
