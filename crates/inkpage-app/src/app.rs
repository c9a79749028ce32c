//! Headless application: replays a scripted annotation session against a
//! tiled page viewer and writes the result as a PNG.

use crate::overlay::draw_annotations;
use image::RgbaImage;
use inkpage_core::{
    AnnotationCanvas, AnnotationError, ClickOutcome, ConfigError, EditorState, ToolMode,
    ViewState, ViewerConfig,
};
use inkpage_render::{CycleReport, ProceduralDocument, RenderError, TileViewer};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid config: {0}")]
    Invalid(String),
    #[error("Annotation error: {0}")]
    Annotation(#[from] AnnotationError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("PNG encoding failed: {0}")]
    Png(String),
    #[error("Overlay failed: {0}")]
    Overlay(String),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// One step of a scripted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptAction {
    /// Select a tool, or clear it with `null`.
    Tool { tool: Option<ToolMode> },
    /// Click at a display-space point on the page.
    Click { x: f64, y: f64 },
    /// Release the pointer away from the page, dropping a half-drawn segment.
    Release,
    /// Fill the most recently spawned text box and stop editing it.
    Type { text: String },
    /// Drag the most recently spawned text box by a display-space offset.
    DragText { dx: f64, dy: f64 },
    /// Request a page change.
    Page { page: usize },
    /// Request a scale change.
    Zoom { scale: f64 },
    /// Request a pan offset change.
    Pan { x: f64, y: f64 },
    /// Advance the clock.
    Wait { ms: u64 },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub viewer: ViewerConfig,
    pub screen_width: f64,
    pub screen_height: f64,
    pub page_width: f64,
    pub page_height: f64,
    pub page_count: usize,
    /// Page shown before the script runs.
    pub initial_page: usize,
    pub output: PathBuf,
    pub script: Vec<ScriptAction>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            viewer: ViewerConfig::default(),
            screen_width: 1280.0,
            screen_height: 800.0,
            page_width: 612.0,
            page_height: 792.0,
            page_count: 3,
            initial_page: 1,
            output: PathBuf::from("inkpage.png"),
            script: demo_script(),
        }
    }
}

impl AppConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> AppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> AppResult<()> {
        self.viewer.validate()?;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.screen_width) || !positive(self.screen_height) {
            return Err(AppError::Invalid(format!(
                "screen size {}x{}",
                self.screen_width, self.screen_height
            )));
        }
        if !positive(self.page_width) || !positive(self.page_height) {
            return Err(AppError::Invalid(format!(
                "page size {}x{}",
                self.page_width, self.page_height
            )));
        }
        if self.page_count == 0 {
            return Err(AppError::Invalid("page_count must be at least 1".to_string()));
        }
        if self.initial_page == 0 || self.initial_page > self.page_count {
            return Err(AppError::Invalid(format!(
                "initial_page {} outside 1..={}",
                self.initial_page, self.page_count
            )));
        }
        Ok(())
    }
}

/// A closed triangle, a stray segment, a note and a zoom.
fn demo_script() -> Vec<ScriptAction> {
    use ScriptAction::*;
    vec![
        Tool { tool: Some(ToolMode::Line) },
        Click { x: 100.0, y: 100.0 },
        Click { x: 300.0, y: 100.0 },
        // Lands within the magnet radius of (300, 100).
        Click { x: 306.0, y: 104.0 },
        Click { x: 200.0, y: 260.0 },
        Click { x: 196.0, y: 258.0 },
        Click { x: 103.0, y: 96.0 },
        Click { x: 400.0, y: 500.0 },
        Click { x: 520.0, y: 560.0 },
        Tool { tool: Some(ToolMode::Text) },
        Click { x: 380.0, y: 150.0 },
        Type {
            text: "Check this area".to_string(),
        },
        DragText { dx: 20.0, dy: 10.0 },
        Wait { ms: 50 },
        Zoom { scale: 1.5 },
        Pan { x: 100.0, y: 50.0 },
        Wait { ms: 150 },
    ]
}

/// What a run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub cycles: usize,
    pub tiles_composited: usize,
    pub tiles_failed: usize,
    pub lines: usize,
    pub groups: usize,
    pub text_boxes: usize,
    pub view: ViewState,
}

impl RunSummary {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.tiles_composited += report.composited;
        self.tiles_failed += report.failed;
    }
}

/// The headless application.
pub struct App {
    config: AppConfig,
    viewer: TileViewer,
    canvas: AnnotationCanvas,
    editor: EditorState,
    clock: Instant,
    last_text: Option<Uuid>,
    summary: RunSummary,
}

impl App {
    /// Create the application from a validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let document = Arc::new(ProceduralDocument::new(
            config.page_count,
            Size::new(config.page_width, config.page_height),
        ));
        let initial = ViewState::new(config.initial_page, 1.0, Point::ZERO);
        let screen = Size::new(config.screen_width, config.screen_height);
        let viewer = TileViewer::new(document, &config.viewer, initial, screen);

        Ok(Self {
            canvas: AnnotationCanvas::with_magnet(config.viewer.magnet()),
            viewer,
            editor: EditorState::new(),
            clock: Instant::now(),
            last_text: None,
            summary: RunSummary::default(),
            config,
        })
    }

    /// Replay the script, then write the composited page to the output path.
    pub async fn run(self) -> AppResult<RunSummary> {
        let output = self.config.output.clone();
        let (summary, image) = self.render().await?;
        let png_data = encode_png(image.as_raw(), image.width(), image.height())?;
        std::fs::write(&output, &png_data)?;
        log::info!(
            "Wrote {} ({}x{}, {} bytes)",
            output.display(),
            image.width(),
            image.height(),
            png_data.len()
        );
        Ok(summary)
    }

    /// Replay the script and return the page with annotations drawn on it.
    pub async fn render(mut self) -> AppResult<(RunSummary, RgbaImage)> {
        self.pump().await?;
        let script = std::mem::take(&mut self.config.script);
        for action in &script {
            self.apply(action)?;
            self.pump().await?;
        }
        self.settle().await?;

        let view = self.viewer.view();
        let mut image = {
            let surface = self
                .viewer
                .surface()
                .lock()
                .map_err(|e| RenderError::Surface(format!("Lock error: {}", e)))?;
            surface.image().clone()
        };
        draw_annotations(&mut image, &self.canvas, view.scale)?;

        self.summary.lines = self.canvas.lines().len();
        self.summary.groups = self.canvas.groups().len();
        self.summary.text_boxes = self.canvas.text_boxes().len();
        self.summary.view = view;
        log::info!(
            "Session done: {} lines in {} groups, {} text boxes, {} render cycles",
            self.summary.lines,
            self.summary.groups,
            self.summary.text_boxes,
            self.summary.cycles
        );
        Ok((self.summary, image))
    }

    fn apply(&mut self, action: &ScriptAction) -> AppResult<()> {
        let scale = self.viewer.view().scale;
        match action {
            ScriptAction::Tool { tool } => match tool {
                Some(tool) => self.editor.select_tool(*tool),
                None => self.editor.clear_tool(),
            },
            ScriptAction::Click { x, y } => {
                if self.editor.loading {
                    log::debug!("Ignoring click while loading");
                    return Ok(());
                }
                match self.canvas.click(Point::new(*x, *y), &mut self.editor, scale)? {
                    ClickOutcome::Committed { index, segment } => {
                        log::debug!("Committed line {}: {:?} -> {:?}", index, segment.a, segment.b);
                    }
                    ClickOutcome::TextBoxSpawned(id) => self.last_text = Some(id),
                    ClickOutcome::FirstPoint(_) | ClickOutcome::Ignored => {}
                }
            }
            ScriptAction::Release => {
                self.canvas.cancel_pending();
            }
            ScriptAction::Type { text } => {
                if let Some(id) = self.last_text {
                    self.canvas.set_text(id, text.clone())?;
                    self.canvas.finish_editing(id)?;
                }
            }
            ScriptAction::DragText { dx, dy } => {
                if let Some(id) = self.last_text {
                    if self.editor.annotations_interactive() {
                        self.canvas.move_text_box(id, Vec2::new(*dx, *dy) / scale)?;
                    }
                }
            }
            ScriptAction::Page { page } => self.viewer.set_page(*page, self.clock),
            ScriptAction::Zoom { scale } => self.viewer.set_scale(*scale, self.clock),
            ScriptAction::Pan { x, y } => self.viewer.set_pan(Point::new(*x, *y), self.clock),
            ScriptAction::Wait { ms } => self.clock += Duration::from_millis(*ms),
        }
        Ok(())
    }

    /// Begin and finish a render cycle if the view has settled on a change.
    ///
    /// A page that fails to load is skipped: the previous page and its
    /// annotations stay in place.
    async fn pump(&mut self) -> AppResult<()> {
        let shown = self.viewer.view().page;
        self.editor.begin_loading();
        let cycle = self.viewer.tick(self.clock).await;
        self.editor.finish_loading();

        let cycle = match cycle {
            Ok(cycle) => cycle,
            Err(e @ (RenderError::PageLoad(_) | RenderError::PageOutOfRange(_))) => {
                log::warn!("Staying on page {}: {}", shown, e);
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if self.viewer.view().page != shown {
            self.canvas.reset();
            self.last_text = None;
        }
        if let Some(cycle) = cycle {
            let report = cycle.run().await;
            log::debug!("{:?}", report);
            self.summary.record(&report);
        }
        Ok(())
    }

    /// Advance the clock until every pending input has been rendered.
    async fn settle(&mut self) -> AppResult<()> {
        while let Some(deadline) = self.viewer.next_deadline() {
            self.clock = self.clock.max(deadline);
            self.pump().await?;
        }
        Ok(())
    }
}

/// Encode RGBA pixel data to PNG bytes.
pub fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> AppResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder
            .write_header()
            .map_err(|e| AppError::Png(format!("header: {}", e)))?;
        writer
            .write_image_data(rgba_data)
            .map_err(|e| AppError::Png(format!("data: {}", e)))?;
    }
    Ok(png_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(script: Vec<ScriptAction>) -> AppConfig {
        AppConfig {
            screen_width: 100.0,
            screen_height: 100.0,
            page_width: 200.0,
            page_height: 200.0,
            page_count: 2,
            script,
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_script() {
        let json = r#"{
            "page_count": 5,
            "viewer": { "debounce_ms": 20 },
            "script": [
                { "action": "tool", "tool": "line" },
                { "action": "click", "x": 1.0, "y": 2.0 },
                { "action": "tool", "tool": null },
                { "action": "release" },
                { "action": "wait", "ms": 30 }
            ]
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.page_count, 5);
        assert_eq!(config.viewer.debounce_ms, 20);
        assert_eq!(config.viewer.magnet_radius, 20.0);
        assert_eq!(config.script, vec![
            ScriptAction::Tool { tool: Some(ToolMode::Line) },
            ScriptAction::Click { x: 1.0, y: 2.0 },
            ScriptAction::Tool { tool: None },
            ScriptAction::Release,
            ScriptAction::Wait { ms: 30 },
        ]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AppConfig {
            initial_page: 4,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Invalid(_))));

        let mut config = AppConfig::default();
        config.viewer.cache_capacity = 0;
        assert!(matches!(App::new(config), Err(AppError::Config(ConfigError::CacheCapacity))));
    }

    #[test]
    fn test_demo_script_session() {
        let app = App::new(small_config(demo_script())).unwrap();
        let (summary, image) = pollster::block_on(app.render()).unwrap();

        assert_eq!(summary.lines, 4);
        assert_eq!(summary.groups, 2);
        assert_eq!(summary.text_boxes, 1);
        assert!((summary.view.scale - 1.5).abs() < f64::EPSILON);
        assert_eq!(summary.view.pan, Point::new(100.0, 50.0));
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.tiles_failed, 0);
        assert_eq!(image.dimensions(), (300, 300));
    }

    #[test]
    fn test_page_change_resets_annotations() {
        let script = vec![
            ScriptAction::Tool { tool: Some(ToolMode::Line) },
            ScriptAction::Click { x: 10.0, y: 10.0 },
            ScriptAction::Click { x: 50.0, y: 10.0 },
            ScriptAction::Page { page: 2 },
            ScriptAction::Wait { ms: 100 },
        ];
        let app = App::new(small_config(script)).unwrap();
        let (summary, _) = pollster::block_on(app.render()).unwrap();
        assert_eq!(summary.lines, 0);
        assert_eq!(summary.view.page, 2);
    }

    #[test]
    fn test_failed_page_change_keeps_annotations() {
        let script = vec![
            ScriptAction::Tool { tool: Some(ToolMode::Line) },
            ScriptAction::Click { x: 10.0, y: 10.0 },
            ScriptAction::Click { x: 50.0, y: 10.0 },
            ScriptAction::Page { page: 9 },
            ScriptAction::Wait { ms: 100 },
        ];
        let app = App::new(small_config(script)).unwrap();
        let (summary, image) = pollster::block_on(app.render()).unwrap();
        assert_eq!(summary.view.page, 1);
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.cycles, 1);
        assert_eq!(image.dimensions(), (200, 200));
    }

    #[test]
    fn test_encode_png_signature() {
        let data = encode_png(&[0u8; 2 * 2 * 4], 2, 2).unwrap();
        assert_eq!(&data[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(encode_png(&[0u8; 3], 2, 2).is_err());
    }
}
