//! Debounced viewer: turns settled page, scale and pan inputs into render
//! cycles.

use crate::engine::{RenderCycle, RenderRequest, TileEngine};
use crate::renderer::{Document, RenderResult};
use crate::surface::{SharedSurface, Surface};
use inkpage_core::{ViewDebouncer, ViewState, ViewerConfig};
use kurbo::{Point, Size};
use std::sync::Arc;
use std::time::Instant;

/// Owns a document, a tile engine and the surface they draw into.
pub struct TileViewer {
    document: Arc<dyn Document>,
    engine: TileEngine,
    view: ViewDebouncer,
    screen: Size,
    surface: SharedSurface,
    needs_render: bool,
}

impl TileViewer {
    /// Create a viewer showing `initial`. The first [`TileViewer::tick`]
    /// renders it without waiting for the debounce delay.
    pub fn new(
        document: Arc<dyn Document>,
        config: &ViewerConfig,
        initial: ViewState,
        screen: Size,
    ) -> Self {
        Self {
            document,
            engine: TileEngine::new(config),
            view: ViewDebouncer::new(initial, config),
            screen,
            surface: Surface::shared(1, 1),
            needs_render: true,
        }
    }

    /// The authoritative view state.
    pub fn view(&self) -> ViewState {
        self.view.current()
    }

    pub fn engine(&self) -> &TileEngine {
        &self.engine
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    pub fn document(&self) -> &Arc<dyn Document> {
        &self.document
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    pub fn set_page(&mut self, page: usize, now: Instant) {
        self.view.set_page(page, now);
    }

    pub fn set_scale(&mut self, scale: f64, now: Instant) {
        self.view.set_scale(scale, now);
    }

    pub fn set_pan(&mut self, pan: Point, now: Instant) {
        self.view.set_pan(pan, now);
    }

    /// Change the screen size. The next tick re-renders with a new tile size.
    pub fn resize(&mut self, screen: Size) {
        if screen != self.screen {
            self.screen = screen;
            self.needs_render = true;
        }
    }

    /// When the next pending input settles.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.view.next_deadline()
    }

    /// Check that no input is waiting and nothing needs rendering.
    pub fn is_idle(&self) -> bool {
        self.view.is_settled() && !self.needs_render
    }

    /// Apply settled inputs and begin a cycle if the view changed.
    ///
    /// The settled state becomes current only once its page has loaded. On
    /// failure the previous view stays current and the settled inputs are
    /// dropped.
    pub async fn tick(&mut self, now: Instant) -> RenderResult<Option<RenderCycle>> {
        let candidate = self.view.take_settled(now);
        if candidate.is_none() && !self.needs_render {
            return Ok(None);
        }

        let view = candidate.unwrap_or_else(|| self.view.current());
        let request = RenderRequest::new(view, self.screen);
        let cycle = self
            .engine
            .render(self.document.as_ref(), &request, &self.surface)
            .await?;
        self.view.commit(view);
        self.needs_render = false;
        Ok(Some(cycle))
    }
}
