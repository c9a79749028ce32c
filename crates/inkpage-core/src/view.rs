//! View state for tiled page display, with input debouncing.
//!
//! Page, scale and pan offset change rapidly while the user drags or zooms.
//! Each input goes through its own [`Debouncer`]; only values that have
//! settled form the authoritative [`ViewState`] that drives rendering.

use crate::config::ViewerConfig;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Smallest accepted page scale (25%).
pub const MIN_SCALE: f64 = 0.25;

/// Largest accepted page scale (500%).
pub const MAX_SCALE: f64 = 5.0;

/// Default debounce delay for view inputs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// What to display: page, scale and pan offset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    /// 1-based page number.
    pub page: usize,
    /// Page scale (1.0 = 100%).
    pub scale: f64,
    /// Pan offset in scaled page pixels.
    pub pan: Point,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            page: 1,
            scale: 1.0,
            pan: Point::ZERO,
        }
    }
}

impl ViewState {
    /// Create a view state.
    pub fn new(page: usize, scale: f64, pan: Point) -> Self {
        Self { page, scale, pan }
    }
}

/// Clamp `scale` into `[min, max]`, mapping non-finite input to `min`.
pub fn clamp_scale(scale: f64, min: f64, max: f64) -> f64 {
    if scale.is_finite() { scale.clamp(min, max) } else { min }
}

/// Delays a value until no newer value has arrived for `delay`.
///
/// Time is passed in explicitly so callers decide which clock drives it.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Get the delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a new value, restarting the delay.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Take the latest value if it has been stable for the full delay.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = matches!(
            &self.pending,
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay
        );
        if ready {
            self.pending.take().map(|(value, _)| value)
        } else {
            None
        }
    }

    /// Check if a value is waiting to settle.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the waiting value will settle.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, at)| *at + self.delay)
    }

    /// Drop the waiting value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Debounces page, scale and pan independently into one [`ViewState`].
#[derive(Debug, Clone)]
pub struct ViewDebouncer {
    current: ViewState,
    page: Debouncer<usize>,
    scale: Debouncer<f64>,
    pan: Debouncer<Point>,
    min_scale: f64,
    max_scale: f64,
}

impl ViewDebouncer {
    /// Create a debouncer starting from `initial`.
    pub fn new(initial: ViewState, config: &ViewerConfig) -> Self {
        let delay = config.debounce();
        let mut current = initial;
        current.scale = clamp_scale(current.scale, config.min_scale, config.max_scale);
        Self {
            current,
            page: Debouncer::new(delay),
            scale: Debouncer::new(delay),
            pan: Debouncer::new(delay),
            min_scale: config.min_scale,
            max_scale: config.max_scale,
        }
    }

    /// The authoritative view state.
    pub fn current(&self) -> ViewState {
        self.current
    }

    /// Request a page change.
    pub fn set_page(&mut self, page: usize, now: Instant) {
        self.page.push(page, now);
    }

    /// Request a scale change; the value is clamped to the configured range.
    pub fn set_scale(&mut self, scale: f64, now: Instant) {
        self.scale.push(clamp_scale(scale, self.min_scale, self.max_scale), now);
    }

    /// Request a pan offset change.
    pub fn set_pan(&mut self, pan: Point, now: Instant) {
        if pan.x.is_finite() && pan.y.is_finite() {
            self.pan.push(pan, now);
        }
    }

    /// Apply any settled inputs.
    ///
    /// Returns the new view state when it differs from the current one.
    pub fn poll(&mut self, now: Instant) -> Option<ViewState> {
        let next = self.take_settled(now)?;
        self.commit(next);
        Some(next)
    }

    /// Consume settled inputs and return the state they would produce,
    /// without making it current.
    ///
    /// Returns `None` when the result equals the current state. Pass the
    /// state to [`ViewDebouncer::commit`] once it has been shown; dropping
    /// it discards the settled inputs.
    pub fn take_settled(&mut self, now: Instant) -> Option<ViewState> {
        let mut next = self.current;
        if let Some(page) = self.page.poll(now) {
            next.page = page;
        }
        if let Some(scale) = self.scale.poll(now) {
            next.scale = scale;
        }
        if let Some(pan) = self.pan.poll(now) {
            next.pan = pan;
        }

        if next == self.current { None } else { Some(next) }
    }

    /// Make `state` the authoritative view state.
    pub fn commit(&mut self, state: ViewState) {
        self.current = state;
    }

    /// Check that no input is waiting to settle.
    pub fn is_settled(&self) -> bool {
        !(self.page.is_pending() || self.scale.is_pending() || self.pan.is_pending())
    }

    /// The earliest time at which [`ViewDebouncer::poll`] can produce a change.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.page.deadline(), self.scale.deadline(), self.pan.deadline()]
            .into_iter()
            .flatten()
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_debouncer_waits_for_delay() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(100));
        debouncer.push(1, t0);
        assert_eq!(debouncer.poll(t0 + ms(99)), None);
        assert_eq!(debouncer.poll(t0 + ms(100)), Some(1));
        assert_eq!(debouncer.poll(t0 + ms(500)), None);
    }

    #[test]
    fn test_debouncer_restarts_on_push() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(100));
        debouncer.push(1, t0);
        debouncer.push(2, t0 + ms(80));
        assert_eq!(debouncer.poll(t0 + ms(150)), None);
        assert_eq!(debouncer.deadline(), Some(t0 + ms(180)));
        assert_eq!(debouncer.poll(t0 + ms(180)), Some(2));
    }

    #[test]
    fn test_debouncer_cancel() {
        let t0 = Instant::now();
        let mut debouncer = Debouncer::new(ms(10));
        debouncer.push("x", t0);
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.poll(t0 + ms(50)), None);
    }

    #[test]
    fn test_rapid_changes_coalesce() {
        let t0 = Instant::now();
        let mut view = ViewDebouncer::new(ViewState::default(), &ViewerConfig::default());
        for step in 0..10u32 {
            let at = t0 + ms(u64::from(step) * 5);
            view.set_pan(Point::new(f64::from(step) * 10.0, 0.0), at);
            view.set_scale(1.0 + f64::from(step) * 0.1, at);
        }
        assert_eq!(view.poll(t0 + ms(100)), None);

        let settled = view.poll(t0 + ms(145)).unwrap();
        assert_eq!(settled.pan, Point::new(90.0, 0.0));
        assert!((settled.scale - 1.9).abs() < 1e-9);
        assert!(view.is_settled());
        assert_eq!(view.poll(t0 + ms(1000)), None);
    }

    #[test]
    fn test_unchanged_value_is_not_a_change() {
        let t0 = Instant::now();
        let mut view = ViewDebouncer::new(ViewState::default(), &ViewerConfig::default());
        view.set_page(1, t0);
        assert_eq!(view.poll(t0 + ms(200)), None);
    }

    #[test]
    fn test_inputs_settle_independently() {
        let t0 = Instant::now();
        let mut view = ViewDebouncer::new(ViewState::default(), &ViewerConfig::default());
        view.set_page(3, t0);
        view.set_scale(2.0, t0 + ms(60));
        assert_eq!(view.next_deadline(), Some(t0 + ms(100)));

        let first = view.poll(t0 + ms(100)).unwrap();
        assert_eq!(first.page, 3);
        assert!((first.scale - 1.0).abs() < f64::EPSILON);

        let second = view.poll(t0 + ms(160)).unwrap();
        assert_eq!(second.page, 3);
        assert!((second.scale - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_scale_is_clamped() {
        let t0 = Instant::now();
        let mut view = ViewDebouncer::new(ViewState::default(), &ViewerConfig::default());
        view.set_scale(40.0, t0);
        assert!((view.poll(t0 + ms(100)).unwrap().scale - MAX_SCALE).abs() < f64::EPSILON);
        view.set_scale(f64::NAN, t0 + ms(100));
        assert!((view.poll(t0 + ms(200)).unwrap().scale - MIN_SCALE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_take_settled_does_not_commit() {
        let t0 = Instant::now();
        let mut view = ViewDebouncer::new(ViewState::default(), &ViewerConfig::default());
        view.set_page(4, t0);

        let candidate = view.take_settled(t0 + ms(100)).unwrap();
        assert_eq!(candidate.page, 4);
        assert_eq!(view.current().page, 1);
        assert!(view.is_settled());

        view.commit(candidate);
        assert_eq!(view.current().page, 4);
    }

    #[test]
    fn test_non_finite_pan_ignored() {
        let t0 = Instant::now();
        let mut view = ViewDebouncer::new(ViewState::default(), &ViewerConfig::default());
        view.set_pan(Point::new(f64::INFINITY, 0.0), t0);
        assert!(view.is_settled());
    }
}
