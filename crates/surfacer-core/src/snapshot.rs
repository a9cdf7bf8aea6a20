//! In-memory automation backend over a captured hierarchy.
//!
//! [`SnapshotDriver`] serves a UI tree loaded from JSON (the same shape the
//! accessibility dump produces) and reacts to gestures the way a simple
//! touch screen would:
//!
//! - a swipe that starts inside a scroll container moves that container's
//!   content by the finger's travel, clamped so the content never scrolls
//!   past its own edges;
//! - a tap on a button inside an alert dismisses the alert.
//!
//! It is what the `surfacer` CLI runs against, and what the integration
//! tests use to exercise the scroll search end to end.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::alert::ALERT_TYPE;
use crate::driver::{AutomationDriver, DriverError};
use crate::element::UIElement;
use crate::geometry::{Point, Rect, Vector};

/// Element types whose children scroll.
pub const SCROLLABLE_TYPES: &[&str] = &["ScrollView", "Table", "CollectionView", "WebView"];

/// Moves shorter than this are rounding noise and leave content in place.
const MIN_TRAVEL: f64 = 1e-6;

/// A gesture received by the driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    Swipe {
        start: Point,
        end: Point,
        duration: Option<f64>,
        /// How far the content actually moved.
        scrolled: Vector,
    },
    Tap { point: Point },
}

struct SnapshotState {
    tree: Vec<UIElement>,
    gestures: Vec<Gesture>,
}

/// [`AutomationDriver`] backed by an in-memory hierarchy.
pub struct SnapshotDriver {
    state: Mutex<SnapshotState>,
}

impl SnapshotDriver {
    pub fn new(tree: Vec<UIElement>) -> Self {
        Self {
            state: Mutex::new(SnapshotState {
                tree,
                gestures: Vec::new(),
            }),
        }
    }

    /// Parses either a single root element or an array of roots.
    pub fn from_json(json: &str) -> Result<Self, DriverError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Roots {
            Many(Vec<UIElement>),
            One(Box<UIElement>),
        }

        let roots: Roots =
            serde_json::from_str(json).map_err(|e| DriverError::JsonParse(e.to_string()))?;
        Ok(Self::new(match roots {
            Roots::Many(v) => v,
            Roots::One(el) => vec![*el],
        }))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Every gesture performed so far, oldest first.
    pub async fn gestures(&self) -> Vec<Gesture> {
        self.state.lock().await.gestures.clone()
    }

    pub async fn swipe_count(&self) -> usize {
        self.state
            .lock()
            .await
            .gestures
            .iter()
            .filter(|g| matches!(g, Gesture::Swipe { .. }))
            .count()
    }
}

#[async_trait]
impl AutomationDriver for SnapshotDriver {
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        Ok(self.state.lock().await.tree.clone())
    }

    async fn swipe(&self, start: Point, end: Point, duration: Option<f64>) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        let scrolled = match innermost_scrollable(&mut state.tree, start) {
            Some(container) => scroll_content(container, start.vector_to(end)),
            None => Vector::ZERO,
        };
        debug!(?start, ?end, ?scrolled, "snapshot swipe");
        state.gestures.push(Gesture::Swipe {
            start,
            end,
            duration,
            scrolled,
        });
        Ok(())
    }

    async fn tap_location(&self, point: Point) -> Result<(), DriverError> {
        let mut state = self.state.lock().await;
        let dismissed = dismiss_alert_at(&mut state.tree, point);
        debug!(?point, dismissed, "snapshot tap");
        state.gestures.push(Gesture::Tap { point });
        Ok(())
    }
}

fn is_scrollable(el: &UIElement) -> bool {
    SCROLLABLE_TYPES.iter().any(|t| el.is_type(t))
}

/// Deepest scroll container whose frame contains `point`.
fn innermost_scrollable(elements: &mut [UIElement], point: Point) -> Option<&mut UIElement> {
    for el in elements.iter_mut() {
        let inside = el.rect().map_or(false, |r| r.contains(point));
        if !inside {
            continue;
        }
        let has_inner = el
            .children
            .iter()
            .any(|c| contains_scrollable_at(c, point));
        if has_inner {
            return innermost_scrollable(&mut el.children, point);
        }
        if is_scrollable(el) {
            return Some(el);
        }
    }
    None
}

fn contains_scrollable_at(el: &UIElement, point: Point) -> bool {
    if !el.rect().map_or(false, |r| r.contains(point)) {
        return false;
    }
    is_scrollable(el) || el.children.iter().any(|c| contains_scrollable_at(c, point))
}

/// Moves the content of `container` by `travel`, clamped to the content's
/// extent. Returns the applied offset.
fn scroll_content(container: &mut UIElement, travel: Vector) -> Vector {
    let Some(viewport) = container.rect() else {
        return Vector::ZERO;
    };
    let mut content: Option<Rect> = None;
    for child in &container.children {
        child.walk(&mut |el| {
            if let Some(r) = el.rect() {
                content = Some(content.map_or(r, |c| c.union(&r)));
            }
        });
    }
    let Some(content) = content else {
        return Vector::ZERO;
    };

    let applied = Vector::new(
        clamp_axis(travel.dx, viewport.min_x, viewport.max_x, content.min_x, content.max_x),
        clamp_axis(travel.dy, viewport.min_y, viewport.max_y, content.min_y, content.max_y),
    );
    if applied != Vector::ZERO {
        for child in container.children.iter_mut() {
            shift(child, applied);
        }
    }
    applied
}

/// Limits movement so the content keeps covering the viewport along one
/// axis. Content smaller than the viewport does not move.
fn clamp_axis(travel: f64, view_min: f64, view_max: f64, content_min: f64, content_max: f64) -> f64 {
    let lowest = (view_max - content_max).min(0.0);
    let highest = (view_min - content_min).max(0.0);
    if content_max - content_min <= view_max - view_min {
        return 0.0;
    }
    let applied = travel.max(lowest).min(highest);
    if applied.abs() < MIN_TRAVEL {
        0.0
    } else {
        applied
    }
}

fn shift(el: &mut UIElement, by: Vector) {
    if let Some(r) = el.rect() {
        el.frame = Some(r.offset(by).into());
    }
    for child in el.children.iter_mut() {
        shift(child, by);
    }
}

/// Removes the alert whose button lies under `point`. Returns whether one
/// was removed.
fn dismiss_alert_at(elements: &mut Vec<UIElement>, point: Point) -> bool {
    let before = elements.len();
    elements.retain(|el| !(el.is_type(ALERT_TYPE) && button_hit(el, point)));
    if elements.len() != before {
        return true;
    }
    elements
        .iter_mut()
        .any(|el| dismiss_alert_at(&mut el.children, point))
}

fn button_hit(alert: &UIElement, point: Point) -> bool {
    alert
        .descendants_of_type("Button")
        .iter()
        .any(|b| b.rect().map_or(false, |r| r.contains(point)))
}
