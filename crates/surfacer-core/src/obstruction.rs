//! Obstructing chrome and the scrollable area it leaves behind.
//!
//! An [`Obstruction`] is a stateless description of something that eats into
//! a scroll container from one edge: the navigation bar from the top, the
//! keyboard from the bottom, or any element the caller names. It is resolved
//! to a live frame through an [`ElementLookup`] each time it is evaluated;
//! an obstruction whose element is absent reduces nothing.
//!
//! The arithmetic lives in [`reduce_rect`], which needs no driver and is what
//! the async [`reduce`] and [`reduce_all`] delegate to.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::driver::{search, AutomationDriver, DriverError, Selector};
use crate::geometry::Rect;

/// The side of the scrollable area an obstruction occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Edge::Top => "top",
            Edge::Bottom => "bottom",
            Edge::Left => "left",
            Edge::Right => "right",
        };
        f.write_str(name)
    }
}

impl FromStr for Edge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Edge::Top),
            "bottom" => Ok(Edge::Bottom),
            "left" => Ok(Edge::Left),
            "right" => Ok(Edge::Right),
            other => Err(format!(
                "Invalid edge '{}'. Use: top, bottom, left, right",
                other
            )),
        }
    }
}

/// Something that narrows the usable scroll area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Obstruction {
    /// The app's navigation bar. Always occupies the top edge.
    NavigationBar,
    /// The on-screen keyboard. Always occupies the bottom edge.
    Keyboard,
    /// Any other element, occupying the given edge.
    Custom { selector: Selector, edge: Edge },
}

impl Obstruction {
    pub fn custom(selector: Selector, edge: Edge) -> Self {
        Obstruction::Custom { selector, edge }
    }

    pub fn edge(&self) -> Edge {
        match self {
            Obstruction::NavigationBar => Edge::Top,
            Obstruction::Keyboard => Edge::Bottom,
            Obstruction::Custom { edge, .. } => *edge,
        }
    }
}

impl fmt::Display for Obstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Obstruction::NavigationBar => f.write_str("navigation bar"),
            Obstruction::Keyboard => f.write_str("keyboard"),
            Obstruction::Custom { selector, edge } => write!(f, "{} ({})", selector, edge),
        }
    }
}

/// Resolves obstructions to their current on-screen frames.
#[async_trait]
pub trait ElementLookup: Send + Sync {
    /// The obstruction's live frame, or `None` if its element does not exist.
    async fn frame_of(&self, obstruction: &Obstruction) -> Result<Option<Rect>, DriverError>;
}

/// The application whose chrome obstructions are looked up in.
///
/// When `scope` is set, obstructions are searched only below the first
/// element it matches (typically the `Application` element of the app under
/// test), so another app's keyboard or bar is never picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppContext {
    pub scope: Option<Selector>,
    /// Element type reported for navigation bars.
    pub navigation_bar_type: String,
    /// Element type reported for the software keyboard.
    pub keyboard_type: String,
}

impl Default for AppContext {
    fn default() -> Self {
        Self {
            scope: None,
            navigation_bar_type: "NavigationBar".to_string(),
            keyboard_type: "Keyboard".to_string(),
        }
    }
}

impl AppContext {
    pub fn scoped(scope: Selector) -> Self {
        Self {
            scope: Some(scope),
            ..Self::default()
        }
    }

    /// The selector an obstruction resolves through in this context.
    pub fn selector_for(&self, obstruction: &Obstruction) -> Selector {
        match obstruction {
            Obstruction::NavigationBar => Selector::of_type(self.navigation_bar_type.as_str()),
            Obstruction::Keyboard => Selector::of_type(self.keyboard_type.as_str()),
            Obstruction::Custom { selector, .. } => selector.clone(),
        }
    }
}

/// [`ElementLookup`] backed by an [`AutomationDriver`].
pub struct DriverLookup {
    driver: Arc<dyn AutomationDriver>,
    context: AppContext,
}

impl DriverLookup {
    pub fn new(driver: Arc<dyn AutomationDriver>, context: AppContext) -> Self {
        Self { driver, context }
    }
}

#[async_trait]
impl ElementLookup for DriverLookup {
    #[instrument(skip(self), fields(obstruction = %obstruction), level = "debug")]
    async fn frame_of(&self, obstruction: &Obstruction) -> Result<Option<Rect>, DriverError> {
        let selector = self.context.selector_for(obstruction);
        let found = match &self.context.scope {
            None => self.driver.find_element(&selector).await?,
            Some(scope) => {
                let tree = self.driver.dump_tree().await?;
                search(&tree, scope).and_then(|root| search(&root.children, &selector))
            }
        };
        Ok(found.and_then(|el| el.rect()))
    }
}

/// Removes the part of `area` covered by an obstruction on `edge`.
///
/// The overlap is clamped at zero, so an obstruction that does not reach
/// the area leaves it untouched, and capped at the area's extent, so the
/// result is never inverted. The result always lies within `area`.
pub fn reduce_rect(area: Rect, obstruction: Option<Rect>, edge: Edge) -> Rect {
    let Some(o) = obstruction else {
        return area;
    };
    let mut out = area;
    match edge {
        Edge::Bottom => {
            let cut = overlap(area.max_y - o.min_y, area.height());
            out.max_y -= cut;
        }
        Edge::Top => {
            let cut = overlap(o.max_y - area.min_y, area.height());
            out.min_y += cut;
        }
        Edge::Right => {
            let cut = overlap(area.max_x - o.min_x, area.width());
            out.max_x -= cut;
        }
        Edge::Left => {
            let cut = overlap(o.max_x - area.min_x, area.width());
            out.min_x += cut;
        }
    }
    out
}

fn overlap(raw: f64, extent: f64) -> f64 {
    raw.max(0.0).min(extent.max(0.0))
}

/// Reduces `area` by one obstruction resolved through `lookup`.
pub async fn reduce(
    area: Rect,
    by: &Obstruction,
    lookup: &dyn ElementLookup,
) -> Result<Rect, DriverError> {
    let frame = lookup.frame_of(by).await?;
    let reduced = reduce_rect(area, frame, by.edge());
    if frame.is_none() {
        debug!(obstruction = %by, "obstruction absent, area unchanged");
    } else {
        debug!(obstruction = %by, ?reduced, "area reduced");
    }
    Ok(reduced)
}

/// Folds [`reduce`] over `obstructions` in the given order.
pub async fn reduce_all(
    area: Rect,
    obstructions: &[Obstruction],
    lookup: &dyn ElementLookup,
) -> Result<Rect, DriverError> {
    let mut area = area;
    for obstruction in obstructions {
        area = reduce(area, obstruction, lookup).await?;
    }
    Ok(area)
}
