//! Scroll-to-reveal search.
//!
//! [`reveal`] brings a target element's center inside the part of a scroll
//! container that is not covered by obstructions, by repeatedly swiping the
//! container towards the target.
//!
//! Each iteration:
//!
//! 1. re-reads the target frame and succeeds if its center is inside the
//!    scrollable area;
//! 2. measures the vector from the area's center to the target's center and
//!    fails with [`ScrollError::StallNoProgress`] if its Manhattan length did
//!    not shrink since the previous iteration;
//! 3. clamps that vector per axis to a fraction of the area's size, expresses
//!    it in the container's gesture space and drags across the area's center
//!    by that amount (see [`plan_swipe`]).
//!
//! There is no iteration cap besides stall detection. Use
//! [`RevealOptions::timeout`] or wrap the call in a timeout of your own to
//! bound wall-clock time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use surfacer_core::driver::{AutomationDriver, Selector};
//! use surfacer_core::obstruction::Obstruction;
//! use surfacer_core::scroll::ScrollSearch;
//!
//! async fn open_privacy(driver: Arc<dyn AutomationDriver>) {
//!     let search = ScrollSearch::new(driver);
//!     let report = search
//!         .reveal(
//!             &Selector::id("settings-table"),
//!             &Selector::label("Privacy"),
//!             &[Obstruction::NavigationBar, Obstruction::Keyboard],
//!         )
//!         .await
//!         .expect("row should scroll into view");
//!     println!("revealed after {} swipe(s)", report.swipes);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info_span, warn, Instrument};

use crate::driver::{AutomationDriver, DriverError, Element, Selector};
use crate::geometry::{Point, Rect, Vector};
use crate::obstruction::{reduce_all, AppContext, DriverLookup, ElementLookup, Obstruction};

/// Default per-axis cap on a single swipe, as a fraction of the scrollable
/// area's size.
pub const DEFAULT_MAX_SWIPE_FRACTION: Vector = Vector { dx: 0.7, dy: 0.9 };

/// Default press-and-move duration: slow enough to register as a drag and
/// not a fling.
pub const DEFAULT_HOLD_DURATION: Duration = Duration::from_millis(300);

/// Why a reveal did not succeed.
#[derive(Error, Debug)]
pub enum ScrollError {
    /// The scroll container could not be found or has no frame.
    #[error("Scroll container not found: {0}")]
    ContainerNotFound(String),

    /// The target did not exist when the search started.
    #[error("Target does not exist: {0}")]
    TargetNeverExists(String),

    /// The target existed but disappeared while scrolling.
    #[error("Target disappeared while scrolling: {0}")]
    TargetLost(String),

    /// Obstructions leave no room to scroll in.
    #[error("Scrollable area is empty after obstructions: {area:?}")]
    DegenerateScrollArea { area: Rect },

    /// Swiping stopped bringing the target closer.
    #[error("Scrolling made no progress after {swipes} swipe(s): distance {distance:.1}pt, previously {previous:.1}pt")]
    StallNoProgress {
        swipes: usize,
        distance: f64,
        previous: f64,
    },

    /// The optional wall-clock budget ran out.
    #[error("Reveal timed out after {0}ms")]
    Timeout(u64),

    /// The automation backend failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Tuning knobs for [`reveal`].
#[derive(Debug, Clone, PartialEq)]
pub struct RevealOptions {
    /// Per-axis cap on one swipe as a fraction of the scrollable area.
    pub max_swipe_fraction: Vector,
    /// Duration of each drag gesture.
    pub hold_duration: Duration,
    /// How much the distance must shrink per swipe, in points, to count as
    /// progress. `0.0` requires a strict decrease.
    pub stall_tolerance: f64,
    /// Optional wall-clock budget for the whole search.
    pub timeout: Option<Duration>,
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self {
            max_swipe_fraction: DEFAULT_MAX_SWIPE_FRACTION,
            hold_duration: DEFAULT_HOLD_DURATION,
            stall_tolerance: 0.0,
            timeout: None,
        }
    }
}

impl RevealOptions {
    /// Copy with out-of-range values clamped: swipe fractions to
    /// `0.0..=1.0`, the stall tolerance to non-negative. Non-finite values
    /// become `0.0`.
    pub fn sanitized(&self) -> Self {
        Self {
            max_swipe_fraction: Vector::new(
                unit(self.max_swipe_fraction.dx),
                unit(self.max_swipe_fraction.dy),
            ),
            hold_duration: self.hold_duration,
            stall_tolerance: non_negative(self.stall_tolerance),
            timeout: self.timeout,
        }
    }
}

fn unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn non_negative(v: f64) -> f64 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}

/// Outcome of a successful reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealReport {
    /// Number of drag gestures issued.
    pub swipes: usize,
    /// Manhattan distance to the area's center measured before each swipe.
    /// Strictly decreasing.
    pub distances: Vec<f64>,
    /// The scrollable area the target ended up in.
    pub scrollable_area: Rect,
    /// The target's center after the last swipe.
    pub target_center: Point,
}

/// Start and stop points of one drag, as normalized offsets into the
/// container's full frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwipePlan {
    pub start: Vector,
    pub stop: Vector,
}

/// Computes the drag that moves content by the clamped distance from the
/// scrollable area's center to `target`.
///
/// The distance is clamped per axis to `area.size * max_fraction`, then
/// normalized against `container` (the drag primitive addresses the
/// container's full frame, not the obstruction-adjusted area). The drag is
/// split evenly around the area's center, so consecutive swipes in the same
/// direction stay inside the area.
pub fn plan_swipe(container: Rect, area: Rect, target: Point, max_fraction: Vector) -> SwipePlan {
    let distance = area.center().vector_to(target);
    let clamped = distance.clamp(area.extent().scale(max_fraction));
    let half = container.normalize(clamped) * 0.5;
    let center = container.normalized_offset(area.center());
    SwipePlan {
        start: center + half,
        stop: center - half,
    }
}

/// Per-call search state.
struct ScrollSession {
    container_frame: Rect,
    swipes: usize,
    distances: Vec<f64>,
}

impl ScrollSession {
    fn new(container_frame: Rect) -> Self {
        Self {
            container_frame,
            swipes: 0,
            distances: Vec::new(),
        }
    }

    /// Records the distance for this iteration, failing if it did not
    /// improve on the previous one by more than `tolerance`.
    fn record(&mut self, distance: f64, tolerance: f64) -> Result<(), ScrollError> {
        if let Some(&previous) = self.distances.last() {
            if distance >= previous - tolerance {
                return Err(ScrollError::StallNoProgress {
                    swipes: self.swipes,
                    distance,
                    previous,
                });
            }
        }
        self.distances.push(distance);
        Ok(())
    }
}

/// Scrolls `container` until the center of `target` is inside the
/// container's frame minus `obstructions`.
///
/// The container's frame is read once; obstructions are re-resolved through
/// `lookup` against that frame on every iteration, since chrome such as the
/// keyboard can come and go while scrolling.
///
/// Issues real gestures and is not idempotent: on failure the content stays
/// wherever the search stopped. `options` are [sanitized](RevealOptions::sanitized)
/// first.
pub async fn reveal(
    container: &Element,
    target: &Element,
    obstructions: &[Obstruction],
    lookup: &dyn ElementLookup,
    options: &RevealOptions,
) -> Result<RevealReport, ScrollError> {
    let options = options.sanitized();
    let span = info_span!("reveal", target = %target.selector(), container = %container.selector());
    let search = run(container, target, obstructions, lookup, &options).instrument(span);
    match options.timeout {
        None => search.await,
        Some(budget) => tokio::time::timeout(budget, search)
            .await
            .map_err(|_| timed_out(budget))?,
    }
}

fn timed_out(budget: Duration) -> ScrollError {
    ScrollError::Timeout(u64::try_from(budget.as_millis()).unwrap_or(u64::MAX))
}

async fn run(
    container: &Element,
    target: &Element,
    obstructions: &[Obstruction],
    lookup: &dyn ElementLookup,
    options: &RevealOptions,
) -> Result<RevealReport, ScrollError> {
    let container_frame = container
        .frame()
        .await?
        .ok_or_else(|| ScrollError::ContainerNotFound(container.selector().to_string()))?;
    let mut target_frame = target
        .frame()
        .await?
        .ok_or_else(|| ScrollError::TargetNeverExists(target.selector().to_string()))?;

    let mut session = ScrollSession::new(container_frame);
    loop {
        let area = reduce_all(session.container_frame, obstructions, lookup).await?;
        if area.is_degenerate() {
            warn!(?area, "no scrollable area left after obstructions");
            return Err(ScrollError::DegenerateScrollArea { area });
        }

        let center = target_frame.center();
        if area.contains(center) {
            debug!(swipes = session.swipes, "target revealed");
            return Ok(RevealReport {
                swipes: session.swipes,
                distances: session.distances,
                scrollable_area: area,
                target_center: center,
            });
        }

        let distance = area.center().vector_to(center).manhattan();
        if let Err(e) = session.record(distance, options.stall_tolerance) {
            warn!(distance, swipes = session.swipes, "scrolling stalled");
            return Err(e);
        }

        let plan = plan_swipe(session.container_frame, area, center, options.max_swipe_fraction);
        debug!(
            swipe = session.swipes + 1,
            distance,
            start_x = plan.start.dx,
            start_y = plan.start.dy,
            stop_x = plan.stop.dx,
            stop_y = plan.stop.dy,
            "swiping"
        );
        container
            .perform_drag(plan.start, plan.stop, options.hold_duration)
            .await?;
        session.swipes += 1;

        target_frame = target
            .frame()
            .await?
            .ok_or_else(|| ScrollError::TargetLost(target.selector().to_string()))?;
    }
}

/// Convenience wrapper binding a driver, an [`AppContext`] and
/// [`RevealOptions`] so callers only pass selectors.
pub struct ScrollSearch {
    driver: Arc<dyn AutomationDriver>,
    lookup: DriverLookup,
    options: RevealOptions,
}

impl ScrollSearch {
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Self {
        Self::with_context(driver, AppContext::default())
    }

    pub fn with_context(driver: Arc<dyn AutomationDriver>, context: AppContext) -> Self {
        Self {
            lookup: DriverLookup::new(driver.clone(), context),
            driver,
            options: RevealOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RevealOptions) -> Self {
        self.options = options;
        self
    }

    /// See [`reveal`].
    pub async fn reveal(
        &self,
        container: &Selector,
        target: &Selector,
        obstructions: &[Obstruction],
    ) -> Result<RevealReport, ScrollError> {
        let container = Element::new(self.driver.clone(), container.clone());
        let target = Element::new(self.driver.clone(), target.clone());
        reveal(&container, &target, obstructions, &self.lookup, &self.options).await
    }
}
