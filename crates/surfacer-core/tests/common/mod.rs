//! Shared test helpers for surfacer-core integration tests.
//!
//! Screens are built as element trees and served through `SnapshotDriver`
//! when scrolling should behave physically, or through `ScriptedDriver` when
//! a test needs full control over what the target's frame reads as.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future;

use async_trait::async_trait;
use tokio::sync::Mutex;

use surfacer_core::driver::{AutomationDriver, DriverError, Selector};
use surfacer_core::element::UIElement;
use surfacer_core::geometry::{Point, Rect};

pub const SCREEN: Rect = Rect {
    min_x: 0.0,
    min_y: 0.0,
    max_x: 300.0,
    max_y: 600.0,
};

pub const NAV_BAR: Rect = Rect {
    min_x: 0.0,
    min_y: 0.0,
    max_x: 300.0,
    max_y: 50.0,
};

pub const KEYBOARD: Rect = Rect {
    min_x: 0.0,
    min_y: 500.0,
    max_x: 300.0,
    max_y: 600.0,
};

// ---------------------------------------------------------------------------
// Hierarchy builders
// ---------------------------------------------------------------------------

/// `count` rows of `row_height` points stacked from the top of the screen,
/// identified as `row-0`, `row-1`, ...
pub fn rows(count: usize, row_height: f64) -> Vec<UIElement> {
    (0..count)
        .map(|i| {
            UIElement::of_type("Cell")
                .with_identifier(format!("row-{}", i))
                .with_label(format!("Row {}", i))
                .with_frame(Rect::from_origin_size(0.0, i as f64 * row_height, 300.0, row_height))
        })
        .collect()
}

/// A full-screen table `list` holding `content`, optionally with a
/// navigation bar and keyboard on top of it.
pub fn list_screen(content: Vec<UIElement>, nav_bar: bool, keyboard: bool) -> Vec<UIElement> {
    let mut children = vec![UIElement::of_type("Table")
        .with_identifier("list")
        .with_frame(SCREEN)
        .with_children(content)];
    if nav_bar {
        children.push(UIElement::of_type("NavigationBar").with_frame(NAV_BAR));
    }
    if keyboard {
        children.push(UIElement::of_type("Keyboard").with_frame(KEYBOARD));
    }
    vec![UIElement::of_type("Application")
        .with_identifier("com.example.app")
        .with_frame(SCREEN)
        .with_children(children)]
}

/// A system alert with a title, a body and buttons stacked below them.
pub fn alert(title: &str, body: &str, buttons: &[&str]) -> UIElement {
    let mut children = vec![
        UIElement::of_type("StaticText").with_label(title),
        UIElement::of_type("StaticText").with_label(body),
    ];
    for (i, label) in buttons.iter().enumerate() {
        children.push(
            UIElement::of_type("Button")
                .with_label(*label)
                .with_frame(Rect::from_origin_size(40.0, 320.0 + 44.0 * i as f64, 220.0, 44.0)),
        );
    }
    UIElement::of_type("Alert")
        .with_label(title)
        .with_frame(Rect::new(40.0, 200.0, 260.0, 320.0 + 44.0 * buttons.len() as f64))
        .with_children(children)
}

// ---------------------------------------------------------------------------
// ScriptedDriver
// ---------------------------------------------------------------------------

/// A driver with a fixed container `list` and a target `target` whose frame
/// is read from a script, one entry per lookup. The last entry repeats.
/// Swipes are recorded and otherwise ignored.
pub struct ScriptedDriver {
    container: Rect,
    target_frames: Mutex<VecDeque<Option<Rect>>>,
    swipes: Mutex<Vec<(Point, Point, Option<f64>)>>,
    fail_swipes: bool,
    hang_swipes: bool,
}

impl ScriptedDriver {
    pub fn new(container: Rect, target_frames: Vec<Option<Rect>>) -> Self {
        Self {
            container,
            target_frames: Mutex::new(target_frames.into()),
            swipes: Mutex::new(Vec::new()),
            fail_swipes: false,
            hang_swipes: false,
        }
    }

    /// Every swipe fails with a driver error.
    pub fn failing(mut self) -> Self {
        self.fail_swipes = true;
        self
    }

    /// Every swipe never completes.
    pub fn hanging(mut self) -> Self {
        self.hang_swipes = true;
        self
    }

    pub async fn swipes(&self) -> Vec<(Point, Point, Option<f64>)> {
        self.swipes.lock().await.clone()
    }

    async fn next_target_frame(&self) -> Option<Rect> {
        let mut frames = self.target_frames.lock().await;
        if frames.len() > 1 {
            frames.pop_front().flatten()
        } else {
            frames.front().copied().flatten()
        }
    }
}

#[async_trait]
impl AutomationDriver for ScriptedDriver {
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError> {
        Ok(vec![UIElement::of_type("Table")
            .with_identifier("list")
            .with_frame(self.container)])
    }

    async fn find_element(&self, selector: &Selector) -> Result<Option<UIElement>, DriverError> {
        match selector.pattern.as_deref() {
            Some("list") => Ok(Some(
                UIElement::of_type("Table")
                    .with_identifier("list")
                    .with_frame(self.container),
            )),
            Some("target") => Ok(self
                .next_target_frame()
                .await
                .map(|r| UIElement::of_type("Cell").with_identifier("target").with_frame(r))),
            _ => Ok(None),
        }
    }

    async fn swipe(&self, start: Point, end: Point, duration: Option<f64>) -> Result<(), DriverError> {
        if self.hang_swipes {
            future::pending::<()>().await;
        }
        if self.fail_swipes {
            return Err(DriverError::CommandFailed("drag rejected".to_string()));
        }
        self.swipes.lock().await.push((start, end, duration));
        Ok(())
    }

    async fn tap_location(&self, _point: Point) -> Result<(), DriverError> {
        Ok(())
    }
}

/// A 300x40 cell centered horizontally with its center at `y`.
pub fn cell_centered_at(y: f64) -> Rect {
    Rect::new(0.0, y - 20.0, 300.0, y + 20.0)
}
