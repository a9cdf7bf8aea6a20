//! Automation driver trait for backend-agnostic UI automation.
//!
//! This module defines the [`AutomationDriver`] trait, the seam between the
//! scroll and alert logic and whatever actually talks to the device (an
//! on-device agent, a simulator bridge, or the in-memory
//! [`SnapshotDriver`](crate::snapshot::SnapshotDriver)).
//!
//! Element lookups go through [`Selector`]s and are always live: an
//! [`Element`] handle stores only its selector and re-resolves it against
//! the driver on every query, so frames are never stale.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use surfacer_core::driver::{AutomationDriver, Element, Selector};
//!
//! async fn row_is_visible(driver: Arc<dyn AutomationDriver>) -> bool {
//!     let row = Element::new(driver, Selector::id("settings-row-*"));
//!     row.is_hittable().await.unwrap_or(false)
//! }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::element::UIElement;
use crate::geometry::{Point, Rect, Vector};

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type.
#[derive(Error, Debug)]
pub enum DriverError {
    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// The backend is not available or not connected.
    #[error("Not connected to automation backend")]
    NotConnected,

    /// An element required by the operation could not be resolved.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

/// Describes how to find an element in the hierarchy.
///
/// `pattern` matches the accessibility identifier, or the label when
/// `by_label` is set, and supports `*` and `?` wildcards. A selector without
/// a pattern matches any element, so `Selector::of_type("Keyboard")` finds
/// the first keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    pub pattern: Option<String>,
    #[serde(default)]
    pub by_label: bool,
    #[serde(default)]
    pub element_type: Option<String>,
}

impl Selector {
    /// Match by accessibility identifier.
    pub fn id(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            by_label: false,
            element_type: None,
        }
    }

    /// Match by accessibility label.
    pub fn label(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            by_label: true,
            element_type: None,
        }
    }

    /// Match the first element of a type.
    pub fn of_type(element_type: impl Into<String>) -> Self {
        Self {
            pattern: None,
            by_label: false,
            element_type: Some(element_type.into()),
        }
    }

    /// Adds an element type filter.
    pub fn with_type(mut self, element_type: impl Into<String>) -> Self {
        self.element_type = Some(element_type.into());
        self
    }

    /// Returns true if `element` satisfies this selector.
    pub fn matches(&self, element: &UIElement) -> bool {
        let type_matches = match &self.element_type {
            Some(typ) => element.is_type(typ),
            None => true,
        };
        let pattern_matches = match &self.pattern {
            None => true,
            Some(pattern) => {
                let field = if self.by_label {
                    element.label.as_deref()
                } else {
                    element.identifier.as_deref()
                };
                field.map_or(false, |text| glob_match(pattern, text))
            }
        };
        type_matches && pattern_matches
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.pattern, &self.element_type) {
            (Some(p), Some(t)) if self.by_label => write!(f, "{} with label '{}'", t, p),
            (Some(p), Some(t)) => write!(f, "{} '{}'", t, p),
            (Some(p), None) if self.by_label => write!(f, "element with label '{}'", p),
            (Some(p), None) => write!(f, "element '{}'", p),
            (None, Some(t)) => write!(f, "any {}", t),
            (None, None) => write!(f, "any element"),
        }
    }
}

/// Parses the compact selector syntax used on the command line.
///
/// - `login-button`: identifier
/// - `label:Sign In`: label
/// - `type:Keyboard`: any element of that type
/// - `Button/label:OK`, `Cell/row-*`: either form above with a type filter
impl FromStr for Selector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err("empty selector".to_string());
        }
        if let Some(typ) = s.strip_prefix("type:") {
            if typ.is_empty() {
                return Err("missing element type after 'type:'".to_string());
            }
            return Ok(Selector::of_type(typ));
        }
        let (typ, rest) = match s.split_once('/') {
            Some((typ, rest)) if !typ.is_empty() && !typ.contains(':') => (Some(typ), rest),
            _ => (None, s),
        };
        let selector = match rest.strip_prefix("label:") {
            Some(label) if !label.is_empty() => Selector::label(label),
            Some(_) => return Err("missing label after 'label:'".to_string()),
            None if rest.is_empty() => return Err(format!("missing selector in '{}'", s)),
            None => Selector::id(rest),
        };
        Ok(match typ {
            Some(typ) => selector.with_type(typ),
            None => selector,
        })
    }
}

/// Returns true if the pattern contains glob wildcard characters (`*` or `?`).
fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Matches a string against a glob pattern with `*` (any chars) and `?` (single char).
///
/// When the pattern has no wildcards, falls back to exact equality.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == text;
    }

    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    let (plen, tlen) = (pat.len(), txt.len());

    // dp[i][j] = pattern[..i] matches text[..j]
    let mut dp = vec![vec![false; tlen + 1]; plen + 1];
    dp[0][0] = true;

    for i in 1..=plen {
        if pat[i - 1] == '*' {
            dp[i][0] = dp[i - 1][0];
        }
    }

    for i in 1..=plen {
        for j in 1..=tlen {
            if pat[i - 1] == '*' {
                dp[i][j] = dp[i - 1][j] || dp[i][j - 1];
            } else if pat[i - 1] == '?' || pat[i - 1] == txt[j - 1] {
                dp[i][j] = dp[i - 1][j - 1];
            }
        }
    }

    dp[plen][tlen]
}

/// Depth-first search of a hierarchy for the first element matching `selector`.
pub fn search(elements: &[UIElement], selector: &Selector) -> Option<UIElement> {
    for element in elements {
        if selector.matches(element) {
            return Some(element.clone());
        }
        if let Some(found) = search(&element.children, selector) {
            return Some(found);
        }
    }
    None
}

/// Trait for backend-agnostic UI automation.
///
/// Implementors provide the raw capabilities: reading the hierarchy,
/// swiping and tapping at screen coordinates. Element search has a default
/// implementation on top of [`dump_tree`](AutomationDriver::dump_tree);
/// backends with server-side search can override it.
///
/// Every method reads or mutates live UI state, so callers must not assume
/// two calls observe the same layout.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Get the full UI element hierarchy of the current screen.
    async fn dump_tree(&self) -> Result<Vec<UIElement>, DriverError>;

    /// Find the first element matching `selector`.
    async fn find_element(&self, selector: &Selector) -> Result<Option<UIElement>, DriverError> {
        let tree = self.dump_tree().await?;
        Ok(search(&tree, selector))
    }

    /// Perform a drag from one screen point to another.
    ///
    /// Blocks until the backend reports the gesture finished.
    ///
    /// # Arguments
    ///
    /// * `start` - Where the finger goes down
    /// * `end` - Where the finger lifts
    /// * `duration` - Optional press-and-move duration in seconds
    async fn swipe(&self, start: Point, end: Point, duration: Option<f64>) -> Result<(), DriverError>;

    /// Tap at specific screen coordinates.
    async fn tap_location(&self, point: Point) -> Result<(), DriverError>;
}

/// A live handle to an element identified by a [`Selector`].
///
/// Nothing about the element is cached; each query re-resolves the selector.
#[derive(Clone)]
pub struct Element {
    driver: Arc<dyn AutomationDriver>,
    selector: Selector,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element").field("selector", &self.selector).finish()
    }
}

impl Element {
    pub fn new(driver: Arc<dyn AutomationDriver>, selector: Selector) -> Self {
        Self { driver, selector }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Current snapshot of the element, if it exists.
    pub async fn resolve(&self) -> Result<Option<UIElement>, DriverError> {
        self.driver.find_element(&self.selector).await
    }

    pub async fn exists(&self) -> Result<bool, DriverError> {
        Ok(self.resolve().await?.is_some())
    }

    /// An element is hittable when it exists and the backend does not report
    /// it as obscured.
    pub async fn is_hittable(&self) -> Result<bool, DriverError> {
        Ok(self
            .resolve()
            .await?
            .map_or(false, |el| el.hittable != Some(false)))
    }

    /// Current screen frame, or `None` if the element is absent or has no frame.
    pub async fn frame(&self) -> Result<Option<Rect>, DriverError> {
        Ok(self.resolve().await?.and_then(|el| el.rect()))
    }

    /// Drags between two points given as normalized offsets into the
    /// element's full frame (`(0,0)` top-left, `(1,1)` bottom-right).
    #[instrument(skip(self), fields(selector = %self.selector), level = "debug")]
    pub async fn perform_drag(&self, from: Vector, to: Vector, hold: Duration) -> Result<(), DriverError> {
        let frame = self
            .frame()
            .await?
            .ok_or_else(|| DriverError::ElementNotFound(self.selector.to_string()))?;
        let start = frame.point_at(from);
        let end = frame.point_at(to);
        self.driver.swipe(start, end, Some(hold.as_secs_f64())).await
    }

    /// Taps the center of the element.
    pub async fn tap(&self) -> Result<(), DriverError> {
        let frame = self
            .frame()
            .await?
            .ok_or_else(|| DriverError::ElementNotFound(self.selector.to_string()))?;
        self.driver.tap_location(frame.center()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Vec<UIElement> {
        vec![UIElement::of_type("Window").with_children(vec![
            UIElement::of_type("NavigationBar").with_identifier("nav"),
            UIElement::of_type("Table").with_identifier("list").with_children(vec![
                UIElement::of_type("Cell").with_identifier("row-1").with_label("First"),
                UIElement::of_type("Cell").with_identifier("row-2").with_label("Second"),
            ]),
            UIElement::of_type("Button").with_identifier("done").with_label("Done"),
        ])]
    }

    #[test]
    fn driver_error_display() {
        let err = DriverError::CommandFailed("swipe failed".to_string());
        assert!(err.to_string().contains("swipe failed"));

        let err = DriverError::NotConnected;
        assert!(err.to_string().contains("Not connected"));

        let err = DriverError::ElementNotFound("element 'x'".to_string());
        assert!(err.to_string().contains("element 'x'"));
    }

    #[test]
    fn glob_match_exact() {
        assert!(glob_match("hello", "hello"));
        assert!(!glob_match("hello", "world"));
    }

    #[test]
    fn glob_match_star() {
        assert!(glob_match("Log*", "Log In"));
        assert!(glob_match("Log*", "Log"));
        assert!(!glob_match("Log*", "Blog"));
    }

    #[test]
    fn glob_match_question_mark() {
        assert!(glob_match("Item ?", "Item 1"));
        assert!(!glob_match("Item ?", "Item 12"));
    }

    #[test]
    fn search_by_identifier_glob() {
        let found = search(&sample_tree(), &Selector::id("row-*")).unwrap();
        assert_eq!(found.identifier.as_deref(), Some("row-1"));
    }

    #[test]
    fn search_by_label() {
        let found = search(&sample_tree(), &Selector::label("Second")).unwrap();
        assert_eq!(found.identifier.as_deref(), Some("row-2"));
        assert!(search(&sample_tree(), &Selector::label("Third")).is_none());
    }

    #[test]
    fn search_by_type_only() {
        let found = search(&sample_tree(), &Selector::of_type("NavigationBar")).unwrap();
        assert_eq!(found.identifier.as_deref(), Some("nav"));
        assert!(search(&sample_tree(), &Selector::of_type("Keyboard")).is_none());
    }

    #[test]
    fn search_with_type_filter() {
        assert!(search(&sample_tree(), &Selector::id("done").with_type("Button")).is_some());
        assert!(search(&sample_tree(), &Selector::id("done").with_type("Cell")).is_none());
    }

    #[test]
    fn selector_from_str() {
        assert_eq!("row-1".parse::<Selector>().unwrap(), Selector::id("row-1"));
        assert_eq!("label:Sign In".parse::<Selector>().unwrap(), Selector::label("Sign In"));
        assert_eq!("type:Keyboard".parse::<Selector>().unwrap(), Selector::of_type("Keyboard"));
        assert_eq!(
            "Button/label:OK".parse::<Selector>().unwrap(),
            Selector::label("OK").with_type("Button")
        );
        assert_eq!(
            "Cell/row-*".parse::<Selector>().unwrap(),
            Selector::id("row-*").with_type("Cell")
        );
        assert!("".parse::<Selector>().is_err());
        assert!("type:".parse::<Selector>().is_err());
        assert!("label:".parse::<Selector>().is_err());
    }

    #[test]
    fn selector_display() {
        assert_eq!(Selector::id("a").to_string(), "element 'a'");
        assert_eq!(Selector::label("OK").to_string(), "element with label 'OK'");
        assert_eq!(Selector::of_type("Keyboard").to_string(), "any Keyboard");
    }

    fn element(tree: Vec<UIElement>, selector: Selector) -> Element {
        Element::new(Arc::new(crate::snapshot::SnapshotDriver::new(tree)), selector)
    }

    #[tokio::test]
    async fn exists_follows_the_hierarchy() {
        assert!(element(sample_tree(), Selector::id("row-2")).exists().await.unwrap());
        assert!(!element(sample_tree(), Selector::id("row-9")).exists().await.unwrap());
    }

    #[tokio::test]
    async fn hittable_unless_reported_obscured() {
        let button = |hittable| {
            let mut el = UIElement::of_type("Button").with_identifier("ok");
            el.hittable = hittable;
            vec![el]
        };
        let ok = Selector::id("ok");
        assert!(element(button(None), ok.clone()).is_hittable().await.unwrap());
        assert!(element(button(Some(true)), ok.clone()).is_hittable().await.unwrap());
        assert!(!element(button(Some(false)), ok.clone()).is_hittable().await.unwrap());
        assert!(!element(sample_tree(), ok).is_hittable().await.unwrap());
    }
}
