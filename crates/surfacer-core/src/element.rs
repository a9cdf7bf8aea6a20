//! Shared UI element types for accessibility-based automation.
//!
//! This module defines the data structures representing UI elements from
//! the accessibility hierarchy. They are independent of any specific
//! automation backend.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// Represents a UI element from the accessibility hierarchy.
///
/// Elements form a tree via the `children` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    /// The unique accessibility identifier for this element (AXUniqueId).
    #[serde(rename = "AXUniqueId", default)]
    pub identifier: Option<String>,

    /// The accessibility label (AXLabel), typically the user-visible text.
    #[serde(rename = "AXLabel", default)]
    pub label: Option<String>,

    /// The current value of the element (AXValue), e.g., text field contents.
    #[serde(rename = "AXValue", default)]
    pub value: Option<String>,

    /// The type of UI element (e.g., "Button", "ScrollView", "Keyboard").
    #[serde(rename = "type", default)]
    pub element_type: Option<String>,

    /// The element's frame in screen coordinates.
    #[serde(default)]
    pub frame: Option<ElementFrame>,

    /// Whether the element can currently receive touches.
    ///
    /// `None` when the backend does not report hit-testability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hittable: Option<bool>,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,
}

impl UIElement {
    /// Creates an element with only a type set.
    pub fn of_type(element_type: impl Into<String>) -> Self {
        Self {
            identifier: None,
            label: None,
            value: None,
            element_type: Some(element_type.into()),
            frame: None,
            hittable: None,
            children: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_frame(mut self, rect: Rect) -> Self {
        self.frame = Some(ElementFrame::from(rect));
        self
    }

    pub fn with_children(mut self, children: Vec<UIElement>) -> Self {
        self.children = children;
        self
    }

    /// The element's frame as a [`Rect`], if it has one.
    pub fn rect(&self) -> Option<Rect> {
        self.frame.as_ref().map(|f| Rect::from(*f))
    }

    /// Whether the type of this element equals `element_type`.
    pub fn is_type(&self, element_type: &str) -> bool {
        self.element_type.as_deref() == Some(element_type)
    }

    /// Visits this element and all of its descendants in depth-first order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a UIElement)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Collects all descendants (excluding `self`) of the given type.
    pub fn descendants_of_type(&self, element_type: &str) -> Vec<&UIElement> {
        let mut found = Vec::new();
        for child in &self.children {
            child.walk(&mut |el| {
                if el.is_type(element_type) {
                    found.push(el);
                }
            });
        }
        found
    }
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in screen points, with the origin at the top-left
/// corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementFrame {
    /// The x-coordinate of the element's top-left corner.
    pub x: f64,
    /// The y-coordinate of the element's top-left corner.
    pub y: f64,
    /// The width of the element in points.
    pub width: f64,
    /// The height of the element in points.
    pub height: f64,
}

impl From<ElementFrame> for Rect {
    fn from(f: ElementFrame) -> Rect {
        Rect::from_origin_size(f.x, f.y, f.width, f.height)
    }
}

impl From<Rect> for ElementFrame {
    fn from(r: Rect) -> ElementFrame {
        ElementFrame {
            x: r.min_x,
            y: r.min_y,
            width: r.width(),
            height: r.height(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_accessibility_keys() {
        let json = r#"{
            "AXUniqueId": "row-12",
            "AXLabel": "Row 12",
            "type": "Cell",
            "frame": {"x": 0, "y": 100, "width": 300, "height": 44},
            "hittable": true
        }"#;
        let el: UIElement = serde_json::from_str(json).unwrap();
        assert_eq!(el.identifier.as_deref(), Some("row-12"));
        assert_eq!(el.label.as_deref(), Some("Row 12"));
        assert!(el.is_type("Cell"));
        assert_eq!(el.hittable, Some(true));
        assert!(el.children.is_empty());
        assert_eq!(el.rect(), Some(Rect::new(0.0, 100.0, 300.0, 144.0)));
    }

    #[test]
    fn frame_rect_conversion() {
        let rect = Rect::new(10.0, 20.0, 110.0, 64.0);
        let frame = ElementFrame::from(rect);
        assert_eq!(frame.width, 100.0);
        assert_eq!(frame.height, 44.0);
        assert_eq!(Rect::from(frame), rect);
    }

    #[test]
    fn descendants_of_type_skips_self() {
        let tree = UIElement::of_type("Button").with_children(vec![
            UIElement::of_type("StaticText").with_label("a"),
            UIElement::of_type("Other")
                .with_children(vec![UIElement::of_type("Button").with_label("inner")]),
        ]);
        let buttons = tree.descendants_of_type("Button");
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].label.as_deref(), Some("inner"));
    }
}
