//! Screen-space geometry primitives.
//!
//! All coordinates are in screen points with the origin at the top-left
//! corner of the screen and `y` growing downwards, matching the frames
//! reported by the accessibility hierarchy.
//!
//! [`Vector`] is used in two unit systems: absolute screen points when
//! measuring distances, and offsets normalized to a reference frame when
//! addressing gesture points (see [`Rect::normalize`]).

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The vector that moves `self` onto `other`.
    pub fn vector_to(self, other: Point) -> Vector {
        Vector::new(other.x - self.x, other.y - self.y)
    }
}

impl Add<Vector> for Point {
    type Output = Point;

    fn add(self, v: Vector) -> Point {
        Point::new(self.x + v.dx, self.y + v.dy)
    }
}


/// A 2D offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { dx: 0.0, dy: 0.0 };

    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Manhattan norm, `|dx| + |dy|`.
    ///
    /// Used as the convergence metric of the scroll search: it shrinks
    /// whenever the target gets closer along either axis.
    pub fn manhattan(self) -> f64 {
        self.dx.abs() + self.dy.abs()
    }

    /// Clamps each axis independently to `[-limit, limit]`.
    ///
    /// Negative limits are treated as zero.
    pub fn clamp(self, limit: Vector) -> Vector {
        let lx = limit.dx.max(0.0);
        let ly = limit.dy.max(0.0);
        Vector::new(self.dx.clamp(-lx, lx), self.dy.clamp(-ly, ly))
    }

    /// Component-wise scaling.
    pub fn scale(self, by: Vector) -> Vector {
        Vector::new(self.dx * by.dx, self.dy * by.dy)
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, other: Vector) -> Vector {
        Vector::new(self.dx + other.dx, self.dy + other.dy)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, other: Vector) -> Vector {
        Vector::new(self.dx - other.dx, self.dy - other.dy)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, k: f64) -> Vector {
        Vector::new(self.dx * k, self.dy * k)
    }
}

/// An axis-aligned rectangle stored as its two extreme corners.
///
/// `Rect` is a plain value: frames read from the live UI are never cached
/// inside one, callers re-read them whenever layout may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rect {
    /// Creates a rectangle from its corners, normalizing their order.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            min_x: x1.min(x2),
            min_y: y1.min(y2),
            max_x: x1.max(x2),
            max_y: y1.max(y2),
        }
    }

    /// Creates a rectangle from an origin and a size.
    ///
    /// Negative sizes are treated as zero.
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x + width.max(0.0),
            max_y: y + height.max(0.0),
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Returns true if the rectangle encloses no area.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Edge-inclusive containment test.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x
            && point.x <= self.max_x
            && point.y >= self.min_y
            && point.y <= self.max_y
    }

    /// Returns true if `other` lies entirely within `self`.
    pub fn encloses(&self, other: &Rect) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Returns the rectangle moved by `by`.
    pub fn offset(&self, by: Vector) -> Rect {
        Rect {
            min_x: self.min_x + by.dx,
            min_y: self.min_y + by.dy,
            max_x: self.max_x + by.dx,
            max_y: self.max_y + by.dy,
        }
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// The size as a vector, handy for per-axis scaling.
    pub fn extent(&self) -> Vector {
        Vector::new(self.width(), self.height())
    }

    /// Expresses an absolute vector in units of this rectangle's size.
    ///
    /// A vector spanning the full width maps to `dx = 1.0`. Zero-sized axes
    /// map to `0.0`.
    pub fn normalize(&self, v: Vector) -> Vector {
        Vector::new(ratio(v.dx, self.width()), ratio(v.dy, self.height()))
    }

    /// Expresses an absolute point as an offset from this rectangle's
    /// origin, in units of its size (`(0,0)` top-left, `(1,1)` bottom-right).
    pub fn normalized_offset(&self, p: Point) -> Vector {
        self.normalize(self.origin().vector_to(p))
    }

    /// Inverse of [`normalized_offset`](Self::normalized_offset).
    pub fn point_at(&self, offset: Vector) -> Point {
        self.origin() + offset.scale(self.extent())
    }
}

fn ratio(value: f64, span: f64) -> f64 {
    if span > 0.0 {
        value / span
    } else {
        0.0
    }
}
