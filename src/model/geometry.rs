//! Page geometry.
//!
//! All coordinates in the model use a top-left page origin with `y`
//! growing downward, in PDF points. The extractor converts from PDF user
//! space (bottom-left origin) once, so every heuristic downstream can sort
//! ascending by `y` for top-to-bottom order.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width (non-negative)
    pub width: f32,
    /// Height (non-negative)
    pub height: f32,
}

impl Rect {
    /// Create a rectangle from origin and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Create a rectangle from two corner points in any order.
    pub fn from_edges(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (left, right) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(left, top, right - left, bottom - top)
    }

    /// Smallest rectangle containing all `points`.
    pub fn bounding(points: impl IntoIterator<Item = (f32, f32)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (fx, fy) = iter.next()?;
        let (mut x0, mut y0, mut x1, mut y1) = (fx, fy, fx, fy);
        for (x, y) in iter {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Some(Self::from_edges(x0, y0, x1, y1))
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether all coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Grow by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Rect {
        Rect::from_edges(
            self.x - margin,
            self.y - margin,
            self.right() + margin,
            self.bottom() + margin,
        )
    }

    /// Length of the shared horizontal extent (0 if disjoint).
    pub fn horizontal_overlap(&self, other: &Rect) -> f32 {
        (self.right().min(other.right()) - self.x.max(other.x)).max(0.0)
    }

    /// Length of the shared vertical extent (0 if disjoint).
    pub fn vertical_overlap(&self, other: &Rect) -> f32 {
        (self.bottom().min(other.bottom()) - self.y.max(other.y)).max(0.0)
    }

    /// Whether the rectangles touch or overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    /// Whether `other` lies inside this rectangle, allowing `tolerance`.
    pub fn contains_rect(&self, other: &Rect, tolerance: f32) -> bool {
        other.x >= self.x - tolerance
            && other.y >= self.y - tolerance
            && other.right() <= self.right() + tolerance
            && other.bottom() <= self.bottom() + tolerance
    }

    /// Whether the point lies inside (edges inclusive).
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    /// The part of this rectangle inside `bounds`, `None` when disjoint.
    pub fn clip(&self, bounds: &Rect) -> Option<Rect> {
        if !self.is_finite() || !self.intersects(bounds) {
            return None;
        }
        Some(Rect::from_edges(
            self.x.max(bounds.x),
            self.y.max(bounds.y),
            self.right().min(bounds.right()),
            self.bottom().min(bounds.bottom()),
        ))
    }
}

/// Uncovered stretches strictly between the `(start, end)` intervals, in
/// ascending order. Space before the first and after the last interval is
/// not a gap.
pub fn interior_gaps(mut intervals: Vec<(f32, f32)>) -> Vec<(f32, f32)> {
    intervals.retain(|(start, end)| start.is_finite() && end.is_finite());
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut gaps = Vec::new();
    let mut reach: Option<f32> = None;
    for (start, end) in intervals {
        reach = Some(match reach {
            Some(covered) if start > covered => {
                gaps.push((covered, start));
                end
            }
            Some(covered) => covered.max(end),
            None => end,
        });
    }
    gaps
}

fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

impl Serialize for Rect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [
            round2(self.x),
            round2(self.y),
            round2(self.width),
            round2(self.height),
        ]
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Rect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [x, y, width, height] = <[f32; 4]>::deserialize(deserializer)?;
        Ok(Rect::new(x, y, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_normalizes() {
        let r = Rect::from_edges(10.0, 50.0, 0.0, 20.0);
        assert_eq!(r, Rect::new(0.0, 20.0, 10.0, 30.0));
    }

    #[test]
    fn test_overlaps() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 8.0, 10.0, 10.0);
        assert_eq!(a.horizontal_overlap(&b), 5.0);
        assert_eq!(a.vertical_overlap(&b), 2.0);
        assert!(a.intersects(&b));

        let c = Rect::new(20.0, 0.0, 5.0, 5.0);
        assert_eq!(a.horizontal_overlap(&c), 0.0);
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_contains_with_tolerance() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains_rect(&Rect::new(10.0, 10.0, 20.0, 20.0), 0.0));
        assert!(!outer.contains_rect(&Rect::new(-1.0, 10.0, 20.0, 20.0), 0.0));
        assert!(outer.contains_rect(&Rect::new(-1.0, 10.0, 20.0, 20.0), 2.0));
    }

    #[test]
    fn test_serialize_as_array() {
        let r = Rect::new(1.0, 2.5, 3.333, 4.0);
        assert_eq!(serde_json::to_string(&r).unwrap(), "[1.0,2.5,3.33,4.0]");
        let back: Rect = serde_json::from_str("[1,2,3,4]").unwrap();
        assert_eq!(back, Rect::new(1.0, 2.0, 3.0, 4.0));
    }

    #[test]
    fn test_clip_to_page() {
        let page = Rect::new(0.0, 0.0, 612.0, 792.0);
        let wide = Rect::new(500.0, 100.0, 1.0e15, 10.0);
        assert_eq!(wide.clip(&page), Some(Rect::new(500.0, 100.0, 112.0, 10.0)));
        assert_eq!(Rect::new(1.0e15, 100.0, 20.0, 10.0).clip(&page), None);
        assert_eq!(Rect::new(f32::NAN, 0.0, 1.0, 1.0).clip(&page), None);
    }

    #[test]
    fn test_interior_gaps() {
        let gaps = interior_gaps(vec![(50.0, 60.0), (0.0, 10.0), (5.0, 20.0), (1.0e15, 1.0e15 + 5.0)]);
        assert_eq!(gaps, vec![(20.0, 50.0), (60.0, 1.0e15)]);
        assert!(interior_gaps(vec![(0.0, 10.0), (10.0, 20.0)]).is_empty());
        assert!(interior_gaps(Vec::new()).is_empty());
    }

    #[test]
    fn test_bounding() {
        let r = Rect::bounding([(5.0, 5.0), (1.0, 9.0), (3.0, 2.0)]).unwrap();
        assert_eq!(r, Rect::new(1.0, 2.0, 4.0, 7.0));
        assert!(Rect::bounding(std::iter::empty()).is_none());
    }
}
