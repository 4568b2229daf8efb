use serde::{Deserialize, Serialize};

/// Minimum overlap ratio for a fresh detector box to take over a tracked face.
pub const TRACKING_IOU_THRESHOLD: f64 = 0.3;

/// Axis-aligned box in pixel coordinates, corners `(x1, y1)` and `(x2, y2)`.
///
/// Serializes as `[x1, y1, x2, y2]`. A box is only usable as a detection
/// when `x1 < x2` and `y1 < y2`; padding and clamping can break that, so
/// callers re-check [`Rect::is_valid`] after transforming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub fn is_valid(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2
    }

    /// Area in pixels; zero for degenerate or inverted boxes.
    pub fn area(&self) -> i64 {
        if !self.is_valid() {
            return 0;
        }
        self.width() as i64 * self.height() as i64
    }

    /// Grows the box by `padding` pixels on every side.
    pub fn padded(&self, padding: i32) -> Rect {
        Rect {
            x1: self.x1.saturating_sub(padding),
            y1: self.y1.saturating_sub(padding),
            x2: self.x2.saturating_add(padding),
            y2: self.y2.saturating_add(padding),
        }
    }

    /// Clamps every corner into `[0, width] x [0, height]`.
    pub fn clamped(&self, width: u32, height: u32) -> Rect {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Rect {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }

    /// Intersection over union with `other`.
    ///
    /// Returns 0 when the boxes do not overlap (touching edges included) or
    /// when the union is empty.
    pub fn overlap_ratio(&self, other: &Rect) -> f64 {
        let ix1 = self.x1.max(other.x1) as i64;
        let iy1 = self.y1.max(other.y1) as i64;
        let ix2 = self.x2.min(other.x2) as i64;
        let iy2 = self.y2.min(other.y2) as i64;

        if ix2 <= ix1 || iy2 <= iy1 {
            return 0.0;
        }
        let inter = (ix2 - ix1) * (iy2 - iy1);
        let union = self.area() + other.area() - inter;
        if union <= 0 {
            return 0.0;
        }
        inter as f64 / union as f64
    }

    /// Index and ratio of the candidate with the highest overlap.
    ///
    /// Ties keep the earliest candidate. Returns `None` when no candidate
    /// overlaps at all.
    pub fn best_match(&self, candidates: &[Rect]) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            let ratio = self.overlap_ratio(candidate);
            if ratio > best.map_or(0.0, |(_, r)| r) {
                best = Some((i, ratio));
            }
        }
        best
    }
}

impl From<[i32; 4]> for Rect {
    fn from(v: [i32; 4]) -> Self {
        Rect::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect> for [i32; 4] {
    fn from(r: Rect) -> Self {
        [r.x1, r.y1, r.x2, r.y2]
    }
}

/// Free-function form of [`Rect::overlap_ratio`].
pub fn overlap_ratio(a: &Rect, b: &Rect) -> f64 {
    a.overlap_ratio(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    // ── Overlap ratio ────────────────────────────────────────────────

    #[test]
    fn test_overlap_identical_rects() {
        let a = Rect::new(10, 10, 110, 110);
        assert_relative_eq!(overlap_ratio(&a, &a), 1.0);
    }

    #[test]
    fn test_overlap_disjoint() {
        let a = Rect::new(0, 0, 50, 50);
        let b = Rect::new(100, 100, 150, 150);
        assert_eq!(overlap_ratio(&a, &b), 0.0);
    }

    #[test]
    fn test_overlap_partial() {
        // intersection 50*100 = 5000, union 10000 + 10000 - 5000
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 0, 150, 100);
        assert_relative_eq!(overlap_ratio(&a, &b), 5000.0 / 15000.0);
    }

    #[test]
    fn test_overlap_contained() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(25, 25, 75, 75);
        assert_relative_eq!(overlap_ratio(&a, &b), 2500.0 / 10000.0);
    }

    #[test]
    fn test_overlap_touching_edges_is_zero() {
        let a = Rect::new(0, 0, 50, 50);
        let b = Rect::new(50, 0, 100, 50);
        assert_eq!(overlap_ratio(&a, &b), 0.0);
    }

    #[rstest]
    #[case::zero_width(Rect::new(0, 0, 0, 100), Rect::new(0, 0, 50, 50))]
    #[case::zero_height(Rect::new(0, 0, 100, 0), Rect::new(0, 0, 50, 50))]
    #[case::inverted(Rect::new(50, 50, 0, 0), Rect::new(0, 0, 50, 50))]
    #[case::both_degenerate(Rect::new(5, 5, 5, 5), Rect::new(5, 5, 5, 5))]
    fn test_overlap_degenerate_is_zero(#[case] a: Rect, #[case] b: Rect) {
        assert_eq!(overlap_ratio(&a, &b), 0.0);
    }

    #[rstest]
    #[case(Rect::new(0, 0, 100, 100), Rect::new(50, 0, 150, 100))]
    #[case(Rect::new(0, 0, 10, 10), Rect::new(5, 5, 15, 15))]
    #[case(Rect::new(3, 7, 40, 90), Rect::new(20, 1, 33, 60))]
    #[case(Rect::new(0, 0, 50, 50), Rect::new(200, 200, 250, 250))]
    #[case(Rect::new(0, 0, 0, 10), Rect::new(0, 0, 10, 10))]
    fn test_overlap_is_symmetric(#[case] a: Rect, #[case] b: Rect) {
        assert_eq!(overlap_ratio(&a, &b), overlap_ratio(&b, &a));
    }

    // ── Best match ───────────────────────────────────────────────────

    #[test]
    fn test_best_match_picks_highest_overlap() {
        let tracked = Rect::new(0, 0, 100, 100);
        let candidates = [
            Rect::new(60, 0, 160, 100),
            Rect::new(10, 0, 110, 100),
            Rect::new(300, 300, 400, 400),
        ];
        let (idx, ratio) = tracked.best_match(&candidates).unwrap();
        assert_eq!(idx, 1);
        assert_relative_eq!(ratio, 9000.0 / 11000.0);
    }

    #[test]
    fn test_best_match_tie_keeps_first_seen() {
        let tracked = Rect::new(50, 0, 150, 100);
        let candidates = [Rect::new(0, 0, 100, 100), Rect::new(100, 0, 200, 100)];
        let (idx, _) = tracked.best_match(&candidates).unwrap();
        assert_eq!(idx, 0);
    }

    #[test]
    fn test_best_match_none_without_overlap() {
        let tracked = Rect::new(0, 0, 10, 10);
        assert!(tracked.best_match(&[Rect::new(20, 20, 30, 30)]).is_none());
        assert!(tracked.best_match(&[]).is_none());
    }

    // ── Padding and clamping ─────────────────────────────────────────

    #[test]
    fn test_padded_expands_all_sides() {
        assert_eq!(Rect::new(10, 20, 30, 40).padded(3), Rect::new(7, 17, 33, 43));
    }

    #[test]
    fn test_clamped_to_frame_bounds() {
        let r = Rect::new(-5, -2, 130, 90).clamped(100, 80);
        assert_eq!(r, Rect::new(0, 0, 100, 80));
    }

    #[test]
    fn test_clamp_can_produce_invalid_rect() {
        let r = Rect::new(120, 10, 140, 20).clamped(100, 80);
        assert_eq!(r, Rect::new(100, 10, 100, 20));
        assert!(!r.is_valid());
        assert_eq!(r.area(), 0);
    }

    #[test]
    fn test_serializes_as_corner_array() {
        let json = serde_json::to_string(&Rect::new(1, 2, 3, 4)).unwrap();
        assert_eq!(json, "[1,2,3,4]");
        let back: Rect = serde_json::from_str("[5,6,7,8]").unwrap();
        assert_eq!(back, Rect::new(5, 6, 7, 8));
    }

    #[test]
    fn test_tracking_threshold_constant() {
        assert_relative_eq!(TRACKING_IOU_THRESHOLD, 0.3);
    }
}
