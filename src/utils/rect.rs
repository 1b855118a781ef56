use serde::{Deserialize, Serialize};

/// Half-open integer pixel rectangle `[left, right) x [top, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Default for Rect {
    fn default() -> Self {
        Self::empty()
    }
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn empty() -> Self {
        Self {
            left: i32::MAX,
            top: i32::MAX,
            right: i32::MIN,
            bottom: i32::MIN,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left >= self.right || self.top >= self.bottom
    }

    pub fn width(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            (self.right - self.left) as u32
        }
    }

    pub fn height(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            (self.bottom - self.top) as u32
        }
    }

    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    /// Grow to include the single pixel at (x, y).
    pub fn include(&mut self, x: i32, y: i32) {
        self.left = self.left.min(x);
        self.top = self.top.min(y);
        self.right = self.right.max(x + 1);
        self.bottom = self.bottom.max(y + 1);
    }

    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Rect::new(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right.max(other.right),
            self.bottom.max(other.bottom),
        )
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.left.max(other.left),
            self.top.max(other.top),
            self.right.min(other.right),
            self.bottom.min(other.bottom),
        );
        if r.is_empty() { Rect::empty() } else { r }
    }

    /// Clamp to the canvas `[0, width) x [0, height)`.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        self.intersect(&Rect::new(0, 0, width as i32, height as i32))
    }

    pub fn inflate(&self, by: i32) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect::new(
            self.left.saturating_sub(by),
            self.top.saturating_sub(by),
            self.right.saturating_add(by),
            self.bottom.saturating_add(by),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        if self.is_empty() {
            return *self;
        }
        Rect::new(self.left + dx, self.top + dy, self.right + dx, self.bottom + dy)
    }

    /// Iterate pixel coordinates row by row.
    pub fn pixels(self) -> impl Iterator<Item = (i32, i32)> {
        let r = self;
        let (left, right) = if r.is_empty() { (0, 0) } else { (r.left, r.right) };
        let (top, bottom) = if r.is_empty() { (0, 0) } else { (r.top, r.bottom) };
        (top..bottom).flat_map(move |y| (left..right).map(move |x| (x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_grows_from_empty() {
        let mut r = Rect::empty();
        assert!(r.is_empty());
        r.include(3, 4);
        assert_eq!(r, Rect::new(3, 4, 4, 5));
        r.include(1, 9);
        assert_eq!(r, Rect::new(1, 4, 4, 10));
        assert_eq!(r.area(), 18);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Rect::from_xywh(0, 0, 10, 10);
        let b = Rect::from_xywh(20, 20, 5, 5);
        assert!(a.intersect(&b).is_empty());
        assert_eq!(a.union(&b), Rect::new(0, 0, 25, 25));
    }

    #[test]
    fn pixels_walks_rows() {
        let cells: Vec<_> = Rect::from_xywh(1, 1, 2, 2).pixels().collect();
        assert_eq!(cells, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
        assert_eq!(Rect::empty().pixels().count(), 0);
    }
}
