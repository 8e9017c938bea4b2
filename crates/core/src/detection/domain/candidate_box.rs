/// Axis-aligned pixel box proposed as a possible text region.
///
/// Coordinates are half-open: the box covers columns `x1..x2` and rows
/// `y1..y2`. Values come straight from a proposer and are not trusted
/// until [`CandidateBox::is_within`] has been checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl CandidateBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// True when the box has positive area.
    pub fn is_valid(&self) -> bool {
        self.x2 > self.x1 && self.y2 > self.y1
    }

    /// True when the box is valid and lies entirely inside a
    /// `width` x `height` frame.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.is_valid()
            && self.x1 >= 0
            && self.y1 >= 0
            && i64::from(self.x2) <= i64::from(width)
            && i64::from(self.y2) <= i64::from(height)
    }

    pub fn center_y(&self) -> f64 {
        (f64::from(self.y1) + f64::from(self.y2)) / 2.0
    }
}
