use serde::Deserialize;

/// Horizontal reference line with a symmetric tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ReferenceLine {
    /// Line position in frame pixels
    pub y: i32,
    /// Half-width of the band in pixels
    pub offset: i32,
}

impl ReferenceLine {
    pub fn new(y: i32, offset: i32) -> Self {
        Self { y, offset }
    }

    /// Whether `cy` lies strictly inside `(y - offset, y + offset)`.
    #[inline]
    pub fn contains(&self, cy: i64) -> bool {
        let (y, offset) = (i64::from(self.y), i64::from(self.offset));
        y - offset < cy && cy < y + offset
    }
}
