use nalgebra::Point2;
use serde::Serialize;

use crate::error::{Error, Result};

/// Axis-aligned bounding box in frame pixel coordinates (TLWH format).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    /// Top-left x coordinate
    pub x: i32,
    /// Top-left y coordinate
    pub y: i32,
    /// Width of the bounding box
    pub width: i32,
    /// Height of the bounding box
    pub height: i32,
}

impl BoundingBox {
    /// Create a new box from top-left coordinates and dimensions without validation.
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a box, rejecting zero or negative dimensions and edges outside `i32`.
    pub fn try_new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        let rect = Self::new(x, y, width, height);
        rect.validate()?;
        Ok(rect)
    }

    /// Create a box from TLBR format (top-left x, top-left y, bottom-right x, bottom-right y).
    pub fn try_from_tlbr(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        let width = i64::from(x2) - i64::from(x1);
        let height = i64::from(y2) - i64::from(y1);
        match (i32::try_from(width), i32::try_from(height)) {
            (Ok(w), Ok(h)) => Self::try_new(x1, y1, w, h),
            _ => Err(Error::InvalidGeometry { width, height }),
        }
    }

    /// Convert to TLBR format: (x1, y1, x2, y2), saturating at the `i32` range.
    #[inline]
    pub fn to_tlbr(&self) -> [i32; 4] {
        [
            self.x,
            self.y,
            self.x.saturating_add(self.width),
            self.y.saturating_add(self.height),
        ]
    }

    /// Convert to TLWH format: (x, y, width, height).
    #[inline]
    pub fn to_tlwh(&self) -> [i32; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Integer centroid, floored: `((2x + w) / 2, (2y + h) / 2)`.
    #[inline]
    pub fn centroid(&self) -> Point2<i64> {
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        Point2::new(
            (x + x + i64::from(self.width)).div_euclid(2),
            (y + y + i64::from(self.height)).div_euclid(2),
        )
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some()
            && self.y.checked_add(self.height).is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::InvalidGeometry {
                width: self.width.into(),
                height: self.height.into(),
            })
        }
    }
}
