//! Trait for object detection inference backends.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::tracker::BoundingBox;

/// Decoded frame handed to a detector.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Raw pixel bytes (layout depends on the detector)
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> Frame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }
}

/// One detector output in TLBR pixel coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(alias = "label")]
    pub class_label: String,
}

impl Detection {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, class_label: impl Into<String>) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            class_label: class_label.into(),
        }
    }

    pub fn tlbr(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Truncate to integer pixels and convert to TLWH.
    ///
    /// Fails for non-finite coordinates, coordinates outside `i32`, or a box
    /// without positive area.
    pub fn to_bbox(&self) -> Result<BoundingBox> {
        match self.tlbr().map(to_pixel) {
            [Some(x1), Some(y1), Some(x2), Some(y2)] => {
                BoundingBox::try_from_tlbr(x1, y1, x2, y2)
            }
            _ => Err(Error::InvalidGeometry {
                width: (f64::from(self.x2) - f64::from(self.x1)) as i64,
                height: (f64::from(self.y2) - f64::from(self.y1)) as i64,
            }),
        }
    }
}

fn to_pixel(v: f32) -> Option<i32> {
    let v = f64::from(v).trunc();
    (v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX)).then_some(v as i32)
}

/// Trait for object detection inference backends.
///
/// Implement this trait to connect any detection model to the pipeline.
///
/// # Example
///
/// ```ignore
/// use speedtrap_rs::{Detection, DetectionSource, Frame};
///
/// struct MyDetector {
///     // Your model here
/// }
///
/// impl DetectionSource for MyDetector {
///     type Error = std::io::Error;
///
///     fn detect(&mut self, frame: &Frame<'_>) -> Result<Vec<Detection>, Self::Error> {
///         // Run inference and return detections
///         Ok(vec![])
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detection failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Run inference on a decoded frame and return every detection, of any class.
    fn detect(&mut self, frame: &Frame<'_>) -> Result<Vec<Detection>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bbox_truncates() {
        let det = Detection::new(10.9, 20.2, 50.7, 80.0, "car");
        assert_eq!(det.to_bbox().unwrap(), BoundingBox::new(10, 20, 40, 60));
    }

    #[test]
    fn test_to_bbox_rejects_degenerate() {
        assert!(Detection::new(50.0, 20.0, 10.0, 80.0, "car").to_bbox().is_err());
        assert!(Detection::new(10.0, 20.0, 10.5, 80.0, "car").to_bbox().is_err());
        assert!(Detection::new(f32::NAN, 20.0, 10.0, 80.0, "car").to_bbox().is_err());
    }

    #[test]
    fn test_to_bbox_rejects_out_of_range() {
        // Both edges fit in i32 but the width does not.
        assert!(matches!(
            Detection::new(-2.0e9, 0.0, 2.0e9, 10.0, "car").to_bbox(),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(matches!(
            Detection::new(-3.0e9, 0.0, 3.0e9, 10.0, "car").to_bbox(),
            Err(Error::InvalidGeometry { .. })
        ));
        assert!(Detection::new(0.0, 0.0, f32::INFINITY, 10.0, "car").to_bbox().is_err());
    }

    #[test]
    fn test_to_bbox_near_i32_limit() {
        let rect = Detection::new(2.0e9, 0.0, 2.1e9, 10.0, "car").to_bbox().unwrap();
        assert_eq!(rect, BoundingBox::new(2_000_000_000, 0, 100_000_000, 10));
        assert_eq!(rect.centroid().x, 2_050_000_000);
    }

    #[test]
    fn test_deserialize_label_alias() {
        let det: Detection =
            serde_json::from_str(r#"{"x1": 1, "y1": 2, "x2": 30, "y2": 40, "label": "bus"}"#)
                .unwrap();
        assert_eq!(det.class_label, "bus");
    }
}
