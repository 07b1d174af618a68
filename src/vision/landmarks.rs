//! Face-mesh landmark frames and the eye contours cut out of them.

use serde::{Deserialize, Serialize};

/// Minimum number of points a face-mesh frame must carry.
pub const FACE_MESH_POINTS: usize = 468;

/// Contour indices for the subject's right eye (left side of the image),
/// ordered corner, upper, upper, corner, lower, lower.
pub const LEFT_EYE_EAR_POINTS: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Contour indices for the subject's left eye (right side of the image).
pub const RIGHT_EYE_EAR_POINTS: [usize; 6] = [362, 385, 387, 263, 373, 380];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Planar distance; depth is ignored.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One detector callback worth of landmarks. Consumed once, never retained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkFrame {
    pub points: Vec<Point>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EyeContours {
    pub left: Vec<Point>,
    pub right: Vec<Point>,
}

impl EyeContours {
    /// Both contours carry the six points EAR needs.
    pub fn is_complete(&self) -> bool {
        self.left.len() == 6 && self.right.len() == 6
    }
}

/// Pull both six-point eye contours out of a frame.
///
/// Frames shorter than [`FACE_MESH_POINTS`] yield two empty contours.
pub fn extract_eye_contours(frame: &LandmarkFrame) -> EyeContours {
    if frame.len() < FACE_MESH_POINTS {
        return EyeContours::default();
    }

    let pick = |indices: &[usize; 6]| indices.iter().map(|&i| frame.points[i]).collect();

    EyeContours {
        left: pick(&LEFT_EYE_EAR_POINTS),
        right: pick(&RIGHT_EYE_EAR_POINTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_frame_yields_empty_contours() {
        let frame = LandmarkFrame::new(vec![Point::default(); 467]);
        let contours = extract_eye_contours(&frame);
        assert!(contours.left.is_empty());
        assert!(contours.right.is_empty());
        assert!(!contours.is_complete());
    }

    #[test]
    fn test_contours_follow_index_lists() {
        let points = (0..FACE_MESH_POINTS)
            .map(|i| Point::new(i as f64, 0.0))
            .collect();
        let contours = extract_eye_contours(&LandmarkFrame::new(points));

        let left_x: Vec<f64> = contours.left.iter().map(|p| p.x).collect();
        assert_eq!(left_x, vec![33.0, 160.0, 158.0, 133.0, 153.0, 144.0]);
        assert_eq!(contours.right[3].x, 263.0);
        assert!(contours.is_complete());
    }

    #[test]
    fn test_frame_deserializes_from_point_array() {
        let frame: LandmarkFrame =
            serde_json::from_str(r#"[{"x":0.5,"y":0.25,"z":-0.1},{"x":1.0,"y":2.0}]"#).unwrap();
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.points[1].z, 0.0);
    }
}
