//! Eye Aspect Ratio.
//!
//! `EAR = (|p1-p5| + |p2-p4|) / (2 * |p0-p3|)` where p0/p3 are the eye
//! corners and (p1,p5), (p2,p4) the vertical lid pairs. Open eyes sit
//! around 0.3; a closed lid drives the ratio toward 0.
//!
//! Every degenerate input returns 0, which callers read as "no signal".

use super::landmarks::Point;

pub fn eye_aspect_ratio(contour: &[Point]) -> f64 {
    if contour.len() != 6 {
        return 0.0;
    }

    let horizontal = contour[0].distance(&contour[3]);
    if horizontal == 0.0 || !horizontal.is_finite() {
        return 0.0;
    }

    let vertical1 = contour[1].distance(&contour[5]);
    let vertical2 = contour[2].distance(&contour[4]);
    let ear = (vertical1 + vertical2) / (2.0 * horizontal);

    if ear.is_finite() {
        ear
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Eye 0.2 wide with both lid pairs `gap` apart.
    fn contour(gap: f64) -> Vec<Point> {
        let half = gap / 2.0;
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.066, -half),
            Point::new(0.133, -half),
            Point::new(0.2, 0.0),
            Point::new(0.133, half),
            Point::new(0.066, half),
        ]
    }

    #[test]
    fn test_open_eye_ratio() {
        let ear = eye_aspect_ratio(&contour(0.06));
        assert!((ear - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_length_is_zero() {
        assert_eq!(eye_aspect_ratio(&[]), 0.0);
        assert_eq!(eye_aspect_ratio(&contour(0.06)[..5]), 0.0);
        let mut seven = contour(0.06);
        seven.push(Point::default());
        assert_eq!(eye_aspect_ratio(&seven), 0.0);
    }

    #[test]
    fn test_collapsed_corners_is_zero() {
        let mut points = contour(0.06);
        points[3] = points[0];
        assert_eq!(eye_aspect_ratio(&points), 0.0);
    }

    #[test]
    fn test_nan_coordinates_are_zero() {
        let mut points = contour(0.06);
        points[1] = Point::new(f64::NAN, 0.0);
        assert_eq!(eye_aspect_ratio(&points), 0.0);
    }

    proptest! {
        #[test]
        fn ear_is_never_negative(coords in proptest::collection::vec((-2.0f64..2.0, -2.0f64..2.0), 6)) {
            let points: Vec<Point> = coords.into_iter().map(|(x, y)| Point::new(x, y)).collect();
            prop_assert!(eye_aspect_ratio(&points) >= 0.0);
        }

        #[test]
        fn non_six_point_contours_are_zero(len in 0usize..12) {
            prop_assume!(len != 6);
            let points = vec![Point::new(0.1, 0.2); len];
            prop_assert_eq!(eye_aspect_ratio(&points), 0.0);
        }
    }
}
