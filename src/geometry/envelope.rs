//! Axis-aligned bounding boxes
//!
//! Used for tiles, search extents and processing perimeters. All
//! intersection tests are closed (touching boxes intersect).

use rstar::AABB;
use serde::{Deserialize, Serialize};

use super::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zmin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zmax: Option<f64>,
}

impl Envelope {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self { xmin, ymin, xmax, ymax, zmin: None, zmax: None }
    }

    pub fn from_point(p: &Point) -> Self {
        Self {
            xmin: p.x,
            ymin: p.y,
            xmax: p.x,
            ymax: p.y,
            zmin: p.z,
            zmax: p.z,
        }
    }

    /// Bounds of a point set; z range only when every point has z
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut env = Self::from_point(first);
        for p in rest {
            env.xmin = env.xmin.min(p.x);
            env.ymin = env.ymin.min(p.y);
            env.xmax = env.xmax.max(p.x);
            env.ymax = env.ymax.max(p.y);
            match (env.zmin, env.zmax, p.z) {
                (Some(lo), Some(hi), Some(z)) => {
                    env.zmin = Some(lo.min(z));
                    env.zmax = Some(hi.max(z));
                }
                _ => {
                    env.zmin = None;
                    env.zmax = None;
                }
            }
        }
        Some(env)
    }

    /// NaN or inverted bounds
    pub fn is_empty(&self) -> bool {
        !(self.xmin <= self.xmax && self.ymin <= self.ymax)
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn lower_left(&self) -> Point {
        Point::new(self.xmin, self.ymin)
    }

    /// Grow outward by `distance` on all four sides
    pub fn expand(&self, distance: f64) -> Self {
        Self {
            xmin: self.xmin - distance,
            ymin: self.ymin - distance,
            xmax: self.xmax + distance,
            ymax: self.ymax + distance,
            zmin: self.zmin,
            zmax: self.zmax,
        }
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.xmin && p.x <= self.xmax && p.y >= self.ymin && p.y <= self.ymax
    }

    pub fn union(&self, other: &Envelope) -> Self {
        let z = |a: Option<f64>, b: Option<f64>, f: fn(f64, f64) -> f64| match (a, b) {
            (Some(a), Some(b)) => Some(f(a, b)),
            _ => None,
        };
        Self {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
            zmin: z(self.zmin, other.zmin, f64::min),
            zmax: z(self.zmax, other.zmax, f64::max),
        }
    }

    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.xmin, self.ymin], [self.xmax, self.ymax])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_envelopes_intersect() {
        let a = Envelope::new(0.0, 0.0, 10.0, 10.0);
        let b = Envelope::new(10.0, 0.0, 20.0, 10.0);
        let c = Envelope::new(10.5, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.expand(0.5).intersects(&c));
    }

    #[test]
    fn test_z_range_requires_all_z() {
        let env = Envelope::from_points(&[
            Point::with_z(0.0, 0.0, 5.0),
            Point::with_z(1.0, 1.0, 2.0),
        ])
        .unwrap();
        assert_eq!(env.zmin, Some(2.0));
        assert_eq!(env.zmax, Some(5.0));

        let env = Envelope::from_points(&[Point::with_z(0.0, 0.0, 5.0), Point::new(1.0, 1.0)]).unwrap();
        assert_eq!(env.zmin, None);
    }

    #[test]
    fn test_nan_envelope_is_empty() {
        assert!(Envelope::new(f64::NAN, 0.0, 1.0, 1.0).is_empty());
        assert!(Envelope::new(2.0, 0.0, 1.0, 1.0).is_empty());
        assert!(!Envelope::new(1.0, 1.0, 1.0, 1.0).is_empty());
    }
}
