//! 2D collision outlines
//!
//! An outline is the footprint an entity occupies on the ground plane. It is
//! either empty, a circle, or a rectangle defined in local space and placed
//! in the world with a translation and a rotation around Z.

use glam::Vec2;
use std::ops::{Add, Mul};

/// Result of testing two shapes against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    Disjoint,
    Intersects,
    /// One shape lies completely inside the other
    Contains,
}

/// Ground footprint of an entity
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Outline {
    #[default]
    Empty,
    Circle {
        center: Vec2,
        radius: f32,
    },
    /// `min`/`max` are in local space, placed by `position` and `rotation`
    Rectangle {
        min: Vec2,
        max: Vec2,
        position: Vec2,
        rotation: f32,
    },
}

/// Transform a world point into the local space of a placed shape
pub fn world_to_local(p: Vec2, translation: Vec2, rotation: f32) -> Vec2 {
    let p = p - translation;
    let (sin, cos) = (-rotation).sin_cos();
    Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos)
}

/// Transform a local point of a placed shape into world space
pub fn local_to_world(p: Vec2, translation: Vec2, rotation: f32) -> Vec2 {
    let (sin, cos) = rotation.sin_cos();
    Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos) + translation
}

fn distance_to_segment_squared(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    let dot_a = (p - a).dot(b - a);
    if dot_a <= 0.0 {
        return a.distance_squared(p);
    }
    let dot_b = (p - b).dot(a - b);
    if dot_b <= 0.0 {
        return b.distance_squared(p);
    }
    let closest = a + (b - a) * dot_a / (dot_a + dot_b);
    p.distance_squared(closest)
}

/// Proper intersection of segments `ab` and `cd` (touching endpoints do not count)
fn segments_intersect(a: Vec2, b: Vec2, c: Vec2, d: Vec2) -> bool {
    let r_top = (a.y - c.y) * (d.x - c.x) - (a.x - c.x) * (d.y - c.y);
    let s_top = (a.y - c.y) * (b.x - a.x) - (a.x - c.x) * (b.y - a.y);
    let bot = (b.x - a.x) * (d.y - c.y) - (b.y - a.y) * (d.x - c.x);

    if bot == 0.0 {
        // Parallel: only collinear overlap counts
        return r_top.abs() < f32::EPSILON && s_top.abs() < f32::EPSILON;
    }

    let r = r_top / bot;
    let s = s_top / bot;
    r > 0.0 && r < 1.0 && s > 0.0 && s < 1.0
}

fn point_in_local_rectangle(p: Vec2, min: Vec2, max: Vec2) -> bool {
    p.x > min.x && p.x < max.x && p.y > min.y && p.y < max.y
}

fn point_in_circle(p: Vec2, center: Vec2, radius: f32) -> bool {
    p.distance_squared(center) < radius * radius
}

impl Outline {
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Outline::Circle { center, radius }
    }

    pub fn rectangle(min: Vec2, max: Vec2, position: Vec2, rotation: f32) -> Self {
        Outline::Rectangle {
            min,
            max,
            position,
            rotation,
        }
    }

    /// Rectangle of `size` centered on `position`
    pub fn centered_rectangle(size: Vec2, position: Vec2, rotation: f32) -> Self {
        Self::rectangle(-size * 0.5, size * 0.5, position, rotation)
    }

    /// World position of the shape's origin
    pub fn position(&self) -> Vec2 {
        match *self {
            Outline::Empty => Vec2::ZERO,
            Outline::Circle { center, .. } => center,
            Outline::Rectangle { position, .. } => position,
        }
    }

    /// Circle radius, or the bounding radius of a rectangle around its origin
    pub fn radius(&self) -> f32 {
        match *self {
            Outline::Empty => 0.0,
            Outline::Circle { radius, .. } => radius,
            Outline::Rectangle { min, max, .. } => min.length().max(max.length()),
        }
    }

    pub fn area(&self) -> f32 {
        match *self {
            Outline::Empty => 0.0,
            Outline::Circle { radius, .. } => std::f32::consts::PI * radius * radius,
            Outline::Rectangle { min, max, .. } => {
                let c = max - min;
                c.x * c.y
            }
        }
    }

    /// World space corners of a rectangle, counter clockwise from min
    pub fn corners(&self) -> Option<[Vec2; 4]> {
        match *self {
            Outline::Rectangle {
                min,
                max,
                position,
                rotation,
            } => Some([
                local_to_world(min, position, rotation),
                local_to_world(Vec2::new(max.x, min.y), position, rotation),
                local_to_world(max, position, rotation),
                local_to_world(Vec2::new(min.x, max.y), position, rotation),
            ]),
            _ => None,
        }
    }

    /// World space axis aligned bounds as `(min, max)`
    pub fn bounds(&self) -> (Vec2, Vec2) {
        match *self {
            Outline::Empty => (Vec2::ZERO, Vec2::ZERO),
            Outline::Circle { center, radius } => {
                (center - Vec2::splat(radius), center + Vec2::splat(radius))
            }
            Outline::Rectangle { .. } => {
                let corners = self.corners().unwrap_or([Vec2::ZERO; 4]);
                let mut lo = Vec2::splat(f32::MAX);
                let mut hi = Vec2::splat(f32::MIN);
                for c in corners {
                    lo = lo.min(c);
                    hi = hi.max(c);
                }
                (lo, hi)
            }
        }
    }

    /// Strict point containment; points on the border are outside
    pub fn overlaps(&self, point: Vec2) -> bool {
        match *self {
            Outline::Empty => false,
            Outline::Circle { center, radius } => point_in_circle(point, center, radius),
            Outline::Rectangle {
                min,
                max,
                position,
                rotation,
            } => point_in_local_rectangle(world_to_local(point, position, rotation), min, max),
        }
    }

    /// Distance from the border to `point`, 0 when inside
    pub fn distance_to(&self, point: Vec2) -> f32 {
        match *self {
            Outline::Empty => 0.0,
            Outline::Circle { center, radius } => (point.distance(center) - radius).max(0.0),
            Outline::Rectangle {
                min,
                max,
                position,
                rotation,
            } => {
                let p = world_to_local(point, position, rotation);
                let clamped = p.clamp(min, max);
                p.distance(clamped)
            }
        }
    }

    /// Tri-state shape test. Empty outlines never intersect anything.
    pub fn intersects(&self, other: &Outline) -> Containment {
        match (*self, *other) {
            (Outline::Empty, _) | (_, Outline::Empty) => Containment::Disjoint,
            (
                Outline::Circle {
                    center: c1,
                    radius: r1,
                },
                Outline::Circle {
                    center: c2,
                    radius: r2,
                },
            ) => {
                let d = c1.distance(c2);
                if d < r1 + r2 {
                    if d < (r1 - r2).abs() {
                        Containment::Contains
                    } else {
                        Containment::Intersects
                    }
                } else {
                    Containment::Disjoint
                }
            }
            (Outline::Rectangle { .. }, Outline::Rectangle { .. }) => {
                rectangle_rectangle(self, other)
            }
            (Outline::Rectangle { .. }, Outline::Circle { center, radius })
            | (Outline::Circle { center, radius }, Outline::Rectangle { .. }) => {
                let rect = if matches!(self, Outline::Rectangle { .. }) {
                    self
                } else {
                    other
                };
                rectangle_circle(rect, center, radius)
            }
        }
    }
}

fn rectangle_rectangle(a: &Outline, b: &Outline) -> Containment {
    let (Some(ca), Some(cb)) = (a.corners(), b.corners()) else {
        return Containment::Disjoint;
    };

    for i in 0..4 {
        for j in 0..4 {
            if segments_intersect(ca[i], ca[(i + 1) % 4], cb[j], cb[(j + 1) % 4]) {
                return Containment::Intersects;
            }
        }
    }

    let a_in_b = ca.iter().all(|&p| b.overlaps(p) || b.distance_to(p) == 0.0);
    let b_in_a = cb.iter().all(|&p| a.overlaps(p) || a.distance_to(p) == 0.0);
    if a_in_b || b_in_a {
        Containment::Contains
    } else {
        Containment::Disjoint
    }
}

fn rectangle_circle(rect: &Outline, center: Vec2, radius: f32) -> Containment {
    let Some(corners) = rect.corners() else {
        return Containment::Disjoint;
    };

    // Rectangle swallowed by the circle
    if corners.iter().all(|&p| point_in_circle(p, center, radius)) {
        return Containment::Contains;
    }

    let r_sq = radius * radius;
    for i in 0..4 {
        if distance_to_segment_squared(corners[i], corners[(i + 1) % 4], center) < r_sq {
            return Containment::Intersects;
        }
    }

    // Circle entirely inside the rectangle
    if rect.overlaps(center) {
        return Containment::Contains;
    }

    Containment::Disjoint
}

impl Mul<f32> for Outline {
    type Output = Outline;

    /// Scale the shape around its origin
    fn mul(self, n: f32) -> Outline {
        match self {
            Outline::Empty => Outline::Empty,
            Outline::Circle { center, radius } => Outline::Circle {
                center,
                radius: radius * n,
            },
            Outline::Rectangle {
                min,
                max,
                position,
                rotation,
            } => Outline::Rectangle {
                min: min * n,
                max: max * n,
                position,
                rotation,
            },
        }
    }
}

impl Add<f32> for Outline {
    type Output = Outline;

    /// Grow (or shrink with a negative `n`) the border, never inverting the shape
    fn add(self, n: f32) -> Outline {
        match self {
            Outline::Empty => Outline::Empty,
            Outline::Circle { center, radius } => Outline::Circle {
                center,
                radius: (radius + n).max(0.0),
            },
            Outline::Rectangle {
                min,
                max,
                position,
                rotation,
            } => {
                let max = max + Vec2::splat(n);
                let min = (min - Vec2::splat(n)).min(max);
                Outline::Rectangle {
                    min,
                    max,
                    position,
                    rotation,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_local_world_round_trip() {
        let p = Vec2::new(3.0, -2.0);
        let world = local_to_world(p, Vec2::new(10.0, 5.0), 0.7);
        let back = world_to_local(world, Vec2::new(10.0, 5.0), 0.7);
        assert!(p.distance(back) < 1e-4);
    }

    #[test]
    fn test_circle_overlap_is_strict() {
        let c = Outline::circle(Vec2::ZERO, 2.0);
        assert!(c.overlaps(Vec2::new(1.0, 1.0)));
        assert!(!c.overlaps(Vec2::new(2.0, 0.0)));
    }

    #[test]
    fn test_rotated_rectangle_overlap() {
        // 10x2 bar rotated to stand along Y
        let r = Outline::centered_rectangle(Vec2::new(10.0, 2.0), Vec2::ZERO, FRAC_PI_2);
        assert!(r.overlaps(Vec2::new(0.0, 4.0)));
        assert!(!r.overlaps(Vec2::new(4.0, 0.0)));
    }

    #[test]
    fn test_distance_to_clamps_at_zero() {
        let c = Outline::circle(Vec2::ZERO, 2.0);
        assert_eq!(c.distance_to(Vec2::new(1.0, 0.0)), 0.0);
        assert!((c.distance_to(Vec2::new(5.0, 0.0)) - 3.0).abs() < 1e-5);

        let r = Outline::centered_rectangle(Vec2::new(4.0, 4.0), Vec2::ZERO, 0.0);
        assert_eq!(r.distance_to(Vec2::new(1.0, 1.0)), 0.0);
        assert!((r.distance_to(Vec2::new(5.0, 0.0)) - 3.0).abs() < 1e-5);
        // Corner region measures to the corner
        assert!((r.distance_to(Vec2::new(5.0, 6.0)) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_circle_intersection() {
        let a = Outline::circle(Vec2::ZERO, 5.0);
        assert_eq!(
            a.intersects(&Outline::circle(Vec2::new(1.0, 0.0), 1.0)),
            Containment::Contains
        );
        assert_eq!(
            a.intersects(&Outline::circle(Vec2::new(6.0, 0.0), 2.0)),
            Containment::Intersects
        );
        assert_eq!(
            a.intersects(&Outline::circle(Vec2::new(20.0, 0.0), 2.0)),
            Containment::Disjoint
        );
    }

    #[test]
    fn test_rectangle_rectangle_intersection() {
        let a = Outline::centered_rectangle(Vec2::new(4.0, 4.0), Vec2::ZERO, 0.0);
        let crossing = Outline::centered_rectangle(Vec2::new(4.0, 4.0), Vec2::new(3.0, 0.5), 0.3);
        let inner = Outline::centered_rectangle(Vec2::new(1.0, 1.0), Vec2::ZERO, 0.5);
        let far = Outline::centered_rectangle(Vec2::new(1.0, 1.0), Vec2::new(50.0, 0.0), 0.0);
        assert_eq!(a.intersects(&crossing), Containment::Intersects);
        assert_eq!(a.intersects(&inner), Containment::Contains);
        assert_eq!(a.intersects(&far), Containment::Disjoint);
    }

    #[test]
    fn test_rectangle_circle_intersection() {
        let r = Outline::centered_rectangle(Vec2::new(10.0, 10.0), Vec2::ZERO, 0.0);
        let inside = Outline::circle(Vec2::new(1.0, 1.0), 1.0);
        let edge = Outline::circle(Vec2::new(5.0, 0.0), 1.0);
        let outside = Outline::circle(Vec2::new(20.0, 0.0), 1.0);
        assert_eq!(r.intersects(&inside), Containment::Contains);
        assert_eq!(inside.intersects(&r), Containment::Contains);
        assert_eq!(r.intersects(&edge), Containment::Intersects);
        assert_eq!(r.intersects(&outside), Containment::Disjoint);
    }

    #[test]
    fn test_empty_never_intersects() {
        let c = Outline::circle(Vec2::ZERO, 5.0);
        assert_eq!(Outline::Empty.intersects(&c), Containment::Disjoint);
        assert!(!Outline::Empty.overlaps(Vec2::ZERO));
    }

    #[test]
    fn test_scale_and_grow() {
        let c = Outline::circle(Vec2::ZERO, 2.0);
        assert_eq!((c * 2.0).radius(), 4.0);
        assert_eq!((c + -5.0).radius(), 0.0);

        let r = Outline::centered_rectangle(Vec2::new(2.0, 2.0), Vec2::ZERO, 0.0);
        match r + 1.0 {
            Outline::Rectangle { min, max, .. } => {
                assert_eq!(min, Vec2::splat(-2.0));
                assert_eq!(max, Vec2::splat(2.0));
            }
            _ => panic!("expected rectangle"),
        }
        match r + -5.0 {
            Outline::Rectangle { min, max, .. } => assert!(min.x <= max.x && min.y <= max.y),
            _ => panic!("expected rectangle"),
        }
    }

    #[test]
    fn test_bounds_of_rotated_rectangle() {
        let r = Outline::centered_rectangle(Vec2::new(2.0, 2.0), Vec2::new(10.0, 10.0), std::f32::consts::FRAC_PI_4);
        let (lo, hi) = r.bounds();
        let half_diag = 2.0f32.sqrt();
        assert!((lo.x - (10.0 - half_diag)).abs() < 1e-4);
        assert!((hi.y - (10.0 + half_diag)).abs() < 1e-4);
    }
}
