//! Planar joint geometry in frame-pixel coordinates.
//!
//! Image y grows downward, so "down" is `(0, 1)`.

pub type Point = (f32, f32);

const EPS: f32 = 1e-6;

/// Angle in degrees at vertex `b` between rays `b→a` and `b→c`.
///
/// Returns `0.0` when either ray has zero length.
pub fn angle(a: Point, b: Point, c: Point) -> f32 {
    let v1 = (a.0 - b.0, a.1 - b.1);
    let v2 = (c.0 - b.0, c.1 - b.1);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 < EPS || mag2 < EPS {
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Signed angle in degrees of the line `p1→p2` from horizontal, in (-180, 180].
pub fn tilt(p1: Point, p2: Point) -> f32 {
    let (dx, dy) = (p2.0 - p1.0, p2.1 - p1.1);
    // atan2(-0.0, x < 0) would land on the excluded -180
    if dy == 0.0 && dx < 0.0 {
        return 180.0;
    }
    dy.atan2(dx).to_degrees()
}

/// Unsigned angle in degrees between `top→bottom` and straight down.
/// 0° is perfectly vertical; zero-length input returns `0.0`.
pub fn vertical_deviation(top: Point, bottom: Point) -> f32 {
    let v = (bottom.0 - top.0, bottom.1 - top.1);
    let mag = (v.0 * v.0 + v.1 * v.1).sqrt();
    if mag < EPS {
        return 0.0;
    }
    // dot with (0, 1) is just the y component
    (v.1 / mag).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Unsigned deviation of the line `p1→p2` from horizontal, folded into [0, 90].
/// Direction does not matter: a line pointing left is as level as one pointing right.
pub fn horizontal_deviation(p1: Point, p2: Point) -> f32 {
    if distance(p1, p2) < EPS {
        return 0.0;
    }
    let t = tilt(p1, p2).abs();
    t.min(180.0 - t)
}

/// Smallest signed difference `a - b` between two directions, in (-180, 180].
pub fn tilt_difference(a: f32, b: f32) -> f32 {
    let mut d = (a - b) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

pub fn distance(a: Point, b: Point) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

pub fn midpoint(a: Point, b: Point) -> Point {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}
