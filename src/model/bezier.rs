//! MMD-style keyframe interpolation curves.
//!
//! Each channel is a cubic Bézier from `(0,0)` to `(1,1)` whose two inner control points
//! are quantized to `0..=127`. The curve's X axis is normalized time, its Y axis the
//! normalized progress between two keys.

/// Control-point quantization range upper bound.
pub const CURVE_MAX: u8 = 127;

const SOLVE_ITERATIONS: usize = 32;

/// One channel's control points `(x1, y1)` and `(x2, y2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Curve {
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
}

impl Default for Curve {
    fn default() -> Self {
        Self::LINEAR
    }
}

impl Curve {
    pub const LINEAR: Curve = Curve {
        x1: 20,
        y1: 20,
        x2: 107,
        y2: 107,
    };

    pub fn new(x1: u8, y1: u8, x2: u8, y2: u8) -> Self {
        Self {
            x1: x1.min(CURVE_MAX),
            y1: y1.min(CURVE_MAX),
            x2: x2.min(CURVE_MAX),
            y2: y2.min(CURVE_MAX),
        }
    }

    fn points(self) -> [(f64, f64); 4] {
        let m = f64::from(CURVE_MAX);
        [
            (0.0, 0.0),
            (f64::from(self.x1) / m, f64::from(self.y1) / m),
            (f64::from(self.x2) / m, f64::from(self.y2) / m),
            (1.0, 1.0),
        ]
    }

    /// Progress at normalized time `t`.
    pub fn evaluate(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if self.is_linear() {
            return t;
        }
        let p = self.points();
        let s = solve_param(&p, t);
        cubic(p[0].1, p[1].1, p[2].1, p[3].1, s)
    }

    /// Control points on the diagonal make the curve the identity.
    pub fn is_linear(self) -> bool {
        self.x1 == self.y1 && self.x2 == self.y2
    }

    /// Split at normalized time `t`, returning the re-normalized halves.
    pub fn split(self, t: f64) -> (Curve, Curve) {
        if t <= 0.0 || t >= 1.0 || self.is_linear() {
            return (self, self);
        }
        let p = self.points();
        let s = solve_param(&p, t);
        let lerp = |a: (f64, f64), b: (f64, f64)| (a.0 + (b.0 - a.0) * s, a.1 + (b.1 - a.1) * s);

        let p01 = lerp(p[0], p[1]);
        let p12 = lerp(p[1], p[2]);
        let p23 = lerp(p[2], p[3]);
        let p012 = lerp(p01, p12);
        let p123 = lerp(p12, p23);
        let mid = lerp(p012, p123);

        let first = normalize_segment(p[0], p01, p012, mid);
        let second = normalize_segment(mid, p123, p23, p[3]);
        (first, second)
    }
}

fn cubic(p0: f64, p1: f64, p2: f64, p3: f64, s: f64) -> f64 {
    let u = 1.0 - s;
    u * u * u * p0 + 3.0 * u * u * s * p1 + 3.0 * u * s * s * p2 + s * s * s * p3
}

// X is monotonic on [0,1] because the control points are inside the unit square.
fn solve_param(p: &[(f64, f64); 4], t: f64) -> f64 {
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    let mut s = t;
    for _ in 0..SOLVE_ITERATIONS {
        let x = cubic(p[0].0, p[1].0, p[2].0, p[3].0, s);
        if (x - t).abs() < 1e-9 {
            break;
        }
        if x < t {
            lo = s;
        } else {
            hi = s;
        }
        s = 0.5 * (lo + hi);
    }
    s
}

fn normalize_segment(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> Curve {
    let w = d.0 - a.0;
    let h = d.1 - a.1;
    if w.abs() < 1e-9 || h.abs() < 1e-9 {
        return Curve::LINEAR;
    }
    let q = |v: f64| (v * f64::from(CURVE_MAX)).round().clamp(0.0, f64::from(CURVE_MAX)) as u8;
    Curve::new(
        q((b.0 - a.0) / w),
        q((b.1 - a.1) / h),
        q((c.0 - a.0) / w),
        q((c.1 - a.1) / h),
    )
}

/// Per-channel curves for a bone keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Interpolation {
    pub x: Curve,
    pub y: Curve,
    pub z: Curve,
    pub rotation: Curve,
}

impl Interpolation {
    /// Split every channel at normalized time `t`.
    pub fn split(self, t: f64) -> (Interpolation, Interpolation) {
        let (x0, x1) = self.x.split(t);
        let (y0, y1) = self.y.split(t);
        let (z0, z1) = self.z.split(t);
        let (r0, r1) = self.rotation.split(t);
        (
            Interpolation {
                x: x0,
                y: y0,
                z: z0,
                rotation: r0,
            },
            Interpolation {
                x: x1,
                y: y1,
                z: z1,
                rotation: r1,
            },
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/bezier.rs"]
mod tests;
