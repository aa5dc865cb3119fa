//! Easing curves for animating the visible pitch range.
//!
//! Every curve maps progress `t` in `[0, 1]` to `[0, 1]` with `f(0) = 0` and
//! `f(1) = 1`.

/// An easing curve.
pub type Easing = fn(f32) -> f32;

pub fn linear(t: f32) -> f32 {
    t
}

/// Quadratic ease in and out.
pub fn ease_in_out_quad(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Exponential ease in and out: nearly flat at both ends, steep in the middle.
pub fn ease_in_out_expo(t: f32) -> f32 {
    if t <= 0.0 {
        0.0
    } else if t >= 1.0 {
        1.0
    } else if t < 0.5 {
        2.0_f32.powf(20.0 * t - 10.0) / 2.0
    } else {
        (2.0 - 2.0_f32.powf(-20.0 * t + 10.0)) / 2.0
    }
}

/// Interpolates from `x0` to `x1` at progress `t` along `easing`.
pub fn interp(x0: f32, x1: f32, t: f32, easing: Easing) -> f32 {
    x0 + (x1 - x0) * easing(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURVES: [Easing; 3] = [linear, ease_in_out_quad, ease_in_out_expo];

    #[test]
    fn test_curves_hit_endpoints() {
        for curve in CURVES {
            assert_eq!(curve(0.0), 0.0);
            assert_eq!(curve(1.0), 1.0);
            assert!((curve(0.5) - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_curves_are_monotonic() {
        for curve in CURVES {
            let mut previous = curve(0.0);
            for step in 1..=100 {
                let value = curve(step as f32 / 100.0);
                assert!(value >= previous);
                previous = value;
            }
        }
    }

    #[test]
    fn test_expo_is_flat_at_the_ends() {
        assert!(ease_in_out_expo(0.1) < 0.01);
        assert!(ease_in_out_expo(0.9) > 0.99);
    }

    #[test]
    fn test_interp() {
        assert_eq!(interp(100.0, 200.0, 0.0, ease_in_out_expo), 100.0);
        assert_eq!(interp(100.0, 200.0, 1.0, ease_in_out_expo), 200.0);
        assert!((interp(100.0, 200.0, 0.25, linear) - 125.0).abs() < 1e-4);
        assert!((interp(200.0, 100.0, 0.5, ease_in_out_quad) - 150.0).abs() < 1e-4);
    }
}
