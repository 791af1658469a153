//! Piecewise-linear mapping between an input domain and output values.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolate {
    /// Hold the end value outside the domain.
    Clamp,
    /// Continue the outermost segment's slope.
    Extend,
}

/// Input points must be non-decreasing and as many as the output points
/// (at least two). Lookups outside that contract return `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation<const N: usize> {
    input: [f32; N],
    output: [f32; N],
    extrapolate: Extrapolate,
}

impl<const N: usize> Interpolation<N> {
    pub fn new(input: [f32; N], output: [f32; N], extrapolate: Extrapolate) -> Self {
        Self {
            input,
            output,
            extrapolate,
        }
    }

    pub fn clamped(input: [f32; N], output: [f32; N]) -> Self {
        Self::new(input, output, Extrapolate::Clamp)
    }

    pub fn extended(input: [f32; N], output: [f32; N]) -> Self {
        Self::new(input, output, Extrapolate::Extend)
    }

    pub fn at(&self, x: f32) -> f32 {
        if N < 2 {
            return self.output.first().copied().unwrap_or(0.0);
        }
        let i = self.segment(x);
        let (x0, x1) = (self.input[i], self.input[i + 1]);
        let (y0, y1) = (self.output[i], self.output[i + 1]);

        if x0 == x1 {
            return if x <= x0 { y0 } else { y1 };
        }

        let mut t = x;
        if self.extrapolate == Extrapolate::Clamp {
            t = t.max(x0).min(x1);
        } else if x.is_nan() {
            return y0;
        }
        if t == x0 {
            return y0;
        }
        if t == x1 {
            return y1;
        }
        y0 + (y1 - y0) * ((t - x0) / (x1 - x0))
    }

    /// First segment whose upper bound reaches `x`; the last one otherwise.
    fn segment(&self, x: f32) -> usize {
        let mut i = 1;
        while i < N - 1 && self.input[i] < x {
            i += 1;
        }
        i - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_control_points_exactly() {
        let f = Interpolation::clamped([0.0, 400.0, 800.0], [0.9, 0.0, 0.9]);
        assert_eq!(f.at(0.0), 0.9);
        assert_eq!(f.at(400.0), 0.0);
        assert_eq!(f.at(800.0), 0.9);
        assert!((f.at(200.0) - 0.45).abs() < 1e-6);
    }

    #[test]
    fn clamp_holds_end_values() {
        let f = Interpolation::clamped([0.0, 1.0, 2.0], [60.0, 0.0, -60.0]);
        assert_eq!(f.at(-10.0), 60.0);
        assert_eq!(f.at(12.0), -60.0);
        assert_eq!(f.at(f32::NEG_INFINITY), 60.0);
    }

    #[test]
    fn extend_continues_outer_slope() {
        let f = Interpolation::extended([-1.0, 0.0, 800.0], [1.0, 1.0, 0.75]);
        assert_eq!(f.at(0.0), 1.0);
        assert_eq!(f.at(800.0), 0.75);
        assert!((f.at(1600.0) - 0.5).abs() < 1e-6);
        assert_eq!(f.at(-5.0), 1.0);
    }

    #[test]
    fn five_point_domain_uses_the_right_segment() {
        let w = 400.0;
        let f = Interpolation::clamped(
            [0.0, 0.1, 400.0, 799.9, 800.0],
            [w, w / 2.38, 0.0, -w / 2.38, -w],
        );
        assert_eq!(f.at(0.0), w);
        assert_eq!(f.at(0.1), w / 2.38);
        assert_eq!(f.at(400.0), 0.0);
        assert_eq!(f.at(800.0), -w);
        let mid = f.at(200.0);
        assert!(mid > 0.0 && mid < w / 2.38);
    }

    #[test]
    fn degenerate_segment_picks_nearer_side() {
        let f = Interpolation::clamped([1.0, 1.0], [3.0, 7.0]);
        assert_eq!(f.at(0.0), 3.0);
        assert_eq!(f.at(1.0), 3.0);
        assert_eq!(f.at(2.0), 7.0);
    }
}
