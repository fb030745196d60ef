//! Vector buffer math
//!
//! Elementwise arithmetic and transcendental functions over fixed-size
//! sample blocks. Everything above the oscillator is expressed in terms of
//! these so the inner loops stay simple and auto-vectorizable.
//!
//! Buffers passed together must have equal lengths; this is checked in debug
//! builds only.

/// A block of samples or per-sample parameter values
pub type Buffer = Vec<f64>;

#[inline]
fn zip_map(l: &[f64], r: &[f64], f: impl Fn(f64, f64) -> f64) -> Buffer {
    debug_assert_eq!(l.len(), r.len());
    l.iter().zip(r).map(|(&a, &b)| f(a, b)).collect()
}

#[inline]
fn zip_apply(l: &mut [f64], r: &[f64], f: impl Fn(f64, f64) -> f64) {
    debug_assert_eq!(l.len(), r.len());
    for (a, &b) in l.iter_mut().zip(r) {
        *a = f(*a, b);
    }
}

/// `l + r`
pub fn add(l: &[f64], r: &[f64]) -> Buffer {
    zip_map(l, r, |a, b| a + b)
}

/// `l - r`
pub fn sub(l: &[f64], r: &[f64]) -> Buffer {
    zip_map(l, r, |a, b| a - b)
}

/// `l * r`
pub fn mul(l: &[f64], r: &[f64]) -> Buffer {
    zip_map(l, r, |a, b| a * b)
}

/// `l / r`
pub fn div(l: &[f64], r: &[f64]) -> Buffer {
    zip_map(l, r, |a, b| a / b)
}

/// `l += r`
pub fn add_inplace(l: &mut [f64], r: &[f64]) {
    zip_apply(l, r, |a, b| a + b);
}

/// `l -= r`
pub fn sub_inplace(l: &mut [f64], r: &[f64]) {
    zip_apply(l, r, |a, b| a - b);
}

/// `l *= r`
pub fn mul_inplace(l: &mut [f64], r: &[f64]) {
    zip_apply(l, r, |a, b| a * b);
}

/// `l /= r`
pub fn div_inplace(l: &mut [f64], r: &[f64]) {
    zip_apply(l, r, |a, b| a / b);
}

/// `l + s` for a scalar `s`
pub fn add_scalar(l: &[f64], s: f64) -> Buffer {
    l.iter().map(|&a| a + s).collect()
}

/// `l - s` for a scalar `s`
pub fn sub_scalar(l: &[f64], s: f64) -> Buffer {
    l.iter().map(|&a| a - s).collect()
}

/// `l * s` for a scalar `s`
pub fn mul_scalar(l: &[f64], s: f64) -> Buffer {
    l.iter().map(|&a| a * s).collect()
}

/// `l / s` for a scalar `s`
pub fn div_scalar(l: &[f64], s: f64) -> Buffer {
    l.iter().map(|&a| a / s).collect()
}

/// `l += s` for a scalar `s`
pub fn add_scalar_inplace(l: &mut [f64], s: f64) {
    l.iter_mut().for_each(|a| *a += s);
}

/// `l -= s` for a scalar `s`
pub fn sub_scalar_inplace(l: &mut [f64], s: f64) {
    l.iter_mut().for_each(|a| *a -= s);
}

/// `l *= s` for a scalar `s`
pub fn mul_scalar_inplace(l: &mut [f64], s: f64) {
    l.iter_mut().for_each(|a| *a *= s);
}

/// `l /= s` for a scalar `s`
pub fn div_scalar_inplace(l: &mut [f64], s: f64) {
    l.iter_mut().for_each(|a| *a /= s);
}

/// Elementwise sine
pub fn sin(src: &[f64]) -> Buffer {
    src.iter().map(|x| x.sin()).collect()
}

/// Elementwise cosine
pub fn cos(src: &[f64]) -> Buffer {
    src.iter().map(|x| x.cos()).collect()
}

/// Elementwise natural exponential
pub fn exp(src: &[f64]) -> Buffer {
    src.iter().map(|x| x.exp()).collect()
}

/// Elementwise sine, in place
pub fn sin_inplace(buf: &mut [f64]) {
    buf.iter_mut().for_each(|x| *x = x.sin());
}

/// Elementwise cosine, in place
pub fn cos_inplace(buf: &mut [f64]) {
    buf.iter_mut().for_each(|x| *x = x.cos());
}

/// Elementwise natural exponential, in place
pub fn exp_inplace(buf: &mut [f64]) {
    buf.iter_mut().for_each(|x| *x = x.exp());
}

/// Converts a block to single precision, writing into `out`.
pub fn to_f32(src: &[f64], out: &mut [f32]) {
    debug_assert_eq!(src.len(), out.len());
    for (o, &s) in out.iter_mut().zip(src) {
        *o = s as f32;
    }
}

/// Flushes denormals, infinities and NaNs to zero.
#[inline]
pub fn zap_gremlins(x: f64) -> f64 {
    let abs = x.abs();
    if abs > 1e-15 && abs < 1e15 {
        x
    } else {
        0.0
    }
}

/// Leaky one-pole integrator, `y[n] = x[n] + b * y[n-1]`
#[derive(Clone, Debug)]
pub struct Integrator {
    b1: f64,
    y1: f64,
}

impl Integrator {
    /// Creates an integrator with the given leak coefficient
    pub fn new(b1: f64) -> Self {
        Self { b1, y1: 0.0 }
    }

    /// Filters the buffer in place
    pub fn filter(&mut self, buf: &mut [f64]) {
        let mut y1 = self.y1;
        for x in buf.iter_mut() {
            y1 = *x + self.b1 * y1;
            *x = y1;
        }
        self.y1 = zap_gremlins(y1);
    }

    /// Clears the filter memory
    pub fn reset(&mut self) {
        self.y1 = 0.0;
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self::new(0.998)
    }
}

/// DC blocking filter, `y[n] = x[n] - x[n-1] + b * y[n-1]`
#[derive(Clone, Debug)]
pub struct DcBlock {
    b1: f64,
    x1: f64,
    y1: f64,
}

impl DcBlock {
    /// Creates a DC blocker with the given pole
    pub fn new(b1: f64) -> Self {
        Self {
            b1,
            x1: 0.0,
            y1: 0.0,
        }
    }

    /// Filters the buffer in place
    pub fn filter(&mut self, buf: &mut [f64]) {
        let mut x1 = self.x1;
        let mut y1 = self.y1;
        for x in buf.iter_mut() {
            let x0 = *x;
            y1 = x0 - x1 + self.b1 * y1;
            *x = y1;
            x1 = x0;
        }
        self.x1 = x1;
        self.y1 = zap_gremlins(y1);
    }

    /// Clears the filter memory
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}

impl Default for DcBlock {
    fn default() -> Self {
        Self::new(0.999)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_ops() {
        let l = [1.0, 2.0, 3.0, 4.0];
        let r = [2.0, 2.0, 2.0, 2.0];
        assert_eq!(add(&l, &r), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(sub(&l, &r), vec![-1.0, 0.0, 1.0, 2.0]);
        assert_eq!(mul(&l, &r), vec![2.0, 4.0, 6.0, 8.0]);
        assert_eq!(div(&l, &r), vec![0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_inplace_ops_match_allocating() {
        let l = [0.25, -1.5, 3.0];
        let r = [4.0, 0.5, -2.0];

        let mut buf = l.to_vec();
        mul_inplace(&mut buf, &r);
        assert_eq!(buf, mul(&l, &r));

        let mut buf = l.to_vec();
        div_inplace(&mut buf, &r);
        assert_eq!(buf, div(&l, &r));

        let mut buf = l.to_vec();
        add_scalar_inplace(&mut buf, 1.0);
        assert_eq!(buf, add_scalar(&l, 1.0));

        let mut buf = l.to_vec();
        sub_scalar_inplace(&mut buf, 1.0);
        assert_eq!(buf, sub_scalar(&l, 1.0));
    }

    #[test]
    fn test_transcendentals() {
        let src = [0.0, std::f64::consts::FRAC_PI_2];
        let s = sin(&src);
        let c = cos(&src);
        assert!((s[0]).abs() < 1e-12);
        assert!((s[1] - 1.0).abs() < 1e-12);
        assert!((c[0] - 1.0).abs() < 1e-12);
        assert!(c[1].abs() < 1e-12);

        let mut e = vec![0.0, 1.0];
        exp_inplace(&mut e);
        assert_eq!(e[0], 1.0);
        assert!((e[1] - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_zap_gremlins() {
        assert_eq!(zap_gremlins(0.5), 0.5);
        assert_eq!(zap_gremlins(1e-20), 0.0);
        assert_eq!(zap_gremlins(f64::NAN), 0.0);
        assert_eq!(zap_gremlins(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_dc_block_removes_offset() {
        let mut dc = DcBlock::default();
        let mut buf = vec![1.0; 20000];
        dc.filter(&mut buf);
        assert!(buf[19999].abs() < 1e-3, "residual DC {}", buf[19999]);
    }

    #[test]
    fn test_integrator_accumulates() {
        let mut integrator = Integrator::new(1.0);
        let mut buf = vec![1.0; 4];
        integrator.filter(&mut buf);
        assert_eq!(buf, vec![1.0, 2.0, 3.0, 4.0]);
    }
}
