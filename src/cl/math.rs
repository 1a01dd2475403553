//! Math built-ins.
//!
//! Every function accepts a scalar or a [`Vector`] and works lane by lane.
//! Floating-point functions take `f16`, `f32` or `f64` lanes; `f16` is
//! evaluated in `f32` and rounded back.

use super::vector::{Lanes, Scalar, Vector};
use half::f16;

pub const MAXFLOAT: f32 = f32::MAX;
pub const M_E_F: f32 = std::f32::consts::E;
pub const M_LOG2E_F: f32 = std::f32::consts::LOG2_E;
pub const M_LOG10E_F: f32 = std::f32::consts::LOG10_E;
pub const M_LN2_F: f32 = std::f32::consts::LN_2;
pub const M_LN10_F: f32 = std::f32::consts::LN_10;
pub const M_PI_F: f32 = std::f32::consts::PI;
pub const M_PI_2_F: f32 = std::f32::consts::FRAC_PI_2;
pub const M_PI_4_F: f32 = std::f32::consts::FRAC_PI_4;
pub const M_1_PI_F: f32 = std::f32::consts::FRAC_1_PI;
pub const M_2_PI_F: f32 = std::f32::consts::FRAC_2_PI;
pub const M_2_SQRTPI_F: f32 = std::f32::consts::FRAC_2_SQRT_PI;
pub const M_SQRT2_F: f32 = std::f32::consts::SQRT_2;
pub const M_SQRT1_2_F: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Floating-point lane type.
pub trait FloatScalar: Scalar {
    const ZERO: Self;
    const ONE: Self;

    fn lane_fabs(self) -> Self;
    fn lane_sqrt(self) -> Self;
    fn lane_rsqrt(self) -> Self;
    fn lane_exp(self) -> Self;
    fn lane_log(self) -> Self;
    fn lane_log2(self) -> Self;
    fn lane_pow(self, e: Self) -> Self;
    fn lane_sin(self) -> Self;
    fn lane_cos(self) -> Self;
    fn lane_tan(self) -> Self;
    fn lane_asin(self) -> Self;
    fn lane_acos(self) -> Self;
    fn lane_atan(self) -> Self;
    fn lane_fma(self, b: Self, c: Self) -> Self;
    fn lane_degrees(self) -> Self;
    fn lane_radians(self) -> Self;
    /// Mantissa in `[0.5, 1)` (sign kept) and exponent, `x = m * 2^e`.
    fn lane_frexp(self) -> (Self, i32);
    fn lane_ldexp(self, e: i32) -> Self;
}

macro_rules! float_math {
    ($($t:ty),*) => {$(
        impl FloatScalar for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;

            #[inline] fn lane_fabs(self) -> Self { self.abs() }
            #[inline] fn lane_sqrt(self) -> Self { self.sqrt() }
            #[inline] fn lane_rsqrt(self) -> Self { self.sqrt().recip() }
            #[inline] fn lane_exp(self) -> Self { self.exp() }
            #[inline] fn lane_log(self) -> Self { self.ln() }
            #[inline] fn lane_log2(self) -> Self { self.log2() }
            #[inline] fn lane_pow(self, e: Self) -> Self { self.powf(e) }
            #[inline] fn lane_sin(self) -> Self { self.sin() }
            #[inline] fn lane_cos(self) -> Self { self.cos() }
            #[inline] fn lane_tan(self) -> Self { self.tan() }
            #[inline] fn lane_asin(self) -> Self { self.asin() }
            #[inline] fn lane_acos(self) -> Self { self.acos() }
            #[inline] fn lane_atan(self) -> Self { self.atan() }
            #[inline] fn lane_fma(self, b: Self, c: Self) -> Self { self.mul_add(b, c) }
            #[inline] fn lane_degrees(self) -> Self { self.to_degrees() }
            #[inline] fn lane_radians(self) -> Self { self.to_radians() }

            fn lane_frexp(self) -> (Self, i32) {
                let (m, e) = frexp_f64(self as f64);
                (m as $t, e)
            }

            fn lane_ldexp(self, e: i32) -> Self {
                ldexp_f64(self as f64, e) as $t
            }
        }
    )*};
}

float_math!(f32, f64);

macro_rules! via_f32 {
    ($($name:ident),*) => {$(
        #[inline] fn $name(self) -> Self { f16::from_f32(self.to_f32().$name()) }
    )*};
}

impl FloatScalar for f16 {
    const ZERO: Self = f16::ZERO;
    const ONE: Self = f16::ONE;

    via_f32!(
        lane_fabs, lane_sqrt, lane_rsqrt, lane_exp, lane_log, lane_log2, lane_sin, lane_cos,
        lane_tan, lane_asin, lane_acos, lane_atan, lane_degrees, lane_radians
    );

    fn lane_pow(self, e: Self) -> Self {
        f16::from_f32(self.to_f32().lane_pow(e.to_f32()))
    }

    fn lane_fma(self, b: Self, c: Self) -> Self {
        f16::from_f32(self.to_f32().lane_fma(b.to_f32(), c.to_f32()))
    }

    fn lane_frexp(self) -> (Self, i32) {
        let (m, e) = frexp_f64(self.to_f64());
        (f16::from_f64(m), e)
    }

    fn lane_ldexp(self, e: i32) -> Self {
        f16::from_f64(ldexp_f64(self.to_f64(), e))
    }
}

const F64_EXP_MASK: u64 = 0x7ff << 52;

fn frexp_f64(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    // bring subnormals into the normal range first
    let (x, bias) = if x.abs() < f64::MIN_POSITIVE {
        (x * f64::from_bits((1023 + 54) << 52), -54)
    } else {
        (x, 0)
    };
    let bits = x.to_bits();
    let exp = ((bits & F64_EXP_MASK) >> 52) as i32;
    let mantissa = f64::from_bits((bits & !F64_EXP_MASK) | (1022 << 52));
    (mantissa, exp - 1022 + bias)
}

fn ldexp_f64(x: f64, e: i32) -> f64 {
    // two steps so that 2^half stays finite for any exponent a result can use
    let half = e / 2;
    x * 2f64.powi(half) * 2f64.powi(e - half)
}

/// Values a math built-in applies to: a scalar lane or a vector of lanes.
pub trait LaneWise: Copy {
    type Lane: Scalar;
    /// Same shape with `i32` lanes.
    type Ints: Copy;

    fn as_lanes(&self) -> &[Self::Lane];
    fn map_lanes(self, f: impl Fn(Self::Lane) -> Self::Lane) -> Self;
    fn zip_lanes(self, other: Self, f: impl Fn(Self::Lane, Self::Lane) -> Self::Lane) -> Self;
    fn zip3_lanes(
        self,
        b: Self,
        c: Self,
        f: impl Fn(Self::Lane, Self::Lane, Self::Lane) -> Self::Lane,
    ) -> Self;
    fn split_lanes(self, f: impl Fn(Self::Lane) -> (Self::Lane, i32)) -> (Self, Self::Ints);
    fn with_ints(self, ints: Self::Ints, f: impl Fn(Self::Lane, i32) -> Self::Lane) -> Self;
}

macro_rules! scalar_lanewise {
    ($($t:ty),*) => {$(
        impl LaneWise for $t {
            type Lane = $t;
            type Ints = i32;

            fn as_lanes(&self) -> &[Self::Lane] {
                std::slice::from_ref(self)
            }

            fn map_lanes(self, f: impl Fn(Self::Lane) -> Self::Lane) -> Self {
                f(self)
            }

            fn zip_lanes(
                self,
                other: Self,
                f: impl Fn(Self::Lane, Self::Lane) -> Self::Lane,
            ) -> Self {
                f(self, other)
            }

            fn zip3_lanes(
                self,
                b: Self,
                c: Self,
                f: impl Fn(Self::Lane, Self::Lane, Self::Lane) -> Self::Lane,
            ) -> Self {
                f(self, b, c)
            }

            fn split_lanes(
                self,
                f: impl Fn(Self::Lane) -> (Self::Lane, i32),
            ) -> (Self, Self::Ints) {
                f(self)
            }

            fn with_ints(
                self,
                ints: Self::Ints,
                f: impl Fn(Self::Lane, i32) -> Self::Lane,
            ) -> Self {
                f(self, ints)
            }
        }
    )*};
}

scalar_lanewise!(i8, u8, i16, u16, i32, u32, i64, u64, f16, f32, f64);

impl<T: Lanes<N>, const N: usize> LaneWise for Vector<T, N>
where
    i32: Lanes<N>,
{
    type Lane = T;
    type Ints = Vector<i32, N>;

    fn as_lanes(&self) -> &[Self::Lane] {
        self.lanes()
    }

    fn map_lanes(self, f: impl Fn(Self::Lane) -> Self::Lane) -> Self {
        self.map(f)
    }

    fn zip_lanes(self, other: Self, f: impl Fn(Self::Lane, Self::Lane) -> Self::Lane) -> Self {
        self.zip_map(other, f)
    }

    fn zip3_lanes(
        self,
        b: Self,
        c: Self,
        f: impl Fn(Self::Lane, Self::Lane, Self::Lane) -> Self::Lane,
    ) -> Self {
        let mut out = self;
        for ((o, &bi), &ci) in out
            .as_mut_array()
            .iter_mut()
            .zip(b.as_array())
            .zip(c.as_array())
        {
            *o = f(*o, bi, ci);
        }
        out
    }

    fn split_lanes(self, f: impl Fn(Self::Lane) -> (Self::Lane, i32)) -> (Self, Self::Ints) {
        let mut ints = Vector::<i32, N>::default();
        let mut out = self;
        for (o, i) in out.as_mut_array().iter_mut().zip(ints.as_mut_array()) {
            (*o, *i) = f(*o);
        }
        (out, ints)
    }

    fn with_ints(self, ints: Self::Ints, f: impl Fn(Self::Lane, i32) -> Self::Lane) -> Self {
        let mut out = self;
        for (o, &i) in out.as_mut_array().iter_mut().zip(ints.as_array()) {
            *o = f(*o, i);
        }
        out
    }
}

/// Integer absolute value, returned as the unsigned type of the same width.
pub trait Abs: Copy {
    type Output;

    fn abs(self) -> Self::Output;
}

macro_rules! int_abs {
    ($($s:ty => $u:ty),*) => {$(
        impl Abs for $s {
            type Output = $u;
            #[inline] fn abs(self) -> $u { self.unsigned_abs() }
        }
        impl Abs for $u {
            type Output = $u;
            #[inline] fn abs(self) -> $u { self }
        }
    )*};
}

int_abs!(i8 => u8, i16 => u16, i32 => u32, i64 => u64);

impl<T, const N: usize> Abs for Vector<T, N>
where
    T: Lanes<N> + Abs,
    T::Output: Lanes<N>,
{
    type Output = Vector<T::Output, N>;

    fn abs(self) -> Self::Output {
        self.map(Abs::abs)
    }
}

pub fn abs<T: Abs>(x: T) -> T::Output {
    x.abs()
}

/// Lane-wise minimum. With a NaN lane the other operand is returned.
pub fn min<V: LaneWise>(x: V, y: V) -> V {
    x.zip_lanes(y, |a, b| if b < a || a.lane_is_nan() { b } else { a })
}

/// Lane-wise maximum. With a NaN lane the other operand is returned.
pub fn max<V: LaneWise>(x: V, y: V) -> V {
    x.zip_lanes(y, |a, b| if b > a || a.lane_is_nan() { b } else { a })
}

/// `min(max(x, minval), maxval)` per lane.
pub fn clamp<V: LaneWise>(x: V, minval: V, maxval: V) -> V {
    min(max(x, minval), maxval)
}

macro_rules! unary_float {
    ($($(#[$doc:meta])* $name:ident => $lane:ident;)*) => {$(
        $(#[$doc])*
        pub fn $name<V: LaneWise>(x: V) -> V
        where
            V::Lane: FloatScalar,
        {
            x.map_lanes(FloatScalar::$lane)
        }
    )*};
}

unary_float! {
    fabs => lane_fabs;
    /// Radians to degrees.
    degrees => lane_degrees;
    /// Degrees to radians.
    radians => lane_radians;
    exp => lane_exp;
    /// Natural logarithm.
    log => lane_log;
    log2 => lane_log2;
    sqrt => lane_sqrt;
    /// `1 / sqrt(x)`.
    rsqrt => lane_rsqrt;
    sin => lane_sin;
    cos => lane_cos;
    tan => lane_tan;
    asin => lane_asin;
    acos => lane_acos;
    atan => lane_atan;
}

pub fn pow<V: LaneWise>(base: V, e: V) -> V
where
    V::Lane: FloatScalar,
{
    base.zip_lanes(e, FloatScalar::lane_pow)
}

/// `a * b + c` rounded once.
pub fn fma<V: LaneWise>(a: V, b: V, c: V) -> V
where
    V::Lane: FloatScalar,
{
    a.zip3_lanes(b, c, FloatScalar::lane_fma)
}

/// Split each lane into a mantissa in `[0.5, 1)` and a power of two.
///
/// Zero, infinite and NaN lanes are returned unchanged with exponent 0.
pub fn frexp<V: LaneWise>(x: V) -> (V, V::Ints)
where
    V::Lane: FloatScalar,
{
    x.split_lanes(FloatScalar::lane_frexp)
}

/// `x * 2^e` per lane.
pub fn ldexp<V: LaneWise>(x: V, e: V::Ints) -> V
where
    V::Lane: FloatScalar,
{
    x.with_ints(e, FloatScalar::lane_ldexp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl::vector::{char4, float2, float3, float4, half2, int2, uint3};

    fn assert_close(a: &[f32], b: &[f32]) {
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() <= 1e-5 * y.abs().max(1.0), "{} != {}", x, y);
        }
    }

    #[test]
    fn test_abs() {
        assert_eq!(abs(-5i32), 5u32);
        assert_eq!(abs(i8::MIN), 128u8);
        assert_eq!(abs(7u16), 7);
        assert_eq!(abs(char4::new([-1, 2, -128, 0])).to_array(), [1, 2, 128, 0]);
        assert_eq!(fabs(float3::new([-1.5, 0.0, 2.0])).to_array(), [1.5, 0.0, 2.0]);
    }

    #[test]
    fn test_min_max_clamp() {
        assert_eq!(min(3, -2), -2);
        assert_eq!(max(3u8, 9), 9);
        assert_eq!(min(f32::NAN, 1.0), 1.0);
        assert_eq!(max(1.0, f32::NAN), 1.0);

        let x = int2::new([-10, 10]);
        assert_eq!(clamp(x, int2::splat(-3), int2::splat(4)).to_array(), [-3, 4]);
        let v = uint3::new([1, 5, 9]);
        assert_eq!(clamp(v, uint3::splat(2), uint3::splat(8)).to_array(), [2, 5, 8]);
    }

    #[test]
    fn test_angles() {
        let d = degrees(float3::new([M_PI_F, M_PI_2_F, 0.0]));
        assert_close(d.lanes(), &[180.0, 90.0, 0.0]);
        let r = radians(float3::new([180.0, 45.0, -90.0]));
        assert_close(r.lanes(), &[M_PI_F, M_PI_4_F, -M_PI_2_F]);
    }

    #[test]
    fn test_exponential() {
        let x = float4::new([0.0, 1.0, 2.0, -1.0]);
        assert_close(exp(x).lanes(), &[1.0, M_E_F, M_E_F * M_E_F, 1.0 / M_E_F]);
        assert_close(log(exp(x)).lanes(), x.lanes());
        assert_close(log2(float3::new([1.0, 8.0, 0.5])).lanes(), &[0.0, 3.0, -1.0]);
        assert_close(
            pow(float3::new([2.0, 9.0, 4.0]), float3::new([10.0, 0.5, -1.0])).lanes(),
            &[1024.0, 3.0, 0.25],
        );
        assert_close(sqrt(float3::new([4.0, 2.0, 0.0])).lanes(), &[2.0, M_SQRT2_F, 0.0]);
        assert_close(rsqrt(float3::new([4.0, 2.0, 1.0])).lanes(), &[0.5, M_SQRT1_2_F, 1.0]);
        assert!(sqrt(-1.0f64).is_nan());
    }

    #[test]
    fn test_trigonometric() {
        let theta = float4::new([0.0, M_PI_2_F, M_PI_F, M_PI_4_F]);
        assert_close(sin(theta).lanes(), &[0.0, 1.0, 0.0, M_SQRT1_2_F]);
        assert_close(cos(theta).lanes(), &[1.0, 0.0, -1.0, M_SQRT1_2_F]);
        assert_close(tan(float2::splat(M_PI_4_F)).lanes(), &[1.0, 1.0]);

        let x = float3::new([0.0, 1.0, -1.0]);
        assert_close(asin(x).lanes(), &[0.0, M_PI_2_F, -M_PI_2_F]);
        assert_close(acos(x).lanes(), &[M_PI_2_F, 0.0, M_PI_F]);
        assert_close(atan(x).lanes(), &[0.0, M_PI_4_F, -M_PI_4_F]);
    }

    #[test]
    fn test_fma() {
        let a = float3::new([2.0, -1.0, 0.5]);
        let b = float3::new([3.0, 4.0, 8.0]);
        let c = float3::new([1.0, 1.0, -4.0]);
        assert_eq!(fma(a, b, c).to_array(), [7.0, -3.0, 0.0]);
        assert_eq!(fma(0.1f64, 10.0, -1.0), 0.1f64.mul_add(10.0, -1.0));
    }

    #[test]
    fn test_frexp() {
        assert_eq!(frexp(8.0f32), (0.5, 4));
        assert_eq!(frexp(-3.0f64), (-0.75, 2));
        assert_eq!(frexp(0.0f32), (0.0, 0));

        // smallest subnormal
        let (m, e) = frexp(f64::from_bits(1));
        assert_eq!((m, e), (0.5, -1073));

        let (m, e) = frexp(float4::new([1.0, 0.25, 1000.0, f32::INFINITY]));
        assert_eq!(m.to_array(), [0.5, 0.5, 0.9765625, f32::INFINITY]);
        assert_eq!(e.to_array(), [1, -1, 10, 0]);
        assert_eq!(ldexp(m, e).to_array(), [1.0, 0.25, 1000.0, f32::INFINITY]);
    }

    #[test]
    fn test_half_lanes() {
        let h = half2::new([f16::from_f32(4.0), f16::from_f32(-2.0)]);
        assert_eq!(sqrt(fabs(h)).to_array(), [f16::from_f32(2.0), f16::SQRT_2]);
        assert_eq!(frexp(f16::from_f32(6.0)), (f16::from_f32(0.75), 3));
    }
}
