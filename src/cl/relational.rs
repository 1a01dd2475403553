//! Relational built-ins.
//!
//! Scalar comparisons return `1` or `0`. Vector comparisons return a
//! `Vector<i32, N>` whose lanes are `-1` (all bits set) for true and `0` for
//! false, so results compose with [`select`] and [`bitselect`].

use super::vector::{IntScalar, Lanes, Scalar, Vector};
use bytemuck::Pod;
use half::f16;

/// Lane value of a true vector comparison.
pub const LANE_TRUE: i32 = -1;
/// Lane value of a false comparison.
pub const LANE_FALSE: i32 = 0;

pub trait Relational: Copy {
    type Mask: Copy;

    fn isequal(self, other: Self) -> Self::Mask;
    fn isnotequal(self, other: Self) -> Self::Mask;
    fn isgreater(self, other: Self) -> Self::Mask;
    fn isgreaterequal(self, other: Self) -> Self::Mask;
    fn isless(self, other: Self) -> Self::Mask;
    fn islessequal(self, other: Self) -> Self::Mask;
    fn isnan(self) -> Self::Mask;
    fn isinf(self) -> Self::Mask;
    fn signbit(self) -> Self::Mask;
}

macro_rules! scalar_relational {
    ($($t:ty),*) => {$(
        impl Relational for $t {
            type Mask = i32;

            fn isequal(self, other: Self) -> i32 { (self == other) as i32 }
            fn isnotequal(self, other: Self) -> i32 { (self != other) as i32 }
            fn isgreater(self, other: Self) -> i32 { (self > other) as i32 }
            fn isgreaterequal(self, other: Self) -> i32 { (self >= other) as i32 }
            fn isless(self, other: Self) -> i32 { (self < other) as i32 }
            fn islessequal(self, other: Self) -> i32 { (self <= other) as i32 }
            fn isnan(self) -> i32 { self.lane_is_nan() as i32 }
            fn isinf(self) -> i32 { self.lane_is_infinite() as i32 }
            fn signbit(self) -> i32 { self.lane_sign_bit() as i32 }
        }

        impl<M: IntScalar> Select<M> for $t {
            fn select(self, b: Self, c: M) -> Self {
                if c != M::zeroed() { b } else { self }
            }
        }
    )*};
}

scalar_relational!(i8, u8, i16, u16, i32, u32, i64, u64, f16, f32, f64);

#[inline]
fn lane_mask(condition: bool) -> i32 {
    if condition {
        LANE_TRUE
    } else {
        LANE_FALSE
    }
}

impl<T: Lanes<N>, const N: usize> Vector<T, N>
where
    i32: Lanes<N>,
{
    pub fn lanes_eq(self, other: Self) -> Vector<i32, N> {
        self.zip_map(other, |a, b| lane_mask(a == b))
    }

    pub fn lanes_ne(self, other: Self) -> Vector<i32, N> {
        self.zip_map(other, |a, b| lane_mask(a != b))
    }

    pub fn lanes_gt(self, other: Self) -> Vector<i32, N> {
        self.zip_map(other, |a, b| lane_mask(a > b))
    }

    pub fn lanes_ge(self, other: Self) -> Vector<i32, N> {
        self.zip_map(other, |a, b| lane_mask(a >= b))
    }

    pub fn lanes_lt(self, other: Self) -> Vector<i32, N> {
        self.zip_map(other, |a, b| lane_mask(a < b))
    }

    pub fn lanes_le(self, other: Self) -> Vector<i32, N> {
        self.zip_map(other, |a, b| lane_mask(a <= b))
    }
}

impl<T: Lanes<N>, const N: usize> Relational for Vector<T, N>
where
    i32: Lanes<N>,
{
    type Mask = Vector<i32, N>;

    fn isequal(self, other: Self) -> Self::Mask {
        self.lanes_eq(other)
    }

    fn isnotequal(self, other: Self) -> Self::Mask {
        self.lanes_ne(other)
    }

    fn isgreater(self, other: Self) -> Self::Mask {
        self.lanes_gt(other)
    }

    fn isgreaterequal(self, other: Self) -> Self::Mask {
        self.lanes_ge(other)
    }

    fn isless(self, other: Self) -> Self::Mask {
        self.lanes_lt(other)
    }

    fn islessequal(self, other: Self) -> Self::Mask {
        self.lanes_le(other)
    }

    fn isnan(self) -> Self::Mask {
        self.map(|a| lane_mask(a.lane_is_nan()))
    }

    fn isinf(self) -> Self::Mask {
        self.map(|a| lane_mask(a.lane_is_infinite()))
    }

    fn signbit(self) -> Self::Mask {
        self.map(|a| lane_mask(a.lane_sign_bit()))
    }
}

pub fn isequal<T: Relational>(a: T, b: T) -> T::Mask {
    a.isequal(b)
}

pub fn isnotequal<T: Relational>(a: T, b: T) -> T::Mask {
    a.isnotequal(b)
}

pub fn isgreater<T: Relational>(a: T, b: T) -> T::Mask {
    a.isgreater(b)
}

pub fn isgreaterequal<T: Relational>(a: T, b: T) -> T::Mask {
    a.isgreaterequal(b)
}

pub fn isless<T: Relational>(a: T, b: T) -> T::Mask {
    a.isless(b)
}

pub fn islessequal<T: Relational>(a: T, b: T) -> T::Mask {
    a.islessequal(b)
}

pub fn isnan<T: Relational>(x: T) -> T::Mask {
    x.isnan()
}

pub fn isinf<T: Relational>(x: T) -> T::Mask {
    x.isinf()
}

pub fn signbit<T: Relational>(x: T) -> T::Mask {
    x.signbit()
}

/// Per-lane choice between two values.
///
/// Scalars pick `b` when `c` is non-zero. Vectors pick `b[i]` when the most
/// significant bit of `c[i]` is set, which covers the `-1` true sentinel.
pub trait Select<M>: Sized {
    fn select(self, b: Self, c: M) -> Self;
}

impl<T, M, const N: usize> Select<Vector<M, N>> for Vector<T, N>
where
    T: Lanes<N>,
    M: Lanes<N> + IntScalar,
{
    fn select(self, b: Self, c: Vector<M, N>) -> Self {
        let mut out = self;
        for ((o, &bi), &ci) in out
            .as_mut_array()
            .iter_mut()
            .zip(b.as_array())
            .zip(c.as_array())
        {
            if ci.lane_msb() {
                *o = bi;
            }
        }
        out
    }
}

pub fn select<V: Select<M>, M>(a: V, b: V, c: M) -> V {
    a.select(b, c)
}

/// Bitwise choice: each result bit comes from `b` where `c` has a one bit,
/// otherwise from `a`.
pub fn bitselect<V: Pod>(a: V, b: V, c: V) -> V {
    let mut out = a;
    let bytes = bytemuck::bytes_of_mut(&mut out);
    let b = bytemuck::bytes_of(&b);
    let c = bytemuck::bytes_of(&c);
    for ((o, &bb), &cb) in bytes.iter_mut().zip(b).zip(c) {
        *o = (*o & !cb) | (bb & cb);
    }
    out
}

/// Reduction of a comparison mask.
pub trait MaskReduce: Copy {
    /// 1 if the most significant bit of any lane is set.
    fn any(self) -> i32;
    /// 1 if the most significant bit of every lane is set.
    fn all(self) -> i32;
}

macro_rules! scalar_mask {
    ($($t:ty),*) => {$(
        impl MaskReduce for $t {
            fn any(self) -> i32 { self.lane_msb() as i32 }
            fn all(self) -> i32 { self.lane_msb() as i32 }
        }
    )*};
}

scalar_mask!(i8, i16, i32, i64);

impl<M: Lanes<N> + IntScalar, const N: usize> MaskReduce for Vector<M, N> {
    fn any(self) -> i32 {
        self.as_array().iter().any(|m| m.lane_msb()) as i32
    }

    fn all(self) -> i32 {
        self.as_array().iter().all(|m| m.lane_msb()) as i32
    }
}

pub fn any<M: MaskReduce>(mask: M) -> i32 {
    mask.any()
}

pub fn all<M: MaskReduce>(mask: M) -> i32 {
    mask.all()
}
