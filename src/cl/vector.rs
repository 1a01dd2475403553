//! Shading-language style vector types.
//!
//! `Vector<T, N>` stores `N` lanes padded to the next power of two, with an
//! alignment equal to its padded size, so a `Vector<f32, 3>` occupies 16
//! bytes exactly like a `float3` on a GPU.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;
use std::ops::{
    Add, AddAssign, BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Div,
    DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Not, Rem, RemAssign, Shl, ShlAssign, Shr,
    ShrAssign, Sub, SubAssign,
};

/// Lane type of a [`Vector`].
///
/// Integer arithmetic wraps on overflow; integer division by zero panics.
pub trait Scalar:
    Pod + Default + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static
{
    fn lane_add(self, rhs: Self) -> Self;
    fn lane_sub(self, rhs: Self) -> Self;
    fn lane_mul(self, rhs: Self) -> Self;
    fn lane_div(self, rhs: Self) -> Self;
    fn lane_rem(self, rhs: Self) -> Self;
    fn lane_neg(self) -> Self;
    fn lane_is_nan(self) -> bool;
    fn lane_is_infinite(self) -> bool;
    fn lane_sign_bit(self) -> bool;
}

/// Integer lane type.
pub trait IntScalar: Scalar + Eq + Ord {
    const BITS: u32;

    fn lane_and(self, rhs: Self) -> Self;
    fn lane_or(self, rhs: Self) -> Self;
    fn lane_xor(self, rhs: Self) -> Self;
    fn lane_not(self) -> Self;
    /// Shift amount is taken modulo the bit width.
    fn lane_shl(self, rhs: Self) -> Self;
    fn lane_shr(self, rhs: Self) -> Self;
    fn lane_msb(self) -> bool;
}

macro_rules! int_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            #[inline] fn lane_add(self, rhs: Self) -> Self { self.wrapping_add(rhs) }
            #[inline] fn lane_sub(self, rhs: Self) -> Self { self.wrapping_sub(rhs) }
            #[inline] fn lane_mul(self, rhs: Self) -> Self { self.wrapping_mul(rhs) }
            #[inline] fn lane_div(self, rhs: Self) -> Self { self.wrapping_div(rhs) }
            #[inline] fn lane_rem(self, rhs: Self) -> Self { self.wrapping_rem(rhs) }
            #[inline] fn lane_neg(self) -> Self { self.wrapping_neg() }
            #[inline] fn lane_is_nan(self) -> bool { false }
            #[inline] fn lane_is_infinite(self) -> bool { false }
            #[inline] fn lane_sign_bit(self) -> bool { self.leading_zeros() == 0 }
        }

        impl IntScalar for $t {
            const BITS: u32 = <$t>::BITS;

            #[inline] fn lane_and(self, rhs: Self) -> Self { self & rhs }
            #[inline] fn lane_or(self, rhs: Self) -> Self { self | rhs }
            #[inline] fn lane_xor(self, rhs: Self) -> Self { self ^ rhs }
            #[inline] fn lane_not(self) -> Self { !self }
            #[inline] fn lane_shl(self, rhs: Self) -> Self { self.wrapping_shl(rhs as u32) }
            #[inline] fn lane_shr(self, rhs: Self) -> Self { self.wrapping_shr(rhs as u32) }
            #[inline] fn lane_msb(self) -> bool { self.leading_zeros() == 0 }
        }
    )*};
}

macro_rules! float_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            #[inline] fn lane_add(self, rhs: Self) -> Self { self + rhs }
            #[inline] fn lane_sub(self, rhs: Self) -> Self { self - rhs }
            #[inline] fn lane_mul(self, rhs: Self) -> Self { self * rhs }
            #[inline] fn lane_div(self, rhs: Self) -> Self { self / rhs }
            #[inline] fn lane_rem(self, rhs: Self) -> Self { self % rhs }
            #[inline] fn lane_neg(self) -> Self { -self }
            #[inline] fn lane_is_nan(self) -> bool { self.is_nan() }
            #[inline] fn lane_is_infinite(self) -> bool { self.is_infinite() }
            #[inline] fn lane_sign_bit(self) -> bool { self.is_sign_negative() }
        }
    )*};
}

int_scalar!(i8, u8, i16, u16, i32, u32, i64, u64);
float_scalar!(f16, f32, f64);

#[doc(hidden)]
pub mod layout {
    //! Alignment wrappers used as vector storage.

    macro_rules! aligned {
        ($($name:ident => $align:literal),*) => {$(
            #[repr(C, align($align))]
            #[derive(Debug, Clone, Copy)]
            pub struct $name<A>(pub A);
        )*};
    }

    aligned!(Align2 => 2, Align4 => 4, Align8 => 8, Align16 => 16, Align32 => 32);
}

use layout::{Align16, Align2, Align32, Align4, Align8};

/// Storage selection for an `N`-lane vector of `Self`.
///
/// # Safety
///
/// `Storage` must begin with `N` lanes of `Self` at offset 0, have no
/// padding, and have the size and alignment of `N` rounded up to a power of
/// two times `size_of::<Self>()`.
pub unsafe trait Lanes<const N: usize>: Scalar {
    type Storage: Pod;
}

macro_rules! lanes {
    ($($t:ty => $two:ident, $four:ident;)*) => {$(
        unsafe impl Lanes<2> for $t { type Storage = $two<[$t; 2]>; }
        unsafe impl Lanes<3> for $t { type Storage = $four<[$t; 4]>; }
        unsafe impl Lanes<4> for $t { type Storage = $four<[$t; 4]>; }

        // size equals alignment, so neither wrapper has padding bytes
        unsafe impl Zeroable for $two<[$t; 2]> {}
        unsafe impl Pod for $two<[$t; 2]> {}
        unsafe impl Zeroable for $four<[$t; 4]> {}
        unsafe impl Pod for $four<[$t; 4]> {}
    )*};
}

lanes! {
    i8 => Align2, Align4;
    u8 => Align2, Align4;
    i16 => Align4, Align8;
    u16 => Align4, Align8;
    f16 => Align4, Align8;
    i32 => Align8, Align16;
    u32 => Align8, Align16;
    f32 => Align8, Align16;
    i64 => Align16, Align32;
    u64 => Align16, Align32;
    f64 => Align16, Align32;
}

#[repr(transparent)]
pub struct Vector<T: Lanes<N>, const N: usize> {
    storage: T::Storage,
}

impl<T: Lanes<N>, const N: usize> Vector<T, N> {
    pub const LANES: usize = N;

    pub fn new(lanes: [T; N]) -> Self {
        let mut v = Self::zeroed();
        *v.as_mut_array() = lanes;
        v
    }

    pub fn splat(value: T) -> Self {
        Self::new([value; N])
    }

    pub fn as_array(&self) -> &[T; N] {
        // SAFETY: `Lanes` guarantees N leading lanes of T at offset 0.
        unsafe { &*(self as *const Self).cast::<[T; N]>() }
    }

    pub fn as_mut_array(&mut self) -> &mut [T; N] {
        // SAFETY: as above, and the padding lane is never exposed.
        unsafe { &mut *(self as *mut Self).cast::<[T; N]>() }
    }

    pub fn to_array(self) -> [T; N] {
        *self.as_array()
    }

    pub fn lanes(&self) -> &[T] {
        self.as_array()
    }

    pub fn x(&self) -> T {
        self.as_array()[0]
    }

    pub fn y(&self) -> T {
        self.as_array()[1]
    }

    pub fn map<U: Lanes<N>>(self, f: impl Fn(T) -> U) -> Vector<U, N> {
        let mut out = Vector::<U, N>::zeroed();
        for (o, &lane) in out.as_mut_array().iter_mut().zip(self.as_array()) {
            *o = f(lane);
        }
        out
    }

    pub fn zip_map<U: Lanes<N>, R: Lanes<N>>(
        self,
        other: Vector<U, N>,
        f: impl Fn(T, U) -> R,
    ) -> Vector<R, N> {
        let mut out = Vector::<R, N>::zeroed();
        let lanes = self.as_array().iter().zip(other.as_array());
        for (o, (&a, &b)) in out.as_mut_array().iter_mut().zip(lanes) {
            *o = f(a, b);
        }
        out
    }
}

impl<T: Lanes<3>> Vector<T, 3> {
    pub fn z(&self) -> T {
        self.as_array()[2]
    }
}

impl<T: Lanes<4>> Vector<T, 4> {
    pub fn z(&self) -> T {
        self.as_array()[2]
    }

    pub fn w(&self) -> T {
        self.as_array()[3]
    }
}

impl<T: Lanes<N>, const N: usize> Clone for Vector<T, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Lanes<N>, const N: usize> Copy for Vector<T, N> {}

unsafe impl<T: Lanes<N>, const N: usize> Zeroable for Vector<T, N> {}
unsafe impl<T: Lanes<N>, const N: usize> Pod for Vector<T, N> {}

impl<T: Lanes<N>, const N: usize> Default for Vector<T, N> {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Structural equality of all lanes. Lane-wise comparison lives in
/// [`crate::cl::relational`].
impl<T: Lanes<N>, const N: usize> PartialEq for Vector<T, N> {
    fn eq(&self, other: &Self) -> bool {
        self.as_array() == other.as_array()
    }
}

impl<T: Lanes<N>, const N: usize> fmt::Debug for Vector<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_array()).finish()
    }
}

impl<T: Lanes<N>, const N: usize> Index<usize> for Vector<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_array()[index]
    }
}

impl<T: Lanes<N>, const N: usize> IndexMut<usize> for Vector<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_array()[index]
    }
}

impl<T: Lanes<N>, const N: usize> From<[T; N]> for Vector<T, N> {
    fn from(lanes: [T; N]) -> Self {
        Self::new(lanes)
    }
}

impl<T: Lanes<N>, const N: usize> From<Vector<T, N>> for [T; N] {
    fn from(v: Vector<T, N>) -> Self {
        v.to_array()
    }
}

macro_rules! binary_op {
    ($Op:ident, $op:ident, $OpAssign:ident, $op_assign:ident, $bound:ident, $lane:ident) => {
        impl<T: Lanes<N> + $bound, const N: usize> $Op for Vector<T, N> {
            type Output = Self;

            #[inline]
            fn $op(self, rhs: Self) -> Self {
                self.zip_map(rhs, T::$lane)
            }
        }

        impl<T: Lanes<N> + $bound, const N: usize> $Op<T> for Vector<T, N> {
            type Output = Self;

            #[inline]
            fn $op(self, rhs: T) -> Self {
                self.map(|lane| lane.$lane(rhs))
            }
        }

        impl<T: Lanes<N> + $bound, const N: usize> $OpAssign for Vector<T, N> {
            #[inline]
            fn $op_assign(&mut self, rhs: Self) {
                *self = $Op::$op(*self, rhs);
            }
        }

        impl<T: Lanes<N> + $bound, const N: usize> $OpAssign<T> for Vector<T, N> {
            #[inline]
            fn $op_assign(&mut self, rhs: T) {
                *self = $Op::$op(*self, rhs);
            }
        }
    };
}

binary_op!(Add, add, AddAssign, add_assign, Scalar, lane_add);
binary_op!(Sub, sub, SubAssign, sub_assign, Scalar, lane_sub);
binary_op!(Mul, mul, MulAssign, mul_assign, Scalar, lane_mul);
binary_op!(Div, div, DivAssign, div_assign, Scalar, lane_div);
binary_op!(Rem, rem, RemAssign, rem_assign, Scalar, lane_rem);
binary_op!(BitAnd, bitand, BitAndAssign, bitand_assign, IntScalar, lane_and);
binary_op!(BitOr, bitor, BitOrAssign, bitor_assign, IntScalar, lane_or);
binary_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, IntScalar, lane_xor);
binary_op!(Shl, shl, ShlAssign, shl_assign, IntScalar, lane_shl);
binary_op!(Shr, shr, ShrAssign, shr_assign, IntScalar, lane_shr);

impl<T: Lanes<N>, const N: usize> Neg for Vector<T, N> {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(T::lane_neg)
    }
}

impl<T: Lanes<N> + IntScalar, const N: usize> Not for Vector<T, N> {
    type Output = Self;

    fn not(self) -> Self {
        self.map(T::lane_not)
    }
}

// scalar on the left: `2.0 * v`
macro_rules! scalar_lhs {
    ($($t:ty),*) => {$(
        impl<const N: usize> Add<Vector<$t, N>> for $t where $t: Lanes<N> {
            type Output = Vector<$t, N>;
            fn add(self, rhs: Vector<$t, N>) -> Vector<$t, N> { rhs.map(|l| self.lane_add(l)) }
        }
        impl<const N: usize> Sub<Vector<$t, N>> for $t where $t: Lanes<N> {
            type Output = Vector<$t, N>;
            fn sub(self, rhs: Vector<$t, N>) -> Vector<$t, N> { rhs.map(|l| self.lane_sub(l)) }
        }
        impl<const N: usize> Mul<Vector<$t, N>> for $t where $t: Lanes<N> {
            type Output = Vector<$t, N>;
            fn mul(self, rhs: Vector<$t, N>) -> Vector<$t, N> { rhs.map(|l| self.lane_mul(l)) }
        }
        impl<const N: usize> Div<Vector<$t, N>> for $t where $t: Lanes<N> {
            type Output = Vector<$t, N>;
            fn div(self, rhs: Vector<$t, N>) -> Vector<$t, N> { rhs.map(|l| self.lane_div(l)) }
        }
    )*};
}

scalar_lhs!(i8, u8, i16, u16, i32, u32, i64, u64, f16, f32, f64);

macro_rules! aliases {
    ($($t:ty => $two:ident, $three:ident, $four:ident;)*) => {$(
        pub type $two = Vector<$t, 2>;
        pub type $three = Vector<$t, 3>;
        pub type $four = Vector<$t, 4>;
    )*};
}

#[allow(non_camel_case_types)]
mod aliases {
    use super::*;

    aliases! {
        i8 => char2, char3, char4;
        u8 => uchar2, uchar3, uchar4;
        i16 => short2, short3, short4;
        u16 => ushort2, ushort3, ushort4;
        i32 => int2, int3, int4;
        u32 => uint2, uint3, uint4;
        i64 => long2, long3, long4;
        u64 => ulong2, ulong3, ulong4;
        f16 => half2, half3, half4;
        f32 => float2, float3, float4;
        f64 => double2, double3, double4;
    }
}

pub use aliases::*;
