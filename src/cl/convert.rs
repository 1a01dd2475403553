//! Conversion built-ins.
//!
//! [`convert`] changes the value (numeric cast, float to integer truncates
//! and saturates). [`as_type`] reinterprets the bits and requires equal
//! sizes.

use super::vector::{Lanes, Vector};
use bytemuck::Pod;
use half::f16;

pub trait ConvertTo<U> {
    fn convert_to(self) -> U;
}

macro_rules! convert_as {
    (@targets $src:ty => $($dst:ty),*) => {$(
        impl ConvertTo<$dst> for $src {
            #[inline]
            fn convert_to(self) -> $dst {
                self as $dst
            }
        }
    )*};
    ($($src:ty),*) => {$(
        convert_as!(@targets $src => i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

        impl ConvertTo<f16> for $src {
            #[inline]
            fn convert_to(self) -> f16 {
                f16::from_f64(self as f64)
            }
        }
    )*};
}

convert_as!(i8, u8, i16, u16, i32, u32, i64, u64, f32, f64);

impl<U> ConvertTo<U> for f16
where
    f64: ConvertTo<U>,
{
    #[inline]
    fn convert_to(self) -> U {
        self.to_f64().convert_to()
    }
}

impl<T, U, const N: usize> ConvertTo<Vector<U, N>> for Vector<T, N>
where
    T: Lanes<N> + ConvertTo<U>,
    U: Lanes<N>,
{
    fn convert_to(self) -> Vector<U, N> {
        self.map(<T as ConvertTo<U>>::convert_to)
    }
}

impl<T: Lanes<N>, const N: usize> Vector<T, N> {
    /// Lane-wise numeric conversion.
    pub fn convert<U: Lanes<N>>(self) -> Vector<U, N>
    where
        T: ConvertTo<U>,
    {
        self.convert_to()
    }

    /// Bit reinterpretation as another type of the same size.
    pub fn as_type<U: Pod>(self) -> U {
        bytemuck::cast(self)
    }
}

pub fn convert<U, T: ConvertTo<U>>(value: T) -> U {
    value.convert_to()
}

/// # Panics
///
/// Panics if `T` and `U` differ in size.
pub fn as_type<U: Pod, T: Pod>(value: T) -> U {
    bytemuck::cast(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cl::vector::{float3, float4, int3, int4, uchar4};

    #[test]
    fn test_scalar_convert() {
        assert_eq!(convert::<i32, _>(3.9f32), 3);
        assert_eq!(convert::<u8, _>(-1.0f32), 0);
        assert_eq!(convert::<f32, _>(7u64), 7.0);
        assert_eq!(convert::<f32, _>(f16::from_f32(0.5)), 0.5);
        assert_eq!(convert::<f16, _>(2i32), f16::from_f32(2.0));
    }

    #[test]
    fn test_vector_convert() {
        let v = float4::new([1.5, -2.5, 300.0, 0.0]);
        let i: int4 = v.convert();
        assert_eq!(i.to_array(), [1, -2, 300, 0]);

        let c: uchar4 = i.convert();
        assert_eq!(c.to_array(), [1, 254, 44, 0]);
    }

    #[test]
    fn test_as_type_is_bitwise() {
        let bits: u32 = as_type(1.0f32);
        assert_eq!(bits, 0x3F80_0000);

        let v = float3::new([1.0, -0.0, 2.0]);
        let raw: int3 = v.as_type();
        assert_eq!(raw.to_array(), [0x3F80_0000, i32::MIN, 0x4000_0000]);
    }

    #[test]
    #[should_panic]
    fn test_as_type_size_mismatch() {
        let _: u64 = as_type(1u32);
    }
}
