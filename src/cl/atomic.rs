//! Atomic built-ins over global and local memory.
//!
//! Each primitive operates on the first element of the pointer and returns
//! the value held before the operation. They compile to real atomic
//! instructions on host memory, so work-items of different groups running
//! on different worker threads may contend on the same location.

use super::address_space::{AddressSpacePointer, AtomicSpace};
use super::vector::{IntScalar, Scalar};
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicU32, AtomicU64, Ordering};

const RMW: Ordering = Ordering::AcqRel;
const LOAD: Ordering = Ordering::Acquire;

/// Scalars supporting add, sub, xchg and cmpxchg.
///
/// # Safety
///
/// Implementations must perform the operation atomically on `ptr`, which
/// callers guarantee is valid and aligned.
pub unsafe trait AtomicScalar: Scalar {
    #[doc(hidden)]
    unsafe fn fetch_add(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn fetch_sub(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn swap(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn compare_exchange(ptr: *mut Self, current: Self, new: Self) -> Self;
}

/// Integer scalars with the full atomic set.
///
/// # Safety
///
/// As for [`AtomicScalar`].
pub unsafe trait AtomicInteger: AtomicScalar + IntScalar {
    #[doc(hidden)]
    unsafe fn fetch_min(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn fetch_max(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn fetch_and(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn fetch_or(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    unsafe fn fetch_xor(ptr: *mut Self, value: Self) -> Self;
    #[doc(hidden)]
    const ONE: Self;
}

macro_rules! atomic_integer {
    ($($t:ty => $atomic:ty),*) => {$(
        unsafe impl AtomicScalar for $t {
            unsafe fn fetch_add(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_add(value, RMW)
            }

            unsafe fn fetch_sub(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_sub(value, RMW)
            }

            unsafe fn swap(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).swap(value, RMW)
            }

            unsafe fn compare_exchange(ptr: *mut Self, current: Self, new: Self) -> Self {
                match <$atomic>::from_ptr(ptr).compare_exchange(current, new, RMW, LOAD) {
                    Ok(old) | Err(old) => old,
                }
            }
        }

        unsafe impl AtomicInteger for $t {
            const ONE: Self = 1;

            unsafe fn fetch_min(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_min(value, RMW)
            }

            unsafe fn fetch_max(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_max(value, RMW)
            }

            unsafe fn fetch_and(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_and(value, RMW)
            }

            unsafe fn fetch_or(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_or(value, RMW)
            }

            unsafe fn fetch_xor(ptr: *mut Self, value: Self) -> Self {
                <$atomic>::from_ptr(ptr).fetch_xor(value, RMW)
            }
        }
    )*};
}

atomic_integer!(i32 => AtomicI32, u32 => AtomicU32, i64 => AtomicI64, u64 => AtomicU64);

macro_rules! atomic_float {
    ($($t:ty => $atomic:ty),*) => {$(
        unsafe impl AtomicScalar for $t {
            unsafe fn fetch_add(ptr: *mut Self, value: Self) -> Self {
                let bits = <$atomic>::from_ptr(ptr.cast());
                let mut current = bits.load(Ordering::Relaxed);
                loop {
                    let new = (<$t>::from_bits(current) + value).to_bits();
                    match bits.compare_exchange_weak(current, new, RMW, Ordering::Relaxed) {
                        Ok(old) => return <$t>::from_bits(old),
                        Err(actual) => current = actual,
                    }
                }
            }

            unsafe fn fetch_sub(ptr: *mut Self, value: Self) -> Self {
                Self::fetch_add(ptr, -value)
            }

            unsafe fn swap(ptr: *mut Self, value: Self) -> Self {
                <$t>::from_bits(<$atomic>::from_ptr(ptr.cast()).swap(value.to_bits(), RMW))
            }

            /// Compares bit patterns, so `-0.0` and `0.0` differ and NaN can match.
            unsafe fn compare_exchange(ptr: *mut Self, current: Self, new: Self) -> Self {
                let bits = <$atomic>::from_ptr(ptr.cast());
                match bits.compare_exchange(current.to_bits(), new.to_bits(), RMW, LOAD) {
                    Ok(old) | Err(old) => <$t>::from_bits(old),
                }
            }
        }
    )*};
}

atomic_float!(f32 => AtomicU32, f64 => AtomicU64);

#[inline]
fn target<T: AtomicScalar, S: AtomicSpace>(p: &AddressSpacePointer<'_, T, S>) -> *mut T {
    let ptr = p.element_ptr(0);
    debug_assert_eq!(
        ptr as usize % std::mem::size_of::<T>(),
        0,
        "misaligned atomic operand"
    );
    ptr
}

pub fn atomic_add<T: AtomicScalar, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    // SAFETY: target() bounds-checks; views are valid for their lifetime.
    unsafe { T::fetch_add(target(&p), value) }
}

pub fn atomic_sub<T: AtomicScalar, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::fetch_sub(target(&p), value) }
}

pub fn atomic_xchg<T: AtomicScalar, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::swap(target(&p), value) }
}

/// Stores `value` if the current value equals `compare`. Returns the old value.
pub fn atomic_cmpxchg<T: AtomicScalar, S: AtomicSpace>(
    p: AddressSpacePointer<'_, T, S>,
    compare: T,
    value: T,
) -> T {
    unsafe { T::compare_exchange(target(&p), compare, value) }
}

pub fn atomic_inc<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>) -> T {
    unsafe { T::fetch_add(target(&p), T::ONE) }
}

pub fn atomic_dec<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>) -> T {
    unsafe { T::fetch_sub(target(&p), T::ONE) }
}

pub fn atomic_min<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::fetch_min(target(&p), value) }
}

pub fn atomic_max<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::fetch_max(target(&p), value) }
}

pub fn atomic_and<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::fetch_and(target(&p), value) }
}

pub fn atomic_or<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::fetch_or(target(&p), value) }
}

pub fn atomic_xor<T: AtomicInteger, S: AtomicSpace>(p: AddressSpacePointer<'_, T, S>, value: T) -> T {
    unsafe { T::fetch_xor(target(&p), value) }
}
