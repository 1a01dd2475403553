//! Vector load and store built-ins.
//!
//! `offset` counts whole vectors: lanes are read from element
//! `offset * N` onwards. The half variants convert between `f16` storage
//! and `f32` values at the access.

use super::address_space::{AddressSpace, AddressSpacePointer, Writable};
use super::vector::{Lanes, Vector};
use half::f16;

pub fn vload<T, const N: usize, S>(offset: usize, p: AddressSpacePointer<'_, T, S>) -> Vector<T, N>
where
    T: Lanes<N>,
    S: AddressSpace,
{
    let base = offset * N;
    let mut out = Vector::<T, N>::default();
    for (i, lane) in out.as_mut_array().iter_mut().enumerate() {
        *lane = p.read(base + i);
    }
    out
}

pub fn vstore<T, const N: usize, S>(data: Vector<T, N>, offset: usize, p: AddressSpacePointer<'_, T, S>)
where
    T: Lanes<N>,
    S: Writable,
{
    let base = offset * N;
    for (i, &lane) in data.as_array().iter().enumerate() {
        p.write(base + i, lane);
    }
}

pub fn vload_half<S: AddressSpace>(offset: usize, p: AddressSpacePointer<'_, f16, S>) -> f32 {
    p.read(offset).to_f32()
}

pub fn vstore_half<S: Writable>(data: f32, offset: usize, p: AddressSpacePointer<'_, f16, S>) {
    p.write(offset, f16::from_f32(data));
}

pub fn vload_half_n<const N: usize, S>(
    offset: usize,
    p: AddressSpacePointer<'_, f16, S>,
) -> Vector<f32, N>
where
    f32: Lanes<N>,
    f16: Lanes<N>,
    S: AddressSpace,
{
    vload::<f16, N, S>(offset, p).map(f16::to_f32)
}

pub fn vstore_half_n<const N: usize, S>(
    data: Vector<f32, N>,
    offset: usize,
    p: AddressSpacePointer<'_, f16, S>,
) where
    f32: Lanes<N>,
    f16: Lanes<N>,
    S: Writable,
{
    vstore::<f16, N, S>(data.map(f16::from_f32), offset, p);
}
