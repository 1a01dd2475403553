//! Kernel-side built-ins.
//!
//! Everything a kernel body touches while it runs: tagged pointers, vector
//! types, relational, math and geometric functions, conversions, vector
//! loads and stores, atomics, work-item queries and fences.

pub mod address_space;
pub mod atomic;
pub mod convert;
pub mod geometry;
pub mod math;
pub mod relational;
pub mod synchronization;
pub mod vector;
pub mod vload;
pub mod work_item;

pub use address_space::{
    AddressSpace, AddressSpacePointer, AddressSpaceType, AtomicSpace, Constant, ConstantPtr,
    Global, GlobalPtr, Local, LocalPtr, Private, PrivatePtr, Writable,
};
pub use atomic::{
    atomic_add, atomic_and, atomic_cmpxchg, atomic_dec, atomic_inc, atomic_max, atomic_min,
    atomic_or, atomic_sub, atomic_xchg, atomic_xor, AtomicInteger, AtomicScalar,
};
pub use convert::{as_type, convert, ConvertTo};
pub use geometry::{cross, distance, dot, length, normalize, Cross};
pub use math::{
    abs, acos, asin, atan, clamp, cos, degrees, exp, fabs, fma, frexp, ldexp, log, log2, max, min,
    pow, radians, rsqrt, sin, sqrt, tan, Abs, FloatScalar, LaneWise, MAXFLOAT, M_1_PI_F,
    M_2_PI_F, M_2_SQRTPI_F, M_E_F, M_LN10_F, M_LN2_F, M_LOG10E_F, M_LOG2E_F, M_PI_2_F, M_PI_4_F,
    M_PI_F, M_SQRT1_2_F, M_SQRT2_F,
};
pub use relational::{
    all, any, bitselect, isequal, isgreater, isgreaterequal, isinf, isless, islessequal, isnan,
    isnotequal, select, signbit, MaskReduce, Relational, Select, LANE_FALSE, LANE_TRUE,
};
pub use synchronization::{
    mem_fence, read_mem_fence, write_mem_fence, CLK_GLOBAL_MEM_FENCE, CLK_LOCAL_MEM_FENCE,
};
pub use vector::*;
pub use vload::{vload, vload_half, vload_half_n, vstore, vstore_half, vstore_half_n};
pub use work_item::WorkItem;
