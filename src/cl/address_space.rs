//! Address-space tagged pointers.
//!
//! A kernel sees memory through [`AddressSpacePointer`], a bounds-carrying
//! view tagged with one of the four logical address spaces. The tag is a
//! zero-sized type parameter, so a kernel helper generic over `S` runs
//! unchanged against global, local, constant or private memory.
//!
//! Element loads and stores are relaxed atomic accesses performed word by
//! word. Two work-items writing the same element without an atomic
//! primitive still race, but the race is on values only.

use bytemuck::Pod;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU16, AtomicU32, AtomicU64, AtomicU8, Ordering};

mod sealed {
    pub trait Sealed {}
}

/// Runtime name of an address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpaceType {
    Global,
    Local,
    Constant,
    Private,
}

pub trait AddressSpace: sealed::Sealed + Copy + Default + Send + Sync + 'static {
    const TYPE: AddressSpaceType;
}

/// Address spaces a kernel may store into.
pub trait Writable: AddressSpace {}

/// Address spaces the atomic primitives accept.
pub trait AtomicSpace: Writable {}

/// Buffer memory shared by every work-item of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Global;

/// Work-group shared memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Local;

/// Read-only memory, typically a uniform buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Constant;

/// Memory owned by a single work-item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Private;

macro_rules! address_space {
    ($space:ident => $($marker:ident),*) => {
        impl sealed::Sealed for $space {}
        impl AddressSpace for $space {
            const TYPE: AddressSpaceType = AddressSpaceType::$space;
        }
        $(impl $marker for $space {})*
    };
}

address_space!(Global => Writable, AtomicSpace);
address_space!(Local => Writable, AtomicSpace);
address_space!(Constant =>);
address_space!(Private => Writable);

/// Non-owning typed view of `len` elements in address space `S`.
pub struct AddressSpacePointer<'a, T, S> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<(&'a [T], S)>,
}

pub type GlobalPtr<'a, T> = AddressSpacePointer<'a, T, Global>;
pub type LocalPtr<'a, T> = AddressSpacePointer<'a, T, Local>;
pub type ConstantPtr<'a, T> = AddressSpacePointer<'a, T, Constant>;
pub type PrivatePtr<'a, T> = AddressSpacePointer<'a, T, Private>;

// Every access through the pointer is atomic, so sharing it between
// worker threads is sound for any Pod element.
unsafe impl<'a, T: Send + Sync, S> Send for AddressSpacePointer<'a, T, S> {}
unsafe impl<'a, T: Send + Sync, S> Sync for AddressSpacePointer<'a, T, S> {}

impl<'a, T, S> Clone for AddressSpacePointer<'a, T, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T, S> Copy for AddressSpacePointer<'a, T, S> {}

impl<'a, T, S: AddressSpace> fmt::Debug for AddressSpacePointer<'a, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpacePointer")
            .field("space", &S::TYPE)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl<'a, T: Pod, S: AddressSpace> AddressSpacePointer<'a, T, S> {
    /// # Safety
    ///
    /// `ptr` must be aligned for `T` and valid for reads (and writes, if `S`
    /// is writable) of `len` elements for `'a`, and the memory must only be
    /// accessed through atomic operations while the view is alive.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }

    /// Empty view.
    pub fn dangling() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            _marker: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn address_space(&self) -> AddressSpaceType {
        S::TYPE
    }

    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// View starting `count` elements further.
    pub fn offset(self, count: usize) -> Self {
        assert!(
            count <= self.len,
            "pointer offset {} past the end of a {}-element {:?} view",
            count,
            self.len,
            S::TYPE
        );
        Self {
            // SAFETY: count <= len keeps the pointer within (or one past) the view.
            ptr: unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(count)) },
            len: self.len - count,
            _marker: PhantomData,
        }
    }

    /// Element 0, the `*p` of a kernel.
    pub fn get(&self) -> T {
        self.read(0)
    }

    pub fn read(&self, index: usize) -> T {
        let element = self.element_ptr(index);
        // SAFETY: element_ptr checked the bounds.
        unsafe { load_relaxed(element) }
    }

    pub(crate) fn element_ptr(&self, index: usize) -> *mut T {
        assert!(
            index < self.len,
            "index {} out of bounds for a {}-element {:?} view",
            index,
            self.len,
            S::TYPE
        );
        // SAFETY: index < len.
        unsafe { self.ptr.as_ptr().add(index) }
    }
}

impl<'a, T: Pod, S: Writable> AddressSpacePointer<'a, T, S> {
    pub fn write(&self, index: usize, value: T) {
        let element = self.element_ptr(index);
        // SAFETY: element_ptr checked the bounds; S is writable.
        unsafe { store_relaxed(element, value) }
    }

    pub fn set(&self, value: T) {
        self.write(0, value)
    }
}

impl<'a, T: Pod> AddressSpacePointer<'a, T, Private> {
    /// Private view of a work-item owned slice.
    pub fn from_mut(slice: &'a mut [T]) -> Self {
        Self {
            // SAFETY: slice pointers are never null.
            ptr: unsafe { NonNull::new_unchecked(slice.as_mut_ptr()) },
            len: slice.len(),
            _marker: PhantomData,
        }
    }
}

macro_rules! word_access {
    ($load:ident, $store:ident, $word:ty, $atomic:ty) => {
        unsafe fn $load(src: *const u8, dst: &mut [u8]) {
            const WIDTH: usize = std::mem::size_of::<$word>();
            for (i, chunk) in dst.chunks_exact_mut(WIDTH).enumerate() {
                let word = <$atomic>::from_ptr(src.add(i * WIDTH) as *mut $word)
                    .load(Ordering::Relaxed);
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
        }

        unsafe fn $store(dst: *mut u8, src: &[u8]) {
            const WIDTH: usize = std::mem::size_of::<$word>();
            for (i, chunk) in src.chunks_exact(WIDTH).enumerate() {
                let mut bytes = [0u8; WIDTH];
                bytes.copy_from_slice(chunk);
                <$atomic>::from_ptr(dst.add(i * WIDTH) as *mut $word)
                    .store(<$word>::from_ne_bytes(bytes), Ordering::Relaxed);
            }
        }
    };
}

word_access!(load_u8, store_u8, u8, AtomicU8);
word_access!(load_u16, store_u16, u16, AtomicU16);
word_access!(load_u32, store_u32, u32, AtomicU32);
word_access!(load_u64, store_u64, u64, AtomicU64);

/// Word-wise relaxed atomic load; the word is the alignment of `T`, capped at 8.
///
/// # Safety
///
/// `src` must be aligned and valid for reads of `T`.
pub(crate) unsafe fn load_relaxed<T: Pod>(src: *const T) -> T {
    let mut value = T::zeroed();
    let dst = bytemuck::bytes_of_mut(&mut value);
    let src = src.cast::<u8>();
    match std::mem::align_of::<T>() {
        1 => load_u8(src, dst),
        2 => load_u16(src, dst),
        4 => load_u32(src, dst),
        _ => load_u64(src, dst),
    }
    value
}

/// # Safety
///
/// `dst` must be aligned and valid for writes of `T`.
pub(crate) unsafe fn store_relaxed<T: Pod>(dst: *mut T, value: T) {
    let src = bytemuck::bytes_of(&value);
    let dst = dst.cast::<u8>();
    match std::mem::align_of::<T>() {
        1 => store_u8(dst, src),
        2 => store_u16(dst, src),
        4 => store_u32(dst, src),
        _ => store_u64(dst, src),
    }
}
