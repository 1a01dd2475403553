//! Memory resources backing buffers and work-group local memory.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source of raw memory for every allocation a sub-platform makes.
///
/// One resource is shared by all sub-platforms of a platform and may be
/// called from any thread, so implementations carry their own
/// synchronization.
pub trait MemoryResource: Send + Sync + std::fmt::Debug {
    /// Allocate memory with the given layout. Returns null on failure.
    fn allocate(&self, layout: Layout) -> *mut u8;

    /// Release memory obtained from [`MemoryResource::allocate`].
    fn deallocate(&self, ptr: *mut u8, layout: Layout);

    /// Allocate zero-filled memory.
    fn allocate_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.allocate(layout);
        if !ptr.is_null() {
            unsafe {
                std::ptr::write_bytes(ptr, 0, layout.size());
            }
        }
        ptr
    }
}

/// System allocator wrapper that keeps byte counters.
#[derive(Debug, Default)]
pub struct SystemMemoryResource {
    allocated: AtomicUsize,
    peak: AtomicUsize,
}

impl SystemMemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently handed out.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    /// High-water mark of [`SystemMemoryResource::allocated_bytes`].
    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

impl MemoryResource for SystemMemoryResource {
    fn allocate(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            let now = self.allocated.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
            self.peak.fetch_max(now, Ordering::Relaxed);
        }
        ptr
    }

    fn allocate_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            let now = self.allocated.fetch_add(layout.size(), Ordering::Relaxed) + layout.size();
            self.peak.fetch_max(now, Ordering::Relaxed);
        }
        ptr
    }

    fn deallocate(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        self.allocated.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

/// Per-device heap accounting: bytes in use and the peak.
#[derive(Debug, Default)]
pub struct HeapUsage {
    total: AtomicUsize,
    peak: AtomicUsize,
}

impl HeapUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn grow(&self, bytes: usize) {
        let now = self.total.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
    }

    pub(crate) fn shrink(&self, bytes: usize) {
        self.total.fetch_sub(bytes, Ordering::Relaxed);
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_resource() {
        let resource = SystemMemoryResource::new();
        let layout = Layout::from_size_align(1024, 16).unwrap();

        let ptr = resource.allocate(layout);
        assert!(!ptr.is_null());
        assert_eq!(resource.allocated_bytes(), 1024);

        resource.deallocate(ptr, layout);
        assert_eq!(resource.allocated_bytes(), 0);
        assert_eq!(resource.peak_bytes(), 1024);
    }

    #[test]
    fn test_allocate_zeroed() {
        let resource = SystemMemoryResource::new();
        let layout = Layout::from_size_align(64, 32).unwrap();

        let ptr = resource.allocate_zeroed(layout);
        assert!(!ptr.is_null());
        assert_eq!(ptr as usize % 32, 0);

        unsafe {
            for i in 0..64 {
                assert_eq!(*ptr.add(i), 0);
            }
        }

        resource.deallocate(ptr, layout);
    }

    #[test]
    fn test_heap_usage_peak() {
        let heap = HeapUsage::new();
        heap.grow(100);
        heap.grow(50);
        heap.shrink(120);
        heap.grow(10);

        assert_eq!(heap.total(), 40);
        assert_eq!(heap.peak(), 150);
    }
}
