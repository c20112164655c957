//! Late-bound service table storage.
//!
//! A `ServiceCell` holds a pointer to a `'static` table of function pointers
//! registered by the crate that implements a service, so lower crates can
//! call into higher ones without a dependency edge.

use core::sync::atomic::{AtomicPtr, Ordering};

pub struct ServiceCell<T> {
    ptr: AtomicPtr<T>,
    name: &'static str,
}

// SAFETY: only ever stores `&'static T`; AtomicPtr provides the synchronisation.
unsafe impl<T: Sync> Sync for ServiceCell<T> {}

impl<T> ServiceCell<T> {
    /// Create an empty cell. `name` appears in diagnostics.
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self {
            ptr: AtomicPtr::new(core::ptr::null_mut()),
            name,
        }
    }

    /// Register the provider table. Returns `false` if one was already
    /// registered; the first registration stays in place.
    #[inline]
    pub fn register(&self, services: &'static T) -> bool {
        self.ptr
            .compare_exchange(
                core::ptr::null_mut(),
                services as *const T as *mut T,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    #[inline]
    pub fn get(&self) -> Option<&'static T> {
        let ptr = self.ptr.load(Ordering::Acquire);
        // SAFETY: only valid `&'static T` pointers are ever stored.
        unsafe { ptr.as_ref() }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table {
        value: fn() -> u32,
    }

    fn seven() -> u32 {
        7
    }

    fn eight() -> u32 {
        8
    }

    static FIRST: Table = Table { value: seven };
    static SECOND: Table = Table { value: eight };

    #[test]
    fn first_registration_wins() {
        let cell: ServiceCell<Table> = ServiceCell::new("table");
        assert!(cell.get().is_none());
        assert!(cell.register(&FIRST));
        assert!(!cell.register(&SECOND));
        assert!(cell.is_registered());
        assert_eq!(cell.get().map(|t| (t.value)()), Some(7));
        assert_eq!(cell.name(), "table");
    }
}
