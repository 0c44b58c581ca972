use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;

// owner side atomics: the single mutating thread may read its own value
// without synchronization, every other access goes through `Deref`
macro_rules! unsync_atomic {
    ($name: ident, $inner: ty, $value: ty) => {
        pub(crate) struct $name {
            inner: UnsafeCell<$inner>,
        }

        unsafe impl Send for $name {}
        unsafe impl Sync for $name {}

        impl $name {
            pub(crate) const fn new(val: $value) -> $name {
                let inner = UnsafeCell::new(<$inner>::new(val));
                $name { inner }
            }

            /// Performs an unsynchronized load.
            ///
            /// # Safety
            ///
            /// All mutations must have happened before the unsynchronized load.
            /// Additionally, there must be no concurrent mutations.
            #[inline]
            pub(crate) unsafe fn unsync_load(&self) -> $value {
                *(*self.inner.get()).get_mut()
            }
        }

        impl Deref for $name {
            type Target = $inner;

            fn deref(&self) -> &Self::Target {
                // safety: it is always safe to access `&self` fns on the inner value as
                // we never perform unsafe mutations.
                unsafe { &*self.inner.get() }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self.deref(), fmt)
            }
        }
    };
}

unsync_atomic!(AtomicUsize, std::sync::atomic::AtomicUsize, usize);
unsync_atomic!(AtomicU64, std::sync::atomic::AtomicU64, u64);

pub(crate) struct AtomicPtr<T> {
    inner: UnsafeCell<std::sync::atomic::AtomicPtr<T>>,
}

unsafe impl<T> Send for AtomicPtr<T> {}
unsafe impl<T> Sync for AtomicPtr<T> {}

impl<T> AtomicPtr<T> {
    pub(crate) const fn new(val: *mut T) -> AtomicPtr<T> {
        let inner = UnsafeCell::new(std::sync::atomic::AtomicPtr::new(val));
        AtomicPtr { inner }
    }

    /// Performs an unsynchronized load.
    ///
    /// # Safety
    ///
    /// All mutations must have happened before the unsynchronized load.
    /// Additionally, there must be no concurrent mutations.
    #[inline]
    pub(crate) unsafe fn unsync_load(&self) -> *mut T {
        *(*self.inner.get()).get_mut()
    }
}

impl<T> Deref for AtomicPtr<T> {
    type Target = std::sync::atomic::AtomicPtr<T>;

    fn deref(&self) -> &Self::Target {
        unsafe { &*self.inner.get() }
    }
}

impl<T> fmt::Debug for AtomicPtr<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.deref(), fmt)
    }
}
