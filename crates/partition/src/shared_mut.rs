/// A raw pointer wrapper that lets multiple rayon tasks write into disjoint
/// slices of the same pre-sized `Vec` without going through a lock.
///
/// Every caller is responsible for proving (by construction, via partition
/// bookkeeping such as prefix sums or block descriptors) that no two tasks
/// touch the same element concurrently.
pub struct SharedMut<T>(*mut T);

unsafe impl<T: Send> Send for SharedMut<T> {}
unsafe impl<T: Sync> Sync for SharedMut<T> {}

impl<T> SharedMut<T> {
    pub fn new(ptr: *mut T) -> Self {
        SharedMut(ptr)
    }

    delegate::delegate! {
        to self.0 {
            /// # Safety
            ///
            /// Ensure that `count` does not exceed the capacity of the
            /// underlying allocation and that the offset slot is not written
            /// to concurrently from another task.
            pub unsafe fn add(&self, count: usize) -> *mut T;
        }
    }
}

impl<T> Clone for SharedMut<T> {
    fn clone(&self) -> Self {
        SharedMut(self.0)
    }
}

impl<T> Copy for SharedMut<T> {}
