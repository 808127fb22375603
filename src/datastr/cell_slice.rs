//! A slice of cells with externally enforced disjoint mutable access.

use std::cell::UnsafeCell;

/// A fixed-size slice whose elements can be mutated through a shared
/// reference. Used where concurrent passes operate on provably disjoint index
/// sets (the recursive labeler splits node-disjoint subgraphs, the parallel
/// label propagation writes one node's label per task).
///
/// Safety contract for all callers: between synchronization points, each index
/// is accessed mutably by at most one thread, and no thread reads an index
/// another thread mutates.
#[derive(Debug)]
pub struct SharedCells<T> {
    cells: Box<[UnsafeCell<T>]>,
}

unsafe impl<T: Send> Sync for SharedCells<T> {}

impl<T> SharedCells<T> {
    pub fn new(data: Vec<T>) -> Self {
        SharedCells {
            cells: data.into_iter().map(UnsafeCell::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Shared access to the element at `index`.
    ///
    /// Caller must guarantee no concurrent mutable access to the same index.
    #[inline]
    pub fn get(&self, index: usize) -> &T {
        unsafe { &*self.cells[index].get() }
    }

    /// Mutable access to the element at `index` through a shared reference.
    ///
    /// Caller must guarantee this index is owned by the calling thread until
    /// the reference is dropped.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub fn get_mut(&self, index: usize) -> &mut T {
        unsafe { &mut *self.cells[index].get() }
    }

    /// Consume the cells and return the plain data.
    pub fn into_inner(self) -> Vec<T> {
        self.cells.into_vec().into_iter().map(UnsafeCell::into_inner).collect()
    }
}

impl<T> From<Vec<T>> for SharedCells<T> {
    fn from(data: Vec<T>) -> Self {
        SharedCells::new(data)
    }
}
