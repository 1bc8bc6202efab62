//! Flat storage shared by every view derived from one allocation.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::dtype::Element;

/// Reference-counted flat storage.
///
/// Cloning a `Buffer` adds a reference; the storage is freed when the last
/// array or view holding it is dropped. Borrows are short-lived and never
/// escape the array methods, so a writer through one view cannot observe a
/// borrow held by another.
#[derive(Debug)]
pub(crate) struct Buffer<T> {
    data: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self {
            data: Rc::clone(&self.data),
        }
    }
}

impl<T: Element> Buffer<T> {
    pub(crate) fn new(data: Vec<T>) -> Self {
        Self {
            data: Rc::new(RefCell::new(data)),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.data.borrow().len()
    }

    #[inline]
    pub(crate) fn read(&self, pos: usize) -> T {
        self.data.borrow()[pos].clone()
    }

    #[inline]
    pub(crate) fn write(&self, pos: usize, value: T) {
        self.data.borrow_mut()[pos] = value;
    }

    pub(crate) fn borrow(&self) -> Ref<'_, Vec<T>> {
        self.data.borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, Vec<T>> {
        self.data.borrow_mut()
    }

    /// Address of the storage, comparable across element types.
    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.data).cast()
    }
}
