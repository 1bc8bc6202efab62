//! Device-backed buffers with scoped release.
//!
//! A [`DeviceContext`] models an accelerator's memory. Buffers are only handed
//! out inside [`DeviceContext::scope`]; each [`DeviceBuffer`] borrows its
//! scope, gives its bytes back when dropped, and cannot outlive the closure.
//! When the closure returns (normally, through `?`, or by unwinding) the scope
//! checks that every byte it allocated was released. Bytes that were not
//! (for instance a buffer passed to [`std::mem::forget`]) are reclaimed from
//! the context and reported as [`CoreError::DeviceResourceLeak`].
//!
//! Writes go through `&mut DeviceBuffer` only, so there is no host/device
//! dirty tracking: whoever holds the buffer mutably owns its contents.
//!
//! # Example
//!
//! ```
//! use tessera_core::array::NdArray;
//! use tessera_core::backend::ArrayContext;
//! use tessera_core::device::DeviceContext;
//!
//! let device = DeviceContext::new(ArrayContext::builder().build().unwrap());
//! let a = NdArray::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
//! let product = device
//!     .scope(|scope| {
//!         let da = scope.upload(&a)?;
//!         let mut dc = scope.alloc::<f64>(vec![2, 2])?;
//!         scope.gemm(1.0, &da, &da, 0.0, &mut dc)?;
//!         dc.download()
//!     })
//!     .unwrap();
//! assert_eq!(product.to_vec(), vec![7.0, 10.0, 15.0, 22.0]);
//! assert_eq!(device.stats().allocated, 0);
//! ```

use std::cell::Cell;
use std::fmt;
use std::mem;

use parking_lot::Mutex;

use crate::array::NdArray;
use crate::backend::ArrayContext;
use crate::dtype::Element;
use crate::error::{CoreError, Result};
use crate::kernel::Transpose;
use crate::linalg::{col_major, from_col_major, ld, status};

// ======================================================================
// Policy and statistics
// ======================================================================

/// What the accelerated routines do when an operand still lives on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MixedOperandPolicy {
    /// Upload host operands into temporary device buffers, then run on the
    /// device. The temporaries are released before the call returns.
    #[default]
    CopyThenAccelerate,
    /// Reject the call with [`CoreError::UnsupportedBackendOperation`].
    Fail,
}

/// Snapshot of a context's allocation accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStats {
    /// Bytes currently allocated across all scopes.
    pub allocated: usize,
    /// High-water mark of `allocated`.
    pub peak: usize,
    /// Number of allocations made.
    pub allocations: u64,
    /// Number of allocations released, including reclaimed leaks.
    pub releases: u64,
    /// Host-to-device copies.
    pub uploads: u64,
    /// Device-to-host copies.
    pub downloads: u64,
    /// Scopes that closed with outstanding bytes.
    pub leaked_scopes: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    stats: DeviceStats,
}

impl Ledger {
    fn allocate(&mut self, bytes: usize) {
        self.stats.allocated += bytes;
        self.stats.peak = self.stats.peak.max(self.stats.allocated);
        self.stats.allocations += 1;
    }

    fn release(&mut self, bytes: usize) {
        self.stats.allocated = self.stats.allocated.saturating_sub(bytes);
        self.stats.releases += 1;
    }
}

// ======================================================================
// DeviceContext
// ======================================================================

/// Device memory owned by one [`ArrayContext`]'s kernel.
///
/// Accounting is shared by every scope opened on the context, including
/// nested ones.
pub struct DeviceContext {
    array: ArrayContext,
    policy: MixedOperandPolicy,
    capacity: Option<usize>,
    ledger: Mutex<Ledger>,
}

impl DeviceContext {
    pub fn new(array: ArrayContext) -> Self {
        Self {
            array,
            policy: MixedOperandPolicy::default(),
            capacity: None,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    /// Set the policy for host operands passed to accelerated routines.
    pub fn with_policy(mut self, policy: MixedOperandPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Limit the total bytes that may be allocated at once.
    pub fn with_capacity(mut self, bytes: usize) -> Self {
        self.capacity = Some(bytes);
        self
    }

    pub fn policy(&self) -> MixedOperandPolicy {
        self.policy
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Name of the backend whose kernel runs device routines.
    pub fn name(&self) -> &str {
        self.array.backend_name()
    }

    pub fn stats(&self) -> DeviceStats {
        self.ledger.lock().stats
    }

    /// Run `f` with a fresh allocation scope.
    ///
    /// Buffers allocated through the scope cannot escape `f`. On return the
    /// scope verifies that all of its bytes were released; any that were not
    /// are reclaimed and reported as [`CoreError::DeviceResourceLeak`], which
    /// takes precedence over the closure's own result.
    pub fn scope<R, F>(&self, f: F) -> Result<R>
    where
        F: for<'s> FnOnce(&'s DeviceScope<'s>) -> Result<R>,
    {
        let scope = DeviceScope::new(self);
        let result = f(&scope);
        match scope.close() {
            Ok(()) => result,
            Err(leak) => {
                if let Err(err) = &result {
                    log::debug!("discarding scope error `{err}` in favour of leak report");
                }
                Err(leak)
            }
        }
    }

    fn reserve(&self, bytes: usize) -> Result<()> {
        let mut ledger = self.ledger.lock();
        if let Some(capacity) = self.capacity {
            if ledger.stats.allocated + bytes > capacity {
                log::debug!(
                    "device `{}` cannot allocate {bytes} bytes ({} of {capacity} in use)",
                    self.name(),
                    ledger.stats.allocated
                );
                return Err(CoreError::InvalidArgument {
                    reason: "device memory exhausted",
                });
            }
        }
        ledger.allocate(bytes);
        Ok(())
    }
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("backend", &self.name())
            .field("policy", &self.policy)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}

// ======================================================================
// DeviceScope
// ======================================================================

/// Allocation scope passed to the closure of [`DeviceContext::scope`].
pub struct DeviceScope<'ctx> {
    context: &'ctx DeviceContext,
    outstanding: Cell<usize>,
    live: Cell<usize>,
    closed: Cell<bool>,
}

impl<'ctx> DeviceScope<'ctx> {
    fn new(context: &'ctx DeviceContext) -> Self {
        log::trace!("opening device scope on `{}`", context.name());
        Self {
            context,
            outstanding: Cell::new(0),
            live: Cell::new(0),
            closed: Cell::new(false),
        }
    }

    pub fn context(&self) -> &'ctx DeviceContext {
        self.context
    }

    /// Bytes allocated in this scope and not yet released.
    pub fn outstanding(&self) -> usize {
        self.outstanding.get()
    }

    /// Buffers allocated in this scope and not yet dropped.
    pub fn live_buffers(&self) -> usize {
        self.live.get()
    }

    /// A buffer of `shape` filled with `T::default()`.
    pub fn alloc<T: Element>(&self, shape: Vec<usize>) -> Result<DeviceBuffer<'_, T>> {
        let len = shape.iter().product();
        self.adopt(vec![T::default(); len], shape)
    }

    /// Copy `host` to a new device buffer.
    pub fn upload<T: Element>(&self, host: &NdArray<T>) -> Result<DeviceBuffer<'_, T>> {
        let buffer = self.adopt(col_major(host), host.shape().to_vec())?;
        self.context.ledger.lock().stats.uploads += 1;
        Ok(buffer)
    }

    fn adopt<T: Element>(&self, data: Vec<T>, shape: Vec<usize>) -> Result<DeviceBuffer<'_, T>> {
        let bytes = data.len() * mem::size_of::<T>();
        self.context.reserve(bytes)?;
        self.outstanding.set(self.outstanding.get() + bytes);
        self.live.set(self.live.get() + 1);
        log::trace!("allocated {bytes} device bytes for shape {shape:?}");
        Ok(DeviceBuffer {
            scope: self,
            data,
            shape,
        })
    }

    fn release(&self, bytes: usize) {
        self.outstanding.set(self.outstanding.get().saturating_sub(bytes));
        self.live.set(self.live.get().saturating_sub(1));
        self.context.ledger.lock().release(bytes);
        log::trace!("released {bytes} device bytes");
    }

    /// Reclaim anything still outstanding. Idempotent.
    fn close(&self) -> Result<()> {
        if self.closed.replace(true) {
            return Ok(());
        }
        let outstanding = self.outstanding.replace(0);
        let live = self.live.replace(0);
        if outstanding == 0 && live == 0 {
            log::trace!("closed device scope on `{}`", self.context.name());
            return Ok(());
        }
        log::warn!(
            "device scope on `{}` closed with {live} live buffer(s) holding {outstanding} bytes",
            self.context.name()
        );
        let mut ledger = self.context.ledger.lock();
        ledger.stats.allocated = ledger.stats.allocated.saturating_sub(outstanding);
        ledger.stats.releases += live as u64;
        ledger.stats.leaked_scopes += 1;
        Err(CoreError::DeviceResourceLeak { outstanding })
    }

    // ------------------------------------------------------------------
    // Accelerated routines
    // ------------------------------------------------------------------

    /// `C = alpha A B + beta C` on device buffers, all 2-D.
    pub fn gemm(
        &self,
        alpha: f64,
        a: &DeviceBuffer<'_, f64>,
        b: &DeviceBuffer<'_, f64>,
        beta: f64,
        c: &mut DeviceBuffer<'_, f64>,
    ) -> Result<()> {
        let (m, k) = a.matrix_dims()?;
        let (kb, n) = b.matrix_dims()?;
        if kb != k {
            return Err(CoreError::ShapeMismatch {
                expected: vec![k, n],
                got: b.shape.clone(),
            });
        }
        if c.shape != [m, n] {
            return Err(CoreError::ShapeMismatch {
                expected: vec![m, n],
                got: c.shape.clone(),
            });
        }
        log::trace!("device gemm {m}x{k} * {k}x{n} on `{}`", self.context.name());
        let info = self.context.array.kernel().gemm(
            Transpose::No,
            Transpose::No,
            m,
            n,
            k,
            alpha,
            &a.data,
            ld(m),
            &b.data,
            ld(k),
            beta,
            &mut c.data,
            ld(m),
        );
        status("gemm", info)
    }

    /// [`gemm`](Self::gemm) with operands that may still be on the host,
    /// handled according to the context's [`MixedOperandPolicy`].
    pub fn gemm_mixed(
        &self,
        alpha: f64,
        a: Operand<'_, '_>,
        b: Operand<'_, '_>,
        beta: f64,
        c: &mut DeviceBuffer<'_, f64>,
    ) -> Result<()> {
        let staged_a = self.stage(a)?;
        let staged_b = self.stage(b)?;
        self.gemm(alpha, staged_a.buffer(), staged_b.buffer(), beta, c)
    }

    fn stage<'o, 'd>(&'o self, operand: Operand<'o, 'd>) -> Result<Staged<'o, 'd>> {
        match operand {
            Operand::Device(buffer) => Ok(Staged::Borrowed(buffer)),
            Operand::Host(array) => match self.context.policy {
                MixedOperandPolicy::CopyThenAccelerate => {
                    log::debug!("staging host operand {:?} onto `{}`", array.shape(), self.context.name());
                    Ok(Staged::Owned(self.upload(array)?))
                }
                MixedOperandPolicy::Fail => Err(CoreError::unsupported(
                    self.context.name(),
                    "gemm with a host-resident operand",
                )),
            },
        }
    }
}

impl Drop for DeviceScope<'_> {
    fn drop(&mut self) {
        // Reached without `close` only while unwinding.
        let _ = self.close();
    }
}

impl fmt::Debug for DeviceScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceScope")
            .field("backend", &self.context.name())
            .field("outstanding", &self.outstanding.get())
            .field("live", &self.live.get())
            .finish()
    }
}

/// An operand for [`DeviceScope::gemm_mixed`].
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a, 's> {
    Host(&'a NdArray<f64>),
    Device(&'a DeviceBuffer<'s, f64>),
}

enum Staged<'a, 's> {
    Borrowed(&'a DeviceBuffer<'s, f64>),
    Owned(DeviceBuffer<'a, f64>),
}

impl Staged<'_, '_> {
    fn buffer(&self) -> &DeviceBuffer<'_, f64> {
        match self {
            Staged::Borrowed(buffer) => *buffer,
            Staged::Owned(buffer) => buffer,
        }
    }
}

// ======================================================================
// DeviceBuffer
// ======================================================================

/// Column-major storage on the device, released on drop.
pub struct DeviceBuffer<'s, T: Element> {
    scope: &'s DeviceScope<'s>,
    data: Vec<T>,
    shape: Vec<usize>,
}

impl<T: Element> DeviceBuffer<'_, T> {
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Device bytes held.
    pub fn bytes(&self) -> usize {
        self.data.len() * mem::size_of::<T>()
    }

    /// Column-major contents.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Overwrite the contents from a host array of the same shape.
    pub fn copy_from_host(&mut self, host: &NdArray<T>) -> Result<()> {
        if host.shape() != self.shape.as_slice() {
            return Err(CoreError::ShapeMismatch {
                expected: self.shape.clone(),
                got: host.shape().to_vec(),
            });
        }
        self.data = col_major(host);
        self.scope.context.ledger.lock().stats.uploads += 1;
        Ok(())
    }

    /// Copy the contents back to a fresh host array.
    pub fn download(&self) -> Result<NdArray<T>> {
        let host = from_col_major(self.data.clone(), self.shape.clone())?;
        self.scope.context.ledger.lock().stats.downloads += 1;
        Ok(host)
    }

    fn matrix_dims(&self) -> Result<(usize, usize)> {
        match *self.shape {
            [m, n] => Ok((m, n)),
            _ => Err(CoreError::InvalidArgument {
                reason: "expected a 2-D device matrix",
            }),
        }
    }
}

impl<T: Element> Drop for DeviceBuffer<'_, T> {
    fn drop(&mut self) {
        self.scope.release(self.bytes());
    }
}

impl<T: Element> fmt::Debug for DeviceBuffer<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("shape", &self.shape)
            .field("bytes", &self.bytes())
            .finish()
    }
}
