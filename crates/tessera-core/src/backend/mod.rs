//! Pluggable compute backends and process-wide backend selection.
//!
//! A [`Backend`] bundles an [`ElementFactory`], [`ElementwiseRoutines`] and
//! a [`NumericKernel`]. Backends are collected in a [`BackendRegistry`];
//! an [`ArrayContext`] is built from the registry by picking the
//! highest-priority available backend, or an explicitly requested one.
//!
//! ```
//! use tessera_core::backend::ArrayContext;
//!
//! let ctx = ArrayContext::builder().build().unwrap();
//! assert_eq!(ctx.backend_name(), "reference");
//! ```

mod context;
mod routines;

use core::fmt;
use std::sync::Arc;

pub use context::{ArrayContext, ArrayContextBuilder, BackendConfig};
pub use routines::{ElementFactory, ElementwiseRoutines, HostFactory, HostRoutines, UnaryOp};

use crate::kernel::{NumericKernel, ReferenceKernel};

/// A provider of array storage and numeric routines.
pub trait Backend: Send + Sync + fmt::Debug {
    /// Unique name, matched by explicit backend requests.
    fn name(&self) -> &str;

    /// Whether the backend can run in this process (native libraries
    /// present, device reachable, ...).
    fn is_available(&self) -> bool;

    /// Higher wins during automatic selection.
    fn priority(&self) -> i32;

    fn element_factory(&self) -> &dyn ElementFactory;

    fn elementwise(&self) -> &dyn ElementwiseRoutines;

    fn kernel(&self) -> &dyn NumericKernel;
}

/// Always-available host backend built on [`ReferenceKernel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceBackend {
    factory: HostFactory,
    routines: HostRoutines,
    kernel: ReferenceKernel,
}

impl ReferenceBackend {
    /// Priority of the reference backend; any real backend should beat it.
    pub const PRIORITY: i32 = 0;

    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for ReferenceBackend {
    fn name(&self) -> &str {
        "reference"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }

    fn element_factory(&self) -> &dyn ElementFactory {
        &self.factory
    }

    fn elementwise(&self) -> &dyn ElementwiseRoutines {
        &self.routines
    }

    fn kernel(&self) -> &dyn NumericKernel {
        &self.kernel
    }
}

/// An ordered set of candidate backends.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding only the [`ReferenceBackend`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ReferenceBackend::new()));
        registry
    }

    /// Add a backend. A later registration with the same name replaces the
    /// earlier one.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.retain(|b| b.name() != backend.name());
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Registered backend names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Look up a backend by name, available or not.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.name() == name).cloned()
    }

    /// The highest-priority available backend. Ties go to the earliest
    /// registration.
    pub fn select(&self) -> Option<Arc<dyn Backend>> {
        let mut best: Option<&Arc<dyn Backend>> = None;
        for backend in &self.backends {
            let available = backend.is_available();
            log::debug!(
                "probing backend `{}`: available={available}, priority={}",
                backend.name(),
                backend.priority()
            );
            if available && best.map_or(true, |b| backend.priority() > b.priority()) {
                best = Some(backend);
            }
        }
        best.cloned()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .finish()
    }
}
