use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::array::NdArray;
use crate::dtype::{Element, Scalar};
use crate::error::{CoreError, Result};
use crate::kernel::NumericKernel;
use crate::layout::Order;
use crate::linalg::LinearAlgebraRoutines;

use super::{Backend, BackendRegistry, ElementFactory, ElementwiseRoutines};

/// Environment variable naming the preferred backend.
pub const BACKEND_ENV: &str = "TESSERA_BACKEND";
/// Environment variable that turns a missing preferred backend into an error.
pub const STRICT_ENV: &str = "TESSERA_BACKEND_STRICT";

static GLOBAL: OnceLock<ArrayContext> = OnceLock::new();

// ======================================================================
// Configuration
// ======================================================================

/// Backend preferences consumed by [`ArrayContextBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendConfig {
    /// Backend to use when it is registered and available.
    pub preferred_backend: Option<String>,
    /// Fail instead of falling back when the preferred backend is missing.
    pub strict: bool,
}

impl BackendConfig {
    /// Read [`BACKEND_ENV`] and [`STRICT_ENV`] from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Blank backend names count as unset. The strict flag accepts `1`,
    /// `true`, `yes` and `on` in any case.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let preferred_backend = lookup(BACKEND_ENV)
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty());
        let strict = lookup(STRICT_ENV).is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        });
        Self {
            preferred_backend,
            strict,
        }
    }

    pub fn with_preferred_backend(mut self, name: impl Into<String>) -> Self {
        self.preferred_backend = Some(name.into());
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

// ======================================================================
// Builder
// ======================================================================

/// Chooses the backend an [`ArrayContext`] runs on.
///
/// Resolution order:
/// 1. an explicit [`backend`](Self::backend) request, which must be
///    registered and available;
/// 2. the configured preferred backend, falling back to automatic selection
///    unless the config is strict;
/// 3. the highest-priority available backend in the registry.
#[derive(Debug, Clone)]
pub struct ArrayContextBuilder {
    registry: BackendRegistry,
    config: BackendConfig,
    requested: Option<String>,
}

impl Default for ArrayContextBuilder {
    fn default() -> Self {
        Self {
            registry: BackendRegistry::with_defaults(),
            config: BackendConfig::default(),
            requested: None,
        }
    }
}

impl ArrayContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidate backends.
    pub fn registry(mut self, registry: BackendRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Add one candidate to the current registry.
    pub fn register(mut self, backend: Arc<dyn Backend>) -> Self {
        self.registry.register(backend);
        self
    }

    pub fn config(mut self, config: BackendConfig) -> Self {
        self.config = config;
        self
    }

    /// Demand a backend by name.
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.requested = Some(name.into());
        self
    }

    pub fn build(self) -> Result<ArrayContext> {
        if let Some(name) = &self.requested {
            let backend = self.available(name).ok_or_else(|| {
                CoreError::unsupported(name, "explicit selection: backend is not registered or not available")
            })?;
            log::debug!("using explicitly requested backend `{name}`");
            return Ok(ArrayContext { backend });
        }

        if let Some(name) = &self.config.preferred_backend {
            match self.available(name) {
                Some(backend) => {
                    log::debug!("using preferred backend `{name}`");
                    return Ok(ArrayContext { backend });
                }
                None if self.config.strict => {
                    return Err(CoreError::unsupported(
                        name,
                        "strict selection: preferred backend is not registered or not available",
                    ));
                }
                None => log::warn!("preferred backend `{name}` is unavailable, falling back to automatic selection"),
            }
        }

        let backend = self
            .registry
            .select()
            .ok_or_else(|| CoreError::unsupported("<none>", "automatic selection: no backend is available"))?;
        log::debug!("selected backend `{}` (priority {})", backend.name(), backend.priority());
        Ok(ArrayContext { backend })
    }

    fn available(&self, name: &str) -> Option<Arc<dyn Backend>> {
        let backend = self.registry.get(name)?;
        if backend.is_available() {
            Some(backend)
        } else {
            log::warn!("backend `{name}` is registered but not available");
            None
        }
    }
}

// ======================================================================
// Context
// ======================================================================

/// A pinned backend plus the entry points that run on it.
///
/// Cheap to clone. Pass it explicitly to code that needs a particular
/// backend, or use [`ArrayContext::global`].
#[derive(Clone)]
pub struct ArrayContext {
    backend: Arc<dyn Backend>,
}

impl ArrayContext {
    pub fn builder() -> ArrayContextBuilder {
        ArrayContextBuilder::new()
    }

    /// Wrap an already chosen backend.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// The process-wide context.
    ///
    /// On first use this is built from [`BackendConfig::from_env`] and the
    /// default registry, unless [`install_global`](Self::install_global)
    /// ran earlier. If the environment names a backend that cannot be used
    /// even under strict mode, the failure is logged and automatic selection
    /// is used instead.
    pub fn global() -> &'static ArrayContext {
        GLOBAL.get_or_init(|| {
            let config = BackendConfig::from_env();
            match ArrayContextBuilder::new().config(config).build() {
                Ok(ctx) => ctx,
                Err(err) => {
                    log::warn!("{err}; using the reference backend");
                    Self::with_backend(Arc::new(super::ReferenceBackend::new()))
                }
            }
        })
    }

    /// Pin `ctx` as the process-wide context.
    ///
    /// Fails, handing `ctx` back, once the global context has been set or
    /// read.
    pub fn install_global(ctx: ArrayContext) -> std::result::Result<(), ArrayContext> {
        GLOBAL.set(ctx)
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn factory(&self) -> &dyn ElementFactory {
        self.backend.element_factory()
    }

    pub fn elementwise(&self) -> &dyn ElementwiseRoutines {
        self.backend.elementwise()
    }

    pub fn kernel(&self) -> &dyn NumericKernel {
        self.backend.kernel()
    }

    /// Checked decompositions on this context's kernel.
    pub fn linalg(&self) -> LinearAlgebraRoutines<'_> {
        LinearAlgebraRoutines::new(self.kernel())
    }

    // ------------------------------------------------------------------
    // Kind-checked creation
    // ------------------------------------------------------------------

    fn require_kind<T: Element>(&self, operation: &str) -> Result<Order> {
        let factory = self.factory();
        if factory.supports(T::KIND) {
            Ok(factory.default_order())
        } else {
            Err(CoreError::unsupported(
                self.backend_name(),
                format!("{operation} for {} arrays", T::KIND),
            ))
        }
    }

    /// Adopt row-major `data` as a `shape` array.
    pub fn from_vec<T: Element>(&self, data: Vec<T>, shape: Vec<usize>) -> Result<NdArray<T>> {
        let order = self.require_kind::<T>("from_vec")?;
        let array = NdArray::from_vec(data, shape)?;
        Ok(match order {
            Order::RowMajor => array,
            Order::ColumnMajor => array.copy_with_order(order),
        })
    }

    pub fn full<T: Element>(&self, shape: Vec<usize>, value: T) -> Result<NdArray<T>> {
        let order = self.require_kind::<T>("full")?;
        let numel: usize = shape.iter().product();
        NdArray::from_vec_with_order(vec![value; numel], shape, order)
    }

    pub fn zeros<T: Scalar>(&self, shape: Vec<usize>) -> Result<NdArray<T>> {
        self.require_kind::<T>("zeros")?;
        self.full(shape, T::zero())
    }

    pub fn ones<T: Scalar>(&self, shape: Vec<usize>) -> Result<NdArray<T>> {
        self.require_kind::<T>("ones")?;
        self.full(shape, T::one())
    }

    pub fn eye<T: Scalar>(&self, n: usize) -> Result<NdArray<T>> {
        let order = self.require_kind::<T>("eye")?;
        Ok(NdArray::eye(n).copy_with_order(order))
    }
}

impl fmt::Debug for ArrayContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayContext")
            .field("backend", &self.backend_name())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::collections::HashMap;

    use num_complex::Complex64;

    use super::*;
    use crate::backend::tests::FakeBackend;
    use crate::backend::{HostRoutines, ReferenceBackend};
    use crate::dtype::ElementKind;
    use crate::kernel::ReferenceKernel;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[derive(Debug, Default)]
    struct RealOnlyFactory;

    impl ElementFactory for RealOnlyFactory {
        fn supports(&self, kind: ElementKind) -> bool {
            kind == ElementKind::Double
        }

        fn default_order(&self) -> Order {
            Order::ColumnMajor
        }
    }

    #[derive(Debug, Default)]
    struct RealOnlyBackend {
        factory: RealOnlyFactory,
        routines: HostRoutines,
        kernel: ReferenceKernel,
    }

    impl Backend for RealOnlyBackend {
        fn name(&self) -> &str {
            "real-only"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn priority(&self) -> i32 {
            1
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

    #[test]
    fn test_config_from_lookup() {
        let config = BackendConfig::from_lookup(lookup(&[(BACKEND_ENV, " native "), (STRICT_ENV, "TRUE")]));
        assert_eq!(config.preferred_backend.as_deref(), Some("native"));
        assert!(config.strict);

        let config = BackendConfig::from_lookup(lookup(&[(BACKEND_ENV, "  "), (STRICT_ENV, "0")]));
        assert_eq!(config, BackendConfig::default());
    }

    #[test]
    fn test_default_builder_picks_reference() {
        let ctx = ArrayContext::builder().build().unwrap();
        assert_eq!(ctx.backend_name(), "reference");
        assert_eq!(ctx.kernel().name(), "reference");
        assert_eq!(format!("{ctx:?}"), "ArrayContext { backend: \"reference\" }");
    }

    #[test]
    fn test_builder_prefers_higher_priority() {
        let ctx = ArrayContext::builder()
            .register(FakeBackend::new("native", true, 10))
            .build()
            .unwrap();
        assert_eq!(ctx.backend_name(), "native");
    }

    #[test]
    fn test_explicit_request_unavailable_fails() {
        let err = ArrayContext::builder()
            .register(FakeBackend::new("device", false, 10))
            .backend("device")
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedBackendOperation { ref backend, .. } if backend == "device"));

        let err = ArrayContext::builder().backend("missing").build().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedBackendOperation { .. }));
    }

    #[test]
    fn test_explicit_request_overrides_priority() {
        let ctx = ArrayContext::builder()
            .register(FakeBackend::new("native", true, 10))
            .backend("reference")
            .build()
            .unwrap();
        assert_eq!(ctx.backend_name(), "reference");
    }

    #[test]
    fn test_preferred_backend_falls_back_unless_strict() {
        let config = BackendConfig::default().with_preferred_backend("device");
        let ctx = ArrayContext::builder()
            .register(FakeBackend::new("device", false, 10))
            .config(config.clone())
            .build()
            .unwrap();
        assert_eq!(ctx.backend_name(), "reference");

        let err = ArrayContext::builder()
            .register(FakeBackend::new("device", false, 10))
            .config(config.strict(true))
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedBackendOperation { .. }));
    }

    #[test]
    fn test_preferred_backend_beats_priority() {
        let ctx = ArrayContext::builder()
            .register(FakeBackend::new("native", true, 10))
            .config(BackendConfig::default().with_preferred_backend("reference"))
            .build()
            .unwrap();
        assert_eq!(ctx.backend_name(), "reference");
    }

    #[test]
    fn test_empty_registry_fails() {
        let err = ArrayContext::builder()
            .registry(BackendRegistry::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedBackendOperation { .. }));
    }

    #[test]
    fn test_kind_checked_creation() {
        let ctx = ArrayContext::with_backend(Arc::new(RealOnlyBackend::default()));
        let z = ctx.zeros::<f64>(vec![2, 3]).unwrap();
        assert_eq!(z.shape(), &[2, 3]);
        assert_eq!(z.stride(), &[1, 2]);

        let err = ctx.zeros::<Complex64>(vec![2]).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnsupportedBackendOperation {
                backend: "real-only".into(),
                operation: "zeros for complex arrays".into(),
            }
        );
        assert!(ctx.full(vec![1], true).is_err());
    }

    #[test]
    fn test_from_vec_respects_factory_order() {
        let ctx = ArrayContext::with_backend(Arc::new(RealOnlyBackend::default()));
        let a = ctx.from_vec(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]).unwrap();
        assert_eq!(a.get(&[0, 1]).unwrap(), 2.0);
        assert_eq!(a.stride(), &[1, 2]);

        let host = ArrayContext::with_backend(Arc::new(ReferenceBackend::new()));
        let i = host.eye::<i64>(3).unwrap();
        assert_eq!(i.to_vec(), vec![1, 0, 0, 0, 1, 0, 0, 0, 1]);
        assert_eq!(host.ones::<i32>(vec![2]).unwrap().to_vec(), vec![1, 1]);
    }

    #[test]
    fn test_global_is_usable() {
        let ctx = ArrayContext::global();
        assert!(ctx.backend().is_available());
        assert!(ArrayContext::install_global(ArrayContext::builder().build().unwrap()).is_err());
    }
}
