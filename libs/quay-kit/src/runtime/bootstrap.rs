//! Phase-sequenced host bootstrap.
//!
//! The bootstrap walks a strict linear phase order: configuration is
//! validated first, localization and logging come up next, unit search
//! paths are computed, the user init hook runs, the configured library
//! list is imported, services are registered and finally the HTTP pipeline
//! is assembled. Each phase only starts after the previous one finished.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use thiserror::Error;

use quay_bootstrap::config::AppConfig;
use quay_bootstrap::paths::{execution_dir, resolve_configured_path};
use quay_bootstrap::{init_logging, I18n};

use crate::capability::CapabilityIndex;
use crate::contracts::{RequestFilter, API_DOCS, HOST_CONFIG, I18N, MAPPER};
use crate::loader::{LoadError, UnitLoader};
use crate::pipeline::{
    apply_cors, apply_filters, docs_router, ApiDocs, CorsMode, MapperRegistry, RequestLogFilter,
};
use crate::registrar::{self, RegistrarReport};
use crate::services::ServiceRegistry;
use crate::tracker::ImportTracker;
use crate::unit::{UnitCatalog, UnitHandle, UnitSource};

/// Bootstrap phases, in the only order they may occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Unconfigured,
    ConfigLoaded,
    LocalizationReady,
    LoggingReady,
    PathsComputed,
    UserInitialized,
    LibrariesImported,
    ServicesRegistering,
    PipelineConfiguring,
    Ready,
}

impl Phase {
    fn next(self) -> Phase {
        match self {
            Phase::Unconfigured => Phase::ConfigLoaded,
            Phase::ConfigLoaded => Phase::LocalizationReady,
            Phase::LocalizationReady => Phase::LoggingReady,
            Phase::LoggingReady => Phase::PathsComputed,
            Phase::PathsComputed => Phase::UserInitialized,
            Phase::UserInitialized => Phase::LibrariesImported,
            Phase::LibrariesImported => Phase::ServicesRegistering,
            Phase::ServicesRegistering => Phase::PipelineConfiguring,
            Phase::PipelineConfiguring | Phase::Ready => Phase::Ready,
        }
    }
}

fn advance(phase: &mut Phase, to: Phase) {
    debug_assert_eq!(phase.next(), to, "phases advance strictly in order");
    tracing::debug!(from = ?phase, to = ?to, "bootstrap phase");
    *phase = to;
}

/// Fatal bootstrap errors. Per-module failures during registration are not
/// fatal; they land in the [`RegistrarReport`] instead.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("configuration section '{0}' not found")]
    MissingSection(&'static str),
    #[error("configuration key '{0}' not found")]
    MissingKey(&'static str),
    #[error("failed to load configuration")]
    ConfigLoad(#[source] anyhow::Error),
    #[error("failed to load localization statements")]
    Localization(#[source] anyhow::Error),
    #[error("failed to initialize logging")]
    Logging(#[source] std::io::Error),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("initialization hook failed")]
    InitHook(#[source] anyhow::Error),
    #[error("service configuration hook failed")]
    ConfigureHook(#[source] anyhow::Error),
}

type InitHook = Box<dyn FnOnce(&mut BootstrapCtx<'_>) -> anyhow::Result<()>>;
type ConfigureHook = Box<dyn FnOnce(&mut ServiceRegistry) -> anyhow::Result<()>>;
type MappingHook = Box<dyn FnOnce(&mut MapperRegistry)>;

/// Mutable bootstrap state handed to the init hook.
pub struct BootstrapCtx<'a> {
    catalog: &'a UnitCatalog,
    pub execution_dir: &'a PathBuf,
    pub work_root: &'a PathBuf,
    search_paths: &'a mut Vec<PathBuf>,
    tracker: &'a mut ImportTracker,
    filters: &'a mut Vec<Arc<dyn RequestFilter>>,
}

impl BootstrapCtx<'_> {
    /// Append a unit search root after the configured ones.
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    /// Import a unit by handle. Re-imports are no-ops.
    pub fn import_unit(&mut self, unit: UnitHandle) {
        if self.tracker.track(unit) {
            tracing::info!(unit = unit.name, "unit imported");
        }
    }

    /// Import the unit a type belongs to.
    pub fn import_source<T: UnitSource>(&mut self) {
        self.import_unit(T::unit());
    }

    /// Import a unit by logical artifact name. Unlike the configured
    /// library list, a direct import that cannot be resolved is an error.
    pub fn import_artifact(&mut self, logical_name: &str) -> Result<(), LoadError> {
        let loader = UnitLoader::new(self.catalog, self.search_paths);
        let unit = loader.resolve(logical_name)?;
        self.import_unit(unit);
        Ok(())
    }

    pub fn add_filter(&mut self, filter: Arc<dyn RequestFilter>) {
        self.filters.push(filter);
    }
}

/// Builder for a fully bootstrapped [`Host`].
pub struct HostBootstrap {
    config: Result<AppConfig, HostError>,
    catalog: Option<UnitCatalog>,
    execution_dir: Option<PathBuf>,
    work_root: Option<PathBuf>,
    init_hook: Option<InitHook>,
    configure_hook: Option<ConfigureHook>,
    mapping_hook: Option<MappingHook>,
    filters: Vec<Arc<dyn RequestFilter>>,
    routes: Option<Router>,
    logging: bool,
}

impl HostBootstrap {
    /// Start from a configuration file path; `None` means built-in defaults
    /// layered with environment variables are not consulted and the default
    /// config is used as-is.
    pub fn from_path(config_path: Option<PathBuf>) -> Self {
        let config = AppConfig::load_or_default(config_path).map_err(HostError::ConfigLoad);
        Self::with_config_result(config)
    }

    /// Start from an already-loaded configuration.
    pub fn from_config(config: AppConfig) -> Self {
        Self::with_config_result(Ok(config))
    }

    fn with_config_result(config: Result<AppConfig, HostError>) -> Self {
        Self {
            config,
            catalog: None,
            execution_dir: None,
            work_root: None,
            init_hook: None,
            configure_hook: None,
            mapping_hook: None,
            filters: Vec::new(),
            routes: None,
            logging: true,
        }
    }

    /// Use an explicit unit catalog instead of `inventory` discovery.
    pub fn catalog(mut self, catalog: UnitCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Override the execution directory (the first unit search root).
    pub fn execution_dir(mut self, dir: PathBuf) -> Self {
        self.execution_dir = Some(dir);
        self
    }

    /// Override the work root the `~/` path prefix resolves against.
    pub fn work_root(mut self, dir: PathBuf) -> Self {
        self.work_root = Some(dir);
        self
    }

    /// Hook run after search paths are computed, before library imports.
    pub fn on_initialize<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut BootstrapCtx<'_>) -> anyhow::Result<()> + 'static,
    {
        self.init_hook = Some(Box::new(hook));
        self
    }

    /// Hook run after module startups and auto-registration, last writer
    /// into the registry before it freezes.
    pub fn on_configure_services<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut ServiceRegistry) -> anyhow::Result<()> + 'static,
    {
        self.configure_hook = Some(Box::new(hook));
        self
    }

    /// Hook to populate the object mapper registry.
    pub fn with_mappings<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(&mut MapperRegistry) + 'static,
    {
        self.mapping_hook = Some(Box::new(hook));
        self
    }

    /// Append a request filter after the intrinsic request logger.
    pub fn add_filter(mut self, filter: Arc<dyn RequestFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Merge application routes into the pipeline before the filter and
    /// CORS layers, so they are covered by both.
    pub fn routes(mut self, routes: Router) -> Self {
        self.routes = Some(match self.routes.take() {
            Some(existing) => existing.merge(routes),
            None => routes,
        });
        self
    }

    /// Skip global logging initialization. Meant for embedding in hosts
    /// that already installed a subscriber.
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }

    /// Run the bootstrap to completion.
    pub fn run(self) -> Result<Host, HostError> {
        let mut phase = Phase::Unconfigured;

        let config = self.config?;
        let i18n_section = config.i18n.as_ref().ok_or(HostError::MissingSection("i18n"))?;
        if i18n_section.path.trim().is_empty() {
            return Err(HostError::MissingKey("i18n.path"));
        }
        if i18n_section.language.trim().is_empty() {
            return Err(HostError::MissingKey("i18n.language"));
        }
        let hosting = config
            .hosting
            .clone()
            .ok_or(HostError::MissingSection("hosting"))?;
        advance(&mut phase, Phase::ConfigLoaded);

        let exec_dir = self.execution_dir.unwrap_or_else(execution_dir);
        let work_root = self
            .work_root
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        let i18n_folder = resolve_configured_path(&i18n_section.path, &exec_dir, &work_root);
        let i18n = Arc::new(
            I18n::load(&i18n_folder, &i18n_section.language).map_err(HostError::Localization)?,
        );
        advance(&mut phase, Phase::LocalizationReady);

        if self.logging {
            let log_path = resolve_configured_path(&hosting.log_path, &exec_dir, &work_root);
            init_logging(&log_path, &hosting.log_level).map_err(HostError::Logging)?;
        }
        tracing::info!(
            language = i18n.language(),
            statements = i18n.len(),
            "localization ready"
        );
        advance(&mut phase, Phase::LoggingReady);

        let mut search_paths = vec![exec_dir.clone()];
        for raw in &hosting.paths {
            search_paths.push(resolve_configured_path(raw, &exec_dir, &work_root));
        }
        advance(&mut phase, Phase::PathsComputed);

        let catalog = self.catalog.unwrap_or_else(UnitCatalog::discover);
        let mut tracker = ImportTracker::new();
        let mut filters = self.filters;

        if let Some(hook) = self.init_hook {
            let mut ctx = BootstrapCtx {
                catalog: &catalog,
                execution_dir: &exec_dir,
                work_root: &work_root,
                search_paths: &mut search_paths,
                tracker: &mut tracker,
                filters: &mut filters,
            };
            hook(&mut ctx).map_err(HostError::InitHook)?;
        }
        advance(&mut phase, Phase::UserInitialized);

        {
            let loader = UnitLoader::new(&catalog, &search_paths);
            for logical_name in &hosting.libraries {
                match loader.resolve(logical_name) {
                    Ok(unit) => {
                        if tracker.track(unit) {
                            tracing::info!(unit = unit.name, library = %logical_name, "library imported");
                        }
                    }
                    Err(error) => {
                        tracing::warn!(library = %logical_name, error = %error, "library skipped");
                    }
                }
            }
        }
        advance(&mut phase, Phase::LibrariesImported);

        let mut index = CapabilityIndex::new();
        for unit in tracker.iter() {
            index.absorb(unit);
        }

        let mut services = ServiceRegistry::new();
        let report = registrar::apply(&tracker, &index, &mut services);
        for failure in &report.errors {
            tracing::error!(
                module = failure.type_name,
                error = %failure.error,
                "module registration failed"
            );
        }

        let mut mapper = MapperRegistry::new();
        if let Some(hook) = self.mapping_hook {
            hook(&mut mapper);
        }
        let docs = ApiDocs::new(hosting.docs.clone());

        services.register_instance(HOST_CONFIG, Arc::new(config.clone()));
        services.register_instance(I18N, i18n.clone());
        services.register_instance(MAPPER, Arc::new(mapper));
        services.register_instance(API_DOCS, Arc::new(docs.clone()));

        if let Some(hook) = self.configure_hook {
            hook(&mut services).map_err(HostError::ConfigureHook)?;
        }
        let services = Arc::new(services);
        advance(&mut phase, Phase::ServicesRegistering);

        let mut router = Router::new().route("/healthz", get(|| async { "ok" }));
        if !docs.is_empty() {
            router = router.merge(docs_router(&docs));
        }
        if let Some(routes) = self.routes {
            router = router.merge(routes);
        }
        // Handlers resolve services through the frozen registry.
        router = router.layer(Extension(services.clone()));
        let mut chain: Vec<Arc<dyn RequestFilter>> = vec![Arc::new(RequestLogFilter)];
        chain.extend(filters);
        router = apply_filters(router, chain);
        let cors = if hosting.cors_all {
            CorsMode::AllowAll
        } else {
            CorsMode::Disabled
        };
        router = apply_cors(router, cors);
        advance(&mut phase, Phase::PipelineConfiguring);

        advance(&mut phase, Phase::Ready);
        tracing::info!(
            units = tracker.len(),
            services = services.len(),
            startups = report.startups_run,
            "host ready"
        );

        Ok(Host {
            config,
            i18n,
            search_paths,
            imported: tracker,
            services,
            report,
            router,
            phase,
        })
    }
}

/// A bootstrapped host, ready to serve.
pub struct Host {
    config: AppConfig,
    i18n: Arc<I18n>,
    search_paths: Vec<PathBuf>,
    imported: ImportTracker,
    services: Arc<ServiceRegistry>,
    report: RegistrarReport,
    router: Router,
    phase: Phase,
}

impl Host {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn i18n(&self) -> &Arc<I18n> {
        &self.i18n
    }

    pub fn services(&self) -> &Arc<ServiceRegistry> {
        &self.services
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn imported_units(&self) -> &ImportTracker {
        &self.imported
    }

    pub fn report(&self) -> &RegistrarReport {
        &self.report
    }

    /// `host:port` string from the hosting section.
    pub fn bind_addr(&self) -> String {
        match &self.config.hosting {
            Some(h) => format!("{}:{}", h.host, h.port),
            None => "127.0.0.1:8087".to_string(),
        }
    }

    /// Merge routes into the already-assembled pipeline. Routes added here
    /// bypass the filter and CORS layers; use [`HostBootstrap::routes`] to
    /// place routes under them.
    pub fn merge_routes(&mut self, routes: Router) {
        let router = std::mem::take(&mut self.router);
        self.router = router.merge(routes);
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}
