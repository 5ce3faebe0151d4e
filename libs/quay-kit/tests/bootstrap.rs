//! End-to-end bootstrap behavior: import tracking, startup ordering,
//! capability fan-out, conflict resolution, failure isolation and the
//! assembled HTTP pipeline.

use std::path::Path;
use std::sync::{Arc, Mutex};

use quay_bootstrap::config::{AppConfig, DocGroup, HostingSection, I18nSection};
use quay_kit::{
    BoxedService, CapabilityDecl, CapabilityId, HostBootstrap, HostError, ModuleStartup, Phase,
    RequestFilter, ServiceRegistry, TypeDecl, TypeKind, UnitCatalog, UnitHandle, UnitManifest,
    UnitSource, Lifetime, MODULE_STARTUP, SERVICE_CORE,
};

fn test_config(i18n_dir: &Path) -> AppConfig {
    AppConfig {
        i18n: Some(I18nSection {
            path: i18n_dir.to_string_lossy().into_owned(),
            language: "en_us".to_string(),
        }),
        hosting: Some(HostingSection::default()),
    }
}

fn bootstrap(config: AppConfig) -> HostBootstrap {
    HostBootstrap::from_config(config).without_logging()
}

// ---------------------------------------------------------------------------
// Startup ordering: unit import order, then intra-unit declaration order.
// ---------------------------------------------------------------------------

static STARTUP_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

struct RecordingStartup(&'static str);

impl ModuleStartup for RecordingStartup {
    fn configure_services(&self, _services: &mut ServiceRegistry) -> anyhow::Result<()> {
        STARTUP_ORDER.lock().unwrap().push(self.0);
        Ok(())
    }
}

fn startup_first() -> anyhow::Result<Box<dyn ModuleStartup>> {
    Ok(Box::new(RecordingStartup("first")))
}

fn startup_second() -> anyhow::Result<Box<dyn ModuleStartup>> {
    Ok(Box::new(RecordingStartup("second")))
}

fn startup_third() -> anyhow::Result<Box<dyn ModuleStartup>> {
    Ok(Box::new(RecordingStartup("third")))
}

static ORDER_UNIT_A: UnitManifest = UnitManifest {
    name: "order_a",
    artifact: "order_a.bin",
    capabilities: &[],
    types: &[
        TypeDecl {
            type_name: "FirstStartup",
            kind: TypeKind::Concrete,
            capabilities: &[MODULE_STARTUP],
            startup: Some(startup_first),
            provider: None,
        },
        TypeDecl {
            type_name: "SecondStartup",
            kind: TypeKind::Concrete,
            capabilities: &[MODULE_STARTUP],
            startup: Some(startup_second),
            provider: None,
        },
    ],
};

static ORDER_UNIT_B: UnitManifest = UnitManifest {
    name: "order_b",
    artifact: "order_b.bin",
    capabilities: &[],
    types: &[TypeDecl {
        type_name: "ThirdStartup",
        kind: TypeKind::Concrete,
        capabilities: &[MODULE_STARTUP],
        startup: Some(startup_third),
        provider: None,
    }],
};

#[test]
fn startups_run_exactly_once_in_stable_order() {
    let i18n = tempfile::tempdir().unwrap();
    let host = bootstrap(test_config(i18n.path()))
        .catalog(UnitCatalog::with_units([&ORDER_UNIT_A, &ORDER_UNIT_B]))
        .on_initialize(|ctx| {
            ctx.import_unit(&ORDER_UNIT_A);
            ctx.import_unit(&ORDER_UNIT_B);
            // A second import of an already-tracked unit changes nothing.
            ctx.import_unit(&ORDER_UNIT_A);
            Ok(())
        })
        .run()
        .unwrap();

    assert_eq!(host.phase(), Phase::Ready);
    assert_eq!(host.report().startups_run, 3);
    assert_eq!(
        *STARTUP_ORDER.lock().unwrap(),
        vec!["first", "second", "third"]
    );
}

// ---------------------------------------------------------------------------
// Re-import is a no-op regardless of the import mechanism.
// ---------------------------------------------------------------------------

const CAP_ECHO: CapabilityId = CapabilityId::new("test.echo");

trait Echo: Send + Sync {
    fn echo(&self, s: &str) -> String;
}

struct PlainEcho;

impl Echo for PlainEcho {
    fn echo(&self, s: &str) -> String {
        s.to_string()
    }
}

impl UnitSource for PlainEcho {
    fn unit() -> UnitHandle {
        &ECHO_UNIT
    }
}

fn echo_provider(cap: CapabilityId) -> Option<BoxedService> {
    (cap == CAP_ECHO).then(|| {
        let erased: Arc<dyn Echo> = Arc::new(PlainEcho);
        Box::new(erased) as BoxedService
    })
}

static ECHO_UNIT: UnitManifest = UnitManifest {
    name: "echo",
    artifact: "echo.bin",
    capabilities: &[CapabilityDecl::derives(CAP_ECHO, SERVICE_CORE)],
    types: &[TypeDecl {
        type_name: "PlainEcho",
        kind: TypeKind::Concrete,
        capabilities: &[CAP_ECHO],
        startup: None,
        provider: Some(echo_provider),
    }],
};

#[test]
fn reimport_by_handle_source_and_artifact_is_noop() {
    let i18n = tempfile::tempdir().unwrap();
    let exec = tempfile::tempdir().unwrap();
    std::fs::write(exec.path().join("echo.bin"), b"").unwrap();

    let mut config = test_config(i18n.path());
    config.hosting.as_mut().unwrap().libraries = vec!["echo.bin".to_string()];

    let host = bootstrap(config)
        .catalog(UnitCatalog::with_units([&ECHO_UNIT]))
        .execution_dir(exec.path().to_path_buf())
        .on_initialize(|ctx| {
            ctx.import_unit(&ECHO_UNIT);
            ctx.import_source::<PlainEcho>();
            ctx.import_artifact("echo.bin")?;
            Ok(())
        })
        .run()
        .unwrap();

    // Handle, source type, direct artifact and the configured library list
    // all named the same unit.
    assert_eq!(host.imported_units().len(), 1);
    // One service entry plus the four intrinsic singletons.
    assert_eq!(host.services().len(), 5);
}

// ---------------------------------------------------------------------------
// Fan-out: one concrete type, two contracts, two transient entries.
// ---------------------------------------------------------------------------

const CAP_READER: CapabilityId = CapabilityId::new("test.reader");
const CAP_WRITER: CapabilityId = CapabilityId::new("test.writer");

trait Reader: Send + Sync {
    fn read(&self) -> &'static str;
}

trait Writer: Send + Sync {
    fn write(&self) -> &'static str;
}

struct MemStore;

impl Reader for MemStore {
    fn read(&self) -> &'static str {
        "read"
    }
}

impl Writer for MemStore {
    fn write(&self) -> &'static str {
        "write"
    }
}

fn store_provider(cap: CapabilityId) -> Option<BoxedService> {
    if cap == CAP_READER {
        let erased: Arc<dyn Reader> = Arc::new(MemStore);
        Some(Box::new(erased))
    } else if cap == CAP_WRITER {
        let erased: Arc<dyn Writer> = Arc::new(MemStore);
        Some(Box::new(erased))
    } else {
        None
    }
}

static STORE_UNIT: UnitManifest = UnitManifest {
    name: "store",
    artifact: "store.bin",
    capabilities: &[
        CapabilityDecl::derives(CAP_READER, SERVICE_CORE),
        CapabilityDecl::derives(CAP_WRITER, SERVICE_CORE),
    ],
    types: &[TypeDecl {
        type_name: "MemStore",
        kind: TypeKind::Concrete,
        capabilities: &[CAP_READER, CAP_WRITER],
        startup: None,
        provider: Some(store_provider),
    }],
};

#[test]
fn one_type_registers_under_every_declared_contract() {
    let i18n = tempfile::tempdir().unwrap();
    let host = bootstrap(test_config(i18n.path()))
        .catalog(UnitCatalog::with_units([&STORE_UNIT]))
        .on_initialize(|ctx| {
            ctx.import_unit(&STORE_UNIT);
            Ok(())
        })
        .run()
        .unwrap();

    let services = host.services();
    for cap in [CAP_READER, CAP_WRITER] {
        let reg = services.registration(cap).expect("registered contract");
        assert_eq!(reg.impl_type, "MemStore");
        assert_eq!(reg.lifetime, Lifetime::Transient);
    }
    let reader: Arc<dyn Reader> = services.resolve(CAP_READER).unwrap();
    let writer: Arc<dyn Writer> = services.resolve(CAP_WRITER).unwrap();
    assert_eq!(reader.read(), "read");
    assert_eq!(writer.write(), "write");
}

// ---------------------------------------------------------------------------
// Last writer wins when two types declare the same contract.
// ---------------------------------------------------------------------------

const CAP_GREET: CapabilityId = CapabilityId::new("test.greet");

trait Greet: Send + Sync {
    fn greet(&self) -> &'static str;
}

struct Terse;

impl Greet for Terse {
    fn greet(&self) -> &'static str {
        "hi"
    }
}

struct Formal;

impl Greet for Formal {
    fn greet(&self) -> &'static str {
        "good day"
    }
}

fn terse_provider(cap: CapabilityId) -> Option<BoxedService> {
    (cap == CAP_GREET).then(|| {
        let erased: Arc<dyn Greet> = Arc::new(Terse);
        Box::new(erased) as BoxedService
    })
}

fn formal_provider(cap: CapabilityId) -> Option<BoxedService> {
    (cap == CAP_GREET).then(|| {
        let erased: Arc<dyn Greet> = Arc::new(Formal);
        Box::new(erased) as BoxedService
    })
}

static GREET_UNIT_ONE: UnitManifest = UnitManifest {
    name: "greet_one",
    artifact: "greet_one.bin",
    capabilities: &[CapabilityDecl::derives(CAP_GREET, SERVICE_CORE)],
    types: &[TypeDecl {
        type_name: "Terse",
        kind: TypeKind::Concrete,
        capabilities: &[CAP_GREET],
        startup: None,
        provider: Some(terse_provider),
    }],
};

static GREET_UNIT_TWO: UnitManifest = UnitManifest {
    name: "greet_two",
    artifact: "greet_two.bin",
    capabilities: &[CapabilityDecl::derives(CAP_GREET, SERVICE_CORE)],
    types: &[TypeDecl {
        type_name: "Formal",
        kind: TypeKind::Concrete,
        capabilities: &[CAP_GREET],
        startup: None,
        provider: Some(formal_provider),
    }],
};

#[test]
fn later_import_shadows_earlier_registration() {
    let i18n = tempfile::tempdir().unwrap();
    let host = bootstrap(test_config(i18n.path()))
        .catalog(UnitCatalog::with_units([&GREET_UNIT_ONE, &GREET_UNIT_TWO]))
        .on_initialize(|ctx| {
            ctx.import_unit(&GREET_UNIT_ONE);
            ctx.import_unit(&GREET_UNIT_TWO);
            Ok(())
        })
        .run()
        .unwrap();

    let greet: Arc<dyn Greet> = host.services().resolve(CAP_GREET).unwrap();
    assert_eq!(greet.greet(), "good day");
    assert_eq!(
        host.services().registration(CAP_GREET).unwrap().impl_type,
        "Formal"
    );
}

// ---------------------------------------------------------------------------
// A failing module constructor never takes down the host.
// ---------------------------------------------------------------------------

const CAP_SURVIVOR: CapabilityId = CapabilityId::new("test.survivor");

fn broken_startup() -> anyhow::Result<Box<dyn ModuleStartup>> {
    anyhow::bail!("refusing to construct")
}

struct SurvivorStartup;

impl ModuleStartup for SurvivorStartup {
    fn configure_services(&self, services: &mut ServiceRegistry) -> anyhow::Result<()> {
        services.register_instance(CAP_SURVIVOR, Arc::new("alive".to_string()));
        Ok(())
    }
}

fn survivor_startup() -> anyhow::Result<Box<dyn ModuleStartup>> {
    Ok(Box::new(SurvivorStartup))
}

static FRAGILE_UNIT: UnitManifest = UnitManifest {
    name: "fragile",
    artifact: "fragile.bin",
    capabilities: &[],
    types: &[
        TypeDecl {
            type_name: "BrokenStartup",
            kind: TypeKind::Concrete,
            capabilities: &[MODULE_STARTUP],
            startup: Some(broken_startup),
            provider: None,
        },
        TypeDecl {
            type_name: "SurvivorStartup",
            kind: TypeKind::Concrete,
            capabilities: &[MODULE_STARTUP],
            startup: Some(survivor_startup),
            provider: None,
        },
    ],
};

#[test]
fn failing_module_is_isolated_and_host_reaches_ready() {
    let i18n = tempfile::tempdir().unwrap();
    let host = bootstrap(test_config(i18n.path()))
        .catalog(UnitCatalog::with_units([&FRAGILE_UNIT]))
        .on_initialize(|ctx| {
            ctx.import_unit(&FRAGILE_UNIT);
            Ok(())
        })
        .run()
        .unwrap();

    assert_eq!(host.phase(), Phase::Ready);
    assert_eq!(host.report().errors.len(), 1);
    assert_eq!(host.report().errors[0].type_name, "BrokenStartup");
    assert_eq!(
        host.services().resolve::<String>(CAP_SURVIVOR).as_deref(),
        Some("alive")
    );
}

// ---------------------------------------------------------------------------
// Configuration validation aborts early.
// ---------------------------------------------------------------------------

#[test]
fn missing_language_key_aborts_bootstrap() {
    let i18n = tempfile::tempdir().unwrap();
    let mut config = test_config(i18n.path());
    config.i18n.as_mut().unwrap().language = String::new();

    match bootstrap(config).run() {
        Err(HostError::MissingKey(key)) => assert_eq!(key, "i18n.language"),
        Err(other) => panic!("expected MissingKey, got {other:?}"),
        Ok(_) => panic!("expected MissingKey, bootstrap succeeded"),
    }
    // No statement file was created for the empty language.
    assert_eq!(std::fs::read_dir(i18n.path()).unwrap().count(), 0);
}

#[test]
fn missing_i18n_section_aborts_bootstrap() {
    let result = HostBootstrap::from_config(AppConfig::default())
        .without_logging()
        .run();
    assert!(matches!(result, Err(HostError::MissingSection("i18n"))));
}

// ---------------------------------------------------------------------------
// Library resolution walks the search paths in order.
// ---------------------------------------------------------------------------

static PLUGIN_UNIT: UnitManifest = UnitManifest {
    name: "plugins",
    artifact: "plugins.bin",
    capabilities: &[],
    types: &[],
};

#[test]
fn library_resolves_from_second_search_path() {
    let i18n = tempfile::tempdir().unwrap();
    let exec = tempfile::tempdir().unwrap();
    let shared = tempfile::tempdir().unwrap();
    std::fs::write(shared.path().join("plugins.bin"), b"").unwrap();

    let mut config = test_config(i18n.path());
    let hosting = config.hosting.as_mut().unwrap();
    hosting.paths = vec![shared.path().to_string_lossy().into_owned()];
    hosting.libraries = vec!["plugins.bin".to_string()];

    let host = bootstrap(config)
        .catalog(UnitCatalog::with_units([&PLUGIN_UNIT]))
        .execution_dir(exec.path().to_path_buf())
        .run()
        .unwrap();

    assert_eq!(host.imported_units().len(), 1);
    assert!(host.imported_units().contains(&PLUGIN_UNIT));
}

#[test]
fn unresolvable_library_is_skipped_not_fatal() {
    let i18n = tempfile::tempdir().unwrap();
    let exec = tempfile::tempdir().unwrap();

    let mut config = test_config(i18n.path());
    config.hosting.as_mut().unwrap().libraries = vec!["missing.bin".to_string()];

    let host = bootstrap(config)
        .catalog(UnitCatalog::default())
        .execution_dir(exec.path().to_path_buf())
        .run()
        .unwrap();

    assert_eq!(host.phase(), Phase::Ready);
    assert!(host.imported_units().is_empty());
}

// ---------------------------------------------------------------------------
// Assembled pipeline: health, docs and filter rejection.
// ---------------------------------------------------------------------------

struct DenyAll;

impl RequestFilter for DenyAll {
    fn name(&self) -> &'static str {
        "deny_all"
    }

    fn on_request(
        &self,
        _parts: &axum::http::request::Parts,
    ) -> Result<(), axum::http::StatusCode> {
        Err(axum::http::StatusCode::FORBIDDEN)
    }
}

#[tokio::test]
async fn pipeline_serves_health_and_docs() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let i18n = tempfile::tempdir().unwrap();
    let mut config = test_config(i18n.path());
    config.hosting.as_mut().unwrap().docs = vec![DocGroup {
        name: "all".to_string(),
        description: "All APIs".to_string(),
        keyword: "*".to_string(),
    }];

    let host = bootstrap(config)
        .catalog(UnitCatalog::default())
        .run()
        .unwrap();
    let router = host.into_router();

    let health = router
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);

    let docs = router
        .oneshot(Request::get("/api-docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(docs.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejecting_filter_short_circuits_requests() {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    let i18n = tempfile::tempdir().unwrap();
    let host = bootstrap(test_config(i18n.path()))
        .catalog(UnitCatalog::default())
        .add_filter(Arc::new(DenyAll))
        .run()
        .unwrap();

    let response = host
        .into_router()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
