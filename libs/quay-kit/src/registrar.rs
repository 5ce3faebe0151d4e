//! Registrar: runs module startups and auto-registers service-core types.
//!
//! Two passes over the imported units in import order, types in declaration
//! order. Pass one constructs every module-startup type and lets it
//! configure the registry. Pass two registers every service-core type's
//! factory under each contract it declares. Failures are collected per
//! type, never aborting the remaining modules.

use crate::capability::CapabilityIndex;
use crate::classifier::{classify, ClassifiedType};
use crate::contracts::MODULE_STARTUP;
use crate::services::{Lifetime, ServiceRegistry};
use crate::tracker::ImportTracker;

/// Outcome of a registrar run.
#[derive(Debug, Default)]
pub struct RegistrarReport {
    pub startups_run: usize,
    pub services_registered: usize,
    pub errors: Vec<ModuleError>,
}

impl RegistrarReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A per-type failure during startup or registration.
#[derive(Debug)]
pub struct ModuleError {
    pub type_name: &'static str,
    pub error: anyhow::Error,
}

/// Run both registrar passes over the tracked units.
pub fn apply(
    tracker: &ImportTracker,
    index: &CapabilityIndex,
    services: &mut ServiceRegistry,
) -> RegistrarReport {
    let mut report = RegistrarReport::default();
    let classified: Vec<ClassifiedType> = tracker
        .iter()
        .flat_map(|unit| classify(unit, index))
        .collect();

    for ct in &classified {
        if !ct.decl.capabilities.contains(&MODULE_STARTUP) {
            continue;
        }
        run_startup(ct, services, &mut report);
    }

    for ct in &classified {
        if !ct.service_core {
            continue;
        }
        register_services(ct, services, &mut report);
    }

    report
}

fn run_startup(ct: &ClassifiedType, services: &mut ServiceRegistry, report: &mut RegistrarReport) {
    let Some(factory) = ct.decl.startup else {
        report.errors.push(ModuleError {
            type_name: ct.decl.type_name,
            error: anyhow::anyhow!("module-startup type declares no startup factory"),
        });
        return;
    };
    let startup = match factory() {
        Ok(startup) => startup,
        Err(error) => {
            tracing::error!(
                module = ct.decl.type_name,
                error = %error,
                "module startup construction failed"
            );
            report.errors.push(ModuleError {
                type_name: ct.decl.type_name,
                error,
            });
            return;
        }
    };
    match startup.configure_services(services) {
        Ok(()) => {
            tracing::info!(module = ct.decl.type_name, "module startup configured");
            report.startups_run += 1;
        }
        Err(error) => {
            tracing::error!(
                module = ct.decl.type_name,
                error = %error,
                "module startup configuration failed"
            );
            report.errors.push(ModuleError {
                type_name: ct.decl.type_name,
                error,
            });
        }
    }
}

fn register_services(
    ct: &ClassifiedType,
    services: &mut ServiceRegistry,
    report: &mut RegistrarReport,
) {
    if ct.capabilities.is_empty() {
        // Only the root marker was declared; nothing to register under.
        tracing::debug!(
            service = ct.decl.type_name,
            "service-core type declares no concrete contracts"
        );
        return;
    }
    let Some(provider) = ct.decl.provider else {
        report.errors.push(ModuleError {
            type_name: ct.decl.type_name,
            error: anyhow::anyhow!("service-core type declares no provider factory"),
        });
        return;
    };
    for cap in &ct.capabilities {
        services.register_factory(*cap, ct.decl.type_name, Lifetime::Transient, provider);
        report.services_registered += 1;
        tracing::debug!(
            service = ct.decl.type_name,
            capability = %cap,
            "service registered"
        );
    }
}
