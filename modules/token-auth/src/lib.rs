//! Token authentication unit.
//!
//! Ships two capability contracts, [`TokenIssuer`] and [`TokenInspector`],
//! one concrete type implementing both, and a module startup that registers
//! the issuer settings. Tokens carry their own subject and expiry; format
//! details are internal to this unit.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use quay_kit::{
    BoxedService, CapabilityDecl, CapabilityId, ModuleStartup, ServiceRegistry, TypeDecl,
    TypeKind, UnitHandle, UnitManifest, UnitRegistration, UnitSource, MODULE_STARTUP,
    SERVICE_CORE,
};

pub const TOKEN_ISSUER: CapabilityId = CapabilityId::new("auth.token_issuer");
pub const TOKEN_INSPECTOR: CapabilityId = CapabilityId::new("auth.token_inspector");
pub const TOKEN_SETTINGS: CapabilityId = CapabilityId::new("auth.token_settings");

/// Claims carried by an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub subject: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenClaims {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Issues bearer tokens for a subject.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, subject: &str) -> String;
}

/// Parses and validates issued tokens.
pub trait TokenInspector: Send + Sync {
    fn inspect(&self, token: &str) -> Option<TokenClaims>;
}

/// Issuer configuration, registered by the unit's startup as a singleton.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub ttl_seconds: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self { ttl_seconds: 3600 }
    }
}

/// Bearer token issuer and inspector. Tokens are `subject.expiry.id`
/// triples; the inspector rejects malformed or expired ones.
pub struct BearerTokens {
    ttl: Duration,
}

impl BearerTokens {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            ttl: Duration::seconds(settings.ttl_seconds),
        }
    }
}

impl Default for BearerTokens {
    fn default() -> Self {
        Self::new(&TokenSettings::default())
    }
}

impl TokenIssuer for BearerTokens {
    fn issue(&self, subject: &str) -> String {
        let expires_at = Utc::now() + self.ttl;
        let token_id = Uuid::new_v4();
        tracing::debug!(subject, %token_id, "token issued");
        format!("{subject}.{}.{token_id}", expires_at.timestamp())
    }
}

impl TokenInspector for BearerTokens {
    fn inspect(&self, token: &str) -> Option<TokenClaims> {
        let mut parts = token.rsplitn(3, '.');
        let token_id = parts.next()?;
        let expiry = parts.next()?.parse::<i64>().ok()?;
        let subject = parts.next()?;
        if subject.is_empty() || Uuid::parse_str(token_id).is_err() {
            return None;
        }
        let claims = TokenClaims {
            subject: subject.to_string(),
            token_id: token_id.to_string(),
            expires_at: DateTime::from_timestamp(expiry, 0)?,
        };
        if claims.is_expired() {
            tracing::debug!(subject = %claims.subject, "expired token rejected");
            return None;
        }
        Some(claims)
    }
}

impl UnitSource for BearerTokens {
    fn unit() -> UnitHandle {
        &UNIT
    }
}

fn bearer_provider(cap: CapabilityId) -> Option<BoxedService> {
    if cap == TOKEN_ISSUER {
        let erased: Arc<dyn TokenIssuer> = Arc::new(BearerTokens::default());
        Some(Box::new(erased))
    } else if cap == TOKEN_INSPECTOR {
        let erased: Arc<dyn TokenInspector> = Arc::new(BearerTokens::default());
        Some(Box::new(erased))
    } else {
        None
    }
}

/// Startup for the token-auth unit: publishes the issuer settings so other
/// modules can resolve them.
pub struct TokenAuthStartup;

impl ModuleStartup for TokenAuthStartup {
    fn configure_services(&self, services: &mut ServiceRegistry) -> anyhow::Result<()> {
        services.register_instance(TOKEN_SETTINGS, Arc::new(TokenSettings::default()));
        tracing::info!("token auth configured");
        Ok(())
    }
}

fn startup_factory() -> anyhow::Result<Box<dyn ModuleStartup>> {
    Ok(Box::new(TokenAuthStartup))
}

pub static UNIT: UnitManifest = UnitManifest {
    name: "token_auth",
    artifact: "token_auth.bin",
    capabilities: &[
        CapabilityDecl::derives(TOKEN_ISSUER, SERVICE_CORE),
        CapabilityDecl::derives(TOKEN_INSPECTOR, SERVICE_CORE),
        CapabilityDecl::new(TOKEN_SETTINGS),
    ],
    types: &[
        TypeDecl {
            type_name: "TokenAuthStartup",
            kind: TypeKind::Concrete,
            capabilities: &[MODULE_STARTUP],
            startup: Some(startup_factory),
            provider: None,
        },
        TypeDecl {
            type_name: "BearerTokens",
            kind: TypeKind::Concrete,
            capabilities: &[TOKEN_ISSUER, TOKEN_INSPECTOR],
            startup: None,
            provider: Some(bearer_provider),
        },
    ],
};

inventory::submit!(UnitRegistration(&UNIT));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_through_inspection() {
        let tokens = BearerTokens::default();
        let token = tokens.issue("alice");
        let claims = tokens.inspect(&token).expect("valid token");
        assert_eq!(claims.subject, "alice");
        assert!(!claims.is_expired());
    }

    #[test]
    fn subject_may_contain_dots() {
        let tokens = BearerTokens::default();
        let token = tokens.issue("svc.internal.worker");
        let claims = tokens.inspect(&token).expect("valid token");
        assert_eq!(claims.subject, "svc.internal.worker");
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = BearerTokens::new(&TokenSettings { ttl_seconds: -60 });
        let token = tokens.issue("bob");
        assert!(tokens.inspect(&token).is_none());
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        let tokens = BearerTokens::default();
        assert!(tokens.inspect("").is_none());
        assert!(tokens.inspect("no-separators").is_none());
        assert!(tokens.inspect("alice.notanumber.uuid").is_none());
        assert!(tokens.inspect("alice.1700000000.not-a-uuid").is_none());
    }

    #[test]
    fn startup_registers_settings() {
        let mut services = ServiceRegistry::new();
        TokenAuthStartup
            .configure_services(&mut services)
            .unwrap();
        assert!(services.contains(TOKEN_SETTINGS));
    }
}
