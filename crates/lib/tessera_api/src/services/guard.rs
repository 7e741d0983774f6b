//! Origin/scope guard.
//!
//! Runs after authentication, before any tokens are issued. Requests
//! carrying an `Origin` header must come from one of the client's
//! registered origins; originless requests (dev/tool contexts) must hold
//! the configured minimum authority set instead.

use std::collections::HashMap;

use tessera_core::auth::AuthError;
use tessera_core::auth::identity::AuthIdentity;
use tessera_core::models::auth::AuthenticationType;

use crate::config::ApiConfig;

/// Validate the request origin against the authenticated identity.
pub fn validate_origins(
    identity: &AuthIdentity,
    origin: Option<&str>,
    config: &ApiConfig,
) -> Result<(), AuthError> {
    match origin {
        Some(origin) => validate_registered_origin(identity, origin),
        None => validate_minimum_authorities(identity, config),
    }
}

/// An empty registered list means no restriction is enforceable.
fn validate_registered_origin(identity: &AuthIdentity, origin: &str) -> Result<(), AuthError> {
    let origins = &identity.client().origins;
    if origins.is_empty() {
        return Ok(());
    }
    if origins.iter().any(|registered| registered == origin) {
        Ok(())
    } else {
        tracing::warn!(
            origin,
            client_id = %identity.client().client_id,
            "origin not registered for client"
        );
        Err(AuthError::AuthoritiesMissing)
    }
}

fn validate_minimum_authorities(
    identity: &AuthIdentity,
    config: &ApiConfig,
) -> Result<(), AuthError> {
    let required = match identity.authentication_type() {
        AuthenticationType::UserLogin => &config.dev_authorities,
        AuthenticationType::ClientLogin => &config.client_dev_authorities,
    };
    if covers_with_multiplicity(&identity.authorities(), required) {
        Ok(())
    } else {
        Err(AuthError::AuthoritiesMissing)
    }
}

/// Multiset superset check: every required authority must be separately
/// present, so duplicate requirements consume duplicate grants.
fn covers_with_multiplicity(held: &[String], required: &[String]) -> bool {
    let mut frequency: HashMap<&str, u32> = HashMap::new();
    for authority in held {
        *frequency.entry(authority.as_str()).or_insert(0) += 1;
    }
    for authority in required {
        match frequency.get_mut(authority.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::auth::identity::ClientIdentity;
    use tessera_core::models::auth::ClientType;

    fn client_identity(origins: Vec<String>, scopes: Vec<String>) -> AuthIdentity {
        AuthIdentity::Client(ClientIdentity {
            client_id: "c1".into(),
            client_name: "console".into(),
            client_type: ClientType::Internal,
            scopes,
            origins,
            remote_address: "10.0.0.1".into(),
        })
    }

    fn config(client_dev: &[&str]) -> ApiConfig {
        let mut config = ApiConfig::from_env();
        config.client_dev_authorities = client_dev.iter().map(|s| s.to_string()).collect();
        config
    }

    #[test]
    fn registered_origin_passes_and_foreign_origin_fails() {
        let identity = client_identity(vec!["https://a.com".into()], vec![]);
        let config = config(&[]);
        assert!(validate_origins(&identity, Some("https://a.com"), &config).is_ok());
        assert!(matches!(
            validate_origins(&identity, Some("https://b.com"), &config),
            Err(AuthError::AuthoritiesMissing)
        ));
    }

    #[test]
    fn empty_origin_list_accepts_any_origin() {
        let identity = client_identity(vec![], vec![]);
        assert!(validate_origins(&identity, Some("https://anything.example"), &config(&[])).is_ok());
    }

    #[test]
    fn originless_requests_need_the_minimum_authorities() {
        let identity = client_identity(vec![], vec!["internal".into()]);
        assert!(validate_origins(&identity, None, &config(&["internal"])).is_ok());
        assert!(matches!(
            validate_origins(&identity, None, &config(&["internal", "admin"])),
            Err(AuthError::AuthoritiesMissing)
        ));
    }

    #[test]
    fn duplicate_requirements_need_duplicate_grants() {
        let held = vec!["ops".to_string(), "ops".to_string()];
        assert!(covers_with_multiplicity(&held, &["ops".into(), "ops".into()]));
        let held_once = vec!["ops".to_string()];
        assert!(!covers_with_multiplicity(
            &held_once,
            &["ops".into(), "ops".into()]
        ));
    }
}
