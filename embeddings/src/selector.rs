use crate::backend::Embedder;
use crate::config::{BackendMode, EmbeddingConfig};
use crate::error::{EmbeddingError, Result};
#[cfg(feature = "local")]
use crate::local::LocalBackend;
use crate::remote::RemoteBackend;
use log::{info, warn};
use std::sync::Arc;

/// The closed set of backends the selector can produce.
pub enum EmbeddingBackend {
    #[cfg(feature = "local")]
    Local(LocalBackend),
    Remote(RemoteBackend),
    /// Semantic search is unavailable; not an error.
    Disabled,
}

impl EmbeddingBackend {
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "local")]
            EmbeddingBackend::Local(_) => "local",
            EmbeddingBackend::Remote(_) => "remote",
            EmbeddingBackend::Disabled => "disabled",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, EmbeddingBackend::Disabled)
    }

    /// Erase the concrete backend. `Disabled` becomes `None`.
    pub fn into_embedder(self) -> Option<Arc<dyn Embedder>> {
        match self {
            #[cfg(feature = "local")]
            EmbeddingBackend::Local(backend) => Some(Arc::new(backend)),
            EmbeddingBackend::Remote(backend) => Some(Arc::new(backend)),
            EmbeddingBackend::Disabled => None,
        }
    }
}

impl std::fmt::Debug for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the backend requested by `config.mode`.
///
/// Only `Auto` may substitute one provider for another. An explicit `Local` or
/// `Remote` request that cannot be satisfied returns
/// [`EmbeddingError::BackendUnavailable`].
pub fn select_backend(config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
    select_backend_with(config, build_local)
}

/// [`select_backend`] with the local provider supplied by the caller.
///
/// `local` is called at most once, and only for `Local` and `Auto`.
pub fn select_backend_with<F>(config: &EmbeddingConfig, local: F) -> Result<EmbeddingBackend>
where
    F: FnOnce(&EmbeddingConfig) -> Result<EmbeddingBackend>,
{
    config
        .validate()
        .map_err(|reason| EmbeddingError::InvalidInput(format!("invalid embedding config: {reason}")))?;

    let backend = match config.mode {
        BackendMode::Disabled => EmbeddingBackend::Disabled,
        BackendMode::Local => local(config)?,
        BackendMode::Remote => build_remote(config)?,
        BackendMode::Auto => select_auto(config, local),
    };

    info!(
        "Embedding backend selected: {} (requested {})",
        backend.name(),
        config.mode
    );
    Ok(backend)
}

/// Local, then remote when a key is configured, then disabled.
fn select_auto<F>(config: &EmbeddingConfig, local: F) -> EmbeddingBackend
where
    F: FnOnce(&EmbeddingConfig) -> Result<EmbeddingBackend>,
{
    match local(config) {
        Ok(backend) => return backend,
        Err(err) => warn!("Local embedding backend unavailable: {err}"),
    }

    if config.api_key().is_some() {
        match build_remote(config) {
            Ok(backend) => return backend,
            Err(err) => warn!("Remote embedding backend unavailable: {err}"),
        }
    }

    warn!("No embedding backend available; semantic search disabled");
    EmbeddingBackend::Disabled
}

#[cfg(feature = "local")]
fn build_local(config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
    LocalBackend::new(config)
        .map(EmbeddingBackend::Local)
        .map_err(|err| EmbeddingError::BackendUnavailable {
            provider: "local",
            reason: err.to_string(),
        })
}

#[cfg(not(feature = "local"))]
fn build_local(_config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
    Err(EmbeddingError::BackendUnavailable {
        provider: "local",
        reason: "built without the `local` feature".to_string(),
    })
}

fn build_remote(config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
    RemoteBackend::new(config).map(EmbeddingBackend::Remote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_disabled_mode_yields_no_embedder() {
        let backend = select_backend(&EmbeddingConfig::disabled()).unwrap();
        assert_eq!(backend.name(), "disabled");
        assert!(!backend.is_enabled());
        assert!(backend.into_embedder().is_none());
    }

    #[test]
    fn test_explicit_remote_without_key_fails_loudly() {
        let config = EmbeddingConfig {
            mode: BackendMode::Remote,
            ..Default::default()
        };
        let err = select_backend(&config).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::BackendUnavailable {
                provider: "remote",
                ..
            }
        ));
    }

    #[test]
    fn test_explicit_remote_with_key() {
        let config = EmbeddingConfig {
            mode: BackendMode::Remote,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let embedder = select_backend(&config).unwrap().into_embedder().unwrap();
        assert_eq!(embedder.identifier(), "text-embedding-ada-002");
        assert_eq!(embedder.dimension(), 1536);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EmbeddingConfig {
            mode: BackendMode::Disabled,
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            select_backend(&config),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    fn local_unavailable(_config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
        Err(EmbeddingError::BackendUnavailable {
            provider: "local",
            reason: "model missing".to_string(),
        })
    }

    /// Stands in for a loaded local model; tagged by its model identifier.
    fn local_available(_config: &EmbeddingConfig) -> Result<EmbeddingBackend> {
        let config = EmbeddingConfig {
            remote_model: "stub-local-model".to_string(),
            remote_dimension: Some(8),
            api_key: Some("unused".to_string()),
            ..Default::default()
        };
        RemoteBackend::new(&config).map(EmbeddingBackend::Remote)
    }

    fn identifier(backend: EmbeddingBackend) -> Option<String> {
        backend
            .into_embedder()
            .map(|embedder| embedder.identifier().to_string())
    }

    #[test]
    fn test_auto_prefers_local_over_remote() {
        let config = EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let backend = select_backend_with(&config, local_available).unwrap();
        assert_eq!(identifier(backend).as_deref(), Some("stub-local-model"));
    }

    #[test]
    fn test_auto_falls_back_to_remote_then_disabled() {
        let with_key = EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let backend = select_backend_with(&with_key, local_unavailable).unwrap();
        assert_eq!(backend.name(), "remote");
        assert_eq!(identifier(backend).as_deref(), Some("text-embedding-ada-002"));

        let without_key = EmbeddingConfig::default();
        let backend = select_backend_with(&without_key, local_unavailable).unwrap();
        assert_eq!(backend.name(), "disabled");
    }

    #[test]
    fn test_explicit_local_failure_is_not_substituted() {
        let config = EmbeddingConfig {
            mode: BackendMode::Local,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            select_backend_with(&config, local_unavailable),
            Err(EmbeddingError::BackendUnavailable {
                provider: "local",
                ..
            })
        ));
    }

    #[test]
    fn test_explicit_modes_skip_local() {
        let mut called = false;
        let config = EmbeddingConfig {
            mode: BackendMode::Remote,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let backend = select_backend_with(&config, |config| {
            called = true;
            local_available(config)
        })
        .unwrap();
        assert_eq!(backend.name(), "remote");

        let backend = select_backend_with(&EmbeddingConfig::disabled(), |config| {
            called = true;
            local_available(config)
        })
        .unwrap();
        assert_eq!(backend.name(), "disabled");
        assert!(!called);
    }

    #[cfg(not(feature = "local"))]
    #[test]
    fn test_explicit_local_without_feature_fails_loudly() {
        let config = EmbeddingConfig {
            mode: BackendMode::Local,
            ..Default::default()
        };
        assert!(matches!(
            select_backend(&config),
            Err(EmbeddingError::BackendUnavailable {
                provider: "local",
                ..
            })
        ));
    }
}
