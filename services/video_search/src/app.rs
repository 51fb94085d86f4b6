//! services/video_search/src/app.rs
//!
//! Defines the application state shared by every command: configuration,
//! the gateway used for all data operations, and the session manager that
//! gates them.

use crate::adapters::{FileCredentialStore, FirebaseIdentityAdapter, RestGatewayAdapter};
use crate::config::Config;
use crate::error::ClientError;
use crate::session::SessionManager;
use std::sync::Arc;
use tracing::info;
use video_search_core::ports::{CredentialStore, IdentityProvider, VideoGateway};

/// The shared application state, created once at startup and passed to each command.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub credentials: Arc<dyn CredentialStore>,
    pub gateway: Arc<dyn VideoGateway>,
    /// Absent when no identity provider is configured; data commands then run
    /// with whatever credential is already persisted.
    pub session: Option<Arc<SessionManager>>,
}

impl AppState {
    /// Wires the production adapters described by `config`.
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let credentials: Arc<dyn CredentialStore> =
            Arc::new(FileCredentialStore::new(config.credential_path.clone()));

        let provider: Option<Arc<dyn IdentityProvider>> = match config.firebase_api_key.as_deref()
        {
            Some(api_key) => Some(Arc::new(
                FirebaseIdentityAdapter::new(
                    api_key,
                    &config.identity_toolkit_url,
                    &config.secure_token_url,
                    config.request_timeout,
                )?
                .with_persistence(config.account_path.clone()),
            )),
            None => {
                info!("FIREBASE_API_KEY not set; using the persisted credential only");
                None
            }
        };

        Self::with_adapters(config, credentials, provider)
    }

    /// Wires the REST gateway and session manager around the given adapters.
    pub fn with_adapters(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self, ClientError> {
        let gateway: Arc<dyn VideoGateway> = Arc::new(RestGatewayAdapter::new(
            &config.api_base_url,
            config.request_timeout,
            credentials.clone(),
        )?);

        let session = provider.map(|provider| {
            Arc::new(SessionManager::new(
                provider,
                credentials.clone(),
                config.token_refresh_interval,
            ))
        });

        Ok(Self { config: Arc::new(config), credentials, gateway, session })
    }

    /// The session manager, or a configuration error naming the missing key.
    pub fn require_session(&self) -> Result<&Arc<SessionManager>, ClientError> {
        match &self.session {
            Some(session) => Ok(session),
            None => {
                self.config.require_firebase_api_key()?;
                Err(ClientError::Internal("Identity provider was not initialized".to_string()))
            }
        }
    }

    /// Starts the session manager, if any, and waits for its first state.
    pub async fn start(&self) {
        if let Some(session) = &self.session {
            session.start();
            let current = session.wait_until_ready().await;
            match current.identity() {
                Some(identity) => info!("Session ready for {}", identity.uid),
                None => info!("Session ready (signed out)"),
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(session) = &self.session {
            session.shutdown().await;
        }
    }
}
