//! Application bootstrap.
//!
//! Builds the database, feed source, messaging client and use case layer
//! from a loaded [`Config`].

use std::sync::Arc;

use secrecy::SecretString;
use tracing::info;

use crate::channeltalk::Client;
use crate::config::Config;
use crate::feed::{HttpFeedSource, SqlRepository};
use crate::service::UseCase;
use crate::web::WebServer;
use crate::{Database, Result};

/// Wired application.
pub struct Application {
    config: Config,
    db: Database,
    usecase: Arc<UseCase>,
}

impl Application {
    /// Connect to the database and build every collaborator.
    pub async fn from_config(config: Config) -> Result<Self> {
        let db = Database::connect(&config.database).await?;

        let repo = Arc::new(SqlRepository::new(db.pool().clone()));
        let source = Arc::new(HttpFeedSource::new(&config.fetcher)?);
        let client = Arc::new(Client::new(
            SecretString::new(config.app.secret.clone()),
            &config.channeltalk,
        )?);

        let usecase = Arc::new(UseCase::new(
            config.app.name.clone(),
            repo,
            source,
            client,
        ));

        Ok(Self {
            config,
            db,
            usecase,
        })
    }

    pub fn usecase(&self) -> &UseCase {
        &self.usecase
    }

    /// Serve the webhook until the listener fails.
    pub async fn serve(&self) -> Result<()> {
        let server = WebServer::new(&self.config.server, self.usecase.clone())?;
        info!("Starting {} on {}", self.config.app.name, server.addr());
        server.run().await
    }

    /// Close the connection pool.
    pub async fn shutdown(self) {
        self.db.close().await;
    }
}
