//! Application state - shared across all handlers.

use std::sync::Arc;

use blog_core::domain::User;
use blog_core::error::RepoError;
use blog_core::ports::{AuthError, BaseRepository, Mailer, PasswordService, UserRepository};
use blog_core::{BlogPorts, BlogService, BlogSettings};
use blog_infra::InMemoryBlogStore;
use blog_infra::database::DatabaseConnections;

#[cfg(feature = "postgres")]
use blog_infra::database::{
    PostgresCommentRepository, PostgresPostRepository, PostgresTagRepository,
    PostgresUserRepository,
};

use crate::config::{AdminConfig, AppConfig, SiteConfig};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub blog: Arc<BlogService>,
    pub users: Arc<dyn UserRepository>,
    pub db: Option<Arc<DatabaseConnections>>,
    pub site: Arc<SiteConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

fn memory_ports(mailer: Arc<dyn Mailer>) -> BlogPorts {
    let store = InMemoryBlogStore::new();
    BlogPorts {
        posts: Arc::new(store.clone()),
        comments: Arc::new(store.clone()),
        tags: Arc::new(store.clone()),
        users: Arc::new(store),
        mailer,
    }
}

#[cfg(feature = "postgres")]
fn postgres_ports(db: &DatabaseConnections, mailer: Arc<dyn Mailer>) -> BlogPorts {
    BlogPorts {
        posts: Arc::new(PostgresPostRepository::new(db.main.clone())),
        comments: Arc::new(PostgresCommentRepository::new(db.main.clone())),
        tags: Arc::new(PostgresTagRepository::new(db.main.clone())),
        users: Arc::new(PostgresUserRepository::new(db.main.clone())),
        mailer,
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig, passwords: &dyn PasswordService) -> Self {
        let mailer = config.mail.build();

        #[cfg(feature = "postgres")]
        let (db, ports) = match &config.database {
            Some(db_config) => match DatabaseConnections::init(db_config).await {
                Ok(connections) => {
                    let ports = postgres_ports(&connections, mailer);
                    (Some(Arc::new(connections)), ports)
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    (None, memory_ports(mailer))
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                (None, memory_ports(mailer))
            }
        };

        #[cfg(not(feature = "postgres"))]
        let (db, ports) = {
            tracing::info!("Running without postgres feature - using in-memory store");
            (None, memory_ports(mailer))
        };

        let state =
            Self::from_ports(ports, config.blog.clone(), db).with_site(config.site.clone());

        if let Some(admin) = &config.admin {
            match bootstrap_admin(state.users.as_ref(), passwords, admin).await {
                Ok(true) => tracing::info!(username = %admin.username, "Staff account created"),
                Ok(false) => tracing::debug!("Staff account already present"),
                Err(e) => tracing::error!(error = %e, "Failed to bootstrap staff account"),
            }
        }

        tracing::info!("Application state initialized");
        state
    }

    pub fn from_ports(
        ports: BlogPorts,
        settings: BlogSettings,
        db: Option<Arc<DatabaseConnections>>,
    ) -> Self {
        let users = ports.users.clone();
        Self {
            blog: Arc::new(BlogService::new(ports, settings)),
            users,
            db,
            site: Arc::new(SiteConfig::default()),
        }
    }

    pub fn with_site(mut self, site: SiteConfig) -> Self {
        self.site = Arc::new(site);
        self
    }

    /// Fresh in-memory state around `mailer`.
    pub fn in_memory(mailer: Arc<dyn Mailer>, settings: BlogSettings) -> Self {
        Self::from_ports(memory_ports(mailer), settings, None)
    }

    /// Storage backend label for the health endpoint.
    pub async fn storage_status(&self) -> &'static str {
        match &self.db {
            #[cfg(feature = "postgres")]
            Some(db) => match db.ping().await {
                Ok(()) => "postgres",
                Err(e) => {
                    tracing::warn!(error = %e, "Database ping failed");
                    "postgres-unreachable"
                }
            },
            #[cfg(not(feature = "postgres"))]
            Some(_) => "postgres",
            None => "in-memory",
        }
    }
}

/// Create the configured staff account unless its email is taken.
/// Returns whether an account was created.
pub async fn bootstrap_admin(
    users: &dyn UserRepository,
    passwords: &dyn PasswordService,
    admin: &AdminConfig,
) -> Result<bool, BootstrapError> {
    if users.find_by_email(&admin.email).await?.is_some() {
        return Ok(false);
    }

    let hash = passwords.hash(&admin.password)?;
    let user = User::new(admin.username.clone(), admin.email.clone(), hash).staff();
    users.save(user).await?;
    Ok(true)
}
