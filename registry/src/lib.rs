use std::sync::Arc;

use adapter::repository::{
    document::InMemoryDocumentRepository, loan::InMemoryLoanRepository,
    member::InMemoryMemberRepository, review::InMemoryReviewRepository,
};
use kernel::service::{circulation::CirculationService, review::ReviewService};
use shared::config::AppConfig;

/// Explicitly constructed wiring of stores and services. Multiple registries
/// are fully independent, which is what makes the engine testable; there is
/// no process-wide instance.
pub struct AppRegistry {
    config: AppConfig,
    circulation: Arc<CirculationService>,
    reviews: Arc<ReviewService>,
}

impl AppRegistry {
    pub fn new(config: AppConfig) -> Self {
        let documents = Arc::new(InMemoryDocumentRepository::new());
        let members = Arc::new(InMemoryMemberRepository::new());
        let loans = Arc::new(InMemoryLoanRepository::new());
        let reviews = Arc::new(InMemoryReviewRepository::new());

        let circulation = Arc::new(CirculationService::new(
            documents.clone(),
            members.clone(),
            loans,
            reviews.clone(),
            config.policy,
        ));
        let reviews = Arc::new(ReviewService::new(reviews, documents, members));

        Self {
            config,
            circulation,
            reviews,
        }
    }

    /// Builds a registry from the `LIBRARY_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(AppConfig::from_env())
    }

    pub fn library_name(&self) -> &str {
        &self.config.library_name
    }

    pub fn circulation(&self) -> Arc<CirculationService> {
        Arc::clone(&self.circulation)
    }

    pub fn reviews(&self) -> Arc<ReviewService> {
        Arc::clone(&self.reviews)
    }
}


/// Installs the process-wide tracing subscriber. Call once at startup;
/// `RUST_LOG` controls the filter.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();
}
