//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST API.
//! Services are generic over the store/collaborator/classifier ports; AppState
//! pins them to the implementations selected from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use tandem_core::collaborator::{BoxCompletionCollaborator, UnconfiguredCollaborator};
use tandem_core::conversation::{ConversationService, ConversationStore};
use tandem_core::routing::{
    AgentRegistry, CompletionClassifier, IntentClassifier, IntentRouter, KeywordClassifier,
};
use tandem_core::session::GroupSessionManager;
use tandem_core::store::{DocumentStore, MemoryDocumentStore};
use tandem_infra::collaborator::HttpCompletionCollaborator;
use tandem_infra::config::{load_config, resolve_data_dir, resolve_store_policy};
use tandem_infra::sqlite::document::SqliteDocumentStore;
use tandem_infra::sqlite::pool::{DatabasePool, database_url};
use tandem_types::config::{ClassifierKind, TandemConfig};
use tandem_types::error::{CoreError, StoreError};
use tandem_types::routing::Classification;
use tandem_types::store::{StoredDocument, WriteCondition, WriteReceipt};

/// Document store selected at startup: SQLite on disk, or in-process for
/// `--ephemeral` runs.
#[derive(Clone)]
pub enum AppDocumentStore {
    Memory(MemoryDocumentStore),
    Sqlite(SqliteDocumentStore),
}

impl DocumentStore for AppDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<StoredDocument>, StoreError> {
        match self {
            AppDocumentStore::Memory(store) => store.get(key).await,
            AppDocumentStore::Sqlite(store) => store.get(key).await,
        }
    }

    async fn put(
        &self,
        key: &str,
        body: &serde_json::Value,
        condition: WriteCondition,
    ) -> Result<WriteReceipt, StoreError> {
        match self {
            AppDocumentStore::Memory(store) => store.put(key, body, condition).await,
            AppDocumentStore::Sqlite(store) => store.put(key, body, condition).await,
        }
    }
}

/// Intent classifier selected by `[routing] classifier`.
pub enum AppClassifier {
    Keyword(KeywordClassifier),
    Completion(CompletionClassifier<BoxCompletionCollaborator>),
}

impl IntentClassifier for AppClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, CoreError> {
        match self {
            AppClassifier::Keyword(classifier) => classifier.classify(text).await,
            AppClassifier::Completion(classifier) => classifier.classify(text).await,
        }
    }
}

pub type SharedCollaborator = Arc<BoxCompletionCollaborator>;

pub type ConcreteConversationService = ConversationService<AppDocumentStore>;

pub type ConcreteSessionManager = GroupSessionManager<AppDocumentStore, SharedCollaborator>;

pub type ConcreteIntentRouter = IntentRouter<AppClassifier>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub conversations: Arc<ConcreteConversationService>,
    pub sessions: Arc<ConcreteSessionManager>,
    pub router: Arc<ConcreteIntentRouter>,
    pub data_dir: PathBuf,
    pub ephemeral: bool,
}

impl AppState {
    /// Initialize the application state: load config, open the store, wire services.
    pub async fn init(ephemeral: bool) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;

        let store = if ephemeral {
            AppDocumentStore::Memory(MemoryDocumentStore::new())
        } else {
            tokio::fs::create_dir_all(&data_dir).await?;
            let pool = DatabasePool::new(&database_url(&data_dir)).await?;
            AppDocumentStore::Sqlite(SqliteDocumentStore::new(pool))
        };

        Self::build(store, &config, data_dir)
    }

    /// Wire services over an already-open store.
    pub fn build(
        store: AppDocumentStore,
        config: &TandemConfig,
        data_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let policy = resolve_store_policy(&config.store);
        let ephemeral = matches!(store, AppDocumentStore::Memory(_));

        let (collaborator, configured) =
            match HttpCompletionCollaborator::from_config(&config.collaborator)? {
                Some(http) => {
                    tracing::info!(endpoint = %http.endpoint(), "completion collaborator configured");
                    (BoxCompletionCollaborator::new(http), true)
                }
                None => {
                    tracing::debug!("no collaborator endpoint configured");
                    (BoxCompletionCollaborator::new(UnconfiguredCollaborator), false)
                }
            };
        let collaborator: SharedCollaborator = Arc::new(collaborator);

        let classifier = match config.routing.classifier {
            ClassifierKind::Completion if configured => {
                AppClassifier::Completion(CompletionClassifier::new(collaborator.clone()))
            }
            ClassifierKind::Completion => {
                tracing::warn!("completion classifier requested without an endpoint, using keywords");
                AppClassifier::Keyword(KeywordClassifier)
            }
            ClassifierKind::Keyword => AppClassifier::Keyword(KeywordClassifier),
        };

        let conversations =
            ConversationService::new(ConversationStore::new(store.clone(), policy.clone()));

        let sessions = GroupSessionManager::new(store, collaborator.clone(), policy)
            .with_sessions(&config.sessions)
            .with_collaborator_timeout(config.collaborator.timeout());

        let router = IntentRouter::new(
            classifier,
            AgentRegistry::with_completion_agents(collaborator),
        )
        .with_timeout(config.collaborator.timeout());

        Ok(Self {
            conversations: Arc::new(conversations),
            sessions: Arc::new(sessions),
            router: Arc::new(router),
            data_dir,
            ephemeral,
        })
    }
}
