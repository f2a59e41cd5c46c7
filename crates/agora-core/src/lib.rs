pub mod aggregate;
pub mod clock;
pub mod content;
pub mod credentials;
pub mod error;
pub mod password;
pub mod sessions;
pub mod validation;
pub mod votes;

use std::sync::Arc;
use std::time::Duration;

use agora_db::Database;

pub use aggregate::{Aggregator, PostFilter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::ContentService;
pub use credentials::CredentialStore;
pub use error::{CoreError, CoreResult};
pub use sessions::{Session, SessionManager, SessionToken};
pub use votes::{ToggleMode, VoteLedger};

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@gmail.com";

#[derive(Debug, Clone)]
pub struct ForumConfig {
    pub session_ttl: Duration,
    pub toggle_mode: ToggleMode,
    /// Email of the one account allowed to ban users.
    pub admin_email: String,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            session_ttl: sessions::DEFAULT_SESSION_TTL,
            toggle_mode: ToggleMode::default(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
        }
    }
}

/// Every core service, wired to one shared store handle.
#[derive(Clone)]
pub struct Forum {
    pub credentials: CredentialStore,
    pub sessions: SessionManager,
    pub votes: VoteLedger,
    pub content: ContentService,
    pub aggregator: Aggregator,
}

impl Forum {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, config: ForumConfig) -> Self {
        let credentials = CredentialStore::new(db.clone(), config.admin_email);
        let sessions = SessionManager::new(db.clone(), clock, config.session_ttl);
        let votes = VoteLedger::new(db.clone(), config.toggle_mode);
        let content = ContentService::new(db.clone());
        let aggregator = Aggregator::new(db, votes.clone(), credentials.clone());

        Self {
            credentials,
            sessions,
            votes,
            content,
            aggregator,
        }
    }
}
