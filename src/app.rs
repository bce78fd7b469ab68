//! Application context: the explicitly-constructed, `Arc`-shared registry
//! of process-wide resources (§9 "Global mutable state").

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::Config;
use crate::error::Result;
use crate::sources::rest::RestPool;
use crate::sources::{discover_file_sources, FileSource};
use crate::sources::relational::RelationalStore;

/// Everything a transport or tool handler needs, constructed once at
/// startup and shared via `Arc` — never a lazily-initialised global.
pub struct AppContext {
    pub config: Config,
    pub store: RelationalStore,
    pub rest_pool: RestPool,
    pub audit: AuditLog,
    pub file_sources: Vec<FileSource>,
}

pub type SharedApp = Arc<AppContext>;

impl AppContext {
    pub fn build(config: Config) -> Result<SharedApp> {
        let store = if config.db_path.as_os_str() == ":memory:" {
            RelationalStore::open_in_memory()?
        } else {
            RelationalStore::open(&config.db_path)?
        };
        let file_sources = discover_file_sources(&config.file_sources_dir);
        let audit = AuditLog::new(config.audit_log_path.clone());
        let rest_pool = RestPool::new();

        Ok(Arc::new(Self { config, store, rest_pool, audit, file_sources }))
    }
}
