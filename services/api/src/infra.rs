use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use training_nominations::config::AppConfig;
use training_nominations::workflows::nomination::{
    MemoryAuditLog, MemoryStore, NominationService,
};

pub(crate) type DeskService = NominationService<MemoryStore, MemoryAuditLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    /// Seals are being computed with the built-in development secret.
    pub(crate) development_seal: bool,
}

/// Service over the in-process store. Data lives as long as the process.
pub(crate) fn in_memory_service(config: &AppConfig) -> (Arc<DeskService>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let service = NominationService::from_config(store.clone(), audit, config);
    (Arc::new(service), store)
}
