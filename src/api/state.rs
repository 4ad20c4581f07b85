use std::sync::Arc;

use crate::appliance::ApplianceHandle;
use crate::backup::BackupRegistry;
use crate::events::EventBus;
use crate::hypervisor::HypervisorClient;
use crate::lifecycle::LifecycleManager;
use crate::orchestrator::Orchestrator;
use crate::store::Store;

use super::jobs::JobQueue;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<Store>,
    pub hypervisor: Arc<HypervisorClient>,
    pub orchestrator: Arc<Orchestrator>,
    pub lifecycle: Arc<LifecycleManager>,
    pub appliance: Arc<ApplianceHandle>,
    pub backups: Arc<BackupRegistry>,
    pub events: Arc<EventBus>,
    pub jobs: JobQueue,
}
