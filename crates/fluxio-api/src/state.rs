//! Application state
//!
//! One `AppState` carries the configuration plus the three capability
//! routers. Handlers receive it as `State<Arc<AppState>>`; nothing in it
//! is request-scoped.

use fluxio_core::Config;
use fluxio_db::StoreRouter;
use fluxio_queue::QueueRouter;
use fluxio_storage::StorageRouter;

pub struct AppState {
    pub config: Config,
    pub storage: StorageRouter,
    pub queues: QueueRouter,
    pub stores: StoreRouter,
}
