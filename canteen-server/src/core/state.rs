//! Shared server state
//!
//! One [`ServerState`] is built at startup and cloned into every
//! request handler. All components are cheap handles; the clones share
//! the same database, ledger and JWT keys.

use std::sync::Arc;

use crate::auth::JwtService;
use crate::canteen::{CanteenStore, MealCatalog, ReservationLedger, ReservationLifecycle};
use crate::core::Config;

#[derive(Clone)]
pub struct ServerState {
    /// Immutable configuration
    pub config: Config,
    /// redb-backed persistence
    pub store: CanteenStore,
    /// In-memory seat admission
    pub ledger: Arc<ReservationLedger>,
    /// Meal administration, synced to the ledger
    pub catalog: Arc<MealCatalog>,
    /// Reservation state machine
    pub lifecycle: Arc<ReservationLifecycle>,
    /// Token generation and validation
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Build every component and replay persisted state into the ledger.
    ///
    /// Order matters: meals must register their capacity before
    /// reservations replay their holds, and no traffic is admitted
    /// until both passes finish.
    ///
    /// # Panics
    ///
    /// Panics when the work directory or database cannot be opened.
    pub fn initialize(config: &Config) -> Self {
        std::fs::create_dir_all(&config.work_dir).expect("Failed to create work directory");

        let store =
            CanteenStore::open(config.database_path()).expect("Failed to open canteen database");

        let ledger = Arc::new(ReservationLedger::new());
        let catalog = Arc::new(MealCatalog::new(
            store.clone(),
            ledger.clone(),
            config.timezone,
        ));
        let lifecycle = Arc::new(ReservationLifecycle::new(store.clone(), ledger.clone()));

        let meals = catalog.restore().expect("Failed to restore meal catalog");
        let holds = lifecycle
            .restore()
            .expect("Failed to restore reservations");
        tracing::info!(meals, holds, "restored state from storage");

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Self {
            config: config.clone(),
            store,
            ledger,
            catalog,
            lifecycle,
            jwt_service,
        }
    }

    /// JWT service handle, used by the auth middleware and extractor
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
