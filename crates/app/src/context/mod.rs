//! Application context - dependency injection container

use harvester_core::{CancellationFlag, HarvestService};
use harvester_domain::{HarvesterConfig, Result};
use harvester_infra::config::loader;
use harvester_infra::HarvestStores;
use tracing::info;

use crate::cli::HarvestRequest;

/// Everything one harvest run needs, wired together
pub struct AppContext {
    pub config: HarvesterConfig,
    pub stores: HarvestStores,
    pub request: HarvestRequest,
}

impl AppContext {
    /// Load configuration and open the stores named by `request`
    ///
    /// # Errors
    /// Returns `Config` for an unreadable configuration and
    /// `StoreUnavailable` when a store cannot be opened.
    pub fn new(request: HarvestRequest) -> Result<Self> {
        let config = loader::load(request.config.as_deref())?;
        info!(data_dir = %config.data_dir.display(), "Configuration loaded");

        let dry_run = request.options.dry_run;
        let stores = match &request.source {
            Some(source) => HarvestStores::open(source, &request.destination, &config, dry_run)?,
            None => HarvestStores::open_destination(&request.destination, &config, dry_run)?,
        };

        Ok(Self { config, stores, request })
    }

    /// Harvest service over the opened stores
    pub fn service(&self, cancel: CancellationFlag) -> HarvestService {
        HarvestService::new(
            self.stores.source_key(),
            self.stores.ports(),
            self.request.options.clone(),
            cancel,
        )
    }
}
