use scanrelay_core::Config;
use scanrelay_services::{ScratchSpace, UploadRelay};

/// Shared, read-only application state. Built once at startup.
pub struct AppState {
    pub config: Config,
    pub scratch: ScratchSpace,
    pub relay: UploadRelay,
}

impl AppState {
    pub fn new(config: Config, scratch: ScratchSpace, relay: UploadRelay) -> Self {
        Self {
            config,
            scratch,
            relay,
        }
    }
}
