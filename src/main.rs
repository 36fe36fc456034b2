//! Contents store - Entry Point
//!
//! Serves a private and a shared notebook root through an admin shell.

use log::{error, info};

use contents_store::utils::logging::setup_logging;
use contents_store::{ContentService, ContentStore, LocalFs, StoreConfig, shell};

#[tokio::main]
async fn main() {
    setup_logging();

    let config = match StoreConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let backend = LocalFs::new(config.backend.base_dir_path());
    info!("Backend directory: {}", backend.base().display());
    let store = ContentStore::from_config(backend, &config);

    if config.roots.create_root_dir_on_startup {
        if let Err(e) = store.ensure_root_directories() {
            error!("Failed to create root directories: {}", e);
            std::process::exit(1);
        }
    }

    info!("{}", store.info_string());

    if let Err(e) = shell::run(ContentService::new(store)).await {
        error!("Shell terminated: {}", e);
        std::process::exit(1);
    }
}
