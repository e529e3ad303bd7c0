//! One-shot repair of historical image references.
//!
//! Rewrites malformed stored references to their canonical CDN form and
//! uploads genuinely local media files to the remote provider. Safe to
//! re-run: an already-repaired corpus only produces skips.

use std::sync::Arc;

use futo_common::{CloudMediaStorage, Config, MediaStorageService, NoopMediaStorage};
use futo_core::ImageRepairService;
use futo_db::repositories::PostRepository;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "futo=info".into()),
        )
        .init();

    let config = Config::load()?;

    let db = futo_db::init(&config).await?;
    futo_db::migrate(&db).await?;

    let storage: MediaStorageService = if config.storage.enabled {
        Arc::new(CloudMediaStorage::new(&config.storage)?)
    } else {
        // Without a provider, local files cannot migrate; decode-only
        // fixes still apply and failed uploads land in the error count.
        Arc::new(NoopMediaStorage)
    };

    let post_repo = PostRepository::new(Arc::new(db));
    let service = ImageRepairService::new(post_repo, storage, &config.storage);

    let summary = service.run().await?;
    info!(
        "Done: migrated={}, fixed={}, skipped={}, errors={}",
        summary.migrated, summary.fixed, summary.skipped, summary.errors
    );

    Ok(())
}
