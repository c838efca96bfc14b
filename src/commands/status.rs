use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::report::build_report;
use crate::store::{DB_FILENAME, MetaStore, SqliteStore};

pub fn run(args: StatusArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(DB_FILENAME));

    info!(cache_root = %args.cache_root.display(), "status requested");

    if !db_path.exists() {
        warn!(path = %db_path.display(), "database file missing");
        return Ok(());
    }

    let store = SqliteStore::open(&db_path)?;

    info!(
        path = %db_path.display(),
        schema_version = %store.schema_version()?.unwrap_or_default(),
        attachments = store.count_attachments()?,
        decorative_flags = store.count_decorative_flags()?,
        "database status"
    );

    let report = build_report(store.load_attachments()?);
    let stats = &report.stats;

    info!(
        total = stats.total,
        good = stats.good_count,
        bad = stats.bad_count,
        decorative = stats.decorative_count,
        good_pct = stats.good_pct,
        bad_pct = stats.bad_pct,
        decorative_pct = stats.decorative_pct,
        "coverage summary"
    );

    Ok(())
}
