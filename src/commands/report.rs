use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReportArgs;
use crate::render::render_report_page;
use crate::report::build_report;
use crate::store::{DB_FILENAME, MetaStore, SqliteStore};

pub fn run(args: ReportArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(DB_FILENAME));

    let store = SqliteStore::open(&db_path)?;
    let attachments = store.load_attachments()?;
    let report = build_report(attachments);

    info!(
        total = report.stats.total,
        good = report.stats.good_count,
        bad = report.stats.bad_count,
        decorative = report.stats.decorative_count,
        "report built"
    );

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize report json")?;
        writeln!(output)?;
        output.flush()?;
        return Ok(());
    }

    let page = render_report_page(&report, &args.endpoint);

    match &args.out {
        Some(path) => {
            fs::write(path, &page)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote report page");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            output.write_all(page.as_bytes())?;
            output.write_all(b"\n")?;
            output.flush()?;
        }
    }

    Ok(())
}
