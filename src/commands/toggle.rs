use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::ToggleArgs;
use crate::store::{DB_FILENAME, SqliteStore};
use crate::wire::{dispatch_form_body, handle_toggle};

/// Plays the host dispatcher for the toggle endpoint. Prints the JSON
/// response body to stdout exactly as the endpoint would return it.
pub fn run(args: ToggleArgs) -> Result<()> {
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(DB_FILENAME));

    let mut store = SqliteStore::open(&db_path)?;

    let response = match &args.body {
        Some(body) => dispatch_form_body(&mut store, body)?,
        None => handle_toggle(&mut store, args.id.as_deref(), args.value.as_deref())?,
    };

    if response.is_success() {
        info!(
            id = %response.id.as_deref().unwrap_or_default(),
            updated = %response.updated.as_deref().unwrap_or_default(),
            "decorative flag updated"
        );
    } else {
        warn!("toggle request failed validation");
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer(&mut output, &response).context("failed to serialize toggle response")?;
    writeln!(output)?;
    output.flush()?;

    Ok(())
}
