use std::fs;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::info;

use crate::cli::IngestArgs;
use crate::model::{AttachmentManifest, IngestCounts, IngestPaths, IngestRunManifest};
use crate::store::{DB_FILENAME, DB_SCHEMA_VERSION, SqliteStore};
use crate::util::{
    ensure_directory, now_utc_string, sha256_bytes, utc_compact_string, write_json_pretty,
};

const MANIFEST_VERSION: u32 = 1;

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");

    let attachments_path = args
        .attachments_path
        .clone()
        .unwrap_or_else(|| cache_root.join("attachments.json"));
    let ingest_manifest_path = args.ingest_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("ingest_run_{}.json", utc_compact_string(started_ts)))
    });
    let db_path = args
        .db_path
        .clone()
        .unwrap_or_else(|| cache_root.join(DB_FILENAME));

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting ingest");

    let raw = fs::read(&attachments_path)
        .with_context(|| format!("failed to read {}", attachments_path.display()))?;
    let source_sha256 = sha256_bytes(&raw);
    let manifest: AttachmentManifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", attachments_path.display()))?;

    if manifest.manifest_version != MANIFEST_VERSION {
        bail!(
            "unsupported attachment manifest version: {}",
            manifest.manifest_version
        );
    }

    info!(
        attachment_count = manifest.attachments.len(),
        source = %attachments_path.display(),
        "loaded attachment manifest"
    );

    if args.dry_run {
        info!(
            attachment_count = manifest.attachments.len(),
            "ingest dry-run complete"
        );
        return Ok(());
    }

    ensure_directory(&manifest_dir)?;

    let mut store = SqliteStore::open(&db_path)?;
    let (attachments_upserted, flags_upserted) = store.upsert_attachments(&manifest.attachments)?;

    let attachments_total = store.count_attachments()?;
    let flags_total = store.count_decorative_flags()?;
    let updated_at = now_utc_string();

    let run_manifest = IngestRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id: run_id.clone(),
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at,
        command: render_ingest_command(&args),
        source_sha256,
        paths: IngestPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            attachments_path: attachments_path.display().to_string(),
            db_path: db_path.display().to_string(),
        },
        counts: IngestCounts {
            manifest_attachment_count: manifest.attachments.len(),
            attachments_upserted,
            flags_upserted,
            attachments_total,
            flags_total,
        },
    };

    write_json_pretty(&ingest_manifest_path, &run_manifest)?;
    info!(path = %ingest_manifest_path.display(), "wrote ingest-run manifest");
    info!(
        attachments_upserted,
        flags_upserted, attachments_total, flags_total, "ingest completed"
    );

    Ok(())
}

fn render_ingest_command(args: &IngestArgs) -> String {
    let mut command = format!(
        "altaudit ingest --cache-root {}",
        args.cache_root.display()
    );
    if let Some(path) = &args.attachments_path {
        command.push_str(&format!(" --attachments-path {}", path.display()));
    }
    if let Some(path) = &args.db_path {
        command.push_str(&format!(" --db-path {}", path.display()));
    }
    if args.dry_run {
        command.push_str(" --dry-run");
    }
    command
}

#[cfg(test)]
mod tests {
    use crate::model::AttachmentManifest;

    #[test]
    fn manifest_entries_require_an_id() {
        let raw = r#"{
            "manifest_version": 1,
            "attachments": [{ "alt_text": "no id here" }]
        }"#;

        assert!(serde_json::from_str::<AttachmentManifest>(raw).is_err());
    }

    #[test]
    fn manifest_defaults_alt_text_and_flag() {
        let raw = r#"{
            "manifest_version": 1,
            "attachments": [
                { "id": 1 },
                { "id": 2, "alt_text": "a pond", "decorative": "false" }
            ]
        }"#;

        let manifest: AttachmentManifest = serde_json::from_str(raw).unwrap();
        assert_eq!(manifest.attachments.len(), 2);
        assert_eq!(manifest.attachments[0].alt_text, "");
        assert!(manifest.attachments[0].decorative.is_none());
        assert_eq!(manifest.attachments[1].decorative.as_deref(), Some("false"));
    }
}
