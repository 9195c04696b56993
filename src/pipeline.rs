pub mod upsert;
pub mod verify;

use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::dedupe::Deduplicator;
use crate::domain::NormalizedBroker;
use crate::error::Result;
use crate::ingestion::CsvSource;
use crate::normalize::normalize_row;
use crate::storage::BrokerStore;

pub use upsert::{UpsertReport, Upserter};
pub use verify::{TargetStatus, VerificationReport, VerificationReporter};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Run the verification step after upserting
    pub verify: bool,
    pub watch_list: Vec<String>,
    /// Where to write a JSON snapshot of the normalized brokers
    pub output_dir: Option<PathBuf>,
}

/// Result of a complete import run
#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub files_read: usize,
    pub rows_read: usize,
    /// Rows without a usable broker name
    pub rows_skipped: usize,
    pub malformed_rows: usize,
    pub unique_brokers: usize,
    pub duplicates_replaced: usize,
    pub entries_with_warnings: usize,
    pub upsert: UpsertReport,
    pub verification: Option<VerificationReport>,
    pub output_file: Option<String>,
}

impl ImportSummary {
    pub fn print(&self) {
        println!("\n📊 Import results:");
        println!("   Files read: {}", self.files_read);
        println!("   Rows read: {}", self.rows_read);
        println!("   Rows skipped (no broker name): {}", self.rows_skipped);
        println!("   Malformed rows: {}", self.malformed_rows);
        println!(
            "   Unique brokers: {} ({} duplicates replaced)",
            self.unique_brokers, self.duplicates_replaced
        );
        println!("   Entries with parse warnings: {}", self.entries_with_warnings);
        println!("   Brokers succeeded: {}", self.upsert.brokers_succeeded);
        println!("   Brokers failed: {}", self.upsert.brokers_failed);
        println!(
            "   Features written: {} ({} batches failed)",
            self.upsert.features_written, self.upsert.feature_batches_failed
        );
        println!(
            "   Regulation rows written: {} ({} batches failed)",
            self.upsert.regulations_written, self.upsert.regulation_batches_failed
        );
        if let Some(file) = &self.output_file {
            println!("   Snapshot: {}", file);
        }

        if !self.upsert.errors.is_empty() {
            println!("\n⚠️  Errors encountered:");
            for error in &self.upsert.errors {
                println!("   - {}", error);
            }
        }
    }
}

/// The batch import: read every CSV, normalize, dedupe, upsert, then verify.
///
/// Strictly sequential. Row and entity failures are logged and counted;
/// only unreadable input files and snapshot write failures end the run.
pub struct ImportPipeline {
    store: Arc<dyn BrokerStore>,
    options: ImportOptions,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn BrokerStore>, options: ImportOptions) -> Self {
        Self { store, options }
    }

    pub async fn run(&self, paths: &[PathBuf]) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        info!("📥 Reading {} CSV file(s)", paths.len());
        println!("📥 Reading {} CSV file(s)...", paths.len());
        let mut entries = self.read_entries(paths, &mut summary)?;
        println!(
            "✅ {} unique brokers from {} rows",
            summary.unique_brokers, summary.rows_read
        );

        if let Some(dir) = &self.options.output_dir {
            let file = persist_to_json(&entries, dir)?;
            info!("💾 Saved normalized brokers to {}", file);
            summary.output_file = Some(file);
        }

        println!("\n💾 Upserting brokers...");
        let upserter = Upserter::new(self.store.clone());
        summary.upsert = upserter.upsert_all(&mut entries).await;
        info!(
            "Upsert finished: {} succeeded, {} failures",
            summary.upsert.brokers_succeeded,
            summary.upsert.failure_count()
        );

        if self.options.verify {
            let reporter =
                VerificationReporter::new(self.store.clone(), self.options.watch_list.clone());
            summary.verification = Some(reporter.run().await);
        }

        Ok(summary)
    }

    /// Reads and normalizes every file, then collapses entries by slug.
    pub fn read_entries(
        &self,
        paths: &[PathBuf],
        summary: &mut ImportSummary,
    ) -> Result<Vec<NormalizedBroker>> {
        let mut dedup = Deduplicator::new();

        for path in paths {
            let entries = read_file(path, summary)?;
            summary.files_read += 1;
            dedup.extend(entries);
        }

        summary.unique_brokers = dedup.len();
        summary.duplicates_replaced = dedup.replaced();
        Ok(dedup.into_entries())
    }
}

#[instrument(skip(path, summary), fields(path = %path.display()))]
fn read_file(path: &Path, summary: &mut ImportSummary) -> Result<Vec<NormalizedBroker>> {
    let source = CsvSource::new(path);
    let mut entries = Vec::new();

    let rows = source.rows()?;
    debug!(
        "Opened {} with {} columns: {:?}",
        path.display(),
        rows.headers().len(),
        rows.headers()
    );

    for row in rows {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping malformed record in {}: {}", path.display(), e);
                summary.malformed_rows += 1;
                continue;
            }
        };
        summary.rows_read += 1;

        match normalize_row(&row) {
            Some(mut entry) => {
                if !entry.warnings.is_empty() {
                    summary.entries_with_warnings += 1;
                }
                entry.source = Some(match row.line {
                    Some(line) => format!("{}:{}", path.display(), line),
                    None => path.display().to_string(),
                });
                entries.push(entry);
            }
            None => {
                debug!("Row {:?} has no broker name, skipping", row.line);
                summary.rows_skipped += 1;
            }
        }
    }

    info!("Normalized {} brokers from {}", entries.len(), path.display());
    Ok(entries)
}

/// Writes the normalized brokers as pretty JSON and returns the file path.
fn persist_to_json(entries: &[NormalizedBroker], output_dir: &Path) -> Result<String> {
    fs::create_dir_all(output_dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filepath = output_dir.join(format!("brokers_{timestamp}.json"));

    let json_content = serde_json::to_string_pretty(entries)?;
    fs::write(&filepath, json_content)?;

    Ok(filepath.to_string_lossy().to_string())
}
