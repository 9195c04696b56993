use anyhow::Result;
use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{tempdir, NamedTempFile};
use uuid::Uuid;

use broker_importer::domain::{BrokerRecord, FeatureRecord, RegulationRecord};
use broker_importer::error::ImportError;
use broker_importer::pipeline::{ImportOptions, ImportPipeline, TargetStatus};
use broker_importer::storage::{BrokerStore, InMemoryStore};

const HEADER: &str = "Broker Name,Rating,Main Pros,Main Cons,Key Trading Features,Country / Regulation info,Minimum Deposit,Review Page Link";

fn write_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

fn options() -> ImportOptions {
    ImportOptions {
        verify: false,
        watch_list: vec![],
        output_dir: None,
    }
}

#[tokio::test]
async fn test_same_broker_twice_keeps_later_rating() -> Result<()> {
    let csv = write_csv(&[
        "XTB,4.1,low fees,,,\"Regulated by FCA (UK), ASIC (Australia)\",$0,",
        "XTB,4.7,fast execution; low fees,limited products,,Regulated by FCA (UK),$0,",
    ]);

    let store = Arc::new(InMemoryStore::new());
    let summary = ImportPipeline::new(store.clone(), options())
        .run(&[csv.path().to_path_buf()])
        .await?;

    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.unique_brokers, 1);
    assert_eq!(summary.duplicates_replaced, 1);

    let brokers = store.brokers()?;
    assert_eq!(brokers.len(), 1);
    assert_eq!(brokers[0].slug, "xtb");
    assert_eq!(brokers[0].rating, Some(4.7));

    // Only the later row's dependents were written
    let id = brokers[0].id.unwrap();
    let features: Vec<String> = store
        .features_for(id)?
        .into_iter()
        .map(|f| format!("{}={}", f.feature_key, f.feature_value))
        .collect();
    assert_eq!(
        features,
        vec![
            "pro=fast execution",
            "pro=low fees",
            "con=limited products",
            "minimum_deposit=$0"
        ]
    );
    let regulations = store.regulations_for(id)?;
    assert_eq!(regulations.len(), 1);
    assert_eq!(regulations[0].country_code, "GB");
    Ok(())
}

#[tokio::test]
async fn test_later_file_wins_across_files() -> Result<()> {
    let first = write_csv(&["eToro,4.0,,,,,,", "IG,4.4,,,,,,"]);
    let second = write_csv(&["E-Toro,3.5,,,,,,"]);

    let store = Arc::new(InMemoryStore::new());
    let summary = ImportPipeline::new(store.clone(), options())
        .run(&[first.path().to_path_buf(), second.path().to_path_buf()])
        .await?;

    assert_eq!(summary.files_read, 2);
    // "eToro" and "E-Toro" slug differently; both survive
    assert_eq!(summary.unique_brokers, 3);
    assert_eq!(store.brokers()?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_rows_without_name_and_unparsable_rating() -> Result<()> {
    let csv = write_csv(&[",4.5,orphan pro,,,,,", "Plus500,N/A,,,,,,"]);

    let store = Arc::new(InMemoryStore::new());
    let summary = ImportPipeline::new(store.clone(), options())
        .run(&[csv.path().to_path_buf()])
        .await?;

    assert_eq!(summary.rows_skipped, 1);
    assert_eq!(summary.entries_with_warnings, 1);
    assert_eq!(summary.upsert.failure_count(), 0);

    let plus500 = store.broker_by_slug("plus500")?.unwrap();
    assert_eq!(plus500.rating, None);
    Ok(())
}

#[tokio::test]
async fn test_rerun_is_idempotent() -> Result<()> {
    let csv = write_csv(&[
        "Saxo,4.3,research; many markets,high minimum,,FCA (UK); FINMA (Switzerland),$2000,",
    ]);
    let store = Arc::new(InMemoryStore::new());
    let pipeline = ImportPipeline::new(store.clone(), options());

    pipeline.run(&[csv.path().to_path_buf()]).await?;
    let first_id = store.broker_by_slug("saxo")?.unwrap().id;
    pipeline.run(&[csv.path().to_path_buf()]).await?;

    let saxo = store.broker_by_slug("saxo")?.unwrap();
    assert_eq!(saxo.id, first_id);
    assert_eq!(store.features_for(saxo.id.unwrap())?.len(), 4);
    assert_eq!(store.regulations_for(saxo.id.unwrap())?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_malformed_record_is_skipped_and_run_continues() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(file, "{HEADER}")?;
    writeln!(file, "XTB,4.6,low fees,,,,,")?;
    file.write_all(b"Bad\xff\xfeBroker,4.0,,,,,,\n")?;
    writeln!(file, "IG,4.4,wide range,,,,,")?;

    let store = Arc::new(InMemoryStore::new());
    let summary = ImportPipeline::new(store.clone(), options())
        .run(&[file.path().to_path_buf()])
        .await?;

    assert_eq!(summary.malformed_rows, 1);
    assert_eq!(summary.rows_read, 2);
    assert_eq!(summary.unique_brokers, 2);
    assert!(store.broker_by_slug("xtb")?.is_some());
    assert!(store.broker_by_slug("ig")?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_missing_file_fails_the_run() {
    let store = Arc::new(InMemoryStore::new());
    let result = ImportPipeline::new(store, options())
        .run(&[PathBuf::from("/no/such/brokers.csv")])
        .await;
    assert!(matches!(result, Err(ImportError::Io(_))));
}

#[tokio::test]
async fn test_snapshot_and_verification() -> Result<()> {
    let csv = write_csv(&["XTB,4.6,low fees,,,Regulated by FCA (UK),,https://example.com/xtb"]);
    let out = tempdir()?;

    let store = Arc::new(InMemoryStore::new());
    let summary = ImportPipeline::new(
        store,
        ImportOptions {
            verify: true,
            watch_list: vec!["XTB".to_string(), "Pepperstone".to_string()],
            output_dir: Some(out.path().to_path_buf()),
        },
    )
    .run(&[csv.path().to_path_buf()])
    .await?;

    let snapshot = std::fs::read_to_string(summary.output_file.as_ref().unwrap())?;
    let json: serde_json::Value = serde_json::from_str(&snapshot)?;
    assert_eq!(json[0]["broker"]["slug"], "xtb");
    assert_eq!(
        json[0]["broker"]["features"]["review_page_link"],
        "https://example.com/xtb"
    );

    let report = summary.verification.unwrap();
    assert_eq!(report.found(), vec!["XTB"]);
    assert_eq!(report.missing(), vec!["Pepperstone"]);
    match &report.targets[0].status {
        TargetStatus::Found(brokers) => {
            assert_eq!(brokers[0].features, Some(1));
            assert_eq!(brokers[0].regulations, Some(1));
        }
        other => panic!("expected Found, got {other:?}"),
    }
    Ok(())
}

/// Wraps the in-memory store and fails selected calls.
struct FlakyStore {
    inner: InMemoryStore,
    fail_broker: &'static str,
    fail_features_for: &'static str,
}

impl FlakyStore {
    fn slug_of(&self, broker_id: Option<Uuid>) -> Option<String> {
        self.inner
            .brokers()
            .ok()?
            .into_iter()
            .find(|b| b.id == broker_id)
            .map(|b| b.slug)
    }
}

#[async_trait]
impl BrokerStore for FlakyStore {
    async fn upsert_broker(&self, broker: &mut BrokerRecord) -> broker_importer::error::Result<()> {
        if broker.slug == self.fail_broker {
            return Err(ImportError::Api {
                status: 409,
                message: "conflict".to_string(),
            });
        }
        self.inner.upsert_broker(broker).await
    }

    async fn upsert_features(
        &self,
        features: &[FeatureRecord],
    ) -> broker_importer::error::Result<usize> {
        let slug = features.first().and_then(|f| self.slug_of(f.broker_id));
        if slug.as_deref() == Some(self.fail_features_for) {
            return Err(ImportError::storage("connection reset"));
        }
        self.inner.upsert_features(features).await
    }

    async fn upsert_regulations(
        &self,
        regulations: &[RegulationRecord],
    ) -> broker_importer::error::Result<usize> {
        self.inner.upsert_regulations(regulations).await
    }

    async fn find_brokers_by_name(
        &self,
        fragment: &str,
    ) -> broker_importer::error::Result<Vec<BrokerRecord>> {
        self.inner.find_brokers_by_name(fragment).await
    }

    async fn count_features(&self, broker_id: Uuid) -> broker_importer::error::Result<usize> {
        self.inner.count_features(broker_id).await
    }

    async fn count_regulations(&self, broker_id: Uuid) -> broker_importer::error::Result<usize> {
        self.inner.count_regulations(broker_id).await
    }
}

#[tokio::test]
async fn test_failures_are_isolated_per_entity() -> Result<()> {
    let csv = write_csv(&[
        "XTB,4.6,low fees,,,Regulated by FCA (UK),,",
        "IG,4.4,wide range,,,Regulated by FCA (UK),,",
        "eToro,4.0,copy trading,,,Regulated by CySEC (Cyprus),,",
    ]);

    let inner = InMemoryStore::new();
    let store = Arc::new(FlakyStore {
        inner: inner.clone(),
        fail_broker: "ig",
        fail_features_for: "xtb",
    });

    let summary = ImportPipeline::new(store, options())
        .run(&[csv.path().to_path_buf()])
        .await?;

    assert_eq!(summary.upsert.brokers_succeeded, 2);
    assert_eq!(summary.upsert.brokers_failed, 1);
    assert_eq!(summary.upsert.feature_batches_failed, 1);
    assert_eq!(summary.upsert.failure_count(), 2);
    assert_eq!(summary.upsert.errors.len(), 2);

    // XTB stays even though its features failed; its regulation still went in
    let xtb = inner.broker_by_slug("xtb")?.unwrap();
    assert!(inner.features_for(xtb.id.unwrap())?.is_empty());
    assert_eq!(inner.regulations_for(xtb.id.unwrap())?.len(), 1);

    // IG never made it, and the run carried on to eToro
    assert!(inner.broker_by_slug("ig")?.is_none());
    let etoro = inner.broker_by_slug("etoro")?.unwrap();
    assert_eq!(inner.features_for(etoro.id.unwrap())?.len(), 1);
    Ok(())
}
