#![cfg(feature = "db")]

use anyhow::Result;
use doc_importer::db::{DatabaseTarget, LibsqlWriter, TableRef, DEFAULT_SCHEMA_TEMPLATE};
use doc_importer::source::{BatchShape, FileSource, SourceReader};
use doc_importer::{normalize, BatchDriver, DocumentNormalizer};
use serde_json::json;
use tempfile::tempdir;

async fn open_writer(dir: &std::path::Path) -> Result<LibsqlWriter> {
    let path = dir.join("import.db").to_string_lossy().to_string();
    let writer = LibsqlWriter::open(
        &DatabaseTarget::Local(path),
        TableRef::new("wallabag", "entries")?,
    )
    .await?;
    writer.bootstrap(DEFAULT_SCHEMA_TEMPLATE).await?;
    Ok(writer)
}

#[tokio::test]
async fn test_bootstrap_is_repeatable() -> Result<()> {
    let temp_dir = tempdir()?;
    let writer = open_writer(temp_dir.path()).await?;
    writer.bootstrap(DEFAULT_SCHEMA_TEMPLATE).await?;

    assert_eq!(writer.table().qualified(), "wallabag_entries");
    assert_eq!(writer.count().await?, 0);
    assert!(writer.server_version().await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_document_with_quotes_is_stored_verbatim() -> Result<()> {
    let temp_dir = tempdir()?;
    let writer = open_writer(temp_dir.path()).await?;

    let doc = normalize(
        json!({ "id": 7, "title": "It's \"quoted\"; DROP TABLE x; --" })
            .as_object()
            .cloned()
            .unwrap(),
    )
    .into_document()
    .unwrap();

    use doc_importer::storage::RecordWriter;
    writer.write(&doc).await?;

    let stored = writer.get_document("7").await?.expect("stored document");
    assert_eq!(stored, doc);
    assert_eq!(writer.count().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_fixture_batch_lands_in_table() -> Result<()> {
    let temp_dir = tempdir()?;
    let writer = open_writer(temp_dir.path()).await?;

    let source = FileSource::new(
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/resources/solr_export.json"),
        BatchShape::default(),
    );
    let docs = source.read_batch().await?;
    let normalizer = DocumentNormalizer::default();
    let report = BatchDriver::new(&normalizer, &writer).run(docs).await?;

    assert_eq!(report.written_documents, 8);
    assert_eq!(writer.count().await?, 8);

    let cafe = writer.get_document("103").await?.expect("document 103");
    assert_eq!(cafe.language, "fr");
    assert!(writer.get_document("102").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_custom_template_from_file() -> Result<()> {
    let temp_dir = tempdir()?;
    let template = temp_dir.path().join("create_table.sql");
    std::fs::write(
        &template,
        "CREATE TABLE IF NOT EXISTS keyspace_name_table_name (\n\
         id TEXT PRIMARY KEY, title TEXT, doc TEXT NOT NULL, loaded_at TEXT, extra TEXT);",
    )?;

    let path = temp_dir.path().join("custom.db").to_string_lossy().to_string();
    let writer = LibsqlWriter::open(&DatabaseTarget::Local(path), TableRef::new("ks", "docs")?).await?;
    writer.bootstrap_from_file(&template).await?;
    assert_eq!(writer.count().await?, 0);
    Ok(())
}
