use crate::constants::{KEYSPACE_PLACEHOLDER, TABLE_PLACEHOLDER};
use crate::error::{ImporterError, Result};
use crate::storage::RecordWriter;
use crate::types::CanonicalDocument;
use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Built-in DDL; `keyspace_name` and `table_name` are substituted before it runs
pub const DEFAULT_SCHEMA_TEMPLATE: &str = include_str!("../migrations/001_create_documents.sql");

fn identifier_pattern() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier pattern"))
}

fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDERS: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDERS.get_or_init(|| {
        Regex::new(&format!("{KEYSPACE_PLACEHOLDER}|{TABLE_PLACEHOLDER}"))
            .expect("valid placeholder pattern")
    })
}

fn db_err(context: &str) -> impl Fn(libsql::Error) -> ImporterError + '_ {
    move |e| ImporterError::Database {
        message: format!("{context}: {e}"),
    }
}

/// Destination table, addressed as keyspace + table.
///
/// libSQL has no keyspaces, so the physical table is `<keyspace>_<table>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    keyspace: String,
    table: String,
}

impl TableRef {
    /// Both names end up inside SQL text, so they must be plain identifiers.
    pub fn new(keyspace: &str, table: &str) -> Result<Self> {
        let ident = identifier_pattern();
        for (what, name) in [("keyspace", keyspace), ("table", table)] {
            if !ident.is_match(name) {
                return Err(ImporterError::Config(format!(
                    "invalid {what} name '{name}': use letters, digits and underscores"
                )));
            }
        }
        Ok(Self {
            keyspace: keyspace.to_string(),
            table: table.to_string(),
        })
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn qualified(&self) -> String {
        format!("{}_{}", self.keyspace, self.table)
    }

    /// Substitute the placeholders of a DDL template in a single pass.
    pub fn render(&self, template: &str) -> String {
        placeholder_pattern()
            .replace_all(template, |caps: &regex::Captures| {
                if &caps[0] == KEYSPACE_PLACEHOLDER {
                    self.keyspace.clone()
                } else {
                    self.table.clone()
                }
            })
            .into_owned()
    }
}

/// Where to connect
#[derive(Debug, Clone)]
pub enum DatabaseTarget {
    Local(String),
    Remote { url: String, auth_token: String },
}

/// Writes canonical documents into a libSQL table over one connection held
/// for the whole batch.
pub struct LibsqlWriter {
    _db: Database,
    conn: Connection,
    table: TableRef,
    insert_sql: String,
}

impl LibsqlWriter {
    pub async fn open(target: &DatabaseTarget, table: TableRef) -> Result<Self> {
        let db = match target {
            DatabaseTarget::Local(path) => {
                info!("Opening local database at {}", path);
                Builder::new_local(path)
                    .build()
                    .await
                    .map_err(db_err("Failed to open database"))?
            }
            DatabaseTarget::Remote { url, auth_token } => {
                info!("Connecting to Turso database at {}", url);
                Builder::new_remote(url.clone(), auth_token.clone())
                    .build()
                    .await
                    .map_err(db_err("Failed to connect to database"))?
            }
        };
        let conn = db
            .connect()
            .map_err(db_err("Failed to get database connection"))?;

        // Documents are bound as one JSON parameter; columns are extracted from it.
        let insert_sql = format!(
            "INSERT OR REPLACE INTO {} (id, title, doc, loaded_at) \
             VALUES (json_extract(?1, '$.id'), json_extract(?1, '$.title'), ?1, datetime('now'))",
            table.qualified()
        );

        Ok(Self {
            _db: db,
            conn,
            table,
            insert_sql,
        })
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Engine version reported by the server, logged on connect.
    pub async fn server_version(&self) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT sqlite_version()", ())
            .await
            .map_err(db_err("Failed to query server version"))?;
        match rows.next().await.map_err(db_err("Failed to read row"))? {
            Some(row) => Ok(Some(
                row.get::<String>(0).map_err(db_err("Failed to get version"))?,
            )),
            None => Ok(None),
        }
    }

    /// Create the destination table if it does not exist.
    pub async fn bootstrap(&self, template: &str) -> Result<()> {
        let ddl = self.table.render(template);
        debug!("Running schema bootstrap:\n{}", ddl);
        self.conn
            .execute_batch(&ddl)
            .await
            .map_err(db_err("Failed to bootstrap schema"))?;
        info!("Table {} is ready", self.table.qualified());
        Ok(())
    }

    /// Load a DDL template from disk and bootstrap with it.
    pub async fn bootstrap_from_file(&self, path: &Path) -> Result<()> {
        let template = tokio::fs::read_to_string(path).await.map_err(|e| {
            ImporterError::Config(format!(
                "Failed to read schema template '{}': {}",
                path.display(),
                e
            ))
        })?;
        self.bootstrap(&template).await
    }

    pub async fn count(&self) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table.qualified());
        let mut rows = self
            .conn
            .query(&sql, ())
            .await
            .map_err(db_err("Failed to count documents"))?;
        match rows.next().await.map_err(db_err("Failed to read row"))? {
            Some(row) => {
                let n: i64 = row.get(0).map_err(db_err("Failed to get count"))?;
                Ok(u64::try_from(n).unwrap_or_default())
            }
            None => Ok(0),
        }
    }

    /// Stored JSON for one document id
    pub async fn get_document(&self, id: &str) -> Result<Option<CanonicalDocument>> {
        let sql = format!("SELECT doc FROM {} WHERE id = ?1", self.table.qualified());
        let mut rows = self
            .conn
            .query(&sql, libsql::params![id])
            .await
            .map_err(db_err("Failed to query document"))?;
        match rows.next().await.map_err(db_err("Failed to read row"))? {
            Some(row) => {
                let doc: String = row.get(0).map_err(db_err("Failed to get doc"))?;
                Ok(Some(serde_json::from_str(&doc)?))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl RecordWriter for LibsqlWriter {
    async fn write(&self, doc: &CanonicalDocument) -> Result<()> {
        let json = doc.to_json()?;
        self.conn
            .execute(&self.insert_sql, libsql::params![json])
            .await
            .map_err(db_err("Failed to insert document"))?;
        Ok(())
    }
}
