use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SinkError;
use crate::models::{ArtifactRef, Period, Store};

pub const BOARD_DIRECTORY: &str = "board_of_directors";

pub enum ArtifactKind<'a> {
    StoreSales(&'a Store),
    Ranking(Period),
}

/// Lowercased store name reduced to a single path component: anything other
/// than letters, digits and `-` becomes `_`, so separators and dots never
/// reach the filesystem.
pub fn safe_store_name(name: &str) -> String {
    let safe: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '-' { ch } else { '_' })
        .collect();
    if safe.is_empty() {
        "store".to_string()
    } else {
        safe
    }
}

/// Date-qualified artifact identifier, stable for a given input.
pub fn artifact_name(kind: ArtifactKind<'_>, run_date: NaiveDate) -> String {
    let stamp = run_date.format("%Y_%m_%d");
    match kind {
        ArtifactKind::StoreSales(store) => {
            format!("{}_{stamp}_sales", safe_store_name(&store.name))
        }
        ArtifactKind::Ranking(period) => format!("{}_ranking_{stamp}", period.label()),
    }
}

/// One line of a store's year-to-date sales extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractRow {
    #[serde(rename = "Sales Code")]
    pub sale_code: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Store Name")]
    pub store_name: String,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "Unit Price")]
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingRow {
    #[serde(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Store Id")]
    pub store_id: String,
    #[serde(rename = "Store Name")]
    pub store_name: String,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
}

pub trait BackupSink: Send + Sync {
    fn save_store_extract(
        &self,
        store: &Store,
        rows: &[ExtractRow],
        run_date: NaiveDate,
    ) -> Result<ArtifactRef, SinkError>;

    fn save_ranking(
        &self,
        period: Period,
        rows: &[RankingRow],
        run_date: NaiveDate,
    ) -> Result<ArtifactRef, SinkError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachments: Vec<ArtifactRef>,
}

pub trait MailSink: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SinkError>;
}

/// Writes extracts and rankings as CSV files below a root directory.
#[derive(Debug, Clone)]
pub struct CsvBackupSink {
    root: PathBuf,
}

impl CsvBackupSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn write<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<ArtifactRef, SinkError> {
        let path = dir.join(format!("{name}.csv"));
        let failed = |reason: String| SinkError::Backup {
            artifact: name.to_string(),
            reason,
        };

        std::fs::create_dir_all(dir).map_err(|err| failed(err.to_string()))?;
        let mut writer = csv::Writer::from_path(&path).map_err(|err| failed(err.to_string()))?;
        for row in rows {
            writer.serialize(row).map_err(|err| failed(err.to_string()))?;
        }
        writer.flush().map_err(|err| failed(err.to_string()))?;

        info!(artifact = name, path = %path.display(), rows = rows.len(), "backup written");
        Ok(ArtifactRef::new(path.display().to_string()))
    }
}

impl BackupSink for CsvBackupSink {
    fn save_store_extract(
        &self,
        store: &Store,
        rows: &[ExtractRow],
        run_date: NaiveDate,
    ) -> Result<ArtifactRef, SinkError> {
        let dir = self.root.join(safe_store_name(&store.name));
        let name = artifact_name(ArtifactKind::StoreSales(store), run_date);
        Self::write(&dir, &name, rows)
    }

    fn save_ranking(
        &self,
        period: Period,
        rows: &[RankingRow],
        run_date: NaiveDate,
    ) -> Result<ArtifactRef, SinkError> {
        let dir = self.root.join(BOARD_DIRECTORY);
        let name = artifact_name(ArtifactKind::Ranking(period), run_date);
        Self::write(&dir, &name, rows)
    }
}

/// Drops each mail as a JSON file into an outbox directory for a
/// delivery agent to pick up.
#[derive(Debug, Clone)]
pub struct OutboxMailSink {
    dir: PathBuf,
}

impl OutboxMailSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn warn_missing_attachments(mail: &OutgoingMail) {
    for attachment in &mail.attachments {
        let path = Path::new(attachment.as_str());
        if !path.is_file() {
            warn!(to = %mail.to, attachment = %attachment, "attachment not found");
        }
    }
}

impl MailSink for OutboxMailSink {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SinkError> {
        let failed = |reason: String| SinkError::Mail {
            recipient: mail.to.clone(),
            reason,
        };

        warn_missing_attachments(mail);
        std::fs::create_dir_all(&self.dir).map_err(|err| failed(err.to_string()))?;
        let path = self.dir.join(format!("{}.json", Uuid::new_v4()));
        let payload = serde_json::to_vec_pretty(mail).map_err(|err| failed(err.to_string()))?;
        std::fs::write(&path, payload).map_err(|err| failed(err.to_string()))?;

        info!(to = %mail.to, subject = %mail.subject, path = %path.display(), "mail queued");
        Ok(())
    }
}

/// Logs mails instead of queueing them.
#[derive(Debug, Clone, Default)]
pub struct PreviewMailSink;

impl MailSink for PreviewMailSink {
    fn send(&self, mail: &OutgoingMail) -> Result<(), SinkError> {
        warn_missing_attachments(mail);
        info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            attachments = mail.attachments.len(),
            "preview mail\n{}",
            mail.body
        );
        Ok(())
    }
}
