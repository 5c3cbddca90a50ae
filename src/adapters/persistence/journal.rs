//! Settlement Journal - Append-only JSONL Audit Records
//!
//! Mirrors committed bets and price history points to daily JSONL files
//! (`bets/YYYY-MM-DD.jsonl`, `history/price_history.jsonl`). Each line is
//! a self-contained JSON record for easy parsing, streaming, and crash
//! recovery. The journal is an audit trail, never the source of truth.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, instrument};

use crate::domain::market::{BetRecord, PriceHistoryPoint};

/// Append-only JSONL journal with daily bet-file rotation.
pub struct SettlementJournal {
    /// Base directory for bet files.
    bets_dir: PathBuf,
    /// Directory for price history.
    history_dir: PathBuf,
}

impl SettlementJournal {
    /// Create a journal rooted at the given data directory.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let bets_dir = Path::new(data_dir).join("bets");
        let history_dir = Path::new(data_dir).join("history");

        fs::create_dir_all(&bets_dir)
            .await
            .context("Failed to create bets directory")?;
        fs::create_dir_all(&history_dir)
            .await
            .context("Failed to create history directory")?;

        Ok(Self {
            bets_dir,
            history_dir,
        })
    }

    /// Append a committed bet to today's JSONL file.
    #[instrument(skip(self, record), fields(bet_id = %record.id))]
    pub async fn append_bet(&self, record: &BetRecord) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.bets_dir.join(format!("{date}.jsonl"));
        Self::append_line(&path, record).await
    }

    /// Append a price history point to the rolling history file.
    pub async fn append_price_point(&self, point: &PriceHistoryPoint) -> Result<()> {
        let path = self.history_dir.join("price_history.jsonl");
        Self::append_line(&path, point).await
    }

    /// Load all journaled bets from all daily files, oldest first.
    #[instrument(skip(self))]
    pub async fn load_bets(&self) -> Result<Vec<BetRecord>> {
        let mut bets = Vec::new();
        let mut entries = fs::read_dir(&self.bets_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                let content = fs::read_to_string(&path).await?;
                for line in content.lines() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<BetRecord>(line) {
                        Ok(record) => bets.push(record),
                        Err(e) => {
                            tracing::warn!(
                                file = %path.display(),
                                error = %e,
                                "Skipping malformed bet record"
                            );
                        }
                    }
                }
            }
        }

        bets.sort_by_key(|b| b.placed_at);
        info!(count = bets.len(), "Loaded journaled bets");
        Ok(bets)
    }

    /// Check if the journal directory is writable.
    pub async fn is_healthy(&self) -> bool {
        let test_path = self.bets_dir.join(".health_check");
        let result = fs::write(&test_path, b"ok").await;
        let _ = fs::remove_file(&test_path).await;
        result.is_ok()
    }

    async fn append_line<T: serde::Serialize>(path: &Path, record: &T) -> Result<()> {
        let mut json = serde_json::to_string(record)
            .context("Failed to serialize journal record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open journal file")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write journal record")?;

        file.flush().await.context("Failed to flush journal")?;

        Ok(())
    }
}
