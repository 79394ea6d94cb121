//! In-memory stock record store.

use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use log::{info, warn};

use super::stocks_model::StockRecord;
use super::stocks_traits::StockRepositoryTrait;
use crate::errors::{Error, Result};

/// Keeps records in insertion order. Seedable from a JSON array of
/// [`StockRecord`]s.
#[derive(Default)]
pub struct InMemoryStockRepository {
    records: RwLock<Vec<StockRecord>>,
}

impl InMemoryStockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbols are upper-cased on the way in.
    pub fn with_records(records: Vec<StockRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                record.symbol = record.symbol.trim().to_uppercase();
                record
            })
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<StockRecord> = serde_json::from_str(json)?;
        Ok(Self::with_records(records))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let repository = Self::from_json(&json)?;
        info!(
            "Loaded {} stock records from {}",
            repository.read().len(),
            path.display()
        );
        Ok(repository)
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<StockRecord>> {
        self.records.read().unwrap_or_else(|poisoned| {
            warn!("Stock repository lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<StockRecord>> {
        self.records.write().unwrap_or_else(|poisoned| {
            warn!("Stock repository lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl StockRepositoryTrait for InMemoryStockRepository {
    fn find_all(&self) -> Result<Vec<StockRecord>> {
        Ok(self.read().clone())
    }

    fn find_by_symbol(&self, symbol: &str) -> Result<Option<StockRecord>> {
        let symbol = symbol.trim();
        Ok(self
            .read()
            .iter()
            .find(|record| record.symbol.eq_ignore_ascii_case(symbol))
            .cloned())
    }

    async fn insert(&self, record: StockRecord) -> Result<StockRecord> {
        let mut records = self.write();
        if records
            .iter()
            .any(|existing| existing.symbol.eq_ignore_ascii_case(&record.symbol))
        {
            return Err(Error::StockAlreadyExists(record.symbol));
        }
        records.push(record.clone());
        Ok(record)
    }
}
