use std::{collections::{BTreeSet, HashMap}, sync::Arc};

use serenity::async_trait;
use tokio::sync::RwLock;

use super::CacheBackend;
use crate::error::Result;

#[derive(Debug)]
enum Entry {
    Value(String),
    Set(BTreeSet<String>),
}

/// In-process settings cache.
///
/// Entries are immutable once stored: every write builds a new entry and swaps it in.
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Arc<Entry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
    async fn entry(&self, key: &str) -> Option<Arc<Entry>> {
        self.entries.read().await.get(key).cloned()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match self.entry(key).await.as_deref() {
            Some(Entry::Value(v)) => Some(v.clone()),
            _ => None,
        })
    }
    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), Arc::new(Entry::Value(value)));
        Ok(())
    }
    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
    async fn members(&self, key: &str) -> Result<Vec<String>> {
        Ok(match self.entry(key).await.as_deref() {
            Some(Entry::Set(members)) => members.iter().cloned().collect(),
            _ => Vec::new(),
        })
    }
    async fn add_member(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        let mut members = match entries.get(key).map(|e| e.as_ref()) {
            Some(Entry::Set(members)) => members.clone(),
            _ => BTreeSet::new(),
        };
        members.insert(value);
        entries.insert(key.to_string(), Arc::new(Entry::Set(members)));
        Ok(())
    }
    async fn remove_member(&self, key: &str, value: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        let mut members = match entries.get(key).map(|e| e.as_ref()) {
            Some(Entry::Set(members)) => members.clone(),
            _ => return Ok(false),
        };
        let removed = members.remove(value);
        entries.insert(key.to_string(), Arc::new(Entry::Set(members)));
        Ok(removed)
    }
}
