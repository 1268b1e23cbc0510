//! Runtime settings of the bot.
//!
//! Role and channel identifiers are read by nearly every operation and can change
//! while the bot runs, so they live in a shared cache rather than in the process
//! configuration. The store is built once and handed to every component.

mod memory;
mod redis;

use std::{fmt, str::FromStr};

use serenity::async_trait;

use crate::error::{Error, Result};

pub use self::memory::MemoryBackend;
pub use self::redis::RedisBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKind {
    Scalar,
    List,
}

/// Closed set of setting keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ManagementRole,
    PanelAccessRole,
    MentionRole,
    TicketCategory,
    ArchiveChannel,
    RegisteredRole,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::ManagementRole,
        SettingKey::PanelAccessRole,
        SettingKey::MentionRole,
        SettingKey::TicketCategory,
        SettingKey::ArchiveChannel,
        SettingKey::RegisteredRole,
    ];
    pub fn name(&self) -> &'static str {
        match self {
            SettingKey::ManagementRole => "management_role",
            SettingKey::PanelAccessRole => "panel_access_role",
            SettingKey::MentionRole => "mention_role",
            SettingKey::TicketCategory => "ticket_category",
            SettingKey::ArchiveChannel => "archive_channel",
            SettingKey::RegisteredRole => "registered_role",
        }
    }
    pub fn kind(&self) -> SettingKind {
        match self {
            SettingKey::MentionRole => SettingKind::List,
            _ => SettingKind::Scalar,
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        SettingKey::ALL
            .iter()
            .find(|k| k.name() == normalized)
            .copied()
            .ok_or_else(|| {
                let names = SettingKey::ALL.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ");
                Error::invalid(format!("Unknown setting `{}`, expected one of: {}", s, names))
            })
    }
}

/// Storage primitives of the settings cache.
///
/// Writes replace whole values; readers see either the previous or the new value.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn members(&self, key: &str) -> Result<Vec<String>>;
    async fn add_member(&self, key: &str, value: String) -> Result<()>;
    async fn remove_member(&self, key: &str, value: &str) -> Result<bool>;
}

/// Typed access to the settings.
pub struct Settings {
    backend: Box<dyn CacheBackend>,
    prefix: String,
}

fn parse_id(key: SettingKey, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::Config(format!("Setting {} holds a non numeric value `{}`", key, raw)))
}

impl Settings {
    pub fn new<B: CacheBackend + 'static>(backend: B, prefix: &str) -> Self {
        Self {
            backend: Box::new(backend),
            prefix: prefix.to_string(),
        }
    }
    fn storage_key(&self, key: SettingKey) -> String {
        format!("{}:config:{}", self.prefix, key.name())
    }
    fn expect_kind(key: SettingKey, kind: SettingKind) -> Result<()> {
        match (key.kind(), kind) {
            (a, b) if a == b => Ok(()),
            (SettingKind::List, _) => Err(Error::invalid(format!("{} is a list, use add or remove", key))),
            (SettingKind::Scalar, _) => Err(Error::invalid(format!("{} holds a single value, use set", key))),
        }
    }

    pub async fn get(&self, key: SettingKey) -> Result<Option<u64>> {
        Self::expect_kind(key, SettingKind::Scalar)?;
        match self.backend.get(&self.storage_key(key)).await? {
            Some(raw) => parse_id(key, &raw).map(Some),
            None => Ok(None),
        }
    }
    pub async fn get_list(&self, key: SettingKey) -> Result<Vec<u64>> {
        Self::expect_kind(key, SettingKind::List)?;
        let mut values = self
            .backend
            .members(&self.storage_key(key))
            .await?
            .iter()
            .map(|raw| parse_id(key, raw))
            .collect::<Result<Vec<_>>>()?;
        values.sort_unstable();
        Ok(values)
    }
    /// Values of several keys, scalars and lists flattened together.
    pub async fn get_multiple(&self, keys: &[SettingKey]) -> Result<Vec<u64>> {
        let mut values = Vec::new();
        for key in keys {
            match key.kind() {
                SettingKind::Scalar => values.extend(self.get(*key).await?),
                SettingKind::List => values.extend(self.get_list(*key).await?),
            }
        }
        Ok(values)
    }
    pub async fn set(&self, key: SettingKey, value: u64) -> Result<()> {
        Self::expect_kind(key, SettingKind::Scalar)?;
        self.backend.set(&self.storage_key(key), value.to_string()).await
    }
    pub async fn add(&self, key: SettingKey, value: u64) -> Result<()> {
        Self::expect_kind(key, SettingKind::List)?;
        self.backend.add_member(&self.storage_key(key), value.to_string()).await
    }
    /// Remove a value from a list. Returns false if it was not there.
    pub async fn remove(&self, key: SettingKey, value: u64) -> Result<bool> {
        Self::expect_kind(key, SettingKind::List)?;
        self.backend.remove_member(&self.storage_key(key), &value.to_string()).await
    }
    /// Unset a key, whatever its kind.
    pub async fn clear(&self, key: SettingKey) -> Result<()> {
        self.backend.delete(&self.storage_key(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::new(MemoryBackend::new(), "test")
    }

    #[tokio::test]
    async fn scalar_roundtrip_and_clear() {
        let settings = settings();
        assert_eq!(settings.get(SettingKey::TicketCategory).await.unwrap(), None);
        settings.set(SettingKey::TicketCategory, 42).await.unwrap();
        settings.set(SettingKey::TicketCategory, 43).await.unwrap();
        assert_eq!(settings.get(SettingKey::TicketCategory).await.unwrap(), Some(43));
        settings.clear(SettingKey::TicketCategory).await.unwrap();
        assert_eq!(settings.get(SettingKey::TicketCategory).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_add_remove() {
        let settings = settings();
        settings.add(SettingKey::MentionRole, 7).await.unwrap();
        settings.add(SettingKey::MentionRole, 3).await.unwrap();
        settings.add(SettingKey::MentionRole, 7).await.unwrap();
        assert_eq!(settings.get_list(SettingKey::MentionRole).await.unwrap(), vec![3, 7]);
        assert!(settings.remove(SettingKey::MentionRole, 7).await.unwrap());
        assert!(!settings.remove(SettingKey::MentionRole, 7).await.unwrap());
        assert_eq!(settings.get_list(SettingKey::MentionRole).await.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn kind_mismatch_is_invalid_input() {
        let settings = settings();
        let err = settings.set(SettingKey::MentionRole, 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = settings.add(SettingKey::PanelAccessRole, 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(settings.get(SettingKey::MentionRole).await.is_err());
    }

    #[tokio::test]
    async fn get_multiple_flattens() {
        let settings = settings();
        settings.add(SettingKey::MentionRole, 10).await.unwrap();
        settings.add(SettingKey::MentionRole, 11).await.unwrap();
        settings.set(SettingKey::PanelAccessRole, 20).await.unwrap();
        let values = settings
            .get_multiple(&[SettingKey::MentionRole, SettingKey::PanelAccessRole, SettingKey::ManagementRole])
            .await
            .unwrap();
        assert_eq!(values, vec![10, 11, 20]);
    }

    #[test]
    fn key_parsing() {
        assert_eq!("mention-role".parse::<SettingKey>().unwrap(), SettingKey::MentionRole);
        assert_eq!("Archive Channel".parse::<SettingKey>().unwrap(), SettingKey::ArchiveChannel);
        assert!("owner".parse::<SettingKey>().is_err());
    }
}
