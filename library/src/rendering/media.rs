//! Boundary to the external media library.
//!
//! The engine never opens media itself. It asks a [`MediaProvider`] for a handle at the
//! requested quality tier and copies that handle into the render plan.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::MediaId;

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Low resolution representation used for interactive preview.
    #[default]
    Proxy,
    /// Full quality source used for export.
    Original,
}

impl std::str::FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proxy" => Ok(QualityTier::Proxy),
            "original" => Ok(QualityTier::Original),
            other => Err(format!("unknown quality tier '{other}'")),
        }
    }
}

/// Opaque locator handed to the processing engine.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Debug)]
pub struct MediaHandle {
    pub media_id: MediaId,
    pub tier: QualityTier,
    pub uri: String,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("media {0} not found")]
pub struct MediaNotFound(pub MediaId);

pub trait MediaProvider: Send + Sync {
    fn resolve_media(&self, media_id: MediaId, tier: QualityTier) -> Result<MediaHandle, MediaNotFound>;
}

#[derive(Clone, Debug)]
struct MediaEntry {
    original: String,
    proxy: Option<String>,
}

/// Thread-safe in-memory catalogue. Items can be evicted while plans are being resolved;
/// later queries then report the reference as broken.
#[derive(Debug, Default)]
pub struct InMemoryMediaLibrary {
    items: RwLock<HashMap<MediaId, MediaEntry>>,
}

impl InMemoryMediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, media_id: MediaId, original: impl Into<String>, proxy: Option<String>) {
        let entry = MediaEntry {
            original: original.into(),
            proxy,
        };
        match self.items.write() {
            Ok(mut items) => {
                items.insert(media_id, entry);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(media_id, entry);
            }
        }
    }

    pub fn remove(&self, media_id: MediaId) -> bool {
        match self.items.write() {
            Ok(mut items) => items.remove(&media_id).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(&media_id).is_some(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MediaProvider for InMemoryMediaLibrary {
    fn resolve_media(&self, media_id: MediaId, tier: QualityTier) -> Result<MediaHandle, MediaNotFound> {
        let items = match self.items.read() {
            Ok(items) => items,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = items.get(&media_id).ok_or(MediaNotFound(media_id))?;
        let uri = match (tier, &entry.proxy) {
            (QualityTier::Proxy, Some(proxy)) => proxy.clone(),
            (QualityTier::Proxy, None) => {
                log::debug!("No proxy for {}, falling back to original", media_id);
                entry.original.clone()
            }
            (QualityTier::Original, _) => entry.original.clone(),
        };
        Ok(MediaHandle {
            media_id,
            tier,
            uri,
        })
    }
}

/// Resolves every id by substituting `{media}` and `{tier}` into a URI template.
#[derive(Clone, Debug)]
pub struct UriTemplateProvider {
    template: String,
}

impl UriTemplateProvider {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl MediaProvider for UriTemplateProvider {
    fn resolve_media(&self, media_id: MediaId, tier: QualityTier) -> Result<MediaHandle, MediaNotFound> {
        let tier_name = match tier {
            QualityTier::Proxy => "proxy",
            QualityTier::Original => "original",
        };
        let uri = self
            .template
            .replace("{media}", &media_id.as_uuid().to_string())
            .replace("{tier}", tier_name);
        Ok(MediaHandle {
            media_id,
            tier,
            uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_falls_back_to_original() {
        let library = InMemoryMediaLibrary::new();
        let id = MediaId::new_v4();
        library.insert(id, "file:///a.mov", None);
        let handle = library.resolve_media(id, QualityTier::Proxy).unwrap();
        assert_eq!(handle.uri, "file:///a.mov");
        assert_eq!(handle.tier, QualityTier::Proxy);
    }

    #[test]
    fn evicted_media_is_not_found() {
        let library = InMemoryMediaLibrary::new();
        let id = MediaId::new_v4();
        library.insert(id, "a", Some("a_proxy".to_string()));
        assert!(library.remove(id));
        assert_eq!(
            library.resolve_media(id, QualityTier::Original),
            Err(MediaNotFound(id))
        );
    }
}
