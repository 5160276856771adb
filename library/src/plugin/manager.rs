//! Plugin manager for registering and looking up studios.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;

use crate::error::LibraryError;
use crate::model::clip::MediaRef;
use crate::model::effect::{Effect, EffectDescriptor};
use crate::model::ids::EffectId;
use crate::plugin::annotations::Highlight;
use crate::plugin::builtin::BuiltinStudio;
use crate::plugin::traits::{EffectPreset, ExportPreset, StudioPlugin};

/// Registered studios, in registration order.
struct PluginRegistry {
    studios: HashMap<String, Arc<dyn StudioPlugin>>,
    order: Vec<String>,
}

pub struct PluginManager {
    inner: RwLock<PluginRegistry>,
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(PluginRegistry {
                studios: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// A manager with [`BuiltinStudio`] already registered.
    pub fn with_builtin() -> Self {
        let manager = Self::new();
        manager.register_studio(Arc::new(BuiltinStudio));
        manager
    }

    fn read(&self) -> RwLockReadGuard<'_, PluginRegistry> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, PluginRegistry> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `plugin`, replacing any studio with the same id.
    pub fn register_studio(&self, plugin: Arc<dyn StudioPlugin>) {
        let id = plugin.id().to_string();
        let (major, minor, patch) = plugin.version();
        debug!(
            "PluginManager: Registering studio '{}' ({} {}.{}.{})",
            id,
            plugin.name(),
            major,
            minor,
            patch
        );
        let mut inner = self.write();
        if inner.studios.insert(id.clone(), plugin).is_none() {
            inner.order.push(id);
        }
    }

    pub fn unregister_studio(&self, id: &str) -> Option<Arc<dyn StudioPlugin>> {
        let mut inner = self.write();
        let removed = inner.studios.remove(id)?;
        inner.order.retain(|existing| existing != id);
        Some(removed)
    }

    pub fn studio(&self, id: &str) -> Option<Arc<dyn StudioPlugin>> {
        self.read().studios.get(id).cloned()
    }

    /// (id, name) of every registered studio.
    pub fn studios(&self) -> Vec<(String, String)> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.studios.get(id).map(|s| (id.clone(), s.name())))
            .collect()
    }

    fn require(&self, studio_id: &str) -> Result<Arc<dyn StudioPlugin>, LibraryError> {
        self.studio(studio_id)
            .ok_or_else(|| LibraryError::Plugin(format!("Studio '{}' not found", studio_id)))
    }

    pub fn effect_presets(&self, studio_id: &str) -> Result<Vec<EffectPreset>, LibraryError> {
        Ok(self.require(studio_id)?.effects())
    }

    pub fn export_presets(&self, studio_id: &str) -> Result<Vec<ExportPreset>, LibraryError> {
        Ok(self.require(studio_id)?.export_presets())
    }

    pub fn export_preset(&self, studio_id: &str, preset_id: &str) -> Result<ExportPreset, LibraryError> {
        self.export_presets(studio_id)?
            .into_iter()
            .find(|preset| preset.id == preset_id)
            .ok_or_else(|| {
                LibraryError::Plugin(format!(
                    "Export preset '{}' not found in studio '{}'",
                    preset_id, studio_id
                ))
            })
    }

    /// Builds a validated effect from a studio preset, ready for `StackEffect`.
    pub fn instantiate_effect(
        &self,
        studio_id: &str,
        preset_id: &str,
        effect_id: EffectId,
    ) -> Result<Effect, LibraryError> {
        let descriptor: EffectDescriptor = self
            .effect_presets(studio_id)?
            .into_iter()
            .find(|preset| preset.id == preset_id)
            .map(|preset| preset.descriptor)
            .ok_or_else(|| {
                LibraryError::Plugin(format!(
                    "Effect preset '{}' not found in studio '{}'",
                    preset_id, studio_id
                ))
            })?;
        let effect = Effect::from_descriptor(effect_id, &descriptor)
            .map_err(crate::error::EditError::from)?;
        Ok(effect)
    }

    /// Runs the studio's detector over `media`. Studios without one report nothing.
    pub fn detect_highlights(
        &self,
        studio_id: &str,
        media: &MediaRef,
    ) -> Result<Vec<Highlight>, LibraryError> {
        let studio = self.require(studio_id)?;
        match studio.highlight_detector() {
            Some(detector) => {
                debug!(
                    "PluginManager: Running detector '{}' on {}",
                    detector.id(),
                    media.media_id
                );
                detector.detect(media)
            }
            None => Ok(Vec::new()),
        }
    }
}
