//! On-disk effect preset store.
//!
//! The whole store is one pretty-printed JSON document; every mutation
//! rewrites it through a temp file + rename so the file on disk is always a
//! complete snapshot of some committed state.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::grid::TopologyMode;

const STORE_VERSION: &str = "1.0";

/// A persisted, named effect configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectPreset {
    pub id: String,
    pub name: String,
    pub effect: String,
    pub topology: TopologyMode,
    #[serde(default)]
    pub params: Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(default)]
    pub is_protected: bool,
}

/// Caller-supplied fields for a new preset.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPreset {
    pub id: String,
    pub name: String,
    pub effect: String,
    pub topology: TopologyMode,
    #[serde(default)]
    pub params: Value,
}

/// Partial update; id, protection flag, and creation time are immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetPatch {
    pub name: Option<String>,
    pub effect: Option<String>,
    pub topology: Option<TopologyMode>,
    pub params: Option<Value>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("preset `{0}` not found")]
    NotFound(String),
    #[error("preset id `{0}` already exists")]
    Conflict(String),
    #[error("preset `{0}` is protected")]
    Protected(String),
    #[error("id `{0}` is empty after sanitization")]
    InvalidId(String),
    #[error("preset store i/o failed")]
    Io(#[from] std::io::Error),
    #[error("preset store serialization failed")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct PresetFile {
    version: String,
    presets: Vec<EffectPreset>,
}

/// In-memory preset map bound to one backing file.
#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    presets: IndexMap<String, EffectPreset>,
}

impl PresetStore {
    /// Load the store, seeding the protected defaults when the file is
    /// missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self {
            path,
            presets: IndexMap::new(),
        };

        match fs::read_to_string(&store.path) {
            Ok(contents) => match serde_json::from_str::<PresetFile>(&contents) {
                Ok(file) => {
                    for preset in file.presets {
                        store.presets.insert(preset.id.clone(), preset);
                    }
                    info!(
                        path = %store.path.display(),
                        count = store.presets.len(),
                        "loaded effect presets"
                    );
                }
                Err(err) => {
                    warn!(
                        path = %store.path.display(),
                        error = %err,
                        "failed to parse preset store; reseeding defaults"
                    );
                    store.seed()?;
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %store.path.display(), "preset store missing; seeding defaults");
                store.seed()?;
            }
            Err(err) => {
                warn!(
                    path = %store.path.display(),
                    error = %err,
                    "failed to read preset store; reseeding defaults"
                );
                store.seed()?;
            }
        }

        Ok(store)
    }

    pub fn get(&self, id: &str) -> Option<&EffectPreset> {
        self.presets.get(id)
    }

    /// Snapshot of every preset in insertion order.
    pub fn get_all(&self) -> Vec<EffectPreset> {
        self.presets.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn create(&mut self, new: NewPreset) -> Result<EffectPreset, StoreError> {
        let id = sanitize_id(&new.id);
        if id.is_empty() {
            return Err(StoreError::InvalidId(new.id));
        }
        if self.presets.contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }

        let now = OffsetDateTime::now_utc();
        let preset = EffectPreset {
            id: id.clone(),
            name: new.name,
            effect: new.effect,
            topology: new.topology,
            params: new.params,
            created_at: now,
            updated_at: now,
            is_protected: false,
        };

        self.presets.insert(id.clone(), preset.clone());
        if let Err(err) = self.save() {
            // A failed save must not leave the entry in memory either.
            self.presets.shift_remove(&id);
            return Err(err);
        }
        Ok(preset)
    }

    pub fn update(&mut self, id: &str, patch: PresetPatch) -> Result<EffectPreset, StoreError> {
        let Some(preset) = self.presets.get_mut(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        if preset.is_protected {
            return Err(StoreError::Protected(id.to_string()));
        }

        let previous = preset.clone();
        if let Some(name) = patch.name {
            preset.name = name;
        }
        if let Some(effect) = patch.effect {
            preset.effect = effect;
        }
        if let Some(topology) = patch.topology {
            preset.topology = topology;
        }
        if let Some(params) = patch.params {
            preset.params = params;
        }
        preset.updated_at = OffsetDateTime::now_utc();
        let updated = preset.clone();

        if let Err(err) = self.save() {
            self.presets.insert(id.to_string(), previous);
            return Err(err);
        }
        Ok(updated)
    }

    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let Some(preset) = self.presets.get(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        if preset.is_protected {
            return Err(StoreError::Protected(id.to_string()));
        }

        let removed = self.presets.shift_remove(id);
        if let Err(err) = self.save() {
            if let Some(preset) = removed {
                self.presets.insert(id.to_string(), preset);
            }
            return Err(err);
        }
        Ok(())
    }

    fn seed(&mut self) -> Result<(), StoreError> {
        self.presets = seeded_presets();
        self.save()
    }

    /// Persist the whole set atomically: write a temp file, then rename it
    /// over the target.
    fn save(&self) -> Result<(), StoreError> {
        let file = PresetFile {
            version: STORE_VERSION.to_string(),
            presets: self.presets.values().cloned().collect(),
        };
        let contents = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Normalize a raw preset id: lowercase, whitespace runs become one `-`,
/// anything outside `[a-z0-9-]` is stripped, dashes collapse and trim.
pub fn sanitize_id(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    let mut previous_dash = false;

    for ch in raw.to_lowercase().chars() {
        let mapped = if ch.is_whitespace() { Some('-') } else { Some(ch) };
        match mapped {
            Some('-') => {
                if !previous_dash {
                    collapsed.push('-');
                }
                previous_dash = true;
            }
            Some(ch) if ch.is_ascii_lowercase() || ch.is_ascii_digit() => {
                collapsed.push(ch);
                previous_dash = false;
            }
            _ => {}
        }
    }

    collapsed.trim_matches('-').to_string()
}

/// The protected presets shipped with a fresh store.
fn seeded_presets() -> IndexMap<String, EffectPreset> {
    let now = OffsetDateTime::now_utc();
    let protected = |id: &str, name: &str, effect: &str, topology: TopologyMode, params: Value| {
        (
            id.to_string(),
            EffectPreset {
                id: id.to_string(),
                name: name.to_string(),
                effect: effect.to_string(),
                topology,
                params,
                created_at: now,
                updated_at: now,
                is_protected: true,
            },
        )
    };

    IndexMap::from_iter([
        protected(
            "sequential-ww",
            "Sequential warm white",
            "sequential",
            TopologyMode::Linear,
            json!({"colorPreset": "warm", "brightness": 1.0, "delayBetweenPanels": 200, "fadeDuration": 1050}),
        ),
        protected(
            "sequential-cw",
            "Sequential cool white",
            "sequential",
            TopologyMode::Linear,
            json!({"colorPreset": "white", "brightness": 1.0, "delayBetweenPanels": 200, "fadeDuration": 1050}),
        ),
        protected(
            "flow-slow-rainbow",
            "Slow rainbow",
            "flow",
            TopologyMode::Linear,
            json!({"colorPreset": "rainbow", "brightness": 1.0, "speed": 0.1, "scale": 0.15}),
        ),
        protected(
            "strobe-10hz",
            "Strobe 10 Hz",
            "strobe",
            TopologyMode::Circular,
            json!({"colorPreset": "white", "brightness": 1.0, "frequency": 10}),
        ),
        protected(
            "blackout-quick",
            "Quick blackout",
            "blackout",
            TopologyMode::Circular,
            json!({"brightness": 1.0, "transitionDuration": 300}),
        ),
        protected(
            "blackout-instant",
            "Instant blackout",
            "blackout",
            TopologyMode::Circular,
            json!({"brightness": 1.0, "transitionDuration": 0}),
        ),
        protected(
            "flow-quick-chase",
            "Quick chase",
            "flow",
            TopologyMode::Linear,
            json!({"colorPreset": "breathe", "brightness": 1.0, "speed": 0.8, "scale": 0.4}),
        ),
    ])
}
