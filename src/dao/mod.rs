/// File-backed effect preset storage.
pub mod preset_store;

pub use preset_store::{EffectPreset, NewPreset, PresetPatch, PresetStore, StoreError};
