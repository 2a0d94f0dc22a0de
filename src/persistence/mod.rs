//! Saved preferences: a versioned JSON envelope in a [`KeyValueStore`].
//!
//! Reads never fail loudly. A payload that cannot be understood is logged
//! and treated as "nothing saved".

mod envelope;
mod legacy;

use serde_json::Value;

use crate::state::{DockPosition, PreferenceState};
use crate::storage::{KeyValueStore, StorageError};

pub use envelope::{
    font_size_value, resolve_font_scale, FiltersEnvelope, SettingsEnvelope, CURRENT_VERSION,
};

pub const SETTINGS_KEY: &str = "a11y-stiac-settings";

/// Decodes a stored payload, migrating older shapes. `None` when the payload
/// is not JSON, is not an object, or a versioned field has the wrong type.
pub fn decode(raw: &str, default_position: DockPosition) -> Option<PreferenceState> {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(target: "a11y::persist", error = %err, "discarding unparsable settings");
            return None;
        }
    };

    let envelope = if is_versioned(&parsed) {
        if !has_object_shape(&parsed) {
            tracing::debug!(target: "a11y::persist", "discarding settings with a non-object shape");
            return None;
        }
        match serde_json::from_value::<SettingsEnvelope>(parsed) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!(target: "a11y::persist", error = %err, "discarding corrupt settings");
                return None;
            }
        }
    } else {
        let migrated = legacy::migrate(&parsed, default_position)?;
        tracing::info!(target: "a11y::persist", "migrated legacy settings");
        migrated
    };

    if envelope.version > CURRENT_VERSION {
        tracing::debug!(
            target: "a11y::persist",
            version = envelope.version,
            "settings written by a newer widget, reading known fields"
        );
    }
    Some(envelope.into_state(default_position))
}

pub fn encode(state: &PreferenceState) -> Result<String, StorageError> {
    Ok(serde_json::to_string(&SettingsEnvelope::from_state(state))?)
}

/// The envelope and its `filters` must be JSON objects. serde would accept
/// arrays for either as a positional struct.
fn has_object_shape(parsed: &Value) -> bool {
    parsed.is_object() && matches!(parsed.get("filters"), None | Some(Value::Object(_)))
}

/// A payload counts as versioned when its `version` is present and truthy.
fn is_versioned(parsed: &Value) -> bool {
    match parsed.get("version") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Some(Value::String(text)) => !text.is_empty(),
        Some(_) => true,
    }
}

#[derive(Debug)]
pub struct PersistenceAdapter<S> {
    store: S,
    default_position: DockPosition,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S, default_position: DockPosition) -> Self {
        Self {
            store,
            default_position,
        }
    }

    /// The underlying store, shared with collaborators that keep their own
    /// keys (such as the chosen language).
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&self, state: &PreferenceState) -> Result<(), StorageError> {
        let payload = encode(state)?;
        self.store.set(SETTINGS_KEY, &payload)?;
        tracing::trace!(target: "a11y::persist", bytes = payload.len(), "settings saved");
        Ok(())
    }

    pub fn load(&self) -> Option<PreferenceState> {
        let raw = match self.store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(target: "a11y::persist", error = %err, "unable to read settings");
                return None;
            }
        };
        decode(&raw, self.default_position)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(SETTINGS_KEY)
    }
}
