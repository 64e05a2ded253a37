use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use boom_shared::protocol::{KEY_PRESET_DISPLAY_NAME, KEY_PRESET_NAME, SET_ACTIVE_PRESET_REQUEST};
use boom_shared::types::Preset;
use crate::error::{BoomError, Result};
use crate::session::Session;

/// Only the fields of a status message we consume
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusMessage {
    remote_context_info: RemoteContextInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteContextInfo {
    #[serde(default)]
    active_preset: Option<Value>,
    #[serde(default)]
    preset_list: Vec<Value>,
}

/// The "set active preset" command. The preset object is the server's own,
/// sent back untouched.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SetActivePresetRequest<'a> {
    pub remote_request_type: u32,
    pub active_preset: &'a Value,
}

impl<'a> SetActivePresetRequest<'a> {
    pub fn new(preset: &'a Preset) -> Self {
        Self {
            remote_request_type: SET_ACTIVE_PRESET_REQUEST,
            active_preset: &preset.payload,
        }
    }
}

/// What [`RemoteState::set_active_preset`] did
#[derive(Debug, Clone, PartialEq)]
pub enum PresetChange {
    /// The preset is already active; nothing was sent
    AlreadyActive,
    /// No preset by that name in the snapshot; nothing was sent
    NotFound,
    /// The command went out. The server never acknowledges it.
    Requested(Preset),
}

/// Snapshot of the server's presets, taken from one status message.
///
/// Values are copied out of the message, so a later status message never
/// changes a snapshot already handed out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteState {
    presets: Vec<Preset>,
    active: Option<Preset>,
}

impl RemoteState {
    /// Parse a status message body
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| BoomError::InvalidStatus(e.to_string()))?;
        Self::from_status(value)
    }

    pub fn from_status(value: Value) -> Result<Self> {
        let status: StatusMessage =
            serde_json::from_value(value).map_err(|e| BoomError::InvalidStatus(e.to_string()))?;
        let info = status.remote_context_info;

        let active = info
            .active_preset
            .filter(|v| !v.is_null())
            .map(|payload| {
                preset_from(payload, KEY_PRESET_NAME, KEY_PRESET_DISPLAY_NAME).ok_or_else(|| {
                    BoomError::InvalidStatus("active preset has no name".to_string())
                })
            })
            .transpose()?;

        let presets = info
            .preset_list
            .into_iter()
            .filter_map(|payload| {
                let preset = preset_from(payload, KEY_PRESET_DISPLAY_NAME, KEY_PRESET_NAME);
                if preset.is_none() {
                    tracing::warn!("Skipping preset without a display name");
                }
                preset
            })
            .collect();

        let state = Self { presets, active };
        if !state.active_is_listed() {
            if let Some(active) = &state.active {
                tracing::warn!("Active preset \"{}\" is not in the preset list", active.name);
            }
        }
        Ok(state)
    }

    /// Whether the active preset, if any, matches exactly one listed preset
    pub fn active_is_listed(&self) -> bool {
        match &self.active {
            Some(active) => self.presets.iter().filter(|p| p.is_named(&active.name)).count() == 1,
            None => true,
        }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn active_preset(&self) -> Option<&Preset> {
        self.active.as_ref()
    }

    /// Case-insensitive lookup in the preset list
    pub fn find_preset(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.is_named(name))
    }

    /// Decide what activating `name` requires, without sending anything
    pub fn plan_change(&self, name: &str) -> PresetChange {
        if self.active.as_ref().is_some_and(|a| a.is_named(name)) {
            return PresetChange::AlreadyActive;
        }
        match self.find_preset(name) {
            Some(preset) => PresetChange::Requested(preset.clone()),
            None => PresetChange::NotFound,
        }
    }

    /// Ask the server to activate the preset called `name`.
    ///
    /// A name that is already active or unknown is logged and sends nothing.
    /// The snapshot itself is never modified: the server does not confirm the
    /// change, it only shows up in a later status message.
    pub async fn set_active_preset<S>(
        &self,
        name: &str,
        session: &mut Session<S>,
    ) -> Result<PresetChange>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let change = self.plan_change(name);
        match &change {
            PresetChange::AlreadyActive => {
                tracing::info!("Current preset already set to \"{}\"", name);
            }
            PresetChange::NotFound => {
                tracing::error!("No preset found named \"{}\"", name);
            }
            PresetChange::Requested(preset) => {
                tracing::info!("Setting preset to: {}", preset.name);
                session.send(&SetActivePresetRequest::new(preset)).await?;
            }
        }
        Ok(change)
    }
}

fn preset_from(payload: Value, name_key: &str, fallback_key: &str) -> Option<Preset> {
    let name = payload
        .get(name_key)
        .or_else(|| payload.get(fallback_key))
        .and_then(Value::as_str)?
        .to_string();
    Some(Preset::new(name, payload))
}
