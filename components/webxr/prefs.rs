/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use webxr_bridge_api::Error;

/// Names a JSON file holding [`BridgePrefs`], read when the plugin loads.
pub const PREFS_ENV_VAR: &str = "WEBXR_BRIDGE_PREFS";

/// How eye images are laid out in the host's render textures.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextureLayout {
    /// Both eyes share one texture the size of the framebuffer, left half and
    /// right half.
    #[default]
    SideBySide,
    /// One texture per view, or one two-layer array texture in single-pass.
    PerView,
}

/// Who presents a completed frame.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositingMode {
    /// The host presents its render textures itself.
    #[default]
    Host,
    /// The bridge draws the rendered texture into its own target.
    Gl,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct BridgePrefs {
    pub texture_layout: TextureLayout,
    pub compositing: CompositingMode,
    /// Separation reported with the shared culling pass in single-pass mode,
    /// where the eye offsets are not known to the host.
    pub single_pass_culling_separation: f32,
    pub device_id: u32,
    pub device_name: String,
    pub manufacturer: String,
}

impl Default for BridgePrefs {
    fn default() -> Self {
        BridgePrefs {
            texture_layout: TextureLayout::default(),
            compositing: CompositingMode::default(),
            single_pass_culling_separation: 0.625,
            device_id: 72,
            device_name: "WebXR Tracked Display".to_owned(),
            manufacturer: "WebXR".to_owned(),
        }
    }
}

impl BridgePrefs {
    pub fn from_json(json: &str) -> Result<BridgePrefs, Error> {
        serde_json::from_str(json).map_err(|error| Error::InvalidPrefs(error.to_string()))
    }

    pub fn read_from_file(path: &Path) -> Result<BridgePrefs, Error> {
        let json = fs::read_to_string(path).map_err(|error| {
            Error::InvalidPrefs(format!("could not read {}: {error}", path.display()))
        })?;
        BridgePrefs::from_json(&json)
    }

    /// The prefs named by [`PREFS_ENV_VAR`], or the defaults when it is unset
    /// or the file cannot be used.
    pub fn from_env() -> BridgePrefs {
        let Some(path) = std::env::var_os(PREFS_ENV_VAR) else {
            return BridgePrefs::default();
        };
        match BridgePrefs::read_from_file(Path::new(&path)) {
            Ok(prefs) => prefs,
            Err(error) => {
                log::warn!("Ignoring {PREFS_ENV_VAR}: {error}");
                BridgePrefs::default()
            },
        }
    }
}
