/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Display and tracking providers that let a host engine's XR subsystem
//! render into a browser's WebXR session.
//!
//! The providers are plain Rust types driven through [`Provider`] and their
//! own per-frame methods. The C callback tables the host registers live in
//! the [`ffi`] module only.

#![deny(unsafe_code)]

pub mod compositor;
pub mod display;
pub mod events;
pub mod ffi;
mod logging;
mod prefs;
mod provider;
mod tracking;

pub use display::{DisplayProvider, SessionConfig};
pub use logging::init_logging;
pub use prefs::{BridgePrefs, CompositingMode, TextureLayout, PREFS_ENV_VAR};
pub use provider::{Provider, ProviderState};
pub use tracking::{HeadFeatures, PoseFeatures, TrackingProvider};

pub use webxr_bridge_api as api;
