/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This crate defines the data exchanged between the WebXR bridge providers
//! and the host engine: the per-frame views data published by the browser
//! session, the frame and mirror descriptors the display provider fills in,
//! the input device schema, and the traits through which the host is reached.

#![deny(unsafe_code)]

mod error;
mod frame;
mod host;
mod input;
pub mod mock;
mod views;

pub use error::Error;

pub use frame::AppSetup;
pub use frame::BlitParams;
pub use frame::CullingPass;
pub use frame::DisplayState;
pub use frame::EyePose;
pub use frame::FrameSetupHints;
pub use frame::HintsChanged;
pub use frame::MirrorViewBlitDesc;
pub use frame::MirrorViewBlitInfo;
pub use frame::NextFrameDesc;
pub use frame::Projection;
pub use frame::RenderParams;
pub use frame::RenderPass;
pub use frame::RenderTextureDesc;
pub use frame::RenderTextureId;
pub use frame::RenderingCapabilities;

pub use host::DisplayHost;
pub use host::InputHost;

pub use input::DeviceCharacteristics;
pub use input::DeviceDefinition;
pub use input::DeviceState;
pub use input::FeatureIndex;
pub use input::FeatureType;
pub use input::FeatureUsage;
pub use input::InputDeviceId;
pub use input::InputUpdateType;
pub use input::TrackingState;

pub use views::ViewsData;
pub use views::ViewsDataSource;
pub use views::VIEWS_DATA_LEN;

/// The coordinate space of the tracked device's anchor (the head).
/// Eye poses handed to the host are relative to it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DeviceAnchor;

/// The coordinate space of a single eye.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Eye;

/// The clip space of the display, the target of a projection matrix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Display;

/// The tracking space the browser session reports positions in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Native;

/// Physical pixels, used for texture and framebuffer sizes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pixels;

/// Normalized texture coordinates, `0.0..=1.0` across a texture or window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Uv;
