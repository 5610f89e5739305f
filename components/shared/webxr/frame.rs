/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use bitflags::bitflags;
use euclid::{Point2D, Rect, RigidTransform3D, Size2D, Transform3D};

use crate::DeviceAnchor;
use crate::Display;
use crate::Eye;
use crate::Pixels;
use crate::Uv;

/// The pose of an eye relative to the device anchor.
pub type EyePose = RigidTransform3D<f32, Eye, DeviceAnchor>;

/// An opaque texture handle handed out by the host.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct RenderTextureId(pub u32);

impl RenderTextureId {
    /// The host reserves zero for "no texture".
    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// What the display provider asks the host to allocate.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderTextureDesc {
    pub width: u32,
    pub height: u32,
    /// Number of array layers, zero for a plain 2D texture.
    pub array_length: u32,
}

bitflags! {
    /// Which parts of the application setup differ from the previous frame.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct HintsChanged: u32 {
        const SINGLE_PASS_RENDERING = 1 << 0;
        const RENDER_VIEWPORT = 1 << 1;
        const TEXTURE_RESOLUTION_SCALE = 1 << 2;
        const CONTENT_PROTECTION = 1 << 3;
        const REPROJECTION_MODE = 1 << 4;
        const FOCUS_PLANE = 1 << 5;
    }
}

/// The rendering setup the application asks for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppSetup {
    pub single_pass_rendering: bool,
    pub texture_resolution_scale: f32,
    pub render_viewport: Rect<f32, Uv>,
}

impl Default for AppSetup {
    fn default() -> Self {
        AppSetup {
            single_pass_rendering: false,
            texture_resolution_scale: 1.0,
            render_viewport: Rect::new(Point2D::zero(), Size2D::new(1.0, 1.0)),
        }
    }
}

/// Per-frame hints from the host, read before the frame descriptor is filled.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameSetupHints {
    pub app_setup: AppSetup,
    pub changed: HintsChanged,
}

impl FrameSetupHints {
    /// Only the pass mode and the resolution scale affect the render targets.
    pub fn invalidates_render_targets(&self) -> bool {
        self.changed
            .intersects(HintsChanged::SINGLE_PASS_RENDERING | HintsChanged::TEXTURE_RESOLUTION_SCALE)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    Matrix(Transform3D<f32, Eye, Display>),
    /// Tangents of the half angles of the frustum.
    HalfAngles {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
    },
}

/// View, projection and viewport for one eye of a render pass.
#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    pub eye_pose: EyePose,
    pub projection: Projection,
    pub viewport: Rect<f32, Uv>,
    pub texture_array_slice: u32,
}

#[derive(Clone, Debug)]
pub struct RenderPass {
    pub texture_id: RenderTextureId,
    pub render_params: Vec<RenderParams>,
    /// Passes sharing visibility point at the same culling pass.
    pub culling_pass_index: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct CullingPass {
    pub culling_pose: EyePose,
    pub projection: Projection,
    pub separation: f32,
}

/// The description of the next frame the host renders.
/// The storage is reused by the host from frame to frame.
#[derive(Clone, Debug, Default)]
pub struct NextFrameDesc {
    pub render_passes: Vec<RenderPass>,
    pub culling_passes: Vec<CullingPass>,
}

impl NextFrameDesc {
    pub fn clear(&mut self) {
        self.render_passes.clear();
        self.culling_passes.clear();
    }
}

/// What the display provider tells the host about its rendering support.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RenderingCapabilities {
    pub no_single_pass_rendering_support: bool,
    pub invalidate_render_state_after_each_callback: bool,
    pub skip_present_to_main_screen: bool,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DisplayState {
    pub display_is_transparent: bool,
}

/// The host's mirror window, the destination of a mirror blit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MirrorViewBlitInfo {
    pub mirror_size: Size2D<f32, Pixels>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlitParams {
    pub source_texture: RenderTextureId,
    pub source_array_slice: u32,
    pub source_rect: Rect<f32, Uv>,
    pub dest_rect: Rect<f32, Uv>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MirrorViewBlitDesc {
    pub blits: Vec<BlitParams>,
}
