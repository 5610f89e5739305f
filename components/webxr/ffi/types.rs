/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Plain C layouts of the data exchanged with the host, and their
//! conversions to and from the typed api.

use euclid::{Point2D, Rect, Rotation3D, Size2D, Vector3D};
use webxr_bridge_api::{
    AppSetup, BlitParams, CullingPass, DisplayState, Error, EyePose, FrameSetupHints,
    HintsChanged, MirrorViewBlitDesc, MirrorViewBlitInfo, Native, NextFrameDesc, Projection,
    RenderParams, RenderTextureDesc, RenderingCapabilities, Uv,
};

pub const MAX_RENDER_PASSES: usize = 4;
pub const MAX_RENDER_PARAMS: usize = 2;
pub const MAX_BLITS: usize = 2;

pub const PROJECTION_TYPE_UNDEFINED: u32 = 0;
pub const PROJECTION_TYPE_HALF_ANGLES: u32 = 1;
pub const PROJECTION_TYPE_MATRIX: u32 = 2;

#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubsystemErrorCode {
    Success = 0,
    Failure = 1,
}

impl SubsystemErrorCode {
    /// Collapse a provider result, logging the error the host cannot see.
    pub fn from_result(result: Result<(), Error>, operation: &str) -> SubsystemErrorCode {
        match result {
            Ok(()) => SubsystemErrorCode::Success,
            Err(error) => {
                log::warn!("{operation} failed: {error}");
                SubsystemErrorCode::Failure
            },
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrVector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrVector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrRectf {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrPose {
    pub position: XrVector3,
    pub rotation: XrVector4,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrMatrix4x4 {
    pub columns: [XrVector4; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrProjectionHalfAngles {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union XrProjectionData {
    pub half_angles: XrProjectionHalfAngles,
    pub matrix: XrMatrix4x4,
}

/// A projection tagged with one of the `PROJECTION_TYPE_*` constants.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct XrProjection {
    pub kind: u32,
    pub data: XrProjectionData,
}

impl Default for XrProjection {
    fn default() -> Self {
        XrProjection {
            kind: PROJECTION_TYPE_UNDEFINED,
            data: XrProjectionData {
                matrix: XrMatrix4x4::default(),
            },
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct XrRenderParams {
    pub device_anchor_to_eye_pose: XrPose,
    pub projection: XrProjection,
    pub viewport_rect: XrRectf,
    pub texture_array_slice: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct XrRenderPass {
    pub texture_id: u32,
    pub render_params_count: u32,
    pub render_params: [XrRenderParams; MAX_RENDER_PARAMS],
    pub culling_pass_index: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct XrCullingPass {
    pub device_anchor_to_culling_pose: XrPose,
    pub projection: XrProjection,
    pub separation: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct XrNextFrameDesc {
    pub render_passes_count: u32,
    pub render_passes: [XrRenderPass; MAX_RENDER_PASSES],
    pub culling_passes: [XrCullingPass; MAX_RENDER_PASSES],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrAppSetup {
    pub single_pass_rendering: bool,
    pub texture_resolution_scale: f32,
    pub render_viewport: XrRectf,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrFrameSetupHints {
    pub app_setup: XrAppSetup,
    pub changed_flags: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct XrRenderingCapabilities {
    pub no_single_pass_rendering_support: bool,
    pub invalidate_render_state_after_each_callback: bool,
    pub skip_present_to_main_screen: bool,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct XrRenderTextureDesc {
    pub width: u32,
    pub height: u32,
    pub texture_array_length: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrMirrorViewBlitInfo {
    /// Scaled size of the mirror render target, in pixels.
    pub width: f32,
    pub height: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrBlitParams {
    pub src_tex_id: u32,
    pub src_tex_array_slice: u32,
    pub src_rect: XrRectf,
    pub dest_rect: XrRectf,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct XrMirrorViewBlitDesc {
    pub blit_params_count: u32,
    pub blit_params: [XrBlitParams; MAX_BLITS],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct XrDisplayState {
    pub display_is_transparent: bool,
}

impl From<Rect<f32, Uv>> for XrRectf {
    fn from(rect: Rect<f32, Uv>) -> Self {
        XrRectf {
            x: rect.origin.x,
            y: rect.origin.y,
            width: rect.size.width,
            height: rect.size.height,
        }
    }
}

impl From<XrRectf> for Rect<f32, Uv> {
    fn from(rect: XrRectf) -> Self {
        Rect::new(
            Point2D::new(rect.x, rect.y),
            Size2D::new(rect.width, rect.height),
        )
    }
}

impl From<Vector3D<f32, Native>> for XrVector3 {
    fn from(vector: Vector3D<f32, Native>) -> Self {
        XrVector3 {
            x: vector.x,
            y: vector.y,
            z: vector.z,
        }
    }
}

impl From<Rotation3D<f32, Native, Native>> for XrVector4 {
    fn from(rotation: Rotation3D<f32, Native, Native>) -> Self {
        XrVector4 {
            x: rotation.i,
            y: rotation.j,
            z: rotation.k,
            w: rotation.r,
        }
    }
}

impl From<&EyePose> for XrPose {
    fn from(pose: &EyePose) -> Self {
        XrPose {
            position: XrVector3 {
                x: pose.translation.x,
                y: pose.translation.y,
                z: pose.translation.z,
            },
            rotation: XrVector4 {
                x: pose.rotation.i,
                y: pose.rotation.j,
                z: pose.rotation.k,
                w: pose.rotation.r,
            },
        }
    }
}

impl From<&Projection> for XrProjection {
    fn from(projection: &Projection) -> Self {
        match *projection {
            Projection::Matrix(matrix) => {
                let m = matrix.to_array();
                let column = |c: usize| XrVector4 {
                    x: m[4 * c],
                    y: m[4 * c + 1],
                    z: m[4 * c + 2],
                    w: m[4 * c + 3],
                };
                XrProjection {
                    kind: PROJECTION_TYPE_MATRIX,
                    data: XrProjectionData {
                        matrix: XrMatrix4x4 {
                            columns: [column(0), column(1), column(2), column(3)],
                        },
                    },
                }
            },
            Projection::HalfAngles {
                left,
                right,
                top,
                bottom,
            } => XrProjection {
                kind: PROJECTION_TYPE_HALF_ANGLES,
                data: XrProjectionData {
                    half_angles: XrProjectionHalfAngles {
                        left,
                        right,
                        top,
                        bottom,
                    },
                },
            },
        }
    }
}

impl From<&RenderParams> for XrRenderParams {
    fn from(params: &RenderParams) -> Self {
        XrRenderParams {
            device_anchor_to_eye_pose: XrPose::from(&params.eye_pose),
            projection: XrProjection::from(&params.projection),
            viewport_rect: params.viewport.into(),
            texture_array_slice: params.texture_array_slice as i32,
        }
    }
}

impl From<&CullingPass> for XrCullingPass {
    fn from(pass: &CullingPass) -> Self {
        XrCullingPass {
            device_anchor_to_culling_pose: XrPose::from(&pass.culling_pose),
            projection: XrProjection::from(&pass.projection),
            separation: pass.separation,
        }
    }
}

impl XrNextFrameDesc {
    /// Copy `desc` into the host's fixed-size storage. Passes and params
    /// beyond the host's capacity are dropped.
    pub fn write(&mut self, desc: &NextFrameDesc) {
        if desc.render_passes.len() > MAX_RENDER_PASSES {
            log::warn!(
                "Dropping {} render passes the host has no room for",
                desc.render_passes.len() - MAX_RENDER_PASSES
            );
        }
        self.render_passes_count = desc.render_passes.len().min(MAX_RENDER_PASSES) as u32;
        for (slot, pass) in self.render_passes.iter_mut().zip(&desc.render_passes) {
            slot.texture_id = pass.texture_id.0;
            slot.render_params_count = pass.render_params.len().min(MAX_RENDER_PARAMS) as u32;
            for (params_slot, params) in slot.render_params.iter_mut().zip(&pass.render_params) {
                *params_slot = XrRenderParams::from(params);
            }
            slot.culling_pass_index = pass.culling_pass_index as i32;
        }
        for (slot, pass) in self.culling_passes.iter_mut().zip(&desc.culling_passes) {
            *slot = XrCullingPass::from(pass);
        }
    }
}

impl From<&XrFrameSetupHints> for FrameSetupHints {
    fn from(hints: &XrFrameSetupHints) -> Self {
        FrameSetupHints {
            app_setup: AppSetup {
                single_pass_rendering: hints.app_setup.single_pass_rendering,
                texture_resolution_scale: hints.app_setup.texture_resolution_scale,
                render_viewport: hints.app_setup.render_viewport.into(),
            },
            changed: HintsChanged::from_bits_truncate(hints.changed_flags),
        }
    }
}

impl From<&RenderTextureDesc> for XrRenderTextureDesc {
    fn from(desc: &RenderTextureDesc) -> Self {
        XrRenderTextureDesc {
            width: desc.width,
            height: desc.height,
            texture_array_length: desc.array_length,
        }
    }
}

impl From<RenderingCapabilities> for XrRenderingCapabilities {
    fn from(caps: RenderingCapabilities) -> Self {
        XrRenderingCapabilities {
            no_single_pass_rendering_support: caps.no_single_pass_rendering_support,
            invalidate_render_state_after_each_callback: caps
                .invalidate_render_state_after_each_callback,
            skip_present_to_main_screen: caps.skip_present_to_main_screen,
        }
    }
}

impl From<XrRenderingCapabilities> for RenderingCapabilities {
    fn from(caps: XrRenderingCapabilities) -> Self {
        RenderingCapabilities {
            no_single_pass_rendering_support: caps.no_single_pass_rendering_support,
            invalidate_render_state_after_each_callback: caps
                .invalidate_render_state_after_each_callback,
            skip_present_to_main_screen: caps.skip_present_to_main_screen,
        }
    }
}

impl From<&XrMirrorViewBlitInfo> for MirrorViewBlitInfo {
    fn from(info: &XrMirrorViewBlitInfo) -> Self {
        MirrorViewBlitInfo {
            mirror_size: Size2D::new(info.width, info.height),
        }
    }
}

impl From<&BlitParams> for XrBlitParams {
    fn from(params: &BlitParams) -> Self {
        XrBlitParams {
            src_tex_id: params.source_texture.0,
            src_tex_array_slice: params.source_array_slice,
            src_rect: params.source_rect.into(),
            dest_rect: params.dest_rect.into(),
        }
    }
}

impl From<&MirrorViewBlitDesc> for XrMirrorViewBlitDesc {
    fn from(desc: &MirrorViewBlitDesc) -> Self {
        let mut out = XrMirrorViewBlitDesc {
            blit_params_count: desc.blits.len().min(MAX_BLITS) as u32,
            ..Default::default()
        };
        for (slot, params) in out.blit_params.iter_mut().zip(&desc.blits) {
            *slot = XrBlitParams::from(params);
        }
        out
    }
}

impl From<DisplayState> for XrDisplayState {
    fn from(state: DisplayState) -> Self {
        XrDisplayState {
            display_is_transparent: state.display_is_transparent,
        }
    }
}
