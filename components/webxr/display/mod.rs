/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The display provider: render target allocation, the per-frame pass
//! description and the mirror view.

use euclid::{Rect, Size2D, Vector3D};
use webxr_bridge_api::{
    BlitParams, CullingPass, DisplayHost, DisplayState, Error, EyePose, FrameSetupHints,
    MirrorViewBlitDesc, MirrorViewBlitInfo, NextFrameDesc, Pixels, RenderParams, RenderPass,
    RenderTextureDesc, RenderingCapabilities, Uv, ViewsData, ViewsDataSource,
};

use crate::compositor::{CompositeSource, Compositor};
use crate::prefs::{BridgePrefs, TextureLayout};
use crate::provider::{Provider, ProviderState};

pub mod mirror;
mod targets;

pub use targets::{RenderTarget, RenderTargetSet};

/// What the session looked like when the render targets were last sized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionConfig {
    pub view_count: usize,
    pub view_size: Size2D<f32, Pixels>,
    pub framebuffer_size: Size2D<f32, Pixels>,
    pub eye_separation: f32,
    pub transparent: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            view_count: 2,
            view_size: Size2D::zero(),
            framebuffer_size: Size2D::zero(),
            eye_separation: 0.0,
            transparent: false,
        }
    }
}

impl SessionConfig {
    pub fn from_views(views: &ViewsData) -> SessionConfig {
        SessionConfig {
            view_count: views.view_count,
            view_size: views.view_size,
            framebuffer_size: views.framebuffer_size,
            eye_separation: views.eye_separation(),
            transparent: views.transparent,
        }
    }
}

pub struct DisplayProvider {
    host: Box<dyn DisplayHost>,
    views: Box<dyn ViewsDataSource>,
    compositor: Box<dyn Compositor>,
    layout: TextureLayout,
    single_pass_culling_separation: f32,
    state: ProviderState,
    /// Set until the first frame after a (re)start has been skipped.
    skip_frame: bool,
    session: SessionConfig,
    /// Horizontal offset of each eye from the device anchor.
    pose_x_per_pass: [f32; 2],
    /// The last views buffer that decoded, used when a frame's read fails.
    latest_views: Option<ViewsData>,
    targets: RenderTargetSet,
}

impl DisplayProvider {
    pub fn new(
        host: Box<dyn DisplayHost>,
        views: Box<dyn ViewsDataSource>,
        compositor: Box<dyn Compositor>,
        prefs: &BridgePrefs,
    ) -> DisplayProvider {
        DisplayProvider {
            host,
            views,
            compositor,
            layout: prefs.texture_layout,
            single_pass_culling_separation: prefs.single_pass_culling_separation,
            state: ProviderState::Uninitialized,
            skip_frame: true,
            session: SessionConfig::default(),
            pose_x_per_pass: [0.0; 2],
            latest_views: None,
            targets: RenderTargetSet::default(),
        }
    }

    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    pub fn render_targets(&self) -> &RenderTargetSet {
        &self.targets
    }

    fn apply_views(&mut self, views: &ViewsData) {
        self.session = SessionConfig::from_views(views);
        self.update_pose_offsets(views);
        self.latest_views = Some(*views);
    }

    fn update_pose_offsets(&mut self, views: &ViewsData) {
        let half = if views.has_multiple_views() {
            0.5 * views.eye_separation()
        } else {
            0.0
        };
        self.pose_x_per_pass = [-half, half];
    }

    /// Read this frame's views buffer, falling back to the last good one.
    fn read_views(&mut self) -> Result<ViewsData, Error> {
        match self.views.read() {
            Ok(views) => {
                self.latest_views = Some(views);
                Ok(views)
            },
            Err(error) => match self.latest_views {
                Some(views) => {
                    log::warn!("Reusing the previous views data: {error}");
                    Ok(views)
                },
                None => Err(error),
            },
        }
    }

    fn eye_pose(&self, pass: usize) -> EyePose {
        let x = self.pose_x_per_pass.get(pass).copied().unwrap_or(0.0);
        EyePose::from_translation(Vector3D::new(x, 0.0, 0.0))
    }

    /// Called on the render thread before the first frame.
    pub fn gfx_start(&mut self, caps: &mut RenderingCapabilities) -> Result<(), Error> {
        caps.no_single_pass_rendering_support = true;
        caps.invalidate_render_state_after_each_callback = false;
        caps.skip_present_to_main_screen = self.compositor.owns_presentation();
        self.compositor.prepare()
    }

    /// Describe the passes the host renders next frame.
    pub fn populate_next_frame_desc(
        &mut self,
        hints: &FrameSetupHints,
        next_frame: &mut NextFrameDesc,
    ) -> Result<(), Error> {
        // The host is not ready to render on the first frame after a start.
        if self.skip_frame {
            self.skip_frame = false;
            log::trace!("Skipping the first frame");
            return Ok(());
        }

        let views = self.read_views()?;
        self.update_pose_offsets(&views);

        // Per-view multi-pass keeps one texture per view.
        let view_count_changed = views.view_count != self.session.view_count;
        let per_view_count_changed = view_count_changed &&
            self.layout == TextureLayout::PerView &&
            !hints.app_setup.single_pass_rendering;
        if self.targets.is_empty() || hints.invalidates_render_targets() || per_view_count_changed
        {
            self.apply_views(&views);
            self.reallocate(hints)?;
        } else if view_count_changed {
            log::debug!(
                "View count changed from {} to {}",
                self.session.view_count,
                views.view_count
            );
            self.session.view_count = views.view_count;
        }

        next_frame.clear();
        if hints.app_setup.single_pass_rendering {
            self.describe_single_pass(hints, &views, next_frame)
        } else {
            self.describe_multi_pass(hints, &views, next_frame)
        }
    }

    fn reallocate(&mut self, hints: &FrameSetupHints) -> Result<(), Error> {
        self.targets.destroy(self.host.as_mut());

        let single_pass = hints.app_setup.single_pass_rendering;
        let (count, array_length, base_size) = match self.layout {
            TextureLayout::SideBySide => (1, 0, self.session.framebuffer_size),
            TextureLayout::PerView if single_pass => (1, 2, self.session.view_size),
            TextureLayout::PerView => (self.session.view_count, 0, self.session.view_size),
        };
        let size = scaled_texture_size(base_size, hints.app_setup.texture_resolution_scale);
        let desc = RenderTextureDesc {
            width: size.width,
            height: size.height,
            array_length,
        };
        log::debug!(
            "Allocating {count} render target(s) for {} rendering: {desc:?}",
            if single_pass { "single-pass" } else { "multi-pass" },
        );

        match RenderTargetSet::create(self.host.as_mut(), count, &desc) {
            Ok(targets) => {
                self.targets = targets;
                Ok(())
            },
            Err(error) => {
                log::warn!("Render target allocation failed, retrying next frame: {error}");
                Err(error)
            },
        }
    }

    fn describe_multi_pass(
        &self,
        hints: &FrameSetupHints,
        views: &ViewsData,
        next_frame: &mut NextFrameDesc,
    ) -> Result<(), Error> {
        let pass_count = views.view_count.clamp(1, 2);
        let separation = self.pose_x_per_pass[0].abs() + self.pose_x_per_pass[1].abs();
        for pass in 0..pass_count {
            let target = match self.layout {
                TextureLayout::SideBySide => self.targets.first(),
                TextureLayout::PerView => self.targets.get(pass).or(self.targets.first()),
            }
            .ok_or(Error::NotReady)?;
            let viewport = match self.layout {
                TextureLayout::SideBySide if pass_count == 1 => mirror::full_uv(),
                TextureLayout::SideBySide if pass == 0 => mirror::left_half_uv(),
                TextureLayout::SideBySide => mirror::right_half_uv(),
                TextureLayout::PerView => hints.app_setup.render_viewport,
            };
            let eye_pose = self.eye_pose(pass);
            let projection = views.projection(pass);

            next_frame.render_passes.push(RenderPass {
                texture_id: target.id,
                render_params: vec![RenderParams {
                    eye_pose,
                    projection,
                    viewport,
                    texture_array_slice: 0,
                }],
                culling_pass_index: pass,
            });
            next_frame.culling_passes.push(CullingPass {
                culling_pose: eye_pose,
                projection,
                separation,
            });
        }
        Ok(())
    }

    fn describe_single_pass(
        &self,
        hints: &FrameSetupHints,
        views: &ViewsData,
        next_frame: &mut NextFrameDesc,
    ) -> Result<(), Error> {
        let target = self.targets.first().ok_or(Error::NotReady)?;
        let render_params = (0..2)
            .map(|eye| {
                let (viewport, texture_array_slice) = match self.layout {
                    TextureLayout::SideBySide if eye == 0 => (mirror::left_half_uv(), 0),
                    TextureLayout::SideBySide => (mirror::right_half_uv(), 0),
                    TextureLayout::PerView => (hints.app_setup.render_viewport, eye as u32),
                };
                RenderParams {
                    eye_pose: self.eye_pose(eye),
                    projection: views.projection(eye),
                    viewport,
                    texture_array_slice,
                }
            })
            .collect();

        next_frame.render_passes.push(RenderPass {
            texture_id: target.id,
            render_params,
            culling_pass_index: 0,
        });
        next_frame.culling_passes.push(CullingPass {
            culling_pose: self.eye_pose(0),
            projection: views.projection(0),
            separation: self.single_pass_culling_separation,
        });
        Ok(())
    }

    /// Where each eye image lives: its target, the array layer to read and
    /// the region of the output it belongs to. A side-by-side texture holds
    /// both eyes and is a single region covering the whole output.
    fn eye_regions(&self) -> Vec<(&RenderTarget, Option<u32>, Rect<f32, Uv>)> {
        let halves = [mirror::left_half_uv(), mirror::right_half_uv()];
        if self.targets.len() >= 2 {
            return self
                .targets
                .iter()
                .zip(halves)
                .map(|(target, dest_rect)| (target, None, dest_rect))
                .collect();
        }
        match self.targets.first() {
            Some(target) if target.array_length >= 2 => (0..2)
                .zip(halves)
                .map(|(layer, dest_rect)| (target, Some(layer), dest_rect))
                .collect(),
            Some(target) => vec![(target, None, mirror::full_uv())],
            None => Vec::new(),
        }
    }

    /// Present the frame the host just rendered.
    pub fn gfx_submit_current_frame(&mut self) -> Result<(), Error> {
        let sources: Vec<CompositeSource> = self
            .eye_regions()
            .into_iter()
            .map(|(target, array_layer, dest_rect)| CompositeSource {
                native_texture: self.host.native_texture(target.id),
                size: target.size,
                array_layer,
                dest_rect,
            })
            .collect();
        if sources.is_empty() {
            return Ok(());
        }
        let framebuffer = self.session.framebuffer_size;
        let framebuffer_size = Size2D::new(framebuffer.width as i32, framebuffer.height as i32);
        self.compositor.composite(&sources, framebuffer_size)
    }

    pub fn gfx_stop(&mut self) -> Result<(), Error> {
        self.skip_frame = true;
        Ok(())
    }

    /// The host blits the mirror view itself from the descriptor; there is
    /// nothing to draw into its back buffer.
    pub fn gfx_blit_to_mirror_view_render_target(
        &mut self,
        _info: &MirrorViewBlitInfo,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Describe how the host copies the eye textures into its mirror window.
    pub fn query_mirror_view_blit_desc(
        &self,
        info: &MirrorViewBlitInfo,
        desc: &mut MirrorViewBlitDesc,
    ) -> Result<(), Error> {
        if self.targets.is_empty() {
            return Err(Error::NotReady);
        }

        desc.blits = self
            .eye_regions()
            .into_iter()
            .map(|(target, layer, dest_rect)| mirror_blit(target, layer, dest_rect, info))
            .collect();
        Ok(())
    }

    pub fn update_display_state(&mut self, state: &mut DisplayState) -> Result<(), Error> {
        state.display_is_transparent = match self.views.read() {
            Ok(views) => views.transparent,
            Err(_) => self.session.transparent,
        };
        Ok(())
    }

    fn release(&mut self) {
        self.compositor.release();
        self.targets.destroy(self.host.as_mut());
        self.skip_frame = true;
    }
}

fn mirror_blit(
    target: &RenderTarget,
    layer: Option<u32>,
    dest_rect: Rect<f32, Uv>,
    info: &MirrorViewBlitInfo,
) -> BlitParams {
    let source_rect = mirror::crop_to_aspect(
        target.size.cast::<f32>(),
        mirror::full_uv(),
        info.mirror_size,
        dest_rect,
    );
    BlitParams {
        source_texture: target.id,
        source_array_slice: layer.unwrap_or(0),
        source_rect,
        dest_rect,
    }
}

/// The pixel size of a render target: `base` times `scale`, truncated, and
/// at least one pixel on each side. A non-positive scale means "unscaled".
pub fn scaled_texture_size(base: Size2D<f32, Pixels>, scale: f32) -> Size2D<u32, Pixels> {
    let scale = if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    };
    let dimension = |value: f32| ((value * scale) as u32).max(1);
    Size2D::new(dimension(base.width), dimension(base.height))
}

impl Provider for DisplayProvider {
    fn initialize(&mut self) -> Result<(), Error> {
        self.state = ProviderState::Initialized;
        Ok(())
    }

    fn start(&mut self) -> Result<(), Error> {
        match self.views.read() {
            Ok(views) => self.apply_views(&views),
            Err(error) => log::warn!("Starting without views data: {error}"),
        }
        self.state = ProviderState::Started;
        Ok(())
    }

    fn stop(&mut self) {
        self.release();
        if self.state != ProviderState::Shutdown {
            self.state = ProviderState::Stopped;
        }
    }

    fn shutdown(&mut self) {
        self.release();
        self.state = ProviderState::Shutdown;
    }

    fn state(&self) -> ProviderState {
        self.state
    }
}
