/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Presentation of a completed frame.

use euclid::{Rect, Size2D};
use webxr_bridge_api::{Error, Pixels, Uv};

#[cfg(feature = "gl")]
mod gl;

#[cfg(feature = "gl")]
pub use gl::GlCompositor;

/// One eye image the host rendered, and where it goes in the presented frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositeSource {
    /// The GPU name of the texture, when the host exposes it.
    pub native_texture: Option<u32>,
    pub size: Size2D<u32, Pixels>,
    /// The layer to sample when the texture is a 2D array.
    pub array_layer: Option<u32>,
    /// The region of the presented frame this source fills.
    pub dest_rect: Rect<f32, Uv>,
}

/// Turns the rendered eye textures into the presented frame.
pub trait Compositor {
    /// Whether the bridge presents the frame, so the host should skip its
    /// own present to the main screen.
    fn owns_presentation(&self) -> bool;

    /// Create long-lived GPU resources. Called on the render thread.
    fn prepare(&mut self) -> Result<(), Error>;

    fn composite(
        &mut self,
        sources: &[CompositeSource],
        target_size: Size2D<i32, Pixels>,
    ) -> Result<(), Error>;

    /// Delete GPU resources. Safe to call repeatedly.
    fn release(&mut self);
}

/// Leaves presentation to the host.
#[derive(Debug, Default)]
pub struct HostCompositor;

impl Compositor for HostCompositor {
    fn owns_presentation(&self) -> bool {
        false
    }

    fn prepare(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn composite(&mut self, _: &[CompositeSource], _: Size2D<i32, Pixels>) -> Result<(), Error> {
        Ok(())
    }

    fn release(&mut self) {}
}
