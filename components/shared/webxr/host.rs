/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::Error;
use crate::InputDeviceId;
use crate::RenderTextureDesc;
use crate::RenderTextureId;

/// The host's display subsystem, as seen by the display provider.
pub trait DisplayHost {
    /// Ask the host to create a render texture it will render into.
    fn create_texture(&mut self, desc: &RenderTextureDesc) -> Result<RenderTextureId, Error>;

    fn destroy_texture(&mut self, id: RenderTextureId);

    /// The native GPU object backing a host texture, if the host exposes it.
    fn native_texture(&self, _id: RenderTextureId) -> Option<u32> {
        None
    }
}

/// The host's input subsystem, as seen by the tracking provider.
pub trait InputHost {
    fn device_connected(&mut self, id: InputDeviceId);
    fn device_disconnected(&mut self, id: InputDeviceId);
}
