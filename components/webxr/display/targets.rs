/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use euclid::Size2D;
use webxr_bridge_api::{DisplayHost, Error, Pixels, RenderTextureDesc, RenderTextureId};

/// A host texture the provider renders eyes into.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderTarget {
    pub id: RenderTextureId,
    pub size: Size2D<u32, Pixels>,
    /// Zero for a plain 2D texture.
    pub array_length: u32,
}

/// The render targets of the current pass mode, created and destroyed as a unit.
#[derive(Debug, Default)]
pub struct RenderTargetSet {
    targets: Vec<RenderTarget>,
}

impl RenderTargetSet {
    /// Ask the host for `count` textures matching `desc`. If any creation
    /// fails the textures created so far are destroyed and the set is empty.
    pub fn create(
        host: &mut dyn DisplayHost,
        count: usize,
        desc: &RenderTextureDesc,
    ) -> Result<RenderTargetSet, Error> {
        let mut set = RenderTargetSet {
            targets: Vec::with_capacity(count),
        };
        for _ in 0..count {
            let id = match host.create_texture(desc) {
                Ok(id) if id.is_valid() => id,
                Ok(_) => {
                    set.destroy(host);
                    return Err(Error::TextureAllocation(
                        "host returned the null texture".to_owned(),
                    ));
                },
                Err(error) => {
                    set.destroy(host);
                    return Err(error);
                },
            };
            log::debug!(
                "Created render texture {:?} ({}x{}, {} layers)",
                id,
                desc.width,
                desc.height,
                desc.array_length
            );
            set.targets.push(RenderTarget {
                id,
                size: Size2D::new(desc.width, desc.height),
                array_length: desc.array_length,
            });
        }
        Ok(set)
    }

    pub fn destroy(&mut self, host: &mut dyn DisplayHost) {
        for target in self.targets.drain(..) {
            host.destroy_texture(target.id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn first(&self) -> Option<&RenderTarget> {
        self.targets.first()
    }

    pub fn get(&self, index: usize) -> Option<&RenderTarget> {
        self.targets.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderTarget> {
        self.targets.iter()
    }
}
