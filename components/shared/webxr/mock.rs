/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Synthetic views buffers, for exercising the providers without a browser.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Error;
use crate::ViewsData;
use crate::ViewsDataSource;
use crate::VIEWS_DATA_LEN;
use crate::views::offsets;

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Builds a views buffer the way the page-side driver lays it out.
#[derive(Clone, Debug)]
pub struct MockViewsData {
    buffer: [f32; VIEWS_DATA_LEN],
}

impl MockViewsData {
    /// A headset session: two views, eyes 64mm apart, side by side in a
    /// 2 × 841 × 706 framebuffer.
    pub fn stereo() -> MockViewsData {
        let mut mock = MockViewsData {
            buffer: [0.0; VIEWS_DATA_LEN],
        };
        mock.set_views(2);
        mock.with_projection(0, IDENTITY)
            .with_projection(1, IDENTITY)
            .with_head_orientation([0.0, 0.0, 0.0, 1.0])
            .with_eye_positions([-0.032, 0.0, 0.0], [0.032, 0.0, 0.0])
            .with_view_size(841.0, 706.0)
            .with_framebuffer_size(1682.0, 706.0)
    }

    /// A handheld session: one view covering the whole framebuffer.
    pub fn mono() -> MockViewsData {
        let mut mock = MockViewsData::stereo()
            .with_eye_positions([0.0, 0.0, 0.0], [0.0, 0.0, 0.0])
            .with_framebuffer_size(841.0, 706.0);
        mock.set_views(1);
        mock
    }

    fn set_views(&mut self, count: usize) {
        self.buffer[offsets::VIEW_COUNT] = count as f32;
    }

    pub fn with_projection(mut self, view: usize, matrix: [f32; 16]) -> MockViewsData {
        let start = offsets::PROJECTION_MATRICES + view * offsets::MATRIX_LEN;
        self.buffer[start..start + offsets::MATRIX_LEN].copy_from_slice(&matrix);
        self
    }

    pub fn with_head_orientation(mut self, quaternion: [f32; 4]) -> MockViewsData {
        let start = offsets::HEAD_ORIENTATION;
        self.buffer[start..start + 4].copy_from_slice(&quaternion);
        self.buffer[offsets::SECOND_VIEW_ORIENTATION..offsets::SECOND_VIEW_ORIENTATION + 4]
            .copy_from_slice(&quaternion);
        self
    }

    pub fn with_eye_positions(mut self, left: [f32; 3], right: [f32; 3]) -> MockViewsData {
        let start = offsets::LEFT_EYE_POSITION;
        self.buffer[start..start + 3].copy_from_slice(&left);
        let start = offsets::RIGHT_EYE_POSITION;
        self.buffer[start..start + 3].copy_from_slice(&right);
        self
    }

    pub fn with_view_size(mut self, width: f32, height: f32) -> MockViewsData {
        self.buffer[offsets::VIEW_SIZE] = width;
        self.buffer[offsets::VIEW_SIZE + 1] = height;
        self
    }

    pub fn with_framebuffer_size(mut self, width: f32, height: f32) -> MockViewsData {
        self.buffer[offsets::FRAMEBUFFER_SIZE] = width;
        self.buffer[offsets::FRAMEBUFFER_SIZE + 1] = height;
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> MockViewsData {
        self.buffer[offsets::TRANSPARENT] = if transparent { 1.0 } else { 0.0 };
        self
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.buffer
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.buffer.to_vec()
    }
}

/// A views source whose buffer can be swapped between frames, standing in
/// for the page-side driver. Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct MockViewsSource {
    buffer: Rc<RefCell<Option<Vec<f32>>>>,
}

impl MockViewsSource {
    pub fn new(views: MockViewsData) -> MockViewsSource {
        let source = MockViewsSource::default();
        source.publish(views);
        source
    }

    /// Replace the buffer, as the driver does before each frame.
    pub fn publish(&self, views: MockViewsData) {
        *self.buffer.borrow_mut() = Some(views.into_vec());
    }

    /// Publish a raw buffer, which may be malformed.
    pub fn publish_raw(&self, buffer: Vec<f32>) {
        *self.buffer.borrow_mut() = Some(buffer);
    }

    /// Drop the buffer, as happens before the session starts.
    pub fn withdraw(&self) {
        *self.buffer.borrow_mut() = None;
    }
}

impl ViewsDataSource for MockViewsSource {
    fn read(&self) -> Result<ViewsData, Error> {
        match *self.buffer.borrow() {
            Some(ref buffer) => ViewsData::decode(buffer),
            None => Err(Error::ViewsDataUnavailable),
        }
    }
}
