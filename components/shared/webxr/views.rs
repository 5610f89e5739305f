/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The views buffer the browser session publishes once per frame.
//!
//! The buffer is a flat array of floats laid out by the page-side driver:
//!
//! | offset | contents |
//! |---|---|
//! | 0..16 | projection matrix of view 0, column major |
//! | 16..32 | projection matrix of view 1 |
//! | 32..36 | head orientation quaternion (x, y, z, w) |
//! | 36..40 | orientation of view 1 |
//! | 40..43 | left eye position |
//! | 43..46 | right eye position |
//! | 46..48 | per-eye viewport width and height |
//! | 48..54 | browser viewport rectangles |
//! | 54 | view count |
//! | 55 | transparent background flag |
//! | 56..58 | framebuffer width and height |

use euclid::{Rotation3D, Size2D, Transform3D, Vector3D};

use crate::Display;
use crate::Error;
use crate::Eye;
use crate::Native;
use crate::Pixels;
use crate::Projection;

pub const VIEWS_DATA_LEN: usize = 58;

pub(crate) mod offsets {
    pub const PROJECTION_MATRICES: usize = 0;
    pub const MATRIX_LEN: usize = 16;
    pub const HEAD_ORIENTATION: usize = 32;
    pub const SECOND_VIEW_ORIENTATION: usize = 36;
    pub const LEFT_EYE_POSITION: usize = 40;
    pub const RIGHT_EYE_POSITION: usize = 43;
    pub const VIEW_SIZE: usize = 46;
    pub const VIEW_COUNT: usize = 54;
    pub const TRANSPARENT: usize = 55;
    pub const FRAMEBUFFER_SIZE: usize = 56;
}

/// A decoded snapshot of the views buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewsData {
    pub projections: [Transform3D<f32, Eye, Display>; 2],
    pub head_orientation: Rotation3D<f32, Native, Native>,
    pub second_view_orientation: Rotation3D<f32, Native, Native>,
    /// Left and right eye positions, in that order.
    pub eye_positions: [Vector3D<f32, Native>; 2],
    pub view_size: Size2D<f32, Pixels>,
    /// Either 1 (mono) or 2 (stereo).
    pub view_count: usize,
    pub transparent: bool,
    pub framebuffer_size: Size2D<f32, Pixels>,
}

impl ViewsData {
    /// Decode the fixed layout, rejecting buffers that are too short.
    pub fn decode(buffer: &[f32]) -> Result<ViewsData, Error> {
        if buffer.len() < VIEWS_DATA_LEN {
            return Err(Error::ViewsDataTooShort {
                len: buffer.len(),
                expected: VIEWS_DATA_LEN,
            });
        }

        // The matrices are copied in the producer's order. Do not transpose
        // here without checking the page-side layout first.
        let matrix = |view: usize| {
            let start = offsets::PROJECTION_MATRICES + view * offsets::MATRIX_LEN;
            let mut columns = [0.0; 16];
            columns.copy_from_slice(&buffer[start..start + offsets::MATRIX_LEN]);
            Transform3D::from_array(columns)
        };
        let quaternion = |start: usize| {
            Rotation3D::quaternion(
                buffer[start],
                buffer[start + 1],
                buffer[start + 2],
                buffer[start + 3],
            )
        };
        let vector = |start: usize| Vector3D::new(buffer[start], buffer[start + 1], buffer[start + 2]);
        let size = |start: usize| Size2D::new(buffer[start], buffer[start + 1]);

        Ok(ViewsData {
            projections: [matrix(0), matrix(1)],
            head_orientation: quaternion(offsets::HEAD_ORIENTATION),
            second_view_orientation: quaternion(offsets::SECOND_VIEW_ORIENTATION),
            eye_positions: [
                vector(offsets::LEFT_EYE_POSITION),
                vector(offsets::RIGHT_EYE_POSITION),
            ],
            view_size: size(offsets::VIEW_SIZE),
            view_count: if buffer[offsets::VIEW_COUNT] > 1.0 { 2 } else { 1 },
            transparent: buffer[offsets::TRANSPARENT] > 0.0,
            framebuffer_size: size(offsets::FRAMEBUFFER_SIZE),
        })
    }

    pub fn has_multiple_views(&self) -> bool {
        self.view_count > 1
    }

    /// Distance between the two eye positions.
    pub fn eye_separation(&self) -> f32 {
        (self.eye_positions[1] - self.eye_positions[0]).length()
    }

    /// The midpoint between the eyes in stereo, the single eye otherwise.
    pub fn center_eye_position(&self) -> Vector3D<f32, Native> {
        if self.has_multiple_views() {
            self.eye_positions[0].lerp(self.eye_positions[1], 0.5)
        } else {
            self.eye_positions[0]
        }
    }

    /// The projection of `view`, clamped to the views that exist in the buffer.
    pub fn projection(&self, view: usize) -> Projection {
        Projection::Matrix(self.projections[view.min(1)])
    }
}

/// Where the views buffer comes from. Implementations read the buffer afresh
/// on every call; nothing is cached across frames.
pub trait ViewsDataSource {
    fn read(&self) -> Result<ViewsData, Error>;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::MockViewsData;

    #[test]
    fn test_short_buffer_is_rejected() {
        let buffer = [0.0; VIEWS_DATA_LEN - 1];
        assert_eq!(
            ViewsData::decode(&buffer),
            Err(Error::ViewsDataTooShort {
                len: VIEWS_DATA_LEN - 1,
                expected: VIEWS_DATA_LEN
            })
        );
    }

    #[test]
    fn test_eye_separation() {
        let buffer = MockViewsData::stereo()
            .with_eye_positions([-0.03, 0.0, 0.0], [0.03, 0.0, 0.0])
            .into_vec();
        let views = ViewsData::decode(&buffer).unwrap();
        assert!((views.eye_separation() - 0.06).abs() < 1e-6);
        assert_eq!(views.center_eye_position(), Vector3D::zero());
    }

    #[test]
    fn test_session_fields() {
        let buffer = MockViewsData::mono()
            .with_view_size(800.0, 600.0)
            .with_framebuffer_size(800.0, 600.0)
            .with_transparent(true)
            .with_eye_positions([0.1, 1.6, 0.0], [0.0, 0.0, 0.0])
            .into_vec();
        let views = ViewsData::decode(&buffer).unwrap();
        assert_eq!(views.view_count, 1);
        assert!(views.transparent);
        assert_eq!(views.view_size, Size2D::new(800.0, 600.0));
        assert_eq!(views.center_eye_position(), Vector3D::new(0.1, 1.6, 0.0));
    }

    #[test]
    fn test_projection_keeps_producer_order() {
        let mut matrix = [0.0; 16];
        for (i, value) in matrix.iter_mut().enumerate() {
            *value = i as f32;
        }
        let buffer = MockViewsData::stereo().with_projection(1, matrix).into_vec();
        let views = ViewsData::decode(&buffer).unwrap();
        assert_eq!(views.projections[1].to_array(), matrix);
        assert_eq!(views.projection(5), Projection::Matrix(views.projections[1]));
    }
}
