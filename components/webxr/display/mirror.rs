/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Mirror view geometry.

use euclid::{Point2D, Rect, Size2D};
use webxr_bridge_api::{Pixels, Uv};

pub fn full_uv() -> Rect<f32, Uv> {
    Rect::new(Point2D::zero(), Size2D::new(1.0, 1.0))
}

pub fn left_half_uv() -> Rect<f32, Uv> {
    Rect::new(Point2D::zero(), Size2D::new(0.5, 1.0))
}

pub fn right_half_uv() -> Rect<f32, Uv> {
    Rect::new(Point2D::new(0.5, 0.0), Size2D::new(0.5, 1.0))
}

/// Crop `source_uv` of a `source_size` texture so that it fills `dest_uv` of a
/// `dest_size` window without distortion. The crop is centered on the
/// source region. Degenerate sizes leave the source region as it is.
pub fn crop_to_aspect(
    source_size: Size2D<f32, Pixels>,
    source_uv: Rect<f32, Uv>,
    dest_size: Size2D<f32, Pixels>,
    dest_uv: Rect<f32, Uv>,
) -> Rect<f32, Uv> {
    let source = Size2D::<f32, Pixels>::new(
        source_size.width * source_uv.size.width,
        source_size.height * source_uv.size.height,
    );
    let dest = Size2D::<f32, Pixels>::new(
        dest_size.width * dest_uv.size.width,
        dest_size.height * dest_uv.size.height,
    );
    if source.width <= 0.0 || source.height <= 0.0 || dest.width <= 0.0 || dest.height <= 0.0 {
        return source_uv;
    }

    let ratio = (source.width / source.height) / (dest.width / dest.height);
    let center = source_uv.center();
    let mut size = source_uv.size;
    if ratio > 1.0 {
        size.width /= ratio;
    } else {
        size.height *= ratio;
    }
    Rect::new(
        Point2D::new(center.x - size.width * 0.5, center.y - size.height * 0.5),
        size,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_wide_source_into_square_crops_width() {
        let crop = crop_to_aspect(
            Size2D::new(841.0, 706.0),
            full_uv(),
            Size2D::new(400.0, 400.0),
            full_uv(),
        );
        assert!(approx(crop.size.width, 706.0 / 841.0));
        assert!(approx(crop.size.height, 1.0));
        assert!(approx(crop.origin.x, (1.0 - 706.0 / 841.0) / 2.0));
        assert!(approx(crop.origin.y, 0.0));
    }

    #[test]
    fn test_source_into_tall_window_crops_width() {
        let crop = crop_to_aspect(
            Size2D::new(841.0, 706.0),
            full_uv(),
            Size2D::new(500.0, 1000.0),
            full_uv(),
        );
        assert!(crop.size.width < 1.0);
        assert!(approx(crop.size.height, 1.0));
    }

    #[test]
    fn test_source_into_wide_window_crops_height() {
        let crop = crop_to_aspect(
            Size2D::new(841.0, 706.0),
            full_uv(),
            Size2D::new(1000.0, 500.0),
            full_uv(),
        );
        assert!(approx(crop.size.width, 1.0));
        assert!(crop.size.height < 1.0);
        assert!(approx(crop.origin.y, (1.0 - crop.size.height) / 2.0));
    }

    #[test]
    fn test_crop_stays_inside_half_source() {
        let crop = crop_to_aspect(
            Size2D::new(1682.0, 706.0),
            right_half_uv(),
            Size2D::new(400.0, 400.0),
            left_half_uv(),
        );
        assert!(crop.min_x() >= 0.5);
        assert!(crop.max_x() <= 1.0);
        assert!(approx(crop.center().x, 0.75));
    }

    #[test]
    fn test_degenerate_sizes_keep_source() {
        let crop = crop_to_aspect(Size2D::zero(), full_uv(), Size2D::new(400.0, 400.0), full_uv());
        assert_eq!(crop, full_uv());
        let crop = crop_to_aspect(Size2D::new(841.0, 706.0), full_uv(), Size2D::zero(), full_uv());
        assert_eq!(crop, full_uv());
    }
}
