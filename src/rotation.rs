//! Upright correction for freshly captured sensor images.
//!
//! Sensors report how far (clockwise) the stored pixels must be turned to look
//! upright. [`normalize`] applies that rotation to the captured region and
//! returns a new bitmap sized to the rotated bounds.

use image::{
    imageops::{crop_imm, rotate180, rotate270, rotate90},
    Rgba, RgbaImage,
};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use log::debug;

/// Rotate the `width × height` region at the origin of `raw` clockwise by
/// `rotation_degrees`.
///
/// Quarter turns are exact pixel permutations. Any other angle is resampled
/// with bilinear filtering; whatever falls outside the source is transparent.
/// An empty region gives an empty image whatever the angle.
pub fn normalize(raw: &RgbaImage, rotation_degrees: i32, width: u32, height: u32) -> RgbaImage {
    let width = width.min(raw.width());
    let height = height.min(raw.height());
    if (width, height) != (raw.width(), raw.height()) {
        debug!(
            "cropping {}x{} capture to {width}x{height}",
            raw.width(),
            raw.height()
        );
    }
    if width == 0 || height == 0 {
        return RgbaImage::new(0, 0);
    }
    let region = crop_imm(raw, 0, 0, width, height).to_image();

    match rotation_degrees.rem_euclid(360) {
        0 => region,
        90 => rotate90(&region),
        180 => rotate180(&region),
        270 => rotate270(&region),
        degrees => rotate_filtered(&region, degrees as f32),
    }
}

/// Output size of a `width × height` rectangle turned by `degrees`, rounded the
/// same way the bounds of a transformed bitmap are.
pub fn rotated_size(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (w, h) = (width as f32, height as f32);
    let out_w = (w * cos.abs() + h * sin.abs()).round();
    let out_h = (w * sin.abs() + h * cos.abs()).round();
    (out_w as u32, out_h as u32)
}

fn rotate_filtered(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (src.width() as f32, src.height() as f32);

    // y points down, so a positive angle turns clockwise
    let corners = [(0., 0.), (w, 0.), (0., h), (w, h)].map(|(x, y)| (x * cos - y * sin, x * sin + y * cos));
    let left = corners.iter().map(|c| c.0).fold(f32::INFINITY, f32::min);
    let top = corners.iter().map(|c| c.1).fold(f32::INFINITY, f32::min);

    // rotate around pixel centres, then shift the bounds to the origin
    let projection = Projection::translate(-left - 0.5, -top - 0.5)
        * Projection::rotate(theta)
        * Projection::translate(0.5, 0.5);

    let (out_w, out_h) = rotated_size(src.width(), src.height(), degrees);
    let mut out = RgbaImage::new(out_w, out_h);
    warp_into(src, &projection, Interpolation::Bilinear, Rgba([0, 0, 0, 0]), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 17 % 256) as u8, (y * 29 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    #[test]
    fn zero_degrees_is_a_crop() {
        let img = gradient(8, 6);
        let out = normalize(&img, 0, 5, 4);
        assert_eq!(out.dimensions(), (5, 4));
        for (x, y, pixel) in out.enumerate_pixels() {
            assert_eq!(pixel, img.get_pixel(x, y));
        }
        assert_eq!(normalize(&img, 0, 8, 6), img);
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        // 2x1 image: red on the left, blue on the right
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));

        let out = normalize(&img, 90, 2, 1);
        assert_eq!(out.dimensions(), (1, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn ninety_then_two_seventy_restores_orientation() {
        let img = gradient(7, 3);
        let turned = normalize(&img, 90, 7, 3);
        assert_eq!(turned.dimensions(), (3, 7));
        let back = normalize(&turned, 270, turned.width(), turned.height());
        assert_eq!(back, img);
    }

    #[test]
    fn negative_and_oversized_angles_wrap() {
        let img = gradient(4, 3);
        assert_eq!(normalize(&img, -90, 4, 3), normalize(&img, 270, 4, 3));
        assert_eq!(normalize(&img, 450, 4, 3), normalize(&img, 90, 4, 3));
        assert_eq!(normalize(&img, 360, 4, 3), img);
    }

    #[test]
    fn region_is_clamped_to_the_image() {
        let img = gradient(4, 3);
        assert_eq!(normalize(&img, 180, 100, 100).dimensions(), (4, 3));
    }

    #[test]
    fn arbitrary_angle_grows_bounds() {
        assert_eq!(rotated_size(10, 10, 45.), (14, 14));
        assert_eq!(rotated_size(16, 9, 90.), (9, 16));

        let img = RgbaImage::from_pixel(10, 10, Rgba([200, 100, 50, 255]));
        let out = normalize(&img, 45, 10, 10);
        assert_eq!(out.dimensions(), (14, 14));
        // centre stays opaque source colour, corners fall outside the source
        assert_eq!(out.get_pixel(7, 7), &Rgba([200, 100, 50, 255]));
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn filtered_path_matches_quarter_turn_closely() {
        let img = gradient(6, 4);
        let exact = normalize(&img, 90, 6, 4);
        let filtered = rotate_filtered(&img, 90.);
        assert_eq!(filtered.dimensions(), exact.dimensions());
        // edge pixels may blend with the transparent surround
        let (w, h) = exact.dimensions();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let (a, b) = (exact.get_pixel(x, y), filtered.get_pixel(x, y));
                for c in 0..4 {
                    assert!((a[c] as i32 - b[c] as i32).abs() <= 1, "({x},{y}): {a:?} vs {b:?}");
                }
            }
        }
    }

    #[test]
    fn empty_region_is_empty_for_every_angle() {
        let img = gradient(4, 3);
        for degrees in [0, 45, 90, 180, 270, 300] {
            assert_eq!(normalize(&img, degrees, 0, 3).dimensions(), (0, 0), "{degrees}");
            assert_eq!(normalize(&img, degrees, 4, 0).dimensions(), (0, 0), "{degrees}");
        }
        assert_eq!(rotated_size(0, 0, 45.), (0, 0));
    }
}
