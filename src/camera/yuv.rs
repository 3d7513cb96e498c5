use anyhow::{anyhow, Result};
use image::RgbaImage;

/// Borrowed planes of a YUV_420_888 frame as the image reader hands them out.
/// U and V may be interleaved (pixel stride 2) or planar (pixel stride 1).
pub struct Yuv420Planes<'a> {
    pub width: u32,
    pub height: u32,
    pub y: &'a [u8],
    pub u: &'a [u8],
    pub v: &'a [u8],
    pub y_row_stride: usize,
    pub uv_row_stride: usize,
    pub uv_pixel_stride: usize,
}

/// YUV420 → RGBA, BT.601 limited range, fixed point.
pub fn yuv420_to_rgba(planes: &Yuv420Planes) -> Result<RgbaImage> {
    let (width, height) = (planes.width as usize, planes.height as usize);
    if width == 0 || height == 0 {
        return Err(anyhow!("empty frame"));
    }
    let y_needed = (height - 1) * planes.y_row_stride + width;
    let uv_needed = ((height - 1) / 2) * planes.uv_row_stride
        + ((width - 1) / 2) * planes.uv_pixel_stride
        + 1;
    if planes.y.len() < y_needed || planes.u.len() < uv_needed || planes.v.len() < uv_needed {
        return Err(anyhow!(
            "plane data too short for {width}x{height}: y={} u={} v={}",
            planes.y.len(),
            planes.u.len(),
            planes.v.len()
        ));
    }

    let mut rgba = Vec::with_capacity(width * height * 4);
    for row in 0..height {
        let y_row = &planes.y[row * planes.y_row_stride..];
        let uv_row = (row >> 1) * planes.uv_row_stride;
        for col in 0..width {
            let uv = uv_row + (col >> 1) * planes.uv_pixel_stride;
            let y = (y_row[col] as i32 - 16).max(0);
            let u = planes.u[uv] as i32 - 128;
            let v = planes.v[uv] as i32 - 128;
            rgba.extend_from_slice(&[
                clamp_channel(1192 * y + 1634 * v),
                clamp_channel(1192 * y - 833 * v - 400 * u),
                clamp_channel(1192 * y + 2066 * u),
                255,
            ]);
        }
    }

    RgbaImage::from_raw(planes.width, planes.height, rgba)
        .ok_or_else(|| anyhow!("rgba buffer size mismatch"))
}

fn clamp_channel(value: i32) -> u8 {
    ((value.clamp(0, 262143) >> 10) & 0xff) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_chroma_is_grey() {
        let y = vec![126u8; 4 * 2];
        let uv = vec![128u8; 2];
        let planes = Yuv420Planes {
            width: 4,
            height: 2,
            y: &y,
            u: &uv,
            v: &uv,
            y_row_stride: 4,
            uv_row_stride: 2,
            uv_pixel_stride: 1,
        };
        let img = yuv420_to_rgba(&planes).unwrap();
        for pixel in img.pixels() {
            assert_eq!(pixel.0, [128, 128, 128, 255]);
        }
    }

    #[test]
    fn black_and_white_levels() {
        let y = [16u8, 235, 16, 235];
        let uv = [128u8];
        let planes = Yuv420Planes {
            width: 2,
            height: 2,
            y: &y,
            u: &uv,
            v: &uv,
            y_row_stride: 2,
            uv_row_stride: 1,
            uv_pixel_stride: 1,
        };
        let img = yuv420_to_rgba(&planes).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 0).0, [254, 254, 254, 255]);
    }

    #[test]
    fn interleaved_chroma_with_row_padding() {
        // 2x2 frame, y rows padded to 4 bytes, VU interleaved like NV21
        let y = [100u8, 100, 0, 0, 100, 100];
        let vu = [200u8, 60];
        let planes = Yuv420Planes {
            width: 2,
            height: 2,
            y: &y,
            u: &vu[1..],
            v: &vu[..1],
            y_row_stride: 4,
            uv_row_stride: 2,
            uv_pixel_stride: 2,
        };
        let img = yuv420_to_rgba(&planes).unwrap();
        let first = img.get_pixel(0, 0).0;
        assert!(img.pixels().all(|p| p.0 == first));
        // strong V, weak U: red dominates blue
        assert!(first[0] > first[2]);
    }

    #[test]
    fn short_planes_are_rejected() {
        let y = [0u8; 3];
        let uv = [128u8];
        let planes = Yuv420Planes {
            width: 2,
            height: 2,
            y: &y,
            u: &uv,
            v: &uv,
            y_row_stride: 2,
            uv_row_stride: 1,
            uv_pixel_stride: 1,
        };
        assert!(yuv420_to_rgba(&planes).is_err());
    }
}
