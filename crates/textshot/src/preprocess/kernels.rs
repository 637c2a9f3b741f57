//! Pixel kernels for the preprocessing pipeline.
//!
//! All kernels operate on tightly packed RGBA data and leave the alpha
//! channel untouched. Neighborhood kernels clamp at the image edges, so the
//! full buffer including the border ring is processed.

/// Bilinear resample to `round(width * scale) x round(height * scale)`.
///
/// Returns the resampled buffer with its new dimensions. `scale` must
/// already be clamped by the caller; a scale of exactly 1.0 is a copy.
pub fn resample_bilinear(data: &[u8], width: u32, height: u32, scale: f32) -> (Vec<u8>, u32, u32) {
    if (scale - 1.0).abs() < f32::EPSILON {
        return (data.to_vec(), width, height);
    }

    let new_width = ((width as f32 * scale).round() as u32).max(1);
    let new_height = ((height as f32 * scale).round() as u32).max(1);

    let w = width as usize;
    let h = height as usize;
    let nw = new_width as usize;
    let nh = new_height as usize;
    let mut result = vec![0u8; nw * nh * 4];

    for ny in 0..nh {
        for nx in 0..nw {
            let src_x = nx as f32 / scale;
            let src_y = ny as f32 / scale;

            let x0 = (src_x.floor() as usize).min(w - 1);
            let y0 = (src_y.floor() as usize).min(h - 1);
            let x1 = (x0 + 1).min(w - 1);
            let y1 = (y0 + 1).min(h - 1);

            let x_weight = src_x - src_x.floor();
            let y_weight = src_y - src_y.floor();

            let dst = (ny * nw + nx) * 4;
            for c in 0..4 {
                let p00 = data[(y0 * w + x0) * 4 + c] as f32;
                let p10 = data[(y0 * w + x1) * 4 + c] as f32;
                let p01 = data[(y1 * w + x0) * 4 + c] as f32;
                let p11 = data[(y1 * w + x1) * 4 + c] as f32;

                let top = p00 * (1.0 - x_weight) + p10 * x_weight;
                let bottom = p01 * (1.0 - x_weight) + p11 * x_weight;
                let value = top * (1.0 - y_weight) + bottom * y_weight;

                result[dst + c] = value.clamp(0.0, 255.0).round() as u8;
            }
        }
    }

    (result, new_width, new_height)
}

/// Weighted grayscale using ITU-R BT.709 luma coefficients, which keep
/// printed text separated from paper better than equal-weight averaging.
pub fn grayscale(data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(4) {
        let gray = 0.2126 * chunk[0] as f32 + 0.7152 * chunk[1] as f32 + 0.0722 * chunk[2] as f32;
        let gray = gray.round().clamp(0.0, 255.0) as u8;
        chunk[0] = gray;
        chunk[1] = gray;
        chunk[2] = gray;
    }
}

/// 3x3 median filter per color channel, with edge clamping.
pub fn median_denoise(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut result = data.to_vec();

    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let mut neighbors = [0u8; 9];
                let mut n = 0;
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as usize;
                        let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as usize;
                        neighbors[n] = data[(sy * w + sx) * 4 + c];
                        n += 1;
                    }
                }
                neighbors.sort_unstable();
                result[(y * w + x) * 4 + c] = neighbors[4];
            }
        }
    }

    result
}

/// Contrast stretch around the image's mean brightness.
///
/// `contrast` is the user-facing factor in `[0.5, 2.0]`; the classic
/// 259-based transfer curve maps it to a pixel-space gain. The mean is
/// computed over all three channels.
pub fn contrast(data: &mut [u8], contrast: f32) {
    let mut sum = 0u64;
    let mut count = 0u64;
    for chunk in data.chunks_exact(4) {
        sum += chunk[0] as u64 + chunk[1] as u64 + chunk[2] as u64;
        count += 3;
    }
    if count == 0 {
        return;
    }
    let mean = sum as f32 / count as f32;

    let c = contrast * 100.0;
    let factor = (259.0 * (c + 255.0)) / (255.0 * (259.0 - c));

    for chunk in data.chunks_exact_mut(4) {
        for px in chunk.iter_mut().take(3) {
            let adjusted = factor * (*px as f32 - mean) + mean;
            *px = adjusted.clamp(0.0, 255.0).round() as u8;
        }
    }
}

/// Global binarization: the RGB average of each pixel is compared against a
/// single threshold, producing pure black or white.
pub fn binarize_global(data: &mut [u8], threshold: u8) {
    for chunk in data.chunks_exact_mut(4) {
        let avg = (chunk[0] as u32 + chunk[1] as u32 + chunk[2] as u32) / 3;
        let value = if avg >= threshold as u32 { 255 } else { 0 };
        chunk[0] = value;
        chunk[1] = value;
        chunk[2] = value;
    }
}

/// Half-width of the adaptive-threshold neighborhood.
const ADAPTIVE_WINDOW: i64 = 15;
/// Constant subtracted from the local mean.
const ADAPTIVE_C: f32 = 5.0;

/// Adaptive binarization: each pixel is compared against the mean of its
/// clamped `±ADAPTIVE_WINDOW` square neighborhood (channel 0) minus
/// `ADAPTIVE_C`. A summed-area table keeps this linear in the pixel count.
pub fn binarize_adaptive(data: &mut [u8], width: u32, height: u32) {
    let w = width as usize;
    let h = height as usize;
    if w == 0 || h == 0 {
        return;
    }

    // integral[y][x] = sum of channel 0 over the rectangle [0,y) x [0,x)
    let mut integral = vec![0u64; (w + 1) * (h + 1)];
    for y in 0..h {
        let mut row_sum = 0u64;
        for x in 0..w {
            row_sum += data[(y * w + x) * 4] as u64;
            integral[(y + 1) * (w + 1) + (x + 1)] = integral[y * (w + 1) + (x + 1)] + row_sum;
        }
    }

    for y in 0..h {
        let y0 = (y as i64 - ADAPTIVE_WINDOW).max(0) as usize;
        let y1 = (y as i64 + ADAPTIVE_WINDOW).min(h as i64 - 1) as usize;
        for x in 0..w {
            let x0 = (x as i64 - ADAPTIVE_WINDOW).max(0) as usize;
            let x1 = (x as i64 + ADAPTIVE_WINDOW).min(w as i64 - 1) as usize;

            let sum = integral[(y1 + 1) * (w + 1) + (x1 + 1)] + integral[y0 * (w + 1) + x0]
                - integral[y0 * (w + 1) + (x1 + 1)]
                - integral[(y1 + 1) * (w + 1) + x0];
            let count = ((y1 - y0 + 1) * (x1 - x0 + 1)) as f32;
            let local_threshold = sum as f32 / count - ADAPTIVE_C;

            let idx = (y * w + x) * 4;
            let value = if (data[idx] as f32) < local_threshold { 0 } else { 255 };
            data[idx] = value;
            data[idx + 1] = value;
            data[idx + 2] = value;
        }
    }
}

/// Unsharp-mask radius.
const SHARPEN_RADIUS: i64 = 1;
/// Sharpening strength applied to the high-frequency difference.
const SHARPEN_AMOUNT: f32 = 1.5;
/// Differences at or below this magnitude are treated as noise and left
/// alone, so flat paper regions are not amplified.
const SHARPEN_FLOOR: f32 = 10.0;

/// Unsharp mask per color channel with a Bartlett (tent) blur kernel and
/// edge clamping.
pub fn sharpen(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut result = data.to_vec();

    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                let mut blurred = 0.0f32;
                let mut weight_sum = 0.0f32;
                for dy in -SHARPEN_RADIUS..=SHARPEN_RADIUS {
                    for dx in -SHARPEN_RADIUS..=SHARPEN_RADIUS {
                        let weight =
                            ((SHARPEN_RADIUS + 1 - dx.abs()) * (SHARPEN_RADIUS + 1 - dy.abs())) as f32;
                        let sy = (y as i64 + dy).clamp(0, h as i64 - 1) as usize;
                        let sx = (x as i64 + dx).clamp(0, w as i64 - 1) as usize;
                        blurred += data[(sy * w + sx) * 4 + c] as f32 * weight;
                        weight_sum += weight;
                    }
                }
                blurred /= weight_sum;

                let idx = (y * w + x) * 4 + c;
                let diff = data[idx] as f32 - blurred;
                if diff.abs() > SHARPEN_FLOOR {
                    result[idx] = (data[idx] as f32 + diff * SHARPEN_AMOUNT).clamp(0.0, 255.0) as u8;
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((width * height) as usize)
    }

    #[test]
    fn test_resample_identity_scale() {
        let data = solid(2, 2, [10, 20, 30, 255]);
        let (out, w, h) = resample_bilinear(&data, 2, 2, 1.0);
        assert_eq!((w, h), (2, 2));
        assert_eq!(out, data);
    }

    #[test]
    fn test_resample_doubles_dimensions() {
        let data = solid(2, 3, [100, 100, 100, 255]);
        let (out, w, h) = resample_bilinear(&data, 2, 3, 2.0);
        assert_eq!((w, h), (4, 6));
        assert_eq!(out.len(), 4 * 6 * 4);
        // A solid image stays solid under bilinear interpolation.
        assert!(out.chunks_exact(4).all(|c| c == [100, 100, 100, 255]));
    }

    #[test]
    fn test_resample_fractional_scale() {
        let data = solid(4, 4, [50, 50, 50, 255]);
        let (_, w, h) = resample_bilinear(&data, 4, 4, 1.5);
        assert_eq!((w, h), (6, 6));
    }

    #[test]
    fn test_grayscale_pure_red() {
        let mut data = vec![255, 0, 0, 255];
        grayscale(&mut data);
        // 0.2126 * 255 = 54.2
        assert_eq!(&data, &[54, 54, 54, 255]);
    }

    #[test]
    fn test_grayscale_channels_equal() {
        let mut data = vec![12, 200, 99, 255, 0, 255, 0, 128];
        grayscale(&mut data);
        for chunk in data.chunks_exact(4) {
            assert_eq!(chunk[0], chunk[1]);
            assert_eq!(chunk[1], chunk[2]);
        }
        // Alpha untouched.
        assert_eq!(data[3], 255);
        assert_eq!(data[7], 128);
    }

    #[test]
    fn test_median_removes_single_outlier() {
        // 3x3 gray field with a white speck in the center.
        let mut data = solid(3, 3, [100, 100, 100, 255]);
        let center = (1 * 3 + 1) * 4;
        data[center] = 255;
        data[center + 1] = 255;
        data[center + 2] = 255;

        let out = median_denoise(&data, 3, 3);
        assert_eq!(&out[center..center + 3], &[100, 100, 100]);
    }

    #[test]
    fn test_median_processes_border() {
        // Outlier in the corner must also be flattened (edge clamping).
        let mut data = solid(3, 3, [100, 100, 100, 255]);
        data[0] = 255;

        let out = median_denoise(&data, 3, 3);
        assert_eq!(out[0], 100);
    }

    #[test]
    fn test_contrast_spreads_around_mean() {
        // Two gray pixels straddling the mean 128.
        let mut data = vec![118, 118, 118, 255, 138, 138, 138, 255];
        contrast(&mut data, 2.0);
        // factor = (259 * 455) / (255 * 59) = 7.833; 128 - 78.33 rounds to 50.
        assert_eq!(data[0], 50);
        assert_eq!(data[4], 206);
    }

    #[test]
    fn test_contrast_preserves_mean_value() {
        let mut data = vec![128, 128, 128, 255];
        contrast(&mut data, 1.8);
        assert_eq!(&data[..3], &[128, 128, 128]);
    }

    #[test]
    fn test_binarize_global_all_extremes() {
        let mut data = vec![10, 20, 30, 255, 200, 210, 220, 255, 128, 128, 128, 255];
        binarize_global(&mut data, 128);
        for chunk in data.chunks_exact(4) {
            assert!(chunk[0] == 0 || chunk[0] == 255);
            assert_eq!(chunk[0], chunk[1]);
            assert_eq!(chunk[1], chunk[2]);
        }
        assert_eq!(data[0], 0);
        assert_eq!(data[4], 255);
        // Average exactly at the threshold maps to white.
        assert_eq!(data[8], 255);
    }

    #[test]
    fn test_binarize_adaptive_uniform_image_goes_white() {
        // Local mean equals the pixel value, so value >= mean - C everywhere.
        let mut data = solid(8, 8, [120, 120, 120, 255]);
        binarize_adaptive(&mut data, 8, 8);
        assert!(data.chunks_exact(4).all(|c| c[0] == 255));
    }

    #[test]
    fn test_binarize_adaptive_dark_text_on_light_ground() {
        let mut data = solid(9, 9, [200, 200, 200, 255]);
        let center = (4 * 9 + 4) * 4;
        data[center] = 0;
        data[center + 1] = 0;
        data[center + 2] = 0;

        binarize_adaptive(&mut data, 9, 9);
        assert_eq!(data[center], 0);
        assert_eq!(data[0], 255);
    }

    #[test]
    fn test_sharpen_flat_region_unchanged() {
        let data = solid(4, 4, [90, 90, 90, 255]);
        let out = sharpen(&data, 4, 4);
        assert_eq!(out, data);
    }

    #[test]
    fn test_sharpen_amplifies_edge() {
        // Dark left half, light right half: pixels at the seam move apart.
        let mut data = Vec::new();
        for _y in 0..4 {
            for x in 0..4 {
                let v = if x < 2 { 50 } else { 200 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        let out = sharpen(&data, 4, 4);

        let dark_seam = (1 * 4 + 1) * 4;
        let light_seam = (1 * 4 + 2) * 4;
        assert!(out[dark_seam] < 50);
        assert!(out[light_seam] > 200);
        // Alpha untouched everywhere.
        assert!(out.chunks_exact(4).all(|c| c[3] == 255));
    }
}
