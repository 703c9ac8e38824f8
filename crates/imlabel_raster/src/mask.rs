//! Boolean raster masks.
//!
//! Masks are `(height, width)` arrays indexed `[[y, x]]`, matching the
//! row-major layout of image buffers.

use image::{GrayImage, Luma};
use ndarray::{Array2, Zip, s};

/// Single-channel coverage mask.
pub type Mask = Array2<bool>;

/// Create an all-false mask of the given size.
pub fn empty_mask(width: usize, height: usize) -> Mask {
    Array2::from_elem((height, width), false)
}

/// Mask width in pixels.
pub fn mask_width(mask: &Mask) -> usize {
    mask.ncols()
}

/// Mask height in pixels.
pub fn mask_height(mask: &Mask) -> usize {
    mask.nrows()
}

/// Set a pixel if it lies inside the mask; out-of-bounds writes are ignored.
#[inline]
pub fn set_pixel(mask: &mut Mask, x: i64, y: i64) {
    if x < 0 || y < 0 {
        return;
    }
    if let Some(px) = mask.get_mut([y as usize, x as usize]) {
        *px = true;
    }
}

/// Number of set pixels.
pub fn count_set(mask: &Mask) -> usize {
    mask.iter().filter(|&&v| v).count()
}

/// True if any pixel is set.
pub fn any_set(mask: &Mask) -> bool {
    mask.iter().any(|&v| v)
}

/// OR `src` into `dst`. Both masks must have the same shape.
pub fn union_into(dst: &mut Mask, src: &Mask) {
    Zip::from(dst).and(src).for_each(|d, &s| *d |= s);
}

/// XOR `src` into `dst`. Both masks must have the same shape.
pub fn xor_into(dst: &mut Mask, src: &Mask) {
    Zip::from(dst).and(src).for_each(|d, &s| *d ^= s);
}

/// Surround the mask with `border` unset pixels on every side.
pub fn pad(mask: &Mask, border: usize) -> Mask {
    let (h, w) = mask.dim();
    let mut padded = Array2::from_elem((h + 2 * border, w + 2 * border), false);
    padded
        .slice_mut(s![border..border + h, border..border + w])
        .assign(mask);
    padded
}

/// Tight extent of the set pixels as `(x0, y0, x1, y1)`, end-exclusive.
pub fn set_extent(mask: &Mask) -> Option<(usize, usize, usize, usize)> {
    let mut extent: Option<(usize, usize, usize, usize)> = None;
    for ((y, x), &v) in mask.indexed_iter() {
        if !v {
            continue;
        }
        extent = Some(match extent {
            None => (x, y, x + 1, y + 1),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)),
        });
    }
    extent
}

/// Convert to an 8-bit image, set pixels become 255.
pub fn mask_to_gray(mask: &Mask) -> GrayImage {
    let (h, w) = mask.dim();
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        if mask[[y as usize, x as usize]] {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Threshold an 8-bit image into a mask; any non-zero pixel is set.
pub fn mask_from_gray(image: &GrayImage) -> Mask {
    let (w, h) = image.dimensions();
    Array2::from_shape_fn((h as usize, w as usize), |(y, x)| {
        image.get_pixel(x as u32, y as u32)[0] > 0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_pixel_ignores_out_of_bounds() {
        let mut mask = empty_mask(4, 3);
        set_pixel(&mut mask, -1, 0);
        set_pixel(&mut mask, 4, 0);
        set_pixel(&mut mask, 0, 3);
        assert_eq!(count_set(&mask), 0);
        set_pixel(&mut mask, 3, 2);
        assert!(mask[[2, 3]]);
        assert_eq!(mask_width(&mask), 4);
        assert_eq!(mask_height(&mask), 3);
    }

    #[test]
    fn test_union_and_xor() {
        let mut a = empty_mask(3, 1);
        let mut b = empty_mask(3, 1);
        a[[0, 0]] = true;
        a[[0, 1]] = true;
        b[[0, 1]] = true;
        b[[0, 2]] = true;

        let mut u = a.clone();
        union_into(&mut u, &b);
        assert_eq!(u.as_slice().unwrap(), &[true, true, true]);

        let mut x = a.clone();
        xor_into(&mut x, &b);
        assert_eq!(x.as_slice().unwrap(), &[true, false, true]);
    }

    #[test]
    fn test_pad_and_extent() {
        let mut mask = empty_mask(5, 4);
        mask[[1, 2]] = true;
        mask[[2, 3]] = true;
        assert_eq!(set_extent(&mask), Some((2, 1, 4, 3)));

        let padded = pad(&mask, 1);
        assert_eq!(padded.dim(), (6, 7));
        assert!(padded[[2, 3]]);
        assert_eq!(set_extent(&padded), Some((3, 2, 5, 4)));
        assert_eq!(set_extent(&empty_mask(3, 3)), None);
    }

    #[test]
    fn test_gray_conversion() {
        let mut mask = empty_mask(3, 2);
        mask[[1, 2]] = true;
        let gray = mask_to_gray(&mask);
        assert_eq!(gray.get_pixel(2, 1)[0], 255);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(mask_from_gray(&gray), mask);
    }
}
