//! 2D 图像变换.
//!
//! 将 `image` crate 的图像转换为 `ndarray` 数组, 并提供常用的逐像素变换.

use image::{DynamicImage, GenericImageView, ImageResult};
use ndarray::{Array2, Array3, ArrayViewMut3, Axis};
use std::path::Path;

/// 将图像转换为 (c, h, w) 布局的 `f32` 数组, 像素值除以 255 缩放到 \[0, 1\].
///
/// 灰度图得到 `c = 1`, 彩色图得到 `c = 3` (alpha 通道被丢弃).
pub fn to_chw_f32(img: &DynamicImage) -> Array3<f32> {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    match img.color().channel_count() {
        1 | 2 => {
            let gray = img.to_luma8();
            Array3::from_shape_fn((1, h, w), |(_, y, x)| {
                gray.get_pixel(x as u32, y as u32).0[0] as f32 / 255.0
            })
        }
        _ => {
            let rgb = img.to_rgb8();
            Array3::from_shape_fn((3, h, w), |(c, y, x)| {
                rgb.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
            })
        }
    }
}

/// 将 (h, w, c) 布局转置为 (c, h, w) 布局. 仅当最后一维小于第一维时才转置,
/// 否则认为输入已经是 (c, h, w) 并原样返回.
pub fn hwc_to_chw<T: Clone>(data: Array3<T>) -> Array3<T> {
    let (first, _, last) = data.dim();
    if last < first {
        data.permuted_axes([2, 0, 1]).as_standard_layout().into_owned()
    } else {
        data
    }
}

/// 逐通道标准化: `y = (x - mean[c]) / std[c]`.
///
/// # 注意
///
/// `img` 的通道数必须与 `mean`, `std` 的长度一致, 否则程序 panic.
pub fn normalize(mut img: ArrayViewMut3<f32>, mean: &[f32], std: &[f32]) {
    let n_chans = img.len_of(Axis(0));
    assert_eq!(
        n_chans,
        mean.len(),
        "图像有 {n_chans} 个通道, 但 mean 长度为 {}",
        mean.len()
    );
    assert_eq!(mean.len(), std.len(), "mean 与 std 长度不一致");

    for (mut chan, (&m, &s)) in img.axis_iter_mut(Axis(0)).zip(mean.iter().zip(std)) {
        let inv_std = 1.0 / s;
        chan.mapv_inplace(|x| (x - m) * inv_std);
    }
}

/// 将 8-bit 掩码二值化: 像素值 / 255 大于 0.5 的记为 1, 否则为 0.
pub fn binarize_mask(mask: &Array2<u8>) -> Array2<f32> {
    mask.mapv(|p| if p as f32 / 255.0 > 0.5 { 1.0 } else { 0.0 })
}

/// 原图在 `size` 长的画布上的起点 (可为负, 即裁掉的部分).
///
/// 原图更长时起点为 `-round((len - size) / 2)`, 其中 `.5` 向偶数取整;
/// 原图更短时两侧补 0, 左侧补 `(size - len) / 2` (向下取整).
fn crop_origin(len: u32, size: u32) -> i64 {
    if len >= size {
        let d = len - size;
        let half = d / 2;
        let offset = if d % 2 == 1 && half % 2 == 1 {
            half + 1
        } else {
            half
        };
        -(offset as i64)
    } else {
        ((size - len) / 2) as i64
    }
}

/// 以图像中心为基准裁剪出 `size` x `size` 的区域.
///
/// 与 torchvision 的 `CenterCrop` 一致: 偏移量的 `.5` 向偶数取整,
/// 裁剪尺寸大于原图时用 0 填充.
pub fn center_crop(img: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let left = crop_origin(w, size);
    let top = crop_origin(h, size);
    if left <= 0 && top <= 0 {
        return img.crop_imm(-left as u32, -top as u32, size, size);
    }
    let mut canvas = DynamicImage::new_rgb8(size, size);
    if img.color().channel_count() == 1 {
        canvas = DynamicImage::ImageLuma8(canvas.to_luma8());
    }
    image::imageops::replace(&mut canvas, img, left, top);
    canvas
}

/// 以 RGB 图像打开 `path`.
pub fn rgb_loader<P: AsRef<Path>>(path: P) -> ImageResult<DynamicImage> {
    Ok(DynamicImage::ImageRgb8(image::open(path)?.into_rgb8()))
}

/// 以单通道灰度图像打开 `path`.
pub fn gray_loader<P: AsRef<Path>>(path: P) -> ImageResult<DynamicImage> {
    Ok(DynamicImage::ImageLuma8(image::open(path)?.into_luma8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use ndarray::arr2;

    #[test]
    fn test_to_chw_gray_and_rgb() {
        let mut g = GrayImage::new(3, 2);
        g.put_pixel(2, 1, Luma([255]));
        let a = to_chw_f32(&DynamicImage::ImageLuma8(g));
        assert_eq!(a.dim(), (1, 2, 3));
        assert_eq!(a[(0, 1, 2)], 1.0);
        assert_eq!(a[(0, 0, 0)], 0.0);

        let mut c = RgbImage::new(2, 2);
        c.put_pixel(1, 0, Rgb([0, 51, 255]));
        let a = to_chw_f32(&DynamicImage::ImageRgb8(c));
        assert_eq!(a.dim(), (3, 2, 2));
        assert_eq!(a[(1, 0, 1)], 0.2);
        assert_eq!(a[(2, 0, 1)], 1.0);
    }

    #[test]
    fn test_hwc_to_chw() {
        let hwc = Array3::<u8>::from_shape_fn((4, 5, 3), |(h, w, c)| (h * 15 + w * 3 + c) as u8);
        let chw = hwc_to_chw(hwc.clone());
        assert_eq!(chw.dim(), (3, 4, 5));
        assert_eq!(chw[(2, 1, 4)], hwc[(1, 4, 2)]);

        // 已经是 CHW 时不变.
        assert_eq!(hwc_to_chw(chw.clone()), chw);
    }

    #[test]
    fn test_normalize() {
        let mut a = Array3::<f32>::from_elem((2, 2, 2), 1.0);
        normalize(a.view_mut(), &[0.5, 1.0], &[0.5, 2.0]);
        assert!(a.index_axis(Axis(0), 0).iter().all(|&v| v == 1.0));
        assert!(a.index_axis(Axis(0), 1).iter().all(|&v| v == 0.0));
    }

    #[test]
    #[should_panic]
    fn test_normalize_channel_mismatch() {
        let mut a = Array3::<f32>::zeros((3, 2, 2));
        normalize(a.view_mut(), &[0.0], &[1.0]);
    }

    #[test]
    fn test_binarize_mask() {
        let m = arr2(&[[0u8, 127], [128, 255]]);
        assert_eq!(binarize_mask(&m), arr2(&[[0.0, 0.0], [1.0, 1.0]]));
    }

    #[test]
    fn test_crop_origin() {
        assert_eq!(crop_origin(10, 4), -3);
        assert_eq!(crop_origin(5, 4), 0);
        assert_eq!(crop_origin(7, 4), -2);
        assert_eq!(crop_origin(9, 4), -2);
        assert_eq!(crop_origin(2, 4), 1);
        assert_eq!(crop_origin(1, 4), 1);
    }

    #[test]
    fn test_center_crop() {
        let img = RgbImage::from_fn(10, 6, |x, y| Rgb([x as u8, y as u8, 0]));
        let cropped = center_crop(&DynamicImage::ImageRgb8(img), 4);
        assert_eq!(cropped.dimensions(), (4, 4));
        // left = 3, top = 1.
        assert_eq!(cropped.to_rgb8().get_pixel(0, 0), &Rgb([3, 1, 0]));

        // 差为奇数时 `.5` 向偶数取整: round(0.5) = 0, round(1.5) = 2.
        let img = RgbImage::from_fn(5, 7, |x, y| Rgb([x as u8, y as u8, 0]));
        let cropped = center_crop(&DynamicImage::ImageRgb8(img), 4);
        assert_eq!(cropped.to_rgb8().get_pixel(0, 0), &Rgb([0, 2, 0]));

        // 只有一个方向需要补 0.
        let img = RgbImage::from_fn(7, 2, |x, _| Rgb([x as u8 + 1, 0, 0]));
        let mixed = center_crop(&DynamicImage::ImageRgb8(img), 4).to_rgb8();
        assert_eq!(mixed.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(mixed.get_pixel(0, 1), &Rgb([3, 0, 0]));
        assert_eq!(mixed.get_pixel(3, 2), &Rgb([6, 0, 0]));

        let small = DynamicImage::ImageLuma8(GrayImage::from_pixel(2, 2, Luma([9])));
        let padded = center_crop(&small, 4);
        assert_eq!(padded.dimensions(), (4, 4));
        let g = padded.to_luma8();
        assert_eq!(g.get_pixel(0, 0), &Luma([0]));
        assert_eq!(g.get_pixel(1, 1), &Luma([9]));
    }
}
