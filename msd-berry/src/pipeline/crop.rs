//! z 方向裁剪.

use super::PreprocessError;
use crate::data::BoundingBox;
use ndarray::{Array3, Axis, Slice};
use std::ops::Range;

/// 计算以包围盒深度中点为中心、高度为 `crop_height` 的 z 方向裁剪窗口.
///
/// 窗口起点在 0 处截断 (不会因此向后延伸), 终点在 `depth` 处截断,
/// 所以靠近体数据两端时实际高度可能小于 `crop_height`.
pub fn depth_window(bbox: &BoundingBox, depth: usize, crop_height: usize) -> Range<usize> {
    let mid = bbox.depth_mid();
    let half = crop_height / 2;
    let start = mid.saturating_sub(half);
    let end = (mid + half).min(depth);
    start..end
}

/// 沿 z 方向同时裁剪扫描和标注. 裁剪中心由 `label` 的包围盒决定.
///
/// 若 `crop_height < 2` (窗口为空), 返回 [`PreprocessError::InvalidCropHeight`];
/// 若 `label` 不含前景, 返回 [`PreprocessError::EmptyLabel`].
pub fn crop_depth(
    scan: &Array3<f32>,
    label: &Array3<u8>,
    crop_height: usize,
) -> Result<(Array3<f32>, Array3<u8>), PreprocessError> {
    if crop_height < 2 {
        return Err(PreprocessError::InvalidCropHeight(crop_height));
    }
    let bbox = super::require_bbox(label)?;
    let window = depth_window(&bbox, label.len_of(Axis(0)), crop_height);
    let slice = Slice::from(window);
    Ok((
        scan.slice_axis(Axis(0), slice).to_owned(),
        label.slice_axis(Axis(0), slice).to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox_z(depth_min: usize, depth_max: usize) -> BoundingBox {
        BoundingBox {
            row_min: 0,
            row_max: 0,
            col_min: 0,
            col_max: 0,
            depth_min,
            depth_max,
        }
    }

    #[test]
    fn test_depth_window() {
        // 中点 50, 窗口 [34, 66).
        assert_eq!(depth_window(&bbox_z(40, 60), 100, 32), 34..66);
        // 起点截断.
        assert_eq!(depth_window(&bbox_z(2, 6), 100, 32), 0..20);
        // 终点截断.
        assert_eq!(depth_window(&bbox_z(95, 99), 100, 32), 81..100);
    }

    #[test]
    fn test_crop_depth_keeps_shapes_equal() {
        let mut label = Array3::<u8>::zeros((40, 4, 4));
        label[(20, 1, 1)] = 1;
        label[(24, 2, 2)] = 1;
        let scan = Array3::from_shape_fn((40, 4, 4), |(z, _, _)| z as f32);

        let (s, l) = crop_depth(&scan, &label, 16).unwrap();
        assert_eq!(s.dim(), l.dim());
        assert_eq!(s.dim(), (16, 4, 4));
        assert_eq!(s[(0, 0, 0)], 14.0);
        assert_eq!(l.iter().filter(|&&p| p == 1).count(), 2);
    }

    #[test]
    fn test_crop_depth_tiny_height() {
        let mut label = Array3::<u8>::zeros((8, 2, 2));
        label[(4, 0, 0)] = 1;
        let scan = Array3::<f32>::zeros((8, 2, 2));
        assert!(matches!(
            crop_depth(&scan, &label, 1),
            Err(PreprocessError::InvalidCropHeight(1))
        ));
        assert_eq!(crop_depth(&scan, &label, 2).unwrap().0.dim(), (2, 2, 2));
    }

    #[test]
    fn test_crop_depth_empty_label() {
        let label = Array3::<u8>::zeros((8, 2, 2));
        let scan = Array3::<f32>::zeros((8, 2, 2));
        assert!(matches!(
            crop_depth(&scan, &label, 16),
            Err(PreprocessError::EmptyLabel)
        ));
    }
}
