//! 分割标签的颜色映射.
//!
//! 在 RGB 掩码颜色和整数类别 id 之间双向转换. 词表固定为 23 类自然图像标签,
//! 其 id 与颜色均唯一.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 不在词表中的颜色对应的 id (背景).
pub const BACKGROUND_ID: i64 = -1;

/// 背景渲染颜色.
pub const BACKGROUND_RGB: [u8; 3] = [0, 0, 0];

/// 词表中的一个标签.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SegLabel {
    /// 类别 id.
    pub id: i64,
    /// 类别名称.
    pub name: &'static str,
    /// 掩码中的颜色.
    pub rgb: [u8; 3],
}

const fn label(id: i64, name: &'static str, r: u8, g: u8, b: u8) -> SegLabel {
    SegLabel {
        id,
        name,
        rgb: [r, g, b],
    }
}

/// 固定的分割标签词表.
pub const SEG_LABELS: [SegLabel; 23] = [
    label(0, "building", 128, 0, 0),
    label(1, "grass", 0, 128, 0),
    label(2, "tree", 128, 128, 0),
    label(3, "cow", 0, 0, 128),
    label(4, "horse", 128, 0, 128),
    label(5, "sheep", 0, 128, 128),
    label(6, "sky", 128, 128, 128),
    label(7, "mountain", 64, 0, 0),
    label(8, "airplane", 192, 0, 0),
    label(9, "water", 64, 128, 0),
    label(10, "face", 192, 128, 0),
    label(11, "car", 64, 0, 128),
    label(12, "bicycle", 192, 0, 128),
    label(13, "flower", 64, 128, 128),
    label(14, "sign", 192, 128, 128),
    label(15, "bird", 0, 64, 0),
    label(16, "book", 128, 64, 0),
    label(17, "chair", 0, 192, 0),
    label(18, "road", 128, 64, 128),
    label(19, "cat", 0, 192, 128),
    label(20, "dog", 128, 192, 128),
    label(21, "body", 64, 64, 0),
    label(22, "boat", 192, 64, 0),
];

static BY_COLOR: Lazy<HashMap<[u8; 3], i64>> =
    Lazy::new(|| SEG_LABELS.iter().map(|l| (l.rgb, l.id)).collect());

static BY_ID: Lazy<HashMap<i64, [u8; 3]>> =
    Lazy::new(|| SEG_LABELS.iter().map(|l| (l.id, l.rgb)).collect());

/// 根据颜色查找类别 id. 不在词表中返回 `None`.
#[inline]
pub fn id_of(rgb: [u8; 3]) -> Option<i64> {
    BY_COLOR.get(&rgb).copied()
}

/// 根据类别 id 查找颜色. 不在词表中返回 `None`.
#[inline]
pub fn rgb_of(id: i64) -> Option<[u8; 3]> {
    BY_ID.get(&id).copied()
}

/// 根据名称查找标签.
pub fn by_name(name: &str) -> Option<&'static SegLabel> {
    SEG_LABELS.iter().find(|l| l.name == name)
}

/// 将 (h, w) 的类别 id 图渲染为 (h, w, 3) 的 RGB 图.
///
/// 不在词表中的 id 渲染为 [`BACKGROUND_RGB`].
pub fn labels_to_rgb(ids: ArrayView2<i64>) -> Array3<u8> {
    let (h, w) = ids.dim();
    let mut out = Array3::<u8>::zeros((h, w, 3));
    for (mut px, &id) in out
        .lanes_mut(Axis(2))
        .into_iter()
        .zip(ids.iter())
    {
        let rgb = rgb_of(id).unwrap_or(BACKGROUND_RGB);
        px.iter_mut().zip(rgb).for_each(|(d, s)| *d = s);
    }
    out
}

/// 将 (h, w, 3) 的 RGB 掩码光栅化为 (h, w) 的类别 id 图.
///
/// 不在词表中的颜色记为 [`BACKGROUND_ID`].
///
/// # 注意
///
/// `rgb` 的最后一维必须为 3, 否则程序 panic.
pub fn rgb_to_labels(rgb: ArrayView3<u8>) -> Array2<i64> {
    let (h, w, c) = rgb.dim();
    assert_eq!(c, 3, "RGB 掩码必须有 3 个通道");
    let ids: Vec<i64> = rgb
        .lanes(Axis(2))
        .into_iter()
        .map(|px| id_of([px[0], px[1], px[2]]).unwrap_or(BACKGROUND_ID))
        .collect();
    // lanes 按行优先顺序迭代, 长度必为 h * w.
    Array2::from_shape_vec((h, w), ids).unwrap_or_else(|_| unreachable!())
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;
    use ndarray::Array2;

    #[test]
    fn test_vocabulary_unique() {
        assert!(SEG_LABELS.iter().map(|l| l.id).all_unique());
        assert!(SEG_LABELS.iter().map(|l| l.rgb).all_unique());
        assert!(SEG_LABELS.iter().map(|l| l.name).all_unique());
        assert_eq!(by_name("sky").map(|l| l.id), Some(6));
        assert!(by_name("void").is_none());
    }

    #[test]
    fn test_lookup_inverse() {
        for l in SEG_LABELS.iter() {
            assert_eq!(rgb_of(l.id), Some(l.rgb));
            assert_eq!(id_of(l.rgb), Some(l.id));
            assert_eq!(rgb_of(id_of(l.rgb).unwrap()), Some(l.rgb));
        }
    }

    #[test]
    fn test_image_round_trip() {
        let ids = Array2::from_shape_fn((4, 6), |(h, w)| ((h * 6 + w) % 23) as i64);
        let rgb = labels_to_rgb(ids.view());
        assert_eq!(rgb.dim(), (4, 6, 3));
        assert_eq!(rgb_to_labels(rgb.view()), ids);
    }

    #[test]
    fn test_unmatched_is_background() {
        let mut rgb = Array3::<u8>::zeros((1, 2, 3));
        rgb[(0, 0, 0)] = 1; // 非词表颜色
        rgb[(0, 1, 1)] = 128; // grass
        let ids = rgb_to_labels(rgb.view());
        assert_eq!(ids[(0, 0)], BACKGROUND_ID);
        assert_eq!(ids[(0, 1)], 1);

        let back = labels_to_rgb(ids.view());
        assert_eq!(back[(0, 0, 0)], 0);
    }
}
