//! 方向规范化与标签合并.

use crate::consts::gray::{MERGED_FOREGROUND, MSD_BACKGROUND};
use ndarray::{Array3, Axis};

/// 将体数据旋转到参考方向.
///
/// 原始 nifti 坐标系 (x, y, z) 下该操作等价于先在 (x, y) 平面逆时针旋转 90 度,
/// 再左右翻转. 在本 crate 的 (z, h, w) 布局下, 它恰好是同时翻转 `h` 轴和 `w` 轴,
/// 因此形状保持不变. 扫描和标注必须使用同一变换.
pub fn canonical_orientation<T: Clone>(mut data: Array3<T>) -> Array3<T> {
    data.invert_axis(Axis(1));
    data.invert_axis(Axis(2));
    if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().into_owned()
    }
}

/// 合并标签: 值属于 `ids` 的体素置为 [`MERGED_FOREGROUND`], 其余置为背景.
///
/// 返回合并后前景体素个数.
pub fn merge_labels(label: &mut Array3<u8>, ids: [u8; 2]) -> usize {
    let mut cnt = 0usize;
    label.mapv_inplace(|p| {
        if ids.contains(&p) {
            cnt += 1;
            MERGED_FOREGROUND
        } else {
            MSD_BACKGROUND
        }
    });
    cnt
}
