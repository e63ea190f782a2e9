//! 三维包围盒.

use crate::Idx3d;
use itertools::{Itertools, MinMaxResult};
use ndarray::{Array3, ArrayBase, Axis, Data, Ix3};
use num::Zero;

/// 包含标签全部非零体素的最小轴对齐包围盒.
///
/// 所有边界均为闭区间. 行对应 `h` 轴 (axis 1), 列对应 `w` 轴 (axis 2),
/// 深度对应 `z` 轴 (axis 0).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox {
    /// 最小行索引.
    pub row_min: usize,
    /// 最大行索引 (含).
    pub row_max: usize,
    /// 最小列索引.
    pub col_min: usize,
    /// 最大列索引 (含).
    pub col_max: usize,
    /// 最小深度索引.
    pub depth_min: usize,
    /// 最大深度索引 (含).
    pub depth_max: usize,
}

/// 获取 `axis` 方向上存在非零元素的第一个和最后一个索引.
fn occupied_range<T, S>(data: &ArrayBase<S, Ix3>, axis: usize) -> Option<(usize, usize)>
where
    T: Zero,
    S: Data<Elem = T>,
{
    let hit = data
        .axis_iter(Axis(axis))
        .positions(|lane| lane.iter().any(|v| !v.is_zero()));
    match hit.minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(i) => Some((i, i)),
        MinMaxResult::MinMax(lo, hi) => Some((lo, hi)),
    }
}

impl BoundingBox {
    /// 计算 `label` 的包围盒. 如果不存在非零体素, 返回 `None`.
    pub fn of<T, S>(label: &ArrayBase<S, Ix3>) -> Option<Self>
    where
        T: Zero,
        S: Data<Elem = T>,
    {
        let (depth_min, depth_max) = occupied_range(label, 0)?;
        // z 方向非空, 则另外两个方向也一定非空.
        let (row_min, row_max) = occupied_range(label, 1)?;
        let (col_min, col_max) = occupied_range(label, 2)?;
        Some(Self {
            row_min,
            row_max,
            col_min,
            col_max,
            depth_min,
            depth_max,
        })
    }

    /// 以 `(行min, 行max, 列min, 列max, 深度min, 深度max)` 形式返回六个坐标.
    #[inline]
    pub fn to_array(&self) -> [usize; 6] {
        [
            self.row_min,
            self.row_max,
            self.col_min,
            self.col_max,
            self.depth_min,
            self.depth_max,
        ]
    }

    /// 包围盒在 (z, h, w) 三个方向上的边长.
    #[inline]
    pub fn extent(&self) -> Idx3d {
        (
            self.depth_max - self.depth_min + 1,
            self.row_max - self.row_min + 1,
            self.col_max - self.col_min + 1,
        )
    }

    /// 包围盒的体素个数.
    #[inline]
    pub fn volume(&self) -> usize {
        let (z, h, w) = self.extent();
        z * h * w
    }

    /// 深度方向中点 (向下取整).
    #[inline]
    pub fn depth_mid(&self) -> usize {
        (self.depth_min + self.depth_max) / 2
    }

    /// 判断 `(z, h, w)` 是否在包围盒内.
    #[inline]
    pub fn contains(&self, &(z, h, w): &Idx3d) -> bool {
        (self.depth_min..=self.depth_max).contains(&z)
            && (self.row_min..=self.row_max).contains(&h)
            && (self.col_min..=self.col_max).contains(&w)
    }

    /// 生成形状为 `shape` 的包围盒指示体: 盒内为 1, 盒外为 0.
    ///
    /// 超出 `shape` 的部分会被截断.
    pub fn indicator(&self, shape: Idx3d) -> Array3<u8> {
        let (z, h, w) = shape;
        Array3::from_shape_fn((z, h, w), |pos| u8::from(self.contains(&pos)))
    }
}
