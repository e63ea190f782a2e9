//! HU 强度窗口与归一化.

use crate::consts::{HU_CLIP_LOWER, HU_CLIP_UPPER};
use ndarray::{ArrayBase, DataMut, Dimension};
use num::Float;

/// CT 强度裁剪窗口, 包含下限和上限 (HU).
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HuWindow {
    lower: f32,
    upper: f32,
}

impl HuWindow {
    /// 构建 CT 裁剪窗口.
    ///
    /// `lower` 和 `upper` 必须有限, 且 `lower < upper`, 否则返回 `None`.
    pub fn new(lower: f32, upper: f32) -> Option<HuWindow> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// 构建腹部软组织 (胰腺) 任务使用的裁剪窗口, 范围为 \[-150, 200\].
    #[inline]
    pub const fn abdomen() -> HuWindow {
        Self {
            lower: HU_CLIP_LOWER,
            upper: HU_CLIP_UPPER,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper(&self) -> f32 {
        self.upper
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 将 `hu` 裁剪到窗口范围内. NaN 原样返回.
    #[inline]
    pub fn eval(&self, hu: f32) -> f32 {
        if hu.is_nan() {
            hu
        } else {
            num::clamp(hu, self.lower, self.upper)
        }
    }

    /// 就地裁剪整个数组.
    pub fn clip<S, D>(&self, data: &mut ArrayBase<S, D>)
    where
        S: DataMut<Elem = f32>,
        D: Dimension,
    {
        data.mapv_inplace(|v| self.eval(v));
    }
}

impl Default for HuWindow {
    #[inline]
    fn default() -> Self {
        Self::abdomen()
    }
}

/// 将数组就地线性缩放到 \[0, 1\].
///
/// 若数组为空或最大值等于最小值 (无法缩放), 则不做修改并返回 `None`;
/// 否则返回缩放前的 `(min, max)`.
pub fn scale_unit<T, S, D>(data: &mut ArrayBase<S, D>) -> Option<(T, T)>
where
    T: Float,
    S: DataMut<Elem = T>,
    D: Dimension,
{
    let (min, max) = data
        .iter()
        .fold(None, |acc: Option<(T, T)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    let range = max - min;
    if !(range > T::zero()) {
        return None;
    }
    data.mapv_inplace(|v| (v - min) / range);
    Some((min, max))
}
