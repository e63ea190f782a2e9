//! 3D 体数据预处理流水线.
//!
//! 依次执行: 强度裁剪 -> \[0, 1\] 归一化 -> 方向规范化 -> (可选) 标签合并
//! -> (可选) 包围盒化 -> z 方向裁剪 -> 重采样 -> (可选) 拆分为 2D 切片.

use crate::data::{window::scale_unit, BoundingBox, HuWindow};
use crate::Idx3d;
use either::Either;
use ndarray::{Array3, Array4, ArrayD, Axis};
use thiserror::Error;

pub mod crop;
pub mod orient;
pub mod resize;

pub use crop::{crop_depth, depth_window};
pub use orient::{canonical_orientation, merge_labels};
pub use resize::{resize, resize_bbox, resize_linear, resize_nearest, Interpolation};

/// 预处理错误.
#[derive(Debug, Error)]
pub enum PreprocessError {
    /// 扫描强度恒定, 无法归一化.
    #[error("scan intensities are constant, cannot scale to [0, 1]")]
    ConstantVolume,

    /// 标签不含前景体素, 无法计算包围盒.
    #[error("label mask has no foreground voxels")]
    EmptyLabel,

    /// z 方向裁剪高度过小, 裁剪窗口为空.
    #[error("crop height {0} is too small, must be at least 2")]
    InvalidCropHeight(usize),

    /// 扫描与标注形状不一致.
    #[error("scan shape {scan:?} differs from label shape {label:?}")]
    ShapeMismatch {
        /// 扫描形状 (z, h, w).
        scan: Idx3d,
        /// 标注形状 (z, h, w).
        label: Idx3d,
    },
}

/// 计算包围盒; 标签为空时记录警告并返回 [`PreprocessError::EmptyLabel`].
pub(crate) fn require_bbox(label: &Array3<u8>) -> Result<BoundingBox, PreprocessError> {
    BoundingBox::of(label).ok_or_else(|| {
        log::warn!("empty label mask of shape {:?}", label.dim());
        PreprocessError::EmptyLabel
    })
}

#[inline]
fn check_shapes(scan: &Array3<f32>, label: &Array3<u8>) -> Result<(), PreprocessError> {
    if scan.dim() == label.dim() {
        Ok(())
    } else {
        Err(PreprocessError::ShapeMismatch {
            scan: scan.dim(),
            label: label.dim(),
        })
    }
}

/// 输出布局.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Layout {
    /// 保持 3D 体数据: 扫描 (z, h, w).
    Volume,

    /// 拆分为 2D 切片批次: 扫描 (z, 1, h, w), 标注 (z, h, w).
    #[default]
    Slices,
}

/// 标签模式.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LabelMode {
    /// 原样使用分割标签.
    #[default]
    Segmentation,

    /// 以标签的 3D 包围盒指示体替换标签.
    BoxMask,

    /// 输出重采样后包围盒指示体的六个坐标.
    BoxCoords,
}

impl LabelMode {
    /// 是否需要包围盒化.
    #[inline]
    pub fn uses_box(&self) -> bool {
        matches!(self, Self::BoxMask | Self::BoxCoords)
    }
}

/// 预处理后的监督目标.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// 体素级掩码, 形状与扫描的空间部分一致.
    Mask(Array3<u8>),

    /// 包围盒坐标.
    Box(BoundingBox),
}

impl Target {
    /// 若为掩码则返回其引用.
    #[inline]
    pub fn as_mask(&self) -> Option<&Array3<u8>> {
        match self {
            Target::Mask(m) => Some(m),
            Target::Box(_) => None,
        }
    }
}

/// 一个预处理完成的样本.
#[derive(Clone, Debug)]
pub struct Sample {
    /// 扫描: `Left` 为 3D 体数据 (z, h, w), `Right` 为切片批次 (z, 1, h, w).
    pub scan: Either<Array3<f32>, Array4<f32>>,

    /// 监督目标.
    pub target: Target,
}

impl Sample {
    /// 扫描的动态维度形式.
    pub fn scan_dyn(&self) -> ArrayD<f32> {
        self.scan
            .as_ref()
            .either(|v| v.clone().into_dyn(), |s| s.clone().into_dyn())
    }
}

/// 体数据预处理器. 参数在构造后不可变.
#[derive(Clone, Debug)]
pub struct Preprocessor {
    window: HuWindow,
    merge: Option<[u8; 2]>,
    label_mode: LabelMode,
    crop_height: usize,
    res: usize,
    res_z: usize,
    layout: Layout,
}

impl Preprocessor {
    /// 创建预处理器. 输出形状为 (`res_z`, `res`, `res`).
    ///
    /// `crop_height < 2` 时不会 panic, 而是由 [`Preprocessor::run`] 返回
    /// [`PreprocessError::InvalidCropHeight`].
    ///
    /// # 注意
    ///
    /// `res` 或 `res_z` 为 0 时程序 panic.
    pub fn new(res: usize, res_z: usize, crop_height: usize) -> Self {
        assert!(res > 0 && res_z > 0, "输出形状不能为空: ({res_z}, {res}, {res})");
        Self {
            window: HuWindow::abdomen(),
            merge: None,
            label_mode: LabelMode::Segmentation,
            crop_height,
            res,
            res_z,
            layout: Layout::Volume,
        }
    }

    /// 设置强度裁剪窗口.
    pub fn window(mut self, window: HuWindow) -> Self {
        self.window = window;
        self
    }

    /// 设置需要合并的两个前景标签值. `None` 表示不合并.
    pub fn merge(mut self, ids: Option<[u8; 2]>) -> Self {
        self.merge = ids;
        self
    }

    /// 设置标签模式.
    pub fn label_mode(mut self, mode: LabelMode) -> Self {
        self.label_mode = mode;
        self
    }

    /// 设置输出布局.
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// 输出空间形状 (z, h, w).
    #[inline]
    pub fn out_shape(&self) -> Idx3d {
        (self.res_z, self.res, self.res)
    }

    /// 强度裁剪 + 归一化 + 方向规范化.
    pub fn preprocess_scan(&self, mut scan: Array3<f32>) -> Result<Array3<f32>, PreprocessError> {
        self.window.clip(&mut scan);
        scale_unit(&mut scan).ok_or(PreprocessError::ConstantVolume)?;
        Ok(canonical_orientation(scan))
    }

    /// 执行完整流水线.
    ///
    /// `scan` 与 `label` 均为 (z, h, w) 布局, 且形状必须一致.
    pub fn run(&self, scan: Array3<f32>, label: Array3<u8>) -> Result<Sample, PreprocessError> {
        check_shapes(&scan, &label)?;
        let scan = self.preprocess_scan(scan)?;
        let mut label = canonical_orientation(label);

        if let Some(ids) = self.merge {
            merge_labels(&mut label, ids);
        }

        if self.label_mode.uses_box() {
            let bbox = require_bbox(&label)?;
            label = bbox.indicator(label.dim());
        }

        let (scan, label) = crop_depth(&scan, &label, self.crop_height)?;
        check_shapes(&scan, &label)?;

        let shape = self.out_shape();
        let target = match self.label_mode {
            // 在重采样前取包围盒, 小目标不会因最近邻下采样而丢失.
            LabelMode::BoxCoords => {
                Target::Box(resize_bbox(&require_bbox(&label)?, label.dim(), shape))
            }
            LabelMode::Segmentation | LabelMode::BoxMask => {
                Target::Mask(resize_nearest(label.view(), shape))
            }
        };
        let scan = resize_linear(scan.view(), shape);

        let scan = match self.layout {
            Layout::Volume => Either::Left(scan),
            Layout::Slices => Either::Right(scan.insert_axis(Axis(1))),
        };
        Ok(Sample { scan, target })
    }
}
