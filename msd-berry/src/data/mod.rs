use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView, ArrayViewMut, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use thiserror::Error;

use crate::consts::gray::*;
use crate::{Idx2d, Idx3d};

pub mod bbox;
pub mod window;

pub use bbox::BoundingBox;
pub use window::HuWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 打开 nii 体数据错误.
#[derive(Debug, Error)]
pub enum OpenVolumeError {
    /// nifti 文件读取或解析错误.
    #[error("failed to read nifti volume: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 体数据不是三维的.
    #[error("expected a 3D volume, found shape {0:?}")]
    NotThreeDimensional(Vec<usize>),

    /// 扫描与标注形状不一致.
    #[error("scan shape {scan:?} differs from label shape {label:?}")]
    ShapeMismatch {
        /// 扫描形状 (z, h, w).
        scan: Idx3d,
        /// 标注形状 (z, h, w).
        label: Idx3d,
    },
}

/// 读取 nii 文件的 header 与原始 nifti 体数据.
fn read_object(path: &Path) -> Result<(BoxedHeader, nifti::InMemNiftiVolume), OpenVolumeError> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());
    Ok((header, obj.into_volume()))
}

/// 将 \[W, H, z\] 转换成 (z, H, W) 的标准布局数组. 以后均按照该模式访问.
fn to_zhw<T: Clone>(data: ArrayD<T>) -> Result<Array3<T>, OpenVolumeError> {
    let shape = data.shape().to_vec();
    let data = data
        .into_dimensionality::<Ix3>()
        .map_err(|_| OpenVolumeError::NotThreeDimensional(shape))?
        .permuted_axes([2, 1, 0]);

    // The nature of nifti data field layout.
    Ok(if data.is_standard_layout() {
        data
    } else {
        data.as_standard_layout().to_owned()
    })
}

#[inline]
fn shape_of<T>(data: &Array3<T>) -> Idx3d {
    data.dim()
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }
}

/// nii 格式 3D CT 扫描, 包括 header 和 CT 扫描 (HU). HU 值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct MsdScan {
    header: BoxedHeader,
    data: Array3<f32>,
}

impl NiftiHeaderAttr for MsdScan {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MsdScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for MsdScan {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl MsdScan {
    /// 打开 nii (或 nii.gz) 文件格式的 3D CT 扫描. `path` 为文件的本地路径.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let (header, volume) = read_object(path.as_ref())?;
        let data = to_zhw(volume.into_ndarray::<f32>()?)?;
        Ok(Self { header, data })
    }

    /// 由 (z, h, w) 布局的裸数据直接创建扫描, header 取默认值.
    pub fn from_array(data: Array3<f32>) -> Self {
        Self {
            header: Box::default(),
            data,
        }
    }

    /// 数据形状 (z, h, w).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }

    /// 水平切片形状 (h, w).
    #[inline]
    pub fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, f32, Ix3> {
        self.data.view_mut()
    }

    /// 取出底层数据.
    #[inline]
    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}

/// nii 格式 3D CT 标注, 包括 header 和真值标签. 标签值以 `u8` 保存.
#[derive(Debug, Clone)]
pub struct MsdLabel {
    header: BoxedHeader,
    data: Array3<u8>,
}

impl NiftiHeaderAttr for MsdLabel {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for MsdLabel {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for MsdLabel {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl MsdLabel {
    /// 打开 nii (或 nii.gz) 文件格式的 3D CT 标注.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let (header, volume) = read_object(path.as_ref())?;
        let data = to_zhw(volume.into_ndarray::<u8>()?)?;
        Ok(Self { header, data })
    }

    /// 由 (z, h, w) 布局的裸数据直接创建标注, header 取默认值.
    pub fn from_array(data: Array3<u8>) -> Self {
        Self {
            header: Box::default(),
            data,
        }
    }

    /// 数据形状 (z, h, w).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 取出底层数据.
    #[inline]
    pub fn into_array(self) -> Array3<u8> {
        self.data
    }

    /// 获取标签的基本统计信息.
    ///
    /// 统计信息格式为: \[背景体素数, 器官体素数, 肿瘤体素数\].
    /// 该操作不会统计任何其他体素信息.
    pub fn numeric_statistics(&self) -> [usize; 3] {
        let mut ans = [0; 3];
        for pixel in self.data.iter().filter(|p| **p <= MSD_TUMOR) {
            ans[*pixel as usize] += 1;
        }
        ans
    }

    /// 包含全部前景体素的最小包围盒. 若无前景则返回 `None`.
    #[inline]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::of(&self.data)
    }

    /// 获取 z 方向上含前景的切片个数.
    pub fn foreground_slices(&self) -> usize {
        self.data
            .axis_iter(Axis(0))
            .filter(|s| s.iter().any(|&p| is_organ_or_tumor(p)))
            .count()
    }
}

/// nii 格式的 3D CT 扫描与对应的标注.
///
/// 该结构完全透明, 仅包含两个公开的 `scan` 和 `label` 子结构.
#[derive(Debug, Clone)]
pub struct MsdData3d {
    /// 3D CT 扫描.
    pub scan: MsdScan,

    /// 3D CT 标注.
    pub label: MsdLabel,
}

impl MsdData3d {
    /// 分别打开 nii 文件格式的 3D CT 扫描和对应标注. 如果任一文件打开失败,
    /// 或两者形状不一致, 则返回 `Err`.
    pub fn open(
        scan_path: impl AsRef<Path>,
        label_path: impl AsRef<Path>,
    ) -> Result<Self, OpenVolumeError> {
        let scan = MsdScan::open(scan_path.as_ref())?;
        let label = MsdLabel::open(label_path.as_ref())?;
        Self::new(scan, label)
    }

    /// 组合扫描和标注. 两者形状不一致时返回 `Err`.
    pub fn new(scan: MsdScan, label: MsdLabel) -> Result<Self, OpenVolumeError> {
        if scan.shape() != label.shape() {
            return Err(OpenVolumeError::ShapeMismatch {
                scan: scan.shape(),
                label: label.shape(),
            });
        }
        Ok(Self { scan, label })
    }

    /// 获取水平切片个数.
    #[inline]
    pub fn len_z(&self) -> usize {
        self.label.shape().0
    }

    /// 拆分为 (扫描数组, 标注数组).
    #[inline]
    pub fn into_arrays(self) -> (Array3<f32>, Array3<u8>) {
        (self.scan.into_array(), self.label.into_array())
    }
}
