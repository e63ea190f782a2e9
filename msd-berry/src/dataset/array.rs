//! 内存数组数据集. 沿第 0 轴索引一个堆叠好的数组.

use std::path::Path;

use ndarray::{ArrayD, Axis};
use ndarray_npy::ReadableElement;

use super::{check_index, Dataset, DatasetError};

/// 沿第 0 轴切分的内存数组数据集.
///
/// 第 `i` 个样本为 `data[i, ...]` 的拷贝, 维数比底层数组少 1.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayDataset<A> {
    data: ArrayD<A>,
}

impl<A: Clone> ArrayDataset<A> {
    /// 包装一个已堆叠的数组.
    ///
    /// # 注意
    ///
    /// `data` 至少是一维的, 否则程序 panic.
    pub fn new(data: ArrayD<A>) -> Self {
        assert!(data.ndim() >= 1, "零维数组无法作为数据集");
        Self { data }
    }

    /// 底层数组.
    #[inline]
    pub fn data(&self) -> &ArrayD<A> {
        &self.data
    }

    /// 单个样本的形状.
    #[inline]
    pub fn item_shape(&self) -> &[usize] {
        &self.data.shape()[1..]
    }
}

impl<A: Clone + ReadableElement> ArrayDataset<A> {
    /// 从 `.npy` 文件读取堆叠数组.
    pub fn from_npy<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let data: ArrayD<A> = ndarray_npy::read_npy(path.as_ref())?;
        if data.ndim() == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "`{}` holds a zero-dimensional array",
                path.as_ref().display()
            )));
        }
        log::info!(
            "array dataset from `{}`: shape {:?}",
            path.as_ref().display(),
            data.shape()
        );
        Ok(Self { data })
    }
}

impl<A: Clone> Dataset for ArrayDataset<A> {
    type Item = ArrayD<A>;

    #[inline]
    fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    fn get(&self, index: usize) -> Result<ArrayD<A>, DatasetError> {
        check_index(index, self.len())?;
        Ok(self.data.index_axis(Axis(0), index).to_owned())
    }
}
