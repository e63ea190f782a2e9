//! 数据集操作.
//!
//! 所有数据集适配器都实现 [`Dataset`]: 构造时一次性建立 "索引 -> 文件路径"
//! 映射, 之后只读. 因此同一实例可以在多个线程中共享.

use std::env;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use thiserror::Error;

use crate::consts::is_apple_double;
use crate::data::OpenVolumeError;
use crate::pipeline::PreprocessError;

pub mod array;
pub mod msd;
pub mod msd_images;
pub mod path;
pub mod segmentation;
pub mod split;

pub use array::ArrayDataset;
pub use msd::{MsdConfig, MsdVolumes};
pub use msd_images::SliceImages;
pub use path::PathDataset;
pub use segmentation::SegmentationData;
pub use split::{random_split, Subset};

/// 数据集错误.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 必需的目录不存在.
    #[error("directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    /// 扫描文件没有对应的标注文件.
    #[error("scan `{scan}` has no matching label `{label}`")]
    MissingLabel {
        /// 扫描文件路径.
        scan: PathBuf,
        /// 期望的标注文件路径.
        label: PathBuf,
    },

    /// 输入与标注目录中的文件名不一致.
    #[error("input files ({inputs}) and label files ({labels}) do not match by name")]
    NameMismatch {
        /// 输入文件个数.
        inputs: usize,
        /// 标注文件个数.
        labels: usize,
    },

    /// 文件名不是从 0 开始的连续编号.
    #[error("file `{name}` in `{dir}` is not named by a sample index")]
    NotIndexed {
        /// 所在目录.
        dir: PathBuf,
        /// 文件名.
        name: String,
    },

    /// 索引越界.
    #[error("index {index} is out of range for dataset of length {len}")]
    IndexOutOfRange {
        /// 请求的索引.
        index: usize,
        /// 数据集长度.
        len: usize,
    },

    /// 配置不合法.
    #[error("invalid dataset config: {0}")]
    InvalidConfig(String),

    /// 划分长度之和与数据集长度不一致.
    #[error("sum of split lengths ({sum}) does not equal dataset length ({len})")]
    SplitLengths {
        /// 划分长度之和.
        sum: usize,
        /// 数据集长度.
        len: usize,
    },

    /// 底层 I/O 错误.
    #[error("I/O error at `{path}`: {source}")]
    Io {
        /// 出错路径.
        path: PathBuf,
        /// 原始错误.
        source: io::Error,
    },

    /// 读取体数据失败.
    #[error("failed to open volume `{path}`: {source}")]
    Volume {
        /// 出错路径.
        path: PathBuf,
        /// 原始错误.
        source: OpenVolumeError,
    },

    /// 预处理失败.
    #[error("failed to preprocess `{path}`: {source}")]
    Preprocess {
        /// 扫描路径.
        path: PathBuf,
        /// 原始错误.
        source: PreprocessError,
    },

    /// 读取图像失败.
    #[error("failed to load image `{path}`: {source}")]
    Image {
        /// 出错路径.
        path: PathBuf,
        /// 原始错误.
        source: image::ImageError,
    },

    /// 读取 npy 文件失败.
    #[error("failed to read npy array: {0}")]
    Npy(#[from] ndarray_npy::ReadNpyError),
}

/// 检查 `index` 是否小于 `len`.
#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<(), DatasetError> {
    if index < len {
        Ok(())
    } else {
        Err(DatasetError::IndexOutOfRange { index, len })
    }
}

/// 断言 `path` 是目录.
pub(crate) fn require_dir(path: &Path) -> Result<(), DatasetError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DatasetError::MissingDirectory(path.to_owned()))
    }
}

/// 按文件名升序列出 `dir` 下满足 `pred` 的普通文件名. `._` 附属文件会被忽略.
pub(crate) fn list_files<F>(dir: &Path, pred: F) -> Result<Vec<String>, DatasetError>
where
    F: Fn(&str) -> bool,
{
    let io_err = |source| DatasetError::Io {
        path: dir.to_owned(),
        source,
    };
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if !is_apple_double(&name) && pred(&name) {
            names.push(name);
        }
    }
    Ok(names.into_iter().sorted().collect())
}

/// 可按索引随机访问的只读数据集.
pub trait Dataset {
    /// 单个样本的类型.
    type Item;

    /// 样本个数.
    fn len(&self) -> usize;

    /// 获取第 `index` 个样本. 越界时返回 [`DatasetError::IndexOutOfRange`].
    fn get(&self, index: usize) -> Result<Self::Item, DatasetError>;

    /// 数据集是否为空.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按顺序获取 `range` 内的所有样本. 任一样本失败则返回 `Err`.
    fn get_range(&self, range: Range<usize>) -> Result<Vec<Self::Item>, DatasetError> {
        if range.end > self.len() {
            return Err(DatasetError::IndexOutOfRange {
                index: range.end.saturating_sub(1),
                len: self.len(),
            });
        }
        range.map(|i| self.get(i)).collect()
    }

    /// 获取按索引升序迭代样本的迭代器.
    #[inline]
    fn iter(&self) -> DatasetIter<'_, Self>
    where
        Self: Sized,
    {
        DatasetIter {
            dataset: self,
            next: 0,
        }
    }

    /// 对每个样本施加变换 `f`.
    #[inline]
    fn map<F, U>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Item) -> U,
    {
        Map { dataset: self, f }
    }
}

impl<D: Dataset + ?Sized> Dataset for Arc<D> {
    type Item = D::Item;

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn get(&self, index: usize) -> Result<Self::Item, DatasetError> {
        (**self).get(index)
    }
}

impl<D: Dataset + ?Sized> Dataset for &D {
    type Item = D::Item;

    #[inline]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn get(&self, index: usize) -> Result<Self::Item, DatasetError> {
        (**self).get(index)
    }
}

/// 数据集迭代器, 见 [`Dataset::iter`].
#[derive(Debug)]
pub struct DatasetIter<'a, D> {
    dataset: &'a D,
    next: usize,
}

impl<D: Dataset> Iterator for DatasetIter<'_, D> {
    type Item = Result<D::Item, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.dataset.len() {
            return None;
        }
        let item = self.dataset.get(self.next);
        self.next += 1;
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.dataset.len().saturating_sub(self.next);
        (rest, Some(rest))
    }
}

impl<D: Dataset> ExactSizeIterator for DatasetIter<'_, D> {}

/// 变换后的数据集, 见 [`Dataset::map`].
#[derive(Debug, Clone)]
pub struct Map<D, F> {
    dataset: D,
    f: F,
}

impl<D, F, U> Dataset for Map<D, F>
where
    D: Dataset,
    F: Fn(D::Item) -> U,
{
    type Item = U;

    #[inline]
    fn len(&self) -> usize {
        self.dataset.len()
    }

    #[inline]
    fn get(&self, index: usize) -> Result<U, DatasetError> {
        self.dataset.get(index).map(&self.f)
    }
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 获取 MSD 任务数据集根目录.
///
/// 1. 若环境变量 `$MSD_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/msd`. 无法确定主目录时返回 `None`.
pub fn msd_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("MSD_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(["msd"]),
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::path::PathBuf;

    /// 在系统临时目录下创建一个空的、本测试独占的目录.
    pub fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "msd-berry-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
