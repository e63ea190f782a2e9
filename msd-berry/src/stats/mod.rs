//! 数据集逐通道均值/标准差统计, 可选差分隐私噪声.

use std::path::{Path, PathBuf};

use either::Either;
use image::DynamicImage;
use ndarray::{Array1, Array2, Array3, Array4, ArrayD, ArrayView, Axis, IxDyn};
use ndarray_npy::{ReadNpyError, WriteNpyError};
use rand::distributions::Distribution;
use rand::Rng;
use thiserror::Error;

use crate::dataset::{Dataset, DatasetError};
use crate::pipeline::Sample;
use crate::transform::to_chw_f32;

pub mod laplace;

pub use laplace::{loo_sensitivity, Laplace, PartialSums};

/// 统计结果文件名.
pub const MEAN_STD_FILE: &str = "mean_std.npy";

/// 统计错误.
#[derive(Debug, Error)]
pub enum StatsError {
    /// 读取样本失败.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// 数据集为空.
    #[error("cannot compute statistics of an empty dataset")]
    Empty,

    /// 样本形状不一致.
    #[error("sample {index} has shape {found:?}, incompatible with {expected:?}")]
    Shape {
        /// 样本索引.
        index: usize,
        /// 期望形状.
        expected: Vec<usize>,
        /// 实际形状.
        found: Vec<usize>,
    },

    /// 隐私预算不合法.
    #[error("privacy budget must be positive and finite, got {0}")]
    InvalidEpsilon(f64),

    /// 样本太少, 无法计算留一法敏感度.
    #[error("leave-one-out sensitivity needs at least two samples of data")]
    TooFewSamples,

    /// 统计结果文件格式错误.
    #[error("`{path}` holds an array of shape {shape:?}, expected (2, c)")]
    BadFile {
        /// 文件路径.
        path: PathBuf,
        /// 实际形状.
        shape: Vec<usize>,
    },

    /// 写出 npy 文件失败.
    #[error("failed to write statistics: {0}")]
    Write(#[from] WriteNpyError),

    /// 读取 npy 文件失败.
    #[error("failed to read statistics: {0}")]
    Read(#[from] ReadNpyError),
}

/// 可参与统计的样本. 转换为 `f32` 动态维数组.
pub trait StatSample {
    /// 转换为数组.
    fn into_stat_array(self) -> ArrayD<f32>;
}

impl StatSample for ArrayD<f32> {
    #[inline]
    fn into_stat_array(self) -> ArrayD<f32> {
        self
    }
}

macro_rules! impl_stat_sample {
    ($($t:ty),*) => {
        $(
            impl StatSample for $t {
                #[inline]
                fn into_stat_array(self) -> ArrayD<f32> {
                    self.into_dyn()
                }
            }
        )*
    };
}

impl_stat_sample!(Array1<f32>, Array2<f32>, Array3<f32>, Array4<f32>);

/// 只统计扫描.
impl StatSample for Sample {
    fn into_stat_array(self) -> ArrayD<f32> {
        match self.scan {
            Either::Left(v) => v.into_dyn(),
            Either::Right(v) => v.into_dyn(),
        }
    }
}

/// 图像转换为 (c, h, w), 像素值缩放到 \[0, 1\].
impl StatSample for DynamicImage {
    fn into_stat_array(self) -> ArrayD<f32> {
        to_chw_f32(&self).into_dyn()
    }
}

/// (输入, 标注) 对只统计输入.
impl<A: StatSample, B> StatSample for (A, B) {
    #[inline]
    fn into_stat_array(self) -> ArrayD<f32> {
        self.0.into_stat_array()
    }
}

/// 样本的合并方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Accumulate {
    /// 新增第 0 轴堆叠, 所有样本形状必须相同.
    #[default]
    Stack,
    /// 沿第 0 轴拼接, 样本除第 0 轴外形状必须相同.
    Concat,
}

/// [`calc_mean_std`] 的选项.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeanStdOptions {
    /// 样本合并方式.
    pub accumulate: Accumulate,
    /// 隐私预算. `None` 表示不加噪声.
    pub epsilon: Option<f64>,
    /// 若非 `None`, 将结果以 [`MEAN_STD_FILE`] 保存到该目录.
    pub save_dir: Option<PathBuf>,
}

/// 逐通道均值与标准差.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeanStd {
    /// 逐通道均值.
    pub mean: Vec<f32>,
    /// 逐通道 (无偏) 标准差.
    pub std: Vec<f32>,
}

impl MeanStd {
    /// 通道数.
    #[inline]
    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    /// 以 (2, c) 的 npy 数组保存到 `dir/mean_std.npy`, 第 0 行为均值, 第 1 行为标准差.
    /// 返回写出的文件路径.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf, StatsError> {
        let path = dir.as_ref().join(MEAN_STD_FILE);
        let arr = Array2::from_shape_fn((2, self.channels()), |(r, c)| {
            if r == 0 {
                self.mean[c]
            } else {
                self.std[c]
            }
        });
        ndarray_npy::write_npy(&path, &arr)?;
        log::info!("saved mean/std to `{}`", path.display());
        Ok(path)
    }

    /// 读取 [`MeanStd::save`] 写出的 `dir/mean_std.npy`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, StatsError> {
        let path = dir.as_ref().join(MEAN_STD_FILE);
        let arr: Array2<f32> = ndarray_npy::read_npy(&path)?;
        if arr.nrows() != 2 {
            return Err(StatsError::BadFile {
                path,
                shape: arr.shape().to_vec(),
            });
        }
        Ok(Self {
            mean: arr.row(0).to_vec(),
            std: arr.row(1).to_vec(),
        })
    }
}

/// 均值与无偏标准差. 元素少于两个时标准差为 0.
fn mean_std_of(view: ArrayView<'_, f32, IxDyn>) -> (f64, f64) {
    let n = view.len() as f64;
    let mean = view.iter().map(|&v| v as f64).sum::<f64>() / n;
    if view.len() < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = view.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
    (mean, (ss / (n - 1.0)).sqrt())
}

/// 按 `mode` 检查样本形状并合并.
fn accumulate(items: &[ArrayD<f32>], mode: Accumulate) -> Result<ArrayD<f32>, StatsError> {
    let first = items[0].shape();
    let expected = match mode {
        Accumulate::Stack => first,
        Accumulate::Concat => first.get(1..).unwrap_or_default(),
    };
    for (index, item) in items.iter().enumerate() {
        let found = match mode {
            Accumulate::Stack => Some(item.shape()),
            Accumulate::Concat => item.shape().get(1..),
        };
        if found != Some(expected) {
            return Err(StatsError::Shape {
                index,
                expected: expected.to_vec(),
                found: item.shape().to_vec(),
            });
        }
    }

    let views: Vec<_> = items.iter().map(|a| a.view()).collect();
    let ans = match mode {
        Accumulate::Stack => ndarray::stack(Axis(0), &views),
        Accumulate::Concat => ndarray::concatenate(Axis(0), &views),
    };
    // 形状已检查.
    Ok(ans.unwrap_or_else(|_| unreachable!()))
}

/// 计算数据集的逐通道均值与标准差.
///
/// 所有样本合并为 `(n, ...)` 数组后, 若第 1 轴长度为 1 或 3, 则视为通道轴,
/// 在其余所有轴上逐通道统计; 否则在全部元素上统计, 结果只有一项.
///
/// 若给定隐私预算 `epsilon`, 则以全局均值与全局标准差的留一法敏感度为基准,
/// 对每个统计量独立加上 `Laplace(0, sensitivity / epsilon)` 噪声.
/// 噪声由 `rng` 唯一确定.
pub fn calc_mean_std<D, R>(
    dataset: &D,
    opts: &MeanStdOptions,
    rng: &mut R,
) -> Result<MeanStd, StatsError>
where
    D: Dataset,
    D::Item: StatSample,
    R: Rng + ?Sized,
{
    if let Some(eps) = opts.epsilon {
        if !(eps > 0.0 && eps.is_finite()) {
            return Err(StatsError::InvalidEpsilon(eps));
        }
    }
    if dataset.is_empty() {
        return Err(StatsError::Empty);
    }

    let mut items = Vec::with_capacity(dataset.len());
    for item in dataset.iter() {
        items.push(item?.into_stat_array());
    }
    let data = accumulate(&items, opts.accumulate)?;
    if data.is_empty() {
        return Err(StatsError::Empty);
    }

    let (mut mean, mut std): (Vec<f64>, Vec<f64>) = match data.shape().get(1).copied() {
        Some(1 | 3) => data
            .axis_iter(Axis(1))
            .map(|chan| mean_std_of(chan.into_dyn()))
            .unzip(),
        _ => {
            let (m, s) = mean_std_of(data.view());
            (vec![m], vec![s])
        }
    };

    if let Some(eps) = opts.epsilon {
        let sums: Vec<PartialSums> = items.iter().map(|a| PartialSums::of(a.iter())).collect();
        let (mean_sens, std_sens) = loo_sensitivity(&sums).ok_or(StatsError::TooFewSamples)?;
        log::warn!(
            "adding Laplace noise with epsilon = {eps}: sensitivity of mean {mean_sens:.6}, std {std_sens:.6}"
        );
        let mean_noise = Laplace::new(0.0, mean_sens / eps).ok_or(StatsError::InvalidEpsilon(eps))?;
        let std_noise = Laplace::new(0.0, std_sens / eps).ok_or(StatsError::InvalidEpsilon(eps))?;
        for m in mean.iter_mut() {
            *m += mean_noise.sample(rng);
        }
        for s in std.iter_mut() {
            *s += std_noise.sample(rng);
        }
    }

    let ans = MeanStd {
        mean: mean.into_iter().map(|v| v as f32).collect(),
        std: std.into_iter().map(|v| v as f32).collect(),
    };
    log::info!(
        "mean/std over {} samples: mean {:?}, std {:?}",
        items.len(),
        ans.mean,
        ans.std
    );
    if let Some(dir) = &opts.save_dir {
        ans.save(dir)?;
    }
    Ok(ans)
}
