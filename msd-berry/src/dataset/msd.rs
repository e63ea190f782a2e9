//! MSD (Medical Segmentation Decathlon) 3D 体数据集.
//!
//! 目录格式为 `<root>/imagesTr/*.nii[.gz]` 与 `<root>/labelsTr/*.nii[.gz]`,
//! 扫描与标注按文件名一一对应.

use std::path::{Path, PathBuf};

use super::{check_index, list_files, require_dir, Dataset, DatasetError};
use crate::consts::gray::{MSD_ORGAN, MSD_TUMOR};
use crate::consts::{CROP_HEIGHT_ALIGN, DEFAULT_CROP_HEIGHT, MSD_LABEL_DIR, MSD_SCAN_DIR};
use crate::data::{HuWindow, MsdData3d, NiftiHeaderAttr};
use crate::pipeline::{LabelMode, Layout, Preprocessor, Sample};

/// MSD 体数据集配置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MsdConfig {
    /// 输出水平切片边长.
    pub res: usize,

    /// 输出 z 方向层数.
    pub res_z: usize,

    /// 最多使用的样本个数. `None` 表示全部.
    pub sample_limit: Option<usize>,

    /// z 方向裁剪高度, 必须是 16 的正整数倍.
    pub crop_height: usize,

    /// 输出布局.
    pub layout: Layout,

    /// 标签模式.
    pub label_mode: LabelMode,

    /// 是否将器官与肿瘤合并为同一前景.
    pub merge_labels: bool,

    /// 强度裁剪窗口.
    pub window: HuWindow,
}

impl Default for MsdConfig {
    fn default() -> Self {
        Self {
            res: 64,
            res_z: 32,
            sample_limit: None,
            crop_height: DEFAULT_CROP_HEIGHT,
            layout: Layout::default(),
            label_mode: LabelMode::default(),
            merge_labels: true,
            window: HuWindow::abdomen(),
        }
    }
}

impl MsdConfig {
    /// 检查配置是否合法.
    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.crop_height == 0 || self.crop_height % CROP_HEIGHT_ALIGN != 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "crop height {} is not a positive multiple of {CROP_HEIGHT_ALIGN}",
                self.crop_height
            )));
        }
        if self.res == 0 || self.res_z == 0 {
            return Err(DatasetError::InvalidConfig(format!(
                "output resolution {}x{}x{} is empty",
                self.res_z, self.res, self.res
            )));
        }
        Ok(())
    }

    /// 由配置构建预处理器.
    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(self.res, self.res_z, self.crop_height)
            .window(self.window)
            .merge(self.merge_labels.then_some([MSD_ORGAN, MSD_TUMOR]))
            .label_mode(self.label_mode)
            .layout(self.layout)
    }
}

#[inline]
fn is_nifti(name: &str) -> bool {
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}

/// MSD 3D 体数据集.
///
/// 每次 [`Dataset::get`] 都会从硬盘读取一对体数据并执行完整的预处理流水线.
#[derive(Clone, Debug)]
pub struct MsdVolumes {
    root: PathBuf,
    pairs: Vec<(PathBuf, PathBuf)>,
    preprocessor: Preprocessor,
}

impl MsdVolumes {
    /// 从数据集根目录 `root` 创建数据集.
    ///
    /// `root/imagesTr` 与 `root/labelsTr` 必须存在, 且每个扫描文件都有同名标注文件,
    /// 否则返回 `Err`.
    pub fn new<P: AsRef<Path>>(root: P, config: &MsdConfig) -> Result<Self, DatasetError> {
        config.validate()?;
        let root = root.as_ref().to_owned();
        let scan_dir = root.join(MSD_SCAN_DIR);
        let label_dir = root.join(MSD_LABEL_DIR);
        require_dir(&scan_dir)?;
        require_dir(&label_dir)?;

        let names = list_files(&scan_dir, is_nifti)?;
        let limit = config.sample_limit.unwrap_or(usize::MAX);
        let mut pairs = Vec::with_capacity(names.len().min(limit));
        for name in names.into_iter().take(limit) {
            let scan = scan_dir.join(&name);
            let label = label_dir.join(&name);
            if !label.is_file() {
                return Err(DatasetError::MissingLabel { scan, label });
            }
            pairs.push((scan, label));
        }

        log::info!("MSD dataset at `{}`: {} volumes", root.display(), pairs.len());
        Ok(Self {
            root,
            pairs,
            preprocessor: config.preprocessor(),
        })
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 第 `index` 个样本的 (扫描路径, 标注路径). 越界时返回 `None`.
    #[inline]
    pub fn paths(&self, index: usize) -> Option<(&Path, &Path)> {
        self.pairs
            .get(index)
            .map(|(s, l)| (s.as_path(), l.as_path()))
    }

    /// 读取第 `index` 个样本的原始体数据, 不做预处理.
    pub fn load_raw(&self, index: usize) -> Result<MsdData3d, DatasetError> {
        check_index(index, self.len())?;
        let (scan, label) = &self.pairs[index];
        let data = MsdData3d::open(scan, label).map_err(|source| DatasetError::Volume {
            path: scan.clone(),
            source,
        })?;
        let [background, organ, tumor] = data.label.numeric_statistics();
        log::debug!(
            "loaded `{}`: shape {:?}, spacing {:?} mm, voxels (bg/organ/tumor) {background}/{organ}/{tumor}, \
             {} foreground slices, bbox {:?}",
            scan.display(),
            data.scan.shape(),
            data.scan.pix_dim(),
            data.label.foreground_slices(),
            data.label.bounding_box().map(|b| b.to_array())
        );
        Ok(data)
    }
}

impl Dataset for MsdVolumes {
    type Item = Sample;

    #[inline]
    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn get(&self, index: usize) -> Result<Sample, DatasetError> {
        let (scan, label) = self.load_raw(index)?.into_arrays();
        self.preprocessor
            .run(scan, label)
            .map_err(|source| DatasetError::Preprocess {
                path: self.pairs[index].0.clone(),
                source,
            })
    }
}
