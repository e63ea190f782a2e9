//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::window::HuWindow;
pub use crate::{BoundingBox, MsdData3d, MsdLabel, MsdScan, NiftiHeaderAttr};

pub use crate::consts::gray::{MERGED_FOREGROUND, MSD_BACKGROUND, MSD_ORGAN, MSD_TUMOR};

pub use crate::pipeline::{LabelMode, Layout, PreprocessError, Preprocessor, Sample, Target};

pub use crate::dataset::{
    self, msd_dir_from_env_or_home, ArrayDataset, Dataset, DatasetError, MsdConfig, MsdVolumes,
    PathDataset, SegmentationData, SliceImages,
};

pub use crate::stats::{calc_mean_std, MeanStd, MeanStdOptions};
