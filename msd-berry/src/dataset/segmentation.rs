//! RGB 彩色标注的自然图像分割数据集.
//!
//! 目录格式:
//!
//! ```text
//! <root>/
//!   <list file>        每行一个图像名, 如 `1_1_s.bmp`
//!   images/{id}.bmp
//!   targets/{id}_GT.bmp
//! ```
//!
//! 其中 `id` 为去掉 `.bmp` 后缀的图像名.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::{Array2, Array3};

use super::{check_index, require_dir, Dataset, DatasetError};
use crate::color::rgb_to_labels;
use crate::consts::SEGMENTATION_CROP;
use crate::transform::{center_crop, rgb_loader};

/// 分割数据集.
#[derive(Clone, Debug)]
pub struct SegmentationData {
    root: PathBuf,
    names: Vec<String>,
}

impl SegmentationData {
    /// 从图像名列表文件 `list_file` 创建数据集. 数据集根目录为其所在目录.
    ///
    /// 空行与首尾空白会被忽略.
    pub fn new<P: AsRef<Path>>(list_file: P) -> Result<Self, DatasetError> {
        let list_file = list_file.as_ref();
        let text = fs::read_to_string(list_file).map_err(|source| DatasetError::Io {
            path: list_file.to_owned(),
            source,
        })?;
        let root = list_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        require_dir(&root.join("images"))?;
        require_dir(&root.join("targets"))?;

        let names: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        log::info!(
            "segmentation dataset from `{}`: {} images",
            list_file.display(),
            names.len()
        );
        Ok(Self { root, names })
    }

    /// 数据集根目录.
    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 第 `index` 个样本的 id. 越界时返回 `None`.
    pub fn id(&self, index: usize) -> Option<&str> {
        self.names
            .get(index)
            .map(|n| n.strip_suffix(".bmp").unwrap_or(n))
    }
}

impl Dataset for SegmentationData {
    /// (RGB 图像, (240, 240) 的类别 id 图).
    type Item = (DynamicImage, Array2<i64>);

    #[inline]
    fn len(&self) -> usize {
        self.names.len()
    }

    fn get(&self, index: usize) -> Result<Self::Item, DatasetError> {
        check_index(index, self.len())?;
        let id = self.id(index).unwrap_or_default();

        let image_path = self.root.join("images").join(format!("{id}.bmp"));
        let image = rgb_loader(&image_path).map_err(|source| DatasetError::Image {
            path: image_path,
            source,
        })?;

        let target_path = self.root.join("targets").join(format!("{id}_GT.bmp"));
        let target = rgb_loader(&target_path).map_err(|source| DatasetError::Image {
            path: target_path,
            source,
        })?;
        let target = center_crop(&target, SEGMENTATION_CROP).into_rgb8();
        let (w, h) = target.dimensions();
        let rgb = Array3::from_shape_vec((h as usize, w as usize, 3), target.into_raw())
            .unwrap_or_else(|_| unreachable!());
        log::debug!("loaded segmentation sample `{id}`");
        Ok((image, rgb_to_labels(rgb.view())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{by_name, BACKGROUND_ID};
    use crate::dataset::test_util::scratch_dir;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};

    #[test]
    fn test_segmentation_data() {
        let root = scratch_dir("segmentation");
        fs::create_dir(root.join("images")).unwrap();
        fs::create_dir(root.join("targets")).unwrap();
        fs::write(root.join("list.txt"), "1_1_s.bmp\n\n  2_1_s.bmp \n").unwrap();

        let grass = by_name("grass").unwrap();
        for id in ["1_1_s", "2_1_s"] {
            RgbImage::from_pixel(300, 250, Rgb([1, 2, 3]))
                .save_with_format(root.join("images").join(format!("{id}.bmp")), ImageFormat::Bmp)
                .unwrap();
            // 左半部分为草地, 右半部分为未登记颜色.
            RgbImage::from_fn(300, 250, |x, _| {
                if x < 150 {
                    Rgb(grass.rgb)
                } else {
                    Rgb([1, 254, 7])
                }
            })
            .save_with_format(
                root.join("targets").join(format!("{id}_GT.bmp")),
                ImageFormat::Bmp,
            )
            .unwrap();
        }

        let ds = SegmentationData::new(root.join("list.txt")).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.id(1), Some("2_1_s"));

        let (image, ids) = ds.get(1).unwrap();
        assert_eq!(image.dimensions(), (300, 250));
        assert_eq!(ids.dim(), (240, 240));
        // 裁剪左边界为 30, 故列 119 仍在草地内, 列 120 已在右半部分.
        assert_eq!(ids[(0, 119)], grass.id);
        assert_eq!(ids[(239, 120)], BACKGROUND_ID);

        assert!(matches!(
            ds.get(2),
            Err(DatasetError::IndexOutOfRange { .. })
        ));
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_missing_list_file() {
        let root = scratch_dir("segmentation-missing");
        assert!(matches!(
            SegmentationData::new(root.join("list.txt")),
            Err(DatasetError::Io { .. })
        ));
        fs::remove_dir_all(root).unwrap();
    }
}
