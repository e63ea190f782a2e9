//! 已预处理为 2D 图像的 MSD 切片数据集.
//!
//! 目录格式为 `<root>/inputs/{i}.jpg` 与 `<root>/labels/{i}.jpg`.

use std::fmt;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::{Array2, Array3};

use super::{check_index, list_files, require_dir, Dataset, DatasetError};
use crate::transform::{binarize_mask, to_chw_f32};

/// 对 (输入图像, 标注图像) 联合施加的变换.
pub type PairTransform<T> = Box<dyn Fn(DynamicImage, DynamicImage) -> T + Send + Sync>;

/// 默认联合变换: 输入转换为 (1, h, w) 的 \[0, 1\] 灰度数组,
/// 标注二值化为 (h, w) 的 0/1 数组.
pub fn gray_pair_to_arrays(input: DynamicImage, label: DynamicImage) -> (Array3<f32>, Array2<f32>) {
    let scan = to_chw_f32(&DynamicImage::ImageLuma8(input.into_luma8()));
    let mask = label.into_luma8();
    let (w, h) = mask.dimensions();
    let mask = Array2::from_shape_vec((h as usize, w as usize), mask.into_raw())
        .unwrap_or_else(|_| unreachable!());
    (scan, binarize_mask(&mask))
}

/// 2D 图像/标注对数据集.
pub struct SliceImages<T> {
    input_dir: PathBuf,
    label_dir: PathBuf,
    names: Vec<String>,
    transform: PairTransform<T>,
}

impl<T> fmt::Debug for SliceImages<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceImages")
            .field("input_dir", &self.input_dir)
            .field("label_dir", &self.label_dir)
            .field("len", &self.names.len())
            .finish()
    }
}

impl SliceImages<(Array3<f32>, Array2<f32>)> {
    /// 以默认变换 [`gray_pair_to_arrays`] 创建数据集.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, DatasetError> {
        Self::with_transform(root, gray_pair_to_arrays)
    }
}

impl<T> SliceImages<T> {
    /// 以自定义联合变换创建数据集.
    ///
    /// `root/inputs` 与 `root/labels` 必须存在, 两者排序后的文件名列表完全一致,
    /// 且文件名恰为 `0.jpg` 到 `{n-1}.jpg`, 否则返回 `Err`.
    pub fn with_transform<P, F>(root: P, transform: F) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
        F: Fn(DynamicImage, DynamicImage) -> T + Send + Sync + 'static,
    {
        let input_dir = root.as_ref().join("inputs");
        let label_dir = root.as_ref().join("labels");
        require_dir(&input_dir)?;
        require_dir(&label_dir)?;

        let names = list_files(&input_dir, |_| true)?;
        let labels = list_files(&label_dir, |_| true)?;
        if names != labels {
            return Err(DatasetError::NameMismatch {
                inputs: names.len(),
                labels: labels.len(),
            });
        }
        check_indexed(&input_dir, &names)?;

        log::info!(
            "slice image dataset at `{}`: {} pairs",
            root.as_ref().display(),
            names.len()
        );
        Ok(Self {
            input_dir,
            label_dir,
            names,
            transform: Box::new(transform),
        })
    }
}

/// 检查 `names` 恰为 `0.jpg`, `1.jpg`, ..., `{n-1}.jpg`.
fn check_indexed(dir: &Path, names: &[String]) -> Result<(), DatasetError> {
    let mut seen = vec![false; names.len()];
    for name in names {
        let index = name
            .strip_suffix(".jpg")
            .and_then(|stem| stem.parse::<usize>().ok())
            .filter(|&i| i < names.len() && format!("{i}.jpg") == *name);
        match index {
            Some(i) if !seen[i] => seen[i] = true,
            _ => {
                return Err(DatasetError::NotIndexed {
                    dir: dir.to_owned(),
                    name: name.clone(),
                })
            }
        }
    }
    Ok(())
}

fn open_image(path: PathBuf) -> Result<DynamicImage, DatasetError> {
    image::open(&path).map_err(|source| DatasetError::Image { path, source })
}

impl<T> Dataset for SliceImages<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        self.names.len()
    }

    /// 读取 `inputs/{index}.jpg` 与 `labels/{index}.jpg`.
    fn get(&self, index: usize) -> Result<T, DatasetError> {
        check_index(index, self.len())?;
        let input = open_image(self.input_dir.join(format!("{index}.jpg")))?;
        let label = open_image(self.label_dir.join(format!("{index}.jpg")))?;
        Ok((self.transform)(input, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_util::scratch_dir;
    use image::{GenericImageView, GrayImage, Luma};
    use std::fs;

    fn make_root(name: &str, n: usize) -> PathBuf {
        let root = scratch_dir(name);
        fs::create_dir(root.join("inputs")).unwrap();
        fs::create_dir(root.join("labels")).unwrap();
        for i in 0..n {
            GrayImage::from_pixel(6, 4, Luma([200]))
                .save(root.join("inputs").join(format!("{i}.jpg")))
                .unwrap();
            let mut mask = GrayImage::new(6, 4);
            for x in 0..3 {
                for y in 0..4 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
            mask.save(root.join("labels").join(format!("{i}.jpg")))
                .unwrap();
        }
        root
    }

    #[test]
    fn test_slice_images() {
        let root = make_root("slice-images", 2);
        let ds = SliceImages::new(&root).unwrap();
        assert_eq!(ds.len(), 2);

        let (scan, mask) = ds.get(1).unwrap();
        assert_eq!(scan.dim(), (1, 4, 6));
        assert_eq!(mask.dim(), (4, 6));
        // jpeg 有损, 只检查远离边界的像素.
        assert_eq!(mask[(1, 0)], 1.0);
        assert_eq!(mask[(1, 5)], 0.0);
        assert!(scan.iter().all(|&v| (0.0..=1.0).contains(&v)));

        assert!(ds.get(2).is_err());
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_name_mismatch() {
        let root = make_root("slice-images-mismatch", 2);
        fs::remove_file(root.join("labels").join("1.jpg")).unwrap();
        assert!(matches!(
            SliceImages::new(&root),
            Err(DatasetError::NameMismatch {
                inputs: 2,
                labels: 1
            })
        ));
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_names_not_indexed() {
        let root = make_root("slice-images-unindexed", 2);
        for dir in ["inputs", "labels"] {
            fs::copy(root.join(dir).join("1.jpg"), root.join(dir).join("extra.jpg")).unwrap();
        }
        assert!(matches!(
            SliceImages::new(&root),
            Err(DatasetError::NotIndexed { ref name, .. }) if name == "extra.jpg"
        ));

        // 个数一致但编号有缺口.
        for dir in ["inputs", "labels"] {
            fs::remove_file(root.join(dir).join("extra.jpg")).unwrap();
            fs::rename(root.join(dir).join("1.jpg"), root.join(dir).join("2.jpg")).unwrap();
        }
        assert!(matches!(
            SliceImages::new(&root),
            Err(DatasetError::NotIndexed { ref name, .. }) if name == "2.jpg"
        ));
        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_custom_transform() {
        let root = make_root("slice-images-custom", 1);
        let ds = SliceImages::with_transform(&root, |a, b| (a.width(), b.height())).unwrap();
        assert_eq!(ds.get(0).unwrap(), (6, 4));
        fs::remove_dir_all(root).unwrap();
    }
}
