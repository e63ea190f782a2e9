//! 扁平目录图像数据集. 按扩展名筛选文件, 通过可替换的加载器读取.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageResult};

use super::{check_index, list_files, require_dir, Dataset, DatasetError};
use crate::consts::IMAGE_EXTENSIONS;
use crate::transform::rgb_loader;

/// 图像加载器.
pub type Loader<T> = Box<dyn Fn(&Path) -> ImageResult<T> + Send + Sync>;

/// 判断 `name` 的扩展名 (忽略大小写) 是否在 `extensions` 中.
fn has_extension(name: &str, extensions: &[&str]) -> bool {
    match name.rfind('.') {
        Some(dot) => {
            let ext = name[dot..].to_ascii_lowercase();
            extensions.iter().any(|e| *e == ext)
        }
        None => false,
    }
}

/// 扁平目录图像数据集.
pub struct PathDataset<T> {
    root: PathBuf,
    files: Vec<String>,
    loader: Loader<T>,
}

impl<T> fmt::Debug for PathDataset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathDataset")
            .field("root", &self.root)
            .field("files", &self.files)
            .finish()
    }
}

impl PathDataset<DynamicImage> {
    /// 以默认扩展名列表和 RGB 加载器创建数据集.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, DatasetError> {
        Self::with_loader(root, &IMAGE_EXTENSIONS, |p: &Path| rgb_loader(p))
    }
}

impl<T> PathDataset<T> {
    /// 以自定义扩展名列表 (小写, 含点) 和加载器创建数据集.
    ///
    /// `root` 必须是目录. 文件按文件名升序排列, `._` 附属文件会被忽略.
    pub fn with_loader<P, F>(root: P, extensions: &[&str], loader: F) -> Result<Self, DatasetError>
    where
        P: AsRef<Path>,
        F: Fn(&Path) -> ImageResult<T> + Send + Sync + 'static,
    {
        let root = root.as_ref().to_owned();
        require_dir(&root)?;
        let files = list_files(&root, |n| has_extension(n, extensions))?;
        log::info!("image folder `{}`: {} files", root.display(), files.len());
        Ok(Self {
            root,
            files,
            loader: Box::new(loader),
        })
    }

    /// 第 `index` 个文件的完整路径. 越界时返回 `None`.
    #[inline]
    pub fn path(&self, index: usize) -> Option<PathBuf> {
        self.files.get(index).map(|f| self.root.join(f))
    }
}

impl<T> Dataset for PathDataset<T> {
    type Item = T;

    #[inline]
    fn len(&self) -> usize {
        self.files.len()
    }

    fn get(&self, index: usize) -> Result<T, DatasetError> {
        check_index(index, self.len())?;
        let path = self.root.join(&self.files[index]);
        (self.loader)(&path).map_err(|source| DatasetError::Image { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_util::scratch_dir;
    use crate::transform::{gray_loader, to_chw_f32};
    use image::{GenericImageView, Rgb, RgbImage};
    use std::fs;

    #[test]
    fn test_has_extension() {
        assert!(has_extension("a.PNG", &IMAGE_EXTENSIONS));
        assert!(has_extension("scan.dicom", &IMAGE_EXTENSIONS));
        assert!(!has_extension("notes.txt", &IMAGE_EXTENSIONS));
        assert!(!has_extension("png", &IMAGE_EXTENSIONS));
    }

    #[test]
    fn test_path_dataset() {
        let dir = scratch_dir("path-dataset");
        for name in ["b.png", "A.PNG"] {
            RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]))
                .save_with_format(dir.join(name), image::ImageFormat::Png)
                .unwrap();
        }
        fs::write(dir.join("readme.txt"), b"x").unwrap();
        fs::write(dir.join("._b.png"), b"").unwrap();

        let ds = PathDataset::new(&dir).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.path(0).unwrap(), dir.join("A.PNG"));
        assert_eq!(ds.get(1).unwrap().dimensions(), (3, 2));

        // 扩展名匹配忽略大小写.
        let gray = PathDataset::with_loader(&dir, &[".png"], |p: &Path| gray_loader(p))
            .unwrap()
            .map(|img| to_chw_f32(&img));
        assert_eq!(gray.len(), 2);
        assert_eq!(gray.get(0).unwrap().dim(), (1, 2, 3));

        let text = PathDataset::with_loader(&dir, &[".txt"], |p: &Path| gray_loader(p)).unwrap();
        assert_eq!(text.len(), 1);
        assert_eq!(text.path(0).unwrap(), dir.join("readme.txt"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_broken_file() {
        let dir = scratch_dir("path-dataset-broken");
        fs::write(dir.join("x.jpg"), b"not a jpeg").unwrap();
        let ds = PathDataset::new(&dir).unwrap();
        assert!(matches!(ds.get(0), Err(DatasetError::Image { .. })));
        fs::remove_dir_all(dir).unwrap();
    }
}
