//! 通用常量.

/// 单通道标签值.
pub mod gray {
    /// MSD 数据集中, 背景的体素值.
    pub const MSD_BACKGROUND: u8 = 0;

    /// MSD 胰腺任务中, 胰腺 (器官) 的体素值.
    pub const MSD_ORGAN: u8 = 1;

    /// MSD 胰腺任务中, 肿瘤的体素值.
    pub const MSD_TUMOR: u8 = 2;

    /// 合并标签后前景的体素值.
    pub const MERGED_FOREGROUND: u8 = 1;

    /// 体素是否是器官或肿瘤?
    #[inline]
    pub const fn is_organ_or_tumor(p: u8) -> bool {
        matches!(p, MSD_ORGAN | MSD_TUMOR)
    }
}

/// CT 强度 (HU) 裁剪下限.
pub const HU_CLIP_LOWER: f32 = -150.0;

/// CT 强度 (HU) 裁剪上限.
pub const HU_CLIP_UPPER: f32 = 200.0;

/// 默认 z 方向裁剪高度.
pub const DEFAULT_CROP_HEIGHT: usize = 32;

/// z 方向裁剪高度必须是该值的整数倍.
pub const CROP_HEIGHT_ALIGN: usize = 16;

/// 分割数据集目标图像的中心裁剪边长.
pub const SEGMENTATION_CROP: u32 = 240;

/// MSD 训练集扫描所在子目录.
pub const MSD_SCAN_DIR: &str = "imagesTr";

/// MSD 训练集标签所在子目录.
pub const MSD_LABEL_DIR: &str = "labelsTr";

/// 路径数据集默认接受的图像扩展名 (小写, 含点).
pub const IMAGE_EXTENSIONS: [&str; 11] = [
    ".jpg", ".jpeg", ".png", ".ppm", ".bmp", ".pgm", ".tif", ".tiff", ".webp", ".dcm", ".dicom",
];

/// 判断文件名是否是 macOS 生成的 `._` 附属文件.
#[inline]
pub fn is_apple_double(file_name: &str) -> bool {
    file_name.starts_with("._")
}
