#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为 MSD (Medical Segmentation Decathlon) 体数据与自然图像分割实验
//! 提供数据集适配器, 3D 预处理流水线和 (差分隐私) 数据统计.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体数据在内存中统一使用 `(z, h, w)` 布局, 即第 0 轴为深度.
//!   nifti 文件中的 `(x, y, z)` 布局在读取时完成转换.
//! 2. 调用方违反函数文档 "注意" 一节中的约定时, 程序会直接 panic;
//!   数据本身的问题 (文件缺失, 空标签等) 则以 `Result` 返回.
//!
//! # 开发计划
//!
//! ### MSD 体数据读取 ✅
//!
//! 扫描 (`f32`) 与标注 (`u8`) 成对读取, 形状必须一致.
//!
//! 实现位于 `msd-berry/src/data`.
//!
//! ### 3D 预处理流水线 ✅
//!
//! 1. HU 裁剪到 `[-150, 200]` 并缩放到 `[0, 1]`. ✅
//! 2. 统一方向, 可选合并器官与肿瘤标签. ✅
//! 3. 可选以包围盒替换标签 (掩码或坐标). ✅
//! 4. 以包围盒深度中点为中心沿 z 轴裁剪. ✅
//! 5. 扫描线性插值, 标注最近邻插值缩放到 `(res_z, res, res)`. ✅
//! 6. 可选拆分为 `(res_z, 1, res, res)` 的切片堆. ✅
//!
//! 启用 `rayon` feature 时, 缩放按输出切片并行.
//!
//! 实现位于 `msd-berry/src/pipeline`.
//!
//! ### 数据集适配器 ✅
//!
//! MSD 体数据, 预烘焙 2D 切片, 扁平图像目录, RGB 彩色标注分割数据,
//! 内存数组, 子集与随机划分.
//!
//! 实现位于 `msd-berry/src/dataset`.
//!
//! ### 分割标签颜色映射 ✅
//!
//! 实现位于 `msd-berry/src/color.rs`.
//!
//! ### 差分隐私均值/标准差 ✅
//!
//! 以留一法敏感度校准 Laplace 噪声.
//!
//! 实现位于 `msd-berry/src/stats`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

/// 3D nii 文件基础数据结构.
mod data;

pub use data::{
    BoundingBox, HuWindow, MsdData3d, MsdLabel, MsdScan, NiftiHeaderAttr, OpenVolumeError,
};

pub use data::{bbox, window};

pub mod consts;

pub mod pipeline;

pub mod color;

pub mod transform;

pub mod dataset;
pub mod prelude;
pub mod stats;
