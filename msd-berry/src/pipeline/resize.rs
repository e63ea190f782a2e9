//! 三维重采样.
//!
//! 坐标映射与 `skimage.transform.resize` 一致: 输出体素中心
//! `o` 映射到输入坐标 `(o + 0.5) * in / out - 0.5`, 越界时截断到边缘体素.
//! 不做抗混叠滤波.

use crate::data::BoundingBox;
use crate::Idx3d;
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 插值方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Interpolation {
    /// 最近邻 (order 0), 用于类别数据.
    Nearest,

    /// 线性 (order 1), 用于连续数据.
    Linear,
}

/// 输出索引 `o` 在输入轴上的连续坐标, 截断到 `[0, len_in - 1]`.
#[inline]
fn source_coord(o: usize, len_in: usize, len_out: usize) -> f64 {
    let scale = len_in as f64 / len_out as f64;
    let c = (o as f64 + 0.5) * scale - 0.5;
    c.clamp(0.0, (len_in - 1) as f64)
}

/// 线性插值查找表: 每个输出索引对应 (下邻, 上邻, 上邻权重).
fn linear_table(len_in: usize, len_out: usize) -> Vec<(usize, usize, f32)> {
    (0..len_out)
        .map(|o| {
            let c = source_coord(o, len_in, len_out);
            let lo = c.floor() as usize;
            let hi = (lo + 1).min(len_in - 1);
            (lo, hi, (c - lo as f64) as f32)
        })
        .collect()
}

/// 最近邻查找表.
fn nearest_table(len_in: usize, len_out: usize) -> Vec<usize> {
    (0..len_out)
        .map(|o| {
            let c = source_coord(o, len_in, len_out);
            ((c + 0.5).floor() as usize).min(len_in - 1)
        })
        .collect()
}

/// 逐个输出水平切片调用 `op`. 开启 `rayon` feature 时并行执行.
fn for_each_out_slice<T, F>(out: &mut Array3<T>, op: F)
where
    T: Send + Sync,
    F: Fn(usize, ArrayViewMut2<T>) + Sync + Send,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            out.axis_iter_mut(Axis(0))
                .into_par_iter()
                .enumerate()
                .for_each(|(z, s)| op(z, s));
        } else {
            out.axis_iter_mut(Axis(0))
                .enumerate()
                .for_each(|(z, s)| op(z, s));
        }
    }
}

#[inline]
fn check_input(shape: Idx3d) {
    let (z, h, w) = shape;
    assert!(z > 0 && h > 0 && w > 0, "无法对空体数据重采样: {shape:?}");
}

/// 以最近邻插值将 `src` 重采样为 `shape`.
///
/// # 注意
///
/// `src` 的任一维为 0 时程序 panic.
pub fn resize_nearest<T>(src: ArrayView3<T>, shape: Idx3d) -> Array3<T>
where
    T: Copy + Default + Send + Sync,
{
    check_input(src.dim());
    let (iz, ih, iw) = src.dim();
    let (oz, oh, ow) = shape;
    let zs = nearest_table(iz, oz);
    let hs = nearest_table(ih, oh);
    let ws = nearest_table(iw, ow);

    let mut out = Array3::<T>::default(shape);
    for_each_out_slice(&mut out, |z, mut sli| {
        let sz = zs[z];
        for ((h, w), v) in sli.indexed_iter_mut() {
            *v = src[(sz, hs[h], ws[w])];
        }
    });
    out
}

/// 以三线性插值将 `src` 重采样为 `shape`. 输出值域不超出输入值域.
///
/// # 注意
///
/// `src` 的任一维为 0 时程序 panic.
pub fn resize_linear(src: ArrayView3<f32>, shape: Idx3d) -> Array3<f32> {
    check_input(src.dim());
    let (iz, ih, iw) = src.dim();
    let (oz, oh, ow) = shape;
    let zs = linear_table(iz, oz);
    let hs = linear_table(ih, oh);
    let ws = linear_table(iw, ow);

    #[inline]
    fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    let mut out = Array3::<f32>::zeros(shape);
    for_each_out_slice(&mut out, |z, mut sli| {
        let (z0, z1, fz) = zs[z];
        for ((h, w), v) in sli.indexed_iter_mut() {
            let (h0, h1, fh) = hs[h];
            let (w0, w1, fw) = ws[w];
            let plane = |zz: usize| {
                let top = lerp(src[(zz, h0, w0)], src[(zz, h0, w1)], fw);
                let bottom = lerp(src[(zz, h1, w0)], src[(zz, h1, w1)], fw);
                lerp(top, bottom, fh)
            };
            *v = lerp(plane(z0), plane(z1), fz);
        }
    });
    out
}

/// 输入索引 `i` 在输出轴上的最近索引, 截断到 `[0, len_out - 1]`.
#[inline]
fn target_index(i: usize, len_in: usize, len_out: usize) -> usize {
    let c = (i as f64 + 0.5) * len_out as f64 / len_in as f64 - 0.5;
    (c.round().max(0.0) as usize).min(len_out - 1)
}

/// 将形状为 `from` 的体数据中的包围盒映射到重采样后形状为 `to` 的体数据中.
///
/// 每条边按与重采样相同的坐标映射取最近的输出索引, 因此即使前景在最近邻
/// 重采样后消失, 结果仍是一个合法的非空包围盒.
///
/// # 注意
///
/// `to` 的任一维为 0 时程序 panic.
pub fn resize_bbox(bbox: &BoundingBox, from: Idx3d, to: Idx3d) -> BoundingBox {
    check_input(to);
    let (fz, fh, fw) = from;
    let (tz, th, tw) = to;
    BoundingBox {
        row_min: target_index(bbox.row_min, fh, th),
        row_max: target_index(bbox.row_max, fh, th),
        col_min: target_index(bbox.col_min, fw, tw),
        col_max: target_index(bbox.col_max, fw, tw),
        depth_min: target_index(bbox.depth_min, fz, tz),
        depth_max: target_index(bbox.depth_max, fz, tz),
    }
}

/// 按 `interp` 分发的 `f32` 重采样.
pub fn resize(src: ArrayView3<f32>, shape: Idx3d, interp: Interpolation) -> Array3<f32> {
    match interp {
        Interpolation::Nearest => resize_nearest(src, shape),
        Interpolation::Linear => resize_linear(src, shape),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr3, Array3};

    fn float_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_identity_resize() {
        let a = Array3::from_shape_fn((3, 4, 5), |(z, h, w)| (z * 20 + h * 5 + w) as f32);
        assert_eq!(resize_linear(a.view(), (3, 4, 5)), a);
        assert_eq!(resize_nearest(a.view(), (3, 4, 5)), a);
    }

    #[test]
    fn test_nearest_upsample() {
        let a = arr3(&[[[1u8, 2], [3, 4]]]);
        let up = resize_nearest(a.view(), (1, 4, 4));
        assert_eq!(
            up,
            arr3(&[[[1, 1, 2, 2], [1, 1, 2, 2], [3, 3, 4, 4], [3, 3, 4, 4]]])
        );
    }

    #[test]
    fn test_nearest_keeps_label_values() {
        let a = Array3::from_shape_fn((5, 7, 9), |(z, h, w)| ((z + h + w) % 3) as u8);
        let r = resize_nearest(a.view(), (3, 4, 4));
        assert!(r.iter().all(|&v| v <= 2));
    }

    #[test]
    fn test_linear_upsample_1d() {
        // 长度 2 -> 4: 坐标 -0.25, 0.25, 0.75, 1.25 -> 截断后 0, 0.25, 0.75, 1.
        let a = arr3(&[[[0.0f32, 1.0]]]);
        let up = resize_linear(a.view(), (1, 1, 4));
        let expect = [0.0, 0.25, 0.75, 1.0];
        for (v, e) in up.iter().zip(expect) {
            assert!(float_eq(*v, e), "{v} != {e}");
        }
    }

    #[test]
    fn test_linear_downsample_range() {
        let a = Array3::from_shape_fn((8, 8, 8), |(z, h, w)| ((z * h + w) % 5) as f32 / 4.0);
        let r = resize_linear(a.view(), (3, 5, 2));
        assert_eq!(r.dim(), (3, 5, 2));
        assert!(r.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_linear_downsample_no_smoothing() {
        // 4 -> 2: 坐标 0.5, 2.5, 落在两个常值区间中间, 不做抗混叠时保持原值.
        let a = arr3(&[[[0.0f32, 0.0, 4.0, 4.0]]]);
        let down = resize_linear(a.view(), (1, 1, 2));
        assert_eq!(down, arr3(&[[[0.0, 4.0]]]));
    }

    #[test]
    fn test_resize_bbox() {
        let b = BoundingBox {
            row_min: 53,
            row_max: 53,
            col_min: 0,
            col_max: 63,
            depth_min: 16,
            depth_max: 16,
        };
        let r = resize_bbox(&b, (32, 64, 64), (4, 8, 8));
        // (53 + 0.5) * 8 / 64 - 0.5 = 6.1875, (16 + 0.5) * 4 / 32 - 0.5 = 1.5625.
        assert_eq!((r.row_min, r.row_max), (6, 6));
        assert_eq!((r.col_min, r.col_max), (0, 7));
        assert_eq!((r.depth_min, r.depth_max), (2, 2));

        // 形状不变时包围盒不变.
        assert_eq!(resize_bbox(&b, (32, 64, 64), (32, 64, 64)), b);
    }

    #[test]
    #[should_panic]
    fn test_empty_input_panics() {
        let a = Array3::<f32>::zeros((0, 2, 2));
        let _ = resize_linear(a.view(), (1, 2, 2));
    }
}
