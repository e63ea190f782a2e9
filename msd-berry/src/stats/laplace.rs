//! Laplace 分布与留一法敏感度.

use rand::distributions::{Distribution, Open01};
use rand::Rng;

/// Laplace 分布 `Laplace(loc, scale)`.
///
/// 密度为 `exp(-|x - loc| / scale) / (2 * scale)`. `scale == 0` 时退化为常数 `loc`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Laplace {
    loc: f64,
    scale: f64,
}

impl Laplace {
    /// 创建分布. `scale` 为负数或非有限值时返回 `None`.
    pub fn new(loc: f64, scale: f64) -> Option<Self> {
        (scale >= 0.0 && scale.is_finite() && loc.is_finite()).then_some(Self { loc, scale })
    }

    /// 位置参数.
    #[inline]
    pub fn loc(&self) -> f64 {
        self.loc
    }

    /// 尺度参数.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl Distribution<f64> for Laplace {
    /// 逆变换采样.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.scale == 0.0 {
            return self.loc;
        }
        // u 落在 (-0.5, 0.5), 故对数的参数落在 (0, 1].
        let u: f64 = rng.sample::<f64, _>(Open01) - 0.5;
        self.loc - self.scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
    }
}

/// 单个样本的求和信息.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PartialSums {
    /// 元素和.
    pub sum: f64,
    /// 元素平方和.
    pub sum_sq: f64,
    /// 元素个数.
    pub count: usize,
}

impl PartialSums {
    /// 统计 `values` 的求和信息.
    pub fn of<'a, I: IntoIterator<Item = &'a f32>>(values: I) -> Self {
        values.into_iter().fold(Self::default(), |acc, &v| {
            let v = v as f64;
            Self {
                sum: acc.sum + v,
                sum_sq: acc.sum_sq + v * v,
                count: acc.count + 1,
            }
        })
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }

    /// 无偏标准差. 元素少于两个时返回 0.
    fn std(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        let n = self.count as f64;
        ((self.sum_sq - self.sum * self.sum / n) / (n - 1.0)).max(0.0).sqrt()
    }

    fn without(&self, other: &Self) -> Self {
        Self {
            sum: self.sum - other.sum,
            sum_sq: self.sum_sq - other.sum_sq,
            count: self.count - other.count,
        }
    }
}

/// 全局均值与全局标准差的留一法敏感度.
///
/// 对每个样本 `i`, 计算 `|q(D) - q(D \ {i})|`, 取所有样本上的最大值,
/// 其中 `q` 分别为全体元素的均值与 (无偏) 标准差.
/// 样本数少于两个, 或去掉某个样本后剩余元素少于两个时返回 `None`.
pub fn loo_sensitivity(samples: &[PartialSums]) -> Option<(f64, f64)> {
    if samples.len() < 2 {
        return None;
    }
    let total = samples.iter().fold(PartialSums::default(), |acc, s| PartialSums {
        sum: acc.sum + s.sum,
        sum_sq: acc.sum_sq + s.sum_sq,
        count: acc.count + s.count,
    });
    let (mean, std) = (total.mean(), total.std());

    let mut ans = (0.0f64, 0.0f64);
    for s in samples {
        let rest = total.without(s);
        if rest.count < 2 {
            return None;
        }
        ans.0 = ans.0.max((mean - rest.mean()).abs());
        ans.1 = ans.1.max((std - rest.std()).abs());
    }
    Some(ans)
}
