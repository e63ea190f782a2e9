//! 子集视图与随机划分.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use super::{check_index, Dataset, DatasetError};

/// 共享底层数据集的子集视图. 第 `i` 个样本为底层数据集的第 `indices[i]` 个样本.
#[derive(Debug)]
pub struct Subset<D> {
    dataset: Arc<D>,
    indices: Vec<usize>,
}

impl<D> Clone for Subset<D> {
    fn clone(&self) -> Self {
        Self {
            dataset: Arc::clone(&self.dataset),
            indices: self.indices.clone(),
        }
    }
}

impl<D: Dataset> Subset<D> {
    /// 创建子集.
    ///
    /// `indices` 中任一索引越界时返回 [`DatasetError::IndexOutOfRange`].
    pub fn new(dataset: Arc<D>, indices: Vec<usize>) -> Result<Self, DatasetError> {
        let len = dataset.len();
        for &i in &indices {
            check_index(i, len)?;
        }
        Ok(Self { dataset, indices })
    }

    /// 子集在底层数据集中的索引.
    #[inline]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// 底层数据集.
    #[inline]
    pub fn dataset(&self) -> &Arc<D> {
        &self.dataset
    }
}

impl<D: Dataset> Dataset for Subset<D> {
    type Item = D::Item;

    #[inline]
    fn len(&self) -> usize {
        self.indices.len()
    }

    fn get(&self, index: usize) -> Result<D::Item, DatasetError> {
        check_index(index, self.len())?;
        self.dataset.get(self.indices[index])
    }
}

/// 将数据集随机划分为长度分别为 `lengths` 的互不相交的子集.
///
/// `lengths` 之和必须等于数据集长度, 否则返回 [`DatasetError::SplitLengths`].
/// 划分结果由 `rng` 唯一确定.
pub fn random_split<D, R>(
    dataset: Arc<D>,
    lengths: &[usize],
    rng: &mut R,
) -> Result<Vec<Subset<D>>, DatasetError>
where
    D: Dataset,
    R: Rng + ?Sized,
{
    let len = dataset.len();
    let sum: usize = lengths.iter().sum();
    if sum != len {
        return Err(DatasetError::SplitLengths { sum, len });
    }

    let mut perm: Vec<usize> = (0..len).collect();
    perm.shuffle(rng);

    let mut rest = perm.as_slice();
    let mut ans = Vec::with_capacity(lengths.len());
    for &n in lengths {
        let (head, tail) = rest.split_at(n);
        ans.push(Subset {
            dataset: Arc::clone(&dataset),
            indices: head.to_vec(),
        });
        rest = tail;
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::ArrayDataset;
    use itertools::Itertools;
    use ndarray::{Array, IxDyn};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn numbers(n: usize) -> Arc<ArrayDataset<i32>> {
        Arc::new(ArrayDataset::new(Array::from_shape_fn(IxDyn(&[n]), |ix| {
            ix[0] as i32
        })))
    }

    #[test]
    fn test_random_split() {
        let ds = numbers(10);
        let parts = random_split(ds, &[3, 0, 7], &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(parts.iter().map(Subset::len).collect_vec(), vec![3, 0, 7]);

        let all = parts
            .iter()
            .flat_map(|p| p.indices().iter().copied())
            .sorted()
            .collect_vec();
        assert_eq!(all, (0..10).collect_vec());

        let first = &parts[0];
        let v = first.get(1).unwrap();
        assert_eq!(v.iter().next().copied(), Some(first.indices()[1] as i32));
        assert!(first.get(3).is_err());
    }

    #[test]
    fn test_split_deterministic() {
        let a = random_split(numbers(8), &[4, 4], &mut StdRng::seed_from_u64(1)).unwrap();
        let b = random_split(numbers(8), &[4, 4], &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(a[0].indices(), b[0].indices());
    }

    #[test]
    fn test_split_lengths_mismatch() {
        assert!(matches!(
            random_split(numbers(5), &[2, 2], &mut StdRng::seed_from_u64(0)),
            Err(DatasetError::SplitLengths { sum: 4, len: 5 })
        ));
    }

    #[test]
    fn test_subset_bounds() {
        let ds = numbers(3);
        assert!(Subset::new(Arc::clone(&ds), vec![0, 3]).is_err());
        let s = Subset::new(ds, vec![2, 0]).unwrap();
        assert_eq!(s.get(0).unwrap().iter().next(), Some(&2));
    }
}
