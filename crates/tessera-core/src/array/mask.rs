//! Boolean selection: pick between two arrays, or overwrite and extract the
//! elements a mask marks.
//!
//! Masks must have exactly the shape of the array they apply to; there is no
//! broadcasting here.

use crate::dtype::Element;
use crate::error::{CoreError, Result};

use super::NdArray;

fn check_same_shape<T: Element, U: Element>(a: &NdArray<T>, b: &NdArray<U>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(CoreError::ShapeMismatch {
            expected: a.shape().to_vec(),
            got: b.shape().to_vec(),
        });
    }
    Ok(())
}

impl<T: Element> NdArray<T> {
    /// Element-wise choice: `if_true` where `cond` holds, else `if_false`.
    ///
    /// ```
    /// # use tessera_core::array::NdArray;
    /// let cond = NdArray::from_vec(vec![true, false, true], vec![3]).unwrap();
    /// let x = NdArray::from_vec(vec![1, 2, 3], vec![3]).unwrap();
    /// let y = NdArray::from_vec(vec![-1, -2, -3], vec![3]).unwrap();
    /// assert_eq!(NdArray::choose(&cond, &x, &y).unwrap().to_vec(), vec![1, -2, 3]);
    /// ```
    pub fn choose(cond: &NdArray<bool>, if_true: &NdArray<T>, if_false: &NdArray<T>) -> Result<Self> {
        check_same_shape(cond, if_true)?;
        check_same_shape(cond, if_false)?;
        let data = cond
            .iter()
            .zip(if_true.iter().zip(if_false.iter()))
            .map(|(c, (t, f))| if c { t } else { f })
            .collect();
        Ok(NdArray::from_contiguous(data, cond.shape().to_vec()))
    }

    /// A copy of `self` with the masked elements replaced by `values`.
    pub fn masked(&self, mask: &NdArray<bool>, values: &NdArray<T>) -> Result<Self> {
        let out = self.copy();
        out.put_mask(mask, values)?;
        Ok(out)
    }

    /// Overwrite the masked elements of `self` with the matching `values`.
    pub fn put_mask(&self, mask: &NdArray<bool>, values: &NdArray<T>) -> Result<()> {
        check_same_shape(self, mask)?;
        check_same_shape(self, values)?;
        let mut replacements = mask.to_vec().into_iter().zip(values.to_vec());
        self.apply(|v| match replacements.next() {
            Some((true, r)) => r,
            _ => v,
        });
        Ok(())
    }

    /// The masked elements in row-major order, as a fresh 1-D array.
    pub fn compress(&self, mask: &NdArray<bool>) -> Result<Self> {
        check_same_shape(self, mask)?;
        let data: Vec<T> = self
            .iter()
            .zip(mask.iter())
            .filter_map(|(v, keep)| keep.then_some(v))
            .collect();
        let len = data.len();
        Ok(NdArray::from_contiguous(data, vec![len]))
    }
}
