//! Dense parameter tables indexed by tuples of integer indices.
use std::ops::{Index, IndexMut};

/// A dense table of values over the cross product of `N` index ranges
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable<const N: usize> {
    shape: [usize; N],
    values: Vec<f64>,
}

impl<const N: usize> ParamTable<N> {
    /// Create a table of the given shape with every entry set to `value`
    pub fn filled(shape: [usize; N], value: f64) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            values: vec![value; len],
        }
    }

    /// The extent of each dimension
    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    /// All values in row-major order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    fn offset(&self, index: [usize; N]) -> usize {
        index
            .iter()
            .zip(self.shape)
            .fold(0, |offset, (&idx, dim)| {
                assert!(idx < dim, "Index {index:?} out of bounds for shape {:?}", self.shape);
                offset * dim + idx
            })
    }
}

impl<const N: usize> Index<[usize; N]> for ParamTable<N> {
    type Output = f64;

    fn index(&self, index: [usize; N]) -> &f64 {
        &self.values[self.offset(index)]
    }
}

impl<const N: usize> IndexMut<[usize; N]> for ParamTable<N> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut f64 {
        let offset = self.offset(index);
        &mut self.values[offset]
    }
}
