/// Maps a logical row index to the physical location in the underlying data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionVector {
    indices: Vec<usize>,
}

impl SelectionVector {
    pub const fn empty() -> Self {
        SelectionVector {
            indices: Vec::new(),
        }
    }

    /// Creates a selection vector that that has all indices in the range [0,n)
    /// point to the same physical index.
    pub fn repeated(len: usize, idx: usize) -> Self {
        SelectionVector {
            indices: vec![idx; len],
        }
    }

    /// Try to get the location of an index, returning None if the index is out
    /// of bounds.
    pub fn get(&self, idx: usize) -> Option<usize> {
        self.indices.get(idx).copied()
    }

    /// Get the location of a logical index.
    ///
    /// Panics if `idx` is out of bounds.
    #[inline]
    pub fn get_unchecked(&self, idx: usize) -> usize {
        self.indices[idx]
    }

    /// Selects indices from this selection vector using some other selection
    /// vector.
    ///
    /// OUT[IDX] = SELF[SELECTION[IDX]]
    pub fn select(&self, selection: &SelectionVector) -> Self {
        selection
            .iter_locations()
            .map(|loc| self.get_unchecked(loc))
            .collect()
    }

    /// Returns an iterator of locations being pointed to.
    ///
    /// Locations are iterated in their logical ordering, so the resulting
    /// iterator may produce locations out of order and/or duplicated.
    pub fn iter_locations(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn num_rows(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn push_location(&mut self, location: usize) {
        self.indices.push(location)
    }
}

impl FromIterator<usize> for SelectionVector {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        SelectionVector {
            indices: iter.into_iter().collect(),
        }
    }
}
