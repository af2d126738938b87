use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

/// Dense row-major 2D grid.
///
/// Element `(x, y)` lives at `pixels[y * width + x]`. Used for saliency
/// grids, binary masks, label maps and distance maps alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buffer2<T> {
    pixels: Vec<T>,
    width: usize,
    height: usize,
}

impl<T> Buffer2<T> {
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixels length must equal width * height"
        );
        Self {
            pixels,
            width,
            height,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.width && y < self.height);
        &self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// True when both grids have the same width and height.
    #[inline]
    pub fn same_shape<U>(&self, other: &Buffer2<U>) -> bool {
        self.width == other.width() && self.height == other.height()
    }

    #[inline]
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.pixels
    }

    /// Row `y` as a slice of `width` elements.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }

    /// Iterate rows top to bottom.
    #[inline]
    pub fn rows(&self) -> slice::Chunks<'_, T> {
        self.pixels.chunks(self.width.max(1))
    }

    /// Build a new grid of the same shape by mapping every element.
    pub fn map<U, F>(&self, f: F) -> Buffer2<U>
    where
        F: FnMut(&T) -> U,
    {
        Buffer2 {
            pixels: self.pixels.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Combine two grids of the same shape element by element.
    pub fn zip_map<U, V, F>(&self, other: &Buffer2<U>, mut f: F) -> Buffer2<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        assert!(self.same_shape(other), "shape mismatch");
        Buffer2 {
            pixels: self
                .pixels
                .iter()
                .zip(other.pixels())
                .map(|(a, b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Number of elements matching `predicate`.
    pub fn count_where<F>(&self, mut predicate: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        self.pixels.iter().filter(|v| predicate(v)).count()
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self {
            pixels: vec![value; width * height],
            width,
            height,
        }
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.width + x]
    }
}

impl<T> Index<usize> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, idx: usize) -> &Self::Output {
        &self.pixels[idx]
    }
}

impl<T> IndexMut<usize> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, idx: usize) -> &mut Self::Output {
        &mut self.pixels[idx]
    }
}

impl<T> Deref for Buffer2<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.pixels
    }
}

impl<T> DerefMut for Buffer2<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pixels
    }
}

impl<'a, T> IntoIterator for &'a Buffer2<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.pixels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_of_tall_grid() {
        let grid = Buffer2::new_filled(1, 4, false);
        assert_eq!((grid.width(), grid.height(), grid.len()), (1, 4, 4));
        assert!(grid.same_shape(&Buffer2::new_filled(1, 4, 0u32)));
        assert!(!grid.same_shape(&Buffer2::new_filled(4, 1, 0u32)));
        assert!(Buffer2::<u8>::new(0, 0, Vec::new()).is_empty());
    }

    #[test]
    #[should_panic(expected = "pixels length must equal width * height")]
    fn test_new_rejects_short_pixel_vec() {
        Buffer2::new(4, 4, vec![0u8; 15]);
    }

    #[test]
    fn test_flat_index_matches_xy() {
        let mut grid = Buffer2::new_filled(4, 3, 0u16);
        grid[(3, 2)] = 9;
        assert_eq!(grid[2 * 4 + 3], 9);
        assert_eq!(grid.into_vec().iter().filter(|&&v| v == 9).count(), 1);
    }

    #[test]
    fn test_get_is_row_major() {
        let buf = Buffer2::new(3, 2, vec![10, 20, 30, 40, 50, 60]);
        assert_eq!(*buf.get(2, 0), 30);
        assert_eq!(*buf.get(0, 1), 40);
        assert_eq!(buf[(2, 1)], 60);
    }

    #[test]
    fn test_rows() {
        let buf = Buffer2::new(2, 3, vec![1, 2, 3, 4, 5, 6]);
        let rows: Vec<&[i32]> = buf.rows().collect();
        assert_eq!(rows, vec![&[1, 2][..], &[3, 4][..], &[5, 6][..]]);
        assert_eq!(buf.row(1), &[3, 4]);
    }

    #[test]
    fn test_row_mut() {
        let mut buf = Buffer2::new_filled(3, 2, 0u8);
        buf.row_mut(1).fill(7);
        assert_eq!(buf.pixels(), &[0, 0, 0, 7, 7, 7]);
    }

    #[test]
    fn test_map_and_zip_map() {
        let a = Buffer2::new(2, 2, vec![1u8, 0, 3, 0]);
        let b = Buffer2::new(2, 2, vec![true, true, false, false]);
        let nonzero = a.map(|&v| v != 0);
        assert_eq!(nonzero.pixels(), &[true, false, true, false]);

        let both = nonzero.zip_map(&b, |&x, &y| x && y);
        assert_eq!(both.pixels(), &[true, false, false, false]);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_zip_map_shape_mismatch() {
        let a = Buffer2::new_filled(2, 3, 0u8);
        let b = Buffer2::new_filled(3, 2, 0u8);
        a.zip_map(&b, |_, _| 0u8);
    }

    #[test]
    fn test_count_where() {
        let buf = Buffer2::new(2, 2, vec![0u8, 5, 0, 9]);
        assert_eq!(buf.count_where(|&v| v > 0), 2);
    }
}
