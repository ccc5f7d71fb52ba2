use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;

/// Row-major 2D grid.
///
/// Element `(x, y)` lives at `y * width + x`; `x` is the column and `y` the row.
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

    /// Builds a grid by evaluating `f(x, y)` for every cell in row-major order.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                pixels.push(f(x, y));
            }
        }
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
    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        debug_assert!(x < self.width && y < self.height);
        &mut self.pixels[y * self.width + x]
    }

    /// Returns `None` for coordinates outside the grid, including negative ones.
    #[inline]
    pub fn get_signed(&self, x: isize, y: isize) -> Option<&T> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(&self.pixels[y as usize * self.width + x as usize])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn same_dimensions<U>(&self, other: &Buffer2<U>) -> bool {
        self.width == other.width && self.height == other.height
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

    /// Iterates rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact(0) panics
        self.pixels.chunks_exact(self.width.max(1))
    }

    /// Iterates `(x, y, &value)` in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width.max(1);
        self.pixels
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % width, i / width, v))
    }

    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Buffer2<U> {
        Buffer2 {
            pixels: self.pixels.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Combines two grids of identical dimensions element-wise.
    pub fn zip_map<U, V>(&self, other: &Buffer2<U>, mut f: impl FnMut(&T, &U) -> V) -> Buffer2<V> {
        assert!(self.same_dimensions(other), "dimension mismatch");
        Buffer2 {
            pixels: self
                .pixels
                .iter()
                .zip(other.pixels.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.pixels.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.pixels.iter_mut()
    }
}

impl<T: Default + Clone> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self::new_filled(width, height, T::default())
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

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.pixels.fill(value);
    }

    /// Swaps rows and columns.
    pub fn transposed(&self) -> Self {
        Self::from_fn(self.height, self.width, |x, y| self.get(y, x).clone())
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

    fn into_iter(self) -> Self::IntoIter {
        self.pixels.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_fn_is_row_major() {
        let buf = Buffer2::from_fn(3, 2, |x, y| (x, y));
        assert_eq!(buf.pixels()[0], (0, 0));
        assert_eq!(buf.pixels()[2], (2, 0));
        assert_eq!(buf.pixels()[3], (0, 1));
        assert_eq!(buf[(1, 1)], (1, 1));
    }

    #[test]
    #[should_panic(expected = "pixels length must equal width * height")]
    fn new_rejects_wrong_length() {
        Buffer2::new(2, 2, vec![0u8; 3]);
    }

    #[test]
    fn get_signed_outside_is_none() {
        let buf = Buffer2::new_filled(4, 3, 7i32);
        assert_eq!(buf.get_signed(-1, 0), None);
        assert_eq!(buf.get_signed(0, -1), None);
        assert_eq!(buf.get_signed(4, 0), None);
        assert_eq!(buf.get_signed(0, 3), None);
        assert_eq!(buf.get_signed(3, 2), Some(&7));
    }

    #[test]
    fn rows_and_row_access() {
        let mut buf = Buffer2::from_fn(3, 3, |x, y| (y * 3 + x) as u32);
        assert_eq!(buf.row(1), &[3, 4, 5]);
        buf.row_mut(2).fill(0);
        let rows: Vec<&[u32]> = buf.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], &[0, 0, 0]);
    }

    #[test]
    fn enumerate_yields_coordinates() {
        let buf = Buffer2::from_fn(2, 2, |x, y| x + 10 * y);
        let items: Vec<(usize, usize, usize)> = buf.enumerate().map(|(x, y, v)| (x, y, *v)).collect();
        assert_eq!(items, vec![(0, 0, 0), (1, 0, 1), (0, 1, 10), (1, 1, 11)]);
    }

    #[test]
    fn map_and_zip_map_keep_dimensions() {
        let a = Buffer2::new_filled(4, 2, 2.0f32);
        let b = Buffer2::new_filled(4, 2, 3.0f32);
        let sum = a.zip_map(&b, |x, y| x + y);
        assert_eq!(sum.dimensions(), (4, 2));
        assert!(sum.iter().all(|&v| v == 5.0));

        let flags = sum.map(|&v| v > 4.0);
        assert!(flags.iter().all(|&f| f));
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn zip_map_rejects_mismatch() {
        let a = Buffer2::new_filled(4, 2, 0u8);
        let b = Buffer2::new_filled(2, 4, 0u8);
        a.zip_map(&b, |x, y| x + y);
    }

    #[test]
    fn transposed_swaps_axes() {
        let buf = Buffer2::from_fn(3, 2, |x, y| (x, y));
        let t = buf.transposed();
        assert_eq!(t.dimensions(), (2, 3));
        assert_eq!(t[(1, 2)], (2, 1));
    }

    #[test]
    fn empty_grid_iterators() {
        let buf: Buffer2<u8> = Buffer2::new_default(0, 0);
        assert!(buf.is_empty());
        assert_eq!(buf.rows().count(), 0);
        assert_eq!(buf.enumerate().count(), 0);
    }
}
