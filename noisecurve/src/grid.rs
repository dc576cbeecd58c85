use std::ops::{Index, IndexMut};

use crate::frame::FrameShape;

/// Row-major 2-D grid: row `y` occupies `pixels[y * width..(y + 1) * width]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    pixels: Vec<T>,
    shape: FrameShape,
}

impl<T> Grid<T> {
    pub fn new(shape: FrameShape, pixels: Vec<T>) -> Self {
        assert_eq!(
            pixels.len(),
            shape.pixel_count(),
            "pixels length must equal width * height"
        );
        Self { pixels, shape }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &T {
        debug_assert!(x < self.shape.width && y < self.shape.height);
        &self.pixels[y * self.shape.width + x]
    }

    #[inline]
    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.shape.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.shape.height
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
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn into_pixels(self) -> Vec<T> {
        self.pixels
    }

    /// Pixels of rows `start_row..end_row` as one contiguous slice.
    #[inline]
    pub fn rows(&self, start_row: usize, end_row: usize) -> &[T] {
        debug_assert!(start_row <= end_row && end_row <= self.shape.height);
        &self.pixels[start_row * self.shape.width..end_row * self.shape.width]
    }
}

impl<T: Clone> Grid<T> {
    pub fn new_filled(shape: FrameShape, value: T) -> Self {
        Self {
            pixels: vec![value; shape.pixel_count()],
            shape,
        }
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.pixels[y * self.shape.width + x]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        &mut self.pixels[y * self.shape.width + x]
    }
}
