use image::{ImageBuffer, Pixel, Primitive};

pub trait CyclicShift {
    /// Translates the whole grid by `(dx, dy)` with wraparound: the pixel at
    /// `(x, y)` lands on `((x + dx) mod w, (y + dy) mod h)`.
    fn cyclic_shift(&self, dx: i64, dy: i64) -> Self;
}

impl<P, S> CyclicShift for ImageBuffer<P, Vec<S>>
where
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    fn cyclic_shift(&self, dx: i64, dy: i64) -> Self {
        let (width, height) = self.dimensions();
        if width == 0 || height == 0 {
            return self.clone();
        }
        let (w, h) = (i64::from(width), i64::from(height));

        ImageBuffer::from_fn(width, height, |x, y| {
            let sx = (i64::from(x) - dx).rem_euclid(w) as u32;
            let sy = (i64::from(y) - dy).rem_euclid(h) as u32;
            *self.get_pixel(sx, sy)
        })
    }
}

pub trait FillRect<P> {
    /// Overwrites the half-open box `[x0, x1) x [y0, y1)` with `color`,
    /// clipped to the image.
    fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: P);
}

impl<P, S> FillRect<P> for ImageBuffer<P, Vec<S>>
where
    P: Pixel<Subpixel = S>,
    S: Primitive,
{
    fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: P) {
        let (width, height) = self.dimensions();
        for y in y0..y1.min(height) {
            for x in x0..x1.min(width) {
                self.put_pixel(x, y, color);
            }
        }
    }
}
