//! RGBA pixel buffers and the "over" operator.
//!
//! Pixels are stored straight (not premultiplied), 8 bits per channel,
//! row-major. Blending math is done premultiplied and converted back.

/// Raw RGBA image data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Pixel-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Upper bound on the pixel count of [`Raster::try_transparent`].
pub const MAX_PIXELS: usize = 1 << 28;

fn byte_len(width: u32, height: u32) -> Option<usize> {
    (width as usize).checked_mul(height as usize)?.checked_mul(4)
}

impl Raster {
    /// Wrap an RGBA buffer. Returns `None` if `data` is not `width * height * 4` bytes.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        (byte_len(width, height) == Some(data.len())).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// A fully transparent raster.
    ///
    /// # Panics
    ///
    /// Panics if the buffer size overflows `usize`.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// A fully transparent raster, or `None` if it would hold more than
    /// [`MAX_PIXELS`] pixels.
    pub fn try_transparent(width: u32, height: u32) -> Option<Self> {
        let pixels = (width as usize).checked_mul(height as usize)?;
        if pixels > MAX_PIXELS {
            return None;
        }
        Some(Self {
            width,
            height,
            data: vec![0; pixels * 4],
        })
    }

    /// # Panics
    ///
    /// Panics if the buffer size overflows `usize`.
    pub fn filled(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            data.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Pixel at `(x, y)`; panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&pixel);
    }

    /// Multiply every alpha value by `opacity / 255`, rounded to nearest.
    pub fn scale_alpha(&mut self, opacity: u8) {
        if opacity == u8::MAX {
            return;
        }
        for px in self.data.chunks_exact_mut(4) {
            px[3] = scale(px[3], opacity);
        }
    }

    /// Composite `src` over `self` with its top-left corner at `(left, top)`.
    ///
    /// Equivalent to pasting `src` into a transparent raster the size of
    /// `self` and compositing that over `self`: outside the pasted region
    /// the source is transparent and leaves the destination untouched.
    /// Parts of `src` that fall outside `self` are clipped.
    pub fn composite_over(&mut self, src: &Raster, left: i64, top: i64) {
        let x0 = left.max(0);
        let y0 = top.max(0);
        let x1 = (left + src.width as i64).min(self.width as i64);
        let y1 = (top + src.height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        for y in y0..y1 {
            for x in x0..x1 {
                let s = src.pixel((x - left) as u32, (y - top) as u32);
                let d = self.pixel(x as u32, y as u32);
                self.set_pixel(x as u32, y as u32, over(s, d));
            }
        }
    }

    /// Smallest rectangle containing every pixel with non-zero alpha.
    pub fn alpha_bounds(&self) -> Option<Rect> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for y in 0..self.height {
            for x in 0..self.width {
                if self.data[self.offset(x, y) + 3] == 0 {
                    continue;
                }
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        any.then(|| Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        })
    }

    /// Copy out `rect`, which must lie inside the raster.
    pub fn crop(&self, rect: Rect) -> Raster {
        let mut data = Vec::with_capacity(rect.width as usize * rect.height as usize * 4);
        for y in rect.y..rect.y + rect.height {
            let start = self.offset(rect.x, y);
            data.extend_from_slice(&self.data[start..start + rect.width as usize * 4]);
        }
        Raster {
            width: rect.width,
            height: rect.height,
            data,
        }
    }
}

fn div_round(num: u32, den: u32) -> u32 {
    (num + den / 2) / den
}

fn scale(alpha: u8, opacity: u8) -> u8 {
    div_round(alpha as u32 * opacity as u32, 255) as u8
}

/// Porter-Duff "source over destination" for one straight-alpha pixel.
pub fn over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as u32;
    let da = dst[3] as u32;
    // Output alpha scaled by 255.
    let out_a = sa * 255 + da * (255 - sa);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let num = src[c] as u32 * sa * 255 + dst[c] as u32 * da * (255 - sa);
        out[c] = div_round(num, out_a) as u8;
    }
    out[3] = div_round(out_a, 255) as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba_checks_length() {
        assert!(Raster::from_rgba(2, 1, vec![0; 8]).is_some());
        assert!(Raster::from_rgba(2, 1, vec![0; 7]).is_none());
        assert!(Raster::from_rgba(u32::MAX, u32::MAX, Vec::new()).is_none());
    }

    #[test]
    fn test_try_transparent_limits() {
        let raster = Raster::try_transparent(3, 2).unwrap();
        assert_eq!(raster.data(), &[0; 24][..]);
        assert!(Raster::try_transparent(u32::MAX, u32::MAX).is_none());
        assert!(Raster::try_transparent(1 << 16, 1 << 16).is_none());
        assert!(Raster::try_transparent(0, 5).is_some());
    }

    #[test]
    fn test_scale_alpha_rounding() {
        assert_eq!(scale(255, 128), 128);
        assert_eq!(scale(255, 255), 255);
        assert_eq!(scale(255, 0), 0);
        assert_eq!(scale(100, 128), 50); // 50.196
        assert_eq!(scale(3, 128), 2); // 1.506
        assert_eq!(scale(1, 127), 0); // 0.498
    }

    #[test]
    fn test_over_opaque_and_transparent() {
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];
        assert_eq!(over(red, blue), red);
        assert_eq!(over([9, 9, 9, 0], blue), blue);
        assert_eq!(over([9, 9, 9, 0], [0, 0, 0, 0]), [0, 0, 0, 0]);
        assert_eq!(over([10, 20, 30, 128], [0, 0, 0, 0]), [10, 20, 30, 128]);
    }

    #[test]
    fn test_over_partial_alpha() {
        let red = [255, 0, 0, 128];
        let blue = [0, 0, 255, 128];
        assert_eq!(over(blue, red), [85, 0, 170, 192]);
        assert_eq!(over(red, blue), [170, 0, 85, 192]);
    }

    #[test]
    fn test_composite_over_clips() {
        let mut canvas = Raster::transparent(3, 3);
        let src = Raster::filled(2, 2, [1, 2, 3, 255]);
        canvas.composite_over(&src, -1, 2);
        assert_eq!(canvas.pixel(0, 2), [1, 2, 3, 255]);
        assert_eq!(canvas.pixel(1, 2), [0, 0, 0, 0]);
        assert_eq!(canvas.pixel(0, 1), [0, 0, 0, 0]);

        canvas.composite_over(&src, 5, 5);
        assert_eq!(canvas.alpha_bounds(), Some(Rect { x: 0, y: 2, width: 1, height: 1 }));
    }

    #[test]
    fn test_alpha_bounds_and_crop() {
        let mut raster = Raster::transparent(4, 4);
        assert_eq!(raster.alpha_bounds(), None);

        raster.set_pixel(1, 1, [1, 1, 1, 1]);
        raster.set_pixel(2, 3, [2, 2, 2, 2]);
        let rect = raster.alpha_bounds().unwrap();
        assert_eq!(rect, Rect { x: 1, y: 1, width: 2, height: 3 });

        let cropped = raster.crop(rect);
        assert_eq!((cropped.width(), cropped.height()), (2, 3));
        assert_eq!(cropped.pixel(0, 0), [1, 1, 1, 1]);
        assert_eq!(cropped.pixel(1, 2), [2, 2, 2, 2]);
        assert_eq!(cropped.pixel(1, 0), [0, 0, 0, 0]);
    }
}
