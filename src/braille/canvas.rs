/// Dot bits of one braille cell, indexed by `[y % 4][x % 2]`.
const DOTS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

const BLANK: u32 = 0x2800;

/// A grid of braille characters, each holding a 2x4 block of dots.
///
/// Pixel coordinates run `0..width*2` by `0..height*4`; anything outside is
/// clipped.
#[derive(Clone, Debug)]
pub struct BrailleCanvas {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl BrailleCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn set_pixel(&mut self, x: usize, y: usize) {
        let (cx, cy) = (x / 2, y / 4);
        if cx >= self.width || cy >= self.height {
            return;
        }
        self.cells[cy * self.width + cx] |= DOTS[y % 4][x % 2];
    }

    #[inline(always)]
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    /// Braille character at cell `(cx, cy)`, `None` when no dot is set.
    pub fn cell(&self, cx: usize, cy: usize) -> Option<char> {
        if cx >= self.width || cy >= self.height {
            return None;
        }
        match self.cells[cy * self.width + cx] {
            0 => None,
            bits => char::from_u32(BLANK + bits as u32),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|&bits| bits == 0)
    }

    #[cfg(test)]
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.height {
            return String::new();
        }
        self.cells[row * self.width..(row + 1) * self.width]
            .iter()
            .map(|&bits| char::from_u32(BLANK + bits as u32).unwrap_or(' '))
            .collect()
    }

    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height)
            .map(|row| self.row_to_string(row))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dot() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0);
        assert_eq!(canvas.to_string(), "⠁");
        assert_eq!(canvas.cell(0, 0), Some('⠁'));
    }

    #[test]
    fn test_full_cell() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y);
            }
        }
        assert_eq!(canvas.to_string(), "⣿");
    }

    #[test]
    fn test_second_row_of_cells() {
        let mut canvas = BrailleCanvas::new(2, 2);
        canvas.set_pixel(3, 7);
        assert_eq!(canvas.cell(1, 1), Some('⢀'));
        assert_eq!(canvas.cell(0, 0), None);
        assert_eq!(canvas.row_to_string(1), "⠀⢀");
    }

    #[test]
    fn test_out_of_range_is_clipped() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(2, 0);
        canvas.set_pixel_signed(-1, 0);
        canvas.set_pixel(0, 4);
        assert!(canvas.is_blank());
        assert_eq!(canvas.cell(5, 5), None);
    }
}
