use crate::braille::BrailleCanvas;

/// Bresenham line between two pixel positions, endpoints included.
pub fn draw_line(canvas: &mut BrailleCanvas, from: (i32, i32), to: (i32, i32)) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        canvas.set_pixel_signed(x, y);
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Filled disc.
pub fn draw_disc(canvas: &mut BrailleCanvas, center: (i32, i32), radius: i32) {
    let r2 = radius * radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= r2 {
                canvas.set_pixel_signed(center.0 + dx, center.1 + dy);
            }
        }
    }
}

/// Circle outline (midpoint algorithm). A zero radius sets the centre.
pub fn draw_ring(canvas: &mut BrailleCanvas, center: (i32, i32), radius: i32) {
    let (cx, cy) = center;
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
            canvas.set_pixel_signed(cx + px, cy + py);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(2, 1);
        draw_line(&mut canvas, (0, 0), (3, 0));
        assert_eq!(canvas.to_string(), "⠉⠉");
    }

    #[test]
    fn test_vertical_line_reversed() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, (0, 7), (0, 0));
        assert_eq!(canvas.to_string(), "⡇\n⡇");
    }

    #[test]
    fn test_ring_is_hollow() {
        let mut canvas = BrailleCanvas::new(8, 4);
        draw_ring(&mut canvas, (8, 8), 5);
        let mut disc = BrailleCanvas::new(8, 4);
        draw_disc(&mut disc, (8, 8), 5);
        let count = |c: &BrailleCanvas| {
            (0..c.height())
                .flat_map(|y| (0..c.width()).map(move |x| (x, y)))
                .filter_map(|(x, y)| c.cell(x, y))
                .map(|ch| (ch as u32 - 0x2800).count_ones())
                .sum::<u32>()
        };
        assert!(count(&canvas) > 0);
        assert!(count(&canvas) < count(&disc));
    }

    #[test]
    fn test_zero_radius_sets_center() {
        let mut canvas = BrailleCanvas::new(1, 1);
        draw_ring(&mut canvas, (1, 1), 0);
        assert_eq!(canvas.to_string(), "⠐");
    }
}
