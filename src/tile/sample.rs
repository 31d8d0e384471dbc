use ndarray::Array2;

/// The four source pixels around a fractional position and the blend weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Neighbours {
    pub p: [(usize, usize); 4],  // [row, col] of upper-left, upper-right, lower-left, lower-right
    pub fx: f64,
    pub fy: f64,
}

/// Neighbourhood of pixel position (`x`, `y`); `None` when it lies off the raster.
/// Right and bottom edges reuse the edge pixel.
pub(crate) fn neighbours(x: f64, y: f64, cols: usize, rows: usize) -> Option<Neighbours> {
    if !(x >= 0.0 && y >= 0.0) {
        return None;
    }
    let (tx, ty) = (x.trunc() as usize, y.trunc() as usize);
    if tx >= cols || ty >= rows {
        return None;
    }
    let right_edge = tx == cols - 1;
    let bottom_edge = ty == rows - 1;

    let p1 = (ty, tx);
    let p2 = if right_edge { p1 } else { (ty, tx + 1) };
    let (p3, p4) = if bottom_edge {
        (p1, p2)
    } else {
        let p3 = (ty + 1, tx);
        (p3, if right_edge { p3 } else { (ty + 1, tx + 1) })
    };

    Some(Neighbours { p: [p1, p2, p3, p4], fx: x - tx as f64, fy: y - ty as f64 })
}

fn blend(n: &Neighbours, v: [f64; 4]) -> f64 {
    let (r1, r2) = (1.0 - n.fx, n.fx);
    let (r3, r4) = (1.0 - n.fy, n.fy);
    (v[0] * r1 + v[1] * r2) * r3 + (v[2] * r1 + v[3] * r2) * r4
}

pub(crate) fn bilinear_f32(band: &Array2<f32>, n: &Neighbours) -> f32 {
    let v = n.p.map(|(r, c)| f64::from(band[[r, c]]));
    blend(n, v) as f32
}

pub(crate) fn bilinear_u8(band: ndarray::ArrayView2<'_, u8>, n: &Neighbours) -> u8 {
    let v = n.p.map(|(r, c)| f64::from(band[[r, c]]));
    blend(n, v).round().clamp(0.0, 255.0) as u8
}

/// Nearest pixel for categorical planes (material, mask).
pub(crate) fn nearest(x: f64, y: f64, cols: usize, rows: usize) -> Option<(usize, usize)> {
    neighbours(x, y, cols, rows)?;
    let r = (y.round() as usize).min(rows - 1);
    let c = (x.round() as usize).min(cols - 1);
    Some((r, c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn integer_position_returns_raw_value() {
        let band = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        for r in 0..3 {
            for c in 0..3 {
                let n = neighbours(c as f64, r as f64, 3, 3).unwrap();
                assert_eq!(bilinear_f32(&band, &n), band[[r, c]]);
            }
        }
    }

    #[test]
    fn midpoint_blends_four() {
        let band = array![[0u8, 100], [100, 200]];
        let n = neighbours(0.5, 0.5, 2, 2).unwrap();
        assert_eq!(bilinear_u8(band.view(), &n), 100);

        let n = neighbours(0.25, 0.0, 2, 2).unwrap();
        assert_eq!(bilinear_u8(band.view(), &n), 25);
    }

    #[test]
    fn edges_clamp_and_outside_rejects() {
        let n = neighbours(2.5, 2.5, 3, 3).unwrap();
        assert_eq!(n.p, [(2, 2); 4]);

        let n = neighbours(2.5, 0.0, 3, 3).unwrap();
        assert_eq!(n.p, [(0, 2), (0, 2), (1, 2), (1, 2)]);

        assert!(neighbours(3.0, 0.0, 3, 3).is_none());
        assert!(neighbours(-0.5, 0.0, 3, 3).is_none());
        assert!(neighbours(f64::NAN, 0.0, 3, 3).is_none());
    }

    #[test]
    fn nearest_rounds() {
        assert_eq!(nearest(1.6, 0.4, 3, 3), Some((0, 2)));
        assert_eq!(nearest(2.7, 2.7, 3, 3), Some((2, 2)));
        assert_eq!(nearest(5.0, 0.0, 3, 3), None);
    }
}
