use geo::{Point, Rect, coord};

/// Geographic bounds of a tile in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Width in degrees of one geocell at the given latitude.
/// The southern hemisphere bands close on their upper bound.
pub fn lon_step(lat: f64) -> i32 {
    let alat = lat.abs();
    if lat >= 0.0 {
        match alat {
            a if a < 50.0 => 1,
            a if a < 70.0 => 2,
            a if a < 75.0 => 3,
            a if a < 80.0 => 4,
            a if a < 89.0 => 6,
            _ => 12,
        }
    } else {
        match alat {
            a if a <= 50.0 => 1,
            a if a <= 70.0 => 2,
            a if a <= 75.0 => 3,
            a if a <= 80.0 => 4,
            a if a <= 89.0 => 6,
            _ => 12,
        }
    }
}

/// LOD implied by a tile height. Heights above one degree give the
/// negative LODs used by cache aggregates.
pub fn lod_for_height(height: f64) -> i32 {
    let tiles_per_degree = 1.0 / height;
    if tiles_per_degree < 0.99 {
        let mut itiles = ((1.0 / tiles_per_degree) / 2.0).round() as i64;
        let mut lod = -1;
        while itiles > 1 {
            itiles /= 2;
            lod -= 1;
        }
        lod
    } else {
        let mut itiles = tiles_per_degree.round() as i64;
        let mut lod = 0;
        while itiles > 1 {
            itiles /= 2;
            lod += 1;
        }
        lod
    }
}

/// Number of tiles per geocell edge at `lod` (fractional for negative LODs).
pub fn tiles_per_lod(lod: i32) -> f64 { 2f64.powi(lod) }

/// Snap a longitude down onto the geocell grid of width `step`.
/// Truncates toward zero first, then steps west when that overshoots.
pub fn snap_lon(lon: f64, step: i32) -> f64 {
    let mut base = lon.trunc();
    if step != 1 {
        let check = base.abs() as i64;
        if check % step as i64 != 0 {
            let sign = if base < 0.0 { -1.0 } else { 1.0 };
            base = ((check / step as i64) * step as i64) as f64 * sign;
            if sign < 0.0 {
                base -= step as f64;
            }
        }
    }
    if lon < base {
        base -= step as f64;
    }
    base
}

/// Integer geocell index containing `value`, guarding against a value that
/// sits one epsilon below an integer.
pub fn geocell_index(value: f64) -> i32 {
    let mut t = value.trunc();
    if ((t + 1.0) - value).abs() < f64::EPSILON {
        t += 1.0;
    } else if value < t {
        t -= 1.0;
    }
    t as i32
}

impl Extent {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self { north, south, east, west }
    }

    /// Build from a `(min_lon, min_lat, max_lon, max_lat)` box.
    pub fn from_bounds(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self::new(max_lat, min_lat, max_lon, min_lon)
    }

    pub fn width(&self) -> f64 { self.east - self.west }

    pub fn height(&self) -> f64 { self.north - self.south }

    /// Center as a (lon, lat) point.
    pub fn center(&self) -> Point<f64> {
        Point::new((self.east + self.west) / 2.0, (self.north + self.south) / 2.0)
    }

    pub fn lon_step(&self) -> i32 { lon_step(self.south) }

    pub fn lod(&self) -> i32 { lod_for_height(self.height()) }

    pub fn is_valid(&self) -> bool {
        self.north > self.south && self.east > self.west
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(coord! { x: self.west, y: self.south }, coord! { x: self.east, y: self.north })
    }

    /// Closed containment of a (lon, lat) position.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.west && lon <= self.east && lat >= self.south && lat <= self.north
    }

    /// Open containment, boundary excluded.
    pub fn strictly_contains(&self, lon: f64, lat: f64) -> bool {
        lon > self.west && lon < self.east && lat > self.south && lat < self.north
    }

    pub fn contains_extent(&self, other: &Extent) -> bool {
        other.west >= self.west && other.east <= self.east
            && other.south >= self.south && other.north <= self.north
    }

    /// (west, north), (east, north), (west, south), (east, south).
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.west, self.north),
            (self.east, self.north),
            (self.west, self.south),
            (self.east, self.south),
        ]
    }

    /// Extent of the native tile that covers this one in bands where a
    /// geocell is wider than one degree.
    pub fn actual_extent(&self) -> Extent {
        let lod = self.lod();
        let lonstep = self.lon_step() as f64 / tiles_per_lod(lod);
        let west = (self.west / lonstep).floor() * lonstep;
        Extent::new(self.north, self.south, west + lonstep, west)
    }
}

impl From<Rect<f64>> for Extent {
    fn from(rect: Rect<f64>) -> Self {
        Extent::from_bounds(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[N {} S {} E {} W {}]", self.north, self.south, self.east, self.west)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn northern_bands_are_exclusive() {
        assert_eq!(lon_step(0.0), 1);
        assert_eq!(lon_step(49.9), 1);
        assert_eq!(lon_step(50.0), 2);
        assert_eq!(lon_step(69.5), 2);
        assert_eq!(lon_step(70.0), 3);
        assert_eq!(lon_step(75.0), 4);
        assert_eq!(lon_step(80.0), 6);
        assert_eq!(lon_step(88.0), 6);
        assert_eq!(lon_step(89.0), 12);
    }

    #[test]
    fn southern_bands_are_inclusive() {
        assert_eq!(lon_step(-50.0), 1);
        assert_eq!(lon_step(-51.0), 2);
        assert_eq!(lon_step(-70.0), 2);
        assert_eq!(lon_step(-75.0), 3);
        assert_eq!(lon_step(-80.0), 4);
        assert_eq!(lon_step(-89.0), 6);
        assert_eq!(lon_step(-90.0), 12);
    }

    #[test]
    fn lod_from_height() {
        assert_eq!(lod_for_height(1.0), 0);
        assert_eq!(lod_for_height(0.5), 1);
        assert_eq!(lod_for_height(0.25), 2);
        assert_eq!(lod_for_height(1.0 / 1024.0), 10);
        assert_eq!(lod_for_height(2.0), -1);
        assert_eq!(lod_for_height(4.0), -2);
        assert_eq!(lod_for_height(8.0), -3);
    }

    #[test]
    fn snapping_longitudes() {
        assert_eq!(snap_lon(12.3, 1), 12.0);
        assert_eq!(snap_lon(-12.3, 1), -13.0);
        assert_eq!(snap_lon(13.0, 2), 12.0);
        assert_eq!(snap_lon(-13.0, 2), -14.0);
        assert_eq!(snap_lon(-12.5, 2), -14.0);
        assert_eq!(snap_lon(7.0, 6), 6.0);
    }

    #[test]
    fn geocell_index_rounds_down() {
        assert_eq!(geocell_index(12.0), 12);
        assert_eq!(geocell_index(12.5), 12);
        assert_eq!(geocell_index(-0.5), -1);
        assert_eq!(geocell_index(-3.0), -3);
        assert_eq!(geocell_index(1.0 - f64::EPSILON / 2.0), 1);
    }

    #[test]
    fn actual_extent_snaps_to_geocell() {
        // 60N sits in the two degree band
        let e = Extent::new(61.0, 60.0, 13.0, 12.0).actual_extent();
        assert_eq!(e, Extent::new(61.0, 60.0, 14.0, 12.0));

        let e = Extent::new(60.5, 60.0, 13.5, 13.0).actual_extent();
        assert_eq!(e, Extent::new(60.5, 60.0, 14.0, 13.0));
    }

    #[test]
    fn rect_round_trip() {
        let e = Extent::new(2.0, 1.0, 4.0, 3.0);
        assert_eq!(Extent::from(e.to_rect()), e);
        assert_eq!(e.center(), Point::new(3.5, 1.5));
    }
}
