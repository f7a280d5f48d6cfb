//! Geographic clip boxes used to fit a projection to a fixed lon/lat window.

use foundation::math::GeoPoint;

use crate::feature::Geometry;

/// Number of vertices in a clip box ring, closing vertex included.
pub const CLIP_BOX_VERTICES: usize = 11;

/// Builds the closed ring spanning `[[lon0, lat0], [lon1, lat1]]`.
///
/// Corner order is not required. A box whose western longitude is positive and
/// eastern longitude negative is taken to cross the antimeridian and the
/// eastern edge is shifted by 360°. Only that sign pattern is detected; boxes
/// crossing 180° with both longitudes negative or exactly on 0°/180° are not.
///
/// The north and south edges carry three intermediate vertices so projections
/// that curve parallels still bound the box sensibly. Winding is unspecified.
pub fn clip_box_ring(extent: [[f64; 2]; 2]) -> [GeoPoint; CLIP_BOX_VERTICES] {
    let [[lon0, mut lat0], [mut lon1, mut lat1]] = extent;

    if lon0 > 0.0 && lon1 < 0.0 {
        lon1 += 360.0;
    }
    if lat0 > lat1 {
        std::mem::swap(&mut lat0, &mut lat1);
    }

    let dlon4 = (lon1 - lon0) / 4.0;
    let p = GeoPoint::new;
    [
        p(lon0, lat0),
        p(lon0, lat1),
        p(lon0 + dlon4, lat1),
        p(lon0 + 2.0 * dlon4, lat1),
        p(lon0 + 3.0 * dlon4, lat1),
        p(lon1, lat1),
        p(lon1, lat0),
        p(lon1 - dlon4, lat0),
        p(lon1 - 2.0 * dlon4, lat0),
        p(lon1 - 3.0 * dlon4, lat0),
        p(lon0, lat0),
    ]
}

/// The clip box as a single-ring polygon.
pub fn clip_box(extent: [[f64; 2]; 2]) -> Geometry {
    Geometry::Polygon(vec![clip_box_ring(extent).to_vec()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ring_is_closed_with_eleven_vertices() {
        for extent in [
            [[-10.0, -5.0], [30.0, 40.0]],
            [[0.0, 10.0], [20.0, -5.0]],
            [[5.0, 5.0], [5.0, 5.0]],
            [[170.0, -10.0], [-170.0, 10.0]],
        ] {
            let ring = clip_box_ring(extent);
            assert_eq!(ring.len(), CLIP_BOX_VERTICES);
            assert_eq!(ring[0], ring[CLIP_BOX_VERTICES - 1]);

            let lo = extent[0][1].min(extent[1][1]);
            let hi = extent[0][1].max(extent[1][1]);
            assert!(ring.iter().all(|p| p.lat_deg >= lo && p.lat_deg <= hi));
        }
    }

    #[test]
    fn antimeridian_box_stays_continuous() {
        let ring = clip_box_ring([[170.0, -10.0], [-170.0, 10.0]]);
        assert!(ring.iter().all(|p| p.lon_deg >= 170.0 && p.lon_deg <= 190.0));
        assert_eq!(ring[5].lon_deg, 190.0);
        let north: Vec<f64> = ring[1..=5].iter().map(|p| p.lon_deg).collect();
        assert_eq!(north, vec![170.0, 175.0, 180.0, 185.0, 190.0]);
    }

    #[test]
    fn latitude_order_is_normalized() {
        assert_eq!(
            clip_box_ring([[0.0, 10.0], [20.0, -5.0]]),
            clip_box_ring([[0.0, -5.0], [20.0, 10.0]])
        );
    }

    #[test]
    fn both_negative_longitudes_are_left_alone() {
        let ring = clip_box_ring([[-170.0, 0.0], [-175.0, 5.0]]);
        assert_eq!(ring[5].lon_deg, -175.0);
    }

    #[test]
    fn degenerate_box_collapses_to_a_point_column() {
        let ring = clip_box_ring([[5.0, 1.0], [5.0, 2.0]]);
        assert!(ring.iter().all(|p| p.lon_deg == 5.0));
    }

    #[test]
    fn polygon_wraps_the_ring() {
        let Geometry::Polygon(rings) = clip_box([[0.0, 0.0], [4.0, 4.0]]) else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0][2], GeoPoint::new(1.0, 4.0));
        assert_eq!(rings[0][7], GeoPoint::new(3.0, 0.0));
    }
}
