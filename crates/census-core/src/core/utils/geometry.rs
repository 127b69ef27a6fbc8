use crate::core::models::record::{AlignmentMapping, RotationAxis};
use nalgebra::{Matrix3, Point3, Rotation3, Unit, Vector3};

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Point3::from(sum / points.len() as f64)
}

/// Least-squares rotation taking `from` onto `to` after centring both sets (Kabsch).
///
/// Returns `None` for mismatched or too small sets, or when the decomposition fails.
pub fn superpose(from: &[Point3<f64>], to: &[Point3<f64>]) -> Option<Rotation3<f64>> {
    if from.len() != to.len() || from.len() < 3 {
        return None;
    }
    let from_center = centroid(from);
    let to_center = centroid(to);

    let covariance = from
        .iter()
        .zip(to.iter())
        .fold(Matrix3::zeros(), |acc, (p, q)| {
            acc + (p - from_center) * (q - to_center).transpose()
        });

    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let v = svd.v_t?.transpose();
    let d = (v * u.transpose()).determinant().signum();
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, d));
    Some(Rotation3::from_matrix_unchecked(v * correction * u.transpose()))
}

/// Recovers the symmetry axis of a self-alignment by superposing every aligned residue onto
/// its partner.
///
/// Positions in the mapping are 1-based residue numbers indexing `ca_atoms`; pairs that fall
/// outside the coordinate list are ignored. A rotation with no well-defined axis (zero angle)
/// is reported as angle 0 about z.
pub fn axis_from_alignment(
    ca_atoms: &[Point3<f64>],
    mapping: &AlignmentMapping,
) -> Option<RotationAxis> {
    let resolve = |position: i64| -> Option<Point3<f64>> {
        usize::try_from(position)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .and_then(|idx| ca_atoms.get(idx).copied())
    };
    let (from, to): (Vec<_>, Vec<_>) = mapping
        .iter()
        .filter_map(|(source, target)| Some((resolve(source)?, resolve(target)?)))
        .unzip();

    let rotation = superpose(&from, &to)?;
    let angle = rotation_angle(&rotation);
    let axis = if std::f64::consts::PI - angle < 1e-3 {
        half_turn_axis(&rotation)
    } else {
        rotation.axis()
    };
    let direction = axis.map_or([0.0, 0.0, 1.0], |axis| [axis.x, axis.y, axis.z]);
    Some(RotationAxis::new(direction, angle.to_degrees()))
}

// Rounding can push the trace just below -1 at a half turn, where acos alone gives NaN.
fn rotation_angle(rotation: &Rotation3<f64>) -> f64 {
    ((rotation.matrix().trace() - 1.0) / 2.0)
        .clamp(-1.0, 1.0)
        .acos()
}

// Near a half turn the antisymmetric part of R vanishes; the axis is then the dominant
// column of (R + I) / 2.
fn half_turn_axis(rotation: &Rotation3<f64>) -> Option<Unit<Vector3<f64>>> {
    let symmetric = (rotation.matrix() + Matrix3::identity()) * 0.5;
    let column = symmetric
        .column_iter()
        .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?
        .into_owned();
    Unit::try_new(column, 1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_from_axis_angle(axis: &Vector3<f64>, angle_degrees: f64) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle_degrees.to_radians())
    }

    fn calculate_rmsd(coords1: &[Point3<f64>], coords2: &[Point3<f64>]) -> Option<f64> {
        if coords1.len() != coords2.len() || coords1.is_empty() {
            return None;
        }
        let squared_dist_sum: f64 = coords1
            .iter()
            .zip(coords2.iter())
            .map(|(p1, p2)| (p1 - p2).norm_squared())
            .sum();
        Some((squared_dist_sum / coords1.len() as f64).sqrt())
    }

    fn helix_points() -> Vec<Point3<f64>> {
        vec![
            Point3::new(5.0, 0.0, 1.0),
            Point3::new(4.0, 2.0, -1.5),
            Point3::new(3.5, -1.0, 2.0),
            Point3::new(6.0, 1.5, 0.5),
        ]
    }

    #[test]
    fn rmsd_of_identical_sets_is_zero() {
        let points = helix_points();
        assert_eq!(calculate_rmsd(&points, &points), Some(0.0));
        assert_eq!(calculate_rmsd(&points, &points[..2]), None);
        assert_eq!(calculate_rmsd(&[], &[]), None);
    }

    #[test]
    fn superpose_recovers_known_rotation() {
        let rotation = rotation_from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), 72.0);
        let from = helix_points();
        let to: Vec<_> = from.iter().map(|p| rotation * p).collect();

        let recovered = superpose(&from, &to).unwrap();
        let moved: Vec<_> = from.iter().map(|p| recovered * p).collect();
        assert!(calculate_rmsd(&moved, &to).unwrap() < 1e-9);
        assert!((recovered.angle().to_degrees() - 72.0).abs() < 1e-6);
    }

    #[test]
    fn superpose_rejects_degenerate_input() {
        let points = helix_points();
        assert!(superpose(&points[..2], &points[..2]).is_none());
        assert!(superpose(&points, &points[..3]).is_none());
    }

    #[test]
    fn axis_from_alignment_finds_threefold_rotation() {
        let rotation = rotation_from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), 120.0);
        let unit = helix_points();
        let second: Vec<_> = unit.iter().map(|p| rotation * p).collect();
        let third: Vec<_> = second.iter().map(|p| rotation * p).collect();
        let atoms: Vec<_> = unit.into_iter().chain(second).chain(third).collect();

        // Residues 1..=8 map onto 5..=12: each repeat onto the next one.
        let mapping = AlignmentMapping::from_pairs((1..=8).map(|i| (i, i + 4))).unwrap();
        let axis = axis_from_alignment(&atoms, &mapping).unwrap();

        assert!((axis.angle - 120.0).abs() < 1e-6);
        assert!(axis.direction[2].abs() > 0.999);
        assert!(axis.deviation_from_order(3) < 1e-6);
    }

    #[test]
    fn axis_from_alignment_handles_half_turn() {
        let rotation = rotation_from_axis_angle(&Vector3::new(1.0, 0.0, 0.0), 180.0);
        let unit = helix_points();
        let partner: Vec<_> = unit.iter().map(|p| rotation * p).collect();
        let atoms: Vec<_> = unit.into_iter().chain(partner).collect();

        let mapping = AlignmentMapping::from_pairs((1..=4).map(|i| (i, i + 4))).unwrap();
        let axis = axis_from_alignment(&atoms, &mapping).unwrap();

        assert!((axis.angle - 180.0).abs() < 1e-3);
        assert!(axis.direction[0].abs() > 0.999);
    }

    #[test]
    fn axis_from_alignment_handles_off_axis_half_turn() {
        let rotation = rotation_from_axis_angle(&Vector3::new(1.0, 1.0, 0.0), 180.0);
        let unit = helix_points();
        let partner: Vec<_> = unit.iter().map(|p| rotation * p).collect();
        let atoms: Vec<_> = unit.into_iter().chain(partner).collect();

        let mapping = AlignmentMapping::from_pairs((1..=4).map(|i| (i, i + 4))).unwrap();
        let axis = axis_from_alignment(&atoms, &mapping).unwrap();

        assert!(axis.angle.is_finite());
        assert!((axis.angle - 180.0).abs() < 1e-3);
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert!((axis.direction[0].abs() - expected).abs() < 1e-6);
        assert!((axis.direction[1].abs() - expected).abs() < 1e-6);
        assert!(axis.direction[2].abs() < 1e-6);
        assert!(axis.deviation_from_order(2) < 1e-3);
    }

    #[test]
    fn rotation_angle_clamps_trace_rounding() {
        let below = Rotation3::from_matrix_unchecked(Matrix3::from_diagonal(&Vector3::new(
            1.0,
            -1.0000000000000004,
            -1.0000000000000004,
        )));
        assert!((rotation_angle(&below) - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(rotation_angle(&Rotation3::identity()), 0.0);
    }

    #[test]
    fn axis_from_alignment_ignores_out_of_range_pairs() {
        let atoms = helix_points();
        let mapping = AlignmentMapping::from_pairs([(1, 2), (0, 3), (4, 40)]).unwrap();
        assert!(axis_from_alignment(&atoms, &mapping).is_none());
    }
}
