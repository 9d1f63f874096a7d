use super::*;

fn approx(a: DVec3, b: DVec3) -> bool {
    (a - b).length() < 1e-9
}

#[test]
fn effective_floors_noise_and_nan() {
    let v = effective(DVec3::new(1e-9, f64::NAN, 2.5));
    assert_eq!(v, DVec3::new(0.0, 0.0, 2.5));
    assert_eq!(effective_scalar(f64::INFINITY), 0.0);
}

#[test]
fn one_replaces_zero_components() {
    assert_eq!(one(DVec3::new(0.0, 2.0, 1e-12)), DVec3::new(1.0, 2.0, 1.0));
    assert_eq!(ratio(3.0, 0.0), 1.0);
    assert_eq!(ratio(3.0, 2.0), 1.5);
    assert_eq!(
        ratio3(DVec3::new(2.0, 2.0, 2.0), DVec3::new(1.0, 0.0, 4.0)),
        DVec3::new(2.0, 1.0, 0.5)
    );
}

#[test]
fn from_direction_points_z_along_direction() {
    let dir = DVec3::new(0.0, 1.0, 0.0);
    let q = from_direction(dir, DVec3::new(0.0, 0.0, -1.0));
    assert!(approx(q * DVec3::Z, dir));
    let x = q * DVec3::X;
    assert!(x.dot(dir).abs() < 1e-9);
}

#[test]
fn from_direction_handles_parallel_up() {
    let q = from_direction(DVec3::Y, DVec3::Y);
    assert!(approx(q * DVec3::Z, DVec3::Y));
    assert_eq!(from_direction(DVec3::ZERO, DVec3::Y), DQuat::IDENTITY);
}

#[test]
fn rotation_arc_maps_vectors() {
    let q = rotation_arc(DVec3::X, DVec3::new(0.0, -3.0, 0.0));
    assert!(approx(q * DVec3::X, DVec3::NEG_Y));
    assert_eq!(rotation_arc(DVec3::ZERO, DVec3::X), DQuat::IDENTITY);
}

#[test]
fn axis_and_quaternion_keeps_angle_and_sign() {
    let q = DQuat::from_axis_angle(DVec3::X, 0.6);
    let r = from_axis_and_quaternion(DVec3::new(0.9, 0.1, 0.0), q);
    let (_, angle) = r.to_axis_angle();
    assert!((angle - 0.6).abs() < 1e-9);

    let flipped = from_axis_and_quaternion(DVec3::NEG_X, q);
    assert!(abs_dot(flipped, q) > 0.999_999);
}
