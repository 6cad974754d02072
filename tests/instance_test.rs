use approx::assert_relative_eq;
use cgmath::{InnerSpace, Matrix3, Rad, Rotation3, Vector3};
use toon_flight::data_structures::instance::Instance;

fn transformed_normal(instance: &Instance, normal: Vector3<f32>) -> Vector3<f32> {
    (instance.normal_matrix() * normal).normalize()
}

#[test]
fn should_keep_normals_perpendicular_under_non_uniform_scale() {
    let instance = Instance {
        scale: Vector3::new(1.0, 4.0, 1.0),
        ..Instance::new()
    };
    let tangent = Vector3::new(1.0, -1.0, 0.0);
    let normal = Vector3::new(1.0, 1.0, 0.0).normalize();

    let stretched_tangent = Vector3::new(tangent.x * 1.0, tangent.y * 4.0, tangent.z * 1.0);
    let normal = transformed_normal(&instance, normal);

    assert_relative_eq!(normal.dot(stretched_tangent), 0.0, epsilon = 1e-5);
    assert!(normal.x > normal.y);
}

#[test]
fn should_only_rotate_normals_under_uniform_scale() {
    let rotation = cgmath::Quaternion::from_angle_z(Rad(std::f32::consts::FRAC_PI_2));
    let instance = Instance {
        rotation,
        scale: Vector3::new(2.0, 2.0, 2.0),
        ..Instance::new()
    };

    let normal = transformed_normal(&instance, Vector3::unit_x());

    assert_relative_eq!(normal.x, 0.0, epsilon = 1e-5);
    assert_relative_eq!(normal.y, 1.0, epsilon = 1e-5);
    assert_relative_eq!(normal.z, 0.0, epsilon = 1e-5);
}

#[test]
fn should_fall_back_to_the_rotation_for_flattened_instances() {
    let rotation = cgmath::Quaternion::from_angle_y(Rad(0.5));
    let instance = Instance {
        rotation,
        scale: Vector3::new(1.0, 0.0, 1.0),
        ..Instance::new()
    };

    assert_eq!(instance.normal_matrix(), Matrix3::from(rotation));
}

#[test]
fn should_upload_the_normal_matrix_with_the_instance() {
    let instance = Instance {
        scale: Vector3::new(2.0, 1.0, 1.0),
        ..Instance::new()
    };

    let raw = instance.to_raw();
    // 16 floats of model matrix, then the column-major normal matrix
    let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&raw));
    assert_eq!(floats.len(), 25);
    assert_relative_eq!(floats[0], 2.0);
    assert_relative_eq!(floats[16], 0.5);
    assert_relative_eq!(floats[20], 1.0);
    assert_relative_eq!(floats[24], 1.0);
}
