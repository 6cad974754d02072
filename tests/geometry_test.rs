use approx::assert_relative_eq;
use cgmath::{InnerSpace, Vector3};
use toon_flight::{
    data_structures::model::{Geometry, ModelVertex},
    resources::mesh,
};

fn position(geometry: &Geometry, idx: u32) -> Vector3<f32> {
    geometry.vertices[idx as usize].position.into()
}

/// Unnormalised face normal following the index winding.
fn face_normal(geometry: &Geometry, face: &[u32]) -> Vector3<f32> {
    let p0 = position(geometry, face[0]);
    let p1 = position(geometry, face[1]);
    let p2 = position(geometry, face[2]);
    (p1 - p0).cross(p2 - p0)
}

#[test]
fn should_build_a_plane_facing_positive_z() {
    let plane = mesh::plane("ground", 300.0, 200.0);

    assert_eq!(plane.vertices.len(), 4);
    assert_eq!(plane.indices.len(), 6);
    for vertex in &plane.vertices {
        assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
        assert_eq!(vertex.position[0].abs(), 150.0);
        assert_eq!(vertex.position[1].abs(), 100.0);
        assert_eq!(vertex.position[2], 0.0);
    }
    for face in plane.indices.chunks_exact(3) {
        assert!(face_normal(&plane, face).z > 0.0, "face {:?} winds clockwise", face);
    }
}

#[test]
fn should_span_the_plane_texture_once() {
    let plane = mesh::plane("ground", 2.0, 2.0);
    let mut tex_coords: Vec<[f32; 2]> = plane.vertices.iter().map(|v| v.tex_coords).collect();
    tex_coords.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    assert_eq!(tex_coords, [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]);
    // v = 0 is the top edge
    let top_left = plane
        .vertices
        .iter()
        .find(|v| v.tex_coords == [0.0, 0.0])
        .expect("top left corner");
    assert_eq!(top_left.position, [-1.0, 1.0, 0.0]);
}

#[test]
fn should_build_a_closed_uv_sphere() {
    let sphere = mesh::uv_sphere("cloud", 1.0, 32, 32);

    // one seam column of duplicates, pole rows collapse to single triangles
    assert_eq!(sphere.vertices.len(), 33 * 33);
    assert_eq!(sphere.indices.len(), (32 + 32 + 30 * 64) * 3);
    assert!(sphere.indices.iter().all(|&i| (i as usize) < sphere.vertices.len()));

    for vertex in &sphere.vertices {
        let p = Vector3::from(vertex.position);
        let n = Vector3::from(vertex.normal);
        assert_relative_eq!(p.magnitude(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(n.magnitude(), 1.0, epsilon = 1e-5);
        assert!(p.dot(n) > 0.99);
    }
}

#[test]
fn should_wind_sphere_faces_outwards() {
    let sphere = mesh::uv_sphere("sky", 500.0, 60, 40);

    for face in sphere.indices.chunks_exact(3) {
        let centroid = (position(&sphere, face[0])
            + position(&sphere, face[1])
            + position(&sphere, face[2]))
            / 3.0;
        assert!(
            face_normal(&sphere, face).dot(centroid) > 0.0,
            "face {:?} points inwards",
            face
        );
    }
}

#[test]
fn should_clamp_degenerate_sphere_segments() {
    let sphere = mesh::uv_sphere("tiny", 1.0, 0, 0);

    assert_eq!(sphere.vertices.len(), 4 * 3);
    assert!(!sphere.indices.is_empty());
}

#[test]
fn should_compute_normals_from_winding() {
    let mut geometry = Geometry {
        name: "wing".to_string(),
        vertices: [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]
            .into_iter()
            .map(|position| ModelVertex {
                position,
                ..Default::default()
            })
            .collect(),
        indices: vec![0, 1, 2],
    };

    mesh::compute_vertex_normals(&mut geometry);

    for vertex in &geometry.vertices {
        assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
    }
}

#[test]
fn should_average_normals_of_shared_vertices() {
    // two faces folded along the x axis, one facing +y and one facing +z
    let mut geometry = Geometry {
        name: "fold".to_string(),
        vertices: [
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
        ]
        .into_iter()
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect(),
        indices: vec![0, 1, 2, 0, 2, 3],
    };

    mesh::compute_vertex_normals(&mut geometry);

    let half = std::f32::consts::FRAC_1_SQRT_2;
    for shared in [0, 2] {
        let normal = geometry.vertices[shared].normal;
        assert_relative_eq!(normal[0], 0.0);
        assert_relative_eq!(normal[1], half, epsilon = 1e-6);
        assert_relative_eq!(normal[2], half, epsilon = 1e-6);
    }
    assert_eq!(geometry.vertices[1].normal, [0.0, 1.0, 0.0]);
    assert_eq!(geometry.vertices[3].normal, [0.0, 0.0, 1.0]);
}

#[test]
fn should_fall_back_to_up_for_unreferenced_vertices() {
    let mut geometry = Geometry {
        name: "loose".to_string(),
        vertices: vec![ModelVertex::default(); 2],
        indices: vec![],
    };

    mesh::compute_vertex_normals(&mut geometry);

    assert!(geometry.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
}
