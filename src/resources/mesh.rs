use cgmath::InnerSpace;

use crate::data_structures::model::{Geometry, ModelVertex};

/**
 * A flat rectangle in the XY plane centred on the origin, facing +Z.
 *
 * Texture coordinates span `[0, 1]` with `v = 0` along the top edge (+Y).
 */
pub fn plane(name: &str, width: f32, height: f32) -> Geometry {
    let half_w = width / 2.0;
    let half_h = height / 2.0;
    let vertices = vec![
        ModelVertex {
            position: [-half_w, half_h, 0.0],
            tex_coords: [0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [half_w, half_h, 0.0],
            tex_coords: [1.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [-half_w, -half_h, 0.0],
            tex_coords: [0.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
        ModelVertex {
            position: [half_w, -half_h, 0.0],
            tex_coords: [1.0, 1.0],
            normal: [0.0, 0.0, 1.0],
        },
    ];
    // counter-clockwise seen from +Z
    let indices = vec![0, 2, 1, 2, 3, 1];
    Geometry {
        name: name.to_string(),
        vertices,
        indices,
    }
}

/**
 * A UV sphere centred on the origin.
 *
 * `width_segments` slices run around the Y axis, `height_segments` rings run
 * from the north pole (+Y) to the south pole. The grid has one duplicated seam
 * column so the texture wraps once around the sphere. Triangles wind
 * counter-clockwise seen from outside.
 */
pub fn uv_sphere(name: &str, radius: f32, width_segments: u32, height_segments: u32) -> Geometry {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);
    let mut vertices = Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * std::f32::consts::PI;
        // keep the pole vertices centred in texture space
        let u_offset = if iy == 0 {
            0.5 / width_segments as f32
        } else if iy == height_segments {
            -0.5 / width_segments as f32
        } else {
            0.0
        };
        let mut row = Vec::with_capacity(width_segments as usize + 1);
        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * std::f32::consts::TAU;
            let position = cgmath::Vector3::new(
                -radius * phi.cos() * theta.sin(),
                radius * theta.cos(),
                radius * phi.sin() * theta.sin(),
            );
            let normal = if position.magnitude2() > 0.0 {
                position.normalize()
            } else {
                cgmath::Vector3::unit_y()
            };
            row.push(vertices.len() as u32);
            vertices.push(ModelVertex {
                position: position.into(),
                tex_coords: [u + u_offset, v],
                normal: normal.into(),
            });
        }
        grid.push(row);
    }

    let mut indices = Vec::new();
    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            // the pole rows collapse into single triangles
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    Geometry {
        name: name.to_string(),
        vertices,
        indices,
    }
}

/// Area-weighted smooth normals for geometry that ships without them.
pub fn compute_vertex_normals(geometry: &mut Geometry) {
    let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); geometry.vertices.len()];
    for c in geometry.indices.chunks_exact(3) {
        let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
        let (Some(v0), Some(v1), Some(v2)) = (
            geometry.vertices.get(i0),
            geometry.vertices.get(i1),
            geometry.vertices.get(i2),
        ) else {
            continue;
        };
        let p0: cgmath::Vector3<f32> = v0.position.into();
        let p1: cgmath::Vector3<f32> = v1.position.into();
        let p2: cgmath::Vector3<f32> = v2.position.into();
        // unnormalised, so larger faces weigh more
        let face = (p1 - p0).cross(p2 - p0);
        normals[i0] += face;
        normals[i1] += face;
        normals[i2] += face;
    }
    for (vertex, normal) in geometry.vertices.iter_mut().zip(normals) {
        vertex.normal = if normal.magnitude2() > 0.0 {
            normal.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}
