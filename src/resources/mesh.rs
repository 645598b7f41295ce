//! Built-in geometry: the floor plane, the placeholder cube and the axes helper.
//!
//! Generators return plain vertex/index data so they can be checked without a
//! GPU; [`to_model`] uploads them.

use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{self, LineVertex, ModelVertex};

/// A `size` x `size` square in the XY plane facing +Z, centred on the origin.
pub fn plane(size: f32) -> (Vec<ModelVertex>, Vec<u32>) {
    let h = size / 2.0;
    let normal = [0.0, 0.0, 1.0];
    let vertices = vec![
        ModelVertex {
            position: [-h, h, 0.0],
            tex_coords: [0.0, 0.0],
            normal,
        },
        ModelVertex {
            position: [h, h, 0.0],
            tex_coords: [1.0, 0.0],
            normal,
        },
        ModelVertex {
            position: [-h, -h, 0.0],
            tex_coords: [0.0, 1.0],
            normal,
        },
        ModelVertex {
            position: [h, -h, 0.0],
            tex_coords: [1.0, 1.0],
            normal,
        },
    ];
    // counter-clockwise seen from +Z
    let indices = vec![0, 2, 1, 2, 3, 1];
    (vertices, indices)
}

/// An axis-aligned cube with edge length `size`, four vertices per face so
/// each face gets a flat normal.
pub fn cube(size: f32) -> (Vec<ModelVertex>, Vec<u32>) {
    let h = size / 2.0;
    // normal, then the two in-plane axes (u, v) with u x v = normal
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for (su, sv, tex_coords) in [
            (-1.0, -1.0, [0.0, 1.0]),
            (1.0, -1.0, [1.0, 1.0]),
            (1.0, 1.0, [1.0, 0.0]),
            (-1.0, 1.0, [0.0, 0.0]),
        ] {
            let position = [0, 1, 2].map(|i| (normal[i] + su * u[i] + sv * v[i]) * h);
            vertices.push(ModelVertex {
                position,
                tex_coords,
                normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    (vertices, indices)
}

/// Three lines of `length` from the origin along +X, +Y and +Z, coloured
/// red, green and blue and fading slightly towards the tip.
pub fn axes(length: f32) -> Vec<LineVertex> {
    vec![
        LineVertex {
            position: [0.0, 0.0, 0.0],
            colour: [1.0, 0.0, 0.0],
        },
        LineVertex {
            position: [length, 0.0, 0.0],
            colour: [1.0, 0.6, 0.0],
        },
        LineVertex {
            position: [0.0, 0.0, 0.0],
            colour: [0.0, 1.0, 0.0],
        },
        LineVertex {
            position: [0.0, length, 0.0],
            colour: [0.6, 1.0, 0.0],
        },
        LineVertex {
            position: [0.0, 0.0, 0.0],
            colour: [0.0, 0.0, 1.0],
        },
        LineVertex {
            position: [0.0, 0.0, length],
            colour: [0.0, 0.6, 1.0],
        },
    ]
}

/// Unwelds an indexed triangle list so every corner carries its face normal.
///
/// Used for glTF primitives that ship without normals. Triangles that point
/// outside `vertices` are dropped and degenerate ones face +Y.
pub fn flat_shaded(vertices: &[ModelVertex], indices: &[u32]) -> (Vec<ModelVertex>, Vec<u32>) {
    let mut flat = Vec::with_capacity(indices.len());
    for tri in indices.chunks_exact(3) {
        let Some(corners) = tri
            .iter()
            .map(|&i| vertices.get(i as usize).copied())
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };
        let p = |v: &ModelVertex| Vector3::from(v.position);
        let cross = (p(&corners[1]) - p(&corners[0])).cross(p(&corners[2]) - p(&corners[0]));
        let normal = if cross.magnitude2() > f32::EPSILON * f32::EPSILON {
            cross.normalize()
        } else {
            Vector3::unit_y()
        };
        flat.extend(corners.into_iter().map(|vertex| ModelVertex {
            normal: normal.into(),
            ..vertex
        }));
    }
    let indices = (0..flat.len() as u32).collect();
    (flat, indices)
}

/// Uploads generated geometry as a single-mesh model drawn with `material`.
pub fn to_model(
    device: &wgpu::Device,
    name: &str,
    (vertices, indices): (Vec<ModelVertex>, Vec<u32>),
    material: model::Material,
) -> model::Model {
    model::Model {
        meshes: vec![model::Mesh::new(device, name, &vertices, &indices, 0)],
        materials: vec![material],
    }
}
