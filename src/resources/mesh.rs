use anyhow::Context;
use cgmath::{InnerSpace, Vector3, Zero};

use crate::data_structures::model::{MeshData, ModelVertex};

/**
 * glTF primitives don't always come with normals so they have to be
 * reconstructed from the triangle geometry for the shading to work at all.
 * Missing texture coordinates default to zero, which samples a single texel.
 */
pub fn load_primitive(
    name: &str,
    primitive: &gltf::Primitive<'_>,
    buffer_data: &[Vec<u8>],
    material_index: usize,
) -> anyhow::Result<MeshData> {
    let reader = primitive.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .with_context(|| format!("Primitive in {name} has no positions"))?
        .collect();
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().collect());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        // Non-indexed geometry draws vertices in order
        None => (0..positions.len() as u32).collect(),
    };
    if let Some(&out_of_range) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        anyhow::bail!(
            "Primitive in {name} indexes vertex {out_of_range} but has only {} vertices",
            positions.len()
        );
    }

    let mut vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| ModelVertex {
            position: *position,
            normal: normals
                .as_ref()
                .and_then(|n| n.get(i).copied())
                .unwrap_or([0.0; 3]),
            tex_coords: tex_coords
                .as_ref()
                .and_then(|tc| tc.get(i).copied())
                .unwrap_or([0.0; 2]),
        })
        .collect::<Vec<_>>();

    if normals.is_none() {
        compute_normals(&mut vertices, &indices);
    }

    Ok(MeshData {
        name: name.to_string(),
        vertices,
        indices,
        material_index,
    })
}

/// Reconstruct smooth vertex normals from triangle geometry.
///
/// Face normals are accumulated per vertex over all triangles that share it
/// and normalized at the end, so shared edges shade smoothly.
pub(crate) fn compute_normals(vertices: &mut [ModelVertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::<f32>::zero(); vertices.len()];

    for c in indices.chunks(3) {
        if c.len() < 3 {
            continue;
        }
        let pos0: Vector3<f32> = vertices[c[0] as usize].position.into();
        let pos1: Vector3<f32> = vertices[c[1] as usize].position.into();
        let pos2: Vector3<f32> = vertices[c[2] as usize].position.into();

        // Area-weighted face normal; degenerate triangles contribute nothing
        let face_normal = (pos1 - pos0).cross(pos2 - pos0);

        accumulated[c[0] as usize] += face_normal;
        accumulated[c[1] as usize] += face_normal;
        accumulated[c[2] as usize] += face_normal;
    }

    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        vertex.normal = if normal.magnitude2() > 0.0 {
            normal.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(position: [f32; 3]) -> ModelVertex {
        ModelVertex {
            position,
            normal: [0.0; 3],
            tex_coords: [0.0; 2],
        }
    }

    #[test]
    fn ccw_triangle_in_xy_plane_faces_positive_z() {
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0]),
            vertex([1.0, 0.0, 0.0]),
            vertex([0.0, 1.0, 0.0]),
        ];
        compute_normals(&mut vertices, &[0, 1, 2]);
        for v in &vertices {
            assert_eq!(v.normal, [0.0, 0.0, 1.0]);
        }
    }

    #[test]
    fn shared_vertices_average_adjacent_faces() {
        // Two triangles folded along the y axis, one facing +z, one facing +x.
        let mut vertices = vec![
            vertex([0.0, 0.0, 0.0]),
            vertex([0.0, 1.0, 0.0]),
            vertex([1.0, 0.0, 0.0]),
            vertex([0.0, 0.0, -1.0]),
        ];
        compute_normals(&mut vertices, &[0, 2, 1, 0, 3, 1]);
        let shared = Vector3::from(vertices[0].normal);
        assert!(shared.x > 0.0 && shared.z > 0.0);
        assert!((shared.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unreferenced_vertices_get_an_up_normal() {
        let mut vertices = vec![vertex([0.0, 0.0, 0.0])];
        compute_normals(&mut vertices, &[]);
        assert_eq!(vertices[0].normal, [0.0, 1.0, 0.0]);
    }
}
