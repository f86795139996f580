use lustre::resources::ModelData;

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

fn load_fixture() -> ModelData {
    let bytes = std::fs::read("tests/fixtures/triangle.gltf").expect("missing fixture");
    block_on(ModelData::from_slice(&bytes)).expect("fixture should parse")
}

#[test]
fn valid_gltf_populates_meshes_with_valid_material_indices() {
    let data = load_fixture();

    assert!(!data.meshes.is_empty());
    for mesh in &data.meshes {
        assert!(mesh.material_index < data.material_count);
        assert!(!mesh.vertices.is_empty());
        assert!(
            mesh.indices
                .iter()
                .all(|&i| (i as usize) < mesh.vertices.len())
        );
    }
}

#[test]
fn declared_material_is_used_without_a_fallback() {
    let data = load_fixture();
    // The fixture declares one material and every primitive references it,
    // so no default material is appended.
    assert_eq!(data.material_count, 1);
    assert_eq!(data.meshes[0].material_index, 0);
}

#[test]
fn missing_normals_are_reconstructed() {
    let data = load_fixture();
    // The fixture triangle has no NORMAL accessor and winds counter-clockwise
    // in the xy plane, so every reconstructed normal faces +z.
    for vertex in &data.meshes[0].vertices {
        assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
    }
}

#[test]
fn missing_tex_coords_default_to_zero() {
    let data = load_fixture();
    for vertex in &data.meshes[0].vertices {
        assert_eq!(vertex.tex_coords, [0.0, 0.0]);
    }
}

#[test]
fn malformed_input_is_an_error() {
    assert!(block_on(ModelData::from_slice(b"not a gltf")).is_err());
}
