use std::{
    collections::{HashMap, HashSet},
    io::{BufReader, Cursor},
};

use anyhow::Context as _;
use base64::Engine as _;
use gltf::Gltf;

use crate::{
    data_structures::{
        model::{Material, Mesh, MeshData, Model},
        texture::Texture,
    },
    resources::texture::{load_binary, material_bind_group_layout},
};

/**
 * This module contains all logic for loading meshes/materials/textures from
 * glTF files into GPU-ready models.
 */
pub mod mesh;
pub mod texture;

/// The CPU-side result of parsing a glTF asset: mesh content plus the size
/// of the material table the meshes index into.
///
/// Every `MeshData::material_index` is strictly less than `material_count`;
/// primitives without a material are pointed at an implicit default material
/// occupying the last slot.
pub struct ModelData {
    pub meshes: Vec<MeshData>,
    pub material_count: usize,
}

impl ModelData {
    /// Parse glTF content (JSON or binary) without touching the GPU.
    pub async fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        let gltf = Gltf::from_reader(BufReader::new(Cursor::new(bytes)))?;
        let buffer_data = load_buffers(&gltf).await?;

        let declared_materials = gltf.materials().count();
        let fallback = fallback_material_index(&gltf, declared_materials);
        let meshes = build_meshes(&gltf, &buffer_data, fallback, "model")?;

        Ok(Self {
            meshes,
            material_count: declared_materials + fallback.is_some() as usize,
        })
    }
}

/// Load a glTF model from the asset directory and upload it to the GPU.
///
/// Populates the full model table: one mesh per primitive, the material
/// table they index into and the texture table keyed by the file's texture
/// indices. Materials missing a texture reference fall back to neutral
/// defaults so the pipeline layout never changes.
pub async fn load_model_gltf(
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Model> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf = Gltf::from_reader(BufReader::new(Cursor::new(gltf_bytes.as_slice())))?;
    let buffer_data = load_buffers(&gltf).await?;

    // Base color is color data (sRGB); everything else stays linear.
    let srgb_indices: HashSet<usize> = gltf
        .materials()
        .filter_map(|m| {
            m.pbr_metallic_roughness()
                .base_color_texture()
                .map(|info| info.texture().index())
        })
        .collect();
    let textures =
        load_texture_table(&gltf, &buffer_data, &srgb_indices, file_name, device, queue).await?;

    let layout = material_bind_group_layout(device);
    let default_base_color = Texture::create_default_base_color(device, queue);
    let default_metallic_roughness = Texture::create_default_metallic_roughness(device, queue);

    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let base_color_index = pbr.base_color_texture().map(|info| info.texture().index());
        let metallic_roughness_index = pbr
            .metallic_roughness_texture()
            .map(|info| info.texture().index());
        let base_color = base_color_index
            .and_then(|i| textures.get(&i))
            .unwrap_or(&default_base_color);
        let metallic_roughness = metallic_roughness_index
            .and_then(|i| textures.get(&i))
            .unwrap_or(&default_metallic_roughness);
        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}#{}", file_name, materials.len()));
        materials.push(Material::new(
            device,
            &name,
            base_color,
            metallic_roughness,
            base_color_index,
            metallic_roughness_index,
            &layout,
        ));
    }

    let fallback = fallback_material_index(&gltf, materials.len());
    if fallback.is_some() {
        materials.push(Material::new(
            device,
            "default material",
            &default_base_color,
            &default_metallic_roughness,
            None,
            None,
            &layout,
        ));
    }

    let mesh_data = build_meshes(&gltf, &buffer_data, fallback, file_name)?;
    let meshes: Vec<Mesh> = mesh_data
        .iter()
        .map(|data| Mesh::from_data(device, data))
        .collect();

    log::info!(
        "Loaded {file_name}: {} meshes, {} materials, {} textures",
        meshes.len(),
        materials.len(),
        textures.len()
    );

    Ok(Model {
        meshes,
        materials,
        textures,
    })
}

/// Resolve all buffers of a document: GLB BIN chunks, `data:` URIs and
/// files relative to the asset directory.
pub(crate) async fn load_buffers(gltf: &Gltf) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .context("Binary glTF buffer without a BIN chunk")?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = match decode_data_uri(uri)? {
                    Some(data) => data,
                    None => load_binary(uri).await?,
                };
                buffer_data.push(bin);
            }
        }
    }
    Ok(buffer_data)
}

/// Load every texture of the document into the table keyed by its glTF
/// texture index, whether stored in a buffer view, embedded as a `data:` URI
/// or referenced as an external file.
async fn load_texture_table(
    gltf: &Gltf,
    buffer_data: &[Vec<u8>],
    srgb_indices: &HashSet<usize>,
    file_name: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<HashMap<usize, Texture>> {
    let mut textures = HashMap::new();
    for gltf_texture in gltf.textures() {
        let index = gltf_texture.index();
        let srgb = srgb_indices.contains(&index);
        let loaded = match gltf_texture.source().source() {
            gltf::image::Source::View { view, mime_type } => {
                let parent = buffer_data
                    .get(view.buffer().index())
                    .with_context(|| format!("Texture {index} references a missing buffer"))?;
                let bytes = parent
                    .get(view.offset()..view.offset() + view.length())
                    .with_context(|| format!("Texture {index} view exceeds its buffer"))?;
                Texture::from_bytes(
                    device,
                    queue,
                    bytes,
                    file_name,
                    mime_type.split('/').last(),
                    srgb,
                )?
            }
            gltf::image::Source::Uri { uri, mime_type } => {
                let format = mime_type.and_then(|mt| mt.split('/').last());
                match decode_data_uri(uri)? {
                    Some(bytes) => {
                        Texture::from_bytes(device, queue, &bytes, file_name, format, srgb)?
                    }
                    None => texture::load_texture(uri, srgb, device, queue, format).await?,
                }
            }
        };
        textures.insert(index, loaded);
    }
    Ok(textures)
}

/// Decode an embedded `data:` URI, or return `None` for external URIs.
fn decode_data_uri(uri: &str) -> anyhow::Result<Option<Vec<u8>>> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Ok(None);
    };
    // glTF embeds buffer and image payloads base64-encoded
    let (_, payload) = rest
        .split_once(',')
        .context("data URI without a payload")?;
    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .context("invalid base64 in data URI")?;
    Ok(Some(data))
}

/// The index the default material will occupy, if one is needed.
///
/// A default material is appended when the file declares no materials at all
/// or when at least one primitive omits its material reference.
fn fallback_material_index(gltf: &Gltf, declared_materials: usize) -> Option<usize> {
    let needed = declared_materials == 0
        || gltf
            .meshes()
            .flat_map(|m| m.primitives())
            .any(|p| p.material().index().is_none());
    needed.then_some(declared_materials)
}

fn build_meshes(
    gltf: &Gltf,
    buffer_data: &[Vec<u8>],
    fallback_material: Option<usize>,
    default_name: &str,
) -> anyhow::Result<Vec<MeshData>> {
    let mut meshes = Vec::new();
    for gltf_mesh in gltf.meshes() {
        let name = gltf_mesh.name().unwrap_or(default_name);
        for primitive in gltf_mesh.primitives() {
            let material_index = primitive
                .material()
                .index()
                .or(fallback_material)
                .with_context(|| format!("Primitive in {name} has no material"))?;
            meshes.push(mesh::load_primitive(
                name,
                &primitive,
                buffer_data,
                material_index,
            )?);
        }
    }
    Ok(meshes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uris_are_decoded() {
        let decoded = decode_data_uri("data:application/octet-stream;base64,AAAAPw==")
            .unwrap()
            .unwrap();
        assert_eq!(decoded, vec![0x00, 0x00, 0x00, 0x3f]);
    }

    #[test]
    fn external_uris_are_passed_through() {
        assert!(decode_data_uri("textures/albedo.png").unwrap().is_none());
    }

    #[test]
    fn garbage_data_uri_is_an_error() {
        assert!(decode_data_uri("data:application/octet-stream;base64,@@@").is_err());
        assert!(decode_data_uri("data:no-comma").is_err());
    }
}
