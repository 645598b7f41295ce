use anyhow::{Context, bail};

use crate::data_structures::{
    model::{self, MaterialUniform},
    scene_graph::{ContainerNode, SceneNode, to_scene_node},
    texture::Texture,
};
use texture::{decode_data_uri, is_data_uri, load_binary, load_texture, load_uri, material_layout, resolve_uri};

/**
 * This module contains all logic for loading meshes and textures from external files.
 */
pub mod mesh;
pub mod texture;

/// Name of the glTF extension for Draco-compressed geometry.
pub const DRACO_EXTENSION: &str = "KHR_draco_mesh_compression";

/// Fails when the document can only be read with a Draco decoder.
///
/// Files that merely list the extension as used still carry uncompressed
/// accessors and load normally.
pub fn reject_draco(document: &gltf::Document, decoder_path: &str) -> anyhow::Result<()> {
    if document.extensions_required().any(|ext| ext == DRACO_EXTENSION) {
        bail!(
            "{} is required but no Draco decoder is available (looked for one at {})",
            DRACO_EXTENSION,
            decoder_path
        );
    }
    if document.extensions_used().any(|ext| ext == DRACO_EXTENSION) {
        log::info!("Ignoring optional {}, using uncompressed data", DRACO_EXTENSION);
    }
    Ok(())
}

async fn load_image(
    source: gltf::image::Source<'_>,
    file_name: &str,
    buffer_data: &[Vec<u8>],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    match source {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffer_data
                .get(view.buffer().index())
                .context("image references a missing buffer")?;
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .context("image view is out of bounds")?;
            Texture::from_bytes(
                device,
                queue,
                bytes,
                file_name,
                mime_type.split('/').last(),
                false,
            )
        }
        gltf::image::Source::Uri { uri, mime_type } if is_data_uri(uri) => {
            let embedded = decode_data_uri(uri)?;
            Texture::from_bytes(
                device,
                queue,
                &embedded.data,
                file_name,
                mime_type
                    .or(embedded.mime_type)
                    .and_then(|mt| mt.split('/').last()),
                false,
            )
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            let path = resolve_uri(file_name, uri)?;
            load_texture(
                &path,
                false,
                device,
                queue,
                mime_type.and_then(|mt| mt.split('/').last()),
            )
            .await
        }
    }
}

/// Loads a glTF file into a scene node.
///
/// Uses the default scene (or the first one). A file with several root nodes
/// comes back wrapped in a [`ContainerNode`].
pub async fn load_model_gltf(
    file_name: &str,
    draco_decoder_path: &str,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Box<dyn SceneNode>> {
    let bytes = load_binary(file_name).await?;
    let unchecked = gltf::Gltf::from_slice_without_validation(&bytes)
        .with_context(|| format!("{} is not a glTF file", file_name))?;
    reject_draco(&unchecked.document, draco_decoder_path)?;
    let gltf = gltf::Gltf::from_slice(&bytes)
        .with_context(|| format!("{} failed glTF validation", file_name))?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .context("the binary chunk of a .glb file is missing")?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_uri(file_name, uri)
                    .await
                    .with_context(|| format!("could not load buffer {}", buffer.index()))?;
                buffer_data.push(bin);
            }
        }
    }

    // Load materials
    let layout = material_layout(device);
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => {
                let source = info.texture().source().source();
                match load_image(source, file_name, &buffer_data, device, queue).await {
                    Ok(texture) => texture,
                    Err(e) => {
                        log::warn!("Base colour texture of {} not loaded: {}", file_name, e);
                        Texture::white(device, queue)
                    }
                }
            }
            None => Texture::white(device, queue),
        };
        let name = material.name().unwrap_or(file_name);
        materials.push(model::Material::new(
            device,
            name,
            diffuse_texture,
            MaterialUniform::new(
                pbr.base_color_factor(),
                pbr.roughness_factor(),
                pbr.metallic_factor(),
            ),
            &layout,
        ));
    }
    // White, fully rough, non-metallic: what primitives without a material get
    let default_material = materials.len();
    materials.push(model::Material::new(
        device,
        "default",
        Texture::white(device, queue),
        MaterialUniform::default(),
        &layout,
    ));

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{} contains no scene", file_name))?;
    let mut models: Vec<Box<dyn SceneNode>> = scene
        .nodes()
        .map(|node| to_scene_node(node, &buffer_data, device, &materials, default_material))
        .collect();

    let root_node = if models.len() == 1 {
        models.remove(0)
    } else {
        let mut root_node = ContainerNode::new(1);
        root_node.children = models;
        Box::new(root_node)
    };
    log::info!("Loaded {}", file_name);

    Ok(root_node)
}
