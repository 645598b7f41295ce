#![cfg(feature = "integration-tests")]

use cgmath::Vector3;
use turntable::{
    data_structures::{model::MaterialUniform, scene_graph::SceneNode},
    resources::load_model_gltf,
};

async fn device() -> (wgpu::Device, wgpu::Queue) {
    let instance = wgpu::Instance::default();
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .expect("no graphics adapter for the loader tests");
    adapter
        .request_device(&wgpu::DeviceDescriptor::default())
        .await
        .expect("could not open the device")
}

async fn load(file: &str) -> anyhow::Result<Box<dyn SceneNode>> {
    let (device, queue) = device().await;
    load_model_gltf(file, "/draco/", &device, &queue).await
}

/// The fixtures hold one triangle node without normals, translated to (0, 2, 0)
/// in the first of two scenes and name no default scene.
fn assert_triangle(node: &dyn SceneNode) {
    let local = node.get_local_transform(0).unwrap();
    assert_eq!(local.position, Vector3::new(0.0, 2.0, 0.0));

    let renders = node.get_render();
    assert_eq!(renders.len(), 1);
    let model = renders[0].model;
    assert_eq!(model.meshes.len(), 1);
    assert_eq!(model.meshes[0].num_elements, 3);
}

#[tokio::test]
async fn external_buffer_loads_next_to_the_gltf() {
    let node = load("tests/triangle.gltf").await.unwrap();
    assert_triangle(node.as_ref());
}

#[tokio::test]
async fn primitive_without_material_gets_the_default_one() {
    let node = load("tests/triangle.gltf").await.unwrap();
    let renders = node.get_render();
    let model = renders[0].model;

    // no materials in the file, so the default is the only one
    assert_eq!(model.materials.len(), 1);
    assert_eq!(model.meshes[0].material, 0);
    assert_eq!(model.materials[0].uniform, MaterialUniform::default());
}

#[tokio::test]
async fn embedded_buffer_loads_like_an_external_one() {
    let node = load("tests/triangle_embedded.gltf").await.unwrap();
    assert_triangle(node.as_ref());
}

#[tokio::test]
async fn embedded_texture_and_factors_reach_the_material() {
    let node = load("tests/triangle_textured.gltf").await.unwrap();
    let renders = node.get_render();
    let model = renders[0].model;

    // the file's material plus the default
    assert_eq!(model.materials.len(), 2);
    let material = &model.materials[model.meshes[0].material];
    assert_eq!(material.uniform, MaterialUniform::new([1.0, 0.5, 0.25, 1.0], 0.25, 0.75));
    // the 2x1 image was decoded, not replaced by the 1x1 white map
    assert_eq!(material.diffuse_texture.texture.width(), 2);
}

#[tokio::test]
async fn required_draco_fails_the_load() {
    let err = load("tests/triangle_draco.gltf").await.err().unwrap();
    assert!(format!("{:#}", err).contains("KHR_draco_mesh_compression"));
}

#[tokio::test]
async fn missing_file_is_an_error() {
    assert!(load("tests/does_not_exist.gltf").await.is_err());
}
