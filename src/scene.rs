//! The static scene and the slot the loaded model goes into.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Rad, Rotation3};
use wgpu::util::DeviceExt;

use crate::{
    asset::AssetSlot,
    config::{SceneConfig, hex_to_linear},
    data_structures::{
        instance::Instance,
        model::{Material, MaterialUniform},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::Texture,
    },
    render::{Lines, Render},
    resources::{mesh, texture::material_layout},
};

/// Colour of the cube shown when the model could not be loaded.
pub const PLACEHOLDER_COLOUR: u32 = 0xff00ff;

/// Local transform the loaded model is placed with, before any spin.
pub fn placement(config: &SceneConfig) -> Instance {
    Instance {
        position: config.model_offset,
        scale: cgmath::Vector3::new(config.model_scale, config.model_scale, config.model_scale),
        ..Default::default()
    }
}

/// Floor transform: the plane is built facing +Z and laid flat facing +Y.
pub fn floor_transform() -> Instance {
    Instance {
        rotation: cgmath::Quaternion::from_angle_x(Rad(-FRAC_PI_2)),
        ..Default::default()
    }
}

/// Wraps `node` in a holder carrying `placement`, so the loaded model's own
/// root transform is kept and the spin applies to the holder.
pub fn place(placement: &Instance, node: Box<dyn SceneNode>) -> Box<dyn SceneNode> {
    let mut holder = ContainerNode::new(1);
    holder.add_child(node);
    holder.set_local_transform(0, placement.clone());
    Box::new(holder)
}

/// The asset slot together with how its content is placed in the scene.
pub struct ModelMount {
    pub slot: AssetSlot<Box<dyn SceneNode>>,
    placement: Instance,
    fallback_placeholder: bool,
}

impl std::fmt::Debug for ModelMount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMount")
            .field("loaded", &self.slot.is_loaded())
            .field("pending", &self.slot.is_pending())
            .field("failure", &self.slot.failure())
            .field("placement", &self.placement)
            .finish()
    }
}

impl ModelMount {
    pub fn new(config: &SceneConfig) -> Self {
        Self {
            slot: AssetSlot::new(),
            placement: placement(config),
            fallback_placeholder: config.fallback_placeholder,
        }
    }

    /// Places a freshly loaded model and fills the slot.
    ///
    /// Fails without touching the slot if it was already written.
    pub fn insert(&mut self, node: Box<dyn SceneNode>) -> anyhow::Result<()> {
        let holder = place(&self.placement, node);
        self.slot.fill(holder)
    }

    /// Marks the load as failed. `placeholder` is only built when the slot is
    /// still pending and placeholders are enabled.
    pub fn fail(
        &mut self,
        reason: impl Into<String>,
        placeholder: impl FnOnce() -> Box<dyn SceneNode>,
    ) -> anyhow::Result<()> {
        let fallback = (self.slot.is_pending() && self.fallback_placeholder)
            .then(|| place(&self.placement, placeholder()));
        self.slot.fail(reason, fallback)
    }
}

pub struct Scene {
    floor: Box<dyn SceneNode>,
    axes: wgpu::Buffer,
    axes_vertices: usize,
    pub model: ModelMount,
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("axes_vertices", &self.axes_vertices)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

fn solid_material(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    name: &str,
    colour: u32,
    roughness: f32,
    metalness: f32,
) -> Material {
    let [r, g, b] = hex_to_linear(colour);
    Material::new(
        device,
        name,
        Texture::white(device, queue),
        MaterialUniform::new([r, g, b, 1.0], roughness, metalness),
        &material_layout(device),
    )
}

impl Scene {
    /// Builds the floor and the axes helper. The asset slot starts out pending.
    pub fn build(device: &wgpu::Device, queue: &wgpu::Queue, config: &SceneConfig) -> Self {
        let material = solid_material(
            device,
            queue,
            "floor",
            config.floor_colour,
            config.floor_roughness,
            config.floor_metalness,
        );
        let model = mesh::to_model(device, "floor", mesh::plane(config.floor_size), material);
        let mut floor: Box<dyn SceneNode> = Box::new(ModelNode::from_model(1, device, model));
        floor.set_local_transform(0, floor_transform());

        let axes_vertices = mesh::axes(config.axes_length);
        let axes = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Axes Vertex Buffer"),
            contents: bytemuck::cast_slice(&axes_vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Self {
            floor,
            axes,
            axes_vertices: axes_vertices.len(),
            model: ModelMount::new(config),
        }
    }

    pub fn insert_asset(&mut self, node: Box<dyn SceneNode>) -> anyhow::Result<()> {
        self.model.insert(node)
    }

    /// Marks the asset as failed, with a placeholder cube if configured.
    pub fn fail_asset(
        &mut self,
        reason: impl Into<String>,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> anyhow::Result<()> {
        self.model.fail(reason, || {
            let material = solid_material(device, queue, "placeholder", PLACEHOLDER_COLOUR, 1.0, 0.0);
            let model = mesh::to_model(device, "placeholder", mesh::cube(1.0), material);
            Box::new(ModelNode::from_model(1, device, model))
        })
    }

    /// Recomputes world transforms and uploads them.
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.floor.update_world_transform_all();
        self.floor.write_to_buffers(queue, device);
        if let Some(asset) = self.model.slot.active_mut() {
            asset.update_world_transform_all();
            asset.write_to_buffers(queue, device);
        }
    }

    pub fn render(&self) -> Render<'_> {
        let mut renders = vec![Render::from(&self.floor)];
        if let Some(asset) = self.model.slot.active() {
            renders.push(Render::from(asset));
        }
        renders.push(Render::Lines(Lines {
            vertex: &self.axes,
            amount: self.axes_vertices,
        }));
        Render::Composed(renders)
    }
}
