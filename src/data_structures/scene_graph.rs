//! Scene graph and hierarchical scene organization.
//!
//! Provides the [`SceneNode`] trait and its two implementations: a
//! [`ContainerNode`] that only groups and transforms its children, and a
//! [`ModelNode`] that owns drawable geometry. Nodes keep a local and a world
//! transform per instance; world transforms are recomputed top-down before
//! each frame is drawn.

use std::ops::Range;

use log::warn;
use wgpu::{Device, util::DeviceExt};

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{self, ModelVertex},
    },
    frame::Spin,
    render::Instanced,
    resources::mesh,
};

pub trait SceneNode {
    fn get_world_transforms(&self) -> Vec<Instance>;

    fn get_local_transform(&self, idx: usize) -> Option<Instance>;

    fn set_local_transform(&mut self, idx: usize, instance: Instance);

    fn set_local_transform_all(&mut self, mutation: &mut dyn FnMut(&mut Instance));

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device);

    /**
     * Multiple instances of a parent can be passed down to multiple instances of multiple children.
     * The argument `parents_world_transform` with a matching `range` size provides control over which instances are transformed.
     */
    fn update_world_transforms(
        &mut self,
        range: Range<usize>,
        parents_world_transform: &Vec<Instance>,
    );

    fn update_world_transform_all(&mut self);

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

impl Spin for Box<dyn SceneNode> {
    fn spin(&mut self, angle: cgmath::Rad<f32>) {
        self.set_local_transform_all(&mut |local| local.spin(angle));
    }
}

/// Shared by both node kinds: combine each parent transform with the local
/// one, store the result as the new world transform and recurse.
fn propagate(
    instances: &mut Vec<(Instance, Instance)>,
    children: &mut Vec<Box<dyn SceneNode>>,
    range: Range<usize>,
    parents_world_transform: &Vec<Instance>,
) {
    if parents_world_transform.len() > instances.len() {
        warn!(
            "You tried to transform with len {}, but there are only {} instances to transform.",
            parents_world_transform.len(),
            instances.len()
        );
        return;
    }
    if instances.get(range.clone()).is_none() {
        warn!(
            "You tried to transform range {}..{}, which is out of bounds for parent len {}.",
            range.start,
            range.end,
            instances.len(),
        );
        return;
    }
    let world_transforms = instances[range.clone()]
        .iter_mut()
        .zip(parents_world_transform.iter())
        .map(|((local, world), parent)| {
            *world = parent * &*local;
            world.clone()
        })
        .collect::<Vec<_>>();
    for child in children.iter_mut() {
        child.update_world_transforms(range.clone(), &world_transforms);
    }
}

fn identity_transforms(amount: usize) -> Vec<(Instance, Instance)> {
    (0..amount)
        .map(|_| (Instance::default(), Instance::default()))
        .collect()
}

pub struct ContainerNode {
    pub children: Vec<Box<dyn SceneNode>>,
    pub instances: Vec<(Instance, Instance)>,
}

impl ContainerNode {
    pub fn new(amount: usize) -> Self {
        Self {
            instances: identity_transforms(amount),
            children: vec![],
        }
    }
}

impl SceneNode for ContainerNode {
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn set_local_transform_all(&mut self, mutation: &mut dyn FnMut(&mut Instance)) {
        self.instances.iter_mut().for_each(|(local, _)| {
            mutation(local);
        });
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(
        &mut self,
        range: Range<usize>,
        parents_world_transform: &Vec<Instance>,
    ) {
        propagate(
            &mut self.instances,
            &mut self.children,
            range,
            parents_world_transform,
        );
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        self.get_children_mut()
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instances.len();
        let default_instances = range.clone().map(|_| Instance::default()).collect();
        self.update_world_transforms(range, &default_instances);
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    instances: Vec<(Instance, Instance)>,
    model: model::Model,
}

impl ModelNode {
    pub fn from_model(amount: usize, device: &Device, model: model::Model) -> Self {
        let instances = identity_transforms(amount);

        let instance_data = instances
            .iter()
            .map(|(_, world)| world)
            .map(Instance::to_raw)
            .collect::<Vec<_>>();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            children: vec![],
            instance_buffer,
            instances,
            model,
        }
    }
}

impl SceneNode for ModelNode {
    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn set_local_transform_all(&mut self, mutation: &mut dyn FnMut(&mut Instance)) {
        self.instances
            .iter_mut()
            .for_each(|(local, _)| mutation(local));
    }

    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn update_world_transforms(
        &mut self,
        range: Range<usize>,
        parents_world_transform: &Vec<Instance>,
    ) {
        propagate(
            &mut self.instances,
            &mut self.children,
            range,
            parents_world_transform,
        );
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue, device: &wgpu::Device) {
        let raw_instances: Vec<InstanceRaw> = self
            .instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect();
        queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&raw_instances),
        );
        self.get_children_mut()
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue, device));
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instances.len();
        let default_instances = range.clone().map(|_| Instance::default()).collect();
        self.update_world_transforms(range, &default_instances);
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: self.instances.len(),
            }])
            .collect()
    }
}

/// Converts a glTF node and its subtree into scene nodes.
///
/// `default_material` is used for primitives that reference no material.
pub fn to_scene_node(
    node: gltf::scene::Node,
    buf: &Vec<Vec<u8>>,
    device: &wgpu::Device,
    mats: &Vec<model::Material>,
    default_material: usize,
) -> Box<dyn SceneNode> {
    let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
        Some(mesh) => {
            let mesh_name = mesh.name().unwrap_or("unknown_mesh");
            let meshes = mesh
                .primitives()
                .filter_map(|primitive| {
                    if primitive.mode() != gltf::mesh::Mode::Triangles {
                        warn!(
                            "Skipping primitive {} of mesh {}: mode {:?} is not supported.",
                            primitive.index(),
                            mesh_name,
                            primitive.mode()
                        );
                        return None;
                    }
                    let reader = primitive.reader(|buffer| buf.get(buffer.index()).map(Vec::as_slice));

                    let mut vertices: Vec<ModelVertex> = match reader.read_positions() {
                        Some(positions) => positions
                            .map(|position| ModelVertex {
                                position,
                                ..Default::default()
                            })
                            .collect(),
                        None => {
                            warn!("Skipping primitive without positions in mesh {}.", mesh_name);
                            return None;
                        }
                    };
                    let normals = reader.read_normals();
                    let has_normals = normals.is_some();
                    if let Some(normals) = normals {
                        vertices
                            .iter_mut()
                            .zip(normals)
                            .for_each(|(vertex, normal)| vertex.normal = normal);
                    }
                    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
                        vertices
                            .iter_mut()
                            .zip(tex_coords)
                            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
                    }

                    // Non-indexed primitives draw their vertices in order
                    let indices: Vec<u32> = match reader.read_indices() {
                        Some(indices) => indices.into_u32().collect(),
                        None => (0..vertices.len() as u32).collect(),
                    };
                    let (vertices, indices) = if has_normals {
                        (vertices, indices)
                    } else {
                        mesh::flat_shaded(&vertices, &indices)
                    };
                    let material = primitive
                        .material()
                        .index()
                        .unwrap_or(default_material);

                    Some(model::Mesh::new(
                        device, mesh_name, &vertices, &indices, material,
                    ))
                })
                .collect();
            let model = model::Model {
                meshes,
                materials: mats.clone(),
            };
            Box::new(ModelNode::from_model(1, device, model))
        }
        None => Box::new(ContainerNode::new(1)),
    };
    let (translation, rotation, scale) = node.transform().decomposed();
    let instance = Instance {
        position: translation.into(),
        rotation: rotation.into(),
        scale: scale.into(),
    };
    scene_node.set_local_transform(0, instance);
    for child in node.children() {
        let child_node = to_scene_node(child, buf, device, mats, default_material);
        scene_node.add_child(child_node);
    }

    scene_node
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Rad, Vector3};

    use super::*;

    fn leaf() -> Box<dyn SceneNode> {
        Box::new(ContainerNode::new(1))
    }

    #[test]
    fn world_transforms_flow_down_the_tree() {
        let mut child = leaf();
        child.set_local_transform(0, Vector3::new(1.0, 0.0, 0.0).into());
        let mut root: Box<dyn SceneNode> = Box::new(ContainerNode::new(1));
        root.set_local_transform(
            0,
            Instance {
                position: Vector3::new(0.0, 0.1, 0.0),
                scale: Vector3::new(0.1, 0.1, 0.1),
                ..Default::default()
            },
        );
        root.add_child(child);

        root.update_world_transform_all();

        let world = &root.get_children()[0].get_world_transforms()[0];
        assert!((world.position - Vector3::new(0.1, 0.1, 0.0)).magnitude() < 1e-6);
    }

    #[test]
    fn spinning_a_node_leaves_position_and_scale_alone() {
        let mut node = leaf();
        let placed = Instance {
            position: Vector3::new(0.0, 0.1, 0.0),
            scale: Vector3::new(0.1, 0.1, 0.1),
            ..Default::default()
        };
        node.set_local_transform(0, placed.clone());
        node.spin(Rad(1.0));

        let local = node.get_local_transform(0).unwrap();
        assert_eq!(local.position, placed.position);
        assert_eq!(local.scale, placed.scale);
        assert_ne!(local.rotation, placed.rotation);
    }

    #[test]
    fn out_of_range_transform_is_ignored() {
        let mut node = ContainerNode::new(1);
        node.update_world_transforms(0..3, &vec![Instance::default(); 3]);
        assert_eq!(node.get_world_transforms(), vec![Instance::default()]);
    }
}
