//! Render composition and pipeline batching.
//!
//! Scene nodes describe what they want drawn with a [`Render`]. The context
//! walks it once per frame, sorts the pieces into per-pipeline batches and
//! then draws each batch with its pipeline bound only once.

use crate::data_structures::{model::Model, scene_graph::SceneNode};

/// Data for instanced object rendering: a model and its instance buffer.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// A non-indexed line list such as the axes helper.
#[derive(Clone)]
pub struct Lines<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub amount: usize,
}

/// Specifies how a piece of the scene should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single lit instanced object
/// - `Defaults(Vec<Instanced>)` renders a batch of lit instanced objects
/// - `Lines(Lines)` renders unlit coloured lines
/// - `Composed(Vec<Render>)` recursively renders composition of multiple renders
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Lines(Lines<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, basics: &mut Vec<Instanced<'a>>, lines: &mut Vec<Lines<'a>>) {
        match self {
            Render::Default(instanced) => basics.push(instanced),
            Render::Defaults(mut vec) => basics.append(&mut vec),
            Render::Lines(line) => lines.push(line),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(basics, lines)),
            Render::None => (),
        }
    }
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(sn: &'a dyn SceneNode) -> Self {
        Render::Defaults(sn.get_render())
    }
}

impl<'a> From<&'a Box<dyn SceneNode>> for Render<'a> {
    fn from(sn: &'a Box<dyn SceneNode>) -> Self {
        Render::Defaults(sn.get_render())
    }
}
