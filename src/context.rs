//! The renderer surface: window, GPU device and everything drawn with it.

use std::{iter, sync::Arc};

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, Projection},
    config::SceneConfig,
    controls::OrbitController,
    data_structures::{model::DrawModel, texture},
    pipelines::{
        Pipelines,
        light::{LightResources, LightUniform},
    },
    render::{Instanced, Lines},
    resize::{ResizeTarget, SurfaceLayout},
    scene::Scene,
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
    layout: SurfaceLayout,
}

/// What asynchronous loaders need from the context. Device and queue are
/// reference counted, so this is cheap to hand out.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
        }
    }
}

fn camera_resources(device: &wgpu::Device, config: &SceneConfig, projection: &Projection) -> CameraResources {
    let camera = Camera::new(config.camera_position, config.camera_target);
    let controller = OrbitController::from_config(config);

    let mut camera_uniform = CameraUniform::new();
    camera_uniform.update_view_proj(&camera, projection);

    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Camera Buffer"),
        contents: bytemuck::cast_slice(&[camera_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: camera_buffer.as_entire_binding(),
        }],
        label: Some("camera_bind_group"),
    });

    CameraResources {
        camera,
        controller,
        uniform: camera_uniform,
        buffer: camera_buffer,
        bind_group,
        bind_group_layout,
    }
}

impl Context {
    pub async fn new(
        window: Arc<Window>,
        scene_config: &SceneConfig,
        layout: SurfaceLayout,
    ) -> anyhow::Result<Self> {
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders write linear colour and rely on an sRGB target for encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first().copied())
            .context("the surface reports no texture formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: layout.width,
            height: layout.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let projection = Projection::new(
            layout.width,
            layout.height,
            scene_config.fovy,
            scene_config.znear,
            scene_config.zfar,
        );
        let camera = camera_resources(&device, scene_config, &projection);

        let depth_texture =
            texture::Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        let light = LightResources::new(LightUniform::from_config(scene_config), &device);

        let pipelines = Pipelines::new(
            &device,
            &config,
            &light.bind_group_layout,
            &camera.bind_group_layout,
        );

        let mut ctx = Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            clear_colour: scene_config.clear_colour,
            layout,
        };
        ctx.apply_layout(&layout);
        Ok(ctx)
    }

    /// Reconfigures the surface at the current layout, after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        let layout = self.layout;
        self.apply_layout(&layout);
    }

    /// Advances the orbit controls by one frame and uploads the camera.
    pub fn update_camera(&mut self) {
        let camera = &mut self.camera;
        camera.controller.update(&mut camera.camera, &self.projection);
        self.write_camera();
    }

    fn write_camera(&mut self) {
        self.camera
            .uniform
            .update_view_proj(&self.camera.camera, &self.projection);
        self.queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.camera.uniform]),
        );
    }

    /// Draws the scene once: clear, lit meshes, then lines.
    pub fn render(&mut self, scene: &mut Scene) -> Result<(), wgpu::SurfaceError> {
        scene.write_to_buffers(&self.queue, &self.device);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut basics: Vec<Instanced> = Vec::new();
            let mut lines: Vec<Lines> = Vec::new();
            scene.render().set_pipelines(&mut basics, &mut lines);

            render_pass.set_pipeline(&self.pipelines.basic);
            for instanced in basics {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("you attempted to render something with zero instances");
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &self.camera.bind_group,
                    &self.light.bind_group,
                );
            }

            render_pass.set_pipeline(&self.pipelines.line);
            render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
            for line in lines {
                render_pass.set_vertex_buffer(0, line.vertex.slice(..));
                render_pass.draw(0..line.amount as u32, 0..1);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl ResizeTarget for Context {
    /// Applies backing size, aspect ratio, renderer size and pixel ratio together.
    fn apply_layout(&mut self, layout: &SurfaceLayout) {
        let max = self.device.limits().max_texture_dimension_2d;
        self.config.width = layout.width.min(max);
        self.config.height = layout.height.min(max);
        self.layout = *layout;

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowExtWebSys;

            if let Some(canvas) = self.window.canvas() {
                canvas.set_width(self.config.width);
                canvas.set_height(self.config.height);
                let style = canvas.style();
                let sized = style
                    .set_property("width", &format!("{}px", layout.css_width))
                    .and_then(|_| style.set_property("height", &format!("{}px", layout.css_height)));
                if let Err(e) = sized {
                    log::warn!("Could not size the canvas: {:?}", e);
                }
            }
        }

        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        self.projection.set_aspect(layout.aspect());
        self.camera
            .controller
            .set_viewport_height((layout.css_height * layout.device_pixel_ratio) as f32);
        self.write_camera();
    }
}
