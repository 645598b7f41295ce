//! Textures the turntable draws with: the depth buffer, base colour maps
//! decoded from glTF images, and the plain white map used by untextured
//! materials.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};

#[derive(Clone, Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    /// `None` for render attachments that are never sampled.
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Depth attachment matching the surface. Zero sizes are bumped to 1 so a
    /// minimised window never produces an invalid texture.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size[0].max(1),
                height: size[1].max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// 1x1 white base colour map. Multiplied with the material factor it
    /// leaves the factor unchanged.
    pub fn white(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        upload_rgba(
            device,
            queue,
            "white texture",
            (1, 1),
            &[255; 4],
            wgpu::TextureFormat::Rgba8UnormSrgb,
        )
    }

    /// Decodes an encoded image (PNG, JPEG, WebP).
    ///
    /// `format` is a hint such as the subtype of a glTF `mimeType`; unknown or
    /// missing hints fall back to sniffing the bytes. Base colour maps are
    /// sRGB, so pass `is_linear = false` for them.
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
        format: Option<&str>,
        is_linear: bool,
    ) -> Result<Self> {
        let img = decode(bytes, format).with_context(|| format!("could not decode {}", label))?;
        Ok(Self::from_image(device, queue, &img, Some(label), is_linear))
    }

    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &DynamicImage,
        label: Option<&str>,
        is_linear: bool,
    ) -> Self {
        let rgba = img.to_rgba8();
        let format = if is_linear {
            wgpu::TextureFormat::Rgba8Unorm
        } else {
            wgpu::TextureFormat::Rgba8UnormSrgb
        };
        upload_rgba(
            device,
            queue,
            label.unwrap_or("image texture"),
            rgba.dimensions(),
            &rgba,
            format,
        )
    }
}

fn decode(bytes: &[u8], format: Option<&str>) -> image::ImageResult<DynamicImage> {
    match format.and_then(ImageFormat::from_extension) {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    }
}

fn upload_rgba(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    (width, height): (u32, u32),
    rgba: &[u8],
    format: wgpu::TextureFormat,
) -> Texture {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        size,
    );
    Texture {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        sampler: Some(colour_sampler(device)),
        texture,
    }
}

/// Repeating, linearly filtered sampler for colour maps.
pub fn colour_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("colour sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}
