use anyhow::{Context, bail};
use base64::{Engine, engine::general_purpose::STANDARD};

use crate::data_structures::texture;

/// Base colour texture, its sampler and the material factors.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("Material bind_group_layout"),
    })
}

/// Resolves `file_name` against the page URL, the same way the browser
/// resolves a relative `src`.
#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("no global window")?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("could not read the page location: {:?}", e))?;
    let base = reqwest::Url::parse(&href)?;
    Ok(base.join(file_name)?)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./")
            .join("assets")
            .join(file_name.trim_start_matches('/'));
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?
    };

    Ok(data)
}

pub async fn load_texture(
    file_name: &str,
    is_linear: bool,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    format: Option<&str>,
) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(device, queue, &data, file_name, format, is_linear)
}

/// Payload of an embedded `data:` URI.
#[derive(Debug, PartialEq)]
pub struct DataUri<'a> {
    pub mime_type: Option<&'a str>,
    pub data: Vec<u8>,
}

pub fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decodes `data:[<mime type>];base64,<payload>`, the form glTF exporters
/// use to embed buffers and images.
pub fn decode_data_uri(uri: &str) -> anyhow::Result<DataUri<'_>> {
    let rest = uri.strip_prefix("data:").context("not a data URI")?;
    let (header, payload) = rest.split_once(',').context("data URI has no payload")?;
    let Some(mime_type) = header.strip_suffix(";base64") else {
        bail!("only base64 data URIs are supported");
    };
    let data = STANDARD
        .decode(payload)
        .context("data URI payload is not valid base64")?;
    Ok(DataUri {
        mime_type: (!mime_type.is_empty()).then_some(mime_type),
        data,
    })
}

/// Loads what a URI inside `file_name` points at, decoding embedded data in
/// place and fetching everything else relative to the file.
pub async fn load_uri(file_name: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    if is_data_uri(uri) {
        return Ok(decode_data_uri(uri)
            .with_context(|| format!("bad embedded data in {}", file_name))?
            .data);
    }
    let path = resolve_uri(file_name, uri)?;
    load_binary(&path)
        .await
        .with_context(|| format!("could not load {}", path))
}

/// Resolves a URI found inside a glTF file relative to the file itself.
///
/// `data:` URIs carry their content and have no location; see
/// [`decode_data_uri`].
pub fn resolve_uri(file_name: &str, uri: &str) -> anyhow::Result<String> {
    if is_data_uri(uri) {
        bail!("embedded data in {} has no path to resolve", file_name);
    }
    if uri.contains("://") || uri.starts_with('/') {
        return Ok(uri.to_string());
    }
    Ok(match file_name.rfind('/') {
        Some(idx) => format!("{}{}", &file_name[..=idx], uri),
        None => uri.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris_resolve_next_to_the_gltf() {
        let file = "models/hamburger/hamburger.gltf";
        assert_eq!(
            resolve_uri(file, "hamburger.bin").unwrap(),
            "models/hamburger/hamburger.bin"
        );
        assert_eq!(
            resolve_uri(file, "textures/bun.png").unwrap(),
            "models/hamburger/textures/bun.png"
        );
        assert_eq!(resolve_uri("scene.gltf", "scene.bin").unwrap(), "scene.bin");
    }

    #[test]
    fn absolute_uris_are_kept() {
        let file = "models/a.gltf";
        assert_eq!(resolve_uri(file, "/shared/a.bin").unwrap(), "/shared/a.bin");
        assert_eq!(
            resolve_uri(file, "https://example.com/a.bin").unwrap(),
            "https://example.com/a.bin"
        );
    }

    #[test]
    fn data_uris_decode_instead_of_resolving() {
        let uri = "data:application/octet-stream;base64,AAECAw==";
        assert!(resolve_uri("a.gltf", uri).is_err());
        assert_eq!(
            decode_data_uri(uri).unwrap(),
            DataUri {
                mime_type: Some("application/octet-stream"),
                data: vec![0, 1, 2, 3],
            }
        );
    }

    #[test]
    fn data_uri_without_mime_type() {
        let decoded = decode_data_uri("data:;base64,aGk=").unwrap();
        assert_eq!(decoded.mime_type, None);
        assert_eq!(decoded.data, b"hi");
    }

    #[test]
    fn malformed_data_uris_are_errors() {
        assert!(decode_data_uri("data:text/plain,hello").is_err());
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png;base64,not base64!").is_err());
        assert!(decode_data_uri("textures/bun.png").is_err());
    }

    #[tokio::test]
    async fn embedded_buffers_load_without_touching_the_disk() {
        let bytes = load_uri("models/missing/scene.gltf", "data:;base64,AAECAw==")
            .await
            .unwrap();
        assert_eq!(bytes, vec![0, 1, 2, 3]);
    }
}
