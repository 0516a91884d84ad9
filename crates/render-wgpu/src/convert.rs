//! Mapping from the backend-neutral descriptions to wgpu types.

use lumen_common::{MagFilter, MinFilter, SamplerDesc, VertexLayout, WrapMode};

fn address_mode(wrap: WrapMode) -> wgpu::AddressMode {
    match wrap {
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
        WrapMode::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

/// Filters without a mip component only ever read the base level.
pub(crate) fn sampler_descriptor(desc: &SamplerDesc) -> wgpu::SamplerDescriptor<'static> {
    let (min_filter, mipmap_filter) = match desc.min_filter {
        MinFilter::Nearest | MinFilter::NearestMipmapNearest => {
            (wgpu::FilterMode::Nearest, wgpu::FilterMode::Nearest)
        }
        MinFilter::Linear | MinFilter::LinearMipmapNearest => {
            (wgpu::FilterMode::Linear, wgpu::FilterMode::Nearest)
        }
        MinFilter::NearestMipmapLinear => (wgpu::FilterMode::Nearest, wgpu::FilterMode::Linear),
        MinFilter::LinearMipmapLinear => (wgpu::FilterMode::Linear, wgpu::FilterMode::Linear),
    };
    let mag_filter = match desc.mag_filter {
        MagFilter::Nearest => wgpu::FilterMode::Nearest,
        MagFilter::Linear => wgpu::FilterMode::Linear,
    };
    let lod_max_clamp = if desc.min_filter.uses_mipmaps() {
        32.0
    } else {
        0.0
    };
    wgpu::SamplerDescriptor {
        label: Some("texture_sampler"),
        address_mode_u: address_mode(desc.wrap_s),
        address_mode_v: address_mode(desc.wrap_t),
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter,
        min_filter,
        mipmap_filter,
        lod_max_clamp,
        ..Default::default()
    }
}

/// Float attributes of `layout` as wgpu vertex attributes.
pub(crate) fn vertex_attributes(layout: &VertexLayout) -> Vec<wgpu::VertexAttribute> {
    layout
        .attributes
        .iter()
        .filter_map(|attr| {
            let format = match attr.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                4 => wgpu::VertexFormat::Float32x4,
                n => {
                    tracing::warn!("skipping attribute {} with {n} components", attr.location);
                    return None;
                }
            };
            Some(wgpu::VertexAttribute {
                format,
                offset: u64::from(attr.offset),
                shader_location: attr.location,
            })
        })
        .collect()
}

/// Round `value` up to a multiple of `alignment` (a power of two).
pub(crate) fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sampler_repeats_without_mips() {
        let d = sampler_descriptor(&SamplerDesc::default());
        assert_eq!(d.address_mode_u, wgpu::AddressMode::Repeat);
        assert_eq!(d.address_mode_v, wgpu::AddressMode::Repeat);
        assert_eq!(d.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(d.mag_filter, wgpu::FilterMode::Nearest);
        assert_eq!(d.lod_max_clamp, 0.0);
    }

    #[test]
    fn trilinear_reads_every_level() {
        let d = sampler_descriptor(&SamplerDesc {
            min_filter: MinFilter::LinearMipmapLinear,
            wrap_t: WrapMode::MirroredRepeat,
            ..SamplerDesc::default()
        });
        assert_eq!(d.mipmap_filter, wgpu::FilterMode::Linear);
        assert_eq!(d.address_mode_v, wgpu::AddressMode::MirrorRepeat);
        assert!(d.lod_max_clamp > 0.0);
    }

    #[test]
    fn position_uv_attributes() {
        let attrs = vertex_attributes(&VertexLayout::POSITION_UV);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].format, wgpu::VertexFormat::Float32x3);
        assert_eq!(attrs[1].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(attrs[1].offset, 12);
        assert_eq!(attrs[1].shader_location, 1);
    }

    #[test]
    fn uniform_stride_alignment() {
        assert_eq!(align_up(192, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(0, 64), 0);
    }
}
