//! Fixed-function state presets shared across passes. Effects can only be
//! constructed from a `&RenderStates`, which in turn only exists once the
//! device does, so the render-states-before-effects ordering is enforced by
//! construction rather than checked at call time.

use super::{SCENE_DEPTH_FORMAT, SHADOW_DEPTH_FORMAT};

pub struct RenderStates {
    pub point_clamp: wgpu::Sampler,
    pub linear_clamp: wgpu::Sampler,
    pub linear_wrap: wgpu::Sampler,
    pub anisotropic_clamp: wgpu::Sampler,
    pub shadow_compare: wgpu::Sampler,
}

impl RenderStates {
    pub fn new(device: &wgpu::Device) -> Self {
        let clamp = |label, mag, min, aniso| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: mag,
                min_filter: min,
                mipmap_filter: wgpu::FilterMode::Nearest,
                anisotropy_clamp: aniso,
                ..Default::default()
            })
        };
        let point_clamp = clamp("Point Clamp Sampler", wgpu::FilterMode::Nearest, wgpu::FilterMode::Nearest, 1);
        let linear_clamp = clamp("Linear Clamp Sampler", wgpu::FilterMode::Linear, wgpu::FilterMode::Linear, 1);
        let anisotropic_clamp =
            clamp("Anisotropic Clamp Sampler", wgpu::FilterMode::Linear, wgpu::FilterMode::Linear, 8);
        let linear_wrap = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Linear Wrap Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let shadow_compare = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Compare Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        Self { point_clamp, linear_clamp, linear_wrap, anisotropic_clamp, shadow_compare }
    }
}

/// Scene depth testing under the reversed-depth convention.
pub fn depth_greater_equal() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: SCENE_DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::GreaterEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Shadow-map rasterization: conventional depth, cleared to 1.
pub fn depth_less_equal_shadow() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: SHADOW_DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Full-screen stencil mask write: no depth test, replace stencil with the
/// pass reference wherever the fragment survives.
pub fn stencil_write() -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Always,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Replace,
    };
    wgpu::DepthStencilState {
        format: SCENE_DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState { front: face, back: face, read_mask: 0xff, write_mask: 0xff },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Full-screen draw gated on an equal stencil value; depth untouched.
pub fn stencil_equal() -> wgpu::DepthStencilState {
    let face = wgpu::StencilFaceState {
        compare: wgpu::CompareFunction::Equal,
        fail_op: wgpu::StencilOperation::Keep,
        depth_fail_op: wgpu::StencilOperation::Keep,
        pass_op: wgpu::StencilOperation::Keep,
    };
    wgpu::DepthStencilState {
        format: SCENE_DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::Always,
        stencil: wgpu::StencilState { front: face, back: face, read_mask: 0xff, write_mask: 0 },
        bias: wgpu::DepthBiasState::default(),
    }
}

pub fn additive_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_depth_state_uses_greater_equal() {
        let state = depth_greater_equal();
        assert_eq!(state.depth_compare, wgpu::CompareFunction::GreaterEqual);
        assert!(state.depth_write_enabled);
    }

    #[test]
    fn stencil_states_pair_write_and_test() {
        let write = stencil_write();
        assert_eq!(write.stencil.front.pass_op, wgpu::StencilOperation::Replace);
        assert_eq!(write.stencil.write_mask, 0xff);
        let test = stencil_equal();
        assert_eq!(test.stencil.front.compare, wgpu::CompareFunction::Equal);
        assert_eq!(test.stencil.write_mask, 0);
    }
}
