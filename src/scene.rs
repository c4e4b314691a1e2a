use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wgpu::util::DeviceExt;

use crate::config::LightingConfig;

/// Axis-aligned bounding box in whichever space the caller keeps it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// AABB of this box's corners after `transform`.
    pub fn transformed(&self, transform: Mat4) -> Self {
        Self::from_points(self.corners().iter().map(|&c| transform.transform_point3(c)))
    }

    pub fn union(&self, other: &Aabb) -> Self {
        Self { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: Vec3, normal: Vec3, uv: [f32; 2]) -> Self {
        Self { position: position.to_array(), normal: normal.to_array(), uv }
    }

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                },
                wgpu::VertexAttribute {
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 12,
                },
                wgpu::VertexAttribute {
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 24,
                },
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub bounds: Aabb,
}

impl MeshData {
    /// Unit-ish box centered at the origin.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
            (Vec3::Y, Vec3::NEG_Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::Z, Vec3::X),
            (Vec3::Z, Vec3::Y, Vec3::NEG_X),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, up, right) in faces {
            let base = vertices.len() as u32;
            let center = normal * h;
            let u = right * h;
            let v = up * h;
            vertices.push(MeshVertex::new(center - u - v, normal, [0.0, 1.0]));
            vertices.push(MeshVertex::new(center + u - v, normal, [1.0, 1.0]));
            vertices.push(MeshVertex::new(center + u + v, normal, [1.0, 0.0]));
            vertices.push(MeshVertex::new(center - u + v, normal, [0.0, 0.0]));
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        let bounds = Aabb::new(-h, h);
        Self { vertices, indices, bounds }
    }

    /// Flat ground plane in the XZ plane, `extent` units from the origin.
    pub fn plane(extent: f32) -> Self {
        let vertices = vec![
            MeshVertex::new(Vec3::new(-extent, 0.0, -extent), Vec3::Y, [0.0, 0.0]),
            MeshVertex::new(Vec3::new(extent, 0.0, -extent), Vec3::Y, [1.0, 0.0]),
            MeshVertex::new(Vec3::new(extent, 0.0, extent), Vec3::Y, [1.0, 1.0]),
            MeshVertex::new(Vec3::new(-extent, 0.0, extent), Vec3::Y, [0.0, 1.0]),
        ];
        let indices = vec![0, 2, 1, 0, 3, 2];
        let bounds = Aabb::new(Vec3::new(-extent, -0.01, -extent), Vec3::new(extent, 0.01, extent));
        Self { vertices, indices, bounds }
    }
}

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub bounds: Aabb,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, data: &MeshData, label: &str) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertex_buffer, index_buffer, index_count: data.indices.len() as u32, bounds: data.bounds }
    }
}

/// One object to render this frame: mesh, transform and material tint.
#[derive(Clone)]
pub struct MeshDraw<'a> {
    pub mesh: &'a GpuMesh,
    pub model: Mat4,
    pub color: Vec3,
    pub casts_shadows: bool,
}

impl MeshDraw<'_> {
    pub fn world_bounds(&self) -> Aabb {
        self.mesh.bounds.transformed(self.model)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub radius: f32,
    /// Phase offset for the idle animation.
    pub phase: f32,
}

struct SceneObject {
    mesh_index: usize,
    model: Mat4,
    color: Vec3,
}

/// Procedural demo content: a ground plane, a field of boxes and a ring of
/// animated point lights. Owns the GPU meshes; hands out per-frame draw
/// lists.
pub struct DemoScene {
    meshes: Vec<GpuMesh>,
    objects: Vec<SceneObject>,
    lights: Vec<PointLight>,
    bounds: Aabb,
}

const GROUND_EXTENT: f32 = 60.0;
const PILLAR_GRID: i32 = 6;

impl DemoScene {
    pub fn build(device: &wgpu::Device, lighting: &LightingConfig) -> Self {
        let ground = GpuMesh::upload(device, &MeshData::plane(GROUND_EXTENT), "Ground Mesh");
        let pillar = GpuMesh::upload(device, &MeshData::cuboid(Vec3::new(1.0, 4.0, 1.0)), "Pillar Mesh");
        let block = GpuMesh::upload(device, &MeshData::cuboid(Vec3::splat(1.5)), "Block Mesh");
        let meshes = vec![ground, pillar, block];

        let mut objects = vec![SceneObject {
            mesh_index: 0,
            model: Mat4::IDENTITY,
            color: Vec3::new(0.55, 0.55, 0.58),
        }];
        let mut rng = StdRng::seed_from_u64(lighting.seed);
        for gx in -PILLAR_GRID..=PILLAR_GRID {
            for gz in -PILLAR_GRID..=PILLAR_GRID {
                if (gx + gz) % 2 != 0 {
                    continue;
                }
                let jitter: f32 = rng.gen_range(-1.2..1.2);
                let x = gx as f32 * 8.0 + jitter;
                let z = gz as f32 * 8.0 - jitter;
                let tall = rng.gen_bool(0.35);
                let (mesh_index, y) = if tall { (1, 4.0) } else { (2, 1.5) };
                objects.push(SceneObject {
                    mesh_index,
                    model: Mat4::from_translation(Vec3::new(x, y, z)),
                    color: Vec3::new(
                        rng.gen_range(0.3..0.9),
                        rng.gen_range(0.3..0.9),
                        rng.gen_range(0.3..0.9),
                    ),
                });
            }
        }

        let mut lights = Vec::with_capacity(lighting.point_light_count as usize);
        for _ in 0..lighting.point_light_count {
            lights.push(PointLight {
                position: Vec3::new(
                    rng.gen_range(-GROUND_EXTENT..GROUND_EXTENT),
                    rng.gen_range(1.0..12.0),
                    rng.gen_range(-GROUND_EXTENT..GROUND_EXTENT),
                ),
                color: Vec3::new(
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.2..1.0),
                    rng.gen_range(0.2..1.0),
                ),
                radius: lighting.light_radius * rng.gen_range(0.5..1.5),
                phase: rng.gen_range(0.0..std::f32::consts::TAU),
            });
        }

        let mut bounds = meshes[0].bounds;
        for object in &objects {
            bounds = bounds.union(&meshes[object.mesh_index].bounds.transformed(object.model));
        }

        Self { meshes, objects, lights, bounds }
    }

    /// World-space bounds of everything that can cast or receive shadows.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn draws(&self) -> Vec<MeshDraw<'_>> {
        self.objects
            .iter()
            .map(|object| MeshDraw {
                mesh: &self.meshes[object.mesh_index],
                model: object.model,
                color: object.color,
                casts_shadows: true,
            })
            .collect()
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// Drifts the point lights on slow vertical orbits.
    pub fn animate_lights(&mut self, elapsed_seconds: f32) {
        for light in &mut self.lights {
            let t = elapsed_seconds * 0.4 + light.phase;
            light.position.y = 1.0 + (t.sin() * 0.5 + 0.5) * 11.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aabb_transform_keeps_containment() {
        let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let moved = aabb.transformed(Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        assert_eq!(moved.min.x, 4.0);
        assert_eq!(moved.max.x, 6.0);
        assert!(moved.intersects(&Aabb::new(Vec3::new(5.5, -0.5, -0.5), Vec3::new(7.0, 0.5, 0.5))));
        assert!(!moved.intersects(&aabb.transformed(Mat4::from_translation(Vec3::new(-5.0, 0.0, 0.0)))));
    }

    #[test]
    fn cuboid_mesh_is_closed() {
        let mesh = MeshData::cuboid(Vec3::ONE);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert_eq!(mesh.bounds, Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0)));
    }
}
