//! Mesh data model. A mesh is an ordered list of parts; each part has its
//! own vertex and triangle index lists. GPU upload happens on a flattened
//! form: one interleaved vertex buffer and one index buffer, with every
//! part's indices rebased by the vertices emitted before it.

use anyhow::Result;
use ash::vk;
use glam::{Vec2, Vec3};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub color: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2, color: Vec3) -> Self {
        Self {
            position,
            normal,
            uv,
            color,
            tangent: Vec3::ZERO,
            bitangent: Vec3::ZERO,
        }
    }
}

/// One interleaved vertex component. Everything is three floats except UV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexComponent {
    Position,
    Normal,
    Color,
    Uv,
    Tangent,
    Bitangent,
}

impl VertexComponent {
    pub fn float_count(self) -> u32 {
        match self {
            VertexComponent::Uv => 2,
            _ => 3,
        }
    }

    pub fn format(self) -> vk::Format {
        match self {
            VertexComponent::Uv => vk::Format::R32G32_SFLOAT,
            _ => vk::Format::R32G32B32_SFLOAT,
        }
    }
}

/// Ordered vertex components as a pipeline consumes them. Each sample picks
/// the layout its shaders expect and flattens models against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    components: Vec<VertexComponent>,
}

impl VertexLayout {
    pub fn new(components: &[VertexComponent]) -> Self {
        Self {
            components: components.to_vec(),
        }
    }

    pub fn components(&self) -> &[VertexComponent] {
        &self.components
    }

    /// Interleaved stride in bytes.
    pub fn stride(&self) -> u32 {
        self.components
            .iter()
            .map(|c| c.float_count() * std::mem::size_of::<f32>() as u32)
            .sum()
    }

    pub fn binding_description(&self) -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription::default()
            .binding(0)
            .stride(self.stride())
            .input_rate(vk::VertexInputRate::VERTEX)
    }

    /// One attribute per component, locations in declaration order.
    pub fn attribute_descriptions(&self) -> Vec<vk::VertexInputAttributeDescription> {
        let mut attributes = Vec::with_capacity(self.components.len());
        let mut offset = 0u32;

        for (location, component) in self.components.iter().enumerate() {
            attributes.push(
                vk::VertexInputAttributeDescription::default()
                    .binding(0)
                    .location(location as u32)
                    .format(component.format())
                    .offset(offset),
            );
            offset += component.float_count() * std::mem::size_of::<f32>() as u32;
        }

        attributes
    }

    fn write_vertex(&self, vertex: &Vertex, out: &mut Vec<f32>) {
        for component in &self.components {
            match component {
                VertexComponent::Position => {
                    out.extend_from_slice(&vertex.position.to_array())
                }
                VertexComponent::Normal => out.extend_from_slice(&vertex.normal.to_array()),
                VertexComponent::Color => out.extend_from_slice(&vertex.color.to_array()),
                VertexComponent::Uv => out.extend_from_slice(&vertex.uv.to_array()),
                VertexComponent::Tangent => out.extend_from_slice(&vertex.tangent.to_array()),
                VertexComponent::Bitangent => {
                    out.extend_from_slice(&vertex.bitangent.to_array())
                }
            }
        }
    }
}

/// One sub-mesh: a vertex list and a part-local triangle index list.
#[derive(Debug, Clone, Default)]
pub struct ModelPart {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl ModelPart {
    pub fn translated(mut self, offset: Vec3) -> Self {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
        self
    }
}

/// Axis-aligned bounds of a model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub parts: Vec<ModelPart>,
}

impl Model {
    pub fn from_parts(parts: Vec<ModelPart>) -> Self {
        Self { parts }
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.parts.iter().map(|p| p.indices.len()).sum()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut iter = self.parts.iter().flat_map(|p| p.vertices.iter());
        let first = iter.next()?;
        let mut bounds = Bounds {
            min: first.position,
            max: first.position,
        };
        for vertex in iter {
            bounds.min = bounds.min.min(vertex.position);
            bounds.max = bounds.max.max(vertex.position);
        }
        Some(bounds)
    }

    pub fn scale(&mut self, factor: f32) {
        for part in &mut self.parts {
            for vertex in &mut part.vertices {
                vertex.position *= factor;
            }
        }
    }

    /// Concatenate all parts into one interleaved vertex buffer and one
    /// index buffer. Each part's indices are rebased by the number of
    /// vertices emitted before it, so the combined buffers draw as a single
    /// `cmd_draw_indexed`.
    pub fn flatten(&self, layout: &VertexLayout) -> (Vec<f32>, Vec<u32>) {
        let floats_per_vertex = (layout.stride() / std::mem::size_of::<f32>() as u32) as usize;
        let mut vertex_data = Vec::with_capacity(self.vertex_count() * floats_per_vertex);
        let mut index_data = Vec::with_capacity(self.index_count());

        let mut index_base = 0u32;
        for part in &self.parts {
            for vertex in &part.vertices {
                layout.write_vertex(vertex, &mut vertex_data);
            }
            for &index in &part.indices {
                index_data.push(index_base + index);
            }
            index_base += part.vertices.len() as u32;
        }

        (vertex_data, index_data)
    }

    /// Load a Wavefront OBJ; each model in the file becomes one part.
    pub fn from_obj(path: &Path, scale: f32) -> Result<Self> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )?;

        let mut parts = Vec::with_capacity(models.len());

        for model in models {
            let mesh = &model.mesh;
            let mut vertices = Vec::with_capacity(mesh.positions.len() / 3);

            for i in 0..mesh.positions.len() / 3 {
                let position = Vec3::new(
                    mesh.positions[i * 3],
                    mesh.positions[i * 3 + 1],
                    mesh.positions[i * 3 + 2],
                ) * scale;

                let normal = if !mesh.normals.is_empty() {
                    Vec3::new(
                        mesh.normals[i * 3],
                        mesh.normals[i * 3 + 1],
                        mesh.normals[i * 3 + 2],
                    )
                } else {
                    Vec3::Y
                };

                let uv = if !mesh.texcoords.is_empty() {
                    Vec2::new(mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1])
                } else {
                    Vec2::ZERO
                };

                let color = if !mesh.vertex_color.is_empty() {
                    Vec3::new(
                        mesh.vertex_color[i * 3],
                        mesh.vertex_color[i * 3 + 1],
                        mesh.vertex_color[i * 3 + 2],
                    )
                } else {
                    Vec3::ONE
                };

                vertices.push(Vertex::new(position, normal, uv, color));
            }

            let mut part = ModelPart {
                vertices,
                indices: mesh.indices.clone(),
            };
            compute_tangents(&mut part);
            parts.push(part);
        }

        Ok(Self { parts })
    }

    /// Single uv-mapped quad in the XY plane, used to display the shadow map.
    pub fn quad() -> Self {
        let normal = Vec3::Z;
        let color = Vec3::ONE;
        let vertices = vec![
            Vertex::new(Vec3::new(1.0, 1.0, 0.0), normal, Vec2::new(1.0, 1.0), color),
            Vertex::new(Vec3::new(0.0, 1.0, 0.0), normal, Vec2::new(0.0, 1.0), color),
            Vertex::new(Vec3::new(0.0, 0.0, 0.0), normal, Vec2::new(0.0, 0.0), color),
            Vertex::new(Vec3::new(1.0, 0.0, 0.0), normal, Vec2::new(1.0, 0.0), color),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];

        Self::from_parts(vec![ModelPart { vertices, indices }])
    }

    /// Subdivided plane in the XZ plane centered on the origin, normals up,
    /// UVs covering [0,1]². Drawn as patches by the displacement sample.
    pub fn plane(size: f32, subdivisions: u32) -> Self {
        let cells = subdivisions.max(1);
        let verts_per_row = cells + 1;
        let mut vertices = Vec::with_capacity((verts_per_row * verts_per_row) as usize);
        let mut indices = Vec::with_capacity((cells * cells * 6) as usize);

        for row in 0..=cells {
            for col in 0..=cells {
                let u = col as f32 / cells as f32;
                let v = row as f32 / cells as f32;
                let position = Vec3::new((u - 0.5) * size, 0.0, (v - 0.5) * size);
                vertices.push(Vertex::new(position, Vec3::Y, Vec2::new(u, v), Vec3::ONE));
            }
        }

        for row in 0..cells {
            for col in 0..cells {
                let current = row * verts_per_row + col;
                let next_row = current + verts_per_row;

                indices.push(current);
                indices.push(next_row);
                indices.push(current + 1);

                indices.push(current + 1);
                indices.push(next_row);
                indices.push(next_row + 1);
            }
        }

        Self::from_parts(vec![ModelPart { vertices, indices }])
    }

    /// Axis-aligned cube centered on the origin.
    pub fn cube(half_extent: f32, color: Vec3) -> Self {
        let h = half_extent;
        let faces: [(Vec3, [Vec3; 4]); 6] = [
            // +Z
            (Vec3::Z, [
                Vec3::new(-h, -h, h),
                Vec3::new(h, -h, h),
                Vec3::new(h, h, h),
                Vec3::new(-h, h, h),
            ]),
            // -Z
            (Vec3::NEG_Z, [
                Vec3::new(h, -h, -h),
                Vec3::new(-h, -h, -h),
                Vec3::new(-h, h, -h),
                Vec3::new(h, h, -h),
            ]),
            // +Y
            (Vec3::Y, [
                Vec3::new(-h, h, h),
                Vec3::new(h, h, h),
                Vec3::new(h, h, -h),
                Vec3::new(-h, h, -h),
            ]),
            // -Y
            (Vec3::NEG_Y, [
                Vec3::new(-h, -h, -h),
                Vec3::new(h, -h, -h),
                Vec3::new(h, -h, h),
                Vec3::new(-h, -h, h),
            ]),
            // +X
            (Vec3::X, [
                Vec3::new(h, -h, h),
                Vec3::new(h, -h, -h),
                Vec3::new(h, h, -h),
                Vec3::new(h, h, h),
            ]),
            // -X
            (Vec3::NEG_X, [
                Vec3::new(-h, -h, -h),
                Vec3::new(-h, -h, h),
                Vec3::new(-h, h, h),
                Vec3::new(-h, h, -h),
            ]),
        ];

        let uvs = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face, (normal, corners)) in faces.iter().enumerate() {
            let base = (face * 4) as u32;
            for (corner, &position) in corners.iter().enumerate() {
                vertices.push(Vertex::new(position, *normal, uvs[corner], color));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::from_parts(vec![ModelPart { vertices, indices }])
    }

    /// Built-in shadow demo scene: a ground plane plus a few boxes. Every
    /// element is its own part, so drawing it exercises index rebasing.
    pub fn sample_scene() -> Self {
        let ground = Model::plane(24.0, 1)
            .parts
            .remove(0);

        let boxes = [
            (Vec3::new(-4.0, 1.0, 0.0), 1.0, Vec3::new(0.9, 0.4, 0.3)),
            (Vec3::new(0.5, 1.5, -3.0), 1.5, Vec3::new(0.3, 0.7, 0.9)),
            (Vec3::new(3.0, 0.8, 2.5), 0.8, Vec3::new(0.4, 0.85, 0.4)),
        ];

        let mut parts = vec![ground];
        for (offset, half_extent, color) in boxes {
            parts.push(Model::cube(half_extent, color).parts.remove(0).translated(offset));
        }

        Self::from_parts(parts)
    }
}

/// Accumulate per-triangle tangents and bitangents from UV gradients, then
/// normalize per vertex. Degenerate UV triangles contribute nothing.
pub fn compute_tangents(part: &mut ModelPart) {
    for triangle in part.indices.chunks_exact(3) {
        let (i0, i1, i2) = (
            triangle[0] as usize,
            triangle[1] as usize,
            triangle[2] as usize,
        );

        let edge1 = part.vertices[i1].position - part.vertices[i0].position;
        let edge2 = part.vertices[i2].position - part.vertices[i0].position;
        let duv1 = part.vertices[i1].uv - part.vertices[i0].uv;
        let duv2 = part.vertices[i2].uv - part.vertices[i0].uv;

        let det = duv1.x * duv2.y - duv2.x * duv1.y;
        if det.abs() < f32::EPSILON {
            continue;
        }
        let r = 1.0 / det;

        let tangent = (edge1 * duv2.y - edge2 * duv1.y) * r;
        let bitangent = (edge2 * duv1.x - edge1 * duv2.x) * r;

        for &index in &[i0, i1, i2] {
            part.vertices[index].tangent += tangent;
            part.vertices[index].bitangent += bitangent;
        }
    }

    for vertex in &mut part.vertices {
        vertex.tangent = vertex.tangent.normalize_or_zero();
        vertex.bitangent = vertex.bitangent.normalize_or_zero();
    }
}
