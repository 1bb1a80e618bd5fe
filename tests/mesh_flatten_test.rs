/// Tests for the mesh data model: interleaved flattening, index rebasing
/// and bounds computation must match what the vertex shaders expect.

use glam::Vec3;
use vulkan_samples::mesh::{Model, VertexComponent, VertexLayout};

fn full_layout() -> VertexLayout {
    VertexLayout::new(&[
        VertexComponent::Position,
        VertexComponent::Uv,
        VertexComponent::Color,
        VertexComponent::Normal,
    ])
}

#[test]
fn test_layout_stride_and_offsets() {
    let layout = full_layout();

    // 3 + 2 + 3 + 3 floats
    assert_eq!(layout.stride(), 11 * 4);

    let attributes = layout.attribute_descriptions();
    assert_eq!(attributes.len(), 4);

    // Locations are sequential and offsets accumulate component sizes
    for (i, attr) in attributes.iter().enumerate() {
        assert_eq!(attr.location, i as u32);
        assert_eq!(attr.binding, 0);
    }
    assert_eq!(attributes[0].offset, 0);
    assert_eq!(attributes[1].offset, 12); // after position
    assert_eq!(attributes[2].offset, 20); // after uv
    assert_eq!(attributes[3].offset, 32); // after color

    let binding = layout.binding_description();
    assert_eq!(binding.stride, layout.stride());
}

#[test]
fn test_flatten_interleaves_per_layout() {
    let layout = VertexLayout::new(&[VertexComponent::Position, VertexComponent::Uv]);
    let quad = Model::quad();
    let (vertices, indices) = quad.flatten(&layout);

    let floats_per_vertex = 5;
    assert_eq!(vertices.len(), quad.vertex_count() * floats_per_vertex);
    assert_eq!(indices.len(), quad.index_count());

    // First quad vertex is (1, 1, 0) with uv (1, 1)
    assert_eq!(&vertices[0..3], &[1.0, 1.0, 0.0]);
    assert_eq!(&vertices[3..5], &[1.0, 1.0]);

    println!(
        "Flattened quad: {} floats, {} indices",
        vertices.len(),
        indices.len()
    );
}

#[test]
fn test_flatten_rebases_indices_across_parts() {
    // Two cubes in separate parts; the second part's indices must be offset
    // by the first part's vertex count.
    let mut model = Model::cube(1.0, Vec3::ONE);
    let second = Model::cube(1.0, Vec3::ONE).parts.remove(0);
    let first_vertex_count = model.vertex_count() as u32;
    model.parts.push(second);

    let layout = VertexLayout::new(&[VertexComponent::Position]);
    let (_, indices) = model.flatten(&layout);

    let part_index_count = model.parts[0].indices.len();
    for (i, &index) in indices.iter().enumerate() {
        if i < part_index_count {
            assert!(index < first_vertex_count);
        } else {
            assert!(index >= first_vertex_count);
        }
    }

    // Every vertex must be addressable
    let max_index = indices.iter().copied().max().unwrap();
    assert_eq!(max_index as usize, model.vertex_count() - 1);
}

#[test]
fn test_bounds_and_scale() {
    let cube = Model::cube(2.0, Vec3::ONE);
    let bounds = cube.bounds().unwrap();

    assert_eq!(bounds.min, Vec3::splat(-2.0));
    assert_eq!(bounds.max, Vec3::splat(2.0));
    assert_eq!(bounds.size(), Vec3::splat(4.0));

    let mut scaled = Model::cube(2.0, Vec3::ONE);
    scaled.scale(0.5);
    assert_eq!(scaled.bounds().unwrap().size(), Vec3::splat(2.0));
}

#[test]
fn test_plane_subdivision_counts() {
    // n subdivisions -> (n+1)^2 vertices, n^2 * 2 triangles
    let plane = Model::plane(10.0, 4);
    assert_eq!(plane.vertex_count(), 25);
    assert_eq!(plane.index_count(), 4 * 4 * 2 * 3);

    // All normals point up, all UVs inside [0, 1]
    for vertex in &plane.parts[0].vertices {
        assert_eq!(vertex.normal, Vec3::Y);
        assert!((0.0..=1.0).contains(&vertex.uv.x));
        assert!((0.0..=1.0).contains(&vertex.uv.y));
    }
}

#[test]
fn test_sample_scene_parts() {
    let scene = Model::sample_scene();

    // Ground plane plus three cubes
    assert_eq!(scene.parts.len(), 4);
    assert!(scene.index_count() > 0);

    // Ground extends further than any cube
    let bounds = scene.bounds().unwrap();
    println!("Scene bounds: {:?} -> {:?}", bounds.min, bounds.max);
    assert!(bounds.size().x >= 24.0);
    assert!(bounds.size().z >= 24.0);
}

#[test]
fn test_tangents_orthogonal_to_normals() {
    use vulkan_samples::mesh::compute_tangents;

    let mut plane = Model::plane(4.0, 2);
    compute_tangents(&mut plane.parts[0]);

    let mut nonzero = 0;
    for vertex in &plane.parts[0].vertices {
        if vertex.tangent.length_squared() > 0.0 {
            nonzero += 1;
        }
        let dot = vertex.tangent.dot(vertex.normal);
        assert!(
            dot.abs() < 1e-4,
            "tangent {:?} not orthogonal to normal {:?}",
            vertex.tangent,
            vertex.normal
        );
    }
    assert!(nonzero > 0, "expected tangents from the UV-mapped plane");
}
