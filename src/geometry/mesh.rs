//! Procedural mesh builders
//!
//! Every builder uploads its vertex (and index) data into the
//! [`ResourceTable`] and returns a [`Mesh`] holding the IDs.

use super::aabb::{compute_aabb, Aabb};
use super::resources::{BufferId, ResourceTable, TextureId, VertexLayout, SLOT_POSITION};
use crate::error::{EngineError, Result};
use crate::rasterizer::Vec3;

/// How the vertex stream is assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Triangles,
    LineStrip,
}

/// Drawable geometry: buffer IDs plus draw parameters
///
/// Not `Clone`: each mesh owns its buffers until [`delete_mesh`].
#[derive(Debug)]
pub struct Mesh {
    /// Records for plain draws, indices for indexed draws
    pub vertex_count: usize,
    pub primitive: Primitive,
    pub vertex_buffer: BufferId,
    pub index_buffer: Option<BufferId>,
    pub texture: Option<TextureId>,
    pub aabb: Option<Aabb>,
}

impl Mesh {
    /// Positions of every record in the vertex buffer, in buffer order
    pub fn positions(&self, resources: &ResourceTable) -> Result<Vec<Vec3>> {
        let vb = resources
            .vertex_buffer(self.vertex_buffer)
            .ok_or_else(|| EngineError::UnknownResource(format!("vertex buffer {:?}", self.vertex_buffer)))?;
        Ok((0..vb.record_count())
            .filter_map(|i| vb.layout.fetch(&vb.data, i, SLOT_POSITION))
            .map(|p| Vec3::new(p[0], p[1], p[2]))
            .collect())
    }
}

/// Upload geometry, leaving nothing behind in the table on failure
fn upload(
    resources: &mut ResourceTable,
    creator: &str,
    layout: VertexLayout,
    vertices: &[f32],
    indices: Option<&[u32]>,
    texture: Option<TextureId>,
    primitive: Primitive,
) -> Result<Mesh> {
    let positions: Vec<Vec3> = vertices
        .chunks_exact(layout.floats_per_vertex())
        .map(|r| Vec3::new(r[0], r[1], r[2]))
        .collect();
    let aabb = compute_aabb(&positions)?;

    let vertex_buffer = resources.create_vertex_buffer(layout, vertices).map_err(|e| {
        log::error!("{}: {}", creator, e);
        e
    })?;

    let index_buffer = match indices {
        Some(indices) => match resources.create_index_buffer(indices) {
            Ok(id) => Some(id),
            Err(e) => {
                log::error!("{}: {}", creator, e);
                resources.release_buffer(vertex_buffer);
                return Err(e);
            }
        },
        None => None,
    };

    let vertex_count = indices.map_or(positions.len(), |i| i.len());
    log::debug!("{}: {} vertices", creator, vertex_count);

    Ok(Mesh {
        vertex_count,
        primitive,
        vertex_buffer,
        index_buffer,
        texture,
        aabb: Some(aabb),
    })
}

#[rustfmt::skip]
const TRIANGLE_VERTICES: [f32; 24] = [
    // position          normal           uv
    -0.5, -0.5, 0.0,     0.0, 0.0, 1.0,   0.0, 0.0,
     0.5, -0.5, 0.0,     0.0, 0.0, 1.0,   1.0, 0.0,
     0.0,  0.5, 0.0,     0.0, 0.0, 1.0,   0.5, 1.0,
];

#[rustfmt::skip]
const QUAD_VERTICES: [f32; 32] = [
    -0.5,  0.5, 0.0,     0.0, 0.0, 1.0,   0.0, 1.0, // top left
    -0.5, -0.5, 0.0,     0.0, 0.0, 1.0,   0.0, 0.0, // bottom left
     0.5, -0.5, 0.0,     0.0, 0.0, 1.0,   1.0, 0.0, // bottom right
     0.5,  0.5, 0.0,     0.0, 0.0, 1.0,   1.0, 1.0, // top right
];

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

#[rustfmt::skip]
const CUBE_VERTICES: [f32; 288] = [
    // front
    -0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 0.0,
     0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 0.0,
     0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 1.0,
     0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 1.0,
    -0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 1.0,
    -0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 0.0,
    // back
    -0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 0.0,
    -0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 1.0,
     0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 1.0,
     0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 1.0,
     0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 0.0,
    -0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 0.0,
    // left
    -0.5, -0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 0.0,
    -0.5, -0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 0.0,
    -0.5,  0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 1.0,
    -0.5,  0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 1.0,
    -0.5,  0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 1.0,
    -0.5, -0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 0.0,
    // right
     0.5, -0.5, -0.5,   1.0,  0.0,  0.0,   0.0, 0.0,
     0.5,  0.5, -0.5,   1.0,  0.0,  0.0,   0.0, 1.0,
     0.5,  0.5,  0.5,   1.0,  0.0,  0.0,   1.0, 1.0,
     0.5,  0.5,  0.5,   1.0,  0.0,  0.0,   1.0, 1.0,
     0.5, -0.5,  0.5,   1.0,  0.0,  0.0,   1.0, 0.0,
     0.5, -0.5, -0.5,   1.0,  0.0,  0.0,   0.0, 0.0,
    // bottom
    -0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   0.0, 1.0,
     0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   1.0, 1.0,
     0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   1.0, 0.0,
     0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   1.0, 0.0,
    -0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   0.0, 0.0,
    -0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   0.0, 1.0,
    // top
    -0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   0.0, 1.0,
    -0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   0.0, 0.0,
     0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   1.0, 0.0,
     0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   1.0, 0.0,
     0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   1.0, 1.0,
    -0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   0.0, 1.0,
];

#[rustfmt::skip]
const PYRAMID_VERTICES: [f32; 144] = [
    // base
    -0.5, -0.5,  0.5,   0.0, -1.0, 0.0,         0.0, 0.0,
    -0.5, -0.5, -0.5,   0.0, -1.0, 0.0,         0.0, 1.0,
     0.5, -0.5,  0.5,   0.0, -1.0, 0.0,         1.0, 0.0,
     0.5, -0.5,  0.5,   0.0, -1.0, 0.0,         1.0, 0.0,
    -0.5, -0.5, -0.5,   0.0, -1.0, 0.0,         0.0, 1.0,
     0.5, -0.5, -0.5,   0.0, -1.0, 0.0,         1.0, 1.0,
    // front
    -0.5, -0.5,  0.5,   0.0, 0.4472,  0.8944,   0.0, 0.0,
     0.5, -0.5,  0.5,   0.0, 0.4472,  0.8944,   1.0, 0.0,
     0.0,  0.5,  0.0,   0.0, 0.4472,  0.8944,   0.5, 1.0,
    // back
     0.5, -0.5, -0.5,   0.0, 0.4472, -0.8944,   0.0, 0.0,
    -0.5, -0.5, -0.5,   0.0, 0.4472, -0.8944,   1.0, 0.0,
     0.0,  0.5,  0.0,   0.0, 0.4472, -0.8944,   0.5, 1.0,
    // right
     0.5, -0.5,  0.5,   0.8944, 0.4472, 0.0,    0.0, 0.0,
     0.5, -0.5, -0.5,   0.8944, 0.4472, 0.0,    1.0, 0.0,
     0.0,  0.5,  0.0,   0.8944, 0.4472, 0.0,    0.5, 1.0,
    // left
    -0.5, -0.5, -0.5,  -0.8944, 0.4472, 0.0,    0.0, 0.0,
    -0.5, -0.5,  0.5,  -0.8944, 0.4472, 0.0,    1.0, 0.0,
     0.0,  0.5,  0.0,  -0.8944, 0.4472, 0.0,    0.5, 1.0,
];

/// Face (normal, right) pairs; `up = normal × right`
const CUBE_SPHERE_FACES: [(Vec3, Vec3); 6] = [
    (Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0)),   // front
    (Vec3::new(0.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 0.0)), // back
    (Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),   // up
    (Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)),  // down
    (Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0)),  // right
    (Vec3::new(-1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 1.0)),  // left
];

pub const CUBE_SPHERE_RADIUS: f32 = 0.5;

#[rustfmt::skip]
const SCREEN_QUAD_VERTICES: [f32; 20] = [
    // position          uv
    -1.0,  1.0, 0.0,     0.0, 1.0,
    -1.0, -1.0, 0.0,     0.0, 0.0,
     1.0, -1.0, 0.0,     1.0, 0.0,
     1.0,  1.0, 0.0,     1.0, 1.0,
];

pub fn create_triangle(resources: &mut ResourceTable, texture: Option<TextureId>) -> Result<Mesh> {
    upload(
        resources,
        "create_triangle",
        VertexLayout::POSITION_NORMAL_UV,
        &TRIANGLE_VERTICES,
        None,
        texture,
        Primitive::Triangles,
    )
}

/// Indexed unit quad on the XY plane
pub fn create_quad(resources: &mut ResourceTable, texture: Option<TextureId>) -> Result<Mesh> {
    upload(
        resources,
        "create_quad",
        VertexLayout::POSITION_NORMAL_UV,
        &QUAD_VERTICES,
        Some(&QUAD_INDICES),
        texture,
        Primitive::Triangles,
    )
}

pub fn create_cube(resources: &mut ResourceTable, texture: Option<TextureId>) -> Result<Mesh> {
    upload(
        resources,
        "create_cube",
        VertexLayout::POSITION_NORMAL_UV,
        &CUBE_VERTICES,
        None,
        texture,
        Primitive::Triangles,
    )
}

pub fn create_pyramid(resources: &mut ResourceTable, texture: Option<TextureId>) -> Result<Mesh> {
    upload(
        resources,
        "create_pyramid",
        VertexLayout::POSITION_NORMAL_UV,
        &PYRAMID_VERTICES,
        None,
        texture,
        Primitive::Triangles,
    )
}

/// Sphere of radius 0.5 built by projecting a subdivided cube
///
/// Each face is split into `resolution²` quads of two triangles each;
/// `resolution` below 1 is treated as 1.
pub fn create_cube_sphere(
    resources: &mut ResourceTable,
    resolution: u32,
    texture: Option<TextureId>,
) -> Result<Mesh> {
    let resolution = resolution.max(1) as usize;
    let floats = 6 * resolution * resolution * 6 * 8;

    let mut vertices = Vec::new();
    vertices.try_reserve_exact(floats).map_err(|e| {
        log::error!("create_cube_sphere: {}", e);
        EngineError::ResourceAllocation(format!("create_cube_sphere: {}", e))
    })?;

    let res = resolution as f32;
    for (normal, right) in CUBE_SPHERE_FACES {
        let up = normal.cross(right);
        let corner = |u: f32, v: f32| normal.scale(0.5) + right.scale(u - 0.5) + up.scale(v - 0.5);

        for y in 0..resolution {
            for x in 0..resolution {
                let u = x as f32 / res;
                let v = y as f32 / res;
                let u1 = (x + 1) as f32 / res;
                let v1 = (y + 1) as f32 / res;

                let quad = [(u, v), (u1, v), (u1, v1), (u, v), (u1, v1), (u, v1)];
                for (qu, qv) in quad {
                    let n = corner(qu, qv).normalize();
                    let p = n.scale(CUBE_SPHERE_RADIUS);
                    vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z, qu, qv]);
                }
            }
        }
    }

    upload(
        resources,
        "create_cube_sphere",
        VertexLayout::POSITION_NORMAL_UV,
        &vertices,
        None,
        texture,
        Primitive::Triangles,
    )
}

/// Filled disc on the XY plane, radius 0.5, indexed as a fan
pub fn create_circle(resources: &mut ResourceTable, texture: Option<TextureId>, edges: u32) -> Result<Mesh> {
    let edges = edges.max(3);
    let step = std::f32::consts::TAU / edges as f32;

    let mut vertices = vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.5, 0.5];
    for i in 0..edges {
        let (s, c) = (i as f32 * step).sin_cos();
        let (x, y) = (c * 0.5, s * 0.5);
        vertices.extend_from_slice(&[x, y, 0.0, 0.0, 0.0, 1.0, x + 0.5, y + 0.5]);
    }

    let indices: Vec<u32> = (0..edges)
        .flat_map(|i| [0, i + 1, (i + 1) % edges + 1])
        .collect();

    upload(
        resources,
        "create_circle",
        VertexLayout::POSITION_NORMAL_UV,
        &vertices,
        Some(&indices),
        texture,
        Primitive::Triangles,
    )
}

/// Open polyline through `points`, position-only records
pub fn create_line_strip(resources: &mut ResourceTable, points: &[Vec3]) -> Result<Mesh> {
    if points.len() < 2 {
        log::error!("create_line_strip: need at least 2 points, got {}", points.len());
        return Err(EngineError::InvalidArgument(format!(
            "line strip needs at least 2 points, got {}",
            points.len()
        )));
    }

    let vertices: Vec<f32> = points.iter().flat_map(|p| [p.x, p.y, p.z]).collect();
    upload(
        resources,
        "create_line_strip",
        VertexLayout::POSITION,
        &vertices,
        None,
        None,
        Primitive::LineStrip,
    )
}

/// Quad spanning all of NDC, used to composite the offscreen target
pub fn create_screen_quad(resources: &mut ResourceTable, texture: Option<TextureId>) -> Result<Mesh> {
    upload(
        resources,
        "create_screen_quad",
        VertexLayout::POSITION_UV,
        &SCREEN_QUAD_VERTICES,
        Some(&QUAD_INDICES),
        texture,
        Primitive::Triangles,
    )
}

/// Release the mesh's buffers; the texture stays registered
pub fn delete_mesh(resources: &mut ResourceTable, mesh: Mesh) {
    resources.release_buffer(mesh.vertex_buffer);
    if let Some(ib) = mesh.index_buffer {
        resources.release_buffer(ib);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::resources::SLOT_NORMAL;

    #[test]
    fn test_cube_sphere_vertex_count_and_radius() {
        let mut res = ResourceTable::new();
        for resolution in [1u32, 2, 5] {
            let mesh = create_cube_sphere(&mut res, resolution, None).unwrap();
            let r = resolution as usize;
            assert_eq!(mesh.vertex_count, 6 * r * r * 6);
            assert!(mesh.index_buffer.is_none());

            let vb = res.vertex_buffer(mesh.vertex_buffer).unwrap();
            for i in 0..vb.record_count() {
                let p = vb.layout.fetch(&vb.data, i, SLOT_POSITION).unwrap();
                let n = vb.layout.fetch(&vb.data, i, SLOT_NORMAL).unwrap();
                let p = Vec3::new(p[0], p[1], p[2]);
                let n = Vec3::new(n[0], n[1], n[2]);
                assert!((p.len() - 0.5).abs() < 1e-5);
                assert!((n.len() - 1.0).abs() < 1e-5);
                assert!((p.normalize() - n).len() < 1e-5);
            }
        }
    }

    #[test]
    fn test_cube_sphere_resolution_zero_clamps_to_one() {
        let mut res = ResourceTable::new();
        let mesh = create_cube_sphere(&mut res, 0, None).unwrap();
        assert_eq!(mesh.vertex_count, 36);
    }

    #[test]
    fn test_quad_is_indexed() {
        let mut res = ResourceTable::new();
        let mesh = create_quad(&mut res, None).unwrap();
        assert_eq!(mesh.vertex_count, 6);
        let ib = res.index_buffer(mesh.index_buffer.unwrap()).unwrap();
        assert_eq!(ib, &[0, 1, 2, 0, 2, 3]);
        assert_eq!(res.vertex_buffer(mesh.vertex_buffer).unwrap().record_count(), 4);
    }

    #[test]
    fn test_builder_aabbs_contain_their_vertices() {
        let mut res = ResourceTable::new();
        let meshes = [
            create_triangle(&mut res, None).unwrap(),
            create_quad(&mut res, None).unwrap(),
            create_cube(&mut res, None).unwrap(),
            create_pyramid(&mut res, None).unwrap(),
            create_circle(&mut res, None, 12).unwrap(),
            create_cube_sphere(&mut res, 3, None).unwrap(),
        ];
        for mesh in &meshes {
            let aabb = mesh.aabb.unwrap();
            assert!(aabb.min.x <= aabb.max.x && aabb.min.y <= aabb.max.y && aabb.min.z <= aabb.max.z);
            for p in mesh.positions(&res).unwrap() {
                assert!(aabb.contains(p));
            }
        }
        assert_eq!(meshes[2].vertex_count, 36);
        assert_eq!(meshes[3].vertex_count, 18);
    }

    #[test]
    fn test_circle_clamps_edges() {
        let mut res = ResourceTable::new();
        let mesh = create_circle(&mut res, None, 1).unwrap();
        assert_eq!(mesh.vertex_count, 9);
        let ib = res.index_buffer(mesh.index_buffer.unwrap()).unwrap();
        assert_eq!(ib, &[0, 1, 2, 0, 2, 3, 0, 3, 1]);
    }

    #[test]
    fn test_line_strip_needs_two_points() {
        let mut res = ResourceTable::new();
        let err = create_line_strip(&mut res, &[Vec3::ZERO]);
        assert!(matches!(err, Err(EngineError::InvalidArgument(_))));
        assert_eq!(res.live_resources(), 0);

        let mesh = create_line_strip(&mut res, &[Vec3::ZERO, Vec3::ONE, Vec3::UP]).unwrap();
        assert_eq!(mesh.primitive, Primitive::LineStrip);
        assert_eq!(mesh.vertex_count, 3);
    }

    #[test]
    fn test_failed_index_upload_leaves_no_buffers() {
        let mut res = ResourceTable::with_capacity_limit(1);
        let err = create_quad(&mut res, None);
        assert!(matches!(err, Err(EngineError::ResourceAllocation(_))));
        assert_eq!(res.live_resources(), 0);
    }

    #[test]
    fn test_delete_mesh_releases_buffers() {
        let mut res = ResourceTable::new();
        let mesh = create_screen_quad(&mut res, None).unwrap();
        assert_eq!(res.live_buffers(), 2);
        delete_mesh(&mut res, mesh);
        assert_eq!(res.live_buffers(), 0);
    }
}
