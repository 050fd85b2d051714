//! Per-frame render orchestration
//!
//! Frame order is fixed: [`RenderPipeline::begin_frame`] binds and clears
//! the offscreen target, [`RenderPipeline::begin_3d`] starts the lit scene
//! pass, [`RenderPipeline::begin_2d`] the overlay pass, and
//! [`RenderPipeline::end_frame`] composites the target onto the display.

use super::display::DisplaySurface;
use super::shader::{
    point_light_field, ShaderKind, ShaderRegistry, UniformSink, UniformStore, ALPHA, FILL_COLOR, MODEL,
    NORMAL_MATRIX, NUM_POINT_LIGHTS, PROJECTION, RENDER_RESOLUTION, TILE_FACTOR, USE_TEXTURE, VIEW,
};
use super::snap::{select_tex_mapping, snap_clip_position};
use crate::error::{EngineError, Result};
use crate::geometry::{
    create_screen_quad, delete_mesh, Mesh, Primitive, ResourceTable, VertexBuffer, SLOT_NORMAL, SLOT_POSITION,
    SLOT_UV,
};
use crate::rasterizer::{
    rasterize_triangle, Color, FragmentParams, Framebuffer, Mat3, Mat4, ScreenVertex, TexMapping, Texture, Vec2,
    Vec3, Vec4,
};
use crate::scene::{attenuation, normal_matrix, update_lighting, Camera, GameObject, PointLight, ProjectionKind, MAX_POINT_LIGHTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Idle,
    Offscreen,
    Scene3d,
    Overlay2d,
}

impl Pass {
    fn name(self) -> &'static str {
        match self {
            Pass::Idle => "idle",
            Pass::Offscreen => "offscreen",
            Pass::Scene3d => "3d",
            Pass::Overlay2d => "2d",
        }
    }
}

/// Counters for the frame in progress (reset by `begin_frame`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub triangles: usize,
    pub affine_triangles: usize,
    pub perspective_triangles: usize,
    /// Triangles entirely outside the near/far planes
    pub culled_triangles: usize,
    pub line_segments: usize,
    pub fragments: usize,
}

/// Vertex after the vertex stage, before clipping
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    clip: Vec4,
    uv: Vec2,
    light: Vec3,
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            clip: self.clip.lerp(other.clip, t),
            uv: Vec2::new(
                self.uv.x + (other.uv.x - self.uv.x) * t,
                self.uv.y + (other.uv.y - self.uv.y) * t,
            ),
            light: self.light + (other.light - self.light).scale(t),
        }
    }
}

fn near_distance(v: Vec4) -> f32 {
    v.z + v.w
}

fn far_distance(v: Vec4) -> f32 {
    v.w - v.z
}

/// Signed distances to the near and far clip planes
const CLIP_PLANES: [fn(Vec4) -> f32; 2] = [near_distance, far_distance];

/// Sutherland-Hodgman against the near and far planes
fn clip_polygon(tri: [ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut poly = tri.to_vec();
    for dist in CLIP_PLANES {
        if poly.is_empty() {
            break;
        }
        let mut out = Vec::with_capacity(poly.len() + 1);
        for (i, cur) in poly.iter().enumerate() {
            let next = &poly[(i + 1) % poly.len()];
            let (dc, dn) = (dist(cur.clip), dist(next.clip));
            if dc >= 0.0 {
                out.push(*cur);
            }
            if (dc >= 0.0) != (dn >= 0.0) {
                out.push(cur.lerp(next, dc / (dc - dn)));
            }
        }
        poly = out;
    }
    poly
}

fn clip_segment(mut a: ClipVertex, mut b: ClipVertex) -> Option<(ClipVertex, ClipVertex)> {
    for dist in CLIP_PLANES {
        let (da, db) = (dist(a.clip), dist(b.clip));
        match (da >= 0.0, db >= 0.0) {
            (true, true) => {}
            (false, false) => return None,
            (true, false) => b = a.lerp(&b, da / (da - db)),
            (false, true) => a = a.lerp(&b, da / (da - db)),
        }
    }
    Some((a, b))
}

fn to_screen(v: &ClipVertex, width: usize, height: usize) -> ScreenVertex {
    let inv_w = 1.0 / v.clip.w;
    let ndc = v.clip.xyz().scale(inv_w);
    ScreenVertex {
        pos: Vec3::new(
            (ndc.x + 1.0) * 0.5 * width as f32,
            (1.0 - ndc.y) * 0.5 * height as f32,
            ndc.z * 0.5 + 0.5,
        ),
        inv_w,
        uv: v.uv,
        light: v.light,
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LightUniform {
    position: Vec3,
    color: Vec3,
    linear: f32,
    quadratic: f32,
    ambient: f32,
}

fn read_lights(store: &UniformStore) -> Vec<LightUniform> {
    let count = store.int(NUM_POINT_LIGHTS).unwrap_or(0).clamp(0, MAX_POINT_LIGHTS as i32) as usize;
    (0..count)
        .map(|i| LightUniform {
            position: store.vec3(&point_light_field(i, "position")).unwrap_or_default(),
            color: store.vec3(&point_light_field(i, "color")).unwrap_or_default(),
            linear: store.float(&point_light_field(i, "linear")).unwrap_or_default(),
            quadratic: store.float(&point_light_field(i, "quadratic")).unwrap_or_default(),
            ambient: store.float(&point_light_field(i, "ambient")).unwrap_or_default(),
        })
        .collect()
}

/// Sum of attenuated ambient + diffuse terms over all lights
fn gouraud(world: Vec3, normal: Vec3, lights: &[LightUniform]) -> Vec3 {
    lights.iter().fold(Vec3::ZERO, |acc, light| {
        let to_light = light.position - world;
        let att = attenuation(light.linear, light.quadratic, to_light.len());
        let diffuse = normal.dot(to_light.normalize()).max(0.0);
        acc + light.color.scale(light.ambient * att + diffuse * att)
    })
}

/// Uniform snapshot the vertex and fragment stages read
struct ProgramState {
    model: Mat4,
    view: Mat4,
    projection: Mat4,
    normal_matrix: Mat3,
    resolution: Vec2,
    tile_factor: Vec2,
    fill_color: Vec3,
    use_texture: bool,
    alpha: f32,
    lights: Vec<LightUniform>,
}

impl ProgramState {
    fn read(store: &UniformStore, with_lights: bool) -> Self {
        Self {
            model: store.mat4(MODEL).unwrap_or_default(),
            view: store.mat4(VIEW).unwrap_or_default(),
            projection: store.mat4(PROJECTION).unwrap_or_default(),
            normal_matrix: store.mat3(NORMAL_MATRIX).unwrap_or_default(),
            resolution: store.vec2(RENDER_RESOLUTION).unwrap_or(Vec2::ONE),
            tile_factor: store.vec2(TILE_FACTOR).unwrap_or(Vec2::ONE),
            fill_color: store.vec3(FILL_COLOR).unwrap_or(Vec3::ONE),
            use_texture: store.bool(USE_TEXTURE).unwrap_or(false),
            alpha: store.float(ALPHA).unwrap_or(1.0),
            lights: if with_lights { read_lights(store) } else { Vec::new() },
        }
    }

    fn fragment<'a>(&self, texture: Option<&'a Texture>, mapping: TexMapping, depth_test: bool) -> FragmentParams<'a> {
        FragmentParams {
            texture: if self.use_texture { texture } else { None },
            tile_factor: self.tile_factor,
            fill_color: self.fill_color,
            alpha: self.alpha,
            mapping,
            depth_test,
        }
    }
}

fn fetch3(vb: &VertexBuffer, index: usize, slot: u32) -> Vec3 {
    vb.layout
        .fetch(&vb.data, index, slot)
        .map_or(Vec3::ZERO, |p| Vec3::new(p[0], p[1], p[2]))
}

fn fetch_uv(vb: &VertexBuffer, index: usize) -> Vec2 {
    vb.layout
        .fetch(&vb.data, index, SLOT_UV)
        .map_or(Vec2::default(), |p| Vec2::new(p[0], p[1]))
}

/// Resolved buffers of a mesh
struct MeshData<'a> {
    vb: &'a VertexBuffer,
    /// Vertex order for assembly (index buffer or sequential)
    order: Vec<usize>,
    texture: Option<&'a Texture>,
}

fn resolve<'a>(resources: &'a ResourceTable, mesh: &Mesh) -> Result<MeshData<'a>> {
    let vb = resources
        .vertex_buffer(mesh.vertex_buffer)
        .ok_or_else(|| EngineError::UnknownResource(format!("vertex buffer {:?}", mesh.vertex_buffer)))?;
    let records = vb.record_count();

    let order: Vec<usize> = match mesh.index_buffer {
        Some(id) => {
            let indices = resources
                .index_buffer(id)
                .ok_or_else(|| EngineError::UnknownResource(format!("index buffer {:?}", id)))?;
            indices.iter().take(mesh.vertex_count).map(|i| *i as usize).collect()
        }
        None => (0..mesh.vertex_count.min(records)).collect(),
    };
    if let Some(bad) = order.iter().find(|i| **i >= records) {
        return Err(EngineError::InvalidArgument(format!(
            "index {} out of range for {} vertex records",
            bad, records
        )));
    }

    let texture = match mesh.texture {
        Some(id) => Some(
            resources
                .texture(id)
                .ok_or_else(|| EngineError::UnknownResource(format!("texture {:?}", id)))?,
        ),
        None => None,
    };

    Ok(MeshData { vb, order, texture })
}

/// Clip, project and fill one triangle
fn fill_triangle(
    fb: &mut Framebuffer,
    tri: [ClipVertex; 3],
    params: &FragmentParams,
    stats: &mut FrameStats,
) {
    let poly = clip_polygon(tri);
    if poly.len() < 3 {
        stats.culled_triangles += 1;
        return;
    }
    let screen: Vec<ScreenVertex> = poly.iter().map(|v| to_screen(v, fb.width, fb.height)).collect();
    for i in 1..screen.len() - 1 {
        stats.fragments += rasterize_triangle(fb, &[screen[0], screen[i], screen[i + 1]], params);
    }
}

pub struct RenderPipeline {
    target: Framebuffer,
    clear_color: Color,
    shaders: ShaderRegistry,
    screen_quad: Mesh,
    pass: Pass,
    depth_test: bool,
    view: Mat4,
    projection: Mat4,
    stats: FrameStats,
}

impl RenderPipeline {
    /// Create the offscreen target at the internal `resolution`
    ///
    /// Any failure here is a [`EngineError::RenderTarget`].
    pub fn new(resources: &mut ResourceTable, resolution: (usize, usize), clear_color: Color) -> Result<Self> {
        let (w, h) = resolution;
        let target = Framebuffer::new(w, h).map_err(|e| {
            log::error!("offscreen target: {}", e);
            e
        })?;
        let screen_quad = create_screen_quad(resources, None)
            .map_err(|e| EngineError::RenderTarget(format!("screen quad: {}", e)))?;
        log::info!("offscreen target ready at {}x{}", w, h);

        Ok(Self {
            target,
            clear_color,
            shaders: ShaderRegistry::new(),
            screen_quad,
            pass: Pass::Idle,
            depth_test: false,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            stats: FrameStats::default(),
        })
    }

    /// Release the pipeline's own resources
    pub fn destroy(self, resources: &mut ResourceTable) {
        delete_mesh(resources, self.screen_quad);
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.target.width, self.target.height)
    }

    pub fn target(&self) -> &Framebuffer {
        &self.target
    }

    pub fn shaders(&self) -> &ShaderRegistry {
        &self.shaders
    }

    /// Uniform access for per-draw overrides such as `tileFactor` or `alpha`
    pub fn shaders_mut(&mut self) -> &mut ShaderRegistry {
        &mut self.shaders
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    fn expect_pass(&self, pass: Pass, call: &'static str) -> Result<()> {
        if self.pass != pass {
            log::error!("{} called during the {} pass", call, self.pass.name());
            return Err(EngineError::InvalidPass { call, pass: self.pass.name() });
        }
        Ok(())
    }

    /// Make `kind` current and reset its shared uniforms
    pub fn use_program(&mut self, kind: ShaderKind) {
        let (w, h) = self.resolution();
        self.shaders.use_program(kind);
        self.shaders.set_vec2(TILE_FACTOR, Vec2::ONE);
        self.shaders.set_vec2(RENDER_RESOLUTION, Vec2::new(w as f32, h as f32));
        self.shaders.set_vec3(FILL_COLOR, Vec3::ONE);
        self.shaders.set_bool(USE_TEXTURE, true);
        self.shaders.set_float(ALPHA, 1.0);
        match kind {
            ShaderKind::ThreeD | ShaderKind::Unlit | ShaderKind::TwoD => {
                self.shaders.set_mat4(VIEW, self.view);
                self.shaders.set_mat4(PROJECTION, self.projection);
            }
            ShaderKind::Screen => {}
        }
    }

    pub fn begin_frame(&mut self) -> Result<()> {
        self.expect_pass(Pass::Idle, "begin_frame")?;
        self.target.clear(self.clear_color);
        self.stats = FrameStats::default();
        self.pass = Pass::Offscreen;
        Ok(())
    }

    /// Start the lit scene pass with the camera's perspective projection
    pub fn begin_3d(&mut self, camera: Option<&mut Camera>, lights: &[PointLight]) -> Result<()> {
        self.expect_pass(Pass::Offscreen, "begin_3d")?;
        match camera {
            Some(cam) => {
                cam.set_projection(cam.fov, ProjectionKind::Perspective);
                self.view = cam.view;
                self.projection = cam.perspective;
            }
            None => log::error!("begin_3d: no active camera, reusing last matrices"),
        }
        self.depth_test = true;
        self.use_program(ShaderKind::ThreeD);
        update_lighting(&mut self.shaders, lights);
        self.pass = Pass::Scene3d;
        Ok(())
    }

    /// Draw a mesh in the scene pass
    ///
    /// Triangle meshes use the lit program, line strips the unlit one.
    /// Switching programs resets their shared uniforms.
    pub fn draw_3d(&mut self, resources: &ResourceTable, mesh: &Mesh, object: &GameObject) -> Result<()> {
        self.expect_pass(Pass::Scene3d, "draw_3d")?;
        let kind = match mesh.primitive {
            Primitive::Triangles => ShaderKind::ThreeD,
            Primitive::LineStrip => ShaderKind::Unlit,
        };
        if self.shaders.current() != kind {
            self.use_program(kind);
        }

        self.upload_object(object.model_matrix(), object, mesh);
        let data = resolve(resources, mesh)?;
        let state = ProgramState::read(self.shaders.current_uniforms(), kind == ShaderKind::ThreeD);

        match kind {
            ShaderKind::ThreeD => self.draw_lit(&data, &state),
            _ => self.draw_lines(&data, &state),
        }
        Ok(())
    }

    fn upload_object(&mut self, model: Mat4, object: &GameObject, mesh: &Mesh) {
        self.shaders.set_mat4(MODEL, model);
        self.shaders.set_mat3(NORMAL_MATRIX, normal_matrix(&model));
        self.shaders.set_vec3(FILL_COLOR, object.color);
        self.shaders.set_bool(USE_TEXTURE, mesh.texture.is_some());
    }

    fn draw_lit(&mut self, data: &MeshData, state: &ProgramState) {
        let view_proj = state.projection * state.view;
        let vertices: Vec<(Vec4, ClipVertex)> = (0..data.vb.record_count())
            .map(|i| {
                let world = state.model.transform_point(fetch3(data.vb, i, SLOT_POSITION));
                let normal = state.normal_matrix.mul_vec3(fetch3(data.vb, i, SLOT_NORMAL)).normalize();
                let snapped = snap_clip_position(view_proj.mul_vec4(world.extend(1.0)), state.resolution);
                let v = ClipVertex {
                    clip: snapped,
                    uv: fetch_uv(data.vb, i),
                    light: gouraud(world, normal, &state.lights),
                };
                (snapped, v)
            })
            .collect();

        for tri in data.order.chunks_exact(3) {
            let [a, b, c] = [vertices[tri[0]].1, vertices[tri[1]].1, vertices[tri[2]].1];
            let mapping = select_tex_mapping(&[vertices[tri[0]].0, vertices[tri[1]].0, vertices[tri[2]].0]);
            match mapping {
                TexMapping::Affine => self.stats.affine_triangles += 1,
                TexMapping::Perspective => self.stats.perspective_triangles += 1,
            }
            self.stats.triangles += 1;

            let params = state.fragment(data.texture, mapping, self.depth_test);
            fill_triangle(&mut self.target, [a, b, c], &params, &mut self.stats);
        }
    }

    fn draw_lines(&mut self, data: &MeshData, state: &ProgramState) {
        let mvp = state.projection * state.view * state.model;
        let color = Color::from_f32(state.fill_color, state.alpha);
        let points: Vec<ClipVertex> = data
            .order
            .iter()
            .map(|i| ClipVertex {
                clip: snap_clip_position(mvp.mul_vec4(fetch3(data.vb, *i, SLOT_POSITION).extend(1.0)), state.resolution),
                uv: Vec2::default(),
                light: Vec3::ONE,
            })
            .collect();

        let (w, h) = self.resolution();
        for pair in points.windows(2) {
            self.stats.line_segments += 1;
            if let Some((a, b)) = clip_segment(pair[0], pair[1]) {
                let (a, b) = (to_screen(&a, w, h), to_screen(&b, w, h));
                self.stats.fragments += self.target.draw_line(a.pos, b.pos, color, self.depth_test);
            }
        }
    }

    /// Switch to the overlay pass: no depth test, pixel-space projection
    pub fn begin_2d(&mut self, camera: Option<&mut Camera>) -> Result<()> {
        self.expect_pass(Pass::Scene3d, "begin_2d")?;
        self.projection = match camera {
            Some(cam) => {
                cam.set_projection(cam.fov, ProjectionKind::Orthogonal);
                cam.orthogonal
            }
            None => {
                log::error!("begin_2d: no active camera, using target-sized projection");
                let (w, h) = self.resolution();
                Mat4::orthographic(0.0, w as f32, h as f32, 0.0, -1.0, 1.0)
            }
        };
        self.view = Mat4::IDENTITY;
        self.depth_test = false;
        self.use_program(ShaderKind::TwoD);
        self.pass = Pass::Overlay2d;
        Ok(())
    }

    /// Draw a mesh in the overlay pass, positioned by its top-left corner
    pub fn draw_2d(&mut self, resources: &ResourceTable, mesh: &Mesh, object: &GameObject) -> Result<()> {
        self.expect_pass(Pass::Overlay2d, "draw_2d")?;
        if self.shaders.current() != ShaderKind::TwoD {
            self.use_program(ShaderKind::TwoD);
        }
        self.upload_object(object.model_matrix_2d(), object, mesh);
        let data = resolve(resources, mesh)?;
        let state = ProgramState::read(self.shaders.current_uniforms(), false);

        let mvp = state.projection * state.model;
        let offset = Vec2::new(0.5 / state.resolution.x, 0.5 / state.resolution.y);
        let vertices: Vec<ClipVertex> = (0..data.vb.record_count())
            .map(|i| {
                let p = fetch3(data.vb, i, SLOT_POSITION);
                let mut clip = mvp.mul_vec4(Vec4::new(p.x, p.y, 0.0, 1.0));
                clip.x += offset.x * clip.w;
                clip.y += offset.y * clip.w;
                ClipVertex { clip, uv: fetch_uv(data.vb, i), light: Vec3::ONE }
            })
            .collect();

        let params = state.fragment(data.texture, TexMapping::Perspective, false);
        match mesh.primitive {
            Primitive::Triangles => {
                for tri in data.order.chunks_exact(3) {
                    self.stats.triangles += 1;
                    let tri = [vertices[tri[0]], vertices[tri[1]], vertices[tri[2]]];
                    fill_triangle(&mut self.target, tri, &params, &mut self.stats);
                }
            }
            Primitive::LineStrip => {
                let color = Color::from_f32(state.fill_color, state.alpha);
                let (w, h) = self.resolution();
                for pair in data.order.windows(2) {
                    self.stats.line_segments += 1;
                    let a = to_screen(&vertices[pair[0]], w, h);
                    let b = to_screen(&vertices[pair[1]], w, h);
                    self.stats.fragments += self.target.draw_line(a.pos, b.pos, color, false);
                }
            }
        }
        Ok(())
    }

    /// Finish the frame: composite the offscreen target and present it
    ///
    /// The camera is handed back in perspective mode for the next update.
    pub fn end_frame(
        &mut self,
        resources: &ResourceTable,
        camera: Option<&mut Camera>,
        display: &mut dyn DisplaySurface,
    ) -> Result<()> {
        self.expect_pass(Pass::Overlay2d, "end_frame")?;
        if let Some(cam) = camera {
            cam.set_projection(cam.fov, ProjectionKind::Perspective);
        }
        self.pass = Pass::Idle;
        self.use_program(ShaderKind::Screen);

        if let Some(canvas) = display.canvas() {
            let frame = self.target.to_texture();
            Self::blit(resources, &self.screen_quad, &frame, canvas, &mut self.stats)?;
        }
        display.present(&self.target);
        Ok(())
    }

    /// Draw the screen quad into `canvas`, sampling `frame` with nearest filtering
    fn blit(
        resources: &ResourceTable,
        quad: &Mesh,
        frame: &Texture,
        canvas: &mut Framebuffer,
        stats: &mut FrameStats,
    ) -> Result<()> {
        let data = resolve(resources, quad)?;
        canvas.clear(Color::WHITE);

        let vertices: Vec<ClipVertex> = (0..data.vb.record_count())
            .map(|i| ClipVertex {
                clip: fetch3(data.vb, i, SLOT_POSITION).extend(1.0),
                uv: fetch_uv(data.vb, i),
                light: Vec3::ONE,
            })
            .collect();

        let params = FragmentParams {
            texture: Some(frame),
            tile_factor: Vec2::ONE,
            fill_color: Vec3::ONE,
            alpha: 1.0,
            mapping: TexMapping::Perspective,
            depth_test: false,
        };
        for tri in data.order.chunks_exact(3) {
            let tri = [vertices[tri[0]], vertices[tri[1]], vertices[tri[2]]];
            fill_triangle(canvas, tri, &params, stats);
        }
        Ok(())
    }
}
