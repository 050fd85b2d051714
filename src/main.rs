//! Retro Engine demo: a small lit scene with a fly camera and a 2D overlay
//!
//! Controls: WASD to fly, hold the right mouse button to look, Escape to quit.

use macroquad::prelude::{
    clear_background, draw_texture_ex, get_frame_time, is_key_down, is_key_pressed, is_mouse_button_down,
    mouse_position, next_frame, screen_height, screen_width, vec2, Conf, DrawTextureParams, FilterMode, KeyCode,
    MouseButton, Texture2D, BLACK, WHITE,
};

use retro_engine::geometry::{
    create_circle, create_cube, create_cube_sphere, create_line_strip, create_pyramid, create_quad, delete_mesh, Mesh,
    TextureId,
};
use retro_engine::pipeline::shader::ALPHA;
use retro_engine::pipeline::{DisplaySurface, UniformSink};
use retro_engine::rasterizer::{Color, Framebuffer, Texture, Vec3};
use retro_engine::scene::{CameraDirection, GameObject, LightIntensity, PointLight};
use retro_engine::{
    init_logging, load_config_or_default, EngineConfig, EngineContext, EngineError, Game, GameRunner, LoggingConfig,
    Result, VERSION,
};

const CONFIG_PATH: &str = "retro-engine.ron";

fn window_conf() -> Conf {
    let config = load_config_or_default(CONFIG_PATH);
    let (w, h) = config.render.resolution();
    let scale = config.window.scale.max(1) as i32;
    Conf {
        window_title: format!("{} v{}", config.window.title, VERSION),
        window_width: w as i32 * scale,
        window_height: h as i32 * scale,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

/// Uploads the offscreen frame as a GPU texture and letterboxes it
struct MacroquadDisplay;

impl DisplaySurface for MacroquadDisplay {
    fn size(&self) -> (usize, usize) {
        (screen_width() as usize, screen_height() as usize)
    }

    fn present(&mut self, frame: &Framebuffer) {
        clear_background(BLACK);

        let texture = Texture2D::from_rgba8(frame.width as u16, frame.height as u16, &frame.pixels);
        texture.set_filter(FilterMode::Nearest);

        // Fit while keeping the target's aspect ratio
        let scale = (screen_width() / frame.width as f32).min(screen_height() / frame.height as f32);
        let draw_w = frame.width as f32 * scale;
        let draw_h = frame.height as f32 * scale;
        draw_texture_ex(
            &texture,
            (screen_width() - draw_w) * 0.5,
            (screen_height() - draw_h) * 0.5,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(draw_w, draw_h)),
                ..Default::default()
            },
        );
    }
}

struct DemoMeshes {
    sphere: Mesh,
    cube: Mesh,
    pyramid: Mesh,
    trail: Mesh,
    panel: Mesh,
    marker: Mesh,
}

#[derive(Default)]
struct Demo {
    texture: Option<TextureId>,
    meshes: Option<DemoMeshes>,
    sphere: GameObject,
    cube: GameObject,
    pyramid: GameObject,
    trail: GameObject,
    panel: GameObject,
    marker: GameObject,
    last_mouse: (f32, f32),
    looking: bool,
    time: f32,
}

impl Demo {
    fn load_texture(config: &EngineConfig) -> Texture {
        if let Some(path) = &config.demo.texture_path {
            match Texture::from_file(path) {
                Ok(tex) => return tex,
                Err(e) => log::warn!("{}; falling back to checkerboard", e),
            }
        }
        Texture::checkerboard(64, 64, Color::new(200, 120, 60), Color::new(60, 40, 30))
    }

    fn handle_input(&mut self, ctx: &mut EngineContext, dt: f64) {
        if is_key_pressed(KeyCode::Escape) {
            ctx.request_close();
        }
        let Some(camera) = ctx.camera.as_mut() else {
            return;
        };

        let keys = [
            (KeyCode::W, CameraDirection::Forward),
            (KeyCode::S, CameraDirection::Backward),
            (KeyCode::A, CameraDirection::Left),
            (KeyCode::D, CameraDirection::Right),
        ];
        for (key, direction) in keys {
            if is_key_down(key) {
                camera.move_fly(direction, dt);
            }
        }

        let mouse = mouse_position();
        if is_mouse_button_down(MouseButton::Right) {
            if self.looking {
                // Y down on screen, pitch up is positive
                camera.move_look(mouse.0 - self.last_mouse.0, self.last_mouse.1 - mouse.1);
            }
            self.looking = true;
        } else {
            self.looking = false;
        }
        self.last_mouse = mouse;
        camera.update();
    }
}

impl Game for Demo {
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
        let texture = ctx.resources.register_texture(Self::load_texture(&ctx.config))?;
        self.texture = Some(texture);

        let res = &mut ctx.resources;
        let trail_points: Vec<Vec3> = (0..=24)
            .map(|i| {
                let t = i as f32 / 24.0 * std::f32::consts::TAU;
                Vec3::new(t.cos() * 2.5, 0.2 * (3.0 * t).sin(), t.sin() * 2.5)
            })
            .collect();
        self.meshes = Some(DemoMeshes {
            sphere: create_cube_sphere(res, ctx.config.demo.sphere_resolution, Some(texture))?,
            cube: create_cube(res, Some(texture))?,
            pyramid: create_pyramid(res, Some(texture))?,
            trail: create_line_strip(res, &trail_points)?,
            panel: create_quad(res, None)?,
            marker: create_circle(res, None, 16)?,
        });

        self.sphere = GameObject::new(Vec3::new(0.0, 0.0, -4.0));
        self.sphere.scale = Vec3::new(2.0, 2.0, 2.0);
        self.cube = GameObject::new(Vec3::new(-2.0, 0.0, -5.0));
        self.pyramid = GameObject::new(Vec3::new(2.0, -0.5, -5.0));
        self.trail = GameObject::new(Vec3::new(0.0, 0.0, -4.0));
        self.trail.set_color(0.3, 1.0, 0.6);

        self.panel = GameObject::new(Vec3::new(4.0, 4.0, 0.0));
        self.panel.scale = Vec3::new(72.0, 14.0, 1.0);
        self.panel.set_color(0.1, 0.1, 0.3);
        self.marker = GameObject::new(Vec3::new(8.0, 6.0, 0.0));
        self.marker.scale = Vec3::new(10.0, 10.0, 1.0);
        self.marker.set_color(1.0, 0.8, 0.2);

        let mut fill = PointLight::new(Vec3::new(0.0, 3.0, -2.0));
        fill.intensity = LightIntensity::VeryHigh;
        let mut orbit = PointLight::new(Vec3::new(3.0, 0.0, -4.0));
        orbit.color = Vec3::new(1.0, 0.5, 0.2);
        orbit.intensity = LightIntensity::Low;
        ctx.lights = vec![fill, orbit];

        log::info!("demo scene ready, {} live resources", ctx.resources.live_resources());
        Ok(())
    }

    fn update(&mut self, ctx: &mut EngineContext, dt: f64) -> Result<()> {
        self.handle_input(ctx, dt);

        let dt = dt as f32;
        self.time += dt;
        self.cube.rotate(45.0 * dt, 30.0 * dt, 0.0);
        self.pyramid.rotate(-60.0 * dt, 0.0, 0.0);
        self.sphere.rotate(10.0 * dt, 0.0, 5.0 * dt);

        if let Some(light) = ctx.lights.get_mut(1) {
            light.position = Vec3::new(3.0 * self.time.cos(), 0.5, -4.0 + 3.0 * self.time.sin());
        }
        self.marker.position.x = 8.0 + 56.0 * (0.5 + 0.5 * self.time.sin());
        Ok(())
    }

    fn render(&mut self, ctx: &mut EngineContext) -> Result<()> {
        let Some(meshes) = &self.meshes else {
            return Ok(());
        };
        ctx.draw_3d(&meshes.sphere, &self.sphere)?;
        ctx.draw_3d(&meshes.cube, &self.cube)?;
        ctx.draw_3d(&meshes.pyramid, &self.pyramid)?;
        ctx.draw_3d(&meshes.trail, &self.trail)?;
        Ok(())
    }

    fn render_gui(&mut self, ctx: &mut EngineContext) -> Result<()> {
        let Some(meshes) = &self.meshes else {
            return Ok(());
        };
        ctx.draw_2d(&meshes.panel, &self.panel)?;
        ctx.pipeline.shaders_mut().set_float(ALPHA, 0.8);
        ctx.draw_2d(&meshes.marker, &self.marker)?;
        Ok(())
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        if let Some(meshes) = self.meshes.take() {
            for mesh in [meshes.sphere, meshes.cube, meshes.pyramid, meshes.trail, meshes.panel, meshes.marker] {
                delete_mesh(&mut ctx.resources, mesh);
            }
        }
        if let Some(texture) = self.texture.take() {
            ctx.resources.release_texture(texture);
        }
    }
}

async fn run() -> Result<()> {
    let config = load_config_or_default(CONFIG_PATH);
    init_logging(LoggingConfig::with_filter(config.log_filter.clone()));
    log::info!("retro-engine v{}", VERSION);

    let ctx = EngineContext::new(config)?;
    let mut runner = GameRunner::new(Demo::default(), ctx);
    let mut display = MacroquadDisplay;

    runner.init()?;
    while !runner.context().close_requested() {
        runner.frame(get_frame_time() as f64, &mut display)?;
        next_frame().await;
    }
    runner.shutdown()?;
    runner.finish()?;
    Ok(())
}

#[macroquad::main(window_conf)]
async fn main() {
    match run().await {
        Ok(()) => {}
        Err(e @ EngineError::RenderTarget(_)) => {
            log::error!("cannot render: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
