//! Application state and frame loop
//!
//! A [`Game`] supplies the per-phase handlers; [`GameRunner`] drives them
//! in a fixed order and rejects steps taken out of order.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::geometry::{Mesh, ResourceTable};
use crate::pipeline::{DisplaySurface, RenderPipeline, SoftwareDisplay};
use crate::scene::{Camera, GameObject, PointLight, ProjectionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    /// Constructed, `init` not yet run
    Created,
    /// Initialized, ready for the first frame
    Init,
    Update,
    Render3D,
    Render2D,
    /// Last step of a frame; the next frame may start
    Cleanup,
    Shutdown,
}

impl FramePhase {
    pub fn name(self) -> &'static str {
        match self {
            FramePhase::Created => "created",
            FramePhase::Init => "init",
            FramePhase::Update => "update",
            FramePhase::Render3D => "render3d",
            FramePhase::Render2D => "render2d",
            FramePhase::Cleanup => "cleanup",
            FramePhase::Shutdown => "shutdown",
        }
    }
}

/// Everything a game handler can touch
pub struct EngineContext {
    pub resources: ResourceTable,
    pub pipeline: RenderPipeline,
    /// Active camera; `None` skips projection updates with a logged error
    pub camera: Option<Camera>,
    pub lights: Vec<PointLight>,
    pub config: EngineConfig,
    close_requested: bool,
    frame: u64,
    elapsed: f64,
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let mut resources = ResourceTable::new();
        let resolution = config.render.resolution();
        let pipeline = RenderPipeline::new(&mut resources, resolution, config.render.clear_color())?;

        let mut camera = Camera::new(
            config.camera.fov,
            config.camera.move_speed,
            ProjectionKind::Perspective,
            resolution,
        );
        camera.look_sensitivity = config.camera.look_sensitivity;

        Ok(Self {
            resources,
            pipeline,
            camera: Some(camera),
            lights: Vec::new(),
            config,
            close_requested: false,
            frame: 0,
            elapsed: 0.0,
        })
    }

    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// Completed frames
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Seconds of simulated time
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn draw_3d(&mut self, mesh: &Mesh, object: &GameObject) -> Result<()> {
        self.pipeline.draw_3d(&self.resources, mesh, object)
    }

    pub fn draw_2d(&mut self, mesh: &Mesh, object: &GameObject) -> Result<()> {
        self.pipeline.draw_2d(&self.resources, mesh, object)
    }

    /// Tear down the pipeline and hand back whatever the game left behind
    pub fn into_resources(self) -> ResourceTable {
        let Self { mut resources, pipeline, .. } = self;
        pipeline.destroy(&mut resources);
        resources
    }
}

/// Game-supplied frame handlers
pub trait Game {
    /// Runs once before the first frame; create meshes and textures here
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()>;

    fn update(&mut self, ctx: &mut EngineContext, dt: f64) -> Result<()>;

    /// 3D draws, depth tested, perspective projection
    fn render(&mut self, ctx: &mut EngineContext) -> Result<()>;

    /// 2D overlay draws in render-target pixels
    fn render_gui(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// End-of-frame housekeeping
    fn cleanup(&mut self, _ctx: &mut EngineContext) -> Result<()> {
        Ok(())
    }

    /// Runs once after the last frame; release resources here
    fn shutdown(&mut self, _ctx: &mut EngineContext) {}
}

/// Host services for [`GameRunner::run`]
pub trait Platform {
    /// External close signal (window closed)
    fn should_close(&mut self) -> bool;
    /// Seconds since the previous frame
    fn delta_time(&mut self) -> f64;
    fn display(&mut self) -> &mut dyn DisplaySurface;
}

/// Fixed-step platform rendering into a [`SoftwareDisplay`]
pub struct HeadlessPlatform {
    pub display: SoftwareDisplay,
    frames_left: u64,
    dt: f64,
}

impl HeadlessPlatform {
    pub fn new(display: SoftwareDisplay, frames: u64, dt: f64) -> Self {
        Self { display, frames_left: frames, dt }
    }
}

impl Platform for HeadlessPlatform {
    fn should_close(&mut self) -> bool {
        if self.frames_left == 0 {
            return true;
        }
        self.frames_left -= 1;
        false
    }

    fn delta_time(&mut self) -> f64 {
        self.dt
    }

    fn display(&mut self) -> &mut dyn DisplaySurface {
        &mut self.display
    }
}

pub struct GameRunner<G: Game> {
    game: G,
    ctx: EngineContext,
    phase: FramePhase,
}

impl<G: Game> GameRunner<G> {
    pub fn new(game: G, ctx: EngineContext) -> Self {
        Self { game, ctx, phase: FramePhase::Created }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.ctx
    }

    fn invalid(&self, step: &'static str) -> EngineError {
        log::error!("{} requested in phase {}", step, self.phase.name());
        EngineError::InvalidPhase { step, phase: self.phase.name() }
    }

    pub fn init(&mut self) -> Result<()> {
        if self.phase != FramePhase::Created {
            return Err(self.invalid("init"));
        }
        self.game.init(&mut self.ctx)?;
        self.phase = FramePhase::Init;
        log::info!("game initialized");
        Ok(())
    }

    /// Run one full frame: update, 3D pass, 2D pass, present, cleanup
    ///
    /// An error leaves the runner in the failing phase, so later frames
    /// are rejected.
    pub fn frame(&mut self, dt: f64, display: &mut dyn DisplaySurface) -> Result<()> {
        if !matches!(self.phase, FramePhase::Init | FramePhase::Cleanup) {
            return Err(self.invalid("frame"));
        }
        let ctx = &mut self.ctx;

        self.phase = FramePhase::Update;
        self.game.update(ctx, dt)?;
        ctx.elapsed += dt;

        self.phase = FramePhase::Render3D;
        ctx.pipeline.begin_frame()?;
        ctx.pipeline.begin_3d(ctx.camera.as_mut(), &ctx.lights)?;
        self.game.render(ctx)?;

        self.phase = FramePhase::Render2D;
        ctx.pipeline.begin_2d(ctx.camera.as_mut())?;
        self.game.render_gui(ctx)?;
        ctx.pipeline.end_frame(&ctx.resources, ctx.camera.as_mut(), display)?;

        self.phase = FramePhase::Cleanup;
        self.game.cleanup(ctx)?;
        ctx.frame += 1;
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        if matches!(self.phase, FramePhase::Created | FramePhase::Shutdown) {
            return Err(self.invalid("shutdown"));
        }
        self.game.shutdown(&mut self.ctx);
        self.phase = FramePhase::Shutdown;
        log::info!(
            "shutdown after {} frames, {} live resources",
            self.ctx.frame,
            self.ctx.resources.live_resources()
        );
        Ok(())
    }

    /// Init, then frames until the platform or the game asks to close,
    /// then shutdown
    pub fn run(&mut self, platform: &mut dyn Platform) -> Result<()> {
        self.init()?;
        while !platform.should_close() && !self.ctx.close_requested() {
            let dt = platform.delta_time();
            self.frame(dt, platform.display())?;
        }
        self.shutdown()
    }

    /// Consume a shut-down runner
    pub fn finish(self) -> Result<(G, ResourceTable)> {
        if self.phase != FramePhase::Shutdown {
            return Err(self.invalid("finish"));
        }
        let resources = self.ctx.into_resources();
        if resources.live_resources() > 0 {
            log::warn!("{} resources still live after shutdown", resources.live_resources());
        }
        Ok((self.game, resources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{create_cube, delete_mesh};
    use crate::rasterizer::Vec3;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        cube: Option<Mesh>,
        close_after: Option<u64>,
    }

    impl Game for Recorder {
        fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
            self.calls.push("init");
            self.cube = Some(create_cube(&mut ctx.resources, None)?);
            Ok(())
        }

        fn update(&mut self, ctx: &mut EngineContext, _dt: f64) -> Result<()> {
            self.calls.push("update");
            if Some(ctx.frame_count()) == self.close_after {
                ctx.request_close();
            }
            Ok(())
        }

        fn render(&mut self, ctx: &mut EngineContext) -> Result<()> {
            self.calls.push("render");
            if let Some(cube) = &self.cube {
                ctx.draw_3d(cube, &GameObject::new(Vec3::new(0.0, 0.0, -3.0)))?;
            }
            Ok(())
        }

        fn render_gui(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            self.calls.push("render_gui");
            Ok(())
        }

        fn cleanup(&mut self, _ctx: &mut EngineContext) -> Result<()> {
            self.calls.push("cleanup");
            Ok(())
        }

        fn shutdown(&mut self, ctx: &mut EngineContext) {
            self.calls.push("shutdown");
            if let Some(cube) = self.cube.take() {
                delete_mesh(&mut ctx.resources, cube);
            }
        }
    }

    fn runner(game: Recorder) -> GameRunner<Recorder> {
        GameRunner::new(game, EngineContext::new(EngineConfig::default()).unwrap())
    }

    #[test]
    fn test_phases_run_in_order() {
        let mut r = runner(Recorder::default());
        let mut platform = HeadlessPlatform::new(SoftwareDisplay::new(320, 180).unwrap(), 2, 1.0 / 60.0);
        r.run(&mut platform).unwrap();

        let frame = ["update", "render", "render_gui", "cleanup"];
        let mut expected = vec!["init"];
        expected.extend(frame);
        expected.extend(frame);
        expected.push("shutdown");
        assert_eq!(r.game().calls, expected);
        assert_eq!(r.context().frame_count(), 2);
        assert_eq!(platform.display.frames_presented(), 2);
        assert_eq!(r.phase(), FramePhase::Shutdown);
    }

    #[test]
    fn test_frame_before_init_or_after_shutdown_fails() {
        let mut r = runner(Recorder::default());
        let mut display = SoftwareDisplay::new(32, 18).unwrap();
        assert!(matches!(r.frame(0.016, &mut display), Err(EngineError::InvalidPhase { .. })));

        r.init().unwrap();
        assert!(matches!(r.init(), Err(EngineError::InvalidPhase { .. })));
        r.frame(0.016, &mut display).unwrap();
        r.shutdown().unwrap();
        assert!(matches!(r.frame(0.016, &mut display), Err(EngineError::InvalidPhase { .. })));
        assert!(r.game().calls.iter().filter(|c| **c == "init").count() == 1);
    }

    #[test]
    fn test_game_can_request_close() {
        let mut r = runner(Recorder { close_after: Some(1), ..Recorder::default() });
        let mut platform = HeadlessPlatform::new(SoftwareDisplay::new(32, 18).unwrap(), 100, 0.5);
        r.run(&mut platform).unwrap();
        assert_eq!(r.context().frame_count(), 2);
        assert!((r.context().elapsed() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shutdown_releases_game_meshes() {
        let mut r = runner(Recorder::default());
        r.init().unwrap();
        let before = r.context().resources.live_buffers();
        r.shutdown().unwrap();
        assert_eq!(r.context().resources.live_buffers(), before - 1);

        let (game, resources) = r.finish().unwrap();
        assert_eq!(game.calls, vec!["init", "shutdown"]);
        assert_eq!(resources.live_resources(), 0);
    }

    #[test]
    fn test_finish_requires_shutdown() {
        let mut r = runner(Recorder::default());
        r.init().unwrap();
        assert!(matches!(r.finish(), Err(EngineError::InvalidPhase { .. })));
    }
}
