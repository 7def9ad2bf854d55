//! Window creation and event handling via winit.
//!
//! [`AppState`] implements winit's [`ApplicationHandler`]. The GPU side is
//! created on the first `resumed` and lives in [`Renderer`]; everything else
//! (config, input trackers, post-process parameters) exists from construction.

use std::path::PathBuf;
use std::sync::Arc;

use glam::Vec3;
use lumen_config::Config;
use lumen_input::{Action, ActionResolver, ActionState, InputMap, KeyboardState, MouseState};
use lumen_render::{
    FrameOrchestrator, GpuBackend, ParameterController, PostProcessParameters, RenderContext,
    SurfaceError, init_render_context_blocking,
};
use lumen_scene::{Camera, Scene};
use tracing::{debug, error, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{CursorGrabMode, Fullscreen, Window, WindowAttributes, WindowId};

use crate::bridge::{
    camera_from_config, camera_input, initial_parameters, parameter_controller, pixel_format,
    post_process_input,
};
use crate::clock::FrameClock;
use crate::error::AppError;
use crate::reload::ConfigWatcher;

/// Builds the scene once the GPU exists. Receives the configured camera.
pub type SceneBuilder = Box<dyn FnOnce(&mut GpuBackend, Camera) -> Result<Scene, AppError>>;

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config) -> WindowAttributes {
    let attrs = WindowAttributes::default()
        .with_title(config.window.title.clone())
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ));
    if config.window.fullscreen {
        attrs.with_fullscreen(Some(Fullscreen::Borderless(None)))
    } else {
        attrs
    }
}

/// GPU state, present once the window is up.
pub struct Renderer {
    pub context: RenderContext,
    pub backend: GpuBackend,
    pub frame: FrameOrchestrator,
    pub scene: Scene,
}

pub struct AppState {
    pub window: Option<Arc<Window>>,
    pub renderer: Option<Renderer>,
    pub config: Config,
    pub params: PostProcessParameters,
    pub controller: ParameterController,
    pub keyboard: KeyboardState,
    pub mouse: MouseState,
    pub input_map: InputMap,
    pub actions: ActionState,
    pub clock: FrameClock,
    config_watcher: Option<ConfigWatcher>,
    scene_builder: Option<SceneBuilder>,
    /// The error that stopped the event loop, if any.
    exit_error: Option<AppError>,
}

impl AppState {
    pub fn with_config(config: Config) -> Self {
        Self {
            window: None,
            renderer: None,
            params: initial_parameters(&config.post_process),
            controller: parameter_controller(&config.post_process),
            config,
            keyboard: KeyboardState::new(),
            mouse: MouseState::new(),
            input_map: InputMap::default(),
            actions: ActionState::new(),
            clock: FrameClock::new(),
            config_watcher: None,
            scene_builder: None,
            exit_error: None,
        }
    }

    pub fn with_input_map(mut self, input_map: InputMap) -> Self {
        self.input_map = input_map;
        self
    }

    pub fn with_scene_builder(mut self, builder: SceneBuilder) -> Self {
        self.scene_builder = Some(builder);
        self
    }

    /// Watch `config.ron` for edits while running.
    pub fn with_config_watcher(mut self, watcher: ConfigWatcher) -> Self {
        self.config_watcher = Some(watcher);
        self
    }

    /// Take over the settings that can change without a restart: the
    /// controller constants, level intensities and scene colors.
    ///
    /// Window, camera and format settings only apply on the next start.
    pub fn apply_config(&mut self, fresh: &Config) {
        let pp = &fresh.post_process;
        self.controller.blur_multiplier_k = pp.blur_multiplier;
        self.controller.threshold_ramp_rate = pp.threshold_ramp_rate;
        if self.params.blur_multiplier != 0.0 {
            self.params.blur_multiplier = pp.blur_multiplier;
        }
        self.params.level_intensities = pp.level_intensities;
        self.params.clamp();

        if let Some(r) = self.renderer.as_mut() {
            r.frame.set_clear_color(fresh.scene.clear_color);
            r.scene.ambient = Vec3::from_array(fresh.scene.ambient_color);
        }
        self.config.post_process.clone_from(pp);
        self.config.scene.clone_from(&fresh.scene);
        info!(
            "Config reloaded: k {}, ramp {}, intensities {:?}",
            pp.blur_multiplier, pp.threshold_ramp_rate, self.params.level_intensities
        );
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let window = Arc::new(event_loop.create_window(window_attributes_from_config(&self.config))?);
        let context = init_render_context_blocking(window.clone(), self.config.window.vsync)?;
        let extent = context.extent();

        let mut backend = GpuBackend::new(
            &context.device,
            &context.queue,
            context.surface_format,
            extent,
        );
        let frame = FrameOrchestrator::init(
            &mut backend,
            pixel_format(self.config.post_process.intermediate_format),
            self.config.scene.clear_color,
        )?;

        let aspect = extent.width as f32 / extent.height as f32;
        let camera = camera_from_config(&self.config.camera, aspect);
        let mut scene = match self.scene_builder.take() {
            Some(build) => build(&mut backend, camera)?,
            None => Scene::new(camera),
        };
        scene.ambient = Vec3::from_array(self.config.scene.ambient_color);
        info!(
            "Scene ready: {} entities, {} lights, sky {}",
            scene.entities.len(),
            scene.lights.len(),
            if scene.sky.is_some() { "on" } else { "off" }
        );

        window.request_redraw();
        self.window = Some(window);
        self.renderer = Some(Renderer {
            context,
            backend,
            frame,
            scene,
        });
        Ok(())
    }

    /// Surface first, then depth, then the post-process targets, then the camera.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        let Some(r) = self.renderer.as_mut() else {
            return;
        };
        r.context.resize(width, height);
        let extent = r.context.extent();
        r.backend.resize_backbuffer(extent);
        if let Err(e) = r.frame.resize(&mut r.backend) {
            warn!("Rendering degraded after resize: {e}");
        }
        r.scene.camera.set_aspect_ratio(extent.width, extent.height);
        info!("Window resized to {}x{}", extent.width, extent.height);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() {
            return;
        }
        let dt = self.clock.tick();
        if let Some(fresh) = self.config_watcher.as_mut().and_then(|w| w.poll(dt).cloned()) {
            self.apply_config(&fresh);
        }

        ActionResolver::resolve(&self.input_map, &self.keyboard, &self.mouse, &mut self.actions);
        let post_input = post_process_input(&self.actions);
        let move_input = camera_input(&self.actions, &self.mouse);
        self.keyboard.clear_transients();
        self.mouse.clear_transients();
        self.sync_look_capture();

        let Some(r) = self.renderer.as_mut() else {
            return;
        };

        // Camera first so the blur follows this frame's speed.
        r.scene.camera.update(dt, &move_input);
        self.controller
            .update(&mut self.params, &post_input, r.scene.camera.current_speed(), dt);
        if self.controller.quit_requested() {
            info!("Quit requested, shutting down");
            event_loop.exit();
            return;
        }

        let surface_texture = match r.context.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::Timeout) => {
                debug!("Surface timeout, frame skipped");
                self.request_redraw();
                return;
            }
            Err(SurfaceError::Lost) => {
                warn!("Surface lost, frame skipped");
                self.request_redraw();
                return;
            }
            Err(e @ SurfaceError::OutOfMemory) => {
                error!("Surface acquisition failed: {e}");
                self.exit_error = Some(e.into());
                event_loop.exit();
                return;
            }
        };

        r.backend
            .begin_frame(surface_texture, r.scene.entities.len());
        r.frame.render_frame(
            &mut r.backend,
            &r.scene,
            &self.params,
            self.clock.total_time(),
        );
        self.request_redraw();
    }

    /// Grab and hide the cursor while mouse-look is held.
    fn sync_look_capture(&mut self) {
        let look = self.actions.is_held(Action::Look);
        if look == self.mouse.is_captured() {
            return;
        }
        if let Some(window) = &self.window {
            let grab = if look {
                window
                    .set_cursor_grab(CursorGrabMode::Locked)
                    .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
            } else {
                window.set_cursor_grab(CursorGrabMode::None)
            };
            if let Err(e) = grab {
                debug!("Cursor grab unavailable: {e}");
            }
            window.set_cursor_visible(!look);
        }
        self.mouse.set_captured(look);
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            error!("Startup failed: {e}");
            self.exit_error = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => self.handle_resize(size.width, size.height),
            WindowEvent::Focused(false) => {
                self.keyboard.reset();
                self.mouse.reset();
                self.actions = ActionState::new();
                self.sync_look_capture();
            }
            WindowEvent::KeyboardInput { event, .. } => self.keyboard.process_event(&event),
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.on_cursor_moved(position.x, position.y);
            }
            WindowEvent::MouseInput { state, button, .. } => self.mouse.on_button(button, state),
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.mouse.on_raw_motion(delta.0, delta.1);
        }
    }
}

/// Keybindings from the platform config directory, or the defaults.
pub fn load_input_map() -> InputMap {
    match InputMap::default_config_path() {
        Some(path) if path.exists() => InputMap::load(&path),
        _ => InputMap::default(),
    }
}

/// Create an event loop and run until the window closes or a fatal error occurs.
///
/// With `watch` set to the config directory and the config as read from it,
/// edits to `config.ron` are applied while running.
#[instrument(skip_all)]
pub fn run_with_config(
    config: Config,
    watch: Option<(PathBuf, Config)>,
    scene_builder: SceneBuilder,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    let mut app = AppState::with_config(config)
        .with_input_map(load_input_map())
        .with_scene_builder(scene_builder);
    if let Some((dir, on_disk)) = watch {
        app = app.with_config_watcher(ConfigWatcher::new(dir, on_disk));
    }
    event_loop.run_app(&mut app)?;
    match app.exit_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_render::MAX_BLOOM_LEVELS;

    #[test]
    fn test_app_state_starts_without_gpu() {
        let state = AppState::with_config(Config::default());
        assert!(state.window.is_none());
        assert!(state.renderer.is_none());
        assert!(state.exit_error.is_none());
    }

    #[test]
    fn test_parameters_come_from_config() {
        let mut config = Config::default();
        config.post_process.bloom_levels = 2;
        config.post_process.bloom_threshold = 0.25;
        let state = AppState::with_config(config);
        assert_eq!(state.params.active_bloom_levels, 2);
        assert_eq!(state.params.bloom_threshold, 0.25);
        assert!(!state.controller.quit_requested());
    }

    #[test]
    fn test_default_parameters_use_every_level() {
        let state = AppState::with_config(Config::default());
        assert_eq!(state.params.active_bloom_levels, MAX_BLOOM_LEVELS);
        assert!(state.params.bloom_enabled);
    }

    #[test]
    fn test_resize_without_renderer_is_ignored() {
        let mut state = AppState::with_config(Config::default());
        state.handle_resize(800, 600);
        assert!(state.renderer.is_none());
    }

    #[test]
    fn test_look_capture_released_when_look_not_held() {
        let mut state = AppState::with_config(Config::default());
        state.mouse.set_captured(true);
        state.sync_look_capture();
        assert!(!state.mouse.is_captured());
    }

    #[test]
    fn test_apply_config_updates_live_settings() {
        let mut state = AppState::with_config(Config::default());
        let mut fresh = Config::default();
        fresh.post_process.blur_multiplier = 3.0;
        fresh.post_process.threshold_ramp_rate = 2.0;
        fresh.post_process.level_intensities = [0.5, -1.0, 0.5, 0.5, 0.5];
        fresh.post_process.bloom_levels = 1;
        fresh.scene.clear_color = [0.0, 0.0, 0.0, 1.0];

        state.apply_config(&fresh);
        assert_eq!(state.controller.blur_multiplier_k, 3.0);
        assert_eq!(state.controller.threshold_ramp_rate, 2.0);
        assert_eq!(state.params.blur_multiplier, 3.0);
        assert_eq!(state.params.level_intensities, [0.5, 0.0, 0.5, 0.5, 0.5]);
        // Runtime state set from the keyboard is left alone.
        assert_eq!(state.params.active_bloom_levels, MAX_BLOOM_LEVELS);
        assert_eq!(state.config.scene.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_apply_config_keeps_camera_blur_muted() {
        let mut state = AppState::with_config(Config::default());
        state.params.blur_multiplier = 0.0;
        let mut fresh = Config::default();
        fresh.post_process.blur_multiplier = 4.0;
        state.apply_config(&fresh);
        assert_eq!(state.params.blur_multiplier, 0.0);
        assert_eq!(state.controller.blur_multiplier_k, 4.0);
    }

    #[test]
    fn test_window_attributes_from_config() {
        let mut config = Config::default();
        config.window.fullscreen = true;
        let _attrs = window_attributes_from_config(&config);
    }
}
