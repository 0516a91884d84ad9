use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use glam::Vec2;
use lumen_assets::SceneConfig;
use lumen_input::{CursorControl, CursorMode, InputState, Key, MouseButton as InputButton};
use lumen_render::{
    ErrorPolicy, FlyCamera, Program, Scene, build_program, set_flip_vertically_on_load, share,
};
use lumen_render_wgpu::WgpuContext;
use lumen_render_wgpu::shaders::{FRAGMENT_SHADER, VERTEX_SHADER};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

#[derive(Parser)]
#[command(name = "lumen-desktop", about = "Lumen textured-scene demo")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene file (JSON); the built-in demo scene when omitted
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Directory texture paths are resolved against
    #[arg(long, default_value = ".")]
    assets: PathBuf,

    /// Fail on missing textures, shader errors and unknown uniforms
    #[arg(long)]
    strict: bool,

    /// Keep decoded images top-row-first
    #[arg(long)]
    no_flip: bool,
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::KeyW => Key::W,
        KeyCode::KeyA => Key::A,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyE => Key::E,
        KeyCode::Space => Key::Space,
        KeyCode::ControlLeft => Key::LeftControl,
        KeyCode::ShiftLeft => Key::LeftShift,
        KeyCode::Escape => Key::Escape,
        _ => return None,
    })
}

fn map_button(button: MouseButton) -> Option<InputButton> {
    match button {
        MouseButton::Left => Some(InputButton::Left),
        MouseButton::Right => Some(InputButton::Right),
        MouseButton::Middle => Some(InputButton::Middle),
        _ => None,
    }
}

/// Cursor side effects applied to the real window.
///
/// `locked` is set when only a `Locked` grab was available; the cursor then
/// stops reporting positions and mouse-look runs on raw motion instead.
struct WindowCursor<'a> {
    window: &'a Window,
    locked: &'a mut bool,
}

impl CursorControl for WindowCursor<'_> {
    fn set_mode(&mut self, mode: CursorMode) {
        let window = self.window;
        match mode {
            CursorMode::Captured => {
                *self.locked = false;
                if window.set_cursor_grab(CursorGrabMode::Confined).is_err() {
                    match window.set_cursor_grab(CursorGrabMode::Locked) {
                        Ok(()) => *self.locked = true,
                        Err(e) => tracing::warn!("cursor grab unavailable: {e}"),
                    }
                }
                window.set_cursor_visible(false);
            }
            CursorMode::Normal => {
                let _ = window.set_cursor_grab(CursorGrabMode::None);
                *self.locked = false;
                window.set_cursor_visible(true);
            }
        }
    }

    fn warp(&mut self, position: Vec2) {
        let target = PhysicalPosition::new(f64::from(position.x), f64::from(position.y));
        if let Err(e) = self.window.set_cursor_position(target) {
            tracing::trace!("cursor warp failed: {e}");
        }
    }
}

/// GPU-side state. Field order is drop order: GPU resources go before the
/// context that released them, the surface before its window.
struct Gpu {
    scene: Scene,
    program: Program,
    context: Rc<RefCell<WgpuContext>>,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    window: Arc<Window>,
}

struct App {
    cli: Cli,
    scene_config: SceneConfig,
    policy: ErrorPolicy,
    camera: FlyCamera,
    input: InputState,
    pointer_locked: bool,
    last_frame: Instant,
    gpu: Option<Gpu>,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(cli: Cli, scene_config: SceneConfig) -> Self {
        let policy = if cli.strict {
            ErrorPolicy::Strict
        } else {
            ErrorPolicy::Tolerant
        };
        let camera = FlyCamera::from_config(
            &scene_config.camera,
            scene_config.window.width,
            scene_config.window.height,
        );
        Self {
            cli,
            scene_config,
            policy,
            camera,
            input: InputState::new(),
            pointer_locked: false,
            last_frame: Instant::now(),
            gpu: None,
            failure: None,
        }
    }

    fn init_gpu(&mut self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title(self.scene_config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.scene_config.window.width,
                self.scene_config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or_else(|| anyhow!("no compatible GPU adapter"))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("lumen_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))
        .context("create device")?;

        let size = window.inner_size();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        self.camera.set_viewport(config.width, config.height);

        tracing::info!(
            "GPU initialized with {} backend",
            adapter.get_info().backend.to_str()
        );

        let (context, shared) = share(WgpuContext::new(
            device,
            queue,
            surface_format,
            config.width,
            config.height,
        ));
        let program = build_program(&shared, VERTEX_SHADER, FRAGMENT_SHADER, self.policy)?;
        let scene = Scene::build(&shared, &self.scene_config, &self.cli.assets, self.policy)?;

        Ok(Gpu {
            scene,
            program,
            context,
            surface,
            config,
            window,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.failure = Some(error);
        event_loop.exit();
    }

    /// Raw mouse motion. Only used while the pointer is locked: the motion
    /// is added to the cursor position mouse-look measures from.
    fn mouse_motion(&mut self, (dx, dy): (f64, f64)) {
        if !self.pointer_locked || !self.camera.is_captured() {
            return;
        }
        let position = self.input.cursor_position() + Vec2::new(dx as f32, dy as f32);
        self.input.set_cursor_position(position);
    }

    fn redraw(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;

        let Some(gpu) = &mut self.gpu else {
            return Ok(());
        };

        self.camera.process_input(
            &mut self.input,
            &mut WindowCursor {
                window: &gpu.window,
                locked: &mut self.pointer_locked,
            },
            &self.scene_config.bindings,
            dt,
        );

        gpu.context.borrow_mut().begin_frame();
        gpu.scene.draw_frame(&gpu.program, &self.camera)?;

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.surface
                    .configure(gpu.context.borrow().device(), &gpu.config);
                return Ok(());
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return Ok(());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let [r, g, b, a] = self.scene_config.clear_color.map(f64::from);
        gpu.context
            .borrow_mut()
            .end_frame(&view, wgpu::Color { r, g, b, a });
        output.present();
        gpu.window.request_redraw();
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init_gpu(event_loop) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => self.fail(event_loop, e),
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
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.config.width = new_size.width.max(1);
                    gpu.config.height = new_size.height.max(1);
                    let mut context = gpu.context.borrow_mut();
                    gpu.surface.configure(context.device(), &gpu.config);
                    context.resize(gpu.config.width, gpu.config.height);
                    self.camera.set_viewport(gpu.config.width, gpu.config.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                let Some(key) = map_key(code) else {
                    return;
                };
                let pressed = state == ElementState::Pressed;
                if key == Key::Escape && pressed {
                    event_loop.exit();
                    return;
                }
                self.input.set_key(key, pressed);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button) = map_button(button) {
                    self.input
                        .set_button(button, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { .. } if self.pointer_locked => {}
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_cursor_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::Focused(false) => {
                self.input.clear();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
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
            self.mouse_motion(delta);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    tracing::info!("lumen-desktop starting");

    let scene_config = match &cli.scene {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("load scene {}", path.display()))?,
        None => SceneConfig::demo(),
    };
    set_flip_vertically_on_load(!cli.no_flip);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(cli, scene_config);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
