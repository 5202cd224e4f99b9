use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use meshview::{
    AppState, Camera, Cli, FrameInput, GpuContext, Input, Mesh, MeshData, MeshPass,
    ModelTransform, Projection, ScreenshotError, ShaderSources, ShadingSelector, ShadingVariant,
    Texture, TextureBuffer, ViewerConfig, capture, load_image_rgba, read_surface,
};

const WINDOW_TITLE: &str = "Spinning Cube";
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.01,
    g: 0.01,
    b: 0.25,
    a: 1.0,
};
const CHECKERBOARD_SIZE: u32 = 256;
const CHECKERBOARD_CELLS: u32 = 8;

/// CPU-side assets, loaded before the window opens.
struct Startup {
    mesh: MeshData,
    texture: TextureBuffer,
    shaders: ShaderSources,
}

impl Startup {
    fn load(config: &ViewerConfig) -> Result<Self> {
        let mesh = match &config.mesh {
            Some(path) => MeshData::load(path)
                .with_context(|| format!("failed to load mesh '{}'", path.display()))?,
            None => MeshData::cube(),
        };
        tracing::info!(vertices = mesh.vertex_count(), "mesh loaded");

        let texture = match &config.texture {
            Some(path) => load_image_rgba(path)?,
            None => TextureBuffer::checkerboard(CHECKERBOARD_SIZE, CHECKERBOARD_CELLS),
        };
        tracing::info!(
            width = texture.width(),
            height = texture.height(),
            "texture loaded"
        );

        let shaders = ShaderSources::load(&config.shader_dir).with_context(|| {
            format!("failed to load shaders from '{}'", config.shader_dir.display())
        })?;

        Ok(Self {
            mesh,
            texture: texture.prepare(),
            shaders,
        })
    }
}

/// Everything alive while the window is open.
struct Viewer {
    window: Arc<Window>,
    gpu: GpuContext,
    mesh: Mesh,
    pass: MeshPass,
    state: AppState,
    input: Input,
    last_frame: Instant,
    screenshot_dir: PathBuf,
}

impl Viewer {
    fn new(event_loop: &ActiveEventLoop, config: &ViewerConfig, startup: Startup) -> Result<Self> {
        let window_attrs = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));
        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .map_err(|err| anyhow!("failed to create window: {err}"))?,
        );

        let gpu = GpuContext::new(window.clone()).context("failed to initialise GPU")?;
        let mesh = Mesh::new(&gpu, &startup.mesh);
        let texture = Texture::from_buffer(&gpu, &startup.texture, "Mesh Texture");
        let pass = MeshPass::new(&gpu, &startup.shaders, &texture);

        let selector = ShadingSelector::new(
            pass.program(ShadingVariant::Primary),
            pass.program(ShadingVariant::DebugNormals),
        );
        // Fixed for the life of the window, resizes included.
        let projection = Projection::for_size(gpu.width(), gpu.height());
        let state = AppState::new(
            ModelTransform::new(config.translation, config.scale),
            &Camera::default(),
            &projection,
            selector,
        );

        Ok(Self {
            window,
            gpu,
            mesh,
            pass,
            state,
            input: Input::new(),
            last_frame: Instant::now(),
            screenshot_dir: config.screenshot_dir.clone(),
        })
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let actions = self.state.advance(elapsed, FrameInput::poll(&self.input));
        if actions.exit {
            event_loop.exit();
            return Ok(());
        }

        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("surface lost; reconfiguring");
                self.gpu.reconfigure();
                self.window.request_redraw();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("timed out waiting for the next surface texture");
                self.window.request_redraw();
                return Ok(());
            }
            Err(err) => return Err(err).context("failed to acquire surface texture"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(self.pass.depth_attachment()),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut recorder = self.pass.recorder(&self.gpu, &mut render_pass);
            self.state
                .render(&mut recorder, &self.mesh, self.mesh.vertex_count());
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        if actions.capture {
            self.save_screenshot(&output.texture);
        }

        output.present();
        self.window.request_redraw();
        Ok(())
    }

    /// Failures are logged and the loop carries on.
    fn save_screenshot(&self, texture: &wgpu::Texture) {
        match read_surface(&self.gpu, texture)
            .and_then(|framebuffer| capture(&framebuffer, &self.screenshot_dir))
        {
            Ok(path) => tracing::info!(path = %path.display(), "screenshot saved"),
            Err(err @ ScreenshotError::ReadbackUnsupported) => {
                tracing::warn!("{err}")
            }
            Err(err) => tracing::error!(error = %err, "screenshot failed"),
        }
    }
}

enum App {
    Pending {
        config: ViewerConfig,
        startup: Option<Startup>,
    },
    Running(Box<Viewer>),
    Failed(anyhow::Error),
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!(error = %err, "viewer stopped");
        *self = App::Failed(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let App::Pending { config, startup } = self else {
            return;
        };
        let Some(startup) = startup.take() else {
            return;
        };

        match Viewer::new(event_loop, config, startup) {
            Ok(viewer) => *self = App::Running(Box::new(viewer)),
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let App::Running(viewer) = self else {
            return;
        };

        viewer.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                viewer.gpu.resize(size.width, size.height);
                viewer.pass.ensure_depth_size(&viewer.gpu);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = viewer.redraw(event_loop) {
                    self.fail(event_loop, err);
                }
            }
            _ => {}
        }
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args(std::env::args_os()).unwrap_or_else(|err| err.exit());
    initialise_tracing();

    let config = ViewerConfig::from(cli);
    let startup = Startup::load(&config)?;

    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::Pending {
        config,
        startup: Some(startup),
    };
    event_loop
        .run_app(&mut app)
        .map_err(|err| anyhow!("event loop failed: {err}"))?;

    match app {
        App::Failed(err) => Err(err),
        _ => Ok(()),
    }
}
