use std::{borrow::Cow, collections::HashMap, sync::Arc};

use anyhow::{bail, Context};
use wgpu::{
    Adapter, Backends, Device, DeviceDescriptor, InstanceDescriptor, MemoryHints, Origin3d, Queue,
    RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceError, TexelCopyBufferLayout,
    TexelCopyTextureInfo, TextureAspect, TextureFormat, TextureUsages,
};
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowId},
};

use crate::{
    brush::Color,
    cmd::Cmd,
    config::{CommandVerb, Config, Key},
    input::PointerState,
    raster::Pixmap,
    session::Session,
};

const TITLE: &str = "Kids Drawing";

/// Swapchain formats we can upload the canvas into without conversion beyond a swizzle.
const UPLOAD_FORMATS: [TextureFormat; 4] = [
    TextureFormat::Rgba8UnormSrgb,
    TextureFormat::Bgra8UnormSrgb,
    TextureFormat::Rgba8Unorm,
    TextureFormat::Bgra8Unorm,
];

pub struct App {
    instance: wgpu::Instance,
    bind: HashMap<Key, CommandVerb>,
    initial_size: LogicalSize<u32>,
    session: Session,
    win: Option<Win>,
}

struct Gpu {
    adapter: Adapter,
    device: Device,
    queue: Queue,
}

impl Gpu {
    fn new(instance: &wgpu::Instance, surface: &Surface<'_>) -> anyhow::Result<Self> {
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            compatible_surface: Some(surface),
            ..Default::default()
        }))
        .context("failed to find a supported graphics adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&DeviceDescriptor {
            memory_hints: MemoryHints::MemoryUsage,
            ..Default::default()
        }))?;

        Ok(Gpu {
            adapter,
            device,
            queue,
        })
    }

    /// The canvas is rendered on the CPU and copied straight into the swapchain image, so the
    /// surface must accept copies in an 8-bit RGBA/BGRA format.
    fn surface_config(
        &self,
        surface: &Surface<'_>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<SurfaceConfiguration> {
        let caps = surface.get_capabilities(&self.adapter);
        if !caps.usages.contains(TextureUsages::COPY_DST) {
            bail!(
                "surface does not support copying into the swapchain (supported usages: {:?})",
                caps.usages,
            );
        }
        let Some(format) = caps
            .formats
            .iter()
            .copied()
            .find(|format| UPLOAD_FORMATS.contains(format))
        else {
            bail!(
                "surface supports none of the formats {:?} (supported: {:?})",
                UPLOAD_FORMATS,
                caps.formats,
            );
        };

        let mut config = surface
            .get_default_config(&self.adapter, width, height)
            .context("adapter does not support surface")?;
        config.format = format;
        config.usage = TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_DST;
        config.view_formats.clear();
        Ok(config)
    }
}

struct Win {
    window: Arc<Window>,
    surface: Surface<'static>,
    gpu: Gpu,
    config: SurfaceConfiguration,
    /// Reused between frames; reallocated when the swapchain size changes.
    pixmap: Pixmap,
    pointer: PointerState,
}

impl Win {
    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            // Minimized; keep the old configuration until we get a real size.
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.configure();
    }

    fn configure(&self) {
        log::debug!(
            "configuring window surface for {}x{} (format: {:?}, present mode: {:?})",
            self.config.width,
            self.config.height,
            self.config.format,
            self.config.present_mode,
        );
        self.surface.configure(&self.gpu.device, &self.config);
    }

    fn redraw(&mut self, session: &Session) {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err @ (SurfaceError::Outdated | SurfaceError::Lost)) => {
                log::debug!("surface error: {err}");
                self.configure();
                self.window.request_redraw();
                return;
            }
            Err(err) => {
                log::error!("failed to acquire frame: {err}");
                return;
            }
        };

        let size = frame.texture.size();
        if (self.pixmap.width(), self.pixmap.height()) != (size.width, size.height) {
            self.pixmap = Pixmap::new(size.width, size.height, Color::TRANSPARENT);
        }
        session.surface().render(&mut self.pixmap);

        let bytes = match self.config.format {
            TextureFormat::Bgra8Unorm | TextureFormat::Bgra8UnormSrgb => Cow::Owned(
                self.pixmap
                    .pixels()
                    .iter()
                    .flat_map(|c| [c.b, c.g, c.r, c.a])
                    .collect::<Vec<u8>>(),
            ),
            _ => Cow::Borrowed(self.pixmap.as_bytes()),
        };
        self.gpu.queue.write_texture(
            TexelCopyTextureInfo {
                texture: &frame.texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            &bytes,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
        self.gpu.queue.submit(std::iter::empty());

        self.window.pre_present_notify();
        frame.present();
    }
}

impl App {
    pub fn new(config: &Config, session: Session) -> Self {
        Self {
            instance: wgpu::Instance::new(&InstanceDescriptor {
                backends: Backends::PRIMARY,
                ..Default::default()
            }),
            bind: config.bind.clone(),
            initial_size: LogicalSize::new(config.width, config.height),
            session,
            win: None,
        }
    }

    fn create_win(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<Win> {
        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_inner_size(self.initial_size)
                    .with_title(TITLE),
            )?,
        );

        let surface = self.instance.create_surface(window.clone())?;
        let gpu = Gpu::new(&self.instance, &surface)?;

        let size = window.inner_size();
        let config = gpu.surface_config(&surface, size.width.max(1), size.height.max(1))?;
        log::debug!("creating canvas at {}x{}", size.width, size.height);

        let win = Win {
            window,
            surface,
            gpu,
            config,
            pixmap: Pixmap::new(0, 0, Color::TRANSPARENT),
            pointer: PointerState::default(),
        };
        win.configure();
        Ok(win)
    }

    fn dispatch(&mut self, cmd: Cmd) {
        self.session.handle(cmd);
        let Some(win) = &self.win else { return };
        if let Some(status) = self.session.take_status() {
            win.window.set_title(&format!("{TITLE} ({status})"));
        }
        if self.session.take_redraw() {
            win.window.request_redraw();
        }
    }
}

impl ApplicationHandler<Cmd> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.win.is_none() {
            let win = match self.create_win(event_loop) {
                Ok(win) => win,
                Err(e) => {
                    log::error!("could not create window: {e:#}");
                    event_loop.exit();
                    return;
                }
            };
            let size = win.window.inner_size();
            self.session.set_viewport(size.width, size.height);
            win.window.request_redraw();
            self.win = Some(win);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(win) = &mut self.win else { return };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                // Consumed here; the frame below shows everything up to now.
                self.session.take_redraw();
                win.redraw(&self.session);
            }
            WindowEvent::Resized(size) => {
                win.resize(size.width, size.height);
                self.session.set_viewport(size.width, size.height);
                win.window.request_redraw();
            }
            event => {
                if let Some(cmd) = win.pointer.translate(event, &self.bind) {
                    self.dispatch(cmd);
                }
            }
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: Cmd) {
        self.dispatch(event);
    }
}
