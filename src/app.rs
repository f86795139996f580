//! Application config and event loop.
//!
//! This module provides the windowed render loop and the [`Viewer`] trait a
//! sample implements to get on screen. The engine owns the frame skeleton:
//! it flushes camera/shading uniforms, opens the scene render pass (with MSAA
//! resolve when configured), hands the pass to the viewer, then drives the
//! debug overlay and presents.
//!
//! # Lifecycle
//!
//! 1. [`run`] builds the event loop and the [`App`] handler
//! 2. On resume, the window and [`Context`] are created and the viewer
//!    constructor runs to completion (loading models and GPU resources)
//! 3. Each frame: `on_update` → uniform writes → `on_render` → `on_ui` →
//!    overlay pass → present
//! 4. Window close exits the loop

use std::{iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    context::{Context, InitContext},
    data_structures::texture::Texture,
    overlay::Overlay,
};

/// Window and frame configuration for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub title: String,
    pub enable_msaa: bool,
    /// MSAA sample count used when `enable_msaa` is set. Must be a power of
    /// two; 4 is supported everywhere wgpu runs.
    pub sample_count: u32,
    pub clear_color: wgpu::Color,
}

impl AppConfig {
    pub(crate) fn samples(&self) -> u32 {
        debug_assert!(
            self.sample_count.is_power_of_two(),
            "MSAA sample count must be a power of two"
        );
        if self.enable_msaa {
            self.sample_count.max(1)
        } else {
            1
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "lustre".to_string(),
            enable_msaa: true,
            sample_count: 4,
            clear_color: wgpu::Color {
                r: 0.2,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
        }
    }
}

/// Trait for implementing a renderable sample.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after construction; configure the context
///    (camera start position, light, clear colour, etc.)
/// 2. `on_window_events()` is called for each winit event the overlay did
///    not consume
/// 3. `on_update()` is called every frame before rendering
/// 4. `on_render()` is called with the frame's render pass
/// 5. `on_ui()` is called to build this frame's debug overlay
pub trait Viewer {
    /// Configure the context once after construction.
    ///
    /// This is the place to set the default background colour, camera start
    /// position or light parameters.
    fn on_init(&mut self, _ctx: &mut Context) {}

    /// Update per-frame state.
    ///
    /// `dt` is the time since the previous frame, `elapsed` the time since
    /// startup. Use for animations and for rewriting instance buffers.
    fn on_update(&mut self, ctx: &Context, dt: Duration, elapsed: Duration);

    /// Record draw calls for this frame.
    fn on_render<'a>(&'a mut self, ctx: &'a Context, render_pass: &mut wgpu::RenderPass<'a>);

    /// Build the debug overlay for this frame.
    ///
    /// The context is mutable so widgets can bind directly to the frame
    /// parameters (camera, projection, shading); edits take effect on the
    /// next frame's uniform flush.
    fn on_ui(&mut self, ctx: &mut Context, egui_ctx: &egui::Context);

    /// Handle window events (keyboard, mouse, etc.) not consumed by the overlay.
    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) {}
}

/// Type alias for a viewer constructor (factory function).
///
/// A viewer constructor takes an [`InitContext`] and asynchronously returns
/// the viewer. This allows lazy initialization and resource loading; a
/// loading failure propagates out of [`run`] as an error.
pub type ViewerConstructor<V> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<V>>>>>;

/// Outcome of a failed [`AppState::render`] call.
enum SurfaceRenderError {
    /// The surface is lost or outdated and should be reconfigured.
    Reconfigure,
    /// Any other surface acquisition failure.
    Other(String),
}

impl std::fmt::Display for SurfaceRenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceRenderError::Reconfigure => write!(f, "surface needs reconfiguration"),
            SurfaceRenderError::Other(e) => write!(f, "{e}"),
        }
    }
}

/// Application state bundle: GPU context, viewer, overlay, and surface status.
struct AppState<V: Viewer> {
    ctx: Context,
    viewer: V,
    overlay: Overlay,
    is_surface_configured: bool,
}

impl<V: Viewer> AppState<V> {
    async fn new(
        window: Arc<Window>,
        config: &AppConfig,
        constructor: ViewerConstructor<V>,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await;
        let mut ctx = match ctx {
            Ok(ctx) => ctx,
            Err(e) => panic!(
                "App initialization failed. Cannot create the main context: {}",
                e
            ),
        };
        let overlay = Overlay::new(&ctx.device, ctx.config.format, &ctx.window);
        let mut viewer = constructor((&ctx).into()).await?;
        viewer.on_init(&mut ctx);
        Ok(Self {
            ctx,
            viewer,
            overlay,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [width, height],
                self.ctx.sample_count,
                "depth_texture",
            );
            if self.ctx.msaa_texture.is_some() {
                self.ctx.msaa_texture = Some(Texture::create_msaa_texture(
                    &self.ctx.device,
                    &self.ctx.config,
                    self.ctx.sample_count,
                ));
            }
            self.overlay
                .resize(width, height, self.ctx.window.scale_factor() as f32);
        }
    }

    fn render(&mut self) -> Result<(), SurfaceRenderError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        // Flush this frame's camera and shading parameters; overlay edits
        // from the previous frame become visible here.
        self.ctx
            .camera
            .uniform
            .update_view_proj(&self.ctx.camera.camera, &self.ctx.projection);
        self.ctx.queue.write_buffer(
            &self.ctx.camera.buffer,
            0,
            bytemuck::cast_slice(&[self.ctx.camera.uniform]),
        );
        self.ctx.queue.write_buffer(
            &self.ctx.shading.buffer,
            0,
            bytemuck::cast_slice(&[self.ctx.shading.uniform]),
        );

        let output = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                return Err(SurfaceRenderError::Reconfigure);
            }
            other => {
                return Err(SurfaceRenderError::Other(format!("{other:?}")));
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            // With MSAA the pass renders into the multisampled target and
            // resolves into the surface texture.
            let (color_view, resolve_target) = match &self.ctx.msaa_texture {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: color_view,
                        resolve_target,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_color),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

            self.viewer.on_render(&self.ctx, &mut render_pass);
        }

        // Build and draw the overlay on top of the resolved frame.
        self.overlay.begin_frame(&self.ctx.window);
        let egui_ctx = self.overlay.context().clone();
        self.viewer.on_ui(&mut self.ctx, &egui_ctx);
        self.overlay.end_frame(&self.ctx.window);
        self.overlay.prepare(&self.ctx.device, &self.ctx.queue);
        self.overlay.render(&mut encoder, &view);

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<V: Viewer + 'static> {
    config: AppConfig,
    async_runtime: tokio::runtime::Runtime,
    state: Option<AppState<V>>,
    // This holds the constructor at the start.
    // We use Option to `take()` it after use.
    constructor: Option<ViewerConstructor<V>>,
    init_error: Option<anyhow::Error>,
    start_time: Instant,
    last_time: Instant,
}

impl<V: Viewer + 'static> App<V> {
    fn new(config: AppConfig, constructor: ViewerConstructor<V>) -> Self {
        let async_runtime = tokio::runtime::Runtime::new().unwrap();
        Self {
            config,
            async_runtime,
            state: None,
            constructor: Some(constructor),
            init_error: None,
            start_time: Instant::now(),
            last_time: Instant::now(),
        }
    }
}

impl<V: Viewer + 'static> ApplicationHandler for App<V> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let constructor = match self.constructor.take() {
            Some(constructor) => constructor,
            // `resumed` fires again when coming back from suspension
            None => return,
        };

        let window_attributes = Window::default_attributes().with_title(&self.config.title);
        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let init_future = AppState::new(window, &self.config, constructor);
        match self.async_runtime.block_on(init_future) {
            Ok(state) => {
                state.ctx.window.request_redraw();
                self.start_time = Instant::now();
                self.last_time = Instant::now();
                self.state = Some(state);
            }
            Err(e) => {
                log::error!("Failed to initialize viewer: {:#}", e);
                self.init_error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        // The overlay gets first pick of input events
        let ui_consumed = state.overlay.handle_input(&state.ctx.window, &event);
        if !ui_consumed {
            state.viewer.on_window_events(&state.ctx, &event);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                let elapsed = self.start_time.elapsed();

                state.viewer.on_update(&state.ctx, dt, elapsed);

                match state.render() {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(SurfaceRenderError::Reconfigure) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Run a viewer to completion.
///
/// Initializes logging, creates the event loop and window, constructs the
/// viewer (asynchronously, so it can load models) and drives frames until
/// the window closes. A failed viewer construction is returned as the error.
pub fn run<V: Viewer + 'static>(
    config: AppConfig,
    constructor: ViewerConstructor<V>,
) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;

    let mut app: App<V> = App::new(config, constructor);

    event_loop.run_app(&mut app)?;

    if let Some(e) = app.init_error.take() {
        return Err(e);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_the_sample_window() {
        let config = AppConfig::default();
        assert!(config.enable_msaa);
        assert_eq!(config.samples(), 4);
        assert_eq!(config.clear_color.r, 0.2);
    }

    #[test]
    fn disabling_msaa_forces_a_single_sample() {
        let config = AppConfig {
            enable_msaa: false,
            sample_count: 8,
            ..Default::default()
        };
        assert_eq!(config.samples(), 1);
    }
}
