//! Immediate-mode debug overlay.
//!
//! Wraps the egui lifecycle (input → frame → tessellation → GPU upload →
//! draw) behind a small per-frame API. The engine drives it around the scene
//! pass:
//!
//! ```text
//! handle_input()          // forward winit events to egui
//! begin_frame(window)     // start an egui pass
//! … build UI via context() …
//! end_frame(window)       // tessellate shapes, capture texture delta
//! prepare(device, queue)  // upload textures & geometry to GPU
//! render(encoder, view)   // record the egui render pass
//! ```
//!
//! The overlay renders into the resolved surface view with a load op, so it
//! composes over whatever the scene pass produced regardless of MSAA.

use winit::event::WindowEvent;
use winit::window::Window;

/// Egui-based debug overlay pass.
pub struct Overlay {
    /// Shared egui context (cheap to clone — reference-counted internally).
    egui_ctx: egui::Context,
    /// Bridges winit events into egui raw input.
    state: egui_winit::State,
    /// Egui's wgpu backend — owns GPU pipelines, textures, and vertex buffers.
    renderer: egui_wgpu::Renderer,

    /// Tessellated draw data produced by [`end_frame`](Self::end_frame),
    /// consumed by [`prepare`](Self::prepare) and [`render`](Self::render).
    clipped_primitives: Vec<egui::ClippedPrimitive>,
    /// Texture create/update/free operations accumulated during the egui frame.
    textures_delta: egui::TexturesDelta,
    /// Current viewport size and DPI, kept in sync via [`resize`](Self::resize).
    screen_descriptor: egui_wgpu::ScreenDescriptor,
}

impl Overlay {
    /// Creates the overlay for a window.
    ///
    /// Initializes the egui context, winit integration state, and wgpu
    /// renderer. The initial screen descriptor is derived from `window`'s
    /// inner size and scale factor.
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Window) -> Self {
        let size = window.inner_size();
        let egui_ctx = egui::Context::default();

        let id = egui_ctx.viewport_id();
        let state = egui_winit::State::new(egui_ctx.clone(), id, window, None, None, None);

        let renderer =
            egui_wgpu::Renderer::new(device, output_format, egui_wgpu::RendererOptions::default());

        Self {
            egui_ctx,
            state,
            renderer,
            clipped_primitives: Vec::new(),
            textures_delta: egui::TexturesDelta::default(),
            screen_descriptor: egui_wgpu::ScreenDescriptor {
                size_in_pixels: [size.width, size.height],
                pixels_per_point: window.scale_factor() as f32,
            },
        }
    }

    /// Forwards a winit window event to egui.
    ///
    /// Returns `true` if egui consumed the event (the viewer should skip its
    /// own handling). Mouse-button releases are always reported as unconsumed
    /// so that camera controls etc. can detect "drag end".
    pub fn handle_input(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let response = self.state.on_window_event(window, event);

        if let WindowEvent::MouseInput {
            state: winit::event::ElementState::Released,
            ..
        } = event
        {
            return false;
        }

        response.consumed
    }

    /// Begins a new egui frame. Call once per frame **before** building UI.
    pub fn begin_frame(&mut self, window: &Window) {
        let raw_input = self.state.take_egui_input(window);
        self.egui_ctx.begin_pass(raw_input);
    }

    /// Ends the current egui frame.
    ///
    /// Tessellates all accumulated shapes into clipped primitives and
    /// captures the texture delta for the prepare phase. Also forwards
    /// platform output (cursor icon, clipboard, IME) back to winit.
    pub fn end_frame(&mut self, window: &Window) {
        let egui::FullOutput {
            shapes,
            textures_delta,
            platform_output,
            ..
        } = self.egui_ctx.end_pass();

        self.state.handle_platform_output(window, platform_output);
        self.textures_delta = textures_delta;
        self.clipped_primitives = self
            .egui_ctx
            .tessellate(shapes, self.egui_ctx.pixels_per_point());
    }

    /// Returns the shared [`egui::Context`] for building UI widgets.
    pub fn context(&self) -> &egui::Context {
        &self.egui_ctx
    }

    /// Updates the screen descriptor after a window resize.
    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f32) {
        self.screen_descriptor.size_in_pixels = [width, height];
        self.screen_descriptor.pixels_per_point = scale_factor;
    }

    /// Uploads egui textures and tessellated geometry to the GPU.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        // 1. Upload new / updated egui-managed textures.
        for (id, delta) in &self.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, delta);
        }

        // 2. Upload vertex & index buffers via a temporary encoder.
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("egui buffer upload"),
        });
        let user_cmd_bufs = self.renderer.update_buffers(
            device,
            queue,
            &mut encoder,
            &self.clipped_primitives,
            &self.screen_descriptor,
        );
        let mut cmd_bufs: Vec<wgpu::CommandBuffer> = Vec::with_capacity(1 + user_cmd_bufs.len());
        cmd_bufs.push(encoder.finish());
        cmd_bufs.extend(user_cmd_bufs);
        queue.submit(cmd_bufs);

        // 3. Free textures that egui no longer needs.
        for id in &self.textures_delta.free {
            self.renderer.free_texture(id);
        }

        // 4. Clear the delta so it is not re-processed next frame.
        self.textures_delta.set.clear();
        self.textures_delta.free.clear();
    }

    /// Records the overlay render pass onto the (resolved) surface view.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, surface_view: &wgpu::TextureView) {
        let mut rpass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        self.renderer
            .render(&mut rpass, &self.clipped_primitives, &self.screen_descriptor);
    }
}
