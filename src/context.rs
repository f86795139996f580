use std::sync::Arc;

use anyhow::Context as _;
use cgmath::Deg;
use winit::window::Window;

use crate::{
    app::AppConfig,
    camera::{Camera, CameraResources, Projection},
    data_structures::texture,
    pipelines::pbr::{self, ShadingResources, ShadingUniform},
};

/// The render pipelines owned by the context.
#[derive(Debug)]
pub struct Pipelines {
    pub pbr: wgpu::RenderPipeline,
}

/// Central GPU and window context.
///
/// Owns the device/queue, the surface and its configuration, the depth and
/// multisample targets, and the frame parameters (camera, projection,
/// shading) that viewers mutate and the engine flushes to uniform buffers
/// every frame.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub(crate) msaa_texture: Option<texture::Texture>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub sample_count: u32,
    pub clear_color: wgpu::Color,
    pub camera: CameraResources,
    pub projection: Projection,
    pub shading: ShadingResources,
    pub pipelines: Pipelines,
}

impl Context {
    pub async fn new(window: Arc<Window>, app_config: &AppConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter found")?;
        log::debug!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        log::debug!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // Shader output assumes an sRGB surface texture. Using a different
        // one will result in all the colors coming out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let sample_count = app_config.samples();

        let camera = Camera::new((0.0, 0.0, 3.0));
        let projection = Projection::new(config.width, config.height, Deg(60.0), 0.1, 100.0);
        let camera = CameraResources::new(&device, camera, &projection);

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            sample_count,
            "depth_texture",
        );
        let msaa_texture = (sample_count > 1)
            .then(|| texture::Texture::create_msaa_texture(&device, &config, sample_count));

        let shading = ShadingResources::new(
            &device,
            ShadingUniform::new([1.2, 1.0, 2.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]),
        );

        let pipelines = Pipelines {
            pbr: pbr::mk_pbr_pipeline(
                &device,
                &config,
                &camera.bind_group_layout,
                &shading.bind_group_layout,
                sample_count,
            ),
        };

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            clear_color: app_config.clear_color,
            camera,
            projection,
            shading,
            pipelines,
            window,
            depth_texture,
            msaa_texture,
        })
    }
}

/// The subset of the context a viewer constructor needs to build resources.
///
/// Device and queue are internally reference counted, so this is a cheap
/// clone that can be moved into an async constructor.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            config: ctx.config.clone(),
        }
    }
}
