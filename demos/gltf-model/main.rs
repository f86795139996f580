//! Loads a glTF model and shades it with the Cook-Torrance PBR pipeline.
//!
//! The model spins about a tilted axis while the overlay exposes the camera
//! FOV and position, the light, and the object tint.
//!
//! Run with: cargo run --example gltf-model

use instant::Duration;
use lustre::{
    Deg, InnerSpace, Quaternion, Rad, Rotation3, Vector3,
    app::{AppConfig, Viewer, ViewerConstructor, run},
    context::{Context, InitContext},
    data_structures::{
        instance::Instance,
        model::{DrawModel, Model},
    },
    egui,
    pipelines::pbr::ShadingUniform,
    resources::load_model_gltf,
};
use wgpu::util::DeviceExt;

struct GltfModel {
    model: Model,
    instance: Instance,
    instance_buffer: wgpu::Buffer,
}

impl GltfModel {
    async fn new(ctx: &InitContext) -> anyhow::Result<Self> {
        let model = load_model_gltf("models/cube.gltf", &ctx.device, &ctx.queue).await?;

        let instance = Instance::new();
        let instance_buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Instance Buffer"),
                contents: bytemuck::cast_slice(&[instance.to_raw()]),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        Ok(Self {
            model,
            instance,
            instance_buffer,
        })
    }
}

impl Viewer for GltfModel {
    fn on_init(&mut self, ctx: &mut Context) {
        ctx.camera.camera.position = [0.0, 0.0, 3.0].into();
        ctx.projection.fovy = Deg(60.0);
        ctx.shading.uniform =
            ShadingUniform::new([1.2, 1.0, 2.0], [1.0, 1.0, 1.0], [1.0, 1.0, 1.0]);
    }

    fn on_update(&mut self, ctx: &Context, _dt: Duration, elapsed: Duration) {
        let axis = Vector3::new(0.5, 1.0, 0.0).normalize();
        self.instance.rotation = Quaternion::from_axis_angle(axis, Rad(elapsed.as_secs_f32()));
        ctx.queue.write_buffer(
            &self.instance_buffer,
            0,
            bytemuck::cast_slice(&[self.instance.to_raw()]),
        );
    }

    fn on_render<'a>(&'a mut self, ctx: &'a Context, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_pipeline(&ctx.pipelines.pbr);
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        render_pass.draw_model(
            &self.model,
            &ctx.camera.bind_group,
            &ctx.shading.bind_group,
        );
    }

    fn on_ui(&mut self, ctx: &mut Context, egui_ctx: &egui::Context) {
        egui::Window::new("glTF Model").show(egui_ctx, |ui| {
            ui.add(
                egui::Slider::new(&mut ctx.projection.fovy.0, 1.0..=179.0).text("Camera FOV"),
            );

            let position = &mut ctx.camera.camera.position;
            drag_vec3(
                ui,
                "Camera Position",
                [&mut position.x, &mut position.y, &mut position.z],
            );

            let [x, y, z] = &mut ctx.shading.uniform.light_position;
            drag_vec3(ui, "Light Position", [x, y, z]);

            ui.horizontal(|ui| {
                ui.color_edit_button_rgb(&mut ctx.shading.uniform.light_color);
                ui.label("Light Color");
            });
            ui.horizontal(|ui| {
                ui.color_edit_button_rgb(&mut ctx.shading.uniform.object_color);
                ui.label("Object Color");
            });
        });
    }
}

fn drag_vec3(ui: &mut egui::Ui, label: &str, values: [&mut f32; 3]) {
    ui.horizontal(|ui| {
        for value in values {
            ui.add(egui::DragValue::new(value).speed(0.1));
        }
        ui.label(label);
    });
}

fn main() -> anyhow::Result<()> {
    let constructor: ViewerConstructor<GltfModel> =
        Box::new(|ctx| Box::pin(async move { GltfModel::new(&ctx).await }));

    run(
        AppConfig {
            title: "gltf-model".to_string(),
            enable_msaa: true,
            sample_count: 4,
            ..Default::default()
        },
        constructor,
    )
}
