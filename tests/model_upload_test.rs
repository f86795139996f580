//! Headless GPU smoke test: requests a device without a window and uploads
//! the demo model. Needs a working GPU driver, so it is gated behind the
//! `integration-tests` feature.

#[test]
#[cfg(feature = "integration-tests")]
fn should_upload_cube_model_headless() {
    use lustre::resources::load_model_gltf;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime");

    runtime.block_on(async {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .expect("No adapter available for integration test");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .expect("Failed to request device");

        let model = load_model_gltf("models/cube.gltf", &device, &queue)
            .await
            .expect("Failed to load the demo model");

        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.meshes[0].num_elements, 36);
        assert!(model.meshes[0].material_index < model.materials.len());
        // Base color and metallic-roughness are embedded in the asset.
        assert_eq!(model.textures.len(), 2);
        let material = &model.materials[0];
        assert_eq!(material.base_color_index, Some(0));
        assert_eq!(material.metallic_roughness_index, Some(1));
    });
}
