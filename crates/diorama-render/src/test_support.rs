//! Headless device for GPU tests. Returns `None` where no adapter exists.

pub(crate) fn create_test_adapter() -> Option<wgpu::Adapter> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: None,
            })
            .await
            .ok()
    })
}

pub(crate) fn create_test_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let adapter = create_test_adapter()?;
    create_device_for(&adapter)
}

pub(crate) fn create_device_for(adapter: &wgpu::Adapter) -> Option<(wgpu::Device, wgpu::Queue)> {
    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).ok()
}
