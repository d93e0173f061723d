//! WebGPU device initialization via wgpu

use std::sync::Arc;

use parking_lot::Mutex;

/// WebGPU device + queue, plus the last error wgpu reported outside an
/// error scope (device loss, execution faults).
pub struct WgpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub info: wgpu::AdapterInfo,
    pub(crate) uncaptured: Arc<Mutex<Option<String>>>,
}

/// Shared context handle. Identity is `Arc` pointer identity.
pub type WgpuDevice = Arc<WgpuContext>;

impl WgpuContext {
    /// Create a new wgpu context using the best available adapter.
    pub fn new() -> Option<WgpuDevice> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("gpu_invoke"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                ..Default::default()
            },
            None,
        ))
        .ok()?;

        let uncaptured = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&uncaptured);
        device.on_uncaptured_error(Box::new(move |error| {
            log::error!("[wgpu] uncaptured error: {}", error);
            *sink.lock() = Some(error.to_string());
        }));

        Some(Arc::new(WgpuContext {
            device,
            queue,
            info: adapter.get_info(),
            uncaptured,
        }))
    }

    /// Take the error recorded by the uncaptured-error handler, if any.
    pub(crate) fn take_uncaptured_error(&self) -> Option<String> {
        self.uncaptured.lock().take()
    }

    /// Run `f` inside a validation error scope and report what it caught.
    pub(crate) fn validation_scope<T>(&self, f: impl FnOnce() -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }
}
