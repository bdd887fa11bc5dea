use crate::error::{RenderError, RenderResult};

use super::init::GpuInit;

/// Owns wgpu core objects.
///
/// Headless: there is no surface. Rendering goes to offscreen targets that are
/// read back into the framebuffer.
#[derive(Debug)]
pub struct Gpu {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    scopes: ErrorScopes,
}

/// Guards for error scopes opened by [`Gpu::push_error_scopes`].
#[derive(Default)]
struct ErrorScopes(std::cell::RefCell<Vec<wgpu::ErrorScopeGuard>>);

impl std::fmt::Debug for ErrorScopes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorScopes").field("open", &self.0.borrow().len()).finish()
    }
}

impl Gpu {
    /// Creates a GPU context.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(init: GpuInit) -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await;

        let adapter = match adapter {
            Ok(a) => a,
            Err(_) if init.allow_fallback_adapter => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: init.power_preference,
                    compatible_surface: None,
                    force_fallback_adapter: true,
                })
                .await
                .map_err(|e| RenderError::BackendInit(format!("no fallback adapter: {e}")))?,
            Err(e) => return Err(RenderError::BackendInit(format!("no suitable GPU adapter: {e}"))),
        };

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("ember3d device"),
                required_features: init.required_features,
                required_limits: init.required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| RenderError::BackendInit(format!("failed to create device/queue: {e}")))?;

        Ok(Gpu { adapter, device, queue, scopes: ErrorScopes::default() })
    }

    /// Blocking variant of [`Gpu::new`].
    pub fn new_blocking(init: GpuInit) -> RenderResult<Self> {
        pollster::block_on(Self::new(init))
    }

    pub fn adapter_info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Submits an encoder's commands.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Opens validation and out-of-memory error scopes.
    ///
    /// Every call must be paired with [`Gpu::pop_error_scopes`].
    pub fn push_error_scopes(&self) {
        let mut scopes = self.scopes.0.borrow_mut();
        scopes.push(self.device.push_error_scope(wgpu::ErrorFilter::Validation));
        scopes.push(self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory));
    }

    /// Closes the scopes opened by [`Gpu::push_error_scopes`].
    ///
    /// Returns the first captured error, out-of-memory before validation.
    pub fn pop_error_scopes(&self) -> Option<wgpu::Error> {
        let mut scopes = self.scopes.0.borrow_mut();
        let oom = scopes.pop().and_then(|g| pollster::block_on(g.pop()));
        let validation = scopes.pop().and_then(|g| pollster::block_on(g.pop()));
        oom.or(validation)
    }
}
