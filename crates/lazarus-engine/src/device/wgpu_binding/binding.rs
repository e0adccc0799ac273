use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::device::{ConfigAttribs, GpuBinding, GpuErrorCode};

use super::surface::{choose_alpha_mode, choose_surface_format, SurfaceKind};
use super::{GpuFrame, GpuInit, WgpuSurface};

/// Negotiated configuration. Color depth is fixed at 8 bits per channel;
/// only the depth/stencil format varies.
#[derive(Debug, Clone)]
pub struct WgpuConfig {
    pub attribs: ConfigAttribs,
    pub depth_format: Option<wgpu::TextureFormat>,
}

/// Adapter + device + queue. Shared contexts clone the same device, which is
/// how wgpu shares objects between threads.
pub struct WgpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    lost: Arc<AtomicBool>,
}

impl WgpuContext {
    /// Set by the device-lost callback or by an unrecoverable acquire.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub(crate) fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    /// Submits the commands recorded for `frame`. Present with
    /// [`FrameCtx::present`](crate::core::FrameCtx::present).
    pub fn submit(&self, frame: GpuFrame) {
        self.queue.submit(std::iter::once(frame.encoder.finish()));
    }
}

/// [`GpuBinding`] over wgpu for one window.
pub struct WgpuBinding<W> {
    window: W,
    init: GpuInit,
    instance: wgpu::Instance,
    last_error: Mutex<GpuErrorCode>,
}

impl<W> WgpuBinding<W>
where
    W: HasWindowHandle + HasDisplayHandle + Clone + Send + Sync + 'static,
{
    pub fn new(window: W, init: GpuInit) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });
        Self {
            window,
            init,
            instance,
            last_error: Mutex::new(GpuErrorCode::Success),
        }
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    fn fail<T>(&self, code: GpuErrorCode) -> Result<T, GpuErrorCode> {
        *self.last_error.lock() = code;
        Err(code)
    }

    fn request_context(&self) -> anyhow::Result<WgpuContext> {
        use anyhow::Context as _;

        let adapter = pollster::block_on(self.instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.init.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("lazarus device"),
            required_features: self.init.required_features,
            required_limits: self.init.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });

        Ok(WgpuContext {
            adapter,
            device,
            queue,
            lost,
        })
    }

    fn depth_texture(
        context: &WgpuContext,
        config: &WgpuConfig,
        width: u32,
        height: u32,
    ) -> Option<wgpu::Texture> {
        let format = config.depth_format?;
        Some(context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lazarus depth"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        }))
    }
}

/// The attributes wgpu can satisfy. Swapchain formats are 8 bits per channel;
/// requests at or below that are met, anything in between (5-6-5) is not.
fn color_supported(attribs: &ConfigAttribs) -> bool {
    [attribs.red, attribs.green, attribs.blue, attribs.alpha]
        .into_iter()
        .all(|bits| matches!(bits, 0 | 4 | 8))
}

fn depth_format_for(attribs: &ConfigAttribs) -> Result<Option<wgpu::TextureFormat>, GpuErrorCode> {
    match (attribs.depth, attribs.stencil) {
        (0, 0) => Ok(None),
        (16, 0) => Ok(Some(wgpu::TextureFormat::Depth16Unorm)),
        (24, 0) => Ok(Some(wgpu::TextureFormat::Depth24Plus)),
        (24, 8) | (0, 8) => Ok(Some(wgpu::TextureFormat::Depth24PlusStencil8)),
        _ => Err(GpuErrorCode::BadAttribute),
    }
}

impl<W> GpuBinding for WgpuBinding<W>
where
    W: HasWindowHandle + HasDisplayHandle + Clone + Send + Sync + 'static,
{
    type Config = WgpuConfig;
    type Context = WgpuContext;
    type Surface = WgpuSurface;

    fn choose_config(&self, attribs: &ConfigAttribs) -> Option<WgpuConfig> {
        if !color_supported(attribs) {
            *self.last_error.lock() = GpuErrorCode::BadMatch;
            return None;
        }
        match depth_format_for(attribs) {
            Ok(depth_format) => Some(WgpuConfig {
                attribs: *attribs,
                depth_format,
            }),
            Err(code) => {
                *self.last_error.lock() = code;
                None
            }
        }
    }

    fn create_context(
        &self,
        _config: &WgpuConfig,
        share: Option<&WgpuContext>,
    ) -> Result<WgpuContext, GpuErrorCode> {
        if let Some(share) = share {
            if share.is_lost() {
                return self.fail(GpuErrorCode::ContextLost);
            }
            return Ok(WgpuContext {
                adapter: share.adapter.clone(),
                device: share.device.clone(),
                queue: share.queue.clone(),
                lost: share.lost.clone(),
            });
        }

        self.request_context().or_else(|e| {
            log::error!("{e:#}");
            self.fail(GpuErrorCode::NotInitialized)
        })
    }

    fn create_window_surface(
        &self,
        context: &WgpuContext,
        config: &WgpuConfig,
        width: u32,
        height: u32,
    ) -> Result<WgpuSurface, GpuErrorCode> {
        if width == 0 || height == 0 {
            return self.fail(GpuErrorCode::BadNativeWindow);
        }

        let surface = match self.instance.create_surface(self.window.clone()) {
            Ok(surface) => surface,
            Err(e) => {
                log::error!("failed to create wgpu surface: {e}");
                return self.fail(GpuErrorCode::BadNativeWindow);
            }
        };

        let caps = surface.get_capabilities(&context.adapter);
        let Some(format) = choose_surface_format(&caps, self.init.prefer_srgb) else {
            return self.fail(GpuErrorCode::BadMatch);
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: self.init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, self.init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: self.init.desired_maximum_frame_latency,
        };
        surface.configure(&context.device, &surface_config);

        Ok(WgpuSurface {
            kind: SurfaceKind::Window {
                surface,
                config: surface_config,
                image: None,
            },
            depth: Self::depth_texture(context, config, width, height),
        })
    }

    fn create_offscreen_surface(
        &self,
        context: &WgpuContext,
        config: &WgpuConfig,
        width: u32,
        height: u32,
    ) -> Result<WgpuSurface, GpuErrorCode> {
        if width == 0 || height == 0 {
            return self.fail(GpuErrorCode::BadParameter);
        }

        let texture = context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lazarus off-screen"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.init.offscreen_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        Ok(WgpuSurface {
            kind: SurfaceKind::Offscreen { texture },
            depth: Self::depth_texture(context, config, width, height),
        })
    }

    /// wgpu has no notion of a current context; only liveness is checked.
    fn make_current(
        &self,
        context: &WgpuContext,
        _draw: &WgpuSurface,
        _read: &WgpuSurface,
    ) -> Result<(), GpuErrorCode> {
        if context.is_lost() {
            return self.fail(GpuErrorCode::ContextLost);
        }
        Ok(())
    }

    fn clear_current(&self) -> Result<(), GpuErrorCode> {
        Ok(())
    }

    fn swap_buffers(&self, context: &WgpuContext, surface: &mut WgpuSurface) -> Result<(), GpuErrorCode> {
        if context.is_lost() {
            return self.fail(GpuErrorCode::ContextLost);
        }
        surface.present();
        Ok(())
    }

    fn resize_surface(
        &self,
        context: &WgpuContext,
        surface: &mut WgpuSurface,
        width: u32,
        height: u32,
    ) -> Result<(), GpuErrorCode> {
        if surface.is_offscreen() {
            return Ok(());
        }
        surface.reconfigure(&context.device, width, height);
        if let Some(depth) = surface.depth.take() {
            let format = depth.format();
            depth.destroy();
            let config = WgpuConfig {
                attribs: ConfigAttribs::default(),
                depth_format: Some(format),
            };
            surface.depth = Self::depth_texture(context, &config, width, height);
        }
        Ok(())
    }

    fn destroy_surface(&self, surface: WgpuSurface) -> Result<(), GpuErrorCode> {
        let WgpuSurface { kind, depth } = surface;
        if let Some(depth) = depth {
            depth.destroy();
        }
        if let SurfaceKind::Offscreen { texture } = kind {
            texture.destroy();
        }
        Ok(())
    }

    /// Drops this handle's device reference. Shared contexts keep the device
    /// alive until the last one goes.
    fn destroy_context(&self, context: WgpuContext) -> Result<(), GpuErrorCode> {
        drop(context);
        Ok(())
    }

    fn last_error(&self) -> GpuErrorCode {
        *self.last_error.lock()
    }
}
