use super::{GpuFrame, WgpuContext};

/// Outcome of a failed swapchain acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; the next acquire should succeed.
    Reconfigured,
    /// Transient; skip this frame.
    SkipFrame,
    /// The device cannot continue (typically out of memory).
    DeviceLost,
}

pub(crate) enum SurfaceKind {
    Window {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        image: Option<wgpu::SurfaceTexture>,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// Drawable created by [`WgpuBinding`](super::WgpuBinding).
pub struct WgpuSurface {
    pub(crate) kind: SurfaceKind,
    pub(crate) depth: Option<wgpu::Texture>,
}

impl WgpuSurface {
    pub fn format(&self) -> wgpu::TextureFormat {
        match &self.kind {
            SurfaceKind::Window { config, .. } => config.format,
            SurfaceKind::Offscreen { texture } => texture.format(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match &self.kind {
            SurfaceKind::Window { config, .. } => (config.width, config.height),
            SurfaceKind::Offscreen { texture } => (texture.width(), texture.height()),
        }
    }

    pub fn is_offscreen(&self) -> bool {
        matches!(self.kind, SurfaceKind::Offscreen { .. })
    }

    pub fn depth_view(&self) -> Option<wgpu::TextureView> {
        self.depth
            .as_ref()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    /// Acquires the next image and opens an encoder for it.
    ///
    /// Returns `None` when the frame should be skipped. An acquire failure the
    /// device cannot recover from marks `ctx` lost, so the next swap fails and
    /// the lifecycle rebuilds the context.
    pub fn begin_frame(&mut self, ctx: &WgpuContext) -> Option<GpuFrame> {
        let view = match &mut self.kind {
            SurfaceKind::Window {
                surface,
                config,
                image,
            } => {
                if image.is_none() {
                    match surface.get_current_texture() {
                        Ok(texture) => *image = Some(texture),
                        Err(err) => {
                            log::debug!("swapchain acquire failed: {err}");
                            let action = map_surface_error(surface, &ctx.device, config, err);
                            if action == SurfaceErrorAction::DeviceLost {
                                ctx.mark_lost();
                            }
                            return None;
                        }
                    }
                }
                image
                    .as_ref()?
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default())
            }
            SurfaceKind::Offscreen { texture } => {
                texture.create_view(&wgpu::TextureViewDescriptor::default())
            }
        };

        let encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lazarus frame encoder"),
            });
        Some(GpuFrame { view, encoder })
    }

    /// Presents the acquired image, if one is pending.
    pub(crate) fn present(&mut self) {
        if let SurfaceKind::Window { image, .. } = &mut self.kind {
            if let Some(texture) = image.take() {
                texture.present();
            }
        }
    }

    pub(crate) fn reconfigure(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let SurfaceKind::Window {
            surface,
            config,
            image,
        } = &mut self.kind
        else {
            return;
        };
        // wgpu rejects 0x0 configurations; keep the old one until a real size arrives.
        if width == 0 || height == 0 {
            return;
        }
        image.take();
        config.width = width;
        config.height = height;
        surface.configure(device, config);
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let fallback = caps.formats.first().copied()?;
    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(format) = preferred.into_iter().find(|f| caps.formats.contains(f)) {
            return Some(format);
        }
    }
    Some(fallback)
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

fn map_surface_error(
    surface: &wgpu::Surface<'_>,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if config.width > 0 && config.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::DeviceLost,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
