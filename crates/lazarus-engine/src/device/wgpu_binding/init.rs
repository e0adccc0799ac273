/// Construction parameters for [`WgpuBinding`](super::WgpuBinding).
///
/// Only settings a concrete backend requirement needs belong here.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends the instance may pick from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,

    /// Pick an sRGB swapchain format when the surface offers one.
    pub prefer_srgb: bool,

    /// FIFO is the only mode every platform guarantees.
    pub present_mode: wgpu::PresentMode,

    /// Requested alpha mode. Falls back to the first supported one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,

    /// Latency hint; backends are free to ignore it.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Color format of off-screen surfaces, which have no capabilities to ask.
    pub fn offscreen_format(&self) -> wgpu::TextureFormat {
        if self.prefer_srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}
