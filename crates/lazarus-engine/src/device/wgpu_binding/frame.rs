/// Work recorded against the swapchain image acquired for this frame.
///
/// Submit it with [`WgpuContext::submit`](super::WgpuContext::submit) before
/// presenting. The image itself stays with the surface until the swap.
pub struct GpuFrame {
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
