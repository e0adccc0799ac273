//! wgpu-backed [`GpuBinding`](super::GpuBinding).
//!
//! wgpu has no current-context model and no explicit swap: a "context" is an
//! adapter/device/queue triple, a "drawable" is a configured surface (or an
//! off-screen texture), and swapping presents the image acquired with
//! [`WgpuSurface::begin_frame`].

mod binding;
mod frame;
mod init;
mod surface;

pub use binding::{WgpuBinding, WgpuConfig, WgpuContext};
pub use frame::GpuFrame;
pub use init::GpuInit;
pub use surface::{SurfaceErrorAction, WgpuSurface};
