use std::fmt;

use super::{GpuBinding, LifecycleError};

/// Depth/stencil format requested by the application.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum DepthFormat {
    #[default]
    None,
    Depth16,
    Depth24,
    Depth24Stencil8,
}

impl DepthFormat {
    /// Returns `(depth_bits, stencil_bits)`.
    pub const fn bits(self) -> (u8, u8) {
        match self {
            Self::None => (0, 0),
            Self::Depth16 => (16, 0),
            Self::Depth24 => (24, 0),
            Self::Depth24Stencil8 => (24, 8),
        }
    }
}

/// Pixel-format attributes probed against the binding.
///
/// A zero channel size means "don't care".
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct ConfigAttribs {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
    pub depth: u8,
    pub stencil: u8,
}

impl ConfigAttribs {
    pub const fn rgba8888(depth: u8, stencil: u8) -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            depth,
            stencil,
        }
    }

    pub const fn rgb565(depth: u8, stencil: u8) -> Self {
        Self {
            red: 5,
            green: 6,
            blue: 5,
            alpha: 0,
            depth,
            stencil,
        }
    }

    pub const fn any_color(depth: u8, stencil: u8) -> Self {
        Self {
            red: 0,
            green: 0,
            blue: 0,
            alpha: 0,
            depth,
            stencil,
        }
    }

    /// 12-bit color, no depth, no stencil. Last resort on every ladder.
    pub const fn minimal() -> Self {
        Self {
            red: 4,
            green: 4,
            blue: 4,
            alpha: 0,
            depth: 0,
            stencil: 0,
        }
    }
}

impl fmt::Display for ConfigAttribs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Red:{} Green:{} Blue:{} Alpha:{} Depth:{} Stencil:{}",
            self.red, self.green, self.blue, self.alpha, self.depth, self.stencil
        )
    }
}

/// Builds the ordered candidate list for `depth`.
///
/// Color formats get laxer along each rung. Requests deeper than 16 bits retry
/// the same colors at 16-bit depth (without stencil) before the minimal
/// fallback.
pub fn config_ladder(depth: DepthFormat) -> Vec<ConfigAttribs> {
    let (depth_bits, stencil_bits) = depth.bits();
    let mut ladder = Vec::with_capacity(7);

    if depth_bits > 0 {
        ladder.push(ConfigAttribs::rgba8888(depth_bits, stencil_bits));
        ladder.push(ConfigAttribs::rgb565(depth_bits, stencil_bits));
        ladder.push(ConfigAttribs::any_color(depth_bits, stencil_bits));
        if depth_bits > 16 {
            ladder.push(ConfigAttribs::rgba8888(16, 0));
            ladder.push(ConfigAttribs::rgb565(16, 0));
            ladder.push(ConfigAttribs::any_color(16, 0));
        }
    } else {
        ladder.push(ConfigAttribs::rgba8888(0, 0));
        ladder.push(ConfigAttribs::rgb565(0, 0));
    }

    ladder.push(ConfigAttribs::minimal());
    ladder
}

/// Returns the first candidate accepted by `probe`, in ladder order.
pub fn select_first<C>(
    ladder: &[ConfigAttribs],
    mut probe: impl FnMut(&ConfigAttribs) -> Option<C>,
) -> Option<(C, ConfigAttribs)> {
    ladder
        .iter()
        .find_map(|attribs| probe(attribs).map(|config| (config, *attribs)))
}

/// Negotiates a configuration for `depth` with `binding`.
pub fn select_config<B: GpuBinding + ?Sized>(
    binding: &B,
    depth: DepthFormat,
) -> Result<(B::Config, ConfigAttribs), LifecycleError> {
    let ladder = config_ladder(depth);
    match select_first(&ladder, |attribs| binding.choose_config(attribs)) {
        Some((config, attribs)) => {
            log::debug!("selected config: {attribs}");
            Ok((config, attribs))
        }
        None => Err(LifecycleError::NoConfig {
            code: binding.last_error(),
        }),
    }
}
