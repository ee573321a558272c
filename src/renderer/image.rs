use serde::{Deserialize, Serialize};

/// Pixel format of an image or attachment.
///
/// `Swapchain` defers the choice to the device's surface format and is
/// resolved during render-pass construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    Depth24Plus,
    Depth32Float,
    Swapchain,
}

impl ImageFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, ImageFormat::Depth24Plus | ImageFormat::Depth32Float)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleCount {
    Sample1,
    Sample2,
    Sample4,
    Sample8,
    Sample16,
}

impl SampleCount {
    pub fn as_u32(self) -> u32 {
        match self {
            SampleCount::Sample1 => 1,
            SampleCount::Sample2 => 2,
            SampleCount::Sample4 => 4,
            SampleCount::Sample8 => 8,
            SampleCount::Sample16 => 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageTiling {
    Optimal,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreOp {
    Store,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    PresentSrc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ImageUsageFlags: u32 {
        const TRANSFER_SRC             = 1 << 0;
        const TRANSFER_DST             = 1 << 1;
        const SAMPLED                  = 1 << 2;
        const STORAGE                  = 1 << 3;
        const COLOR_ATTACHMENT         = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        const TRANSIENT_ATTACHMENT     = 1 << 6;
        const INPUT_ATTACHMENT         = 1 << 7;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MemoryPropertyFlags: u32 {
        const DEVICE_LOCAL     = 1 << 0;
        const HOST_VISIBLE     = 1 << 1;
        const HOST_COHERENT    = 1 << 2;
        const LAZILY_ALLOCATED = 1 << 3;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ImageAspectFlags: u32 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AccessFlags: u32 {
        const INPUT_ATTACHMENT_READ          = 1 << 0;
        const SHADER_READ                    = 1 << 1;
        const SHADER_WRITE                   = 1 << 2;
        const COLOR_ATTACHMENT_READ          = 1 << 3;
        const COLOR_ATTACHMENT_WRITE         = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT_READ  = 1 << 5;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 6;
        const TRANSFER_READ                  = 1 << 7;
        const TRANSFER_WRITE                 = 1 << 8;
        const MEMORY_READ                    = 1 << 9;
        const MEMORY_WRITE                   = 1 << 10;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PipelineStageFlags: u32 {
        const TOP_OF_PIPE             = 1 << 0;
        const VERTEX_INPUT            = 1 << 1;
        const VERTEX_SHADER           = 1 << 2;
        const FRAGMENT_SHADER         = 1 << 3;
        const EARLY_FRAGMENT_TESTS    = 1 << 4;
        const LATE_FRAGMENT_TESTS     = 1 << 5;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 6;
        const TRANSFER                = 1 << 7;
        const BOTTOM_OF_PIPE          = 1 << 8;
        const ALL_GRAPHICS            = 1 << 9;
        const ALL_COMMANDS            = 1 << 10;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct DependencyFlags: u32 {
        const BY_REGION    = 1 << 0;
        const VIEW_LOCAL   = 1 << 1;
        const DEVICE_GROUP = 1 << 2;
    }
}

/// Parameters for a backing image allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub layer_count: u32,
    pub samples: SampleCount,
    pub format: ImageFormat,
    pub tiling: ImageTiling,
    pub usage: ImageUsageFlags,
    pub memory: MemoryPropertyFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerDescriptor {
    pub label: String,
    pub mip_levels: u32,
    pub filter: Filter,
}

/// Parameters for a sampled texture upload. Pixel data is always tightly
/// packed RGBA8 from the asset database's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_map_to_powers_of_two() {
        assert_eq!(SampleCount::Sample1.as_u32(), 1);
        assert_eq!(SampleCount::Sample4.as_u32(), 4);
        assert_eq!(SampleCount::Sample16.as_u32(), 16);
    }

    #[test]
    fn depth_formats_are_classified() {
        assert!(ImageFormat::Depth24Plus.is_depth());
        assert!(ImageFormat::Depth32Float.is_depth());
        assert!(!ImageFormat::Bgra8Unorm.is_depth());
    }

    #[test]
    fn flags_round_trip_through_serde() {
        let usage = ImageUsageFlags::COLOR_ATTACHMENT | ImageUsageFlags::SAMPLED;
        let json = serde_json::to_string(&usage).unwrap();
        let back: ImageUsageFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(usage, back);
    }
}
