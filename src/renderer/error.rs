use std::fmt;

/// Failure reported by a [`RenderDevice`](crate::renderer::RenderDevice)
/// implementation while creating or manipulating a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not satisfy the allocation.
    OutOfMemory,
    /// The id passed to the device does not name a live resource.
    InvalidHandle,
    /// The request is well formed but this device cannot service it.
    Unsupported(String),
    /// An error originating from the backend implementation.
    Backend(String),
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::OutOfMemory => write!(f, "device out of memory"),
            DeviceError::InvalidHandle => write!(f, "invalid resource handle"),
            DeviceError::Unsupported(msg) => write!(f, "unsupported operation: {msg}"),
            DeviceError::Backend(msg) => write!(f, "backend error: {msg}"),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Failure while compiling a render-pass blueprint into a live
/// [`RenderPass`](crate::renderer::RenderPass).
///
/// The authoring variants (`NoAttachments`, `ReferenceOutOfBounds`,
/// `DependencyOutOfBounds`) are raised by validation before any GPU
/// allocation happens; the remaining variants wrap a device failure from a
/// specific construction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    /// The blueprint declares no attachments; there is nothing to size the
    /// framebuffer against.
    NoAttachments,
    /// A subpass attachment reference points past the attachment array.
    ReferenceOutOfBounds {
        subpass: usize,
        kind: &'static str,
        index: u32,
        attachment_count: usize,
    },
    /// A dependency endpoint names a subpass the blueprint does not declare.
    DependencyOutOfBounds {
        dependency: usize,
        index: u32,
        subpass_count: usize,
    },
    /// Building attachment `index` (image, view, sampler or layout
    /// transition) failed.
    Attachment { index: usize, source: DeviceError },
    /// The native render-pass object could not be created.
    PassCreation(DeviceError),
    /// The framebuffer could not be created.
    Framebuffer(DeviceError),
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassError::NoAttachments => {
                write!(f, "render pass blueprint declares no attachments")
            }
            PassError::ReferenceOutOfBounds {
                subpass,
                kind,
                index,
                attachment_count,
            } => {
                write!(
                    f,
                    "subpass {subpass} {kind} reference {index} is out of bounds \
                     ({attachment_count} attachments declared)"
                )
            }
            PassError::DependencyOutOfBounds {
                dependency,
                index,
                subpass_count,
            } => {
                write!(
                    f,
                    "dependency {dependency} names subpass {index} \
                     ({subpass_count} subpasses declared)"
                )
            }
            PassError::Attachment { index, source } => {
                write!(f, "attachment {index} construction failed: {source}")
            }
            PassError::PassCreation(err) => {
                write!(f, "render pass creation failed: {err}")
            }
            PassError::Framebuffer(err) => {
                write!(f, "framebuffer creation failed: {err}")
            }
        }
    }
}

impl std::error::Error for PassError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PassError::Attachment { source, .. } => Some(source),
            PassError::PassCreation(err) => Some(err),
            PassError::Framebuffer(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure while compiling a material blueprint.
///
/// A failed compile leaves the material cache untouched; a later call with
/// the same blueprint retries compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialError {
    /// The blueprint names a render pass the asset database does not know.
    UnknownRenderPass { material: String, render_pass: String },
    /// A shader or texture asset the blueprint names could not be resolved.
    MissingAsset { material: String, asset: String },
    /// The shader failed to compile on the device.
    ShaderCompile { material: String, details: String },
    /// A GPU resource needed by the material could not be created.
    Device(DeviceError),
}

impl fmt::Display for MaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaterialError::UnknownRenderPass {
                material,
                render_pass,
            } => {
                write!(
                    f,
                    "material '{material}' targets unknown render pass '{render_pass}'"
                )
            }
            MaterialError::MissingAsset { material, asset } => {
                write!(f, "material '{material}' references missing asset '{asset}'")
            }
            MaterialError::ShaderCompile { material, details } => {
                write!(f, "shader compilation failed for '{material}': {details}")
            }
            MaterialError::Device(err) => {
                write!(f, "material resource creation failed: {err}")
            }
        }
    }
}

impl std::error::Error for MaterialError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MaterialError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for MaterialError {
    fn from(err: DeviceError) -> Self {
        MaterialError::Device(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn pass_error_display_carries_indices() {
        let err = PassError::ReferenceOutOfBounds {
            subpass: 1,
            kind: "color",
            index: 7,
            attachment_count: 2,
        };
        assert_eq!(
            format!("{err}"),
            "subpass 1 color reference 7 is out of bounds (2 attachments declared)"
        );
    }

    #[test]
    fn pass_error_source_is_device_error() {
        let err = PassError::Attachment {
            index: 0,
            source: DeviceError::OutOfMemory,
        };
        assert_eq!(format!("{err}"), "attachment 0 construction failed: device out of memory");
        assert!(err.source().is_some());
    }

    #[test]
    fn material_error_wraps_device_error() {
        let err: MaterialError = DeviceError::OutOfMemory.into();
        assert_eq!(
            format!("{err}"),
            "material resource creation failed: device out of memory"
        );
        assert!(err.source().is_some());
    }
}
