// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Backend seam.

The bridge talks to two driver APIs.  The *primary* owns the device, the swap chain and native
resource lifetime; the *secondary* aliases primary resources through the interop extension.
Each is abstracted by a trait here so the protocol code in [crate::bridge] and [crate::frames]
is written once.

Backends:
* [sim] - a simulated driver pair, always available.  Used for tests and headless runs.
* `d3d11` / `wgl` - Direct3D 11 + WGL_NV_DX_interop, windows only.
*/

use crate::diagnostics::DiagnosticObserver;
use crate::error::FaultKind;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use std::time::Duration;

pub mod sim;

#[cfg(all(windows, feature = "backend_wgl"))]
pub mod d3d11;
#[cfg(all(windows, feature = "backend_wgl"))]
pub mod wgl;

/// Pixel formats the bridge knows how to reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba8Typeless,
    R24G8Typeless,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8X24Uint,
}

impl PixelFormat {
    /// Typeless formats have no concrete interpretation the secondary API could alias.
    pub const fn is_typeless(self) -> bool {
        matches!(self, PixelFormat::Rgba8Typeless | PixelFormat::R24G8Typeless)
    }

    pub const fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            PixelFormat::D24UnormS8Uint | PixelFormat::D32Float | PixelFormat::D32FloatS8X24Uint
        )
    }
}

/// Shape of a native 2D resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub sample_count: u32,
}

impl TextureDesc {
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        TextureDesc {
            width,
            height,
            format,
            sample_count: 1,
        }
    }
}

/// What a binding is attached as on the secondary side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Color,
    DepthStencil,
}

impl Display for TargetKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Color => write!(f, "color"),
            TargetKind::DepthStencil => write!(f, "depth-stencil"),
        }
    }
}

/// Secondary-API access intent, mirroring `WGL_ACCESS_*_NV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    ReadOnly,
    #[default]
    ReadWrite,
    WriteDiscard,
}

impl AccessMode {
    pub const fn raw(self) -> u32 {
        match self {
            AccessMode::ReadOnly => 0x0000,
            AccessMode::ReadWrite => 0x0001,
            AccessMode::WriteDiscard => 0x0002,
        }
    }
}

/// Which kind of secondary object a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameTarget {
    #[default]
    Texture2D,
    Renderbuffer,
}

/**
A secondary-API object name (a GL texture or renderbuffer name).

Names are allocated by the secondary API before registration and stay owned by it; a binding
only borrows the name for as long as it lives.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecondaryName {
    raw: u32,
    target: NameTarget,
}

impl SecondaryName {
    pub const fn new(raw: u32, target: NameTarget) -> Self {
        SecondaryName { raw, target }
    }
    pub const fn raw(self) -> u32 {
        self.raw
    }
    pub const fn target(self) -> NameTarget {
        self.target
    }
}

impl Display for SecondaryName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.target {
            NameTarget::Texture2D => write!(f, "texture {}", self.raw),
            NameTarget::Renderbuffer => write!(f, "renderbuffer {}", self.raw),
        }
    }
}

/// Identity of a native resource, stable for the resource's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceKey(pub usize);

/// Swap chain buffer count.  DXGI allows at most 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferCount(u32);

impl BufferCount {
    pub const SINGLE: BufferCount = BufferCount(1);
    pub const DOUBLE: BufferCount = BufferCount(2);
    pub const TRIPLE: BufferCount = BufferCount(3);
    pub const MAX: u32 = 16;

    /// Returns `None` outside `1..=16`.
    pub const fn new(count: u32) -> Option<Self> {
        if count == 0 || count > Self::MAX {
            None
        } else {
            Some(BufferCount(count))
        }
    }
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Present interval.  `VSync(n)` waits for `n` vertical blanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresentInterval {
    #[default]
    Immediate,
    VSync(u8),
}

impl PresentInterval {
    pub const fn sync_interval(self) -> u32 {
        match self {
            PresentInterval::Immediate => 0,
            PresentInterval::VSync(n) => n as u32,
        }
    }
}

/// Result of a secondary framebuffer completeness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    MissingAttachment,
    Unsupported,
    Other(u32),
}

/// Errors reported by a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("the secondary driver does not expose the interop extension")]
    ExtensionMissing,
    #[error("device incompatible with the interop bridge: {0}")]
    DeviceIncompatible(String),
    #[error("device lost ({0})")]
    DeviceLost(FaultKind),
    #[error("{call} failed with code {code:#x}")]
    CallFailed { call: &'static str, code: u32 },
    #[error("{0} is not supported by this backend")]
    Unsupported(&'static str),
}

impl DriverError {
    pub fn fault(&self) -> Option<FaultKind> {
        match self {
            DriverError::DeviceLost(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// A native GPU resource owned by the primary API.
pub trait NativeResource {
    fn key(&self) -> ResourceKey;
    fn desc(&self) -> TextureDesc;
}

/**
The API that owns the device, the swap chain and presentation.

Views and textures release their native object when dropped.
*/
pub trait PrimaryApi: 'static {
    type Texture: NativeResource + Debug;
    type RenderTargetView: Debug;
    type DepthStencilView: Debug;

    /// Fetches the swap chain's current back buffer.  The returned reference must be dropped
    /// before the swap chain can be resized.
    fn current_back_buffer(&mut self) -> Result<Self::Texture, DriverError>;
    fn resize_back_buffers(
        &mut self,
        buffers: BufferCount,
        width: u32,
        height: u32,
    ) -> Result<(), DriverError>;
    /// Waits on the swap chain's frame latency object.  `Ok(false)` means the wait timed out.
    fn wait_for_frame_latency(&mut self, timeout: Duration) -> Result<bool, DriverError>;
    fn create_depth_stencil(&mut self, desc: &TextureDesc) -> Result<Self::Texture, DriverError>;
    fn create_render_target_view(
        &mut self,
        texture: &Self::Texture,
    ) -> Result<Self::RenderTargetView, DriverError>;
    fn create_depth_stencil_view(
        &mut self,
        texture: &Self::Texture,
    ) -> Result<Self::DepthStencilView, DriverError>;
    fn bind_targets(
        &mut self,
        color: Option<&Self::RenderTargetView>,
        depth: Option<&Self::DepthStencilView>,
    );
    fn set_viewport(&mut self, width: u32, height: u32);
    fn present(&mut self, interval: PresentInterval) -> Result<(), DriverError>;
    fn clear_state(&mut self);
}

/**
The API that draws into primary resources through the interop extension.

Generic over the primary so each secondary backend states which primaries it can bridge to.
*/
pub trait SecondaryApi<P: PrimaryApi>: 'static {
    type Bridge: Debug;
    type Object: Copy + Debug;
    type Framebuffer: Debug;

    fn open_device(&mut self, primary: &P) -> Result<Self::Bridge, DriverError>;
    fn close_device(&mut self, bridge: Self::Bridge) -> Result<(), DriverError>;

    fn gen_name(&mut self, target: NameTarget) -> Result<SecondaryName, DriverError>;
    fn delete_name(&mut self, name: SecondaryName);

    fn register_object(
        &mut self,
        bridge: &Self::Bridge,
        resource: &P::Texture,
        name: SecondaryName,
        access: AccessMode,
    ) -> Result<Self::Object, DriverError>;
    fn unregister_object(
        &mut self,
        bridge: &Self::Bridge,
        object: Self::Object,
    ) -> Result<(), DriverError>;
    fn lock_objects(
        &mut self,
        bridge: &Self::Bridge,
        objects: &[Self::Object],
    ) -> Result<(), DriverError>;
    fn unlock_objects(
        &mut self,
        bridge: &Self::Bridge,
        objects: &[Self::Object],
    ) -> Result<(), DriverError>;

    fn create_framebuffer(&mut self) -> Result<Self::Framebuffer, DriverError>;
    fn delete_framebuffer(&mut self, framebuffer: Self::Framebuffer);
    /// Attaches `name` (or detaches, for `None`) at the attachment point for `kind`.
    fn attach(
        &mut self,
        framebuffer: &Self::Framebuffer,
        kind: TargetKind,
        name: Option<SecondaryName>,
    );
    fn framebuffer_status(&mut self, framebuffer: &Self::Framebuffer) -> FramebufferStatus;
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Routes driver debug output to `observer`.  Backends without a debug channel ignore it.
    fn install_debug_hook(&mut self, observer: Rc<dyn DiagnosticObserver>) {
        let _ = observer;
    }
}
