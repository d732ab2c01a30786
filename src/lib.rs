// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! dxgl_interop lets two graphics APIs render into the same GPU memory within one frame.

The *primary* API (Direct3D 11) owns the device, the swap chain and presentation.  The
*secondary* API (OpenGL, through `WGL_NV_DX_interop`) aliases the primary's color and
depth-stencil buffers and draws into them directly.  No copies are made; instead the two
APIs take turns.

# Layers

| Layer                         | Type                     | Job                                                                |
|-------------------------------|--------------------------|--------------------------------------------------------------------|
| Interop session               | [bridge::Session]        | Opens and closes the device-level bridge                           |
| Shared resource registry      | [bridge::Binding]        | One live registration per native resource, one per secondary name  |
| Access lock coordinator       | [bridge::LockBracket]    | Hands registered resources to the secondary API and back           |
| Frame buffer rotation manager | [frames::FrameRotator]   | Re-registers the swap chain's current back buffer every frame      |
| Host loop                     | [host::run]              | Window events in, exit code out                                    |

# Frame protocol

1. Acquire the swap chain's current back buffer and register it.
2. Primary API draws.  No lock is held.
3. Lock the color and depth bindings.
4. Secondary API draws.
5. Unlock.
6. Present, then unregister the back buffer and drop every reference to it.

The depth-stencil target is registered once per size.  Resizing unregisters everything and
drops every back buffer reference before the swap chain is resized.

# Threading

Everything here is single-threaded: sessions, bindings and frames are `!Send`.  The
concurrency being coordinated is between two GPU queues, not host threads.

# Backends

[sim] is a simulated driver pair that is always available.  It is strict about the protocol
and records every call, which makes it the backend for tests and headless runs.  On Windows
with the `backend_wgl` feature, `d3d11::D3D11Primary` and `wgl::WglSecondary` talk to the real
drivers.

# Diagnostics

Nothing in the protocol depends on logging.  Every state change is reported to an injected
[diagnostics::DiagnosticObserver]; the default one forwards to `logwise`.
*/

mod imp;

pub mod bridge;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod frames;
pub mod host;

pub use imp::sim;
#[cfg(all(windows, feature = "backend_wgl"))]
pub use imp::{d3d11, wgl};
pub use imp::{
    AccessMode, BufferCount, DriverError, FramebufferStatus, NameTarget, NativeResource,
    PixelFormat, PresentInterval, PrimaryApi, ResourceKey, SecondaryApi, SecondaryName,
    TargetKind, TextureDesc,
};

pub use error::{Error, Result};
