// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Frame buffer rotation.

A [FrameRotator] owns the frame-to-frame lifecycle of the render targets the two APIs share.
Each frame it acquires the swap chain's current back buffer, registers it, lets both APIs render,
presents, and unregisters it again.  The depth-stencil target is registered once per size.

```
# use dxgl_interop::{bridge::Session, config::BridgeConfig, frames::FrameRotator, sim};
let (primary, secondary) = sim::device(sim::SimOptions::default());
let session = Session::open(primary, secondary).unwrap();
let mut rotator = FrameRotator::new(&session, BridgeConfig::new(640, 480)).unwrap();
rotator.resize(640, 480).unwrap();
let frame = rotator.begin_frame().unwrap();
frame.primary(|p, t| p.clear_render_target(t.color, [0.0, 0.0, 0.0, 1.0])).unwrap();
frame.secondary(|s, t| s.draw(t.framebuffer)).unwrap();
frame.present().unwrap();
rotator.shutdown().unwrap();
session.close().unwrap();
```
*/

mod rotation;
mod target;

pub use rotation::{Frame, FrameLock, FrameRotator, RotationState};
pub use target::{PrimaryTargets, SecondaryTargets};
