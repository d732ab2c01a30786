// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Bridge configuration.

The frame loop is parameterized by a [BridgeConfig].  Nothing here is read from the
environment; the host decides the values and passes them in.
*/

use crate::imp::{AccessMode, BufferCount, NameTarget, PixelFormat, PresentInterval};
use std::time::Duration;

/**
How the rotating color target is registered with the secondary API.

Two designs are valid:
* re-register the current back buffer every frame, which works with any flip or discard
  swap chain because the backing resource may change each present;
* register once per size and keep the same name bound, which only works when the swap chain
  has a single back buffer that never rotates.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorRegistration {
    #[default]
    PerFrame,
    Persistent,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("target size {width}x{height} has a zero dimension")]
    ZeroSize { width: u32, height: u32 },
    #[error("color format {0:?} is not a concrete color format")]
    ColorFormat(PixelFormat),
    #[error("depth format {0:?} is not a concrete depth-stencil format")]
    DepthFormat(PixelFormat),
    #[error("vsync interval {0} is outside 1..=4")]
    SyncInterval(u8),
    #[error("persistent color registration needs a single back buffer, not {0}")]
    PersistentNeedsSingleBuffer(u32),
    /// The swap chain's back buffer does not have the configured color format.
    #[error("back buffer format is {actual:?} but the configured color format is {configured:?}")]
    BackBufferFormat {
        configured: PixelFormat,
        actual: PixelFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    pub width: u32,
    pub height: u32,
    pub buffer_count: BufferCount,
    pub present_interval: PresentInterval,
    /// Wait on the swap chain's latency object before acquiring a back buffer.
    /// `Duration::MAX` waits forever.
    pub frame_latency_wait: Option<Duration>,
    pub color_registration: ColorRegistration,
    pub name_target: NameTarget,
    /// The swap chain's back buffer format.  Checked each time a back buffer is acquired.
    pub color_format: PixelFormat,
    pub depth_format: PixelFormat,
    pub access: AccessMode,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            width: 640,
            height: 480,
            buffer_count: BufferCount::DOUBLE,
            present_interval: PresentInterval::Immediate,
            frame_latency_wait: None,
            color_registration: ColorRegistration::PerFrame,
            name_target: NameTarget::Texture2D,
            color_format: PixelFormat::Rgba8Unorm,
            depth_format: PixelFormat::D24UnormS8Uint,
            access: AccessMode::ReadWrite,
        }
    }
}

impl BridgeConfig {
    pub fn new(width: u32, height: u32) -> Self {
        BridgeConfig {
            width,
            height,
            ..Default::default()
        }
    }
    pub fn with_buffer_count(mut self, buffer_count: BufferCount) -> Self {
        self.buffer_count = buffer_count;
        self
    }
    pub fn with_present_interval(mut self, present_interval: PresentInterval) -> Self {
        self.present_interval = present_interval;
        self
    }
    pub fn with_frame_latency_wait(mut self, timeout: Option<Duration>) -> Self {
        self.frame_latency_wait = timeout;
        self
    }
    pub fn with_color_registration(mut self, color_registration: ColorRegistration) -> Self {
        self.color_registration = color_registration;
        self
    }
    pub fn with_name_target(mut self, name_target: NameTarget) -> Self {
        self.name_target = name_target;
        self
    }
    pub fn with_formats(mut self, color: PixelFormat, depth: PixelFormat) -> Self {
        self.color_format = color;
        self.depth_format = depth;
        self
    }
    pub fn with_access(mut self, access: AccessMode) -> Self {
        self.access = access;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroSize {
                width: self.width,
                height: self.height,
            });
        }
        if self.color_format.is_typeless() || self.color_format.is_depth_stencil() {
            return Err(ConfigError::ColorFormat(self.color_format));
        }
        if !self.depth_format.is_depth_stencil() {
            return Err(ConfigError::DepthFormat(self.depth_format));
        }
        if let PresentInterval::VSync(n) = self.present_interval {
            if !(1..=4).contains(&n) {
                return Err(ConfigError::SyncInterval(n));
            }
        }
        if self.color_registration == ColorRegistration::Persistent
            && self.buffer_count != BufferCount::SINGLE
        {
            return Err(ConfigError::PersistentNeedsSingleBuffer(
                self.buffer_count.get(),
            ));
        }
        Ok(())
    }
}
