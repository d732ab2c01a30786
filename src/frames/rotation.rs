// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
use super::target::{ColorTarget, DepthTarget, NameRelease, PrimaryTargets, SecondaryTargets, Target};
use crate::bridge::{BindingId, LockBracket, Session};
use crate::config::{BridgeConfig, ColorRegistration, ConfigError};
use crate::diagnostics::DiagnosticEvent;
use crate::error::{Error, FaultKind, Result};
use crate::imp::{
    DriverError, FramebufferStatus, NativeResource, PrimaryApi, SecondaryApi, SecondaryName,
    TargetKind, TextureDesc,
};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Where a [FrameRotator] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// No targets exist.  [FrameRotator::resize] must be called before the first frame.
    Uninitialized,
    /// Targets exist for the current size; no frame has started since.
    Sized,
    /// At least one frame has started at the current size.
    Rotating,
    /// The device was lost.  Terminal: build a new session and rotator.
    Faulted(FaultKind),
}

/**
Drives per-frame acquisition, registration and release of the shared render targets.

The rotator owns one secondary framebuffer, two secondary names (color and depth) and the
size-dependent targets.  Frames borrow the rotator mutably, so resizing while a frame is in
flight does not compile.
*/
pub struct FrameRotator<P: PrimaryApi, S: SecondaryApi<P>> {
    session: Session<P, S>,
    config: BridgeConfig,
    state: RotationState,
    color_name: SecondaryName,
    depth_name: SecondaryName,
    framebuffer: Option<S::Framebuffer>,
    depth: Option<DepthTarget<P, S>>,
    persistent_color: Option<ColorTarget<P, S>>,
    ///Per-frame color targets that were still locked when their frame ended.
    retired: Vec<ColorTarget<P, S>>,
    frames_begun: u64,
    frames_presented: u64,
    shut_down: bool,
}

impl<P: PrimaryApi, S: SecondaryApi<P>> FrameRotator<P, S> {
    /// Allocates the secondary names and framebuffer.  Targets are created by the first
    /// [Self::resize].
    pub fn new(session: &Session<P, S>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        session.ensure_usable()?;
        let color_name = session.allocate_name(config.name_target)?;
        let depth_name = match session.allocate_name(config.name_target) {
            Ok(name) => name,
            Err(e) => {
                let _ = session.release_name(color_name);
                return Err(e);
            }
        };
        let framebuffer = session.with_secondary(|s| s.create_framebuffer());
        let framebuffer = match framebuffer {
            Ok(fb) => fb,
            Err(e) => {
                let _ = session.release_name(color_name);
                let _ = session.release_name(depth_name);
                return Err(session.driver_error(e, Error::Driver));
            }
        };
        Ok(FrameRotator {
            session: session.clone(),
            config,
            state: RotationState::Uninitialized,
            color_name,
            depth_name,
            framebuffer: Some(framebuffer),
            depth: None,
            persistent_color: None,
            retired: Vec::new(),
            frames_begun: 0,
            frames_presented: 0,
            shut_down: false,
        })
    }

    pub fn state(&self) -> RotationState {
        match self.session.fault() {
            Some(kind) => RotationState::Faulted(kind),
            None => self.state,
        }
    }

    pub fn session(&self) -> &Session<P, S> {
        &self.session
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current target size, once sized.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.depth
            .as_ref()
            .map(|_| (self.config.width, self.config.height))
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn color_name(&self) -> SecondaryName {
        self.color_name
    }

    pub fn depth_name(&self) -> SecondaryName {
        self.depth_name
    }

    fn check_not_faulted(&self) -> Result<()> {
        match self.session.fault() {
            Some(kind) => Err(Error::DeviceFault(kind)),
            None => Ok(()),
        }
    }

    fn driver(&self, e: DriverError) -> Error {
        self.session.driver_error(e, Error::Driver)
    }

    /**
    (Re)creates the size-dependent targets at `width`x`height`.

    Tears down the previous targets first (unregister, release views, drop back buffer
    references), resizes the swap chain, then creates and registers a new depth-stencil
    target.  If any step fails the rotator is left [RotationState::Uninitialized] and the
    resize may be retried.

    Fails with [Error::StillLocked], leaving everything as it was, while a lock bracket holds
    any of the current targets.
    */
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidSize { width, height });
        }
        self.check_not_faulted()?;
        self.session.ensure_usable()?;
        if let Some(id) = self.locked_target() {
            return Err(Error::StillLocked(id));
        }

        self.state = RotationState::Uninitialized;
        self.detach_all();
        self.release_sized_targets()?;
        self.session.with_primary(|p| p.bind_targets(None, None));

        let buffers = self.config.buffer_count;
        self.session
            .with_primary(|p| p.resize_back_buffers(buffers, width, height))
            .map_err(|e| self.driver(e))?;
        self.config.width = width;
        self.config.height = height;

        let desc = TextureDesc::new(width, height, self.config.depth_format);
        let texture = self
            .session
            .with_primary(|p| p.create_depth_stencil(&desc))
            .map_err(|e| self.driver(e))?;
        let view = self
            .session
            .with_primary(|p| p.create_depth_stencil_view(&texture))
            .map_err(|e| self.driver(e))?;
        let binding = self.session.register(
            &texture,
            self.depth_name,
            TargetKind::DepthStencil,
            self.config.access,
        )?;
        self.depth = Some(Target {
            binding,
            view,
            texture,
        });

        if self.config.color_registration == ColorRegistration::Persistent {
            match self.acquire_color() {
                Ok(color) => self.persistent_color = Some(color),
                Err(e) => {
                    if let Some(depth) = self.depth.take() {
                        if let Err(release) = depth.release(&self.session) {
                            self.session.emit(DiagnosticEvent::ReleaseFailed {
                                what: "depth-stencil target",
                                error: release.to_string(),
                            });
                        }
                    }
                    return Err(e);
                }
            }
        }

        let (color_name, depth_name) = (self.color_name, self.depth_name);
        self.session.with_primary(|p| p.set_viewport(width, height));
        if let Some(framebuffer) = &self.framebuffer {
            self.session.with_secondary(|s| {
                s.set_viewport(width, height);
                s.attach(framebuffer, TargetKind::DepthStencil, Some(depth_name));
                s.attach(framebuffer, TargetKind::Color, Some(color_name));
            });
        }
        self.state = RotationState::Sized;
        self.session.emit(DiagnosticEvent::Resized { width, height });
        logwise::trace_sync!(
            "frame targets registered at {width}x{height}",
            width = width,
            height = height
        );
        Ok(())
    }

    fn acquire_color(&mut self) -> Result<ColorTarget<P, S>> {
        let texture = self
            .session
            .with_primary(|p| p.current_back_buffer())
            .map_err(|e| self.driver(e))?;
        let format = texture.desc().format;
        if format != self.config.color_format {
            return Err(ConfigError::BackBufferFormat {
                configured: self.config.color_format,
                actual: format,
            }
            .into());
        }
        let view = self
            .session
            .with_primary(|p| p.create_render_target_view(&texture))
            .map_err(|e| self.driver(e))?;
        let binding = self.session.register(
            &texture,
            self.color_name,
            TargetKind::Color,
            self.config.access,
        )?;
        Ok(Target {
            binding,
            view,
            texture,
        })
    }

    /// The first held target a lock bracket still covers.
    fn locked_target(&self) -> Option<BindingId> {
        let colors = self.retired.iter().chain(self.persistent_color.as_ref());
        colors
            .map(|color| (color.is_locked(&self.session), color.binding.id()))
            .chain(
                self.depth
                    .iter()
                    .map(|depth| (depth.is_locked(&self.session), depth.binding.id())),
            )
            .find_map(|(locked, id)| locked.then_some(id))
    }

    /// Detaches both names from the secondary framebuffer.
    fn detach_all(&self) {
        if let Some(framebuffer) = &self.framebuffer {
            self.session.with_secondary(|s| {
                s.attach(framebuffer, TargetKind::Color, None);
                s.attach(framebuffer, TargetKind::DepthStencil, None);
            });
        }
    }

    /// Releases `target` now, or hands it to the session if a bracket still covers it.
    fn release_or_defer<V: 'static>(&self, target: Target<P, S, V>) -> Result<()> {
        if target.is_locked(&self.session) {
            self.session.defer_until_unlocked(Box::new(target));
            Ok(())
        } else {
            target.release(&self.session)
        }
    }

    fn release_name_or_defer(&self, name: SecondaryName) -> Result<()> {
        match self.session.release_name(name) {
            Err(Error::NameStillBound { .. }) if self.session.brackets().open.is_some() => {
                self.session.defer_until_unlocked(Box::new(NameRelease {
                    session: self.session.clone(),
                    name,
                }));
                Ok(())
            }
            other => other,
        }
    }

    fn release_sized_targets(&mut self) -> Result<()> {
        self.flush_retired()?;
        if let Some(color) = self.persistent_color.take() {
            color.release(&self.session)?;
        }
        if let Some(depth) = self.depth.take() {
            depth.release(&self.session)?;
        }
        Ok(())
    }

    /// Releases a finished frame's color target, or parks it if a bracket still holds it.
    fn retire(&mut self, color: ColorTarget<P, S>) -> Result<()> {
        if color.is_locked(&self.session) {
            self.retired.push(color);
            Ok(())
        } else {
            color.release(&self.session)
        }
    }

    fn flush_retired(&mut self) -> Result<()> {
        let mut first_error = None;
        for color in std::mem::take(&mut self.retired) {
            if color.is_locked(&self.session) {
                self.retired.push(color);
            } else if let Err(e) = color.release(&self.session) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /**
    Starts a frame.

    Waits on the frame latency object if configured, then (in per-frame mode) acquires and
    registers the current back buffer.  Fails with [Error::NotSized] before the first resize
    and with [Error::DeviceFault] once faulted.
    */
    pub fn begin_frame(&mut self) -> Result<Frame<'_, P, S>> {
        self.check_not_faulted()?;
        if self.state == RotationState::Uninitialized {
            return Err(Error::NotSized);
        }
        self.session.ensure_usable()?;
        self.flush_retired()?;

        if let Some(timeout) = self.config.frame_latency_wait {
            let ready = self
                .session
                .with_primary(|p| p.wait_for_frame_latency(timeout))
                .map_err(|e| self.driver(e))?;
            if !ready {
                return Err(Error::LatencyTimeout(timeout));
            }
        }

        let color = match self.config.color_registration {
            ColorRegistration::PerFrame => Some(self.acquire_color()?),
            ColorRegistration::Persistent => None,
        };
        let color_binding = match color.as_ref().or(self.persistent_color.as_ref()) {
            Some(target) => target.binding.id(),
            None => return Err(Error::NotSized),
        };
        let depth_binding = match &self.depth {
            Some(target) => target.binding.id(),
            None => return Err(Error::NotSized),
        };

        if let Some(framebuffer) = &self.framebuffer {
            let color_name = self.color_name;
            let status = self.session.with_secondary(|s| {
                if color.is_some() {
                    s.attach(framebuffer, TargetKind::Color, Some(color_name));
                }
                s.framebuffer_status(framebuffer)
            });
            if status != FramebufferStatus::Complete {
                self.session
                    .emit(DiagnosticEvent::FramebufferIncomplete { status });
            }
        }

        let index = self.frames_begun;
        self.frames_begun += 1;
        self.state = RotationState::Rotating;
        Ok(Frame {
            size: (self.config.width, self.config.height),
            rotator: self,
            color,
            color_binding,
            depth_binding,
            index,
            presented: false,
        })
    }

    fn teardown(&mut self) -> Result<()> {
        self.session.with_primary(|p| {
            p.bind_targets(None, None);
            p.clear_state();
        });
        self.detach_all();
        let mut result = Ok(());
        for color in std::mem::take(&mut self.retired) {
            result = result.and(self.release_or_defer(color));
        }
        if let Some(color) = self.persistent_color.take() {
            result = result.and(self.release_or_defer(color));
        }
        if let Some(depth) = self.depth.take() {
            result = result.and(self.release_or_defer(depth));
        }
        if let Some(framebuffer) = self.framebuffer.take() {
            self.session
                .with_secondary(|s| s.delete_framebuffer(framebuffer));
        }
        result = result.and(self.release_name_or_defer(self.color_name));
        result = result.and(self.release_name_or_defer(self.depth_name));
        self.state = RotationState::Uninitialized;
        self.shut_down = true;
        result
    }

    /**
    Orderly shutdown: clears primary pipeline state, unregisters and releases the persistent
    targets, deletes the framebuffer and returns both names.  The session stays open.

    Targets and names a lock bracket still covers are released when that bracket unlocks.
    */
    pub fn shutdown(mut self) -> Result<()> {
        self.teardown()
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Debug for FrameRotator<P, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameRotator")
            .field("state", &self.state())
            .field("size", &self.size())
            .field("frames_presented", &self.frames_presented)
            .finish()
    }
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Drop for FrameRotator<P, S> {
    fn drop(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(e) = self.teardown() {
            self.session.emit(DiagnosticEvent::ReleaseFailed {
                what: "frame rotator",
                error: e.to_string(),
            });
        }
    }
}

/**
One frame in flight.

Primary work goes through [Frame::primary], secondary work through [Frame::secondary] (which
opens and closes a lock bracket around it).  [Frame::present] ends the frame.  Dropping a frame
without presenting releases its targets without presenting anything.
*/
pub struct Frame<'r, P: PrimaryApi, S: SecondaryApi<P>> {
    rotator: &'r mut FrameRotator<P, S>,
    ///`None` in persistent mode.
    color: Option<ColorTarget<P, S>>,
    color_binding: BindingId,
    depth_binding: BindingId,
    size: (u32, u32),
    index: u64,
    presented: bool,
}

impl<'r, P: PrimaryApi, S: SecondaryApi<P>> Frame<'r, P, S> {
    /// Zero-based index of this frame among all frames begun by the rotator.
    pub fn index(&self) -> u64 {
        self.index
    }
    pub fn color_binding(&self) -> BindingId {
        self.color_binding
    }
    pub fn depth_binding(&self) -> BindingId {
        self.depth_binding
    }
    pub fn bindings(&self) -> [BindingId; 2] {
        [self.color_binding, self.depth_binding]
    }
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn targets(&self) -> Result<(&ColorTarget<P, S>, &DepthTarget<P, S>)> {
        let color = self
            .color
            .as_ref()
            .or(self.rotator.persistent_color.as_ref());
        match (color, self.rotator.depth.as_ref()) {
            (Some(color), Some(depth)) => Ok((color, depth)),
            _ => Err(Error::NotSized),
        }
    }

    /**
    Runs primary-API work with this frame's targets bound.

    The primary API must not touch the targets while a lock bracket is open.  This is
    reported through the observer, not prevented.
    */
    pub fn primary<R>(&self, f: impl FnOnce(&mut P, &PrimaryTargets<'_, P>) -> R) -> Result<R> {
        let session = &self.rotator.session;
        session.ensure_usable()?;
        if let Some(sequence) = session.brackets().open {
            session.emit(DiagnosticEvent::PrimaryAccessWhileLocked { sequence });
        }
        let (color, depth) = self.targets()?;
        let targets = PrimaryTargets {
            color: &color.view,
            depth: &depth.view,
            back_buffer: &color.texture,
            width: self.size.0,
            height: self.size.1,
        };
        Ok(session.with_primary(|p| {
            p.bind_targets(Some(targets.color), Some(targets.depth));
            f(p, &targets)
        }))
    }

    /// Opens a lock bracket over this frame's color and depth bindings.
    pub fn lock(&self) -> Result<FrameLock<'_, P, S>> {
        let bracket = self.rotator.session.lock(&self.bindings())?;
        Ok(FrameLock {
            bracket,
            _frame: PhantomData,
        })
    }

    /// Runs secondary-API work inside a lock bracket over this frame's targets.
    pub fn secondary<R>(
        &self,
        f: impl FnOnce(&mut S, &SecondaryTargets<'_, P, S>) -> R,
    ) -> Result<R> {
        let framebuffer = self.rotator.framebuffer.as_ref().ok_or(Error::NotSized)?;
        let bracket = self.lock()?;
        let targets = SecondaryTargets {
            framebuffer,
            color: self.rotator.color_name,
            depth: self.rotator.depth_name,
            width: self.size.0,
            height: self.size.1,
        };
        let r = self.rotator.session.with_secondary(|s| f(s, &targets));
        bracket.unlock()?;
        Ok(r)
    }

    /**
    Presents the frame, then unregisters its color target and releases the view and back
    buffer reference.

    Nothing is presented if the session has faulted or a lock bracket is open.  Returns the
    frame's index.
    */
    pub fn present(mut self) -> Result<u64> {
        let session = self.rotator.session.clone();
        session.ensure_usable()?;
        if let Some(sequence) = session.brackets().open {
            return Err(Error::PresentWhileLocked(sequence));
        }
        let interval = self.rotator.config.present_interval;
        session
            .with_primary(|p| p.present(interval))
            .map_err(|e| session.driver_error(e, Error::Driver))?;
        self.presented = true;
        let released = match self.color.take() {
            Some(color) => self.rotator.retire(color),
            None => Ok(()),
        };
        self.rotator.frames_presented += 1;
        session.emit(DiagnosticEvent::FramePresented { frame: self.index });
        released.map(|()| self.index)
    }
}

impl<'r, P: PrimaryApi, S: SecondaryApi<P>> Debug for Frame<'r, P, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("color_binding", &self.color_binding)
            .field("depth_binding", &self.depth_binding)
            .finish()
    }
}

impl<'r, P: PrimaryApi, S: SecondaryApi<P>> Drop for Frame<'r, P, S> {
    fn drop(&mut self) {
        if let Some(color) = self.color.take() {
            if let Err(e) = self.rotator.retire(color) {
                self.rotator.session.emit(DiagnosticEvent::ReleaseFailed {
                    what: "frame color target",
                    error: e.to_string(),
                });
            }
        }
        if !self.presented {
            self.rotator
                .session
                .emit(DiagnosticEvent::FrameAbandoned { frame: self.index });
        }
    }
}

/// A lock bracket over a frame's targets.  Borrows the frame, so the frame cannot be
/// presented while it is open.
pub struct FrameLock<'f, P: PrimaryApi, S: SecondaryApi<P>> {
    bracket: LockBracket<P, S>,
    _frame: PhantomData<&'f ()>,
}

impl<'f, P: PrimaryApi, S: SecondaryApi<P>> FrameLock<'f, P, S> {
    pub fn sequence(&self) -> u64 {
        self.bracket.sequence()
    }
    pub fn unlock(self) -> Result<()> {
        self.bracket.unlock()
    }
}

impl<'f, P: PrimaryApi, S: SecondaryApi<P>> Debug for FrameLock<'f, P, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FrameLock").field(&self.bracket).finish()
    }
}
