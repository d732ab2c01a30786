// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Simulated driver pair.

[SimPrimary] behaves like a D3D11 device with a DXGI swap chain, [SimSecondary] like a GL
context with `WGL_NV_DX_interop`.  Both share one [SimProbe]-visible state.  The simulation
is strict where the real drivers are strict, so protocol bugs show up as errors:

* `ResizeBuffers` fails while anything still references a back buffer.
* Locking a locked object, or unlocking an unlocked one, fails.
* Dropping the last reference to a texture that is still registered panics.  In the real
  drivers that is undefined behavior.

Where the real drivers would silently produce garbage, the simulation records a *violation*
instead: secondary draws outside a lock bracket, primary draws inside one, presenting a locked
buffer.

Faults can be injected with [SimProbe::inject_present_fault] and [SimProbe::lose_device].
*/

use crate::diagnostics::{DiagnosticEvent, DiagnosticObserver, Severity};
use crate::error::FaultKind;
use crate::imp::{
    AccessMode, BufferCount, DriverError, FramebufferStatus, NameTarget, NativeResource,
    PixelFormat, PresentInterval, PrimaryApi, ResourceKey, SecondaryApi, SecondaryName,
    TargetKind, TextureDesc,
};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};
use std::time::Duration;

const DXGI_ERROR_INVALID_CALL: u32 = 0x887A_0001;
const ERROR_INVALID_HANDLE: u32 = 0x6;
const ERROR_BUSY: u32 = 0xAA;
const ERROR_NOT_LOCKED: u32 = 0x9E;

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub extension_available: bool,
    pub device_compatible: bool,
    pub width: u32,
    pub height: u32,
    pub buffer_count: BufferCount,
    pub color_format: PixelFormat,
    /// Flip-model swap chains hand out a different back buffer after every present.
    pub flip_model: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        SimOptions {
            extension_available: true,
            device_compatible: true,
            width: 640,
            height: 480,
            buffer_count: BufferCount::DOUBLE,
            color_format: PixelFormat::Rgba8Unorm,
            flip_model: true,
        }
    }
}

/// Which API wrote to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writer {
    Primary,
    Secondary,
}

/// One driver call, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimCall {
    OpenDevice,
    CloseDevice,
    Register {
        object: u64,
        texture: u64,
        name: SecondaryName,
    },
    Unregister {
        object: u64,
    },
    Lock {
        objects: Vec<u64>,
    },
    Unlock {
        objects: Vec<u64>,
    },
    AcquireBackBuffer {
        texture: u64,
    },
    ResizeBuffers {
        width: u32,
        height: u32,
        buffers: u32,
    },
    WaitLatency,
    PrimaryDraw {
        texture: u64,
    },
    SecondaryDraw {
        framebuffer: u64,
    },
    Present {
        texture: u64,
        sync_interval: u32,
    },
}

/// A back buffer as it was handed to the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedFrame {
    pub texture: u64,
    pub width: u32,
    pub height: u32,
    pub writes: Vec<Writer>,
}

#[derive(Debug)]
struct Registration {
    texture: u64,
    name: SecondaryName,
    locked: bool,
}

#[derive(Debug, Default)]
struct FramebufferState {
    color: Option<SecondaryName>,
    depth: Option<SecondaryName>,
}

struct SimState {
    options: SimOptions,
    next_id: u64,
    next_name: u32,
    width: u32,
    height: u32,
    buffer_count: BufferCount,
    back_buffers: Vec<Rc<TextureInner>>,
    current: usize,
    device_lost: Option<FaultKind>,
    pending_present_fault: Option<FaultKind>,
    fail_next_registration: bool,
    latency_ready: bool,
    bridge: Option<u64>,
    names: HashSet<SecondaryName>,
    registrations: HashMap<u64, Registration>,
    framebuffers: HashMap<u64, FramebufferState>,
    writes: HashMap<u64, Vec<Writer>>,
    log: Vec<SimCall>,
    violations: Vec<String>,
    presented: Vec<PresentedFrame>,
    primary_viewport: (u32, u32),
    secondary_viewport: (u32, u32),
    state_clears: u32,
    live_handles: usize,
    debug_hook: Option<Rc<dyn DiagnosticObserver>>,
}

impl SimState {
    fn new(options: SimOptions) -> Self {
        let mut s = SimState {
            width: options.width,
            height: options.height,
            buffer_count: options.buffer_count,
            options,
            next_id: 1,
            next_name: 1,
            back_buffers: Vec::new(),
            current: 0,
            device_lost: None,
            pending_present_fault: None,
            fail_next_registration: false,
            latency_ready: true,
            bridge: None,
            names: HashSet::new(),
            registrations: HashMap::new(),
            framebuffers: HashMap::new(),
            writes: HashMap::new(),
            log: Vec::new(),
            violations: Vec::new(),
            presented: Vec::new(),
            primary_viewport: (0, 0),
            secondary_viewport: (0, 0),
            state_clears: 0,
            live_handles: 0,
            debug_hook: None,
        };
        s.back_buffers = s.make_back_buffers();
        s
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn make_back_buffers(&mut self) -> Vec<Rc<TextureInner>> {
        let desc = TextureDesc::new(self.width, self.height, self.options.color_format);
        (0..self.buffer_count.get())
            .map(|_| {
                Rc::new(TextureInner {
                    id: self.next_id(),
                    desc,
                    handles: Cell::new(0),
                })
            })
            .collect()
    }

    fn check_device(&self) -> Result<(), DriverError> {
        match self.device_lost {
            Some(kind) => Err(DriverError::DeviceLost(kind)),
            None => Ok(()),
        }
    }

    fn registration_for_texture(&self, texture: u64) -> Option<&Registration> {
        self.registrations.values().find(|r| r.texture == texture)
    }

    fn registration_for_name(&self, name: SecondaryName) -> Option<&Registration> {
        self.registrations.values().find(|r| r.name == name)
    }

    fn violation(&mut self, message: String) {
        if let Some(hook) = &self.debug_hook {
            hook.observe(&DiagnosticEvent::DriverMessage {
                severity: Severity::High,
                message: message.clone(),
            });
        }
        self.violations.push(message);
    }
}

fn new_state(options: SimOptions) -> Rc<RefCell<SimState>> {
    Rc::new(RefCell::new(SimState::new(options)))
}

/// Creates a connected primary/secondary pair.
pub fn device(options: SimOptions) -> (SimPrimary, SimSecondary) {
    let state = new_state(options);
    (
        SimPrimary {
            state: state.clone(),
        },
        SimSecondary { state },
    )
}

struct TextureInner {
    id: u64,
    desc: TextureDesc,
    ///Outstanding [SimTexture] handles.
    handles: Cell<usize>,
}

/// A reference to a simulated texture.  Views hold one too, like COM views AddRef their
/// resource.
pub struct SimTexture {
    inner: Rc<TextureInner>,
    state: Weak<RefCell<SimState>>,
}

impl SimTexture {
    fn new(inner: Rc<TextureInner>, state: &Rc<RefCell<SimState>>) -> Self {
        inner.handles.set(inner.handles.get() + 1);
        state.borrow_mut().live_handles += 1;
        SimTexture {
            inner,
            state: Rc::downgrade(state),
        }
    }
    pub fn id(&self) -> u64 {
        self.inner.id
    }
}

impl Clone for SimTexture {
    fn clone(&self) -> Self {
        self.inner.handles.set(self.inner.handles.get() + 1);
        if let Some(state) = self.state.upgrade() {
            if let Ok(mut s) = state.try_borrow_mut() {
                s.live_handles += 1;
            }
        }
        SimTexture {
            inner: self.inner.clone(),
            state: self.state.clone(),
        }
    }
}

impl Drop for SimTexture {
    fn drop(&mut self) {
        let remaining = self.inner.handles.get() - 1;
        self.inner.handles.set(remaining);
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let Ok(mut s) = state.try_borrow_mut() else {
            return;
        };
        s.live_handles -= 1;
        let registered = s.registration_for_texture(self.inner.id).is_some();
        drop(s);
        if remaining == 0 && registered && !std::thread::panicking() {
            panic!(
                "texture {} released while still registered with the interop bridge",
                self.inner.id
            );
        }
    }
}

impl Debug for SimTexture {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTexture")
            .field("id", &self.inner.id)
            .field("desc", &self.inner.desc)
            .finish()
    }
}

impl NativeResource for SimTexture {
    fn key(&self) -> ResourceKey {
        ResourceKey(self.inner.id as usize)
    }
    fn desc(&self) -> TextureDesc {
        self.inner.desc
    }
}

#[derive(Debug)]
pub struct SimRenderTargetView {
    texture: SimTexture,
}

impl SimRenderTargetView {
    pub fn texture(&self) -> &SimTexture {
        &self.texture
    }
}

#[derive(Debug)]
pub struct SimDepthStencilView {
    texture: SimTexture,
}

impl SimDepthStencilView {
    pub fn texture(&self) -> &SimTexture {
        &self.texture
    }
}

/// Simulated D3D11 device, immediate context and swap chain.
pub struct SimPrimary {
    state: Rc<RefCell<SimState>>,
}

impl Debug for SimPrimary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimPrimary").finish_non_exhaustive()
    }
}

impl SimPrimary {
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: self.state.clone(),
        }
    }

    fn draw(&mut self, texture: &SimTexture) {
        let mut s = self.state.borrow_mut();
        let id = texture.id();
        s.log.push(SimCall::PrimaryDraw { texture: id });
        if s.registration_for_texture(id).is_some_and(|r| r.locked) {
            s.violation(format!("primary API wrote texture {id} while it was locked"));
        }
        s.writes.entry(id).or_default().push(Writer::Primary);
    }

    /// Primary-API workload: clears a render target.
    pub fn clear_render_target(&mut self, view: &SimRenderTargetView, _rgba: [f32; 4]) {
        self.draw(&view.texture);
    }

    /// Primary-API workload: clears a depth-stencil target.
    pub fn clear_depth_stencil(&mut self, view: &SimDepthStencilView, _depth: f32, _stencil: u8) {
        self.draw(&view.texture);
    }
}

impl PrimaryApi for SimPrimary {
    type Texture = SimTexture;
    type RenderTargetView = SimRenderTargetView;
    type DepthStencilView = SimDepthStencilView;

    fn current_back_buffer(&mut self) -> Result<SimTexture, DriverError> {
        let inner = {
            let mut s = self.state.borrow_mut();
            s.check_device()?;
            let inner = s.back_buffers[s.current].clone();
            s.log.push(SimCall::AcquireBackBuffer { texture: inner.id });
            inner
        };
        Ok(SimTexture::new(inner, &self.state))
    }

    fn resize_back_buffers(
        &mut self,
        buffers: BufferCount,
        width: u32,
        height: u32,
    ) -> Result<(), DriverError> {
        let mut s = self.state.borrow_mut();
        s.check_device()?;
        let referenced = s.back_buffers.iter().any(|b| {
            b.handles.get() > 0 || s.registration_for_texture(b.id).is_some()
        });
        if referenced {
            return Err(DriverError::CallFailed {
                call: "IDXGISwapChain::ResizeBuffers",
                code: DXGI_ERROR_INVALID_CALL,
            });
        }
        s.log.push(SimCall::ResizeBuffers {
            width,
            height,
            buffers: buffers.get(),
        });
        for b in std::mem::take(&mut s.back_buffers) {
            s.writes.remove(&b.id);
        }
        s.width = width;
        s.height = height;
        s.buffer_count = buffers;
        s.current = 0;
        s.back_buffers = s.make_back_buffers();
        Ok(())
    }

    fn wait_for_frame_latency(&mut self, _timeout: Duration) -> Result<bool, DriverError> {
        let mut s = self.state.borrow_mut();
        s.check_device()?;
        s.log.push(SimCall::WaitLatency);
        Ok(s.latency_ready)
    }

    fn create_depth_stencil(&mut self, desc: &TextureDesc) -> Result<SimTexture, DriverError> {
        let inner = {
            let mut s = self.state.borrow_mut();
            s.check_device()?;
            Rc::new(TextureInner {
                id: s.next_id(),
                desc: *desc,
                handles: Cell::new(0),
            })
        };
        Ok(SimTexture::new(inner, &self.state))
    }

    fn create_render_target_view(
        &mut self,
        texture: &SimTexture,
    ) -> Result<SimRenderTargetView, DriverError> {
        self.state.borrow().check_device()?;
        Ok(SimRenderTargetView {
            texture: texture.clone(),
        })
    }

    fn create_depth_stencil_view(
        &mut self,
        texture: &SimTexture,
    ) -> Result<SimDepthStencilView, DriverError> {
        self.state.borrow().check_device()?;
        Ok(SimDepthStencilView {
            texture: texture.clone(),
        })
    }

    fn bind_targets(
        &mut self,
        _color: Option<&SimRenderTargetView>,
        _depth: Option<&SimDepthStencilView>,
    ) {
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.state.borrow_mut().primary_viewport = (width, height);
    }

    fn present(&mut self, interval: PresentInterval) -> Result<(), DriverError> {
        let mut s = self.state.borrow_mut();
        s.check_device()?;
        if let Some(kind) = s.pending_present_fault.take() {
            s.device_lost = Some(kind);
            return Err(DriverError::DeviceLost(kind));
        }
        let texture = s.back_buffers[s.current].id;
        if s.registration_for_texture(texture).is_some_and(|r| r.locked) {
            s.violation(format!("presented texture {texture} while it was locked"));
        }
        s.log.push(SimCall::Present {
            texture,
            sync_interval: interval.sync_interval(),
        });
        let writes = s.writes.remove(&texture).unwrap_or_default();
        let (width, height) = (s.width, s.height);
        s.presented.push(PresentedFrame {
            texture,
            width,
            height,
            writes,
        });
        if s.options.flip_model {
            s.current = (s.current + 1) % s.back_buffers.len();
        }
        Ok(())
    }

    fn clear_state(&mut self) {
        self.state.borrow_mut().state_clears += 1;
    }
}

#[derive(Debug)]
pub struct SimBridge(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimObject(u64);

#[derive(Debug)]
pub struct SimFramebuffer(u64);

/// Simulated GL context with `WGL_NV_DX_interop`.
pub struct SimSecondary {
    state: Rc<RefCell<SimState>>,
}

impl Debug for SimSecondary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimSecondary").finish_non_exhaustive()
    }
}

impl SimSecondary {
    pub fn probe(&self) -> SimProbe {
        SimProbe {
            state: self.state.clone(),
        }
    }

    /// Secondary-API workload: draws into every attachment of `framebuffer`.
    pub fn draw(&mut self, framebuffer: &SimFramebuffer) {
        let mut s = self.state.borrow_mut();
        s.log.push(SimCall::SecondaryDraw {
            framebuffer: framebuffer.0,
        });
        let attached: Vec<SecondaryName> = match s.framebuffers.get(&framebuffer.0) {
            Some(fb) => fb.color.iter().chain(fb.depth.iter()).copied().collect(),
            None => {
                s.violation(format!("draw to deleted framebuffer {}", framebuffer.0));
                return;
            }
        };
        for name in attached {
            let target = s.registration_for_name(name).map(|r| (r.texture, r.locked));
            match target {
                None => s.violation(format!("secondary API drew to unregistered {name}")),
                Some((texture, false)) => {
                    s.violation(format!(
                        "secondary API wrote texture {texture} through {name} without a lock"
                    ));
                    s.writes.entry(texture).or_default().push(Writer::Secondary);
                }
                Some((texture, true)) => {
                    s.writes.entry(texture).or_default().push(Writer::Secondary);
                }
            }
        }
    }
}

impl SecondaryApi<SimPrimary> for SimSecondary {
    type Bridge = SimBridge;
    type Object = SimObject;
    type Framebuffer = SimFramebuffer;

    fn open_device(&mut self, primary: &SimPrimary) -> Result<SimBridge, DriverError> {
        let mut s = self.state.borrow_mut();
        if !s.options.extension_available {
            return Err(DriverError::ExtensionMissing);
        }
        if !Rc::ptr_eq(&self.state, &primary.state) {
            return Err(DriverError::DeviceIncompatible(
                "device belongs to a different adapter".to_string(),
            ));
        }
        if !s.options.device_compatible {
            return Err(DriverError::DeviceIncompatible(
                "software driver type".to_string(),
            ));
        }
        s.check_device()?;
        let id = s.next_id();
        s.bridge = Some(id);
        s.log.push(SimCall::OpenDevice);
        Ok(SimBridge(id))
    }

    fn close_device(&mut self, bridge: SimBridge) -> Result<(), DriverError> {
        let mut s = self.state.borrow_mut();
        if s.bridge != Some(bridge.0) {
            return Err(DriverError::CallFailed {
                call: "wglDXCloseDeviceNV",
                code: ERROR_INVALID_HANDLE,
            });
        }
        s.bridge = None;
        s.registrations.clear();
        s.log.push(SimCall::CloseDevice);
        Ok(())
    }

    fn gen_name(&mut self, target: NameTarget) -> Result<SecondaryName, DriverError> {
        let mut s = self.state.borrow_mut();
        let name = SecondaryName::new(s.next_name, target);
        s.next_name += 1;
        s.names.insert(name);
        Ok(name)
    }

    fn delete_name(&mut self, name: SecondaryName) {
        self.state.borrow_mut().names.remove(&name);
    }

    fn register_object(
        &mut self,
        bridge: &SimBridge,
        resource: &SimTexture,
        name: SecondaryName,
        _access: AccessMode,
    ) -> Result<SimObject, DriverError> {
        let mut s = self.state.borrow_mut();
        s.check_device()?;
        if s.bridge != Some(bridge.0) || !s.names.contains(&name) {
            return Err(DriverError::CallFailed {
                call: "wglDXRegisterObjectNV",
                code: ERROR_INVALID_HANDLE,
            });
        }
        if std::mem::take(&mut s.fail_next_registration)
            || s.registration_for_texture(resource.id()).is_some()
        {
            return Err(DriverError::CallFailed {
                call: "wglDXRegisterObjectNV",
                code: ERROR_BUSY,
            });
        }
        let object = s.next_id();
        s.registrations.insert(
            object,
            Registration {
                texture: resource.id(),
                name,
                locked: false,
            },
        );
        s.log.push(SimCall::Register {
            object,
            texture: resource.id(),
            name,
        });
        Ok(SimObject(object))
    }

    fn unregister_object(
        &mut self,
        bridge: &SimBridge,
        object: SimObject,
    ) -> Result<(), DriverError> {
        let mut s = self.state.borrow_mut();
        if s.bridge != Some(bridge.0) {
            return Err(DriverError::CallFailed {
                call: "wglDXUnregisterObjectNV",
                code: ERROR_INVALID_HANDLE,
            });
        }
        match s.registrations.get(&object.0) {
            None => {
                return Err(DriverError::CallFailed {
                    call: "wglDXUnregisterObjectNV",
                    code: ERROR_INVALID_HANDLE,
                });
            }
            Some(r) if r.locked => {
                return Err(DriverError::CallFailed {
                    call: "wglDXUnregisterObjectNV",
                    code: ERROR_BUSY,
                });
            }
            Some(_) => {}
        }
        s.registrations.remove(&object.0);
        s.log.push(SimCall::Unregister { object: object.0 });
        Ok(())
    }

    fn lock_objects(&mut self, bridge: &SimBridge, objects: &[SimObject]) -> Result<(), DriverError> {
        let mut s = self.state.borrow_mut();
        s.check_device()?;
        if s.bridge != Some(bridge.0) {
            return Err(DriverError::CallFailed {
                call: "wglDXLockObjectsNV",
                code: ERROR_INVALID_HANDLE,
            });
        }
        for object in objects {
            match s.registrations.get(&object.0) {
                None => {
                    return Err(DriverError::CallFailed {
                        call: "wglDXLockObjectsNV",
                        code: ERROR_INVALID_HANDLE,
                    });
                }
                Some(r) if r.locked => {
                    return Err(DriverError::CallFailed {
                        call: "wglDXLockObjectsNV",
                        code: ERROR_BUSY,
                    });
                }
                Some(_) => {}
            }
        }
        for object in objects {
            if let Some(r) = s.registrations.get_mut(&object.0) {
                r.locked = true;
            }
        }
        s.log.push(SimCall::Lock {
            objects: objects.iter().map(|o| o.0).collect(),
        });
        Ok(())
    }

    fn unlock_objects(
        &mut self,
        bridge: &SimBridge,
        objects: &[SimObject],
    ) -> Result<(), DriverError> {
        let mut s = self.state.borrow_mut();
        if s.bridge != Some(bridge.0) {
            return Err(DriverError::CallFailed {
                call: "wglDXUnlockObjectsNV",
                code: ERROR_INVALID_HANDLE,
            });
        }
        if objects
            .iter()
            .any(|o| !s.registrations.get(&o.0).is_some_and(|r| r.locked))
        {
            return Err(DriverError::CallFailed {
                call: "wglDXUnlockObjectsNV",
                code: ERROR_NOT_LOCKED,
            });
        }
        for object in objects {
            if let Some(r) = s.registrations.get_mut(&object.0) {
                r.locked = false;
            }
        }
        s.log.push(SimCall::Unlock {
            objects: objects.iter().map(|o| o.0).collect(),
        });
        Ok(())
    }

    fn create_framebuffer(&mut self) -> Result<SimFramebuffer, DriverError> {
        let mut s = self.state.borrow_mut();
        let id = s.next_id();
        s.framebuffers.insert(id, FramebufferState::default());
        Ok(SimFramebuffer(id))
    }

    fn delete_framebuffer(&mut self, framebuffer: SimFramebuffer) {
        self.state.borrow_mut().framebuffers.remove(&framebuffer.0);
    }

    fn attach(&mut self, framebuffer: &SimFramebuffer, kind: TargetKind, name: Option<SecondaryName>) {
        let mut s = self.state.borrow_mut();
        if let Some(fb) = s.framebuffers.get_mut(&framebuffer.0) {
            match kind {
                TargetKind::Color => fb.color = name,
                TargetKind::DepthStencil => fb.depth = name,
            }
        }
    }

    fn framebuffer_status(&mut self, framebuffer: &SimFramebuffer) -> FramebufferStatus {
        let s = self.state.borrow();
        let Some(fb) = s.framebuffers.get(&framebuffer.0) else {
            return FramebufferStatus::Unsupported;
        };
        let attached: Vec<SecondaryName> = fb.color.iter().chain(fb.depth.iter()).copied().collect();
        if attached.is_empty() {
            return FramebufferStatus::MissingAttachment;
        }
        //a name with no registered storage is an incomplete attachment
        if attached
            .iter()
            .any(|n| s.registration_for_name(*n).is_none())
        {
            return FramebufferStatus::IncompleteAttachment;
        }
        FramebufferStatus::Complete
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.state.borrow_mut().secondary_viewport = (width, height);
    }

    fn install_debug_hook(&mut self, observer: Rc<dyn DiagnosticObserver>) {
        self.state.borrow_mut().debug_hook = Some(observer);
    }
}

/// Read access to the simulation plus fault injection.
#[derive(Clone)]
pub struct SimProbe {
    state: Rc<RefCell<SimState>>,
}

impl Debug for SimProbe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimProbe").finish_non_exhaustive()
    }
}

impl SimProbe {
    pub fn log(&self) -> Vec<SimCall> {
        self.state.borrow().log.clone()
    }
    pub fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }
    pub fn presented(&self) -> Vec<PresentedFrame> {
        self.state.borrow().presented.clone()
    }
    pub fn registrations(&self) -> usize {
        self.state.borrow().registrations.len()
    }
    pub fn locked_registrations(&self) -> usize {
        self.state
            .borrow()
            .registrations
            .values()
            .filter(|r| r.locked)
            .count()
    }
    pub fn bridge_open(&self) -> bool {
        self.state.borrow().bridge.is_some()
    }
    pub fn swap_chain_size(&self) -> (u32, u32) {
        let s = self.state.borrow();
        (s.width, s.height)
    }
    pub fn viewports(&self) -> ((u32, u32), (u32, u32)) {
        let s = self.state.borrow();
        (s.primary_viewport, s.secondary_viewport)
    }
    pub fn allocated_names(&self) -> usize {
        self.state.borrow().names.len()
    }
    pub fn framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }
    /// Outstanding texture references held outside the driver.
    pub fn live_texture_handles(&self) -> usize {
        self.state.borrow().live_handles
    }
    pub fn state_clears(&self) -> u32 {
        self.state.borrow().state_clears
    }
    /// The next present fails with a lost device, and the device stays lost.
    pub fn inject_present_fault(&self, kind: FaultKind) {
        self.state.borrow_mut().pending_present_fault = Some(kind);
    }
    /// Loses the device immediately; every later device call fails.
    pub fn lose_device(&self, kind: FaultKind) {
        self.state.borrow_mut().device_lost = Some(kind);
    }
    /// The next registration is refused by the driver.
    pub fn fail_next_registration(&self) {
        self.state.borrow_mut().fail_next_registration = true;
    }
    /// Controls whether the frame latency wait succeeds or times out.
    pub fn set_latency_ready(&self, ready: bool) {
        self.state.borrow_mut().latency_ready = ready;
    }
}
