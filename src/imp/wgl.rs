// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
OpenGL secondary backend over `WGL_NV_DX_interop`.

The host must make a GL context current on the calling thread and load the `gl` function
pointers (`gl::load_with`) before creating a [WglSecondary].  Every call assumes that context is
still current.
*/

use super::d3d11::{D3D11Primary, D3D11Texture};
use crate::diagnostics::{DiagnosticEvent, DiagnosticObserver, Severity};
use crate::imp::{
    AccessMode, DriverError, FramebufferStatus, NameTarget, SecondaryApi, SecondaryName,
    TargetKind,
};
use gl::types::{GLchar, GLenum, GLint, GLsizei, GLuint, GLvoid};
use std::ffi::CStr;
use std::rc::Rc;
use windows::Win32::Foundation::GetLastError;
use windows::Win32::Graphics::OpenGL::wglGetProcAddress;
use windows::core::{Interface, PCSTR};

type WglDxOpenDeviceNv = unsafe extern "system" fn(dx_device: *mut GLvoid) -> *mut GLvoid;
type WglDxCloseDeviceNv = unsafe extern "system" fn(h_device: *mut GLvoid) -> i32;
type WglDxRegisterObjectNv = unsafe extern "system" fn(
    h_device: *mut GLvoid,
    dx_object: *mut GLvoid,
    name: GLuint,
    obj_type: GLenum,
    access: GLenum,
) -> *mut GLvoid;
type WglDxUnregisterObjectNv =
    unsafe extern "system" fn(h_device: *mut GLvoid, h_object: *mut GLvoid) -> i32;
type WglDxLockObjectsNv =
    unsafe extern "system" fn(h_device: *mut GLvoid, count: GLint, h_objects: *mut *mut GLvoid) -> i32;
type WglDxUnlockObjectsNv =
    unsafe extern "system" fn(h_device: *mut GLvoid, count: GLint, h_objects: *mut *mut GLvoid) -> i32;

struct InteropFunctions {
    open_device: WglDxOpenDeviceNv,
    close_device: WglDxCloseDeviceNv,
    register_object: WglDxRegisterObjectNv,
    unregister_object: WglDxUnregisterObjectNv,
    lock_objects: WglDxLockObjectsNv,
    unlock_objects: WglDxUnlockObjectsNv,
}

impl InteropFunctions {
    /// `None` if any entry point is missing.
    fn load() -> Option<Self> {
        unsafe {
            let load = |name: &CStr| -> Option<*mut GLvoid> {
                let addr = wglGetProcAddress(PCSTR(name.as_ptr() as *const u8))?;
                let ptr = addr as usize as *mut GLvoid;
                if ptr.is_null() { None } else { Some(ptr) }
            };
            Some(InteropFunctions {
                open_device: std::mem::transmute::<*mut GLvoid, WglDxOpenDeviceNv>(load(
                    c"wglDXOpenDeviceNV",
                )?),
                close_device: std::mem::transmute::<*mut GLvoid, WglDxCloseDeviceNv>(load(
                    c"wglDXCloseDeviceNV",
                )?),
                register_object: std::mem::transmute::<*mut GLvoid, WglDxRegisterObjectNv>(load(
                    c"wglDXRegisterObjectNV",
                )?),
                unregister_object: std::mem::transmute::<*mut GLvoid, WglDxUnregisterObjectNv>(
                    load(c"wglDXUnregisterObjectNV")?,
                ),
                lock_objects: std::mem::transmute::<*mut GLvoid, WglDxLockObjectsNv>(load(
                    c"wglDXLockObjectsNV",
                )?),
                unlock_objects: std::mem::transmute::<*mut GLvoid, WglDxUnlockObjectsNv>(load(
                    c"wglDXUnlockObjectsNV",
                )?),
            })
        }
    }
}

#[derive(Debug)]
pub struct WglBridge(*mut GLvoid);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WglObject(*mut GLvoid);

#[derive(Debug)]
pub struct WglFramebuffer(GLuint);

fn last_error(call: &'static str) -> DriverError {
    DriverError::CallFailed {
        call,
        code: unsafe { GetLastError() }.0,
    }
}

const fn gl_target(target: NameTarget) -> GLenum {
    match target {
        NameTarget::Texture2D => gl::TEXTURE_2D,
        NameTarget::Renderbuffer => gl::RENDERBUFFER,
    }
}

const fn attachment(kind: TargetKind) -> GLenum {
    match kind {
        TargetKind::Color => gl::COLOR_ATTACHMENT0,
        TargetKind::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
    }
}

/// OpenGL context with `WGL_NV_DX_interop`.
pub struct WglSecondary {
    functions: Option<InteropFunctions>,
    ///Kept alive for as long as GL may call back into it.
    debug_hook: Option<Box<Rc<dyn DiagnosticObserver>>>,
}

impl std::fmt::Debug for WglSecondary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WglSecondary")
            .field("extension", &self.functions.is_some())
            .finish()
    }
}

impl WglSecondary {
    /// Resolves the interop entry points on the current context.  A missing extension is
    /// reported when the bridge is opened.
    pub fn new() -> Self {
        WglSecondary {
            functions: InteropFunctions::load(),
            debug_hook: None,
        }
    }

    fn functions(&self) -> Result<&InteropFunctions, DriverError> {
        self.functions.as_ref().ok_or(DriverError::ExtensionMissing)
    }
}

impl Default for WglSecondary {
    fn default() -> Self {
        Self::new()
    }
}

extern "system" fn debug_callback(
    _source: GLenum,
    _kind: GLenum,
    _id: GLuint,
    severity: GLenum,
    _length: GLsizei,
    message: *const GLchar,
    user: *mut GLvoid,
) {
    if user.is_null() || message.is_null() {
        return;
    }
    let observer = unsafe { &*(user as *const Rc<dyn DiagnosticObserver>) };
    let message = unsafe { CStr::from_ptr(message) }
        .to_string_lossy()
        .into_owned();
    let severity = match severity {
        gl::DEBUG_SEVERITY_HIGH => Severity::High,
        gl::DEBUG_SEVERITY_MEDIUM => Severity::Medium,
        gl::DEBUG_SEVERITY_LOW => Severity::Low,
        _ => Severity::Notification,
    };
    observer.observe(&DiagnosticEvent::DriverMessage { severity, message });
}

impl SecondaryApi<D3D11Primary> for WglSecondary {
    type Bridge = WglBridge;
    type Object = WglObject;
    type Framebuffer = WglFramebuffer;

    fn open_device(&mut self, primary: &D3D11Primary) -> Result<WglBridge, DriverError> {
        let f = self.functions()?;
        let handle = unsafe { (f.open_device)(primary.device().as_raw() as *mut GLvoid) };
        if handle.is_null() {
            let code = unsafe { GetLastError() }.0;
            return Err(DriverError::DeviceIncompatible(format!(
                "wglDXOpenDeviceNV failed with code {code:#x}"
            )));
        }
        Ok(WglBridge(handle))
    }

    fn close_device(&mut self, bridge: WglBridge) -> Result<(), DriverError> {
        let f = self.functions()?;
        if unsafe { (f.close_device)(bridge.0) } == 0 {
            return Err(last_error("wglDXCloseDeviceNV"));
        }
        Ok(())
    }

    fn gen_name(&mut self, target: NameTarget) -> Result<SecondaryName, DriverError> {
        let mut name: GLuint = 0;
        unsafe {
            match target {
                NameTarget::Texture2D => gl::GenTextures(1, &mut name),
                NameTarget::Renderbuffer => gl::GenRenderbuffers(1, &mut name),
            }
        }
        if name == 0 {
            return Err(DriverError::CallFailed {
                call: "glGen*",
                code: unsafe { gl::GetError() },
            });
        }
        Ok(SecondaryName::new(name, target))
    }

    fn delete_name(&mut self, name: SecondaryName) {
        let raw = name.raw();
        unsafe {
            match name.target() {
                NameTarget::Texture2D => gl::DeleteTextures(1, &raw),
                NameTarget::Renderbuffer => gl::DeleteRenderbuffers(1, &raw),
            }
        }
    }

    fn register_object(
        &mut self,
        bridge: &WglBridge,
        resource: &D3D11Texture,
        name: SecondaryName,
        access: AccessMode,
    ) -> Result<WglObject, DriverError> {
        let f = self.functions()?;
        let object = unsafe {
            (f.register_object)(
                bridge.0,
                resource.raw().as_raw() as *mut GLvoid,
                name.raw(),
                gl_target(name.target()),
                access.raw(),
            )
        };
        if object.is_null() {
            return Err(last_error("wglDXRegisterObjectNV"));
        }
        Ok(WglObject(object))
    }

    fn unregister_object(&mut self, bridge: &WglBridge, object: WglObject) -> Result<(), DriverError> {
        let f = self.functions()?;
        if unsafe { (f.unregister_object)(bridge.0, object.0) } == 0 {
            return Err(last_error("wglDXUnregisterObjectNV"));
        }
        Ok(())
    }

    fn lock_objects(&mut self, bridge: &WglBridge, objects: &[WglObject]) -> Result<(), DriverError> {
        let f = self.functions()?;
        let mut handles: Vec<*mut GLvoid> = objects.iter().map(|o| o.0).collect();
        let ok = unsafe { (f.lock_objects)(bridge.0, handles.len() as GLint, handles.as_mut_ptr()) };
        if ok == 0 {
            return Err(last_error("wglDXLockObjectsNV"));
        }
        Ok(())
    }

    fn unlock_objects(
        &mut self,
        bridge: &WglBridge,
        objects: &[WglObject],
    ) -> Result<(), DriverError> {
        let f = self.functions()?;
        let mut handles: Vec<*mut GLvoid> = objects.iter().map(|o| o.0).collect();
        let ok =
            unsafe { (f.unlock_objects)(bridge.0, handles.len() as GLint, handles.as_mut_ptr()) };
        if ok == 0 {
            return Err(last_error("wglDXUnlockObjectsNV"));
        }
        Ok(())
    }

    fn create_framebuffer(&mut self) -> Result<WglFramebuffer, DriverError> {
        let mut fbo: GLuint = 0;
        unsafe { gl::GenFramebuffers(1, &mut fbo) };
        if fbo == 0 {
            return Err(DriverError::CallFailed {
                call: "glGenFramebuffers",
                code: unsafe { gl::GetError() },
            });
        }
        Ok(WglFramebuffer(fbo))
    }

    fn delete_framebuffer(&mut self, framebuffer: WglFramebuffer) {
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, 0);
            gl::DeleteFramebuffers(1, &framebuffer.0);
        }
    }

    fn attach(&mut self, framebuffer: &WglFramebuffer, kind: TargetKind, name: Option<SecondaryName>) {
        let point = attachment(kind);
        unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.0);
            match name {
                Some(name) if name.target() == NameTarget::Renderbuffer => {
                    gl::FramebufferRenderbuffer(gl::FRAMEBUFFER, point, gl::RENDERBUFFER, name.raw())
                }
                Some(name) => {
                    gl::FramebufferTexture2D(gl::FRAMEBUFFER, point, gl::TEXTURE_2D, name.raw(), 0)
                }
                None => gl::FramebufferTexture2D(gl::FRAMEBUFFER, point, gl::TEXTURE_2D, 0, 0),
            }
        }
    }

    fn framebuffer_status(&mut self, framebuffer: &WglFramebuffer) -> FramebufferStatus {
        let status = unsafe {
            gl::BindFramebuffer(gl::FRAMEBUFFER, framebuffer.0);
            gl::CheckFramebufferStatus(gl::FRAMEBUFFER)
        };
        match status {
            gl::FRAMEBUFFER_COMPLETE => FramebufferStatus::Complete,
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => FramebufferStatus::IncompleteAttachment,
            gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => FramebufferStatus::MissingAttachment,
            gl::FRAMEBUFFER_UNSUPPORTED => FramebufferStatus::Unsupported,
            other => FramebufferStatus::Other(other),
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        unsafe { gl::Viewport(0, 0, width as GLsizei, height as GLsizei) };
    }

    fn install_debug_hook(&mut self, observer: Rc<dyn DiagnosticObserver>) {
        if !gl::DebugMessageCallback::is_loaded() {
            logwise::warn_sync!("GL debug output unavailable; driver messages will not be observed");
            return;
        }
        let hook = Box::new(observer);
        let user = &*hook as *const Rc<dyn DiagnosticObserver> as *mut GLvoid;
        unsafe {
            gl::Enable(gl::DEBUG_OUTPUT);
            gl::Enable(gl::DEBUG_OUTPUT_SYNCHRONOUS);
            gl::DebugMessageCallback(Some(debug_callback), user);
        }
        self.debug_hook = Some(hook);
    }
}

impl Drop for WglSecondary {
    fn drop(&mut self) {
        if self.debug_hook.is_some() && gl::DebugMessageCallback::is_loaded() {
            unsafe { gl::DebugMessageCallback(None, std::ptr::null()) };
        }
    }
}
