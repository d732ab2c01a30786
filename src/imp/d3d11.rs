// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Direct3D 11 primary backend.

Wraps a device, its immediate context and a swap chain the host already created.  If the
swap chain was created with `DXGI_SWAP_CHAIN_FLAG_FRAME_LATENCY_WAITABLE_OBJECT`, the latency
object is picked up automatically.
*/

use crate::error::FaultKind;
use crate::imp::{
    BufferCount, DriverError, NativeResource, PixelFormat, PresentInterval, PrimaryApi,
    ResourceKey, TextureDesc,
};
use std::time::Duration;
use windows::Win32::Foundation::{HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::Graphics::Direct3D11::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::{INFINITE, WaitForSingleObjectEx};
use windows::core::Interface;

fn to_dxgi(format: PixelFormat) -> DXGI_FORMAT {
    match format {
        PixelFormat::Rgba8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        PixelFormat::Bgra8Unorm => DXGI_FORMAT_B8G8R8A8_UNORM,
        PixelFormat::Rgba8Typeless => DXGI_FORMAT_R8G8B8A8_TYPELESS,
        PixelFormat::R24G8Typeless => DXGI_FORMAT_R24G8_TYPELESS,
        PixelFormat::D24UnormS8Uint => DXGI_FORMAT_D24_UNORM_S8_UINT,
        PixelFormat::D32Float => DXGI_FORMAT_D32_FLOAT,
        PixelFormat::D32FloatS8X24Uint => DXGI_FORMAT_D32_FLOAT_S8X24_UINT,
    }
}

fn from_dxgi(format: DXGI_FORMAT) -> Option<PixelFormat> {
    Some(match format {
        DXGI_FORMAT_R8G8B8A8_UNORM => PixelFormat::Rgba8Unorm,
        DXGI_FORMAT_B8G8R8A8_UNORM => PixelFormat::Bgra8Unorm,
        DXGI_FORMAT_R8G8B8A8_TYPELESS => PixelFormat::Rgba8Typeless,
        DXGI_FORMAT_R24G8_TYPELESS => PixelFormat::R24G8Typeless,
        DXGI_FORMAT_D24_UNORM_S8_UINT => PixelFormat::D24UnormS8Uint,
        DXGI_FORMAT_D32_FLOAT => PixelFormat::D32Float,
        DXGI_FORMAT_D32_FLOAT_S8X24_UINT => PixelFormat::D32FloatS8X24Uint,
        _ => return None,
    })
}

/// A Direct3D 11 texture reference.  Dropping it releases the COM reference.
#[derive(Debug, Clone)]
pub struct D3D11Texture {
    texture: ID3D11Texture2D,
    desc: TextureDesc,
}

impl D3D11Texture {
    fn new(texture: ID3D11Texture2D) -> Result<Self, DriverError> {
        let mut raw = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut raw) };
        let format = from_dxgi(raw.Format).ok_or(DriverError::Unsupported("texture format"))?;
        Ok(D3D11Texture {
            texture,
            desc: TextureDesc {
                width: raw.Width,
                height: raw.Height,
                format,
                sample_count: raw.SampleDesc.Count,
            },
        })
    }

    pub fn raw(&self) -> &ID3D11Texture2D {
        &self.texture
    }
}

impl NativeResource for D3D11Texture {
    fn key(&self) -> ResourceKey {
        ResourceKey(self.texture.as_raw() as usize)
    }
    fn desc(&self) -> TextureDesc {
        self.desc
    }
}

/// Direct3D 11 device, immediate context and swap chain.
#[derive(Debug)]
pub struct D3D11Primary {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    swap_chain: IDXGISwapChain,
    latency_object: Option<HANDLE>,
}

impl D3D11Primary {
    pub fn new(
        device: ID3D11Device,
        context: ID3D11DeviceContext,
        swap_chain: IDXGISwapChain,
    ) -> Result<Self, DriverError> {
        let desc = unsafe { swap_chain.GetDesc() }
            .map_err(|e| hresult("IDXGISwapChain::GetDesc", e))?;
        let waitable = desc.Flags & DXGI_SWAP_CHAIN_FLAG_FRAME_LATENCY_WAITABLE_OBJECT.0 as u32 != 0;
        let latency_object = if waitable {
            let chain2: IDXGISwapChain2 = swap_chain
                .cast()
                .map_err(|e| hresult("IDXGISwapChain2", e))?;
            Some(unsafe { chain2.GetFrameLatencyWaitableObject() })
        } else {
            None
        };
        Ok(D3D11Primary {
            device,
            context,
            swap_chain,
            latency_object,
        })
    }

    pub fn device(&self) -> &ID3D11Device {
        &self.device
    }

    pub fn context(&self) -> &ID3D11DeviceContext {
        &self.context
    }

    /// Refines a lost-device error with `GetDeviceRemovedReason`.
    fn lost(&self, call: &'static str, e: windows::core::Error) -> DriverError {
        match hresult(call, e) {
            DriverError::DeviceLost(_) => {
                let reason = unsafe { self.device.GetDeviceRemovedReason() };
                match reason {
                    Err(e) if e.code() == DXGI_ERROR_DEVICE_HUNG => {
                        DriverError::DeviceLost(FaultKind::Hung)
                    }
                    Err(e) if e.code() == DXGI_ERROR_DEVICE_RESET => {
                        DriverError::DeviceLost(FaultKind::Reset)
                    }
                    _ => DriverError::DeviceLost(FaultKind::Removed),
                }
            }
            other => other,
        }
    }
}

fn hresult(call: &'static str, e: windows::core::Error) -> DriverError {
    let code = e.code();
    if code == DXGI_ERROR_DEVICE_REMOVED {
        DriverError::DeviceLost(FaultKind::Removed)
    } else if code == DXGI_ERROR_DEVICE_RESET {
        DriverError::DeviceLost(FaultKind::Reset)
    } else if code == DXGI_ERROR_DEVICE_HUNG {
        DriverError::DeviceLost(FaultKind::Hung)
    } else {
        DriverError::CallFailed {
            call,
            code: code.0 as u32,
        }
    }
}

impl PrimaryApi for D3D11Primary {
    type Texture = D3D11Texture;
    type RenderTargetView = ID3D11RenderTargetView;
    type DepthStencilView = ID3D11DepthStencilView;

    fn current_back_buffer(&mut self) -> Result<D3D11Texture, DriverError> {
        let texture: ID3D11Texture2D = unsafe { self.swap_chain.GetBuffer(0) }
            .map_err(|e| self.lost("IDXGISwapChain::GetBuffer", e))?;
        D3D11Texture::new(texture)
    }

    fn resize_back_buffers(
        &mut self,
        buffers: BufferCount,
        width: u32,
        height: u32,
    ) -> Result<(), DriverError> {
        let desc = unsafe { self.swap_chain.GetDesc() }
            .map_err(|e| self.lost("IDXGISwapChain::GetDesc", e))?;
        unsafe {
            self.swap_chain.ResizeBuffers(
                buffers.get(),
                width,
                height,
                desc.BufferDesc.Format,
                DXGI_SWAP_CHAIN_FLAG(desc.Flags as i32),
            )
        }
        .map_err(|e| self.lost("IDXGISwapChain::ResizeBuffers", e))
    }

    fn wait_for_frame_latency(&mut self, timeout: Duration) -> Result<bool, DriverError> {
        let Some(handle) = self.latency_object else {
            return Ok(true);
        };
        let millis = if timeout == Duration::MAX {
            INFINITE
        } else {
            timeout.as_millis().min(u32::MAX as u128 - 1) as u32
        };
        let r = unsafe { WaitForSingleObjectEx(handle, millis, true) };
        if r == WAIT_OBJECT_0 {
            Ok(true)
        } else if r == WAIT_TIMEOUT {
            Ok(false)
        } else {
            Err(DriverError::CallFailed {
                call: "WaitForSingleObjectEx",
                code: r.0,
            })
        }
    }

    fn create_depth_stencil(&mut self, desc: &TextureDesc) -> Result<D3D11Texture, DriverError> {
        let raw = D3D11_TEXTURE2D_DESC {
            Width: desc.width,
            Height: desc.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: to_dxgi(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: desc.sample_count,
                Quality: 0,
            },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: D3D11_BIND_DEPTH_STENCIL.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let mut texture = None;
        unsafe { self.device.CreateTexture2D(&raw, None, Some(&mut texture)) }
            .map_err(|e| self.lost("ID3D11Device::CreateTexture2D", e))?;
        let texture = texture.ok_or(DriverError::CallFailed {
            call: "ID3D11Device::CreateTexture2D",
            code: 0,
        })?;
        D3D11Texture::new(texture)
    }

    fn create_render_target_view(
        &mut self,
        texture: &D3D11Texture,
    ) -> Result<ID3D11RenderTargetView, DriverError> {
        let mut view = None;
        unsafe {
            self.device
                .CreateRenderTargetView(&texture.texture, None, Some(&mut view))
        }
        .map_err(|e| self.lost("ID3D11Device::CreateRenderTargetView", e))?;
        view.ok_or(DriverError::CallFailed {
            call: "ID3D11Device::CreateRenderTargetView",
            code: 0,
        })
    }

    fn create_depth_stencil_view(
        &mut self,
        texture: &D3D11Texture,
    ) -> Result<ID3D11DepthStencilView, DriverError> {
        let desc = D3D11_DEPTH_STENCIL_VIEW_DESC {
            Format: to_dxgi(texture.desc.format),
            ViewDimension: D3D11_DSV_DIMENSION_TEXTURE2D,
            Flags: 0,
            Anonymous: D3D11_DEPTH_STENCIL_VIEW_DESC_0 {
                Texture2D: D3D11_TEX2D_DSV { MipSlice: 0 },
            },
        };
        let mut view = None;
        unsafe {
            self.device
                .CreateDepthStencilView(&texture.texture, Some(&desc), Some(&mut view))
        }
        .map_err(|e| self.lost("ID3D11Device::CreateDepthStencilView", e))?;
        view.ok_or(DriverError::CallFailed {
            call: "ID3D11Device::CreateDepthStencilView",
            code: 0,
        })
    }

    fn bind_targets(
        &mut self,
        color: Option<&ID3D11RenderTargetView>,
        depth: Option<&ID3D11DepthStencilView>,
    ) {
        unsafe {
            match color {
                Some(color) => self
                    .context
                    .OMSetRenderTargets(Some(&[Some(color.clone())]), depth),
                None => self.context.OMSetRenderTargets(None, depth),
            }
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        let viewport = D3D11_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        unsafe { self.context.RSSetViewports(Some(&[viewport])) };
    }

    fn present(&mut self, interval: PresentInterval) -> Result<(), DriverError> {
        unsafe { self.swap_chain.Present(interval.sync_interval(), DXGI_PRESENT(0)) }
            .ok()
            .map_err(|e| self.lost("IDXGISwapChain::Present", e))
    }

    fn clear_state(&mut self) {
        unsafe { self.context.ClearState() };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mapping_round_trips_known_formats() {
        for format in [
            PixelFormat::Rgba8Unorm,
            PixelFormat::Bgra8Unorm,
            PixelFormat::R24G8Typeless,
            PixelFormat::D24UnormS8Uint,
            PixelFormat::D32Float,
        ] {
            assert_eq!(from_dxgi(to_dxgi(format)), Some(format));
        }
        assert_eq!(from_dxgi(DXGI_FORMAT_R16G16B16A16_FLOAT), None);
    }

    #[test]
    fn removed_and_reset_are_faults() {
        let removed = windows::core::Error::from(DXGI_ERROR_DEVICE_REMOVED);
        assert_eq!(
            hresult("Present", removed),
            DriverError::DeviceLost(FaultKind::Removed)
        );
        let reset = windows::core::Error::from(DXGI_ERROR_DEVICE_RESET);
        assert_eq!(
            hresult("Present", reset),
            DriverError::DeviceLost(FaultKind::Reset)
        );
    }
}
