// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Registered render targets.
//!
//! A [Target] ties a native texture, the primary API's view of it and its binding together.
//! The rotating color target is replaced every frame; the depth-stencil target (and, in
//! persistent mode, the color target) lives until the next resize.

use crate::bridge::{Binding, Session};
use crate::diagnostics::DiagnosticEvent;
use crate::error::Result;
use crate::imp::{PrimaryApi, SecondaryApi, SecondaryName};

/**
A texture registered with the bridge, plus its primary-API view.

Field order is drop order: the binding goes first, then the view, then the texture reference.
Prefer [Target::release], which also checks the registry before letting go of the texture.
*/
pub(super) struct Target<P: PrimaryApi, S: SecondaryApi<P>, V> {
    pub(super) binding: Binding<P, S>,
    pub(super) view: V,
    pub(super) texture: P::Texture,
}

pub(super) type ColorTarget<P, S> = Target<P, S, <P as PrimaryApi>::RenderTargetView>;
pub(super) type DepthTarget<P, S> = Target<P, S, <P as PrimaryApi>::DepthStencilView>;

impl<P: PrimaryApi, S: SecondaryApi<P>, V> Target<P, S, V> {
    /**
    Unregisters, then drops the view, then drops the texture reference.

    # Panics
    Panics if the texture is still registered after unregistering.  Releasing a registered
    resource is undefined behavior in the driver.
    */
    pub(super) fn release(self, session: &Session<P, S>) -> Result<()> {
        let Target {
            binding,
            view,
            texture,
        } = self;
        let result = binding.unregister();
        drop(view);
        assert!(
            !session.holds_resource(&texture),
            "releasing {texture:?} while it is still registered"
        );
        drop(texture);
        result
    }

    pub(super) fn is_locked(&self, session: &Session<P, S>) -> bool {
        session
            .binding(self.binding.id())
            .is_some_and(|info| info.locked)
    }
}

/// Returns a secondary name to its API when dropped.
pub(super) struct NameRelease<P: PrimaryApi, S: SecondaryApi<P>> {
    pub(super) session: Session<P, S>,
    pub(super) name: SecondaryName,
}

impl<P: PrimaryApi, S: SecondaryApi<P>> Drop for NameRelease<P, S> {
    fn drop(&mut self) {
        if let Err(e) = self.session.release_name(self.name) {
            self.session.emit(DiagnosticEvent::ReleaseFailed {
                what: "secondary name",
                error: e.to_string(),
            });
        }
    }
}

/// What primary-API work in a frame renders into.
pub struct PrimaryTargets<'a, P: PrimaryApi> {
    pub color: &'a P::RenderTargetView,
    pub depth: &'a P::DepthStencilView,
    pub back_buffer: &'a P::Texture,
    pub width: u32,
    pub height: u32,
}

/// What secondary-API work in a frame renders into.  Only valid inside a lock bracket.
pub struct SecondaryTargets<'a, P: PrimaryApi, S: SecondaryApi<P>> {
    pub framebuffer: &'a S::Framebuffer,
    pub color: SecondaryName,
    pub depth: SecondaryName,
    pub width: u32,
    pub height: u32,
}
