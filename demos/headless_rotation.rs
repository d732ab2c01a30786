// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Runs the frame loop against the simulated drivers.

Both APIs draw into every frame, the window is "resized" and "minimized" partway through, and
the process exits with the loop's exit code.
*/

use dxgl_interop::bridge::Session;
use dxgl_interop::config::BridgeConfig;
use dxgl_interop::frames::Frame;
use dxgl_interop::host::{self, ScriptedEvents, WindowEvent};
use dxgl_interop::sim::{self, SimOptions, SimPrimary, SimSecondary};
use std::process::ExitCode;

fn main() -> ExitCode {
    let (primary, secondary) = sim::device(SimOptions::default());
    let probe = primary.probe();
    let session = match Session::open(primary, secondary) {
        Ok(session) => session,
        Err(e) => {
            logwise::error_sync!(
                "could not open the interop session: {e}",
                e = logwise::privacy::LogIt(&e)
            );
            return ExitCode::from(1);
        }
    };

    let mut events = ScriptedEvents::default()
        .idle(4)
        .then(vec![WindowEvent::Resized {
            width: 1280,
            height: 720,
        }])
        .idle(2)
        .then(vec![WindowEvent::Resized {
            width: 0,
            height: 0,
        }])
        .idle(2);

    let mut workload = |frame: &Frame<'_, SimPrimary, SimSecondary>| {
        let shade = (frame.index() % 8) as f32 / 8.0;
        frame.primary(|p, t| {
            p.clear_render_target(t.color, [shade, 0.2, 0.4, 1.0]);
            p.clear_depth_stencil(t.depth, 1.0, 0);
        })?;
        frame.secondary(|s, t| s.draw(t.framebuffer))
    };

    let exit = host::run(session, BridgeConfig::new(640, 480), &mut events, &mut workload);

    let presented = probe.presented();
    logwise::info_sync!(
        "presented {count} frames, {violations} protocol violations",
        count = presented.len(),
        violations = probe.violations().len()
    );
    if let Some(last) = presented.last() {
        logwise::info_sync!(
            "last frame was {width}x{height}",
            width = last.width,
            height = last.height
        );
    }
    ExitCode::from(exit)
}
