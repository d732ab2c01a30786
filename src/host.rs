// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The host frame loop.

[run] drives a [FrameRotator] from window events until the window closes or something fatal
happens, and reports how it ended as a [LoopExit] that maps onto a process exit code.

Window creation stays with the host.  The loop only needs an [EventSource] to drain events
from and a [FrameWorkload] to render each frame.
*/

use crate::bridge::Session;
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::frames::{Frame, FrameRotator};
use crate::imp::{PrimaryApi, SecondaryApi};
use std::collections::VecDeque;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// Delivers window events.  Called once per loop iteration; returns everything pending.
pub trait EventSource {
    fn poll(&mut self) -> Vec<WindowEvent>;
}

/**
A fixed script of event batches, one batch per loop iteration.

Once the script runs out the source requests close, so a headless loop always ends.
*/
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvents {
    batches: VecDeque<Vec<WindowEvent>>,
}

impl ScriptedEvents {
    pub fn new(batches: impl IntoIterator<Item = Vec<WindowEvent>>) -> Self {
        ScriptedEvents {
            batches: batches.into_iter().collect(),
        }
    }

    /// `frames` iterations with no events.
    pub fn idle(mut self, frames: usize) -> Self {
        self.batches.extend(std::iter::repeat_n(Vec::new(), frames));
        self
    }

    pub fn then(mut self, events: Vec<WindowEvent>) -> Self {
        self.batches.push_back(events);
        self
    }
}

impl EventSource for ScriptedEvents {
    fn poll(&mut self) -> Vec<WindowEvent> {
        self.batches
            .pop_front()
            .unwrap_or_else(|| vec![WindowEvent::CloseRequested])
    }
}

/// Renders one frame.
pub trait FrameWorkload<P: PrimaryApi, S: SecondaryApi<P>> {
    fn render(&mut self, frame: &Frame<'_, P, S>) -> Result<()>;
}

impl<P, S, F> FrameWorkload<P, S> for F
where
    P: PrimaryApi,
    S: SecondaryApi<P>,
    F: FnMut(&Frame<'_, P, S>) -> Result<()>,
{
    fn render(&mut self, frame: &Frame<'_, P, S>) -> Result<()> {
        self(frame)
    }
}

/// How the loop ended.
#[derive(Debug)]
pub enum LoopExit {
    /// The window closed and everything was released in order.
    Closed { frames: u64 },
    Fatal(Error),
}

impl LoopExit {
    /// 0 for a clean close, 2 for a device fault, 1 for anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoopExit::Closed { .. } => 0,
            LoopExit::Fatal(e) if e.is_device_fault() => 2,
            LoopExit::Fatal(_) => 1,
        }
    }
}

impl From<&LoopExit> for ExitCode {
    fn from(exit: &LoopExit) -> Self {
        ExitCode::from(exit.exit_code())
    }
}

impl From<LoopExit> for ExitCode {
    fn from(exit: LoopExit) -> Self {
        ExitCode::from(&exit)
    }
}

fn fatal<P: PrimaryApi, S: SecondaryApi<P>>(
    session: &Session<P, S>,
    rotator: Option<FrameRotator<P, S>>,
    error: Error,
) -> LoopExit {
    logwise::error_sync!(
        "frame loop stopped: {error}",
        error = logwise::privacy::LogIt(&error)
    );
    if let Some(rotator) = rotator {
        if let Err(e) = rotator.shutdown() {
            logwise::warn_sync!(
                "shutdown after fatal error failed: {e}",
                e = logwise::privacy::LogIt(&e)
            );
        }
    }
    if session.is_open() {
        if let Err(e) = session.close() {
            logwise::warn_sync!(
                "closing session after fatal error failed: {e}",
                e = logwise::privacy::LogIt(&e)
            );
        }
    }
    LoopExit::Fatal(error)
}

/**
Runs the frame loop.

Each iteration drains `events`, then renders and presents one frame.  Resizes to a zero
dimension (a minimized window) and to the current size are skipped.  A frame whose latency
wait times out is skipped too.  On close, the rotator is shut down and the session closed.
*/
pub fn run<P, S>(
    session: Session<P, S>,
    config: BridgeConfig,
    events: &mut impl EventSource,
    workload: &mut impl FrameWorkload<P, S>,
) -> LoopExit
where
    P: PrimaryApi,
    S: SecondaryApi<P>,
{
    let (width, height) = (config.width, config.height);
    let mut rotator = match FrameRotator::new(&session, config) {
        Ok(rotator) => rotator,
        Err(e) => return fatal(&session, None, e),
    };
    if let Err(e) = rotator.resize(width, height) {
        return fatal(&session, Some(rotator), e);
    }

    loop {
        for event in events.poll() {
            match event {
                WindowEvent::Resized { width, height } if width == 0 || height == 0 => {
                    logwise::trace_sync!("ignoring zero-size resize");
                }
                WindowEvent::Resized { width, height }
                    if rotator.size() == Some((width, height)) => {}
                WindowEvent::Resized { width, height } => {
                    if let Err(e) = rotator.resize(width, height) {
                        return fatal(&session, Some(rotator), e);
                    }
                }
                WindowEvent::CloseRequested => {
                    let frames = rotator.frames_presented();
                    if let Err(e) = rotator.shutdown() {
                        return fatal(&session, None, e);
                    }
                    if let Err(e) = session.close() {
                        return fatal(&session, None, e);
                    }
                    logwise::info_sync!("frame loop closed after {frames} frames", frames = frames);
                    return LoopExit::Closed { frames };
                }
            }
        }

        if let Err(e) = render_one(&mut rotator, workload) {
            return fatal(&session, Some(rotator), e);
        }
    }
}

fn render_one<P, S>(
    rotator: &mut FrameRotator<P, S>,
    workload: &mut impl FrameWorkload<P, S>,
) -> Result<()>
where
    P: PrimaryApi,
    S: SecondaryApi<P>,
{
    let frame = match rotator.begin_frame() {
        Ok(frame) => frame,
        Err(Error::LatencyTimeout(timeout)) => {
            logwise::warn_sync!(
                "frame latency wait timed out after {timeout}; skipping frame",
                timeout = logwise::privacy::LogIt(&timeout)
            );
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    workload.render(&frame)?;
    frame.present().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FaultKind;

    #[test]
    fn exit_codes() {
        assert_eq!(LoopExit::Closed { frames: 3 }.exit_code(), 0);
        assert_eq!(LoopExit::Fatal(Error::NotSized).exit_code(), 1);
        assert_eq!(
            LoopExit::Fatal(Error::DeviceFault(FaultKind::Removed)).exit_code(),
            2
        );
    }

    #[test]
    fn script_ends_with_close() {
        let mut events = ScriptedEvents::default().idle(1);
        assert!(events.poll().is_empty());
        assert_eq!(events.poll(), vec![WindowEvent::CloseRequested]);
        assert_eq!(events.poll(), vec![WindowEvent::CloseRequested]);
    }
}
