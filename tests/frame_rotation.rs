// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Frame rotation against the simulated driver.

use dxgl_interop::bridge::Session;
use dxgl_interop::config::{BridgeConfig, ColorRegistration, ConfigError};
use dxgl_interop::diagnostics::{DiagnosticEvent, RecordingObserver};
use dxgl_interop::error::FaultKind;
use dxgl_interop::frames::{Frame, FrameRotator, RotationState};
use dxgl_interop::sim::{self, SimCall, SimOptions, SimPrimary, SimProbe, SimSecondary, Writer};
use dxgl_interop::{
    AccessMode, BufferCount, Error, NameTarget, PixelFormat, PrimaryApi, TargetKind, TextureDesc,
};
use std::rc::Rc;
use std::time::Duration;

type SimSession = Session<SimPrimary, SimSecondary>;
type SimFrame<'r> = Frame<'r, SimPrimary, SimSecondary>;

fn open_with(options: SimOptions) -> (SimSession, SimProbe, Rc<RecordingObserver>) {
    let (primary, secondary) = sim::device(options);
    let probe = primary.probe();
    let observer = Rc::new(RecordingObserver::new());
    let session = Session::open_observed(primary, secondary, observer.clone()).unwrap();
    (session, probe, observer)
}

fn open() -> (SimSession, SimProbe, Rc<RecordingObserver>) {
    open_with(SimOptions::default())
}

fn draw_both(frame: &SimFrame<'_>) -> dxgl_interop::Result<()> {
    frame.primary(|p, t| {
        p.clear_render_target(t.color, [0.1, 0.2, 0.3, 1.0]);
        p.clear_depth_stencil(t.depth, 1.0, 0);
    })?;
    frame.secondary(|s, t| s.draw(t.framebuffer))
}

fn kinds(session: &SimSession) -> Vec<TargetKind> {
    session.bindings().iter().map(|b| b.kind).collect()
}

#[test]
fn three_frames_then_close() {
    let (session, probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::new(1920, 1080)).unwrap();
    assert_eq!(rotator.state(), RotationState::Uninitialized);
    rotator.resize(1920, 1080).unwrap();
    assert_eq!(rotator.state(), RotationState::Sized);

    let depth = session.bindings();
    assert_eq!(depth.len(), 1);
    assert_eq!(depth[0].kind, TargetKind::DepthStencil);
    assert_eq!(
        depth[0].desc,
        TextureDesc::new(1920, 1080, PixelFormat::D24UnormS8Uint)
    );

    for i in 0..3 {
        let frame = rotator.begin_frame().unwrap();
        assert_eq!(frame.index(), i);
        assert_eq!(kinds(&session).len(), 2);
        draw_both(&frame).unwrap();
        assert_eq!(frame.present().unwrap(), i);
        //only the depth target survives the frame
        assert_eq!(kinds(&session), vec![TargetKind::DepthStencil]);
    }
    assert_eq!(rotator.state(), RotationState::Rotating);
    assert_eq!(rotator.frames_presented(), 3);

    rotator.shutdown().unwrap();
    assert_eq!(session.binding_count(), 0);
    session.close().unwrap();

    let presented = probe.presented();
    assert_eq!(presented.len(), 3);
    for frame in &presented {
        assert_eq!((frame.width, frame.height), (1920, 1080));
        assert_eq!(frame.writes, vec![Writer::Primary, Writer::Secondary]);
    }
    assert!(probe.violations().is_empty());
    assert_eq!(probe.registrations(), 0);
    assert_eq!(probe.allocated_names(), 0);
    assert_eq!(probe.framebuffers(), 0);
    assert_eq!(probe.live_texture_handles(), 0);
    assert!(!probe.bridge_open());
    assert_eq!(
        observer.count(|e| matches!(e, DiagnosticEvent::FramePresented { .. })),
        3
    );
    assert_eq!(
        observer.count(|e| matches!(e, DiagnosticEvent::FramebufferIncomplete { .. })),
        0
    );
}

#[test]
fn per_frame_call_order() {
    let (session, probe, _observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();
    let start = probe.log().len();
    for _ in 0..2 {
        let frame = rotator.begin_frame().unwrap();
        draw_both(&frame).unwrap();
        frame.present().unwrap();
    }
    let log = probe.log()[start..].to_vec();
    let shape: Vec<&str> = log
        .iter()
        .map(|c| match c {
            SimCall::AcquireBackBuffer { .. } => "acquire",
            SimCall::Register { .. } => "register",
            SimCall::PrimaryDraw { .. } => "primary",
            SimCall::Lock { .. } => "lock",
            SimCall::SecondaryDraw { .. } => "secondary",
            SimCall::Unlock { .. } => "unlock",
            SimCall::Present { .. } => "present",
            SimCall::Unregister { .. } => "unregister",
            _ => "other",
        })
        .collect();
    let one = [
        "acquire",
        "register",
        "primary",
        "primary",
        "lock",
        "secondary",
        "unlock",
        "present",
        "unregister",
    ];
    assert_eq!(shape, [one, one].concat());

    //each lock covers color and depth; the color object is the one registered this frame
    let registered: Vec<u64> = log
        .iter()
        .filter_map(|c| match c {
            SimCall::Register { object, .. } => Some(*object),
            _ => None,
        })
        .collect();
    let unregistered: Vec<u64> = log
        .iter()
        .filter_map(|c| match c {
            SimCall::Unregister { object } => Some(*object),
            _ => None,
        })
        .collect();
    assert_eq!(registered, unregistered);
    for call in &log {
        if let SimCall::Lock { objects } = call {
            assert_eq!(objects.len(), 2);
        }
    }
}

#[test]
fn lock_of_next_frame_follows_unlock_of_previous() {
    let (session, _probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();
    for _ in 0..4 {
        let frame = rotator.begin_frame().unwrap();
        draw_both(&frame).unwrap();
        frame.present().unwrap();
    }
    let stats = session.brackets();
    assert_eq!((stats.locks, stats.unlocks, stats.open), (4, 4, None));

    let sequence: Vec<(bool, u64)> = observer
        .events()
        .iter()
        .filter_map(|e| match e {
            DiagnosticEvent::Locked { sequence, .. } => Some((true, *sequence)),
            DiagnosticEvent::Unlocked { sequence } => Some((false, *sequence)),
            _ => None,
        })
        .collect();
    let expected: Vec<(bool, u64)> = (1..=4).flat_map(|n| [(true, n), (false, n)]).collect();
    assert_eq!(sequence, expected);
}

#[test]
fn resize_mid_stream() {
    let (session, probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::new(640, 480)).unwrap();
    rotator.resize(640, 480).unwrap();

    let frame = rotator.begin_frame().unwrap();
    let old_depth = frame.depth_binding();
    let old_color = frame.color_binding();
    draw_both(&frame).unwrap();
    frame.present().unwrap();

    rotator.resize(1280, 720).unwrap();
    assert_eq!(rotator.state(), RotationState::Sized);
    assert_eq!(rotator.size(), Some((1280, 720)));
    assert!(session.binding(old_depth).is_none());
    assert!(session.binding(old_color).is_none());
    let bindings = session.bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].desc.width, 1280);
    assert_eq!(bindings[0].desc.height, 720);
    assert_eq!(probe.swap_chain_size(), (1280, 720));
    assert_eq!(probe.viewports(), ((1280, 720), (1280, 720)));

    let frame = rotator.begin_frame().unwrap();
    assert_ne!(frame.depth_binding(), old_depth);
    assert_eq!(frame.size(), (1280, 720));
    draw_both(&frame).unwrap();
    frame.present().unwrap();

    let presented = probe.presented();
    assert_eq!(presented.len(), 2);
    assert_eq!((presented[0].width, presented[0].height), (640, 480));
    assert_eq!((presented[1].width, presented[1].height), (1280, 720));
    assert!(probe.violations().is_empty());
    assert_eq!(
        observer.count(|e| matches!(e, DiagnosticEvent::Resized { .. })),
        2
    );
}

#[test]
fn repeated_resizes_do_not_leak_bindings() {
    let (session, probe, _observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    let sizes = [(640, 480), (800, 600), (1024, 768), (333, 222), (1920, 1080), (640, 480)];
    for (width, height) in sizes {
        rotator.resize(width, height).unwrap();
        for _ in 0..2 {
            let frame = rotator.begin_frame().unwrap();
            let mut k = kinds(&session);
            k.sort_by_key(|k| *k == TargetKind::DepthStencil);
            assert_eq!(k, vec![TargetKind::Color, TargetKind::DepthStencil]);
            draw_both(&frame).unwrap();
            frame.present().unwrap();
        }
        assert_eq!(session.binding_count(), 1);
        assert_eq!(probe.registrations(), 1);
    }
    //between frames only the depth texture and its view are held
    assert_eq!(probe.live_texture_handles(), 2);
    rotator.shutdown().unwrap();
    assert_eq!(probe.live_texture_handles(), 0);
}

#[test]
fn flip_model_rotates_through_distinct_back_buffers() {
    let (session, probe, _observer) = open_with(SimOptions {
        buffer_count: BufferCount::TRIPLE,
        ..Default::default()
    });
    let config = BridgeConfig::default().with_buffer_count(BufferCount::TRIPLE);
    let mut rotator = FrameRotator::new(&session, config).unwrap();
    rotator.resize(640, 480).unwrap();
    for _ in 0..6 {
        let frame = rotator.begin_frame().unwrap();
        draw_both(&frame).unwrap();
        frame.present().unwrap();
    }
    let textures: Vec<u64> = probe.presented().iter().map(|f| f.texture).collect();
    assert_ne!(textures[0], textures[1]);
    assert_ne!(textures[1], textures[2]);
    assert_ne!(textures[0], textures[2]);
    assert_eq!(textures[0..3], textures[3..6]);
    assert!(probe.violations().is_empty());
}

#[test]
fn persistent_color_registers_once_per_size() {
    let (session, probe, _observer) = open_with(SimOptions {
        buffer_count: BufferCount::SINGLE,
        ..Default::default()
    });
    let config = BridgeConfig::default()
        .with_buffer_count(BufferCount::SINGLE)
        .with_color_registration(ColorRegistration::Persistent)
        .with_name_target(NameTarget::Renderbuffer);
    let mut rotator = FrameRotator::new(&session, config).unwrap();
    rotator.resize(640, 480).unwrap();
    assert_eq!(session.binding_count(), 2);

    let mut color = None;
    for _ in 0..3 {
        let frame = rotator.begin_frame().unwrap();
        assert_eq!(*color.get_or_insert(frame.color_binding()), frame.color_binding());
        draw_both(&frame).unwrap();
        frame.present().unwrap();
        assert_eq!(session.binding_count(), 2);
    }
    let registers = |probe: &SimProbe| {
        probe
            .log()
            .iter()
            .filter(|c| matches!(c, SimCall::Register { .. }))
            .count()
    };
    assert_eq!(registers(&probe), 2);

    rotator.resize(800, 600).unwrap();
    assert_eq!(registers(&probe), 4);
    assert_eq!(session.binding_count(), 2);
    assert!(
        session
            .bindings()
            .iter()
            .all(|b| b.name.target() == NameTarget::Renderbuffer)
    );
    rotator.shutdown().unwrap();
    session.close().unwrap();
    assert!(probe.violations().is_empty());
}

#[test]
fn frames_need_a_size() {
    let (session, _probe, _observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    assert!(matches!(rotator.begin_frame(), Err(Error::NotSized)));
    assert!(matches!(
        rotator.resize(0, 480),
        Err(Error::InvalidSize {
            width: 0,
            height: 480
        })
    ));
    assert_eq!(rotator.state(), RotationState::Uninitialized);
}

#[test]
fn invalid_config_is_refused() {
    let (session, probe, _observer) = open();
    let config = BridgeConfig::default().with_formats(PixelFormat::Rgba8Typeless, PixelFormat::D32Float);
    assert!(matches!(
        FrameRotator::new(&session, config),
        Err(Error::Config(_))
    ));
    assert_eq!(probe.allocated_names(), 0);
}

#[test]
fn device_fault_at_present_is_terminal() {
    let (session, probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();

    let frame = rotator.begin_frame().unwrap();
    draw_both(&frame).unwrap();
    frame.present().unwrap();

    probe.inject_present_fault(FaultKind::Removed);
    let frame = rotator.begin_frame().unwrap();
    let depth = frame.depth_binding();
    draw_both(&frame).unwrap();
    assert!(matches!(
        frame.present(),
        Err(Error::DeviceFault(FaultKind::Removed))
    ));
    assert_eq!(rotator.state(), RotationState::Faulted(FaultKind::Removed));
    assert_eq!(probe.presented().len(), 1);

    assert!(matches!(
        session.lock(&[depth]),
        Err(Error::DeviceFault(FaultKind::Removed))
    ));
    let texture = session.with_primary(|p| {
        p.create_depth_stencil(&TextureDesc::new(8, 8, PixelFormat::D24UnormS8Uint))
    });
    assert!(texture.is_err());
    assert!(matches!(
        rotator.begin_frame(),
        Err(Error::DeviceFault(FaultKind::Removed))
    ));
    assert!(matches!(
        rotator.resize(800, 600),
        Err(Error::DeviceFault(FaultKind::Removed))
    ));

    //teardown still releases everything
    rotator.shutdown().unwrap();
    session.close().unwrap();
    assert_eq!(probe.registrations(), 0);
    assert!(!probe.bridge_open());
    assert_eq!(
        observer.count(|e| *e
            == DiagnosticEvent::DeviceFault {
                kind: FaultKind::Removed
            }),
        1
    );
}

#[test]
fn fault_inside_frame_prevents_present() {
    let (session, probe, _observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();
    let frame = rotator.begin_frame().unwrap();
    probe.lose_device(FaultKind::Hung);
    assert!(matches!(
        frame.secondary(|s, t| s.draw(t.framebuffer)),
        Err(Error::DeviceFault(FaultKind::Hung))
    ));
    assert!(matches!(
        frame.present(),
        Err(Error::DeviceFault(FaultKind::Hung))
    ));
    assert!(probe.presented().is_empty());
    assert!(
        !probe
            .log()
            .iter()
            .any(|c| matches!(c, SimCall::Present { .. }))
    );
}

#[test]
fn abandoned_frame_releases_its_color_target() {
    let (session, probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();
    {
        let frame = rotator.begin_frame().unwrap();
        frame
            .primary(|p, t| p.clear_render_target(t.color, [0.0; 4]))
            .unwrap();
    }
    assert_eq!(session.binding_count(), 1);
    assert!(probe.presented().is_empty());
    assert_eq!(
        observer.count(|e| *e == DiagnosticEvent::FrameAbandoned { frame: 0 }),
        1
    );
    //the next frame proceeds normally
    let frame = rotator.begin_frame().unwrap();
    draw_both(&frame).unwrap();
    assert_eq!(frame.present().unwrap(), 1);
}

#[test]
fn present_refused_while_a_bracket_is_open() {
    let (session, probe, _observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();

    let frame = rotator.begin_frame().unwrap();
    let bracket = session.lock(&frame.bindings()).unwrap();
    assert!(matches!(frame.present(), Err(Error::PresentWhileLocked(1))));
    assert!(probe.presented().is_empty());
    //the locked color target is parked, not released under the lock
    assert_eq!(session.binding_count(), 2);
    bracket.unlock().unwrap();

    let frame = rotator.begin_frame().unwrap();
    assert_eq!(session.binding_count(), 2);
    draw_both(&frame).unwrap();
    frame.present().unwrap();
    assert_eq!(session.binding_count(), 1);
    assert!(probe.violations().is_empty());
}

#[test]
fn resize_refused_while_a_bracket_holds_the_targets() {
    let (session, probe, _observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();

    let frame = rotator.begin_frame().unwrap();
    let color = frame.color_binding();
    let bracket = session.lock(&frame.bindings()).unwrap();
    assert!(matches!(frame.present(), Err(Error::PresentWhileLocked(1))));

    assert!(matches!(rotator.resize(800, 600), Err(Error::StillLocked(id)) if id == color));
    //nothing was torn down
    assert_eq!(rotator.state(), RotationState::Rotating);
    assert_eq!(rotator.size(), Some((640, 480)));
    assert_eq!(session.binding_count(), 2);
    assert_eq!(probe.swap_chain_size(), (640, 480));

    bracket.unlock().unwrap();
    rotator.resize(800, 600).unwrap();
    assert_eq!(session.binding_count(), 1);
    let frame = rotator.begin_frame().unwrap();
    draw_both(&frame).unwrap();
    frame.present().unwrap();
    assert_eq!(probe.presented().last().map(|f| (f.width, f.height)), Some((800, 600)));
    rotator.shutdown().unwrap();
    session.close().unwrap();
    assert!(probe.violations().is_empty());
}

#[test]
fn shutdown_under_an_open_bracket_waits_for_unlock() {
    let (session, probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();

    let frame = rotator.begin_frame().unwrap();
    let bracket = session.lock(&frame.bindings()).unwrap();
    drop(frame);
    rotator.shutdown().unwrap();
    //both targets and both names are still held by the bracket
    assert_eq!(session.binding_count(), 2);
    assert_eq!(probe.allocated_names(), 2);
    assert_eq!(probe.framebuffers(), 0);
    assert!(matches!(
        session.close(),
        Err(Error::StillInUse {
            bindings: 2,
            bracket_open: true
        })
    ));

    bracket.unlock().unwrap();
    assert_eq!(session.binding_count(), 0);
    assert_eq!(probe.allocated_names(), 0);
    assert_eq!(probe.live_texture_handles(), 0);
    assert_eq!(
        observer.count(|e| matches!(e, DiagnosticEvent::ReleaseFailed { .. })),
        0
    );
    session.close().unwrap();
    assert!(probe.violations().is_empty());
}

#[test]
fn dropped_rotator_under_an_open_bracket_does_not_panic() {
    let (session, probe, _observer) = open();
    let bracket = {
        let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
        rotator.resize(640, 480).unwrap();
        let frame = rotator.begin_frame().unwrap();
        let bracket = session.lock(&frame.bindings()).unwrap();
        drop(frame);
        bracket
    };
    assert_eq!(session.binding_count(), 2);
    drop(bracket);
    assert_eq!(session.binding_count(), 0);
    assert_eq!(probe.allocated_names(), 0);
    session.close().unwrap();
}

#[test]
fn back_buffer_must_have_the_configured_color_format() {
    let (session, probe, _observer) = open();
    let config =
        BridgeConfig::default().with_formats(PixelFormat::Bgra8Unorm, PixelFormat::D24UnormS8Uint);
    let mut rotator = FrameRotator::new(&session, config.clone()).unwrap();
    rotator.resize(640, 480).unwrap();
    assert!(matches!(
        rotator.begin_frame(),
        Err(Error::Config(ConfigError::BackBufferFormat {
            configured: PixelFormat::Bgra8Unorm,
            actual: PixelFormat::Rgba8Unorm,
        }))
    ));
    //the mismatched back buffer was never registered
    assert_eq!(kinds(&session), [TargetKind::DepthStencil]);
    assert!(probe.presented().is_empty());
    rotator.shutdown().unwrap();
    session.close().unwrap();

    let (session, probe, _observer) = open_with(SimOptions {
        color_format: PixelFormat::Bgra8Unorm,
        ..Default::default()
    });
    let mut rotator = FrameRotator::new(&session, config).unwrap();
    rotator.resize(640, 480).unwrap();
    let frame = rotator.begin_frame().unwrap();
    draw_both(&frame).unwrap();
    frame.present().unwrap();
    assert_eq!(probe.presented().len(), 1);
}

#[test]
fn failed_persistent_resize_leaves_nothing_registered() {
    let (session, probe, _observer) = open_with(SimOptions {
        buffer_count: BufferCount::SINGLE,
        ..Default::default()
    });
    let config = BridgeConfig::default()
        .with_buffer_count(BufferCount::SINGLE)
        .with_color_registration(ColorRegistration::Persistent)
        .with_formats(PixelFormat::Bgra8Unorm, PixelFormat::D24UnormS8Uint);
    let mut rotator = FrameRotator::new(&session, config).unwrap();
    assert!(matches!(
        rotator.resize(640, 480),
        Err(Error::Config(ConfigError::BackBufferFormat { .. }))
    ));
    assert_eq!(rotator.state(), RotationState::Uninitialized);
    assert_eq!(rotator.size(), None);
    assert_eq!(session.binding_count(), 0);
    assert_eq!(probe.live_texture_handles(), 0);
    assert!(matches!(rotator.begin_frame(), Err(Error::NotSized)));
    rotator.shutdown().unwrap();
    session.close().unwrap();
}

#[test]
fn primary_work_inside_a_bracket_is_reported() {
    let (session, probe, observer) = open();
    let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
    rotator.resize(640, 480).unwrap();
    let frame = rotator.begin_frame().unwrap();
    let lock = frame.lock().unwrap();
    frame
        .primary(|p, t| p.clear_render_target(t.color, [1.0; 4]))
        .unwrap();
    lock.unlock().unwrap();
    frame.present().unwrap();
    assert_eq!(
        observer.count(|e| *e == DiagnosticEvent::PrimaryAccessWhileLocked { sequence: 1 }),
        1
    );
    assert_eq!(probe.violations().len(), 1);
}

#[test]
fn latency_timeout_skips_the_frame() {
    let (session, probe, _observer) = open();
    let config = BridgeConfig::default().with_frame_latency_wait(Some(Duration::from_millis(16)));
    let mut rotator = FrameRotator::new(&session, config).unwrap();
    rotator.resize(640, 480).unwrap();

    probe.set_latency_ready(false);
    assert!(matches!(
        rotator.begin_frame(),
        Err(Error::LatencyTimeout(d)) if d == Duration::from_millis(16)
    ));
    assert!(
        !probe
            .log()
            .iter()
            .any(|c| matches!(c, SimCall::AcquireBackBuffer { .. }))
    );
    assert_eq!(session.binding_count(), 1);

    probe.set_latency_ready(true);
    let frame = rotator.begin_frame().unwrap();
    draw_both(&frame).unwrap();
    frame.present().unwrap();
    let log = probe.log();
    let wait = log.iter().rposition(|c| *c == SimCall::WaitLatency);
    let acquire = log
        .iter()
        .rposition(|c| matches!(c, SimCall::AcquireBackBuffer { .. }));
    assert!(wait < acquire);
}

#[test]
fn shutdown_clears_state_and_returns_names() {
    let (session, probe, _observer) = open();
    let config = BridgeConfig::default().with_access(AccessMode::WriteDiscard);
    let mut rotator = FrameRotator::new(&session, config).unwrap();
    rotator.resize(640, 480).unwrap();
    assert_eq!(probe.allocated_names(), 2);
    assert_eq!(probe.framebuffers(), 1);
    assert!(
        session
            .bindings()
            .iter()
            .all(|b| b.access == AccessMode::WriteDiscard)
    );
    rotator.shutdown().unwrap();
    assert_eq!(probe.state_clears(), 1);
    assert_eq!(probe.allocated_names(), 0);
    assert_eq!(probe.framebuffers(), 0);
    session.close().unwrap();
}

#[test]
fn dropped_rotator_releases_everything() {
    let (session, probe, _observer) = open();
    {
        let mut rotator = FrameRotator::new(&session, BridgeConfig::default()).unwrap();
        rotator.resize(640, 480).unwrap();
    }
    assert_eq!(session.binding_count(), 0);
    assert_eq!(probe.allocated_names(), 0);
    session.close().unwrap();
}

#[test]
#[should_panic(expected = "released while still registered")]
fn releasing_a_registered_back_buffer_fails_fast() {
    let (session, _probe, _observer) = open();
    let texture = session.with_primary(|p| p.current_back_buffer()).unwrap();
    let name = session.allocate_name(NameTarget::Texture2D).unwrap();
    let binding = session
        .register(&texture, name, TargetKind::Color, AccessMode::ReadWrite)
        .unwrap();
    drop(texture);
    drop(binding);
}
