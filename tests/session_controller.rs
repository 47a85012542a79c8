//! End-to-end behavior of the session controller against mock hardware.

use capture_session::capture::{
    CaptureCoordinator, DeviceOrientation, DisplayPoint, FlashMode, HardwareParts, PhotoSink,
};
use capture_session::config::ControllerConfig;
use capture_session::device::mock::{MockDevice, MockDiscovery, MockPhotoOutput, MockSession};
use capture_session::device::{
    CameraPosition, CaptureDevice, CaptureSession, DeviceCapability, DeviceId, FocusMode,
    LensType, NormalizedPoint, WhiteBalanceGains, WhiteBalanceMode,
};
use capture_session::focus::FocusState;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
struct Delivered {
    bytes: Vec<u8>,
    orientation_code: u32,
    position: CameraPosition,
}

struct ChannelSink(mpsc::UnboundedSender<Delivered>);

impl PhotoSink for ChannelSink {
    fn deliver_captured_image(&self, bytes: Vec<u8>, orientation_code: u32, position: CameraPosition) {
        let _ = self.0.send(Delivered {
            bytes,
            orientation_code,
            position,
        });
    }
}

struct Rig {
    session: Arc<MockSession>,
    discovery: Arc<MockDiscovery>,
    output: Arc<MockPhotoOutput>,
    photos: mpsc::UnboundedReceiver<Delivered>,
    coordinator: CaptureCoordinator,
}

impl Rig {
    fn new() -> Self {
        Self::with(MockDiscovery::standard(), MockPhotoOutput::new())
    }

    fn with(discovery: MockDiscovery, output: MockPhotoOutput) -> Self {
        let session = Arc::new(MockSession::new());
        let discovery = Arc::new(discovery);
        let output = Arc::new(output);
        let (tx, photos) = mpsc::unbounded_channel();
        let coordinator = CaptureCoordinator::new(
            HardwareParts {
                session: session.clone(),
                discovery: discovery.clone(),
                photo_output: output.clone(),
            },
            Arc::new(ChannelSink(tx)),
            ControllerConfig::default(),
            tokio::runtime::Handle::current(),
        )
        .unwrap();
        coordinator.set_preview_size(400.0, 800.0);
        Self {
            session,
            discovery,
            output,
            photos,
            coordinator,
        }
    }

    async fn started() -> Self {
        let rig = Self::new();
        rig.start().await;
        rig
    }

    async fn start(&self) {
        self.coordinator.start().unwrap().await.unwrap().unwrap();
        self.coordinator.flush().await;
    }

    fn device(&self, lens: LensType, position: CameraPosition) -> Arc<MockDevice> {
        self.discovery.mock(lens, position).unwrap()
    }

    fn wide(&self) -> Arc<MockDevice> {
        self.device(LensType::WideAngle, CameraPosition::Back)
    }

    fn ultra(&self) -> Arc<MockDevice> {
        self.device(LensType::UltraWide, CameraPosition::Back)
    }

    fn assert_settled(&self) {
        let (begins, commits) = self.session.transaction_counts();
        assert_eq!(begins, commits);
        assert!(!self.session.is_configuring());
        assert_eq!(self.session.violations(), 0);
        assert!(!self.coordinator.is_configuring());
    }
}

async fn settle(coordinator: &CaptureCoordinator) {
    while coordinator.is_configuring() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    coordinator.flush().await;
}

#[tokio::test]
async fn test_pinch_crosses_onto_ultra_wide_and_back() {
    let rig = Rig::started().await;
    let coordinator = &rig.coordinator;

    coordinator.on_pinch(1.0, true);
    for scale in [0.9, 0.8, 0.7, 0.6, 0.6, 0.6] {
        coordinator.on_pinch(scale, false);
        settle(coordinator).await;
        let state = coordinator.state();
        assert!(state.zoom_factor >= state.min_zoom && state.zoom_factor <= state.max_zoom);
    }

    let state = coordinator.state();
    assert_eq!(state.lens, LensType::UltraWide);
    assert_eq!(state.min_zoom, 0.5);
    assert_eq!(state.max_zoom, 2.0);
    assert_eq!(coordinator.metrics().switches(), 1);

    coordinator.on_pinch(1.0, true);
    for scale in [1.5, 2.0, 3.0, 3.0] {
        coordinator.on_pinch(scale, false);
        settle(coordinator).await;
        let state = coordinator.state();
        assert!(state.zoom_factor >= state.min_zoom && state.zoom_factor <= state.max_zoom);
    }

    assert_eq!(coordinator.state().lens, LensType::WideAngle);
    assert_eq!(coordinator.metrics().switches(), 2);
    rig.assert_settled();
}

#[tokio::test]
async fn test_zoom_written_under_lock() {
    let rig = Rig::started().await;
    rig.wide().clear_writes();

    rig.coordinator.set_zoom(4.0);
    rig.coordinator.set_zoom(4.0);
    rig.coordinator.flush().await;

    let zoom = rig.coordinator.state().zoom_factor;
    assert!(zoom > 1.0 && zoom < 4.0);
    assert_eq!(rig.wide().zoom_factor(), zoom);
    assert_eq!(rig.wide().unlocked_writes(), 0);
    assert!(!rig.wide().is_locked());
}

#[tokio::test]
async fn test_zoom_lock_failure_leaves_state() {
    let rig = Rig::started().await;
    rig.wide().fail_next_locks(1);

    rig.coordinator.set_zoom(5.0);
    rig.coordinator.flush().await;

    assert_eq!(rig.coordinator.state().zoom_factor, 1.0);
    assert_eq!(rig.wide().zoom_factor(), 1.0);
}

#[tokio::test]
async fn test_overlapping_switch_is_dropped() {
    let rig = Rig::started().await;

    rig.session.hold();
    let first = rig.coordinator.switch_lens(LensType::UltraWide).unwrap();
    assert!(rig.coordinator.is_configuring());
    assert!(rig
        .coordinator
        .switch_position(CameraPosition::Front)
        .is_none());
    rig.session.release();
    first.await.unwrap();
    rig.coordinator.flush().await;

    let state = rig.coordinator.state();
    assert_eq!(state.lens, LensType::UltraWide);
    assert_eq!(state.position, CameraPosition::Back);
    assert!(!state.is_configuring);
    assert_eq!(rig.coordinator.metrics().dropped_switches(), 1);
    assert_eq!(rig.session.inputs(), vec![rig.ultra().id().clone()]);
    rig.assert_settled();
}

#[tokio::test]
async fn test_requests_dropped_while_switching() {
    let rig = Rig::started().await;
    let wide = rig.wide();

    rig.session.hold();
    let switch = rig.coordinator.switch_lens(LensType::UltraWide).unwrap();
    rig.coordinator.set_zoom(5.0);
    rig.coordinator.on_single_tap(DisplayPoint { x: 100.0, y: 200.0 });
    assert!(!rig.coordinator.on_capture());
    rig.session.release();
    switch.await.unwrap();

    assert_eq!(wide.zoom_factor(), 1.0);
    assert_eq!(wide.focus_mode(), FocusMode::ContinuousAuto);
    assert!(rig.output.last_settings().is_none());
    rig.coordinator.flush().await;
    assert!(!rig.coordinator.state().showing_focus_indicator);
}

#[tokio::test]
async fn test_switch_to_active_camera_is_skipped() {
    let rig = Rig::started().await;
    assert!(rig.coordinator.switch_lens(LensType::WideAngle).is_none());
    assert_eq!(rig.coordinator.metrics().dropped_switches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_tap_resets_after_three_seconds() {
    let rig = Rig::started().await;
    let wide = rig.wide();

    rig.coordinator.on_single_tap(DisplayPoint { x: 100.0, y: 200.0 });
    rig.coordinator.flush().await;

    let point = NormalizedPoint::new(0.75, 0.25);
    assert_eq!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::TapFocus { point }
    );
    assert_eq!(wide.focus_mode(), FocusMode::AutoFocus);
    let state = rig.coordinator.state();
    assert!(state.showing_focus_indicator);
    assert_eq!(
        state.focus_indicator_point,
        Some(DisplayPoint { x: 100.0, y: 200.0 })
    );

    tokio::time::sleep(Duration::from_millis(2999)).await;
    assert_eq!(wide.focus_mode(), FocusMode::AutoFocus);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(wide.focus_mode(), FocusMode::ContinuousAuto);
    assert_eq!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::ContinuousAuto
    );
    rig.coordinator.flush().await;
    assert!(!rig.coordinator.state().showing_focus_indicator);
}

#[tokio::test(start_paused = true)]
async fn test_second_tap_replaces_pending_reset() {
    let rig = Rig::started().await;
    let wide = rig.wide();

    rig.coordinator.on_single_tap(DisplayPoint { x: 100.0, y: 200.0 });
    tokio::time::sleep(Duration::from_secs(2)).await;
    rig.coordinator.on_single_tap(DisplayPoint { x: 200.0, y: 400.0 });

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(wide.focus_mode(), FocusMode::AutoFocus);
    assert!(rig.coordinator.focus().reset_pending(wide.id()));

    tokio::time::sleep(Duration::from_millis(1600)).await;
    assert_eq!(wide.focus_mode(), FocusMode::ContinuousAuto);
    assert!(!rig.coordinator.focus().reset_pending(wide.id()));
}

#[tokio::test(start_paused = true)]
async fn test_double_tap_locks_white_balance_for_eight_seconds() {
    let rig = Rig::started().await;
    let wide = rig.wide();

    rig.coordinator.on_double_tap(DisplayPoint { x: 200.0, y: 400.0 });

    assert_eq!(wide.white_balance_mode(), WhiteBalanceMode::Locked);
    assert!(matches!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::LockedWhiteBalance { .. }
    ));

    tokio::time::sleep(Duration::from_millis(7900)).await;
    assert_eq!(wide.white_balance_mode(), WhiteBalanceMode::Locked);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(wide.white_balance_mode(), WhiteBalanceMode::ContinuousAuto);
    assert_eq!(wide.focus_mode(), FocusMode::ContinuousAuto);
}

#[tokio::test(start_paused = true)]
async fn test_subject_area_change_refocuses_at_last_point() {
    let rig = Rig::started().await;
    let wide = rig.wide();
    assert!(wide.has_observer());

    wide.trigger_subject_area_change();
    assert_eq!(
        rig.coordinator.focus().last_point(wide.id()),
        None
    );
    assert_eq!(wide.focus_mode(), FocusMode::AutoFocus);
    assert_eq!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::TapFocus {
            point: NormalizedPoint::CENTER
        }
    );
    assert!(rig.coordinator.focus().reset_pending(wide.id()));

    tokio::time::sleep(Duration::from_millis(2001)).await;
    assert_eq!(wide.focus_mode(), FocusMode::ContinuousAuto);
    assert_eq!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::ContinuousAuto
    );
}

#[tokio::test(start_paused = true)]
async fn test_subject_area_change_keeps_white_balance_lock() {
    let rig = Rig::started().await;
    let wide = rig.wide();

    rig.coordinator.on_double_tap(DisplayPoint { x: 200.0, y: 400.0 });
    let FocusState::LockedWhiteBalance { gains, .. } = rig.coordinator.focus().state(wide.id())
    else {
        panic!("double tap did not lock white balance");
    };
    rig.coordinator.on_subject_area_changed();

    assert_eq!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::LockedWhiteBalance {
            point: NormalizedPoint::new(0.5, 0.5),
            gains
        }
    );
    assert_eq!(wide.white_balance_mode(), WhiteBalanceMode::Locked);
}

#[tokio::test]
async fn test_locked_gains_carry_to_ultra_wide() {
    let rig = Rig::started().await;
    rig.wide()
        .preset_white_balance(WhiteBalanceMode::Locked, WhiteBalanceGains::new(2.0, 1.0, 1.8));

    rig.coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await
        .unwrap();

    let ultra = rig.ultra();
    assert_eq!(ultra.white_balance_mode(), WhiteBalanceMode::Locked);
    assert_eq!(ultra.white_balance_gains(), WhiteBalanceGains::new(2.0, 1.0, 1.8));
    rig.assert_settled();
}

#[tokio::test]
async fn test_carried_gains_clamped_to_incoming_maximum() {
    let discovery = MockDiscovery::standard();
    discovery.insert(MockDevice::with_capability(
        LensType::UltraWide,
        CameraPosition::Back,
        DeviceCapability::full(4.0).with_max_white_balance_gain(1.5),
    ));
    let rig = Rig::with(discovery, MockPhotoOutput::new());
    rig.start().await;
    rig.wide()
        .preset_white_balance(WhiteBalanceMode::Locked, WhiteBalanceGains::new(2.0, 1.0, 1.8));

    rig.coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(
        rig.ultra().white_balance_gains(),
        WhiteBalanceGains::new(1.5, 1.0, 1.5)
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_white_balance_resumes_after_carry() {
    let rig = Rig::started().await;
    assert_eq!(rig.wide().white_balance_mode(), WhiteBalanceMode::ContinuousAuto);

    rig.coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await
        .unwrap();

    let ultra = rig.ultra();
    assert_eq!(ultra.white_balance_mode(), WhiteBalanceMode::Locked);
    assert_eq!(ultra.white_balance_gains(), WhiteBalanceGains::new(1.9, 1.0, 1.7));

    tokio::time::sleep(Duration::from_millis(501)).await;
    assert_eq!(ultra.white_balance_mode(), WhiteBalanceMode::ContinuousAuto);
}

#[tokio::test]
async fn test_position_switch_resets_white_balance() {
    let rig = Rig::started().await;
    rig.wide()
        .preset_white_balance(WhiteBalanceMode::Locked, WhiteBalanceGains::new(2.0, 1.0, 1.8));
    let front = rig.device(LensType::WideAngle, CameraPosition::Front);
    front.preset_white_balance(WhiteBalanceMode::Locked, WhiteBalanceGains::new(3.0, 1.0, 3.0));

    rig.coordinator.on_toggle_position().unwrap().await.unwrap();
    rig.coordinator.flush().await;

    assert_eq!(front.white_balance_mode(), WhiteBalanceMode::ContinuousAuto);
    let state = rig.coordinator.state();
    assert_eq!(state.position, CameraPosition::Front);
    assert_eq!(state.lens, LensType::WideAngle);
    assert_eq!(state.max_zoom, 4.0);
    assert!(rig.coordinator.on_toggle_lens().is_none());
    rig.assert_settled();
}

#[tokio::test]
async fn test_lock_failure_during_switch_unwinds() {
    let rig = Rig::started().await;
    rig.ultra().fail_next_locks(1);

    rig.coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await
        .unwrap();
    rig.coordinator.flush().await;

    assert_eq!(rig.coordinator.state().lens, LensType::WideAngle);
    assert!(!rig.coordinator.state().is_configuring);
    assert_eq!(rig.session.inputs(), vec![rig.wide().id().clone()]);
    assert!(rig.wide().has_observer());
    assert_eq!(rig.coordinator.metrics().aborts(), 1);
    rig.assert_settled();
}

#[tokio::test]
async fn test_rejected_input_unwinds() {
    let rig = Rig::started().await;
    rig.session.reject_input(rig.ultra().id().clone());

    rig.coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(rig.session.inputs(), vec![rig.wide().id().clone()]);
    assert_eq!(rig.coordinator.metrics().aborts(), 1);
    rig.assert_settled();

    // The controller accepts the next switch.
    rig.coordinator
        .switch_position(CameraPosition::Front)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(
        rig.coordinator.active_camera().unwrap().position,
        CameraPosition::Front
    );
}

#[tokio::test]
async fn test_panic_during_switch_unwinds() {
    let rig = Rig::started().await;
    rig.session.panic_on_next_add_input();

    let result = rig
        .coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await;
    rig.coordinator.flush().await;

    assert!(result.unwrap_err().is_panic());
    assert_eq!(rig.session.inputs(), vec![rig.wide().id().clone()]);
    assert!(!rig.coordinator.state().is_configuring);
    assert_eq!(rig.coordinator.metrics().aborts(), 1);
    rig.assert_settled();
}

#[tokio::test]
async fn test_capture_delivers_to_sink() {
    let mut rig = Rig::started().await;
    rig.coordinator
        .set_device_orientation(DeviceOrientation::LandscapeLeft);

    assert!(rig.coordinator.on_capture());
    let photo = tokio::time::timeout(Duration::from_secs(5), rig.photos.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(photo.bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
    assert_eq!(photo.orientation_code, 1);
    assert_eq!(photo.position, CameraPosition::Back);
    assert_eq!(rig.output.last_settings().unwrap().rotation_degrees, 0);
}

#[tokio::test]
async fn test_capture_prefers_metadata_orientation() {
    let mut rig = Rig::with(
        MockDiscovery::standard(),
        MockPhotoOutput::new().with_exif_orientation(8),
    );
    rig.start().await;
    rig.coordinator.set_device_orientation(DeviceOrientation::FaceUp);

    assert!(rig.coordinator.on_capture());
    let photo = tokio::time::timeout(Duration::from_secs(5), rig.photos.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(photo.orientation_code, 8);
    assert_eq!(rig.output.last_settings().unwrap().rotation_degrees, 90);
}

#[tokio::test]
async fn test_front_camera_never_flashes() {
    let mut rig = Rig::started().await;
    rig.coordinator.set_flash_mode(FlashMode::On);
    rig.coordinator
        .switch_position(CameraPosition::Front)
        .unwrap()
        .await
        .unwrap();

    assert!(rig.coordinator.on_capture());
    let photo = tokio::time::timeout(Duration::from_secs(5), rig.photos.recv())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(photo.position, CameraPosition::Front);
    assert_eq!(rig.output.last_settings().unwrap().flash, FlashMode::Off);
}

#[tokio::test]
async fn test_failed_capture_is_counted() {
    let rig = Rig::with(MockDiscovery::standard(), MockPhotoOutput::new().failing());
    rig.start().await;

    assert!(rig.coordinator.on_capture());
    for _ in 0..500 {
        if rig.coordinator.metrics().encode().unwrap().contains("capture_failures_total 1") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(rig
        .coordinator
        .metrics()
        .encode()
        .unwrap()
        .contains("capture_session_capture_failures_total 1"));
    assert_eq!(rig.coordinator.metrics().captures(), 0);
}

#[tokio::test]
async fn test_restart_after_stop_attaches_one_input() {
    let rig = Rig::started().await;
    assert!(rig.coordinator.start().is_none());

    rig.coordinator.stop().unwrap().await.unwrap();
    assert!(rig.session.inputs().is_empty());
    assert!(!rig.session.is_running());
    assert!(!rig.wide().has_observer());
    assert!(rig.coordinator.active_camera().is_none());

    rig.start().await;
    assert_eq!(rig.session.inputs(), vec![rig.wide().id().clone()]);
    assert!(rig.session.is_running());
    assert!(rig.wide().has_observer());
    assert!(rig.coordinator.state().is_running);
    rig.assert_settled();

    // Switching works again on the restarted session.
    rig.coordinator
        .switch_lens(LensType::UltraWide)
        .unwrap()
        .await
        .unwrap();
    assert_eq!(rig.session.inputs(), vec![rig.ultra().id().clone()]);
    rig.assert_settled();
}

#[tokio::test]
async fn test_stop_hides_indicator_and_drops_requests() {
    let rig = Rig::started().await;
    let wide = rig.wide();

    rig.coordinator.on_single_tap(DisplayPoint { x: 100.0, y: 200.0 });
    rig.coordinator.flush().await;
    assert!(rig.coordinator.state().showing_focus_indicator);

    rig.coordinator.stop().unwrap().await.unwrap();
    rig.coordinator.flush().await;
    let state = rig.coordinator.state();
    assert!(!state.showing_focus_indicator);
    assert_eq!(state.focus_indicator_point, None);
    assert!(!state.is_running);
    assert!(!rig.coordinator.focus().reset_pending(wide.id()));
    assert_eq!(
        rig.coordinator.focus().state(wide.id()),
        FocusState::ContinuousAuto
    );

    wide.clear_writes();
    rig.coordinator.set_zoom(2.0);
    rig.coordinator.on_pinch(1.0, true);
    rig.coordinator.on_pinch(0.5, false);
    rig.coordinator.on_single_tap(DisplayPoint { x: 100.0, y: 200.0 });
    rig.coordinator.on_double_tap(DisplayPoint { x: 100.0, y: 200.0 });
    rig.coordinator.on_subject_area_changed();
    wide.trigger_subject_area_change();
    assert!(!rig.coordinator.on_capture());
    assert!(rig.coordinator.on_toggle_position().is_none());
    assert!(rig.coordinator.switch_lens(LensType::UltraWide).is_none());

    assert!(wide.writes().is_empty());
    assert!(rig.output.last_settings().is_none());
    assert!(rig.session.inputs().is_empty());
    rig.coordinator.flush().await;
    assert!(!rig.coordinator.state().showing_focus_indicator);
    rig.assert_settled();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_switch_waits_for_in_flight_tap() {
    let rig = Rig::started().await;
    let wide = rig.wide();
    let coordinator = &rig.coordinator;
    let before = rig.session.transaction_counts();

    wide.hold_locks();
    let switch = std::thread::scope(|scope| {
        let tap = scope.spawn(|| coordinator.on_single_tap(DisplayPoint { x: 100.0, y: 200.0 }));
        while wide.lock_waiters() == 0 {
            std::thread::yield_now();
        }

        let switch = coordinator
            .switch_lens(LensType::UltraWide)
            .expect("switch accepted");
        std::thread::sleep(Duration::from_millis(50));
        // The session is untouched while the tap still addresses the device.
        assert_eq!(rig.session.transaction_counts(), before);
        assert_eq!(rig.session.inputs(), vec![wide.id().clone()]);

        wide.release_locks();
        tap.join().unwrap();
        switch
    });
    switch.await.unwrap();
    settle(coordinator).await;

    assert_eq!(rig.session.inputs(), vec![rig.ultra().id().clone()]);
    assert!(!coordinator.focus().reset_pending(wide.id()));
    assert_eq!(coordinator.focus().state(wide.id()), FocusState::ContinuousAuto);
    assert_eq!(wide.unlocked_writes(), 0);
    rig.assert_settled();
}

#[derive(Debug, Clone)]
enum Step {
    ToggleLens,
    TogglePosition,
    Lens(LensType),
    Position(CameraPosition),
    FailLocks(LensType, CameraPosition, u32),
    Reject(LensType, CameraPosition),
    Restart,
}

fn lens_type() -> impl Strategy<Value = LensType> {
    prop_oneof![Just(LensType::WideAngle), Just(LensType::UltraWide)]
}

fn camera_position() -> impl Strategy<Value = CameraPosition> {
    prop_oneof![Just(CameraPosition::Back), Just(CameraPosition::Front)]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => Just(Step::ToggleLens),
        3 => Just(Step::TogglePosition),
        2 => lens_type().prop_map(Step::Lens),
        2 => camera_position().prop_map(Step::Position),
        2 => (lens_type(), camera_position(), 1u32..3)
            .prop_map(|(lens, position, count)| Step::FailLocks(lens, position, count)),
        1 => (lens_type(), camera_position()).prop_map(|(lens, position)| Step::Reject(lens, position)),
        1 => Just(Step::Restart),
    ]
}

async fn run_step(rig: &Rig, step: &Step) {
    let switch = match step {
        Step::ToggleLens => rig.coordinator.on_toggle_lens(),
        Step::TogglePosition => rig.coordinator.on_toggle_position(),
        Step::Lens(lens) => rig.coordinator.switch_lens(*lens),
        Step::Position(position) => rig.coordinator.switch_position(*position),
        Step::FailLocks(lens, position, count) => {
            if let Some(device) = rig.discovery.mock(*lens, *position) {
                device.fail_next_locks(*count);
            }
            None
        }
        Step::Reject(lens, position) => {
            rig.session.reject_input(DeviceId::for_unit(*lens, *position));
            None
        }
        Step::Restart => {
            rig.coordinator.stop().unwrap().await.unwrap();
            if let Some(setup) = rig.coordinator.start() {
                // Setup may fail on injected faults; the session must still settle.
                let _ = setup.await.unwrap();
            }
            None
        }
    };
    if let Some(switch) = switch {
        switch.await.unwrap();
    }
    settle(&rig.coordinator).await;
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_switch_sequences_keep_one_consistent_input(
        steps in proptest::collection::vec(step(), 1..24),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let rig = Rig::started().await;
            for step in &steps {
                run_step(&rig, step).await;

                rig.assert_settled();
                let active = rig.coordinator.active_camera();
                let expected: Vec<DeviceId> =
                    active.iter().map(|a| a.device.id().clone()).collect();
                assert_eq!(rig.session.inputs(), expected, "after {:?}", step);
                if let Some(active) = active {
                    let device = rig.device(active.lens, active.position);
                    assert!(device.has_observer(), "after {:?}", step);
                    let state = rig.coordinator.state();
                    assert_eq!((state.lens, state.position), (active.lens, active.position));
                    assert!(state.is_running);
                }
            }
        });
    }
}
