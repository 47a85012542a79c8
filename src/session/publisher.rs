//! UI-bound state publication.
//!
//! A single task owns the `watch` sender, so every observable field is
//! written from one place in the order updates were issued. Hardware work
//! never blocks on the UI: it only enqueues [`StateUpdate`]s.

use crate::capture::{DisplayPoint, FlashMode};
use crate::device::{CameraPosition, LensType};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, watch};

/// Everything the UI layer observes. The UI never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    /// User-facing smoothed zoom factor.
    pub zoom_factor: f64,
    /// Lowest user-facing zoom of the active lens.
    pub min_zoom: f64,
    /// Highest user-facing zoom of the active lens.
    pub max_zoom: f64,
    /// Active (or pending) lens.
    pub lens: LensType,
    /// Active (or pending) position.
    pub position: CameraPosition,
    /// Requested flash mode.
    pub flash_mode: FlashMode,
    /// Focus indicator location in display space.
    pub focus_indicator_point: Option<DisplayPoint>,
    /// Whether the focus indicator is visible.
    pub showing_focus_indicator: bool,
    /// Whether a lens/position switch is in progress.
    pub is_configuring: bool,
    /// Whether the session is running.
    pub is_running: bool,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom_factor: 1.0,
            min_zoom: 1.0,
            max_zoom: 1.0,
            lens: LensType::WideAngle,
            position: CameraPosition::Back,
            flash_mode: FlashMode::Off,
            focus_indicator_point: None,
            showing_focus_indicator: false,
            is_configuring: false,
            is_running: false,
        }
    }
}

/// A single change to the published state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateUpdate {
    /// New smoothed zoom.
    Zoom(f64),
    /// Lens/position about to be applied.
    PendingCamera {
        lens: LensType,
        position: CameraPosition,
    },
    /// A camera became active; range and zoom change together.
    ActiveCamera {
        lens: LensType,
        position: CameraPosition,
        min_zoom: f64,
        max_zoom: f64,
        zoom: f64,
    },
    /// New flash mode.
    Flash(FlashMode),
    /// Show the focus indicator at a point, or hide it.
    FocusIndicator(Option<DisplayPoint>),
    /// Switch started or finished.
    Configuring(bool),
    /// Session started or stopped.
    Running(bool),
}

impl StateUpdate {
    fn apply(self, state: &mut CameraState) {
        match self {
            StateUpdate::Zoom(zoom) => state.zoom_factor = zoom,
            StateUpdate::PendingCamera { lens, position } => {
                state.lens = lens;
                state.position = position;
            }
            StateUpdate::ActiveCamera {
                lens,
                position,
                min_zoom,
                max_zoom,
                zoom,
            } => {
                state.lens = lens;
                state.position = position;
                state.min_zoom = min_zoom;
                state.max_zoom = max_zoom;
                state.zoom_factor = zoom;
            }
            StateUpdate::Flash(mode) => state.flash_mode = mode,
            StateUpdate::FocusIndicator(point) => {
                state.showing_focus_indicator = point.is_some();
                if point.is_some() {
                    state.focus_indicator_point = point;
                }
            }
            StateUpdate::Configuring(configuring) => state.is_configuring = configuring,
            StateUpdate::Running(running) => state.is_running = running,
        }
    }
}

enum Message {
    Update(StateUpdate),
    Flush(oneshot::Sender<()>),
}

/// Handle to the UI-bound publisher task.
#[derive(Clone)]
pub struct StatePublisher {
    tx: mpsc::UnboundedSender<Message>,
    state: watch::Receiver<CameraState>,
}

impl StatePublisher {
    /// Spawns the publisher task on `handle`.
    pub fn spawn(handle: &Handle, initial: CameraState) -> Self {
        let (state_tx, state_rx) = watch::channel(initial);
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle.spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Update(update) => {
                        tracing::trace!(?update, "Publishing state");
                        state_tx.send_modify(|state| update.apply(state));
                    }
                    Message::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
            tracing::debug!("State publisher stopped");
        });

        Self { tx, state: state_rx }
    }

    /// Enqueues an update. Safe to call from any thread.
    pub fn publish(&self, update: StateUpdate) {
        if self.tx.send(Message::Update(update)).is_err() {
            tracing::warn!("State publisher is gone; update dropped");
        }
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<CameraState> {
        self.state.clone()
    }

    /// Latest published state.
    pub fn snapshot(&self) -> CameraState {
        self.state.borrow().clone()
    }

    /// Resolves once every update enqueued before the call is visible.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_updates_applied_in_order() {
        let publisher = StatePublisher::spawn(&Handle::current(), CameraState::default());
        publisher.publish(StateUpdate::Zoom(2.0));
        publisher.publish(StateUpdate::Zoom(3.0));
        publisher.publish(StateUpdate::Flash(FlashMode::Auto));
        publisher.flush().await;

        let state = publisher.snapshot();
        assert_eq!(state.zoom_factor, 3.0);
        assert_eq!(state.flash_mode, FlashMode::Auto);
    }

    #[tokio::test]
    async fn test_active_camera_updates_range_atomically() {
        let publisher = StatePublisher::spawn(&Handle::current(), CameraState::default());
        let mut rx = publisher.subscribe();
        publisher.publish(StateUpdate::ActiveCamera {
            lens: LensType::UltraWide,
            position: CameraPosition::Back,
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom: 0.5,
        });
        rx.changed().await.unwrap();

        let state = rx.borrow().clone();
        assert_eq!(state.lens, LensType::UltraWide);
        assert_eq!((state.min_zoom, state.max_zoom, state.zoom_factor), (0.5, 2.0, 0.5));
    }

    #[tokio::test]
    async fn test_hiding_indicator_keeps_last_point() {
        let publisher = StatePublisher::spawn(&Handle::current(), CameraState::default());
        let point = DisplayPoint { x: 10.0, y: 20.0 };
        publisher.publish(StateUpdate::FocusIndicator(Some(point)));
        publisher.publish(StateUpdate::FocusIndicator(None));
        publisher.flush().await;

        let state = publisher.snapshot();
        assert!(!state.showing_focus_indicator);
        assert_eq!(state.focus_indicator_point, Some(point));
    }
}
