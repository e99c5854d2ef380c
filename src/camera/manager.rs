use std::sync::{Arc, Mutex, PoisonError};

use super::{CameraError, MediaDevices, MediaStream, VideoSink};

/// The live stream plus what it was opened for
struct CaptureSession {
    /// Assigned by the manager; platform stream ids may repeat
    id: u64,
    stream: MediaStream,
    started_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Default)]
struct SessionSlot {
    /// Bumped by every stop; a start that sees it move was cancelled
    epoch: u64,
    next_id: u64,
    current: Option<CaptureSession>,
}

/// Owns the single camera capture session
pub struct CameraManager {
    devices: Option<Arc<dyn MediaDevices>>,
    slot: Mutex<SessionSlot>,
}

impl CameraManager {
    #[must_use]
    pub fn new(devices: Option<Arc<dyn MediaDevices>>) -> Self {
        Self {
            devices,
            slot: Mutex::new(SessionSlot::default()),
        }
    }

    /// A manager with no media capability
    #[must_use]
    pub fn unsupported() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.devices.is_some()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().current.is_some()
    }

    /// When the active session started
    #[must_use]
    pub fn active_since(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.lock().current.as_ref().map(|s| s.started_at)
    }

    /// Open a video stream and render it into `sink`
    ///
    /// Any previous session is stopped first. If the sink fails to play,
    /// the new stream is released and no session remains. A [`stop`](Self::stop)
    /// or another start while this one is pending cancels it.
    ///
    /// # Errors
    ///
    /// Returns the platform's [`CameraError`],
    /// [`CameraError::Unsupported`] without a media capability, or
    /// [`CameraError::Cancelled`] if superseded before it finished
    pub async fn start(&self, sink: &dyn VideoSink) -> Result<(), CameraError> {
        let Some(devices) = &self.devices else {
            return Err(CameraError::Unsupported);
        };

        let epoch = self.stop_session();

        let stream = devices.open_video().await.inspect_err(|e| {
            tracing::warn!(error = %e, "camera access failed");
        })?;
        let stream_id = stream.id().to_string();

        let Some(session_id) = self.install(epoch, stream, sink) else {
            tracing::debug!(stream = %stream_id, "camera start cancelled before install");
            return Err(CameraError::Cancelled);
        };

        if let Err(e) = sink.play().await {
            tracing::warn!(error = %e, "camera preview failed to play");
            self.release(session_id);
            return Err(e);
        }

        if !self.holds(session_id) {
            tracing::debug!(stream = %stream_id, "camera stopped while starting");
            return Err(CameraError::Cancelled);
        }

        tracing::info!(stream = %stream_id, session = session_id, "camera started");
        Ok(())
    }

    /// Stop every track of the active session and cancel pending starts
    pub fn stop(&self) {
        self.stop_session();
    }

    /// Returns the new epoch
    fn stop_session(&self) -> u64 {
        let (epoch, previous) = {
            let mut slot = self.lock();
            slot.epoch += 1;
            (slot.epoch, slot.current.take())
        };
        if let Some(session) = previous {
            session.stream.stop_all();
            tracing::info!(stream = %session.stream.id(), "camera stopped");
        }
        epoch
    }

    /// Attach and store `stream` unless a stop happened since `epoch`
    fn install(&self, epoch: u64, stream: MediaStream, sink: &dyn VideoSink) -> Option<u64> {
        let mut slot = self.lock();
        if slot.epoch != epoch {
            drop(slot);
            stream.stop_all();
            return None;
        }

        sink.attach(&stream);
        slot.next_id += 1;
        let id = slot.next_id;
        slot.current = Some(CaptureSession {
            id,
            stream,
            started_at: chrono::Utc::now(),
        });
        Some(id)
    }

    fn holds(&self, session_id: u64) -> bool {
        self.lock()
            .current
            .as_ref()
            .is_some_and(|s| s.id == session_id)
    }

    /// Stop the session only if it is still `session_id`
    fn release(&self, session_id: u64) {
        let released = {
            let mut slot = self.lock();
            if slot.current.as_ref().is_some_and(|s| s.id == session_id) {
                slot.current.take()
            } else {
                None
            }
        };
        if let Some(session) = released {
            session.stream.stop_all();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::camera::MediaTrack;

    struct FakeTrack {
        id: String,
        stopped: Arc<AtomicBool>,
    }

    impl MediaTrack for FakeTrack {
        fn id(&self) -> &str {
            &self.id
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct FakeDevices {
        opened: AtomicUsize,
        tracks: Mutex<Vec<Arc<AtomicBool>>>,
        deny: bool,
        /// Holds `open_video` until a permit is added
        gate: Option<Semaphore>,
        /// Hand out the same stream id every time
        same_id: bool,
    }

    impl FakeDevices {
        fn track_stopped(&self, index: usize) -> bool {
            self.tracks.lock().unwrap()[index].load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaDevices for FakeDevices {
        async fn open_video(&self) -> Result<MediaStream, CameraError> {
            if self.deny {
                return Err(CameraError::PermissionDenied);
            }
            let n = self.opened.fetch_add(1, Ordering::SeqCst);
            let stopped = Arc::new(AtomicBool::new(false));
            self.tracks.lock().unwrap().push(Arc::clone(&stopped));
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            let id = if self.same_id {
                "stream".to_string()
            } else {
                format!("stream-{n}")
            };
            Ok(MediaStream::new(
                id,
                vec![Box::new(FakeTrack {
                    id: format!("video-{n}"),
                    stopped,
                })],
            ))
        }
    }

    #[derive(Default)]
    struct FakeSink {
        attached: Mutex<Vec<String>>,
        fail: bool,
        /// Holds `play` until a permit is added
        gate: Option<Semaphore>,
    }

    #[async_trait]
    impl VideoSink for FakeSink {
        fn attach(&self, stream: &MediaStream) {
            self.attached.lock().unwrap().push(stream.id().to_string());
        }

        async fn play(&self) -> Result<(), CameraError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail {
                Err(CameraError::Playback("autoplay blocked".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_unsupported() {
        let camera = CameraManager::unsupported();
        let sink = FakeSink::default();
        assert!(!camera.is_supported());
        assert_eq!(
            tokio_test::block_on(camera.start(&sink)),
            Err(CameraError::Unsupported)
        );
        assert!(!camera.is_active());
    }

    #[test]
    fn test_start_then_stop() {
        let devices = Arc::new(FakeDevices::default());
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let sink = FakeSink::default();

        tokio_test::block_on(camera.start(&sink)).unwrap();
        assert!(camera.is_active());
        assert!(camera.active_since().is_some());
        assert_eq!(*sink.attached.lock().unwrap(), vec!["stream-0"]);

        camera.stop();
        assert!(!camera.is_active());
        assert!(devices.track_stopped(0));

        // idempotent
        camera.stop();
        assert!(!camera.is_active());
    }

    #[test]
    fn test_second_start_replaces_session() {
        let devices = Arc::new(FakeDevices::default());
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let sink = FakeSink::default();

        tokio_test::block_on(camera.start(&sink)).unwrap();
        tokio_test::block_on(camera.start(&sink)).unwrap();

        assert!(camera.is_active());
        assert_eq!(devices.opened.load(Ordering::SeqCst), 2);
        assert!(devices.track_stopped(0));
        assert!(!devices.track_stopped(1));
    }

    #[test]
    fn test_permission_denied_leaves_no_session() {
        let devices = Arc::new(FakeDevices {
            deny: true,
            ..FakeDevices::default()
        });
        let camera = CameraManager::new(Some(devices as Arc<dyn MediaDevices>));
        let sink = FakeSink::default();

        assert_eq!(
            tokio_test::block_on(camera.start(&sink)),
            Err(CameraError::PermissionDenied)
        );
        assert!(!camera.is_active());
        assert!(sink.attached.lock().unwrap().is_empty());
    }

    #[test]
    fn test_playback_failure_releases_stream() {
        let devices = Arc::new(FakeDevices::default());
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let sink = FakeSink {
            fail: true,
            ..FakeSink::default()
        };

        let result = tokio_test::block_on(camera.start(&sink));
        assert!(matches!(result, Err(CameraError::Playback(_))));
        assert!(!camera.is_active());
        assert!(devices.track_stopped(0));
    }

    fn gated_devices() -> Arc<FakeDevices> {
        Arc::new(FakeDevices {
            gate: Some(Semaphore::new(0)),
            ..FakeDevices::default()
        })
    }

    #[tokio::test]
    async fn test_stop_while_opening_cancels_start() {
        let devices = gated_devices();
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let sink = FakeSink::default();

        let (result, ()) = tokio::join!(camera.start(&sink), async {
            tokio::task::yield_now().await;
            camera.stop();
            devices.gate.as_ref().unwrap().add_permits(1);
        });

        assert_eq!(result, Err(CameraError::Cancelled));
        assert!(!camera.is_active());
        assert!(devices.track_stopped(0));
        assert!(sink.attached.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_starts_leave_one_session() {
        let devices = gated_devices();
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let sink = FakeSink::default();

        let (first, second, ()) = tokio::join!(camera.start(&sink), camera.start(&sink), async {
            tokio::task::yield_now().await;
            devices.gate.as_ref().unwrap().add_permits(2);
        });

        assert_eq!(first, Err(CameraError::Cancelled));
        assert_eq!(second, Ok(()));
        assert!(camera.is_active());
        assert_eq!(devices.opened.load(Ordering::SeqCst), 2);
        assert!(devices.track_stopped(0));
        assert!(!devices.track_stopped(1));
        assert_eq!(*sink.attached.lock().unwrap(), vec!["stream-1"]);
    }

    #[tokio::test]
    async fn test_stop_while_playing_cancels_start() {
        let devices = Arc::new(FakeDevices::default());
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let sink = FakeSink {
            gate: Some(Semaphore::new(0)),
            ..FakeSink::default()
        };

        let (result, ()) = tokio::join!(camera.start(&sink), async {
            tokio::task::yield_now().await;
            camera.stop();
            sink.gate.as_ref().unwrap().add_permits(1);
        });

        assert_eq!(result, Err(CameraError::Cancelled));
        assert!(!camera.is_active());
        assert!(devices.track_stopped(0));
    }

    #[tokio::test]
    async fn test_failed_play_spares_newer_session_with_same_stream_id() {
        let devices = Arc::new(FakeDevices {
            same_id: true,
            ..FakeDevices::default()
        });
        let camera = CameraManager::new(Some(Arc::clone(&devices) as Arc<dyn MediaDevices>));
        let failing = FakeSink {
            fail: true,
            gate: Some(Semaphore::new(0)),
            ..FakeSink::default()
        };
        let working = FakeSink::default();

        let (stale, newer) = tokio::join!(camera.start(&failing), async {
            tokio::task::yield_now().await;
            let newer = camera.start(&working).await;
            failing.gate.as_ref().unwrap().add_permits(1);
            newer
        });

        assert!(matches!(stale, Err(CameraError::Playback(_))));
        assert_eq!(newer, Ok(()));
        assert!(camera.is_active());
        assert!(devices.track_stopped(0));
        assert!(!devices.track_stopped(1));
    }
}
