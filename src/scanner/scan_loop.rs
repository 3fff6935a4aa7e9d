use crate::core::error::ScannerError;
use crate::scanner::camera::{Camera, FacingMode, VideoStream};
use crate::scanner::decoder::{FrameDecoder, ScanResult};
use crate::utils::time::current_timestamp_nanos;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

#[derive(Clone, Debug)]
pub struct ScannerOptions {
    pub facing_mode: FacingMode,
    pub scan_interval: Duration,
    /// Results kept before older ones are dropped
    pub max_results: usize,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            scan_interval: Duration::from_millis(100),
            max_results: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Acquiring,
    /// Stream open and frames drawn; `scanning` when decode ticks are scheduled
    Active { scanning: bool },
    Stopped,
}

struct Status {
    state: ScannerState,
    facing: FacingMode,
    error: Option<ScannerError>,
}

struct Shared {
    /// Held across acquisition so only one stream is ever open
    device: tokio::sync::Mutex<Option<Box<dyn VideoStream>>>,
    status: Mutex<Status>,
    results: Mutex<VecDeque<ScanResult>>,
    max_results: usize,
    decode_in_flight: AtomicBool,
    decode_attempts: AtomicU64,
    skipped_ticks: AtomicU64,
    result_ready: Notify,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn is_scanning(&self) -> bool {
        matches!(lock(&self.status).state, ScannerState::Active { scanning: true })
    }

    /// One interval tick: start a decode unless one is still running
    fn tick(self: &Arc<Self>, decoder: &Arc<dyn FrameDecoder>) {
        if self
            .decode_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
            trace!("Decode still in flight, skipping tick");
            return;
        }

        // Device busy means a camera switch is in progress
        let frame = match self.device.try_lock() {
            Ok(device) => device.as_ref().and_then(|stream| stream.latest_frame()),
            Err(_) => None,
        };

        let Some(frame) = frame else {
            self.decode_in_flight.store(false, Ordering::Release);
            return;
        };

        self.decode_attempts.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(self);
        let decoder = Arc::clone(decoder);
        tokio::spawn(async move {
            if let Some(decoded) = decoder.decode(frame).await {
                if shared.is_scanning() {
                    debug!(data = %decoded.data, "QR code decoded");
                    let now = current_timestamp_nanos();
                    shared.push_result(ScanResult::from_decoded(decoded, now));
                }
            }
            shared.decode_in_flight.store(false, Ordering::Release);
        });
    }

    fn push_result(&self, result: ScanResult) {
        {
            let mut results = lock(&self.results);
            results.push_front(result);
            results.truncate(self.max_results);
        }
        self.result_ready.notify_waiters();
    }
}

/// Camera capture and decode loop.
///
/// `start` opens the device and schedules a decode attempt every
/// `scan_interval`. At most one decode runs at a time; ticks that land while
/// one is pending are skipped. Frames without a code are ignored. Results are
/// kept newest first up to `max_results` until the caller takes them.
pub struct QrScanner {
    camera: Arc<dyn Camera>,
    decoder: Arc<dyn FrameDecoder>,
    scan_interval: Duration,
    supported: bool,
    shared: Arc<Shared>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl QrScanner {
    pub fn new(
        camera: Arc<dyn Camera>,
        decoder: Arc<dyn FrameDecoder>,
        options: ScannerOptions,
    ) -> Self {
        let supported = camera.is_supported();
        let error = if supported {
            None
        } else {
            warn!("Camera is not supported on this device");
            Some(ScannerError::Unsupported)
        };

        Self {
            camera,
            decoder,
            scan_interval: options.scan_interval,
            supported,
            shared: Arc::new(Shared {
                device: tokio::sync::Mutex::new(None),
                status: Mutex::new(Status {
                    state: ScannerState::Idle,
                    facing: options.facing_mode,
                    error,
                }),
                results: Mutex::new(VecDeque::new()),
                max_results: options.max_results.max(1),
                decode_in_flight: AtomicBool::new(false),
                decode_attempts: AtomicU64::new(0),
                skipped_ticks: AtomicU64::new(0),
                result_ready: Notify::new(),
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ScannerState {
        lock(&self.shared.status).state
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), ScannerState::Active { .. })
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.is_scanning()
    }

    pub fn facing_mode(&self) -> FacingMode {
        lock(&self.shared.status).facing
    }

    pub fn last_error(&self) -> Option<ScannerError> {
        lock(&self.shared.status).error.clone()
    }

    pub fn can_start_scanning(&self) -> bool {
        self.supported && matches!(self.state(), ScannerState::Idle | ScannerState::Stopped)
    }

    /// Decode attempts started so far
    pub fn decode_attempts(&self) -> u64 {
        self.shared.decode_attempts.load(Ordering::Relaxed)
    }

    /// Ticks skipped because a decode was still pending
    pub fn skipped_ticks(&self) -> u64 {
        self.shared.skipped_ticks.load(Ordering::Relaxed)
    }

    /// Open the camera if needed and begin scanning
    pub async fn start(&self) -> Result<(), ScannerError> {
        self.activate().await?;
        self.start_scanning();
        Ok(())
    }

    async fn activate(&self) -> Result<(), ScannerError> {
        if !self.supported {
            return Err(ScannerError::Unsupported);
        }

        let mut device = self.shared.device.lock().await;
        if device.is_some() {
            return Ok(());
        }

        let facing = {
            let mut status = lock(&self.shared.status);
            status.state = ScannerState::Acquiring;
            status.error = None;
            status.facing
        };

        self.acquire(&mut device, facing).await
    }

    async fn acquire(
        &self,
        device: &mut Option<Box<dyn VideoStream>>,
        facing: FacingMode,
    ) -> Result<(), ScannerError> {
        match self.camera.open(facing).await {
            Ok(stream) => {
                *device = Some(stream);
                lock(&self.shared.status).state = ScannerState::Active { scanning: false };
                info!(facing_mode = facing.as_str(), "Camera stream acquired");
                Ok(())
            }
            Err(e) => {
                let mut status = lock(&self.shared.status);
                status.state = ScannerState::Idle;
                status.error = Some(e.clone());
                warn!(facing_mode = facing.as_str(), error = %e, "Failed to acquire camera");
                Err(e)
            }
        }
    }

    /// Schedule decode ticks. Returns false when the stream is not open.
    pub fn start_scanning(&self) -> bool {
        {
            let mut status = lock(&self.shared.status);
            match status.state {
                ScannerState::Active { scanning: true } => return true,
                ScannerState::Active { scanning: false } => {
                    status.state = ScannerState::Active { scanning: true };
                }
                _ => return false,
            }
        }

        let shared = Arc::clone(&self.shared);
        let decoder = Arc::clone(&self.decoder);
        let period = self.scan_interval;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if !shared.is_scanning() {
                    break;
                }
                shared.tick(&decoder);
            }
        });

        if let Some(previous) = lock(&self.ticker).replace(handle) {
            previous.abort();
        }
        debug!(interval_ms = period.as_millis() as u64, "Scanning started");
        true
    }

    /// Stop decode ticks but keep the stream open
    pub fn stop_scanning(&self) {
        {
            let mut status = lock(&self.shared.status);
            if let ScannerState::Active { .. } = status.state {
                status.state = ScannerState::Active { scanning: false };
            }
        }
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
    }

    /// Stop scanning and release the device
    pub async fn stop(&self) {
        self.stop_scanning();

        let mut device = self.shared.device.lock().await;
        if let Some(mut stream) = device.take() {
            stream.release();
            info!("Camera stream released");
        }
        lock(&self.shared.status).state = ScannerState::Stopped;
    }

    /// Reopen with the opposite facing mode, keeping the scanning flag
    pub async fn switch_camera(&self) -> Result<(), ScannerError> {
        let was_scanning = self.is_scanning();
        self.stop_scanning();

        let mut device = self.shared.device.lock().await;
        let Some(mut previous) = device.take() else {
            let mut status = lock(&self.shared.status);
            status.facing = status.facing.opposite();
            return Ok(());
        };
        // Release before acquiring the other camera
        previous.release();

        let facing = {
            let mut status = lock(&self.shared.status);
            status.facing = status.facing.opposite();
            status.state = ScannerState::Acquiring;
            status.facing
        };

        self.acquire(&mut device, facing).await?;
        drop(device);

        if was_scanning {
            self.start_scanning();
        }
        Ok(())
    }

    /// Current results, newest first
    pub fn results(&self) -> Vec<ScanResult> {
        lock(&self.shared.results).iter().cloned().collect()
    }

    /// Consume all results, newest first
    pub fn take_results(&self) -> Vec<ScanResult> {
        lock(&self.shared.results).drain(..).collect()
    }

    pub fn clear_results(&self) {
        lock(&self.shared.results).clear();
    }

    /// Wait for a result, consume everything and return the newest
    pub async fn next_result(&self) -> ScanResult {
        loop {
            let notified = self.shared.result_ready.notified();
            if let Some(newest) = self.take_results().into_iter().next() {
                return newest;
            }
            notified.await;
        }
    }

    /// Start, wait for the first decoded payload, then release the camera
    pub async fn scan_once(&self) -> Result<String, ScannerError> {
        self.clear_results();
        self.start().await?;
        let result = self.next_result().await;
        self.stop().await;
        Ok(result.data)
    }
}

impl Drop for QrScanner {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
        if let Ok(mut device) = self.shared.device.try_lock() {
            if let Some(mut stream) = device.take() {
                stream.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::camera::Frame;
    use crate::scanner::decoder::{Decoded, Point};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct DeviceLog {
        opens: AtomicUsize,
        open_streams: AtomicUsize,
        max_open_streams: AtomicUsize,
        last_facing: Mutex<Option<FacingMode>>,
    }

    struct FakeCamera {
        supported: bool,
        failure: Option<ScannerError>,
        log: Arc<DeviceLog>,
    }

    impl FakeCamera {
        fn working() -> Self {
            Self {
                supported: true,
                failure: None,
                log: Arc::new(DeviceLog::default()),
            }
        }
    }

    struct FakeStream {
        facing: FacingMode,
        released: bool,
        log: Arc<DeviceLog>,
    }

    #[async_trait]
    impl Camera for FakeCamera {
        fn is_supported(&self) -> bool {
            self.supported
        }

        async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, ScannerError> {
            self.log.opens.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.failure {
                return Err(e.clone());
            }
            let open = self.log.open_streams.fetch_add(1, Ordering::SeqCst) + 1;
            self.log.max_open_streams.fetch_max(open, Ordering::SeqCst);
            *lock(&self.log.last_facing) = Some(facing);
            Ok(Box::new(FakeStream {
                facing,
                released: false,
                log: Arc::clone(&self.log),
            }))
        }
    }

    impl VideoStream for FakeStream {
        fn facing_mode(&self) -> FacingMode {
            self.facing
        }

        fn latest_frame(&self) -> Option<Frame> {
            Some(Frame::new(2, 2, vec![0, 255, 255, 0]))
        }

        fn release(&mut self) {
            if !self.released {
                self.released = true;
                self.log.open_streams.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    struct FakeDecoder {
        payload: Option<String>,
        delay: Duration,
        calls: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl FakeDecoder {
        fn new(payload: Option<&str>, delay: Duration) -> Self {
            Self {
                payload: payload.map(str::to_string),
                delay,
                calls: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FrameDecoder for FakeDecoder {
        async fn decode(&self, _frame: Frame) -> Option<Decoded> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            let corner = Point { x: 0.0, y: 0.0 };
            self.payload.clone().map(|data| Decoded {
                data,
                corners: [corner; 4],
            })
        }
    }

    fn options(interval_ms: u64, max_results: usize) -> ScannerOptions {
        ScannerOptions {
            facing_mode: FacingMode::Environment,
            scan_interval: Duration::from_millis(interval_ms),
            max_results,
        }
    }

    #[tokio::test]
    async fn test_start_decodes_and_reports_result() {
        let decoder = Arc::new(FakeDecoder::new(Some("QR-7"), Duration::from_millis(1)));
        let scanner = QrScanner::new(Arc::new(FakeCamera::working()), decoder, options(5, 1));

        assert!(scanner.can_start_scanning());
        scanner.start().await.unwrap();
        assert_eq!(scanner.state(), ScannerState::Active { scanning: true });

        let result = tokio::time::timeout(Duration::from_secs(2), scanner.next_result())
            .await
            .expect("no result decoded");
        assert_eq!(result.data, "QR-7");
        assert!(result.timestamp > 0);
    }

    #[tokio::test]
    async fn test_unsupported_camera_never_starts() {
        let camera = FakeCamera {
            supported: false,
            failure: None,
            log: Arc::new(DeviceLog::default()),
        };
        let log = Arc::clone(&camera.log);
        let decoder = Arc::new(FakeDecoder::new(Some("QR-7"), Duration::ZERO));
        let scanner = QrScanner::new(Arc::new(camera), decoder, options(5, 1));

        assert!(!scanner.is_supported());
        assert!(!scanner.can_start_scanning());
        assert_eq!(scanner.start().await, Err(ScannerError::Unsupported));
        assert_eq!(scanner.state(), ScannerState::Idle);
        assert_eq!(log.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_leaves_idle_with_error() {
        let camera = FakeCamera {
            supported: true,
            failure: Some(ScannerError::PermissionDenied),
            log: Arc::new(DeviceLog::default()),
        };
        let decoder = Arc::new(FakeDecoder::new(Some("QR-7"), Duration::ZERO));
        let scanner = QrScanner::new(Arc::new(camera), decoder, options(5, 1));

        assert_eq!(scanner.start().await, Err(ScannerError::PermissionDenied));
        assert_eq!(scanner.state(), ScannerState::Idle);
        assert_eq!(scanner.last_error(), Some(ScannerError::PermissionDenied));
        assert!(!scanner.is_scanning());
    }

    #[tokio::test]
    async fn test_at_most_one_decode_in_flight() {
        // Decodes take much longer than the tick interval
        let decoder = Arc::new(FakeDecoder::new(None, Duration::from_millis(40)));
        let camera = Arc::new(FakeCamera::working());
        let scanner = QrScanner::new(camera, decoder.clone(), options(2, 1));

        scanner.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        scanner.stop().await;

        assert_eq!(decoder.max_running.load(Ordering::SeqCst), 1);
        assert!(decoder.calls.load(Ordering::SeqCst) >= 2);
        assert!(scanner.skipped_ticks() > 0);
    }

    #[tokio::test]
    async fn test_failed_decodes_are_retried_silently() {
        let decoder = Arc::new(FakeDecoder::new(None, Duration::ZERO));
        let camera = Arc::new(FakeCamera::working());
        let scanner = QrScanner::new(camera, decoder.clone(), options(5, 1));

        scanner.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(decoder.calls.load(Ordering::SeqCst) > 1);
        assert!(scanner.results().is_empty());
        assert!(scanner.last_error().is_none());
        assert!(scanner.is_scanning());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_results_are_capped_and_consumed() {
        let decoder = Arc::new(FakeDecoder::new(Some("QR-1"), Duration::ZERO));
        let scanner = QrScanner::new(Arc::new(FakeCamera::working()), decoder, options(2, 2));

        scanner.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        scanner.stop_scanning();

        let results = scanner.take_results();
        assert_eq!(results.len(), 2);
        assert!(results[0].timestamp >= results[1].timestamp);
        assert!(scanner.results().is_empty());
        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_switch_camera_releases_before_reacquiring() {
        let camera = FakeCamera::working();
        let log = Arc::clone(&camera.log);
        let decoder = Arc::new(FakeDecoder::new(None, Duration::ZERO));
        let scanner = QrScanner::new(Arc::new(camera), decoder, options(5, 1));

        scanner.start().await.unwrap();
        scanner.switch_camera().await.unwrap();

        assert_eq!(scanner.facing_mode(), FacingMode::User);
        assert_eq!(*lock(&log.last_facing), Some(FacingMode::User));
        assert_eq!(scanner.state(), ScannerState::Active { scanning: true });
        assert_eq!(log.opens.load(Ordering::SeqCst), 2);
        assert_eq!(log.max_open_streams.load(Ordering::SeqCst), 1);

        scanner.stop().await;
        assert_eq!(log.open_streams.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_switch_camera_keeps_scanning_off() {
        let decoder = Arc::new(FakeDecoder::new(None, Duration::ZERO));
        let scanner = QrScanner::new(Arc::new(FakeCamera::working()), decoder, options(5, 1));

        scanner.start().await.unwrap();
        scanner.stop_scanning();
        scanner.switch_camera().await.unwrap();

        assert_eq!(scanner.state(), ScannerState::Active { scanning: false });
        scanner.stop().await;
    }

    #[tokio::test]
    async fn test_stop_releases_device() {
        let camera = FakeCamera::working();
        let log = Arc::clone(&camera.log);
        let decoder = Arc::new(FakeDecoder::new(Some("QR-3"), Duration::ZERO));
        let scanner = QrScanner::new(Arc::new(camera), decoder, options(5, 1));

        scanner.start().await.unwrap();
        scanner.stop().await;

        assert_eq!(scanner.state(), ScannerState::Stopped);
        assert_eq!(log.open_streams.load(Ordering::SeqCst), 0);
        assert!(scanner.can_start_scanning());

        scanner.clear_results();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(scanner.results().is_empty());
    }

    #[tokio::test]
    async fn test_scan_once_returns_payload_and_releases() {
        let camera = FakeCamera::working();
        let log = Arc::clone(&camera.log);
        let decoder = Arc::new(FakeDecoder::new(Some("QR-42"), Duration::from_millis(1)));
        let scanner = QrScanner::new(Arc::new(camera), decoder, options(5, 1));

        let data = tokio::time::timeout(Duration::from_secs(2), scanner.scan_once())
            .await
            .expect("scan timed out")
            .unwrap();

        assert_eq!(data, "QR-42");
        assert_eq!(scanner.state(), ScannerState::Stopped);
        assert_eq!(log.open_streams.load(Ordering::SeqCst), 0);
    }
}
