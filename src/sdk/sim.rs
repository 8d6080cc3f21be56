//! # Simulated Printer SDK
//!
//! In-memory implementation of the [`sdk`](crate::sdk) traits. It behaves like
//! the vendor SDK at the level the workflows observe (state checks, busy
//! errors, callbacks from a foreign thread) and records everything it is
//! asked to do so the result can be inspected or rendered with
//! [`render::preview`](crate::render::preview).
//!
//! Both [`SimDiscovery`] and [`SimPrinterFactory`] are cheap handles over
//! shared state: keep a clone to inspect or steer the device while a screen
//! owns the other.
//!
//! ## Example
//!
//! ```
//! use tmprint::sdk::sim::{SdkCall, SimPrinterFactory};
//! use tmprint::error::ErrorStatus;
//!
//! let factory = SimPrinterFactory::new();
//! factory.fail(SdkCall::SendData, ErrorStatus::Timeout);
//! assert!(factory.jobs().is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbaImage;

use super::{
    Align, CallbackCode, ConnectionEvent, CutType, DeviceInfo, Discovery, DiscoveryListener,
    FilterOption, ImageParams, ModelLang, Printer, PrinterEventListener, PrinterFactory,
    PrinterStatus, Series, StatusEvent,
};
use crate::error::{ErrorStatus, SdkError};

/// Largest feed the SDK accepts in one command.
const MAX_FEED_LINES: u32 = 255;

/// Accepted brightness range for images.
const BRIGHTNESS_RANGE: std::ops::RangeInclusive<f64> = 0.1..=10.0;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// DISCOVERY
// ============================================================================

#[derive(Default)]
struct DiscoveryState {
    listener: Option<Arc<dyn DiscoveryListener>>,
    scripted: Vec<DeviceInfo>,
    interval: Duration,
    cancel: Option<Arc<AtomicBool>>,
    worker: Option<JoinHandle<()>>,
    start_fault: Option<ErrorStatus>,
    stop_fault: Option<ErrorStatus>,
    last_filter: Option<FilterOption>,
    starts: usize,
}

/// Simulated discovery service.
///
/// Scripted devices are announced from a worker thread each time a scan
/// starts, like the real SDK which reports from its own thread.
#[derive(Clone, Default)]
pub struct SimDiscovery {
    inner: Arc<Mutex<DiscoveryState>>,
}

impl SimDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices announced on every scan, in order.
    pub fn with_devices(self, devices: impl IntoIterator<Item = DeviceInfo>) -> Self {
        lock(&self.inner).scripted = devices.into_iter().collect();
        self
    }

    /// Delay before each scripted announcement.
    pub fn with_interval(self, interval: Duration) -> Self {
        lock(&self.inner).interval = interval;
        self
    }

    /// Announce a device to the running scan from the caller's thread.
    ///
    /// Returns `false` when no scan is running.
    pub fn announce(&self, device: DeviceInfo) -> bool {
        let listener = lock(&self.inner).listener.clone();
        match listener {
            Some(listener) => {
                listener.on_discovery(device);
                true
            }
            None => false,
        }
    }

    /// Make the next `start` fail with `status`.
    pub fn fail_next_start(&self, status: ErrorStatus) {
        lock(&self.inner).start_fault = Some(status);
    }

    /// Make the next `stop` fail with `status`.
    pub fn fail_next_stop(&self, status: ErrorStatus) {
        lock(&self.inner).stop_fault = Some(status);
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).listener.is_some()
    }

    /// Filter passed to the most recent successful `start`.
    pub fn last_filter(&self) -> Option<FilterOption> {
        lock(&self.inner).last_filter
    }

    /// Number of successful starts.
    pub fn starts(&self) -> usize {
        lock(&self.inner).starts
    }
}

impl Discovery for SimDiscovery {
    fn start(
        &self,
        filter: &FilterOption,
        listener: Arc<dyn DiscoveryListener>,
    ) -> Result<(), SdkError> {
        let mut state = lock(&self.inner);

        if let Some(status) = state.start_fault.take() {
            return Err(SdkError::new("start", status));
        }
        if state.listener.is_some() {
            return Err(SdkError::new("start", ErrorStatus::Processing));
        }

        state.last_filter = Some(*filter);
        state.starts += 1;
        state.listener = Some(Arc::clone(&listener));

        if !state.scripted.is_empty() {
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&cancel);
            let devices = state.scripted.clone();
            let interval = state.interval;

            state.worker = Some(thread::spawn(move || {
                for device in devices {
                    if !interval.is_zero() {
                        thread::sleep(interval);
                    }
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    listener.on_discovery(device);
                }
            }));
            state.cancel = Some(cancel);
        }

        Ok(())
    }

    fn stop(&self) -> Result<(), SdkError> {
        let (worker, cancel) = {
            let mut state = lock(&self.inner);
            if let Some(status) = state.stop_fault.take() {
                return Err(SdkError::new("stop", status));
            }
            state.listener = None;
            (state.worker.take(), state.cancel.take())
        };

        if let Some(cancel) = cancel {
            cancel.store(true, Ordering::Release);
        }
        if let Some(worker) = worker {
            if worker.join().is_err() {
                return Err(SdkError::new("stop", ErrorStatus::Failure));
            }
        }

        Ok(())
    }
}

// ============================================================================
// PRINTER
// ============================================================================

/// SDK entry points, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkCall {
    Create,
    Connect,
    Disconnect,
    BeginTransaction,
    EndTransaction,
    ClearCommandBuffer,
    AddTextAlign,
    AddImage,
    AddFeedLine,
    AddCut,
    SendData,
}

/// A command sitting in the printer's buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum QueuedCommand {
    TextAlign(Align),
    Image { image: RgbaImage, params: ImageParams },
    FeedLine(u32),
    Cut(CutType),
}

/// Data accepted by `send_data`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub id: String,
    pub target: String,
    pub commands: Vec<QueuedCommand>,
}

struct PrinterState {
    online: bool,
    reachable: Option<HashSet<String>>,
    connected: Option<String>,
    in_transaction: bool,
    buffer: Vec<QueuedCommand>,
    jobs: Vec<PrintJob>,
    calls: Vec<SdkCall>,
    faults: HashMap<SdkCall, ErrorStatus>,
    created: Vec<(Series, ModelLang)>,
    listeners: Vec<Arc<dyn PrinterEventListener>>,
}

impl Default for PrinterState {
    fn default() -> Self {
        Self {
            online: true,
            reachable: None,
            connected: None,
            in_transaction: false,
            buffer: Vec::new(),
            jobs: Vec::new(),
            calls: Vec::new(),
            faults: HashMap::new(),
            created: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl PrinterState {
    /// Record `call` and fail it if a fault is injected.
    fn enter(&mut self, call: SdkCall, operation: &'static str) -> Result<(), SdkError> {
        self.calls.push(call);
        match self.faults.get(&call) {
            Some(&status) => Err(SdkError::new(operation, status)),
            None => Ok(()),
        }
    }

    fn status(&self) -> PrinterStatus {
        let connection = self.connected.is_some();
        PrinterStatus {
            connection,
            online: connection && self.online,
        }
    }

    fn require_connection(&self, operation: &'static str) -> Result<(), SdkError> {
        match self.connected {
            Some(_) => Ok(()),
            None => Err(SdkError::new(operation, ErrorStatus::Disconnect)),
        }
    }
}

/// Simulated printer factory and device.
///
/// Every handle it creates talks to the same simulated device.
#[derive(Clone, Default)]
pub struct SimPrinterFactory {
    shared: Arc<Mutex<PrinterState>>,
}

impl SimPrinterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put the device online or offline. Connected listeners get a status
    /// event.
    pub fn set_online(&self, online: bool) {
        let listeners = {
            let mut state = lock(&self.shared);
            state.online = online;
            if state.connected.is_some() {
                state.listeners.clone()
            } else {
                Vec::new()
            }
        };
        let event = if online {
            StatusEvent::Online
        } else {
            StatusEvent::Offline
        };
        for listener in listeners {
            listener.on_status_change(event);
        }
    }

    /// Restrict the targets `connect` accepts. By default any target works.
    pub fn set_reachable<I, S>(&self, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.shared).reachable = Some(targets.into_iter().map(Into::into).collect());
    }

    /// Fail every subsequent `call` with `status` until cleared.
    pub fn fail(&self, call: SdkCall, status: ErrorStatus) {
        lock(&self.shared).faults.insert(call, status);
    }

    pub fn clear_faults(&self) {
        lock(&self.shared).faults.clear();
    }

    /// Simulate the link dropping underneath a connected handle.
    pub fn drop_connection(&self) {
        let listeners = {
            let mut state = lock(&self.shared);
            if state.connected.take().is_none() {
                return;
            }
            state.in_transaction = false;
            state.listeners.clone()
        };
        for listener in listeners {
            listener.on_connection(ConnectionEvent::Disconnect);
        }
    }

    /// Every SDK call made so far, in order.
    pub fn calls(&self) -> Vec<SdkCall> {
        lock(&self.shared).calls.clone()
    }

    /// How many times `call` was made.
    pub fn count(&self, call: SdkCall) -> usize {
        lock(&self.shared).calls.iter().filter(|&&c| c == call).count()
    }

    pub fn jobs(&self) -> Vec<PrintJob> {
        lock(&self.shared).jobs.clone()
    }

    pub fn last_job(&self) -> Option<PrintJob> {
        lock(&self.shared).jobs.last().cloned()
    }

    /// Commands queued but not yet sent.
    pub fn buffer_len(&self) -> usize {
        lock(&self.shared).buffer.len()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.shared).connected.is_some()
    }

    pub fn in_transaction(&self) -> bool {
        lock(&self.shared).in_transaction
    }

    /// Number of printer handles created.
    pub fn created(&self) -> usize {
        lock(&self.shared).created.len()
    }
}

impl PrinterFactory for SimPrinterFactory {
    fn create(
        &self,
        series: Series,
        lang: ModelLang,
        listener: Arc<dyn PrinterEventListener>,
    ) -> Result<Box<dyn Printer>, SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::Create, "create")?;
        state.created.push((series, lang));
        state.listeners.push(listener);

        Ok(Box::new(SimPrinter {
            shared: Arc::clone(&self.shared),
        }))
    }
}

/// Handle onto the simulated device.
pub struct SimPrinter {
    shared: Arc<Mutex<PrinterState>>,
}

impl Printer for SimPrinter {
    fn connect(&mut self, target: &str, _timeout: Option<Duration>) -> Result<(), SdkError> {
        let listeners = {
            let mut state = lock(&self.shared);
            state.enter(SdkCall::Connect, "connect")?;

            if state.connected.is_some() {
                return Err(SdkError::new("connect", ErrorStatus::Illegal));
            }
            if let Some(reachable) = &state.reachable {
                if !reachable.contains(target) {
                    return Err(SdkError::new("connect", ErrorStatus::Connect));
                }
            }

            state.connected = Some(target.to_string());
            if state.online {
                state.listeners.clone()
            } else {
                Vec::new()
            }
        };

        for listener in listeners {
            listener.on_status_change(StatusEvent::Online);
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::Disconnect, "disconnect")?;

        if state.connected.take().is_none() {
            return Err(SdkError::new("disconnect", ErrorStatus::Illegal));
        }
        state.in_transaction = false;
        Ok(())
    }

    fn begin_transaction(&mut self) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::BeginTransaction, "beginTransaction")?;
        state.require_connection("beginTransaction")?;

        if state.in_transaction {
            return Err(SdkError::new("beginTransaction", ErrorStatus::Illegal));
        }
        state.in_transaction = true;
        Ok(())
    }

    fn end_transaction(&mut self) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::EndTransaction, "endTransaction")?;
        state.require_connection("endTransaction")?;

        if !state.in_transaction {
            return Err(SdkError::new("endTransaction", ErrorStatus::Illegal));
        }
        state.in_transaction = false;
        Ok(())
    }

    fn clear_command_buffer(&mut self) {
        let mut state = lock(&self.shared);
        state.calls.push(SdkCall::ClearCommandBuffer);
        state.buffer.clear();
    }

    fn add_text_align(&mut self, align: Align) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::AddTextAlign, "addTextAlign")?;
        state.buffer.push(QueuedCommand::TextAlign(align));
        Ok(())
    }

    fn add_image(&mut self, image: &RgbaImage, params: &ImageParams) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::AddImage, "addImage")?;

        if image.width() == 0 || image.height() == 0 {
            return Err(SdkError::new("addImage", ErrorStatus::Param));
        }
        if let Some(brightness) = params.brightness {
            if !BRIGHTNESS_RANGE.contains(&brightness) {
                return Err(SdkError::new("addImage", ErrorStatus::Param));
            }
        }

        state.buffer.push(QueuedCommand::Image {
            image: image.clone(),
            params: *params,
        });
        Ok(())
    }

    fn add_feed_line(&mut self, lines: u32) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::AddFeedLine, "addFeedLine")?;

        if lines > MAX_FEED_LINES {
            return Err(SdkError::new("addFeedLine", ErrorStatus::Param));
        }
        state.buffer.push(QueuedCommand::FeedLine(lines));
        Ok(())
    }

    fn add_cut(&mut self, cut: CutType) -> Result<(), SdkError> {
        let mut state = lock(&self.shared);
        state.enter(SdkCall::AddCut, "addCut")?;
        state.buffer.push(QueuedCommand::Cut(cut));
        Ok(())
    }

    fn send_data(&mut self, _timeout: Option<Duration>) -> Result<(), SdkError> {
        let (listeners, status, id) = {
            let mut state = lock(&self.shared);
            state.enter(SdkCall::SendData, "sendData")?;
            state.require_connection("sendData")?;

            if !state.online {
                return Err(SdkError::new("sendData", ErrorStatus::Failure));
            }

            let id = format!("sim-{}", state.jobs.len() + 1);
            let job = PrintJob {
                id: id.clone(),
                target: state.connected.clone().unwrap_or_default(),
                commands: std::mem::take(&mut state.buffer),
            };
            state.jobs.push(job);
            (state.listeners.clone(), state.status(), id)
        };

        for listener in listeners {
            listener.on_receive(CallbackCode::Success, status, &id);
        }
        Ok(())
    }

    fn status(&self) -> PrinterStatus {
        lock(&self.shared).status()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    struct Collect(Mutex<mpsc::Sender<DeviceInfo>>);

    impl DiscoveryListener for Collect {
        fn on_discovery(&self, device: DeviceInfo) {
            let _ = lock(&self.0).send(device);
        }
    }

    struct Quiet;

    impl PrinterEventListener for Quiet {
        fn on_receive(&self, _: CallbackCode, _: PrinterStatus, _: &str) {}
        fn on_connection(&self, _: ConnectionEvent) {}
        fn on_status_change(&self, _: StatusEvent) {}
    }

    fn printer(factory: &SimPrinterFactory) -> Box<dyn Printer> {
        factory
            .create(Series::TmP80, ModelLang::Ank, Arc::new(Quiet))
            .unwrap()
    }

    #[test]
    fn test_discovery_start_while_running_is_busy() {
        let (tx, _rx) = mpsc::channel();
        let discovery = SimDiscovery::new();
        let listener: Arc<dyn DiscoveryListener> = Arc::new(Collect(Mutex::new(tx)));

        discovery
            .start(&FilterOption::default(), Arc::clone(&listener))
            .unwrap();
        let err = discovery
            .start(&FilterOption::default(), listener)
            .unwrap_err();
        assert!(err.is_busy());
        assert_eq!(discovery.starts(), 1);
    }

    #[test]
    fn test_discovery_announces_scripted_devices_from_worker() {
        let (tx, rx) = mpsc::channel();
        let discovery = SimDiscovery::new().with_devices([
            DeviceInfo::new("TM-P80", "BT:00:11"),
            DeviceInfo::new("TM-m30", "TCP:192.168.0.20"),
        ]);

        discovery
            .start(&FilterOption::default(), Arc::new(Collect(Mutex::new(tx))))
            .unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.target, "BT:00:11");
        assert_eq!(second.target, "TCP:192.168.0.20");

        discovery.stop().unwrap();
        assert!(!discovery.is_running());
    }

    #[test]
    fn test_discovery_stop_when_idle_is_ok() {
        let discovery = SimDiscovery::new();
        assert!(discovery.stop().is_ok());
        assert!(!discovery.announce(DeviceInfo::new("TM-P80", "BT:00:11")));
    }

    #[test]
    fn test_discovery_injected_faults_are_one_shot() {
        let discovery = SimDiscovery::new();
        discovery.fail_next_stop(ErrorStatus::Failure);
        assert_eq!(discovery.stop().unwrap_err().status, ErrorStatus::Failure);
        assert!(discovery.stop().is_ok());
    }

    #[test]
    fn test_connect_rejects_unreachable_target() {
        let factory = SimPrinterFactory::new();
        factory.set_reachable(["BT:00:11"]);
        let mut printer = printer(&factory);

        let err = printer.connect("BT:99:99", None).unwrap_err();
        assert_eq!(err.status, ErrorStatus::Connect);
        assert!(printer.connect("BT:00:11", None).is_ok());
        assert!(printer.status().connection);
    }

    #[test]
    fn test_transaction_requires_connection() {
        let factory = SimPrinterFactory::new();
        let mut printer = printer(&factory);

        assert_eq!(
            printer.begin_transaction().unwrap_err().status,
            ErrorStatus::Disconnect
        );
        printer.connect("BT:00:11", None).unwrap();
        printer.begin_transaction().unwrap();
        assert!(factory.in_transaction());
        printer.disconnect().unwrap();
        assert!(!factory.in_transaction());
    }

    #[test]
    fn test_send_moves_buffer_into_job() {
        let factory = SimPrinterFactory::new();
        let mut printer = printer(&factory);

        printer.connect("BT:00:11", None).unwrap();
        printer.add_feed_line(2).unwrap();
        printer.add_cut(CutType::Feed).unwrap();
        printer.send_data(None).unwrap();

        let job = factory.last_job().unwrap();
        assert_eq!(job.id, "sim-1");
        assert_eq!(job.target, "BT:00:11");
        assert_eq!(
            job.commands,
            vec![QueuedCommand::FeedLine(2), QueuedCommand::Cut(CutType::Feed)]
        );
        assert_eq!(factory.buffer_len(), 0);
    }

    #[test]
    fn test_offline_printer_refuses_data() {
        let factory = SimPrinterFactory::new();
        factory.set_online(false);
        let mut printer = printer(&factory);

        printer.connect("BT:00:11", None).unwrap();
        let status = printer.status();
        assert!(status.connection);
        assert!(!status.online);
        assert_eq!(
            printer.send_data(None).unwrap_err().status,
            ErrorStatus::Failure
        );
    }

    #[test]
    fn test_image_parameter_validation() {
        let factory = SimPrinterFactory::new();
        let mut printer = printer(&factory);

        let empty = RgbaImage::new(0, 0);
        assert_eq!(
            printer
                .add_image(&empty, &ImageParams::default())
                .unwrap_err()
                .status,
            ErrorStatus::Param
        );

        let params = ImageParams {
            brightness: Some(20.0),
            ..Default::default()
        };
        assert!(printer.add_image(&RgbaImage::new(8, 8), &params).is_err());
        assert!(printer.add_feed_line(256).is_err());
        assert_eq!(factory.buffer_len(), 0);
    }

    #[test]
    fn test_fault_injection_records_call() {
        let factory = SimPrinterFactory::new();
        factory.fail(SdkCall::Create, ErrorStatus::Memory);

        let result = factory.create(Series::TmP80, ModelLang::Ank, Arc::new(Quiet));
        assert!(result.is_err());
        assert_eq!(factory.created(), 0);
        assert_eq!(factory.calls(), vec![SdkCall::Create]);

        factory.clear_faults();
        assert!(
            factory
                .create(Series::TmP80, ModelLang::Ank, Arc::new(Quiet))
                .is_ok()
        );
        assert_eq!(factory.created(), 1);
    }
}
