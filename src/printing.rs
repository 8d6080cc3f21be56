//! # Printing Screen
//!
//! Turns a rendered view into a receipt on the selected printer.
//!
//! ## Print Attempt
//!
//! ```text
//! build receipt ──► connect ──► begin transaction ──► printable? ──► send
//!      │               │              │ (failure logged,     │          │
//!      │               │              │  attempt continues)  │          │
//!      └───────────────┴──────────────┴──────── failure ─────┴──────────┘
//!                                         ▼
//!                     teardown: end transaction, disconnect, clear buffer
//! ```
//!
//! Every SDK failure is logged and reported to the caller as `false`.
//! A successful send leaves the printer connected for the next attempt; the
//! screen tears down when dropped.
//!
//! ## Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use tmprint::discovery::Selection;
//! use tmprint::printer::PrinterModel;
//! use tmprint::printing::PrintScreen;
//! use tmprint::sdk::sim::SimPrinterFactory;
//!
//! let sdk = SimPrinterFactory::new();
//! let selection = Selection { target: "BT:00:11".to_string() };
//! let mut screen = PrintScreen::open(sdk.clone(), PrinterModel::TM_P80, Some(selection));
//!
//! let image = RgbaImage::from_pixel(576, 120, Rgba([0, 0, 0, 255]));
//! assert!(screen.print_connect(&image));
//! assert_eq!(sdk.jobs().len(), 1);
//! ```

use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use tracing::{debug, error, info, warn};

use crate::discovery::Selection;
use crate::error::TmprintError;
use crate::printer::PrinterModel;
use crate::render::view::{self, View};
use crate::sdk::{
    Align, CallbackCode, ConnectionEvent, CutType, ImageParams, Printer, PrinterEventListener,
    PrinterFactory, PrinterStatus, StatusEvent,
};
use crate::ui::{self, UiDispatcher, UiQueue};

/// `true` only when the printer is both connected and online.
///
/// ```
/// use tmprint::printing::is_printable;
/// use tmprint::sdk::PrinterStatus;
///
/// assert!(!is_printable(Some(&PrinterStatus { connection: false, online: true })));
/// assert!(is_printable(Some(&PrinterStatus { connection: true, online: true })));
/// assert!(!is_printable(None));
/// ```
pub fn is_printable(status: Option<&PrinterStatus>) -> bool {
    matches!(status, Some(s) if s.connection && s.online)
}

/// Last step reached by the screen's printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintState {
    Idle,
    Connecting,
    Connected,
    TransactionOpen,
    DataQueued,
    Sent,
    Disconnected,
}

/// SDK callback, marshaled onto the screen's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterEvent {
    Received {
        code: CallbackCode,
        status: PrinterStatus,
        job_id: String,
    },
    Connection(ConnectionEvent),
    StatusChanged(StatusEvent),
}

/// What goes on a receipt besides the image, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReceiptSettings {
    pub align: Align,
    pub image: ImageParams,
    pub feed_lines: u32,
    pub cut: CutType,
    /// `None` uses the SDK default
    pub connect_timeout: Option<Duration>,
    /// `None` uses the SDK default
    pub send_timeout: Option<Duration>,
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        Self {
            align: Align::Center,
            image: ImageParams::default(),
            feed_lines: 2,
            cut: CutType::Feed,
            connect_timeout: None,
            send_timeout: None,
        }
    }
}

/// Listener registered with the printer handle. Runs on the SDK's thread.
struct EventForwarder {
    ui: UiDispatcher<PrinterEvent>,
}

impl PrinterEventListener for EventForwarder {
    fn on_receive(&self, code: CallbackCode, status: PrinterStatus, print_job_id: &str) {
        self.ui.post(PrinterEvent::Received {
            code,
            status,
            job_id: print_job_id.to_string(),
        });
    }

    fn on_connection(&self, event: ConnectionEvent) {
        self.ui.post(PrinterEvent::Connection(event));
    }

    fn on_status_change(&self, event: StatusEvent) {
        self.ui.post(PrinterEvent::StatusChanged(event));
    }
}

/// Printing workflow over a [`PrinterFactory`] backend.
///
/// Owns at most one printer handle, created on first use.
pub struct PrintScreen<F: PrinterFactory> {
    factory: F,
    model: PrinterModel,
    target: Option<String>,
    settings: ReceiptSettings,
    printer: Option<Box<dyn Printer>>,
    state: PrintState,
    transaction_open: bool,
    dispatcher: UiDispatcher<PrinterEvent>,
    events: UiQueue<PrinterEvent>,
}

impl<F: PrinterFactory> PrintScreen<F> {
    /// Screen for `target`. Nothing is created until [`initialize`](Self::initialize).
    pub fn new(factory: F, model: PrinterModel, target: Option<String>) -> Self {
        let (dispatcher, events) = ui::channel();
        Self {
            factory,
            model,
            target,
            settings: ReceiptSettings::default(),
            printer: None,
            state: PrintState::Idle,
            transaction_open: false,
            dispatcher,
            events,
        }
    }

    /// Open the screen for a selection handed over from discovery.
    ///
    /// With a target the printer handle is created right away; without one
    /// the screen stays inert and every print returns `false`.
    pub fn open(factory: F, model: PrinterModel, selection: Option<Selection>) -> Self {
        let mut screen = Self::new(factory, model, selection.map(|s| s.target));
        if screen.target.is_some() {
            screen.initialize();
        }
        screen
    }

    pub fn with_settings(mut self, settings: ReceiptSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Create the printer handle if it does not exist yet.
    pub fn initialize(&mut self) -> bool {
        if self.printer.is_some() {
            return true;
        }

        let listener = Arc::new(EventForwarder {
            ui: self.dispatcher.clone(),
        });
        match self
            .factory
            .create(self.model.series, self.model.lang, listener)
        {
            Ok(printer) => {
                info!(model = self.model.name, "printer handle created");
                self.printer = Some(printer);
                true
            }
            Err(e) => {
                error!(model = self.model.name, error = %e, "failed to create printer handle");
                false
            }
        }
    }

    /// Connect and open a transaction, unless already connected.
    pub fn connect(&mut self) -> bool {
        match self.try_connect() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "connect failed");
                self.state = PrintState::Disconnected;
                false
            }
        }
    }

    fn try_connect(&mut self) -> Result<(), TmprintError> {
        let target = self.target.clone().ok_or(TmprintError::NoTarget)?;
        let timeout = self.settings.connect_timeout;
        let printer = self.printer.as_mut().ok_or(TmprintError::NotInitialized)?;

        if printer.status().connection {
            return Ok(());
        }

        self.state = PrintState::Connecting;
        info!(address = %target, "connecting to printer");
        printer.connect(&target, timeout)?;
        self.state = PrintState::Connected;

        // A transaction that fails to open does not abort the connection.
        match printer.begin_transaction() {
            Ok(()) => {
                self.transaction_open = true;
                self.state = PrintState::TransactionOpen;
            }
            Err(e) => warn!(error = %e, "failed to begin transaction"),
        }

        Ok(())
    }

    /// Capture `view` at its measured size.
    pub fn render(&self, view: &dyn View) -> RgbaImage {
        view::capture(view)
    }

    /// Queue alignment, image, feed and cut. On failure the buffer is reset.
    pub fn build_receipt(&mut self, image: &RgbaImage) -> bool {
        match self.try_build_receipt(image) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to build receipt");
                if let Some(printer) = self.printer.as_mut() {
                    printer.clear_command_buffer();
                }
                false
            }
        }
    }

    fn try_build_receipt(&mut self, image: &RgbaImage) -> Result<(), TmprintError> {
        let settings = self.settings;
        let printer = self.printer.as_mut().ok_or(TmprintError::NotInitialized)?;

        printer.clear_command_buffer();
        printer.add_text_align(settings.align)?;
        printer.add_image(image, &settings.image)?;
        printer.add_feed_line(settings.feed_lines)?;
        printer.add_cut(settings.cut)?;

        self.state = PrintState::DataQueued;
        debug!(
            width = image.width(),
            height = image.height(),
            "receipt queued"
        );
        Ok(())
    }

    /// Connect if needed and transmit the buffer. Any failure tears down.
    pub fn send(&mut self) -> bool {
        match self.try_send() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "failed to send receipt");
                self.teardown();
                false
            }
        }
    }

    fn try_send(&mut self) -> Result<(), TmprintError> {
        if self.printer.is_none() {
            return Err(TmprintError::NotInitialized);
        }
        self.try_connect()?;

        let timeout = self.settings.send_timeout;
        let printer = self.printer.as_mut().ok_or(TmprintError::NotInitialized)?;

        let status = printer.status();
        if !is_printable(Some(&status)) {
            return Err(TmprintError::NotPrintable(status));
        }

        printer.send_data(timeout)?;
        self.state = PrintState::Sent;
        info!("receipt sent");
        Ok(())
    }

    /// End the transaction, disconnect and clear the buffer, as far as
    /// each applies. Safe to call in any state.
    pub fn teardown(&mut self) {
        let Some(printer) = self.printer.as_mut() else {
            return;
        };

        let connected = printer.status().connection;
        if self.transaction_open && connected {
            if let Err(e) = printer.end_transaction() {
                warn!(error = %e, "failed to end transaction");
            }
        }
        self.transaction_open = false;

        if connected {
            match printer.disconnect() {
                Ok(()) => info!("printer disconnected"),
                Err(e) => warn!(error = %e, "failed to disconnect"),
            }
        }

        printer.clear_command_buffer();
        self.state = PrintState::Disconnected;
    }

    /// Build the receipt for `image` and send it.
    ///
    /// `true` means the printer accepted the data; the physical result is not
    /// observed. Callbacks raised during the attempt are logged before this
    /// returns.
    pub fn print_connect(&mut self, image: &RgbaImage) -> bool {
        let printed = self.attempt(image);
        self.pump_events();
        printed
    }

    fn attempt(&mut self, image: &RgbaImage) -> bool {
        if self.printer.is_none() {
            warn!("no printer handle, ignoring print");
            return false;
        }

        if !self.build_receipt(image) {
            self.teardown();
            return false;
        }

        self.send()
    }

    /// Render `view` and print it.
    pub fn print_view(&mut self, view: &dyn View) -> bool {
        let image = self.render(view);
        self.print_connect(&image)
    }

    /// Apply SDK callbacks queued since the last print or pump. They are
    /// only logged.
    pub fn pump_events(&mut self) -> Vec<PrinterEvent> {
        let events = self.events.drain();
        for event in &events {
            match event {
                PrinterEvent::Received {
                    code,
                    status,
                    job_id,
                } => debug!(?code, %status, job_id = %job_id, "data received"),
                PrinterEvent::Connection(e) => debug!(event = ?e, "connection changed"),
                PrinterEvent::StatusChanged(e) => debug!(event = ?e, "status changed"),
            }
        }
        events
    }

    /// Current status, if a handle exists.
    pub fn status(&self) -> Option<PrinterStatus> {
        self.printer.as_ref().map(|p| p.status())
    }

    pub fn is_initialized(&self) -> bool {
        self.printer.is_some()
    }

    pub fn state(&self) -> PrintState {
        self.state
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn model(&self) -> &PrinterModel {
        &self.model
    }

    pub fn settings(&self) -> &ReceiptSettings {
        &self.settings
    }
}

impl<F: PrinterFactory> Drop for PrintScreen<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

// ============================================================================
// TESTS
// ============================================================================
