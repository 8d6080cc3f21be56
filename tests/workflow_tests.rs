//! # Workflow Tests
//!
//! End-to-end runs of the discovery and printing screens against the
//! simulated SDK: device list behavior under repeated and restarted scans,
//! the handoff between screens, and the state the printer is left in after
//! every kind of failure.

use std::time::Duration;

use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;

use tmprint::error::ErrorStatus;
use tmprint::permissions::{Permission, StaticPermissions};
use tmprint::printing::{PrintState, is_printable};
use tmprint::render::dither::{BLACK, WHITE};
use tmprint::render::preview;
use tmprint::render::view::{ImageView, View};
use tmprint::sdk::sim::{SdkCall, SimDiscovery, SimPrinterFactory};
use tmprint::sdk::{DeviceInfo, PrinterStatus};
use tmprint::{DiscoveryScreen, PrintScreen, PrinterModel};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn tm_p80() -> DeviceInfo {
    DeviceInfo::new("TM-P80", "BT:00:11")
}

/// A view drawing a black bar across its top half.
struct Banner {
    width: u32,
    height: u32,
}

impl View for Banner {
    fn measured_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn draw(&self, canvas: &mut RgbaImage) {
        for y in 0..self.height / 2 {
            for x in 0..self.width {
                canvas.put_pixel(x, y, Rgba([0, 0, 0, 255]));
            }
        }
    }
}

fn open_printer(sdk: &SimPrinterFactory, target: &str) -> PrintScreen<SimPrinterFactory> {
    let mut screen = PrintScreen::new(sdk.clone(), PrinterModel::TM_P80, Some(target.to_string()));
    assert!(screen.initialize());
    screen
}

// ============================================================================
// DISCOVERY
// ============================================================================

#[test]
fn test_duplicate_announcements_then_restart() {
    let sdk = SimDiscovery::new();
    let mut screen = DiscoveryScreen::new(sdk.clone());
    assert!(screen.open(&mut StaticPermissions::granted(33)));

    sdk.announce(tm_p80());
    sdk.announce(tm_p80());
    screen.pump();
    assert_eq!(screen.devices(), &[tm_p80(), tm_p80()]);

    screen.restart().unwrap();
    assert_eq!(screen.devices().len(), 0);
}

#[test]
fn test_list_length_tracks_events_since_restart() {
    let sdk = SimDiscovery::new();
    let mut screen = DiscoveryScreen::new(sdk.clone());
    screen.start().unwrap();

    for round in 0..3 {
        for i in 0..=round {
            sdk.announce(DeviceInfo::new("TM-P80", format!("BT:00:{:02}", i)));
        }
        screen.pump();
        assert_eq!(screen.devices().len(), round + 1);
        screen.restart().unwrap();
        assert!(screen.devices().is_empty());
    }
}

#[test]
fn test_busy_restart_counts_reports_from_surviving_scan() {
    let sdk = SimDiscovery::new();
    let mut screen = DiscoveryScreen::new(sdk.clone());
    screen.start().unwrap();

    sdk.fail_next_stop(ErrorStatus::Processing);
    screen.restart().unwrap();
    assert!(sdk.is_running());

    sdk.announce(tm_p80());
    screen.pump();
    assert_eq!(screen.devices(), &[tm_p80()]);
}

#[test]
fn test_announcements_from_sdk_thread() {
    let sdk = SimDiscovery::new();
    let mut screen = DiscoveryScreen::new(sdk.clone());
    screen.start().unwrap();

    let announcer = sdk.clone();
    std::thread::spawn(move || {
        for _ in 0..10 {
            announcer.announce(tm_p80());
        }
    })
    .join()
    .unwrap();

    assert_eq!(screen.pump(), 10);
}

#[tokio::test]
async fn test_scripted_scan_collects_in_order() {
    let sdk = SimDiscovery::new().with_devices([
        DeviceInfo::new("TM-P80", "BT:00:11"),
        DeviceInfo::new("TM-m30", "TCP:192.168.1.40"),
        DeviceInfo::new("TM-P80", "BT:00:11"),
    ]);
    let mut screen = DiscoveryScreen::new(sdk);
    screen.start().unwrap();

    let mut seen = Vec::new();
    for _ in 0..3 {
        let device = tokio::time::timeout(Duration::from_secs(5), screen.next_device())
            .await
            .expect("scan timed out")
            .unwrap();
        seen.push(device.target);
    }

    assert_eq!(seen, vec!["BT:00:11", "TCP:192.168.1.40", "BT:00:11"]);
    assert_eq!(screen.devices().len(), 3);
}

#[test]
fn test_permission_denial_leaves_discovery_idle() {
    let sdk = SimDiscovery::new();
    let mut screen = DiscoveryScreen::new(sdk.clone());

    let mut host = StaticPermissions::granted(34).with(Permission::AccessFineLocation, false);
    assert!(!screen.open(&mut host));
    assert!(!sdk.is_running());

    sdk.announce(tm_p80());
    assert_eq!(screen.pump(), 0);
}

#[test]
fn test_start_failure_after_permission_is_not_fatal() {
    let sdk = SimDiscovery::new();
    sdk.fail_next_start(ErrorStatus::Failure);
    let mut screen = DiscoveryScreen::new(sdk.clone());

    assert!(!screen.open(&mut StaticPermissions::granted(33)));
    assert!(screen.restart().is_ok());
    assert!(screen.is_running());
}

// ============================================================================
// PRINTING
// ============================================================================

#[test]
fn test_is_printable_scenarios() {
    assert!(!is_printable(Some(&PrinterStatus {
        connection: false,
        online: true
    })));
    assert!(is_printable(Some(&PrinterStatus {
        connection: true,
        online: true
    })));
}

#[test]
fn test_discovery_to_print_handoff() {
    let discovery = SimDiscovery::new();
    let mut devices = DiscoveryScreen::new(discovery.clone());
    devices.open(&mut StaticPermissions::granted(30));
    discovery.announce(DeviceInfo::new("TM-m30", "TCP:10.0.0.7"));
    discovery.announce(tm_p80());
    devices.pump();

    let selection = devices.select(1);
    drop(devices);
    assert!(!discovery.is_running());

    let sdk = SimPrinterFactory::new();
    let mut printing = PrintScreen::open(sdk.clone(), PrinterModel::TM_P80, selection);
    assert_eq!(printing.target(), Some("BT:00:11"));

    assert!(printing.print_view(&Banner {
        width: 400,
        height: 60
    }));
    assert_eq!(sdk.last_job().unwrap().target, "BT:00:11");
}

#[test]
fn test_failure_at_every_build_step_never_sends() {
    for call in [SdkCall::AddTextAlign, SdkCall::AddImage, SdkCall::AddFeedLine, SdkCall::AddCut] {
        let sdk = SimPrinterFactory::new();
        sdk.fail(call, ErrorStatus::Memory);
        let mut screen = open_printer(&sdk, "BT:00:11");

        let image = RgbaImage::from_pixel(64, 64, Rgba([0, 0, 0, 255]));
        assert!(!screen.print_connect(&image), "{:?}", call);
        assert_eq!(sdk.count(SdkCall::SendData), 0, "{:?}", call);
        assert!(!sdk.is_connected(), "{:?}", call);
        assert_eq!(sdk.buffer_len(), 0, "{:?}", call);
        assert_eq!(screen.state(), PrintState::Disconnected);
    }
}

#[test]
fn test_recovery_after_failed_send() {
    let sdk = SimPrinterFactory::new();
    sdk.fail(SdkCall::SendData, ErrorStatus::Timeout);
    let mut screen = open_printer(&sdk, "BT:00:11");
    let view = Banner {
        width: 576,
        height: 40,
    };

    assert!(!screen.print_view(&view));
    assert!(!sdk.is_connected());
    assert_eq!(sdk.buffer_len(), 0);

    sdk.clear_faults();
    assert!(screen.print_view(&view));
    assert_eq!(sdk.count(SdkCall::Connect), 2);
    assert_eq!(sdk.jobs().len(), 1);
}

#[test]
fn test_printer_going_offline_between_prints() {
    let sdk = SimPrinterFactory::new();
    let mut screen = open_printer(&sdk, "BT:00:11");
    let view = Banner {
        width: 100,
        height: 20,
    };

    assert!(screen.print_view(&view));
    sdk.set_online(false);
    assert!(!screen.print_view(&view));
    assert!(!sdk.is_connected());
    assert_eq!(sdk.jobs().len(), 1);
}

#[test]
fn test_reconnect_after_link_drop() {
    let sdk = SimPrinterFactory::new();
    let mut screen = open_printer(&sdk, "BT:00:11");
    let view = Banner {
        width: 100,
        height: 20,
    };

    assert!(screen.print_view(&view));
    sdk.drop_connection();
    assert!(screen.print_view(&view));
    assert_eq!(sdk.count(SdkCall::Connect), 2);
    assert_eq!(sdk.jobs().len(), 2);
}

#[test]
fn test_preview_of_printed_view() {
    let sdk = SimPrinterFactory::new();
    let model = PrinterModel::TM_P80;
    let mut screen = open_printer(&sdk, "BT:00:11");

    assert!(screen.print_view(&Banner {
        width: 576,
        height: 40
    }));

    let job = sdk.last_job().unwrap();
    let paper = preview::render_job(&model, &job.commands);
    assert_eq!(paper.width(), 576);
    assert!(paper.height() > 40 + 2 * model.line_feed_dots as u32);
    assert_eq!(paper.get_pixel(10, 5).0, [BLACK]);
    assert_eq!(paper.get_pixel(10, 30).0, [WHITE]);
}

#[test]
fn test_image_view_wider_than_paper() {
    let sdk = SimPrinterFactory::new();
    let mut screen = open_printer(&sdk, "BT:00:11");

    let view = ImageView::new(RgbaImage::from_pixel(1152, 100, Rgba([0, 0, 0, 255])))
        .fit_width(PrinterModel::TM_P80.width_dots as u32);
    assert_eq!(view.measured_size(), (576, 50));
    assert!(screen.print_view(&view));
}
