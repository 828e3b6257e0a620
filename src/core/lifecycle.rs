//! End-to-end lifecycle scenarios driven through a running manager.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::core::bluetooth::{
    ConnectionPhase, LinkEvent, LinkEvents, PERIPHERAL_NAME, PeripheralIdentity, PowerState,
    TargetProfile,
};
use crate::core::testing::{
    AdapterCall, RecordingAdapter, RecordingAudio, RecordingHaptics, RecordingNotifier,
};
use crate::core::{Inbox, ManagerHandle, ManagerSettings, NotificationKind, Outputs, RingoutManager};

struct Harness {
    adapter: Arc<RecordingAdapter>,
    notifier: Arc<RecordingNotifier>,
    audio: Arc<RecordingAudio>,
    haptics: Arc<RecordingHaptics>,
    events: LinkEvents,
    handle: ManagerHandle,
    target: TargetProfile,
}

impl Harness {
    fn start() -> Self {
        let adapter = Arc::new(RecordingAdapter::default());
        let notifier = Arc::new(RecordingNotifier::authorized());
        let audio = Arc::new(RecordingAudio::default());
        let haptics = Arc::new(RecordingHaptics::default());
        let target = TargetProfile::default();

        let inbox = Inbox::new();
        let events = inbox.link_events();
        let outputs = Outputs {
            audio: audio.clone(),
            haptics: haptics.clone(),
            notifier: notifier.clone(),
        };
        let settings = ManagerSettings {
            target: target.clone(),
            alert_duration: Duration::from_secs(3),
            rescan_interval: Duration::from_secs(10),
            badge_reset_delay: Duration::from_secs(5),
        };
        let manager = RingoutManager::new(inbox, adapter.clone(), outputs, settings);
        let handle = manager.handle();
        tokio::spawn(manager.run());

        Self {
            adapter,
            notifier,
            audio,
            haptics,
            events,
            handle,
            target,
        }
    }

    /// Lets the manager and the notification worker drain everything queued.
    async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn emit(&self, event: LinkEvent) {
        self.events.emit(event);
        self.settle().await;
    }

    fn peripheral(&self) -> PeripheralIdentity {
        PeripheralIdentity::new("AA:BB:CC:DD:EE:FF", PERIPHERAL_NAME)
    }

    fn scan_call(&self) -> AdapterCall {
        AdapterCall::Scan(vec![self.target.service])
    }

    fn write_call(&self, payload: &[u8]) -> AdapterCall {
        AdapterCall::Write(self.target.write_characteristic, payload.to_vec())
    }

    async fn connect(&self) {
        self.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;
        self.emit(LinkEvent::Discovered(self.peripheral())).await;
        self.emit(LinkEvent::Connected).await;
        self.emit(LinkEvent::ServicesDiscovered(vec![self.target.service])).await;
        self.emit(LinkEvent::CharacteristicsDiscovered(vec![
            self.target.notify_characteristic,
            self.target.write_characteristic,
        ]))
        .await;
    }

    async fn inbound(&self, payload: &[u8]) {
        self.emit(LinkEvent::ValueUpdated {
            characteristic: self.target.notify_characteristic,
            value: payload.to_vec(),
        })
        .await;
    }
}

#[tokio::test(start_paused = true)]
async fn power_on_to_ready() {
    let h = Harness::start();

    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;
    assert_eq!(h.adapter.calls(), vec![h.scan_call()]);
    assert_eq!(h.handle.status().status_text, "Scanning...");

    h.emit(LinkEvent::Discovered(h.peripheral())).await;
    assert_eq!(
        h.adapter.calls()[1..],
        [AdapterCall::StopScan, AdapterCall::Connect(h.peripheral())]
    );

    h.emit(LinkEvent::Connected).await;
    h.emit(LinkEvent::ServicesDiscovered(vec![Uuid::nil(), h.target.service])).await;
    h.emit(LinkEvent::CharacteristicsDiscovered(vec![
        h.target.write_characteristic,
        h.target.notify_characteristic,
    ]))
    .await;

    let status = h.handle.status();
    assert_eq!(status.phase, ConnectionPhase::Ready);
    assert!(status.connected);
    assert_eq!(status.status_text, "Connected");
    assert!(h
        .adapter
        .calls()
        .contains(&AdapterCall::SetNotify(h.target.notify_characteristic, true)));
    assert_eq!(h.notifier.delivered(NotificationKind::ConnectionEstablished), 1);
}

#[tokio::test(start_paused = true)]
async fn connects_once_to_exact_name_only() {
    let h = Harness::start();
    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;

    for name in ["ESP32", "ESP32_WROOM_BLE_Ringout_old", "esp32_wroom_ble_ringout"] {
        h.emit(LinkEvent::Discovered(PeripheralIdentity::new(name, name))).await;
    }
    assert_eq!(h.adapter.count(|c| matches!(c, AdapterCall::Connect(_))), 0);

    for _ in 0..3 {
        h.emit(LinkEvent::Discovered(h.peripheral())).await;
    }
    h.emit(LinkEvent::Discovered(PeripheralIdentity::new("other-id", PERIPHERAL_NAME)))
        .await;

    assert_eq!(
        h.adapter.count(|c| matches!(c, AdapterCall::Connect(_))),
        1,
        "duplicate advertisements after the first match must be ignored"
    );
    assert_eq!(h.handle.status().phase, ConnectionPhase::Connecting);
}

#[tokio::test(start_paused = true)]
async fn trigger_alert_expires_after_three_seconds() {
    let h = Harness::start();
    h.connect().await;

    h.inbound(b"T").await;
    assert!(h.handle.status().alert_active);
    assert_eq!(h.audio.plays(), 1);
    assert_eq!(h.haptics.pulses(), 1);
    assert_eq!(h.notifier.delivered(NotificationKind::AlertTriggered), 1);

    // re-entry while active changes nothing
    h.inbound(b"T").await;
    assert_eq!(h.audio.plays(), 1);
    assert_eq!(h.notifier.delivered(NotificationKind::AlertTriggered), 1);

    tokio::time::sleep(Duration::from_millis(2900)).await;
    assert!(h.handle.status().alert_active);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!h.handle.status().alert_active);
    assert_eq!(h.audio.stops(), 1);
    assert_eq!(h.haptics.pulses(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_signal_ends_alert_early() {
    let h = Harness::start();
    h.connect().await;

    h.inbound(b"S").await;
    assert_eq!(h.haptics.pulses(), 0);
    assert_eq!(h.audio.stops(), 0);

    h.inbound(b"T").await;
    h.inbound(b"S").await;
    assert!(!h.handle.status().alert_active);
    assert_eq!(h.audio.stops(), 1);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(h.audio.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_payloads_are_ignored() {
    let h = Harness::start();
    h.connect().await;

    h.inbound(b"X").await;
    h.inbound(b"").await;
    h.inbound(b"TT").await;

    assert!(!h.handle.status().alert_active);
    assert_eq!(h.audio.plays(), 0);
}

#[tokio::test(start_paused = true)]
async fn disconnect_notifies_once_and_rescans() {
    let h = Harness::start();
    h.connect().await;
    h.adapter.clear();

    h.emit(LinkEvent::Disconnected { reason: Some("out of range".into()) }).await;

    let status = h.handle.status();
    assert_eq!(status.phase, ConnectionPhase::Scanning);
    assert!(!status.connected);
    assert_eq!(h.notifier.delivered(NotificationKind::ConnectionLost), 1);
    assert_eq!(
        h.notifier.visible().iter().map(|n| n.category).collect::<Vec<_>>(),
        vec![NotificationKind::ConnectionLost]
    );
    assert_eq!(h.adapter.calls(), vec![h.scan_call()]);
}

#[tokio::test(start_paused = true)]
async fn watchdog_restarts_stalled_scan() {
    let h = Harness::start();
    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;
    h.adapter.clear();

    tokio::time::sleep(Duration::from_secs(10)).await;
    h.settle().await;
    assert_eq!(h.adapter.calls(), vec![AdapterCall::StopScan, h.scan_call()]);

    h.emit(LinkEvent::Discovered(h.peripheral())).await;
    h.adapter.clear();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(h.adapter.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn connect_failure_resumes_scanning() {
    let h = Harness::start();
    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;
    h.emit(LinkEvent::Discovered(h.peripheral())).await;
    h.adapter.clear();

    h.emit(LinkEvent::ConnectFailed { reason: "timeout".into() }).await;

    assert_eq!(h.handle.status().status_text, "Failed to connect");
    assert_eq!(h.adapter.calls(), vec![h.scan_call()]);
    assert_eq!(h.notifier.delivered(NotificationKind::ConnectionLost), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_test_round_trip() {
    let h = Harness::start();
    h.connect().await;
    h.adapter.clear();

    h.handle.manual_test().unwrap();
    h.settle().await;
    assert_eq!(h.adapter.calls(), vec![h.write_call(b"T")]);
    assert_eq!(h.audio.plays(), 1);
    assert_eq!(h.notifier.delivered(NotificationKind::ManualTest), 1);

    tokio::time::sleep(Duration::from_secs(3)).await;
    h.settle().await;
    assert_eq!(h.adapter.calls(), vec![h.write_call(b"T"), h.write_call(b"S")]);
}

#[tokio::test(start_paused = true)]
async fn power_off_reports_status_and_waits() {
    let h = Harness::start();
    h.connect().await;
    h.adapter.clear();

    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOff)).await;
    let status = h.handle.status();
    assert_eq!(status.status_text, "Bluetooth is off");
    assert!(!status.connected);
    assert_eq!(h.adapter.count(|c| matches!(c, AdapterCall::Scan(_))), 0);

    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;
    assert_eq!(h.handle.status().phase, ConnectionPhase::Scanning);
}

#[tokio::test(start_paused = true)]
async fn adapter_fault_releases_link_and_recovers_on_power() {
    let h = Harness::start();
    h.connect().await;
    h.adapter.clear();

    h.emit(LinkEvent::PowerChanged(PowerState::Other)).await;
    assert_eq!(h.adapter.calls(), vec![AdapterCall::Disconnect]);
    assert_eq!(h.notifier.delivered(NotificationKind::ConnectionLost), 1);

    // values still in flight from the released link are dropped
    h.inbound(b"T").await;
    assert!(!h.handle.status().alert_active);

    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;
    assert_eq!(h.handle.status().phase, ConnectionPhase::Scanning);
    assert_eq!(h.adapter.calls(), vec![AdapterCall::Disconnect, h.scan_call()]);
}

#[tokio::test(start_paused = true)]
async fn start_request_while_off_does_not_scan() {
    let h = Harness::start();
    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOff)).await;

    h.handle.start().unwrap();
    h.settle().await;

    let status = h.handle.status();
    assert_eq!(status.phase, ConnectionPhase::Idle);
    assert_eq!(status.status_text, "Bluetooth is off");
    assert!(h.adapter.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_adapter_keeps_running_with_status() {
    let h = Harness::start();
    h.emit(LinkEvent::PowerChanged(PowerState::Unsupported)).await;

    assert_eq!(h.handle.status().status_text, "Bluetooth not supported");
    h.handle.manual_test().unwrap();
    h.settle().await;
    assert_eq!(h.notifier.delivered(NotificationKind::ManualTest), 1);
}

#[tokio::test(start_paused = true)]
async fn restored_peripheral_connects_without_scan() {
    let h = Harness::start();
    h.emit(LinkEvent::Restored(h.peripheral())).await;
    h.emit(LinkEvent::PowerChanged(PowerState::PoweredOn)).await;

    assert_eq!(h.adapter.calls(), vec![AdapterCall::Connect(h.peripheral())]);
}

#[tokio::test(start_paused = true)]
async fn shutdown_tears_down_link() {
    let h = Harness::start();
    h.connect().await;
    h.adapter.clear();

    h.handle.shutdown().unwrap();
    h.settle().await;

    assert_eq!(h.adapter.calls(), vec![AdapterCall::Disconnect]);
    assert!(h.handle.manual_test().is_err());
}
