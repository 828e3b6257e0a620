//! Recording fakes for the adapter and output ports.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::alert::{AudioOutput, HapticOutput};
use crate::core::bluetooth::adapter::LinkAdapter;
use crate::core::bluetooth::types::PeripheralIdentity;
use crate::core::notification::{Notification, NotificationKind, Notifier};
use crate::error::{DeliveryError, LinkError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    Scan(Vec<Uuid>),
    StopScan,
    Connect(PeripheralIdentity),
    Disconnect,
    DiscoverServices(Uuid),
    DiscoverCharacteristics(Uuid, Vec<Uuid>),
    SetNotify(Uuid, bool),
    Write(Uuid, Vec<u8>),
}

#[derive(Default)]
pub struct RecordingAdapter {
    calls: Mutex<Vec<AdapterCall>>,
}

impl RecordingAdapter {
    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&AdapterCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: AdapterCall) -> Result<(), LinkError> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

#[async_trait]
impl LinkAdapter for RecordingAdapter {
    async fn scan(&self, services: &[Uuid]) -> Result<(), LinkError> {
        self.record(AdapterCall::Scan(services.to_vec()))
    }

    async fn stop_scan(&self) -> Result<(), LinkError> {
        self.record(AdapterCall::StopScan)
    }

    async fn connect(&self, peripheral: &PeripheralIdentity) -> Result<(), LinkError> {
        self.record(AdapterCall::Connect(peripheral.clone()))
    }

    async fn disconnect(&self) -> Result<(), LinkError> {
        self.record(AdapterCall::Disconnect)
    }

    async fn discover_services(&self, service: Uuid) -> Result<(), LinkError> {
        self.record(AdapterCall::DiscoverServices(service))
    }

    async fn discover_characteristics(
        &self,
        service: Uuid,
        characteristics: &[Uuid],
    ) -> Result<(), LinkError> {
        self.record(AdapterCall::DiscoverCharacteristics(service, characteristics.to_vec()))
    }

    async fn set_notify(&self, characteristic: Uuid, enabled: bool) -> Result<(), LinkError> {
        self.record(AdapterCall::SetNotify(characteristic, enabled))
    }

    async fn write(&self, characteristic: Uuid, value: &[u8]) -> Result<(), LinkError> {
        self.record(AdapterCall::Write(characteristic, value.to_vec()))
    }
}

pub struct RecordingNotifier {
    authorized: bool,
    failing: bool,
    visible: Mutex<Vec<Notification>>,
    history: Mutex<Vec<NotificationKind>>,
    badge: Mutex<u32>,
}

impl RecordingNotifier {
    fn with(authorized: bool, failing: bool) -> Self {
        Self {
            authorized,
            failing,
            visible: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            badge: Mutex::new(0),
        }
    }

    pub fn authorized() -> Self {
        Self::with(true, false)
    }

    pub fn denied() -> Self {
        Self::with(false, false)
    }

    pub fn failing() -> Self {
        Self::with(true, true)
    }

    pub fn visible(&self) -> Vec<Notification> {
        self.visible.lock().unwrap().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.history.lock().unwrap().len()
    }

    pub fn delivered(&self, kind: NotificationKind) -> usize {
        self.history.lock().unwrap().iter().filter(|k| **k == kind).count()
    }

    pub fn badge(&self) -> u32 {
        *self.badge.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn request_permission(&self) -> Result<bool, DeliveryError> {
        Ok(self.authorized)
    }

    async fn is_authorized(&self) -> bool {
        self.authorized
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        if self.failing {
            return Err(DeliveryError::NotAuthorized);
        }
        self.visible.lock().unwrap().push(notification.clone());
        *self.badge.lock().unwrap() = notification.badge;
        self.history.lock().unwrap().push(notification.category);
        Ok(())
    }

    async fn clear_all(&self) {
        self.visible.lock().unwrap().clear();
    }

    async fn reset_badge(&self) -> Result<(), DeliveryError> {
        *self.badge.lock().unwrap() = 0;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingAudio {
    plays: AtomicUsize,
    stops: AtomicUsize,
}

impl RecordingAudio {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AudioOutput for RecordingAudio {
    fn play_tone(&self) -> Result<(), DeliveryError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_tone(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingHaptics {
    pulses: AtomicUsize,
}

impl RecordingHaptics {
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl HapticOutput for RecordingHaptics {
    fn pulse(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}
