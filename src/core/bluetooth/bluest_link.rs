//! Link adapter over the bluest crate
//! Each command spawns the bluest call and reports its outcome as a
//! [`LinkEvent`]; long-running streams (scan, notifications, connection
//! events) run as cancellable tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bluest::{Adapter, AdapterEvent, Characteristic, ConnectionEvent, Device, Service};
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::bluetooth::adapter::{LinkAdapter, LinkEvents};
use crate::core::bluetooth::types::{LinkEvent, PeripheralIdentity, PowerState, TargetProfile};
use crate::error::LinkError;

/// How long a powered adapter may take to report itself available.
const AVAILABILITY_WAIT: Duration = Duration::from_millis(500);

/// A running background task and the token that stops it.
struct Worker {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Worker {
    fn spawn<F>(task: impl FnOnce(CancellationToken) -> F) -> Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(task(cancel_token.clone()));
        Self { cancel_token, handle }
    }

    fn stop(self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

#[derive(Default)]
struct GattCache {
    device: Option<Device>,
    services: HashMap<Uuid, Service>,
    characteristics: HashMap<Uuid, Characteristic>,
}

pub struct BluestLink {
    /// None when the host has no Bluetooth adapter
    adapter: Option<Adapter>,
    events: LinkEvents,
    connect_timeout: Duration,
    /// Devices seen while scanning, by platform id
    devices: Arc<Mutex<HashMap<String, Device>>>,
    gatt: Arc<Mutex<GattCache>>,
    scan_worker: Mutex<Option<Worker>>,
    link_worker: Mutex<Option<Worker>>,
    notify_workers: Mutex<HashMap<Uuid, Worker>>,
    power_worker: Mutex<Option<Worker>>,
}

impl BluestLink {
    /// Opens the default adapter. A host without one is reported as
    /// [`PowerState::Unsupported`] once [`BluestLink::start`] runs.
    pub async fn new(events: LinkEvents, connect_timeout: Duration) -> Self {
        let adapter = Adapter::default().await;
        match adapter {
            Some(_) => info!("Bluetooth adapter opened."),
            None => warn!("No Bluetooth adapter found."),
        }
        Self::with_adapter(events, connect_timeout, adapter)
    }

    fn with_adapter(
        events: LinkEvents,
        connect_timeout: Duration,
        adapter: Option<Adapter>,
    ) -> Self {
        Self {
            adapter,
            events,
            connect_timeout,
            devices: Arc::new(Mutex::new(HashMap::new())),
            gatt: Arc::new(Mutex::new(GattCache::default())),
            scan_worker: Mutex::new(None),
            link_worker: Mutex::new(None),
            notify_workers: Mutex::new(HashMap::new()),
            power_worker: Mutex::new(None),
        }
    }

    fn adapter(&self) -> Result<&Adapter, LinkError> {
        self.adapter.as_ref().ok_or(LinkError::NoAdapter)
    }

    /// Report the current power state, follow adapter availability changes, and
    /// restore a target the system is already connected to.
    pub async fn start(&self, target: &TargetProfile) {
        let Some(adapter) = self.adapter.clone() else {
            self.events.emit(LinkEvent::PowerChanged(PowerState::Unsupported));
            return;
        };

        if let Some(identity) = self.restore(&adapter, target).await {
            info!("Restoring connection to {}", identity.name);
            self.events.emit(LinkEvent::Restored(identity));
        }

        let events = self.events.clone();
        let worker = Worker::spawn(move |cancel_token| async move {
            // bluest only offers a blocking wait; an adapter that is up answers at once.
            let available = tokio::time::timeout(AVAILABILITY_WAIT, adapter.wait_available());
            let initial = match available.await {
                Ok(Ok(())) => PowerState::PoweredOn,
                Ok(Err(e)) => {
                    warn!("Cannot query adapter state: {}", e);
                    PowerState::Other
                }
                Err(_) => PowerState::PoweredOff,
            };
            info!("Bluetooth is {:?}", initial);
            events.emit(LinkEvent::PowerChanged(initial));

            let mut stream = match adapter.events().await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to watch adapter state: {}", e);
                    return;
                }
            };
            loop {
                tokio::select! {
                    next = stream.next() => match next {
                        Some(Ok(AdapterEvent::Available)) => {
                            info!("Bluetooth is powered on");
                            events.emit(LinkEvent::PowerChanged(PowerState::PoweredOn));
                        }
                        Some(Ok(AdapterEvent::Unavailable)) => {
                            info!("Bluetooth is powered off");
                            events.emit(LinkEvent::PowerChanged(PowerState::PoweredOff));
                        }
                        // Not a power change; the adapter state is unknown, not lost.
                        Some(Err(e)) => warn!("Adapter event error: {}", e),
                        None => break,
                    },
                    _ = cancel_token.cancelled() => break,
                }
            }
            debug!("Adapter event stream ended");
        });
        Self::replace(&self.power_worker, Some(worker));
    }

    async fn restore(
        &self,
        adapter: &Adapter,
        target: &TargetProfile,
    ) -> Option<PeripheralIdentity> {
        let connected = match adapter.connected_devices_with_services(&[target.service]).await {
            Ok(devices) => devices,
            Err(e) => {
                debug!("Could not list connected devices: {}", e);
                return None;
            }
        };
        for device in connected {
            let identity = PeripheralIdentity::new(
                device.id().to_string(),
                device.name().unwrap_or_default(),
            );
            if target.matches(&identity) {
                self.remember(&identity.id, device);
                return Some(identity);
            }
        }
        info!("No connected Ringout peripheral detected");
        None
    }

    fn remember(&self, id: &str, device: Device) {
        if let Ok(mut devices) = self.devices.lock() {
            devices.insert(id.to_string(), device);
        }
    }

    fn replace(slot: &Mutex<Option<Worker>>, next: Option<Worker>) {
        let previous = match slot.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(_) => None,
        };
        if let Some(worker) = previous {
            worker.stop();
        }
    }

    fn current_device(&self) -> Result<Device, LinkError> {
        self.gatt
            .lock()
            .ok()
            .and_then(|gatt| gatt.device.clone())
            .ok_or(LinkError::NotConnected)
    }

    fn service(&self, uuid: Uuid) -> Result<Service, LinkError> {
        self.gatt
            .lock()
            .ok()
            .and_then(|gatt| gatt.services.get(&uuid).cloned())
            .ok_or(LinkError::UnknownService(uuid))
    }

    fn characteristic(&self, uuid: Uuid) -> Result<Characteristic, LinkError> {
        self.gatt
            .lock()
            .ok()
            .and_then(|gatt| gatt.characteristics.get(&uuid).cloned())
            .ok_or(LinkError::UnknownCharacteristic(uuid))
    }

    fn reset_gatt(&self) {
        if let Ok(mut workers) = self.notify_workers.lock() {
            for (_, worker) in workers.drain() {
                worker.stop();
            }
        }
        if let Ok(mut gatt) = self.gatt.lock() {
            *gatt = GattCache::default();
        }
    }
}

#[async_trait]
impl LinkAdapter for BluestLink {
    async fn scan(&self, services: &[Uuid]) -> Result<(), LinkError> {
        let adapter = self.adapter()?.clone();
        let devices = self.devices.clone();
        let events = self.events.clone();
        let services = services.to_vec();

        let worker = Worker::spawn(move |cancel_token| async move {
            // bluest reports every advertisement, duplicates included.
            let mut scan_stream = match adapter.scan(&services).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to start bluetooth scan: {}", e);
                    return;
                }
            };
            loop {
                tokio::select! {
                    result = scan_stream.next() => match result {
                        Some(discovered) => {
                            let name = discovered
                                .device
                                .name()
                                .ok()
                                .or_else(|| discovered.adv_data.local_name.clone());
                            let Some(name) = name else { continue };
                            let id = discovered.device.id().to_string();
                            debug!(
                                "Discovered peripheral: {} ({}), RSSI: {:?}",
                                name, id, discovered.rssi
                            );
                            if let Ok(mut devices) = devices.lock() {
                                devices.insert(id.clone(), discovered.device.clone());
                            }
                            events.emit(LinkEvent::Discovered(PeripheralIdentity::new(id, name)));
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    },
                    _ = cancel_token.cancelled() => break,
                }
            }
        });

        Self::replace(&self.scan_worker, Some(worker));
        Ok(())
    }

    async fn stop_scan(&self) -> Result<(), LinkError> {
        Self::replace(&self.scan_worker, None);
        Ok(())
    }

    async fn connect(&self, peripheral: &PeripheralIdentity) -> Result<(), LinkError> {
        let adapter = self.adapter()?.clone();
        let device = self
            .devices
            .lock()
            .ok()
            .and_then(|devices| devices.get(&peripheral.id).cloned())
            .ok_or_else(|| LinkError::UnknownPeripheral(peripheral.id.clone()))?;

        self.reset_gatt();
        let events = self.events.clone();
        let gatt = self.gatt.clone();
        let connect_timeout = self.connect_timeout;

        let worker = Worker::spawn(move |cancel_token| async move {
            info!("Initiating connection to {}...", device.id());
            let connect = tokio::time::timeout(connect_timeout, adapter.connect_device(&device));
            let outcome = tokio::select! {
                outcome = connect => outcome,
                _ = cancel_token.cancelled() => return,
            };
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    events.emit(LinkEvent::ConnectFailed { reason: e.to_string() });
                    return;
                }
                Err(_) => {
                    events.emit(LinkEvent::ConnectFailed {
                        reason: format!("no response within {:?}", connect_timeout),
                    });
                    return;
                }
            }

            if let Ok(mut gatt) = gatt.lock() {
                gatt.device = Some(device.clone());
            }
            info!("Connected to peripheral");
            events.emit(LinkEvent::Connected);

            let mut connection_events = match adapter.device_connection_events(&device).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Cannot watch connection state: {}", e);
                    return;
                }
            };
            loop {
                tokio::select! {
                    event = connection_events.next() => match event {
                        Some(ConnectionEvent::Disconnected) => {
                            info!("Disconnected from peripheral");
                            events.emit(LinkEvent::Disconnected { reason: None });
                            break;
                        }
                        Some(ConnectionEvent::Connected) => {}
                        None => {
                            events.emit(LinkEvent::Disconnected {
                                reason: Some("connection event stream ended".to_string()),
                            });
                            break;
                        }
                    },
                    _ = cancel_token.cancelled() => break,
                }
            }
        });

        Self::replace(&self.link_worker, Some(worker));
        Ok(())
    }

    /// Cancels a pending connect as well. Without a connected device there is nothing else to do.
    async fn disconnect(&self) -> Result<(), LinkError> {
        Self::replace(&self.link_worker, None);
        let Ok(device) = self.current_device() else {
            return Ok(());
        };
        self.reset_gatt();
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            self.adapter()?.disconnect_device(&device).await?;
        }
        Ok(())
    }

    async fn discover_services(&self, service: Uuid) -> Result<(), LinkError> {
        let device = self.current_device()?;
        let gatt = self.gatt.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            match device.discover_services_with_uuid(service).await {
                Ok(services) => {
                    let uuids: Vec<Uuid> = services.iter().map(|s| s.uuid()).collect();
                    info!("Discovered services: {:?}", uuids);
                    if let Ok(mut gatt) = gatt.lock() {
                        for s in services {
                            gatt.services.insert(s.uuid(), s);
                        }
                    }
                    events.emit(LinkEvent::ServicesDiscovered(uuids));
                }
                Err(e) => error!("Service discovery failed: {}", e),
            }
        });
        Ok(())
    }

    async fn discover_characteristics(
        &self,
        service: Uuid,
        characteristics: &[Uuid],
    ) -> Result<(), LinkError> {
        let service = self.service(service)?;
        let wanted = characteristics.to_vec();
        let gatt = self.gatt.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            match service.discover_characteristics().await {
                Ok(found) => {
                    let mut uuids = Vec::new();
                    if let Ok(mut gatt) = gatt.lock() {
                        for characteristic in found {
                            let uuid = characteristic.uuid();
                            if wanted.contains(&uuid) {
                                info!("Found characteristic: {}", uuid);
                                gatt.characteristics.insert(uuid, characteristic);
                                uuids.push(uuid);
                            }
                        }
                    }
                    events.emit(LinkEvent::CharacteristicsDiscovered(uuids));
                }
                Err(e) => error!("Characteristic discovery failed: {}", e),
            }
        });
        Ok(())
    }

    async fn set_notify(&self, characteristic: Uuid, enabled: bool) -> Result<(), LinkError> {
        let previous = self
            .notify_workers
            .lock()
            .ok()
            .and_then(|mut workers| workers.remove(&characteristic));
        if let Some(worker) = previous {
            worker.stop();
        }
        if !enabled {
            return Ok(());
        }

        let notify_char = self.characteristic(characteristic)?;
        let events = self.events.clone();
        let worker = Worker::spawn(move |cancel_token| async move {
            info!("Subscribing to notifications...");
            let mut notification_stream = match notify_char.notify().await {
                Ok(stream) => stream,
                Err(e) => {
                    error!("Failed to subscribe to notifications: {}", e);
                    return;
                }
            };
            loop {
                tokio::select! {
                    result = notification_stream.next() => match result {
                        Some(Ok(value)) => {
                            debug!("Received peripheral data: {:?}", value);
                            events.emit(LinkEvent::ValueUpdated { characteristic, value });
                        }
                        Some(Err(e)) => {
                            error!("Error in notification stream: {}", e);
                            break;
                        }
                        None => break,
                    },
                    _ = cancel_token.cancelled() => break,
                }
            }
            info!("Notification stream ended");
        });

        if let Ok(mut workers) = self.notify_workers.lock() {
            workers.insert(characteristic, worker);
        }
        Ok(())
    }

    async fn write(&self, characteristic: Uuid, value: &[u8]) -> Result<(), LinkError> {
        let write_char = self.characteristic(characteristic)?;
        let value = value.to_vec();
        tokio::spawn(async move {
            // bluest's plain write waits for the peripheral's acknowledgement
            match write_char.write(&value).await {
                Ok(()) => debug!("Write of {:?} acknowledged", value),
                Err(e) => error!("Write failed: {}", e),
            }
        });
        Ok(())
    }
}

impl Drop for BluestLink {
    fn drop(&mut self) {
        Self::replace(&self.scan_worker, None);
        Self::replace(&self.link_worker, None);
        Self::replace(&self.power_worker, None);
        self.reset_gatt();
    }
}
