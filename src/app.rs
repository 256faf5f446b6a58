//! Application Coordinator
//!
//! Owns the catalog, history journal, event channel and the active order,
//! and marshals worker and listener events into one serialized context.
//! Cart and session state is only ever touched from here.

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{info, warn};

use crate::cart::Cart;
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::detect::worker::{self, BatchOutcome};
use crate::detect::{DetectorConfig, FoodDetector, ImageInput};
use crate::invoice;
use crate::payment::server::PaymentListener;
use crate::payment::PaymentMethod;
use crate::session::ActiveOrder;
use crate::shared::{AppEvent, RuntimeState};
use crate::storage::history::{HistoryLog, HistoryRecord};

/// Main application coordinator
pub struct TrayTillApp {
    pub config: AppConfig,
    pub catalog: Catalog,
    /// Detection batch journal
    pub history: HistoryLog,
    /// Runtime status readable by the presentation layer
    pub runtime: Arc<RwLock<RuntimeState>>,
    /// The order currently on the till, if any
    active: Option<ActiveOrder>,
    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,
    worker_handle: Option<JoinHandle<()>>,
    listener: Option<PaymentListener>,
}

impl TrayTillApp {
    /// Create a coordinator around an already-loaded catalog and journal.
    pub fn new(config: AppConfig, catalog: Catalog, history: HistoryLog) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            config,
            catalog,
            history,
            runtime: Arc::new(RwLock::new(RuntimeState::default())),
            active: None,
            events_tx,
            events_rx,
            worker_handle: None,
            listener: None,
        }
    }

    /// Sender half of the app event channel, for external triggers.
    pub fn event_sender(&self) -> Sender<AppEvent> {
        self.events_tx.clone()
    }

    /// Start the payment callback listener and advertise its page URL.
    /// Failure degrades: in-app confirmation still works.
    pub fn start_payment_listener(&mut self) {
        if self.listener.is_some() || !self.config.payment.listener_enabled {
            return;
        }
        match PaymentListener::start(
            self.config.payment.listener_port,
            self.config.payment.success_page.clone(),
            self.events_tx.clone(),
        ) {
            Ok(listener) => {
                let url = listener.page_url();
                info!("Payment confirmation page at {}", url);
                self.runtime.write().payment_page_url = Some(url);
                self.listener = Some(listener);
            }
            Err(e) => {
                warn!("Payment listener failed to start: {:#}", e);
                self.runtime
                    .write()
                    .set_error(format!("Payment listener unavailable: {}", e));
            }
        }
    }

    /// Launch a detection batch on the worker thread. Any order still on
    /// the till is discarded first.
    pub fn start_detection(&mut self, detector: Box<dyn FoodDetector>, batch: Vec<ImageInput>) {
        if self.active.take().is_some() {
            info!("Discarding previous order for a new detection run");
        }
        let detector_config = DetectorConfig {
            confidence_threshold: self.config.detection.effective_confidence(),
        };
        self.runtime.write().is_detecting = true;
        let handle = worker::spawn_batch(detector, batch, detector_config, self.events_tx.clone());
        self.worker_handle = Some(handle);
    }

    /// Wait for the in-flight batch to finish and handle its event.
    /// True when an order was opened.
    pub fn wait_for_detection(&mut self) -> bool {
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
        self.pump_events();
        self.active.is_some()
    }

    /// Handle every queued event without blocking.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Block up to `timeout` for one event and handle it. True when one
    /// arrived.
    pub fn pump_one(&mut self, timeout: Duration) -> bool {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                true
            }
            Err(_) => false,
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::DetectionFinished(outcome) => self.finish_detection(outcome),
            AppEvent::DetectionFailed(message) => {
                warn!("Detection failed: {}", message);
                let mut runtime = self.runtime.write();
                runtime.is_detecting = false;
                runtime.set_error(message);
            }
            AppEvent::PaymentConfirmed(code) => {
                let method = PaymentMethod::from_code(&code);
                info!(
                    "Payment confirmed from the phone ({})",
                    method.display_name()
                );
                self.confirm_payment(method);
            }
        }
    }

    fn finish_detection(&mut self, outcome: BatchOutcome) {
        {
            let mut runtime = self.runtime.write();
            runtime.is_detecting = false;
            runtime.clear_error();
        }
        for image in &outcome.images {
            self.history
                .add(HistoryRecord::new(image.source_label.clone(), &image.detections));
        }
        if outcome.detections.is_empty() {
            info!("Nothing detected; no order opened");
            return;
        }
        let cart = Cart::from_detections(&outcome.detections, &self.catalog);
        let order = ActiveOrder::open(cart, outcome.detections);
        info!(
            "Order {} opened with {} line(s)",
            order.session().id,
            order.cart().len()
        );
        self.active = Some(order);
    }

    /// The order currently on the till.
    pub fn active_order(&self) -> Option<&ActiveOrder> {
        self.active.as_ref()
    }

    pub fn active_order_mut(&mut self) -> Option<&mut ActiveOrder> {
        self.active.as_mut()
    }

    /// Single entry point for both confirmation paths (in-app and phone
    /// callback). True on the unpaid -> paid transition.
    pub fn confirm_payment(&mut self, method: PaymentMethod) -> bool {
        match self.active.as_mut() {
            Some(order) => order.confirm_payment(method),
            None => {
                warn!("Payment confirmation with no active order; ignored");
                false
            }
        }
    }

    /// Write the invoice for a paid order, then tear the order down.
    pub fn export_invoice(&mut self) -> Result<PathBuf> {
        let order = self
            .active
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no active order"))?;
        if !order.session().is_paid() {
            anyhow::bail!("order {} is not paid yet", order.session().id);
        }
        let method = order
            .payment_method()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("paid order has no recorded payment method"))?;
        let dir = match &self.config.invoice.output_dir {
            Some(dir) => dir.clone(),
            None => invoice::default_invoice_dir()?,
        };
        let path = invoice::write_invoice(&dir, order.cart(), &method, chrono::Local::now())?;
        self.teardown_order("invoice exported");
        Ok(path)
    }

    /// Tear a paid order down without writing the invoice.
    pub fn skip_invoice(&mut self) -> bool {
        match self.active.as_ref() {
            Some(order) if order.session().is_paid() => {
                self.teardown_order("invoice skipped");
                true
            }
            _ => false,
        }
    }

    /// Drop the active order regardless of state (operator cancel/reset).
    pub fn cancel_order(&mut self) -> bool {
        match self.active.take() {
            Some(order) => {
                info!("Order {} discarded", order.session().id);
                true
            }
            None => false,
        }
    }

    fn teardown_order(&mut self, reason: &str) {
        if let Some(order) = self.active.take() {
            info!("Order {} closed ({})", order.session().id, reason);
        }
    }
}

impl Drop for TrayTillApp {
    fn drop(&mut self) {
        // Wait for the detection worker to finish; the listener stops on
        // its own drop.
        if let Some(handle) = self.worker_handle.take() {
            let _ = handle.join();
        }
    }
}
