//! Payment confirmation listener
//!
//! A small HTTP server the customer's phone hits after paying. The
//! success page renders first, then the confirmation event is posted to
//! the serialized app context. Runs on its own thread with a dedicated
//! tokio runtime so the synchronous app loop stays free of async
//! plumbing.

use anyhow::Result;
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use warp::Filter;

use super::DEFAULT_CALLBACK_METHOD;
use crate::shared::AppEvent;

/// Body served when no success page file is configured or readable
const FALLBACK_SUCCESS_BODY: &str = "<h1>Thanh toan thanh cong!</h1>";

/// Handle to the running listener; dropping it stops the server.
pub struct PaymentListener {
    /// Address the server actually bound (the port matters with port 0)
    pub local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PaymentListener {
    /// Bind and serve on `0.0.0.0:{port}`. `GET /` and `GET /success`
    /// accept an optional `m=<code>` query and confirm the payment; any
    /// other path is a 404. The success page file is re-read per request.
    pub fn start(
        port: u16,
        success_page: Option<PathBuf>,
        events: Sender<AppEvent>,
    ) -> Result<Self> {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<SocketAddr>>();

        let handle = std::thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx
                        .send(Err(anyhow::anyhow!("failed to build listener runtime: {}", e)));
                    return;
                }
            };

            runtime.block_on(async move {
                let route = warp::get()
                    .and(
                        warp::path("success")
                            .and(warp::path::end())
                            .or(warp::path::end())
                            .unify(),
                    )
                    .and(warp::query::<HashMap<String, String>>())
                    .map(move |query: HashMap<String, String>| {
                        let method = query
                            .get("m")
                            .cloned()
                            .unwrap_or_else(|| DEFAULT_CALLBACK_METHOD.to_string());
                        debug!("Payment callback hit (m={})", method);
                        let body = load_success_body(success_page.as_deref());
                        let _ = events.send(AppEvent::PaymentConfirmed(method));
                        warp::reply::html(body)
                    });

                let addr = SocketAddr::from(([0, 0, 0, 0], port));
                match warp::serve(route).try_bind_with_graceful_shutdown(addr, async {
                    let _ = shutdown_rx.await;
                }) {
                    Ok((bound_addr, server)) => {
                        info!("Payment listener on http://{}", bound_addr);
                        let _ = ready_tx.send(Ok(bound_addr));
                        server.await;
                        info!("Payment listener stopped");
                    }
                    Err(e) => {
                        let _ = ready_tx
                            .send(Err(anyhow::anyhow!("failed to bind port {}: {}", port, e)));
                    }
                }
            });
        });

        match ready_rx.recv() {
            Ok(Ok(local_addr)) => Ok(Self {
                local_addr,
                shutdown: Some(shutdown_tx),
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(anyhow::anyhow!("payment listener thread died during startup"))
            }
        }
    }

    /// URL of the confirmation page, advertised for QR encoding.
    pub fn page_url(&self) -> String {
        format!(
            "http://{}:{}/success",
            super::local_ip(),
            self.local_addr.port()
        )
    }
}

impl Drop for PaymentListener {
    fn drop(&mut self) {
        // Signal the server to stop
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        // Wait for the listener thread to finish
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn load_success_body(page: Option<&Path>) -> String {
    match page {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not read success page {:?}: {}", path, e);
                FALLBACK_SUCCESS_BODY.to_string()
            }
        },
        None => FALLBACK_SUCCESS_BODY.to_string(),
    }
}
