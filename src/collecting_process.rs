//! Collecting Process (spec.md §4.C, §5, §6).
//!
//! Grounded in the listener thread pattern of `cdeconinck-ipfix`: one
//! read loop per listening socket, handing decoded messages off through a
//! channel instead of calling the Aggregation Process directly. Here the
//! channel is `crossbeam_channel` rather than `std::sync::mpsc` so the same
//! receiving half can be cloned across every Aggregation Process worker
//! (see `aggregation.rs`).
//!
//! `std` sockets have no portable "stop listening" call and no blocking
//! call can be interrupted from another thread, so shutdown is polling
//! based: every socket is given a short read/accept timeout, and the
//! listener loop re-checks a shared stop flag each time that timeout
//! elapses. `stop()` sets the flag and then joins — the join returns within
//! one poll interval instead of blocking forever on a socket nobody is
//! unblocking.

use std::io::Read;
use std::net::{IpAddr, SocketAddr, TcpListener, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::decoder::decode_message;
use crate::error::CollectorError;
use crate::message::Message;
use crate::registry::{EnterpriseRegistry, Registries};
use crate::template_catalog::{TemplateCatalog, Transport, DEFAULT_TEMPLATE_TTL};

/// How often a listener loop wakes from a timed-out read/accept to check
/// the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct CollectingConfig {
    pub address: SocketAddr,
    pub transport: Transport,
    pub max_message_size: usize,
    pub template_ttl: std::time::Duration,
    pub enterprise_registry: EnterpriseRegistry,
}

impl CollectingConfig {
    pub fn try_new(
        address: SocketAddr,
        transport: Transport,
        max_message_size: usize,
        template_ttl: std::time::Duration,
        enterprise_registry: EnterpriseRegistry,
    ) -> Result<Self, CollectorError> {
        if max_message_size < 16 {
            return Err(CollectorError::ConfigInvalid(
                "maxMessageSize must be large enough for an IPFIX message header".to_string(),
            ));
        }
        Ok(Self {
            address,
            transport,
            max_message_size,
            template_ttl,
            enterprise_registry,
        })
    }
}

impl Default for CollectingConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 4739)),
            transport: Transport::Udp,
            max_message_size: 65535,
            template_ttl: DEFAULT_TEMPLATE_TTL,
            enterprise_registry: EnterpriseRegistry::with_flow_visibility_fields(),
        }
    }
}

/// Owns the Template Catalog and the listening thread. `start` binds the
/// socket and begins reading; `stop` flips a shared stop flag and joins the
/// listener thread, which observes the flag the next time its poll-interval
/// read/accept timeout elapses (spec.md §4.C `stop()` "halt" contract).
pub struct CollectingProcess {
    config: CollectingConfig,
    catalog: Arc<TemplateCatalog>,
    handle: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
}

impl CollectingProcess {
    pub fn new(config: CollectingConfig) -> Self {
        let catalog = TemplateCatalog::new(config.transport, config.template_ttl);
        Self {
            config,
            catalog,
            handle: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn catalog(&self) -> Arc<TemplateCatalog> {
        Arc::clone(&self.catalog)
    }

    /// Spawn the listening thread, forwarding every successfully decoded
    /// message to `sender`. Decode failures are logged and the offending
    /// packet is dropped; the loop keeps running (spec.md §7).
    pub fn start(&mut self, sender: Sender<Message>) -> Result<(), CollectorError> {
        self.stop_flag.store(false, Ordering::SeqCst);
        let registries = Registries::new(self.config.enterprise_registry.clone());
        let catalog = Arc::clone(&self.catalog);
        let config = self.config.clone();
        let stop_flag = Arc::clone(&self.stop_flag);

        let handle = match config.transport {
            Transport::Udp => spawn_udp_listener(config, catalog, registries, sender, stop_flag)?,
            Transport::Tcp => spawn_tcp_listener(config, catalog, registries, sender, stop_flag)?,
        };
        self.handle = Some(handle);
        Ok(())
    }

    /// Signal the listener loop to halt and join its thread. Returns once
    /// the loop has observed the flag, within one `POLL_INTERVAL` of this
    /// call — never blocks on the socket indefinitely.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut)
}

fn spawn_udp_listener(
    config: CollectingConfig,
    catalog: Arc<TemplateCatalog>,
    registries: Registries,
    sender: Sender<Message>,
    stop_flag: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, CollectorError> {
    let socket = UdpSocket::bind(config.address)
        .map_err(|err| CollectorError::ConfigInvalid(format!("failed to bind UDP socket to {}: {err}", config.address)))?;
    socket.set_read_timeout(Some(POLL_INTERVAL)).map_err(|err| {
        CollectorError::ConfigInvalid(format!("failed to set UDP read timeout: {err}"))
    })?;
    log::info!("collecting process listening for UDP on {}", config.address);

    Ok(thread::Builder::new()
        .name("ipfix-collecting-udp".to_string())
        .spawn(move || {
            let mut buf = vec![0u8; config.max_message_size];
            while !stop_flag.load(Ordering::SeqCst) {
                let (len, from) = match socket.recv_from(&mut buf) {
                    Ok(result) => result,
                    Err(err) if is_timeout(&err) => continue,
                    Err(err) => {
                        log::error!("UDP recv_from failed, stopping listener: {err}");
                        break;
                    }
                };
                handle_packet(&buf[..len], from.ip(), &catalog, &registries, &sender);
            }
            log::info!("collecting process UDP listener stopped");
        })
        .expect("failed to spawn UDP listener thread"))
}

fn spawn_tcp_listener(
    config: CollectingConfig,
    catalog: Arc<TemplateCatalog>,
    registries: Registries,
    sender: Sender<Message>,
    stop_flag: Arc<AtomicBool>,
) -> Result<JoinHandle<()>, CollectorError> {
    let listener = TcpListener::bind(config.address)
        .map_err(|err| CollectorError::ConfigInvalid(format!("failed to bind TCP listener to {}: {err}", config.address)))?;
    listener.set_nonblocking(true).map_err(|err| {
        CollectorError::ConfigInvalid(format!("failed to set TCP listener nonblocking: {err}"))
    })?;
    log::info!("collecting process listening for TCP on {}", config.address);

    Ok(thread::Builder::new()
        .name("ipfix-collecting-tcp".to_string())
        .spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                let mut stream = match listener.accept() {
                    Ok((stream, _addr)) => stream,
                    Err(err) if is_timeout(&err) => {
                        thread::sleep(POLL_INTERVAL);
                        continue;
                    }
                    Err(err) => {
                        log::error!("TCP accept failed: {err}");
                        continue;
                    }
                };
                let peer = match stream.peer_addr() {
                    Ok(addr) => addr.ip(),
                    Err(err) => {
                        log::error!("TCP peer_addr failed: {err}");
                        continue;
                    }
                };
                if let Err(err) = stream
                    .set_nonblocking(false)
                    .and_then(|()| stream.set_read_timeout(Some(POLL_INTERVAL)))
                {
                    log::error!("failed to configure TCP stream from {peer}: {err}");
                    continue;
                }
                let catalog = Arc::clone(&catalog);
                let registries = registries.clone();
                let sender = sender.clone();
                let max_message_size = config.max_message_size;
                let stop_flag = Arc::clone(&stop_flag);
                thread::spawn(move || {
                    let mut buf = vec![0u8; max_message_size];
                    while !stop_flag.load(Ordering::SeqCst) {
                        let len = match stream.read(&mut buf) {
                            Ok(0) => break,
                            Ok(len) => len,
                            Err(err) if is_timeout(&err) => continue,
                            Err(err) => {
                                log::error!("TCP read from {peer} failed: {err}");
                                break;
                            }
                        };
                        handle_packet(&buf[..len], peer, &catalog, &registries, &sender);
                    }
                });
            }
            log::info!("collecting process TCP listener stopped");
        })
        .expect("failed to spawn TCP listener thread"))
}

fn handle_packet(
    bytes: &[u8],
    from: IpAddr,
    catalog: &Arc<TemplateCatalog>,
    registries: &Registries,
    sender: &Sender<Message>,
) {
    match decode_message(bytes, from, catalog, registries) {
        Ok(message) => {
            if sender.send(message).is_err() {
                log::warn!("aggregation channel closed, dropping decoded message from {from}");
            }
        }
        Err(err) => log::warn!("failed to decode message from {from}: {err}"),
    }
}
