use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::pin::Pin;
use std::time::Duration;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::Future;
use serde_json::Value;
use chrono::Utc;
use tokio::time::Instant;
use boom_shared::protocol::SERVICE_TYPES;
use boom_shared::types::DiscoveredHost;
use crate::error::Result;

/// Attribute key → required value. Every pair must match.
pub type Filters = BTreeMap<String, Value>;

type RecvResult = (usize, flume::Receiver<ServiceEvent>, std::result::Result<ServiceEvent, flume::RecvError>);
type RecvFuture = Pin<Box<dyn Future<Output = RecvResult> + Send>>;

/// Each future owns a clone of the receiver, so the set of pending receives
/// can live in one FuturesUnordered. flume::Receiver is Clone (multi-consumer).
fn make_recv_future(idx: usize, rx: flume::Receiver<ServiceEvent>) -> RecvFuture {
    Box::pin(async move {
        let result = rx.recv_async().await;
        (idx, rx, result)
    })
}

/// Stops every browse and the daemon when dropped, however discovery ends
struct Browsers {
    daemon: ServiceDaemon,
    service_types: Vec<&'static str>,
}

impl Browsers {
    /// Start one browse per service type on `daemon`. On error, browses
    /// already started are released along with the daemon.
    fn start(
        daemon: ServiceDaemon,
        service_types: &[&'static str],
    ) -> Result<(Self, Vec<flume::Receiver<ServiceEvent>>)> {
        let mut browsers = Browsers {
            daemon,
            service_types: Vec::new(),
        };

        let mut receivers = Vec::new();
        for service_type in service_types {
            receivers.push(browsers.daemon.browse(service_type)?);
            browsers.service_types.push(*service_type);
            tracing::debug!("Browsing {}", service_type);
        }
        Ok((browsers, receivers))
    }
}

impl Drop for Browsers {
    fn drop(&mut self) {
        for service_type in &self.service_types {
            if let Err(e) = self.daemon.stop_browse(service_type) {
                tracing::warn!("Failed to stop browsing {}: {}", service_type, e);
            }
        }
        if let Err(e) = self.daemon.shutdown() {
            tracing::error!("Failed to shutdown mDNS daemon: {}", e);
        }
    }
}

/// Browse both Boom service types and return the hosts found.
///
/// With no `filters`, waits `scan_delay` once and returns everything seen
/// (possibly nothing). With `filters`, returns as soon as at least one host
/// matches all of them, or nothing once `max_wait` has passed.
pub async fn find_hosts(
    scan_delay: Duration,
    max_wait: Duration,
    filters: &Filters,
) -> Result<Vec<DiscoveredHost>> {
    let (_browsers, receivers) = Browsers::start(ServiceDaemon::new()?, &SERVICE_TYPES)?;
    Ok(collect_hosts(receivers, scan_delay, max_wait, filters).await)
}

/// Consume browse events until the stopping condition described on
/// [`find_hosts`] is met.
pub async fn collect_hosts(
    receivers: Vec<flume::Receiver<ServiceEvent>>,
    scan_delay: Duration,
    max_wait: Duration,
    filters: &Filters,
) -> Vec<DiscoveredHost> {
    let start = Instant::now();
    let stop_at = if filters.is_empty() {
        tracing::info!("Scanning network for {:?}...", scan_delay);
        start + scan_delay
    } else {
        start + max_wait
    };

    let mut events: FuturesUnordered<RecvFuture> = receivers
        .into_iter()
        .enumerate()
        .map(|(idx, rx)| make_recv_future(idx, rx))
        .collect();
    let mut seen = HashSet::new();
    let mut candidates: Vec<DiscoveredHost> = Vec::new();

    loop {
        tokio::select! {
            Some((idx, rx, result)) = events.next() => {
                match result {
                    Ok(ServiceEvent::ServiceResolved(info)) => {
                        if let Some(host) = convert_service_info(&info) {
                            if seen.insert(host.service_name.clone()) {
                                tracing::info!("Found {} service: {}", host.service_type, host);
                                candidates.push(host);

                                if !filters.is_empty() {
                                    let found = matching(&candidates, filters);
                                    if !found.is_empty() {
                                        return found;
                                    }
                                }
                            }
                        }
                        events.push(make_recv_future(idx, rx));
                    }
                    Ok(ServiceEvent::ServiceFound(_typ, fullname)) => {
                        tracing::debug!("Service found, resolving: {}", fullname);
                        events.push(make_recv_future(idx, rx));
                    }
                    Ok(_) => {
                        events.push(make_recv_future(idx, rx));
                    }
                    Err(e) => {
                        tracing::warn!("Receiver {} disconnected: {}", idx, e);
                    }
                }
            }

            _ = tokio::time::sleep_until(stop_at) => break,
        }
    }

    if filters.is_empty() {
        if candidates.is_empty() {
            tracing::error!("No Boom services found after {:?}", scan_delay);
        }
        return candidates;
    }

    tracing::error!(
        "No services found matching {:?}, {:?} max timeout reached",
        filters,
        max_wait
    );
    Vec::new()
}

/// Hosts whose attributes equal every filter value
pub fn matching(candidates: &[DiscoveredHost], filters: &Filters) -> Vec<DiscoveredHost> {
    candidates
        .iter()
        .filter(|host| {
            filters
                .iter()
                .all(|(key, value)| host.attribute(key).as_ref() == Some(value))
        })
        .cloned()
        .collect()
}

/// Convert an mdns-sd ServiceInfo to a DiscoveredHost
fn convert_service_info(info: &mdns_sd::ServiceInfo) -> Option<DiscoveredHost> {
    // Lowest address wins so repeated resolutions agree
    let address: Option<Ipv4Addr> = info
        .get_addresses()
        .iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(ipv4) => Some(*ipv4),
            _ => None,
        })
        .min();

    let Some(address) = address else {
        tracing::debug!("Skipping service {} - no IPv4 addresses", info.get_fullname());
        return None;
    };

    // Extract TXT records
    let attributes: HashMap<String, String> = info
        .get_properties()
        .iter()
        .map(|prop| (prop.key().to_string(), prop.val_str().to_string()))
        .collect();

    Some(DiscoveredHost {
        service_type: info.get_type().to_string(),
        service_name: info.get_fullname().to_string(),
        hostname: info.get_hostname().to_string(),
        address,
        port: info.get_port(),
        attributes,
        discovered_at: Utc::now(),
    })
}
