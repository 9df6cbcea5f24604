//! Subnet expansion and bounded-concurrency dispatch of host workers.
//!
//! Addresses are drawn lazily from the subnet; a new worker task is spawned
//! only while fewer than `max_concurrency` are in flight. Outcomes come back
//! in completion order, not address order.

use std::sync::Arc;

use ipnet::{IpAddrRange, IpNet};
use tokio::task::JoinSet;

use cpe_core::{ScanError, ScanOutcome};

use crate::session::Connector;
use crate::worker::HostWorker;

/// Usable host addresses of `subnet`, produced on demand.
///
/// Network and broadcast addresses are excluded; `/31` and `/32` yield every
/// address. IPv6 subnets yield every address.
pub fn usable_hosts(subnet: &IpNet) -> IpAddrRange {
    subnet.hosts()
}

/// Number of addresses [`usable_hosts`] yields, without iterating them.
pub fn host_count(subnet: &IpNet) -> u128 {
    match subnet {
        IpNet::V4(net) => {
            let size = 1u128 << (32 - u32::from(net.prefix_len()));
            if net.prefix_len() < 31 {
                size - 2
            } else {
                size
            }
        }
        IpNet::V6(net) => 1u128
            .checked_shl(128 - u32::from(net.prefix_len()))
            .unwrap_or(u128::MAX),
    }
}

/// Dispatches host workers for one subnet at a time.
pub struct SubnetScanner<C: Connector> {
    worker: Arc<HostWorker<C>>,
    max_concurrency: usize,
}

impl<C: Connector> SubnetScanner<C> {
    pub fn new(worker: Arc<HostWorker<C>>, max_concurrency: usize) -> Self {
        Self {
            worker,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Prepare a scan of every usable address of `subnet`. Workers start on
    /// the first call to [`SubnetScan::next`].
    pub fn scan(&self, subnet: IpNet) -> SubnetScan<C> {
        let total = usize::try_from(host_count(&subnet)).unwrap_or(usize::MAX);

        tracing::info!(
            subnet = %subnet,
            hosts = total,
            max_concurrency = self.max_concurrency,
            "Subnet scan started"
        );

        SubnetScan {
            subnet,
            total,
            hosts: usable_hosts(&subnet),
            worker: self.worker.clone(),
            max_concurrency: self.max_concurrency,
            tasks: JoinSet::new(),
        }
    }
}

/// In-flight scan of one subnet, drained with [`SubnetScan::next`].
pub struct SubnetScan<C: Connector> {
    subnet: IpNet,
    total: usize,
    hosts: IpAddrRange,
    worker: Arc<HostWorker<C>>,
    max_concurrency: usize,
    tasks: JoinSet<ScanOutcome>,
}

impl<C: Connector> SubnetScan<C> {
    /// Number of addresses this scan reports on.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of worker tasks spawned and not yet drained.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Next outcome to complete, or `None` once every address has reported.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn next(&mut self) -> Option<ScanOutcome> {
        loop {
            self.dispatch();
            match self.tasks.join_next().await? {
                Ok(outcome) => return Some(outcome),
                Err(e) => {
                    tracing::error!(subnet = %self.subnet, error = %e, "Dispatch task panicked");
                }
            }
        }
    }

    /// Top the task set up to `max_concurrency` from the remaining addresses.
    fn dispatch(&mut self) {
        while self.tasks.len() < self.max_concurrency {
            let Some(address) = self.hosts.next() else {
                break;
            };
            let worker = self.worker.clone();

            self.tasks.spawn(async move {
                // A panic inside the worker surfaces here with the address still known.
                match tokio::spawn(async move { worker.scan(address).await }).await {
                    Ok(outcome) => outcome,
                    Err(e) => ScanOutcome::failed(address, ScanError::Worker(e.to_string())),
                }
            });
        }
    }
}
