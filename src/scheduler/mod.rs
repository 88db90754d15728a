//! Cooperative tick scheduler (spec §5): sync, node-info, and
//! cancellation-check each run on their own re-arming `tokio::time::interval`.
//! `stop()` lets whichever tick is currently running finish; it just stops
//! the next one from being armed.

use crate::common::Result;
use crate::node::{FeeInfo, NodeClient, NodeInfo};
use crate::sync::Synchronizer;
use log::warn;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Guards the single-send-in-flight rule (spec §5 "Fetch exclusion"): the
/// transaction builder holds this for the duration of a send, and
/// auto-optimize checks it before building a fusion transaction so the two
/// never race over the same inputs.
#[derive(Clone)]
pub struct TransactingGuard(Arc<AtomicBool>);

impl Default for TransactingGuard {
	fn default() -> Self {
		Self::new()
	}
}

impl TransactingGuard {
	pub fn new() -> Self {
		TransactingGuard(Arc::new(AtomicBool::new(false)))
	}

	/// Claims the flag for the caller's send; `None` if one is already in
	/// flight. The returned permit releases the flag on drop, so a failed
	/// or cancelled send can't leave the wallet stuck.
	pub fn try_acquire(&self) -> Option<TransactingPermit> {
		if self.0.swap(true, Ordering::AcqRel) {
			None
		} else {
			Some(TransactingPermit(self.0.clone()))
		}
	}

	pub fn is_transacting(&self) -> bool {
		self.0.load(Ordering::Acquire)
	}
}

pub struct TransactingPermit(Arc<AtomicBool>);

impl Drop for TransactingPermit {
	fn drop(&mut self) {
		self.0.store(false, Ordering::Release);
	}
}

/// Last node-info/fee response plus when it arrived, so staleness can be
/// judged against `maxLastUpdatedNetworkHeightInterval` (spec §5/§6).
#[derive(Default)]
pub struct NodeInfoCache {
	inner: Mutex<Option<(NodeInfo, Option<FeeInfo>, Instant)>>,
}

impl NodeInfoCache {
	pub fn new() -> Self {
		NodeInfoCache { inner: Mutex::new(None) }
	}

	fn record(&self, info: NodeInfo, fee: Option<FeeInfo>) {
		*self.inner.lock() = Some((info, fee, Instant::now()));
	}

	pub fn latest(&self) -> Option<(NodeInfo, Option<FeeInfo>)> {
		self.inner.lock().as_ref().map(|(info, fee, _)| (info.clone(), fee.clone()))
	}

	/// `true` once the cache is older than `max_age_ms`, or if nothing has
	/// ever landed in it.
	pub fn is_stale(&self, max_age_ms: u64) -> bool {
		match &*self.inner.lock() {
			Some((_, _, at)) => at.elapsed() > Duration::from_millis(max_age_ms),
			None => true,
		}
	}
}

/// Runs the three periodic tasks spec §5 names. `stop()` sets a flag the
/// next tick observes before doing any work; it never aborts a tick that's
/// already running.
pub struct Scheduler {
	synchronizer: Arc<Synchronizer>,
	node: Arc<dyn NodeClient>,
	node_info: Arc<NodeInfoCache>,
	transacting: TransactingGuard,
	should_stop: Arc<AtomicBool>,
	handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
	pub fn new(synchronizer: Arc<Synchronizer>, node: Arc<dyn NodeClient>) -> Self {
		Scheduler { synchronizer, node, node_info: Arc::new(NodeInfoCache::new()), transacting: TransactingGuard::new(), should_stop: Arc::new(AtomicBool::new(false)), handles: Vec::new() }
	}

	pub fn transacting_guard(&self) -> TransactingGuard {
		self.transacting.clone()
	}

	pub fn node_info_cache(&self) -> Arc<NodeInfoCache> {
		self.node_info.clone()
	}

	/// Spawns the sync, node-info, and cancellation-check ticks at the
	/// given periods. Safe to call once per `Scheduler`; calling it again
	/// after `stop()` spawns a fresh, independently-stoppable set.
	pub fn start(&mut self, sync_period: Duration, node_info_period: Duration, cancellation_period: Duration) {
		self.should_stop.store(false, Ordering::Release);
		self.handles.push(self.spawn_sync_tick(sync_period));
		self.handles.push(self.spawn_node_info_tick(node_info_period));
		self.handles.push(self.spawn_cancellation_tick(cancellation_period));
	}

	/// Marks the scheduler stopped. The tick currently running (if any)
	/// finishes normally; none of the three re-arm afterward.
	pub fn stop(&self) {
		self.should_stop.store(true, Ordering::Release);
	}

	pub fn is_stopped(&self) -> bool {
		self.should_stop.load(Ordering::Acquire)
	}

	/// Waits for every spawned tick task to exit, which only happens after
	/// `stop()` and the in-flight tick (if any) finishes.
	pub async fn join(&mut self) {
		for handle in self.handles.drain(..) {
			let _ = handle.await;
		}
	}

	fn spawn_sync_tick(&self, period: Duration) -> JoinHandle<()> {
		let synchronizer = self.synchronizer.clone();
		let should_stop = self.should_stop.clone();
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				if should_stop.load(Ordering::Acquire) {
					return;
				}
				if let Err(e) = synchronizer.fetch().await {
					warn!("sync fetch failed: {}", e);
				}
				if let Err(e) = synchronizer.process().await {
					warn!("sync process failed: {}", e);
				}
			}
		})
	}

	fn spawn_node_info_tick(&self, period: Duration) -> JoinHandle<()> {
		let node = self.node.clone();
		let cache = self.node_info.clone();
		let should_stop = self.should_stop.clone();
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				if should_stop.load(Ordering::Acquire) {
					return;
				}
				match node.get_info().await {
					Ok(info) => {
						let fee = node.get_fee().await.unwrap_or_else(|e| {
							warn!("get_fee failed: {}", e);
							None
						});
						cache.record(info, fee);
					}
					Err(e) => warn!("get_info failed: {}", e),
				}
			}
		})
	}

	fn spawn_cancellation_tick(&self, period: Duration) -> JoinHandle<()> {
		let synchronizer = self.synchronizer.clone();
		let should_stop = self.should_stop.clone();
		tokio::spawn(async move {
			let mut interval = tokio::time::interval(period);
			loop {
				interval.tick().await;
				if should_stop.load(Ordering::Acquire) {
					return;
				}
				if let Err(e) = synchronizer.find_cancelled().await {
					warn!("cancellation check failed: {}", e);
				}
			}
		})
	}
}

/// Runs `task` only if no send is currently in flight, per spec §5
/// "auto-optimize suspends itself while transacting".
pub async fn run_unless_transacting<F, Fut>(guard: &TransactingGuard, task: F) -> Option<Result<()>>
where
	F: FnOnce() -> Fut,
	Fut: std::future::Future<Output = Result<()>>,
{
	if guard.is_transacting() {
		return None;
	}
	Some(task().await)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn transacting_guard_rejects_concurrent_acquire() {
		let guard = TransactingGuard::new();
		let permit = guard.try_acquire().unwrap();
		assert!(guard.try_acquire().is_none());
		drop(permit);
		assert!(guard.try_acquire().is_some());
	}

	#[test]
	fn node_info_cache_starts_stale() {
		let cache = NodeInfoCache::new();
		assert!(cache.is_stale(60_000));
	}

	#[tokio::test]
	async fn run_unless_transacting_skips_while_a_send_is_in_flight() {
		let guard = TransactingGuard::new();
		let permit = guard.try_acquire().unwrap();
		let ran = run_unless_transacting(&guard, || async { Ok(()) }).await;
		assert!(ran.is_none());
		drop(permit);
		let ran = run_unless_transacting(&guard, || async { Ok(()) }).await;
		assert!(ran.unwrap().is_ok());
	}
}
