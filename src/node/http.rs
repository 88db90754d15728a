//! `reqwest`-backed [`NodeClient`]. Grounded in the teacher's
//! `HTTPNodeClient` shape (host config + thin per-endpoint methods that
//! build a URL and deserialize a JSON response), adapted from a synchronous
//! hyper-0.12 client into an `async` `reqwest` one.

use super::{FeeInfo, NodeClient, NodeInfo, SyncDataResponse};
use crate::common::{ErrorKind, Result};
use crate::crypto::{Address, PublicKey};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

pub struct HttpNodeClient {
	host: String,
	client: reqwest::Client,
	/// Cached after the first request: `Some(true)` for https, `Some(false)`
	/// for http. `None` means not yet probed.
	scheme_is_https: RwLock<Option<bool>>,
	/// Once `/getrawblocks` 404s, every later call goes straight to
	/// `/getwalletsyncdata` for the rest of the session.
	use_legacy_sync_endpoint: RwLock<bool>,
	/// Network prefix a `/fee` response's address must decode under; a
	/// mismatch means the node is pointing the wallet at someone else's
	/// network, not just someone else's wallet.
	address_prefix: u64,
}

impl HttpNodeClient {
	pub fn new(host: &str, request_timeout: Duration, address_prefix: u64) -> Self {
		let client = reqwest::Client::builder().timeout(request_timeout).build().expect("reqwest client builder");
		HttpNodeClient { host: host.to_string(), client, scheme_is_https: RwLock::new(None), use_legacy_sync_endpoint: RwLock::new(false), address_prefix }
	}

	async fn base_url(&self) -> Result<String> {
		if let Some(is_https) = *self.scheme_is_https.read() {
			return Ok(format!("{}://{}", if is_https { "https" } else { "http" }, self.host));
		}
		let https_url = format!("https://{}", self.host);
		if self.client.get(format!("{}/info", https_url)).send().await.is_ok() {
			*self.scheme_is_https.write() = Some(true);
			return Ok(https_url);
		}
		let http_url = format!("http://{}", self.host);
		if self.client.get(format!("{}/info", http_url)).send().await.is_ok() {
			*self.scheme_is_https.write() = Some(false);
			return Ok(http_url);
		}
		warn!("node at {} unreachable over both https and http", self.host);
		Err(ErrorKind::DaemonOffline.into())
	}

	async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T> {
		let url = format!("{}{}", self.base_url().await?, path);
		let response = self.client.get(&url).send().await.map_err(classify_reqwest_err)?;
		response.json::<T>().await.map_err(classify_reqwest_err)
	}

	async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(&self, path: &str, body: &B) -> Result<T> {
		let url = format!("{}{}", self.base_url().await?, path);
		let response = self.client.post(&url).json(body).send().await.map_err(classify_reqwest_err)?;
		response.json::<T>().await.map_err(classify_reqwest_err)
	}
}

fn classify_reqwest_err(e: reqwest::Error) -> crate::common::Error {
	if e.is_timeout() {
		return ErrorKind::DaemonOffline.into();
	}
	if e.status().map(|s| s.as_u16()) == Some(504) {
		return ErrorKind::DaemonStillProcessing.into();
	}
	ErrorKind::DaemonOffline.into()
}

#[async_trait]
impl NodeClient for HttpNodeClient {
	async fn get_info(&self) -> Result<NodeInfo> {
		self.get_json("/info").await
	}

	async fn get_fee(&self) -> Result<Option<FeeInfo>> {
		let fee = match self.get_json::<FeeInfo>("/fee").await {
			Ok(fee) => fee,
			Err(_) => return Ok(None),
		};
		let address = Address::from_base58(&fee.address)?;
		if address.prefix != self.address_prefix {
			return Err(ErrorKind::InvalidAddressPrefix.into());
		}
		Ok(Some(fee))
	}

	async fn get_wallet_sync_data(
		&self,
		block_count: u64,
		block_hash_checkpoints: &[(u64, String)],
		skip_coinbase_transactions: bool,
		start_height: u64,
		start_timestamp: u64,
	) -> Result<SyncDataResponse> {
		let checkpoints: Vec<&String> = block_hash_checkpoints.iter().map(|(_, hash)| hash).collect();
		let body = json!({
			"blockCount": block_count,
			"blockHashCheckpoints": checkpoints,
			"skipCoinbaseTransactions": skip_coinbase_transactions,
			"startHeight": start_height,
			"startTimestamp": start_timestamp,
		});

		if !*self.use_legacy_sync_endpoint.read() {
			match self.post_json::<_, SyncDataResponse>("/getrawblocks", &body).await {
				Ok(data) => return Ok(data),
				Err(_) => {
					debug!("/getrawblocks unavailable, falling back to /getwalletsyncdata for this session");
					*self.use_legacy_sync_endpoint.write() = true;
				}
			}
		}
		self.post_json("/getwalletsyncdata", &body).await
	}

	async fn get_global_indexes_for_range(&self, start_height: u64, end_height: u64) -> Result<HashMap<String, Vec<u64>>> {
		#[derive(Deserialize)]
		struct Entry {
			key: String,
			value: Vec<u64>,
		}
		#[derive(Deserialize)]
		struct Response {
			indexes: Vec<Entry>,
		}
		let body = json!({ "startHeight": start_height, "endHeight": end_height });
		let response: Response = self.post_json("/get_global_indexes_for_range", &body).await?;
		Ok(response.indexes.into_iter().map(|e| (e.key, e.value)).collect())
	}

	async fn get_transactions_status(&self, transaction_hashes: &[String]) -> Result<Vec<String>> {
		#[derive(Deserialize)]
		struct Response {
			#[serde(rename = "transactionsUnknown")]
			transactions_unknown: Vec<String>,
		}
		let body = json!({ "transactionHashes": transaction_hashes });
		let response: Response = self.post_json("/get_transactions_status", &body).await?;
		Ok(response.transactions_unknown)
	}

	async fn get_random_outputs(&self, amounts: &[u64], mixin: u64) -> Result<HashMap<u64, Vec<(u64, PublicKey)>>> {
		#[derive(Deserialize)]
		struct Entry {
			amount: u64,
			outs: Vec<OutEntry>,
		}
		#[derive(Deserialize)]
		struct OutEntry {
			global_index: u64,
			out_key: String,
		}
		let body = json!({ "amounts": amounts, "mixin": mixin });
		let entries: Vec<Entry> = self.post_json("/getrandom_outs", &body).await?;
		let mut out = HashMap::new();
		for entry in entries {
			let mut pairs = Vec::with_capacity(entry.outs.len());
			for o in entry.outs {
				let key = PublicKey::from_hex(&o.out_key)?;
				pairs.push((o.global_index, key));
			}
			out.insert(entry.amount, pairs);
		}
		Ok(out)
	}

	async fn send_raw_transaction(&self, tx_hex: &str) -> Result<()> {
		#[derive(Deserialize)]
		struct Response {
			status: String,
			#[serde(default)]
			error: Option<String>,
		}
		let body = json!({ "tx_as_hex": tx_hex });
		let response: Response = self.post_json("/sendrawtransaction", &body).await?;
		if response.status == "OK" {
			Ok(())
		} else {
			Err(ErrorKind::DaemonError(response.error.unwrap_or(response.status)).into())
		}
	}
}
