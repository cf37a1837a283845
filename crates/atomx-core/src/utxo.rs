//! Waiting for a funding output to appear at an address.
//!
//! [`UtxoPoller`] checks an address on a fixed interval until a confirmed,
//! token-free output of the wanted value shows up. A single check can be run
//! directly with [`UtxoPoller::tick`]; [`UtxoPoller::start`] spawns the
//! repeating task and hands back a [`PollHandle`].

use std::sync::Arc;
use std::time::Duration;

use bitcoin::Amount;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::CoreError;
use crate::rpc::ElectrumApi;
use crate::scripthash::ScripthashResolver;
use crate::types::Utxo;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

// ==============================================================================
// Selection
// ==============================================================================

/// The output being waited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoWatch {
    pub satoshis: Amount,
    /// Only accept an output of exactly `satoshis`; otherwise any output of
    /// at least that value qualifies.
    pub exact: bool,
}

impl UtxoWatch {
    pub fn exact(satoshis: u64) -> Self {
        Self {
            satoshis: Amount::from_sat(satoshis),
            exact: true,
        }
    }

    pub fn at_least(satoshis: u64) -> Self {
        Self {
            satoshis: Amount::from_sat(satoshis),
            exact: false,
        }
    }

    /// Pick the smallest qualifying output, skipping unconfirmed outputs and
    /// outputs that carry atomicals.
    pub fn select(&self, mut utxos: Vec<Utxo>) -> Option<Utxo> {
        utxos.retain(|utxo| !is_excluded(utxo));
        utxos.sort_by_key(|utxo| utxo.value);
        utxos.into_iter().find(|utxo| {
            if self.exact {
                utxo.value == self.satoshis
            } else {
                utxo.value >= self.satoshis
            }
        })
    }
}

fn is_excluded(utxo: &Utxo) -> bool {
    utxo.has_attached_tokens() || !utxo.is_confirmed()
}

// ==============================================================================
// Poller
// ==============================================================================

pub struct UtxoPoller<A: ?Sized> {
    api: Arc<A>,
    resolver: Arc<dyn ScripthashResolver>,
    address: String,
    watch: UtxoWatch,
    interval: Duration,
}

impl<A> UtxoPoller<A>
where
    A: ElectrumApi + ?Sized + 'static,
{
    pub fn new(
        api: Arc<A>,
        resolver: Arc<dyn ScripthashResolver>,
        address: &str,
        watch: UtxoWatch,
        interval: Duration,
    ) -> Result<Self, CoreError> {
        if interval.is_zero() {
            return Err(CoreError::InvalidConfig(
                "utxo poll interval must be greater than zero".to_owned(),
            ));
        }
        Ok(Self {
            api,
            resolver,
            address: address.to_owned(),
            watch,
            interval,
        })
    }

    /// Run one check.
    ///
    /// Fetch failures count as "nothing yet". An address that cannot be
    /// resolved is returned as an error.
    pub async fn tick(&self) -> Result<Option<Utxo>, CoreError> {
        info!(
            address = %self.address,
            btc = self.watch.satoshis.to_btc(),
            exact = self.watch.exact,
            "waiting until utxo is received"
        );
        let scripthash = self.resolver.scripthash(&self.address)?;

        let utxos = match self.api.get_unspent_scripthash(&scripthash).await {
            Ok(summary) => summary.utxos,
            Err(err) => {
                debug!(address = %self.address, error = %err, "listunspent failed; treating as empty");
                Vec::new()
            }
        };

        Ok(self.watch.select(utxos))
    }

    /// Check every interval until a match or an error. The first check runs
    /// one interval after the call.
    pub async fn run(&self) -> Result<Utxo, CoreError> {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(utxo) = self.tick().await? {
                info!(
                    address = %self.address,
                    txid = %utxo.txid,
                    vout = utxo.output_index,
                    value = utxo.value.to_sat(),
                    "utxo received"
                );
                return Ok(utxo);
            }
        }
    }

    /// Spawn [`UtxoPoller::run`] onto the current tokio runtime.
    pub fn start(self) -> PollHandle {
        PollHandle {
            task: tokio::spawn(async move { self.run().await }),
        }
    }
}

/// Handle to a running poll. Dropping the handle leaves the task running.
pub struct PollHandle {
    task: JoinHandle<Result<Utxo, CoreError>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the poll to end. A cancelled poll yields
    /// [`CoreError::PollCancelled`].
    pub async fn wait(self) -> Result<Utxo, CoreError> {
        match self.task.await {
            Ok(result) => result,
            Err(err) if err.is_cancelled() => Err(CoreError::PollCancelled),
            Err(err) => std::panic::resume_unwind(err.into_panic()),
        }
    }
}

/// Start polling `address` for an output of `satoshis` (exactly, or at
/// least). Polls until a match; there is no retry cap or overall timeout.
pub fn wait_until_utxo<A>(
    api: Arc<A>,
    resolver: Arc<dyn ScripthashResolver>,
    address: &str,
    satoshis: u64,
    interval: Duration,
    exact: bool,
) -> Result<PollHandle, CoreError>
where
    A: ElectrumApi + ?Sized + 'static,
{
    let watch = if exact {
        UtxoWatch::exact(satoshis)
    } else {
        UtxoWatch::at_least(satoshis)
    };
    Ok(UtxoPoller::new(api, resolver, address, watch, interval)?.start())
}
