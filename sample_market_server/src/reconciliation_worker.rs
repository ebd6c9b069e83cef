use std::{sync::Arc, time::Duration};

use log::*;
use sample_market_engine::{
    traits::PaymentGateway,
    PaymentFlowApi,
    PaymentFlowError,
    PaymentManagement,
    ReconcileOutcome,
};
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
    time::MissedTickBehavior,
};

/// Tallies of a single reconciliation round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub pending: usize,
    pub settled: usize,
    pub still_pending: usize,
    pub already_settled: usize,
    pub failed: usize,
}

/// Starts the payment reconciliation worker.
///
/// Every `interval`, all pending payments are reconciled against the gateway. A round always runs to completion before
/// the next one starts; if a round overruns the interval, the next tick is delayed rather than bunched up.
///
/// Send `true` on `shutdown` (or drop the sender) to stop the worker. The signal is only observed between rounds, so
/// awaiting the returned handle waits for the current round to drain.
pub fn start_reconciliation_worker<B, G>(
    api: Arc<PaymentFlowApi<B, G>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    B: PaymentManagement + 'static,
    G: PaymentGateway + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ Payment reconciliation worker started. Interval: {} ms", interval.as_millis());
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => break,
            }
            match run_reconciliation_round(&api).await {
                Ok(summary) if summary.pending == 0 => trace!("🕰️ No pending payments"),
                Ok(summary) => debug!("🕰️ Reconciliation round complete. {summary:?}"),
                Err(e) => error!("🕰️ Could not run the reconciliation round: {e}"),
            }
        }
        info!("🕰️ Payment reconciliation worker stopped");
    })
}

/// Reconciles every pending payment concurrently, one task per payment, and waits for all of them.
///
/// A failure to reconcile one payment is logged and counted, and never affects the others. The only error returned is
/// a failure to list the pending payments in the first place.
pub async fn run_reconciliation_round<B, G>(api: &Arc<PaymentFlowApi<B, G>>) -> Result<RoundSummary, PaymentFlowError>
where
    B: PaymentManagement + 'static,
    G: PaymentGateway + 'static,
{
    let pending = api.pending_payments().await?;
    let mut summary = RoundSummary { pending: pending.len(), ..Default::default() };
    let mut tasks = JoinSet::new();
    for payment in pending {
        let api = Arc::clone(api);
        tasks.spawn(async move {
            let result = api.reconcile_payment(&payment).await;
            (payment.id, result)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(ReconcileOutcome::StillPending))) => summary.still_pending += 1,
            Ok((_, Ok(ReconcileOutcome::Settled { .. }))) => summary.settled += 1,
            Ok((_, Ok(ReconcileOutcome::AlreadySettled(_)))) => summary.already_settled += 1,
            Ok((id, Err(e))) => {
                warn!("🕰️ Could not reconcile payment {id}. It will be retried in the next round. {e}");
                summary.failed += 1;
            },
            Err(e) => {
                error!("🕰️ A reconciliation task did not complete. {e}");
                summary.failed += 1;
            },
        }
    }
    Ok(summary)
}
