use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use sample_market_engine::{PaymentFlowApi, PurchaseApi, SqliteDatabase};
use tokio::sync::watch;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{object_storage::PublicBucketUrls, yookassa::YooKassaClient},
    reconciliation_worker::start_reconciliation_worker,
    routes::health,
};

pub type MarketPaymentApi = PaymentFlowApi<SqliteDatabase, YooKassaClient>;
pub type MarketPurchaseApi = PurchaseApi<SqliteDatabase, PublicBucketUrls>;

/// Runs the HTTP server and the reconciliation worker until the server is stopped (e.g. by Ctrl-C). The worker is
/// then signalled and allowed to finish its current round before the database is closed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        YooKassaClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let storage =
        PublicBucketUrls::new(&config.storage).map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    let payments = Arc::new(PaymentFlowApi::new(db.clone(), gateway, config.payment_flow.clone()));
    let purchases = Arc::new(PurchaseApi::new(db.clone(), storage));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = start_reconciliation_worker(Arc::clone(&payments), config.reconcile_interval, shutdown_rx);

    let srv = create_server_instance(&config, payments, purchases)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));

    info!("🚀️ Server stopped. Waiting for the reconciliation worker to finish");
    if shutdown_tx.send(true).is_err() {
        warn!("🚀️ The reconciliation worker had already stopped");
    }
    if let Err(e) = worker.await {
        error!("🚀️ The reconciliation worker did not shut down cleanly. {e}");
    }
    db.close().await;
    result
}

pub fn create_server_instance(
    config: &ServerConfig,
    payments: Arc<MarketPaymentApi>,
    purchases: Arc<MarketPurchaseApi>,
) -> Result<Server, ServerError> {
    let payments = web::Data::from(payments);
    let purchases = web::Data::from(purchases);
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sm::access_log"))
            .app_data(payments.clone())
            .app_data(purchases.clone())
            .service(health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
