mod config;
mod stats;

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::LoadConfig;
use stats::Stats;

/// Fixed payload every virtual user posts.
fn test_request() -> Value {
    json!({
        "DIA": 13,
        "MES": 9,
        "DIANOM": "Miercoles",
        "TIPOVUELO": "N",
        "OPERA": "Grupo LATAM",
        "SIGLADES": "Arica",
        "TEMPORADAALTA": 1,
        "PERIODODIA": "noche"
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "flight_delay_load=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = LoadConfig::from_env();
    let client = reqwest::Client::builder()
        .timeout(cfg.request_timeout)
        .build()?;
    let stats = Arc::new(Stats::new());
    let url = cfg.predict_url();

    tracing::info!(
        "{} users -> {} (wait {:?}..{:?}, run time {:?})",
        cfg.users, url, cfg.wait_min, cfg.wait_max, cfg.run_time
    );

    let users: Vec<_> = (0..cfg.users)
        .map(|id| {
            tokio::spawn(run_user(id, client.clone(), url.clone(), cfg.clone(), stats.clone()))
        })
        .collect();

    let deadline = async {
        match cfg.run_time {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = deadline => tracing::info!("run time elapsed"),
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                tracing::warn!("failed to listen for ctrl-c: {}", e);
            }
            tracing::info!("interrupted");
        }
    }

    for user in &users {
        user.abort();
    }
    join_all(users).await;

    tracing::info!("{}", stats.snapshot());
    Ok(())
}

async fn run_user(id: usize, client: reqwest::Client, url: String, cfg: LoadConfig, stats: Arc<Stats>) {
    let payload = test_request();
    let mut rng = StdRng::from_entropy();

    loop {
        let started = Instant::now();
        let ok = match client.post(&url).json(&payload).send().await {
            Ok(res) if res.status().is_success() => true,
            Ok(res) => {
                tracing::debug!("user {} got {}", id, res.status());
                false
            }
            Err(e) => {
                tracing::debug!("user {} request failed: {}", id, e);
                false
            }
        };
        stats.record(started.elapsed(), ok);

        tokio::time::sleep(cfg.next_wait(&mut rng)).await;
    }
}
