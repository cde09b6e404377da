use std::time::Duration;

use bon::Builder;
use clap::Parser;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    cli::ShineArgs,
    core::poller::Poller,
    prelude::*,
    tables::build_readings_table,
};

#[derive(Parser)]
pub struct WatchArgs {
    /// Polling interval.
    #[clap(long, env = "POLL_INTERVAL", default_value = "5min")]
    poll_interval: humantime::Duration,

    #[clap(flatten)]
    shine: ShineArgs,
}

impl WatchArgs {
    pub async fn run(self) -> Result {
        Watcher::builder()
            .poller(Poller::new(self.shine.connect()?))
            .interval(self.poll_interval)
            .build()
            .run()
            .await
    }
}

#[derive(Builder)]
struct Watcher {
    poller: Poller,

    #[builder(into)]
    interval: Duration,
}

impl Watcher {
    /// One cooperative task, one cycle per tick. A failed cycle is logged
    /// and retried on the next tick; there is no backoff beyond the
    /// schedule itself.
    async fn run(mut self) -> Result {
        let mut interval = interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.poller.refresh().await {
                Ok(readings) => {
                    info!(n_devices = readings.len(), "cycle done");
                    println!("{}", build_readings_table(&readings));
                }
                Err(error) => {
                    error!(%error, "cycle failed");
                }
            }
        }
    }
}
