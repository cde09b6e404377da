use clap::{Parser, Subcommand};

use crate::{
    cli::ShineArgs,
    core::poller::Poller,
    prelude::*,
    tables::build_readings_table,
};

#[derive(Parser)]
pub struct NestArgs {
    #[clap(flatten)]
    pub shine: ShineArgs,

    #[command(subcommand)]
    pub command: NestCommand,
}

#[derive(Subcommand)]
pub enum NestCommand {
    /// Scrape the web app and print the login RSA public key.
    PublicKey,

    /// Log in and print the session expiry.
    Login,

    /// List the device serial numbers (first page of 10 only).
    Devices,

    /// Fetch one raw device snapshot.
    Snapshot {
        #[clap(long, alias = "serial", env = "SHINE_SERIAL_NUMBER")]
        serial_number: String,
    },

    /// Run a single polling cycle and render the readings.
    Poll,
}

pub async fn run(args: NestArgs) -> Result {
    let mut api = args.shine.connect()?;

    match args.command {
        NestCommand::PublicKey => {
            print!("{}", api.extract_public_key().await?);
        }

        NestCommand::Login => {
            api.login().await?;
            let session = api.session().context("login left no session")?;
            info!(expires_at = %session.expires_at(), "gotcha");
        }

        NestCommand::Devices => {
            for device in api.list_devices().await? {
                info!(
                    serial_number = %device.serial_number,
                    device_type = ?device.device_type,
                    "device",
                );
            }
        }

        NestCommand::Snapshot { serial_number } => {
            let snapshot = api.get_snapshot(&serial_number).await?;
            info!(device_type = ?snapshot.device_type, "gotcha");
            println!("{}", serde_json::to_string_pretty(&snapshot.fields)?);
        }

        NestCommand::Poll => {
            let readings = Poller::new(api).refresh().await?;
            info!(n_devices = readings.len(), "cycle done");
            println!("{}", build_readings_table(&readings));
        }
    }

    Ok(())
}
