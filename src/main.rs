#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod prelude;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command, nest},
    prelude::*,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    match Args::parse().command {
        Command::Watch(args) => args.run().await?,
        Command::Nest(args) => nest::run(*args).await?,
    }

    info!("done!");
    Ok(())
}
