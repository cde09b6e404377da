pub mod nest;
pub mod watch;

use clap::{Parser, Subcommand};

pub use self::{nest::NestArgs, watch::WatchArgs};
use crate::{api::shine, prelude::*};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: poll the cloud on an interval and render the readings.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),

    /// Development tools.
    #[clap(name = "nest")]
    Nest(Box<NestArgs>),
}

#[derive(Parser)]
pub struct ShineArgs {
    /// Shine account email.
    #[clap(long, env = "SHINE_EMAIL")]
    pub email: String,

    /// Shine account password. Leaves the process RSA-encrypted only.
    #[clap(long, env = "SHINE_PASSWORD")]
    pub password: String,

    /// Override the login page URL (mirrors, mock servers).
    #[clap(long, env = "SHINE_LOGIN_PAGE_URL", default_value = shine::LOGIN_PAGE_URL)]
    pub login_page_url: String,

    /// Override the API base URL.
    #[clap(long, env = "SHINE_API_BASE_URL", default_value = shine::API_BASE_URL)]
    pub api_base_url: String,
}

impl ShineArgs {
    pub fn connect(self) -> Result<shine::Api> {
        shine::Api::new(self.email, self.password, self.login_page_url, self.api_base_url)
    }
}
