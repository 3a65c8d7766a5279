mod args;
mod config;
mod distributed;
mod entry;
mod error;
mod http;
mod run;
mod server;
mod shutdown;
mod shutdown_handlers;
mod stats;
mod system;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
