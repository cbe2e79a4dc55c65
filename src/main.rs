mod entry;
mod logger;
mod shutdown;
mod shutdown_handlers;

use grinder_bridge::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
