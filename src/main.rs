mod log;
mod bot;
mod components;
mod config;
mod db;
mod error;
mod platform;
mod relay;
mod settings;
#[cfg(test)]
mod testing;

trait ResultLog {
    type OkType;
    fn expect_log(self, msg: &str) -> Self::OkType;
}
impl<T, E: std::fmt::Display> ResultLog for Result<T, E> {
    type OkType = T;
    fn expect_log(self, msg: &str) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                log_error!("{}: {}", msg, e);
                eprintln!("{}: {}", msg, e);
                std::process::exit(1)
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| "./config.json".to_string());
    let config = config::Config::load(&path).expect_log("Could not load the configuration file");
    log::init(log::parse_level(&config.log_level)).expect_log("Could not set the logger");
    let db = db::start_db(&config.database_url).await.expect_log("Could not open the database");
    let mut bot = bot::Bot::new(&config, db).await.expect_log("Could not build the bot");
    bot.start().await.expect_log("Client stopped");
}
