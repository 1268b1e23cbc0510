//! Wiring of the application.
//! The collaborators and the components are built here, then handed to the serenity client.

use std::sync::Arc;

use sea_orm::DbConn;
use serenity::{prelude::GatewayIntents, Client};
use ticketbot_core::ComponentContainer;

use crate::{
    components as cmp,
    config::Config,
    error::{Error, Result},
    log_error, log_info, log_warn,
    platform::{Platform, SerenityPlatform},
    relay::{RedisPubSub, Relay},
    settings::{RedisBackend, Settings},
};

/// The bot.
///
/// Components are created once and placed in a [ComponentContainer]. The container
/// gives the client a [ComponentEventDispatcher] which forwards the Discord events
/// to every component.
///
/// [ComponentEventDispatcher]: ticketbot_core::event::ComponentEventDispatcher
pub struct Bot {
    client: Client,
    container: ComponentContainer,
    tickets: Arc<cmp::Tickets>,
}

impl Bot {
    pub async fn new(config: &Config, db: DbConn) -> Result<Bot> {
        let backend = RedisBackend::connect(&config.redis_url).await?;
        let settings = Arc::new(Settings::new(backend, &config.redis_prefix));

        // Tickets keep working while the relay is down, frames wait for it.
        let relay = Relay::new();
        {
            let relay = relay.clone();
            let url = config.redis_url.clone();
            tokio::spawn(async move {
                match RedisPubSub::connect(&url).await {
                    Ok(pubsub) => {
                        relay.attach(Arc::new(pubsub));
                        log_info!("Relay connected");
                    }
                    Err(e) => log_error!("Relay unavailable: {}", e),
                }
            });
        }

        let platform: Arc<dyn Platform> = Arc::new(SerenityPlatform::connect(&config.token).await?);
        let tickets = Arc::new(cmp::Tickets::new(db.clone(), platform.clone(), settings.clone(), relay.clone()));

        let mut container = ComponentContainer::new();
        let panels = container.add_component(cmp::Panels::new(
            db.clone(),
            platform.clone(),
            tickets.clone(),
            config.panel_refresh_period(),
        ));
        container.add_component(cmp::Transcript::new(db.clone(), platform.clone(), settings.clone(), relay));
        container.add_component(cmp::Commands::new(
            &config.prefix.to_string(),
            db,
            platform,
            settings,
            tickets.clone(),
            panels,
        ));

        let client = Client::builder(
            &config.token,
            GatewayIntents::non_privileged() | GatewayIntents::MESSAGE_CONTENT,
        )
        .raw_event_handler(container.get_event_dispatcher())
        .await?;
        Ok(Bot {
            client,
            container,
            tickets,
        })
    }

    /// Start the components and run the client until Ctrl-C.
    pub async fn start(&mut self) -> Result<()> {
        self.container.start_all().await.map_err(Error::Config)?;
        let result = tokio::select! {
            res = self.client.start() => res.map_err(Error::from),
            _ = tokio::signal::ctrl_c() => {
                log_info!("Shutting down");
                Ok(())
            }
        };
        self.container.stop_all().await;
        self.tickets.shutdown();
        self.client.shard_manager.lock().await.shutdown_all().await;
        if let Err(e) = &result {
            log_warn!("Client stopped: {}", e);
        }
        result
    }
}
