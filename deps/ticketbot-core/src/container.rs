use std::sync::Arc;

use crate::{event::ComponentEventDispatcher, Component};

pub type Components = Vec<Arc<dyn Component>>;

/// # The component container
///
/// The component container stores components to dispatch them into the client.
#[derive(Clone, Default)]
pub struct ComponentContainer(Components);

impl ComponentContainer {
    pub fn new() -> ComponentContainer {
        ComponentContainer(Vec::new())
    }
    /// Create a [`ComponentEventDispatcher`] from the components in the container.
    /// Note that if new components are added to the container afterward, the dispatcher will not include them.
    pub fn get_event_dispatcher(&self) -> ComponentEventDispatcher {
        ComponentEventDispatcher::new(self.0.clone())
    }
    /// Add a component to the container.
    /// The component is embedded in an Arc pointer to be async compatible.
    pub fn add_component<T: 'static + Component>(&mut self, comp: T) -> Arc<T> {
        let arc = Arc::new(comp);
        self.0.push(arc.clone());
        arc
    }
    /// Start every component, in registration order.
    ///
    /// Stops at the first component that fails to start.
    pub async fn start_all(&self) -> Result<(), String> {
        for comp in &self.0 {
            log::info!(target: "ticketbot", "Starting component {}", comp.name());
            comp.start().await.map_err(|e| format!("{}: {}", comp.name(), e))?;
        }
        Ok(())
    }
    /// Stop every component, in reverse registration order.
    pub async fn stop_all(&self) {
        for comp in self.0.iter().rev() {
            log::info!(target: "ticketbot", "Stopping component {}", comp.name());
            comp.stop().await;
        }
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl AsRef<Components> for ComponentContainer {
    fn as_ref(&self) -> &Components {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BotEvent;
    use serenity::{async_trait, model::id::UserId};
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Component for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn start(&self) -> Result<(), String> {
            self.journal.lock().unwrap().push(format!("start {}", self.name));
            Ok(())
        }
        async fn stop(&self) {
            self.journal.lock().unwrap().push(format!("stop {}", self.name));
        }
        async fn event(&self, _: &BotEvent) {
            self.journal.lock().unwrap().push(format!("event {}", self.name));
        }
    }

    #[tokio::test]
    async fn lifecycle_order() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let mut container = ComponentContainer::new();
        container.add_component(Recorder { name: "a", journal: journal.clone() });
        container.add_component(Recorder { name: "b", journal: journal.clone() });
        container.start_all().await.unwrap();
        container
            .get_event_dispatcher()
            .dispatch(&BotEvent::Ready { user_id: UserId(1) })
            .await;
        container.stop_all().await;
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["start a", "start b", "event a", "event b", "stop b", "stop a"]
        );
    }
}
