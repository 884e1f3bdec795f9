use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DeliveryAssignedEvent,
    EventHandler,
    EventProducer,
    Handler,
    ItemEscalatedEvent,
    ItemStatusChangedEvent,
    OrderPlacedEvent,
    PayoutStatusChangedEvent,
};

pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Declares the hook registry, the handler set and the producer set for every event type in one place, so that adding
/// an event cannot leave one of the three out of step.
macro_rules! event_hooks {
    ($($hook:ident => $producers:ident : $event:ty),+ $(,)?) => {
        #[derive(Default, Clone)]
        pub struct EventProducers {
            $(pub $producers: Vec<EventProducer<$event>>,)+
        }

        pub struct EventHandlers {
            $(pub $hook: Option<EventHandler<$event>>,)+
        }

        impl EventHandlers {
            pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
                Self { $($hook: hooks.$hook.map(|f| EventHandler::new(buffer_size, f)),)+ }
            }

            pub fn producers(&self) -> EventProducers {
                let mut result = EventProducers::default();
                $(
                    if let Some(handler) = &self.$hook {
                        result.$producers.push(handler.subscribe());
                    }
                )+
                result
            }

            pub async fn start_handlers(self) {
                $(
                    if let Some(handler) = self.$hook {
                        tokio::spawn(async move {
                            handler.start_handler().await;
                        });
                    }
                )+
            }
        }

        #[derive(Default, Clone)]
        pub struct EventHooks {
            $(pub $hook: Option<Handler<$event>>,)+
        }

        impl EventHooks {
            $(
                pub fn $hook<F>(&mut self, f: F) -> &mut Self
                where F: (Fn($event) -> HookFuture) + Send + Sync + 'static {
                    self.$hook = Some(Arc::new(f));
                    self
                }
            )+
        }
    };
}

event_hooks! {
    on_order_placed => order_placed_producer: OrderPlacedEvent,
    on_item_status_changed => item_status_producer: ItemStatusChangedEvent,
    on_item_escalated => item_escalated_producer: ItemEscalatedEvent,
    on_delivery_assigned => delivery_assigned_producer: DeliveryAssignedEvent,
    on_payout_status_changed => payout_status_producer: PayoutStatusChangedEvent,
}

impl EventProducers {
    pub async fn publish_order_placed(&self, event: OrderPlacedEvent) {
        for producer in &self.order_placed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_item_status_changed(&self, event: ItemStatusChangedEvent) {
        for producer in &self.item_status_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_item_escalated(&self, event: ItemEscalatedEvent) {
        for producer in &self.item_escalated_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_delivery_assigned(&self, event: DeliveryAssignedEvent) {
        for producer in &self.delivery_assigned_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_payout_status_changed(&self, event: PayoutStatusChangedEvent) {
        for producer in &self.payout_status_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}
