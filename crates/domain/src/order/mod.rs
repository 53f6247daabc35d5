//! Order aggregate, status state machine, and lifecycle service.

mod commands;
mod events;
mod model;
mod payment;
mod service;
mod status;

pub use commands::{NewOrder, OrderedLine};
pub use events::{EventPublisher, OrderCreatedEvent, OrderedStock, TracingPublisher};
pub use model::{LineItem, Order, OrderWithClient, StatusChange};
pub use payment::PaymentMethod;
pub use service::OrderService;
pub use status::OrderStatus;
