//! Change alerts
//!
//! [`Notifier`] sends one message per recipient through a [`MessageGateway`],
//! sequentially and paced. Delivery is attempted once; there is no retry and no
//! at-least-once guarantee. A crash between recording a transition and
//! finishing the fan-out loses the remaining alerts for that transition.

pub mod gateway;
pub mod notifier;

pub use gateway::{GatewayError, LogGateway, MessageGateway, TwilioCredentials, TwilioGateway};
pub use notifier::{message_body, DeliveryPolicy, Notifier, NotifyError, NotifyReport};
