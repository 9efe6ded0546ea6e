pub mod gate;
pub mod sender;
pub mod template;

pub use gate::NotificationGate;
pub use sender::{LogSender, MessageSender, WebhookSender};
pub use template::{HandlebarsRenderer, TemplateRenderer};
