//! User-visible notifications.

use tracing::error;

/// Surface for messages the user must see, such as a lost connection.
pub trait Notifier: Send {
    fn alert(&self, message: &str);
}

/// Writes alerts to stderr and the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

fn console_line(message: &str) -> String {
    format!("Error: {}", message)
}

impl Notifier for ConsoleNotifier {
    fn alert(&self, message: &str) {
        error!("{}", message);
        eprintln!("{}", console_line(message));
    }
}
