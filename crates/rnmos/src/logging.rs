//! Log forwarding
//!
//! A `tracing` layer that maps events onto the numeric NMOS severity
//! levels and delivers them to the host's log callback. The event target
//! doubles as the category list.

use std::fmt::Write;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::config::{log_levels, LogHandler};

/// Map a tracing level onto the NMOS numeric severity scale.
pub fn numeric_level(level: &Level) -> i32 {
    match *level {
        Level::ERROR => log_levels::ERROR,
        Level::WARN => log_levels::WARNING,
        Level::INFO => log_levels::INFO,
        Level::DEBUG => log_levels::VERBOSE,
        Level::TRACE => log_levels::DEVEL,
    }
}

/// Forwards events to the host log callback.
pub struct CallbackLayer {
    handler: LogHandler,
    min_level: i32,
    categories: Vec<String>,
}

impl CallbackLayer {
    pub fn new(handler: LogHandler, min_level: i32, categories: Vec<String>) -> Self {
        Self {
            handler,
            min_level,
            categories,
        }
    }

    fn pertinent(&self, target: &str, level: i32) -> bool {
        if level < self.min_level {
            return false;
        }
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|category| target.contains(category.as_str()))
    }
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            let _ = write!(self.message, "{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            let _ = write!(self.message, "{}={}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CallbackLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = numeric_level(metadata.level());
        let target = metadata.target();
        if !self.pertinent(target, level) {
            return;
        }
        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);
        (self.handler)(target, level, &visitor.message);
    }
}
