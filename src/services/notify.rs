//! Fire-and-forget presentation sinks
//!
//! The simulation posts floating messages ("+10" over a townhall) and debug
//! lines. Where they end up is up to the host.

use crate::core::types::Color;
use glam::Vec3;
use std::cell::RefCell;
use std::rc::Rc;

/// A floating message anchored in the world
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub position: Vec3,
    pub color: Color,
}

pub trait NotificationSink {
    fn show(&mut self, notification: Notification);
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifications;

impl NotificationSink for LogNotifications {
    fn show(&mut self, notification: Notification) {
        tracing::info!(
            "{} at ({:.1}, {:.1})",
            notification.message,
            notification.position.x,
            notification.position.y
        );
    }
}

/// Keeps every notification; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifications {
    shown: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.shown.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.shown.borrow().iter().map(|n| n.message.clone()).collect()
    }
}

impl NotificationSink for RecordingNotifications {
    fn show(&mut self, notification: Notification) {
        self.shown.borrow_mut().push(notification);
    }
}

/// Receiver of debug geometry from `State::draw`
pub trait DrawSink {
    fn line(&mut self, from: Vec3, to: Vec3, color: Color);
}

/// Collects debug lines
#[derive(Debug, Clone, Default)]
pub struct DebugLines {
    pub lines: Vec<(Vec3, Vec3, Color)>,
}

impl DrawSink for DebugLines {
    fn line(&mut self, from: Vec3, to: Vec3, color: Color) {
        self.lines.push((from, to, color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_clones_share_storage() {
        let recorder = RecordingNotifications::new();
        let mut sink: Box<dyn NotificationSink> = Box::new(recorder.clone());
        sink.show(Notification {
            message: "+10".into(),
            position: Vec3::ZERO,
            color: Color::GOLD,
        });
        assert_eq!(recorder.messages(), vec!["+10".to_string()]);
        assert_eq!(recorder.shown()[0].color, Color::GOLD);
    }
}
