//! Collaborators the simulation consumes but does not implement

pub mod landscape;
pub mod notify;
pub mod paths;

pub use landscape::{HeightField, Landscape};
pub use notify::{
    DebugLines, DrawSink, LogNotifications, Notification, NotificationSink, RecordingNotifications,
};
pub use paths::{Brush, PathService, StraightLinePaths};
