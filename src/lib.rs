pub mod cache;
pub mod exec;
pub mod experiments;
pub mod feedback;
pub mod gui;
pub mod launcher;
pub mod locator;
pub mod logging;
pub mod planner;
pub mod recognizer;
pub mod session;
pub mod settings;
pub mod shortcut;
pub mod status_log;
