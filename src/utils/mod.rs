//! Utility functions for the extraction pipeline.
//!
//! This module provides image loading helpers, diagnostic visualization, and
//! logging setup.

pub mod image;
pub mod visualization;

pub use image::{dynamic_to_rgb, load_image, save_image};
pub use visualization::{annotate_extraction, draw_oriented_rect, render_class_map};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and
/// formatting layer. It's typically called at the start of an application to
/// enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
