// Copyright 2023 System76 <info@system76.com>
// SPDX-License-Identifier: GPL-3.0-only

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> cosmic::iced::Result {
    init_logging();

    tracing::info!("Starting cosmic-applet-age with version {VERSION}");

    cosmic_applet_age::run()
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    // Journald is the durable sink; stderr stays for interactive runs
    match tracing_journald::layer() {
        Ok(journald) => registry.with(journald).init(),
        Err(err) => {
            registry.init();
            tracing::warn!(?err, "Journald unavailable; logging to stderr only");
        }
    }

    let _ = tracing_log::LogTracer::init();
}
