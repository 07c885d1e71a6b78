use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log to stderr so stdout carries only the exported rows. `RUST_LOG`
/// overrides the level chosen here.
pub fn init_logger(json_mode: bool, debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("e2e_topology=debug,e2e_topo=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    if json_mode {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}
