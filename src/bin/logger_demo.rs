use ballot_auth::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    // No effect when RUST_LOG is set.
    let config = LogConfig {
        filter: "ballot_auth=trace,debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!(target: "ballot_auth", uid = "u1", "application trace log");
    debug!("application debug log");
    info!("application info log");

    Ok(())
}
