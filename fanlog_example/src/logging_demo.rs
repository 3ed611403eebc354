//! Sample log calls exercising every level of a registry

use fanlog::config::{HookSection, SinkSection};
use fanlog::{DispatchError, Level, LoggerConfig, Registry, Tags};

/// Console-only configuration used when no file is given
pub fn default_config() -> LoggerConfig {
    let mut tags = Tags::new();
    tags.insert("service".to_string(), "fanlog-demo".to_string());

    LoggerConfig {
        level: "debug".to_string(),
        colored: true,
        tags,
        hook: Some(HookSection::default()),
        sinks: vec![SinkSection {
            stream: "stdout".to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Generate one round of sample logs at every level
pub fn emit_samples(registry: &Registry, round: u32) -> Result<(), DispatchError> {
    registry.trace(["filtered unless the threshold is trace"])?;
    registry.debug([format!("round {}", round), "starting".to_string()])?;
    fanlog::info!(registry, "frame rendered in {:.2}ms", 16.67)?;
    fanlog::warning!(registry, "memory usage is getting high: {}%", 85)?;

    let mut tags = (*registry.tags()).clone();
    tags.insert("round".to_string(), round.to_string());
    registry.set_tags(tags);

    registry.error(["simulated", "asset", "load", "failure"])?;
    fanlog::critical!(registry, "simulated outage in {}", "eu-west")?;

    for level in Level::ALL {
        if registry.sink_count(level) == 0 {
            tracing::debug!(%level, "No sink registered, calls at this level are dropped");
        }
    }
    Ok(())
}

/// Print statistics about the hook pool
pub fn print_hook_statistics(registry: &Registry) {
    match registry.hook_stats() {
        Some(stats) => {
            println!("\n=== Hook Pool Statistics ===");
            println!("Submitted: {}", stats.submitted);
            println!("Dropped (overflow): {}", stats.dropped);
            println!("Failed: {}", stats.failed);
            println!("Panicked: {}", stats.panicked);
            println!("Still queued: {}", stats.queued);
            println!("Live workers: {}", stats.workers);
        }
        None => println!("\nHook pool never started"),
    }
}
