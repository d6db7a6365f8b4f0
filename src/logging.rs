use log::LevelFilter;
use tauri_plugin_log::{Target, TargetKind};

/// Log plugin: stdout plus the platform log directory.
pub fn get_builder() -> tauri_plugin_log::Builder {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    tauri_plugin_log::Builder::new()
        .clear_targets()
        .target(Target::new(TargetKind::Stdout))
        .target(Target::new(TargetKind::LogDir { file_name: None }))
        .level(level)
        .format(|out, message, record| {
            // 2025-12-29 10:30:45.123 INFO [clipboard.rs:84] message
            out.finish(format_args!(
                "{} {} [{}:{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                message
            ))
        })
}
