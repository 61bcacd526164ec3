use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

static PASS_LOG_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Target whose events are mirrored into the rolling pass log.
pub const PASS_TARGET: &str = "fillkit::pass";

/// Where and how often the pass log rolls over, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogSettings {
    pub dir: PathBuf,
    pub prefix: String,
    pub rotation: Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

impl Rotation {
    pub fn from_slug(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        }
    }
}

impl FileLogSettings {
    /// `FILLKIT_LOG_DIR` enables the file layer; `FILLKIT_LOG_PREFIX` and
    /// `FILLKIT_LOG_ROTATION` tune it.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let dir = lookup("FILLKIT_LOG_DIR").filter(|v| !v.trim().is_empty())?;
        let prefix = lookup("FILLKIT_LOG_PREFIX").unwrap_or_else(|| "fillkit-pass".into());
        let rotation = lookup("FILLKIT_LOG_ROTATION")
            .map(|v| Rotation::from_slug(&v))
            .unwrap_or(Rotation::Daily);
        Some(Self {
            dir: PathBuf::from(dir),
            prefix,
            rotation,
        })
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// leave the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr).with_filter(filter));

    let Some(settings) = FileLogSettings::from_env() else {
        let _ = registry.try_init();
        return;
    };
    if std::fs::create_dir_all(&settings.dir).is_err() {
        tracing::warn!(directory = %settings.dir.display(), "failed to create log directory");
    }
    let writer = match settings.rotation {
        Rotation::Hourly => tracing_appender::rolling::hourly(&settings.dir, &settings.prefix),
        Rotation::Minutely => tracing_appender::rolling::minutely(&settings.dir, &settings.prefix),
        Rotation::Daily => tracing_appender::rolling::daily(&settings.dir, &settings.prefix),
    };
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let _ = PASS_LOG_GUARD.set(guard);
    let targets = Targets::new().with_target(PASS_TARGET, tracing::Level::INFO);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(nb)
        .with_filter(targets);
    let _ = registry.with(file_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn file_layer_is_off_without_a_directory() {
        assert_eq!(FileLogSettings::from_lookup(lookup(&[])), None);
        assert_eq!(FileLogSettings::from_lookup(lookup(&[("FILLKIT_LOG_DIR", "  ")])), None);
    }

    #[test]
    fn settings_read_prefix_and_rotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().to_string_lossy().to_string();
        let settings = FileLogSettings::from_lookup(lookup(&[
            ("FILLKIT_LOG_DIR", path.as_str()),
            ("FILLKIT_LOG_ROTATION", "Hourly"),
        ]))
        .expect("settings");
        assert_eq!(settings.dir, dir.path());
        assert_eq!(settings.prefix, "fillkit-pass");
        assert_eq!(settings.rotation, Rotation::Hourly);
        assert_eq!(Rotation::from_slug("weekly"), Rotation::Daily);
    }

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
        tracing::info!(target: PASS_TARGET, "still logging");
    }
}
