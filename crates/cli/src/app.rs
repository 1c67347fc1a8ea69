//! Builds the engine from configuration: store, sources, sink, commands.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    anyhow::{Context, Result, bail},
    secrecy::{ExposeSecret, Secret},
    tidings_channels::{ConsoleSink, DeliverySink, WebhookSink},
    tidings_config::{DeliveryConfig, DeliveryKind, TidingsConfig},
    tidings_cron::DailySchedule,
    tidings_streams::{
        CommandService, DefaultLoader, FileStore, ProcessLoader, SourceRegistry, StreamStore,
    },
    tracing::{debug, warn},
};

pub struct App {
    pub config: TidingsConfig,
    pub config_path: Option<PathBuf>,
    pub store: Arc<FileStore>,
    pub loader: Arc<DefaultLoader>,
    pub service: Arc<CommandService>,
}

/// Load the config from `explicit`, or discover it. An explicit file that
/// fails to load is an error; a discovered one falls back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<(TidingsConfig, Option<PathBuf>)> {
    match explicit {
        Some(path) => {
            let config = tidings_config::load_config(path)?;
            Ok((config, Some(path.to_path_buf())))
        },
        None => Ok(tidings_config::discover_and_load()),
    }
}

impl App {
    pub fn from_config(config: TidingsConfig, config_path: Option<PathBuf>) -> Result<Self> {
        let streams_path = tidings_config::resolve_streams_path(&config, config_path.as_deref());
        debug!(path = %streams_path.display(), "using stream store");
        let store = Arc::new(FileStore::new(streams_path));

        let loader = Arc::new(DefaultLoader::new(
            SourceRegistry::new(),
            ProcessLoader::new(Duration::from_secs(config.sources.timeout_secs.max(1))),
        ));
        let sink = build_sink(&config.delivery)?;
        let store_dyn: Arc<dyn StreamStore> = store.clone();
        let service = Arc::new(CommandService::new(store_dyn, loader.clone(), sink));

        Ok(Self {
            config,
            config_path,
            store,
            loader,
            service,
        })
    }

    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, path) = load_config(explicit)?;
        Self::from_config(config, path)
    }

    pub fn daily_schedule(&self) -> Result<DailySchedule> {
        daily_schedule(&self.config)
    }
}

pub fn daily_schedule(config: &TidingsConfig) -> Result<DailySchedule> {
    let time = config.schedule.parsed_time()?;
    let tz = config.schedule.parsed_timezone()?;
    Ok(DailySchedule::new(time, tz))
}

/// Unset `${VAR}` placeholders survive substitution verbatim; treat them as
/// absent.
fn configured(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty() && !value.starts_with("${")).then_some(value)
}

pub fn build_sink(config: &DeliveryConfig) -> Result<Arc<dyn DeliverySink>> {
    match config.kind {
        DeliveryKind::Console => Ok(Arc::new(ConsoleSink::stdout())),
        DeliveryKind::Webhook => {
            let Some(url) = config.webhook_url.as_deref().and_then(configured) else {
                bail!("delivery.kind = \"webhook\" requires delivery.webhook_url");
            };
            let token = config
                .token
                .as_ref()
                .and_then(|t| configured(t.expose_secret()).map(str::to_string));
            if config.token.is_some() && token.is_none() {
                warn!("delivery.token is set but empty or unresolved; sending without auth");
            }
            let sink = WebhookSink::new(
                url,
                token.map(Secret::new),
                Duration::from_secs(config.timeout_secs.max(1)),
            )
            .context("failed to create webhook sink")?;
            Ok(Arc::new(sink))
        },
    }
}
