//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize logging, trace settings and the metrics recorder in order
//! - Bind the probe listener and spawn the server
//! - Hand the host explicit handles to the registry and readiness flag
//!
//! Any startup error is fatal to the caller. Readiness starts in
//! `InProgress`; the host marks it ready once its own startup is done.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{ConfigError, TechConfig};
use crate::health::{LivenessRegistry, Readiness};
use crate::http::TechServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::observability::tracing::{TraceSettings, TracerError};
use crate::observability::{logging, metrics};

/// Error type for startup and teardown.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logger: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("tracer: {0}")]
    Tracer(#[from] TracerError),

    #[error("metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("probe server: {0}")]
    Server(#[from] std::io::Error),

    #[error("probe server task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Startup options that are not part of the config file.
#[derive(Debug, Clone)]
pub struct TechOptions {
    /// Command name attached to request spans.
    pub command: String,

    /// Address the probe server binds to; the port comes from config.
    pub host: IpAddr,

    /// Install the global subscriber and metrics recorder. Disable when the
    /// host (or a test harness) owns them.
    pub install_globals: bool,
}

impl Default for TechOptions {
    fn default() -> Self {
        Self {
            command: "serve".to_string(),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            install_globals: true,
        }
    }
}

/// A running observability stack.
pub struct Tech {
    config: TechConfig,
    registry: Arc<LivenessRegistry>,
    readiness: Arc<Readiness>,
    trace: Arc<TraceSettings>,
    local_addr: SocketAddr,
    shutdown: Shutdown,
    server: JoinHandle<Result<(), std::io::Error>>,
}

impl Tech {
    /// Bring up logging, tracing, metrics and the probe server.
    pub async fn start(config: TechConfig, options: TechOptions) -> Result<Self, StartupError> {
        let addr = SocketAddr::new(options.host, config.http.port);
        Self::init_globals(&config, &options)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;
        Self::serve(config, options, listener).await
    }

    /// Like [`Tech::start`], on an already bound listener.
    pub async fn start_with_listener(
        config: TechConfig,
        options: TechOptions,
        listener: TcpListener,
    ) -> Result<Self, StartupError> {
        Self::init_globals(&config, &options)?;
        Self::serve(config, options, listener).await
    }

    fn init_globals(config: &TechConfig, options: &TechOptions) -> Result<(), StartupError> {
        if options.install_globals {
            logging::init_logging(&config.service, &config.logger)?;
        }
        Ok(())
    }

    async fn serve(
        config: TechConfig,
        options: TechOptions,
        listener: TcpListener,
    ) -> Result<Self, StartupError> {
        let trace = Arc::new(TraceSettings::new(
            &config.service,
            &config.tracer,
            options.command.clone(),
        )?);

        let handle = if options.install_globals {
            metrics::install_recorder()?
        } else {
            metrics::detached_handle()
        };

        let registry = Arc::new(LivenessRegistry::new());
        let readiness = Arc::new(Readiness::new());
        metrics::record_readiness(readiness.get());

        let local_addr = listener.local_addr()?;
        let server = TechServer::new(
            config.http.clone(),
            registry.clone(),
            readiness.clone(),
            handle,
            trace.clone(),
        );

        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.subscribe();
        let server = tokio::spawn(server.run(listener, server_shutdown));

        tracing::info!(
            service = %config.service.name,
            address = %local_addr,
            "Observability stack started"
        );

        Ok(Self {
            config,
            registry,
            readiness,
            trace,
            local_addr,
            shutdown,
            server,
        })
    }

    pub fn config(&self) -> &TechConfig {
        &self.config
    }

    /// Registry the host adds its liveness checks to.
    pub fn registry(&self) -> &Arc<LivenessRegistry> {
        &self.registry
    }

    /// Readiness flag the host sets.
    pub fn readiness(&self) -> &Arc<Readiness> {
        &self.readiness
    }

    pub fn trace_settings(&self) -> &Arc<TraceSettings> {
        &self.trace
    }

    /// Address the probe server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shutdown coordinator, for host tasks that should stop with the server.
    pub fn shutdown_handle(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Stop the probe server and wait for it to drain.
    pub async fn shutdown(self) -> Result<(), StartupError> {
        self.readiness.mark_in_progress();
        self.shutdown.trigger();
        self.server.await??;
        Ok(())
    }
}

impl std::fmt::Debug for Tech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tech")
            .field("service", &self.config.service.name)
            .field("local_addr", &self.local_addr)
            .field("registry", &self.registry)
            .field("readiness", &self.readiness.get())
            .finish()
    }
}
