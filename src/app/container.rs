use std::sync::Arc;

use crate::adapters::toml_config::AppConfig;
use crate::adapters::{FfmpegBackend, FfprobeAdapter};
use crate::app::{inspect_interactor::InspectInteractor, process_interactor::ProcessInteractor};
use crate::domain::errors::DomainError;
use crate::planner::JobPlanner;
use crate::ports::{MediaBackend, ProbePort};

pub trait AppContainer: Send + Sync {
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
    fn process_interactor(&self) -> Arc<ProcessInteractor>;
}

pub struct DefaultAppContainer {
    inspect_interactor: Arc<InspectInteractor>,
    process_interactor: Arc<ProcessInteractor>,
}

impl DefaultAppContainer {
    /// Wire the ffprobe and ffmpeg adapters from configuration
    pub fn new(config: &AppConfig) -> Result<Self, DomainError> {
        let probe_port = Arc::new(FfprobeAdapter::new(&config.ffmpeg.ffprobe_path));
        let backend = FfmpegBackend::new(&config.ffmpeg, &config.output.container)?
            .with_prober(Arc::clone(&probe_port) as Arc<dyn ProbePort>);

        Ok(Self::with_ports(
            config,
            probe_port as Arc<dyn ProbePort>,
            Arc::new(backend) as Arc<dyn MediaBackend>,
        ))
    }

    /// Wire caller-supplied ports
    pub fn with_ports(
        config: &AppConfig,
        probe_port: Arc<dyn ProbePort>,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        let inspect_interactor = Arc::new(InspectInteractor::new(probe_port));

        let planner = JobPlanner::new(
            config.output.container.clone(),
            config.output.collision_policy,
        );
        let process_interactor = Arc::new(ProcessInteractor::new(
            backend,
            planner,
            config.engine_config(),
        ));

        Self {
            inspect_interactor,
            process_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }

    fn process_interactor(&self) -> Arc<ProcessInteractor> {
        Arc::clone(&self.process_interactor)
    }
}
