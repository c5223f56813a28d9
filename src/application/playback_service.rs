// Playback service - runs the engine on a single task behind a command channel
use crate::application::enrichment_service::EnrichmentService;
use crate::application::frame_sink::TrajectoryView;
use crate::application::playback_engine::{PlaybackEngine, PlaybackStatus};
use crate::domain::alert::{AlertState, EnrichmentResult, LookupRequest};
use crate::domain::tier::TierFilter;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Everything that can touch engine state arrives through this enum, so
/// control requests, ticks and lookup results never run concurrently.
#[derive(Debug)]
pub enum PlaybackCommand {
    Play(oneshot::Sender<PlaybackStatus>),
    Pause(oneshot::Sender<PlaybackStatus>),
    Reset(oneshot::Sender<PlaybackStatus>),
    Seek(usize, oneshot::Sender<PlaybackStatus>),
    SetFilter(TierFilter, oneshot::Sender<PlaybackStatus>),
    Status(oneshot::Sender<PlaybackStatus>),
    Alerts(oneshot::Sender<AlertState>),
    Trajectories(oneshot::Sender<Vec<TrajectoryView>>),
    Tick { generation: u64 },
    Enriched(EnrichmentResult),
    Shutdown,
}

pub type CommandSender = mpsc::UnboundedSender<PlaybackCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<PlaybackCommand>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("playback engine has stopped")]
    Stopped,
}

/// Cloneable handle to the running engine.
#[derive(Clone)]
pub struct PlaybackService {
    commands: CommandSender,
}

impl PlaybackService {
    /// The channel is created before the engine so that the scheduler can
    /// feed ticks into it.
    pub fn channel() -> (CommandSender, CommandReceiver) {
        mpsc::unbounded_channel()
    }

    pub fn spawn(
        engine: PlaybackEngine,
        enrichment: EnrichmentService,
        commands: CommandSender,
        inbox: CommandReceiver,
    ) -> (Self, JoinHandle<()>) {
        let task = tokio::spawn(run(engine, enrichment, commands.clone(), inbox));
        (Self { commands }, task)
    }

    pub async fn play(&self) -> Result<PlaybackStatus, ServiceError> {
        self.request(PlaybackCommand::Play).await
    }

    pub async fn pause(&self) -> Result<PlaybackStatus, ServiceError> {
        self.request(PlaybackCommand::Pause).await
    }

    pub async fn reset(&self) -> Result<PlaybackStatus, ServiceError> {
        self.request(PlaybackCommand::Reset).await
    }

    pub async fn seek(&self, position: usize) -> Result<PlaybackStatus, ServiceError> {
        self.request(|reply| PlaybackCommand::Seek(position, reply)).await
    }

    pub async fn set_filter(&self, filter: TierFilter) -> Result<PlaybackStatus, ServiceError> {
        self.request(|reply| PlaybackCommand::SetFilter(filter, reply)).await
    }

    pub async fn status(&self) -> Result<PlaybackStatus, ServiceError> {
        self.request(PlaybackCommand::Status).await
    }

    pub async fn alerts(&self) -> Result<AlertState, ServiceError> {
        self.request(PlaybackCommand::Alerts).await
    }

    pub async fn trajectories(&self) -> Result<Vec<TrajectoryView>, ServiceError> {
        self.request(PlaybackCommand::Trajectories).await
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(PlaybackCommand::Shutdown);
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> PlaybackCommand,
    ) -> Result<T, ServiceError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| ServiceError::Stopped)?;
        response.await.map_err(|_| ServiceError::Stopped)
    }
}

async fn run(
    mut engine: PlaybackEngine,
    enrichment: EnrichmentService,
    commands: CommandSender,
    mut inbox: CommandReceiver,
) {
    let dispatch = |lookups: Vec<LookupRequest>| {
        if lookups.is_empty() {
            return;
        }
        tracing::debug!(count = lookups.len(), "scheduling place lookups");
        let commands = commands.clone();
        enrichment.dispatch(lookups, move |result| {
            let _ = commands.send(PlaybackCommand::Enriched(result));
        });
    };

    dispatch(engine.start());
    tracing::info!(length = engine.status().length, "playback started");

    while let Some(command) = inbox.recv().await {
        match command {
            PlaybackCommand::Play(reply) => {
                engine.play();
                let _ = reply.send(engine.status());
            }
            PlaybackCommand::Pause(reply) => {
                engine.pause();
                let _ = reply.send(engine.status());
            }
            PlaybackCommand::Reset(reply) => {
                dispatch(engine.reset());
                let _ = reply.send(engine.status());
            }
            PlaybackCommand::Seek(position, reply) => {
                dispatch(engine.seek(position));
                let _ = reply.send(engine.status());
            }
            PlaybackCommand::SetFilter(filter, reply) => {
                dispatch(engine.set_filter(filter));
                let _ = reply.send(engine.status());
            }
            PlaybackCommand::Status(reply) => {
                let _ = reply.send(engine.status());
            }
            PlaybackCommand::Alerts(reply) => {
                let _ = reply.send(engine.alerts().clone());
            }
            PlaybackCommand::Trajectories(reply) => {
                let _ = reply.send(engine.trajectories());
            }
            PlaybackCommand::Tick { generation } => dispatch(engine.tick(generation)),
            PlaybackCommand::Enriched(result) => engine.apply_enrichment(result),
            PlaybackCommand::Shutdown => break,
        }
    }

    tracing::info!("playback stopped");
}
