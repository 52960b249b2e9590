//! One viewing session: connection, scene, agents and playback.

use crate::commands::ControlCommand;
use crate::config::ClientConfig;
use crate::exporter::{RecordedFrame, SessionRecording};
use crate::notify::Notifier;
use interviz_core::map_builder::ground_plane;
use interviz_core::{
    decode_server_message, Camera, ClientMessage, FramePayload, MapMeshBuilder, MapMeshes, MapPayload,
    Playback, SceneEnvironment, SceneError, SceneGraph, ServerMessage, VisibleAgentSet,
};
use interviz_env::{EnvError, MessageTransport, SessionId, TransportEvent, VizContext};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Events buffered between the transport reader and the session loop.
const INBOUND_CAPACITY: usize = 256;

/// How a session ended, when it did not end normally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("lost connection to server")]
    ConnectionLost,

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub frames_applied: u64,
    /// Frames that arrived while paused
    pub frames_discarded: u64,
    pub requests_sent: u64,
    pub ticks: u64,
    /// Agents on screen when the session ended
    pub visible_agents: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Client session.
///
/// The session is the only owner of the scene, the visible agent set and
/// the playback state; everything reaches it through [`ClientSession::run`].
pub struct ClientSession<T, S, C>
where
    T: MessageTransport,
    S: SceneGraph,
    C: VizContext,
{
    id: SessionId,
    config: ClientConfig,
    ctx: Arc<C>,
    transport: Arc<T>,
    scene: S,
    camera: Camera,
    map_builder: MapMeshBuilder,
    map: Option<MapMeshes>,
    agents: VisibleAgentSet,
    playback: Playback,
    notifier: Box<dyn Notifier>,
    recording: Option<SessionRecording>,
    stats: SessionSummary,
}

impl<T, S, C> ClientSession<T, S, C>
where
    T: MessageTransport,
    S: SceneGraph,
    C: VizContext,
{
    /// Prepares the scene (environment, ground plane, camera) for a new session.
    pub fn new(
        config: ClientConfig,
        ctx: Arc<C>,
        transport: Arc<T>,
        mut scene: S,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, SessionError> {
        scene.set_environment(&SceneEnvironment::default())?;
        scene.add(ground_plane())?;

        let mut camera = Camera::default();
        camera.resize(config.viewport.0, config.viewport.1);

        let mut playback = Playback::new(config.request_cadence, config.start_index);
        if config.start_playing {
            playback.play();
        }

        let id = SessionId::new();
        let recording = config
            .record_path
            .as_ref()
            .map(|_| SessionRecording::new(&id.as_uuid().to_string(), &config.endpoint));

        Ok(Self {
            id,
            config,
            ctx,
            transport,
            scene,
            camera,
            map_builder: MapMeshBuilder::new(),
            map: None,
            agents: VisibleAgentSet::new(),
            playback,
            notifier,
            recording,
            stats: SessionSummary { session_id: id, ..Default::default() },
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn agents(&self) -> &VisibleAgentSet {
        &self.agents
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn map(&self) -> Option<&MapMeshes> {
        self.map.as_ref()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            visible_agents: self.agents.len(),
            ..self.stats.clone()
        }
    }

    /// Runs the session until the server closes, the connection fails, or
    /// a `Quit` command arrives.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<ControlCommand>,
    ) -> Result<SessionSummary, SessionError> {
        let (inbound_tx, mut inbound) = mpsc::channel(INBOUND_CAPACITY);
        let transport = self.transport.clone();
        self.ctx.spawn("transport-reader", async move {
            while let Some(event) = transport.recv().await {
                let terminal = !matches!(event, TransportEvent::Text(_));
                if inbound_tx.send(event).await.is_err() || terminal {
                    break;
                }
            }
        });

        let mut ticker = tokio::time::interval(self.config.tick_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut commands_open = true;

        info!(session = %self.id, endpoint = %self.config.endpoint, "session started");

        let outcome = loop {
            tokio::select! {
                event = inbound.recv() => {
                    // Reader gone without a close frame
                    let event = event.unwrap_or(TransportEvent::Closed { clean: false });
                    match self.handle_event(event) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Stop) => break Ok(()),
                        Err(e) => break Err(e),
                    }
                }
                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if self.handle_command(command) == Flow::Stop {
                            break Ok(());
                        }
                    }
                    None => {
                        debug!("control channel closed");
                        commands_open = false;
                    }
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        break Err(e);
                    }
                }
            }
        };

        let summary = self.summary();
        self.shutdown().await;

        match &outcome {
            Ok(()) => info!(
                session = %self.id,
                frames = summary.frames_applied,
                requests = summary.requests_sent,
                "session ended"
            ),
            Err(e) => warn!(session = %self.id, error = %e, "session failed"),
        }
        outcome.map(|()| summary)
    }

    fn handle_event(&mut self, event: TransportEvent) -> Result<Flow, SessionError> {
        match event {
            TransportEvent::Text(text) => {
                self.handle_text(&text)?;
                Ok(Flow::Continue)
            }
            TransportEvent::Closed { clean: true } => {
                info!(session = %self.id, "server closed the connection");
                Ok(Flow::Stop)
            }
            TransportEvent::Closed { clean: false } => {
                self.notifier.alert("lost connection to server");
                Err(SessionError::ConnectionLost)
            }
            TransportEvent::Error(reason) => {
                self.notifier.alert(&format!("error: {}", reason));
                Err(SessionError::Transport(reason))
            }
        }
    }

    /// Decodes and applies one server message. Bad messages are dropped.
    fn handle_text(&mut self, text: &str) -> Result<(), SessionError> {
        match decode_server_message(text) {
            Ok(Some(ServerMessage::MapData(map))) => self.apply_map(&map),
            Ok(Some(ServerMessage::Frame(frame))) => self.apply_frame(&frame),
            Ok(None) => {
                trace!("ignoring message with unknown action");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "dropping malformed message");
                Ok(())
            }
        }
    }

    fn apply_map(&mut self, map: &MapPayload) -> Result<(), SessionError> {
        if self.map.is_some() {
            warn!("map already built, ignoring map_data");
            return Ok(());
        }

        let meshes = self.map_builder.build(map, &mut self.scene)?;
        if let Some(bounds) = map.bounds() {
            self.camera.look_at_map(bounds.center());
        }
        if let Some(recording) = self.recording.as_mut() {
            recording.map_ways = map.ways.len();
        }

        info!(
            ways = map.ways.len(),
            ribbons = meshes.ribbons.len(),
            surfaces = meshes.surfaces.len(),
            skipped = meshes.skipped,
            "map loaded"
        );
        self.map = Some(meshes);
        Ok(())
    }

    fn apply_frame(&mut self, frame: &FramePayload) -> Result<(), SessionError> {
        self.playback.observe_frame(frame);
        if !self.playback.accepts_frames() {
            trace!(index = frame.current_index, "paused, frame discarded");
            self.stats.frames_discarded += 1;
            return Ok(());
        }

        let stats = self.agents.apply(frame, &mut self.scene)?;
        self.stats.frames_applied += 1;
        self.playback.frame_applied(frame);

        if let Some(recording) = self.recording.as_mut() {
            let time_sec = self.ctx.now().as_secs_f64();
            recording.add_frame(RecordedFrame::new(time_sec, frame, stats));
        }
        Ok(())
    }

    /// One animation tick: draw, then maybe ask for the next frame.
    async fn tick(&mut self) -> Result<(), SessionError> {
        self.scene.present(&self.camera)?;
        self.stats.ticks += 1;

        if let Some(index) = self.playback.on_tick() {
            self.request_frame(index).await;
        }
        Ok(())
    }

    async fn request_frame(&mut self, index: u64) {
        let text = match (ClientMessage::RequestFrame { index }).encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(index, error = %e, "failed to encode frame request");
                return;
            }
        };

        match self.transport.send_text(text).await {
            Ok(()) => {
                trace!(index, "frame requested");
                self.stats.requests_sent += 1;
            }
            // A broken socket also shows up on the reader side
            Err(e) => warn!(index, error = %e, "frame request not sent"),
        }
    }

    fn handle_command(&mut self, command: ControlCommand) -> Flow {
        debug!(?command, "control command");
        match command {
            ControlCommand::Toggle => self.playback.toggle(),
            ControlCommand::Play => self.playback.play(),
            ControlCommand::Pause => self.playback.pause(),
            ControlCommand::Seek(index) => self.playback.seek(index),
            ControlCommand::ScrubBegin => self.playback.scrub_begin(),
            ControlCommand::ScrubMove(index) => self.playback.scrub_move(index),
            ControlCommand::ScrubEnd(index) => self.playback.scrub_end(index),
            ControlCommand::Resize { width, height } => self.camera.resize(width, height),
            ControlCommand::Quit => return Flow::Stop,
        }
        Flow::Continue
    }

    async fn shutdown(&mut self) {
        match self.agents.clear(&mut self.scene) {
            Ok(removed) => debug!(removed, "agents cleared"),
            Err(e) => warn!(error = %e, "failed to clear agents"),
        }

        if let Err(e) = self.transport.close().await {
            debug!(error = %e, "transport close");
        }

        if let (Some(recording), Some(path)) = (&self.recording, &self.config.record_path) {
            match recording.write_to_file(path) {
                Ok(()) => info!(path = %path.display(), frames = recording.frames.len(), "recording written"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to write recording"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interviz_core::scene::Layer;
    use interviz_core::RetainedScene;
    use interviz_env::{ChannelPeer, ChannelTransport, TokioContext};
    use std::sync::Mutex;

    type TestSession = ClientSession<ChannelTransport, RetainedScene, TokioContext>;

    #[derive(Clone, Default)]
    struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

    impl Notifier for RecordingNotifier {
        fn alert(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn session(config: ClientConfig) -> (TestSession, ChannelPeer, RecordingNotifier) {
        let (transport, peer) = ChannelTransport::pair(64);
        let notifier = RecordingNotifier::default();
        let session = ClientSession::new(
            config,
            TokioContext::shared(),
            Arc::new(transport),
            RetainedScene::new(),
            Box::new(notifier.clone()),
        )
        .unwrap();
        (session, peer, notifier)
    }

    fn playing() -> ClientConfig {
        ClientConfig { start_playing: true, ..Default::default() }
    }

    const MAP: &str = r#"{"action":"map_data","payload":{"ways":[
        {"kind":"SolidLine","points":[[0,0],[10,0]]},
        {"kind":"Virtual","points":[[0,1],[10,1]]}
    ],"triangulated_lanes":[[[[0,0],[1,0],[0,1]]]],"triangulated_region":[]}}"#;

    const CAR_FRAME: &str = r#"{"action":"frame","payload":{"current_index":0,"max_index":10,
        "agents":[{"track_id":1,"kind":"CAR","position":[0,0],"yaw":0.0,"extent":[4,2],"color":[255,0,0]}]}}"#;

    const EMPTY_FRAME: &str = r#"{"action":"frame","payload":{"current_index":1,"max_index":10,"agents":[]}}"#;

    #[tokio::test]
    async fn test_new_session_sets_up_scene() {
        let (session, _peer, _) = session(ClientConfig::default());

        assert!(session.scene().environment().is_some());
        assert_eq!(session.scene().count_in(Layer::Ground), 1);
        assert!(session.playback().is_paused());
        assert!(session.map().is_none());
    }

    #[tokio::test]
    async fn test_map_is_built_once() {
        let (mut session, _peer, _) = session(ClientConfig::default());

        session.handle_text(MAP).unwrap();
        let meshes = session.map().unwrap().clone();
        assert_eq!(meshes.ribbons.len(), 1);
        assert_eq!(meshes.surfaces.len(), 1);
        assert_eq!(meshes.skipped, 1);
        assert_eq!(session.camera().target.x, 5.0);

        session.handle_text(MAP).unwrap();
        assert_eq!(session.scene().count_in(Layer::Marking), 1);
        assert_eq!(session.scene().count_in(Layer::Surface), 1);
    }

    #[tokio::test]
    async fn test_car_then_empty_frame() {
        let (mut session, _peer, _) = session(playing());

        session.handle_text(CAR_FRAME).unwrap();
        assert_eq!(session.agents().len(), 1);
        assert_eq!(session.scene().count_in(Layer::Agent), 1);

        session.handle_text(EMPTY_FRAME).unwrap();
        assert!(session.agents().is_empty());
        assert_eq!(session.scene().count_in(Layer::Agent), 0);
        assert_eq!(session.summary().frames_applied, 2);
    }

    #[tokio::test]
    async fn test_frames_discarded_while_paused() {
        let (mut session, _peer, _) = session(ClientConfig::default());

        session.handle_text(CAR_FRAME).unwrap();
        assert!(session.agents().is_empty());
        assert_eq!(session.summary().frames_discarded, 1);
        assert_eq!(session.playback().max_index(), 10);
    }

    #[tokio::test]
    async fn test_bad_messages_are_ignored() {
        let (mut session, _peer, _) = session(playing());

        session.handle_text("not json").unwrap();
        session.handle_text(r#"{"action":"frame","payload":{"agents":"nope"}}"#).unwrap();
        session.handle_text(r#"{"action":"weather","payload":{}}"#).unwrap();

        assert_eq!(session.summary().frames_applied, 0);
        assert_eq!(session.scene().len(), 1);
    }

    #[tokio::test]
    async fn test_ticks_request_on_cadence() {
        let (mut session, mut peer, _) = session(playing());

        for _ in 0..11 {
            session.tick().await.unwrap();
        }

        let mut indices = Vec::new();
        while let Some(text) = peer.try_recv_text() {
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(value["action"], "request_frame");
            indices.push(value["index"].as_u64().unwrap());
        }
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(session.summary().requests_sent, 3);
        assert_eq!(session.scene().presented_frames(), 11);
    }

    #[tokio::test]
    async fn test_last_frame_is_applied_then_pauses() {
        let config = ClientConfig { start_index: 10, request_cadence: 1, ..playing() };
        let (mut session, mut peer, _) = session(config);
        session.handle_text(r#"{"action":"frame","payload":{"current_index":9,"max_index":10,"agents":[]}}"#).unwrap();

        session.tick().await.unwrap();
        let request: serde_json::Value = serde_json::from_str(&peer.try_recv_text().unwrap()).unwrap();
        assert_eq!(request["index"], 10);

        // The reply arrives a few ticks later
        session.tick().await.unwrap();
        session.tick().await.unwrap();
        assert!(peer.try_recv_text().is_none());
        assert!(!session.playback().is_paused());

        let last = CAR_FRAME.replace(r#""current_index":0"#, r#""current_index":10"#);
        session.handle_text(&last).unwrap();

        assert_eq!(session.summary().frames_discarded, 0);
        assert_eq!(session.agents().len(), 1);
        assert!(session.playback().is_paused());
    }

    #[tokio::test]
    async fn test_paused_ticks_send_nothing() {
        let (mut session, mut peer, _) = session(ClientConfig::default());

        for _ in 0..20 {
            session.tick().await.unwrap();
        }
        assert!(peer.try_recv_text().is_none());
    }

    #[tokio::test]
    async fn test_commands_drive_playback_and_camera() {
        let (mut session, _peer, _) = session(ClientConfig::default());

        assert_eq!(session.handle_command(ControlCommand::ScrubBegin), Flow::Continue);
        session.handle_command(ControlCommand::ScrubMove(30));
        assert_eq!(session.playback().pending_index(), Some(30));
        session.handle_command(ControlCommand::Toggle);
        session.handle_command(ControlCommand::ScrubEnd(31));
        assert!(!session.playback().is_paused());
        assert_eq!(session.playback().current_index(), 31);

        session.handle_command(ControlCommand::Resize { width: 800, height: 400 });
        assert_eq!(session.camera().aspect, 2.0);

        assert_eq!(session.handle_command(ControlCommand::Quit), Flow::Stop);
    }

    #[tokio::test]
    async fn test_run_applies_frames_until_clean_close() {
        let (session, peer, notifier) = session(playing());
        let (_commands_tx, commands_rx) = mpsc::channel(4);

        peer.send_text(MAP).await.unwrap();
        peer.send_text(CAR_FRAME).await.unwrap();
        peer.close(true).await.unwrap();

        let summary = session.run(commands_rx).await.unwrap();
        assert_eq!(summary.frames_applied, 1);
        assert_eq!(summary.visible_agents, 1);
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unclean_close_alerts_user() {
        let (session, peer, notifier) = session(ClientConfig::default());
        let (_commands_tx, commands_rx) = mpsc::channel(4);

        peer.close(false).await.unwrap();

        let result = session.run(commands_rx).await;
        assert!(matches!(result, Err(SessionError::ConnectionLost)));
        assert_eq!(*notifier.0.lock().unwrap(), vec!["lost connection to server".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_alerts_user() {
        let (session, peer, notifier) = session(ClientConfig::default());
        let (_commands_tx, commands_rx) = mpsc::channel(4);

        peer.fail("reset by peer").await.unwrap();

        let result = session.run(commands_rx).await;
        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert_eq!(*notifier.0.lock().unwrap(), vec!["error: reset by peer".to_string()]);
    }

    #[tokio::test]
    async fn test_quit_command_ends_session() {
        let (session, _peer, notifier) = session(ClientConfig::default());
        let (commands_tx, commands_rx) = mpsc::channel(4);

        commands_tx.send(ControlCommand::Quit).await.unwrap();

        let summary = session.run(commands_rx).await.unwrap();
        assert_eq!(summary.frames_applied, 0);
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recording_written_on_exit() {
        let path = std::env::temp_dir().join(format!("interviz_session_{}.json", std::process::id()));
        let config = ClientConfig { record_path: Some(path.clone()), ..playing() };
        let (session, peer, _) = session(config);
        let (_commands_tx, commands_rx) = mpsc::channel(4);

        peer.send_text(MAP).await.unwrap();
        peer.send_text(CAR_FRAME).await.unwrap();
        peer.send_text(EMPTY_FRAME).await.unwrap();
        peer.close(true).await.unwrap();
        session.run(commands_rx).await.unwrap();

        let recording: SessionRecording =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(recording.session.len(), 36);
        assert_eq!(recording.map_ways, 2);
        assert_eq!(recording.frames.len(), 2);
        assert_eq!(recording.frames[1].removed, 1);

        std::fs::remove_file(&path).unwrap();
    }
}
