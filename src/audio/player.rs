use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    advance::AdvancementController,
    registry::SessionRegistry,
    session::{PlaybackSession, SessionStatus},
    transport::{IdleNotifier, StatusNotifier, VoiceTransport},
};
use crate::{error::QueueError, sources::Track};

/// Dónde vive la sesión que un comando `play` crea o reutiliza
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTarget {
    pub guild_id: GuildId,
    pub voice_channel: ChannelId,
    pub reply_channel: ChannelId,
}

/// Resultado de agregar un track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// La sesión estaba inactiva y el track empezó a sonar
    Started,
    /// Quedó en la cola en la posición indicada (1 = siguiente)
    Queued(usize),
}

/// Punto de entrada del core de reproducción para la capa de comandos.
///
/// Orquesta el [`SessionRegistry`], las [`PlaybackSession`] y el
/// [`AdvancementController`]. Se construye una vez por proceso y se comparte
/// por `Arc`.
pub struct AudioPlayer {
    registry: Arc<SessionRegistry>,
    controller: Arc<AdvancementController>,
    transport: Arc<dyn VoiceTransport>,
}

impl AudioPlayer {
    pub fn new(transport: Arc<dyn VoiceTransport>, notifier: Arc<dyn StatusNotifier>) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let controller = Arc::new(AdvancementController::new(Arc::clone(&registry), notifier));

        Self {
            registry,
            controller,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn controller(&self) -> &Arc<AdvancementController> {
        &self.controller
    }

    /// Agrega un track ya resuelto, creando la sesión si la guild no tiene una.
    ///
    /// Si la conexión de voz falla se devuelve `TransportUnavailable` y no se
    /// registra nada. Una sesión que se cerró mientras esperábamos su lock ya
    /// no está en el registro, así que el reintento crea una nueva.
    pub async fn enqueue(&self, target: SessionTarget, track: Track) -> Result<Enqueued, QueueError> {
        loop {
            if let Some(session) = self.registry.get(target.guild_id) {
                let mut state = session.lock().await;
                if state.is_closed() {
                    debug!("Sesión de guild {} cerrada durante enqueue, reintentando", target.guild_id);
                    continue;
                }

                let position = state.push(track.clone());
                if state.current().is_none() {
                    self.controller.advance_locked(&session, &mut state).await;
                    return Ok(Enqueued::Started);
                }
                return Ok(Enqueued::Queued(position));
            }

            let gate = self.registry.creation_gate(target.guild_id);
            let _creating = gate.lock().await;
            if self.registry.contains(target.guild_id) {
                continue;
            }

            let session = self.create_session(target).await?;

            // El lock se toma antes de publicar la sesión: nadie la ve vacía
            let mut state = session.lock().await;
            self.registry.insert(Arc::clone(&session));
            state.push(track);
            self.controller.advance_locked(&session, &mut state).await;
            return Ok(Enqueued::Started);
        }
    }

    async fn create_session(&self, target: SessionTarget) -> Result<Arc<PlaybackSession>, QueueError> {
        let (idle, events) = IdleNotifier::channel();

        let connection = self
            .transport
            .connect(target.guild_id, target.voice_channel, idle)
            .await
            .map_err(|e| {
                warn!("❌ No se pudo conectar en guild {}: {}", target.guild_id, e);
                e
            })?;

        info!(
            "🔊 Nueva sesión en guild {} (canal {})",
            target.guild_id, target.voice_channel
        );

        let session = Arc::new(PlaybackSession::new(
            target.guild_id,
            target.voice_channel,
            target.reply_channel,
            connection,
        ));
        self.controller.spawn_idle_worker(Arc::clone(&session), events);

        Ok(session)
    }

    /// Salta el track actual. `Ok(None)` si no había nada sonando.
    pub async fn skip(&self, guild_id: GuildId) -> Result<Option<Track>, QueueError> {
        self.session(guild_id)?.skip().await
    }

    pub async fn pause(&self, guild_id: GuildId) -> Result<(), QueueError> {
        self.session(guild_id)?.pause().await
    }

    pub async fn resume(&self, guild_id: GuildId) -> Result<(), QueueError> {
        self.session(guild_id)?.resume().await
    }

    /// Vacía la cola, detiene el transporte y elimina la sesión.
    /// Devuelve la cantidad de tracks pendientes descartados.
    pub async fn stop(&self, guild_id: GuildId) -> Result<usize, QueueError> {
        let session = self.session(guild_id)?;
        let mut state = session.lock().await;
        if state.is_closed() {
            return Err(QueueError::EmptySession);
        }

        let discarded = self.controller.teardown_locked(&session, &mut state).await;
        info!("⏹️ Reproducción detenida en guild {} ({} pendientes descartados)", guild_id, discarded);
        Ok(discarded)
    }

    /// Reacciona a que el bot salió del canal `channel_id` sin pasar por `stop`.
    ///
    /// La salida que provoca nuestro propio teardown también llega por el
    /// gateway, a veces después de que un `play` nuevo ya creó otra sesión.
    /// Solo se cierra la sesión si es de ese canal y su conexión ya no está
    /// activa. Devuelve los pendientes descartados, o `None` si se ignoró.
    pub async fn handle_disconnect(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Option<usize>, QueueError> {
        let session = self.session(guild_id)?;
        if session.voice_channel() != channel_id {
            return Ok(None);
        }

        let mut state = session.lock().await;
        if state.is_closed() {
            return Err(QueueError::EmptySession);
        }
        if state.is_connected().await {
            debug!("Salida de voz en guild {} no corresponde a la sesión actual", guild_id);
            return Ok(None);
        }

        let discarded = self.controller.teardown_locked(&session, &mut state).await;
        info!("🔌 Sesión de guild {} cerrada tras desconexión externa", guild_id);
        Ok(Some(discarded))
    }

    pub async fn status(&self, guild_id: GuildId) -> Result<SessionStatus, QueueError> {
        Ok(self.session(guild_id)?.status().await)
    }

    /// Detiene todas las sesiones (apagado del proceso)
    pub async fn shutdown(&self) {
        for guild_id in self.registry.guilds() {
            if let Err(e) = self.stop(guild_id).await {
                debug!("Sesión de guild {} ya cerrada: {}", guild_id, e);
            }
        }
    }

    fn session(&self, guild_id: GuildId) -> Result<Arc<PlaybackSession>, QueueError> {
        self.registry.get(guild_id).ok_or(QueueError::EmptySession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        advance::Advance,
        testing::{wait_until, FakeTransport, RecordingNotifier, TransportCall},
        transport::{IdleCause, IdleEvent, Notice},
    };
    use pretty_assertions::assert_eq;

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    fn target(guild_id: GuildId) -> SessionTarget {
        SessionTarget {
            guild_id,
            voice_channel: ChannelId::new(10),
            reply_channel: ChannelId::new(20),
        }
    }

    fn track(n: usize) -> Track {
        Track::new(format!("Song {}", n), format!("https://www.youtube.com/watch?v={}", n))
    }

    fn setup() -> (AudioPlayer, Arc<FakeTransport>, Arc<RecordingNotifier>) {
        let transport = Arc::new(FakeTransport::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let player = AudioPlayer::new(transport.clone(), notifier.clone());
        (player, transport, notifier)
    }

    async fn assert_registry_invariant(player: &AudioPlayer, guild_id: GuildId) {
        match player.registry().get(guild_id) {
            Some(session) => {
                let status = session.status().await;
                assert!(status.current.is_some() || !status.queue.is_empty());
            }
            None => assert!(matches!(player.status(guild_id).await, Err(QueueError::EmptySession))),
        }
    }

    #[tokio::test]
    async fn test_enqueue_preserves_call_order() {
        let (player, _, _) = setup();

        assert_eq!(player.enqueue(target(guild()), track(0)).await.unwrap(), Enqueued::Started);
        for n in 1..=4 {
            assert_eq!(player.enqueue(target(guild()), track(n)).await.unwrap(), Enqueued::Queued(n));
            assert_registry_invariant(&player, guild()).await;
        }

        let status = player.status(guild()).await.unwrap();
        assert_eq!(status.current, Some(track(0)));
        assert_eq!(status.queue, (1..=4).map(track).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_advance_pops_front_until_teardown() {
        let (player, transport, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        for n in 1..=3 {
            player.enqueue(target(guild()), track(n)).await.unwrap();
        }

        let session = player.registry().get(guild()).unwrap();
        for n in 1..=3 {
            let before = session.status().await.queue.len();
            assert_eq!(player.controller().advance(&session).await, Advance::Playing(track(n)));
            let status = session.status().await;
            assert_eq!(status.current, Some(track(n)));
            assert_eq!(status.queue.len(), before - 1);
        }

        assert_eq!(player.controller().advance(&session).await, Advance::TornDown);
        assert!(!player.registry().contains(guild()));
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Disconnect(_))), 1);
    }

    #[tokio::test]
    async fn test_enqueue_n_then_advance_n_plus_one_times() {
        let (player, transport, _) = setup();
        let session = {
            // Sesión viva con el primer track sonando y N pendientes
            player.enqueue(target(guild()), track(0)).await.unwrap();
            player.registry().get(guild()).unwrap()
        };
        let n = 5;
        for i in 1..=n {
            player.enqueue(target(guild()), track(i)).await.unwrap();
        }

        // El primer avance termina track(0); luego cada pendiente en orden
        for i in 1..=n {
            assert_eq!(player.controller().advance(&session).await, Advance::Playing(track(i)));
        }
        assert_eq!(player.controller().advance(&session).await, Advance::TornDown);
        assert_registry_invariant(&player, guild()).await;

        let played: Vec<String> = transport
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Play(_, url, _) => Some(url),
                _ => None,
            })
            .collect();
        assert_eq!(played, (0..=n).map(|i| track(i).url).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_song_a_song_b_scenario() {
        let (player, _, notifier) = setup();
        let song_a = Track::new("Artist - Song A", "u1");
        let song_b = Track::new("B", "u2");

        assert_eq!(player.enqueue(target(guild()), song_a.clone()).await.unwrap(), Enqueued::Started);
        let status = player.status(guild()).await.unwrap();
        assert_eq!(status.current, Some(song_a.clone()));
        assert!(status.queue.is_empty());

        assert_eq!(player.enqueue(target(guild()), song_b.clone()).await.unwrap(), Enqueued::Queued(1));
        let status = player.status(guild()).await.unwrap();
        assert_eq!(status.current, Some(song_a.clone()));
        assert_eq!(status.queue, vec![song_b.clone()]);

        let session = player.registry().get(guild()).unwrap();
        let advanced = player
            .controller()
            .handle_idle(&session, IdleEvent { play_id: 1, cause: IdleCause::Finished })
            .await;
        assert_eq!(advanced, Some(Advance::Playing(song_b.clone())));
        let status = player.status(guild()).await.unwrap();
        assert_eq!(status.current, Some(song_b.clone()));
        assert!(status.queue.is_empty());

        let advanced = player
            .controller()
            .handle_idle(&session, IdleEvent { play_id: 2, cause: IdleCause::Finished })
            .await;
        assert_eq!(advanced, Some(Advance::TornDown));
        assert!(!player.registry().contains(guild()));

        assert_eq!(
            notifier.notices(),
            vec![
                (ChannelId::new(20), Notice::NowPlaying(song_a)),
                (ChannelId::new(20), Notice::NowPlaying(song_b)),
            ]
        );
    }

    #[tokio::test]
    async fn test_stale_idle_event_is_ignored() {
        let (player, _, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();

        let session = player.registry().get(guild()).unwrap();
        let stale = IdleEvent { play_id: 99, cause: IdleCause::Finished };
        assert_eq!(player.controller().handle_idle(&session, stale).await, None);

        let status = player.status(guild()).await.unwrap();
        assert_eq!(status.current, Some(track(0)));
        assert_eq!(status.queue, vec![track(1)]);
    }

    #[tokio::test]
    async fn test_skip_advances_through_idle_worker() {
        let (player, transport, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();

        assert_eq!(player.skip(guild()).await.unwrap(), Some(track(0)));
        wait_until(|| transport.count(|c| matches!(c, TransportCall::Play(..))) == 2).await;
        wait_until_current(&player, Some(track(1))).await;

        // El último skip vacía la cola y cierra la sesión
        assert_eq!(player.skip(guild()).await.unwrap(), Some(track(1)));
        wait_until(|| transport.count(|c| matches!(c, TransportCall::Disconnect(_))) == 1).await;
        assert!(!player.registry().contains(guild()));
    }

    async fn wait_until_current(player: &AudioPlayer, expected: Option<Track>) {
        for _ in 0..100 {
            if player.status(guild()).await.ok().and_then(|s| s.current) == expected {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("el track actual nunca llegó a {:?}", expected);
    }

    #[tokio::test]
    async fn test_operations_without_session_report_empty() {
        let (player, transport, _) = setup();

        assert!(matches!(player.skip(guild()).await, Err(QueueError::EmptySession)));
        assert!(matches!(player.pause(guild()).await, Err(QueueError::EmptySession)));
        assert!(matches!(player.resume(guild()).await, Err(QueueError::EmptySession)));
        assert!(matches!(player.stop(guild()).await, Err(QueueError::EmptySession)));
        assert!(matches!(player.status(guild()).await, Err(QueueError::EmptySession)));

        assert!(transport.calls().is_empty());
        assert!(player.registry().is_empty());
    }

    #[tokio::test]
    async fn test_pause_and_resume_keep_queue() {
        let (player, transport, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();

        player.pause(guild()).await.unwrap();
        player.resume(guild()).await.unwrap();

        assert_eq!(transport.count(|c| matches!(c, TransportCall::Pause(_))), 1);
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Resume(_))), 1);
        assert_eq!(player.status(guild()).await.unwrap().queue, vec![track(1)]);
    }

    #[tokio::test]
    async fn test_stop_removes_session_and_releases_once() {
        let (player, transport, _) = setup();
        for n in 0..4 {
            player.enqueue(target(guild()), track(n)).await.unwrap();
        }

        assert_eq!(player.stop(guild()).await.unwrap(), 3);
        assert!(!player.registry().contains(guild()));
        assert!(matches!(player.status(guild()).await, Err(QueueError::EmptySession)));
        assert!(matches!(player.stop(guild()).await, Err(QueueError::EmptySession)));
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Disconnect(_))), 1);

        // Un play posterior crea una sesión nueva con su propia conexión
        assert_eq!(player.enqueue(target(guild()), track(9)).await.unwrap(), Enqueued::Started);
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Connect(_))), 2);
    }

    #[tokio::test]
    async fn test_enqueue_waiting_on_closing_session_creates_new_one() {
        let (player, transport, _) = setup();
        let player = Arc::new(player);
        player.enqueue(target(guild()), track(0)).await.unwrap();
        let old = player.registry().get(guild()).unwrap();

        let mut state = old.lock().await;
        let pending = {
            let player = Arc::clone(&player);
            tokio::spawn(async move { player.enqueue(target(guild()), track(1)).await })
        };
        // El enqueue queda esperando el lock de la sesión vieja
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        player.controller().teardown_locked(&old, &mut state).await;
        drop(state);

        assert_eq!(pending.await.unwrap().unwrap(), Enqueued::Started);
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Connect(_))), 2);

        let new = player.registry().get(guild()).unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert_eq!(
            new.status().await,
            SessionStatus {
                current: Some(track(1)),
                queue: Vec::new(),
            }
        );
    }

    #[tokio::test]
    async fn test_external_disconnect_tears_session_down() {
        let (player, transport, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();

        transport.drop_connection(guild());

        assert_eq!(player.handle_disconnect(guild(), ChannelId::new(10)).await.unwrap(), Some(1));
        assert!(!player.registry().contains(guild()));
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Disconnect(_))), 1);
    }

    #[tokio::test]
    async fn test_leave_from_previous_session_keeps_new_one() {
        let (player, transport, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.stop(guild()).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();

        // La salida del teardown anterior llega tarde por el gateway
        assert_eq!(player.handle_disconnect(guild(), ChannelId::new(10)).await.unwrap(), None);
        assert_eq!(player.handle_disconnect(guild(), ChannelId::new(99)).await.unwrap(), None);

        assert_eq!(player.status(guild()).await.unwrap().current, Some(track(1)));
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Disconnect(_))), 1);
    }

    #[tokio::test]
    async fn test_disconnect_without_session_reports_empty() {
        let (player, _, _) = setup();
        assert!(matches!(
            player.handle_disconnect(guild(), ChannelId::new(10)).await,
            Err(QueueError::EmptySession)
        ));
    }

    #[tokio::test]
    async fn test_connect_failure_registers_nothing() {
        let (player, transport, _) = setup();
        transport.fail_connect(true);

        let err = player.enqueue(target(guild()), track(0)).await.unwrap_err();
        assert!(matches!(err, QueueError::TransportUnavailable(_)));
        assert!(player.registry().is_empty());

        transport.fail_connect(false);
        assert_eq!(player.enqueue(target(guild()), track(0)).await.unwrap(), Enqueued::Started);
    }

    #[tokio::test]
    async fn test_failed_track_is_reported_and_skipped() {
        let (player, transport, notifier) = setup();
        transport.fail_url(&track(1).url);

        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();
        player.enqueue(target(guild()), track(2)).await.unwrap();

        let session = player.registry().get(guild()).unwrap();
        assert_eq!(player.controller().advance(&session).await, Advance::Playing(track(2)));
        assert!(notifier
            .notices()
            .contains(&(ChannelId::new(20), Notice::PlaybackFailed(track(1)))));
    }

    #[tokio::test]
    async fn test_only_failing_track_tears_session_down() {
        let (player, transport, notifier) = setup();
        transport.fail_url(&track(0).url);

        assert_eq!(player.enqueue(target(guild()), track(0)).await.unwrap(), Enqueued::Started);
        assert!(!player.registry().contains(guild()));
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Disconnect(_))), 1);
        assert_eq!(
            notifier.notices(),
            vec![(ChannelId::new(20), Notice::PlaybackFailed(track(0)))]
        );
    }

    #[tokio::test]
    async fn test_stream_error_reports_and_advances() {
        let (player, transport, notifier) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(guild()), track(1)).await.unwrap();

        transport.emit_idle(guild(), IdleCause::Errored);
        wait_until_current(&player, Some(track(1))).await;

        assert!(notifier
            .notices()
            .contains(&(ChannelId::new(20), Notice::PlaybackFailed(track(0)))));
    }

    #[tokio::test]
    async fn test_guilds_are_independent() {
        let (player, _, _) = setup();
        let other = GuildId::new(2);

        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(other), track(5)).await.unwrap();
        player.stop(guild()).await.unwrap();

        assert!(!player.registry().contains(guild()));
        assert_eq!(player.status(other).await.unwrap().current, Some(track(5)));
    }

    #[tokio::test]
    async fn test_concurrent_enqueues_create_one_session() {
        let (player, transport, _) = setup();
        let player = Arc::new(player);

        let tasks: Vec<_> = (0..10)
            .map(|n| {
                let player = Arc::clone(&player);
                tokio::spawn(async move { player.enqueue(target(guild()), track(n)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(transport.count(|c| matches!(c, TransportCall::Connect(_))), 1);
        let status = player.status(guild()).await.unwrap();
        assert!(status.current.is_some());
        assert_eq!(status.queue.len(), 9);
    }

    #[tokio::test]
    async fn test_shutdown_stops_every_session() {
        let (player, transport, _) = setup();
        player.enqueue(target(guild()), track(0)).await.unwrap();
        player.enqueue(target(GuildId::new(2)), track(1)).await.unwrap();

        player.shutdown().await;

        assert!(player.registry().is_empty());
        assert_eq!(transport.count(|c| matches!(c, TransportCall::Disconnect(_))), 2);
    }
}
