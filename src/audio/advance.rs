use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use super::{
    registry::SessionRegistry,
    session::{PlaybackSession, SessionState},
    transport::{IdleCause, IdleEvent, Notice, StatusNotifier},
};
use crate::sources::Track;

/// Resultado de un paso de avance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Se empezó a reproducir el siguiente track
    Playing(Track),
    /// La cola estaba vacía: la sesión se cerró y salió del registro
    TornDown,
}

/// Mueve cada sesión al siguiente track cuando el actual termina.
///
/// Cada paso corre con el lock de la sesión tomado, por lo que a lo sumo un
/// avance está en curso por sesión. Si el transporte rechaza un track se
/// anuncia el fallo una vez y se intenta con el siguiente.
pub struct AdvancementController {
    registry: Arc<SessionRegistry>,
    notifier: Arc<dyn StatusNotifier>,
}

impl AdvancementController {
    pub fn new(registry: Arc<SessionRegistry>, notifier: Arc<dyn StatusNotifier>) -> Self {
        Self { registry, notifier }
    }

    /// Avanza incondicionalmente: termina el track actual y toma el siguiente
    pub async fn advance(&self, session: &Arc<PlaybackSession>) -> Advance {
        let mut state = session.lock().await;
        if state.is_closed() {
            return Advance::TornDown;
        }
        self.advance_locked(session, &mut state).await
    }

    /// Procesa una notificación de inactividad del transporte.
    /// Los eventos de reproducciones ya reemplazadas se descartan.
    pub async fn handle_idle(&self, session: &Arc<PlaybackSession>, event: IdleEvent) -> Option<Advance> {
        let mut state = session.lock().await;

        if state.is_closed() || !state.is_current_play(event.play_id) {
            debug!(
                "Evento de inactividad obsoleto en guild {} (play {})",
                session.guild_id(),
                event.play_id
            );
            return None;
        }

        if event.cause == IdleCause::Errored {
            if let Some(track) = state.current().cloned() {
                warn!("❌ El stream de '{}' falló en guild {}", track.title, session.guild_id());
                self.notifier
                    .notify(session.reply_channel(), Notice::PlaybackFailed(track));
            }
        }

        Some(self.advance_locked(session, &mut state).await)
    }

    pub(crate) async fn advance_locked(&self, session: &Arc<PlaybackSession>, state: &mut SessionState) -> Advance {
        state.finish_current();

        while let Some(track) = state.pop_next() {
            match state.start(track.clone()).await {
                Ok(()) => {
                    info!("🎵 Reproduciendo: {} en guild {}", track.title, session.guild_id());
                    self.notifier
                        .notify(session.reply_channel(), Notice::NowPlaying(track.clone()));
                    return Advance::Playing(track);
                }
                Err(e) => {
                    warn!("❌ No se pudo reproducir '{}': {}", track.title, e);
                    self.notifier
                        .notify(session.reply_channel(), Notice::PlaybackFailed(track));
                }
            }
        }

        info!("📭 Cola vacía en guild {}, cerrando sesión", session.guild_id());
        self.teardown_locked(session, state).await;
        Advance::TornDown
    }

    /// Cierra la sesión y la quita del registro. Devuelve cuántos tracks
    /// pendientes se descartaron.
    pub(crate) async fn teardown_locked(&self, session: &Arc<PlaybackSession>, state: &mut SessionState) -> usize {
        let discarded = state.release().await;
        session.signal_shutdown();
        self.registry.remove(session);
        discarded
    }

    /// Lanza la tarea que consume las notificaciones de inactividad de la
    /// sesión. Termina cuando la sesión se cierra o el transporte suelta el canal.
    pub fn spawn_idle_worker(
        self: &Arc<Self>,
        session: Arc<PlaybackSession>,
        mut events: mpsc::UnboundedReceiver<IdleEvent>,
    ) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let shutdown = session.shutdown_token();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            controller.handle_idle(&session, event).await;
                        }
                        None => break,
                    },
                }
            }
            debug!("Worker de avance finalizado para guild {}", session.guild_id());
        })
    }
}
