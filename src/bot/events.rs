use serenity::{http::Http, model::id::ChannelId};
use std::sync::{Arc, OnceLock};
use tracing::{error, warn};

use crate::{
    audio::transport::{Notice, StatusNotifier},
    ui::messages,
};

/// Publica los avisos de la sesión en su canal de texto.
///
/// Usa el cliente HTTP del bot, que solo existe después de construir el
/// cliente de Serenity; se conecta con [`ChannelNotifier::attach`]. El envío
/// se hace en una tarea aparte para no retener el lock de la sesión durante
/// la llamada HTTP.
#[derive(Default)]
pub struct ChannelNotifier {
    http: OnceLock<Arc<Http>>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asocia el cliente HTTP compartido. Solo la primera llamada tiene efecto.
    pub fn attach(&self, http: Arc<Http>) {
        if self.http.set(http).is_err() {
            warn!("⚠️ El notificador ya tenía un cliente HTTP asociado");
        }
    }
}

impl StatusNotifier for ChannelNotifier {
    fn notify(&self, channel_id: ChannelId, notice: Notice) {
        let Some(http) = self.http.get().cloned() else {
            warn!("⚠️ Aviso descartado, cliente HTTP no asociado: {:?}", notice);
            return;
        };
        let content = messages::notice(&notice);

        tokio::spawn(async move {
            if let Err(e) = channel_id.say(&http, content).await {
                error!("Error al enviar aviso al canal {}: {:?}", channel_id, e);
            }
        });
    }
}
