/// Comandos reconocidos en mensajes con prefijo
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play(String),
    Skip,
    Pause,
    Resume,
    Stop,
    Queue,
    NowPlaying,
}

/// Interpreta un mensaje como comando.
///
/// Devuelve `None` si no empieza con el prefijo o el comando no existe. El
/// nombre no distingue mayúsculas y los argumentos de `play` se unen con un
/// espacio.
pub fn parse(content: &str, prefix: &str) -> Option<Command> {
    let rest = content.strip_prefix(prefix)?;
    let mut args = rest.split_whitespace();
    let name = args.next()?.to_lowercase();

    let command = match name.as_str() {
        "play" => Command::Play(args.collect::<Vec<_>>().join(" ")),
        "skip" => Command::Skip,
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "stop" => Command::Stop,
        "queue" => Command::Queue,
        "nowplaying" | "np" => Command::NowPlaying,
        _ => return None,
    };

    Some(command)
}
