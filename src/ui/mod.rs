//! Formato de las respuestas que ve el usuario.

pub mod messages;
