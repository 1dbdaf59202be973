use podium_events::emit_host_log;

/// Log locally and forward the line to the shell's log sink.
pub(crate) fn host_info(message: impl Into<String>) {
    let message = message.into();
    tracing::info!("{message}");
    emit_host_log(message);
}
