mod events_manager;

pub use events_manager::*;

mod host;

pub use host::{
    emit_alert_signal, emit_element_inspected, emit_host_log, publish_config,
    request_fullscreen, AlertSignal, FullscreenRequest, HostLog, CONFIG_UPDATED_EVENT,
    ELEMENT_INSPECTED_EVENT, FULLSCREEN_EVENT, HOST_LOG_EVENT, PRESENTATION_ALERT_EVENT,
};
