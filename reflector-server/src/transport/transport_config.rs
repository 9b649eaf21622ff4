/// Конфигурация WebRTC транспорта.
#[derive(Clone, Default)]
pub struct TransportConfig {
    /// Empty means host candidates only, which is the default the browser
    /// client is written against.
    pub ice_servers: Vec<String>,
}
