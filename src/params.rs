//! Session parameters collected from `ParameterStatus` during startup.
use crate::postgres::version::{self, ServerVersion};

/// Server/session parameters negotiated during startup.
#[derive(Debug, Clone, Default)]
pub struct ConnectionParameters {
    pub server_version: ServerVersion,
    pub integer_datetimes: bool,
    pub server_encoding: Option<String>,
}

impl ConnectionParameters {
    /// Fold one `ParameterStatus{name, value}` pair into the accumulated
    /// parameters. Unrecognized names are ignored.
    pub(crate) fn apply(&mut self, name: &str, value: &str) {
        match name {
            "server_version" => self.server_version = version::parse_server_version(value),
            "integer_datetimes" => self.integer_datetimes = version::parse_integer_datetimes(value),
            "server_encoding" => self.server_encoding = Some(value.to_owned()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_known_parameters_and_ignores_others() {
        let mut params = ConnectionParameters::default();
        params.apply("server_version", "10.4 (Ubuntu 10.4)");
        params.apply("integer_datetimes", "on");
        params.apply("server_encoding", "UTF8");
        params.apply("TimeZone", "UTC");

        assert_eq!(params.server_version.major, 10);
        assert!(params.integer_datetimes);
        assert_eq!(params.server_encoding.as_deref(), Some("UTF8"));
    }
}
