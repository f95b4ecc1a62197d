//! Whitespace-separated modification commands.
//!
//! ```text
//! create switch <name>
//! create host <name> <gateway>      (address taken from the `ip` parameter)
//! create router <name> <cidr>...
//! delete host|switch|router <name>
//! link <a> <b>
//! unlink <a> <b>
//! ```

use std::str::FromStr;
use toynet_core::command::CommandParser;
use toynet_core::error::{Result, ToynetError};
use toynet_core::topology::{DeviceKind, Topology, edit};

/// [`CommandParser`] built on the document edit operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleCommandParser;

impl SimpleCommandParser {
    pub fn new() -> Self {
        Self
    }
}

fn usage(command: &str) -> ToynetError {
    ToynetError::validation(format!("Unrecognized command: {}", command))
}

impl CommandParser for SimpleCommandParser {
    fn apply(&self, command: &str, topology: &Topology, ip: Option<&str>) -> Result<Topology> {
        let words: Vec<&str> = command.split_whitespace().collect();

        match words.as_slice() {
            ["create", "switch", name] => Ok(edit::add_switch(topology, name)),
            ["create", "host", name, gateway] => {
                let ip = ip.ok_or_else(|| ToynetError::validation("Missing ip from req"))?;
                edit::add_host(topology, name, ip, gateway)
            }
            ["create", "router", name, interfaces @ ..] if !interfaces.is_empty() => {
                let interfaces = interfaces.iter().map(|s| s.to_string()).collect();
                Ok(edit::add_router(topology, name, interfaces))
            }
            ["delete", kind, name] => {
                let kind = DeviceKind::from_str(kind)
                    .map_err(|_| ToynetError::validation(format!("Invalid device type: {}", kind)))?;
                edit::delete_device(topology, kind, name)
            }
            ["link", a, b] => edit::add_link(topology, a, b),
            ["unlink", a, b] => edit::remove_link(topology, a, b),
            _ => Err(usage(command)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Topology {
        let topo = edit::add_router(&Topology::default(), "R1", vec!["10.0.0.1/24".to_string()]);
        edit::add_switch(&topo, "s1")
    }

    #[test]
    fn test_create_and_link() {
        let parser = SimpleCommandParser::new();
        let topo = parser
            .apply("create host h1 10.0.0.1", &base(), Some("10.0.0.5/24"))
            .unwrap();
        let topo = parser.apply("link h1 s1", &topo, None).unwrap();

        assert_eq!(topo.host("h1").unwrap().ip, "10.0.0.5/24");
        assert!(topo.is_linked("h1"));

        let topo = parser.apply("unlink s1 h1", &topo, None).unwrap();
        assert!(!topo.is_linked("h1"));
    }

    #[test]
    fn test_create_router_with_interfaces() {
        let topo = SimpleCommandParser
            .apply("create router R2 10.1.0.1/24 10.2.0.1/24", &base(), None)
            .unwrap();
        assert_eq!(topo.router("R2").unwrap().interfaces.len(), 2);

        assert!(
            SimpleCommandParser
                .apply("create router R3", &base(), None)
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn test_host_needs_ip_and_gateway() {
        let err = SimpleCommandParser
            .apply("create host h1 10.0.0.1", &base(), None)
            .unwrap_err();
        assert!(err.is_validation());

        let err = SimpleCommandParser
            .apply("create host h1 192.168.0.1", &base(), Some("192.168.0.5/24"))
            .unwrap_err();
        assert!(matches!(err, ToynetError::GatewayNotFound { .. }));
    }

    #[test]
    fn test_delete_respects_links() {
        let topo = SimpleCommandParser.apply("link R1 s1", &base(), None).unwrap();
        let err = SimpleCommandParser
            .apply("delete switch s1", &topo, None)
            .unwrap_err();
        assert!(err.is_device_in_use());

        let err = SimpleCommandParser
            .apply("delete firewall f1", &topo, None)
            .unwrap_err();
        assert_eq!(err, ToynetError::validation("Invalid device type: firewall"));

        let err = SimpleCommandParser
            .apply("delete SWITCH s1", &topo, None)
            .unwrap_err();
        assert_eq!(err, ToynetError::validation("Invalid device type: SWITCH"));
    }

    #[test]
    fn test_unknown_command() {
        let err = SimpleCommandParser
            .apply("reboot everything", &base(), None)
            .unwrap_err();
        assert_eq!(
            err,
            ToynetError::validation("Unrecognized command: reboot everything")
        );
    }
}
