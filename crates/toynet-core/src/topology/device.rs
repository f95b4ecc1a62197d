use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The device collections a topology document carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Host,
    Switch,
    Router,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 3] = [DeviceKind::Host, DeviceKind::Switch, DeviceKind::Router];
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_device_kind() {
        assert_eq!(DeviceKind::from_str("host").unwrap(), DeviceKind::Host);
        assert_eq!(DeviceKind::from_str("switch").unwrap(), DeviceKind::Switch);
        assert_eq!(DeviceKind::from_str("router").unwrap(), DeviceKind::Router);
        assert!(DeviceKind::from_str("firewall").is_err());
        assert_eq!(DeviceKind::Router.to_string(), "router");
    }
}
