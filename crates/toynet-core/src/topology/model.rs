//! Topology document model.
//!
//! The document is stored and exchanged as XML with four top-level
//! collections (`hostList`, `switchList`, `routerList`, `linkList`). Device
//! identity is carried by the `name` attribute; a link references its two
//! endpoints through `dvc` elements.
//!
//! ```text
//! <topology>
//!   <routerList>
//!     <router name="R1"><intf>10.0.0.1/24</intf></router>
//!   </routerList>
//!   <switchList><switch name="s1"/></switchList>
//!   <hostList>
//!     <host name="h1" ip="10.0.0.5">
//!       <defaultRouter><name>R1</name><intf>0</intf></defaultRouter>
//!     </host>
//!   </hostList>
//!   <linkList>
//!     <link><dvc name="h1"/><dvc name="s1"/></link>
//!   </linkList>
//! </topology>
//! ```

use super::device::DeviceKind;
use crate::error::{Result, ToynetError};
use serde::{Deserialize, Serialize};

/// A complete network topology.
///
/// Values are treated as immutable snapshots: every edit produces a new
/// `Topology` (see [`crate::topology::edit`]) which is then pushed and
/// persisted as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "topology")]
pub struct Topology {
    /// Optional name of the root router, kept for the emulator
    #[serde(rename = "root", default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(rename = "routerList", default)]
    pub router_list: RouterList,
    #[serde(rename = "switchList", default)]
    pub switch_list: SwitchList,
    #[serde(rename = "hostList", default)]
    pub host_list: HostList,
    #[serde(rename = "linkList", default)]
    pub link_list: LinkList,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterList {
    #[serde(rename = "router", default)]
    pub routers: Vec<Router>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchList {
    #[serde(rename = "switch", default)]
    pub switches: Vec<Switch>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostList {
    #[serde(rename = "host", default)]
    pub hosts: Vec<Host>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkList {
    #[serde(rename = "link", default)]
    pub links: Vec<Link>,
}

/// A router and its interfaces, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Router {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@ip", default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Interface addresses, usually in CIDR form (`10.0.0.1/24`)
    #[serde(rename = "intf", default)]
    pub interfaces: Vec<String>,
}

impl Router {
    /// Creates a router with the given interface addresses.
    pub fn new(name: impl Into<String>, interfaces: Vec<String>) -> Self {
        Self {
            name: name.into(),
            ip: None,
            interfaces,
        }
    }

    /// Returns the index of the first interface whose address, ignoring any
    /// subnet suffix, equals `address`.
    pub fn interface_index(&self, address: &str) -> Option<usize> {
        self.interfaces
            .iter()
            .position(|intf| strip_prefix_len(intf) == address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    #[serde(rename = "@name")]
    pub name: String,
}

impl Switch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@ip", default)]
    pub ip: String,
    #[serde(
        rename = "defaultRouter",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub default_router: Option<DefaultRouter>,
}

/// A host's default gateway, resolved to a router and one of its interfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultRouter {
    pub name: String,
    pub intf: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "dvc", default)]
    pub endpoints: Vec<LinkEndpoint>,
}

impl Link {
    /// Creates a link between two devices without interface hints.
    pub fn between(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            endpoints: vec![LinkEndpoint::new(a), LinkEndpoint::new(b)],
        }
    }

    /// Returns true if either endpoint names `device`.
    pub fn touches(&self, device: &str) -> bool {
        self.endpoints.iter().any(|dvc| dvc.name == device)
    }

    /// Returns true if this link connects exactly `a` and `b`, in either order.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        match self.endpoints.as_slice() {
            [x, y] => (x.name == a && y.name == b) || (x.name == b && y.name == a),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEndpoint {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "intf", default, skip_serializing_if = "Option::is_none")]
    pub intf: Option<usize>,
}

impl LinkEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            intf: None,
        }
    }
}

impl Topology {
    /// Parses a topology document from its XML form.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(ToynetError::malformed("empty topology document"));
        }
        Ok(quick_xml::de::from_str(raw)?)
    }

    /// Serializes the document back to XML.
    pub fn serialize(&self) -> Result<String> {
        Ok(quick_xml::se::to_string(self)?)
    }

    pub fn routers(&self) -> &[Router] {
        &self.router_list.routers
    }

    pub fn switches(&self) -> &[Switch] {
        &self.switch_list.switches
    }

    pub fn hosts(&self) -> &[Host] {
        &self.host_list.hosts
    }

    pub fn links(&self) -> &[Link] {
        &self.link_list.links
    }

    /// Finds a host by name.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts().iter().find(|h| h.name == name)
    }

    /// Finds a router by name.
    pub fn router(&self, name: &str) -> Option<&Router> {
        self.routers().iter().find(|r| r.name == name)
    }

    /// Returns the names of all devices in the collection for `kind`.
    pub fn device_names(&self, kind: DeviceKind) -> Vec<&str> {
        match kind {
            DeviceKind::Host => self.hosts().iter().map(|d| d.name.as_str()).collect(),
            DeviceKind::Switch => self.switches().iter().map(|d| d.name.as_str()).collect(),
            DeviceKind::Router => self.routers().iter().map(|d| d.name.as_str()).collect(),
        }
    }

    /// Returns true if a device named `name` exists in any collection.
    pub fn contains_device(&self, name: &str) -> bool {
        DeviceKind::ALL
            .iter()
            .any(|kind| self.device_names(*kind).contains(&name))
    }

    /// Returns true if any link names `device` as an endpoint.
    pub fn is_linked(&self, device: &str) -> bool {
        self.links().iter().any(|link| link.touches(device))
    }

    /// Resolves a gateway address to the first matching router interface.
    ///
    /// Routers are scanned in document order and their interfaces in
    /// declared order; the first match wins.
    pub fn resolve_gateway(&self, gateway: &str) -> Option<DefaultRouter> {
        self.routers().iter().find_map(|router| {
            router.interface_index(gateway).map(|intf| DefaultRouter {
                name: router.name.clone(),
                intf,
            })
        })
    }

    /// Checks referential integrity: every link endpoint names an existing
    /// device and every host's default router names an existing router
    /// interface.
    pub fn validate(&self) -> Result<()> {
        for link in self.links() {
            for dvc in &link.endpoints {
                if !self.contains_device(&dvc.name) {
                    return Err(ToynetError::malformed(format!(
                        "link references unknown device '{}'",
                        dvc.name
                    )));
                }
            }
        }

        for host in self.hosts() {
            if let Some(default_router) = &host.default_router {
                let valid = self
                    .router(&default_router.name)
                    .is_some_and(|r| default_router.intf < r.interfaces.len());
                if !valid {
                    return Err(ToynetError::malformed(format!(
                        "host '{}' has unknown default router {}:{}",
                        host.name, default_router.name, default_router.intf
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Drops a `/nn` subnet suffix from an interface address.
fn strip_prefix_len(address: &str) -> &str {
    address.split('/').next().unwrap_or(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<topology>
        <root>R1</root>
        <routerList>
            <router name="R1" ip="10.0.0.1/24">
                <intf>10.0.0.1/24</intf>
                <intf>172.16.0.1/24</intf>
            </router>
        </routerList>
        <switchList>
            <switch name="s1"/>
        </switchList>
        <hostList>
            <host name="h1" ip="10.0.0.5/24">
                <defaultRouter><name>R1</name><intf>0</intf></defaultRouter>
            </host>
        </hostList>
        <linkList>
            <link><dvc name="R1"><intf>0</intf></dvc><dvc name="s1"/></link>
            <link><dvc name="s1"/><dvc name="h1"/></link>
        </linkList>
    </topology>"#;

    #[test]
    fn test_parse_sample() {
        let topo = Topology::parse(SAMPLE).unwrap();

        assert_eq!(topo.root.as_deref(), Some("R1"));
        assert_eq!(topo.routers().len(), 1);
        assert_eq!(topo.routers()[0].interfaces.len(), 2);
        assert_eq!(topo.switches()[0].name, "s1");

        let h1 = topo.host("h1").unwrap();
        assert_eq!(h1.ip, "10.0.0.5/24");
        assert_eq!(
            h1.default_router,
            Some(DefaultRouter {
                name: "R1".to_string(),
                intf: 0
            })
        );

        assert_eq!(topo.links().len(), 2);
        assert_eq!(topo.links()[0].endpoints[0].intf, Some(0));
        assert_eq!(topo.links()[0].endpoints[1].intf, None);
        assert!(topo.validate().is_ok());
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let topo = Topology::parse(SAMPLE).unwrap();
        let raw = topo.serialize().unwrap();
        let reparsed = Topology::parse(&raw).unwrap();
        assert_eq!(topo, reparsed);
    }

    #[test]
    fn test_parse_empty_collections() {
        let topo = Topology::parse(
            "<topology><routerList/><switchList/><hostList/><linkList/></topology>",
        )
        .unwrap();
        assert!(topo.routers().is_empty());
        assert!(topo.hosts().is_empty());
        assert_eq!(topo, Topology::default());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Topology::parse(""),
            Err(ToynetError::MalformedDocument(_))
        ));
        assert!(matches!(
            Topology::parse("<topology><hostList><host name=\"x\"></hostList>"),
            Err(ToynetError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_resolve_gateway_first_match_wins() {
        let topo = Topology {
            router_list: RouterList {
                routers: vec![
                    Router::new("R1", vec!["10.0.0.1/24".into(), "10.0.1.1/24".into()]),
                    Router::new("R2", vec!["10.0.1.1/24".into()]),
                ],
            },
            ..Default::default()
        };

        let resolved = topo.resolve_gateway("10.0.1.1").unwrap();
        assert_eq!(resolved.name, "R1");
        assert_eq!(resolved.intf, 1);
        assert!(topo.resolve_gateway("10.0.2.1").is_none());
        // Prefix match is not enough; the whole address must match
        assert!(topo.resolve_gateway("10.0.0").is_none());
    }

    #[test]
    fn test_validate_detects_dangling_link() {
        let mut topo = Topology::parse(SAMPLE).unwrap();
        topo.link_list.links.push(Link::between("h1", "ghost"));
        assert!(topo.validate().is_err());
    }

    #[test]
    fn test_validate_detects_bad_default_router() {
        let mut topo = Topology::parse(SAMPLE).unwrap();
        topo.host_list.hosts[0].default_router = Some(DefaultRouter {
            name: "R1".to_string(),
            intf: 7,
        });
        assert!(topo.validate().is_err());
    }
}
