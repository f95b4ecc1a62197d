//! Pure edit operations over topology documents.
//!
//! Each operation borrows the current document and returns a new one. On
//! error the input is left untouched and no document is produced, so callers
//! can push and persist the result as a unit.

use super::device::DeviceKind;
use super::model::{Host, Link, Router, Switch, Topology};
use crate::error::{Result, ToynetError};

/// Adds a host whose default router is resolved from `gateway`.
///
/// # Errors
///
/// Returns `GatewayNotFound` if no router interface carries `gateway`.
pub fn add_host(topology: &Topology, name: &str, ip: &str, gateway: &str) -> Result<Topology> {
    let default_router = topology
        .resolve_gateway(gateway)
        .ok_or_else(|| ToynetError::GatewayNotFound {
            gateway: gateway.to_string(),
        })?;

    let mut next = topology.clone();
    next.host_list.hosts.push(Host {
        name: name.to_string(),
        ip: ip.to_string(),
        default_router: Some(default_router),
    });
    Ok(next)
}

/// Appends a switch. Duplicate names are accepted.
pub fn add_switch(topology: &Topology, name: &str) -> Topology {
    let mut next = topology.clone();
    next.switch_list.switches.push(Switch::new(name));
    next
}

/// Appends a router with the given interface addresses.
pub fn add_router(topology: &Topology, name: &str, interfaces: Vec<String>) -> Topology {
    let mut next = topology.clone();
    next.router_list.routers.push(Router::new(name, interfaces));
    next
}

/// Removes the first device of `kind` named `name`.
///
/// Deleting a name that does not exist returns an unchanged copy.
///
/// # Errors
///
/// Returns `DeviceInUse` if any link still names the device, whatever its
/// kind.
pub fn delete_device(topology: &Topology, kind: DeviceKind, name: &str) -> Result<Topology> {
    if topology.is_linked(name) {
        return Err(ToynetError::DeviceInUse {
            name: name.to_string(),
        });
    }

    let mut next = topology.clone();
    match kind {
        DeviceKind::Host => remove_first(&mut next.host_list.hosts, |d| d.name == name),
        DeviceKind::Switch => remove_first(&mut next.switch_list.switches, |d| d.name == name),
        DeviceKind::Router => remove_first(&mut next.router_list.routers, |d| d.name == name),
    }
    Ok(next)
}

/// Links two existing devices.
///
/// # Errors
///
/// Returns `NotFound` if either endpoint does not exist.
pub fn add_link(topology: &Topology, a: &str, b: &str) -> Result<Topology> {
    for endpoint in [a, b] {
        if !topology.contains_device(endpoint) {
            return Err(ToynetError::not_found("Device", endpoint));
        }
    }

    let mut next = topology.clone();
    next.link_list.links.push(Link::between(a, b));
    Ok(next)
}

/// Removes the first link connecting `a` and `b`.
///
/// # Errors
///
/// Returns `NotFound` if no such link exists.
pub fn remove_link(topology: &Topology, a: &str, b: &str) -> Result<Topology> {
    let position = topology
        .links()
        .iter()
        .position(|link| link.connects(a, b))
        .ok_or_else(|| ToynetError::not_found("Link", format!("{}-{}", a, b)))?;

    let mut next = topology.clone();
    next.link_list.links.remove(position);
    Ok(next)
}

fn remove_first<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool) {
    if let Some(index) = items.iter().position(matches) {
        items.remove(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::model::DefaultRouter;

    fn base() -> Topology {
        Topology::parse(
            r#"<topology>
                <routerList>
                    <router name="R1"><intf>10.0.0.1/24</intf><intf>10.0.1.1/24</intf></router>
                    <router name="R2"><intf>192.168.0.1/24</intf></router>
                </routerList>
                <switchList><switch name="s1"/><switch name="s2"/></switchList>
                <hostList>
                    <host name="h1" ip="10.0.0.10"><defaultRouter><name>R1</name><intf>0</intf></defaultRouter></host>
                    <host name="h9" ip="10.0.1.10"><defaultRouter><name>R1</name><intf>1</intf></defaultRouter></host>
                </hostList>
                <linkList>
                    <link><dvc name="R1"/><dvc name="s1"/></link>
                    <link><dvc name="s1"/><dvc name="h1"/></link>
                </linkList>
            </topology>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_add_host_resolves_gateway() {
        let topo = base();
        let next = add_host(&topo, "h2", "10.0.1.5", "10.0.1.1").unwrap();

        let h2 = next.host("h2").unwrap();
        assert_eq!(h2.ip, "10.0.1.5");
        assert_eq!(
            h2.default_router,
            Some(DefaultRouter {
                name: "R1".to_string(),
                intf: 1
            })
        );
        // Input document is untouched
        assert!(topo.host("h2").is_none());

        let reparsed = Topology::parse(&next.serialize().unwrap()).unwrap();
        assert_eq!(reparsed, next);
    }

    #[test]
    fn test_add_host_second_router() {
        let next = add_host(&base(), "h3", "192.168.0.7", "192.168.0.1").unwrap();
        let router = next.host("h3").unwrap().default_router.clone().unwrap();
        assert_eq!(router.name, "R2");
        assert_eq!(router.intf, 0);
    }

    #[test]
    fn test_add_host_unknown_gateway() {
        let topo = base();
        let err = add_host(&topo, "h2", "10.5.0.5", "10.5.0.1").unwrap_err();
        assert_eq!(
            err,
            ToynetError::GatewayNotFound {
                gateway: "10.5.0.1".to_string()
            }
        );
    }

    #[test]
    fn test_add_switch_accepts_duplicates() {
        let next = add_switch(&base(), "s1");
        assert_eq!(next.device_names(DeviceKind::Switch), vec!["s1", "s2", "s1"]);
    }

    #[test]
    fn test_delete_linked_device_rejected() {
        let topo = base();
        let before = topo.serialize().unwrap();

        let err = delete_device(&topo, DeviceKind::Host, "h1").unwrap_err();
        assert!(err.is_device_in_use());
        assert_eq!(topo.serialize().unwrap(), before);
    }

    #[test]
    fn test_delete_checks_links_across_kinds() {
        // "s1" is linked; asking to delete a host named s1 is still rejected
        let err = delete_device(&base(), DeviceKind::Host, "s1").unwrap_err();
        assert!(err.is_device_in_use());
    }

    #[test]
    fn test_delete_unlinked_device() {
        let next = delete_device(&base(), DeviceKind::Switch, "s2").unwrap();
        assert_eq!(next.device_names(DeviceKind::Switch), vec!["s1"]);

        let next = delete_device(&base(), DeviceKind::Host, "h9").unwrap();
        assert_eq!(next.device_names(DeviceKind::Host), vec!["h1"]);
    }

    #[test]
    fn test_delete_removes_first_match_only() {
        let topo = add_switch(&add_switch(&base(), "dup"), "dup");
        let next = delete_device(&topo, DeviceKind::Switch, "dup").unwrap();
        assert_eq!(next.device_names(DeviceKind::Switch), vec!["s1", "s2", "dup"]);
    }

    #[test]
    fn test_delete_unknown_device_is_noop() {
        let topo = base();
        let next = delete_device(&topo, DeviceKind::Router, "R42").unwrap();
        assert_eq!(next, topo);
    }

    #[test]
    fn test_add_and_remove_link() {
        let topo = base();
        let linked = add_link(&topo, "s2", "h9").unwrap();
        assert!(linked.is_linked("h9"));
        assert!(delete_device(&linked, DeviceKind::Host, "h9").is_err());

        let unlinked = remove_link(&linked, "h9", "s2").unwrap();
        assert_eq!(unlinked, topo);
    }

    #[test]
    fn test_add_link_unknown_endpoint() {
        let err = add_link(&base(), "s1", "ghost").unwrap_err();
        assert!(err.is_not_found());
        assert!(remove_link(&base(), "s2", "h9").unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_router() {
        let next = add_router(&base(), "R3", vec!["10.9.0.1/24".to_string()]);
        let host = add_host(&next, "h7", "10.9.0.7", "10.9.0.1").unwrap();
        assert_eq!(host.host("h7").unwrap().default_router.as_ref().unwrap().name, "R3");
    }
}
