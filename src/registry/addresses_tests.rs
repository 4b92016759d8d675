// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for address rows and PTR overrides.

#[cfg(test)]
mod tests {
    use crate::config::RegistryConfig;
    use crate::model::{HostId, Ipaddress, IpaddressUpdate, NewIpaddress, NewNetwork, Provenance};
    use crate::registry::test_fixtures::*;
    use crate::registry::Registry;
    use crate::registry_errors::ErrorKind;

    fn assign(registry: &mut Registry, host: HostId, address: &str, mac: Option<&str>) -> Ipaddress {
        registry
            .create_ipaddress(NewIpaddress {
                host,
                ip: ip(address),
                mac: mac.map(str::to_string),
            })
            .unwrap()
    }

    fn network(registry: &mut Registry, range: &str, vlan: Option<u16>) {
        let mut request = NewNetwork::new(range.parse().unwrap());
        request.vlan = vlan;
        registry.create_network(request).unwrap();
    }

    // ========================================================================
    // Automatic PTR overrides
    // ========================================================================

    #[test]
    fn test_second_owner_creates_auto_override_for_earliest() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        assert!(f.registry.ptr_override_for(ip("10.0.0.5")).is_none());

        let second = host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));

        let ptr = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap();
        assert_eq!(ptr.host, first.id);
        assert_eq!(ptr.provenance, Provenance::Auto);
        assert_eq!(
            f.registry.address_owners(ip("10.0.0.5")),
            vec![first.id, second.id]
        );
    }

    #[test]
    fn test_third_owner_keeps_existing_override() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));
        let before = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap().id;

        host(&mut f.registry, "h3.example.org", Some("10.0.0.5"));

        let ptr = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap();
        assert_eq!(ptr.id, before);
        assert_eq!(ptr.host, first.id);
        assert_eq!(f.registry.state().ptr_overrides.len(), 1);
    }

    #[test]
    fn test_delete_to_single_owner_removes_auto_override() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        let second = host(&mut f.registry, "h2.example.org", None);
        let row = assign(&mut f.registry, second.id, "10.0.0.5", None);

        f.registry.delete_ipaddress(row.id).unwrap();

        assert!(f.registry.ptr_override_for(ip("10.0.0.5")).is_none());
        assert_eq!(f.registry.address_owners(ip("10.0.0.5")), vec![first.id]);
        assert!(f.registry.verify().is_empty());
    }

    #[test]
    fn test_override_survives_while_two_owners_remain() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", None);
        let first_row = assign(&mut f.registry, first.id, "10.0.0.5", None);
        host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));
        host(&mut f.registry, "h3.example.org", Some("10.0.0.5"));

        f.registry.delete_ipaddress(first_row.id).unwrap();

        let ptr = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap();
        assert_eq!(ptr.host, first.id);
        assert!(ptr.is_auto());
    }

    #[test]
    fn test_override_kept_when_remaining_owner_is_not_its_host() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", None);
        let second = host(&mut f.registry, "h2.example.org", None);
        let third = host(&mut f.registry, "h3.example.org", None);
        let first_row = assign(&mut f.registry, first.id, "10.0.0.1", None);
        let second_row = assign(&mut f.registry, second.id, "10.0.0.1", None);
        let third_row = assign(&mut f.registry, third.id, "10.0.0.1", None);

        f.registry.delete_ipaddress(first_row.id).unwrap();
        f.registry.delete_ipaddress(second_row.id).unwrap();

        let ptr = f.registry.ptr_override_for(ip("10.0.0.1")).unwrap();
        assert_eq!(ptr.host, first.id);
        assert!(ptr.is_auto());
        assert_eq!(f.registry.address_owners(ip("10.0.0.1")), vec![third.id]);
        assert!(f.registry.verify().is_empty());

        f.registry.delete_ipaddress(third_row.id).unwrap();

        assert!(f.registry.ptr_override_for(ip("10.0.0.1")).is_none());
        assert!(f.registry.verify().is_empty());
    }

    #[test]
    fn test_explicit_override_survives_single_owner() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        let second = host(&mut f.registry, "h2.example.org", None);
        let row = assign(&mut f.registry, second.id, "10.0.0.5", None);
        f.registry.create_ptr_override(second.id, ip("10.0.0.5")).unwrap();

        f.registry.delete_ipaddress(row.id).unwrap();

        let ptr = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap();
        assert_eq!(ptr.provenance, Provenance::Explicit);
        assert_eq!(ptr.host, second.id);
        assert_eq!(f.registry.address_owners(ip("10.0.0.5")), vec![first.id]);
    }

    #[test]
    fn test_ptr_override_dirties_reverse_zone() {
        let mut f = fixture();
        zone(&mut f.registry, "0.0.10.in-addr.arpa");
        host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        publish_all(&mut f.registry);

        host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));

        assert!(is_dirty(&f.registry, "0.0.10.in-addr.arpa"));
    }

    // ========================================================================
    // Row validation
    // ========================================================================

    #[test]
    fn test_same_host_same_address_is_conflict() {
        let mut f = fixture();
        let created = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));

        let err = f
            .registry
            .create_ipaddress(NewIpaddress {
                host: created.id,
                ip: ip("10.0.0.5"),
                mac: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_unknown_host_is_not_found() {
        let mut f = fixture();
        let err = f
            .registry
            .create_ipaddress(NewIpaddress {
                host: HostId(42),
                ip: ip("10.0.0.5"),
                mac: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_mac_must_be_lowercase_colon_form() {
        let mut f = fixture();
        let created = host(&mut f.registry, "h1.example.org", None);

        let row = assign(&mut f.registry, created.id, "10.0.0.5", Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(row.mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));

        for bad in ["AA:BB:CC:DD:EE:FF", "aa-bb-cc-dd-ee-ff", "not-a-mac"] {
            let err = f
                .registry
                .create_ipaddress(NewIpaddress {
                    host: created.id,
                    ip: ip("10.0.0.6"),
                    mac: Some(bad.to_string()),
                })
                .unwrap_err();
            assert_eq!(err.status_reason(), "InvalidMacAddress", "{bad}");
        }
    }

    #[test]
    fn test_mac_unique_within_vlan() {
        let mut f = fixture();
        network(&mut f.registry, "10.0.0.0/24", Some(100));
        network(&mut f.registry, "10.0.1.0/24", Some(100));
        network(&mut f.registry, "10.0.2.0/24", Some(200));
        let created = host(&mut f.registry, "h1.example.org", None);
        assign(&mut f.registry, created.id, "10.0.0.5", Some("aa:bb:cc:dd:ee:ff"));

        let err = f
            .registry
            .create_ipaddress(NewIpaddress {
                host: created.id,
                ip: ip("10.0.1.5"),
                mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        assign(&mut f.registry, created.id, "10.0.2.5", Some("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn test_mac_scoped_by_network_when_vlan_scope_disabled() {
        let mut config = RegistryConfig::default();
        config.network.mac_scope_by_vlan = false;
        let mut f = fixture_with(config);
        network(&mut f.registry, "10.0.0.0/24", Some(100));
        network(&mut f.registry, "10.0.1.0/24", Some(100));
        let created = host(&mut f.registry, "h1.example.org", None);

        assign(&mut f.registry, created.id, "10.0.0.5", Some("aa:bb:cc:dd:ee:ff"));
        assign(&mut f.registry, created.id, "10.0.1.5", Some("aa:bb:cc:dd:ee:ff"));

        assert!(f
            .registry
            .create_ipaddress(NewIpaddress {
                host: created.id,
                ip: ip("10.0.0.6"),
                mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            })
            .is_err());
    }

    #[test]
    fn test_mac_outside_networks_is_scoped_per_family() {
        let mut f = fixture();
        let created = host(&mut f.registry, "h1.example.org", None);
        assign(&mut f.registry, created.id, "192.0.2.1", Some("aa:bb:cc:dd:ee:ff"));
        assign(&mut f.registry, created.id, "2001:db8::1", Some("aa:bb:cc:dd:ee:ff"));

        assert!(f
            .registry
            .create_ipaddress(NewIpaddress {
                host: created.id,
                ip: ip("198.51.100.1"),
                mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            })
            .is_err());
    }

    // ========================================================================
    // Address moves
    // ========================================================================

    #[test]
    fn test_update_ip_moves_row_through_both_paths() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        host(&mut f.registry, "h2.example.org", Some("10.0.0.6"));
        let row = assign(&mut f.registry, first.id, "10.0.0.9", None);
        let third = host(&mut f.registry, "h3.example.org", Some("10.0.0.5"));
        assert!(f.registry.ptr_override_for(ip("10.0.0.5")).is_some());

        let third_row = f.registry.host_addresses(third.id)[0].id;
        let moved = f
            .registry
            .update_ipaddress(
                third_row,
                IpaddressUpdate {
                    ip: Some(ip("10.0.0.9")),
                    mac: None,
                },
            )
            .unwrap();

        assert_eq!(moved.ip, ip("10.0.0.9"));
        assert!(moved.acquired > row.acquired);
        assert!(f.registry.ptr_override_for(ip("10.0.0.5")).is_none());
        let ptr = f.registry.ptr_override_for(ip("10.0.0.9")).unwrap();
        assert_eq!(ptr.host, first.id);
        assert_eq!(
            f.registry.address_owners(ip("10.0.0.9")),
            vec![first.id, third.id]
        );
        assert!(f.registry.verify().is_empty());
    }

    #[test]
    fn test_update_mac_only_keeps_owner_order() {
        let mut f = fixture();
        let created = host(&mut f.registry, "h1.example.org", None);
        let row = assign(&mut f.registry, created.id, "10.0.0.5", None);

        let updated = f
            .registry
            .update_ipaddress(
                row.id,
                IpaddressUpdate {
                    ip: None,
                    mac: Some(Some("00:11:22:33:44:55".to_string())),
                },
            )
            .unwrap();

        assert_eq!(updated.acquired, row.acquired);
        assert_eq!(updated.mac.as_deref(), Some("00:11:22:33:44:55"));
    }

    // ========================================================================
    // Frozen networks
    // ========================================================================

    #[test]
    fn test_frozen_network_rejects_address_changes() {
        let mut f = fixture();
        let created = host(&mut f.registry, "h1.example.org", None);
        let row = assign(&mut f.registry, created.id, "10.0.0.5", None);
        let mut request = NewNetwork::new("10.0.0.0/24".parse().unwrap());
        request.frozen = true;
        f.registry.create_network(request).unwrap();

        for err in [
            f.registry
                .create_ipaddress(NewIpaddress {
                    host: created.id,
                    ip: ip("10.0.0.6"),
                    mac: None,
                })
                .unwrap_err(),
            f.registry.delete_ipaddress(row.id).unwrap_err(),
            f.registry
                .create_ptr_override(created.id, ip("10.0.0.5"))
                .unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::Forbidden);
        }
        assert_eq!(f.registry.host_addresses(created.id).len(), 1);
    }

    // ========================================================================
    // Explicit overrides
    // ========================================================================

    #[test]
    fn test_explicit_override_claims_auto_override() {
        let mut f = fixture();
        host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        let second = host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));
        let auto = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap().id;

        let claimed = f
            .registry
            .create_ptr_override(second.id, ip("10.0.0.5"))
            .unwrap();

        assert_eq!(claimed.id, auto);
        assert_eq!(claimed.host, second.id);
        assert_eq!(claimed.provenance, Provenance::Explicit);
        assert_eq!(f.registry.state().ptr_overrides.len(), 1);
    }

    #[test]
    fn test_second_explicit_override_is_conflict() {
        let mut f = fixture();
        let first = host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        f.registry.create_ptr_override(first.id, ip("10.0.0.5")).unwrap();

        let err = f
            .registry
            .create_ptr_override(first.id, ip("10.0.0.5"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_override_for_unowned_address_counts_as_used() {
        let mut f = fixture();
        let created = host(&mut f.registry, "h1.example.org", None);
        let id = f
            .registry
            .create_network(NewNetwork::new("10.0.0.0/24".parse().unwrap()))
            .unwrap()
            .id;

        f.registry.create_ptr_override(created.id, ip("10.0.0.77")).unwrap();

        let usage = f.registry.network_usage(id).unwrap();
        assert!(usage.used().contains(&ip("10.0.0.77")));
    }

    #[test]
    fn test_update_ptr_override_makes_it_explicit() {
        let mut f = fixture();
        host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        let second = host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));
        let auto = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap().id;

        let updated = f.registry.update_ptr_override(auto, second.id).unwrap();

        assert_eq!(updated.host, second.id);
        assert!(!updated.is_auto());
    }

    #[test]
    fn test_deleted_override_is_not_resynthesized() {
        let mut f = fixture();
        host(&mut f.registry, "h1.example.org", Some("10.0.0.5"));
        host(&mut f.registry, "h2.example.org", Some("10.0.0.5"));
        let auto = f.registry.ptr_override_for(ip("10.0.0.5")).unwrap().id;

        f.registry.delete_ptr_override(auto).unwrap();

        assert!(f.registry.ptr_override_for(ip("10.0.0.5")).is_none());
        assert!(f.registry.ptr_override(auto).is_none());
    }
}
