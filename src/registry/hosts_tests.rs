// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for host operations.

#[cfg(test)]
mod tests {
    use crate::model::{HostUpdate, NewCname, NewHost, NewMx, NewNetwork};
    use crate::registry::test_fixtures::*;
    use crate::registry_errors::{ErrorKind, RegistryError, ValidationError};

    #[test]
    fn test_create_host_resolves_zone_and_marks_it_dirty() {
        let mut f = fixture();
        let example = zone(&mut f.registry, "example.org");
        publish_all(&mut f.registry);

        let created = host(&mut f.registry, "www.example.org", None);

        assert_eq!(created.zone, Some(example.id));
        assert!(is_dirty(&f.registry, "example.org"));
        assert_eq!(f.registry.host_by_name("WWW.example.org.").unwrap().id, created.id);
    }

    #[test]
    fn test_create_host_outside_any_zone() {
        let mut f = fixture();
        let created = host(&mut f.registry, "www.example.net", None);
        assert_eq!(created.zone, None);
    }

    #[test]
    fn test_single_label_only_for_zone_apex() {
        let mut f = fixture();
        let err = f
            .registry
            .create_host(NewHost {
                name: "localhost".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.status_reason(), "SingleLabel");

        let org = zone(&mut f.registry, "org");
        let apex = host(&mut f.registry, "org", None);
        assert_eq!(apex.zone, Some(org.id));
    }

    #[test]
    fn test_create_host_with_ip_dirties_reverse_zone() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        zone(&mut f.registry, "0.10.in-addr.arpa");
        publish_all(&mut f.registry);

        let created = host(&mut f.registry, "h1.example.org", Some("10.0.1.5"));

        let rows = f.registry.host_addresses(created.id);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ip, ip("10.0.1.5"));
        assert!(is_dirty(&f.registry, "example.org"));
        assert!(is_dirty(&f.registry, "0.10.in-addr.arpa"));
    }

    #[test]
    fn test_duplicate_host_name_is_conflict() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        host(&mut f.registry, "h1.example.org", None);

        let err = f
            .registry
            .create_host(NewHost {
                name: "H1.example.org".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_host_name_used_by_cname_is_conflict() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        let target = host(&mut f.registry, "h1.example.org", None);
        f.registry
            .create_cname(NewCname {
                name: "alias.example.org".to_string(),
                host: target.id,
                ttl: None,
            })
            .unwrap();

        let err = f
            .registry
            .create_host(NewHost {
                name: "alias.example.org".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_create_host_validates_fields() {
        let mut f = fixture();
        let bad_ttl = f
            .registry
            .create_host(NewHost {
                name: "h1.example.org".to_string(),
                ttl: Some(100_000_000_000),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            bad_ttl,
            RegistryError::Validation(ValidationError::InvalidTtl {
                value: 100_000_000_000
            })
        );

        let bad_contact = f
            .registry
            .create_host(NewHost {
                name: "h1.example.org".to_string(),
                contact: "not-an-address".to_string(),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(bad_contact.status_reason(), "InvalidEmail");

        let ok = f
            .registry
            .create_host(NewHost {
                name: "h1.example.org".to_string(),
                ttl: Some(0),
                loc: Some("52 14 05 N 00 08 50 E 10m".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ok.ttl, Some(0));
    }

    #[test]
    fn test_unknown_hinfo_preset_is_not_found() {
        let mut f = fixture();
        let err = f
            .registry
            .create_host(NewHost {
                name: "h1.example.org".to_string(),
                hinfo: Some(crate::model::HinfoPresetId(999)),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_rename_moves_host_between_zones() {
        let mut f = fixture();
        let org = zone(&mut f.registry, "example.org");
        let net = zone(&mut f.registry, "example.net");
        let created = host(&mut f.registry, "a.example.org", None);
        assert_eq!(created.zone, Some(org.id));
        publish_all(&mut f.registry);

        let renamed = f
            .registry
            .update_host(
                created.id,
                HostUpdate {
                    name: Some("a.example.net".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(renamed.zone, Some(net.id));
        assert!(is_dirty(&f.registry, "example.org"));
        assert!(is_dirty(&f.registry, "example.net"));
        assert!(f.registry.host_by_name("a.example.org").is_none());
        assert!(f.registry.host_by_name("a.example.net").is_some());
    }

    #[test]
    fn test_rename_dirties_reverse_zone_of_addresses() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        zone(&mut f.registry, "0.10.in-addr.arpa");
        let created = host(&mut f.registry, "a.example.org", Some("10.0.0.1"));
        publish_all(&mut f.registry);

        f.registry
            .update_host(
                created.id,
                HostUpdate {
                    name: Some("b.example.org".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(is_dirty(&f.registry, "0.10.in-addr.arpa"));
    }

    #[test]
    fn test_rename_onto_existing_host_is_conflict() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        let first = host(&mut f.registry, "a.example.org", None);
        host(&mut f.registry, "b.example.org", None);

        let err = f
            .registry
            .update_host(
                first.id,
                HostUpdate {
                    name: Some("b.example.org".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(f.registry.host(first.id).unwrap().name, "a.example.org");
    }

    #[test]
    fn test_rename_onto_zone_nameserver_is_conflict() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        let created = host(&mut f.registry, "a.example.org", None);

        let err = f
            .registry
            .update_host(
                created.id,
                HostUpdate {
                    name: Some("ns2.example.org".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(f.registry.host(created.id).unwrap().name, "a.example.org");

        let renamed = f
            .registry
            .update_host(
                created.id,
                HostUpdate {
                    name: Some("ns3.example.org".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "ns3.example.org");
    }

    #[test]
    fn test_contact_change_does_not_dirty_zone() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        let created = host(&mut f.registry, "a.example.org", None);
        publish_all(&mut f.registry);

        let updated = f
            .registry
            .update_host(
                created.id,
                HostUpdate {
                    contact: Some("new@example.org".to_string()),
                    comment: Some(Some("rack 4".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.contact, "new@example.org");
        assert_eq!(updated.comment.as_deref(), Some("rack 4"));
        assert!(!is_dirty(&f.registry, "example.org"));
    }

    #[test]
    fn test_ttl_change_dirties_zone() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        let created = host(&mut f.registry, "a.example.org", None);
        publish_all(&mut f.registry);

        f.registry
            .update_host(
                created.id,
                HostUpdate {
                    ttl: Some(Some(300)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(is_dirty(&f.registry, "example.org"));
    }

    #[test]
    fn test_delete_host_cascades_attached_records() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        let doomed = host(&mut f.registry, "a.example.org", Some("10.0.0.1"));
        f.registry
            .create_cname(NewCname {
                name: "alias.example.org".to_string(),
                host: doomed.id,
                ttl: None,
            })
            .unwrap();
        f.registry.create_txt(doomed.id, "v=spf1 -all").unwrap();
        f.registry
            .create_mx(NewMx {
                host: doomed.id,
                priority: 10,
                mx: "mail.example.org".to_string(),
            })
            .unwrap();
        publish_all(&mut f.registry);

        f.registry.delete_host(doomed.id).unwrap();

        let state = f.registry.state();
        assert!(state.hosts.is_empty());
        assert!(state.cnames.is_empty());
        assert!(state.txts.is_empty());
        assert!(state.mxs.is_empty());
        assert!(state.ipaddresses.is_empty());
        assert!(f.registry.cname_by_name("alias.example.org").is_none());
        assert!(is_dirty(&f.registry, "example.org"));
        assert!(f.registry.verify().is_empty());
    }

    #[test]
    fn test_delete_host_removes_overrides_targeting_it() {
        let mut f = fixture();
        let first = host(&mut f.registry, "a.example.org", Some("10.0.0.1"));
        let second = host(&mut f.registry, "b.example.org", Some("10.0.0.1"));
        assert_eq!(f.registry.ptr_override_for(ip("10.0.0.1")).unwrap().host, first.id);

        f.registry.delete_host(first.id).unwrap();

        assert!(f.registry.ptr_override_for(ip("10.0.0.1")).is_none());
        assert_eq!(f.registry.address_owners(ip("10.0.0.1")), vec![second.id]);
        assert!(f.registry.verify().is_empty());
    }

    #[test]
    fn test_delete_host_in_frozen_network_is_forbidden() {
        let mut f = fixture();
        let mut request = NewNetwork::new("10.0.0.0/24".parse().unwrap());
        request.frozen = true;
        let created = host(&mut f.registry, "a.example.org", None);
        f.registry
            .create_ipaddress(crate::model::NewIpaddress {
                host: created.id,
                ip: ip("10.0.0.9"),
                mac: None,
            })
            .unwrap();
        f.registry.create_network(request).unwrap();
        let audited = f.audit.len();

        let err = f.registry.delete_host(created.id).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(f.registry.host(created.id).is_some());
        assert_eq!(f.audit.len(), audited);
    }

    #[test]
    fn test_rejected_mutation_leaves_no_trace() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        host(&mut f.registry, "a.example.org", None);
        publish_all(&mut f.registry);
        let audited = f.audit.len();
        let before = f.registry.state().clone();

        assert!(f
            .registry
            .create_host(NewHost {
                name: "a.example.org".to_string(),
                ip: Some(ip("10.0.0.1")),
                ..Default::default()
            })
            .is_err());

        assert_eq!(f.registry.state(), &before);
        assert_eq!(f.audit.len(), audited);
        assert!(!is_dirty(&f.registry, "example.org"));
    }

    #[test]
    fn test_host_changes_are_audited() {
        let mut f = fixture();
        let created = host(&mut f.registry, "a.example.org", None);
        f.registry.delete_host(created.id).unwrap();

        let history = f.audit.history("hosts", created.id.0);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, crate::audit::ChangeAction::Saved);
        assert_eq!(history[1].action, crate::audit::ChangeAction::Deleted);
        assert_eq!(history[0].data["name"], "a.example.org");
        assert_eq!(history[0].timestamp, start_time());
    }
}
