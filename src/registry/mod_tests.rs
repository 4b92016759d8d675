// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for registry construction, snapshots and transactions.

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::audit::ChangeAction;
    use crate::config::RegistryConfig;
    use crate::model::{HostId, NewHost, RegistryState};
    use crate::registry::test_fixtures::*;
    use crate::registry::Registry;

    #[test]
    fn test_ids_are_shared_across_tables() {
        let mut f = fixture();
        let first = host(&mut f.registry, "a.example.org", None);
        let created = zone(&mut f.registry, "example.org");
        let second = host(&mut f.registry, "b.example.org", None);

        assert_eq!(first.id, HostId(1));
        assert!(created.id.0 > first.id.0);
        assert!(second.id.0 > created.id.0);
        assert_eq!(f.registry.state().last_id, second.id.0);
    }

    #[test]
    fn test_snapshot_round_trip_through_json() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        host(&mut f.registry, "a.example.org", Some("10.0.0.1"));
        host(&mut f.registry, "b.example.org", Some("10.0.0.1"));

        let json = serde_json::to_string(f.registry.state()).unwrap();
        let state: RegistryState = serde_json::from_str(&json).unwrap();
        let mut reloaded = Registry::from_state(state, RegistryConfig::default());

        assert!(reloaded.verify().is_empty());
        assert_eq!(reloaded.address_owners(ip("10.0.0.1")).len(), 2);
        assert!(reloaded.ptr_override_for(ip("10.0.0.1")).is_some());
        assert!(reloaded.host_by_name("a.example.org").is_some());
        assert!(reloaded.resolve_zone("a.example.org").is_some());

        let third = reloaded
            .create_host(NewHost {
                name: "c.example.org".to_string(),
                ..Default::default()
            })
            .unwrap();
        assert!(third.id.0 > f.registry.state().last_id);
    }

    #[test]
    fn test_from_state_raises_stale_counters() {
        let mut f = fixture();
        host(&mut f.registry, "a.example.org", Some("10.0.0.1"));
        let mut state = f.registry.state().clone();
        state.last_id = 0;
        state.last_acquired = 0;

        let mut reloaded = Registry::from_state(state, RegistryConfig::default());
        let next = reloaded
            .create_host(NewHost {
                name: "b.example.org".to_string(),
                ip: Some(ip("10.0.0.1")),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(reloaded.state().hosts.len(), 2);
        assert!(next.id.0 > f.registry.state().last_id);
        let owners = reloaded.address_owners(ip("10.0.0.1"));
        assert_eq!(owners[1], next.id);
    }

    #[test]
    fn test_commit_flushes_audit_with_transaction_time() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        f.clock.advance(Duration::minutes(5));
        let before = f.audit.len();

        host(&mut f.registry, "a.example.org", Some("10.0.0.1"));

        let entries = f.audit.entries();
        let new: Vec<_> = entries[before..].to_vec();
        let tables: Vec<&str> = new.iter().map(|e| e.table_name.as_str()).collect();
        assert_eq!(tables, vec!["hosts", "ipaddresses"]);
        assert!(new.iter().all(|e| e.action == ChangeAction::Saved));
        assert!(new
            .iter()
            .all(|e| e.timestamp == start_time() + Duration::minutes(5)));
    }

    #[test]
    fn test_zone_dirty_marking_uses_clock() {
        let mut f = fixture();
        zone(&mut f.registry, "example.org");
        publish_all(&mut f.registry);
        f.clock.advance(Duration::hours(2));

        host(&mut f.registry, "a.example.org", None);

        let stored = f.registry.zone("example.org").unwrap();
        assert!(stored.updated);
        assert_eq!(stored.updated_at, start_time() + Duration::hours(2));
    }

    #[test]
    fn test_debug_reports_table_sizes() {
        let mut f = fixture();
        host(&mut f.registry, "a.example.org", None);
        let rendered = format!("{:?}", f.registry);
        assert!(rendered.contains("hosts: 1"));
    }
}
