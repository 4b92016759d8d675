// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `model.rs`

#[cfg(test)]
mod tests {
    use crate::model::*;
    use chrono::{TimeZone, Utc};

    fn zone(kind: ZoneKind) -> Zone {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Zone {
            id: ZoneId(7),
            name: "0.10.in-addr.arpa".to_string(),
            kind,
            primary_ns: "ns1.example.org".to_string(),
            email: "hostmaster@example.org".to_string(),
            serialno: 2_024_010_100,
            serialno_updated_at: at,
            refresh: 10_800,
            retry: 3600,
            expire: 1_814_400,
            ttl: 43_200,
            nameservers: vec![NameServerId(1)],
            updated: true,
            updated_at: at,
            created_at: at,
        }
    }

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&HostId(42)).unwrap(), "42");
        assert_eq!(HostId(42).to_string(), "42");
        assert_eq!(u64::from(ZoneId(3)), 3);
    }

    #[test]
    fn test_zone_kind_is_flattened_with_tag() {
        let reverse = zone(ZoneKind::Reverse {
            network: "10.0.0.0/16".parse().unwrap(),
        });
        let json = serde_json::to_value(&reverse).unwrap();
        assert_eq!(json["kind"], "reverse");
        assert_eq!(json["network"], "10.0.0.0/16");
        assert_eq!(json["primaryNs"], "ns1.example.org");

        let back: Zone = serde_json::from_value(json).unwrap();
        assert_eq!(back, reverse);

        let forward = zone(ZoneKind::Forward);
        let json = serde_json::to_value(&forward).unwrap();
        assert_eq!(json["kind"], "forward");
        assert!(json.get("network").is_none());
    }

    #[test]
    fn test_zone_kind_helpers() {
        let net = "10.0.0.128/25".parse().unwrap();
        assert!(ZoneKind::Reverse { network: net }.is_reverse());
        assert_eq!(ZoneKind::Reverse { network: net }.network(), Some(net));
        assert_eq!(ZoneKind::Forward.network(), None);
    }

    #[test]
    fn test_ptr_override_provenance() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut ptr = PtrOverride {
            id: PtrOverrideId(1),
            host: HostId(2),
            ip: "10.0.0.1".parse().unwrap(),
            provenance: Provenance::Auto,
            created_at: at,
        };
        assert!(ptr.is_auto());
        ptr.provenance = Provenance::Explicit;
        assert!(!ptr.is_auto());
        assert_eq!(
            serde_json::to_value(ptr.provenance).unwrap(),
            serde_json::json!("explicit")
        );
    }

    #[test]
    fn test_state_snapshot_with_id_keys() {
        let mut state = RegistryState::default();
        state.zones.insert(ZoneId(7), zone(ZoneKind::Forward));
        state.last_id = 8;

        let json = serde_json::to_string(&state).unwrap();
        let back: RegistryState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);

        let empty: RegistryState = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, RegistryState::default());
    }

    #[test]
    fn test_new_network_defaults() {
        let request = NewNetwork::new("10.0.0.0/24".parse().unwrap());
        assert!(request.reserved.is_none());
        assert!(!request.frozen);

        let parsed: NewNetwork = serde_json::from_str(r#"{"network": "10.1.0.0/16"}"#).unwrap();
        assert_eq!(parsed.network.to_string(), "10.1.0.0/16");
        assert!(parsed.vlan.is_none());
    }
}
