// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `ptr.rs`

#[cfg(test)]
mod tests {
    use crate::model::{HostId, IpaddressId, Provenance, PtrOverride, PtrOverrideId};
    use crate::ptr::*;
    use chrono::Utc;
    use std::net::IpAddr;

    fn ip() -> IpAddr {
        "10.0.0.1".parse().unwrap()
    }

    fn owner(acquired: u64, host: u64) -> Owner {
        Owner {
            acquired,
            row: IpaddressId(acquired + 100),
            host: HostId(host),
        }
    }

    fn ptr(provenance: Provenance) -> PtrOverride {
        PtrOverride {
            id: PtrOverrideId(9),
            host: HostId(1),
            ip: ip(),
            provenance,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_single_owner_needs_no_override() {
        assert_eq!(after_insert(&[owner(1, 1)], None), PtrAction::Keep);
    }

    #[test]
    fn test_second_owner_creates_auto_override_for_earliest() {
        let owners = [owner(1, 1), owner(2, 2)];
        assert_eq!(
            after_insert(&owners, None),
            PtrAction::CreateAuto { host: HostId(1) }
        );
    }

    #[test]
    fn test_existing_override_is_untouched_on_insert() {
        let owners = [owner(1, 1), owner(2, 2), owner(3, 3)];
        assert_eq!(after_insert(&owners, Some(&ptr(Provenance::Auto))), PtrAction::Keep);
        assert_eq!(after_insert(&owners, Some(&ptr(Provenance::Explicit))), PtrAction::Keep);
    }

    #[test]
    fn test_auto_override_removed_when_its_host_is_sole_owner() {
        let auto = ptr(Provenance::Auto);
        assert_eq!(
            after_delete(&[owner(1, 1)], Some(&auto)),
            PtrAction::RemoveAuto { id: PtrOverrideId(9) }
        );
        assert_eq!(
            after_delete(&[], Some(&auto)),
            PtrAction::RemoveAuto { id: PtrOverrideId(9) }
        );
    }

    #[test]
    fn test_auto_override_kept_when_sole_owner_is_another_host() {
        let auto = ptr(Provenance::Auto);
        assert_eq!(after_delete(&[owner(3, 3)], Some(&auto)), PtrAction::Keep);
    }

    #[test]
    fn test_auto_override_kept_with_two_owners_left() {
        let owners = [owner(2, 2), owner(3, 3)];
        assert_eq!(after_delete(&owners, Some(&ptr(Provenance::Auto))), PtrAction::Keep);
    }

    #[test]
    fn test_explicit_override_never_removed() {
        let explicit = ptr(Provenance::Explicit);
        assert_eq!(after_delete(&[], Some(&explicit)), PtrAction::Keep);
        assert_eq!(after_delete(&[owner(1, 1)], Some(&explicit)), PtrAction::Keep);
        assert_eq!(after_delete(&[owner(1, 1)], None), PtrAction::Keep);
    }

    #[test]
    fn test_owner_order_follows_acquired_sequence() {
        let mut index = AddressIndex::new();
        index.add_owner(ip(), owner(5, 5));
        index.add_owner(ip(), owner(2, 2));
        index.add_owner(ip(), owner(9, 9));

        let hosts: Vec<u64> = index.owners(ip()).iter().map(|o| o.host.0).collect();
        assert_eq!(hosts, vec![2, 5, 9]);
        assert!(index.holds(ip(), HostId(5)));
        assert!(!index.holds(ip(), HostId(6)));

        assert_eq!(index.remove_owner(ip(), IpaddressId(102)), 2);
        assert_eq!(index.owners(ip())[0].host, HostId(5));
        assert_eq!(index.remove_owner(ip(), IpaddressId(105)), 1);
        assert_eq!(index.remove_owner(ip(), IpaddressId(109)), 0);
        assert!(index.owners(ip()).is_empty());
        assert_eq!(index.owned_in(ip()..=ip()).count(), 0);
    }

    #[test]
    fn test_override_and_range_queries() {
        let mut index = AddressIndex::new();
        let low: IpAddr = "10.0.0.0".parse().unwrap();
        let high: IpAddr = "10.0.0.255".parse().unwrap();
        let outside: IpAddr = "10.0.1.1".parse().unwrap();

        index.add_owner(ip(), owner(1, 1));
        index.add_owner(outside, owner(2, 2));
        index.set_override(ip(), PtrOverrideId(3));

        assert_eq!(index.owned_in(low..=high).collect::<Vec<_>>(), vec![ip()]);
        assert_eq!(
            index.overridden_in(low..=high).collect::<Vec<_>>(),
            vec![(ip(), PtrOverrideId(3))]
        );
        index.clear_override(ip());
        assert_eq!(index.override_for(ip()), None);
    }

    #[test]
    fn test_mac_index() {
        let mut index = AddressIndex::new();
        index.add_mac("aa:bb:cc:dd:ee:ff", IpaddressId(1));
        index.add_mac("aa:bb:cc:dd:ee:ff", IpaddressId(2));
        assert_eq!(index.rows_with_mac("aa:bb:cc:dd:ee:ff").count(), 2);

        index.remove_mac("aa:bb:cc:dd:ee:ff", IpaddressId(1));
        index.remove_mac("aa:bb:cc:dd:ee:ff", IpaddressId(2));
        assert_eq!(index.rows_with_mac("aa:bb:cc:dd:ee:ff").count(), 0);
    }
}
