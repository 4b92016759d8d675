// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - argument parsing and state files

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use crate::{load_config, load_state, save_state, Cli, Command, NetworkCommand, ZoneCommand};
    use zonereg::model::NewHost;
    use zonereg::registry::Registry;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serial_with_date() {
        let cli = Cli::try_parse_from([
            "zonereg",
            "serial",
            "--date",
            "2024-03-15",
            "--previous",
            "2024031507",
        ])
        .unwrap();

        match cli.command {
            Command::Serial { date, previous } => {
                assert_eq!(date.unwrap().to_string(), "2024-03-15");
                assert_eq!(previous, Some(2_024_031_507));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_zone_create_with_nameservers() {
        let cli = Cli::try_parse_from([
            "zonereg",
            "--state",
            "/tmp/state.json",
            "zone",
            "create",
            "example.org",
            "--email",
            "hostmaster@example.org",
            "--ns",
            "ns1.example.org",
            "ns2.example.org",
        ])
        .unwrap();

        assert_eq!(cli.state.to_str(), Some("/tmp/state.json"));
        match cli.command {
            Command::Zone {
                command:
                    ZoneCommand::Create {
                        name,
                        nameservers,
                        primary,
                        ..
                    },
            } => {
                assert_eq!(name, "example.org");
                assert_eq!(nameservers, vec!["ns1.example.org", "ns2.example.org"]);
                assert!(primary.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_zone_create_requires_a_nameserver() {
        let result = Cli::try_parse_from([
            "zonereg",
            "zone",
            "create",
            "example.org",
            "--email",
            "hostmaster@example.org",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_network_rejects_bad_prefix() {
        assert!(Cli::try_parse_from(["zonereg", "network", "report", "10.0.0.0/33"]).is_err());
        assert!(Cli::try_parse_from(["zonereg", "network", "delete", "10.0.0.1/24"]).is_err());

        let cli =
            Cli::try_parse_from(["zonereg", "network", "create", "10.0.0.0/24", "--vlan", "12"])
                .unwrap();
        match cli.command {
            Command::Network {
                command: NetworkCommand::Create { network, vlan, .. },
            } => {
                assert_eq!(network.to_string(), "10.0.0.0/24");
                assert_eq!(vlan, Some(12));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_missing_state_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_state(&dir.path().join("absent.json")).unwrap();
        assert!(state.hosts.is_empty());
        assert_eq!(state.last_id, 0);
    }

    #[test]
    fn test_state_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut registry = Registry::new(load_config(None).unwrap());
        registry
            .create_host(NewHost {
                name: "www.example.org".to_string(),
                ip: Some("10.0.0.1".parse().unwrap()),
                ..Default::default()
            })
            .unwrap();

        save_state(&path, registry.state()).unwrap();
        let loaded = load_state(&path).unwrap();

        assert_eq!(&loaded, registry.state());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_corrupt_state_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_state(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse state"));
    }

    #[test]
    fn test_invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zonereg.yaml");
        std::fs::write(&path, "soa:\n  refresh: 0\n").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }
}
