pub mod docker;

pub use docker::*;

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{EventActor, EventMessage};
    use gantry_models::{Config, ServiceSpec, Variant};
    use std::collections::HashMap;

    fn run_spec_for(variant: Variant) -> RunSpec {
        let config = Config::default();
        let mut spec = ServiceSpec::new("web-app", "/tmp/web-app", variant).unwrap();
        spec.environment
            .insert("APP_ENV".to_string(), "prod".to_string());
        let process = spec.process_spec(&config.server);
        RunSpec::for_service("gantry/web-app:abc123", &process, &spec, &config)
    }

    #[test]
    fn test_container_name_generation() {
        let run = run_spec_for(Variant::Server);
        assert!(run.name.starts_with("gantry-web-app-"));
        assert_eq!(run.image, "gantry/web-app:abc123");
    }

    #[test]
    fn test_server_ports_published_on_all_interfaces() {
        let run = run_spec_for(Variant::Server);
        assert_eq!(
            run.ports,
            vec![PortPublish {
                container_port: 3000,
                host_ip: "0.0.0.0".to_string(),
                host_port: 3000,
            }]
        );
    }

    #[test]
    fn test_script_publishes_no_ports() {
        let run = run_spec_for(Variant::Script);
        assert!(run.ports.is_empty());
    }

    #[test]
    fn test_unbuffered_env_only_in_verbose() {
        let unbuffered = ("PYTHONUNBUFFERED".to_string(), "1".to_string());
        assert!(!run_spec_for(Variant::Server).env.contains(&unbuffered));
        assert!(run_spec_for(Variant::ServerVerbose).env.contains(&unbuffered));
    }

    #[test]
    fn test_custom_environment_passed_through() {
        let run = run_spec_for(Variant::Script);
        assert!(run
            .env
            .contains(&("APP_ENV".to_string(), "prod".to_string())));
    }

    #[test]
    fn test_service_labels() {
        let run = run_spec_for(Variant::ServerVerbose);
        assert!(run
            .labels
            .contains(&("gantry.service".to_string(), "web-app".to_string())));
        assert!(run
            .labels
            .contains(&("gantry.variant".to_string(), "server-verbose".to_string())));
    }

    #[test]
    fn test_parse_die_event() {
        let mut attributes = HashMap::new();
        attributes.insert("exitCode".to_string(), "137".to_string());
        let event = EventMessage {
            action: Some("die".to_string()),
            actor: Some(EventActor {
                id: Some("ctr-1".to_string()),
                attributes: Some(attributes),
            }),
            ..Default::default()
        };

        match docker::parse_docker_event(event) {
            Some(ContainerEvent::Die {
                container_id,
                exit_code,
            }) => {
                assert_eq!(container_id, "ctr-1");
                assert_eq!(exit_code, Some(137));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_event_ignores_unrelated_actions() {
        let event = EventMessage {
            action: Some("exec_create".to_string()),
            actor: Some(EventActor {
                id: Some("ctr-1".to_string()),
                attributes: None,
            }),
            ..Default::default()
        };
        assert!(docker::parse_docker_event(event).is_none());
    }
}
