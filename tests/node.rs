// ABOUTME: Integration tests for the node facade workflows.
// ABOUTME: Launch, route, decommission, images, networks and status over a fake runtime.

mod support;

use nodeapi::lifecycle::{CreateOptions, LifecycleError};
use nodeapi::node::NodeError;
use nodeapi::runtime::{ContainerState, NetworkError};
use nodeapi::types::{ContainerId, ContainerName};
use std::sync::Arc;
use support::{FakeContainer, FakeHostProbe, FakeRuntime};

fn name(value: &str) -> ContainerName {
    ContainerName::new(value).unwrap()
}

mod containers {
    use super::*;

    #[tokio::test]
    async fn launch_creates_starts_and_routes() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let node = support::node(runtime.clone(), dir.path());

        let id = node
            .launch("alpine:latest", &name("demo"), &CreateOptions::default())
            .await
            .unwrap();

        let container = runtime.container(id.as_str()).unwrap();
        assert_eq!(container.state, ContainerState::Running);

        let ip = node.container_ip(&id).await.unwrap();
        let snippet = std::fs::read_to_string(node.routes().snippet_path(&name("demo"))).unwrap();
        assert!(snippet.contains(&format!("proxy_pass http://{}:5801;", ip)));
        assert!(dir.path().join("logs/node-1/demo").is_dir());
        assert_eq!(node.routes().reloader().reloads().len(), 1);
    }

    #[tokio::test]
    async fn launch_with_taken_name_reports_the_create_step() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(
            FakeRuntime::new()
                .with_container(FakeContainer::new("c1", "demo", ContainerState::Running)),
        );
        let node = support::node(runtime.clone(), dir.path());

        let err = node
            .launch("alpine:latest", &name("demo"), &CreateOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NodeError::Lifecycle {
                step: "create",
                source: LifecycleError::NameConflict(_)
            }
        ));
        assert_eq!(runtime.count("start"), 0);
    }

    #[tokio::test]
    async fn start_and_route_uses_the_runtime_name() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new().with_container(
            FakeContainer::new("c1", "web", ContainerState::Exited).with_ip("10.88.0.9"),
        ));
        let node = support::node(runtime, dir.path());

        let result = node.start_and_route(&ContainerId::new("c1")).await.unwrap();

        assert_eq!(result.state, ContainerState::Running);
        let snippet = std::fs::read_to_string(node.routes().snippet_path(&name("web"))).unwrap();
        assert!(snippet.contains("location /web/ttyd/ {"));
        assert!(snippet.contains("proxy_pass http://10.88.0.9:7681;"));
    }

    #[tokio::test]
    async fn container_without_address_is_not_routed() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(
            FakeRuntime::new().with_container(FakeContainer::new("c1", "web", ContainerState::Exited)),
        );
        let node = support::node(runtime, dir.path());

        let err = node.start_and_route(&ContainerId::new("c1")).await.unwrap_err();

        assert!(matches!(err, NodeError::NoAddress(_)));
        assert!(!node.routes().snippet_path(&name("web")).exists());
    }

    #[tokio::test]
    async fn decommission_removes_container_route_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let node = support::node(runtime.clone(), dir.path());
        let id = node
            .launch("alpine:latest", &name("demo"), &CreateOptions::default())
            .await
            .unwrap();

        node.decommission(&id, &name("demo")).await.unwrap();

        assert!(runtime.container(id.as_str()).is_none());
        assert!(!node.routes().snippet_path(&name("demo")).exists());
        assert!(!dir.path().join("logs/node-1/demo").exists());
        assert_eq!(runtime.count("stop"), 1);
    }

    #[tokio::test]
    async fn decommission_tolerates_a_missing_route() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new());
        let node = support::node(runtime.clone(), dir.path());
        let id = node
            .create("alpine:latest", &name("quiet"), &CreateOptions::default())
            .await
            .unwrap();

        node.decommission(&id, &name("quiet")).await.unwrap();

        assert!(runtime.container("quiet").is_none());
    }

    #[tokio::test]
    async fn stop_goes_through_the_coordinator() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(
            FakeRuntime::new().with_container(FakeContainer::new("c1", "web", ContainerState::Exited)),
        );
        let node = support::node(runtime, dir.path());

        let err = node.stop(&ContainerId::new("c1")).await.unwrap_err();

        assert!(matches!(
            err,
            NodeError::Lifecycle {
                step: "stop",
                source: LifecycleError::AlreadyInState { .. }
            }
        ));
    }
}

mod images_and_networks {
    use super::*;

    #[tokio::test]
    async fn removing_an_image_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(FakeRuntime::new().with_image("sha256:abc", "alpine:latest"));
        let node = support::node(runtime.clone(), dir.path());

        assert_eq!(node.list_images().await.unwrap().len(), 1);
        node.remove_image("alpine:latest").await.unwrap();
        node.remove_image("alpine:latest").await.unwrap();

        assert!(runtime.images().is_empty());
    }

    #[tokio::test]
    async fn created_network_can_be_attached_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(
            FakeRuntime::new().with_container(FakeContainer::new("c1", "web", ContainerState::Running)),
        );
        let node = support::node(runtime, dir.path());

        node.create_network("lab", "172.20.0.0/16", "172.20.0.1")
            .await
            .unwrap();
        let networks = node.list_networks().await.unwrap();
        let lab = networks.iter().find(|n| n.name == "lab").unwrap();
        assert_eq!(lab.driver, "bridge");
        assert_eq!(lab.subnets, vec!["172.20.0.0/16"]);

        let ip = node.attach_container(&ContainerId::new("c1"), "lab").await.unwrap();
        assert!(ip.starts_with("172.20.0."));

        node.remove_network("lab").await.unwrap();
        assert!(node.list_networks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn removing_an_unknown_network_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let node = support::node(Arc::new(FakeRuntime::new()), dir.path());

        let err = node.remove_network("ghost").await.unwrap_err();

        assert!(matches!(err, NodeError::Network(NetworkError::NotFound(_))));
    }
}

mod status {
    use super::*;

    #[tokio::test]
    async fn status_counts_every_container() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = Arc::new(
            FakeRuntime::new()
                .with_container(FakeContainer::new("c1", "a", ContainerState::Running))
                .with_container(FakeContainer::new("c2", "b", ContainerState::Exited))
                .with_container(FakeContainer::new("c3", "c", ContainerState::Created)),
        );
        let node = support::node(runtime, dir.path());

        let status = node.status(&FakeHostProbe::new("node-1")).await.unwrap();

        assert_eq!(status.host.num_containers, 3);
        assert_eq!(status.containers.len(), 3);
        assert_eq!(status.host.os_name, "Debian GNU/Linux");
    }
}
