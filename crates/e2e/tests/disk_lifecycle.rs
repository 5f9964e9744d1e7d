//! Disk and snapshot lifecycles driven end to end through the provider.

use altus_e2e::{server::REFRESH_TOKEN, MockPlatform};
use altus_provider::state::{get_int_attr, get_string_attr, int_value, make_state, string_value};
use altus_provider::{AltusProvider, DynamicValue, ProviderConfig};

async fn connect(platform: &MockPlatform) -> AltusProvider {
    altus_e2e::init_tracing();
    AltusProvider::configure(ProviderConfig {
        url: platform.base_url().to_string(),
        refresh_token: REFRESH_TOKEN.to_string(),
        poll_interval_seconds: Some(0),
    })
    .await
    .expect("provider configures against the mock platform")
}

fn disk_config(name: &str, capacity: i64) -> DynamicValue {
    make_state(vec![
        ("name", string_value(name)),
        ("project_id", string_value("proj-e2e")),
        ("capacity_in_gb", int_value(capacity)),
        (
            "timeouts",
            make_state(vec![("create", int_value(1)), ("delete", int_value(1))]),
        ),
    ])
}

#[tokio::test]
async fn disk_create_read_resize_delete() {
    let platform = MockPlatform::start().await.expect("start mock platform");
    let provider = connect(&platform).await;

    let created = provider
        .create_resource("altus_disk", &disk_config("data", 20))
        .await
        .expect("create disk");
    let id = get_string_attr(&created, "id");
    assert!(!id.is_empty());
    assert_eq!(get_int_attr(&created, "capacity_in_gb", 0), 20);
    assert_eq!(get_string_attr(&created, "status"), "OK");

    let read = provider
        .read_resource("altus_disk", &created)
        .await
        .expect("read disk")
        .expect("disk still exists");
    assert_eq!(get_string_attr(&read, "id"), id);

    let resized = provider
        .update_resource("altus_disk", &read, &disk_config("data", 40))
        .await
        .expect("resize disk");
    assert_eq!(get_int_attr(&resized, "capacity_in_gb", 0), 40);

    provider
        .delete_resource("altus_disk", &resized)
        .await
        .expect("delete disk");
    assert_eq!(platform.disk_count(), 0);

    let gone = provider
        .read_resource("altus_disk", &resized)
        .await
        .expect("read after delete");
    assert!(gone.is_none(), "deleted disk should drop out of state");
}

#[tokio::test]
async fn snapshot_lifecycle_under_parent_disk() {
    let platform = MockPlatform::start().await.expect("start mock platform");
    let provider = connect(&platform).await;

    let disk = provider
        .create_resource("altus_disk", &disk_config("data", 20))
        .await
        .expect("create disk");
    let disk_id = get_string_attr(&disk, "id");

    let snapshot_config = make_state(vec![
        ("disk_id", string_value(&disk_id)),
        ("name", string_value("pre-upgrade")),
    ]);
    let snapshot = provider
        .create_resource("altus_disk_snapshot", &snapshot_config)
        .await
        .expect("create snapshot");
    assert_eq!(get_string_attr(&snapshot, "disk_id"), disk_id);
    assert_eq!(get_string_attr(&snapshot, "name"), "pre-upgrade");
    assert!(!get_string_attr(&snapshot, "id").is_empty());

    let read = provider
        .read_resource("altus_disk_snapshot", &snapshot)
        .await
        .expect("read snapshot");
    assert!(read.is_some());

    provider
        .delete_resource("altus_disk_snapshot", &snapshot)
        .await
        .expect("delete snapshot");
    let gone = provider
        .read_resource("altus_disk_snapshot", &snapshot)
        .await
        .expect("read after delete");
    assert!(gone.is_none());
}

/// Import starts from nothing but an id and rebuilds the full state.
#[tokio::test]
async fn import_rebuilds_state_from_id_alone() {
    let platform = MockPlatform::start().await.expect("start mock platform");
    let provider = connect(&platform).await;

    let created = provider
        .create_resource("altus_disk", &disk_config("import-me", 10))
        .await
        .expect("create disk");
    let id = get_string_attr(&created, "id");

    let imported = provider
        .import_resource("altus_disk", &id)
        .await
        .expect("import disk")
        .expect("disk exists on the platform");
    assert_eq!(get_string_attr(&imported, "name"), "import-me");
    assert_eq!(get_int_attr(&imported, "capacity_in_gb", 0), 10);

    let missing = provider
        .import_resource("altus_disk", "bd-ghost")
        .await
        .expect("import of unknown id");
    assert!(missing.is_none());
}
