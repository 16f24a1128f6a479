#![allow(clippy::unwrap_used)]
// Integration tests for the device command endpoints using wiremock.

use pretty_assertions::assert_eq;
use url::Url;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fritzbox_api::{Capability, Client, Device, Error};

// ── Helpers ─────────────────────────────────────────────────────────

const DEVICE_PATH: &str = "/webservices/homeautoswitch.lua";

async fn setup() -> (MockServer, Client) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = Client::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn device(capabilities: &[Capability]) -> Device {
    Device {
        identifier: " 1234 5678".into(),
        capabilities: capabilities.iter().copied().collect(),
        connected: true,
        ..Device::default()
    }
}

fn socket() -> Device {
    device(&[Capability::Socket, Capability::EnergyMeter, Capability::TemperatureSensor])
}

fn thermostat() -> Device {
    device(&[Capability::Thermostat, Capability::TemperatureSensor])
}

/// Mount a command that answers `body` and must be called exactly once.
async fn expect_command(server: &MockServer, cmd: &str, param: Option<&str>, body: &str) {
    let mut mock = Mock::given(method("GET"))
        .and(path(DEVICE_PATH))
        .and(query_param("switchcmd", cmd))
        .and(query_param("ain", "12345678"));
    if let Some(param) = param {
        mock = mock.and(query_param("param", param));
    }
    mock.respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

/// Fail the test if any request reaches the server.
async fn expect_no_requests(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

const DEVICE_LIST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<devicelist version="1">
  <device identifier="08761 0000434" id="17" functionbitmask="896" fwversion="03.33" manufacturer="AVM" productname="FRITZ!DECT 200">
    <present>1</present>
    <name>Kaffeemaschine</name>
    <switch><state>1</state><mode>auto</mode><lock>1</lock><devicelock>0</devicelock></switch>
  </device>
  <device identifier="11959 0171328" id="20" functionbitmask="320" fwversion="03.54" manufacturer="AVM" productname="Comet DECT">
    <present>1</present>
    <name>Heizung</name>
  </device>
</devicelist>"#;

async fn mount_device_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(DEVICE_PATH))
        .and(query_param("switchcmd", "getdevicelistinfos"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(DEVICE_LIST, "text/xml"))
        .mount(server)
        .await;
}

// ── Listing ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;
    mount_device_list(&server).await;

    let devices = client.list_devices().await.unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].identifier, "08761 0000434");
    assert_eq!(devices[0].product_name, "FRITZ!DECT 200");
    assert_eq!(devices[0].name.as_deref(), Some("Kaffeemaschine"));
    assert!(devices[0].is_socket());
    assert!(devices[0].is_locked());
    assert!(devices[1].is_thermostat());
    assert!(!devices[1].is_locked());
}

#[tokio::test]
async fn test_get_device_ignores_whitespace() {
    let (server, client) = setup().await;
    mount_device_list(&server).await;

    let device = client.get_device("11959 0171328").await.unwrap();
    assert_eq!(device.id.as_deref(), Some("20"));

    let device = client.get_device("119590171328").await.unwrap();
    assert_eq!(device.id.as_deref(), Some("20"));
}

#[tokio::test]
async fn test_get_device_not_found() {
    let (server, client) = setup().await;
    mount_device_list(&server).await;

    let result = client.get_device("0000 0000000").await;

    match result {
        Err(ref e @ Error::DeviceNotFound { ref ain }) => {
            assert_eq!(ain, "00000000000");
            assert!(e.is_not_found());
        }
        other => panic!("expected DeviceNotFound, got: {other:?}"),
    }
}

// ── Switching ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_turn_on_socket_uses_clean_ain() {
    let (server, client) = setup().await;
    expect_command(&server, "setswitchon", None, "1\n").await;

    assert!(client.turn_on(&socket()).await.unwrap());
}

#[tokio::test]
async fn test_turn_on_thermostat_sends_on_marker() {
    let (server, client) = setup().await;
    expect_command(&server, "sethkrtsoll", Some("254"), "254\n").await;

    assert!(client.turn_on(&thermostat()).await.unwrap());
}

#[tokio::test]
async fn test_turn_on_other_kind_sends_nothing() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let repeater = device(&[Capability::DectRepeater]);
    assert!(client.turn_on(&repeater).await.unwrap());
    assert!(!client.turn_off(&repeater).await.unwrap());
}

#[tokio::test]
async fn test_turn_off_socket_parses_state() {
    let (server, client) = setup().await;
    expect_command(&server, "setswitchoff", None, "0\n").await;

    assert!(!client.turn_off(&socket()).await.unwrap());
}

#[tokio::test]
async fn test_turn_off_socket_garbage_body() {
    let (server, client) = setup().await;
    expect_command(&server, "setswitchoff", None, "inval\n").await;

    let result = client.turn_off(&socket()).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_turn_off_thermostat_confirms_off_marker() {
    let (server, client) = setup().await;
    expect_command(&server, "sethkrtsoll", Some("253"), "253\n").await;

    assert!(client.turn_off(&thermostat()).await.unwrap());
}

#[tokio::test]
async fn test_turn_on_locked_device() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let locked = Device {
        locked: true,
        ..socket()
    };
    let result = client.turn_on(&locked).await;
    assert!(
        matches!(result, Err(Error::DeviceLocked { .. })),
        "expected DeviceLocked, got: {result:?}"
    );
}

#[tokio::test]
async fn test_disconnected_device() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let offline = Device {
        connected: false,
        ..socket()
    };
    let result = client.get_power(&offline).await;
    assert!(
        matches!(result, Err(Error::DeviceNotConnected { .. })),
        "expected DeviceNotConnected, got: {result:?}"
    );
}

#[tokio::test]
async fn test_toggle_socket() {
    let (server, client) = setup().await;
    expect_command(&server, "setswitchtoggle", None, "1\n").await;

    assert!(client.toggle(&socket()).await.unwrap());
}

#[tokio::test]
async fn test_toggle_requires_socket() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let result = client.toggle(&thermostat()).await;
    assert!(
        matches!(result, Err(Error::UnsupportedOperation { .. })),
        "expected UnsupportedOperation, got: {result:?}"
    );
}

// ── Metering ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_power() {
    let (server, client) = setup().await;
    expect_command(&server, "getswitchpower", None, "12340\n").await;

    assert_eq!(client.get_power(&socket()).await.unwrap(), 12340);
}

#[tokio::test]
async fn test_get_power_requires_energy_meter() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let result = client.get_power(&thermostat()).await;
    assert!(
        matches!(result, Err(Error::UnsupportedOperation { .. })),
        "expected UnsupportedOperation, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_power_is_allowed_when_locked() {
    let (server, client) = setup().await;
    expect_command(&server, "getswitchpower", None, "0\n").await;

    let locked = Device {
        locked: true,
        ..socket()
    };
    assert_eq!(client.get_power(&locked).await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_energy() {
    let (server, client) = setup().await;
    expect_command(&server, "getswitchenergy", None, "707\n").await;

    assert_eq!(client.get_energy(&socket()).await.unwrap(), 707);
}

#[tokio::test]
async fn test_get_energy_garbage_body() {
    let (server, client) = setup().await;
    expect_command(&server, "getswitchenergy", None, "inval\n").await;

    let result = client.get_energy(&socket()).await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_get_temperature() {
    let (server, client) = setup().await;
    expect_command(&server, "gettemperature", None, "215\n").await;

    let temp = client.get_temperature(&socket()).await.unwrap();
    assert!((temp - 21.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_get_temperature_requires_sensor() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let plain = device(&[Capability::Socket]);
    let result = client.get_temperature(&plain).await;
    assert!(matches!(result, Err(Error::UnsupportedOperation { .. })));
}

// ── Thermostat setpoint ─────────────────────────────────────────────

#[tokio::test]
async fn test_get_soll_temperature() {
    let (server, client) = setup().await;
    expect_command(&server, "gethkrtsoll", None, "32\n").await;

    let temp = client.get_soll_temperature(&thermostat()).await.unwrap();
    assert!((temp - 16.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_get_soll_temperature_off_markers() {
    for marker in ["253", "254"] {
        let (server, client) = setup().await;
        expect_command(&server, "gethkrtsoll", None, marker).await;

        let result = client.get_soll_temperature(&thermostat()).await;
        assert!(
            matches!(result, Err(Error::DeviceOff { .. })),
            "expected DeviceOff for {marker}, got: {result:?}"
        );
    }
}

#[tokio::test]
async fn test_get_soll_temperature_requires_thermostat() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let result = client.get_soll_temperature(&socket()).await;
    assert!(matches!(result, Err(Error::UnsupportedOperation { .. })));
}

#[tokio::test]
async fn test_set_soll_temperature() {
    let (server, client) = setup().await;
    expect_command(&server, "sethkrtsoll", Some("48"), "48\n").await;

    client.set_soll_temperature(&thermostat(), 24.0).await.unwrap();
}

#[tokio::test]
async fn test_set_soll_temperature_rounds_to_half_degrees() {
    let (server, client) = setup().await;
    expect_command(&server, "sethkrtsoll", Some("43"), "43\n").await;

    client.set_soll_temperature(&thermostat(), 21.6).await.unwrap();
}

#[tokio::test]
async fn test_set_soll_temperature_inconsistent_echo() {
    let (server, client) = setup().await;
    expect_command(&server, "sethkrtsoll", Some("48"), "46\n").await;

    let result = client.set_soll_temperature(&thermostat(), 24.0).await;
    match result {
        Err(Error::InconsistentResponse { expected, actual }) => {
            assert_eq!(expected, "48");
            assert_eq!(actual, "46");
        }
        other => panic!("expected InconsistentResponse, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_set_soll_temperature_out_of_range() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    for degrees in [5.0, 30.0, f64::NAN] {
        let result = client.set_soll_temperature(&thermostat(), degrees).await;
        assert!(
            matches!(result, Err(Error::InvalidArgument(_))),
            "expected InvalidArgument for {degrees}, got: {result:?}"
        );
    }
}

#[tokio::test]
async fn test_set_soll_temperature_requires_thermostat() {
    let (server, client) = setup().await;
    expect_no_requests(&server).await;

    let result = client.set_soll_temperature(&socket(), 20.0).await;
    assert!(matches!(result, Err(Error::UnsupportedOperation { .. })));
}
