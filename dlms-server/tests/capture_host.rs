//! End-to-end capture of load profiles hosted by a server

use dlms_core::{DataObject, DlmsError, ObisCode};
use dlms_interface::{CaptureObjectDefinition, CosemObject, Data, ProfileGeneric, ProfileSortMethod};
use dlms_server::{DlmsServer, SchedulerConfig, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const ENERGY: ObisCode = ObisCode::new(1, 0, 1, 8, 0, 255);
const LOAD_PROFILE: ObisCode = ObisCode::new(1, 0, 99, 1, 0, 255);

async fn server_with_profile(period: u32) -> (DlmsServer, Arc<Data>, Arc<ProfileGeneric>) {
    let server = DlmsServer::new();
    let energy = Arc::new(Data::new(ENERGY, DataObject::Unsigned32(0)));
    server.register_object(energy.clone()).await.unwrap();

    let profile = server
        .register_profile(ProfileGeneric::new(LOAD_PROFILE, 100, period, ProfileSortMethod::Fifo))
        .await
        .unwrap();
    profile
        .add_capture_object(CaptureObjectDefinition::new(Data::CLASS_ID, ENERGY, 2))
        .await;

    (server, energy, profile)
}

async fn captured_values(profile: &ProfileGeneric) -> Vec<u32> {
    profile
        .buffer()
        .await
        .iter()
        .map(|entry| entry.values[0].as_unsigned32().unwrap())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn load_profile_records_register_every_period() {
    let (server, energy, profile) = server_with_profile(2).await;
    server.start_capture(&LOAD_PROFILE).await.unwrap();

    for value in [10, 20, 30] {
        sleep(Duration::from_secs(1)).await;
        energy.set_value(DataObject::Unsigned32(value)).await;
        sleep(Duration::from_secs(1)).await;
    }
    sleep(Duration::from_millis(500)).await;

    // Captures at t = 0, 2, 4, 6
    assert_eq!(captured_values(&profile).await, vec![0, 10, 20, 30]);

    server.stop_capture(&LOAD_PROFILE).await.unwrap();
    sleep(Duration::from_secs(10)).await;
    assert_eq!(profile.entries_in_use().await, 4);
}

#[tokio::test(start_paused = true)]
async fn writing_capture_period_retimes_running_capture() {
    let (server, _energy, profile) = server_with_profile(60).await;
    server.start_capture(&LOAD_PROFILE).await.unwrap();

    sleep(Duration::from_secs(1)).await;
    let object = server.find_object(&LOAD_PROFILE).await.unwrap();
    object.set_attribute(4, DataObject::Unsigned32(5)).await.unwrap();

    // The wait already in progress keeps its 60 s; later waits use 5 s
    sleep(Duration::from_secs(68)).await;
    assert_eq!(profile.entries_in_use().await, 3);

    server.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn missing_capture_object_is_retried_until_it_appears() {
    let server = DlmsServer::new();
    let profile = server
        .register_profile(ProfileGeneric::new(LOAD_PROFILE, 100, 1, ProfileSortMethod::Fifo))
        .await
        .unwrap();
    profile
        .add_capture_object(CaptureObjectDefinition::new(Data::CLASS_ID, ENERGY, 2))
        .await;
    server.start_capture(&LOAD_PROFILE).await.unwrap();

    sleep(Duration::from_millis(2_500)).await;
    let statistics = server.capture_statistics(&LOAD_PROFILE).unwrap();
    assert_eq!(statistics.captures_failed, 3);
    assert_eq!(profile.entries_in_use().await, 0);

    server
        .register_object(Arc::new(Data::new(ENERGY, DataObject::Unsigned32(7))))
        .await
        .unwrap();
    sleep(Duration::from_secs(1)).await;

    let statistics = server.capture_statistics(&LOAD_PROFILE).unwrap();
    assert_eq!(statistics.captures_succeeded, 1);
    assert_eq!(statistics.consecutive_failures, 0);
    assert_eq!(captured_values(&profile).await, vec![7]);
    assert!(server.is_capturing(&LOAD_PROFILE));

    server.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn trigger_capture_wakes_running_scheduler() {
    let (server, energy, profile) = server_with_profile(900).await;
    server.start_capture(&LOAD_PROFILE).await.unwrap();

    sleep(Duration::from_secs(10)).await;
    energy.set_value(DataObject::Unsigned32(99)).await;
    server.trigger_capture(&LOAD_PROFILE).await.unwrap();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(captured_values(&profile).await, vec![0, 99]);
    assert_eq!(server.capture_statistics(&LOAD_PROFILE).unwrap().wakes, 1);

    server.shutdown().await;
}

#[tokio::test]
async fn trigger_capture_without_scheduler_captures_directly() {
    let (server, _energy, profile) = server_with_profile(0).await;

    server.trigger_capture(&LOAD_PROFILE).await.unwrap();
    assert_eq!(profile.entries_in_use().await, 1);

    server
        .unregister_object(&ENERGY)
        .await
        .unwrap();
    let result = server.trigger_capture(&LOAD_PROFILE).await;
    assert!(matches!(result, Err(DlmsError::Capture { .. })));
}

#[tokio::test]
async fn second_start_is_rejected_until_stopped() {
    let (server, _energy, _profile) = server_with_profile(60).await;

    server.start_capture(&LOAD_PROFILE).await.unwrap();
    let result = server.start_capture(&LOAD_PROFILE).await;
    assert!(matches!(result, Err(DlmsError::SchedulerActive(obis)) if obis == LOAD_PROFILE));

    server.stop_capture(&LOAD_PROFILE).await.unwrap();
    server.stop_capture(&LOAD_PROFILE).await.unwrap();
    server.start_capture(&LOAD_PROFILE).await.unwrap();
    server.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn scheduler_period_unit_comes_from_server_config() {
    let config = ServerConfig {
        scheduler: SchedulerConfig::default().with_period_unit(Duration::from_millis(10)),
        ..ServerConfig::default()
    };
    let server = DlmsServer::with_config(config);
    server
        .register_profile(ProfileGeneric::new(LOAD_PROFILE, 1000, 10, ProfileSortMethod::Fifo))
        .await
        .unwrap();
    server.start_capture(&LOAD_PROFILE).await.unwrap();

    sleep(Duration::from_millis(1_050)).await;
    let profile = server.find_profile(&LOAD_PROFILE).await.unwrap();
    assert_eq!(profile.entries_in_use().await, 11);

    server.shutdown().await;
}
