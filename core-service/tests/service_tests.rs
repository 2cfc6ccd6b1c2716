//! Façade behavior: string ids, request decoding and error codes.

mod common;

use bridge_traits::EngineState;
use common::{test_config, BrokenProbe, DrivenEngines, ReadyHost};
use core_playback::{SessionKind, SessionState};
use core_service::api::*;
use core_service::{CoreError, SignageService};
use std::sync::Arc;
use std::time::Duration;

struct Setup {
    service: SignageService,
    host: Arc<ReadyHost>,
    engines: Arc<DrivenEngines>,
    dir: tempfile::TempDir,
}

async fn setup() -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let host = Arc::new(ReadyHost::default());
    let engines = Arc::new(DrivenEngines::default());
    let config = test_config(dir.path(), host.clone(), engines.clone())
        .build()
        .unwrap();
    let service = SignageService::bootstrap(config).await.unwrap();
    Setup {
        service,
        host,
        engines,
        dir,
    }
}

#[tokio::test]
async fn test_create_player_returns_string_id() {
    let s = setup().await;
    let video = s
        .service
        .create_player(CreatePlayerRequest::new("VIDEO"))
        .await
        .unwrap();
    let audio = s
        .service
        .create_player(CreatePlayerRequest::new("audio").with_volume(0.25))
        .await
        .unwrap();
    assert_ne!(video.session_id, audio.session_id);

    let info = s
        .service
        .player_info(PlayerRequest::new(&audio.session_id))
        .await
        .unwrap();
    assert_eq!(info.kind, SessionKind::Audio);
    assert_eq!(info.volume, 0.25);
    assert_eq!(s.service.players().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_kind_is_validation() {
    let s = setup().await;
    let err = s
        .service
        .create_player(CreatePlayerRequest::new("slideshow"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
    assert_eq!(s.engines.count(), 0);
}

#[tokio::test]
async fn test_play_requires_url() {
    let s = setup().await;
    let player = s
        .service
        .create_player(CreatePlayerRequest::new("video"))
        .await
        .unwrap();

    let mut request = PlayRequest::new(&player.session_id, "");
    let err = s.service.play(request.clone()).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    request.url = None;
    let err = s.service.play(request).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let info = s
        .service
        .player_info(PlayerRequest::new(&player.session_id))
        .await
        .unwrap();
    assert_eq!(info.state, SessionState::Idle);
}

#[tokio::test]
async fn test_malformed_or_unknown_id_is_not_found() {
    let s = setup().await;
    for id in ["not-a-uuid", "5f0b8f7e-4a5e-4a43-9d0f-2a8f5f9e1c11"] {
        let err = s.service.pause(PlayerRequest::new(id)).await.unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
        let err = s
            .service
            .play(PlayRequest::new(id, "http://h/a.mp4"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}

#[tokio::test]
async fn test_release_twice_is_not_found() {
    let s = setup().await;
    let player = s
        .service
        .create_player(CreatePlayerRequest::new("audio"))
        .await
        .unwrap();
    let request = PlayerRequest::new(&player.session_id);

    s.service.release_player(request.clone()).await.unwrap();
    let err = s.service.release_player(request).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn test_audio_end_reaches_subscriber() {
    let s = setup().await;
    let mut ended = s.service.audio_playback_ended();
    let player = s
        .service
        .create_player(CreatePlayerRequest::new("audio"))
        .await
        .unwrap();
    s.service
        .play(PlayRequest::new(&player.session_id, "http://h/jingle.mp3").with_auth_token("t0k"))
        .await
        .unwrap();

    s.engines.report(0, EngineState::Ready);
    s.engines.report(0, EngineState::Ended);

    let event = tokio::time::timeout(Duration::from_secs(5), ended.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.session_id, player.session_id);
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        serde_json::json!({ "sessionId": player.session_id })
    );
}

#[tokio::test]
async fn test_video_lifecycle_through_facade() {
    let s = setup().await;
    let player = s
        .service
        .create_player(CreatePlayerRequest::new("video"))
        .await
        .unwrap();
    let id = player.session_id.clone();

    s.service
        .play(PlayRequest::new(&id, "http://h/loop.mp4"))
        .await
        .unwrap();
    s.engines.report(0, EngineState::Ready);
    s.service
        .set_volume(SetVolumeRequest {
            session_id: id.clone(),
            volume: 0.5,
        })
        .await
        .unwrap();
    s.service.hide(PlayerRequest::new(&id)).await.unwrap();
    s.service.show(PlayerRequest::new(&id)).await.unwrap();
    s.service.stop(PlayerRequest::new(&id)).await.unwrap();

    let info = s.service.player_info(PlayerRequest::new(&id)).await.unwrap();
    assert_eq!(info.state, SessionState::Stopped);
    assert_eq!(info.volume, 0.5);
    assert!(info.render_target.is_some());

    let err = s
        .service
        .set_volume(SetVolumeRequest {
            session_id: id,
            volume: 1.5,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "VALIDATION");
}

#[tokio::test]
async fn test_render_surface_visibility_reaches_host() {
    let s = setup().await;
    s.service
        .create_player(CreatePlayerRequest::new("video"))
        .await
        .unwrap();

    s.service
        .set_render_surface_visibility(SurfaceVisibilityRequest { visible: true })
        .await
        .unwrap();
    assert_eq!(*s.host.container_visible.lock(), Some(true));
}

#[tokio::test]
async fn test_bootstrap_fails_without_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(
        dir.path(),
        Arc::new(ReadyHost::default()),
        Arc::new(DrivenEngines::default()),
    )
    .storage_probe(Arc::new(BrokenProbe))
    .build()
    .unwrap();

    let err = SignageService::bootstrap(config).await.unwrap_err();
    assert_eq!(err.code(), "STORAGE_UNAVAILABLE");
}

#[tokio::test]
async fn test_shutdown_persists_index_and_rejects_requests() {
    let s = setup().await;
    s.service
        .create_player(CreatePlayerRequest::new("video"))
        .await
        .unwrap();

    s.service.shutdown().await.unwrap();
    assert!(s.dir.path().join("index.json").exists());

    let err = s
        .service
        .create_player(CreatePlayerRequest::new("audio"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ShutDown));
}

#[test]
fn test_requests_decode_from_camel_case() {
    let request: PlayRequest = serde_json::from_str(
        r#"{"sessionId":"abc","url":"http://h/a.mp4","authToken":"secret"}"#,
    )
    .unwrap();
    assert_eq!(request.session_id, "abc");
    assert_eq!(request.auth_token.as_deref(), Some("secret"));
    assert_eq!(request.visible, None);
    assert!(!format!("{:?}", request).contains("secret"));

    let create: CreatePlayerRequest = serde_json::from_str(r#"{"kind":"audio"}"#).unwrap();
    assert_eq!(create.volume, None);

    let body = ErrorBody::from(&CoreError::NotFound("abc".into()));
    assert_eq!(body.code, "NOT_FOUND");
}
