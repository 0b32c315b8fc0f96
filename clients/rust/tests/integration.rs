use alidisk_client::{DriveClient, Session};
use alidisk_sdk::{CheckNameMode, DriveError, Entry, EntryKind, RemoteClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> DriveClient {
    DriveClient::builder(&server.uri())
        .auth_endpoint(&server.uri())
        .access_token("test-token")
        .drive_id("drive-1")
        .build()
        .unwrap()
}

#[tokio::test]
async fn list_children_follows_next_marker() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/adrive/v3/file/list"))
        .and(body_partial_json(json!({"marker": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"file_id": "3", "name": "c.txt", "type": "file", "size": 3}],
            "next_marker": ""
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/adrive/v3/file/list"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({"drive_id": "drive-1", "parent_file_id": "root"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"file_id": "1", "name": "a.txt", "type": "file", "size": 1},
                {"file_id": "2", "name": "docs", "type": "folder"},
                {"file_id": "x", "type": "file"}
            ],
            "next_marker": "page-2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let entries = client(&server).list_children("root").await.unwrap();
    assert_eq!(
        entries,
        vec![
            Entry::file("1", "a.txt", 1),
            Entry::folder("2", "docs"),
            Entry::file("3", "c.txt", 3),
        ]
    );
}

#[tokio::test]
async fn find_by_path_filters_kind_and_absence() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/file/get_by_path"))
        .and(body_partial_json(json!({"file_path": "/docs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "2", "name": "docs", "type": "folder"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/file/get_by_path"))
        .and(body_partial_json(json!({"file_path": "/missing"})))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "NotFound.File", "message": "not found"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(
        client.find_by_path("docs", EntryKind::Folder).await.unwrap(),
        Some(Entry::folder("2", "docs"))
    );
    assert_eq!(client.find_by_path("/docs/", EntryKind::File).await.unwrap(), None);
    assert_eq!(client.find_by_path("/missing", EntryKind::File).await.unwrap(), None);
}

#[tokio::test]
async fn path_chain_is_root_most_first() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/adrive/v1/file/get_path"))
        .and(body_partial_json(json!({"file_id": "3"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"file_id": "3", "name": "b", "type": "folder"},
                {"file_id": "2", "name": "a", "type": "folder"}
            ]
        })))
        .mount(&server)
        .await;

    let chain = client(&server).path_chain("3").await.unwrap();
    let names: Vec<_> = chain.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let token_file = tmp.path().join("session.json");

    Mock::given(method("POST"))
        .and(path("/v2/user/get"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "AccessTokenInvalid", "message": "expired"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/account/token"))
        .and(body_partial_json(json!({"grant_type": "refresh_token", "refresh_token": "rt-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "refresh_token": "rt-2",
            "user_name": "norvyn",
            "default_drive_id": "drive-9"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/user/get"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_name": "norvyn", "nick_name": "n", "default_drive_id": "drive-9"
        })))
        .mount(&server)
        .await;

    let client = DriveClient::builder(&server.uri())
        .auth_endpoint(&server.uri())
        .access_token("stale")
        .refresh_token("rt-1")
        .token_file(&token_file)
        .build()
        .unwrap();

    let account = client.connect().await.unwrap();
    assert_eq!(account.user_name, "norvyn");
    assert_eq!(account.drive_id, "drive-9");

    let saved = Session::load(&token_file).unwrap().unwrap();
    assert_eq!(saved.access_token, "fresh");
    assert_eq!(saved.refresh_token, "rt-2");

    client.logout().await.unwrap();
    assert!(!token_file.exists());
}

#[tokio::test]
async fn connect_without_credentials_is_unauthorized() {
    let server = MockServer::start().await;
    let client = DriveClient::new(&server.uri()).unwrap();
    assert!(matches!(client.connect().await, Err(DriveError::Unauthorized(_))));
}

#[tokio::test]
async fn upload_file_creates_puts_and_completes() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("report.txt");
    std::fs::write(&local, b"hello drive").unwrap();

    Mock::given(method("POST"))
        .and(path("/adrive/v2/file/createWithFolders"))
        .and(body_partial_json(json!({
            "parent_file_id": "root",
            "name": "renamed.txt",
            "type": "file",
            "size": 11,
            "check_name_mode": "overwrite"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "file_id": "f1",
            "file_name": "renamed.txt",
            "type": "file",
            "upload_id": "up-1",
            "part_info_list": [{"part_number": 1, "upload_url": format!("{}/blob/f1", server.uri())}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/blob/f1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/file/complete"))
        .and(body_partial_json(json!({"file_id": "f1", "upload_id": "up-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "f1", "name": "renamed.txt", "type": "file", "size": 11
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = client(&server)
        .upload_file(&local, "root", Some("renamed.txt"), Some(CheckNameMode::Overwrite))
        .await
        .unwrap();
    assert_eq!(entry, Entry::file("f1", "renamed.txt", 11));
}

#[tokio::test]
async fn upload_refused_when_name_exists() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let local = tmp.path().join("a.txt");
    std::fs::write(&local, b"a").unwrap();

    Mock::given(method("POST"))
        .and(path("/adrive/v2/file/createWithFolders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "existing", "file_name": "a.txt", "type": "file", "exist": true
        })))
        .mount(&server)
        .await;

    let result = client(&server)
        .upload_file(&local, "root", None, Some(CheckNameMode::Refuse))
        .await;
    assert!(matches!(result, Err(DriveError::AlreadyExists(_))));
}

#[tokio::test]
async fn download_file_streams_to_local_dir() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/v2/file/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "f1", "name": "photo.jpg", "type": "file", "size": 5
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/file/get_download_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": format!("{}/blob/f1", server.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blob/f1"))
        .and(header("referer", "https://www.aliyundrive.com/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bytes".to_vec()))
        .mount(&server)
        .await;

    let target = client(&server)
        .download_file("f1", &tmp.path().join("out"))
        .await
        .unwrap();
    assert_eq!(target, tmp.path().join("out/photo.jpg"));
    assert_eq!(std::fs::read(target).unwrap(), b"bytes");
}

#[tokio::test]
async fn short_download_leaves_no_file_behind() {
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out");

    Mock::given(method("POST"))
        .and(path("/v2/file/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file_id": "f1", "name": "photo.jpg", "type": "file", "size": 100
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/file/get_download_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": format!("{}/blob/f1", server.uri())
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blob/f1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"short".to_vec()))
        .mount(&server)
        .await;

    let result = client(&server).download_file("f1", &out).await;

    assert!(matches!(result, Err(DriveError::Transient(_))));
    assert!(!out.join("photo.jpg").exists());
    assert!(!out.join("photo.jpg.part").exists());
}

#[tokio::test]
async fn move_and_trash_map_provider_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/file/move"))
        .and(body_partial_json(json!({
            "file_id": "f1", "to_parent_file_id": "d1", "new_name": "b.txt"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"file_id": "f1"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/recyclebin/trash"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": "ForbiddenNoPermission.File", "message": "no permission"
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    client.move_entry("f1", "d1", Some("b.txt")).await.unwrap();
    let err = client.trash("f1").await.unwrap_err();
    assert!(err.is_permission_denied());
}
