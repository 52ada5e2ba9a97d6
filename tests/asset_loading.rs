mod common;

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use avatar_stage::assets::{
    AssetLoader, FileSource, HttpSource, LoadCause, LoadProgress, MaterialRules, ProgressSink,
};
use common::gltf_asset;

/// Answers a single HTTP request; the task yields the request line it saw.
async fn serve_once(status: &'static str, body: Vec<u8>) -> (Url, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).lines().next().unwrap_or_default().to_string()
    });
    (Url::parse(&format!("http://{}/stage/", addr)).unwrap(), server)
}

fn http_loader(base: Url) -> AssetLoader {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    AssetLoader::new(Arc::new(HttpSource::with_client(client, base)), MaterialRules::default())
}

#[tokio::test]
async fn test_file_source_load_with_progress() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("models")).unwrap();
    let bytes = gltf_asset(&["hips", "spine", "neck"], Some(("wave", 1.25)));
    std::fs::write(dir.path().join("models/body.gltf"), &bytes).unwrap();

    let rules = MaterialRules {
        flat_shininess: 0.0,
        flat_specular: 0.0,
    };
    let loader = AssetLoader::new(Arc::new(FileSource::new(dir.path())), rules);

    let seen: Arc<Mutex<Vec<LoadProgress>>> = Arc::default();
    let sink: ProgressSink = {
        let seen = Arc::clone(&seen);
        Arc::new(move |progress| seen.lock().unwrap().push(progress))
    };
    let handle = loader.load_with_progress("models/body.gltf", Some(&sink)).await.unwrap();

    let progress = seen.lock().unwrap();
    let last = progress.last().unwrap();
    assert_eq!(last.loaded, bytes.len() as u64);
    assert_eq!(last.fraction(), Some(1.0));

    let root = handle.root();
    assert_eq!(root.root().name, "body");
    assert_eq!(root.len(), 4);
    assert!(root.find("neck").is_some());

    let mesh = root.meshes().next().unwrap();
    assert_eq!(mesh.vertex_count, 3);
    assert_eq!(mesh.primitive_count, 1);
    assert!(mesh.materials.iter().all(|m| m.shininess == 0.0 && m.specular == 0.0));

    assert!(handle.is_animated());
    let clip = handle.first_clip().unwrap();
    assert_eq!(clip.name(), "wave");
    assert_eq!(clip.duration(), 1.25);
    assert_eq!(clip.targets().collect::<Vec<_>>(), vec!["hips"]);
}

#[tokio::test]
async fn test_missing_file_is_a_fetch_error() {
    let dir = tempfile::tempdir().unwrap();
    let loader = AssetLoader::new(Arc::new(FileSource::new(dir.path())), MaterialRules::default());

    let err = loader.load("models/nope.glb").await.unwrap_err();
    assert_eq!(err.path, "models/nope.glb");
    assert!(matches!(err.cause, LoadCause::Fetch(_)));
}

#[tokio::test]
async fn test_each_load_decodes_fresh_clips() {
    let source = common::stock_source(std::time::Duration::ZERO);
    let loader = AssetLoader::new(source.clone(), MaterialRules::default());

    let a = loader.load(common::CHEER).await.unwrap();
    let b = loader.load(common::CHEER).await.unwrap();
    assert_ne!(a.first_clip().unwrap().id(), b.first_clip().unwrap().id());
    assert_eq!(source.fetches(common::CHEER), 2);
}

#[tokio::test]
async fn test_http_source_fetches_relative_to_base_url() {
    let bytes = gltf_asset(&["hips"], Some(("wave", 1.0)));
    let (base, server) = serve_once("200 OK", bytes.clone()).await;
    let loader = http_loader(base);

    let seen: Arc<Mutex<Vec<LoadProgress>>> = Arc::default();
    let sink: ProgressSink = {
        let seen = Arc::clone(&seen);
        Arc::new(move |progress| seen.lock().unwrap().push(progress))
    };
    let handle = loader.load_with_progress("./models/body.gltf", Some(&sink)).await.unwrap();

    assert_eq!(server.await.unwrap(), "GET /stage/models/body.gltf HTTP/1.1");
    assert_eq!(handle.first_clip().unwrap().name(), "wave");
    let progress = seen.lock().unwrap();
    let last = progress.last().unwrap();
    assert_eq!(last.loaded, bytes.len() as u64);
    assert_eq!(last.total, Some(bytes.len() as u64));
}

#[tokio::test]
async fn test_http_error_status_is_a_fetch_error() {
    let (base, server) = serve_once("404 Not Found", Vec::new()).await;
    let loader = http_loader(base);

    let err = loader.load("models/missing.glb").await.unwrap_err();
    assert_eq!(err.path, "models/missing.glb");
    assert!(matches!(err.cause, LoadCause::Fetch(_)));
    server.await.unwrap();
}
