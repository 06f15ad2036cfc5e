mod common;

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

use gedcom_pdf::images::{ImageSource, cache_file_name, export_file_name};
use gedcom_pdf::{ConvertOptions, Error, ImageCache, convert};

#[test]
fn end_to_end_outputs() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    fs::create_dir_all(&photos).unwrap();
    common::write_family_images(&photos);

    let source = dir.path().join("family.ged");
    fs::write(&source, common::family_source(&photos)).unwrap();

    let mut options = ConvertOptions::new(&source);
    options.cache_dir = dir.path().join("cache");
    options.html = Some(dir.path().join("out.html"));
    options.pdf = Some(dir.path().join("out.pdf"));
    options.images = Some(dir.path().join("exported"));

    let conversion = convert(&options).unwrap();
    assert_eq!(conversion.tree.len(), 5);
    assert_eq!(conversion.document.image_pages.len(), 2);

    let html = fs::read_to_string(dir.path().join("out.html")).unwrap();
    assert!(html.contains("Karens konfirmation"));

    let pdf = fs::read(dir.path().join("out.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert!(pdf.windows(5).any(|w| w == b"/Im1 "));
    assert!(pdf.windows(5).any(|w| w == b"/Im3 "));

    // peter.png does not exist, so only two images are exported
    let mut exported: Vec<_> = fs::read_dir(dir.path().join("exported"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    exported.sort();
    assert_eq!(exported, ["001-anna-som-ung.png", "003-karens-konfirmation.png"]);
    assert_eq!(conversion.exported.len(), 2);
}

#[test]
fn missing_source_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let options = ConvertOptions::new(dir.path().join("nope.ged"));
    assert!(matches!(convert(&options), Err(Error::Io(_))));
}

#[test]
fn unknown_locale_fails_before_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = ConvertOptions::new(dir.path().join("nope.ged"));
    options.locale = "xx_YY".to_string();
    assert!(matches!(convert(&options), Err(Error::Locale(_))));
}

#[test]
fn local_images_resolve_once_and_report_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let png = common::write_png(dir.path(), "wide.png", 40, 10);
    let cache = ImageCache::new(dir.path().join("cache"));

    let url = format!("file:{}", png.display());
    assert_eq!(cache.local_path(&url).unwrap(), png);
    assert_eq!(cache.dimensions(&url).unwrap(), (40, 10));

    // later deletions do not matter: the resolved path is remembered
    fs::remove_file(&png).unwrap();
    assert_eq!(cache.local_path(&url).unwrap(), png);
    assert!(!dir.path().join("cache").exists());
}

#[test]
fn missing_local_image_is_access_error() {
    let dir = tempfile::tempdir().unwrap();
    let cache = ImageCache::new(dir.path().join("cache"));
    let missing = dir.path().join("missing.jpg");
    let err = cache.local_path(&missing.to_string_lossy()).unwrap_err();
    assert!(matches!(err, Error::ImageAccess { .. }), "{err}");
}

#[test]
fn cached_download_is_reused_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    fs::create_dir_all(&cache_dir).unwrap();
    let url = "https://example.invalid/photos/anna.png";
    let cached = common::write_png(&cache_dir, &cache_file_name(url), 20, 30);

    let cache = ImageCache::new(&cache_dir);
    assert_eq!(cache.local_path(url).unwrap(), cached);
    assert_eq!(cache.dimensions(url).unwrap(), (20, 30));
}

#[test]
fn export_names_use_serial_and_extension() {
    assert_eq!(
        export_file_name(7, "Gården i Ølsted", std::path::Path::new("/c/x.JPG")),
        "007-gaarden-i-oelsted.JPG"
    );
    assert_eq!(export_file_name(12, "Uden", std::path::Path::new("/c/x")), "012-uden");
}

/// Answer a single HTTP request on a local port with `status` and `body`.
fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/photos/anna.png", listener.local_addr().unwrap());
    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
    });
    (url, handle)
}

#[test]
fn server_error_status_is_access_error_and_caches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let (url, server) = serve_once("404 Not Found", b"gone".to_vec());

    let cache = ImageCache::new(&cache_dir);
    let err = cache.local_path(&url).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, Error::ImageAccess { ref reason, .. } if reason.contains("404")), "{err}");
    let leftovers: Vec<_> = fs::read_dir(&cache_dir).unwrap().collect();
    assert!(leftovers.is_empty());
}

#[test]
fn successful_download_lands_under_cache_name() {
    let dir = tempfile::tempdir().unwrap();
    let png = common::write_png(dir.path(), "source.png", 12, 8);
    let (url, server) = serve_once("200 OK", fs::read(&png).unwrap());

    let cache_dir = dir.path().join("cache");
    let cache = ImageCache::new(&cache_dir);
    let path = cache.local_path(&url).unwrap();
    server.join().unwrap();

    assert_eq!(path, cache_dir.join(cache_file_name(&url)));
    assert_eq!(cache.dimensions(&url).unwrap(), (12, 8));
    let names: Vec<_> = fs::read_dir(&cache_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, [cache_file_name(&url)]);
}

#[test]
fn unusable_cache_dir_skips_only_that_image() {
    let dir = tempfile::tempdir().unwrap();
    let photos = dir.path().join("photos");
    fs::create_dir_all(&photos).unwrap();
    common::write_family_images(&photos);
    let blocked = dir.path().join("cache");
    fs::write(&blocked, b"not a directory").unwrap();

    let source = format!(
        "{}\n{}1 OBJE\n2 FILE https://example.invalid/a.png\n2 TITL Remote\n2 NOTE Fra nettet\n",
        common::family_source(&photos).trim_end(),
        common::person("@R1@", "Rikke", "Ulm", Some("1930")),
    );
    let tree = gedcom_pdf::Tree::from_source(&source).unwrap();
    let cache = ImageCache::new(&blocked);
    let doc = gedcom_pdf::compose(
        &tree,
        &cache,
        &gedcom_pdf::DateLocale::default(),
        gedcom_pdf::Labels::default(),
    )
    .unwrap();

    assert_eq!(doc.people.len(), 6);
    assert_eq!(doc.image_pages.len(), 2);
    let remote = doc.skipped.iter().find(|s| s.title == "Remote").unwrap();
    assert!(remote.reason.contains("example.invalid"), "{}", remote.reason);
}
