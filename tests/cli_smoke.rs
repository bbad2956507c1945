use std::path::{Path, PathBuf};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_photoframe")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "photoframe.exe"
            } else {
                "photoframe"
            });
            p
        })
}

fn write_fixtures(dir: &Path) -> (PathBuf, PathBuf) {
    std::fs::create_dir_all(dir).unwrap();

    let mut frame = image::RgbaImage::from_pixel(96, 64, image::Rgba([20, 20, 20, 255]));
    for y in 8..56 {
        for x in 8..40 {
            frame.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
        }
        for x in 56..88 {
            frame.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
        }
    }
    let frame_path = dir.join("frame.png");
    frame.save(&frame_path).unwrap();

    let photo = image::RgbaImage::from_pixel(16, 16, image::Rgba([240, 10, 10, 255]));
    let photo_path = dir.join("photo.png");
    photo.save(&photo_path).unwrap();

    (frame_path, photo_path)
}

#[test]
fn cli_compose_writes_png() {
    let dir = PathBuf::from("target").join("cli_smoke").join("compose");
    let (frame, photo) = write_fixtures(&dir);
    let out_path = dir.join("out.png");
    let _ = std::fs::remove_file(&out_path);

    let status = std::process::Command::new(exe())
        .args(["compose", "--frame"])
        .arg(&frame)
        .arg("--photo")
        .arg(&photo)
        .arg("--out")
        .arg(&out_path)
        .status()
        .unwrap();

    assert!(status.success());
    let out = image::open(&out_path).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (96, 64));
    assert_eq!(out.get_pixel(20, 30).0, [240, 10, 10, 255]);
    assert_eq!(out.get_pixel(70, 30).0, [240, 10, 10, 255]);
    assert_eq!(out.get_pixel(2, 2).0, [20, 20, 20, 255]);
}

#[test]
fn cli_compose_reads_job_file() {
    let dir = PathBuf::from("target").join("cli_smoke").join("job");
    write_fixtures(&dir);
    let job_path = dir.join("job.json");
    std::fs::write(
        &job_path,
        r#"{ "frame": "frame.png", "photos": ["photo.png"], "format": "jpeg", "quality": 0.8 }"#,
    )
    .unwrap();

    let output = std::process::Command::new(exe())
        .args(["compose", "--job"])
        .arg(&job_path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.trim().starts_with("data:image/jpeg;base64,"));
}

#[test]
fn cli_regions_prints_worker_message() {
    let dir = PathBuf::from("target").join("cli_smoke").join("regions");
    let (frame, _) = write_fixtures(&dir);

    let output = std::process::Command::new(exe())
        .args(["regions", "--frame"])
        .arg(&frame)
        .output()
        .unwrap();

    assert!(output.status.success());
    let msg: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(msg["type"], "REGIONS_FOUND");
    let regions = msg["data"]["regions"].as_array().unwrap();
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0]["minX"], 8);
    assert_eq!(regions[0]["maxX"], 39);
    assert_eq!(regions[1]["minX"], 56);
    assert_eq!(regions[1]["maxY"], 55);
}

#[test]
fn cli_compose_without_photos_fails() {
    let dir = PathBuf::from("target").join("cli_smoke").join("no_photos");
    let (frame, _) = write_fixtures(&dir);

    let status = std::process::Command::new(exe())
        .args(["compose", "--frame"])
        .arg(&frame)
        .status()
        .unwrap();

    assert!(!status.success());
}
