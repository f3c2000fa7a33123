use std::cell::RefCell;

use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "brandframe_{name}_{}_{}",
        std::process::id(),
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos()
    ))
}

struct FakeShare {
    available: bool,
    outcome: Result<(), ShareError>,
    calls: RefCell<u32>,
}

impl FakeShare {
    fn new(available: bool, outcome: Result<(), ShareError>) -> Self {
        Self {
            available,
            outcome,
            calls: RefCell::new(0),
        }
    }
}

impl ShareTarget for FakeShare {
    fn can_share(&self, _artifact: &Artifact) -> bool {
        self.available
    }

    fn share(&self, _artifact: &Artifact) -> Result<(), ShareError> {
        *self.calls.borrow_mut() += 1;
        self.outcome.clone()
    }
}

fn png() -> Artifact {
    Artifact::from_bytes("marketing-1.png", "image/png", vec![1, 2, 3])
}

#[test]
fn file_name_uses_department_or_post() {
    assert_eq!(
        artifact_file_name(Some("Marketing"), 1_700_000_000_123, "png"),
        "Marketing-1700000000123.png"
    );
    assert_eq!(artifact_file_name(None, 5, "webm"), "post-5.webm");
    assert_eq!(artifact_file_name(Some("  "), 5, ".mp4"), "post-5.mp4");
}

#[test]
fn download_writes_bytes_into_dir() {
    let dir = temp_dir("delivery_download");
    let out = deliver(&png(), DeliveryMode::Download, None, &dir).unwrap();
    let Delivered::Downloaded(path) = out else {
        panic!("expected download");
    };
    assert_eq!(path, dir.join("marketing-1.png"));
    assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn successful_share_skips_download() {
    let dir = temp_dir("delivery_share_ok");
    let share = FakeShare::new(true, Ok(()));
    let out = deliver(&png(), DeliveryMode::Share, Some(&share as &dyn ShareTarget), &dir).unwrap();
    assert_eq!(out, Delivered::Shared);
    assert_eq!(*share.calls.borrow(), 1);
    assert!(!dir.exists());
}

#[test]
fn failed_share_falls_back_to_download() {
    let dir = temp_dir("delivery_share_failed");
    let share = FakeShare::new(true, Err(ShareError::Failed("rejected".into())));
    let out = deliver(&png(), DeliveryMode::Share, Some(&share as &dyn ShareTarget), &dir).unwrap();
    assert!(matches!(out, Delivered::Downloaded(_)));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn unavailable_share_falls_back_without_calling_target() {
    let dir = temp_dir("delivery_share_unavailable");
    let share = FakeShare::new(false, Ok(()));
    let out = deliver(&png(), DeliveryMode::Share, Some(&share as &dyn ShareTarget), &dir).unwrap();
    assert!(matches!(out, Delivered::Downloaded(_)));
    assert_eq!(*share.calls.borrow(), 0);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_share_target_falls_back() {
    let dir = temp_dir("delivery_share_none");
    let out = deliver(&png(), DeliveryMode::Share, None, &dir).unwrap();
    assert!(matches!(out, Delivered::Downloaded(_)));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn cancelled_share_does_nothing_further() {
    let dir = temp_dir("delivery_share_cancel");
    let share = FakeShare::new(true, Err(ShareError::Cancelled));
    let out = deliver(&png(), DeliveryMode::Share, Some(&share as &dyn ShareTarget), &dir).unwrap();
    assert_eq!(out, Delivered::ShareCancelled);
    assert!(!dir.exists());
}

#[test]
fn file_payload_already_in_place_is_not_copied() {
    let dir = temp_dir("delivery_file_in_place");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("post-1.mp4");
    std::fs::write(&path, b"video").unwrap();
    let art = Artifact::from_file("post-1.mp4", "video/mp4", path.clone());
    assert_eq!(download(&art, &dir).unwrap(), path);
    assert_eq!(std::fs::read(&path).unwrap(), b"video");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn command_share_needs_a_file_on_disk() {
    let target = CommandShareTarget::new("true");
    assert!(!target.can_share(&png()));
}
