use std::sync::Arc;

use landmarks::BoundingBox;

use super::*;
use crate::landmark::Landmark;
use crate::store::{MemoryLandmarkStore, MemoryObjectStore};
use crate::test_utils::{block_png, saliency_json};

const RED: [u8; 3] = [230, 60, 40];
const DARK: [u8; 3] = [15, 20, 25];

struct Fixture {
    objects: Arc<MemoryObjectStore>,
    landmarks: Arc<MemoryLandmarkStore>,
    context: TaskContext,
}

fn fixture(positions: &[&str], landmarks: Vec<Landmark>) -> Fixture {
    let config = Config {
        landmark_db: None,
        positions: positions.iter().map(|p| p.to_string()).collect(),
        ..Config::default()
    };
    let objects = Arc::new(MemoryObjectStore::new());
    let landmarks = Arc::new(MemoryLandmarkStore::with_landmarks(landmarks));
    let context = TaskContext::new(config, objects.clone(), landmarks.clone()).unwrap();
    Fixture {
        objects,
        landmarks,
        context,
    }
}

impl Fixture {
    fn put_saliency(&self, hit_id: &str, position: &str, json: String) {
        self.objects
            .put(
                "saliency-maps",
                &TaskContext::saliency_key(hit_id, position),
                json.into_bytes(),
                "application/json",
            )
            .unwrap();
    }

    fn put_image(&self, ep_id: &str, position: &str, png: Vec<u8>) {
        self.objects
            .put(
                "streetview-images",
                &TaskContext::image_key(ep_id, position),
                png,
                "image/jpeg",
            )
            .unwrap();
    }
}

fn rect(x1: usize, y1: usize, x2: usize, y2: usize) -> BoundingBox {
    BoundingBox::new(x1, y1, x2, y2).unwrap()
}

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

#[test]
fn test_object_keys() {
    assert_eq!(TaskContext::image_key("355", "north"), "355_north.jpg");
    assert_eq!(TaskContext::saliency_key("773", "west"), "773_west.json");
    let id = Uuid::nil();
    assert_eq!(
        TaskContext::crop_key(id),
        "00000000-0000-0000-0000-000000000000.png"
    );
}

#[test]
fn test_task_kinds_map_to_failure_codes() {
    assert_eq!(TaskKind::Crop.failure_code(), FailureCode::CropError);
    assert_eq!(TaskKind::Mask.failure_code(), FailureCode::MatrixMasterError);
    assert_eq!(TaskKind::Score.failure_code(), FailureCode::MatrixMasterError);
    assert_eq!(
        TaskKind::CropFromSaliency.failure_code(),
        FailureCode::MatrixMasterError
    );
    assert_eq!(TaskKind::Mask.to_string(), "DERIVE_RECTS_FROM_MASK");
}

#[test]
fn test_mask_inserts_a_landmark_per_region() {
    let f = fixture(&["north", "east"], Vec::new());
    f.put_saliency(
        "7",
        "north",
        saliency_json(100, 100, &[(10, 10, 30, 30, 200), (50, 60, 80, 90, 200)]),
    );

    run_task(&f.context, TaskKind::Mask, &TaskInput::new("1", "7")).unwrap();

    let north = f.landmarks.landmarks_for("7", "north").unwrap();
    let rects: Vec<_> = north.iter().filter_map(|l| l.rect).collect();
    assert_eq!(rects, vec![rect(10, 10, 30, 30), rect(50, 60, 80, 90)]);
    assert!(north.iter().all(|l| l.visual_saliency_score.is_none()));
    assert!(f.landmarks.landmarks_for("7", "east").unwrap().is_empty());
}

#[test]
fn test_mask_failure_commits_nothing() {
    let f = fixture(&["north", "east"], Vec::new());
    f.put_saliency("7", "north", saliency_json(100, 100, &[(10, 10, 30, 30, 200)]));
    f.put_saliency("7", "east", saliency_json(100, 100, &[]));

    let result = run_task(&f.context, TaskKind::Mask, &TaskInput::new("1", "7"));
    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("east"), "{message}");
    assert!(f.landmarks.all().is_empty());
}

#[test]
fn test_score_uses_rects_and_resolves_bearings() {
    let with_rect = Landmark::new("7", "north").with_rect(rect(40, 10, 55, 30));
    let at_bearing = Landmark::new("7", "north").with_bearing(0.0);
    let off_target = Landmark::new("7", "north").with_bearing(-40.0);
    let bare = Landmark::new("7", "north");
    let f = fixture(
        &["north"],
        vec![
            with_rect.clone(),
            at_bearing.clone(),
            off_target.clone(),
            bare.clone(),
        ],
    );
    f.put_saliency("7", "north", saliency_json(100, 100, &[(40, 10, 70, 30, 200)]));
    f.put_image("1", "north", block_png(100, 100, DARK, &[(40, 10, 70, 30, RED)]));

    run_task(&f.context, TaskKind::Score, &TaskInput::new("1", "7")).unwrap();

    let stored = f.landmarks.all();
    let find = |id: Uuid| stored.iter().find(|l| l.landmark_id == id).unwrap();

    assert!((find(with_rect.landmark_id).visual_saliency_score.unwrap() - 0.5).abs() < 1e-12);

    let resolved = find(at_bearing.landmark_id);
    assert_eq!(resolved.rect, Some(rect(40, 10, 70, 30)));
    assert!((resolved.visual_saliency_score.unwrap() - 1.0).abs() < 1e-12);

    let missed = find(off_target.landmark_id);
    assert_eq!(missed.rect, None);
    assert_eq!(missed.visual_saliency_score, Some(0.0));
    assert_eq!(find(bare.landmark_id).visual_saliency_score, Some(0.0));
}

#[test]
fn test_score_skips_positions_without_image() {
    let landmark = Landmark::new("7", "north").with_rect(rect(0, 0, 10, 10));
    let f = fixture(&["north"], vec![landmark.clone()]);
    f.put_saliency("7", "north", saliency_json(20, 20, &[(0, 0, 10, 10, 100)]));

    run_task(&f.context, TaskKind::Score, &TaskInput::new("1", "7")).unwrap();

    assert_eq!(f.landmarks.all(), vec![landmark]);
}

#[test]
fn test_score_rejects_mismatched_image() {
    let landmark = Landmark::new("7", "north").with_rect(rect(0, 0, 10, 10));
    let f = fixture(&["north"], vec![landmark.clone()]);
    f.put_saliency("7", "north", saliency_json(20, 20, &[(0, 0, 10, 10, 100)]));
    f.put_image("1", "north", block_png(30, 20, DARK, &[]));

    assert!(run_task(&f.context, TaskKind::Score, &TaskInput::new("1", "7")).is_err());
    assert_eq!(f.landmarks.all(), vec![landmark]);
}

#[test]
fn test_crop_stores_transparent_crops_of_rect_landmarks() {
    let boxed = Landmark::new("7", "north").with_rect(rect(10, 10, 30, 30));
    let unboxed = Landmark::new("7", "north").with_bearing(12.0);
    let f = fixture(&["north"], vec![boxed.clone(), unboxed]);
    f.put_image("1", "north", block_png(100, 100, DARK, &[(10, 10, 30, 30, RED)]));

    run_task(&f.context, TaskKind::Crop, &TaskInput::new("1", "7")).unwrap();

    let key = TaskContext::crop_key(boxed.landmark_id);
    assert_eq!(f.objects.keys("transparent-cropped-images"), vec![key.clone()]);
    assert!(f.objects.keys("cropped-images").is_empty());

    let stored = f
        .objects
        .object("transparent-cropped-images", &key)
        .unwrap();
    assert_eq!(stored.content_type, "image/png");
    let crop = decode(&stored.bytes);
    assert_eq!(crop.dimensions(), (20, 20));
    assert_eq!(crop.get_pixel(10, 10).0, [230, 60, 40, 255]);
}

#[test]
fn test_crop_skips_positions_without_image() {
    let boxed = Landmark::new("7", "north").with_rect(rect(10, 10, 30, 30));
    let f = fixture(&["north", "east"], vec![boxed.clone()]);
    f.put_image("1", "east", block_png(100, 100, DARK, &[(10, 10, 30, 30, RED)]));

    run_task(&f.context, TaskKind::Crop, &TaskInput::new("1", "7")).unwrap();

    assert!(f.objects.keys("transparent-cropped-images").is_empty());
    assert_eq!(f.landmarks.all(), vec![boxed]);
}

#[test]
fn test_crop_with_rect_outside_image_stores_nothing() {
    let inside = Landmark::new("7", "north").with_rect(rect(10, 10, 30, 30));
    let outside = Landmark::new("7", "north").with_rect(rect(90, 90, 120, 120));
    let f = fixture(&["north"], vec![inside, outside]);
    f.put_image("1", "north", block_png(100, 100, DARK, &[(10, 10, 30, 30, RED)]));

    assert!(run_task(&f.context, TaskKind::Crop, &TaskInput::new("1", "7")).is_err());
    assert!(f.objects.keys("transparent-cropped-images").is_empty());
}

#[test]
fn test_crop_from_saliency_inserts_scored_landmarks_with_crops() {
    let f = fixture(&["north", "south"], Vec::new());
    f.put_saliency("7", "north", saliency_json(100, 100, &[(10, 10, 30, 30, 200)]));
    f.put_image("1", "north", block_png(100, 100, DARK, &[(10, 10, 30, 30, RED)]));
    // Saliency without an image is skipped.
    f.put_saliency("7", "south", saliency_json(100, 100, &[(10, 10, 30, 30, 200)]));

    run_task(&f.context, TaskKind::CropFromSaliency, &TaskInput::new("1", "7")).unwrap();

    let stored = f.landmarks.all();
    assert_eq!(stored.len(), 1);
    let landmark = &stored[0];
    assert_eq!(landmark.position, "north");
    assert_eq!(landmark.rect, Some(rect(10, 10, 30, 30)));
    assert!((landmark.visual_saliency_score.unwrap() - 1.0).abs() < 1e-12);

    let key = TaskContext::crop_key(landmark.landmark_id);
    let opaque = decode(&f.objects.get("cropped-images", &key).unwrap());
    let alpha = decode(&f.objects.get("transparent-cropped-images", &key).unwrap());
    assert_eq!(opaque.dimensions(), (20, 20));
    assert_eq!(alpha.dimensions(), (20, 20));
    assert_eq!(opaque.get_pixel(0, 0).0, [230, 60, 40, 255]);
}

#[test]
fn test_crop_from_saliency_failure_commits_nothing() {
    let f = fixture(&["north"], Vec::new());
    f.put_saliency("7", "north", saliency_json(100, 100, &[(10, 10, 30, 30, 200)]));
    f.put_image("1", "north", block_png(80, 100, DARK, &[(10, 10, 30, 30, RED)]));

    assert!(run_task(&f.context, TaskKind::CropFromSaliency, &TaskInput::new("1", "7")).is_err());
    assert!(f.landmarks.all().is_empty());
    assert!(f.objects.keys("cropped-images").is_empty());
}
