use slidereel::{ObjectId, Template};

#[test]
fn json_fixture_parses_and_validates() {
    let s = include_str!("data/wedding_template.json");
    let template: Template = serde_json::from_str(s).unwrap();
    template.validate().unwrap();

    assert_eq!(template.slides.len(), 3);
    assert_eq!(template.elements.len(), 7);
    assert_eq!(template.total_duration_ms(), 9000);
}

#[test]
fn json_fixture_roundtrips() {
    let s = include_str!("data/wedding_template.json");
    let template: Template = serde_json::from_str(s).unwrap();

    let json = serde_json::to_string_pretty(&template).unwrap();
    let back: Template = serde_json::from_str(&json).unwrap();
    assert_eq!(back, template);
}

#[test]
fn json_fixture_mixes_pending_and_persisted_ids() {
    let s = include_str!("data/wedding_template.json");
    let template: Template = serde_json::from_str(s).unwrap();

    let pending: Vec<ObjectId> = template
        .elements
        .iter()
        .map(|e| e.id)
        .filter(|id| id.is_pending())
        .collect();
    assert_eq!(pending, vec![ObjectId::Pending(3)]);
    assert!(template.slides.iter().all(|s| !s.id.is_pending()));
}
