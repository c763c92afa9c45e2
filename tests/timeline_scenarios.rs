//! End-to-end timeline behavior: the scenarios the builder's preview player
//! depends on, exercised through the public API only.

use slidereel::{
    AnimationSpec, AnimationType, CanvasSize, ElementKind, Evaluator, PlaybackController, Template,
    TextStyle, locate,
};

fn two_slide_template() -> Template {
    let mut t = Template::new();
    t.slides[0].duration_ms = 3000;
    t.add_slide();
    t.slides[1].duration_ms = 2000;
    t
}

#[test]
fn elapsed_3500_is_slide_two_at_quarter() {
    let t = two_slide_template();
    let cursor = locate(&t.slides, 3500.0).unwrap();
    assert_eq!(cursor.slide_index, 1);
    assert!((cursor.local_progress - 0.25).abs() < 1e-12);
}

#[test]
fn elapsed_wraps_modulo_total_duration() {
    let t = two_slide_template();
    // 8500 mod 5000 = 3500: same frame as above.
    let wrapped = locate(&t.slides, 8500.0).unwrap();
    let direct = locate(&t.slides, 3500.0).unwrap();
    assert_eq!(wrapped, direct);
}

#[test]
fn every_instant_belongs_to_exactly_one_slide() {
    let t = two_slide_template();
    let total = t.total_duration_ms();
    for ms in (0..total).step_by(50) {
        let cursor = locate(&t.slides, ms as f64).unwrap();
        assert!(cursor.local_progress >= 0.0);
        assert!(cursor.local_progress < 1.0);

        // The cursor's window really contains the instant.
        let start = cursor.slide_start_ms as f64;
        let end = start + t.slides[cursor.slide_index].duration_ms as f64;
        assert!((ms as f64) >= start && (ms as f64) < end);
    }
}

#[test]
fn seek_half_lands_in_the_straddling_slide() {
    let t = two_slide_template();
    let mut player = PlaybackController::new(t.total_duration_ms() as f64);

    let outcome = player.seek(0.5, 0.0);
    assert!(outcome.render_once);

    let elapsed = player.elapsed_ms(0.0);
    assert_eq!(elapsed, 2500.0);
    // 2500ms sits inside slide 1 (0..3000).
    let cursor = locate(&t.slides, elapsed).unwrap();
    assert_eq!(cursor.slide_index, 0);
}

#[test]
fn delayed_fade_in_opacity_curve() {
    // Element with delay 500ms / duration 1000ms on a 3000ms slide:
    // invisible at slide start, eased(0.5) ~ 0.875 at 1000ms elapsed.
    let mut t = Template::new();
    t.slides[0].duration_ms = 3000;
    let slide_id = t.slides[0].id;
    let id = t.add_element(ElementKind::Text {
        style: TextStyle {
            text: "hello".to_string(),
            ..TextStyle::default()
        },
    });
    t.attach_element(id, slide_id, 50.0, 50.0).unwrap();
    t.element_mut(id).unwrap().animation = AnimationSpec {
        animation_type: AnimationType::FadeIn,
        delay_ms: 500,
        duration_ms: 1000,
    };

    let surface = CanvasSize::default();
    let start = Evaluator::eval_slide(&t, 0, 0.0, surface).unwrap();
    assert_eq!(start.texts[0].opacity, 0.0);

    let mid = Evaluator::eval_slide(&t, 0, 1000.0 / 3000.0, surface).unwrap();
    assert!((f64::from(mid.texts[0].opacity) - 0.875).abs() < 1e-6);

    let settled = Evaluator::eval_slide(&t, 0, 0.9, surface).unwrap();
    assert_eq!(settled.texts[0].opacity, 1.0);
}

#[test]
fn removing_down_to_one_slide_then_refusing() {
    let mut t = two_slide_template();
    t.remove_slide(1).unwrap();
    assert_eq!(t.slides.len(), 1);

    let err = t.remove_slide(0).unwrap_err();
    assert!(err.to_string().contains("at least one slide"));
    assert_eq!(t.slides.len(), 1);
}

#[test]
fn model_roundtrip_preserves_timeline_semantics() {
    let mut t = two_slide_template();
    let slide_id = t.slides[1].id;
    let id = t.add_element(ElementKind::Text {
        style: TextStyle {
            text: "rsvp".to_string(),
            ..TextStyle::default()
        },
    });
    t.attach_element(id, slide_id, 20.0, 80.0).unwrap();

    let json = serde_json::to_string(&t).unwrap();
    let back: Template = serde_json::from_str(&json).unwrap();

    assert_eq!(back, t);
    assert_eq!(back.total_duration_ms(), t.total_duration_ms());
    let a = locate(&back.slides, 4100.0).unwrap();
    let b = locate(&t.slides, 4100.0).unwrap();
    assert_eq!(a, b);
}

#[test]
fn paused_player_resumes_exactly_where_it_froze() {
    let t = two_slide_template();
    let mut player = PlaybackController::new(t.total_duration_ms() as f64);

    player.play(0.0);
    player.pause(1234.0);
    assert_eq!(player.elapsed_ms(9_999.0), 1234.0);

    player.play(20_000.0);
    assert_eq!(player.elapsed_ms(20_766.0), 2000.0);
    let cursor = locate(&t.slides, player.elapsed_ms(20_766.0)).unwrap();
    assert_eq!(cursor.slide_index, 0);
}
