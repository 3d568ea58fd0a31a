use cavern_base::Vec3;
use cavern_model::{LabelFlags, LabelRecord, Survey, Traverse};
use cavern_view::animation::PresentationMark;
use cavern_view::gfx::hints::MemoryHints;
use cavern_view::gfx::lists::ListId;
use cavern_view::indicators::Indicator;
use cavern_view::view::Eye;
use cavern_view::{DisplayOptions, Renderer, SoftwareDevice, ViewControl, ViewDefaults};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

fn passage() -> Survey {
    let traverse = Traverse {
        points: vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(25.0, 20.0, -15.0),
            Vec3::new(50.0, 10.0, -40.0),
        ],
        surface: false,
    };
    let labels = vec![
        LabelRecord::new(Vec3::new(0.0, 0.0, 0.0), "top", LabelFlags::ENTRANCE),
        LabelRecord::new(Vec3::new(25.0, 20.0, -15.0), "middle", LabelFlags::UNDERGROUND),
        LabelRecord::new(Vec3::new(50.0, 10.0, -40.0), "sump", LabelFlags::UNDERGROUND),
    ];
    Survey::new(vec![traverse], Vec::new(), labels)
}

fn renderer() -> Renderer<SoftwareDevice> {
    let mut r = Renderer::new(
        SoftwareDevice::new(240, 180),
        Box::new(MemoryHints::new()),
        &passage(),
        DisplayOptions::default(),
    );
    r.resize(240, 180);
    r
}

fn angle_gap(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(TAU);
    d.min(TAU - d)
}

#[test]
fn defaults_are_applied_and_restored() {
    let defaults = ViewDefaults {
        scale: 2.0,
        pan_degrees: 90.0,
        tilt_degrees: 30.0,
        ..ViewDefaults::default()
    };
    let mut r = renderer().with_defaults(defaults);
    assert_eq!(r.view().scale(), 2.0);
    assert!(angle_gap(r.view().pan(), FRAC_PI_2) < 1.0e-12);

    r.set_scale(5.0);
    r.set_tilt(0.0);
    r.reset_to_defaults();
    assert_eq!(r.view().scale(), 2.0);
    assert!((r.view().tilt() - 30f64.to_radians()).abs() < 1.0e-12);
}

#[test]
fn redraw_flag_follows_requests_and_frames() {
    let mut r = renderer();
    assert!(r.needs_redraw());
    r.draw_frame();
    assert!(!r.needs_redraw());
    r.request_redraw();
    assert!(r.needs_redraw());
}

#[test]
fn highlight_ignores_unknown_stations() {
    let mut r = renderer();
    r.draw_frame();
    r.set_highlight(Some(42));
    assert_eq!(r.highlight(), None);
    assert!(!r.needs_redraw());

    let before = r.device().lit_pixels();
    r.set_highlight(Some(1));
    assert_eq!(r.highlight(), Some(1));
    assert!(r.needs_redraw());
    r.draw_frame();
    assert!(r.device().lit_pixels() > before);
}

#[test]
fn turning_names_on_places_labels() {
    let mut r = renderer();
    r.draw_frame();
    assert!(r.device().texts().is_empty());

    let options = DisplayOptions {
        names: true,
        ..r.options().clone()
    };
    r.set_options(options);
    r.device_mut().reset_log();
    r.draw_frame();
    assert!(!r.device().texts().is_empty());
    assert!(r.label_layout(Eye::Mono).is_valid());
}

#[test]
fn dashed_surface_toggle_only_rebuilds_surface_legs() {
    let mut r = renderer();
    r.draw_frame();
    let underground = r.gfx().list_generation(ListId::UndergroundLegs);
    let surface = r.gfx().list_generation(ListId::SurfaceLegs);

    let options = DisplayOptions {
        surface: true,
        surface_dashed: false,
        ..r.options().clone()
    };
    r.set_options(options);
    r.draw_frame();
    assert_eq!(r.gfx().list_generation(ListId::UndergroundLegs), underground);
    assert!(r.gfx().list_generation(ListId::SurfaceLegs) > surface);
}

#[test]
fn content_scale_change_rebuilds_hidpi_lists() {
    let mut r = renderer();
    r.draw_frame();
    let bar = r.gfx().list_generation(ListId::ScaleBar);
    let legs = r.gfx().list_generation(ListId::UndergroundLegs);

    r.set_content_scale(2.0);
    r.draw_frame();
    assert_eq!(r.gfx().list_generation(ListId::ScaleBar), bar + 1);
    assert_eq!(r.gfx().list_generation(ListId::UndergroundLegs), legs);

    // Same scale again is not a change.
    r.set_content_scale(2.0);
    r.draw_frame();
    assert_eq!(r.gfx().list_generation(ListId::ScaleBar), bar + 1);
}

#[test]
fn indicator_hit_test_finds_the_compass() {
    let r = renderer();
    let layout = r.indicator_layout();
    assert_eq!(r.hit_indicator(layout.compass_centre()), Some(Indicator::Compass));
    assert_eq!(r.hit_indicator(layout.clino_centre()), Some(Indicator::Clino));
    assert_eq!(r.hit_indicator(r.viewport().centre()), None);
}

#[test]
fn rotation_controls_drive_the_pan() {
    let mut r = renderer();
    r.animator_mut().toggle_rotation();
    assert!(r.animator().is_rotating());
    r.animator_mut().set_rotation_speed(PI);
    r.tick(0.25);
    assert!(angle_gap(r.view().pan(), PI / 4.0) < 1.0e-9);

    r.animator_mut().reverse_rotation();
    assert_eq!(r.animator().rotation_speed(), -PI);
    r.tick(0.25);
    assert!(angle_gap(r.view().pan(), 0.0) < 1.0e-9);

    r.animator_mut().stop_rotation();
    assert!(!r.animator().is_animating());
    assert!(!r.tick(1.0));
}

#[test]
fn plan_switch_and_presentation_report_progress() {
    let mut r = renderer();
    r.set_tilt(0.0);
    r.switch_to_plan();
    assert!(r.animator().is_switching());
    r.tick(10.0);
    assert!(!r.animator().is_switching());
    assert_eq!(r.view().tilt(), FRAC_PI_2);

    let mark = PresentationMark {
        translation: r.view().translation(),
        pan: 1.0,
        tilt: 0.5,
        scale: 3.0,
        seconds: 1.0,
    };
    r.animator_mut().play(vec![mark]);
    assert!(r.animator().is_playing());
    assert!(!r.tick(2.0));
    assert!(!r.animator().is_playing());
    assert_eq!(r.view().scale(), 3.0);
    assert!((r.view().tilt() - 0.5).abs() < 1.0e-12);
}
