use mapcompose::color::Rgba;
use mapcompose::colormap::{Colormap, Norm, ScalarMappable};
use mapcompose::data::Datum;
use mapcompose::error::MapError;
use mapcompose::style::MarkerShape;
use mapcompose::thematic::{OutputKind, ThemeClass, ThematicStyle};

fn color(name: &str) -> Rgba {
    Rgba::parse(name).unwrap()
}

fn num(v: f64) -> Datum {
    Datum::Number(v)
}

fn traffic_light() -> ThematicStyle<Rgba> {
    ThematicStyle::ranges(
        vec![0.0, 1.0, 10.0, 25.0, 50.0],
        vec![color("red"), color("orange"), color("yellow"), color("green")],
    )
    .unwrap()
}

#[test]
fn ranges_resolve_into_half_open_bins() {
    let style = traffic_light();
    assert_eq!(style.resolve(Some(&num(5.0))).unwrap().1, color("orange"));
    assert_eq!(style.resolve(Some(&num(10.0))).unwrap().1, color("yellow"));
    // the last bin is closed
    assert_eq!(style.resolve(Some(&num(50.0))).unwrap().1, color("green"));
}

#[test]
fn ranges_clip_out_of_range_values() {
    let style = traffic_light();
    assert_eq!(style.resolve(Some(&num(-1.0))).unwrap().1, color("red"));
    assert_eq!(style.resolve(Some(&num(60.0))).unwrap().1, color("green"));

    let style = traffic_light()
        .with_under(color("blue"))
        .with_over(color("black"));
    assert_eq!(
        style.resolve(Some(&num(-1.0))).unwrap(),
        (ThemeClass::Under, color("blue"))
    );
    assert_eq!(
        style.resolve(Some(&num(60.0))).unwrap(),
        (ThemeClass::Over, color("black"))
    );
}

#[test]
fn nan_uses_bad_style_or_fails() {
    let err = traffic_light().resolve(Some(&num(f64::NAN))).unwrap_err();
    assert!(matches!(err, MapError::Unclassified { .. }));

    let style = traffic_light().with_bad(color("gray"));
    assert_eq!(
        style.resolve(Some(&num(f64::NAN))).unwrap(),
        (ThemeClass::Bad, color("gray"))
    );
}

#[test]
fn gradient_interpolates_scalars() {
    let sizes = ThematicStyle::gradient(vec![1.0, 3.0, 5.0], vec![4.0, 12.0, 24.0]).unwrap();
    let at = |v: f64| sizes.resolve(Some(&num(v))).unwrap().1;
    assert_eq!(at(2.0), 8.0);
    assert_eq!(at(4.0), 18.0);
    assert_eq!(at(1.0), 4.0);
    assert_eq!(at(5.0), 24.0);
    // clamped at the edges
    assert_eq!(at(0.0), 4.0);
    assert_eq!(at(9.0), 24.0);
}

#[test]
fn individual_maps_exact_values() {
    let shapes = ThematicStyle::individual(
        vec!["Doel".into(), "Tihange".into()],
        vec![MarkerShape::Circle, MarkerShape::Square],
    )
    .unwrap();
    assert_eq!(
        shapes.resolve(Some(&"Doel".into())).unwrap().1,
        MarkerShape::Circle
    );
    assert_eq!(
        shapes.resolve(Some(&"Tihange".into())).unwrap().1,
        MarkerShape::Square
    );
    let err = shapes.resolve(Some(&"Borssele".into())).unwrap_err();
    assert!(matches!(err, MapError::UnmappedValue { .. }));
}

#[test]
fn individual_treats_negative_zero_as_zero() {
    let style = ThematicStyle::individual(vec![num(0.0)], vec![color("red")]).unwrap();
    assert_eq!(style.resolve(Some(&num(-0.0))).unwrap().1, color("red"));
}

#[test]
fn construction_rejects_inconsistent_rules() {
    assert!(ThematicStyle::ranges(vec![0.0, 1.0], vec![color("red"), color("blue")]).is_err());
    assert!(ThematicStyle::ranges(vec![0.0, 2.0, 1.0], vec![1.0, 2.0]).is_err());
    assert!(ThematicStyle::gradient(vec![1.0], vec![1.0]).is_err());
    assert!(
        ThematicStyle::gradient(vec![0.0, 1.0], vec![MarkerShape::Circle, MarkerShape::Square])
            .is_err()
    );
    let sm = ScalarMappable::new(Norm::linear(0.0, 1.0), Colormap::grayscale());
    assert!(ThematicStyle::<f64>::colormap(sm).is_err());
}

#[test]
fn output_kind_is_declared_by_type() {
    assert_eq!(traffic_light().output_kind(), OutputKind::Color);
    assert!(traffic_light().is_color_style());
    let sizes = ThematicStyle::gradient(vec![0.0, 1.0], vec![2.0, 4.0]).unwrap();
    assert_eq!(sizes.output_kind(), OutputKind::Scalar);
    assert!(!sizes.is_color_style());
}

#[test]
fn default_class_labels() {
    let style = traffic_light()
        .with_under(color("blue"))
        .with_bad(color("gray"));
    assert_eq!(style.class_label(ThemeClass::Index(0)), "0 - 1");
    assert_eq!(style.class_label(ThemeClass::Index(3)), "25 - 50");
    assert_eq!(style.class_label(ThemeClass::Under), "< 0");
    assert_eq!(style.class_label(ThemeClass::Bad), "n/a");

    let big = ThematicStyle::ranges(vec![0.0, 1500.0, 2500.5], vec![1.0, 2.0]).unwrap();
    assert_eq!(big.class_label(ThemeClass::Index(1)), "1,500 - 2,500.5");
}

#[test]
fn individual_under_over_labels_ignore_key_order() {
    let style = ThematicStyle::individual(vec![num(10.0), num(1.0)], vec![4.0, 8.0])
        .unwrap()
        .with_under(2.0)
        .with_over(16.0);
    let (class, size) = style.resolve(Some(&num(0.0))).unwrap();
    assert_eq!((class, size), (ThemeClass::Under, 2.0));
    assert_eq!(style.resolve(Some(&num(12.0))).unwrap().0, ThemeClass::Over);
    assert_eq!(style.class_label(ThemeClass::Under), "< 1");
    assert_eq!(style.class_label(ThemeClass::Over), "> 10");
}

#[test]
fn ranges_colorbar_uses_boundary_norm() {
    let sm = traffic_light().to_scalar_mappable().unwrap();
    assert_eq!(
        sm.norm,
        Norm::Boundary {
            boundaries: vec![0.0, 1.0, 10.0, 25.0, 50.0]
        }
    );
    assert_eq!(sm.to_rgba(5.0), color("orange"));
}
