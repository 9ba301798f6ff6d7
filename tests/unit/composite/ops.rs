use super::*;

#[test]
fn source_over_matches_reference_scenario() {
    let out = source_over(Rgba8::TRANSPARENT, Rgba8::new(10, 20, 30, 200));
    assert_eq!(out, Rgba8::new(7, 15, 23, 255));
}

#[test]
fn source_over_alpha_is_always_opaque() {
    let out = source_over(Rgba8::new(40, 50, 60, 0), Rgba8::new(1, 2, 3, 0));
    assert_eq!(out, Rgba8::new(40, 50, 60, 255));

    let out = source_over(Rgba8::TRANSPARENT, Rgba8::TRANSPARENT);
    assert_eq!(out.a, 255);
}

#[test]
fn source_over_opaque_top_replaces_colour() {
    let out = source_over(Rgba8::new(9, 9, 9, 255), Rgba8::new(200, 100, 50, 255));
    assert_eq!(out, Rgba8::new(200, 100, 50, 255));
}

#[test]
fn source_over_saturated_inputs_stay_in_range() {
    for a in [0u8, 1, 127, 128, 254, 255] {
        let out = source_over(Rgba8::new(255, 255, 255, 255), Rgba8::new(255, 255, 255, a));
        assert_eq!(out, Rgba8::new(255, 255, 255, 255));
    }

    let out = source_over(Rgba8::new(255, 255, 255, 255), Rgba8::new(0, 0, 0, 128));
    assert_eq!(out, Rgba8::new(127, 127, 127, 255));
}

#[test]
fn alpha_replace_passes_through_marker_only() {
    let bottom = Rgba8::new(1, 2, 3, 4);
    assert_eq!(alpha_replace(bottom, Rgba8::MAGENTA_TRANSPARENT), bottom);

    let almost = Rgba8::new(255, 0, 255, 1);
    assert_eq!(alpha_replace(bottom, almost), almost);

    let clear = Rgba8::new(0, 0, 0, 0);
    assert_eq!(alpha_replace(bottom, clear), clear);
}

#[test]
fn identifiers_resolve_to_operators() {
    assert_eq!(
        CompositeOp::from_id("svg:src-over").unwrap(),
        CompositeOp::SourceOver
    );
    assert_eq!(
        CompositeOp::from_id("cgcompress:alpha-replace").unwrap(),
        CompositeOp::AlphaReplace
    );
    assert_eq!(CompositeOp::default(), CompositeOp::SourceOver);
    for op in CompositeOp::ALL {
        assert_eq!(CompositeOp::from_id(op.id()).unwrap(), op);
    }
}

#[test]
fn resolve_rejects_unknown_identifier() {
    assert!(matches!(
        resolve("svg:multiply"),
        Err(CgError::UnsupportedOperator(id)) if id == "svg:multiply"
    ));
    assert!(matches!(resolve(""), Err(CgError::UnsupportedOperator(_))));

    let f = resolve("cgcompress:alpha-replace").unwrap();
    let bottom = Rgba8::new(5, 6, 7, 8);
    assert_eq!(f(bottom, Rgba8::MAGENTA_TRANSPARENT), bottom);
}
