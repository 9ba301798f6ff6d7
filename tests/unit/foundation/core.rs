use super::*;

#[test]
fn canvas_rejects_unset_sentinel() {
    assert!(matches!(
        Canvas::from_manifest(-1, 10),
        Err(CgError::UnknownDimension {
            width: -1,
            height: 10
        })
    ));
    assert!(matches!(
        Canvas::from_manifest(10, -1),
        Err(CgError::UnknownDimension { .. })
    ));
}

#[test]
fn canvas_accepts_zero_and_positive() {
    assert_eq!(
        Canvas::from_manifest(0, 0).unwrap(),
        Canvas {
            width: 0,
            height: 0
        }
    );
    let c = Canvas::from_manifest(3, 2).unwrap();
    assert_eq!(c.rgba8_len().unwrap(), 24);
}

#[test]
fn rgba_slice_roundtrip() {
    let px = Rgba8::from_slice(&[1, 2, 3, 4, 99]);
    assert_eq!(px, Rgba8::new(1, 2, 3, 4));
    assert_eq!(px.to_array(), [1, 2, 3, 4]);
    assert_eq!(Rgba8::default(), Rgba8::TRANSPARENT);
}
