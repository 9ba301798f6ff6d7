use std::sync::atomic::{AtomicU64, Ordering};

use super::*;
use crate::assets::archive::MemoryArchiveStore;
use crate::composite::ops::CompositeOp;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Rgba8;

/// Decodes `[w, h, r, g, b, a]` into a filled image and counts invocations.
#[derive(Clone, Default)]
struct SolidDecoder {
    calls: Arc<AtomicU64>,
}

impl ImageDecoder for SolidDecoder {
    fn decode(&self, bytes: &[u8]) -> anyhow::Result<DecodedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let [w, h, r, g, b, a] = bytes else {
            anyhow::bail!("expected 6 bytes, got {}", bytes.len());
        };
        Ok(DecodedImage::filled(
            u32::from(*w),
            u32::from(*h),
            Rgba8::new(*r, *g, *b, *a),
        ))
    }
}

const MANIFEST: &str = r#"<image w="2" h="2">
  <stack>
    <layer src="data/dot.bin" x="1" y="1"/>
    <layer src="data/base.bin"/>
  </stack>
  <stack>
    <layer src="data/patch.bin" composite-op="cgcompress:alpha-replace"/>
    <layer src="data/base.bin"/>
  </stack>
</image>"#;

fn store(mimetype: Option<&str>) -> MemoryArchiveStore {
    let mut s = MemoryArchiveStore::new()
        .with_entry("stack.xml", MANIFEST)
        .unwrap()
        .with_entry("data/base.bin", vec![2, 2, 10, 20, 30, 200])
        .unwrap()
        .with_entry("data/dot.bin", vec![1, 1, 255, 255, 255, 255])
        .unwrap()
        .with_entry("data/patch.bin", vec![1, 1, 9, 8, 7, 6])
        .unwrap();
    if let Some(m) = mimetype {
        s.insert(MIMETYPE_ENTRY, m).unwrap();
    }
    s
}

fn open(store: MemoryArchiveStore, opts: &SessionOpts) -> (CgResult<ArchiveSession>, SolidDecoder) {
    let decoder = SolidDecoder::default();
    let session = ArchiveSession::open(Box::new(store), Box::new(decoder.clone()), opts);
    (session, decoder)
}

#[test]
fn open_parses_manifest() {
    let (session, _) = open(store(Some(ORA_MIMETYPE)), &SessionOpts::default());
    let session = session.unwrap();
    assert_eq!(session.stack_count(), 2);
    assert_eq!(session.manifest().width, 2);
    assert_eq!(
        session.manifest().stacks[1].layers[0].op,
        CompositeOp::AlphaReplace
    );
    assert!(session.cache().is_empty());
}

#[test]
fn render_uses_cache_across_stacks() {
    let (session, decoder) = open(store(Some(ORA_MIMETYPE)), &SessionOpts::default());
    let session = session.unwrap();

    let first = session.render(0).unwrap();
    assert_eq!(first.pixel(0, 0), Some(Rgba8::new(7, 15, 23, 255)));
    assert_eq!(first.pixel(1, 1), Some(Rgba8::new(255, 255, 255, 255)));

    let second = session.render(1).unwrap();
    assert_eq!(second.pixel(0, 0), Some(Rgba8::new(9, 8, 7, 6)));
    assert_eq!(second.pixel(1, 1), Some(Rgba8::new(7, 15, 23, 255)));

    session.render(0).unwrap();
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 3);
    assert_eq!(session.cache().decode_count("data/base.bin"), 1);
}

#[test]
fn render_out_of_range() {
    let (session, _) = open(store(None), &SessionOpts::default());
    let err = session.unwrap().render(2).unwrap_err();
    assert!(matches!(err, CgError::StackOutOfRange { index: 2, count: 2 }));
}

#[test]
fn render_all_matches_individual_renders() {
    let (session, decoder) = open(store(None), &SessionOpts::default());
    let session = session.unwrap();

    let all = session.render_all(&RenderAllOpts::default()).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0], session.render(0).unwrap());
    assert_eq!(all[1], session.render(1).unwrap());
    assert_eq!(decoder.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn render_into_streams_in_order() {
    let (session, _) = open(store(None), &SessionOpts::default());
    let session = session.unwrap();
    let mut sink = InMemorySink::new();

    session
        .render_into(
            &mut sink,
            &RenderAllOpts {
                parallel: false,
                threads: None,
            },
        )
        .unwrap();

    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height, cfg.stack_count), (2, 2, 2));
    assert!(sink.is_finished());
    assert_eq!(sink.buffers()[0].0, 0);
    assert_eq!(sink.buffers()[1].0, 1);
}

#[test]
fn lenient_policy_accepts_missing_mimetype() {
    let (session, _) = open(store(None), &SessionOpts::default());
    assert!(session.is_ok());
}

#[test]
fn require_policy_rejects_missing_mimetype() {
    let opts = SessionOpts {
        mimetype: MimetypePolicy::Require,
        ..SessionOpts::default()
    };
    let (session, _) = open(store(None), &opts);
    assert!(matches!(session, Err(CgError::InvalidContainer(_))));

    let (session, _) = open(store(Some("image/openraster\n")), &opts);
    assert!(session.is_ok());
}

#[test]
fn wrong_mimetype_is_rejected_under_any_policy() {
    let (session, _) = open(store(Some("application/zip")), &SessionOpts::default());
    assert!(matches!(session, Err(CgError::InvalidContainer(_))));
}

#[test]
fn missing_manifest_entry() {
    let opts = SessionOpts {
        manifest_entry: "other.xml".to_string(),
        ..SessionOpts::default()
    };
    let (session, _) = open(store(None), &opts);
    assert!(matches!(session, Err(CgError::EntryNotFound(name)) if name == "other.xml"));
}

#[test]
fn missing_asset_fails_only_at_render() {
    let s = MemoryArchiveStore::new()
        .with_entry(
            "stack.xml",
            r#"<image w="1" h="1"><stack><layer src="data/gone.bin"/></stack></image>"#,
        )
        .unwrap();
    let (session, _) = open(s, &SessionOpts::default());
    let session = session.unwrap();

    let err = session.render(0).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        CgError::AssetNotFound(name) if name == "data/gone.bin"
    ));
}
