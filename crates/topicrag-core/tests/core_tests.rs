use figment::Jail;

use topicrag_core::config::{Config, EmbeddingProvider, IndexBackend, SegmentSettings};
use topicrag_core::{CodeLanguage, ContentKind, Error, ProseFormat, Segmenter, SourceKind};

fn segmenter() -> Segmenter {
    Segmenter::new(SegmentSettings::default()).expect("default settings are valid")
}

#[test]
fn prose_with_blank_line_yields_ordered_chunks() {
    let doc = "Rust is a systems language.\nIt has no GC.\n\n\nCargo builds crates.\n\nTests live in tests/.";
    let chunks = segmenter().segment(doc.as_bytes(), ContentKind::Prose(ProseFormat::Markdown));
    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.sequence_index, i);
        assert_eq!(chunk.source_kind, SourceKind::Prose);
        assert!(!chunk.text.trim().is_empty());
        assert_eq!(chunk.origin_metadata.get("format").map(String::as_str), Some("md"));
    }
    assert_eq!(chunks[1].text, "Cargo builds crates.");
}

#[test]
fn tagged_and_filename_dispatch_agree() {
    let seg = segmenter();
    let src = b"def a():\n    return 1\n\ndef b():\n    return 2\n";
    let by_tag = seg.segment_tagged(src, "code", "py").expect("code/py is supported");
    let by_name = seg.segment_file(src, "tools/helpers.py").expect("py is supported");
    assert_eq!(by_tag, by_name);
    assert_eq!(by_tag.len(), 2);
    assert_eq!(by_tag[0].source_kind, SourceKind::Code);
}

#[test]
fn unsupported_kinds_are_rejected() {
    let seg = segmenter();
    assert!(matches!(seg.segment_file(b"x", "image.png"), Err(Error::UnsupportedFormat(_))));
    assert!(matches!(seg.segment_file(b"x", "Makefile"), Err(Error::UnsupportedFormat(_))));
    assert!(matches!(seg.segment_tagged(b"x", "prose", "py"), Err(Error::UnsupportedFormat(_))));
    assert!(matches!(seg.segment_tagged(b"x", "video", "mp4"), Err(Error::UnsupportedFormat(_))));
}

#[test]
fn extension_mapping_is_case_insensitive() {
    assert_eq!(ContentKind::from_filename("README.MD").ok(), Some(ContentKind::Prose(ProseFormat::Markdown)));
    assert_eq!(ContentKind::from_filename("app.Ts").ok(), Some(ContentKind::Code(CodeLanguage::TypeScript)));
}

#[test]
fn malformed_code_without_parser_never_fails() {
    let seg = segmenter();
    let inputs: [&[u8]; 4] = [b"", b"<?php function (", b"\xff\xfe\x00class", b"class A { function b( { } }"];
    for input in inputs {
        let chunks = seg.segment(input, ContentKind::Code(CodeLanguage::Php));
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
    }
}

#[test]
fn invalid_utf8_prose_is_decoded_lossily() {
    let chunks = segmenter().segment(b"caf\xe9 au lait\n\nsecond", ContentKind::Prose(ProseFormat::PlainText));
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].text.starts_with("caf"));
}

#[test]
fn unreadable_pdf_degrades_to_no_chunks() {
    let chunks = segmenter().segment(b"not really a pdf", ContentKind::Prose(ProseFormat::Pdf));
    assert!(chunks.is_empty());
}

#[test]
fn window_union_covers_text() {
    let cfg = SegmentSettings { chunk_size: 12, overlap: 4, max_paragraph_chars: 12 };
    let seg = Segmenter::new(cfg).expect("valid");
    let text = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJ";
    let windows = seg.window(text);
    assert!(text.starts_with(windows[0].as_str()));
    let mut rebuilt = windows[0].clone();
    for w in &windows[1..] {
        rebuilt.push_str(&w[4..]);
    }
    assert_eq!(rebuilt, text);
}

#[test]
fn invalid_segment_settings_are_rejected() {
    for cfg in [
        SegmentSettings { chunk_size: 10, overlap: 10, max_paragraph_chars: 100 },
        SegmentSettings { chunk_size: 10, overlap: 0, max_paragraph_chars: 100 },
        SegmentSettings { chunk_size: 100, overlap: 10, max_paragraph_chars: 50 },
    ] {
        assert!(matches!(Segmenter::new(cfg), Err(Error::InvalidConfig(_))));
    }
}

fn load() -> Result<topicrag_core::config::Settings, figment::Error> {
    Config::load()
        .and_then(|c| c.settings())
        .map_err(|e| figment::Error::from(e.to_string()))
}

#[test]
fn defaults_apply_without_any_files() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        let s = load()?;
        assert_eq!(s.index.backend, IndexBackend::Lance);
        assert_eq!(s.embedding.provider, EmbeddingProvider::Bert);
        assert_eq!(s.generation.max_retries, 3);
        assert_eq!(s.generation.max_tokens, 500);
        assert_eq!(s.retrieval.default_limit, 5);
        assert_eq!(s.segment.chunk_size, 1000);
        assert_eq!(s.embedding.batch_size, 32);
        Ok(())
    });
}

#[test]
fn files_then_env_override_in_order() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "dev");
        jail.create_file(
            "config.toml",
            r#"
            [generation]
            model = "from-base"
            max_retries = 5

            [retrieval]
            allowed_topics = ["docs", "code"]
            "#,
        )?;
        jail.create_file("config.dev.toml", "[generation]\nmodel = \"from-dev\"\n")?;
        jail.set_env("APP_GENERATION__MAX_RETRIES", "2");
        jail.set_env("OPENAI_API_KEY", "sk-test");
        let s = load()?;
        assert_eq!(s.generation.model, "from-dev");
        assert_eq!(s.generation.max_retries, 2);
        assert_eq!(s.generation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(s.retrieval.allowed_topics, vec!["docs".to_string(), "code".to_string()]);
        Ok(())
    });
}

#[test]
fn zero_retries_fail_validation() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.set_env("APP_GENERATION__MAX_RETRIES", "0");
        assert!(load().is_err());
        Ok(())
    });
}

#[test]
fn zero_embedding_batch_fails_validation() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "test");
        jail.set_env("APP_EMBEDDING__BATCH_SIZE", "0");
        assert!(load().is_err());
        Ok(())
    });
}

#[test]
fn production_rejects_memory_backend() {
    Jail::expect_with(|jail| {
        jail.set_env("RUST_ENV", "prod");
        jail.create_file("config.prod.toml", "[index]\nbackend = \"memory\"\n")?;
        assert!(load().is_err());
        Ok(())
    });
}
