use dspace_saf::{
    Bundle, Collaborators, Collection, ContentFile, ContentRequest, IiifRequest, Item, ModelError,
    RasterTransform, SafConfig, StdByteSource,
};
use image::{ImageBuffer, ImageFormat, Rgb};
use std::{fs, io::Cursor, path::Path};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_png(dir: &Path, name: &str, width: u32, height: u32) {
    let img = ImageBuffer::from_pixel(width, height, Rgb([0u8, 90, 160]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    fs::write(dir.join(name), out.into_inner()).unwrap();
}

#[test]
fn builds_and_exports_an_entity_item() {
    init_tracing();
    let cfg = SafConfig::default();
    let source_dir = TempDir::new().unwrap();
    let export_dir = TempDir::new().unwrap();
    write_png(source_dir.path(), "page1.png", 80, 60);
    fs::write(source_dir.path().join("thesis.pdf"), b"%PDF-1.7").unwrap();

    let bytes = StdByteSource::from_config(&cfg).unwrap();
    let images = RasterTransform;
    let collab = Collaborators::new(&bytes, &images, &cfg);
    let src = source_dir.path().to_str().unwrap();

    let mut item = Item::new("", "123456789/7");
    item.add_collection(Collection::new("", "123456789/2", "Theses"), false);
    item.add_collection(Collection::new("", "123456789/1", "Faculty"), true);
    item.entity.add_metadata("dc.title", "Paper", Some("en")).unwrap();
    item.enable_entity("Publication").unwrap();
    item.add_relation("isAuthorOfPublication", "a1b2").unwrap();

    item.add_content_file(
        "thesis.pdf",
        src,
        ContentRequest {
            bundle: Some("ORIGINAL"),
            permissions: vec![("r", "Anonymous")],
            ..Default::default()
        },
    )
    .unwrap();
    let page = item
        .add_content_file(
            "page1.png",
            src,
            ContentRequest {
                description: Some("Page 1"),
                bundle: Some("IIIF"),
                iiif: Some(IiifRequest {
                    target_width: 20,
                    toc: None,
                    collab,
                }),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(page.iiif_dimensions(), Some((80, 60)));

    assert_eq!(
        item.contents_lines(),
        vec![
            "thesis.pdf\tbundle:ORIGINAL\tpermissions:-r 'Anonymous'".to_string(),
            "page1.png\tbundle:IIIF\tdescription:Page 1\t\
             iiif-label:Page 1\tiiif-toc:page1\tiiif-width:80\tiiif-height:60"
                .to_string(),
        ]
    );
    assert_eq!(item.collections_lines(), vec!["123456789/1", "123456789/2"]);
    assert_eq!(
        item.relationships_lines(),
        vec!["relation.isAuthorOfPublication a1b2"]
    );
    assert_eq!(
        item.entity.metadata.export_lines(),
        vec!["dc.title\tPaper\ten", "dspace.entity.type\tPublication"]
    );

    for bundle in item.bundles(&cfg.default_bundle).unwrap() {
        bundle
            .persist_bitstreams(export_dir.path(), &bytes, cfg.fetch_timeout)
            .unwrap();
    }
    assert_eq!(
        fs::read(export_dir.path().join("thesis.pdf")).unwrap(),
        b"%PDF-1.7"
    );
    let reduced = fs::read(export_dir.path().join("page1.png")).unwrap();
    let reduced = image::load_from_memory(&reduced).unwrap();
    assert_eq!((reduced.width(), reduced.height()), (20, 15));
}

#[test]
fn second_persist_to_same_directory_fails() {
    init_tracing();
    let cfg = SafConfig::default();
    let source_dir = TempDir::new().unwrap();
    let export_dir = TempDir::new().unwrap();
    fs::write(source_dir.path().join("scan.jpg"), b"jpeg").unwrap();
    let bytes = StdByteSource::from_config(&cfg).unwrap();

    let mut bundle = Bundle::new("ORIGINAL", None).unwrap();
    let mut scan =
        ContentFile::new("scan.jpg", source_dir.path().to_str().unwrap()).with_primary(true);
    scan.add_permission("r", "Anonymous").unwrap();
    bundle.add_bitstream(scan);
    let scan = &bundle.bitstreams()[0];
    assert_eq!(
        scan.describe_line(),
        "scan.jpg\tbundle:ORIGINAL\tpermissions:-r 'Anonymous'\tprimary:true"
    );

    scan.persist_to(export_dir.path(), &bytes, cfg.fetch_timeout)
        .unwrap();
    let err = scan
        .persist_to(export_dir.path(), &bytes, cfg.fetch_timeout)
        .unwrap_err();
    assert!(matches!(err, ModelError::FileAlreadyExists(_)));
}

#[test]
fn missing_local_source_surfaces_as_resource_error() {
    let cfg = SafConfig::default();
    let empty = TempDir::new().unwrap();
    let bytes = StdByteSource::from_config(&cfg).unwrap();
    let mut file = ContentFile::new("gone.pdf", empty.path().to_str().unwrap());

    let err = file.compute_size(None, &bytes).unwrap_err();
    assert!(matches!(err, ModelError::SizeUnavailable(_)));

    let err = file.fetch_bytes(&bytes, cfg.fetch_timeout).unwrap_err();
    assert_eq!(err.class(), dspace_saf::ErrorClass::Resource);
}
