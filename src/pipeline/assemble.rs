//! PDF assembly: image pages and single-page PDFs → one merged PDF.
//!
//! Each source contributes its pages, in its own page order, after the pages
//! of every earlier source. Sources are told apart by content (`%PDF` magic),
//! not extension; anything else is decoded as an image and laid out on a
//! page of exactly its pixel size at the requested DPI.
//!
//! The merged document is written to a temporary file beside the destination
//! and renamed into place, so a failed run never leaves a partial PDF.

use crate::error::ShuffleError;
use crate::output::AssembledPdf;
use crate::pipeline::input::has_pdf_magic;
use image::{imageops, DynamicImage, Rgba, RgbaImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MM_PER_INCH: f32 = 25.4;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guards against a malformed page tree whose `/Parent` links form a cycle.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Lay `img` out on a single PDF page of its own size at `dpi`.
///
/// The image is flattened onto white, so transparent areas stay blank, and
/// placed at the origin with no margin. The page aspect ratio equals the
/// image aspect ratio.
pub fn image_to_pdf_bytes(img: &DynamicImage, dpi: u32, title: &str) -> Vec<u8> {
    let dpi = dpi.max(1) as f32;
    let page_w = Mm(img.width() as f32 / dpi * MM_PER_INCH);
    let page_h = Mm(img.height() as f32 / dpi * MM_PER_INCH);

    let raw = RawImage {
        pixels: RawImageData::U8(flatten_on_white(img).into_raw()),
        width: img.width() as usize,
        height: img.height() as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new(title);
    let xobject_id = doc.add_image(&raw);

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: Some(1.0),
            scale_y: Some(1.0),
            dpi: Some(dpi),
            rotate: None,
        },
    }];
    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!("printpdf reported {} warnings for {}", warnings.len(), title);
    }
    bytes
}

fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let mut canvas = RgbaImage::from_pixel(img.width(), img.height(), Rgba([255, 255, 255, 255]));
    imageops::overlay(&mut canvas, &img.to_rgba8(), 0, 0);
    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Convert the image at `image_path` into a single-page PDF at `output`.
pub fn image_to_pdf(image_path: &Path, output: &Path, dpi: u32) -> Result<PathBuf, ShuffleError> {
    let img = image::open(image_path).map_err(|e| ShuffleError::ImageReadFailed {
        path: image_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let bytes = image_to_pdf_bytes(&img, dpi, &file_title(image_path));
    write_atomically(output, |w| w.write_all(&bytes).map_err(|e| e.to_string()))?;
    Ok(output.to_path_buf())
}

/// Merge `sources` in order into one PDF at `output`.
///
/// Image sources are laid out at `image_dpi`.
///
/// # Errors
/// [`ShuffleError::EmptyInputSet`] for no sources;
/// [`ShuffleError::MergeFailed`] if any source cannot be opened or the
/// result cannot be written. `output` is not created on failure.
pub fn assemble_pdf(
    sources: &[PathBuf],
    output: &Path,
    image_dpi: u32,
) -> Result<AssembledPdf, ShuffleError> {
    if sources.is_empty() {
        return Err(ShuffleError::EmptyInputSet {
            operation: "assemble",
        });
    }

    let mut max_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for source in sources {
        let mut doc = load_source(source, image_dpi)?;
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        // get_pages is keyed by page number, so this is document order.
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(ShuffleError::merge(source, "document has no pages"));
        }
        for id in &page_ids {
            let mut page = doc
                .get_dictionary(*id)
                .map_err(|e| ShuffleError::merge(source, e))?
                .clone();
            inherit_page_attributes(&doc, &mut page);
            pages.push((*id, page));
        }

        for (id, object) in doc.objects {
            match object.type_name().unwrap_or_default() {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(id, object);
                }
            }
        }
        debug!("Queued {} page(s) from {}", page_ids.len(), source.display());
    }

    let page_count = pages.len();
    let mut merged = Document::with_version("1.5");
    merged.objects = objects;
    merged.max_id = max_id;

    let pages_id = merged.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
        kids.push(Object::Reference(id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count as i64)),
    ]);
    merged
        .objects
        .insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = merged.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    merged.trailer.set("Root", catalog_id);

    merged.renumber_objects();
    merged.compress();

    write_atomically(output, |w| merged.save_to(w).map_err(|e| e.to_string()))?;

    info!(
        "Assembled {} page(s) from {} source(s) → {}",
        page_count,
        sources.len(),
        output.display()
    );

    Ok(AssembledPdf {
        path: output.to_path_buf(),
        page_count,
        sources: sources.to_vec(),
    })
}

/// Open one merge source, converting images to PDF in memory.
fn load_source(source: &Path, image_dpi: u32) -> Result<Document, ShuffleError> {
    if has_pdf_magic(source) {
        let doc = Document::load(source).map_err(|e| ShuffleError::merge(source, e))?;
        if doc.is_encrypted() {
            return Err(ShuffleError::merge(source, "encrypted PDFs cannot be merged"));
        }
        return Ok(doc);
    }

    let img = image::open(source)
        .map_err(|e| ShuffleError::merge(source, format!("neither a PDF nor an image: {}", e)))?;
    let bytes = image_to_pdf_bytes(&img, image_dpi, &file_title(source));
    Document::load_mem(&bytes).map_err(|e| ShuffleError::merge(source, e))
}

/// Copy attributes the page inherits from its page-tree ancestors onto it.
///
/// The source page tree is discarded during the merge, so anything not on
/// the page itself would otherwise be lost.
fn inherit_page_attributes(doc: &Document, page: &mut Dictionary) {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        depth += 1;
        if depth > MAX_PAGE_TREE_DEPTH {
            warn!("Page tree deeper than {} levels; stopped inheriting", MAX_PAGE_TREE_DEPTH);
            break;
        }
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE_PAGE_KEYS {
            if !page.has(key) {
                if let Ok(value) = node.get(key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
}

fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string())
}

/// Write `output` through a temp file in the same directory, then rename.
fn write_atomically<F>(output: &Path, write: F) -> Result<(), ShuffleError>
where
    F: FnOnce(&mut std::fs::File) -> Result<(), String>,
{
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ShuffleError::merge(output, e))?;
    write(tmp.as_file_mut()).map_err(|e| ShuffleError::merge(output, e))?;
    tmp.as_file_mut()
        .flush()
        .map_err(|e| ShuffleError::merge(output, e))?;
    tmp.persist(output)
        .map_err(|e| ShuffleError::merge(output, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use lopdf::{dictionary, Stream};

    /// A one-page PDF whose MediaBox lives on the Pages node, not the page.
    fn write_pdf(path: &Path, width: i64, height: i64) {
        write_pdf_with_content(path, width, height, b"0 0 m");
    }

    fn write_pdf_with_content(path: &Path, width: i64, height: i64, content: &[u8]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn number(o: &Object) -> f32 {
        match o {
            Object::Integer(i) => *i as f32,
            Object::Real(r) => *r as f32,
            other => panic!("not a number: {other:?}"),
        }
    }

    fn page_sizes(path: &Path) -> Vec<(f32, f32)> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| {
                let page = doc.get_dictionary(id).unwrap();
                let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
                (
                    number(&media[2]) - number(&media[0]),
                    number(&media[3]) - number(&media[1]),
                )
            })
            .collect()
    }

    #[test]
    fn pages_follow_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let c = dir.path().join("c.pdf");
        write_pdf(&a, 100, 200);
        write_pdf(&b, 300, 400);
        write_pdf(&c, 500, 600);

        let out = dir.path().join("merged.pdf");
        let merged = assemble_pdf(&[b.clone(), c.clone(), a.clone()], &out, 72).unwrap();
        assert_eq!(merged.page_count, 3);
        assert_eq!(merged.sources, vec![b, c, a]);
        assert_eq!(
            page_sizes(&out),
            vec![(300.0, 400.0), (500.0, 600.0), (100.0, 200.0)]
        );
    }

    fn page_contents(path: &Path) -> Vec<Vec<u8>> {
        let doc = Document::load(path).unwrap();
        doc.get_pages()
            .into_values()
            .map(|id| doc.get_page_content(id).unwrap())
            .collect()
    }

    /// Decoded pixels of every image XObject, with bytes per pixel.
    fn image_xobjects(path: &Path) -> Vec<(u32, u32, usize, Vec<u8>)> {
        let doc = Document::load(path).unwrap();
        doc.objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Subtype")
                    .and_then(|t| t.as_name())
                    .map(|n| n == b"Image")
                    .unwrap_or(false)
            })
            .map(|s| {
                let w = s.dict.get(b"Width").unwrap().as_i64().unwrap() as u32;
                let h = s.dict.get(b"Height").unwrap().as_i64().unwrap() as u32;
                let is_jpeg = s
                    .dict
                    .get(b"Filter")
                    .and_then(|f| f.as_name())
                    .map(|n| n == b"DCTDecode")
                    .unwrap_or(false);
                let data = if is_jpeg {
                    image::load_from_memory(&s.content).unwrap().to_rgb8().into_raw()
                } else {
                    s.decompressed_content().unwrap_or_else(|_| s.content.clone())
                };
                let channels = data.len() / (w * h) as usize;
                (w, h, channels, data)
            })
            .collect()
    }

    #[test]
    fn merged_pages_keep_their_source_content() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        write_pdf_with_content(&a, 100, 100, b"1 0 0 RG 0 0 m 10 10 l S");
        write_pdf_with_content(&b, 100, 100, b"0 0 1 RG 0 0 m 50 20 l S");

        let out = dir.path().join("merged.pdf");
        assemble_pdf(&[b.clone(), a.clone(), b.clone()], &out, 72).unwrap();

        let source_a = page_contents(&a).remove(0);
        let source_b = page_contents(&b).remove(0);
        assert_eq!(
            page_contents(&out),
            vec![source_b.clone(), source_a, source_b]
        );
    }

    #[test]
    fn transparent_pixels_stay_white() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("slot_0_combined.png");
        let mut rgba = RgbaImage::from_pixel(6, 4, Rgba([255, 255, 255, 255]));
        for x in 2..6 {
            for y in 0..2 {
                rgba.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        rgba.save(&img).unwrap();

        let out = dir.path().join("out.pdf");
        assemble_pdf(&[img], &out, 72).unwrap();

        let images = image_xobjects(&out);
        assert_eq!(images.len(), 1);
        let (w, h, channels, data) = &images[0];
        assert_eq!((*w, *h), (6, 4));
        assert!(*channels >= 1);
        assert!(
            data.iter().all(|&v| v >= 250),
            "transparent area rendered dark: {data:?}"
        );
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let mut rgba = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        rgba.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        let flat = flatten_on_white(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(flat.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(flat.get_pixel(1, 0).0, [255, 255, 255]);
    }

    #[test]
    fn image_source_becomes_one_page_with_matching_aspect() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("slot_0.png");
        RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]))
            .save(&img)
            .unwrap();

        let out = dir.path().join("out.pdf");
        let merged = assemble_pdf(&[img], &out, 100).unwrap();
        assert_eq!(merged.page_count, 1);

        let sizes = page_sizes(&out);
        assert_eq!(sizes.len(), 1);
        let (w, h) = sizes[0];
        // 200 x 100 px at 100 DPI is 144 x 72 pt.
        assert!((w - 144.0).abs() < 0.5, "width {w}");
        assert!((h - 72.0).abs() < 0.5, "height {h}");
    }

    #[test]
    fn mixed_sources_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("p.pdf");
        write_pdf(&pdf, 612, 792);
        let img = dir.path().join("i.jpg");
        image::DynamicImage::ImageRgb8(RgbImage::new(50, 80))
            .save(&img)
            .unwrap();

        let out = dir.path().join("out.pdf");
        let merged = assemble_pdf(&[img, pdf.clone(), pdf], &out, 72).unwrap();
        assert_eq!(merged.page_count, 3);
        assert_eq!(page_sizes(&out).len(), 3);
    }

    #[test]
    fn invalid_source_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdf");
        write_pdf(&good, 10, 10);
        let bad = dir.path().join("bad.pdf");
        std::fs::write(&bad, b"this is not anything").unwrap();

        let out = dir.path().join("out.pdf");
        let err = assemble_pdf(&[good, bad], &out, 72).unwrap_err();
        assert!(matches!(err, ShuffleError::MergeFailed { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn empty_sources_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            assemble_pdf(&[], &dir.path().join("out.pdf"), 72),
            Err(ShuffleError::EmptyInputSet { .. })
        ));
    }

    #[test]
    fn image_to_pdf_writes_single_page() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("x.png");
        RgbImage::new(30, 60).save(&img).unwrap();
        let out = dir.path().join("x.pdf");
        image_to_pdf(&img, &out, 72).unwrap();
        assert_eq!(page_sizes(&out).len(), 1);
    }
}
