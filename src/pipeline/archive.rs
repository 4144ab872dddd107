//! Zip bundling of a run's artefacts.
//!
//! Every file is stored deflated under its base name, in the order given.
//! Sources are only read.

use crate::error::ShuffleError;
use crate::output::ArchiveInfo;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `files` into a deflate zip at `dest`.
///
/// # Errors
/// [`ShuffleError::EmptyInputSet`] for no files;
/// [`ShuffleError::ArchiveWriteFailed`] if two files share a base name, a
/// source cannot be read, or the archive cannot be written. `dest` is not
/// created on failure.
pub fn create_zip(files: &[PathBuf], dest: &Path) -> Result<ArchiveInfo, ShuffleError> {
    if files.is_empty() {
        return Err(ShuffleError::EmptyInputSet {
            operation: "archive",
        });
    }

    let entries = entry_names(files, dest)?;

    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| ShuffleError::archive(dest, e))?;

    {
        let mut zip = ZipWriter::new(tmp.as_file_mut());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (file, name) in files.iter().zip(&entries) {
            let source = File::open(file)
                .map_err(|e| ShuffleError::archive(dest, format!("{}: {}", file.display(), e)))?;
            zip.start_file(name.as_str(), options)
                .map_err(|e| ShuffleError::archive(dest, e))?;
            std::io::copy(&mut BufReader::new(source), &mut zip)
                .map_err(|e| ShuffleError::archive(dest, format!("{}: {}", file.display(), e)))?;
            debug!("Archived {} as {}", file.display(), name);
        }

        zip.finish()
            .map_err(|e| ShuffleError::archive(dest, e))?
            .flush()
            .map_err(|e| ShuffleError::archive(dest, e))?;
    }

    tmp.persist(dest)
        .map_err(|e| ShuffleError::archive(dest, e.error))?;

    let bytes = std::fs::metadata(dest)
        .map(|m| m.len())
        .map_err(|e| ShuffleError::archive(dest, e))?;

    info!(
        "Archived {} file(s) → {} ({} bytes)",
        entries.len(),
        dest.display(),
        bytes
    );

    Ok(ArchiveInfo {
        path: dest.to_path_buf(),
        entries,
        bytes,
    })
}

/// Base names of `files`, rejecting a name that appears twice.
fn entry_names(files: &[PathBuf], dest: &Path) -> Result<Vec<String>, ShuffleError> {
    let mut seen = HashSet::with_capacity(files.len());
    files
        .iter()
        .map(|file| {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    ShuffleError::archive(dest, format!("{} has no file name", file.display()))
                })?;
            if !seen.insert(name.clone()) {
                return Err(ShuffleError::archive(
                    dest,
                    format!("two files are named {}", name),
                ));
            }
            Ok(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn round_trip_preserves_names_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).unwrap();
        let a = dir.path().join("page_0_cropped.png");
        let b = sub.join("shuffled.pdf");
        std::fs::write(&a, [0u8, 1, 2, 3, 254, 255]).unwrap();
        std::fs::write(&b, b"%PDF-1.5 body").unwrap();

        let dest = dir.path().join("bundle.zip");
        let info = create_zip(&[a.clone(), b.clone()], &dest).unwrap();
        assert_eq!(info.entries, vec!["page_0_cropped.png", "shuffled.pdf"]);
        assert!(info.bytes > 0);

        let mut archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        for (path, name) in [(&a, "page_0_cropped.png"), (&b, "shuffled.pdf")] {
            let mut entry = archive.by_name(name).unwrap();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            assert_eq!(contents, std::fs::read(path).unwrap());
        }

        // Sources survive.
        assert!(a.exists() && b.exists());
    }

    #[test]
    fn duplicate_base_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("one");
        let two = dir.path().join("two");
        std::fs::create_dir(&one).unwrap();
        std::fs::create_dir(&two).unwrap();
        std::fs::write(one.join("x.png"), b"1").unwrap();
        std::fs::write(two.join("x.png"), b"2").unwrap();

        let dest = dir.path().join("bundle.zip");
        let err = create_zip(&[one.join("x.png"), two.join("x.png")], &dest).unwrap_err();
        assert!(matches!(err, ShuffleError::ArchiveWriteFailed { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn missing_source_leaves_no_archive() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bundle.zip");
        let err = create_zip(&[dir.path().join("gone.png")], &dest).unwrap_err();
        assert!(matches!(err, ShuffleError::ArchiveWriteFailed { .. }));
        assert!(!dest.exists());
    }

    #[test]
    fn empty_input_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            create_zip(&[], &dir.path().join("bundle.zip")),
            Err(ShuffleError::EmptyInputSet { .. })
        ));
    }
}
