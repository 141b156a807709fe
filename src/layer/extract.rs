//! Layer tarball extraction

use crate::error::{RestorerError, RestorerResult};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Unpack a layer tarball beneath `root`.
///
/// Entry paths are taken relative to `root` (a leading `/` is dropped),
/// so cache tarballs recorded with absolute paths land in place when
/// `root` is `/`. Entries that would escape `root` abort the extraction.
/// The reader is consumed and dropped before returning.
///
/// Returns the number of entries written.
pub fn extract<R: Read>(reader: R, root: &Path) -> RestorerResult<usize> {
    std::fs::create_dir_all(root)
        .map_err(|e| RestorerError::io(format!("creating {}", root.display()), e))?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let entries = archive
        .entries()
        .map_err(|e| RestorerError::io("reading layer archive", e))?;

    let mut count = 0;
    for entry in entries {
        let mut entry = entry.map_err(|e| RestorerError::io("reading layer archive entry", e))?;
        let entry_path = entry
            .path()
            .map_err(|e| RestorerError::io("decoding archive entry path", e))?
            .display()
            .to_string();

        let unpacked = entry
            .unpack_in(root)
            .map_err(|e| RestorerError::io(format!("extracting {}", entry_path), e))?;
        if !unpacked {
            return Err(RestorerError::UnsafeArchivePath(entry_path));
        }
        count += 1;
    }

    debug!("Extracted {} entries under {}", count, root.display());
    Ok(count)
}
