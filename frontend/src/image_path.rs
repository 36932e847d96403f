//! Image path resolution: loads an [`Image`] from a raw binary file or from
//! the first file inside a ZIP archive.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use z80emu_machines::image::{Image, ImageError, SnaSnapshot};

/// Load a program, ROM or snapshot image.
///
/// Paths ending in `.zip` are opened as archives and their first regular
/// file is used; anything else is read as raw bytes.
pub fn load_image(path: &Path) -> Result<Image, ImageError> {
    if path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    {
        return load_from_zip(path);
    }
    if !path.is_file() {
        return Err(ImageError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("image not found: {}", path.display()),
        )));
    }
    Image::from_file(path)
}

pub fn load_snapshot(path: &Path) -> Result<SnaSnapshot, ImageError> {
    let image = load_image(path)?;
    SnaSnapshot::parse(&image.data)
}

/// Extract the first file from a ZIP archive.
fn load_from_zip(path: &Path) -> Result<Image, ImageError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, format!("invalid ZIP: {e}"))
    })?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("ZIP entry error: {e}"),
            )
        })?;

        // Skip directories
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        std::io::Read::read_to_end(&mut entry, &mut data)?;
        return Ok(Image::from_bytes(name, data));
    }

    Err(ImageError::Empty)
}
