use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::common::*;
use crate::palette::{self, join, Join, List};
use crate::xld;

/// One-based palette ids 1..=255.
pub const PALETTE_SLOTS: usize = 255;

/// Sub-blocks per PALETTE<n>.XLD archive, fixed by the id addressing
/// scheme: slot / 100 is the file, slot % 100 the sub-block.
const PALETTES_PER_FILE: usize = 100;

/// The global palette is always 64 colors.
const GLOBAL_PALETTE_BYTES: usize = 192;

/// Where the palette archives live.
pub struct Paths {
    palette_pattern: String,
    global_palette: PathBuf,
}

impl Paths {
    /// `palette_pattern` contains a `{0}` placeholder for the archive
    /// file index, e.g. `XLDLIBS/PALETTE{0}.XLD`.
    pub fn new(palette_pattern: impl Into<String>, global_palette: impl Into<PathBuf>) -> Self {
        Self {
            palette_pattern: palette_pattern.into(),
            global_palette: global_palette.into(),
        }
    }

    pub fn palette_file(&self, file_index: usize) -> PathBuf {
        PathBuf::from(
            self.palette_pattern
                .replace("{0}", &file_index.to_string()),
        )
    }

    pub fn global_palette(&self) -> &PathBuf {
        &self.global_palette
    }

    /// Archive paths for file indices 0, 1, 2, ... as long as the file
    /// exists on disk.
    pub fn enumerate_palette_files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        (0..).map(move |i| self.palette_file(i)).take_while(|path| path.exists())
    }
}

/// Process-wide palette cache: 255 lazily filled id slots plus the
/// global palette. Slots are decoded at most once and never evicted.
pub struct PaletteRegistry {
    paths: Paths,
    slots: Box<[Option<List>]>,
    global: Option<List>,
}

impl PaletteRegistry {
    pub fn new(paths: Paths) -> Self {
        let mut slots = Vec::with_capacity(PALETTE_SLOTS);
        slots.resize_with(PALETTE_SLOTS, || None);
        Self {
            paths,
            slots: slots.into_boxed_slice(),
            global: None,
        }
    }

    fn slot(id: u8) -> Result<usize> {
        if id == 0 {
            return Err(Error::OutOfRange {
                index: 0,
                len: PALETTE_SLOTS,
            });
        }
        Ok(usize::from(id) - 1)
    }

    /// The palette with the given one-based id, loading it from its
    /// archive on first access.
    pub fn palette(&mut self, id: u8) -> Result<&List> {
        let slot = Self::slot(id)?;
        self.ensure_slot(slot)?;
        self.slots[slot]
            .as_ref()
            .ok_or_else(|| Error::NotFound(format!("palette {}", id)))
    }

    /// The fixed 64-color global palette, loaded on first access.
    pub fn global_palette(&mut self) -> Result<&List> {
        self.ensure_global()?;
        self.global
            .as_ref()
            .ok_or_else(|| Error::NotFound("global palette".to_string()))
    }

    /// Local palette entries first, then the 64 global ones, the
    /// game's layout for fully addressable palettes.
    pub fn full_palette(&mut self, id: u8) -> Result<Join<'_>> {
        let slot = Self::slot(id)?;
        self.ensure_slot(slot)?;
        self.ensure_global()?;
        match (&self.slots[slot], &self.global) {
            (Some(local), Some(global)) => Ok(join(local, global)),
            _ => Err(Error::NotFound(format!("palette {}", id))),
        }
    }

    /// Warm-cache startup: decodes every sub-block of every configured
    /// archive in one forward pass, filling slots from 0 in file then
    /// sub-block order, then loads the global palette. Slots already
    /// loaded are left alone.
    pub fn load_palettes(&mut self) -> Result<()> {
        let mut slot = 0;
        let paths: Vec<_> = self.paths.enumerate_palette_files().collect();
        for path in paths {
            let file = File::open(&path)?;
            for subfile in xld::subfiles(file)? {
                if slot >= self.slots.len() {
                    return Err(Error::Malformed(format!(
                        "more than {} palettes configured",
                        PALETTE_SLOTS
                    )));
                }
                if self.slots[slot].is_none() {
                    self.slots[slot] = Some(palette::read_palette(&subfile.data)?);
                }
                slot += 1;
            }
        }
        self.ensure_global()
    }

    fn ensure_slot(&mut self, slot: usize) -> Result<()> {
        if self.slots[slot].is_some() {
            return Ok(());
        }

        let file_index = slot / PALETTES_PER_FILE;
        let subindex = slot % PALETTES_PER_FILE;
        let path = self.paths.palette_file(file_index);
        let mut file = open(&path)?;
        let length = xld::seek_to_index(&mut file, subindex)?;
        self.slots[slot] = Some(palette::read_palette_stream(&mut file, length)?);
        Ok(())
    }

    fn ensure_global(&mut self) -> Result<()> {
        if self.global.is_some() {
            return Ok(());
        }

        let mut data = Vec::new();
        open(self.paths.global_palette())?.read_to_end(&mut data)?;
        if data.len() != GLOBAL_PALETTE_BYTES {
            return Err(Error::Malformed(format!(
                "global palette is {} bytes, expected {}",
                data.len(),
                GLOBAL_PALETTE_BYTES
            )));
        }
        self.global = Some(palette::read_palette(&data)?);
        Ok(())
    }
}

fn open(path: &std::path::Path) -> Result<File> {
    File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(err)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::{Color, Palette};
    use std::fs;
    use std::path::Path;

    fn write_xld(path: &Path, blocks: &[&[u8]]) {
        let mut bytes = xld::SIGNATURE.to_vec();
        bytes.extend_from_slice(&(blocks.len() as u16).to_le_bytes());
        for block in blocks {
            bytes.extend_from_slice(&(block.len() as u32).to_le_bytes());
        }
        for block in blocks {
            bytes.extend_from_slice(block);
        }
        fs::write(path, bytes).unwrap();
    }

    fn test_paths(dir: &Path) -> Paths {
        Paths::new(
            format!("{}/PALETTE{{0}}.XLD", dir.display()),
            dir.join("PALETTE.000"),
        )
    }

    fn global_bytes() -> Vec<u8> {
        (0..192u32).map(|i| i as u8).collect()
    }

    #[test]
    fn lazy_load_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("PALETTE0.XLD");
        write_xld(&archive, &[&[10, 20, 30], &[40, 50, 60, 70, 80, 90]]);

        let mut registry = PaletteRegistry::new(test_paths(dir.path()));

        let pal = registry.palette(2).unwrap();
        assert_eq!(pal.len(), 2);
        assert_eq!(pal.get(0), Some(Color::new(40, 50, 60)));

        // rewrite the archive; the cached slot must not notice
        write_xld(&archive, &[&[0, 0, 0], &[1, 1, 1]]);
        let pal = registry.palette(2).unwrap();
        assert_eq!(pal.get(0), Some(Color::new(40, 50, 60)));

        // slot 1 was never loaded, so it sees the new contents
        let pal = registry.palette(1).unwrap();
        assert_eq!(pal.get(0), Some(Color::new(0, 0, 0)));
    }

    #[test]
    fn id_zero_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));
        match registry.palette(0) {
            Err(Error::OutOfRange { .. }) => {}
            _ => panic!("expected OutOfRange"),
        }
    }

    #[test]
    fn missing_archive_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));
        match registry.palette(1) {
            Err(Error::NotFound(_)) => {}
            _ => panic!("expected NotFound"),
        }
    }

    #[test]
    fn missing_sub_block_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_xld(&dir.path().join("PALETTE0.XLD"), &[&[1, 2, 3]]);
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));
        match registry.palette(2) {
            Err(Error::NotFound(_)) => {}
            _ => panic!("expected NotFound"),
        }
    }

    #[test]
    fn id_maps_across_archive_files() {
        let dir = tempfile::tempdir().unwrap();
        write_xld(&dir.path().join("PALETTE0.XLD"), &[&[1, 1, 1]]);
        write_xld(&dir.path().join("PALETTE1.XLD"), &[&[2, 2, 2], &[3, 3, 3]]);
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));

        // id 102 -> slot 101 -> file 1, sub-block 1
        let pal = registry.palette(102).unwrap();
        assert_eq!(pal.get(0), Some(Color::new(3, 3, 3)));
    }

    #[test]
    fn global_palette_must_be_192_bytes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("PALETTE.000"), &[0u8; 191]).unwrap();
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));
        match registry.global_palette() {
            Err(Error::Malformed(_)) => {}
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn global_palette_loads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("PALETTE.000");
        fs::write(&global, global_bytes()).unwrap();
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));

        let pal = registry.global_palette().unwrap();
        assert_eq!(pal.len(), 64);
        assert_eq!(pal.get(1), Some(Color::new(3, 4, 5)));

        fs::remove_file(&global).unwrap();
        assert!(registry.global_palette().is_ok());
    }

    #[test]
    fn full_palette_joins_local_then_global() {
        let dir = tempfile::tempdir().unwrap();
        write_xld(&dir.path().join("PALETTE0.XLD"), &[&[10, 20, 30]]);
        fs::write(dir.path().join("PALETTE.000"), global_bytes()).unwrap();
        let mut registry = PaletteRegistry::new(test_paths(dir.path()));

        let full = registry.full_palette(1).unwrap();
        assert_eq!(full.len(), 1 + 64);
        assert_eq!(full.get(0), Some(Color::new(10, 20, 30)));
        assert_eq!(full.get(1), Some(Color::new(0, 1, 2)));
        assert_eq!(full.get(64), Some(Color::new(189, 190, 191)));
    }

    #[test]
    fn eager_load_matches_lazy_mapping() {
        let dir = tempfile::tempdir().unwrap();
        write_xld(&dir.path().join("PALETTE0.XLD"), &[&[1, 1, 1], &[2, 2, 2]]);
        fs::write(dir.path().join("PALETTE.000"), global_bytes()).unwrap();

        let mut eager = PaletteRegistry::new(test_paths(dir.path()));
        eager.load_palettes().unwrap();

        // archives gone: everything must already be cached
        fs::remove_file(dir.path().join("PALETTE0.XLD")).unwrap();
        fs::remove_file(dir.path().join("PALETTE.000")).unwrap();

        assert_eq!(eager.palette(1).unwrap().get(0), Some(Color::new(1, 1, 1)));
        assert_eq!(eager.palette(2).unwrap().get(0), Some(Color::new(2, 2, 2)));
        assert_eq!(eager.global_palette().unwrap().len(), 64);
    }

    #[test]
    fn eager_load_keeps_existing_slots() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("PALETTE0.XLD");
        write_xld(&archive, &[&[1, 1, 1]]);
        fs::write(dir.path().join("PALETTE.000"), global_bytes()).unwrap();

        let mut registry = PaletteRegistry::new(test_paths(dir.path()));
        registry.palette(1).unwrap();

        write_xld(&archive, &[&[9, 9, 9]]);
        registry.load_palettes().unwrap();
        assert_eq!(registry.palette(1).unwrap().get(0), Some(Color::new(1, 1, 1)));
    }
}
