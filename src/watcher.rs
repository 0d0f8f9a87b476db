//! Reads the small text files that the settings process drops on disk. The
//! other process writes whenever it wants with no coordination, so every
//! read here is best-effort: missing, unreadable, or half-written files all
//! just mean "nothing to see".

use crate::{
    color::{Catalog, ColorEntry},
    config::FileConfig,
    util::ErrorDedup,
};
use log::{trace, Level};
use std::{fs, io::ErrorKind, path::PathBuf};

#[derive(Clone, Debug)]
pub struct ConfigWatcher {
    message: WatchedFile,
    location: WatchedFile,
    backlight: WatchedFile,
}

impl ConfigWatcher {
    pub fn new(files: &FileConfig) -> Self {
        Self {
            message: WatchedFile::new(files.message.clone()),
            location: WatchedFile::new(files.location.clone()),
            backlight: WatchedFile::new(files.backlight.clone()),
        }
    }

    /// Custom message to show instead of the weather. Only the first line is
    /// used, since it has to fit on one line of the LCD anyway.
    pub fn read_custom_message(&self) -> Option<String> {
        let contents = self.message.read()?;
        contents.lines().next().map(|line| line.trim_end().to_owned())
    }

    /// Place name to look up weather for
    pub fn read_location(&self) -> Option<String> {
        self.location.read()
    }

    /// Backlight color requested by the settings process. Names that aren't
    /// in the catalog (including partial writes) are ignored.
    pub fn read_backlight_selection<'a>(
        &self,
        catalog: &'a Catalog,
    ) -> Option<&'a ColorEntry> {
        let name = self.backlight.read()?;
        let entry = catalog.get(&name);
        if entry.is_none() {
            trace!(
                "Ignoring unknown backlight `{name}` from {}",
                self.backlight.path.display()
            );
        }
        entry
    }
}

/// One settings file, plus the last error we got reading it. These get read
/// every tick, so a file that stays broken is only logged once.
#[derive(Clone, Debug)]
struct WatchedFile {
    path: PathBuf,
    errors: ErrorDedup,
}

impl WatchedFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            errors: ErrorDedup::new(),
        }
    }

    /// Read the whole file and trim it. Empty files count as absent.
    /// Anything other than a missing file gets logged, but never escalated.
    fn read(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                self.errors.clear();
                let value = contents.trim();
                (!value.is_empty()).then(|| value.to_owned())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.errors.clear();
                None
            }
            Err(err) => {
                let err = anyhow::Error::from(err)
                    .context(format!("Error reading {}", self.path.display()));
                self.errors.report(Level::Warn, &err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::temp_dir;

    fn watcher(name: &str) -> (ConfigWatcher, FileConfig) {
        let dir = temp_dir(name);
        let files = FileConfig {
            message: dir.join("msg.txt"),
            location: dir.join("location.txt"),
            backlight: dir.join("backlight.txt"),
            weather_cache: dir.join("weather_cache.json"),
        };
        (ConfigWatcher::new(&files), files)
    }

    #[test]
    fn test_missing_files() {
        let (watcher, _) = watcher("watcher_missing");
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(watcher.read_custom_message(), None);
        assert_eq!(watcher.read_location(), None);
        assert_eq!(watcher.read_backlight_selection(&catalog), None);
    }

    #[test]
    fn test_custom_message() {
        let (watcher, files) = watcher("watcher_message");
        fs::write(&files.message, "Happy Birthday  \nsecond line\n").unwrap();
        assert_eq!(
            watcher.read_custom_message().as_deref(),
            Some("Happy Birthday")
        );

        fs::write(&files.message, "  \n\n").unwrap();
        assert_eq!(watcher.read_custom_message(), None);
    }

    #[test]
    fn test_location() {
        let (watcher, files) = watcher("watcher_location");
        fs::write(&files.location, "Boston\n").unwrap();
        assert_eq!(watcher.read_location().as_deref(), Some("Boston"));
    }

    #[test]
    fn test_backlight_selection() {
        let (watcher, files) = watcher("watcher_backlight");
        let catalog = Catalog::builtin().unwrap();

        fs::write(&files.backlight, "Teal\n").unwrap();
        assert_eq!(
            watcher
                .read_backlight_selection(&catalog)
                .map(|entry| entry.name.as_str()),
            Some("Teal")
        );

        // Unknown, wrong case, and torn writes are all ignored
        for contents in ["Purple", "teal", "Te"] {
            fs::write(&files.backlight, contents).unwrap();
            assert_eq!(watcher.read_backlight_selection(&catalog), None);
        }
    }

    #[test]
    fn test_unreadable_file() {
        let (watcher, files) = watcher("watcher_unreadable");
        // A directory where a file should be can't be read as text
        fs::create_dir_all(&files.location).unwrap();
        assert_eq!(watcher.read_location(), None);
        assert!(watcher.location.errors.is_failing());
        assert!(!watcher.message.errors.is_failing());

        // Still broken on the next tick. The same error is already on
        // record, so a repeat is only logged at debug.
        assert_eq!(watcher.read_location(), None);
        let err = anyhow::Error::from(
            fs::read_to_string(&files.location).unwrap_err(),
        )
        .context(format!("Error reading {}", files.location.display()));
        assert!(!watcher.location.errors.report(Level::Warn, &err));

        // Fixed, so the next failure gets logged again
        fs::remove_dir(&files.location).unwrap();
        fs::write(&files.location, "Boston").unwrap();
        assert_eq!(watcher.read_location().as_deref(), Some("Boston"));
        assert!(!watcher.location.errors.is_failing());
    }
}
