//! Test utilities for module system testing
//!
//! Provides a temp-dir fixture for plugin roots, module file writers and a
//! log-capturing subscriber.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

use typefinder::{HostRuntime, TypeFinder, TypeFinderConfig};

/// Entry point name used by every fixture runtime
pub const ENTRY_POINT: &str = "host";

/// Test fixture for module system tests
pub struct ModuleTestFixture {
    /// Temporary directory for test data
    pub temp_dir: TempDir,
    /// Plugin root (`<temp>/plugins`), not created until needed
    pub root: PathBuf,
}

impl ModuleTestFixture {
    /// Create a new test fixture with an isolated plugin root
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("plugins");
        Ok(Self { temp_dir, root })
    }

    /// Fixture whose root already has the `<root>/host` convention directory
    pub fn bootstrapped() -> Result<Self, Box<dyn std::error::Error>> {
        let fixture = Self::new()?;
        std::fs::create_dir_all(fixture.root.join(ENTRY_POINT))?;
        Ok(fixture)
    }

    /// Write `<dir>/<file>` with a module header, dependencies and raw `[[types]]` TOML
    pub fn write_module<P: AsRef<Path>>(
        &self,
        dir: P,
        file: &str,
        name: &str,
        version: &str,
        dependencies: &[(&str, &str)],
        types: &str,
    ) -> PathBuf {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).expect("create module dir");

        let mut contents = format!(
            "[module]\nname = \"{}\"\nversion = \"{}\"\ndescription = \"Test module: {}\"\n",
            name, version, name
        );
        if !dependencies.is_empty() {
            contents.push_str("\n[module.dependencies]\n");
            for (dep, requirement) in dependencies {
                contents.push_str(&format!("\"{}\" = \"{}\"\n", dep, requirement));
            }
        }
        contents.push('\n');
        contents.push_str(types);

        let path = dir.join(file);
        std::fs::write(&path, contents).expect("write module file");
        path
    }

    /// Write bytes that are not a module file
    pub fn write_corrupt<P: AsRef<Path>>(&self, dir: P, file: &str) -> PathBuf {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).expect("create module dir");
        let path = dir.join(file);
        std::fs::write(&path, [0x4d, 0x5a, 0x90, 0x00, 0xff, 0xfe, 0x00, 0x00]).expect("write corrupt file");
        path
    }

    /// Configuration scanning only this fixture's root
    pub fn config(&self) -> TypeFinderConfig {
        TypeFinderConfig {
            root_directories: vec![self.root.clone()],
            ..TypeFinderConfig::default()
        }
    }

    /// Finder over this fixture's root with a runtime whose entry point is [`ENTRY_POINT`]
    pub fn finder(&self, config: TypeFinderConfig, runtime: HostRuntime) -> TypeFinder {
        TypeFinder::new(config, Arc::new(runtime.with_entry_point(ENTRY_POINT)))
            .expect("valid configuration")
    }
}

impl Default for ModuleTestFixture {
    fn default() -> Self {
        Self::new().expect("Failed to create test fixture")
    }
}

/// `[[types]]` TOML for the contracts module used across tests
pub const CONTRACT_TYPES: &str = r#"
[[types]]
name = "IHandler"
kind = "interface"

[[types]]
name = "Handler"
kind = "interface"
type_params = ["T"]

[[types]]
name = "HandlerBase"
abstract = true
type_params = ["T"]
implements = ["Handler<T>", "IHandler"]
"#;

/// Writer collecting formatted log output in memory
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("log buffer");
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Number of captured lines containing all of `needles`
    pub fn count_lines(&self, needles: &[&str]) -> usize {
        self.contents()
            .lines()
            .filter(|line| needles.iter().all(|n| line.contains(n)))
            .count()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a thread-local subscriber writing into a [`LogCapture`]
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, LogCapture) {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture)
}
