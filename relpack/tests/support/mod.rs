//! Test support for relpack behavioural tests.
//!
//! [`FakeToolchain`] stands in for rustup, ntldd, strip, candle, and light:
//! the walker answers from canned dependency lists, strip copies its input,
//! and the WiX tools write empty outputs. [`PackagingWorkspace`] lays out a
//! temporary tree with built binaries and a MinGW runtime directory, and a
//! configuration pointing every path into it.

use camino::{Utf8Path, Utf8PathBuf};
use relpack::builder::Toolchain;
use relpack::command::CommandExecutor;
use relpack::config::{BuildMode, PackagingConfig};
use relpack::error::Result;
use relpack::test_utils::{failure_output, stdout_output, success_output};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::process::Output;
use tempfile::TempDir;

pub const RUSTUP: &str = "rustup.exe";
pub const WALKER: &str = "ntldd.exe";
pub const STRIP: &str = "strip.exe";

/// A temporary packaging tree and its configuration.
pub struct PackagingWorkspace {
    _temp_dir: TempDir,
    pub root: Utf8PathBuf,
    pub config: PackagingConfig,
    pub mode: BuildMode,
}

impl PackagingWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).expect("UTF-8 path");

        let mut config = PackagingConfig::default();
        config.toolchain.rustup = Some(Utf8PathBuf::from(RUSTUP));
        config.build.target_root = root.join("target");
        config.build.targets.clear();
        config.dependencies.walker = WALKER.to_owned();
        config.staging.dir = root.join("out");
        config.staging.strip = STRIP.to_owned();
        config.manifest.path = root.join("libraries.wxi");
        config.installer.wix_dir = root.join("wix");
        config.installer.definition = root.join("app.wxs");

        Self {
            _temp_dir: temp_dir,
            root,
            config,
            mode: BuildMode::Release,
        }
    }

    /// Directory the runtime libraries live in.
    pub fn runtime_dir(&self) -> Utf8PathBuf {
        self.root.join("msys64").join("mingw32").join("bin")
    }

    /// Directory holding system libraries that are never packaged.
    pub fn system_dir(&self) -> Utf8PathBuf {
        self.root.join("Windows").join("System32")
    }

    /// Create a built binary and register it as a packaging target.
    pub fn add_binary(&mut self, name: &str) -> Utf8PathBuf {
        let dir = self.config.build.target_root.join(self.mode.dir_name());
        fs::create_dir_all(&dir).expect("failed to create build output dir");
        let path = dir.join(name);
        fs::write(&path, format!("MZ {name}")).expect("failed to write binary");
        self.config.build.targets.push(Utf8PathBuf::from(name));
        path
    }

    /// Create a runtime library and return its path.
    pub fn add_runtime_library(&self, name: &str) -> Utf8PathBuf {
        write_library(&self.runtime_dir(), name)
    }

    /// Create a system library and return its path.
    pub fn add_system_library(&self, name: &str) -> Utf8PathBuf {
        write_library(&self.system_dir(), name)
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(RUSTUP, self.config.toolchain.channel.clone())
    }

    pub fn staging_dir(&self) -> &Utf8Path {
        &self.config.staging.dir
    }

    /// Sorted `(name, contents)` pairs of the staging directory.
    pub fn staged_contents(&self) -> Vec<(String, Vec<u8>)> {
        let mut contents: Vec<_> = fs::read_dir(self.staging_dir())
            .expect("failed to read staging dir")
            .map(|entry| {
                let entry = entry.expect("failed to read dir entry");
                let name = entry.file_name().to_string_lossy().into_owned();
                let bytes = fs::read(entry.path()).expect("failed to read staged file");
                (name, bytes)
            })
            .collect();
        contents.sort();
        contents
    }
}

fn write_library(dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    fs::create_dir_all(dir).expect("failed to create library dir");
    let path = dir.join(name);
    fs::write(&path, format!("library {name}")).expect("failed to write library");
    path
}

/// Render walker output listing `libraries` as resolved dependencies.
pub fn walker_output(libraries: &[Utf8PathBuf]) -> String {
    libraries
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let name = path.file_name().expect("library has a file name");
            let base = 0x6e94_0000 + i * 0x1_0000;
            format!("\t{name} => {path} (0x{base:08x})\n")
        })
        .collect()
}

/// A command executor emulating the packaging toolchain.
#[derive(Default)]
pub struct FakeToolchain {
    walker_outputs: HashMap<Utf8PathBuf, String>,
    calls: RefCell<Vec<String>>,
}

impl FakeToolchain {
    /// Answer `ntldd -R <binary>` with `output`.
    pub fn with_walker_output(mut self, binary: &Utf8Path, output: String) -> Self {
        self.walker_outputs.insert(binary.to_owned(), output);
        self
    }

    /// Program names invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Whether any program ending in `suffix` was invoked.
    pub fn invoked(&self, suffix: &str) -> bool {
        self.calls.borrow().iter().any(|cmd| cmd.ends_with(suffix))
    }

    fn walk(&self, args: &[&str]) -> Output {
        match args {
            ["-R", binary] => match self.walker_outputs.get(Utf8Path::new(binary)) {
                Some(output) => stdout_output(output),
                None => stdout_output(""),
            },
            _ => failure_output("usage: ntldd [-R] <file>"),
        }
    }

    fn strip(args: &[&str]) -> Output {
        match args {
            ["-o", dest, src] => match fs::copy(src, dest) {
                Ok(_) => success_output(),
                Err(e) => failure_output(&format!("strip: {src}: {e}")),
            },
            _ => failure_output("usage: strip -o <out> <in>"),
        }
    }

    fn wix_output(args: &[&str]) -> Output {
        let out = args
            .windows(2)
            .find(|pair| pair[0] == "-out")
            .map(|pair| pair[1]);
        if let Some(path) = out {
            if let Err(e) = fs::write(path, b"") {
                return failure_output(&format!("cannot write {path}: {e}"));
            }
        }
        success_output()
    }
}

impl CommandExecutor for FakeToolchain {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        self.calls.borrow_mut().push(cmd.to_owned());

        let output = if cmd == RUSTUP {
            success_output()
        } else if cmd == WALKER {
            self.walk(args)
        } else if cmd == STRIP {
            Self::strip(args)
        } else if cmd.ends_with("candle.exe") || cmd.ends_with("light.exe") {
            Self::wix_output(args)
        } else {
            failure_output(&format!("{cmd}: command not found"))
        };
        Ok(output)
    }
}
