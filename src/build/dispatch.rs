//! Per-file binarization dispatch.
//!
//! Config sources go to the config compiler. Models and terrains go to the
//! model binarizer. An external model binarizer only ever sees a
//! sub-workspace holding the file, its companion configs and the assets it
//! references, each placed at its logical path. Everything else is archived
//! unchanged.

use anyhow::{Context, Result, bail};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::BuildWarning;
use super::classify::FileKind;
use crate::config::ToolsConfig;
use crate::constants::{CONFIG_EXTENSIONS, CONFIG_SOURCE_NAME, MODEL_CONFIG_NAME, MODEL_EXTENSION, TERRAIN_EXTENSION};
use crate::formats;
use crate::resolver::{LookupOptions, Resolver, is_logical};
use crate::sign::{ExternalSigner, Signer};
use crate::tools::{Binarizer, ExternalBinarizer, PassThrough, PreprocessingCompiler, roles};
use crate::utils::fs::copy_file;
use crate::utils::platform::logical_to_relative;
use crate::workspace::TempWorkspace;

/// Warning raised when an asset referenced by a model cannot be found.
pub const MISSING_DEPENDENCY: &str = "missing-dependency";

/// Warning raised when models are packed without a binarizer.
pub const FALLBACK_BINARIZER: &str = "fallback-binarizer";

/// The programs a build may call.
///
/// `None` selects the built-in behavior: the preprocessor stands in for the
/// config compiler, models are packed unchanged, and signing is unavailable.
#[derive(Default)]
pub struct Toolchain {
    /// Config compiler
    pub config_compiler: Option<Box<dyn Binarizer>>,
    /// Model and terrain binarizer
    pub model_binarizer: Option<Box<dyn Binarizer>>,
    /// Archive signer
    pub signer: Option<Box<dyn Signer>>,
}

impl Toolchain {
    /// Builds the toolchain from the `[tools]` config table.
    ///
    /// With `capture_output` set, tool output is only shown when a tool fails.
    pub fn from_config(tools: &ToolsConfig, capture_output: bool) -> Self {
        let external = |role: &'static str, spec: &Option<crate::tools::ToolSpec>| {
            spec.clone()
                .map(|spec| Box::new(ExternalBinarizer::new(role, spec, capture_output)) as Box<dyn Binarizer>)
        };
        Self {
            config_compiler: external(roles::CONFIG_COMPILER, &tools.config_compiler),
            model_binarizer: external(roles::MODEL_BINARIZER, &tools.model_binarizer),
            signer: tools
                .signer
                .clone()
                .map(|spec| Box::new(ExternalSigner::new(spec, capture_output)) as Box<dyn Signer>),
        }
    }
}

/// Routes files to the right binarizer and collects build warnings.
pub struct Dispatcher<'a> {
    tools: &'a Toolchain,
    resolver: &'a Resolver,
    builtin_compiler: PreprocessingCompiler,
    muted: HashSet<String>,
    warnings: Vec<BuildWarning>,
    fallback_reported: bool,
}

impl<'a> Dispatcher<'a> {
    /// Creates a dispatcher resolving dependencies with `resolver`.
    pub fn new(tools: &'a Toolchain, resolver: &'a Resolver, muted_warnings: &[String]) -> Self {
        Self {
            tools,
            resolver,
            builtin_compiler: PreprocessingCompiler::new(
                Resolver::new(resolver.include_roots().to_vec()),
                muted_warnings.to_vec(),
            ),
            muted: muted_warnings.iter().cloned().collect(),
            warnings: Vec::new(),
            fallback_reported: false,
        }
    }

    fn compiler(&self) -> &dyn Binarizer {
        match self.tools.config_compiler.as_deref() {
            Some(compiler) => compiler,
            None => &self.builtin_compiler,
        }
    }

    /// Binarizes the workspace file at `relative`, classified as `kind`.
    pub fn binarize_in_workspace(
        &mut self,
        workspace: &TempWorkspace,
        relative: &Path,
        kind: &FileKind,
    ) -> Result<()> {
        let file = workspace.path().join(relative);
        match kind {
            FileKind::Config { target } => {
                let target = workspace.path().join(target);
                self.compile(&file, &target)
            }
            kind if kind.needs_model_binarizer() => self.binarize_model(&file, workspace),
            _ => Ok(()),
        }
    }

    /// Binarizes a single file outside of any build.
    ///
    /// The model binarizer runs directly on `source`, without a sub-workspace.
    pub fn binarize_file(&mut self, source: &Path, target: &Path) -> Result<()> {
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if CONFIG_EXTENSIONS.contains(&extension.as_str()) {
            return self.compile(source, target);
        }
        if extension != MODEL_EXTENSION && extension != TERRAIN_EXTENSION {
            bail!("Don't know how to binarize {}", source.display());
        }

        let tools = self.tools;
        match tools.model_binarizer.as_deref() {
            Some(binarizer) => binarizer
                .binarize(source, target)
                .with_context(|| format!("Failed to binarize {}", source.display())),
            None => {
                self.report_fallback(source);
                PassThrough.binarize(source, target)
            }
        }
    }

    /// Warnings raised so far.
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Consumes the dispatcher, returning its warnings.
    pub fn into_warnings(self) -> Vec<BuildWarning> {
        self.warnings
    }

    fn compile(&self, source: &Path, target: &Path) -> Result<()> {
        let compiler = self.compiler();
        debug!(target: "build", "compiling {} with {}", source.display(), compiler.name());
        compiler
            .binarize(source, target)
            .with_context(|| format!("Failed to compile {}", source.display()))
    }

    fn binarize_model(&mut self, file: &Path, workspace: &TempWorkspace) -> Result<()> {
        let tools = self.tools;
        let Some(binarizer) = tools.model_binarizer.as_deref() else {
            self.report_fallback(file);
            return Ok(());
        };
        if !formats::is_editable(file)? {
            debug!(target: "build", "{} is already binarized", file.display());
            return Ok(());
        }

        let source = if binarizer.is_external() {
            let sub = workspace.sub_workspace()?;
            self.stage(file, workspace.path(), &sub)?
        } else {
            file.to_path_buf()
        };
        debug!(target: "build", "binarizing {} with {}", file.display(), binarizer.name());
        binarizer
            .binarize(&source, file)
            .with_context(|| format!("Failed to binarize {}", file.display()))
    }

    /// Copies `file`, its companion configs and its dependencies into `sub`.
    ///
    /// Returns the path of the staged copy of `file`.
    fn stage(&mut self, file: &Path, root: &Path, sub: &Path) -> Result<PathBuf> {
        let staged = sub.join(self.logical_relative(file, root));
        copy_file(file, &staged)?;

        for companion in companion_chain(file, root) {
            copy_file(&companion, &sub.join(self.logical_relative(&companion, root)))?;
        }

        for name in formats::discover(file)? {
            let reference = if is_logical(&name) {
                name.clone()
            } else {
                format!("\\{name}")
            };
            match self.resolver.find_file(&reference, file, LookupOptions::asset()) {
                Ok(found) => {
                    let relative = self
                        .resolver
                        .logical_path_of(&found)
                        .map_or_else(|| logical_to_relative(&reference), |l| logical_to_relative(&l));
                    copy_file(&found, &sub.join(relative))?;
                }
                Err(_) => self.warn(
                    MISSING_DEPENDENCY,
                    format!("{}: cannot find dependency {name}", file.display()),
                ),
            }
        }
        Ok(staged)
    }

    /// Where a workspace file goes inside a sub-workspace.
    fn logical_relative(&self, file: &Path, root: &Path) -> PathBuf {
        self.resolver.logical_path_of(file).map_or_else(
            || file.strip_prefix(root).unwrap_or(file).to_path_buf(),
            |logical| logical_to_relative(&logical),
        )
    }

    fn report_fallback(&mut self, file: &Path) {
        if self.fallback_reported {
            return;
        }
        self.fallback_reported = true;
        self.warn(
            FALLBACK_BINARIZER,
            format!(
                "no model binarizer configured, {} and any other models are packed unchanged",
                file.display()
            ),
        );
    }

    fn warn(&mut self, name: &'static str, message: String) {
        if self.muted.contains(name) {
            debug!(target: "build", "muted {name}: {message}");
            return;
        }
        warn!(target: "build", "{message} [{name}]");
        self.warnings.push(BuildWarning { name, message });
    }
}

/// Companion configs of a model, in lookup order: `<stem>.cfg`, every
/// `model.cfg` from the model's directory up to `root`, then `config.cpp`
/// beside the model.
fn companion_chain(model: &Path, root: &Path) -> Vec<PathBuf> {
    let Some(dir) = model.parent() else {
        return Vec::new();
    };
    let mut chain = Vec::new();
    let mut push = |path: PathBuf| {
        if path.is_file() && !chain.contains(&path) {
            chain.push(path);
        }
    };

    if let Some(stem) = model.file_stem() {
        push(dir.join(format!("{}.cfg", stem.to_string_lossy())));
    }
    for ancestor in dir.ancestors().take_while(|a| a.starts_with(root)) {
        push(ancestor.join(MODEL_CONFIG_NAME));
    }
    push(dir.join(CONFIG_SOURCE_NAME));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PREFIX_MARKER;
    use crate::formats::mlod::fixture;
    use crate::workspace::BINARIZE_DIR_NAME;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::fs;
    use tempfile::TempDir;

    const PREFIX: &str = "x\\mod\\addons\\main";

    /// Records what it was asked to binarize and writes a stub result.
    #[derive(Default)]
    struct Recorder {
        external: bool,
        calls: Rc<RefCell<Vec<(PathBuf, PathBuf)>>>,
    }

    impl Recorder {
        fn external() -> Self {
            Self {
                external: true,
                ..Self::default()
            }
        }
    }

    impl Binarizer for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn binarize(&self, source: &Path, target: &Path) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((source.to_path_buf(), target.to_path_buf()));
            fs::write(target, b"ODOL")?;
            Ok(())
        }

        fn is_external(&self) -> bool {
            self.external
        }
    }

    fn write(root: &Path, relative: &str, data: &[u8]) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    fn source_tree(temp: &TempDir) -> PathBuf {
        let source = temp.path().join("main");
        write(&source, PREFIX_MARKER, PREFIX.as_bytes());
        write(
            &source,
            "models/box.p3d",
            &fixture::model(&[&[
                ("x\\mod\\addons\\main\\data\\box_co.tga", "\\x\\mod\\addons\\main\\data\\box.rvmat"),
                ("x\\other\\gone_co.paa", ""),
            ]]),
        );
        write(&source, "models/box.cfg", b"class CfgSkeletons {};");
        write(&source, "models/model.cfg", b"class CfgModels {};");
        write(&source, "model.cfg", b"class CfgModels {};");
        write(&source, "data/box_co.paa", b"paa");
        write(&source, "data/box.rvmat", b"class Stage1 {};");
        source
    }

    #[test]
    fn test_model_staged_with_dependencies() {
        let temp = TempDir::new().unwrap();
        let source = source_tree(&temp);
        let workspace = TempWorkspace::populate(Some(&temp.path().join("tmp")), PREFIX, &source).unwrap();
        let resolver = Resolver::new(vec![workspace.path().to_path_buf()]);
        let recorder = Recorder::external();
        let calls = Rc::clone(&recorder.calls);
        let tools = Toolchain {
            model_binarizer: Some(Box::new(recorder)),
            ..Toolchain::default()
        };

        let mut dispatcher = Dispatcher::new(&tools, &resolver, &[]);
        dispatcher
            .binarize_in_workspace(&workspace, Path::new("models/box.p3d"), &FileKind::Model)
            .unwrap();

        let sub = workspace.process_root().join(BINARIZE_DIR_NAME);
        let addon: PathBuf = sub.join("x").join("mod").join("addons").join("main");
        for staged in [
            "models/box.p3d",
            "models/box.cfg",
            "models/model.cfg",
            "model.cfg",
            "data/box_co.paa",
            "data/box.rvmat",
        ] {
            assert!(addon.join(staged).is_file(), "{staged} not staged");
        }
        let model = workspace.path().join("models").join("box.p3d");
        assert_eq!(*calls.borrow(), vec![(addon.join("models/box.p3d"), model)]);
        assert_eq!(
            fs::read(workspace.path().join("models").join("box.p3d")).unwrap(),
            b"ODOL"
        );

        let warnings = dispatcher.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].name, MISSING_DEPENDENCY);
        assert!(warnings[0].message.contains("gone_co.paa"));
    }

    #[test]
    fn test_in_process_binarizer_works_on_workspace_file() {
        let temp = TempDir::new().unwrap();
        let source = source_tree(&temp);
        let workspace = TempWorkspace::populate(Some(&temp.path().join("tmp")), PREFIX, &source).unwrap();
        let resolver = Resolver::new(vec![workspace.path().to_path_buf()]);
        let recorder = Recorder::default();
        let calls = Rc::clone(&recorder.calls);
        let tools = Toolchain {
            model_binarizer: Some(Box::new(recorder)),
            ..Toolchain::default()
        };

        let mut dispatcher = Dispatcher::new(&tools, &resolver, &[]);
        let model = workspace.path().join("models").join("box.p3d");
        for (relative, kind) in [
            ("models/box.p3d", FileKind::Model),
            ("data/box_co.paa", FileKind::Other),
        ] {
            dispatcher
                .binarize_in_workspace(&workspace, Path::new(relative), &kind)
                .unwrap();
        }

        assert_eq!(*calls.borrow(), vec![(model.clone(), model.clone())]);
        assert_eq!(fs::read(&model).unwrap(), b"ODOL");
        assert!(!workspace.process_root().join(BINARIZE_DIR_NAME).exists());
        assert!(dispatcher.warnings().is_empty());
    }

    #[test]
    fn test_models_pass_through_without_binarizer() {
        let temp = TempDir::new().unwrap();
        let source = source_tree(&temp);
        let workspace = TempWorkspace::populate(Some(&temp.path().join("tmp")), PREFIX, &source).unwrap();
        let resolver = Resolver::new(vec![workspace.path().to_path_buf()]);
        let tools = Toolchain::default();
        let original = fs::read(source.join("models").join("box.p3d")).unwrap();

        let mut dispatcher = Dispatcher::new(&tools, &resolver, &[]);
        for _ in 0..2 {
            dispatcher
                .binarize_in_workspace(&workspace, Path::new("models/box.p3d"), &FileKind::Model)
                .unwrap();
        }

        assert_eq!(fs::read(workspace.path().join("models").join("box.p3d")).unwrap(), original);
        assert_eq!(dispatcher.warnings().len(), 1);
        assert_eq!(dispatcher.warnings()[0].name, FALLBACK_BINARIZER);
    }

    #[test]
    fn test_muted_warnings_dropped() {
        let temp = TempDir::new().unwrap();
        let source = source_tree(&temp);
        let workspace = TempWorkspace::populate(Some(&temp.path().join("tmp")), PREFIX, &source).unwrap();
        let resolver = Resolver::new(vec![workspace.path().to_path_buf()]);
        let tools = Toolchain::default();

        let mut dispatcher = Dispatcher::new(&tools, &resolver, &[FALLBACK_BINARIZER.to_string()]);
        dispatcher
            .binarize_in_workspace(&workspace, Path::new("models/box.p3d"), &FileKind::Model)
            .unwrap();
        assert!(dispatcher.warnings().is_empty());
    }

    #[test]
    fn test_config_compiled_by_builtin_preprocessor() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("main");
        write(&source, PREFIX_MARKER, PREFIX.as_bytes());
        write(&source, "config.cpp", b"#define VERSION 3\nversion = VERSION;\n");
        let workspace = TempWorkspace::populate(Some(&temp.path().join("tmp")), PREFIX, &source).unwrap();
        let resolver = Resolver::new(vec![workspace.path().to_path_buf()]);
        let tools = Toolchain::default();

        let mut dispatcher = Dispatcher::new(&tools, &resolver, &[]);
        let kind = FileKind::Config {
            target: PathBuf::from("config.bin"),
        };
        dispatcher
            .binarize_in_workspace(&workspace, Path::new("config.cpp"), &kind)
            .unwrap();

        assert_eq!(
            fs::read_to_string(workspace.path().join("config.bin")).unwrap(),
            "version = 3;\n"
        );
        assert!(workspace.path().join("config.cpp").is_file());
    }

    #[test]
    fn test_binarize_single_file() {
        let temp = TempDir::new().unwrap();
        let resolver = Resolver::default();
        let tools = Toolchain::default();
        let mut dispatcher = Dispatcher::new(&tools, &resolver, &[]);

        let model = temp.path().join("box.p3d");
        fs::write(&model, fixture::model(&[&[]])).unwrap();
        let out = temp.path().join("out").join("box.p3d");
        dispatcher.binarize_file(&model, &out).unwrap();
        assert_eq!(fs::read(&out).unwrap(), fs::read(&model).unwrap());

        let script = temp.path().join("init.sqf");
        fs::write(&script, "hint 'x';").unwrap();
        assert!(dispatcher.binarize_file(&script, &temp.path().join("init.out")).is_err());
    }

    #[test]
    fn test_companion_chain_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "a/b/box.cfg", b"");
        write(root, "a/b/model.cfg", b"");
        write(root, "model.cfg", b"");
        write(root, "a/b/config.cpp", b"");
        let model = root.join("a").join("b").join("box.p3d");

        let chain = companion_chain(&model, root);
        assert_eq!(
            chain,
            vec![
                root.join("a/b/box.cfg"),
                root.join("a/b/model.cfg"),
                root.join("model.cfg"),
                root.join("a/b/config.cpp"),
            ]
        );
    }
}
