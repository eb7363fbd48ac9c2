//! Artifacts produced by an external transcoder (ImageMagick by default).

use async_trait::async_trait;
use exn::{OptionExt, ResultExt};
use mipmap_cache::TargetWidth;
use mipmap_config::GeneratorConfig;
use mipmap_library::ArtifactGenerator;
use mipmap_library::generate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::instrument;
use upon::{Engine, Template};

/// Transcoders tried, in order, when none is configured.
const DEFAULT_PROGRAMS: [&str; 2] = ["magick", "convert"];

fn discover(program: Option<&str>) -> Result<PathBuf> {
    if let Some(program) = program {
        return which::which(program).or_raise(|| ErrorKind::Unavailable(program.to_string()));
    }
    for candidate in DEFAULT_PROGRAMS {
        if let Ok(path) = which::which(candidate) {
            return Ok(path);
        }
    }
    tracing::info!(candidates = ?DEFAULT_PROGRAMS, "No transcoder found in PATH");
    exn::bail!(ErrorKind::Unavailable(DEFAULT_PROGRAMS.join(", ")));
}

/// Runs an external program once per artifact.
///
/// Argument templates are compiled up front so a typo fails at startup
/// rather than on the first asset. Each template may use `{{ input }}` (the
/// source path), `{{ output }}` (the artifact path), `{{ width }}` (the
/// target width to 2 decimals) and `{{ pixels }}` (the width rounded up to a
/// whole pixel).
pub struct CommandGenerator {
    program: PathBuf,
    engine: Engine<'static>,
    args: Vec<Template<'static>>,
    artifacts: PathBuf,
    extension: String,
}

impl CommandGenerator {
    pub fn new(config: &GeneratorConfig, artifacts: impl Into<PathBuf>) -> Result<Self> {
        let program = discover(config.program.as_deref())?;
        let engine = Engine::new();
        let args = config
            .args
            .iter()
            .map(|arg| engine.compile(arg.clone()).or_raise(|| ErrorKind::Unavailable(format!("argument {arg:?}"))))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(program = %program.display(), "Using transcoder");
        Ok(Self { program, engine, args, artifacts: artifacts.into(), extension: config.extension.clone() })
    }

    /// Where the artifact for `asset_identifier` at `width` is written.
    ///
    /// Named by content-independent hash of the identifier, so the same asset
    /// always maps to the same file at a given width.
    pub fn output_path(&self, asset_identifier: &str, width: TargetWidth) -> PathBuf {
        let hash = blake3::hash(asset_identifier.as_bytes());
        self.artifacts.join(format!("{}-{width}.{}", hash.to_hex(), self.extension))
    }

    fn input_path(asset_identifier: &str) -> Result<&Path> {
        asset_identifier
            .strip_prefix("file://")
            .map(Path::new)
            .ok_or_raise(|| ErrorKind::Source(asset_identifier.to_string()))
    }

    fn render_args(&self, input: &Path, output: &Path, width: TargetWidth) -> Result<Vec<String>> {
        // Lossless: target widths are far below 2^52.
        let pixels = width.as_f64().ceil() as i64;
        let values = upon::value! {
            input: input.display().to_string(),
            output: output.display().to_string(),
            width: width.to_string(),
            pixels: pixels,
        };
        self.args
            .iter()
            .map(|arg| arg.render(&self.engine, &values).to_string().or_raise(|| ErrorKind::Failed("argument".into())))
            .collect()
    }
}

#[async_trait]
impl ArtifactGenerator for CommandGenerator {
    #[instrument(skip(self), fields(program = %self.program.display()))]
    async fn generate(&self, asset_identifier: &str, width: TargetWidth) -> Result<String> {
        let input = Self::input_path(asset_identifier)?;
        let output = self.output_path(asset_identifier, width);
        tokio::fs::create_dir_all(&self.artifacts).await.or_raise(|| ErrorKind::Io)?;
        let args = self.render_args(input, &output, width)?;

        let result = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .or_raise(|| ErrorKind::Io)?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            exn::bail!(ErrorKind::Failed(format!("{} ({}): {}", asset_identifier, result.status, stderr.trim())));
        }
        tracing::debug!(output = %output.display(), "Generated artifact");
        Ok(output.display().to_string())
    }
}
