//! File operations behind the CLI: compress, decompress, test and list.
//!
//! Each file is handled independently; failures are reported and counted so
//! one bad input does not stop the rest. With `-T` other than 1 the files are
//! spread over a rayon pool (output to stdout always stays sequential).

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use rayon::prelude::*;
use tracing::debug;

use crate::cli::args::{Cli, OpMode};
use crate::cli::constants::{format_size, STDIO_MARK};
use crate::cli::files::{
    compressed_name, decompressed_name, expand_inputs, has_suffix, mtime_secs, restore_mtime,
    stored_name,
};
use crate::config::{self, IO_BUFFER_SIZE};
use crate::container::{inspect, ContainerMeta, ContainerReader, ContainerWriter, WriteOptions};
use crate::stream::Level;
use crate::{displaylevel, displayout};

/// Everything a single-file operation needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct Options {
    pub mode: OpMode,
    pub level: Level,
    pub to_stdout: bool,
    pub keep: bool,
    pub force: bool,
    pub suffix: String,
    pub no_name: bool,
    pub use_stored_name: bool,
}

impl Options {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Options> {
        if cli.suffix.is_empty() {
            bail!("suffix must not be empty");
        }
        let level = match cli.level {
            Some(l) => Level::new(l)?,
            None => config::default_level(),
        };
        Ok(Options {
            mode: cli.op_mode(),
            level,
            to_stdout: cli.to_stdout,
            keep: cli.keep || cli.to_stdout,
            force: cli.force,
            suffix: cli.suffix.clone(),
            no_name: cli.no_name,
            use_stored_name: cli.name,
        })
    }
}

/// Run the operation over every input. Returns the number of files that
/// failed.
pub fn run(cli: &Cli) -> anyhow::Result<usize> {
    let opts = Options::from_cli(cli)?;
    let inputs = if cli.files.is_empty() {
        vec![PathBuf::from(STDIO_MARK)]
    } else {
        expand_inputs(&cli.files, cli.recursive).context("cannot expand input list")?
    };

    if opts.mode == OpMode::List {
        displayout!(
            "{:>12} {:>14} {:>7}  {}\n",
            "compressed",
            "uncompressed",
            "ratio",
            "name"
        );
        let failed = inputs
            .iter()
            .filter(|p| report(p, list_file(p)).is_err())
            .count();
        return Ok(failed);
    }

    let parallel = cli.jobs != 1 && inputs.len() > 1 && !opts.to_stdout;
    if !parallel {
        return Ok(inputs
            .iter()
            .filter(|p| report(p, process_file(p, &opts)).is_err())
            .count());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cli.jobs)
        .build()
        .context("cannot start worker threads")?;
    debug!(threads = pool.current_num_threads(), files = inputs.len(), "parallel run");
    Ok(pool.install(|| {
        inputs
            .par_iter()
            .filter(|p| report(p, process_file(p, &opts)).is_err())
            .count()
    }))
}

fn report(path: &Path, result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = &result {
        displaylevel!(1, "sluice: {}: {:#}\n", path.display(), e);
    }
    result
}

fn process_file(src: &Path, opts: &Options) -> anyhow::Result<()> {
    match opts.mode {
        OpMode::Compress => compress_file(src, opts),
        OpMode::Decompress => decompress_file(src, opts, false),
        OpMode::Test => decompress_file(src, opts, true),
        OpMode::List => list_file(src),
    }
}

fn is_stdin(src: &Path) -> bool {
    src.as_os_str() == STDIO_MARK
}

// ─────────────────────────────────────────────────────────────────────────────
// Compress
// ─────────────────────────────────────────────────────────────────────────────

fn compress_file(src: &Path, opts: &Options) -> anyhow::Result<()> {
    let write_opts = WriteOptions::default().with_level(opts.level);

    if is_stdin(src) {
        let stdout = io::stdout();
        if stdout.is_terminal() && !opts.force {
            bail!("refusing to write compressed data to a terminal (use -f)");
        }
        let meta = ContainerMeta::default();
        let mut input = io::stdin().lock();
        compress_stream(&mut input, stdout.lock(), meta, write_opts)?;
        return Ok(());
    }

    if has_suffix(src, &opts.suffix) && !opts.force {
        bail!("already has {} suffix -- unchanged", opts.suffix);
    }
    let src_meta = fs::metadata(src).context("cannot stat input")?;
    let mut meta = ContainerMeta::default();
    if !opts.no_name {
        meta.name = stored_name(src);
        meta.mtime = mtime_secs(&src_meta);
    }
    let mut input =
        BufReader::with_capacity(IO_BUFFER_SIZE, File::open(src).context("cannot open input")?);

    if opts.to_stdout {
        compress_stream(&mut input, io::stdout().lock(), meta, write_opts)?;
        return Ok(());
    }

    let dst = compressed_name(src, &opts.suffix);
    let out = create_output(&dst, opts.force)?;
    let (n_in, n_out) = match compress_stream(&mut input, out, meta, write_opts) {
        Ok(sizes) => sizes,
        Err(e) => {
            let _ = fs::remove_file(&dst);
            return Err(e);
        }
    };
    displaylevel!(
        2,
        "{}: {} => {} ({:.2}%)\n",
        src.display(),
        format_size(n_in),
        format_size(n_out),
        percent(n_out, n_in)
    );
    finish_source(src, opts)
}

fn compress_stream<R: Read, W: Write>(
    input: &mut R,
    out: W,
    meta: ContainerMeta,
    options: WriteOptions,
) -> anyhow::Result<(u64, u64)> {
    let mut w = ContainerWriter::open(out, meta, options).context("cannot write header")?;
    io::copy(input, &mut w).context("compression failed")?;
    let summary = w.close().context("cannot finish container")?;
    Ok((summary.uncompressed, summary.compressed))
}

// ─────────────────────────────────────────────────────────────────────────────
// Decompress / test
// ─────────────────────────────────────────────────────────────────────────────

fn decompress_file(src: &Path, opts: &Options, test_only: bool) -> anyhow::Result<()> {
    if is_stdin(src) {
        let reader = ContainerReader::open(io::stdin().lock()).context("not a sluice container")?;
        if test_only {
            drain(reader, io::sink())?;
        } else {
            drain(reader, io::stdout().lock())?;
        }
        return Ok(());
    }

    let file = File::open(src).context("cannot open input")?;
    let reader = ContainerReader::open(BufReader::with_capacity(IO_BUFFER_SIZE, file))
        .context("not a sluice container")?;

    if test_only {
        let n = drain(reader, io::sink())?;
        displaylevel!(2, "{}: OK ({})\n", src.display(), format_size(n));
        return Ok(());
    }
    if opts.to_stdout {
        drain(reader, io::stdout().lock())?;
        return Ok(());
    }

    let dst = output_name_for(src, reader.meta(), opts)?;
    let mtime = reader.meta().mtime;
    let out = create_output(&dst, opts.force)?;
    let n = match drain(reader, out) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&dst);
            return Err(e);
        }
    };
    if !opts.no_name {
        restore_mtime(&dst, mtime).context("cannot restore modification time")?;
    }
    displaylevel!(2, "{}: {} => {}\n", src.display(), format_size(n), dst.display());
    finish_source(src, opts)
}

fn output_name_for(src: &Path, meta: &ContainerMeta, opts: &Options) -> anyhow::Result<PathBuf> {
    if opts.use_stored_name {
        if let Some(name) = meta.name.as_deref() {
            // Only the final component is honoured.
            if let Some(base) = Path::new(name).file_name() {
                return Ok(src.with_file_name(base));
            }
        }
    }
    match decompressed_name(src, &opts.suffix) {
        Some(dst) => Ok(dst),
        None => bail!("unknown suffix -- ignored"),
    }
}

/// Copy every decoded byte into `out`, then check the trailers.
fn drain<R: Read, W: Write>(mut reader: ContainerReader<R>, mut out: W) -> anyhow::Result<u64> {
    let n = io::copy(&mut reader, &mut out).context("decompression failed")?;
    out.flush().context("cannot write output")?;
    reader.close().context("integrity check failed")?;
    Ok(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// List
// ─────────────────────────────────────────────────────────────────────────────

fn list_file(src: &Path) -> anyhow::Result<()> {
    if is_stdin(src) {
        bail!("cannot list standard input");
    }
    let info = inspect(File::open(src).context("cannot open input")?)
        .context("not a sluice container")?;
    let name = info
        .meta
        .name
        .clone()
        .unwrap_or_else(|| src.display().to_string());
    displayout!(
        "{:>12} {:>14} {:>6.1}%  {}\n",
        info.total_len,
        info.uncompressed_mod32,
        info.ratio() * 100.0,
        name
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn create_output(dst: &Path, force: bool) -> anyhow::Result<BufWriter<File>> {
    if dst.exists() && !force {
        bail!("{} already exists (use -f to overwrite)", dst.display());
    }
    let f = File::create(dst).with_context(|| format!("cannot create {}", dst.display()))?;
    Ok(BufWriter::with_capacity(IO_BUFFER_SIZE, f))
}

fn finish_source(src: &Path, opts: &Options) -> anyhow::Result<()> {
    if !opts.keep {
        fs::remove_file(src).context("cannot remove input")?;
    }
    Ok(())
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}
