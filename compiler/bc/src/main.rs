//! Driver (§13): reads one or more B source files, runs the
//! parse → build → codegen pipeline over each, and writes assembly, object,
//! or linked-executable output. Thin by design — the frontend pipeline
//! lives in `bc_syntax`/`bc_ast`/`bc_codegen`; this crate only wires a CLI
//! onto it and shells out to LLVM's target machine and the system linker.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use clap::Parser;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::OptimizationLevel;
use tracing::{debug, info};

/// Compile B source files to assembly, an object file, or a linked
/// executable.
#[derive(Parser, Debug)]
#[command(name = "bc", version, about)]
struct Cli {
    /// Source files to compile.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Write output to FILE. Defaults to the first input's basename with an
    /// appropriate extension, or `a.out` when linking an executable.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Optimization level, 0-3.
    #[arg(short = 'O', long = "opt-level", default_value_t = 1)]
    opt_level: u8,

    /// Generate an object file instead of linking an executable.
    #[arg(short = 'c', long = "emit-obj")]
    emit_obj: bool,

    /// Generate assembly instead of linking an executable.
    #[arg(short = 's', long = "emit-asm")]
    emit_asm: bool,

    /// Emit LLVM IR (bitcode with `-c`, textual IR with `-s`) instead of
    /// native code. Only valid alongside `-c` or `-s`.
    #[arg(long = "emit-llvm")]
    emit_llvm: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum OutputKind {
    Object,
    Asm,
    Executable,
}

#[derive(Debug)]
enum DriverError {
    Options(String),
    Io(std::io::Error),
    Parse(String),
    Semantic(String),
    Codegen(String),
    Link(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Options(msg) => write!(f, "{msg}"),
            DriverError::Io(e) => write!(f, "{e}"),
            DriverError::Parse(msg) => write!(f, "parse error: {msg}"),
            DriverError::Semantic(msg) => write!(f, "{msg}"),
            DriverError::Codegen(msg) => write!(f, "{msg}"),
            DriverError::Link(msg) => write!(f, "link error: {msg}"),
        }
    }
}

impl std::error::Error for DriverError {}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e)
    }
}

impl From<bc_syntax::ParseError> for DriverError {
    fn from(e: bc_syntax::ParseError) -> Self {
        DriverError::Parse(e.to_string())
    }
}

impl From<bc_ast::BcError> for DriverError {
    fn from(e: bc_ast::BcError) -> Self {
        DriverError::Semantic(e.to_string())
    }
}

impl From<bc_codegen::BcCodegenError> for DriverError {
    fn from(e: bc_codegen::BcCodegenError) -> Self {
        DriverError::Codegen(e.to_string())
    }
}

fn main() {
    init_logger();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("bc: {err}");
        std::process::exit(1);
    }
}

fn init_logger() {
    if let Err(err) = bc_log::Logger::init_logger(bc_log::LoggerConfig::from_env("BC").unwrap()) {
        eprintln!("bc: error initializing logger: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), DriverError> {
    let output_kind = match (cli.emit_obj, cli.emit_asm) {
        (true, true) => return Err(DriverError::Options("only one of -c or -s may be given".into())),
        (true, false) => OutputKind::Object,
        (false, true) => OutputKind::Asm,
        (false, false) => OutputKind::Executable,
    };

    if cli.emit_llvm && output_kind == OutputKind::Executable {
        return Err(DriverError::Options(
            "--emit-llvm requires -c or -s; an executable has no single IR form to link".into(),
        ));
    }

    if output_kind != OutputKind::Executable && cli.files.len() > 1 {
        return Err(DriverError::Options("only one file may be given with -c or -s".into()));
    }

    let opt_level = match cli.opt_level {
        0 => OptimizationLevel::None,
        1 => OptimizationLevel::Less,
        2 => OptimizationLevel::Default,
        3 => OptimizationLevel::Aggressive,
        other => return Err(DriverError::Options(format!("optimisation level must be 0-3, got {other}"))),
    };

    info!(?output_kind, ?opt_level, "starting compilation");

    match output_kind {
        OutputKind::Object | OutputKind::Asm => {
            let input = &cli.files[0];
            let output = cli.output.clone().unwrap_or_else(|| default_output_path(input, output_kind, cli.emit_llvm));
            compile_one(input, &output, output_kind, opt_level, cli.emit_llvm)?;
        }
        OutputKind::Executable => {
            let output = cli.output.clone().unwrap_or_else(|| PathBuf::from("a.out"));
            link_executable(&cli.files, &output, opt_level)?;
        }
    }

    Ok(())
}

fn default_output_path(input: &Path, kind: OutputKind, emit_llvm: bool) -> PathBuf {
    let stem = input.file_stem().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("a"));
    let ext = match (kind, emit_llvm) {
        (OutputKind::Object, true) => "bc",
        (OutputKind::Object, false) => "o",
        (OutputKind::Asm, true) => "ll",
        (OutputKind::Asm, false) => "s",
        (OutputKind::Executable, _) => unreachable!("executables don't go through default_output_path"),
    };
    stem.with_extension(ext)
}

/// Runs the pipeline on one source file and produces an `inkwell` module
/// named after its basename.
fn build_module<'ll>(ll_context: &'ll Context, input: &Path) -> Result<Module<'ll>, DriverError> {
    let source = fs::read_to_string(input)?;
    let parse_tree = bc_syntax::parse_program(&source)?;
    let config = bc_ast::BuildConfig::default();
    let program = bc_ast::build_program(&parse_tree, &config)?;

    let module_name = input.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
    let module = bc_codegen::compile_program(ll_context, module_name, &program)?;
    debug!(module_name, "compiled module");
    Ok(module)
}

fn run_optimizations(module: &Module, machine: &TargetMachine, opt_level: OptimizationLevel) -> Result<(), DriverError> {
    let passes = match opt_level {
        OptimizationLevel::None => return Ok(()),
        OptimizationLevel::Less => "default<O1>",
        OptimizationLevel::Default => "default<O2>",
        OptimizationLevel::Aggressive => "default<O3>",
    };
    module
        .run_passes(passes, machine, PassBuilderOptions::create())
        .map_err(|e| DriverError::Codegen(e.to_string()))
}

fn create_target_machine(opt_level: OptimizationLevel) -> Result<TargetMachine, DriverError> {
    Target::initialize_native(&InitializationConfig::default())
        .map_err(|e| DriverError::Codegen(e.to_string()))?;

    let triple = TargetMachine::get_default_triple();
    let target = Target::from_triple(&triple).map_err(|e| DriverError::Codegen(e.to_string()))?;
    let cpu = TargetMachine::get_host_cpu_name();
    let features = TargetMachine::get_host_cpu_features();

    target
        .create_target_machine(
            &triple,
            cpu.to_str().unwrap_or("generic"),
            features.to_str().unwrap_or(""),
            opt_level,
            RelocMode::Default,
            CodeModel::Default,
        )
        .ok_or_else(|| DriverError::Codegen("failed to create a target machine for the host triple".into()))
}

fn compile_one(
    input: &Path,
    output: &Path,
    kind: OutputKind,
    opt_level: OptimizationLevel,
    emit_llvm: bool,
) -> Result<(), DriverError> {
    let ll_context = Context::create();
    let module = build_module(&ll_context, input)?;
    let machine = create_target_machine(opt_level)?;
    run_optimizations(&module, &machine, opt_level)?;

    match (kind, emit_llvm) {
        (OutputKind::Object, true) => module
            .write_bitcode_to_path(output)
            .then_some(())
            .ok_or_else(|| DriverError::Io(std::io::Error::other("failed to write LLVM bitcode"))),
        (OutputKind::Asm, true) => module
            .print_to_file(output)
            .map_err(|e| DriverError::Codegen(e.to_string())),
        (OutputKind::Object, false) => machine
            .write_to_file(&module, FileType::Object, output)
            .map_err(|e| DriverError::Codegen(e.to_string())),
        (OutputKind::Asm, false) => machine
            .write_to_file(&module, FileType::Assembly, output)
            .map_err(|e| DriverError::Codegen(e.to_string())),
        (OutputKind::Executable, _) => unreachable!("compile_one is never called for an executable"),
    }
}

/// Compiles every input to its own object file in a scratch directory, then
/// links them together with the system `cc`, pulling in the runtime support
/// library alongside the user's objects.
fn link_executable(inputs: &[PathBuf], output: &Path, opt_level: OptimizationLevel) -> Result<(), DriverError> {
    let scratch = tempfile::tempdir()?;
    let machine = create_target_machine(opt_level)?;
    let mut object_paths = Vec::with_capacity(inputs.len());

    for input in inputs {
        let ll_context = Context::create();
        let module = build_module(&ll_context, input)?;
        run_optimizations(&module, &machine, opt_level)?;

        let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("module");
        let object_path = scratch.path().join(format!("{stem}.o"));
        machine
            .write_to_file(&module, FileType::Object, &object_path)
            .map_err(|e| DriverError::Codegen(e.to_string()))?;
        object_paths.push(object_path);
    }

    let runtime_object = compile_runtime(scratch.path())?;

    let status = Command::new("cc")
        .arg("-o")
        .arg(output)
        .args(&object_paths)
        .arg(&runtime_object)
        .status()
        .map_err(|e| DriverError::Link(e.to_string()))?;

    if !status.success() {
        return Err(DriverError::Link(format!("cc exited with {status}")));
    }

    Ok(())
}

/// Builds `runtime/libb.c` into an object file the linker can pull in
/// alongside user code, the way the original implementation links
/// `libb.c`/`libb.b` into every program (§1, §10).
fn compile_runtime(scratch_dir: &Path) -> Result<PathBuf, DriverError> {
    let runtime_source = concat!(env!("CARGO_MANIFEST_DIR"), "/../../runtime/libb.c");
    let object_path = scratch_dir.join("libb.o");
    let status = Command::new("cc")
        .arg("-c")
        .arg(runtime_source)
        .arg("-o")
        .arg(&object_path)
        .status()
        .map_err(|e| DriverError::Link(e.to_string()))?;

    if !status.success() {
        return Err(DriverError::Link(format!("cc exited with {status} compiling the runtime")));
    }

    Ok(object_path)
}
