use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

use chlc::bytecode::disasm::Disassembler;
use chlc::bytecode::native::NativeFunction;
use chlc::bytecode::stack_check;
use chlc::config::parse_constant;
use chlc::frontend::lexer::Lexer;
use chlc::frontend::token_dumper::TokenDumper;
use chlc::{ChlFile, Compiler, Project};

#[derive(Parser, Debug)]
#[command(name = "chlc", version, about = "Compiles CHL challenge scripts to LHVM bytecode")]
struct Cli {
    /// Log progress and debug details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile source files into a CHL file
    Compile(CompileArgs),
    /// Print a listing of a CHL file
    Disasm {
        file: PathBuf,
        /// Hide source line numbers
        #[arg(long)]
        no_lines: bool,
    },
    /// Print the tokens of a source file
    Tokens {
        file: PathBuf,
        #[arg(long)]
        no_color: bool,
        /// Also list blanks and comments
        #[arg(long)]
        all: bool,
    },
    /// Read and validate a CHL file
    Check { file: PathBuf },
    /// Summarize the sections of a CHL file
    Info { file: PathBuf },
    /// Show the native function reference
    Native {
        /// Function name; lists all functions when omitted
        name: Option<String>,
    },
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// JSON project file listing sources, constants and options
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Define a constant, may be repeated
    #[arg(long = "constant", value_name = "NAME=VALUE", value_parser = parse_constant)]
    constants: Vec<(String, i32)>,

    /// Store every string literal, even repeated ones
    #[arg(long)]
    no_shared_strings: bool,

    #[arg(long)]
    fix_bugs: bool,

    /// Compile calls to unknown scripts with a placeholder id
    #[arg(long)]
    ignore_missing_scripts: bool,

    /// Source files, compiled after the project's own sources
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .without_timestamps()
        .init()
        .context("installing logger")?;

    match cli.command {
        Command::Compile(args) => compile(args),
        Command::Disasm { file, no_lines } => {
            let chl = read_chl(&file)?;
            let mut disasm = Disassembler::new(&chl);
            if no_lines {
                disasm = disasm.without_lines();
            }
            disasm.print();
            Ok(())
        }
        Command::Tokens { file, no_color, all } => dump_tokens(&file, no_color, all),
        Command::Check { file } => check(&file),
        Command::Info { file } => info(&file),
        Command::Native { name } => native(name.as_deref()),
    }
}

fn compile(args: CompileArgs) -> Result<()> {
    let mut project = match &args.project {
        Some(path) => {
            Project::load(path).with_context(|| format!("loading project: {}", path.display()))?
        }
        None => Project::default(),
    };
    project.sources.extend(args.files);
    project.constants.extend(args.constants);
    if args.no_shared_strings {
        project.options.shared_strings = false;
    }
    if args.fix_bugs {
        project.options.fix_bugs = true;
    }
    if args.ignore_missing_scripts {
        project.options.ignore_missing_scripts = true;
    }
    if project.sources.is_empty() {
        bail!("no source files given");
    }
    let output = args
        .output
        .or(project.output.take())
        .unwrap_or_else(|| PathBuf::from("challenge.chl"));

    let mut compiler = Compiler::new(project.options.clone());
    compiler.define_constants(project.constants.iter().map(|(k, v)| (k.clone(), *v)));
    for source in &project.sources {
        compiler
            .parse_file(source)
            .with_context(|| format!("compiling {}", source.display()))?;
    }
    let chl = compiler.seal().context("resolving references")?;
    for e in stack_check::check_file(chl) {
        log::warn!("{}", e);
    }
    chl.write_file(&output)
        .with_context(|| format!("writing output: {}", output.display()))?;
    let diagnostics = compiler.diagnostics();
    if !diagnostics.is_empty() {
        log::info!("{} diagnostics", diagnostics.len());
    }
    log::info!("written {}", output.display());
    Ok(())
}

fn read_chl(path: &Path) -> Result<ChlFile> {
    ChlFile::read_file(path).with_context(|| format!("reading {}", path.display()))
}

fn dump_tokens(path: &Path, no_color: bool, all: bool) -> Result<()> {
    let source = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tokens = Lexer::new(&source)
        .tokenize()
        .with_context(|| format!("tokenizing {}", path.display()))?;
    let mut dumper = TokenDumper::new();
    if no_color {
        dumper = dumper.no_color();
    }
    if all {
        dumper = dumper.all();
    }
    dumper.dump(&tokens);
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let chl = read_chl(path)?;
    let mut problems = chl.validate();
    problems.extend(stack_check::check_file(&chl).iter().map(ToString::to_string));
    for warning in chl.check_code_coverage() {
        log::warn!("{}", warning);
    }
    for problem in &problems {
        log::error!("{}", problem);
    }
    if !problems.is_empty() {
        bail!("{}: {} problems found", path.display(), problems.len());
    }
    log::info!("{}: ok", path.display());
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let chl = read_chl(path)?;
    println!("{}", chl.header);
    println!("globals:      {}", chl.globals.len());
    println!("instructions: {}", chl.code.len());
    println!("autorun:      {}", chl.autostart.len());
    println!("scripts:      {}", chl.scripts.len());
    println!("data:         {}", chl.data);
    println!("init globals: {}", chl.init_globals.len());
    for file in chl.source_filenames() {
        println!();
        println!("{}:", file);
        for script in chl.scripts_in(&file) {
            println!("  {}", script);
        }
    }
    Ok(())
}

fn native(name: Option<&str>) -> Result<()> {
    match name {
        Some(name) => {
            let Some(f) = NativeFunction::from_name(name) else {
                bail!("unknown native function: {}", name);
            };
            println!("{:3} {}", f.code(), f.c_style_signature());
            println!("    {}", f.info_string());
            if let Some(context) = f.context() {
                println!("    context: {:?}", context);
            }
            if f.allows_sys2() {
                println!("    accepts SYS2");
            }
        }
        None => {
            for f in NativeFunction::iter() {
                println!("{:3} {:<40} {}", f.code(), f.name(), f.info_string());
            }
        }
    }
    Ok(())
}
