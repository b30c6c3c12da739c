use clap::{Parser, ValueEnum};
use gorbit_asm::loader::load_file;
use gorbit_vm::{Dispatch, Machine, Terminal, VmError};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gorbit")]
#[command(about = "GORBITSA virtual machine")]
struct Args {
    /// Program source file
    source: PathBuf,

    /// How the interpreter selects each instruction's handler
    #[arg(long, value_enum, default_value_t = DispatchArg::Switch)]
    dispatch: DispatchArg,

    /// Trace every executed instruction to stderr
    #[arg(short, long)]
    trace: bool,

    /// Dump registers, program and memory to stderr once the run ends
    #[arg(long)]
    dump: bool,

    /// Log more (-v for debug, -vv for trace); GORBIT_LOG overrides this
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum DispatchArg {
    Switch,
    Table,
}

impl From<DispatchArg> for Dispatch {
    fn from(arg: DispatchArg) -> Self {
        match arg {
            DispatchArg::Switch => Dispatch::Switch,
            DispatchArg::Table => Dispatch::Table,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_env("GORBIT_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let program = match load_file(&args.source) {
        Ok(program) => program,
        Err(e) => {
            debug!(error = ?e, "load failed");
            println!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let mut mach = Machine::new(program).with_dispatch(args.dispatch.into());
    let result = {
        let mut console = Terminal::new(io::stdin().lock(), io::stdout().lock());
        if args.trace {
            mach.run_traced(&mut console, &mut io::stderr())
        } else {
            mach.run(&mut console)
        }
    };

    if args.dump {
        if let Err(e) = mach.dump_ctx(&mut io::stderr()) {
            warn!(error = %e, "could not dump machine state");
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(VmError::Fault(fault)) => {
            println!("{}", fault);
            ExitCode::from(1)
        }
        Err(VmError::Io(e)) => {
            eprintln!("console i/o failed: {}", e);
            ExitCode::from(1)
        }
    }
}
