use anyhow::{bail, Context};
use bpaf::Bpaf;
use camino::{Utf8Path, Utf8PathBuf};
use dlhandle::{inspect, Binding, OpenOptions};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options)]
/// Open a library through the host loader and resolve symbols in it
struct Options {
    #[bpaf(short, long)]
    /// Verbose output
    verbose: bool,

    #[bpaf(long)]
    /// Resolve all symbols at open time (RTLD_NOW)
    now: bool,

    #[bpaf(long)]
    /// Expose the library's symbols globally (RTLD_GLOBAL)
    global: bool,

    #[bpaf(long)]
    /// Never unload the library (RTLD_NODELETE)
    nodelete: bool,

    #[bpaf(long)]
    /// Only succeed if the library is already loaded (RTLD_NOLOAD)
    noload: bool,

    #[bpaf(long)]
    /// Prefer the library's own symbols (RTLD_DEEPBIND)
    deepbind: bool,

    #[bpaf(short, long)]
    /// Also read SONAME, dependencies and export count from the file
    elf: bool,

    #[bpaf(positional("LIBRARY"))]
    /// Path or name of the library to open
    library: Utf8PathBuf,

    #[bpaf(positional("SYMBOL"))]
    /// Symbols to resolve
    symbols: Vec<String>,
}

/// Initialize the tracing subscriber, writing to stderr
///
/// # Arguments
///
/// * `verbose` - If true, sets log level to DEBUG, otherwise WARN. `RUST_LOG`
///   overrides either.
pub fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::WARN };

    let env_filter = EnvFilter::builder()
        .with_default_directive(filter_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(verbose)
        .with_target(verbose)
        .with_line_number(verbose)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    debug!("Logging initialized with level: {}", filter_level);
}

fn main() -> anyhow::Result<()> {
    let options = options().run();

    init_logging(options.verbose);

    let open_options = OpenOptions::builder()
        .binding(if options.now { Binding::Now } else { Binding::Lazy })
        .global(options.global)
        .nodelete(options.nodelete)
        .noload(options.noload)
        .deepbind(options.deepbind)
        .build();

    // SAFETY: running the library's initialisers is what the user asked for.
    let library = unsafe { open_options.open(&options.library) }
        .with_context(|| format!("Loading {}", options.library))?;

    info!("Opened {} as {:?}", options.library, library.handle());

    if options.elf {
        // The loader may have found the file through its search path
        let path = library.path().unwrap_or_else(|| options.library.clone());
        if let Err(e) = print_elf_info(&path, &options.symbols) {
            warn!("Skipping ELF info: {:#}", e);
        }
    }

    let mut missing = 0;
    for symbol in &options.symbols {
        // SAFETY: the address is only printed, never dereferenced.
        match unsafe { library.address(symbol.as_str()) } {
            Ok(address) => println!("{}: {:p}", symbol, address.as_ptr()),
            Err(e) => {
                println!("{}: error: {}", symbol, e);
                missing += 1;
            }
        }
    }

    library
        .close()
        .with_context(|| format!("Closing {}", options.library))?;

    if missing > 0 {
        bail!("{} of {} symbols could not be resolved", missing, options.symbols.len());
    }

    Ok(())
}

fn print_elf_info(path: &Utf8Path, symbols: &[String]) -> anyhow::Result<()> {
    let info = inspect(path).with_context(|| format!("Reading ELF data from {}", path))?;

    println!("path: {}", info.path);
    println!("soname: {}", info.soname.as_deref().unwrap_or("<none>"));
    println!("class: {}", if info.is_64bit { "ELF64" } else { "ELF32" });
    for needed in &info.needed {
        println!("needed: {}", needed);
    }
    println!("exports: {}", info.exports.len());

    for symbol in symbols {
        if !info.exports_symbol(symbol) {
            debug!("{} is not in the dynamic symbol table", symbol);
        }
    }

    Ok(())
}
