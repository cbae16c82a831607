use clap::Parser;
use miette::Result;
use boq::cli::{Cli, Commands};
use boq::logging::{init_logging, Verbosity};

fn main() -> Result<()> {
    // Terminate quietly on a closed pipe (`boq boq list | head`)
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(Verbosity::from_flags(global.quiet, global.verbose));

    match cli.command {
        Commands::Init(args) => boq::cli::commands::init::run(args),
        Commands::Boq(cmd) => boq::cli::commands::boq::run(cmd, &global),
        Commands::Item(cmd) => boq::cli::commands::item::run(cmd, &global),
        Commands::Map(cmd) => boq::cli::commands::map::run(cmd, &global),
        Commands::Catalog(cmd) => boq::cli::commands::catalog::run(cmd, &global),
        Commands::Check(args) => boq::cli::commands::check::run(args, &global),
        Commands::Completions(args) => boq::cli::commands::completions::run(args),
    }
}
