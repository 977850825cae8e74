mod apply;
mod logging;
mod options;
mod show;

use anyhow::Result;
use clap::{CommandFactory as _, Parser, Subcommand};
use options::Options;
use std::process::exit;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<()> {
    let _frontend = logging::set_up(logging::Options {
        verbose: args.options.verbose,
        color: args.options.use_color(),
    })?;
    match &args.command {
        Commands::Apply(subargs) => apply::apply(subargs),
        Commands::Show(subargs) => show::show(subargs),
        Commands::GenerateMan => (|| {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(())
        })(),
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(())
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(*shell, &mut cmd, "srvcfg", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn handle_result(r: Result<()>) {
    match r {
        Ok(()) => {}
        Err(e) => {
            eprintln!("srvcfg error: {:#}", e);
            exit(1);
        }
    }
}

/// srvcfg: change a server's configuration, running or not
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply a list of configuration commands to a configuration file or a
    /// management model
    #[command()]
    Apply(apply::Args),

    /// Print a configuration file or management model, or one subsystem of
    /// it
    #[command()]
    Show(show::Args),

    /// Generate markdown documentation for srvcfg
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for srvcfg
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for srvcfg
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
