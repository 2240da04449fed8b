use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("worktide")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live git and pull-request status for every worktree of a repository")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
