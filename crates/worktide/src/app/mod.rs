mod global;
mod query;


use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(query::status_command())
        .subcommand(query::watch_command())
}
