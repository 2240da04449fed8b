use clap::{Arg, ArgAction, Command};

fn path_arg() -> Arg {
    Arg::new("path")
        .help("Any directory inside the repository (defaults to the current directory)")
        .index(1)
}

pub fn status_command() -> Command {
    Command::new("status")
        .about("Load and print a status snapshot for every worktree")
        .arg(path_arg())
        .arg(
            Arg::new("json")
                .long("json")
                .help("Output in JSON format")
                .action(ArgAction::SetTrue),
        )
}

pub fn watch_command() -> Command {
    Command::new("watch")
        .about("Watch every worktree and print status changes until interrupted")
        .arg(path_arg())
        .arg(
            Arg::new("select")
                .long("select")
                .short('s')
                .value_name("NAME")
                .help("Worktree to focus (defaults to the one containing PATH)"),
        )
}
