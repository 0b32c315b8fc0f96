use std::fmt::Write;

pub struct CommandHelp {
    pub name: &'static str,
    pub summary: &'static str,
    pub usage: &'static str,
    pub options: &'static [(&'static str, &'static str)],
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "cd",
        summary: "Change the current folder",
        usage: "cd [PATH]",
        options: &[],
    },
    CommandHelp {
        name: "cp",
        summary: "Copy a file or folder",
        usage: "cp SOURCE TARGET",
        options: &[],
    },
    CommandHelp {
        name: "download",
        summary: "Download files or folders to the local machine",
        usage: "download SOURCE... [LOCAL_DIR]",
        options: &[(
            "PREFIX*",
            "Download every entry of the folder whose name starts with PREFIX",
        )],
    },
    CommandHelp {
        name: "exit",
        summary: "Leave the shell (also: quit, q)",
        usage: "exit",
        options: &[],
    },
    CommandHelp {
        name: "help",
        summary: "Show help for commands",
        usage: "help [COMMAND]",
        options: &[],
    },
    CommandHelp {
        name: "logout",
        summary: "Forget the stored session and exit",
        usage: "logout",
        options: &[],
    },
    CommandHelp {
        name: "ls",
        summary: "List the entries of a folder",
        usage: "ls [PATH]",
        options: &[],
    },
    CommandHelp {
        name: "mkdir",
        summary: "Create a folder, reusing one that already exists",
        usage: "mkdir PATH",
        options: &[],
    },
    CommandHelp {
        name: "mv",
        summary: "Move or rename a file or folder",
        usage: "mv SOURCE TARGET",
        options: &[],
    },
    CommandHelp {
        name: "pwd",
        summary: "Print the current folder",
        usage: "pwd",
        options: &[],
    },
    CommandHelp {
        name: "rm",
        summary: "Move entries to the recycle bin",
        usage: "rm PATH | rm PREFIX*",
        options: &[("PREFIX*", "Remove every entry of the folder whose name starts with PREFIX")],
    },
    CommandHelp {
        name: "upload",
        summary: "Upload local files or folders",
        usage: "upload SOURCE... [TARGET] [MODE]",
        options: &[
            ("PREFIX*", "Upload every local sibling whose name starts with PREFIX"),
            ("auto_rename", "Rename the upload when the name is taken"),
            ("refuse", "Skip the upload when the name is taken"),
            ("overwrite", "Replace the existing entry"),
        ],
    },
];

pub fn get_help(name: &str) -> Option<&'static CommandHelp> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub fn format_help(cmd: &CommandHelp) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}\n", cmd.name, cmd.summary);
    let _ = writeln!(out, "Usage: {}", cmd.usage);
    if !cmd.options.is_empty() {
        out.push_str("\nOptions:\n");
        for (opt, desc) in cmd.options {
            let _ = writeln!(out, "  {opt:16} {desc}");
        }
    }
    out
}

pub fn format_help_list() -> String {
    let mut out = String::new();
    out.push_str("alidisk - Aliyun Drive Shell Commands\n\n");
    out.push_str("Available commands:\n\n");

    for cmd in COMMANDS {
        let _ = writeln!(out, "  {:12} {}", cmd.name, cmd.summary);
    }

    out.push_str("\nUse 'help COMMAND' for more information.\n");
    out
}
