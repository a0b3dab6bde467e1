//! Command table for the serial line protocol.
//!
//! The parser interprets this structure directly, and the emulator's `help`
//! output renders it, so keywords and argument shapes are declared once.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Arm,
    SetPulse,
    SetPower,
    SetPreheat,
    Cmd,
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubcommandTag {
    Fire,
    Enable,
    Disable,
    Status,
    Set,
    Pulse,
    Power,
}

/// Argument shape that follows a keyword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    /// Nothing but whitespace may follow.
    End,
    /// `,<int>`. A missing value reads as zero and trailing text is ignored.
    Value,
    /// `,<int>{,<int>}`. Consecutive integer fields are counted up to `max`.
    Fields { required: usize, max: usize },
    /// `,<keyword>` selecting one of the branches.
    Subcommands(&'static [SubcommandBranch]),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubcommandBranch {
    pub name: &'static str,
    pub tag: SubcommandTag,
    pub grammar: &'static Node,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub grammar: &'static Node,
    pub usage: &'static str,
    pub summary: &'static str,
}

const END: Node = Node::End;
const VALUE: Node = Node::Value;

const SET_BRANCHES: [SubcommandBranch; 2] = [
    SubcommandBranch {
        name: "PULSE",
        tag: SubcommandTag::Pulse,
        grammar: &VALUE,
    },
    SubcommandBranch {
        name: "POWER",
        tag: SubcommandTag::Power,
        grammar: &VALUE,
    },
];

const SET_GRAMMAR: Node = Node::Subcommands(&SET_BRANCHES);

const CMD_BRANCHES: [SubcommandBranch; 5] = [
    SubcommandBranch {
        name: "FIRE",
        tag: SubcommandTag::Fire,
        grammar: &END,
    },
    SubcommandBranch {
        name: "ENABLE",
        tag: SubcommandTag::Enable,
        grammar: &END,
    },
    SubcommandBranch {
        name: "DISABLE",
        tag: SubcommandTag::Disable,
        grammar: &END,
    },
    SubcommandBranch {
        name: "STATUS",
        tag: SubcommandTag::Status,
        grammar: &END,
    },
    SubcommandBranch {
        name: "SET",
        tag: SubcommandTag::Set,
        grammar: &SET_GRAMMAR,
    },
];

const CMD_GRAMMAR: Node = Node::Subcommands(&CMD_BRANCHES);

const SET_PULSE_GRAMMAR: Node = Node::Fields {
    required: 2,
    max: 6,
};

const SET_PREHEAT_GRAMMAR: Node = Node::Fields {
    required: 3,
    max: 4,
};

pub const COMMANDS: [CommandSpec; 6] = [
    CommandSpec {
        name: "ARM",
        tag: CommandTag::Arm,
        grammar: &VALUE,
        usage: "ARM,<0|1>",
        summary: "Arm or disarm the weld output",
    },
    CommandSpec {
        name: "SET_PULSE",
        tag: CommandTag::SetPulse,
        grammar: &SET_PULSE_GRAMMAR,
        usage: "SET_PULSE,<mode>,<d1>[,<gap1>,<d2>,<gap2>,<d3>]",
        summary: "Set stage count, stage durations, and gaps in ms",
    },
    CommandSpec {
        name: "SET_POWER",
        tag: CommandTag::SetPower,
        grammar: &VALUE,
        usage: "SET_POWER,<pct>",
        summary: "Set main-stage power (50-100 %)",
    },
    CommandSpec {
        name: "SET_PREHEAT",
        tag: CommandTag::SetPreheat,
        grammar: &SET_PREHEAT_GRAMMAR,
        usage: "SET_PREHEAT,<en>,<ms>,<pct>[,<gap_ms>]",
        summary: "Configure the preheat pulse",
    },
    CommandSpec {
        name: "CMD",
        tag: CommandTag::Cmd,
        grammar: &CMD_GRAMMAR,
        usage: "CMD,<FIRE|ENABLE|DISABLE|STATUS|SET,PULSE,<ms>|SET,POWER,<pct>>",
        summary: "Fire, force the armed state, query status, or set a checked value",
    },
    CommandSpec {
        name: "STATUS",
        tag: CommandTag::Status,
        grammar: &END,
        usage: "STATUS",
        summary: "Report arm, cooldown, and recipe state",
    },
];

/// Looks up a top-level keyword. Keywords are case-sensitive.
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_unique_and_exact() {
        for (index, spec) in COMMANDS.iter().enumerate() {
            assert_eq!(find(spec.name).map(|found| found.tag), Some(spec.tag));
            assert!(
                COMMANDS[index + 1..]
                    .iter()
                    .all(|other| other.name != spec.name)
            );
        }
        assert!(find("status").is_none());
        assert!(find("ARMED").is_none());
    }
}
