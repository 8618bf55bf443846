//! Version comparison helper for deployment scripts.
//!
//! Compares two semantic versions with a relational operator and reports
//! through the exit code, so shell extensions can gate work on installed
//! tool versions: `compver --v1 "$current" --v2 2.0.0 --op '>='`.

use std::str::FromStr;

use clap::Parser;
use semver::Version;

#[derive(Parser)]
#[command(name = "compver", version, about = "Compare two semantic versions")]
struct Cli {
    /// Version as left operand.
    #[arg(long)]
    v1: Version,
    /// Version as right operand.
    #[arg(long)]
    v2: Version,
    /// Comparison operator. Available values: == != > < >= <=
    #[arg(long)]
    op: Op,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl FromStr for Op {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            ">" => Ok(Self::Gt),
            "<" => Ok(Self::Lt),
            ">=" => Ok(Self::Ge),
            "<=" => Ok(Self::Le),
            _ => Err("available values: == != > < >= <=".to_string()),
        }
    }
}

impl Op {
    fn holds(self, v1: &Version, v2: &Version) -> bool {
        match self {
            Self::Eq => v1 == v2,
            Self::Ne => v1 != v2,
            Self::Gt => v1 > v2,
            Self::Lt => v1 < v2,
            Self::Ge => v1 >= v2,
            Self::Le => v1 <= v2,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if cli.op.holds(&cli.v1, &cli.v2) {
        std::process::exit(0);
    }
    std::process::exit(1);
}
