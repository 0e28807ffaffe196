// cio - CLI for the Customer.io App API
// Copyright (C) 2024 The cio contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::config::Scope;
use crate::dispatch::Request;
use crate::endpoints::{self, Action, Endpoint, GROUPS, Group};
use crate::output::{OutputMode, OutputOptions};
use clap::{Arg, ArgAction, ArgMatches, Command, CommandFactory, Parser, Subcommand, ValueEnum};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(
    name = "cio",
    version,
    about = "CLI for the Customer.io App API",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "REGION",
        help = "API region: us or eu (otherwise CIO_REGION, the config file, then us)"
    )]
    pub region: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "EXPR",
        help = "jq expression to filter JSON output"
    )]
    pub jq: Option<String>,

    #[arg(long, global = true, help = "Force JSON output")]
    pub json: bool,

    #[arg(long, global = true, help = "Print compact single-line JSON")]
    pub plain: bool,

    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Log requests to stderr (-vv for more detail; CIO_LOG overrides)"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check API token and connectivity
    Status,
    /// Print the version
    Version,
    /// Persist an API token (and `--region`, if given) to the chosen scope
    Configure {
        #[arg(long)]
        token: String,
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
    },
    /// Show the effective configuration with the token masked
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("--json and --plain cannot be used together")]
    JsonWithPlain,
    #[error("--jq requires JSON output mode (remove --plain or use --json)")]
    FilterWithPlain,
}

impl Cli {
    /// Reject conflicting output flags. Runs before any request is made.
    pub fn output_options(&self) -> Result<OutputOptions, CliError> {
        if self.json && self.plain {
            return Err(CliError::JsonWithPlain);
        }
        let filter = self.jq.clone().filter(|expr| !expr.trim().is_empty());
        if filter.is_some() && self.plain {
            return Err(CliError::FilterWithPlain);
        }

        let mode = if self.plain {
            OutputMode::Plain
        } else {
            OutputMode::Pretty
        };
        Ok(OutputOptions { mode, filter })
    }
}

/// The full command tree: built-ins plus one subcommand per endpoint group.
pub fn command() -> Command {
    Cli::command().subcommands(GROUPS.iter().map(group_command))
}

fn group_command(group: &'static Group) -> Command {
    Command::new(group.name)
        .about(group.about)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommands(group.endpoints.iter().map(endpoint_command))
}

fn endpoint_command(endpoint: &'static Endpoint) -> Command {
    let mut cmd = Command::new(endpoint.name)
        .about(endpoint.about)
        .visible_aliases(endpoint.aliases.iter().copied());

    for name in endpoint.args {
        cmd = cmd.arg(Arg::new(*name).value_name(*name).required(true));
    }
    if endpoint.action.accepts_body() {
        cmd = cmd.arg(
            Arg::new("body")
                .long("body")
                .value_name("JSON")
                .help("JSON request body (otherwise read from piped stdin)"),
        );
    }
    if let Action::QueryOrPost { flag, help, .. } = endpoint.action {
        cmd = cmd.arg(Arg::new(flag).long(flag).help(help));
    }
    cmd
}

/// The endpoint chosen on the command line, with its own matches.
pub fn selected_endpoint(matches: &ArgMatches) -> Option<(&'static Endpoint, &ArgMatches)> {
    let (group, group_matches) = matches.subcommand()?;
    let (name, endpoint_matches) = group_matches.subcommand()?;
    let endpoint = endpoints::find(group, name)?;
    Some((endpoint, endpoint_matches))
}

pub fn request(endpoint: &Endpoint, matches: &ArgMatches) -> Request {
    let args = endpoint
        .args
        .iter()
        .filter_map(|name| matches.get_one::<String>(name).cloned())
        .collect();
    let body = if endpoint.action.accepts_body() {
        matches.get_one::<String>("body").cloned()
    } else {
        None
    };
    let query = match endpoint.action {
        Action::QueryOrPost { flag, .. } => matches.get_one::<String>(flag).cloned(),
        _ => None,
    };
    Request { args, body, query }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::FromArgMatches;

    fn parse(args: &[&str]) -> (Cli, ArgMatches) {
        let matches = command().try_get_matches_from(args).unwrap();
        let cli = Cli::from_arg_matches(&matches).unwrap();
        (cli, matches)
    }

    #[test]
    fn command_tree_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn builtins_parse_through_derive() {
        let (cli, _) = parse(&["cio", "status", "--json"]);
        assert!(matches!(cli.command, Some(Commands::Status)));
        assert!(cli.json);

        let (cli, _) = parse(&["cio", "configure", "--token", "abc", "--scope", "local"]);
        match cli.command {
            Some(Commands::Configure { token, scope, .. }) => {
                assert_eq!(token, "abc");
                assert!(matches!(Scope::from(scope), Scope::Local));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn endpoint_groups_are_not_builtins() {
        let (cli, matches) = parse(&["cio", "segments", "get", "42", "--region", "eu"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.region.as_deref(), Some("eu"));

        let (endpoint, sub) = selected_endpoint(&matches).unwrap();
        assert_eq!(endpoint.path, "/v1/segments/{}");
        assert_eq!(request(endpoint, sub).args, vec!["42".to_string()]);
    }

    #[test]
    fn global_flags_work_before_the_subcommand() {
        let (cli, _) = parse(&["cio", "--jq", ".name", "-vv", "segments", "ls"]);
        assert_eq!(cli.jq.as_deref(), Some(".name"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn aliases_resolve_to_canonical_names() {
        let (_, matches) = parse(&["cio", "segments", "list"]);
        assert_eq!(selected_endpoint(&matches).unwrap().0.name, "ls");

        let (_, matches) = parse(&["cio", "collections", "delete", "3"]);
        assert_eq!(selected_endpoint(&matches).unwrap().0.name, "rm");
    }

    #[test]
    fn body_and_query_flags() {
        let (_, matches) = parse(&["cio", "segments", "create", "--body", r#"{"a":1}"#]);
        let (endpoint, sub) = selected_endpoint(&matches).unwrap();
        assert_eq!(request(endpoint, sub).body.as_deref(), Some(r#"{"a":1}"#));

        let (_, matches) = parse(&["cio", "customers", "search", "--email", "a@b.com"]);
        let (endpoint, sub) = selected_endpoint(&matches).unwrap();
        let req = request(endpoint, sub);
        assert_eq!(req.query.as_deref(), Some("a@b.com"));
        assert_eq!(req.body, None);
    }

    #[test]
    fn get_only_commands_reject_body() {
        assert!(
            command()
                .try_get_matches_from(["cio", "segments", "ls", "--body", "{}"])
                .is_err()
        );
    }

    #[test]
    fn missing_positional_is_a_usage_error() {
        assert!(command().try_get_matches_from(["cio", "segments", "get"]).is_err());
    }

    #[test]
    fn output_flag_combinations() {
        let (cli, _) = parse(&["cio", "--json", "--plain", "version"]);
        assert_eq!(cli.output_options().unwrap_err(), CliError::JsonWithPlain);

        let (cli, _) = parse(&["cio", "--jq", ".a", "--plain", "version"]);
        let err = cli.output_options().unwrap_err();
        assert_eq!(
            err.to_string(),
            "--jq requires JSON output mode (remove --plain or use --json)"
        );

        let (cli, _) = parse(&["cio", "--plain", "version"]);
        assert_eq!(cli.output_options().unwrap().mode, OutputMode::Plain);

        let (cli, _) = parse(&["cio", "--jq", ".a", "--json", "version"]);
        let options = cli.output_options().unwrap();
        assert_eq!(options.mode, OutputMode::Pretty);
        assert_eq!(options.filter.as_deref(), Some(".a"));
    }

    #[test]
    fn blank_filter_counts_as_no_filter() {
        for blank in ["", " ", "\t\n"] {
            let (cli, _) = parse(&["cio", "--jq", blank, "--plain", "version"]);
            let options = cli.output_options().unwrap();
            assert_eq!(options.mode, OutputMode::Plain);
            assert_eq!(options.filter, None);
        }
    }
}
