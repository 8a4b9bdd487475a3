use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use std::{
    path::{Path, PathBuf},
    time::Instant,
};
use tracing_subscriber::EnvFilter;
use yyviz::{annotation::Grammar, automaton::Automaton, export, Config};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The directory relative paths are resolved against.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract the automaton model from the parser report.
    States(StatesArgs),

    /// Extract the rule model from the grammar annotations.
    Grammar(GrammarArgs),

    /// Splice the state-tracing hook into the generated parser.
    Patch(PatchArgs),

    /// Run the parser generator (optional), then patch and extract everything.
    All {
        /// Run this parser generator on the grammar first (Bison 3 command line).
        #[arg(long)]
        bison: Option<PathBuf>,

        #[command(flatten)]
        states: StatesArgs,

        #[command(flatten)]
        grammar: GrammarArgs,

        #[command(flatten)]
        patch: PatchArgs,
    },
}

#[derive(Debug, Args)]
struct StatesArgs {
    /// The path of the parser report (`bison -v` output).
    #[arg(long)]
    report: Option<PathBuf>,

    /// The path of the generated automaton model.
    #[arg(long)]
    states_output: Option<PathBuf>,

    /// Print the reconstructed automaton as a table.
    #[arg(long)]
    dump: bool,
}

#[derive(Debug, Args)]
struct GrammarArgs {
    /// The path of the annotated grammar source.
    #[arg(long)]
    grammar: Option<PathBuf>,

    /// The path of the generated rule model.
    #[arg(long)]
    grammar_output: Option<PathBuf>,

    /// The line marking the start of the annotated region.
    #[arg(long)]
    start_marker: Option<String>,

    /// The line marking the end of the annotated region.
    #[arg(long)]
    end_marker: Option<String>,
}

#[derive(Debug, Args)]
struct PatchArgs {
    /// The path of the generated parser source.
    #[arg(long)]
    parser_source: Option<PathBuf>,

    /// The function the trace hook calls with the state stack.
    #[arg(long)]
    hook_fn: Option<String>,

    /// Do not keep a `.bak` copy of the patched file.
    #[arg(long)]
    no_backup: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    tracing::debug!("parsed CLI args = {:?}", cli);

    let mut config = match &cli.root {
        Some(root) => Config::with_root_dir(root),
        None => Config::new(),
    };

    match &cli.command {
        Command::States(args) => {
            args.apply(&mut config);
            run_states(&config, args.dump)?;
        }
        Command::Grammar(args) => {
            args.apply(&mut config);
            run_grammar(&config)?;
        }
        Command::Patch(args) => {
            args.apply(&mut config);
            run_patch(&config)?;
        }
        Command::All {
            bison,
            states,
            grammar,
            patch,
        } => {
            states.apply(&mut config);
            grammar.apply(&mut config);
            patch.apply(&mut config);
            if let Some(bison) = bison {
                run_bison(bison, &config)?;
            }
            run_patch(&config)?;
            run_states(&config, states.dump)?;
            run_grammar(&config)?;
        }
    }

    Ok(())
}

impl StatesArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.report {
            config.report(path);
        }
        if let Some(path) = &self.states_output {
            config.states_output(path);
        }
    }
}

impl GrammarArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.grammar {
            config.grammar(path);
        }
        if let Some(path) = &self.grammar_output {
            config.grammar_output(path);
        }
        if let Some(marker) = &self.start_marker {
            config.start_marker(marker);
        }
        if let Some(marker) = &self.end_marker {
            config.end_marker(marker);
        }
    }
}

impl PatchArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.parser_source {
            config.parser_source(path);
        }
        if let Some(name) = &self.hook_fn {
            config.hook_fn(name);
        }
        if self.no_backup {
            config.backup(false);
        }
    }
}

fn run_states(config: &Config, dump: bool) -> anyhow::Result<()> {
    let s = Instant::now();
    let automaton = export::extract_states(config).with_context(|| {
        anyhow::anyhow!(
            "errored during processing {}",
            config.report_path().display()
        )
    })?;
    tracing::info!("extract_states: {:?} elapsed", s.elapsed());

    if dump {
        print!("{}", automaton.display());
    }

    println!("Parsed {} states", automaton.len());
    println!("Output written to {}", config.states_output_path().display());
    warn_conflicts(&automaton);
    Ok(())
}

fn run_grammar(config: &Config) -> anyhow::Result<()> {
    let s = Instant::now();
    let grammar = export::extract_grammar(config).with_context(|| {
        anyhow::anyhow!(
            "errored during processing {}",
            config.grammar_path().display()
        )
    })?;
    tracing::info!("extract_grammar: {:?} elapsed", s.elapsed());

    println!(
        "Extracted {} grammar rules -> {}",
        grammar.len(),
        config.grammar_output_path().display()
    );
    warn_unannotated(&grammar);
    Ok(())
}

fn run_patch(config: &Config) -> anyhow::Result<()> {
    let path = config.parser_source_path();
    export::patch_parser(config)
        .with_context(|| anyhow::anyhow!("errored during patching {}", path.display()))?;
    println!("Patched {}", path.display());
    Ok(())
}

fn run_bison(bison: &Path, config: &Config) -> anyhow::Result<()> {
    let grammar = config.grammar_path();
    let report = config.report_path();
    let parser_source = config.parser_source_path();

    let sh = xshell::Shell::new()?;
    xshell::cmd!(
        sh,
        "{bison} -d -v --report-file {report} -o {parser_source} {grammar}"
    )
    .run()
    .with_context(|| anyhow::anyhow!("failed to run {}", bison.display()))?;
    Ok(())
}

fn warn_conflicts(automaton: &Automaton) {
    let conflicted: Vec<_> = automaton.conflicted_states().map(|s| s.id()).collect();
    if !conflicted.is_empty() {
        let suffix = if conflicted.len() == 1 { "" } else { "s" };
        println!(
            "[warning] The automaton has {} conflicted state{}: {:?}",
            conflicted.len(),
            suffix,
            conflicted.iter().map(|id| id.into_raw()).collect::<Vec<_>>()
        );
    }
}

fn warn_unannotated(grammar: &Grammar) {
    let unannotated: Vec<_> = grammar
        .unannotated_rules()
        .map(|r| r.rule_no.into_raw())
        .collect();
    if !unannotated.is_empty() {
        println!(
            "[warning] The following rules have semantic steps but no log_rule declaration: {:?}",
            unannotated
        );
    }
}
