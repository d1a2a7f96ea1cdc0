use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use lrgen::automaton::{BuildOptions, LookaheadMode, ReduceReducePolicy, ShiftReducePolicy};
use lrgen::grammar::first_follow::symbol_table;
use lrgen::grammar::loader::load_grammar;
use lrgen::grammar::Grammar;
use lrgen::parser::{LrParser, WriterSink};
use lrgen::scanner::WordScanner;
use lrgen::tables::CompactTables;
use lrgen::{generate, Generated};

#[derive(Parser)]
#[command(name = "lrgen")]
#[command(about = "Build LR(0)/SLR parse tables and run them against token streams")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConstructionArgs {
    /// Restrict reduces to FOLLOW sets when detecting conflicts
    #[arg(long)]
    slr: bool,

    /// Resolve shift-reduce conflicts by reducing
    #[arg(long)]
    prefer_reduce: bool,

    /// Resolve reduce-reduce conflicts with the last production instead of the first
    #[arg(long)]
    keep_last_reduce: bool,
}

impl ConstructionArgs {
    fn options(&self) -> BuildOptions {
        BuildOptions {
            lookahead: if self.slr {
                LookaheadMode::Slr
            } else {
                LookaheadMode::Lr0
            },
            shift_reduce: if self.prefer_reduce {
                ShiftReducePolicy::PreferReduce
            } else {
                ShiftReducePolicy::PreferShift
            },
            reduce_reduce: if self.keep_last_reduce {
                ReduceReducePolicy::KeepLast
            } else {
                ReduceReducePolicy::KeepFirst
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build tables from a grammar file and write them out
    Generate {
        grammar: PathBuf,

        /// Binary table output
        #[arg(short, long, default_value = "tables.bin")]
        output: PathBuf,

        /// Also dump the tables as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        #[command(flatten)]
        construction: ConstructionArgs,
    },

    /// Print every state of the automaton
    Report {
        grammar: PathBuf,

        /// Also list every symbol with its FIRST and FOLLOW sets
        #[arg(long)]
        symbols: bool,

        #[command(flatten)]
        construction: ConstructionArgs,
    },

    /// Parse whitespace separated terminal names; one argument per input
    Parse {
        grammar: PathBuf,

        /// Use prebuilt binary tables instead of building them
        #[arg(long)]
        tables: Option<PathBuf>,

        /// Check the lookahead set before every reduce
        #[arg(long)]
        lookahead: bool,

        #[arg(required = true)]
        inputs: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Generate {
            grammar,
            output,
            json,
            construction,
        } => cmd_generate(&grammar, &output, json.as_deref(), construction.options()),
        Commands::Report {
            grammar,
            symbols,
            construction,
        } => cmd_report(&grammar, symbols, construction.options()),
        Commands::Parse {
            grammar,
            tables,
            lookahead,
            inputs,
        } => cmd_parse(&grammar, tables.as_deref(), lookahead, &inputs),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn read_grammar(path: &Path) -> Result<Grammar> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read grammar {}", path.display()))?;
    let grammar =
        load_grammar(&source).with_context(|| format!("invalid grammar {}", path.display()))?;
    log::info!(
        "{}: {} terminals, {} nonterminals, {} productions",
        path.display(),
        grammar.symbols().n_terminals(),
        grammar.symbols().n_nonterminals(),
        grammar.productions().len()
    );
    Ok(grammar)
}

// conflicts are logged as warnings while the automaton is built
fn build(path: &Path, options: BuildOptions) -> Result<Generated> {
    let grammar = read_grammar(path)?;
    Ok(generate(&grammar, options))
}

fn cmd_generate(
    grammar: &Path,
    output: &Path,
    json: Option<&Path>,
    options: BuildOptions,
) -> Result<bool> {
    let generated = build(grammar, options)?;
    println!("{}", generated.tables.summary());

    generated
        .tables
        .save_bin(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    if let Some(json) = json {
        let file =
            File::create(json).with_context(|| format!("failed to create {}", json.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, &generated.tables)?;
        w.flush()?;
    }
    Ok(true)
}

fn cmd_report(grammar: &Path, symbols: bool, options: BuildOptions) -> Result<bool> {
    let grammar_model = read_grammar(grammar)?;
    let generated = generate(&grammar_model, options);
    if symbols {
        println!("{}", symbol_table(&grammar_model));
    }
    print!("{}", generated.automaton.report(&grammar_model));
    println!("{}", generated.tables.summary());
    Ok(true)
}

fn cmd_parse(
    grammar: &Path,
    tables: Option<&Path>,
    lookahead: bool,
    inputs: &[String],
) -> Result<bool> {
    let grammar_model = read_grammar(grammar)?;
    let compact = match tables {
        Some(path) => {
            let loaded = CompactTables::load_bin(path)
                .with_context(|| format!("failed to load tables {}", path.display()))?;
            if loaded.n_terminals != grammar_model.symbols().n_terminals()
                || loaded.n_nonterminals != grammar_model.symbols().n_nonterminals()
            {
                bail!(
                    "tables {} were not built from grammar {}",
                    path.display(),
                    grammar.display()
                );
            }
            loaded
        }
        None => {
            let options = BuildOptions {
                lookahead: if lookahead {
                    LookaheadMode::Slr
                } else {
                    LookaheadMode::Lr0
                },
                ..BuildOptions::default()
            };
            generate(&grammar_model, options).tables
        }
    };

    let scanner = WordScanner::new(grammar_model.symbols());
    let parser = LrParser::new(&compact).with_lookahead_check(lookahead);

    let mut all_accepted = true;
    for input in inputs {
        let stream = scanner.scan(input)?;
        println!("> {}", input);

        let stdout = io::stdout();
        let mut sink = WriterSink::new(stdout.lock());
        let outcome = parser.parse(stream, &mut sink);
        sink.finish()?;

        match outcome.rejection() {
            None => println!("ACCEPTED"),
            Some(rejection) => {
                all_accepted = false;
                println!("REJECTED: {}", rejection);
            }
        }
    }
    Ok(all_accepted)
}
