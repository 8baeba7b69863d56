//! The CLI front-end: resolve a target state by substring, exercise all or
//! some states, optionally with the live viewer running.
//!
//! The states and the SUT belong to the caller, so this is a library entry
//! point rather than a binary: build the crawler, then hand it over.

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use crate::crawler::StateMachineCrawler;
use crate::observer::StateChangeObserver;
use crate::snapshot::GraphSnapshot;

#[derive(Debug, Parser)]
#[command(name = "statecrawl", about = "Manipulate the state machine")]
pub struct Args {
    /// State to which the system should be transitioned
    #[arg(short, long, conflicts_with_all = ["all", "some"])]
    pub target_state: Option<String>,

    /// Exercise all states
    #[arg(short, long, conflicts_with = "some")]
    pub all: bool,

    /// Exercise all states whose names match a regexp
    #[arg(short, long)]
    pub some: Option<String>,

    /// Serve the live graph viewer while the crawl runs
    #[cfg(feature = "webview")]
    #[arg(short, long)]
    pub with_webview: bool,
}

pub fn run<S>(crawler: &mut StateMachineCrawler<S>) -> ExitCode {
    run_from(crawler, std::env::args())
}

pub fn run_from<S>(
    crawler: &mut StateMachineCrawler<S>,
    args: impl IntoIterator<Item = String>,
) -> ExitCode {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();
    match execute(crawler, &Args::parse_from(args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.to_string().as_str().red());
            ExitCode::FAILURE
        }
    }
}

pub fn execute<S>(crawler: &mut StateMachineCrawler<S>, args: &Args) -> crate::Result<()> {
    crawler.set_on_state_change_handler(StepReporter::default());

    #[cfg(feature = "webview")]
    let mut viewer = crate::webview::WebView::new();
    #[cfg(feature = "webview")]
    if args.with_webview {
        let cell = viewer.cell();
        crawler.set_on_state_change_handler(FanOut {
            reporter: StepReporter::default(),
            cell: cell.observer(),
        });
        if let Err(err) = viewer.start() {
            let message = format!("viewer failed to start: {err:#}");
            eprintln!("{}", message.as_str().red());
        }
    }

    let result = if args.all {
        crawler.verify_all_states(None, false)
    } else if let Some(pattern) = &args.some {
        crawler.verify_all_states(Some(pattern), false)
    } else if let Some(target) = &args.target_state {
        crawler.move_to(target)
    } else {
        Ok(())
    };

    #[cfg(feature = "webview")]
    viewer.stop();

    result
}

/// Prints each step of the crawl, the way a test run reads: the attempted
/// edge, then a pass or fail mark for the state it landed on.
#[derive(Default)]
pub struct StepReporter {
    last_edge: Option<(String, String)>,
}

impl StateChangeObserver for StepReporter {
    fn on_change(&mut self, graph: &GraphSnapshot) {
        let current = graph.current().map(str::to_string);
        let next = graph.next().map(str::to_string);
        match (current, next) {
            (Some(current), Some(next)) => {
                let edge = (current, next);
                if self.last_edge.as_ref() != Some(&edge) {
                    println!("+ {} -> {}", edge.0, edge.1);
                    self.last_edge = Some(edge);
                }
            }
            (Some(current), None) => {
                let Some((_, attempted)) = self.last_edge.take() else {
                    return;
                };
                if current == attempted {
                    println!("  {} {}", "\u{2713}".green(), attempted);
                } else {
                    // the crawler fell back to the entry point
                    println!("  {} {}", "\u{2717}".red(), attempted);
                }
            }
            _ => {}
        }
    }
}

#[cfg(feature = "webview")]
struct FanOut<A, B> {
    reporter: A,
    cell: B,
}

#[cfg(feature = "webview")]
impl<A: StateChangeObserver, B: StateChangeObserver> StateChangeObserver for FanOut<A, B> {
    fn on_change(&mut self, graph: &GraphSnapshot) {
        self.reporter.on_change(graph);
        self.cell.on_change(graph);
    }
}
